//! `project.toml` parsing: the `[project]` table the module loader resolves
//! import paths against (name, entry file), parsed with `toml`/`serde`.
//!
//! Walking upward from an arbitrary path to *find* `project.toml` is the
//! CLI driver's job; this module only parses a manifest given its exact
//! path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawManifest {
    project: RawProjectTable,
}

#[derive(Debug, Deserialize)]
struct RawProjectTable {
    name: String,
    entry: Option<PathBuf>,
}

/// The project-root-relative contract the module loader needs: a name (used
/// only for diagnostics/`init` scaffolding) and an optional entry file used
/// by `build`/`run` when the CLI is pointed at a directory rather than a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    pub name: String,
    pub entry: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ManifestError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestError::Read(path, err) => {
                write!(f, "could not read manifest {}: {}", path.display(), err)
            }
            ManifestError::Parse(path, err) => {
                write!(f, "could not parse manifest {}: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ManifestError {}

impl ProjectManifest {
    /// Parse a manifest given its exact path (normally `<project_root>/project.toml`).
    pub fn parse(manifest_path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(manifest_path)
            .map_err(|e| ManifestError::Read(manifest_path.to_path_buf(), e))?;
        let raw: RawManifest = toml::from_str(&contents)
            .map_err(|e| ManifestError::Parse(manifest_path.to_path_buf(), e))?;
        Ok(Self {
            name: raw.project.name,
            entry: raw.project.entry,
        })
    }

    /// The `project.toml` text `init` writes for a freshly scaffolded project.
    pub fn to_toml_string(&self) -> String {
        let mut out = format!("[project]\nname = \"{}\"\n", self.name);
        if let Some(entry) = &self.entry {
            out.push_str(&format!("entry = \"{}\"\n", entry.display()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_name_and_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, "[project]\nname = \"demo\"\nentry = \"main.gl\"\n").unwrap();

        let manifest = ProjectManifest::parse(&path).unwrap();
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.entry, Some(PathBuf::from("main.gl")));
    }

    #[test]
    fn entry_is_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, "[project]\nname = \"demo\"\n").unwrap();

        let manifest = ProjectManifest::parse(&path).unwrap();
        assert_eq!(manifest.entry, None);
    }

    #[test]
    fn missing_name_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, "[project]\n").unwrap();

        assert!(matches!(ProjectManifest::parse(&path), Err(ManifestError::Parse(_, _))));
    }

    #[test]
    fn round_trips_through_to_toml_string() {
        let manifest = ProjectManifest {
            name: "demo".to_string(),
            entry: Some(PathBuf::from("main.gl")),
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, manifest.to_toml_string()).unwrap();

        let reparsed = ProjectManifest::parse(&path).unwrap();
        assert_eq!(reparsed, manifest);
    }
}
