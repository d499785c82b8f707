//! The boundary past "emit source + print the dependency set". Invoking a
//! host C++ compiler, linking, and executing the produced binary are an
//! external driver's responsibility — the front end's contract ends at
//! `EmitOutput`. This trait names that boundary so the CLI has something
//! concrete to call without actually shelling out to a toolchain; a real
//! driver supplies its own implementation.

use std::path::Path;

/// What a concrete host-compiler backend would report back to the CLI.
pub struct HostCompileReport {
    pub binary_path: std::path::PathBuf,
}

#[derive(Debug)]
pub struct HostCompileError(pub String);

impl std::fmt::Display for HostCompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HostCompileError {}

/// Turns emitted target source plus its link dependencies into a binary.
/// `glintc` ships no implementation of this trait: it only logs that the
/// step was reached. A driver embedding this crate provides its own (e.g.
/// shelling out to `c++` with the dependency set as `-l` flags).
pub trait HostCompileStep {
    fn compile(
        &self,
        emitted_source_path: &Path,
        link_dependencies: &[String],
    ) -> Result<HostCompileReport, HostCompileError>;
}

/// The stand-in the CLI calls when no real backend is wired up: logs the
/// step and its dependency set, then reports it as unimplemented rather than
/// silently pretending to produce a binary.
pub struct UnimplementedHostCompiler;

impl HostCompileStep for UnimplementedHostCompiler {
    fn compile(
        &self,
        emitted_source_path: &Path,
        link_dependencies: &[String],
    ) -> Result<HostCompileReport, HostCompileError> {
        saying::say!(Yellow "note", ": emitted ", { emitted_source_path.display().to_string() });
        if !link_dependencies.is_empty() {
            saying::say!(Dark Magenta { format!("  links against: {}", link_dependencies.join(", ")) });
        }
        Err(HostCompileError(
            "no host compiler backend is configured; emitted source was written to disk but not compiled".to_string(),
        ))
    }
}
