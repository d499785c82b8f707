//! Shared scaffolding for the end-to-end pipeline tests: write one or more
//! `.gl` files into a fresh temp module directory, then drive the full
//! `CompilerFrontend` over it.

use glintc::frontend::CompilerFrontend;
use std::path::Path;
use tempfile::TempDir;

/// Builds a one-module project: `entry_dir/<dotted>/mod.gl` containing
/// `source`, returning the tempdir (kept alive by the caller) and the
/// `(entry_dir, dotted_path)` pair `compile` expects.
pub fn single_module_project(dotted: &str, source: &str) -> (TempDir, String) {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join(dotted.replace('.', "/"));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("mod.gl"), source).unwrap();
    (root, dotted.to_string())
}

pub fn write_module(root: &Path, dotted: &str, source: &str) {
    let dir = root.join(dotted.replace('.', "/"));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("mod.gl"), source).unwrap();
}

pub fn compile(root: &Path, dotted: &str) -> Result<glintc::frontend::CompiledUnit, glintc::frontend::errors::CompileError> {
    CompilerFrontend::new().compile(root, dotted)
}
