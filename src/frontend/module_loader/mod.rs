//! Import resolution: directory-per-dotted-path modules, per-directory file
//! merge, and cycle detection via a currently-loading set that mirrors the
//! recursion stack.

pub mod builtins;

use crate::frontend::ast::nodes::{ErrorDef, FunctionDef, MethodDef, Program, StructDef, Visibility};
use crate::frontend::errors::{CompileError, ErrorKind};
use crate::frontend::lexer::tokens::SourceSpan;
use crate::frontend::dev_log::module_log;
use crate::frontend::string_interning::StringTable;
use crate::frontend::tokenize_and_parse;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use std::rc::Rc;

pub const SOURCE_EXTENSION: &str = "gl";

#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub dotted_path: String,
    pub directory: PathBuf,
    pub merged_program: Program,
    pub deps: Vec<String>,
}

impl Module {
    pub fn public_struct(&self, strings: &StringTable, name: &str) -> Option<&StructDef> {
        self.merged_program
            .structs
            .iter()
            .find(|s| s.visibility == Visibility::Public && strings.resolve(s.name) == name)
    }

    pub fn public_error(&self, strings: &StringTable, name: &str) -> Option<&ErrorDef> {
        self.merged_program
            .errors
            .iter()
            .find(|e| e.visibility == Visibility::Public && strings.resolve(e.name) == name)
    }

    pub fn public_function(&self, strings: &StringTable, name: &str) -> Option<&FunctionDef> {
        self.merged_program
            .functions
            .iter()
            .find(|f| f.visibility == Visibility::Public && strings.resolve(f.name) == name)
    }

    pub fn public_methods(&self, strings: &StringTable, owner: &str) -> Vec<&MethodDef> {
        self.merged_program
            .methods
            .iter()
            .filter(|m| m.visibility == Visibility::Public && strings.resolve(m.owner) == owner)
            .collect()
    }
}

/// Resolves and parses every transitively-imported module exactly once.
/// `loading` is the temp-mark set of a DFS cycle detector; `loaded` is the
/// visited-mark set doubling as the memoization cache.
pub struct ModuleLoader {
    project_root: PathBuf,
    loaded: FxHashMap<String, Rc<Module>>,
    loading: FxHashSet<String>,
}

impl ModuleLoader {
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            loaded: FxHashMap::default(),
            loading: FxHashSet::default(),
        }
    }

    pub fn get(&self, dotted_path: &str) -> Option<&Rc<Module>> {
        self.loaded.get(dotted_path)
    }

    pub fn load(&mut self, dotted_path: &str, strings: &mut StringTable) -> Result<Rc<Module>, CompileError> {
        if let Some(existing) = self.loaded.get(dotted_path) {
            return Ok(existing.clone());
        }

        if self.loading.contains(dotted_path) {
            return Err(CompileError::new(
                ErrorKind::Module,
                format!("circular import involving '{dotted_path}'"),
                SourceSpan::new_single_line(PathBuf::from(dotted_path), 0),
            ));
        }

        module_log!("loading module {}", dotted_path);
        self.loading.insert(dotted_path.to_string());

        let module = self.load_uncached(dotted_path, strings);

        self.loading.remove(dotted_path);

        let module = module?;
        let rc = Rc::new(module);
        self.loaded.insert(dotted_path.to_string(), rc.clone());
        Ok(rc)
    }

    fn load_uncached(&mut self, dotted_path: &str, strings: &mut StringTable) -> Result<Module, CompileError> {
        if let Some(program) = builtins::synthetic_program(dotted_path, strings) {
            return Ok(Module {
                name: dotted_path.to_string(),
                dotted_path: dotted_path.to_string(),
                directory: PathBuf::from(format!("<builtin:{dotted_path}>")),
                merged_program: program,
                deps: Vec::new(),
            });
        }

        let directory = self.project_root.join(dotted_path.replace('.', "/"));
        let entries = std::fs::read_dir(&directory).map_err(|_| {
            CompileError::new(
                ErrorKind::Module,
                format!("module directory not found: {}", directory.display()),
                SourceSpan::new_single_line(directory.clone(), 0),
            )
        })?;

        let mut source_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION))
            .collect();
        source_files.sort();

        if source_files.is_empty() {
            return Err(CompileError::new(
                ErrorKind::Module,
                format!("module directory is empty: {}", directory.display()),
                SourceSpan::new_single_line(directory.clone(), 0),
            ));
        }

        let mut merged = Program::default();
        for file in &source_files {
            let source = std::fs::read_to_string(file).map_err(|_| {
                CompileError::new(
                    ErrorKind::Module,
                    format!("could not read source file: {}", file.display()),
                    SourceSpan::new_single_line(file.clone(), 0),
                )
            })?;
            let file_program = tokenize_and_parse(&source, file, strings)?;
            merged.merge(file_program);
        }

        crate::frontend::ast::async_inference::infer_async_flags(&mut merged, strings);

        let mut deps = Vec::with_capacity(merged.imports.len());
        for import in &merged.imports {
            let path_string = import
                .dotted_path
                .iter()
                .map(|segment| strings.resolve(*segment).to_string())
                .collect::<Vec<_>>()
                .join(".");
            self.load(&path_string, strings)?;
            deps.push(path_string);
        }

        Ok(Module {
            name: dotted_path.to_string(),
            dotted_path: dotted_path.to_string(),
            directory,
            merged_program: merged,
            deps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_module(root: &std::path::Path, dotted: &str, file_name: &str, contents: &str) {
        let dir = root.join(dotted.replace('.', "/"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file_name), contents).unwrap();
    }

    #[test]
    fn loading_the_same_module_twice_returns_the_cached_instance() {
        let root = tempdir().unwrap();
        write_module(root.path(), "a", "mod.gl", "fn hello() { }");

        let mut strings = StringTable::new();
        let mut loader = ModuleLoader::new(root.path().to_path_buf());

        let first = loader.load("a", &mut strings).unwrap();
        let second = loader.load("a", &mut strings).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn cyclic_imports_report_an_error_without_stack_overflow() {
        let root = tempdir().unwrap();
        write_module(root.path(), "a", "mod.gl", "import b;\nfn a_fn() { }");
        write_module(root.path(), "b", "mod.gl", "import a;\nfn b_fn() { }");

        let mut strings = StringTable::new();
        let mut loader = ModuleLoader::new(root.path().to_path_buf());

        let result = loader.load("a", &mut strings);
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("circular import"));
    }

    #[test]
    fn builtin_http_module_resolves_without_touching_the_filesystem() {
        let mut strings = StringTable::new();
        let mut loader = ModuleLoader::new(PathBuf::from("/nonexistent"));
        let module = loader.load("http", &mut strings).unwrap();
        assert!(module.public_struct(&strings, "Response").is_some());
    }
}
