//! `glint build|run|test|init` subcommand dispatch. Wires
//! lexer -> parser -> loader -> checker -> emitter together (via
//! `CompilerFrontend::compile`) and writes the emitted target source to
//! disk. Argv parses into a `Command` enum, with a trailing-`--flag`
//! collector, then one match arm per command printing through
//! `saying::say!`.
//!
//! Invoking a host compiler, linking, and running the produced binary are
//! an external driver's job — `build`/`run` stop at `HostCompileStep`,
//! which `glintc` leaves unimplemented (see `host_compile`).

use crate::frontend::diagnostics::print_compiler_messages;
use crate::frontend::errors::CompileError;
use crate::frontend::CompilerFrontend;
use crate::project::host_compile::{HostCompileStep, UnimplementedHostCompiler};
use crate::project::manifest::ProjectManifest;
use saying::say;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Build(PathBuf),
    Run(PathBuf),
    Test(PathBuf),
    Init(String),
    Help,
}

pub fn start_cli() -> i32 {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return 1;
    }

    let command = match parse_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red "error", ": ", e);
            print_help();
            return 1;
        }
    };

    match command {
        Command::Help => {
            print_help();
            0
        }
        Command::Init(name) => run_init(&name),
        Command::Build(path) => run_build(&path).map_or(1, |_| 0),
        Command::Run(path) => run_build_and_run(&path).map_or(1, |_| 0),
        Command::Test(path) => run_test(&path),
    }
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        Some("help") | Some("--help") => Ok(Command::Help),
        Some("init") => match args.get(1) {
            Some(name) => Ok(Command::Init(name.clone())),
            None => Err("missing project name: 'glint init <name>'".to_string()),
        },
        Some("run") => Ok(Command::Run(path_or_cwd(args.get(1)))),
        Some("test") => Ok(Command::Test(path_or_cwd(args.get(1)))),
        Some(other) => Ok(Command::Build(PathBuf::from(other))),
        None => Err("missing a file or directory to build".to_string()),
    }
}

fn path_or_cwd(arg: Option<&String>) -> PathBuf {
    match arg {
        Some(path) => PathBuf::from(path),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn run_init(name: &str) -> i32 {
    let manifest = ProjectManifest {
        name: name.to_string(),
        entry: Some(PathBuf::from("main.gl")),
    };

    let manifest_path = PathBuf::from("project.toml");
    if manifest_path.exists() {
        say!(Red "error", ": project.toml already exists in the current directory");
        return 1;
    }

    match std::fs::write(&manifest_path, manifest.to_toml_string()) {
        Ok(()) => {
            say!(Green "created", ": project.toml for '", { name.to_string() }, "'");
            0
        }
        Err(e) => {
            say!(Red "error", ": could not write project.toml: ", { e.to_string() });
            1
        }
    }
}

/// Resolves `path` (a file or a project directory) to an `(entry_dir,
/// entry_dotted_path)` pair the frontend's module loader needs: a single
/// source file's parent directory stands in as a one-off project root with
/// a synthetic dotted path of its own file stem.
fn resolve_entry(path: &Path) -> Result<(PathBuf, String), String> {
    if path.is_dir() {
        let manifest_path = path.join("project.toml");
        let manifest = ProjectManifest::parse(&manifest_path)
            .map_err(|e| format!("{e}"))?;
        let entry = manifest.entry.unwrap_or_else(|| PathBuf::from("main.gl"));
        let dotted = entry
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| "manifest entry has no file stem".to_string())?
            .to_string();
        Ok((path.to_path_buf(), dotted))
    } else {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let dotted = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| format!("'{}' has no file stem", path.display()))?
            .to_string();
        Ok((parent, dotted))
    }
}

/// Shared by `build`/`run`: runs the full pipeline and, on success, writes
/// the emitted source next to the entry path.
fn compile_to_disk(path: &Path) -> Result<PathBuf, ()> {
    let (entry_dir, entry_dotted_path) = match resolve_entry(path) {
        Ok(pair) => pair,
        Err(e) => {
            say!(Red "error", ": ", e);
            return Err(());
        }
    };

    let mut frontend = CompilerFrontend::new();
    let unit = match frontend.compile(&entry_dir, &entry_dotted_path) {
        Ok(unit) => unit,
        Err(e) => {
            report_compile_error(&e);
            return Err(());
        }
    };

    if unit.messages.has_errors() {
        print_compiler_messages(&unit.messages);
        return Err(());
    }
    print_compiler_messages(&unit.messages);

    let output_path = entry_dir.join(format!("{entry_dotted_path}.cpp"));
    if let Err(e) = std::fs::write(&output_path, &unit.emitted_source) {
        say!(Red "error", ": could not write emitted source: ", { e.to_string() });
        return Err(());
    }

    say!(Green "compiled", ": wrote ", { output_path.display().to_string() });
    let backend = UnimplementedHostCompiler;
    let _ = backend.compile(&output_path, &unit.link_dependencies);

    Ok(output_path)
}

fn run_build(path: &Path) -> Result<(), ()> {
    compile_to_disk(path).map(|_| ())
}

fn run_build_and_run(path: &Path) -> Result<(), ()> {
    let output_path = compile_to_disk(path)?;
    say!(Yellow "note", ": executing the emitted binary is the host driver's job; ", {
        format!("see {}", output_path.display())
    });
    Ok(())
}

/// `glint test <path>`: same pipeline, emitted in test mode. The exit code
/// is the number of test failures, collapsing to 1 on any pipeline failure.
fn run_test(path: &Path) -> i32 {
    let (entry_dir, entry_dotted_path) = match resolve_entry(path) {
        Ok(pair) => pair,
        Err(e) => {
            say!(Red "error", ": ", e);
            return 1;
        }
    };

    let mut frontend = CompilerFrontend::new();
    let unit = match frontend.compile_for_tests(&entry_dir, &entry_dotted_path) {
        Ok(unit) => unit,
        Err(e) => {
            report_compile_error(&e);
            return 1;
        }
    };

    if unit.messages.has_errors() {
        print_compiler_messages(&unit.messages);
        return 1;
    }
    print_compiler_messages(&unit.messages);

    let output_path = entry_dir.join(format!("{entry_dotted_path}_tests.cpp"));
    if let Err(e) = std::fs::write(&output_path, &unit.emitted_source) {
        say!(Red "error", ": could not write emitted test source: ", { e.to_string() });
        return 1;
    }

    say!(Green "compiled tests", ": wrote ", { output_path.display().to_string() });
    say!(Yellow "note", ": compiling and running the emitted test binary is the test runner's job");
    0
}

fn report_compile_error(e: &CompileError) {
    say!(Red "error", ": ", e.to_plain_string());
}

fn print_help() {
    say!(Green "glint", ": the glint compiler front end");
    println!("Usage: glint <file-or-dir>         build a binary from a source file or project");
    println!("       glint run <file-or-dir>     build and execute");
    println!("       glint test <path>           compile and run all test files under <path>");
    println!("       glint init <name>           create a new project manifest in current dir");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_no_args_is_an_error() {
        assert!(parse_command(&[]).is_err());
    }

    #[test]
    fn init_without_a_name_is_an_error() {
        let args = vec!["init".to_string()];
        assert!(parse_command(&args).is_err());
    }

    #[test]
    fn bare_path_is_a_build_command() {
        let args = vec!["main.gl".to_string()];
        assert_eq!(parse_command(&args).unwrap(), Command::Build(PathBuf::from("main.gl")));
    }

    #[test]
    fn run_with_explicit_path() {
        let args = vec!["run".to_string(), "proj".to_string()];
        assert_eq!(parse_command(&args).unwrap(), Command::Run(PathBuf::from("proj")));
    }
}
