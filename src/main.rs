use glintc::project::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let code = cli::start_cli();
    ExitCode::from(code as u8)
}
