//! Rendering `CompileError`/`CompilerWarning` to the terminal: plain
//! colored text plus a source snippet, one line per diagnostic.

use crate::frontend::errors::{error_kind_name, CompileError, CompilerMessages};
use crate::frontend::warnings::CompilerWarning;
use saying::say;
use std::fs;

pub fn print_compiler_messages(messages: &CompilerMessages) {
    for error in &messages.errors {
        print_formatted_error(error);
    }
    for warning in &messages.warnings {
        print_formatted_warning(warning);
    }
}

pub fn print_formatted_error(error: &CompileError) {
    say!(Red { error_kind_name(&error.kind) }, ": ", error.message.as_str());
    say!(Dark Magenta {
        format!("  --> {}:{}", error.span.file.display(), error.span.start_line)
    });

    print_snippet(
        &error.span.file,
        error.span.start_line,
        error.span.start_col,
        error.span.end_col,
    );
}

pub fn print_formatted_warning(warning: &CompilerWarning) {
    say!(Yellow "warning", ": ", warning.message.as_str());
    say!(Dark Magenta {
        format!("  --> {}:{}", warning.span.file.display(), warning.span.start_line)
    });
}

fn print_snippet(file: &std::path::Path, line: i32, start_col: i32, end_col: i32) {
    let Ok(contents) = fs::read_to_string(file) else {
        return;
    };

    let Some(text) = contents.lines().nth((line - 1).max(0) as usize) else {
        return;
    };

    println!("{text}");

    let underline_start = start_col.max(0) as usize;
    let underline_len = (end_col - start_col).max(1) as usize;
    let marker = format!("{}{}", " ".repeat(underline_start), "^".repeat(underline_len));
    say!(Red { marker });
}
