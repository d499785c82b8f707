//! Unified error type for every pipeline stage (`LexError` / `ParseError` /
//! `ModuleError` / `TypeError` / `EmitError`) as one tagged `CompileError`
//! with structured metadata, built with a `return_*_error!` macro family.

use crate::frontend::lexer::tokens::SourceSpan;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Eq, Hash, PartialEq, Clone)]
pub enum ErrorMetaDataKey {
    SymbolName,
    CompilationStage,
    PrimarySuggestion,
    ExpectedType,
    FoundType,
    ExpectedCount,
    FoundCount,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ErrorKind {
    Lex,
    Parse,
    Module,
    Type,
    Emit,
}

pub fn error_kind_name(kind: &ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Lex => "Lex Error",
        ErrorKind::Parse => "Parse Error",
        ErrorKind::Module => "Module Error",
        ErrorKind::Type => "Type Error",
        ErrorKind::Emit => "Emit Error",
    }
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub span: SourceSpan,
    pub kind: ErrorKind,
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
            metadata: HashMap::new(),
        }
    }

    /// Attach or override the file path on this error's span. Used when an
    /// error is raised against a span whose `file` wasn't known yet (e.g. the
    /// lexer operating on raw bytes before a module path is assigned).
    pub fn with_file_path(mut self, path: PathBuf) -> Self {
        self.span.file = path;
        self
    }

    pub fn with_meta(mut self, key: ErrorMetaDataKey, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }

    /// The `<filename>:<line>: error: <message>` plain-text form.
    pub fn to_plain_string(&self) -> String {
        format!(
            "{}:{}: error: {}",
            self.span.file.display(),
            self.span.start_line,
            self.message
        )
    }
}

/// Accumulated diagnostics for one compilation. The type checker never halts
/// on the first `TypeError`; this is where they pile up before being reported
/// together.
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompileError>,
    pub warnings: Vec<crate::frontend::warnings::CompilerWarning>,
}

impl CompilerMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn merge(&mut self, other: CompilerMessages) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Raise a lex error and return early.
///
/// Usage: `return_lex_error!("unterminated character literal", span)`
#[macro_export]
macro_rules! return_lex_error {
    ($msg:expr, $span:expr) => {
        return Err($crate::frontend::errors::CompileError::new(
            $crate::frontend::errors::ErrorKind::Lex,
            $msg,
            $span,
        ))
    };
}

/// Raise a parse error and return early.
///
/// Usage: `return_parse_error!("unexpected token 'end' at line 4", span)`
#[macro_export]
macro_rules! return_parse_error {
    ($msg:expr, $span:expr) => {
        return Err($crate::frontend::errors::CompileError::new(
            $crate::frontend::errors::ErrorKind::Parse,
            $msg,
            $span,
        ))
    };
}

/// Raise a module-loader error (missing module, empty directory, cyclic
/// import) and return early.
#[macro_export]
macro_rules! return_module_error {
    ($msg:expr, $span:expr) => {
        return Err($crate::frontend::errors::CompileError::new(
            $crate::frontend::errors::ErrorKind::Module,
            $msg,
            $span,
        ))
    };
}

/// Push a type error onto an accumulator rather than halting: the type
/// checker reports every error it finds in one pass, not just the first.
///
/// Usage: `push_type_error!(errors, "undefined variable", span, { SymbolName => name.to_owned() })`
#[macro_export]
macro_rules! push_type_error {
    ($errors:expr, $msg:expr, $span:expr) => {
        $errors.push($crate::frontend::errors::CompileError::new(
            $crate::frontend::errors::ErrorKind::Type,
            $msg,
            $span,
        ))
    };
    ($errors:expr, $msg:expr, $span:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {{
        let mut error = $crate::frontend::errors::CompileError::new(
            $crate::frontend::errors::ErrorKind::Type,
            $msg,
            $span,
        );
        $( error = error.with_meta($crate::frontend::errors::ErrorMetaDataKey::$key, $value); )*
        $errors.push(error);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan::new_single_line(PathBuf::from("main.gl"), 3)
    }

    #[test]
    fn plain_string_matches_the_filename_line_message_format() {
        let err = CompileError::new(ErrorKind::Type, "undefined variable 'x'", span());
        assert_eq!(err.to_plain_string(), "main.gl:3: error: undefined variable 'x'");
    }

    #[test]
    fn with_meta_is_queryable() {
        let err = CompileError::new(ErrorKind::Type, "mismatch", span())
            .with_meta(ErrorMetaDataKey::ExpectedType, "int");
        assert_eq!(
            err.metadata.get(&ErrorMetaDataKey::ExpectedType).map(String::as_str),
            Some("int")
        );
    }
}
