//! Non-fatal diagnostics. Warnings never halt the pipeline; they ride
//! alongside `CompileError`s in `CompilerMessages` and are printed after a
//! successful compile, or interleaved with errors on a failed one.

use crate::frontend::lexer::tokens::SourceSpan;

#[derive(Debug, Clone)]
pub struct CompilerWarning {
    pub message: String,
    pub span: SourceSpan,
}

impl CompilerWarning {
    pub fn new(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn to_plain_string(&self) -> String {
        format!(
            "{}:{}: warning: {}",
            self.span.file.display(),
            self.span.start_line,
            self.message
        )
    }
}
