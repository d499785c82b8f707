pub mod lex;
pub mod tokens;

pub use lex::tokenize;
pub use tokens::{CharPosition, SourceSpan, Token, TokenKind};
