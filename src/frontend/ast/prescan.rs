//! A single pass over the token stream that collects every top-level
//! function name and every `Name :: struct` / `Name :: err` binding before
//! the parser proper runs, so later expressions can reference definitions
//! that appear further down the file.

use crate::frontend::lexer::tokens::{Token, TokenKind};
use crate::frontend::string_interning::StringId;
use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct PrescanTables {
    pub functions: FxHashSet<StringId>,
    pub structs: FxHashSet<StringId>,
    pub errors: FxHashSet<StringId>,
}

pub fn prescan(tokens: &[Token]) -> PrescanTables {
    let mut tables = PrescanTables::default();

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Fn => {
                if let Some(Token {
                    kind: TokenKind::Identifier(name),
                    ..
                }) = tokens.get(i + 1)
                {
                    tables.functions.insert(*name);
                }
            }
            TokenKind::Identifier(name) => {
                if matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::DoubleColon)) {
                    match tokens.get(i + 2).map(|t| &t.kind) {
                        Some(TokenKind::Struct) => {
                            tables.structs.insert(*name);
                        }
                        Some(TokenKind::Err) => {
                            tables.errors.insert(*name);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;
    use crate::frontend::string_interning::StringTable;
    use std::path::Path;

    #[test]
    fn collects_function_struct_and_error_names() {
        let mut strings = StringTable::new();
        let source = "Pt :: struct { x int } ParseErr :: err; fn main() { }";
        let tokens = tokenize(source, Path::new("t.gl"), &mut strings).unwrap();

        let tables = prescan(&tokens);

        assert_eq!(tables.structs.len(), 1);
        assert_eq!(tables.errors.len(), 1);
        assert_eq!(tables.functions.len(), 1);
        assert!(tables.functions.contains(&strings.get_existing("main").unwrap()));
    }
}
