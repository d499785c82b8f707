//! Structural async inference. The grammar has no `async` keyword: a
//! function's async-ness is a property the parser can't observe
//! token-by-token (`parse_function`/`parse_method` in `parser.rs` always
//! produce `is_async: false`, by design — see the comment at the
//! `is_async` binding in `parse_function`). Instead, a function or method is
//! async exactly when its body structurally contains one of the operations
//! restricted to async context: `await`, `Channel<T>()` creation, a channel
//! `send`/`recv` call, or a `go` spawn. This pass runs once per merged
//! module, before type checking, and sets each `FunctionDef`/`MethodDef`'s
//! `is_async` flag accordingly so the checker's "await/channel ops/go spawn
//! only in async context" rule has something real to check against, and so
//! the emitter lowers the right functions as coroutines.

use crate::frontend::ast::nodes::*;
use crate::frontend::string_interning::StringTable;

pub fn infer_async_flags(program: &mut Program, strings: &StringTable) {
    for function in &mut program.functions {
        function.is_async = block_requires_async(&function.body, strings);
    }
    for method in &mut program.methods {
        method.is_async = block_requires_async(&method.body, strings);
    }
}

fn block_requires_async(body: &[Stmt], strings: &StringTable) -> bool {
    body.iter().any(|stmt| stmt_requires_async(stmt, strings))
}

fn stmt_requires_async(stmt: &Stmt, strings: &StringTable) -> bool {
    match &stmt.kind {
        StmtKind::VarDecl { value, .. } => expr_requires_async(value, strings),
        StmtKind::Assign { value, .. } => expr_requires_async(value, strings),
        StmtKind::FieldAssign { object, value, .. } => {
            expr_requires_async(object, strings) || expr_requires_async(value, strings)
        }
        StmtKind::Return(value) => value.as_ref().is_some_and(|v| expr_requires_async(v, strings)),
        StmtKind::If { cond, then_body, else_body } => {
            expr_requires_async(cond, strings)
                || block_requires_async(then_body, strings)
                || else_body.as_deref().is_some_and(|b| block_requires_async(b, strings))
        }
        StmtKind::While { cond, body } => {
            expr_requires_async(cond, strings) || block_requires_async(body, strings)
        }
        StmtKind::ForRange { start, end, body, .. } => {
            expr_requires_async(start, strings) || expr_requires_async(end, strings) || block_requires_async(body, strings)
        }
        StmtKind::ForEach { collection, body, .. } => {
            expr_requires_async(collection, strings) || block_requires_async(body, strings)
        }
        StmtKind::Select { .. } => true,
        StmtKind::With { resource, body, .. } => {
            expr_requires_async(resource, strings) || block_requires_async(body, strings)
        }
        StmtKind::GoSpawn(_) => true,
        StmtKind::Fail(value) => expr_requires_async(value, strings),
        StmtKind::Expr(value) => expr_requires_async(value, strings),
    }
}

fn expr_requires_async(expr: &Expr, strings: &StringTable) -> bool {
    match &expr.kind {
        ExprKind::Await(_) => true,
        ExprKind::ChannelCreate(_) => true,

        ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::NoneLiteral
        | ExprKind::CharLiteral(_)
        | ExprKind::Variable(_) => false,

        ExprKind::Binary { left, right, .. } => {
            expr_requires_async(left, strings) || expr_requires_async(right, strings)
        }
        ExprKind::Not(inner)
        | ExprKind::AddressOf(inner)
        | ExprKind::Paren(inner)
        | ExprKind::IsNone(inner) => expr_requires_async(inner, strings),

        ExprKind::ListCreate(_) => false,
        ExprKind::ListLiteral(items) => items.iter().any(|item| expr_requires_async(item, strings)),

        ExprKind::Call { args, .. } => args.iter().any(|a| expr_requires_async(a, strings)),

        ExprKind::MethodCall { object, method, args, .. } => {
            let method_name = strings.resolve(*method);
            method_name == "send"
                || method_name == "recv"
                || expr_requires_async(object, strings)
                || args.iter().any(|a| expr_requires_async(a, strings))
        }

        ExprKind::FieldAccess { object, .. } => expr_requires_async(object, strings),

        ExprKind::StructLiteral { fields, .. } => {
            fields.iter().any(|(_, value)| expr_requires_async(value, strings))
        }

        ExprKind::Fail(inner) => expr_requires_async(inner, strings),
        ExprKind::Or { inner, handler } => {
            expr_requires_async(inner, strings) || or_handler_requires_async(handler, strings)
        }
        ExprKind::Default { value, fallback } => {
            expr_requires_async(value, strings) || expr_requires_async(fallback, strings)
        }
    }
}

fn or_handler_requires_async(handler: &OrHandler, strings: &StringTable) -> bool {
    match handler {
        OrHandler::Return(value) => value.as_deref().is_some_and(|v| expr_requires_async(v, strings)),
        OrHandler::Fail(value) => expr_requires_async(value, strings),
        OrHandler::Block(stmts) => block_requires_async(stmts, strings),
        OrHandler::Match(arms) => arms.iter().any(|arm| match &arm.body {
            MatchArmBody::Expr(e) => expr_requires_async(e, strings),
            MatchArmBody::Fail(e) => expr_requires_async(e, strings),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;
    use crate::frontend::ast::parser::Parser;
    use std::path::PathBuf;

    fn parse(source: &str, strings: &mut StringTable) -> Program {
        let tokens = tokenize(source, &PathBuf::from("t.gl"), strings).unwrap();
        let mut parser = Parser::new(tokens, PathBuf::from("t.gl"));
        parser.parse_program(strings).unwrap()
    }

    #[test]
    fn a_function_creating_a_channel_is_inferred_async() {
        let mut strings = StringTable::new();
        let mut program = parse("fn main() { c := Channel<int>(); }", &mut strings);
        infer_async_flags(&mut program, &strings);
        assert!(program.functions[0].is_async);
    }

    #[test]
    fn a_function_with_no_concurrency_constructs_stays_sync() {
        let mut strings = StringTable::new();
        let mut program = parse("fn add(int a, int b) -> int { return a + b; }", &mut strings);
        infer_async_flags(&mut program, &strings);
        assert!(!program.functions[0].is_async);
    }

    #[test]
    fn a_channel_send_call_marks_its_function_async() {
        let mut strings = StringTable::new();
        let mut program = parse("fn produce(Channel<int> c) { c.send(42); }", &mut strings);
        infer_async_flags(&mut program, &strings);
        assert!(program.functions[0].is_async);
    }

    #[test]
    fn a_go_spawn_marks_its_function_async() {
        let mut strings = StringTable::new();
        let mut program = parse("fn main() { go produce(); }", &mut strings);
        infer_async_flags(&mut program, &strings);
        assert!(program.functions[0].is_async);
    }
}
