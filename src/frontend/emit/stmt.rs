//! Statement lowering, including the `or`/`default`/`fail` sugar desugaring
//! (grounded on `emit_or.cpp`/`emit_fail.cpp`), the polling-loop `select`
//! (grounded on `emit_select.cpp`), and the RAII `with` guard
//! (grounded on `emit_with.cpp`).

use super::Emitter;
use crate::frontend::ast::nodes::*;

impl<'s, 'a> Emitter<'s, 'a> {
    pub(super) fn lower_block(&mut self, stmts: &[Stmt], indent: usize) -> String {
        let mut out = String::new();
        for stmt in stmts {
            out.push_str(&self.lower_stmt(stmt, indent));
        }
        out
    }

    fn pad(indent: usize) -> String {
        "\t".repeat(indent)
    }

    /// `co_return` inside an async function/method (the only context where
    /// the enclosing signature is actually a coroutine), plain `return`
    /// otherwise.
    fn return_kw(&self) -> &'static str {
        if self.in_async { "co_return" } else { "return" }
    }

    pub(super) fn lower_stmt(&mut self, stmt: &Stmt, indent: usize) -> String {
        let pad = Self::pad(indent);
        match &stmt.kind {
            StmtKind::VarDecl { name, declared_type, value } => self.lower_var_decl(*name, declared_type.as_ref(), value, &pad),

            StmtKind::Assign { name, value } => {
                if let ExprKind::Or { inner, handler } = &value.kind {
                    self.lower_or_onto_lvalue(self.strings.resolve(*name).to_string(), inner, handler, &pad)
                } else {
                    format!("{pad}{} = {};\n", self.strings.resolve(*name), self.lower_expr(value))
                }
            }

            StmtKind::FieldAssign { object, field, value } => {
                let target = format!("{}.{}", self.lower_expr(object), self.strings.resolve(*field));
                if let ExprKind::Or { inner, handler } = &value.kind {
                    self.lower_or_onto_lvalue(target, inner, handler, &pad)
                } else {
                    format!("{pad}{target} = {};\n", self.lower_expr(value))
                }
            }

            StmtKind::Return(value) => self.lower_return(value.as_ref(), &pad),

            StmtKind::If { cond, then_body, else_body } => {
                let mut out = format!("{pad}if ({}) {{\n", self.lower_expr(cond));
                out.push_str(&self.lower_block(then_body, indent + 1));
                out.push_str(&format!("{pad}}}"));
                if let Some(else_body) = else_body {
                    out.push_str(" else {\n");
                    out.push_str(&self.lower_block(else_body, indent + 1));
                    out.push_str(&format!("{pad}}}"));
                }
                out.push('\n');
                out
            }

            StmtKind::While { cond, body } => {
                let mut out = format!("{pad}while ({}) {{\n", self.lower_expr(cond));
                out.push_str(&self.lower_block(body, indent + 1));
                out.push_str(&format!("{pad}}}\n"));
                out
            }

            StmtKind::ForRange { var, start, end, body } => {
                let var = self.strings.resolve(*var).to_string();
                let start = self.lower_expr(start);
                let end = self.lower_expr(end);
                let mut out = format!("{pad}for (int {var} = {start}; {var} < {end}; {var}++) {{\n");
                out.push_str(&self.lower_block(body, indent + 1));
                out.push_str(&format!("{pad}}}\n"));
                out
            }

            StmtKind::ForEach { var, collection, body } => {
                let var = self.strings.resolve(*var).to_string();
                let collection = self.lower_expr(collection);
                let mut out = format!("{pad}for (auto& {var} : {collection}) {{\n");
                out.push_str(&self.lower_block(body, indent + 1));
                out.push_str(&format!("{pad}}}\n"));
                out
            }

            StmtKind::Select { cases } => self.lower_select(cases, &pad, indent),

            StmtKind::With { resource, name, body } => self.lower_with(resource, *name, body, &pad, indent),

            StmtKind::GoSpawn(call) => {
                format!("{pad}boost::fibers::fiber([&]() {{ {}; }}).detach();\n", self.lower_expr(call))
            }

            StmtKind::Fail(err) => format!("{pad}{};\n", self.fail_value(err)),

            StmtKind::Expr(expr) => format!("{pad}{};\n", self.lower_expr(expr)),
        }
    }

    fn lower_var_decl(&mut self, name: crate::frontend::string_interning::StringId, declared_type: Option<&TypeExpr>, value: &Expr, pad: &str) -> String {
        let var_name = self.strings.resolve(name).to_string();
        if let ExprKind::Or { inner, handler } = &value.kind {
            return self.lower_or_var_decl(&var_name, declared_type, inner, handler, pad);
        }
        let value_text = self.lower_expr(value);
        match declared_type {
            Some(ty) => format!("{pad}{} {} = {};\n", super::lower_type(ty, self.strings), var_name, value_text),
            None => format!("{pad}auto {var_name} = {value_text};\n"),
        }
    }

    fn lower_return(&mut self, value: Option<&Expr>, pad: &str) -> String {
        let kw = self.return_kw();
        match value {
            None => format!("{pad}{kw};\n"),
            Some(expr) => match &expr.kind {
                ExprKind::Fail(err) => {
                    if self.in_fallible {
                        format!("{pad}{kw} glint::rt::fail({});\n", self.fail_value_inner(err))
                    } else {
                        format!("{pad}{};\n", self.fail_value(err))
                    }
                }
                ExprKind::Or { inner, handler } => self.lower_or_return(inner, handler, pad),
                _ => {
                    let value_text = self.lower_expr(expr);
                    if self.in_fallible {
                        format!("{pad}{kw} glint::rt::ok({value_text});\n")
                    } else {
                        format!("{pad}{kw} {value_text};\n")
                    }
                }
            },
        }
    }

    /// `fail Error{...}` as used inside an `or`/`match err` arm: the error
    /// value that the caller wraps appropriately for its own context. A bare
    /// `shared_ptr<glint::rt::Error>`-typed expression, not yet lifted into
    /// `glint::rt::fail(...)`.
    fn fail_value_inner(&mut self, err: &Expr) -> String {
        self.build_error_payload(err)
    }

    /// Constructs the `shared_ptr<glint::rt::Error>` a `fail` payload lowers
    /// to, matching `emit_fail.cpp`'s split: a bare string literal becomes
    /// the base `glint::rt::Error`; a struct literal naming a known error
    /// type becomes a constructor call on that type, cast back to the base;
    /// anything else (a variable, a call, ...) is assumed to already be a
    /// `shared_ptr<glint::rt::Error>`-compatible expression and passed through.
    fn build_error_payload(&mut self, err: &Expr) -> String {
        match &err.kind {
            ExprKind::StringLiteral(_) => {
                let value_text = self.lower_expr(err);
                format!("std::make_shared<glint::rt::Error>({value_text})")
            }
            ExprKind::StructLiteral { name, fields } if self.symbols.errors.contains_key(name) => {
                self.lower_error_struct_literal(*name, fields)
            }
            _ => self.lower_expr(err),
        }
    }

    /// `ErrorType{message: ..., field: ..., cause: ...}` -> a positional
    /// constructor call matching `lower_error_def`'s generated signature
    /// `(msg, field1_, field2_, ..., cause_ = nullptr)`, cast to the base
    /// `glint::rt::Error` so it fits wherever a plain error value is
    /// expected. Grounded on `emit_fail.cpp`'s field extraction (message
    /// first, declared extras in order, cause last).
    fn lower_error_struct_literal(&mut self, name: crate::frontend::string_interning::StringId, fields: &[(crate::frontend::string_interning::StringId, Expr)]) -> String {
        let type_name = self.strings.resolve(name).to_string();
        let find_field = |fields: &[(crate::frontend::string_interning::StringId, Expr)], strings: &crate::frontend::string_interning::StringTable, field_name: &str| {
            fields.iter().find(|(n, _)| strings.resolve(*n) == field_name).map(|(_, v)| v)
        };

        let message_text = match find_field(fields, self.strings, "message") {
            Some(value) => self.lower_expr(value),
            None => "std::string()".to_string(),
        };

        let mut args = vec![message_text];
        let extra_fields = self.symbols.errors.get(&name).map(|def| def.fields.clone()).unwrap_or_default();
        for field_def in &extra_fields {
            let field_name = self.strings.resolve(field_def.name).to_string();
            let arg = match find_field(fields, self.strings, &field_name) {
                Some(value) => self.lower_expr(value),
                None => format!("{}{{}}", super::lower_type(&field_def.ty, self.strings)),
            };
            args.push(arg);
        }

        if let Some(value) = find_field(fields, self.strings, "cause") {
            args.push(self.lower_expr(value));
        }

        format!(
            "std::static_pointer_cast<glint::rt::Error>(std::make_shared<{}>({}))",
            type_name,
            args.join(", ")
        )
    }

    /// The error value itself, wrapped for a failed `Result`: constructs the
    /// error payload and lifts it into `glint::rt::fail(...)`.
    pub(super) fn fail_expr(&mut self, err: &Expr) -> String {
        let payload = self.build_error_payload(err);
        format!("glint::rt::fail({payload})")
    }

    /// `fail Error{...}` as a standalone statement, matching
    /// `emit_fail.cpp`'s direct-return lowering.
    pub(super) fn fail_value(&mut self, err: &Expr) -> String {
        format!("return {}", self.fail_expr(err))
    }

    /// Flat `or` desugaring shared by var-decl/return/assignment positions:
    /// `auto _or_tmpN = <inner>; if (_or_tmpN.is_error()) { <handler> }`.
    /// Returns the statement text; the success path is left to the caller,
    /// which still has `temp.value()` available under the returned name.
    pub(super) fn lower_or_prelude(&mut self, inner: &Expr, handler: &OrHandler, pad: &str) -> (String, String) {
        let temp = self.next_temp();
        let call = self.lower_expr(inner);
        let mut out = format!("{pad}auto {temp} = {call};\n{pad}if ({temp}.is_error()) {{\n");

        match handler {
            OrHandler::Return(value) => {
                let value_text = value.as_ref().map(|v| self.lower_expr(v));
                let kw = self.return_kw();
                match value_text {
                    Some(v) if self.in_fallible => out.push_str(&format!("{pad}\t{kw} glint::rt::ok({v});\n")),
                    Some(v) => out.push_str(&format!("{pad}\t{kw} {v};\n")),
                    None => out.push_str(&format!("{pad}\t{kw};\n")),
                }
            }
            OrHandler::Fail(err) => {
                out.push_str(&format!("{pad}\t{};\n", self.fail_value(err)));
            }
            OrHandler::Block(stmts) => {
                out.push_str(&self.lower_block(stmts, (pad.len()) + 1));
            }
            OrHandler::Match(arms) => {
                out.push_str(&self.lower_match_arms(&temp, arms, pad, None));
            }
        }

        out.push_str(&format!("{pad}}}\n"));
        (out, temp)
    }

    fn lower_or_var_decl(&mut self, var_name: &str, declared_type: Option<&TypeExpr>, inner: &Expr, handler: &OrHandler, pad: &str) -> String {
        if let OrHandler::Match(arms) = handler {
            // Arms may assign rather than produce one shared value expression,
            // so the variable is pre-declared and each arm assigns into it.
            let temp = self.next_temp();
            let call = self.lower_expr(inner);
            let decl_ty = declared_type
                .map(|t| super::lower_type(t, self.strings))
                .unwrap_or_else(|| format!("decltype({temp}.value())"));
            let mut out = format!("{pad}{decl_ty} {var_name};\n");
            out.push_str(&format!("{pad}auto {temp} = {call};\n{pad}if ({temp}.is_error()) {{\n"));
            out.push_str(&self.lower_match_arms(&temp, arms, pad, Some(var_name)));
            out.push_str(&format!("{pad}}} else {{\n{pad}\t{var_name} = {temp}.value();\n{pad}}}\n"));
            return out;
        }

        let (prelude, temp) = self.lower_or_prelude(inner, handler, pad);
        let mut out = prelude;
        match declared_type {
            Some(ty) => out.push_str(&format!("{pad}{} {var_name} = {temp}.value();\n", super::lower_type(ty, self.strings))),
            None => out.push_str(&format!("{pad}auto {var_name} = {temp}.value();\n")),
        }
        out
    }

    fn lower_or_onto_lvalue(&mut self, target: String, inner: &Expr, handler: &OrHandler, pad: &str) -> String {
        let (prelude, temp) = self.lower_or_prelude(inner, handler, pad);
        let mut out = prelude;
        out.push_str(&format!("{pad}{target} = {temp}.value();\n"));
        out
    }

    fn lower_or_return(&mut self, inner: &Expr, handler: &OrHandler, pad: &str) -> String {
        let (prelude, temp) = self.lower_or_prelude(inner, handler, pad);
        let mut out = prelude;
        let kw = self.return_kw();
        if self.in_fallible {
            out.push_str(&format!("{pad}{kw} glint::rt::ok({temp}.value());\n"));
        } else {
            out.push_str(&format!("{pad}{kw} {temp}.value();\n"));
        }
        out
    }

    /// `or`/`fail` as a bare sub-expression, not a var-decl/return/assignment
    /// value: wrapped as an immediately-invoked lambda so it still produces a
    /// value in place. `Return`/`Fail`/`Match` handlers can only exit this
    /// lambda, not the enclosing function — bare-sub-expression `or return`
    /// nested inside a larger expression can't unwind further than that
    /// without a continuation-passing rewrite of the surrounding expression.
    pub(super) fn lower_or_as_expression(&mut self, inner: &Expr, handler: &OrHandler) -> String {
        let temp = self.next_temp();
        let call = self.lower_expr(inner);
        let mut body = format!("auto {temp} = {call}; if ({temp}.is_error()) {{ ");

        match handler {
            OrHandler::Return(Some(value)) => {
                let value_text = self.lower_expr(value);
                body.push_str(&format!("return {value_text}; "));
            }
            OrHandler::Return(None) => {
                body.push_str(&format!("return decltype({temp}.value())(); "));
            }
            OrHandler::Fail(err) => {
                let fail_text = self.fail_expr(err);
                body.push_str(&format!("throw {fail_text}; "));
            }
            OrHandler::Block(stmts) => {
                body.push_str(&self.lower_block(stmts, 0).replace('\n', " "));
            }
            OrHandler::Match(arms) => {
                body.push_str(&self.lower_match_arms_inline(&temp, arms));
            }
        }

        body.push_str(&format!("}} return {temp}.value(); "));
        format!("[&]() {{ {body} }}()")
    }

    /// Like `lower_match_arms`, but for the inline-lambda context
    /// `lower_or_as_expression` builds: plain `return`/`throw` instead of
    /// `co_return`/the statement-level `fail_value` return.
    fn lower_match_arms_inline(&mut self, temp: &str, arms: &[MatchArm]) -> String {
        let mut out = String::new();
        for (i, arm) in arms.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "} else if" };
            match arm.error_type {
                Some(ty) => {
                    let ty_name = self.strings.resolve(ty).to_string();
                    out.push_str(&format!("{keyword} (auto* _err = dynamic_cast<{ty_name}*>({temp}.error().get())) {{ "));
                }
                None => out.push_str(&format!("{keyword} (true) {{ ")),
            }
            match &arm.body {
                MatchArmBody::Expr(expr) => {
                    let value_text = self.lower_expr(expr);
                    out.push_str(&format!("return {value_text}; "));
                }
                MatchArmBody::Fail(err) => {
                    let fail_text = self.fail_expr(err);
                    out.push_str(&format!("throw {fail_text}; "));
                }
            }
        }
        out.push_str("} ");
        out
    }

    /// `match err { SomeError e => ..., _ => ... }`: a `dynamic_cast`
    /// cascade over the temp's stored error pointer. When `assign_into` is
    /// set, `Expr` arm bodies assign into that variable instead of trying to
    /// produce a single shared value for the whole match.
    fn lower_match_arms(&mut self, temp: &str, arms: &[MatchArm], pad: &str, assign_into: Option<&str>) -> String {
        let mut out = String::new();
        for (i, arm) in arms.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "} else if" };
            match arm.error_type {
                Some(ty) => {
                    let ty_name = self.strings.resolve(ty).to_string();
                    out.push_str(&format!("{pad}\t{keyword} (auto* _err = dynamic_cast<{ty_name}*>({temp}.error().get())) {{\n"));
                }
                None => out.push_str(&format!("{pad}\t{keyword} (true) {{\n")),
            }
            match &arm.body {
                MatchArmBody::Expr(expr) => {
                    let value_text = self.lower_expr(expr);
                    let kw = self.return_kw();
                    match assign_into {
                        Some(var) => out.push_str(&format!("{pad}\t\t{var} = {value_text};\n")),
                        None if self.in_fallible => out.push_str(&format!("{pad}\t\t{kw} glint::rt::ok({value_text});\n")),
                        None => out.push_str(&format!("{pad}\t\t{kw} {value_text};\n")),
                    }
                }
                MatchArmBody::Fail(err) => {
                    out.push_str(&format!("{pad}\t\t{};\n", self.fail_value(err)));
                }
            }
        }
        out.push_str(&format!("{pad}\t}}\n"));
        out
    }

    /// `with res as name { body }`: binds the resource to a local, then
    /// installs a local guard type whose destructor calls `name.close()` so
    /// it runs on every exit path out of `body` (return, `fail`, break,
    /// exception) the way a C++ destructor does. Grounded on `emit_with.cpp`'s
    /// scoped-acquisition lowering.
    fn lower_with(&mut self, resource: &Expr, name: crate::frontend::string_interning::StringId, body: &[Stmt], pad: &str, indent: usize) -> String {
        let var_name = self.strings.resolve(name).to_string();
        let guard_type = format!("_with_guard_{var_name}");
        let resource_text = self.lower_expr(resource);

        let mut out = format!("{pad}{{\n");
        out.push_str(&format!("{pad}\tauto {var_name} = {resource_text};\n"));
        out.push_str(&format!("{pad}\tstruct {guard_type} {{\n"));
        out.push_str(&format!("{pad}\t\tdecltype({var_name})& _res;\n"));
        out.push_str(&format!("{pad}\t\t~{guard_type}() {{ _res.close(); }}\n"));
        out.push_str(&format!("{pad}\t}} _guard_{var_name}{{{var_name}}};\n"));
        out.push_str(&self.lower_block(body, indent + 1));
        out.push_str(&format!("{pad}}}\n"));
        out
    }

    /// Polling-loop `select`: round-robins `try_recv`/`try_send` on each
    /// case's channel, yielding the fiber scheduler between passes until one
    /// case is ready. Grounded on `emit_select.cpp`'s chosen variant over the
    /// competing `asio::experimental::awaitable_operators` disjunction.
    fn lower_select(&mut self, cases: &[SelectCase], pad: &str, indent: usize) -> String {
        let mut out = format!("{pad}while (true) {{\n");
        for case in cases {
            let channel = self.lower_expr(&case.channel);
            match case.operation {
                SelectOp::Recv => {
                    let temp = self.next_temp();
                    out.push_str(&format!("{pad}\t{{\n{pad}\t\tauto {temp} = {channel}.try_recv();\n{pad}\t\tif ({temp}.has_value()) {{\n"));
                    if let Some(binding) = case.binding {
                        out.push_str(&format!("{pad}\t\t\tauto {} = {temp}.value();\n", self.strings.resolve(binding)));
                    }
                    out.push_str(&self.lower_block(&case.body, indent + 3));
                    out.push_str(&format!("{pad}\t\t\tbreak;\n{pad}\t\t}}\n{pad}\t}}\n"));
                }
                SelectOp::Send => {
                    let value = case.send_value.as_ref().map(|v| self.lower_expr(v)).unwrap_or_default();
                    let ok = self.next_temp();
                    out.push_str(&format!("{pad}\t{{\n{pad}\t\tauto {ok} = {channel}.try_send({value});\n{pad}\t\tif ({ok}) {{\n"));
                    out.push_str(&self.lower_block(&case.body, indent + 3));
                    out.push_str(&format!("{pad}\t\t\tbreak;\n{pad}\t\t}}\n{pad}\t}}\n"));
                }
            }
        }
        out.push_str(&format!("{pad}\tboost::this_fiber::yield();\n{pad}}}\n"));
        out
    }
}
