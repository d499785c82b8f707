//! Two-pass type checker: Collect populates the global symbol tables and
//! flags duplicate definitions, Validate walks every function/method body
//! typing each expression and statement against those tables. Type errors
//! accumulate in `CompilerMessages` rather than halting the walk.

pub mod builtins_tables;
pub mod types;

use crate::frontend::ast::nodes::*;
use crate::frontend::errors::{CompileError, CompilerMessages};
use crate::frontend::lexer::tokens::SourceSpan;
use crate::frontend::module_loader::{Module, ModuleLoader};
use crate::frontend::string_interning::{StringId, StringTable};
use crate::frontend::dev_log::type_log;
use crate::push_type_error;
use builtins_tables::{lookup, str_method_return, CHANNEL_METHODS, LIST_METHODS, STR_METHODS};
use types::{assignable, type_expr_to_info, GlobalSymbols, ScopeStack};

pub struct TypeCheckOutput<'a> {
    pub symbols: GlobalSymbols<'a>,
    pub messages: CompilerMessages,
}

pub struct TypeChecker<'s> {
    strings: &'s StringTable,
}

impl<'s> TypeChecker<'s> {
    pub fn new(strings: &'s StringTable) -> Self {
        Self { strings }
    }

    pub fn check<'a>(
        &mut self,
        module: &'a Module,
        loader: &'a ModuleLoader,
    ) -> Result<TypeCheckOutput<'a>, CompileError> {
        let mut errors = Vec::new();
        let mut symbols = GlobalSymbols::default();
        self.collect(module, loader, &mut symbols, &mut errors);

        for function in &module.merged_program.functions {
            self.validate_function(function, &symbols, &mut errors);
        }
        for method in &module.merged_program.methods {
            self.validate_method(method, &symbols, &mut errors);
        }

        Ok(TypeCheckOutput {
            symbols,
            messages: CompilerMessages { errors, warnings: Vec::new() },
        })
    }

    fn collect<'a>(
        &self,
        module: &'a Module,
        loader: &'a ModuleLoader,
        symbols: &mut GlobalSymbols<'a>,
        errors: &mut Vec<CompileError>,
    ) {
        let program = &module.merged_program;

        for s in &program.structs {
            self.insert_unique(&mut symbols.structs, s.name, s, s.span.clone(), errors);
        }
        for e in &program.errors {
            if symbols.structs.contains_key(&e.name) {
                push_type_error!(
                    errors,
                    format!("'{}' is already defined as a struct", self.strings.resolve(e.name)),
                    e.span.clone()
                );
                continue;
            }
            self.insert_unique(&mut symbols.errors, e.name, e, e.span.clone(), errors);
        }
        for f in &program.functions {
            self.insert_unique(&mut symbols.functions, f.name, f, f.span.clone(), errors);
        }
        for x in &program.externs {
            if symbols.functions.contains_key(&x.name) {
                push_type_error!(
                    errors,
                    format!("'{}' is already defined as a function", self.strings.resolve(x.name)),
                    x.span.clone()
                );
                continue;
            }
            self.insert_unique(&mut symbols.externs, x.name, x, x.span.clone(), errors);
        }
        for m in &program.methods {
            let owned = symbols.methods.entry(m.owner).or_default();
            if owned.iter().any(|existing: &&MethodDef| existing.name == m.name) {
                push_type_error!(
                    errors,
                    format!(
                        "method '{}' is already defined on '{}'",
                        self.strings.resolve(m.name),
                        self.strings.resolve(m.owner)
                    ),
                    m.span.clone()
                );
                continue;
            }
            owned.push(m);
        }

        for import in &program.imports {
            let path_string = import
                .dotted_path
                .iter()
                .map(|s| self.strings.resolve(*s).to_string())
                .collect::<Vec<_>>()
                .join(".");
            match loader.get(&path_string) {
                Some(imported) => {
                    symbols.imported_modules.insert(import.alias, imported.clone());
                }
                None => push_type_error!(
                    errors,
                    format!("module '{path_string}' was not loaded"),
                    import.span.clone()
                ),
            }
        }
    }

    fn insert_unique<'a, T>(
        &self,
        map: &mut rustc_hash::FxHashMap<StringId, &'a T>,
        name: StringId,
        item: &'a T,
        span: SourceSpan,
        errors: &mut Vec<CompileError>,
    ) {
        if map.contains_key(&name) {
            push_type_error!(
                errors,
                format!("'{}' is already defined", self.strings.resolve(name)),
                span
            );
        } else {
            map.insert(name, item);
        }
    }

    fn validate_function(&self, f: &FunctionDef, symbols: &GlobalSymbols, errors: &mut Vec<CompileError>) {
        type_log!("checking function {}", self.strings.resolve(f.name));
        let mut scope = ScopeStack::new();
        for param in &f.params {
            scope.declare(param.name, type_expr_to_info(&param.ty, self.strings));
        }
        let ctx = FnContext {
            current_return: f.return_type.as_ref().map(|t| type_expr_to_info(t, self.strings)),
            current_error_type: f.error_type,
            is_async: f.is_async,
        };
        self.check_block(&f.body, &mut scope, &ctx, symbols, errors);

        if f.return_type.is_some() && !f.return_type.as_ref().unwrap().optional && !block_always_returns(&f.body) {
            push_type_error!(
                errors,
                format!("function '{}' does not return on all paths", self.strings.resolve(f.name)),
                f.span.clone(),
                { SymbolName => self.strings.resolve(f.name).to_string() }
            );
        }
    }

    fn validate_method(&self, m: &MethodDef, symbols: &GlobalSymbols, errors: &mut Vec<CompileError>) {
        type_log!(
            "checking method {}.{}",
            self.strings.resolve(m.owner),
            self.strings.resolve(m.name)
        );
        if m.params.is_empty() {
            push_type_error!(
                errors,
                format!("method '{}' must take 'self' as its first parameter", self.strings.resolve(m.name)),
                m.span.clone()
            );
            return;
        }

        let mut scope = ScopeStack::new();
        for param in &m.params {
            scope.declare(param.name, type_expr_to_info(&param.ty, self.strings));
        }
        let ctx = FnContext {
            current_return: m.return_type.as_ref().map(|t| type_expr_to_info(t, self.strings)),
            current_error_type: m.error_type,
            is_async: m.is_async,
        };
        self.check_block(&m.body, &mut scope, &ctx, symbols, errors);

        if m.return_type.is_some() && !m.return_type.as_ref().unwrap().optional && !block_always_returns(&m.body) {
            push_type_error!(
                errors,
                format!(
                    "method '{}.{}' does not return on all paths",
                    self.strings.resolve(m.owner),
                    self.strings.resolve(m.name)
                ),
                m.span.clone()
            );
        }
    }

    fn check_block(
        &self,
        body: &[Stmt],
        scope: &mut ScopeStack,
        ctx: &FnContext,
        symbols: &GlobalSymbols,
        errors: &mut Vec<CompileError>,
    ) {
        scope.push();
        for stmt in body {
            self.check_stmt(stmt, scope, ctx, symbols, errors);
        }
        scope.pop();
    }

    fn check_stmt(
        &self,
        stmt: &Stmt,
        scope: &mut ScopeStack,
        ctx: &FnContext,
        symbols: &GlobalSymbols,
        errors: &mut Vec<CompileError>,
    ) {
        match &stmt.kind {
            StmtKind::VarDecl { name, declared_type, value } => {
                let value_type = self.infer_expr(value, scope, ctx, symbols, errors);
                let declared = declared_type.as_ref().map(|t| type_expr_to_info(t, self.strings));
                if let Some(declared) = &declared {
                    if !assignable(&value_type, declared) {
                        self.mismatch(errors, stmt.span.clone(), declared, &value_type);
                    }
                }
                let final_type = declared.unwrap_or(value_type);
                if !scope.declare(*name, final_type) {
                    push_type_error!(
                        errors,
                        format!("'{}' is already declared in this scope", self.strings.resolve(*name)),
                        stmt.span.clone()
                    );
                }
            }
            StmtKind::Assign { name, value } => {
                let value_type = self.infer_expr(value, scope, ctx, symbols, errors);
                match scope.lookup(*name).cloned() {
                    Some(existing) => {
                        if !assignable(&value_type, &existing) {
                            self.mismatch(errors, stmt.span.clone(), &existing, &value_type);
                        }
                    }
                    None => push_type_error!(
                        errors,
                        format!("undefined variable '{}'", self.strings.resolve(*name)),
                        stmt.span.clone(),
                        { SymbolName => self.strings.resolve(*name).to_string() }
                    ),
                }
            }
            StmtKind::FieldAssign { object, field, value } => {
                let object_type = self.infer_expr(object, scope, ctx, symbols, errors);
                let value_type = self.infer_expr(value, scope, ctx, symbols, errors);
                if let Some(field_type) = self.field_type(&object_type, *field, symbols) {
                    if !assignable(&value_type, &field_type) {
                        self.mismatch(errors, stmt.span.clone(), &field_type, &value_type);
                    }
                } else {
                    push_type_error!(
                        errors,
                        format!(
                            "'{}' has no field '{}'",
                            object_type.base,
                            self.strings.resolve(*field)
                        ),
                        stmt.span.clone()
                    );
                }
            }
            StmtKind::Return(value) => {
                let actual = value
                    .as_ref()
                    .map(|v| self.infer_expr(v, scope, ctx, symbols, errors))
                    .unwrap_or_else(TypeInfo::void);
                match &ctx.current_return {
                    Some(expected) => {
                        if !assignable(&actual, expected) {
                            self.mismatch(errors, stmt.span.clone(), expected, &actual);
                        }
                    }
                    None if value.is_some() => push_type_error!(
                        errors,
                        "returning a value from a function with no declared return type",
                        stmt.span.clone()
                    ),
                    None => {}
                }
            }
            StmtKind::If { cond, then_body, else_body } => {
                let cond_type = self.infer_expr(cond, scope, ctx, symbols, errors);
                self.expect_bool(&cond_type, stmt.span.clone(), errors);
                self.check_block(then_body, scope, ctx, symbols, errors);
                if let Some(else_body) = else_body {
                    self.check_block(else_body, scope, ctx, symbols, errors);
                }
            }
            StmtKind::While { cond, body } => {
                let cond_type = self.infer_expr(cond, scope, ctx, symbols, errors);
                self.expect_bool(&cond_type, stmt.span.clone(), errors);
                self.check_block(body, scope, ctx, symbols, errors);
            }
            StmtKind::ForRange { var, start, end, body } => {
                let start_type = self.infer_expr(start, scope, ctx, symbols, errors);
                let end_type = self.infer_expr(end, scope, ctx, symbols, errors);
                if start_type.base != "int" || end_type.base != "int" {
                    push_type_error!(errors, "for-range bounds must be 'int'", stmt.span.clone());
                }
                scope.push();
                scope.declare(*var, TypeInfo::new("int"));
                for s in body {
                    self.check_stmt(s, scope, ctx, symbols, errors);
                }
                scope.pop();
            }
            StmtKind::ForEach { var, collection, body } => {
                let collection_type = self.infer_expr(collection, scope, ctx, symbols, errors);
                let element_type = element_type_of(&collection_type);
                scope.push();
                scope.declare(*var, element_type);
                for s in body {
                    self.check_stmt(s, scope, ctx, symbols, errors);
                }
                scope.pop();
            }
            StmtKind::Select { cases } => {
                if !ctx.is_async {
                    push_type_error!(errors, "'select' is only valid inside an async function", stmt.span.clone());
                }
                for case in cases {
                    let channel_type = self.infer_expr(&case.channel, scope, ctx, symbols, errors);
                    scope.push();
                    if let Some(binding) = case.binding {
                        scope.declare(binding, element_type_of(&channel_type));
                    }
                    if let Some(send_value) = &case.send_value {
                        self.infer_expr(send_value, scope, ctx, symbols, errors);
                    }
                    for s in &case.body {
                        self.check_stmt(s, scope, ctx, symbols, errors);
                    }
                    scope.pop();
                }
            }
            StmtKind::With { resource, name, body } => {
                let resource_type = self.infer_expr(resource, scope, ctx, symbols, errors);
                scope.push();
                scope.declare(*name, resource_type);
                for s in body {
                    self.check_stmt(s, scope, ctx, symbols, errors);
                }
                scope.pop();
            }
            StmtKind::GoSpawn(expr) => {
                if !matches!(expr.kind, ExprKind::Call { .. } | ExprKind::MethodCall { .. }) {
                    push_type_error!(errors, "'go' must spawn a function or method call", stmt.span.clone());
                }
                self.infer_expr(expr, scope, ctx, symbols, errors);
            }
            StmtKind::Fail(expr) => {
                if ctx.current_error_type.is_none() {
                    push_type_error!(errors, "'fail' used in a function with no declared error type", stmt.span.clone());
                }
                self.infer_expr(expr, scope, ctx, symbols, errors);
            }
            StmtKind::Expr(expr) => {
                self.infer_expr(expr, scope, ctx, symbols, errors);
            }
        }
    }

    fn infer_expr(
        &self,
        expr: &Expr,
        scope: &mut ScopeStack,
        ctx: &FnContext,
        symbols: &GlobalSymbols,
        errors: &mut Vec<CompileError>,
    ) -> TypeInfo {
        match &expr.kind {
            ExprKind::IntLiteral(_) => TypeInfo::new("int"),
            ExprKind::FloatLiteral(_) => TypeInfo::new("f64"),
            ExprKind::StringLiteral(_) => TypeInfo::new("str"),
            ExprKind::BoolLiteral(_) => TypeInfo::new("bool"),
            ExprKind::CharLiteral(_) => TypeInfo::new("char"),
            ExprKind::NoneLiteral => TypeInfo::new("none"),

            ExprKind::Variable(name) => {
                if let Some(found) = scope.lookup(*name) {
                    return found.clone();
                }
                if let Some(func) = symbols.functions.get(name) {
                    return TypeInfo::new(format!("fn:{}", self.strings.resolve(func.name)));
                }
                if let Some(x) = symbols.externs.get(name) {
                    return TypeInfo::new(format!("fn:{}", self.strings.resolve(x.name)));
                }
                if symbols.imported_modules.contains_key(name) {
                    return TypeInfo::new(format!("module:{}", self.strings.resolve(*name)));
                }
                push_type_error!(
                    errors,
                    format!("undefined variable '{}'", self.strings.resolve(*name)),
                    expr.span.clone(),
                    { SymbolName => self.strings.resolve(*name).to_string() }
                );
                TypeInfo::unknown()
            }

            ExprKind::Binary { op, left, right } => {
                let lt = self.infer_expr(left, scope, ctx, symbols, errors);
                let rt = self.infer_expr(right, scope, ctx, symbols, errors);
                if op.is_comparison() {
                    if !assignable(&lt, &rt) && !assignable(&rt, &lt) {
                        self.mismatch(errors, expr.span.clone(), &lt, &rt);
                    }
                    return TypeInfo::new("bool");
                }
                if *op == BinaryOp::Add && lt.base == "str" && rt.base == "str" {
                    return TypeInfo::new("str");
                }
                if !assignable(&rt, &lt) {
                    self.mismatch(errors, expr.span.clone(), &lt, &rt);
                }
                lt
            }
            ExprKind::Not(inner) => {
                let it = self.infer_expr(inner, scope, ctx, symbols, errors);
                self.expect_bool(&it, expr.span.clone(), errors);
                TypeInfo::new("bool")
            }
            ExprKind::AddressOf(inner) => self.infer_expr(inner, scope, ctx, symbols, errors),
            ExprKind::Paren(inner) => self.infer_expr(inner, scope, ctx, symbols, errors),
            ExprKind::IsNone(inner) => {
                let it = self.infer_expr(inner, scope, ctx, symbols, errors);
                if !it.optional {
                    push_type_error!(errors, "'is none' used on a non-optional value", expr.span.clone());
                }
                TypeInfo::new("bool")
            }
            ExprKind::Await(inner) => {
                if !ctx.is_async {
                    push_type_error!(errors, "'await' is only valid inside an async function", expr.span.clone());
                }
                let it = self.infer_expr(inner, scope, ctx, symbols, errors);
                if !it.awaitable && it.base != "unknown" {
                    push_type_error!(errors, "'await' used on a non-awaitable value", expr.span.clone());
                }
                TypeInfo {
                    base: it.base,
                    optional: it.optional,
                    is_void: it.is_void,
                    awaitable: false,
                }
            }

            ExprKind::ChannelCreate(ty) => {
                if !ctx.is_async {
                    push_type_error!(errors, "'Channel<T>()' is only valid inside an async function", expr.span.clone());
                }
                let inner = type_expr_to_info(ty, self.strings);
                TypeInfo::new(format!("Channel<{}>", inner.base))
            }
            ExprKind::ListCreate(ty) => {
                let inner = type_expr_to_info(ty, self.strings);
                TypeInfo::new(format!("List<{}>", inner.base))
            }
            ExprKind::ListLiteral(items) => {
                if items.is_empty() {
                    return TypeInfo::new("List<unknown>");
                }
                let first = self.infer_expr(&items[0], scope, ctx, symbols, errors);
                for item in &items[1..] {
                    let t = self.infer_expr(item, scope, ctx, symbols, errors);
                    if !assignable(&t, &first) {
                        self.mismatch(errors, item.span.clone(), &first, &t);
                    }
                }
                TypeInfo::new(format!("List<{}>", first.base))
            }

            ExprKind::Call { callee, args } => {
                let arg_types: Vec<TypeInfo> =
                    args.iter().map(|a| self.infer_expr(a, scope, ctx, symbols, errors)).collect();

                let callee_name = self.strings.resolve(*callee);
                if callee_name == "print" {
                    return TypeInfo::void();
                }
                if callee_name == "assert_eq" {
                    if arg_types.len() != 2 {
                        push_type_error!(
                            errors,
                            "'assert_eq' expects 2 arguments".to_string(),
                            expr.span.clone()
                        );
                    }
                    return TypeInfo::void();
                }

                if let Some(func) = symbols.functions.get(callee).copied() {
                    self.check_call_arity_and_args(
                        callee,
                        &func.params,
                        &arg_types,
                        expr.span.clone(),
                        errors,
                    );
                    let ret = func
                        .return_type
                        .as_ref()
                        .map(|t| type_expr_to_info(t, self.strings))
                        .unwrap_or_else(TypeInfo::void);
                    return if func.is_async { ret.awaitable() } else { ret };
                }
                if let Some(x) = symbols.externs.get(callee).copied() {
                    self.check_call_arity_and_args(callee, &x.params, &arg_types, expr.span.clone(), errors);
                    return x
                        .return_type
                        .as_ref()
                        .map(|t| type_expr_to_info(t, self.strings))
                        .unwrap_or_else(TypeInfo::void);
                }
                if let Some(local) = scope.lookup(*callee).cloned() {
                    if local.base.starts_with("fn(") {
                        return TypeInfo::unknown();
                    }
                }
                push_type_error!(
                    errors,
                    format!("call to undefined function '{}'", self.strings.resolve(*callee)),
                    expr.span.clone(),
                    { SymbolName => self.strings.resolve(*callee).to_string() }
                );
                TypeInfo::unknown()
            }

            ExprKind::MethodCall { object, method, args, object_type } => {
                if let ExprKind::Variable(alias) = &object.kind {
                    if let Some(module) = symbols.imported_modules.get(alias) {
                        let arg_types: Vec<TypeInfo> =
                            args.iter().map(|a| self.infer_expr(a, scope, ctx, symbols, errors)).collect();
                        return self.check_qualified_call(module, *method, &arg_types, expr.span.clone(), errors);
                    }
                }

                let object_ty = self.infer_expr(object, scope, ctx, symbols, errors);
                *object_type.borrow_mut() = Some(object_ty.clone());
                let arg_types: Vec<TypeInfo> =
                    args.iter().map(|a| self.infer_expr(a, scope, ctx, symbols, errors)).collect();

                if object_ty.base.starts_with("Channel<") {
                    if !ctx.is_async {
                        push_type_error!(
                            errors,
                            "channel send/recv is only valid inside an async function",
                            expr.span.clone()
                        );
                    }
                    return self.check_builtin_method(CHANNEL_METHODS, &object_ty, *method, &arg_types, expr.span.clone(), errors);
                }
                if object_ty.base.starts_with("List<") {
                    return self.check_builtin_method(LIST_METHODS, &object_ty, *method, &arg_types, expr.span.clone(), errors);
                }
                if object_ty.base == "str" {
                    let resolved = lookup(STR_METHODS, self.strings.resolve(*method));
                    return match resolved {
                        Some(m) => {
                            self.check_builtin_arity(m, &arg_types, expr.span.clone(), errors);
                            str_method_return(m)
                        }
                        None => {
                            push_type_error!(
                                errors,
                                format!("'str' has no method '{}'", self.strings.resolve(*method)),
                                expr.span.clone()
                            );
                            TypeInfo::unknown()
                        }
                    };
                }

                let owner = self.strings.get_existing(&object_ty.base);
                if let Some(owner) = owner {
                    if let Some(m) = symbols.method(owner, *method) {
                        self.check_call_arity_and_args(method, &m.params[1..], &arg_types, expr.span.clone(), errors);
                        let ret = m
                            .return_type
                            .as_ref()
                            .map(|t| type_expr_to_info(t, self.strings))
                            .unwrap_or_else(TypeInfo::void);
                        return if m.is_async { ret.awaitable() } else { ret };
                    }
                }
                push_type_error!(
                    errors,
                    format!("'{}' has no method '{}'", object_ty.base, self.strings.resolve(*method)),
                    expr.span.clone()
                );
                TypeInfo::unknown()
            }

            ExprKind::FieldAccess { object, field } => {
                let object_ty = self.infer_expr(object, scope, ctx, symbols, errors);
                match self.field_type(&object_ty, *field, symbols) {
                    Some(t) => t,
                    None => {
                        push_type_error!(
                            errors,
                            format!("'{}' has no field '{}'", object_ty.base, self.strings.resolve(*field)),
                            expr.span.clone()
                        );
                        TypeInfo::unknown()
                    }
                }
            }

            ExprKind::StructLiteral { name, fields } => {
                if let Some(def) = symbols.structs.get(name).copied() {
                    for (field_name, value) in fields {
                        let value_type = self.infer_expr(value, scope, ctx, symbols, errors);
                        match def.fields.iter().find(|f| f.name == *field_name) {
                            Some(field_def) => {
                                let expected = type_expr_to_info(&field_def.ty, self.strings);
                                if !assignable(&value_type, &expected) {
                                    self.mismatch(errors, value.span.clone(), &expected, &value_type);
                                }
                            }
                            None => push_type_error!(
                                errors,
                                format!(
                                    "'{}' has no field '{}'",
                                    self.strings.resolve(*name),
                                    self.strings.resolve(*field_name)
                                ),
                                value.span.clone()
                            ),
                        }
                    }
                    return TypeInfo::new(self.strings.resolve(*name).to_string());
                }

                if let Some(err_def) = symbols.errors.get(name).copied() {
                    for (field_name, value) in fields {
                        let value_type = self.infer_expr(value, scope, ctx, symbols, errors);
                        let field_name_str = self.strings.resolve(*field_name);
                        let expected = if field_name_str == "message" {
                            Some(TypeInfo::new("str"))
                        } else if field_name_str == "cause" {
                            Some(TypeInfo::new(self.strings.resolve(*name).to_string()).optional())
                        } else {
                            err_def.fields.iter().find(|f| f.name == *field_name).map(|f| type_expr_to_info(&f.ty, self.strings))
                        };
                        match expected {
                            Some(expected) => {
                                if !assignable(&value_type, &expected) {
                                    self.mismatch(errors, value.span.clone(), &expected, &value_type);
                                }
                            }
                            None => push_type_error!(
                                errors,
                                format!("'{}' has no field '{}'", self.strings.resolve(*name), field_name_str),
                                value.span.clone()
                            ),
                        }
                    }
                    return TypeInfo::new(self.strings.resolve(*name).to_string());
                }

                push_type_error!(
                    errors,
                    format!("undefined struct '{}'", self.strings.resolve(*name)),
                    expr.span.clone()
                );
                TypeInfo::unknown()
            }

            ExprKind::Fail(inner) => {
                self.infer_expr(inner, scope, ctx, symbols, errors);
                TypeInfo::void()
            }

            ExprKind::Or { inner, handler } => {
                let inner_type = self.infer_expr(inner, scope, ctx, symbols, errors);
                match handler {
                    OrHandler::Return(value) => {
                        if let Some(value) = value {
                            self.infer_expr(value, scope, ctx, symbols, errors);
                        }
                    }
                    OrHandler::Fail(value) => {
                        self.infer_expr(value, scope, ctx, symbols, errors);
                    }
                    OrHandler::Block(body) => self.check_block(body, scope, ctx, symbols, errors),
                    OrHandler::Match(arms) => {
                        for arm in arms {
                            match &arm.body {
                                MatchArmBody::Expr(e) => {
                                    self.infer_expr(e, scope, ctx, symbols, errors);
                                }
                                MatchArmBody::Fail(e) => {
                                    self.infer_expr(e, scope, ctx, symbols, errors);
                                }
                            }
                        }
                    }
                }
                inner_type
            }

            ExprKind::Default { value, fallback } => {
                let value_type = self.infer_expr(value, scope, ctx, symbols, errors);
                let fallback_type = self.infer_expr(fallback, scope, ctx, symbols, errors);
                let non_optional = TypeInfo { optional: false, ..value_type.clone() };
                if !assignable(&fallback_type, &non_optional) {
                    self.mismatch(errors, expr.span.clone(), &non_optional, &fallback_type);
                }
                non_optional
            }
        }
    }

    fn check_qualified_call(
        &self,
        module: &Module,
        method: StringId,
        arg_types: &[TypeInfo],
        span: SourceSpan,
        errors: &mut Vec<CompileError>,
    ) -> TypeInfo {
        let name = self.strings.resolve(method);
        match module.public_function(self.strings, name) {
            Some(func) => {
                self.check_call_arity_and_args(&method, &func.params, arg_types, span, errors);
                let ret = func
                    .return_type
                    .as_ref()
                    .map(|t| type_expr_to_info(t, self.strings))
                    .unwrap_or_else(TypeInfo::void);
                if func.is_async {
                    ret.awaitable()
                } else {
                    ret
                }
            }
            None => {
                push_type_error!(
                    errors,
                    format!("module '{}' has no public function '{}'", module.dotted_path, name),
                    span
                );
                TypeInfo::unknown()
            }
        }
    }

    fn check_builtin_method(
        &self,
        table: &[builtins_tables::BuiltinMethod],
        receiver: &TypeInfo,
        method: StringId,
        arg_types: &[TypeInfo],
        span: SourceSpan,
        errors: &mut Vec<CompileError>,
    ) -> TypeInfo {
        let name = self.strings.resolve(method);
        let Some(m) = lookup(table, name) else {
            push_type_error!(errors, format!("'{}' has no method '{}'", receiver.base, name), span);
            return TypeInfo::unknown();
        };
        self.check_builtin_arity(m, arg_types, span, errors);
        let element = element_type_of(receiver);
        match m.returns {
            builtins_tables::BuiltinReturn::Int => TypeInfo::new("int"),
            builtins_tables::BuiltinReturn::Bool => TypeInfo::new("bool"),
            builtins_tables::BuiltinReturn::Void => TypeInfo::void(),
            builtins_tables::BuiltinReturn::Element => element,
            builtins_tables::BuiltinReturn::AwaitableVoid => TypeInfo::void().awaitable(),
            builtins_tables::BuiltinReturn::AwaitableElement => element.awaitable(),
        }
    }

    fn check_builtin_arity(
        &self,
        method: &builtins_tables::BuiltinMethod,
        arg_types: &[TypeInfo],
        span: SourceSpan,
        errors: &mut Vec<CompileError>,
    ) {
        if arg_types.len() != method.arity {
            push_type_error!(
                errors,
                format!("'{}' expects {} argument(s), found {}", method.name, method.arity, arg_types.len()),
                span,
                {
                    ExpectedCount => method.arity.to_string(),
                    FoundCount => arg_types.len().to_string(),
                }
            );
        }
    }

    fn check_call_arity_and_args(
        &self,
        name: &StringId,
        params: &[Param],
        arg_types: &[TypeInfo],
        span: SourceSpan,
        errors: &mut Vec<CompileError>,
    ) {
        if params.len() != arg_types.len() {
            push_type_error!(
                errors,
                format!(
                    "'{}' expects {} argument(s), found {}",
                    self.strings.resolve(*name),
                    params.len(),
                    arg_types.len()
                ),
                span.clone(),
                {
                    ExpectedCount => params.len().to_string(),
                    FoundCount => arg_types.len().to_string(),
                }
            );
            return;
        }
        for (param, actual) in params.iter().zip(arg_types) {
            let expected = type_expr_to_info(&param.ty, self.strings);
            if !assignable(actual, &expected) {
                self.mismatch(errors, span.clone(), &expected, actual);
            }
        }
    }

    fn field_type(&self, object_type: &TypeInfo, field: StringId, symbols: &GlobalSymbols) -> Option<TypeInfo> {
        let struct_id = self.strings.get_existing(&object_type.base)?;
        if let Some(def) = symbols.structs.get(&struct_id) {
            return def
                .fields
                .iter()
                .find(|f| f.name == field)
                .map(|f| type_expr_to_info(&f.ty, self.strings));
        }
        if let Some(err_def) = symbols.errors.get(&struct_id) {
            if self.strings.resolve(field) == "message" {
                return Some(TypeInfo::new("str"));
            }
            if self.strings.resolve(field) == "cause" {
                return Some(TypeInfo::new(object_type.base.clone()).optional());
            }
            return err_def
                .fields
                .iter()
                .find(|f| f.name == field)
                .map(|f| type_expr_to_info(&f.ty, self.strings));
        }
        None
    }

    fn expect_bool(&self, actual: &TypeInfo, span: SourceSpan, errors: &mut Vec<CompileError>) {
        if actual.base != "bool" && actual.base != "unknown" {
            push_type_error!(
                errors,
                format!("expected 'bool', found '{}'", actual.base),
                span,
                { ExpectedType => "bool".to_string(), FoundType => actual.base.clone() }
            );
        }
    }

    fn mismatch(&self, errors: &mut Vec<CompileError>, span: SourceSpan, expected: &TypeInfo, actual: &TypeInfo) {
        push_type_error!(
            errors,
            format!("expected '{}', found '{}'", expected.base, actual.base),
            span,
            { ExpectedType => expected.base.clone(), FoundType => actual.base.clone() }
        );
    }
}

struct FnContext {
    current_return: Option<TypeInfo>,
    current_error_type: Option<StringId>,
    is_async: bool,
}

fn element_type_of(container: &TypeInfo) -> TypeInfo {
    for prefix in ["Channel<", "List<"] {
        if let Some(rest) = container.base.strip_prefix(prefix) {
            if let Some(inner) = rest.strip_suffix('>') {
                return TypeInfo::new(inner.to_string());
            }
        }
    }
    TypeInfo::unknown()
}

/// Whether every path through `body` ends in a `return` or `fail` (or an
/// `if` whose both branches do). Used for the missing-return check; doesn't
/// attempt to reason about `while`/`for` loop trip counts.
fn block_always_returns(body: &[Stmt]) -> bool {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Return(_) | StmtKind::Fail(_) => return true,
            StmtKind::If { then_body, else_body: Some(else_body), .. } => {
                if block_always_returns(then_body) && block_always_returns(else_body) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokens::SourceSpan;
    use std::path::PathBuf;

    fn span() -> SourceSpan {
        SourceSpan::new_single_line(PathBuf::from("t.gl"), 1)
    }

    #[test]
    fn block_with_trailing_return_always_returns() {
        let body = vec![Stmt::new(StmtKind::Return(None), span())];
        assert!(block_always_returns(&body));
    }

    #[test]
    fn block_with_no_return_does_not_always_return() {
        let body: Vec<Stmt> = vec![];
        assert!(!block_always_returns(&body));
    }

    #[test]
    fn if_with_returning_branches_always_returns() {
        let then_body = vec![Stmt::new(StmtKind::Return(None), span())];
        let else_body = vec![Stmt::new(StmtKind::Fail(Expr::new(ExprKind::NoneLiteral, span())), span())];
        let body = vec![Stmt::new(
            StmtKind::If {
                cond: Expr::new(ExprKind::BoolLiteral(true), span()),
                then_body,
                else_body: Some(else_body),
            },
            span(),
        )];
        assert!(block_always_returns(&body));
    }

    #[test]
    fn if_without_else_does_not_always_return() {
        let then_body = vec![Stmt::new(StmtKind::Return(None), span())];
        let body = vec![Stmt::new(
            StmtKind::If {
                cond: Expr::new(ExprKind::BoolLiteral(true), span()),
                then_body,
                else_body: None,
            },
            span(),
        )];
        assert!(!block_always_returns(&body));
    }
}
