//! Target-source emission: the last pipeline stage, lowering a type-checked
//! `Program` into C++20 text plus the set of external libraries its `extern`
//! declarations and built-in module usage pull in. One `lower_*` function
//! per AST variant, all runtime support routed through a single
//! `glint::rt::*` namespace.

mod expr;
mod stmt;
mod types;

use crate::frontend::ast::nodes::*;
use crate::frontend::dev_log::emit_log;
use crate::frontend::module_loader::builtins::is_builtin;
use crate::frontend::module_loader::Module;
use crate::frontend::string_interning::{StringId, StringTable};
use crate::frontend::typeck::types::GlobalSymbols;
use std::rc::Rc;

pub use types::{lower_return_type, lower_type};

/// What `emit_program` hands back: the lowered source text plus the
/// external libraries the driver needs to pass to the host linker.
pub struct EmitOutput {
    pub source: String,
    pub link_dependencies: Vec<String>,
}

/// Per-compilation emitter state. The temp counter and feature flags live as
/// plain fields rather than thread-through parameters.
pub struct Emitter<'s, 'a> {
    strings: &'s StringTable,
    symbols: &'s GlobalSymbols<'a>,
    temp_counter: u32,
    in_fallible: bool,
    in_async: bool,
    uses_http: bool,
    uses_fs: bool,
    uses_async: bool,
    uses_go_spawn: bool,
    link_dependencies: Vec<String>,
}

impl<'s, 'a> Emitter<'s, 'a> {
    pub fn new(strings: &'s StringTable, symbols: &'s GlobalSymbols<'a>) -> Self {
        Self {
            strings,
            symbols,
            temp_counter: 0,
            in_fallible: false,
            in_async: false,
            uses_http: false,
            uses_fs: false,
            uses_async: false,
            uses_go_spawn: false,
            link_dependencies: Vec::new(),
        }
    }

    fn next_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("_or_tmp{}", self.temp_counter)
    }

    /// Entry point: lowers the root program, in normal or test mode, through
    /// a fixed 7-step program layout (includes, runtime decls, forward
    /// declarations, type/error defs, functions/methods, entry point, test
    /// harness).
    pub fn emit_program(&mut self, program: &Program, test_mode: bool) -> EmitOutput {
        emit_log!("emitting program ({} structs, {} functions, test_mode={})", program.structs.len(), program.functions.len(), test_mode);
        self.detect_features(program);

        let mut out = String::new();

        // 1 + 2: runtime header plus feature-gated includes.
        self.emit_includes(&mut out);

        // 3: extern declarations.
        self.emit_extern_block(&mut out, &program.externs);

        // 4: test-mode assertion helper.
        if test_mode {
            self.emit_test_preamble(&mut out);
        }

        // 5: imported modules, one namespace block each.
        for (alias, module) in &self.symbols.imported_modules {
            self.emit_module_namespace(&mut out, *alias, module);
        }

        // 6: the root program's structs (with embedded methods), then functions.
        self.emit_definitions(&mut out, program);

        // 7: test harness entry point.
        if test_mode {
            self.emit_test_harness(&mut out, program);
        }

        EmitOutput {
            source: out,
            link_dependencies: std::mem::take(&mut self.link_dependencies),
        }
    }

    fn detect_features(&mut self, program: &Program) {
        let mut uses_async = has_async(program);
        let mut uses_go_spawn = has_go_spawn(program);
        let mut link_deps: Vec<String> = Vec::new();

        for ext in &program.externs {
            let lib = self.strings.resolve(ext.library).to_string();
            if !link_deps.contains(&lib) {
                link_deps.push(lib);
            }
        }

        let mut uses_http = false;
        let mut uses_fs = false;
        for import in &program.imports {
            let path = dotted_path_string(&import.dotted_path, self.strings);
            if path == "http" {
                uses_http = true;
            }
            if path == "fs" {
                uses_fs = true;
            }
        }

        for module in self.symbols.imported_modules.values() {
            uses_async = uses_async || has_async(&module.merged_program);
            uses_go_spawn = uses_go_spawn || has_go_spawn(&module.merged_program);
            for ext in &module.merged_program.externs {
                let lib = self.strings.resolve(ext.library).to_string();
                if !link_deps.contains(&lib) {
                    link_deps.push(lib);
                }
            }
        }

        if uses_http {
            link_deps.push("glint_runtime_http".to_string());
        }
        if uses_fs {
            link_deps.push("glint_runtime_fs".to_string());
        }

        self.uses_async = uses_async;
        self.uses_go_spawn = uses_go_spawn;
        self.uses_http = uses_http;
        self.uses_fs = uses_fs;
        self.link_dependencies = link_deps;
    }

    fn emit_includes(&self, out: &mut String) {
        if self.uses_http {
            out.push_str("#include <glint/http.hpp>\n");
        } else {
            out.push_str("#include <glint/std.hpp>\n");
        }
        if self.uses_fs {
            out.push_str("#include <glint/fs.hpp>\n");
        }
        if self.uses_async {
            out.push_str("#include <boost/asio.hpp>\n");
            out.push_str("#include <boost/asio/awaitable.hpp>\n");
            out.push_str("#include <boost/asio/co_spawn.hpp>\n");
            out.push_str("#include <boost/asio/detached.hpp>\n");
        }
        if self.uses_go_spawn {
            out.push_str("#include <boost/fiber/all.hpp>\n");
        }
        out.push('\n');
    }

    fn emit_extern_block(&self, out: &mut String, externs: &[ExternDef]) {
        if externs.is_empty() {
            return;
        }
        out.push_str("extern \"C\" {\n");
        for ext in externs {
            let ret = lower_return_type(ext.return_type.as_ref(), self.strings);
            let params = ext
                .params
                .iter()
                .map(|p| format!("{} {}", lower_type(&p.ty, self.strings), self.strings.resolve(p.name)))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("\t{} {}({});\n", ret, self.strings.resolve(ext.name), params));
        }
        out.push_str("}\n\n");
    }

    fn emit_test_preamble(&self, out: &mut String) {
        out.push_str("int _failures = 0;\n\n");
        out.push_str("template<typename T, typename U>\n");
        out.push_str("void _assert_eq(const T& a, const U& b, int line) {\n");
        out.push_str("\tif (!(a == b)) {\n");
        out.push_str("\t\tstd::cerr << \"line \" << line << \": FAIL: \" << a << \" != \" << b << std::endl;\n");
        out.push_str("\t\t_failures++;\n");
        out.push_str("\t}\n");
        out.push_str("}\n\n");
    }

    fn emit_module_namespace(&mut self, out: &mut String, alias: StringId, module: &Rc<Module>) {
        if is_builtin(&module.dotted_path) {
            return;
        }
        out.push_str(&format!("namespace {} {{\n\n", self.strings.resolve(alias)));
        let public = filter_public(&module.merged_program);
        self.emit_struct_defs(out, &public.structs, &public.errors, &public.methods);
        self.emit_function_defs(out, &public.functions);
        out.push_str(&format!("}} // namespace {}\n\n", self.strings.resolve(alias)));
    }

    fn emit_definitions(&mut self, out: &mut String, program: &Program) {
        self.emit_struct_defs(out, &program.structs, &program.errors, &program.methods);
        self.emit_function_defs(out, &program.functions);
    }

    /// Struct (and error-struct) bodies, with their owned methods embedded as
    /// inline member functions — grounded on `emit_struct.cpp`'s
    /// `struct_def_with_methods`, which is how the original embeds methods
    /// rather than emitting them as a separate out-of-line phase.
    fn emit_struct_defs(&mut self, out: &mut String, structs: &[StructDef], errors: &[ErrorDef], methods: &[MethodDef]) {
        for s in structs {
            out.push_str(&format!("struct {} {{\n", self.strings.resolve(s.name)));
            for field in &s.fields {
                out.push_str(&format!("\t{} {};\n", lower_type(&field.ty, self.strings), self.strings.resolve(field.name)));
            }
            for method in methods.iter().filter(|m| m.owner == s.name) {
                out.push_str(&self.lower_method(method));
            }
            out.push_str("};\n\n");
        }

        for e in errors {
            out.push_str(&self.lower_error_def(e));
            out.push('\n');
        }
    }

    fn emit_function_defs(&mut self, out: &mut String, functions: &[FunctionDef]) {
        for function in functions {
            out.push_str(&self.lower_function(function));
        }
    }

    fn lower_error_def(&self, def: &ErrorDef) -> String {
        let name = self.strings.resolve(def.name);
        let mut out = format!("struct {name} : public glint::rt::Error {{\n");

        for f in &def.fields {
            out.push_str(&format!("\t{} {};\n", lower_type(&f.ty, self.strings), self.strings.resolve(f.name)));
        }

        let mut params = vec!["const std::string& msg".to_string()];
        let mut inits = Vec::new();
        for f in &def.fields {
            let field_name = self.strings.resolve(f.name);
            params.push(format!("{} {}_", lower_type(&f.ty, self.strings), field_name));
            inits.push(format!("{field_name}({field_name}_)"));
        }
        params.push("std::shared_ptr<glint::rt::Error> cause_ = nullptr".to_string());

        out.push_str(&format!("\n\t{name}({}) : glint::rt::Error(msg, cause_)", params.join(", ")));
        if !inits.is_empty() {
            out.push_str(&format!(", {}", inits.join(", ")));
        }
        out.push_str(" {}\n};\n");
        out
    }

    fn lower_function(&mut self, fn_def: &FunctionDef) -> String {
        let name = self.strings.resolve(fn_def.name);
        let is_main = name == "main";
        let is_async_main = is_main && fn_def.is_async;

        self.in_fallible = fn_def.error_type.is_some();
        self.in_async = fn_def.is_async;
        let params = fn_def
            .params
            .iter()
            .map(|p| format!("{} {}", lower_type(&p.ty, self.strings), self.strings.resolve(p.name)))
            .collect::<Vec<_>>();
        let body = self.lower_block(&fn_def.body, 1);

        let out = if is_async_main {
            let mut out = self.function_signature("_async_main", &params, fn_def.return_type.as_ref(), fn_def.error_type, true, &body);
            out.push_str("\nint main() {\n");
            out.push_str("\tasio::io_context io_context;\n");
            out.push_str("\tasio::co_spawn(io_context, _async_main(), asio::detached);\n");
            out.push_str("\tio_context.run();\n");
            out.push_str("\treturn 0;\n");
            out.push_str("}\n");
            out
        } else if is_main {
            let ret = if fn_def.is_async { fn_def.return_type.as_ref() } else { None };
            let rt = if fn_def.is_async { "asio::awaitable<int>".to_string() } else { "int".to_string() };
            let mut out = format!("{rt} {name}({}) {{\n", params.join(", "));
            out.push_str(&body);
            if !body_has_return(&fn_def.body) {
                out.push_str("\treturn 0;\n");
            }
            out.push_str("}\n");
            let _ = ret;
            out
        } else {
            self.function_signature(name, &params, fn_def.return_type.as_ref(), fn_def.error_type, fn_def.is_async, &body)
        };

        self.in_fallible = false;
        self.in_async = false;
        out
    }

    fn function_signature(
        &self,
        name: &str,
        params: &[String],
        return_type: Option<&TypeExpr>,
        error_type: Option<StringId>,
        is_async: bool,
        body: &str,
    ) -> String {
        let rt = self.lower_def_return(return_type, error_type, is_async);
        let mut out = format!("{rt} {name}({}) {{\n", params.join(", "));
        out.push_str(body);
        if is_async && return_type.is_none() {
            out.push_str("\tco_return;\n");
        }
        out.push_str("}\n");
        out
    }

    /// Wraps a declared return type in `glint::rt::Result<T>` for fallible
    /// definitions and in the target's awaitable wrapper for async ones.
    fn lower_def_return(&self, return_type: Option<&TypeExpr>, error_type: Option<StringId>, is_async: bool) -> String {
        let inner = lower_return_type(return_type, self.strings);
        let base = if error_type.is_some() { format!("glint::rt::Result<{inner}>") } else { inner };
        if is_async {
            format!("asio::awaitable<{base}>")
        } else {
            base
        }
    }

    fn lower_method(&mut self, method: &MethodDef) -> String {
        self.in_fallible = method.error_type.is_some();
        self.in_async = method.is_async;
        // Skip `self`, the first parameter; it becomes the implicit `this`.
        let params = method.params[1..]
            .iter()
            .map(|p| format!("{} {}", lower_type(&p.ty, self.strings), self.strings.resolve(p.name)))
            .collect::<Vec<_>>();
        let body = self.lower_block(&method.body, 2);
        let rt = self.lower_def_return(method.return_type.as_ref(), method.error_type, method.is_async);

        let mut out = format!("\t{rt} {}({}) {{\n", self.strings.resolve(method.name), params.join(", "));
        out.push_str(&body);
        if method.is_async && method.return_type.is_none() {
            out.push_str("\t\tco_return;\n");
        }
        out.push_str("\t}\n");
        self.in_fallible = false;
        self.in_async = false;
        out
    }

    fn emit_test_harness(&mut self, out: &mut String, program: &Program) {
        let test_fns: Vec<(&str, bool)> = program
            .functions
            .iter()
            .filter(|f| self.strings.resolve(f.name).starts_with("test_"))
            .map(|f| (self.strings.resolve(f.name), f.is_async))
            .collect();

        out.push_str("\nint main() {\n");
        let has_async_tests = test_fns.iter().any(|(_, is_async)| *is_async);
        if has_async_tests {
            out.push_str("\tasio::io_context io_context;\n");
        }
        for (name, is_async) in &test_fns {
            if *is_async {
                out.push_str(&format!("\tasio::co_spawn(io_context, {name}(), asio::detached);\n"));
            } else {
                out.push_str(&format!("\t{name}();\n"));
            }
        }
        if has_async_tests {
            out.push_str("\tio_context.run();\n");
        }
        out.push_str("\treturn _failures;\n");
        out.push_str("}\n");
    }
}

fn has_async(program: &Program) -> bool {
    program.functions.iter().any(|f| f.is_async) || program.methods.iter().any(|m| m.is_async)
}

/// Whether any `go <call>` appears anywhere in the program's bodies; gates
/// the `boost::fiber` include since plain async/await alone doesn't need it.
fn has_go_spawn(program: &Program) -> bool {
    program.functions.iter().any(|f| block_has_go_spawn(&f.body))
        || program.methods.iter().any(|m| block_has_go_spawn(&m.body))
}

fn block_has_go_spawn(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match &s.kind {
        StmtKind::GoSpawn(_) => true,
        StmtKind::If { then_body, else_body, .. } => {
            block_has_go_spawn(then_body) || else_body.as_deref().is_some_and(block_has_go_spawn)
        }
        StmtKind::While { body, .. } | StmtKind::ForRange { body, .. } | StmtKind::ForEach { body, .. } => {
            block_has_go_spawn(body)
        }
        StmtKind::With { body, .. } => block_has_go_spawn(body),
        StmtKind::Select { cases } => cases.iter().any(|c| block_has_go_spawn(&c.body)),
        _ => false,
    })
}

fn body_has_return(stmts: &[Stmt]) -> bool {
    stmts.last().is_some_and(|s| matches!(s.kind, StmtKind::Return(_)))
}

fn dotted_path_string(segments: &[StringId], strings: &StringTable) -> String {
    segments.iter().map(|s| strings.resolve(*s)).collect::<Vec<_>>().join(".")
}

/// A program view filtered to public-only definitions, for emitting an
/// imported module's namespace block.
struct PublicView {
    structs: Vec<StructDef>,
    errors: Vec<ErrorDef>,
    functions: Vec<FunctionDef>,
    methods: Vec<MethodDef>,
}

fn filter_public(program: &Program) -> PublicView {
    PublicView {
        structs: program.structs.iter().filter(|s| s.visibility == Visibility::Public).cloned().collect(),
        errors: program.errors.iter().filter(|e| e.visibility == Visibility::Public).cloned().collect(),
        functions: program.functions.iter().filter(|f| f.visibility == Visibility::Public).cloned().collect(),
        methods: program.methods.iter().filter(|m| m.visibility == Visibility::Public).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokens::SourceSpan;
    use crate::frontend::typeck::types::GlobalSymbols;
    use std::path::PathBuf;

    fn span() -> SourceSpan {
        SourceSpan::new_single_line(PathBuf::from("main.gl"), 1)
    }

    #[test]
    fn hello_world_emits_an_include_and_a_main_function() {
        let mut strings = StringTable::new();
        let main_name = strings.intern("main");
        let print_name = strings.intern("print");

        let program = Program {
            functions: vec![FunctionDef {
                name: main_name,
                params: vec![],
                return_type: None,
                error_type: None,
                body: vec![Stmt::new(
                    StmtKind::Expr(Expr::new(
                        ExprKind::Call {
                            callee: print_name,
                            args: vec![Expr::new(ExprKind::StringLiteral(strings.intern("Hello, World!")), span())],
                        },
                        span(),
                    )),
                    span(),
                )],
                visibility: Visibility::Public,
                is_async: false,
                doc: None,
                span: span(),
            }],
            ..Program::default()
        };

        let symbols = GlobalSymbols::default();
        let mut emitter = Emitter::new(&strings, &symbols);
        let output = emitter.emit_program(&program, false);

        assert!(output.source.contains("#include <glint/std.hpp>"));
        assert!(output.source.contains("int main("));
        assert!(output.source.contains("std::cout << std::string(\"Hello, World!\") << std::endl;"));
        assert!(output.source.contains("return 0;"));
        assert!(output.link_dependencies.is_empty());
    }

    #[test]
    fn extern_declarations_contribute_their_library_to_link_dependencies() {
        let mut strings = StringTable::new();
        let program = Program {
            externs: vec![ExternDef {
                name: strings.intern("puts"),
                params: vec![Param { name: strings.intern("s"), ty: TypeExpr { shape: TypeShape::Primitive(PrimitiveKind::Cstr), optional: false } }],
                return_type: Some(TypeExpr { shape: TypeShape::Primitive(PrimitiveKind::Cint), optional: false }),
                library: strings.intern("c"),
                visibility: Visibility::Public,
                span: span(),
            }],
            ..Program::default()
        };

        let symbols = GlobalSymbols::default();
        let mut emitter = Emitter::new(&strings, &symbols);
        let output = emitter.emit_program(&program, false);

        assert!(output.source.contains("extern \"C\" {"));
        assert!(output.source.contains("const char* s"));
        assert_eq!(output.link_dependencies, vec!["c".to_string()]);
    }
}
