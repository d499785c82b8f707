//! The synthetic `http` and `fs` modules: public structs/functions/methods
//! with no bodies, whose implementations live in the runtime library the
//! emitter links against rather than in any on-disk glint source.

use crate::frontend::ast::nodes::*;
use crate::frontend::lexer::tokens::SourceSpan;
use crate::frontend::string_interning::StringTable;
use std::path::PathBuf;

/// Built-in module names, configurable in principle but fixed here as the
/// two the runtime actually ships.
pub const BUILTIN_MODULE_NAMES: &[&str] = &["http", "fs"];

pub fn is_builtin(dotted_path: &str) -> bool {
    BUILTIN_MODULE_NAMES.contains(&dotted_path)
}

fn synthetic_span(strings: &mut StringTable) -> SourceSpan {
    let _ = strings;
    SourceSpan::new_single_line(PathBuf::from("<builtin>"), 0)
}

fn bodyless_fn(
    strings: &mut StringTable,
    name: &str,
    params: Vec<(&str, TypeShape)>,
    ret: Option<TypeShape>,
) -> FunctionDef {
    let span = synthetic_span(strings);
    let params = params
        .into_iter()
        .map(|(pname, shape)| Param {
            name: strings.intern(pname),
            ty: TypeExpr {
                shape,
                optional: false,
            },
        })
        .collect();
    FunctionDef {
        name: strings.intern(name),
        params,
        return_type: ret.map(|shape| TypeExpr {
            shape,
            optional: false,
        }),
        error_type: None,
        body: Vec::new(),
        visibility: Visibility::Public,
        is_async: true,
        doc: None,
        span,
    }
}

fn str_type() -> TypeShape {
    TypeShape::Primitive(PrimitiveKind::Str)
}

fn int_type() -> TypeShape {
    TypeShape::Primitive(PrimitiveKind::Int)
}

fn bool_type() -> TypeShape {
    TypeShape::Primitive(PrimitiveKind::Bool)
}

/// Build the synthetic program for `http`: a `Response` struct and `get`/
/// `post` functions, all body-less. The emitter never lowers these bodies;
/// it only needs their signatures for type checking call sites.
fn http_module(strings: &mut StringTable) -> Program {
    let span = synthetic_span(strings);
    let response_name = strings.intern("Response");
    let response = StructDef {
        name: response_name,
        fields: vec![
            FieldDef {
                name: strings.intern("status"),
                ty: TypeExpr {
                    shape: int_type(),
                    optional: false,
                },
            },
            FieldDef {
                name: strings.intern("body"),
                ty: TypeExpr {
                    shape: str_type(),
                    optional: false,
                },
            },
        ],
        visibility: Visibility::Public,
        doc: None,
        span,
    };

    let response_type = TypeShape::Named {
        qualifier: None,
        name: response_name,
    };

    let get = bodyless_fn(strings, "get", vec![("url", str_type())], Some(response_type.clone()));
    let post = bodyless_fn(
        strings,
        "post",
        vec![("url", str_type()), ("body", str_type())],
        Some(response_type),
    );

    Program {
        structs: vec![response],
        functions: vec![get, post],
        ..Program::default()
    }
}

/// Build the synthetic program for `fs`: `read`/`write`/`exists`.
fn fs_module(strings: &mut StringTable) -> Program {
    let read = bodyless_fn(strings, "read", vec![("path", str_type())], Some(str_type()));
    let write = bodyless_fn(
        strings,
        "write",
        vec![("path", str_type()), ("contents", str_type())],
        None,
    );
    let exists = bodyless_fn(strings, "exists", vec![("path", str_type())], Some(bool_type()));

    Program {
        functions: vec![read, write, exists],
        ..Program::default()
    }
}

pub fn synthetic_program(dotted_path: &str, strings: &mut StringTable) -> Option<Program> {
    match dotted_path {
        "http" => Some(http_module(strings)),
        "fs" => Some(fs_module(strings)),
        _ => None,
    }
}
