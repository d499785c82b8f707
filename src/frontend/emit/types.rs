//! Source-type to C++ text lowering, grounded on the original's
//! `codegen/emit/types.hpp::map_type`, rewritten against the parsed
//! `TypeShape` tree instead of re-parsing a flattened string.

use crate::frontend::ast::nodes::{PrimitiveKind, TypeExpr, TypeShape};
use crate::frontend::string_interning::StringTable;

pub fn lower_primitive(p: PrimitiveKind) -> &'static str {
    match p {
        PrimitiveKind::Int => "int",
        PrimitiveKind::Str => "std::string",
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::Char => "char",
        PrimitiveKind::F32 => "float",
        PrimitiveKind::F64 => "double",
        PrimitiveKind::U32 => "uint32_t",
        PrimitiveKind::U64 => "uint64_t",
        PrimitiveKind::Cint => "int",
        PrimitiveKind::Cstr => "const char*",
        PrimitiveKind::Void => "void",
    }
}

/// Lowers a type's shape, ignoring its `optional` marker. `Channel<T>` and
/// `List<T>` route through the runtime channel type and `std::vector`
/// respectively; qualified names become `::`-joined.
pub fn lower_shape(shape: &TypeShape, strings: &StringTable) -> String {
    match shape {
        TypeShape::Primitive(p) => lower_primitive(*p).to_string(),
        TypeShape::Channel(inner) => format!("glint::rt::Channel<{}>", lower_type(inner, strings)),
        TypeShape::List(inner) => format!("std::vector<{}>", lower_type(inner, strings)),
        TypeShape::Function { params, ret } => {
            let params = params.iter().map(|p| lower_type(p, strings)).collect::<Vec<_>>().join(", ");
            let ret = ret.as_ref().map(|r| lower_type(r, strings)).unwrap_or_else(|| "void".to_string());
            format!("std::function<{ret}({params})>")
        }
        TypeShape::Named { qualifier, name } => match qualifier {
            Some(q) => format!("{}::{}", strings.resolve(*q), strings.resolve(*name)),
            None => strings.resolve(*name).to_string(),
        },
    }
}

/// Lowers a full `TypeExpr`, wrapping the shape in `std::optional<T>` when
/// the trailing `?` marker is present.
pub fn lower_type(ty: &TypeExpr, strings: &StringTable) -> String {
    let base = lower_shape(&ty.shape, strings);
    if ty.optional {
        format!("std::optional<{base}>")
    } else {
        base
    }
}

/// Lowers a return type; `None` means a void-returning definition.
pub fn lower_return_type(ty: Option<&TypeExpr>, strings: &StringTable) -> String {
    match ty {
        Some(ty) => lower_type(ty, strings),
        None => "void".to_string(),
    }
}
