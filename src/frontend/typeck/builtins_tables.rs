//! Fixed method signature tables for `Channel<T>`, `List<T>`, and `str`.
//! These aren't user-extensible; the type checker consults them directly
//! rather than resolving through the symbol tables.

use crate::frontend::ast::nodes::TypeInfo;

/// One built-in method's arity and parameter/return shape, described
/// relative to the element type `T` of the receiver (`Channel<T>`/`List<T>`)
/// so the caller can substitute it in.
pub struct BuiltinMethod {
    pub name: &'static str,
    pub arity: usize,
    /// `true` for each parameter position that takes the element type `T`;
    /// `false` means it takes a fixed `int`.
    pub takes_element: &'static [bool],
    pub returns: BuiltinReturn,
}

#[derive(Clone, Copy)]
pub enum BuiltinReturn {
    Int,
    Bool,
    Void,
    Element,
    AwaitableVoid,
    AwaitableElement,
}

pub const LIST_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "length", arity: 0, takes_element: &[], returns: BuiltinReturn::Int },
    BuiltinMethod { name: "is_empty", arity: 0, takes_element: &[], returns: BuiltinReturn::Bool },
    BuiltinMethod { name: "contains", arity: 1, takes_element: &[true], returns: BuiltinReturn::Bool },
    BuiltinMethod { name: "get", arity: 1, takes_element: &[false], returns: BuiltinReturn::Element },
    BuiltinMethod { name: "set", arity: 2, takes_element: &[false, true], returns: BuiltinReturn::Void },
    BuiltinMethod { name: "append", arity: 1, takes_element: &[true], returns: BuiltinReturn::Void },
    BuiltinMethod { name: "pop", arity: 0, takes_element: &[], returns: BuiltinReturn::Void },
    BuiltinMethod { name: "clear", arity: 0, takes_element: &[], returns: BuiltinReturn::Void },
    BuiltinMethod { name: "first", arity: 0, takes_element: &[], returns: BuiltinReturn::Element },
    BuiltinMethod { name: "last", arity: 0, takes_element: &[], returns: BuiltinReturn::Element },
    BuiltinMethod { name: "insert", arity: 2, takes_element: &[false, true], returns: BuiltinReturn::Void },
    BuiltinMethod { name: "remove", arity: 1, takes_element: &[false], returns: BuiltinReturn::Void },
];

pub const STR_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "length", arity: 0, takes_element: &[], returns: BuiltinReturn::Int },
    BuiltinMethod { name: "empty", arity: 0, takes_element: &[], returns: BuiltinReturn::Bool },
    BuiltinMethod { name: "contains", arity: 1, takes_element: &[false], returns: BuiltinReturn::Bool },
    BuiltinMethod { name: "starts_with", arity: 1, takes_element: &[false], returns: BuiltinReturn::Bool },
    BuiltinMethod { name: "ends_with", arity: 1, takes_element: &[false], returns: BuiltinReturn::Bool },
    BuiltinMethod { name: "find", arity: 1, takes_element: &[false], returns: BuiltinReturn::Int },
    BuiltinMethod { name: "substr", arity: 2, takes_element: &[false, false], returns: BuiltinReturn::Element },
    BuiltinMethod { name: "at", arity: 1, takes_element: &[false], returns: BuiltinReturn::Element },
];

pub const CHANNEL_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod { name: "send", arity: 1, takes_element: &[true], returns: BuiltinReturn::AwaitableVoid },
    BuiltinMethod { name: "recv", arity: 0, takes_element: &[], returns: BuiltinReturn::AwaitableElement },
];

pub fn lookup<'a>(table: &'a [BuiltinMethod], name: &str) -> Option<&'a BuiltinMethod> {
    table.iter().find(|m| m.name == name)
}

/// `substr`/`at` on `str` return `str`/`char` specifically, not the generic
/// "element type" of a container; resolve that here since the table itself
/// is receiver-agnostic.
pub fn str_method_return(method: &BuiltinMethod) -> TypeInfo {
    match method.returns {
        BuiltinReturn::Int => TypeInfo::new("int"),
        BuiltinReturn::Bool => TypeInfo::new("bool"),
        BuiltinReturn::Void => TypeInfo::void(),
        BuiltinReturn::Element if method.name == "at" => TypeInfo::new("char"),
        BuiltinReturn::Element => TypeInfo::new("str"),
        BuiltinReturn::AwaitableVoid => TypeInfo::void().awaitable(),
        BuiltinReturn::AwaitableElement => TypeInfo::new("str").awaitable(),
    }
}
