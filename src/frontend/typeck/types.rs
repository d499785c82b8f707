//! Symbol tables and scope stack threaded through the type-checking walk,
//! plus the `assignable(actual -> expected)` compatibility rules.

use crate::frontend::ast::nodes::{
    ErrorDef, ExternDef, FunctionDef, MethodDef, PrimitiveKind, StructDef, TypeExpr, TypeInfo, TypeShape,
};
use crate::frontend::module_loader::Module;
use crate::frontend::string_interning::{StringId, StringTable};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Per-compilation symbol tables. Keyed on the root program's own
/// definitions; imported modules are looked up separately via
/// `imported_modules` and queried through their own public-only accessors.
#[derive(Default)]
pub struct GlobalSymbols<'a> {
    pub structs: FxHashMap<StringId, &'a StructDef>,
    pub errors: FxHashMap<StringId, &'a ErrorDef>,
    pub functions: FxHashMap<StringId, &'a FunctionDef>,
    pub externs: FxHashMap<StringId, &'a ExternDef>,
    pub methods: FxHashMap<StringId, Vec<&'a MethodDef>>,
    pub imported_modules: FxHashMap<StringId, Rc<Module>>,
}

impl<'a> GlobalSymbols<'a> {
    pub fn methods_for(&self, owner: StringId) -> &[&'a MethodDef] {
        self.methods.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn method(&self, owner: StringId, name: StringId) -> Option<&'a MethodDef> {
        self.methods_for(owner).iter().find(|m| m.name == name).copied()
    }
}

#[derive(Default)]
struct Scope {
    vars: FxHashMap<StringId, TypeInfo>,
}

/// Local-scope stack. Entering a function/method pushes an initial scope of
/// parameters; each control-flow block pushes on entry, pops on exit.
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { scopes: vec![Scope::default()] }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Declares `name`, returning `false` if it's already present in the
    /// *current* scope (a re-declaration error the caller should report).
    /// Shadowing an outer scope's binding is fine.
    pub fn declare(&mut self, name: StringId, ty: TypeInfo) -> bool {
        let scope = self.scopes.last_mut().expect("scope stack never empty");
        if scope.vars.contains_key(&name) {
            false
        } else {
            scope.vars.insert(name, ty);
            true
        }
    }

    pub fn lookup(&self, name: StringId) -> Option<&TypeInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.vars.get(&name))
    }
}

/// Renders a `TypeExpr` to the `base` string `TypeInfo` carries, without
/// resolving whether the named type actually exists — that's the caller's
/// job, since only the caller has the symbol tables and string table handy.
pub fn type_expr_to_info(ty: &TypeExpr, strings: &StringTable) -> TypeInfo {
    let base = shape_to_base(&ty.shape, strings);
    let is_void = matches!(ty.shape, TypeShape::Primitive(PrimitiveKind::Void));
    TypeInfo {
        base,
        optional: ty.optional,
        is_void,
        awaitable: false,
    }
}

fn shape_to_base(shape: &TypeShape, strings: &StringTable) -> String {
    match shape {
        TypeShape::Primitive(p) => p.name().to_string(),
        TypeShape::Channel(inner) => format!("Channel<{}>", shape_to_base(&inner.shape, strings)),
        TypeShape::List(inner) => format!("List<{}>", shape_to_base(&inner.shape, strings)),
        TypeShape::Function { params, ret } => {
            let params = params
                .iter()
                .map(|p| shape_to_base(&p.shape, strings))
                .collect::<Vec<_>>()
                .join(",");
            let ret = ret
                .as_ref()
                .map(|r| shape_to_base(&r.shape, strings))
                .unwrap_or_else(|| "void".to_string());
            format!("fn({params}) -> {ret}")
        }
        TypeShape::Named { qualifier, name } => match qualifier {
            Some(q) => format!("{}.{}", strings.resolve(*q), strings.resolve(*name)),
            None => strings.resolve(*name).to_string(),
        },
    }
}

/// `assignable(actual -> expected)`.
pub fn assignable(actual: &TypeInfo, expected: &TypeInfo) -> bool {
    if actual.base == "unknown" || expected.base == "unknown" {
        return true;
    }

    if actual.base == "none" && expected.optional && !expected.awaitable {
        return true;
    }

    if actual.awaitable != expected.awaitable {
        return false;
    }

    if actual.base.starts_with("fn:") && expected.base.starts_with("fn(") {
        return true;
    }

    if actual.base == expected.base {
        return true;
    }

    matches!(
        (actual.base.as_str(), expected.base.as_str()),
        ("int", "u32") | ("int", "u64") | ("f64", "f32") | ("str", "cstr") | ("int", "cint")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_is_compatible_with_anything_to_suppress_cascades() {
        let unknown = TypeInfo::unknown();
        let int = TypeInfo::new("int");
        assert!(assignable(&unknown, &int));
        assert!(assignable(&int, &unknown));
    }

    #[test]
    fn none_is_compatible_with_optional_expected_types() {
        let none = TypeInfo::new("none");
        let optional_int = TypeInfo::new("int").optional();
        assert!(assignable(&none, &optional_int));
    }

    #[test]
    fn f64_to_f32_is_accepted_as_documented_laxness() {
        assert!(assignable(&TypeInfo::new("f64"), &TypeInfo::new("f32")));
    }

    #[test]
    fn mismatched_awaitable_flags_are_incompatible() {
        let plain = TypeInfo::new("int");
        let awaited = TypeInfo::new("int").awaitable();
        assert!(!assignable(&plain, &awaited));
    }

    #[test]
    fn unrelated_base_types_are_incompatible() {
        assert!(!assignable(&TypeInfo::new("int"), &TypeInfo::new("bool")));
    }
}
