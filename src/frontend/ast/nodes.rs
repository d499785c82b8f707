//! The sealed AST. Every node group is a Rust enum with exhaustive `match`
//! at each consumer rather than a runtime type-test cascade.

use crate::frontend::lexer::tokens::SourceSpan;
use crate::frontend::string_interning::StringId;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Int,
    Str,
    Bool,
    Char,
    F32,
    F64,
    U32,
    U64,
    Cint,
    Cstr,
    Void,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int",
            PrimitiveKind::Str => "str",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::Cint => "cint",
            PrimitiveKind::Cstr => "cstr",
            PrimitiveKind::Void => "void",
        }
    }
}

/// A type as written in source. `optional` carries the trailing `?` marker
/// from a variable declaration; it lives here rather than on every
/// declaration site because struct fields and return types can equally be
/// optional.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub shape: TypeShape,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    Channel(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Function {
        params: Vec<TypeExpr>,
        ret: Option<Box<TypeExpr>>,
    },
    /// A user struct, error-struct, or qualified `module.Name`.
    Named {
        qualifier: Option<StringId>,
        name: StringId,
    },
}

/// The type-checker's per-expression result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub base: String,
    pub optional: bool,
    pub is_void: bool,
    pub awaitable: bool,
}

impl TypeInfo {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            optional: false,
            is_void: false,
            awaitable: false,
        }
    }

    pub fn void() -> Self {
        Self {
            base: "void".to_string(),
            optional: false,
            is_void: true,
            awaitable: false,
        }
    }

    pub fn unknown() -> Self {
        Self::new("unknown")
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn awaitable(mut self) -> Self {
        self.awaitable = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(StringId),
    BoolLiteral(bool),
    NoneLiteral,
    CharLiteral(u8),

    /// A bare identifier. The type checker resolves it against the local
    /// scope stack, then the function/extern tables, then an imported
    /// module alias, depending on where it's used.
    Variable(StringId),

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    AddressOf(Box<Expr>),
    Paren(Box<Expr>),
    IsNone(Box<Expr>),
    Await(Box<Expr>),

    ChannelCreate(TypeExpr),
    ListCreate(TypeExpr),
    ListLiteral(Vec<Expr>),

    Call {
        callee: StringId,
        args: Vec<Expr>,
    },

    /// `object.method(args)`. Also doubles as a qualified function call
    /// (`module.func(args)`) when the object resolves to an imported
    /// module alias rather than a value — the type checker decides which.
    /// `object_type` is populated by the type checker so the emitter can
    /// pick the right lowering without re-deriving it.
    MethodCall {
        object: Box<Expr>,
        method: StringId,
        args: Vec<Expr>,
        object_type: RefCell<Option<TypeInfo>>,
    },

    FieldAccess {
        object: Box<Expr>,
        field: StringId,
    },

    StructLiteral {
        name: StringId,
        fields: Vec<(StringId, Expr)>,
    },

    Fail(Box<Expr>),
    Or {
        inner: Box<Expr>,
        handler: OrHandler,
    },
    Default {
        value: Box<Expr>,
        fallback: Box<Expr>,
    },
}

#[derive(Debug, Clone)]
pub enum OrHandler {
    Return(Option<Box<Expr>>),
    Fail(Box<Expr>),
    Block(Vec<Stmt>),
    Match(Vec<MatchArm>),
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    /// `None` is the wildcard arm `_`.
    pub error_type: Option<StringId>,
    pub body: MatchArmBody,
}

#[derive(Debug, Clone)]
pub enum MatchArmBody {
    Expr(Box<Expr>),
    Fail(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct SelectCase {
    pub binding: Option<StringId>,
    pub channel: Expr,
    pub operation: SelectOp,
    pub send_value: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOp {
    Recv,
    Send,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    VarDecl {
        name: StringId,
        declared_type: Option<TypeExpr>,
        value: Expr,
    },
    Assign {
        name: StringId,
        value: Expr,
    },
    FieldAssign {
        object: Expr,
        field: StringId,
        value: Expr,
    },
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    ForRange {
        var: StringId,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },
    ForEach {
        var: StringId,
        collection: Expr,
        body: Vec<Stmt>,
    },
    Select {
        cases: Vec<SelectCase>,
    },
    With {
        resource: Expr,
        name: StringId,
        body: Vec<Stmt>,
    },
    GoSpawn(Expr),
    Fail(Expr),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: StringId,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: StringId,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: StringId,
    pub fields: Vec<FieldDef>,
    pub visibility: Visibility,
    pub doc: Option<StringId>,
    pub span: SourceSpan,
}

/// Inherits `message: str` and `cause: <this error type>?` implicitly;
/// `fields` holds only the caller-declared extras.
#[derive(Debug, Clone)]
pub struct ErrorDef {
    pub name: StringId,
    pub fields: Vec<FieldDef>,
    pub visibility: Visibility,
    pub doc: Option<StringId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: StringId,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub error_type: Option<StringId>,
    pub body: Vec<Stmt>,
    pub visibility: Visibility,
    pub is_async: bool,
    pub doc: Option<StringId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub owner: StringId,
    pub name: StringId,
    /// First entry is always `self`, typed as `owner`.
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub error_type: Option<StringId>,
    pub body: Vec<Stmt>,
    pub visibility: Visibility,
    pub is_async: bool,
    pub doc: Option<StringId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ExternDef {
    pub name: StringId,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub library: StringId,
    pub visibility: Visibility,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ImportDef {
    pub dotted_path: Vec<StringId>,
    pub alias: StringId,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub imports: Vec<ImportDef>,
    pub structs: Vec<StructDef>,
    pub errors: Vec<ErrorDef>,
    pub functions: Vec<FunctionDef>,
    pub methods: Vec<MethodDef>,
    pub externs: Vec<ExternDef>,
}

impl Program {
    pub fn merge(&mut self, other: Program) {
        self.imports.extend(other.imports);
        self.structs.extend(other.structs);
        self.errors.extend(other.errors);
        self.functions.extend(other.functions);
        self.methods.extend(other.methods);
        self.externs.extend(other.externs);
    }
}
