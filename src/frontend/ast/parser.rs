//! Recursive-descent parser: tokens -> `Program`. Expressions use three-level
//! precedence climbing; statements use bounded lookahead (save position,
//! try, restore on mismatch) to disambiguate declarations from assignments
//! and calls.

use crate::frontend::ast::nodes::*;
use crate::frontend::ast::prescan::{prescan, PrescanTables};
use crate::frontend::errors::{CompileError, ErrorKind};
use crate::frontend::lexer::tokens::{SourceSpan, Token, TokenKind};
use crate::frontend::dev_log::parse_log;
use crate::frontend::string_interning::StringTable;
use std::path::PathBuf;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: PathBuf,
    prescan: PrescanTables,
}

type PResult<T> = Result<T, CompileError>;

impl Parser {
    pub fn new(tokens: Vec<Token>, file: PathBuf) -> Self {
        let prescan = prescan(&tokens);
        Self {
            tokens,
            pos: 0,
            file,
            prescan,
        }
    }

    fn current(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn current_span(&self) -> SourceSpan {
        self.tokens[self.pos].span.clone()
    }

    fn current_lexeme(&self) -> String {
        self.tokens[self.pos].lexeme.clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(kind)
    }

    fn unexpected(&self) -> CompileError {
        CompileError::new(
            ErrorKind::Parse,
            format!(
                "unexpected token '{}' at line {}",
                self.current_lexeme(),
                self.current_span().line()
            ),
            self.current_span(),
        )
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_identifier(&mut self) -> PResult<(crate::frontend::string_interning::StringId, SourceSpan)> {
        let span = self.current_span();
        match self.current().clone() {
            TokenKind::Identifier(id) => {
                self.advance();
                Ok((id, span))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn save(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, mark: usize) {
        self.pos = mark;
    }

    // ---- top level -------------------------------------------------

    pub fn parse_program(&mut self, strings: &mut StringTable) -> PResult<Program> {
        let mut program = Program::default();

        while matches!(self.current(), TokenKind::Import) {
            program.imports.push(self.parse_import()?);
        }

        if matches!(self.current(), TokenKind::Import) {
            return Err(CompileError::new(
                ErrorKind::Parse,
                "imports must precede definitions",
                self.current_span(),
            ));
        }

        while !matches!(self.current(), TokenKind::Eof) {
            self.parse_definition(&mut program, strings)?;
        }

        parse_log!("parsed program: {} functions, {} structs", program.functions.len(), program.structs.len());
        Ok(program)
    }

    fn parse_import(&mut self) -> PResult<ImportDef> {
        let start = self.current_span();
        self.expect(TokenKind::Import)?;
        let mut path = Vec::new();
        let (first, _) = self.expect_identifier()?;
        path.push(first);
        while matches!(self.current(), TokenKind::Dot) {
            self.advance();
            let (seg, _) = self.expect_identifier()?;
            path.push(seg);
        }
        self.expect(TokenKind::Semicolon)?;
        let alias = *path.last().unwrap();
        Ok(ImportDef {
            dotted_path: path,
            alias,
            span: start,
        })
    }

    fn parse_definition(&mut self, program: &mut Program, _strings: &mut StringTable) -> PResult<()> {
        let mut doc = None;
        while let TokenKind::DocComment(id) = self.current() {
            doc = Some(*id);
            self.advance();
        }

        let is_extern = self.parse_optional_extern_attribute()?;

        let mut visibility = Visibility::Public;
        if matches!(self.current(), TokenKind::At) && matches!(self.peek_at(1), TokenKind::Private) {
            self.advance();
            self.advance();
            visibility = Visibility::Private;
        }

        if let Some(library) = is_extern {
            let extern_def = self.parse_extern(library, visibility)?;
            program.externs.push(extern_def);
            return Ok(());
        }

        if matches!(self.current(), TokenKind::Fn) {
            let function = self.parse_function(visibility, doc)?;
            program.functions.push(function);
            return Ok(());
        }

        if let TokenKind::Identifier(_) = self.current() {
            if matches!(self.peek_at(1), TokenKind::DoubleColon) {
                return self.parse_colon_colon_definition(program, visibility, doc);
            }
        }

        Err(self.unexpected())
    }

    fn parse_optional_extern_attribute(
        &mut self,
    ) -> PResult<Option<crate::frontend::string_interning::StringId>> {
        if !matches!(self.current(), TokenKind::At) || !matches!(self.peek_at(1), TokenKind::Extern) {
            return Ok(None);
        }
        self.advance();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let lib = match self.current().clone() {
            TokenKind::StringLiteral(id) => {
                self.advance();
                id
            }
            _ => return Err(self.unexpected()),
        };
        self.expect(TokenKind::RParen)?;
        Ok(Some(lib))
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn parse_colon_colon_definition(
        &mut self,
        program: &mut Program,
        visibility: Visibility,
        doc: Option<crate::frontend::string_interning::StringId>,
    ) -> PResult<()> {
        let span = self.current_span();
        let (owner, _) = self.expect_identifier()?;
        self.expect(TokenKind::DoubleColon)?;

        match self.current() {
            TokenKind::Struct => {
                self.advance();
                let fields = self.parse_field_list()?;
                program.structs.push(StructDef {
                    name: owner,
                    fields,
                    visibility,
                    doc,
                    span,
                });
                Ok(())
            }
            TokenKind::Err => {
                self.advance();
                let fields = if matches!(self.current(), TokenKind::LBrace) {
                    self.parse_field_list()?
                } else {
                    self.expect(TokenKind::Semicolon)?;
                    Vec::new()
                };
                program.errors.push(ErrorDef {
                    name: owner,
                    fields,
                    visibility,
                    doc,
                    span,
                });
                Ok(())
            }
            TokenKind::Identifier(_) => {
                let method = self.parse_method(owner, visibility, doc, span)?;
                program.methods.push(method);
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_field_list(&mut self) -> PResult<Vec<FieldDef>> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.current(), TokenKind::RBrace) {
            let (name, _) = self.expect_identifier()?;
            let ty = self.parse_type()?;
            fields.push(FieldDef { name, ty });
            if matches!(self.current(), TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }

    fn parse_extern(
        &mut self,
        library: crate::frontend::string_interning::StringId,
        visibility: Visibility,
    ) -> PResult<ExternDef> {
        let span = self.current_span();
        self.expect(TokenKind::Fn)?;
        let (name, _) = self.expect_identifier()?;
        let params = self.parse_param_list()?;
        let return_type = self.parse_optional_return_type()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(ExternDef {
            name,
            params,
            return_type,
            library,
            visibility,
            span,
        })
    }

    fn parse_function(
        &mut self,
        visibility: Visibility,
        doc: Option<crate::frontend::string_interning::StringId>,
    ) -> PResult<FunctionDef> {
        let span = self.current_span();
        self.expect(TokenKind::Fn)?;
        let is_async = false; // async is signaled by presence of `await`/`go` in body in this surface; see checker.
        let (name, _) = self.expect_identifier()?;
        let params = self.parse_param_list()?;
        let return_type = self.parse_optional_return_type()?;
        let error_type = self.parse_optional_error_type()?;
        let body = self.parse_block()?;
        Ok(FunctionDef {
            name,
            params,
            return_type,
            error_type,
            body,
            visibility,
            is_async,
            doc,
            span,
        })
    }

    fn parse_method(
        &mut self,
        owner: crate::frontend::string_interning::StringId,
        visibility: Visibility,
        doc: Option<crate::frontend::string_interning::StringId>,
        span: SourceSpan,
    ) -> PResult<MethodDef> {
        let (name, _) = self.expect_identifier()?;
        let mut params = self.parse_param_list()?;
        if let Some(self_param) = params.first_mut() {
            self_param.ty = TypeExpr {
                shape: TypeShape::Named {
                    qualifier: None,
                    name: owner,
                },
                optional: false,
            };
        }
        let return_type = self.parse_optional_return_type()?;
        let error_type = self.parse_optional_error_type()?;
        let body = self.parse_block()?;
        Ok(MethodDef {
            owner,
            name,
            params,
            return_type,
            error_type,
            body,
            visibility,
            is_async: false,
            doc,
            span,
        })
    }

    fn parse_param_list(&mut self) -> PResult<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !matches!(self.current(), TokenKind::RParen) {
            if let TokenKind::Identifier(_) = self.current() {
                if strings_is_self(self) {
                    let (name, _) = self.expect_identifier()?;
                    params.push(Param {
                        name,
                        ty: TypeExpr {
                            shape: TypeShape::Named {
                                qualifier: None,
                                name,
                            },
                            optional: false,
                        },
                    });
                    if matches!(self.current(), TokenKind::Comma) {
                        self.advance();
                    }
                    continue;
                }
            }
            let ty = self.parse_type()?;
            let (name, _) = self.expect_identifier()?;
            params.push(Param { name, ty });
            if matches!(self.current(), TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_optional_return_type(&mut self) -> PResult<Option<TypeExpr>> {
        if matches!(self.current(), TokenKind::Arrow) {
            self.advance();
            Ok(Some(self.parse_type()?))
        } else {
            Ok(None)
        }
    }

    fn parse_optional_error_type(&mut self) -> PResult<Option<crate::frontend::string_interning::StringId>> {
        if matches!(self.current(), TokenKind::Err) {
            self.advance();
            let (name, _) = self.expect_identifier()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    // ---- types -------------------------------------------------------

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        let shape = match self.current().clone() {
            TokenKind::Int => { self.advance(); TypeShape::Primitive(PrimitiveKind::Int) }
            TokenKind::Str => { self.advance(); TypeShape::Primitive(PrimitiveKind::Str) }
            TokenKind::Bool => { self.advance(); TypeShape::Primitive(PrimitiveKind::Bool) }
            TokenKind::Char => { self.advance(); TypeShape::Primitive(PrimitiveKind::Char) }
            TokenKind::F32 => { self.advance(); TypeShape::Primitive(PrimitiveKind::F32) }
            TokenKind::F64 => { self.advance(); TypeShape::Primitive(PrimitiveKind::F64) }
            TokenKind::U32 => { self.advance(); TypeShape::Primitive(PrimitiveKind::U32) }
            TokenKind::U64 => { self.advance(); TypeShape::Primitive(PrimitiveKind::U64) }
            TokenKind::Cint => { self.advance(); TypeShape::Primitive(PrimitiveKind::Cint) }
            TokenKind::Cstr => { self.advance(); TypeShape::Primitive(PrimitiveKind::Cstr) }
            TokenKind::Void => { self.advance(); TypeShape::Primitive(PrimitiveKind::Void) }
            TokenKind::Channel => {
                self.advance();
                self.expect(TokenKind::Less)?;
                let inner = self.parse_type()?;
                self.expect(TokenKind::Greater)?;
                TypeShape::Channel(Box::new(inner))
            }
            TokenKind::List => {
                self.advance();
                self.expect(TokenKind::Less)?;
                let inner = self.parse_type()?;
                self.expect(TokenKind::Greater)?;
                TypeShape::List(Box::new(inner))
            }
            TokenKind::Fn => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let mut params = Vec::new();
                while !matches!(self.current(), TokenKind::RParen) {
                    params.push(self.parse_type()?);
                    if matches!(self.current(), TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RParen)?;
                let ret = self.parse_optional_return_type()?.map(Box::new);
                TypeShape::Function { params, ret }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let mut qualifier = None;
                let mut resolved_name = name;
                if matches!(self.current(), TokenKind::Dot) {
                    self.advance();
                    let (inner, _) = self.expect_identifier()?;
                    qualifier = Some(name);
                    resolved_name = inner;
                }
                TypeShape::Named {
                    qualifier,
                    name: resolved_name,
                }
            }
            _ => return Err(self.unexpected()),
        };

        let optional = if matches!(self.current(), TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        Ok(TypeExpr { shape, optional })
    }

    // ---- statements ----------------------------------------------------

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !matches!(self.current(), TokenKind::RBrace) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let span = self.current_span();
        match self.current().clone() {
            TokenKind::Return => {
                self.advance();
                let value = if matches!(self.current(), TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::new(StmtKind::Return(value), span))
            }
            TokenKind::Fail => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::new(StmtKind::Fail(inner), span))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Select => self.parse_select(),
            TokenKind::With => self.parse_with(),
            TokenKind::Go => {
                self.advance();
                let call = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::new(StmtKind::GoSpawn(call), span))
            }
            TokenKind::Channel | TokenKind::List | TokenKind::Int | TokenKind::Str
            | TokenKind::Bool | TokenKind::Char | TokenKind::F32 | TokenKind::F64
            | TokenKind::U32 | TokenKind::U64 | TokenKind::Cint | TokenKind::Cstr => {
                self.parse_typed_declaration(span)
            }
            TokenKind::Identifier(_) => self.parse_identifier_led_statement(span),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_typed_declaration(&mut self, span: SourceSpan) -> PResult<Stmt> {
        let ty = self.parse_type()?;
        let (name, _) = self.expect_identifier()?;
        self.expect(TokenKind::Equals)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(
            StmtKind::VarDecl {
                name,
                declared_type: Some(ty),
                value,
            },
            span,
        ))
    }

    fn parse_identifier_led_statement(&mut self, span: SourceSpan) -> PResult<Stmt> {
        // Try `Type name = expr;` where Type is a bare/qualified/generic
        // identifier type, using save-position-and-retry since the same
        // leading tokens can also be a plain expression statement.
        let mark = self.save();
        if let Ok(stmt) = self.try_parse_named_type_declaration(span.clone()) {
            return Ok(stmt);
        }
        self.restore(mark);

        let (name, _) = self.expect_identifier()?;

        match self.current().clone() {
            TokenKind::ColonEquals => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::new(
                    StmtKind::VarDecl {
                        name,
                        declared_type: None,
                        value,
                    },
                    span,
                ))
            }
            TokenKind::Equals => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::new(StmtKind::Assign { name, value }, span))
            }
            TokenKind::PlusEqual | TokenKind::MinusEqual | TokenKind::StarEqual | TokenKind::SlashEqual => {
                let op = compound_op(self.current());
                self.advance();
                let rhs = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                let var = Expr::new(ExprKind::Variable(name), span.clone());
                let desugared = Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(var),
                        right: Box::new(rhs),
                    },
                    span.clone(),
                );
                Ok(Stmt::new(
                    StmtKind::Assign {
                        name,
                        value: desugared,
                    },
                    span,
                ))
            }
            TokenKind::LParen => {
                let args = self.parse_arg_list()?;
                self.expect(TokenKind::Semicolon)?;
                let call = Expr::new(ExprKind::Call { callee: name, args }, span.clone());
                Ok(Stmt::new(StmtKind::Expr(call), span))
            }
            TokenKind::Dot => {
                let object = Expr::new(ExprKind::Variable(name), span.clone());
                let expr = self.parse_postfix_from(object)?;
                self.finish_object_statement(expr, span)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn try_parse_named_type_declaration(&mut self, span: SourceSpan) -> PResult<Stmt> {
        let ty = self.parse_type()?;
        if !matches!(self.current(), TokenKind::Identifier(_)) {
            return Err(self.unexpected());
        }
        let (name, _) = self.expect_identifier()?;
        self.expect(TokenKind::Equals)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::new(
            StmtKind::VarDecl {
                name,
                declared_type: Some(ty),
                value,
            },
            span,
        ))
    }

    fn finish_object_statement(&mut self, expr: Expr, span: SourceSpan) -> PResult<Stmt> {
        match self.current().clone() {
            TokenKind::Equals => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                match expr.kind {
                    ExprKind::FieldAccess { object, field } => Ok(Stmt::new(
                        StmtKind::FieldAssign {
                            object: *object,
                            field,
                            value,
                        },
                        span,
                    )),
                    _ => Err(self.unexpected()),
                }
            }
            TokenKind::Semicolon => {
                self.advance();
                match expr.kind {
                    ExprKind::MethodCall { .. } | ExprKind::Call { .. } => {
                        Ok(Stmt::new(StmtKind::Expr(expr), span))
                    }
                    _ => Err(self.unexpected()),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let span = self.current_span();
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if matches!(self.current(), TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_body,
                else_body,
            },
            span,
        ))
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let span = self.current_span();
        self.expect(TokenKind::While)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::While { cond, body }, span))
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let span = self.current_span();
        self.expect(TokenKind::For)?;
        let (var, _) = self.expect_identifier()?;
        self.expect(TokenKind::In)?;
        let first = self.parse_expr()?;
        if matches!(self.current(), TokenKind::DotDot) {
            self.advance();
            let end = self.parse_expr()?;
            let body = self.parse_block()?;
            Ok(Stmt::new(
                StmtKind::ForRange {
                    var,
                    start: first,
                    end,
                    body,
                },
                span,
            ))
        } else {
            let body = self.parse_block()?;
            Ok(Stmt::new(
                StmtKind::ForEach {
                    var,
                    collection: first,
                    body,
                },
                span,
            ))
        }
    }

    fn parse_select(&mut self) -> PResult<Stmt> {
        let span = self.current_span();
        self.expect(TokenKind::Select)?;
        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        while matches!(self.current(), TokenKind::Case) {
            self.advance();
            cases.push(self.parse_select_case()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::new(StmtKind::Select { cases }, span))
    }

    fn parse_select_case(&mut self) -> PResult<SelectCase> {
        let mark = self.save();
        let binding = if let TokenKind::Identifier(name) = self.current().clone() {
            if matches!(self.peek_at(1), TokenKind::ColonEquals) {
                self.advance();
                self.advance();
                Some(name)
            } else {
                self.restore(mark);
                None
            }
        } else {
            None
        };

        let object_span = self.current_span();
        let (object_name, _) = self.expect_identifier()?;
        self.expect(TokenKind::Dot)?;
        let method_lexeme = self.current_lexeme();
        self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;

        let channel = Expr::new(ExprKind::Variable(object_name), object_span);

        let (operation, send_value) = if method_lexeme == "send" {
            let value = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            (SelectOp::Send, Some(value))
        } else {
            self.expect(TokenKind::RParen)?;
            (SelectOp::Recv, None)
        };

        let body = self.parse_block()?;

        Ok(SelectCase {
            binding,
            channel,
            operation,
            send_value,
            body,
        })
    }

    fn parse_with(&mut self) -> PResult<Stmt> {
        let span = self.current_span();
        self.expect(TokenKind::With)?;
        let resource = self.parse_expr()?;
        self.expect(TokenKind::As)?;
        let (name, _) = self.expect_identifier()?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::With {
                resource,
                name,
                body,
            },
            span,
        ))
    }

    // ---- expressions ---------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        let left = self.parse_default_expr()?;
        if matches!(self.current(), TokenKind::Or) {
            let span = left.span.clone();
            self.advance();
            let handler = self.parse_or_handler()?;
            Ok(Expr::new(
                ExprKind::Or {
                    inner: Box::new(left),
                    handler,
                },
                span,
            ))
        } else {
            Ok(left)
        }
    }

    fn parse_or_handler(&mut self) -> PResult<OrHandler> {
        match self.current().clone() {
            TokenKind::Return => {
                self.advance();
                let value = if matches!(self.current(), TokenKind::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                self.consume_semicolon_if_present();
                Ok(OrHandler::Return(value))
            }
            TokenKind::Fail => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume_semicolon_if_present();
                Ok(OrHandler::Fail(Box::new(inner)))
            }
            TokenKind::LBrace => {
                let body = self.parse_block()?;
                Ok(OrHandler::Block(body))
            }
            TokenKind::Match => {
                self.advance();
                self.expect(TokenKind::Err)?;
                self.expect(TokenKind::LBrace)?;
                let mut arms = Vec::new();
                while !matches!(self.current(), TokenKind::RBrace) {
                    arms.push(self.parse_match_arm()?);
                }
                self.expect(TokenKind::RBrace)?;
                Ok(OrHandler::Match(arms))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn consume_semicolon_if_present(&mut self) {
        if matches!(self.current(), TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn parse_match_arm(&mut self) -> PResult<MatchArm> {
        // The wildcard arm `_` lexes as an ordinary identifier; typeck
        // recognizes it by its resolved text.
        let (id, _) = self.expect_identifier()?;
        let error_type = Some(id);
        self.expect(TokenKind::Arrow)?;
        let body = if matches!(self.current(), TokenKind::Fail) {
            self.advance();
            let inner = self.parse_expr()?;
            MatchArmBody::Fail(Box::new(inner))
        } else {
            MatchArmBody::Expr(Box::new(self.parse_expr()?))
        };
        if matches!(self.current(), TokenKind::Comma) {
            self.advance();
        }
        Ok(MatchArm { error_type, body })
    }

    fn parse_default_expr(&mut self) -> PResult<Expr> {
        let left = self.parse_comparison()?;
        if matches!(self.current(), TokenKind::Default) {
            let span = left.span.clone();
            self.advance();
            let fallback = self.parse_comparison()?;
            Ok(Expr::new(
                ExprKind::Default {
                    value: Box::new(left),
                    fallback: Box::new(fallback),
                },
                span,
            ))
        } else {
            Ok(left)
        }
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                TokenKind::EqualEqual => Some(BinaryOp::Eq),
                TokenKind::NotEqual => Some(BinaryOp::Ne),
                TokenKind::Less => Some(BinaryOp::Lt),
                TokenKind::Greater => Some(BinaryOp::Gt),
                TokenKind::LessEqual => Some(BinaryOp::Le),
                TokenKind::GreaterEqual => Some(BinaryOp::Ge),
                _ => None,
            };
            if let Some(op) = op {
                let span = left.span.clone();
                self.advance();
                let right = self.parse_additive()?;
                left = Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                );
                continue;
            }

            if matches!(self.current(), TokenKind::Is) {
                let span = left.span.clone();
                self.advance();
                self.expect(TokenKind::None)?;
                left = Expr::new(ExprKind::IsNone(Box::new(left)), span);
                continue;
            }

            break;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                TokenKind::Plus => Some(BinaryOp::Add),
                TokenKind::Minus => Some(BinaryOp::Sub),
                TokenKind::Star => Some(BinaryOp::Mul),
                TokenKind::Slash => Some(BinaryOp::Div),
                _ => None,
            };
            let Some(op) = op else { break };
            let span = left.span.clone();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let span = self.current_span();
        match self.current() {
            TokenKind::Bang => {
                self.advance();
                Ok(Expr::new(ExprKind::Not(Box::new(self.parse_unary()?)), span))
            }
            TokenKind::Ampersand => {
                self.advance();
                Ok(Expr::new(ExprKind::AddressOf(Box::new(self.parse_unary()?)), span))
            }
            TokenKind::Await => {
                self.advance();
                Ok(Expr::new(ExprKind::Await(Box::new(self.parse_unary()?)), span))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let primary = self.parse_primary()?;
        self.parse_postfix_from(primary)
    }

    fn parse_postfix_from(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            if matches!(self.current(), TokenKind::Dot) {
                let span = expr.span.clone();
                self.advance();
                let (field, _) = self.expect_identifier()?;
                if matches!(self.current(), TokenKind::LParen) {
                    let args = self.parse_arg_list()?;
                    expr = Expr::new(
                        ExprKind::MethodCall {
                            object: Box::new(expr),
                            method: field,
                            args,
                            object_type: std::cell::RefCell::new(None),
                        },
                        span,
                    );
                } else {
                    expr = Expr::new(
                        ExprKind::FieldAccess {
                            object: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        while !matches!(self.current(), TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if matches!(self.current(), TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.current_span();
        match self.current().clone() {
            TokenKind::IntLiteral(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral(v), span))
            }
            TokenKind::FloatLiteral(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::FloatLiteral(v), span))
            }
            TokenKind::StringLiteral(id) => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(id), span))
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                Ok(Expr::new(ExprKind::CharLiteral(c), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(false), span))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::new(ExprKind::NoneLiteral, span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !matches!(self.current(), TokenKind::RBracket) {
                    items.push(self.parse_expr()?);
                    if matches!(self.current(), TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::new(ExprKind::ListLiteral(items), span))
            }
            TokenKind::Channel => {
                self.advance();
                self.expect(TokenKind::Less)?;
                let inner = self.parse_type()?;
                self.expect(TokenKind::Greater)?;
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::ChannelCreate(inner), span))
            }
            TokenKind::List => {
                self.advance();
                self.expect(TokenKind::Less)?;
                let inner = self.parse_type()?;
                self.expect(TokenKind::Greater)?;
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::ListCreate(inner), span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let is_literal_name = self.prescan.structs.contains(&name) || self.prescan.errors.contains(&name);
                if is_literal_name && matches!(self.current(), TokenKind::LBrace) {
                    self.advance();
                    let mut fields = Vec::new();
                    while !matches!(self.current(), TokenKind::RBrace) {
                        let (field, _) = self.expect_identifier()?;
                        self.expect(TokenKind::Colon)?;
                        let value = self.parse_expr()?;
                        fields.push((field, value));
                        if matches!(self.current(), TokenKind::Comma) {
                            self.advance();
                        }
                    }
                    self.expect(TokenKind::RBrace)?;
                    return Ok(Expr::new(ExprKind::StructLiteral { name, fields }, span));
                }

                if matches!(self.current(), TokenKind::LParen) {
                    let args = self.parse_arg_list()?;
                    return Ok(Expr::new(ExprKind::Call { callee: name, args }, span));
                }

                Ok(Expr::new(ExprKind::Variable(name), span))
            }
            TokenKind::Fail => {
                self.advance();
                let inner = self.parse_expr()?;
                Ok(Expr::new(ExprKind::Fail(Box::new(inner)), span))
            }
            _ => Err(self.unexpected()),
        }
    }
}

fn compound_op(kind: &TokenKind) -> BinaryOp {
    match kind {
        TokenKind::PlusEqual => BinaryOp::Add,
        TokenKind::MinusEqual => BinaryOp::Sub,
        TokenKind::StarEqual => BinaryOp::Mul,
        TokenKind::SlashEqual => BinaryOp::Div,
        _ => unreachable!("compound_op called on a non-compound-assign token"),
    }
}

fn strings_is_self(parser: &Parser) -> bool {
    matches!(parser.current(), TokenKind::Identifier(_)) && parser.current_lexeme() == "self"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;
    use std::path::PathBuf;

    fn parse(source: &str) -> (Program, StringTable) {
        let mut strings = StringTable::new();
        let tokens = tokenize(source, &PathBuf::from("t.gl"), &mut strings).unwrap();
        let mut parser = Parser::new(tokens, PathBuf::from("t.gl"));
        let program = parser.parse_program(&mut strings).unwrap();
        (program, strings)
    }

    #[test]
    fn parses_hello_world() {
        let (program, strings) = parse(r#"fn main() { print("Hello, World!"); }"#);
        assert_eq!(program.functions.len(), 1);
        assert_eq!(strings.resolve(program.functions[0].name), "main");
    }

    #[test]
    fn dispatches_struct_error_and_method_definitions_on_the_token_after_double_colon() {
        let (program, _strings) = parse(
            "Pt :: struct { x int, y int }\n\
             ParseErr :: err;\n\
             Pt :: sum(self) -> int { return self.x + self.y; }",
        );
        assert_eq!(program.structs.len(), 1);
        assert_eq!(program.errors.len(), 1);
        assert_eq!(program.methods.len(), 1);
        assert_eq!(program.methods[0].params.len(), 1);
    }

    #[test]
    fn forward_referenced_struct_literal_parses_via_prescan() {
        let (program, _strings) = parse(
            "fn make() -> Pt { return Pt { x: 1, y: 2 }; }\n\
             Pt :: struct { x int, y int }",
        );
        assert_eq!(program.functions.len(), 1);
    }

    #[test]
    fn imports_before_any_definition_is_required() {
        let mut strings = StringTable::new();
        let tokens = tokenize(
            "fn main() {}\nimport a.b;",
            &PathBuf::from("t.gl"),
            &mut strings,
        )
        .unwrap();
        let mut parser = Parser::new(tokens, PathBuf::from("t.gl"));
        let result = parser.parse_program(&mut strings);
        assert!(result.is_err());
    }

    #[test]
    fn compound_assignment_desugars_to_binary_add() {
        let (program, _strings) = parse("fn main() { x := 1; x += 2; }");
        let body = &program.functions[0].body;
        match &body[1].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("expected desugared assignment, got {other:?}"),
        }
    }

    #[test]
    fn every_struct_has_a_field_list_even_if_empty() {
        let (program, _strings) = parse("Empty :: struct { }");
        assert_eq!(program.structs[0].fields.len(), 0);
    }
}
