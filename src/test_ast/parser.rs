//! TAST (Test AST) parser implementation.

use crate::ast::{
    ArrayType, AssignOp, Assignment, BasicType, BinaryOp, DeclFlags, DeclId, Definition,
    ExprKind, Expression, FileAst, FunctionCall, FunctionDefinition, FunctionType, Identifier,
    Literal, LiteralValue, ReturnStatement, ScopeId, SizedType, SourceLocation, Statement,
    StatementBlock, UnaryOp,
};

use super::ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Cursor position, saved for lookahead.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    pos: usize,
    line: u32,
    column: u32,
}

pub struct Parser<'a> {
    text: &'a str,
    cursor: Cursor,
    ast: FileAst,
    /// Scope new declarations go into.
    scope: ScopeId,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str, filename: Option<&str>) -> Self {
        let ast = FileAst::new(filename.map(str::to_string));
        let scope = ast.global_scope();
        Self {
            text,
            cursor: Cursor {
                pos: 0,
                line: 1,
                column: 1,
            },
            ast,
            scope,
        }
    }

    pub fn parse(mut self) -> ParseResult<FileAst> {
        self.skip_whitespace();
        while !self.is_eof() {
            self.parse_declaration()?;
            self.skip_whitespace();
        }
        Ok(self.ast)
    }

    fn is_eof(&self) -> bool {
        self.cursor.pos >= self.text.len()
    }

    fn rest(&self) -> &'a str {
        &self.text[self.cursor.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.cursor.line, self.cursor.column)
    }

    fn error<T>(&self, message: impl Into<String>) -> ParseResult<T> {
        Err(ParseError::new(self.location(), message))
    }

    /// Move past `len` bytes, keeping line and column current.
    fn bump(&mut self, len: usize) {
        let consumed = &self.text[self.cursor.pos..self.cursor.pos + len];
        for ch in consumed.chars() {
            if ch == '\n' {
                self.cursor.line += 1;
                self.cursor.column = 1;
            } else {
                self.cursor.column += 1;
            }
        }
        self.cursor.pos += len;
    }

    fn at_line_start(&self) -> bool {
        self.text[..self.cursor.pos]
            .rsplit('\n')
            .next()
            .map_or(true, |line| line.trim().is_empty())
    }

    fn skip_to_line_end(&mut self) {
        let len = self.rest().find('\n').unwrap_or(self.rest().len());
        self.bump(len);
    }

    /// Skip whitespace, `//` comments and lines starting with `;`.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.bump(ch.len_utf8());
            } else if self.rest().starts_with("//") || (ch == ';' && self.at_line_start()) {
                self.skip_to_line_end();
            } else {
                break;
            }
        }
    }

    fn peek_str(&mut self, s: &str) -> bool {
        self.skip_whitespace();
        self.rest().starts_with(s)
    }

    fn try_read(&mut self, s: &str) -> bool {
        if self.peek_str(s) {
            self.bump(s.len());
            true
        } else {
            false
        }
    }

    /// Read a one-character operator that is not the start of `op=`.
    fn try_read_operator(&mut self, op: char) -> bool {
        self.skip_whitespace();
        let mut chars = self.rest().chars();
        if chars.next() == Some(op) && chars.next() != Some('=') {
            self.bump(op.len_utf8());
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> ParseResult<()> {
        if !self.try_read(s) {
            let found = match self.peek_char() {
                Some(ch) => format!("'{}'", ch),
                None => "end of input".to_string(),
            };
            return self.error(format!("expected '{}' but found {}", s, found));
        }
        Ok(())
    }

    fn peek_keyword(&mut self, keyword: &str) -> bool {
        if !self.peek_str(keyword) {
            return false;
        }
        !self.rest()[keyword.len()..]
            .chars()
            .next()
            .is_some_and(is_ident_char)
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.bump(keyword.len());
            true
        } else {
            false
        }
    }

    fn read_identifier(&mut self) -> ParseResult<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        match rest.chars().next() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {}
            Some(ch) => return self.error(format!("expected identifier but found '{}'", ch)),
            None => return self.error("expected identifier but found end of input"),
        }

        let len = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
        self.bump(len);
        Ok(&rest[..len])
    }

    /// `name :` ahead, without consuming anything.
    fn is_declaration_start(&mut self) -> bool {
        let saved = self.cursor;
        let result = self.read_identifier().is_ok() && self.peek_str(":");
        self.cursor = saved;
        result
    }

    fn parse_declaration(&mut self) -> ParseResult<DeclId> {
        self.skip_whitespace();
        let location = self.location();
        let name = self.read_identifier()?;
        if self.ast.scope(self.scope).lookup(name).is_some() {
            return self.error(format!("`{}` is already declared in this scope", name));
        }
        self.expect(":")?;

        let declared = if self.peek_str(":") || self.peek_str("=") || self.peek_str(";") {
            None
        } else {
            Some(self.parse_type()?)
        };

        let mut flags = DeclFlags::empty();
        if self.try_read(":") {
            flags.insert(DeclFlags::IS_CONSTANT);
        } else if !self.try_read("=") {
            self.expect(";")?;
            let Some(ty) = declared else {
                return self.error(format!("declaration of `{}` needs a type", name));
            };
            return Ok(self.ast.declare(self.scope, name, Some(ty), flags, location));
        }

        if self.peek_keyword("fn") || self.peek_keyword("foreign") {
            return self.parse_function_definition(name, declared, flags, location);
        }

        let init = self.parse_expr(declared.as_ref())?;
        self.expect(";")?;

        let ty = match declared {
            Some(ty) => ty,
            None => match &init.ty {
                Some(ty) => {
                    flags.insert(DeclFlags::HAS_BEEN_INFERRED);
                    ty.clone()
                }
                None => return self.error(format!("cannot infer the type of `{}`", name)),
            },
        };

        let id = self.ast.declare(self.scope, name, Some(ty), flags, location);
        self.ast.define(id, Definition::Expression(init));
        Ok(id)
    }

    fn parse_function_definition(
        &mut self,
        name: &str,
        declared: Option<SizedType>,
        mut flags: DeclFlags,
        location: SourceLocation,
    ) -> ParseResult<DeclId> {
        let def_location = self.location();
        let signature = self.parse_function_type()?;
        let ty = match declared {
            Some(ty) => ty,
            None => {
                flags.insert(DeclFlags::HAS_BEEN_INFERRED);
                SizedType::Function(signature.clone())
            }
        };

        // declared before the body so the function can refer to itself
        let id = self.ast.declare(self.scope, name, Some(ty), flags, location);

        let body = if self.peek_str("{") {
            let scope = self.ast.add_scope(self.scope);
            Some(self.parse_block(scope)?)
        } else {
            self.expect(";")?;
            None
        };

        self.ast.define(
            id,
            Definition::Function(FunctionDefinition {
                signature,
                body,
                location: def_location,
            }),
        );
        Ok(id)
    }

    fn parse_block(&mut self, scope: ScopeId) -> ParseResult<StatementBlock> {
        self.skip_whitespace();
        let location = self.location();
        self.expect("{")?;

        let outer = std::mem::replace(&mut self.scope, scope);
        let mut statements = Vec::new();
        loop {
            if self.try_read("}") {
                break;
            }
            if self.is_eof() {
                return self.error("unterminated block");
            }
            statements.push(self.parse_statement()?);
        }
        self.scope = outer;

        Ok(StatementBlock {
            statements,
            scope,
            location,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.skip_whitespace();
        let location = self.location();

        if self.peek_str("{") {
            let scope = self.ast.add_scope(self.scope);
            return Ok(Statement::Block(self.parse_block(scope)?));
        }

        if self.try_keyword("return") {
            let value = if self.peek_str(";") {
                None
            } else {
                Some(self.parse_expr(None)?)
            };
            self.expect(";")?;
            return Ok(Statement::Return(ReturnStatement { value, location }));
        }

        if self.is_declaration_start() {
            return Ok(Statement::Declaration(self.parse_declaration()?));
        }

        let lhs = self.parse_expr(None)?;
        if self.try_read(";") {
            return match lhs.kind {
                ExprKind::Call(call) => Ok(Statement::Call(call)),
                _ => Err(ParseError::new(
                    location,
                    "expression statement must be a call or an assignment",
                )),
            };
        }

        let op = self.parse_assign_op()?;
        let rhs = self.parse_expr(lhs.ty.as_ref())?;
        self.expect(";")?;
        Ok(Statement::Assignment(Assignment {
            lhs,
            rhs,
            op,
            location,
        }))
    }

    fn parse_assign_op(&mut self) -> ParseResult<AssignOp> {
        let op = if self.try_read("+=") {
            AssignOp::AddAssign
        } else if self.try_read("-=") {
            AssignOp::SubAssign
        } else if self.try_read("*=") {
            AssignOp::MulAssign
        } else if self.try_read("/=") {
            AssignOp::DivAssign
        } else if self.try_read("=") {
            AssignOp::Assign
        } else {
            return self.error("expected an assignment operator");
        };
        Ok(op)
    }

    fn parse_type(&mut self) -> ParseResult<SizedType> {
        if self.try_read("[") {
            if self.try_read("]") {
                let element = self.parse_type()?;
                return Ok(SizedType::Array(ArrayType::dynamic(element)));
            }
            self.skip_whitespace();
            let count_location = self.location();
            let count = self.parse_count()?;
            self.expect("]")?;
            let element = self.parse_type()?;
            return match ArrayType::fixed(element, count) {
                Ok(array) => Ok(SizedType::Array(array)),
                Err(e) => Err(ParseError::new(count_location, e.to_string())),
            };
        }

        if self.peek_keyword("fn") || self.peek_keyword("foreign") {
            return Ok(SizedType::Function(self.parse_function_type()?));
        }

        let location = self.location();
        let name = self.read_identifier()?;
        match BasicType::from_name(name) {
            Some(basic) => Ok(SizedType::direct(basic)),
            None => Err(ParseError::new(location, format!("unknown type `{}`", name))),
        }
    }

    fn parse_count(&mut self) -> ParseResult<u64> {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(rest.len());
        let count = rest[..len].parse::<u64>();
        match count {
            Ok(count) => {
                self.bump(len);
                Ok(count)
            }
            Err(_) => self.error("expected an array length"),
        }
    }

    fn parse_function_type(&mut self) -> ParseResult<FunctionType> {
        let foreign = self.try_keyword("foreign");
        if !self.try_keyword("fn") {
            return self.error("expected `fn`");
        }
        self.expect("(")?;

        let mut params = Vec::new();
        let mut variadic = false;
        if !self.try_read(")") {
            loop {
                if self.try_read("...") {
                    variadic = true;
                    self.expect(")")?;
                    break;
                }
                params.push(self.parse_type()?);
                if !self.try_read(",") {
                    self.expect(")")?;
                    break;
                }
            }
        }

        let return_type = if self.try_read("->") {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut ty = FunctionType::new(params, return_type);
        if foreign {
            ty = ty.foreign();
        }
        if variadic {
            ty = ty.variadic();
        }
        Ok(ty)
    }

    /// Parse an expression. Literals take their type from `hint` where it fits.
    fn parse_expr(&mut self, hint: Option<&SizedType>) -> ParseResult<Expression> {
        let mut lhs = self.parse_additive(hint)?;
        loop {
            self.skip_whitespace();
            let location = self.location();
            let op = if self.try_read("==") {
                BinaryOp::Eq
            } else if self.try_read("!=") {
                BinaryOp::Ne
            } else if self.try_read("<=") {
                BinaryOp::Le
            } else if self.try_read(">=") {
                BinaryOp::Ge
            } else if self.try_read("<") {
                BinaryOp::Lt
            } else if self.try_read(">") {
                BinaryOp::Gt
            } else {
                break;
            };
            let rhs = self.parse_additive(hint)?;
            lhs = binary(op, lhs, rhs, Some(SizedType::direct(BasicType::Bool)), location);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self, hint: Option<&SizedType>) -> ParseResult<Expression> {
        let mut lhs = self.parse_multiplicative(hint)?;
        loop {
            self.skip_whitespace();
            let location = self.location();
            let op = if self.try_read_operator('+') {
                BinaryOp::Add
            } else if self.try_read_operator('-') {
                BinaryOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative(hint)?;
            let ty = lhs.ty.clone().or_else(|| rhs.ty.clone());
            lhs = binary(op, lhs, rhs, ty, location);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self, hint: Option<&SizedType>) -> ParseResult<Expression> {
        let mut lhs = self.parse_unary(hint)?;
        loop {
            self.skip_whitespace();
            let location = self.location();
            let op = if self.try_read_operator('*') {
                BinaryOp::Mul
            } else if self.try_read_operator('/') {
                BinaryOp::Div
            } else if self.try_read_operator('%') {
                BinaryOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_unary(hint)?;
            let ty = lhs.ty.clone().or_else(|| rhs.ty.clone());
            lhs = binary(op, lhs, rhs, ty, location);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, hint: Option<&SizedType>) -> ParseResult<Expression> {
        self.skip_whitespace();
        let location = self.location();

        let negative_literal = self.rest().starts_with('-')
            && self.rest()[1..].starts_with(|ch: char| ch.is_ascii_digit());
        if negative_literal {
            return self.parse_postfix(hint);
        }

        let op = if self.try_read_operator('-') {
            UnaryOp::Negate
        } else if self.try_read_operator('!') {
            UnaryOp::Not
        } else if self.try_read_operator('~') {
            UnaryOp::BitNot
        } else if self.try_read_operator('*') {
            UnaryOp::Deref
        } else {
            return self.parse_postfix(hint);
        };

        let operand = self.parse_unary(hint)?;
        let ty = match op {
            UnaryOp::Negate | UnaryOp::BitNot => operand.ty.clone(),
            UnaryOp::Not => Some(SizedType::direct(BasicType::Bool)),
            UnaryOp::Deref => None,
        };
        Ok(Expression::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            location,
        ))
    }

    fn parse_postfix(&mut self, hint: Option<&SizedType>) -> ParseResult<Expression> {
        let mut expr = self.parse_primary(hint)?;
        loop {
            self.skip_whitespace();
            let location = self.location();
            if self.try_read(".") {
                let member = self.read_identifier()?.to_string();
                expr = Expression::new(
                    ExprKind::MemberAccess {
                        base: Box::new(expr),
                        member,
                    },
                    None,
                    location,
                );
            } else if self.try_read("[") {
                let index = self.parse_expr(None)?;
                self.expect("]")?;
                let ty = match &expr.ty {
                    Some(SizedType::Array(array)) => Some((*array.element).clone()),
                    _ => None,
                };
                expr = Expression::new(
                    ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    ty,
                    location,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self, hint: Option<&SizedType>) -> ParseResult<Expression> {
        self.skip_whitespace();
        let location = self.location();

        if self.try_read("(") {
            let expr = self.parse_expr(hint)?;
            self.expect(")")?;
            return Ok(expr);
        }

        if self.try_keyword("#run") {
            let inner = self.parse_unary(hint)?;
            let ty = inner.ty.clone();
            return Ok(Expression::new(ExprKind::Run(Box::new(inner)), ty, location));
        }

        if self.try_keyword("true") {
            return Ok(literal(LiteralValue::Bool(true), BasicType::Bool, location));
        }
        if self.try_keyword("false") {
            return Ok(literal(LiteralValue::Bool(false), BasicType::Bool, location));
        }

        match self.peek_char() {
            Some('"') => return self.parse_string(location),
            Some(ch) if ch.is_ascii_digit() || ch == '-' => {
                return self.parse_number(hint, location)
            }
            _ => {}
        }

        let name = self.read_identifier()?;
        let Some(decl) = self.ast.resolve(self.scope, name) else {
            return Err(ParseError::new(
                location,
                format!("unresolved identifier `{}`", name),
            ));
        };
        let decl_ty = self.ast.decl(decl).ty.clone();

        if self.try_read("(") {
            let params = match &decl_ty {
                Some(SizedType::Function(func)) => func.params.clone(),
                _ => Vec::new(),
            };
            let mut args = Vec::new();
            if !self.try_read(")") {
                loop {
                    let arg = self.parse_expr(params.get(args.len()))?;
                    args.push(arg);
                    if !self.try_read(",") {
                        self.expect(")")?;
                        break;
                    }
                }
            }
            let ty = match decl_ty {
                Some(SizedType::Function(func)) => func.return_type.map(|ty| *ty),
                _ => None,
            };
            return Ok(Expression::new(
                ExprKind::Call(FunctionCall {
                    function_name: name.to_string(),
                    args,
                    location,
                }),
                ty,
                location,
            ));
        }

        Ok(Expression::new(
            ExprKind::Identifier(Identifier {
                name: name.to_string(),
                decl,
            }),
            decl_ty,
            location,
        ))
    }

    fn parse_string(&mut self, location: SourceLocation) -> ParseResult<Expression> {
        self.bump(1);
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek_char() else {
                return Err(ParseError::new(location, "unterminated string literal"));
            };
            self.bump(ch.len_utf8());
            match ch {
                '"' => break,
                '\\' => {
                    let Some(escaped) = self.peek_char() else {
                        return Err(ParseError::new(location, "unterminated string literal"));
                    };
                    self.bump(escaped.len_utf8());
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        '\\' => '\\',
                        '"' => '"',
                        other => return self.error(format!("unknown escape `\\{}`", other)),
                    });
                }
                '\n' => return Err(ParseError::new(location, "unterminated string literal")),
                other => value.push(other),
            }
        }
        Ok(literal(LiteralValue::Str(value), BasicType::String, location))
    }

    fn parse_number(
        &mut self,
        hint: Option<&SizedType>,
        location: SourceLocation,
    ) -> ParseResult<Expression> {
        let negative = self.try_read("-");
        let rest = self.rest();
        let hint = hint.and_then(SizedType::as_direct).map(|direct| direct.basic);

        if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            let len = hex.find(|ch: char| !ch.is_ascii_hexdigit()).unwrap_or(hex.len());
            let Ok(magnitude) = u64::from_str_radix(&hex[..len], 16) else {
                return Err(ParseError::new(location, "invalid hex literal"));
            };
            self.bump(2 + len);
            return integer_literal(magnitude, negative, hint, location);
        }

        let mut len = rest.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(rest.len());
        let mut is_float = false;
        if rest[len..].starts_with('.') && rest[len + 1..].starts_with(|ch: char| ch.is_ascii_digit()) {
            is_float = true;
            len += 1;
            len += rest[len..].find(|ch: char| !ch.is_ascii_digit()).unwrap_or(rest.len() - len);
        }
        if rest[len..].starts_with(|ch: char| ch == 'e' || ch == 'E') {
            let after = &rest[len + 1..];
            let exponent = after
                .strip_prefix('+')
                .or_else(|| after.strip_prefix('-'))
                .unwrap_or(after);
            let digits = exponent.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(exponent.len());
            if digits > 0 {
                is_float = true;
                len = rest.len() - exponent.len() + digits;
            }
        }

        let digits = &rest[..len];
        self.bump(len);

        if is_float {
            let Ok(value) = digits.parse::<f64>() else {
                return Err(ParseError::new(location, "invalid float literal"));
            };
            let value = if negative { -value } else { value };
            let basic = match hint {
                Some(BasicType::F32) => BasicType::F32,
                _ => BasicType::F64,
            };
            return Ok(literal(LiteralValue::Float(value), basic, location));
        }

        let Ok(magnitude) = digits.parse::<u64>() else {
            return Err(ParseError::new(location, "integer literal out of range"));
        };
        integer_literal(magnitude, negative, hint, location)
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn literal(value: LiteralValue, basic: BasicType, location: SourceLocation) -> Expression {
    Expression::literal(Literal::new(value, basic), location)
}

fn binary(
    op: BinaryOp,
    lhs: Expression,
    rhs: Expression,
    ty: Option<SizedType>,
    location: SourceLocation,
) -> Expression {
    Expression::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
        location,
    )
}

/// Integer literals take the hinted type when it is an integer type, else `s64`.
fn integer_literal(
    magnitude: u64,
    negative: bool,
    hint: Option<BasicType>,
    location: SourceLocation,
) -> ParseResult<Expression> {
    let basic = match hint {
        Some(basic) if basic.is_integer() => basic,
        _ => BasicType::S64,
    };

    let value = if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(ParseError::new(location, "integer literal out of range"));
        }
        LiteralValue::Signed((magnitude as i64).wrapping_neg())
    } else if basic.is_signed() && magnitude <= i64::MAX as u64 {
        LiteralValue::Signed(magnitude as i64)
    } else {
        LiteralValue::Unsigned(magnitude)
    };
    Ok(literal(value, basic, location))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> FileAst {
        Parser::new(text, None).parse().unwrap()
    }

    fn global(ast: &FileAst, name: &str) -> DeclId {
        ast.resolve(ast.global_scope(), name).unwrap()
    }

    #[test]
    fn test_parse_globals() {
        let ast = parse(
            "; leading comment\n\
             x : s32 = 5; // trailing comment\n\
             s : string = \"hi\\n\";\n\
             buf : [9]u8;\n\
             k :: 3;\n",
        );

        assert_eq!(ast.items.len(), 4);
        let x = ast.decl(global(&ast, "x"));
        assert_eq!(x.ty, Some(SizedType::direct(BasicType::S32)));
        assert_eq!(x.location, SourceLocation::new(2, 1));
        match &x.definition {
            Some(Definition::Expression(expr)) => match &expr.kind {
                ExprKind::Literal(lit) => {
                    assert_eq!(lit.value, LiteralValue::Signed(5));
                    assert_eq!(lit.ty.basic, BasicType::S32);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }

        let buf = ast.decl(global(&ast, "buf"));
        assert_eq!(buf.ty.as_ref().map(SizedType::size_in_bits), Some(72));
        assert!(buf.definition.is_none());

        let k = ast.decl(global(&ast, "k"));
        assert!(k.is_constant());
        assert!(k.flags.contains(DeclFlags::HAS_BEEN_INFERRED));
        assert_eq!(k.ty, Some(SizedType::direct(BasicType::S64)));
    }

    #[test]
    fn test_parse_functions() {
        let ast = parse(
            "puts :: foreign fn(string, ...) -> s32;\n\
             main :: fn() {\n\
                 a : s64;\n\
                 a = 7;\n\
                 puts(\"x\");\n\
                 return;\n\
                 { }\n\
             }\n",
        );

        let puts = ast.decl(global(&ast, "puts"));
        match &puts.definition {
            Some(Definition::Function(def)) => {
                assert!(def.is_foreign());
                assert!(def.body.is_none());
                assert!(def.signature.is_variadic);
            }
            other => panic!("unexpected {:?}", other),
        }

        let main = ast.decl(global(&ast, "main"));
        assert!(main.is_constant());
        assert!(main.is_function_declaration());
        let Some(Definition::Function(def)) = &main.definition else {
            panic!("main is not a function");
        };
        let body = def.body.as_ref().unwrap();
        assert_eq!(body.statements.len(), 5);
        assert!(matches!(body.statements[0], Statement::Declaration(_)));
        assert!(matches!(body.statements[1], Statement::Assignment(_)));
        assert!(matches!(body.statements[2], Statement::Call(_)));
        assert!(matches!(body.statements[3], Statement::Return(_)));
        assert!(matches!(body.statements[4], Statement::Block(_)));

        let a = ast.resolve(body.scope, "a").unwrap();
        assert!(!ast.is_global(a));
    }

    #[test]
    fn test_assignment_literal_takes_target_type() {
        let ast = parse("main :: fn() {\n    b : u16;\n    b = 0xFFFF;\n}\n");
        let main = ast.decl(global(&ast, "main"));
        let Some(Definition::Function(def)) = &main.definition else {
            panic!("main is not a function");
        };
        let Statement::Assignment(assign) = &def.body.as_ref().unwrap().statements[1] else {
            panic!("expected an assignment");
        };
        let ExprKind::Literal(lit) = &assign.rhs.kind else {
            panic!("expected a literal");
        };
        assert_eq!(lit.value, LiteralValue::Unsigned(0xFFFF));
        assert_eq!(lit.ty.basic, BasicType::U16);
    }

    #[test]
    fn test_parse_expressions() {
        let ast = parse(
            "a : s32 = 1;\n\
             b : s32 = -a + 2 * 3;\n\
             c : bool = a < 2 == true;\n\
             f : f32 = 1.5;\n\
             g : f64 = -2.5e3;\n\
             n : s64 = -9223372036854775808;\n\
             r : s32 = #run 4;\n",
        );

        let init = |name: &str| match &ast.decl(global(&ast, name)).definition {
            Some(Definition::Expression(expr)) => expr.clone(),
            other => panic!("unexpected {:?}", other),
        };

        assert!(matches!(init("b").kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
        assert!(matches!(init("c").kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
        match init("f").kind {
            ExprKind::Literal(lit) => assert_eq!(lit.ty.basic, BasicType::F32),
            other => panic!("unexpected {:?}", other),
        }
        match init("g").kind {
            ExprKind::Literal(lit) => assert_eq!(lit.value, LiteralValue::Float(-2500.0)),
            other => panic!("unexpected {:?}", other),
        }
        match init("n").kind {
            ExprKind::Literal(lit) => assert_eq!(lit.value, LiteralValue::Signed(i64::MIN)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(init("r").kind, ExprKind::Run(_)));
    }

    #[test]
    fn test_parse_errors() {
        let err = Parser::new("x : s32 = y;\n", None).parse().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 11));
        assert!(err.message.contains("unresolved identifier `y`"));

        let err = Parser::new("x : s32;\nx : s32;\n", None).parse().unwrap_err();
        assert!(err.message.contains("already declared"));

        let err = Parser::new("x : widget;\n", None).parse().unwrap_err();
        assert!(err.message.contains("unknown type `widget`"));

        let err = Parser::new("x :;\n", None).parse().unwrap_err();
        assert!(err.message.contains("needs a type"));
    }

    #[test]
    fn test_oversized_array_count_is_an_error() {
        let err = Parser::new("big : [536870913]u8;\nafter : u32 = 1;\n", None)
            .parse()
            .unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 8));
        assert!(err.message.contains("too large"));

        let err = Parser::new("big : [ 4611686018427387904]u64;\n", None)
            .parse()
            .unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 9));
        assert!(err.message.contains("too large"));

        let ast = parse("big : [536870911]u8;\nafter : u32 = 1;\n");
        let big = ast.decl(global(&ast, "big"));
        assert_eq!(big.ty.as_ref().map(SizedType::size_in_bits), Some(u32::MAX - 7));
    }
}
