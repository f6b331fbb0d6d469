pub mod ast;

use tracing::debug;

use crate::diagnostics::{DiagnosticCollector, ParseError};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::span::SourceLocation;
use ast::*;

/// Expression trees deeper than this are rejected so the recursive passes
/// over them stay within the stack. Parens, unary minus, array literals and
/// each binary operator of a chain count one level.
pub const MAX_NESTING: usize = 256;

pub struct Parser<'a> {
    tokens: &'a [Token],
    diag: &'a mut DiagnosticCollector,
    pos: usize,
    depth: usize,
    eof: Token,
    skipped: Vec<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], diag: &'a mut DiagnosticCollector) -> Self {
        let eof = match tokens.last() {
            Some(last) if last.kind == TokenKind::Eof => last.clone(),
            Some(last) => Token::new(TokenKind::Eof, "", last.location.clone()),
            None => Token::new(TokenKind::Eof, "", SourceLocation::new("<input>", 1, 1)),
        };
        Self { tokens, diag, pos: 0, depth: 0, eof, skipped: Vec::new() }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        self.check(kind).then(|| self.advance())
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_here(expected))
    }

    /// Consume an identifier spelled exactly `word` (descriptor field names).
    fn expect_word(&mut self, word: &str) -> Result<Token, ParseError> {
        let tok = self.peek();
        if tok.kind == TokenKind::Ident && tok.lexeme == word {
            return Ok(self.advance());
        }
        Err(self.error_here(&format!("Expected '{word}'")))
    }

    /// Record "`expected`, found <current token>" and build the unwind signal.
    fn error_here(&mut self, expected: &str) -> ParseError {
        let tok = self.peek();
        let message = format!("{expected}, found {tok}");
        let location = tok.location.clone();
        self.error_at(message, location)
    }

    fn error_at(&mut self, message: String, location: SourceLocation) -> ParseError {
        self.diag.error(message.clone(), location.clone());
        ParseError::new(message, location)
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Drop everything up to (not including) the next NEWLINE or EOF.
    /// The first dropped token is remembered in `skipped`.
    fn skip_line(&mut self) {
        if !self.at_end() && !self.check(TokenKind::Newline) {
            self.skipped.push(self.peek().clone());
        }
        while !self.at_end() && !self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Kind of the next non-NEWLINE token. Consumes nothing.
    fn peek_past_newlines(&self) -> TokenKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|t| t.kind)
            .find(|k| *k != TokenKind::Newline)
            .unwrap_or(TokenKind::Eof)
    }

    fn too_deep(&mut self) -> ParseError {
        let location = self.peek().location.clone();
        self.error_at(format!("Expression nested too deeply (limit {MAX_NESTING})"), location)
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// First token of each run the parser dropped without building AST nodes:
    /// loop markers, unrecognized statements, trailing tokens after a
    /// statement, and the rest of a line after an error.
    pub fn skipped(&self) -> &[Token] {
        &self.skipped
    }

    pub fn parse_program(&mut self) -> Program {
        let location = Some(self.peek().location.clone());
        self.skip_newlines();

        let device_ref = if self.check(TokenKind::Device) {
            self.recover_header(Self::parse_device_header)
        } else {
            None
        };
        self.skip_newlines();

        let name = if self.check(TokenKind::Program) {
            self.recover_header(Self::parse_program_header)
        } else {
            None
        };
        self.skip_newlines();

        let statements = self.parse_body();
        Program { device_ref, name, statements, location }
    }

    fn recover_header(&mut self, header: fn(&mut Self) -> Result<String, ParseError>) -> Option<String> {
        match header(self) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, "skipping malformed header");
                self.skip_line();
                None
            }
        }
    }

    fn parse_device_header(&mut self) -> Result<String, ParseError> {
        self.expect(TokenKind::Device, "Expected 'device'")?;
        let path = self.expect(TokenKind::StringLit, "Expected string after 'device'")?;
        Ok(string_value(&path.lexeme))
    }

    fn parse_program_header(&mut self) -> Result<String, ParseError> {
        self.expect(TokenKind::Program, "Expected 'program'")?;
        let name = self.expect(TokenKind::Ident, "Expected identifier after 'program'")?;
        self.expect(TokenKind::Colon, "Expected ':' after program name")?;
        Ok(name.lexeme)
    }

    fn parse_body(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        // Locations of the `loop` markers still open.
        let mut open_loops: Vec<SourceLocation> = Vec::new();

        loop {
            self.skip_newlines();
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Loop => {
                    open_loops.push(tok.location);
                    self.skip_line();
                }
                TokenKind::Endloop => {
                    if open_loops.pop().is_none() {
                        self.diag.warning("'endloop' without matching 'loop'", tok.location);
                    }
                    self.skip_line();
                }
                TokenKind::Const if !open_loops.is_empty() => {
                    self.diag.error("Const declaration not permitted inside loop body", tok.location);
                    self.skip_line();
                }
                TokenKind::Const | TokenKind::Buffer | TokenKind::Let => {
                    let parsed = match tok.kind {
                        TokenKind::Const => self.parse_const_decl().map(Stmt::Const),
                        TokenKind::Buffer => self.parse_buffer_decl().map(Stmt::Buffer),
                        _ => self.parse_let_decl(),
                    };
                    match parsed {
                        Ok(stmt) => {
                            debug!(kind = stmt.kind_name(), name = stmt.name(), "parsed statement");
                            statements.push(stmt);
                        }
                        Err(err) => {
                            debug!(error = %err, line = tok.location.line, "recovering at end of line");
                            self.skip_line();
                        }
                    }
                }
                _ => {
                    debug!(token = %tok, line = tok.location.line, "skipping unrecognized statement");
                    self.skip_line();
                }
            }
        }

        for location in open_loops {
            self.diag.warning("Unterminated loop: missing 'endloop'", location);
        }
        statements
    }

    pub fn parse_const_decl(&mut self) -> Result<ConstDecl, ParseError> {
        let kw = self.expect(TokenKind::Const, "Expected 'const'")?;
        let name = self.expect(TokenKind::Ident, "Expected identifier after 'const'")?;
        self.expect(TokenKind::Equals, "Expected '=' after const name")?;
        let value = self.parse_expression()?;
        Ok(ConstDecl { name: name.lexeme, value, location: Some(kw.location) })
    }

    pub fn parse_buffer_decl(&mut self) -> Result<BufferDecl, ParseError> {
        let kw = self.expect(TokenKind::Buffer, "Expected 'buffer'")?;
        let name = self.expect(TokenKind::Ident, "Expected buffer name")?;
        self.expect(TokenKind::Colon, "Expected ':' after buffer name")?;
        let (mem_level, l1_index) = self.parse_mem_level()?;

        self.expect(TokenKind::LParen, "Expected '(' after memory level")?;
        let mut size = None;
        let mut align = None;
        while !self.check(TokenKind::RParen) && !self.at_end() {
            if self.eat(TokenKind::Size).is_some() {
                self.expect(TokenKind::Equals, "Expected '=' after 'size'")?;
                size = Some(self.parse_expression()?);
            } else if self.eat(TokenKind::Align).is_some() {
                self.expect(TokenKind::Equals, "Expected '=' after 'align'")?;
                align = Some(self.parse_expression()?);
            } else {
                break;
            }
            self.eat(TokenKind::Comma);
        }
        self.expect(TokenKind::RParen, "Expected ')' after buffer properties")?;

        let decorators = self.parse_decorators()?;
        Ok(BufferDecl { name: name.lexeme, mem_level, size, align, l1_index, decorators, location: Some(kw.location) })
    }

    fn parse_mem_level(&mut self) -> Result<(MemLevel, Option<Expr>), ParseError> {
        match self.peek_kind() {
            TokenKind::Ddr => {
                self.advance();
                Ok((MemLevel::Ddr, None))
            }
            TokenKind::L2 => {
                self.advance();
                Ok((MemLevel::L2, None))
            }
            TokenKind::L1 => {
                self.advance();
                let mut index = None;
                if self.eat(TokenKind::LBracket).is_some() {
                    index = Some(self.parse_expression()?);
                    self.expect(TokenKind::RBracket, "Expected ']' after L1 index")?;
                }
                Ok((MemLevel::L1, index))
            }
            _ => Err(self.error_here("Expected memory level (DDR, L2, L1)")),
        }
    }

    /// `let NAME = region(...)` yields a region, anything else a plain let.
    pub fn parse_let_decl(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.expect(TokenKind::Let, "Expected 'let'")?;
        let name = self.expect(TokenKind::Ident, "Expected identifier after 'let'")?;
        self.expect(TokenKind::Equals, "Expected '=' after let name")?;

        if self.check(TokenKind::Region) {
            return self.parse_region(name.lexeme, kw.location).map(Stmt::Region);
        }

        let value = self.parse_value()?;
        Ok(Stmt::Let(LetDecl { name: name.lexeme, value, location: Some(kw.location) }))
    }

    fn parse_region(&mut self, name: String, location: SourceLocation) -> Result<RegionDecl, ParseError> {
        self.expect(TokenKind::Region, "Expected 'region'")?;
        self.expect(TokenKind::LParen, "Expected '(' after 'region'")?;
        let buffer = self.expect(TokenKind::Ident, "Expected buffer name in region")?;
        self.expect(TokenKind::Comma, "Expected ',' after buffer name")?;
        let offset = self.parse_expression()?;
        self.expect(TokenKind::Comma, "Expected ',' after offset")?;
        let extent = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after region extent")?;

        // Both may start on a continuation line.
        let type_attrs = if self.peek_past_newlines() == TokenKind::Elem {
            self.skip_newlines();
            Some(self.parse_type_attrs()?)
        } else {
            None
        };
        let decorators = self.parse_decorators()?;

        Ok(RegionDecl {
            name,
            buffer_name: buffer.lexeme,
            offset,
            extent,
            type_attrs,
            decorators,
            location: Some(location),
        })
    }

    fn parse_type_attrs(&mut self) -> Result<TypeAttrs, ParseError> {
        let location = self.peek().location.clone();
        self.expect(TokenKind::Elem, "Expected 'elem'")?;
        self.expect(TokenKind::Equals, "Expected '=' after 'elem'")?;
        let elem = self.parse_elem_type()?;
        self.expect(TokenKind::Comma, "Expected ',' after elem type")?;
        self.expect(TokenKind::Shape, "Expected 'shape'")?;
        self.expect(TokenKind::Equals, "Expected '=' after 'shape'")?;
        let shape = self.parse_expr_list()?;

        let mut layout = None;
        let mut strides = None;
        let mut quant = None;
        while self.check(TokenKind::Comma)
            && matches!(self.tokens.get(self.pos + 1).map(|t| t.kind), Some(TokenKind::Layout | TokenKind::Strides | TokenKind::Quant))
        {
            self.advance();
            let attr = self.advance();
            let duplicate = match attr.kind {
                TokenKind::Layout => layout.is_some(),
                TokenKind::Strides => strides.is_some(),
                _ => quant.is_some(),
            };
            if duplicate {
                return Err(self.error_at(format!("Duplicate type attribute '{}'", attr.lexeme), attr.location));
            }
            self.expect(TokenKind::Equals, &format!("Expected '=' after '{}'", attr.lexeme))?;
            match attr.kind {
                TokenKind::Layout => layout = Some(self.expect(TokenKind::Ident, "Expected layout name")?.lexeme),
                TokenKind::Strides => strides = Some(self.parse_expr_list()?),
                _ => quant = Some(self.parse_quant_desc()?),
            }
        }

        Ok(TypeAttrs { elem, shape, layout, strides, quant, location: Some(location) })
    }

    fn parse_elem_type(&mut self) -> Result<ElemType, ParseError> {
        let tok = self.peek();
        let elem = ElemType::from_name(&tok.lexeme).filter(|_| tok.kind.is_elem_type());
        match elem {
            Some(elem) => {
                self.advance();
                Ok(elem)
            }
            None => Err(self.error_here("Expected element type")),
        }
    }

    fn parse_quant_desc(&mut self) -> Result<QuantDesc, ParseError> {
        if !self.check(TokenKind::Ident) {
            return Err(self.error_here("Expected quant descriptor kind"));
        }
        let kind = self.advance();
        let location = Some(kind.location.clone());
        if !matches!(kind.lexeme.as_str(), "per_tensor" | "per_channel" | "per_group") {
            return Err(self.error_at(format!("Unknown quant descriptor: '{}'", kind.lexeme), kind.location));
        }
        self.expect(TokenKind::LParen, &format!("Expected '(' after '{}'", kind.lexeme))?;

        let desc = match kind.lexeme.as_str() {
            "per_tensor" => {
                let scale = self.parse_named_field("scale", Self::parse_value)?;
                self.expect(TokenKind::Comma, "Expected ','")?;
                let zero_point = self.parse_named_field("zero_point", Self::parse_value)?;
                QuantDesc::PerTensor { scale, zero_point, location }
            }
            "per_channel" => {
                let axis = self.parse_named_field("axis", Self::parse_expression)?;
                self.expect(TokenKind::Comma, "Expected ','")?;
                let scales = self.parse_named_field("scales", Self::parse_value_list)?;
                self.expect(TokenKind::Comma, "Expected ','")?;
                let zero_points = self.parse_named_field("zero_points", Self::parse_value_list)?;
                QuantDesc::PerChannel { axis, scales, zero_points, location }
            }
            _ => {
                let axis = self.parse_named_field("axis", Self::parse_expression)?;
                self.expect(TokenKind::Comma, "Expected ','")?;
                let group_size = self.parse_named_field("group_size", Self::parse_expression)?;
                self.expect(TokenKind::Comma, "Expected ','")?;
                let scales = self.parse_named_field("scales", Self::parse_value_list)?;
                self.expect(TokenKind::Comma, "Expected ','")?;
                let zero_points = self.parse_named_field("zero_points", Self::parse_value_list)?;
                QuantDesc::PerGroup { axis, group_size, scales, zero_points, location }
            }
        };

        self.expect(TokenKind::RParen, &format!("Expected ')' after {} descriptor", kind.lexeme))?;
        Ok(desc)
    }

    /// `word = <parsed>`
    fn parse_named_field<T>(
        &mut self,
        word: &str,
        parse: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.expect_word(word)?;
        self.expect(TokenKind::Equals, &format!("Expected '=' after '{word}'"))?;
        parse(self)
    }

    fn parse_decorators(&mut self) -> Result<Vec<Decorator>, ParseError> {
        let mut decorators = Vec::new();
        while self.peek_past_newlines() == TokenKind::At {
            self.skip_newlines();
            decorators.push(self.parse_decorator()?);
        }
        Ok(decorators)
    }

    fn parse_decorator(&mut self) -> Result<Decorator, ParseError> {
        let at = self.expect(TokenKind::At, "Expected '@'")?;
        let name = self.expect(TokenKind::Ident, "Expected decorator name after '@'")?;
        let args = if self.eat(TokenKind::LParen).is_some() {
            let args = self.parse_decorator_args()?;
            self.expect(TokenKind::RParen, "Expected ')' after decorator args")?;
            Some(args)
        } else {
            None
        };
        Ok(Decorator { name: name.lexeme, args, location: Some(at.location) })
    }

    fn parse_decorator_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let tok = self.peek();
        if tok.kind == TokenKind::Ident && RESOURCE_UNITS.contains(&tok.lexeme.as_str()) {
            let unit = self.advance();
            let unit = Expr::new(ExprKind::Identifier(unit.lexeme), unit.location);
            if self.eat(TokenKind::LBracket).is_some() {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket, "Expected ']' after resource index")?;
                return Ok(vec![unit, index]);
            }
            return Ok(vec![unit]);
        }
        self.parse_comma_list(TokenKind::RParen, Self::parse_value)
    }

    /// `item (, item)* ,?` up to (not including) `close`.
    fn parse_comma_list(
        &mut self,
        close: TokenKind,
        item: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.check(close) {
            return Ok(items);
        }
        items.push(item(self)?);
        while self.eat(TokenKind::Comma).is_some() {
            if self.check(close) {
                break;
            }
            items.push(item(self)?);
        }
        Ok(items)
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LBracket, "Expected '['")?;
        let exprs = self.parse_comma_list(TokenKind::RBracket, Self::parse_expression)?;
        self.expect(TokenKind::RBracket, "Expected ']'")?;
        Ok(exprs)
    }

    fn parse_value_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LBracket, "Expected '['")?;
        let values = self.parse_comma_list(TokenKind::RBracket, Self::parse_value)?;
        self.expect(TokenKind::RBracket, "Expected ']'")?;
        Ok(values)
    }

    /// `STRING | '[' value,* ']' | expr`
    pub fn parse_value(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::StringLit => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(string_value(&tok.lexeme)), tok.location))
            }
            TokenKind::LBracket => self.nested(|p| {
                let open = p.peek().location.clone();
                let elements = p.parse_value_list()?;
                Ok(Expr::new(ExprKind::ArrayLiteral(elements), open))
            }),
            _ => self.parse_expression(),
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    /// Parse one expression that must make up the whole token stream.
    pub fn parse_standalone_expression(&mut self) -> Result<Expr, ParseError> {
        self.skip_newlines();
        let expr = self.parse_expression()?;
        self.skip_newlines();
        if !self.at_end() {
            return Err(self.error_here("Expected end of expression"));
        }
        Ok(expr)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        // Each operator in the chain deepens the tree by one.
        let outer = self.depth;
        let result = self.parse_binary_chain(min_bp);
        self.depth = outer;
        result
    }

    fn parse_binary_chain(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let Some(op) = binary_op(self.peek_kind()) else { break };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            if self.depth >= MAX_NESTING {
                return Err(self.too_deep());
            }
            self.depth += 1;
            let op_tok = self.advance();
            let rhs = self.parse_expr_bp(r_bp)?;
            lhs = Expr::new(
                ExprKind::BinaryOp { op, left: Box::new(lhs), right: Box::new(rhs) },
                op_tok.location,
            );
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::Minus) {
            return self.nested(|p| {
                let minus = p.advance();
                let operand = p.parse_unary()?;
                Ok(Expr::new(ExprKind::UnaryOp { op: UnaryOp::Neg, operand: Box::new(operand) }, minus.location))
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::IntLit => {
                let tok = self.advance();
                match tok.lexeme.parse::<i64>() {
                    Ok(value) => Ok(Expr::new(ExprKind::IntLiteral(value), tok.location)),
                    Err(_) => Err(self.error_at(format!("Integer literal out of range: {}", tok.lexeme), tok.location)),
                }
            }
            TokenKind::FloatLit => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::FloatLiteral(float_value(&tok.lexeme)), tok.location))
            }
            TokenKind::Ident => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Identifier(tok.lexeme), tok.location))
            }
            TokenKind::LParen => self.nested(|p| {
                let open = p.advance();
                let inner = p.parse_expression()?;
                p.expect(TokenKind::RParen, "Expected ')' after expression")?;
                Ok(Expr::new(ExprKind::ParenExpr(Box::new(inner)), open.location))
            }),
            _ => Err(self.error_here("Expected expression")),
        }
    }
}

fn binary_op(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Minus => Some(BinOp::Sub),
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        TokenKind::Mod => Some(BinOp::Mod),
        _ => None,
    }
}

fn infix_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::Add | BinOp::Sub => (1, 2),
        BinOp::Mul | BinOp::Div | BinOp::Mod => (3, 4),
    }
}

/// Contents of a string lexeme without its surrounding quotes.
fn string_value(lexeme: &str) -> String {
    let inner = lexeme.strip_prefix('"').unwrap_or(lexeme);
    inner.strip_suffix('"').unwrap_or(inner).to_string()
}

/// A float lexeme whose exponent has no digits (`1.5e`) keeps its mantissa.
fn float_value(lexeme: &str) -> f64 {
    lexeme
        .parse()
        .or_else(|_| lexeme.trim_end_matches(['e', 'E', '+', '-']).parse())
        .unwrap_or(0.0)
}

/// Tokenize and parse a whole NEM source file.
pub fn parse(source: &str, filename: &str) -> (Program, DiagnosticCollector) {
    let mut diag = DiagnosticCollector::new();
    let tokens = tokenize(source, filename, &mut diag);
    let program = Parser::new(&tokens, &mut diag).parse_program();
    debug!(file = filename, statements = program.statements.len(), errors = diag.error_count(), "parsed");
    (program, diag)
}

/// Parse a single expression, e.g. from the command line.
pub fn parse_expression(source: &str, filename: &str) -> (Option<Expr>, DiagnosticCollector) {
    let mut diag = DiagnosticCollector::new();
    let tokens = tokenize(source, filename, &mut diag);
    let expr = Parser::new(&tokens, &mut diag).parse_standalone_expression().ok();
    (expr, diag)
}
