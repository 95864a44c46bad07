use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use std::fmt;

/// Parser error type
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.message, self.location.line, self.location.column
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Deepest expression or block nesting the parser accepts. Every level of
/// recursion and every link of an operator chain counts as one.
pub const MAX_NESTING: usize = 200;

/// Recursive descent parser for the script language
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Current nesting, checked against [`MAX_NESTING`]
    depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    fn from_lexer(mut lexer: Lexer) -> Result<Self, ParseError> {
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    /// Parse the entire program (module body)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if self.match_token(&Token::Newline(self.current_location())) {
                continue;
            }
            if self.check(&Token::Indent(self.current_location())) {
                return Err(self.error_here("unexpected indent"));
            }
            let stmts = self.parse_statement()?;
            program.body.extend(stmts);
        }

        Ok(program)
    }

    /// Parse one statement. Simple statements separated by `;` share a
    /// line, so this may yield several.
    fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.peek() {
            Token::If(_) => {
                self.advance();
                Ok(vec![self.parse_if_statement()?])
            }
            Token::While(_) => Ok(vec![self.parse_while_statement()?]),
            Token::For(_) => Ok(vec![self.parse_for_statement()?]),
            Token::Def(_) => Ok(vec![self.parse_function_definition()?]),
            Token::Class(_) => Ok(vec![self.parse_class_definition()?]),
            _ => self.parse_simple_line(),
        }
    }

    /// Parse the body following a `:` (indented block or same-line suite)
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.nested(Self::parse_suite)
    }

    fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_token(&Token::Colon(self.current_location()), "expected ':'")?;

        if !self.match_token(&Token::Newline(self.current_location())) {
            return self.parse_simple_line();
        }

        if !self.match_token(&Token::Indent(self.current_location())) {
            return Err(self.error_here("expected an indented block"));
        }

        let mut body = Vec::new();
        while !self.check(&Token::Dedent(self.current_location())) && !self.is_at_end() {
            if self.match_token(&Token::Newline(self.current_location())) {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        self.match_token(&Token::Dedent(self.current_location()));

        Ok(body)
    }

    fn parse_simple_line(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![self.parse_simple_statement()?];

        while self.match_token(&Token::Semicolon(self.current_location())) {
            if self.check(&Token::Newline(self.current_location())) || self.is_at_end() {
                break;
            }
            stmts.push(self.parse_simple_statement()?);
        }

        if !self.is_at_end() {
            self.expect_token(
                &Token::Newline(self.current_location()),
                "invalid syntax: expected end of line",
            )?;
        }
        Ok(stmts)
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();

        match self.peek_token() {
            Token::Pass(_) => {
                self.advance();
                Ok(Stmt::Pass { location })
            }
            Token::Break(_) => {
                self.advance();
                Ok(Stmt::Break { location })
            }
            Token::Continue(_) => {
                self.advance();
                Ok(Stmt::Continue { location })
            }
            Token::Return(_) => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression_list()?)
                };
                Ok(Stmt::Return { value, location })
            }
            Token::Global(_) => {
                self.advance();
                let mut names = vec![self.expect_identifier()?];
                while self.match_token(&Token::Comma(self.current_location())) {
                    names.push(self.expect_identifier()?);
                }
                Ok(Stmt::Global { names, location })
            }
            Token::Raise(_) => {
                self.advance();
                let exception = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Stmt::Raise {
                    exception,
                    location,
                })
            }
            Token::Assert(_) => {
                self.advance();
                let condition = self.parse_expression()?;
                let message = if self.match_token(&Token::Comma(self.current_location())) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Stmt::Assert {
                    condition,
                    message,
                    location,
                })
            }
            Token::Del(_) => {
                self.advance();
                let mut targets = vec![self.parse_postfix()?];
                while self.match_token(&Token::Comma(self.current_location())) {
                    targets.push(self.parse_postfix()?);
                }
                if let Some(bad) = targets.iter().find(|t| !t.is_assignable()) {
                    return Err(ParseError {
                        message: "cannot delete expression".to_string(),
                        location: bad.location(),
                    });
                }
                Ok(Stmt::Delete { targets, location })
            }
            Token::Import(_) => {
                self.advance();
                let module = self.parse_dotted_name()?;
                let alias = if self.match_token(&Token::As(self.current_location())) {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                Ok(Stmt::Import {
                    module,
                    alias,
                    location,
                })
            }
            Token::From(_) => self.parse_from_import(),
            Token::Reserved(keyword, _) => Err(ParseError {
                message: format!("'{}' is not supported", keyword),
                location,
            }),
            Token::Elif(_) | Token::Else(_) => Err(self.error_here("invalid syntax")),
            _ => self.parse_expression_statement(),
        }
    }

    /// Expression statement, assignment (possibly chained) or augmented
    /// assignment
    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        let first = self.parse_expression_list()?;

        if self.check(&Token::Eq(self.current_location())) {
            let mut chain = vec![first];
            while self.match_token(&Token::Eq(self.current_location())) {
                chain.push(self.parse_expression_list()?);
            }
            let value = chain.pop().ok_or_else(|| self.error_here("invalid syntax"))?;
            for target in &chain {
                Self::ensure_assignable(target)?;
            }
            return Ok(Stmt::Assign {
                targets: chain,
                value,
                location,
            });
        }

        if let Some(op) = self.match_augmented_operator() {
            if !matches!(
                first,
                Expr::Name(..) | Expr::Attribute { .. } | Expr::Subscript { .. }
            ) {
                return Err(ParseError {
                    message: "illegal expression for augmented assignment".to_string(),
                    location: first.location(),
                });
            }
            let value = self.parse_expression_list()?;
            return Ok(Stmt::AugAssign {
                target: first,
                op,
                value,
                location,
            });
        }

        // Annotated assignment: `name: type [= value]`
        if self.match_token(&Token::Colon(self.current_location())) {
            Self::ensure_assignable(&first)?;
            self.parse_expression()?;
            if self.match_token(&Token::Eq(self.current_location())) {
                let value = self.parse_expression_list()?;
                return Ok(Stmt::Assign {
                    targets: vec![first],
                    value,
                    location,
                });
            }
            return Ok(Stmt::Pass { location });
        }

        Ok(Stmt::Expr {
            expr: first,
            location,
        })
    }

    fn match_augmented_operator(&mut self) -> Option<BinOp> {
        let op = match self.peek() {
            Token::PlusEq(_) => BinOp::Add,
            Token::MinusEq(_) => BinOp::Sub,
            Token::StarEq(_) => BinOp::Mul,
            Token::SlashEq(_) => BinOp::Div,
            Token::DoubleSlashEq(_) => BinOp::FloorDiv,
            Token::PercentEq(_) => BinOp::Mod,
            Token::DoubleStarEq(_) => BinOp::Pow,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Parse if statement (the `if` or `elif` keyword is already consumed)
    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.previous_location();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        let orelse = if self.match_token(&Token::Elif(self.current_location())) {
            vec![self.nested(Self::parse_if_statement)?]
        } else if self.match_token(&Token::Else(self.current_location())) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(Stmt::If {
            condition,
            body,
            orelse,
            location,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.advance(); // consume 'while'

        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        if self.check(&Token::Else(self.current_location())) {
            return Err(self.error_here("'while ... else' is not supported"));
        }

        Ok(Stmt::While {
            condition,
            body,
            location,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.advance(); // consume 'for'

        let target = self.parse_target_list()?;
        self.expect_token(&Token::In(self.current_location()), "expected 'in'")?;
        let iter = self.parse_expression_list()?;
        let body = self.parse_block()?;
        if self.check(&Token::Else(self.current_location())) {
            return Err(self.error_here("'for ... else' is not supported"));
        }

        Ok(Stmt::For {
            target,
            iter,
            body,
            location,
        })
    }

    fn parse_function_definition(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.advance(); // consume 'def'

        let name = self.expect_identifier()?;
        self.expect_token(&Token::LParen(self.current_location()), "expected '('")?;
        let params = self.parse_parameter_list(&Token::RParen(self.current_location()), true)?;
        self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;

        // Return annotation is parsed and dropped
        if self.match_token(&Token::Arrow(self.current_location())) {
            self.parse_expression()?;
        }

        let body = self.parse_block()?;

        Ok(Stmt::FunctionDef {
            name,
            params,
            body,
            location,
        })
    }

    /// Parse parameters up to (not including) `terminator`
    fn parse_parameter_list(
        &mut self,
        terminator: &Token,
        allow_annotations: bool,
    ) -> Result<Vec<Param>, ParseError> {
        let mut params: Vec<Param> = Vec::new();

        while !self.check(terminator) {
            if self.check(&Token::Star(self.current_location()))
                || self.check(&Token::DoubleStar(self.current_location()))
            {
                return Err(self.error_here("variadic parameters are not supported"));
            }

            let name_loc = self.current_location();
            let name = self.expect_identifier()?;
            if params.iter().any(|p| p.name == name) {
                return Err(ParseError {
                    message: format!("duplicate argument '{}' in function definition", name),
                    location: name_loc,
                });
            }

            if allow_annotations && self.match_token(&Token::Colon(self.current_location())) {
                self.parse_expression()?;
            }

            let default = if self.match_token(&Token::Eq(self.current_location())) {
                Some(self.parse_expression()?)
            } else {
                None
            };

            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(ParseError {
                    message: "non-default argument follows default argument".to_string(),
                    location: name_loc,
                });
            }

            params.push(Param { name, default });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    fn parse_class_definition(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.advance(); // consume 'class'

        let name = self.expect_identifier()?;
        let mut base = None;
        if self.match_token(&Token::LParen(self.current_location())) {
            if !self.check(&Token::RParen(self.current_location())) {
                base = Some(self.parse_expression()?);
            }
            self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;
        }

        let body = self.parse_block()?;

        Ok(Stmt::ClassDef {
            name,
            base,
            body,
            location,
        })
    }

    fn parse_from_import(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.advance(); // consume 'from'

        let module = self.parse_dotted_name()?;
        self.expect_token(&Token::Import(self.current_location()), "expected 'import'")?;

        let parenthesized = self.match_token(&Token::LParen(self.current_location()));
        let mut names = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let alias = if self.match_token(&Token::As(self.current_location())) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            names.push((name, alias));

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
            if parenthesized && self.check(&Token::RParen(self.current_location())) {
                break;
            }
        }
        if parenthesized {
            self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;
        }

        Ok(Stmt::ImportFrom {
            module,
            names,
            location,
        })
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while self.match_token(&Token::Dot(self.current_location())) {
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    // Expressions

    /// Comma-separated expressions; more than one (or a trailing comma)
    /// makes a tuple
    fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let first = self.parse_expression()?;

        if !self.check(&Token::Comma(self.current_location())) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&Token::Comma(self.current_location())) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_expression()?);
        }

        Ok(Expr::Tuple { items, location })
    }

    /// Assignment targets of `for` loops and comprehensions (stops at `in`)
    fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let first = self.parse_bitwise_or()?;

        let target = if self.check(&Token::Comma(self.current_location())) {
            let mut items = vec![first];
            while self.match_token(&Token::Comma(self.current_location())) {
                if self.check(&Token::In(self.current_location())) {
                    break;
                }
                items.push(self.parse_bitwise_or()?);
            }
            Expr::Tuple { items, location }
        } else {
            first
        };

        Self::ensure_assignable(&target)?;
        Ok(target)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_test)
    }

    fn parse_test(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Lambda(self.current_location())) {
            return self.parse_lambda();
        }

        let location = self.current_location();
        let expr = self.parse_or_test()?;

        if self.match_token(&Token::If(self.current_location())) {
            let condition = self.parse_or_test()?;
            self.expect_token(
                &Token::Else(self.current_location()),
                "expected 'else' in conditional expression",
            )?;
            let else_expr = self.parse_expression()?;
            return Ok(Expr::IfExp {
                condition: Box::new(condition),
                then_expr: Box::new(expr),
                else_expr: Box::new(else_expr),
                location,
            });
        }

        Ok(expr)
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        self.advance(); // consume 'lambda'

        let params = self.parse_parameter_list(&Token::Colon(self.current_location()), false)?;
        self.expect_token(&Token::Colon(self.current_location()), "expected ':' in lambda")?;
        let body = self.parse_expression()?;

        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
            location,
        })
    }

    fn parse_or_test(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_test()?;
        let mut links = 0;

        while self.match_token(&Token::Or(self.current_location())) {
            self.link(&mut links)?;
            let location = self.previous_location();
            let right = self.parse_and_test()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        self.unlink(links);
        Ok(left)
    }

    fn parse_and_test(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not_test()?;
        let mut links = 0;

        while self.match_token(&Token::And(self.current_location())) {
            self.link(&mut links)?;
            let location = self.previous_location();
            let right = self.parse_not_test()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        self.unlink(links);
        Ok(left)
    }

    fn parse_not_test(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&Token::Not(self.current_location())) {
            let location = self.previous_location();
            let operand = self.nested(Self::parse_not_test)?;
            return Ok(Expr::UnaryOp {
                op: UnOp::Not,
                operand: Box::new(operand),
                location,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let left = self.parse_bitwise_or()?;
        let mut comparisons = Vec::new();

        loop {
            let op = match self.peek() {
                Token::EqEq(_) => CmpOp::Eq,
                Token::NotEq(_) => CmpOp::Ne,
                Token::Lt(_) => CmpOp::Lt,
                Token::Le(_) => CmpOp::Le,
                Token::Gt(_) => CmpOp::Gt,
                Token::Ge(_) => CmpOp::Ge,
                Token::In(_) => CmpOp::In,
                Token::Not(_) if matches!(self.peek_ahead(1), Some(Token::In(_))) => {
                    self.advance();
                    CmpOp::NotIn
                }
                Token::Is(_) => {
                    if matches!(self.peek_ahead(1), Some(Token::Not(_))) {
                        self.advance();
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    }
                }
                _ => break,
            };
            self.advance();
            comparisons.push((op, self.parse_bitwise_or()?));
        }

        if comparisons.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            comparisons,
            location,
        })
    }

    fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        let mut links = 0;
        while self.match_token(&Token::Pipe(self.current_location())) {
            self.link(&mut links)?;
            left = self.binary(BinOp::BitOr, left, Self::parse_bitwise_xor)?;
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        let mut links = 0;
        while self.match_token(&Token::Caret(self.current_location())) {
            self.link(&mut links)?;
            left = self.binary(BinOp::BitXor, left, Self::parse_bitwise_and)?;
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        let mut links = 0;
        while self.match_token(&Token::Amp(self.current_location())) {
            self.link(&mut links)?;
            left = self.binary(BinOp::BitAnd, left, Self::parse_shift)?;
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Token::LtLt(_) => BinOp::Shl,
                Token::GtGt(_) => BinOp::Shr,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            left = self.binary(op, left, Self::parse_additive)?;
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Token::Plus(_) => BinOp::Add,
                Token::Minus(_) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            left = self.binary(op, left, Self::parse_multiplicative)?;
        }
        self.unlink(links);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Token::Star(_) => BinOp::Mul,
                Token::Slash(_) => BinOp::Div,
                Token::DoubleSlash(_) => BinOp::FloorDiv,
                Token::Percent(_) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.link(&mut links)?;
            left = self.binary(op, left, Self::parse_unary)?;
        }
        self.unlink(links);
        Ok(left)
    }

    /// Build a binary node whose operator token was just consumed
    fn binary(
        &mut self,
        op: BinOp,
        left: Expr,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let location = self.previous_location();
        let right = next(self)?;
        Ok(Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            location,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Token::Minus(_) => UnOp::Neg,
            Token::Plus(_) => UnOp::Pos,
            Token::Tilde(_) => UnOp::BitNot,
            _ => return self.parse_power(),
        };
        let location = self.current_location();
        self.advance();
        let operand = self.nested(Self::parse_unary)?;

        // Fold negative numeric literals so `-1` stays a literal
        match (op, operand) {
            (UnOp::Neg, Expr::IntLiteral(n, _)) => Ok(Expr::IntLiteral(-n, location)),
            (UnOp::Neg, Expr::FloatLiteral(n, _)) => Ok(Expr::FloatLiteral(-n, location)),
            (op, operand) => Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
                location,
            }),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.match_token(&Token::DoubleStar(self.current_location())) {
            // Right-associative, binds tighter than unary minus on the left
            return self.nested(|p| p.binary(BinOp::Pow, base, Self::parse_unary));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let mut links = 0;

        loop {
            let location = self.current_location();
            if matches!(self.peek(), Token::LParen(_) | Token::LBracket(_) | Token::Dot(_)) {
                self.link(&mut links)?;
            }
            if self.match_token(&Token::LParen(location)) {
                let (args, keywords) = self.parse_argument_list()?;
                self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    keywords,
                    location,
                };
            } else if self.match_token(&Token::LBracket(location)) {
                let index = self.parse_subscript()?;
                self.expect_token(&Token::RBracket(self.current_location()), "expected ']'")?;
                expr = Expr::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                    location,
                };
            } else if self.match_token(&Token::Dot(location)) {
                let name = self.expect_identifier()?;
                expr = Expr::Attribute {
                    object: Box::new(expr),
                    name,
                    location,
                };
            } else {
                break;
            }
        }

        self.unlink(links);
        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        while !self.check(&Token::RParen(self.current_location())) {
            if self.check(&Token::Star(self.current_location()))
                || self.check(&Token::DoubleStar(self.current_location()))
            {
                return Err(self.error_here("argument unpacking is not supported"));
            }

            let is_keyword = matches!(self.peek(), Token::Ident(..))
                && matches!(self.peek_ahead(1), Some(Token::Eq(_)));

            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance(); // consume '='
                let value = self.parse_expression()?;
                keywords.push(Keyword { name, value });
            } else {
                if !keywords.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                let location = self.current_location();
                let arg = self.parse_expression()?;
                if self.check(&Token::For(self.current_location())) {
                    // Bare generator expression argument: `sum(x for x in xs)`
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(Expr::ListComp {
                        element: Box::new(arg),
                        generators,
                        location,
                    });
                } else {
                    args.push(arg);
                }
            }

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok((args, keywords))
    }

    /// Index expression of `obj[...]`: plain index, tuple, or slice
    fn parse_subscript(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();

        let lower = if self.check(&Token::Colon(location)) {
            None
        } else {
            let first = self.parse_expression_list()?;
            if !self.check(&Token::Colon(self.current_location())) {
                return Ok(first);
            }
            Some(Box::new(first))
        };

        self.advance(); // consume ':'
        let upper = if self.check(&Token::Colon(self.current_location()))
            || self.check(&Token::RBracket(self.current_location()))
        {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let step = if self.match_token(&Token::Colon(self.current_location()))
            && !self.check(&Token::RBracket(self.current_location()))
        {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::Slice {
            lower,
            upper,
            step,
            location,
        })
    }

    fn parse_comprehension_clauses(&mut self) -> Result<Vec<Comprehension>, ParseError> {
        let mut generators = Vec::new();

        while self.match_token(&Token::For(self.current_location())) {
            let target = self.parse_target_list()?;
            self.expect_token(&Token::In(self.current_location()), "expected 'in'")?;
            let iter = self.parse_or_test()?;
            let mut conditions = Vec::new();
            while self.match_token(&Token::If(self.current_location())) {
                conditions.push(self.parse_or_test()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }

        Ok(generators)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();

        match self.peek_token() {
            Token::IntLiteral(n, _) => {
                self.advance();
                Ok(Expr::IntLiteral(n, location))
            }
            Token::FloatLiteral(n, _) => {
                self.advance();
                Ok(Expr::FloatLiteral(n, location))
            }
            Token::StringLiteral(..) | Token::FStringLiteral(..) => self.parse_string_atom(),
            Token::True(_) => {
                self.advance();
                Ok(Expr::BoolLiteral(true, location))
            }
            Token::False(_) => {
                self.advance();
                Ok(Expr::BoolLiteral(false, location))
            }
            Token::None(_) => {
                self.advance();
                Ok(Expr::NoneLiteral(location))
            }
            Token::Ident(name, _) => {
                self.advance();
                Ok(Expr::Name(name, location))
            }
            Token::LParen(_) => {
                self.advance();
                self.parse_parenthesized(location)
            }
            Token::LBracket(_) => {
                self.advance();
                self.parse_list_display(location)
            }
            Token::LBrace(_) => {
                self.advance();
                self.parse_brace_display(location)
            }
            Token::Reserved(keyword, _) => Err(ParseError {
                message: format!("'{}' is not supported", keyword),
                location,
            }),
            _ => Err(ParseError {
                message: format!("invalid syntax: unexpected {}", self.peek()),
                location,
            }),
        }
    }

    /// Adjacent string literals concatenate; any f-string piece makes the
    /// whole atom an f-string
    fn parse_string_atom(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let mut parts = Vec::new();
        let mut formatted = false;

        loop {
            match self.peek_token() {
                Token::StringLiteral(s, _) => {
                    self.advance();
                    parts.push(FStringPart::Literal(s));
                }
                Token::FStringLiteral(body, loc) => {
                    self.advance();
                    formatted = true;
                    parts.extend(split_fstring(&body, loc)?);
                }
                _ => break,
            }
        }

        if formatted {
            return Ok(Expr::FString { parts, location });
        }

        let text: String = parts
            .into_iter()
            .filter_map(|p| match p {
                FStringPart::Literal(s) => Some(s),
                FStringPart::Expr { .. } => None,
            })
            .collect();
        Ok(Expr::StringLiteral(text, location))
    }

    fn parse_parenthesized(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&Token::RParen(self.current_location())) {
            return Ok(Expr::Tuple {
                items: Vec::new(),
                location,
            });
        }

        let first = self.parse_expression()?;

        if self.check(&Token::For(self.current_location())) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
                location,
            });
        }

        if !self.check(&Token::Comma(self.current_location())) {
            self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&Token::Comma(self.current_location())) {
            if self.check(&Token::RParen(self.current_location())) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&Token::RParen(self.current_location()), "expected ')'")?;

        Ok(Expr::Tuple { items, location })
    }

    fn parse_list_display(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&Token::RBracket(self.current_location())) {
            return Ok(Expr::List {
                items: Vec::new(),
                location,
            });
        }

        let first = self.parse_expression()?;

        if self.check(&Token::For(self.current_location())) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_token(&Token::RBracket(self.current_location()), "expected ']'")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
                location,
            });
        }

        let mut items = vec![first];
        while self.match_token(&Token::Comma(self.current_location())) {
            if self.check(&Token::RBracket(self.current_location())) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&Token::RBracket(self.current_location()), "expected ']'")?;

        Ok(Expr::List { items, location })
    }

    fn parse_brace_display(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&Token::RBrace(self.current_location())) {
            return Ok(Expr::Dict {
                entries: Vec::new(),
                location,
            });
        }

        let first = self.parse_expression()?;

        if self.match_token(&Token::Colon(self.current_location())) {
            let value = self.parse_expression()?;

            if self.check(&Token::For(self.current_location())) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_token(&Token::RBrace(self.current_location()), "expected '}'")?;
                return Ok(Expr::DictComp {
                    key: Box::new(first),
                    value: Box::new(value),
                    generators,
                    location,
                });
            }

            let mut entries = vec![(first, value)];
            while self.match_token(&Token::Comma(self.current_location())) {
                if self.check(&Token::RBrace(self.current_location())) {
                    break;
                }
                let key = self.parse_expression()?;
                self.expect_token(&Token::Colon(self.current_location()), "expected ':'")?;
                let value = self.parse_expression()?;
                entries.push((key, value));
            }
            self.expect_token(&Token::RBrace(self.current_location()), "expected '}'")?;
            return Ok(Expr::Dict { entries, location });
        }

        if self.check(&Token::For(self.current_location())) {
            // Set comprehension becomes set(<list comprehension>)
            let generators = self.parse_comprehension_clauses()?;
            self.expect_token(&Token::RBrace(self.current_location()), "expected '}'")?;
            return Ok(Expr::Call {
                func: Box::new(Expr::Name("set".to_string(), location)),
                args: vec![Expr::ListComp {
                    element: Box::new(first),
                    generators,
                    location,
                }],
                keywords: Vec::new(),
                location,
            });
        }

        let mut items = vec![first];
        while self.match_token(&Token::Comma(self.current_location())) {
            if self.check(&Token::RBrace(self.current_location())) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&Token::RBrace(self.current_location()), "expected '}'")?;

        Ok(Expr::Set { items, location })
    }

    // Helper methods

    fn ensure_assignable(target: &Expr) -> Result<(), ParseError> {
        if target.is_assignable() {
            Ok(())
        } else {
            Err(ParseError {
                message: "cannot assign to expression".to_string(),
                location: target.location(),
            })
        }
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Token::IntLiteral(..)
                | Token::FloatLiteral(..)
                | Token::StringLiteral(..)
                | Token::FStringLiteral(..)
                | Token::Ident(..)
                | Token::True(_)
                | Token::False(_)
                | Token::None(_)
                | Token::Not(_)
                | Token::Lambda(_)
                | Token::Minus(_)
                | Token::Plus(_)
                | Token::Tilde(_)
                | Token::LParen(_)
                | Token::LBracket(_)
                | Token::LBrace(_)
        )
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline(_) | Token::Semicolon(_) | Token::Eof(_)
        )
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("too many nested expressions"));
        }
        self.depth += 1;
        Ok(())
    }

    /// One more link in an operator chain: the tree grows a level deeper
    /// until the chain is finished
    fn link(&mut self, links: &mut usize) -> Result<(), ParseError> {
        self.descend()?;
        *links += 1;
        Ok(())
    }

    fn unlink(&mut self, links: usize) {
        self.depth -= links;
    }

    fn error_here(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            location: self.current_location(),
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof and `advance` never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_token(&self) -> Token {
        self.peek().clone()
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {}", message, self.peek()),
                location: self.current_location(),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(ParseError {
                message: format!("expected identifier, found {}", self.peek()),
                location: self.current_location(),
            })
        }
    }
}

/// Split the body of an f-string into literal text and embedded expressions.
///
/// `{{` and `}}` are literal braces. Inside a replacement field, a top-level
/// `:` starts the format spec and `!r` / `!s` select a conversion.
fn split_fstring(body: &str, location: SourceLocation) -> Result<Vec<FStringPart>, ParseError> {
    let chars: Vec<char> = body.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    let error = |message: &str| ParseError {
        message: format!("f-string: {}", message),
        location,
    };

    while i < chars.len() {
        let ch = chars[i];
        if ch == '{' && chars.get(i + 1) == Some(&'{') {
            literal.push('{');
            i += 2;
            continue;
        }
        if ch == '}' {
            if chars.get(i + 1) == Some(&'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err(error("single '}' is not allowed"));
        }
        if ch != '{' {
            literal.push(ch);
            i += 1;
            continue;
        }

        // Replacement field
        i += 1;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut expr_text = String::new();
        let mut spec: Option<String> = None;
        let mut conversion: Option<char> = None;

        loop {
            let c = *chars.get(i).ok_or_else(|| error("expecting '}'"))?;
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                expr_text.push(c);
                i += 1;
                continue;
            }
            match c {
                '\'' | '"' => {
                    quote = Some(c);
                    expr_text.push(c);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    expr_text.push(c);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    expr_text.push(c);
                }
                '}' if depth > 0 => {
                    depth -= 1;
                    expr_text.push(c);
                }
                '}' => {
                    i += 1;
                    break;
                }
                '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => {
                    conversion = chars.get(i + 1).copied();
                    i += 1;
                }
                ':' if depth == 0 => {
                    let mut text = String::new();
                    i += 1;
                    while let Some(&s) = chars.get(i) {
                        if s == '}' {
                            break;
                        }
                        text.push(s);
                        i += 1;
                    }
                    spec = Some(text);
                    continue;
                }
                _ => expr_text.push(c),
            }
            i += 1;
        }

        if expr_text.trim().is_empty() {
            return Err(error("empty expression not allowed"));
        }

        let mut parser = Parser::from_lexer(Lexer::starting_at(expr_text.trim(), location))?;
        let mut expr = parser.parse_expression_list()?;
        if !matches!(parser.peek(), Token::Newline(_) | Token::Eof(_)) {
            return Err(error("invalid expression"));
        }

        if let Some(conv) = conversion {
            let func = match conv {
                'r' | 'a' => "repr",
                's' => "str",
                _ => return Err(error("invalid conversion character")),
            };
            let expr_loc = expr.location();
            expr = Expr::Call {
                func: Box::new(Expr::Name(func.to_string(), expr_loc)),
                args: vec![expr],
                keywords: Vec::new(),
                location: expr_loc,
            };
        }

        if !literal.is_empty() {
            parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
        }
        parts.push(FStringPart::Expr { expr, spec });
    }

    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("def add(a, b=1):\n    return a + b\n");

        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Stmt::FunctionDef {
                name, params, body, ..
            } => {
                assert_eq!(name, "add");
                assert_eq!(params.len(), 2);
                assert!(params[1].default.is_some());
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let program = parse("x = 1 + 2 * 3\n");
        match &program.body[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::BinaryOp { op, right, .. } => {
                    assert_eq!(*op, BinOp::Add);
                    assert!(matches!(**right, Expr::BinaryOp { op: BinOp::Mul, .. }));
                }
                _ => panic!("Expected binary op"),
            },
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_parse_power_binds_tighter_than_negation() {
        let program = parse("x = -2 ** 2\n");
        match &program.body[0] {
            Stmt::Assign { value, .. } => {
                assert!(matches!(value, Expr::UnaryOp { op: UnOp::Neg, .. }));
            }
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_parse_elif_chain_keeps_lines() {
        let program = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        match &program.body[0] {
            Stmt::If {
                orelse, location, ..
            } => {
                assert_eq!(location.line, 1);
                match &orelse[0] {
                    Stmt::If {
                        location, orelse, ..
                    } => {
                        assert_eq!(location.line, 3);
                        assert_eq!(orelse.len(), 1);
                    }
                    _ => panic!("Expected nested if for elif"),
                }
            }
            _ => panic!("Expected if statement"),
        }
    }

    #[test]
    fn test_parse_tuple_unpacking_and_chained_assignment() {
        let program = parse("a, b = b, a\nx = y = 0\n");
        assert!(matches!(&program.body[0], Stmt::Assign { targets, .. }
            if matches!(targets[0], Expr::Tuple { .. })));
        assert!(matches!(&program.body[1], Stmt::Assign { targets, .. } if targets.len() == 2));
    }

    #[test]
    fn test_parse_comprehension_and_slice() {
        let program = parse("ys = [x * 2 for x in xs if x > 0]\nzs = ys[1:-1]\n");
        assert!(matches!(&program.body[0], Stmt::Assign { value: Expr::ListComp { .. }, .. }));
        match &program.body[1] {
            Stmt::Assign {
                value: Expr::Subscript { index, .. },
                ..
            } => assert!(matches!(**index, Expr::Slice { .. })),
            _ => panic!("Expected slice subscript"),
        }
    }

    #[test]
    fn test_parse_class_with_methods() {
        let source = "class Node:\n    def __init__(self, val):\n        self.val = val\n        self.next = None\n";
        let program = parse(source);
        match &program.body[0] {
            Stmt::ClassDef { name, body, .. } => {
                assert_eq!(name, "Node");
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected class definition"),
        }
    }

    #[test]
    fn test_parse_fstring_parts() {
        let program = parse("s = f\"{name}: {value:.2f} {{x}}\"\n");
        match &program.body[0] {
            Stmt::Assign {
                value: Expr::FString { parts, .. },
                ..
            } => {
                assert_eq!(parts.len(), 4);
                assert!(
                    matches!(&parts[2], FStringPart::Expr { spec: Some(s), .. } if s == ".2f")
                );
                assert!(matches!(&parts[3], FStringPart::Literal(s) if s == " {x}"));
            }
            _ => panic!("Expected f-string"),
        }
    }

    #[test]
    fn test_parse_generator_argument() {
        let program = parse("total = sum(x * x for x in range(4))\n");
        match &program.body[0] {
            Stmt::Assign {
                value: Expr::Call { args, .. },
                ..
            } => assert!(matches!(args[0], Expr::ListComp { .. })),
            _ => panic!("Expected call"),
        }
    }

    #[test]
    fn test_parse_lambda_keyword_argument() {
        let program = parse("pairs.sort(key=lambda p: p[1])\n");
        match &program.body[0] {
            Stmt::Expr {
                expr: Expr::Call { keywords, .. },
                ..
            } => {
                assert_eq!(keywords[0].name, "key");
                assert!(matches!(keywords[0].value, Expr::Lambda { .. }));
            }
            _ => panic!("Expected call statement"),
        }
    }

    #[test]
    fn test_missing_indented_block() {
        let err = Parser::new("while True:\nx = 1\n").unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("indented block"));
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(Parser::new("1 = x\n").unwrap().parse_program().is_err());
    }

    #[test]
    fn test_unsupported_keyword() {
        let err = Parser::new("try:\n    pass\n").unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("'try' is not supported"));
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let source = format!("x = 1{}\n", " + 1".repeat(100_000));
        let err = Parser::new(&source).unwrap().parse_program().unwrap_err();
        assert_eq!(err.message, "too many nested expressions");

        let source = format!("x = a{}\n", ".b".repeat(MAX_NESTING + 1));
        assert!(Parser::new(&source).unwrap().parse_program().is_err());
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let chain = format!("x = 1{}\n", " + 1".repeat(MAX_NESTING / 2));
        assert!(Parser::new(&chain).unwrap().parse_program().is_ok());

        let parens = format!("x = {}1{}\n", "(".repeat(8), ")".repeat(8));
        assert!(Parser::new(&parens).unwrap().parse_program().is_ok());
    }
}
