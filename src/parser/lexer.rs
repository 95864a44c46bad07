//! Lexer (tokenizer) for traced scripts
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Block structure is indentation-based, so the lexer keeps an indentation
//! stack and emits synthetic [`Token::Indent`] / [`Token::Dedent`] tokens at
//! the start of logical lines. Newlines inside brackets are ignored.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    StringLiteral(String, SourceLocation),
    /// Raw body of an `f"..."` string; split into parts by the parser
    FStringLiteral(String, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    True(SourceLocation),
    False(SourceLocation),
    None(SourceLocation),
    And(SourceLocation),
    Or(SourceLocation),
    Not(SourceLocation),
    If(SourceLocation),
    Elif(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    For(SourceLocation),
    In(SourceLocation),
    Is(SourceLocation),
    Def(SourceLocation),
    Return(SourceLocation),
    Class(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    Pass(SourceLocation),
    Global(SourceLocation),
    Import(SourceLocation),
    From(SourceLocation),
    As(SourceLocation),
    Lambda(SourceLocation),
    Raise(SourceLocation),
    Assert(SourceLocation),
    Del(SourceLocation),
    /// Keywords of the full language that this interpreter does not run
    /// (`try`, `with`, `yield`, ...)
    Reserved(String, SourceLocation),

    // Arithmetic
    Plus(SourceLocation),        // +
    Minus(SourceLocation),       // -
    Star(SourceLocation),        // *
    DoubleStar(SourceLocation),  // **
    Slash(SourceLocation),       // /
    DoubleSlash(SourceLocation), // //
    Percent(SourceLocation),     // %

    // Comparison
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Bitwise
    Amp(SourceLocation),   // &
    Pipe(SourceLocation),  // |
    Caret(SourceLocation), // ^
    Tilde(SourceLocation), // ~
    LtLt(SourceLocation),  // <<
    GtGt(SourceLocation),  // >>

    // Assignment
    Eq(SourceLocation),            // =
    PlusEq(SourceLocation),        // +=
    MinusEq(SourceLocation),       // -=
    StarEq(SourceLocation),        // *=
    SlashEq(SourceLocation),       // /=
    DoubleSlashEq(SourceLocation), // //=
    PercentEq(SourceLocation),     // %=
    DoubleStarEq(SourceLocation),  // **=

    // Punctuation
    Dot(SourceLocation),       // .
    Comma(SourceLocation),     // ,
    Colon(SourceLocation),     // :
    Semicolon(SourceLocation), // ;
    Arrow(SourceLocation),     // ->
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }

    // Layout
    Newline(SourceLocation),
    Indent(SourceLocation),
    Dedent(SourceLocation),
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::IntLiteral(_, loc)
            | Token::FloatLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::FStringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Reserved(_, loc) => *loc,
            Token::True(loc)
            | Token::False(loc)
            | Token::None(loc)
            | Token::And(loc)
            | Token::Or(loc)
            | Token::Not(loc)
            | Token::If(loc)
            | Token::Elif(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::For(loc)
            | Token::In(loc)
            | Token::Is(loc)
            | Token::Def(loc)
            | Token::Return(loc)
            | Token::Class(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::Pass(loc)
            | Token::Global(loc)
            | Token::Import(loc)
            | Token::From(loc)
            | Token::As(loc)
            | Token::Lambda(loc)
            | Token::Raise(loc)
            | Token::Assert(loc)
            | Token::Del(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::DoubleStar(loc)
            | Token::Slash(loc)
            | Token::DoubleSlash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::Amp(loc)
            | Token::Pipe(loc)
            | Token::Caret(loc)
            | Token::Tilde(loc)
            | Token::LtLt(loc)
            | Token::GtGt(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::SlashEq(loc)
            | Token::DoubleSlashEq(loc)
            | Token::PercentEq(loc)
            | Token::DoubleStarEq(loc)
            | Token::Dot(loc)
            | Token::Comma(loc)
            | Token::Colon(loc)
            | Token::Semicolon(loc)
            | Token::Arrow(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::Newline(loc)
            | Token::Indent(loc)
            | Token::Dedent(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, _) => write!(f, "int literal {}", n),
            Token::FloatLiteral(n, _) => write!(f, "float literal {}", n),
            Token::StringLiteral(s, _) => write!(f, "string literal {:?}", s),
            Token::FStringLiteral(s, _) => write!(f, "f-string {:?}", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Reserved(s, _) => write!(f, "'{}'", s),
            Token::True(_) => write!(f, "'True'"),
            Token::False(_) => write!(f, "'False'"),
            Token::None(_) => write!(f, "'None'"),
            Token::And(_) => write!(f, "'and'"),
            Token::Or(_) => write!(f, "'or'"),
            Token::Not(_) => write!(f, "'not'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Elif(_) => write!(f, "'elif'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::For(_) => write!(f, "'for'"),
            Token::In(_) => write!(f, "'in'"),
            Token::Is(_) => write!(f, "'is'"),
            Token::Def(_) => write!(f, "'def'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::Class(_) => write!(f, "'class'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::Pass(_) => write!(f, "'pass'"),
            Token::Global(_) => write!(f, "'global'"),
            Token::Import(_) => write!(f, "'import'"),
            Token::From(_) => write!(f, "'from'"),
            Token::As(_) => write!(f, "'as'"),
            Token::Lambda(_) => write!(f, "'lambda'"),
            Token::Raise(_) => write!(f, "'raise'"),
            Token::Assert(_) => write!(f, "'assert'"),
            Token::Del(_) => write!(f, "'del'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::DoubleStar(_) => write!(f, "'**'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::DoubleSlash(_) => write!(f, "'//'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::Amp(_) => write!(f, "'&'"),
            Token::Pipe(_) => write!(f, "'|'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::Tilde(_) => write!(f, "'~'"),
            Token::LtLt(_) => write!(f, "'<<'"),
            Token::GtGt(_) => write!(f, "'>>'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::DoubleSlashEq(_) => write!(f, "'//='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::DoubleStarEq(_) => write!(f, "'**='"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Colon(_) => write!(f, "':'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Arrow(_) => write!(f, "'->'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::Newline(_) => write!(f, "end of line"),
            Token::Indent(_) => write!(f, "indent"),
            Token::Dedent(_) => write!(f, "dedent"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.message, self.location.line, self.location.column
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for traced scripts
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
        }
    }

    /// Create a lexer whose locations start at `origin` (used for the
    /// expressions embedded in f-strings)
    pub fn starting_at(input: &str, origin: SourceLocation) -> Self {
        Self {
            line: origin.line,
            column: origin.column,
            ..Self::new(input)
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut at_line_start = true;

        loop {
            if at_line_start && self.bracket_depth == 0 {
                let width = self.measure_indentation();
                match self.peek() {
                    None => break,
                    // Blank and comment-only lines do not affect indentation
                    Some('\n') | Some('\r') => {
                        self.advance();
                        continue;
                    }
                    Some('#') => {
                        self.skip_comment();
                        continue;
                    }
                    Some(_) => {}
                }
                self.apply_indentation(width, &mut tokens)?;
                at_line_start = false;
            }

            self.skip_inline_whitespace()?;

            match self.peek() {
                None => break,
                Some('#') => self.skip_comment(),
                Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    let loc = self.current_location();
                    self.advance();
                    if self.bracket_depth == 0 {
                        tokens.push(Token::Newline(loc));
                        at_line_start = true;
                    }
                }
                Some(_) => tokens.push(self.next_token()?),
            }
        }

        let loc = self.current_location();
        if !matches!(tokens.last(), None | Some(Token::Newline(_))) {
            tokens.push(Token::Newline(loc));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::Dedent(loc));
        }
        tokens.push(Token::Eof(loc));

        Ok(tokens)
    }

    /// Count leading spaces of a line (tabs advance to the next multiple of 8)
    fn measure_indentation(&mut self) -> usize {
        let mut width = 0;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                _ => break,
            }
            self.advance();
        }
        width
    }

    fn apply_indentation(
        &mut self,
        width: usize,
        tokens: &mut Vec<Token>,
    ) -> Result<(), LexError> {
        let loc = self.current_location();
        let current = self.indent_stack.last().copied().unwrap_or(0);

        if width > current {
            self.indent_stack.push(width);
            tokens.push(Token::Indent(loc));
            return Ok(());
        }

        while width < self.indent_stack.last().copied().unwrap_or(0) {
            self.indent_stack.pop();
            tokens.push(Token::Dedent(loc));
        }

        if width != self.indent_stack.last().copied().unwrap_or(0) {
            return Err(LexError {
                message: "unindent does not match any outer indentation level"
                    .to_string(),
                location: loc,
            });
        }
        Ok(())
    }

    /// Skip spaces, tabs and backslash line continuations
    fn skip_inline_whitespace(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\x0c' => {
                    self.advance();
                }
                '\\' => {
                    let loc = self.current_location();
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.peek() != Some('\n') {
                        return Err(LexError {
                            message: "unexpected character after line continuation character"
                                .to_string(),
                            location: loc,
                        });
                    }
                    self.advance();
                }
                '\r' if self.bracket_depth > 0 => {
                    self.advance();
                }
                '\n' if self.bracket_depth > 0 => {
                    self.advance();
                }
                '#' if self.bracket_depth > 0 => self.skip_comment(),
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            // String literals
            '"' | '\'' => self.string_literal(ch, loc, false),

            // Numeric literals
            '0'..='9' => self.number_literal(ch, loc),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(ch, loc)
            }

            // Identifiers, keywords and prefixed strings
            c if c.is_alphabetic() || c == '_' => {
                self.identifier_or_keyword(c, loc)
            }

            // Operators and punctuation
            '+' => Ok(self.with_eq(loc, Token::PlusEq, Token::Plus)),
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    Ok(Token::Arrow(loc))
                } else {
                    Ok(self.with_eq(loc, Token::MinusEq, Token::Minus))
                }
            }
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    Ok(self.with_eq(loc, Token::DoubleStarEq, Token::DoubleStar))
                } else {
                    Ok(self.with_eq(loc, Token::StarEq, Token::Star))
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    self.advance();
                    Ok(self.with_eq(
                        loc,
                        Token::DoubleSlashEq,
                        Token::DoubleSlash,
                    ))
                } else {
                    Ok(self.with_eq(loc, Token::SlashEq, Token::Slash))
                }
            }
            '%' => Ok(self.with_eq(loc, Token::PercentEq, Token::Percent)),
            '=' => Ok(self.with_eq(loc, Token::EqEq, Token::Eq)),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::NotEq(loc))
                } else {
                    Err(LexError {
                        message: "invalid syntax: '!'".to_string(),
                        location: loc,
                    })
                }
            }
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    Ok(Token::LtLt(loc))
                } else {
                    Ok(self.with_eq(loc, Token::Le, Token::Lt))
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    Ok(Token::GtGt(loc))
                } else {
                    Ok(self.with_eq(loc, Token::Ge, Token::Gt))
                }
            }
            '&' => Ok(Token::Amp(loc)),
            '|' => Ok(Token::Pipe(loc)),
            '^' => Ok(Token::Caret(loc)),
            '~' => Ok(Token::Tilde(loc)),
            '.' => Ok(Token::Dot(loc)),
            ',' => Ok(Token::Comma(loc)),
            ':' => Ok(Token::Colon(loc)),
            ';' => Ok(Token::Semicolon(loc)),
            '(' | '[' | '{' => {
                self.bracket_depth += 1;
                Ok(match ch {
                    '(' => Token::LParen(loc),
                    '[' => Token::LBracket(loc),
                    _ => Token::LBrace(loc),
                })
            }
            ')' | ']' | '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Ok(match ch {
                    ')' => Token::RParen(loc),
                    ']' => Token::RBracket(loc),
                    _ => Token::RBrace(loc),
                })
            }

            _ => Err(LexError {
                message: format!("invalid character '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Consume a trailing `=` to pick the compound form of an operator
    fn with_eq(
        &mut self,
        loc: SourceLocation,
        compound: fn(SourceLocation) -> Token,
        plain: fn(SourceLocation) -> Token,
    ) -> Token {
        if self.peek() == Some('=') {
            self.advance();
            compound(loc)
        } else {
            plain(loc)
        }
    }

    /// Parse a string literal whose opening quote has been consumed.
    ///
    /// Handles single-quoted and triple-quoted forms. Raw strings keep
    /// backslashes verbatim; f-strings are returned unescaped-but-unsplit.
    fn string_literal(
        &mut self,
        quote: char,
        loc: SourceLocation,
        raw: bool,
    ) -> Result<Token, LexError> {
        self.scan_string(quote, loc, raw)
            .map(|s| Token::StringLiteral(s, loc))
    }

    fn scan_string(
        &mut self,
        quote: char,
        loc: SourceLocation,
        raw: bool,
    ) -> Result<String, LexError> {
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut string = String::new();
        while let Some(ch) = self.peek() {
            if ch == quote {
                if !triple {
                    self.advance();
                    return Ok(string);
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote)
                {
                    self.advance();
                    self.advance();
                    self.advance();
                    return Ok(string);
                }
                string.push(ch);
                self.advance();
                continue;
            }

            if ch == '\n' && !triple {
                break;
            }

            if ch == '\\' {
                self.advance();
                let escaped = self.advance().ok_or_else(|| LexError {
                    message: "unterminated string literal".to_string(),
                    location: loc,
                })?;
                if raw {
                    string.push('\\');
                    string.push(escaped);
                    continue;
                }
                match escaped {
                    'n' => string.push('\n'),
                    't' => string.push('\t'),
                    'r' => string.push('\r'),
                    '0' => string.push('\0'),
                    '\\' => string.push('\\'),
                    '\'' => string.push('\''),
                    '"' => string.push('"'),
                    '\n' => {}
                    other => {
                        // Unknown escapes are kept literally
                        string.push('\\');
                        string.push(other);
                    }
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(LexError {
            message: "unterminated string literal".to_string(),
            location: loc,
        })
    }

    /// Parse integer or float literal
    fn number_literal(
        &mut self,
        first: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(first);

        if first == '0' && matches!(self.peek(), Some('x' | 'X' | 'b' | 'B' | 'o' | 'O'))
        {
            let radix = match self.advance() {
                Some('x' | 'X') => 16,
                Some('b' | 'B') => 2,
                _ => 8,
            };
            let mut digits = String::new();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    if ch != '_' {
                        digits.push(ch);
                    }
                    self.advance();
                } else {
                    break;
                }
            }
            return i64::from_str_radix(&digits, radix)
                .map(|n| Token::IntLiteral(n, loc))
                .map_err(|_| LexError {
                    message: format!("invalid number literal '0?{}'", digits),
                    location: loc,
                });
        }

        let mut is_float = first == '.';
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => text.push(ch),
                '_' => {}
                '.' if !is_float => {
                    is_float = true;
                    text.push(ch);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(ch);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                        self.advance();
                    }
                    continue;
                }
                _ => break,
            }
            self.advance();
        }

        if is_float {
            text.parse::<f64>()
                .map(|n| Token::FloatLiteral(n, loc))
                .map_err(|_| LexError {
                    message: format!("invalid float literal '{}'", text),
                    location: loc,
                })
        } else {
            text.parse::<i64>()
                .map(|n| Token::IntLiteral(n, loc))
                .map_err(|_| LexError {
                    message: format!("integer literal '{}' is too large", text),
                    location: loc,
                })
        }
    }

    /// Parse identifier, keyword, or a prefixed string (`f"..."`, `r'...'`)
    fn identifier_or_keyword(
        &mut self,
        first: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut ident = String::new();
        ident.push(first);

        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(quote @ ('"' | '\'')) = self.peek() {
            let prefix = ident.to_ascii_lowercase();
            if matches!(prefix.as_str(), "f" | "r" | "fr" | "rf" | "b" | "u") {
                self.advance();
                let raw = prefix.contains('r');
                let body = self.scan_string(quote, loc, raw)?;
                return Ok(if prefix.contains('f') {
                    Token::FStringLiteral(body, loc)
                } else {
                    Token::StringLiteral(body, loc)
                });
            }
        }

        let token = match ident.as_str() {
            "True" => Token::True(loc),
            "False" => Token::False(loc),
            "None" => Token::None(loc),
            "and" => Token::And(loc),
            "or" => Token::Or(loc),
            "not" => Token::Not(loc),
            "if" => Token::If(loc),
            "elif" => Token::Elif(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "for" => Token::For(loc),
            "in" => Token::In(loc),
            "is" => Token::Is(loc),
            "def" => Token::Def(loc),
            "return" => Token::Return(loc),
            "class" => Token::Class(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "pass" => Token::Pass(loc),
            "global" => Token::Global(loc),
            "import" => Token::Import(loc),
            "from" => Token::From(loc),
            "as" => Token::As(loc),
            "lambda" => Token::Lambda(loc),
            "raise" => Token::Raise(loc),
            "assert" => Token::Assert(loc),
            "del" => Token::Del(loc),
            "try" | "except" | "finally" | "with" | "yield" | "async"
            | "await" | "nonlocal" => Token::Reserved(ident, loc),
            _ => Token::Ident(ident, loc),
        };

        Ok(token)
    }

    // Helper methods

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        if self.is_at_end() {
            return None;
        }

        let ch = self.input[self.position];
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    #[test]
    fn test_simple_assignment() {
        let tokens = lex("x = 42\n");
        assert!(matches!(tokens[0], Token::Ident(ref s, _) if s == "x"));
        assert!(matches!(tokens[1], Token::Eq(_)));
        assert!(matches!(tokens[2], Token::IntLiteral(42, _)));
        assert!(matches!(tokens[3], Token::Newline(_)));
        assert!(matches!(tokens[4], Token::Eof(_)));
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = lex("if x:\n    y = 1\nz = 2\n");
        let indents = tokens.iter().filter(|t| matches!(t, Token::Indent(_))).count();
        let dedents = tokens.iter().filter(|t| matches!(t, Token::Dedent(_))).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn test_dedents_closed_at_eof() {
        let tokens = lex("def f():\n    if x:\n        return 1");
        let dedents = tokens.iter().filter(|t| matches!(t, Token::Dedent(_))).count();
        assert_eq!(dedents, 2);
        assert!(matches!(tokens.last(), Some(Token::Eof(_))));
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let tokens = lex("x = 1\n\n    # indented comment\ny = 2\n");
        assert!(!tokens.iter().any(|t| matches!(t, Token::Indent(_))));
    }

    #[test]
    fn test_newlines_inside_brackets() {
        let tokens = lex("a = [1,\n     2]\n");
        let newlines = tokens.iter().filter(|t| matches!(t, Token::Newline(_))).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_operators() {
        let tokens = lex("a //= 2 ** 3 != 4\n");
        assert!(matches!(tokens[1], Token::DoubleSlashEq(_)));
        assert!(matches!(tokens[3], Token::DoubleStar(_)));
        assert!(matches!(tokens[5], Token::NotEq(_)));
    }

    #[test]
    fn test_string_forms() {
        let tokens = lex("s = 'a\\nb' + \"\"\"x\ny\"\"\" + f\"{n}!\"\n");
        assert!(matches!(tokens[2], Token::StringLiteral(ref s, _) if s == "a\nb"));
        assert!(matches!(tokens[4], Token::StringLiteral(ref s, _) if s == "x\ny"));
        assert!(matches!(tokens[6], Token::FStringLiteral(ref s, _) if s == "{n}!"));
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("1_000 3.5 1e3 0xff .5\n");
        assert!(matches!(tokens[0], Token::IntLiteral(1000, _)));
        assert!(matches!(tokens[1], Token::FloatLiteral(n, _) if n == 3.5));
        assert!(matches!(tokens[2], Token::FloatLiteral(n, _) if n == 1000.0));
        assert!(matches!(tokens[3], Token::IntLiteral(255, _)));
        assert!(matches!(tokens[4], Token::FloatLiteral(n, _) if n == 0.5));
    }

    #[test]
    fn test_bad_unindent() {
        let err = Lexer::new("if x:\n    a = 1\n  b = 2\n").tokenize().unwrap_err();
        assert!(err.message.contains("unindent"));
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new("s = 'abc\n").tokenize().is_err());
    }
}
