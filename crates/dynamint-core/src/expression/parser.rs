//! Lexer and recursive-descent parser for the three expression dialects.
//!
//! Parsing is deliberately permissive about names: any identifier followed
//! by `(` parses as a function call, so unknown or misused function names
//! reach the validator instead of dying here with an unhelpful syntax
//! error. Only genuinely malformed input produces a [`SyntaxError`].

use super::ast::{
    AddAction, AttributePath, CompareOp, DeleteAction, Expr, FunctionCall, Operand, PathElement,
    SetAction, SetValue, UpdateExpr,
};

/// A malformed expression. Distinct from semantic rejection: syntax errors
/// are *thrown*, semantic failures are returned as message strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SyntaxError(pub String);

fn syntax(msg: impl Into<String>) -> SyntaxError {
    SyntaxError(msg.into())
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Alias(String),
    Value(String),
    Number(u32),
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("\"{s}\""),
            Self::Alias(s) => format!("\"#{s}\""),
            Self::Value(s) => format!("\":{s}\""),
            Self::Number(n) => format!("\"{n}\""),
            Self::Comma => "\",\"".to_string(),
            Self::Dot => "\".\"".to_string(),
            Self::LParen => "\"(\"".to_string(),
            Self::RParen => "\")\"".to_string(),
            Self::LBracket => "\"[\"".to_string(),
            Self::RBracket => "\"]\"".to_string(),
            Self::Eq => "\"=\"".to_string(),
            Self::Ne => "\"<>\"".to_string(),
            Self::Lt => "\"<\"".to_string(),
            Self::Le => "\"<=\"".to_string(),
            Self::Gt => "\">\"".to_string(),
            Self::Ge => "\">=\"".to_string(),
            Self::Plus => "\"+\"".to_string(),
            Self::Minus => "\"-\"".to_string(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Le);
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Ne);
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '#' | ':' => {
                let marker = c;
                chars.next();
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if is_ident_char(c) {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(syntax(format!("Syntax error; token: \"{marker}\"")));
                }
                tokens.push(if marker == '#' {
                    Token::Alias(name)
                } else {
                    Token::Value(name)
                });
            }
            c if c.is_ascii_digit() => {
                let mut n: u32 = 0;
                while let Some(&c) = chars.peek() {
                    if let Some(d) = c.to_digit(10) {
                        n = n.saturating_mul(10).saturating_add(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(n));
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if is_ident_char(c) {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => return Err(syntax(format!("Syntax error; token: \"{other}\""))),
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, SyntaxError> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, wanted: &Token) -> Result<(), SyntaxError> {
        match self.advance() {
            Some(ref token) if token == wanted => Ok(()),
            Some(token) => Err(syntax(format!("Syntax error; token: {}", token.describe()))),
            None => Err(syntax("Syntax error; unexpected end of expression")),
        }
    }

    /// Case-insensitive keyword check against the next token.
    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn take_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SyntaxError> {
        if self.take_keyword(keyword) {
            Ok(())
        } else {
            match self.peek() {
                Some(token) => Err(syntax(format!("Syntax error; token: {}", token.describe()))),
                None => Err(syntax("Syntax error; unexpected end of expression")),
            }
        }
    }

    fn expect_end(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(syntax(format!("Syntax error; token: {}", token.describe()))),
        }
    }

    fn unexpected<T>(&mut self) -> Result<T, SyntaxError> {
        match self.advance() {
            Some(token) => Err(syntax(format!("Syntax error; token: {}", token.describe()))),
            None => Err(syntax("Syntax error; unexpected end of expression")),
        }
    }

    // -- condition dialect --------------------------------------------------

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.take_keyword("OR") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;
        while self.take_keyword("AND") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.take_keyword("NOT") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(Expr::Paren(Box::new(inner)));
        }

        let operand = self.parse_operand()?;

        if let Some(op) = self.peek_compare_op() {
            self.advance();
            let right = self.parse_operand()?;
            return Ok(Expr::Compare {
                op,
                left: operand,
                right,
            });
        }
        if self.take_keyword("BETWEEN") {
            let lower = self.parse_operand()?;
            self.expect_keyword("AND")?;
            let upper = self.parse_operand()?;
            return Ok(Expr::Between {
                operand,
                lower,
                upper,
            });
        }
        if self.take_keyword("IN") {
            self.expect(&Token::LParen)?;
            let mut list = vec![self.parse_operand()?];
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                list.push(self.parse_operand()?);
            }
            self.expect(&Token::RParen)?;
            return Ok(Expr::In { operand, list });
        }

        // A bare operand is only a condition when it is a function call;
        // whether that function may stand alone is the validator's business.
        match operand {
            Operand::Function(call) => Ok(Expr::Function(call)),
            _ => self.unexpected(),
        }
    }

    fn peek_compare_op(&self) -> Option<CompareOp> {
        Some(match self.peek()? {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            _ => None?,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, SyntaxError> {
        match self.peek().cloned() {
            Some(Token::Value(name)) => {
                self.advance();
                Ok(Operand::Value(name))
            }
            Some(Token::Ident(name))
                if self.tokens.get(self.pos + 1) == Some(&Token::LParen) =>
            {
                self.advance();
                self.advance(); // consume '('
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.parse_operand()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.advance();
                        args.push(self.parse_operand()?);
                    }
                }
                self.expect(&Token::RParen)?;
                Ok(Operand::Function(FunctionCall { name, args }))
            }
            Some(Token::Ident(_) | Token::Alias(_)) => Ok(Operand::Path(self.parse_path()?)),
            _ => self.unexpected(),
        }
    }

    fn parse_path(&mut self) -> Result<AttributePath, SyntaxError> {
        let mut elements = vec![self.parse_path_name()?];
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    elements.push(self.parse_path_name()?);
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let n = match self.advance() {
                        Some(Token::Number(n)) => n,
                        Some(token) => {
                            return Err(syntax(format!(
                                "Syntax error; token: {}",
                                token.describe()
                            )));
                        }
                        None => return Err(syntax("Syntax error; unexpected end of expression")),
                    };
                    self.expect(&Token::RBracket)?;
                    elements.push(PathElement::Index(n));
                }
                _ => break,
            }
        }
        Ok(AttributePath { elements })
    }

    fn parse_path_name(&mut self) -> Result<PathElement, SyntaxError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(PathElement::Attribute(name)),
            Some(Token::Alias(name)) => Ok(PathElement::Alias(name)),
            Some(token) => Err(syntax(format!("Syntax error; token: {}", token.describe()))),
            None => Err(syntax("Syntax error; unexpected end of expression")),
        }
    }

    fn expect_value(&mut self) -> Result<String, SyntaxError> {
        match self.advance() {
            Some(Token::Value(name)) => Ok(name),
            Some(token) => Err(syntax(format!("Syntax error; token: {}", token.describe()))),
            None => Err(syntax("Syntax error; unexpected end of expression")),
        }
    }

    // -- update dialect -----------------------------------------------------

    fn parse_update(&mut self) -> Result<UpdateExpr, SyntaxError> {
        let mut update = UpdateExpr::default();
        let mut seen: Vec<&'static str> = Vec::new();

        if self.peek().is_none() {
            return Err(syntax("Syntax error; unexpected end of expression"));
        }
        while self.peek().is_some() {
            let section = if self.take_keyword("SET") {
                self.parse_set_clause(&mut update)?;
                "SET"
            } else if self.take_keyword("REMOVE") {
                self.parse_remove_clause(&mut update)?;
                "REMOVE"
            } else if self.take_keyword("ADD") {
                self.parse_add_clause(&mut update)?;
                "ADD"
            } else if self.take_keyword("DELETE") {
                self.parse_delete_clause(&mut update)?;
                "DELETE"
            } else {
                return self.unexpected();
            };
            if seen.contains(&section) && update.duplicate_section.is_none() {
                update.duplicate_section = Some(section);
            }
            seen.push(section);
        }
        Ok(update)
    }

    fn parse_set_clause(&mut self, update: &mut UpdateExpr) -> Result<(), SyntaxError> {
        loop {
            let path = self.parse_path()?;
            self.expect(&Token::Eq)?;
            let first = self.parse_operand()?;
            let value = match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    SetValue::Plus(first, self.parse_operand()?)
                }
                Some(Token::Minus) => {
                    self.advance();
                    SetValue::Minus(first, self.parse_operand()?)
                }
                _ => SetValue::Operand(first),
            };
            update.set_actions.push(SetAction { path, value });
            if self.peek() == Some(&Token::Comma) {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    fn parse_remove_clause(&mut self, update: &mut UpdateExpr) -> Result<(), SyntaxError> {
        loop {
            update.remove_paths.push(self.parse_path()?);
            if self.peek() == Some(&Token::Comma) {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    fn parse_add_clause(&mut self, update: &mut UpdateExpr) -> Result<(), SyntaxError> {
        loop {
            let path = self.parse_path()?;
            let value = self.expect_value()?;
            update.add_actions.push(AddAction { path, value });
            if self.peek() == Some(&Token::Comma) {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    fn parse_delete_clause(&mut self, update: &mut UpdateExpr) -> Result<(), SyntaxError> {
        loop {
            let path = self.parse_path()?;
            let value = self.expect_value()?;
            update.delete_actions.push(DeleteAction { path, value });
            if self.peek() == Some(&Token::Comma) {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    // -- projection dialect -------------------------------------------------

    fn parse_projection(&mut self) -> Result<Vec<AttributePath>, SyntaxError> {
        let mut paths = vec![self.parse_path()?];
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            paths.push(self.parse_path()?);
        }
        Ok(paths)
    }
}

/// Parse a condition expression to its AST. Syntax only; no validation.
pub fn parse_condition_ast(input: &str) -> Result<Expr, SyntaxError> {
    if input.trim().is_empty() {
        return Err(syntax("The expression can not be empty;"));
    }
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse an update expression to its AST. Syntax only; no validation.
pub fn parse_update_ast(input: &str) -> Result<UpdateExpr, SyntaxError> {
    if input.trim().is_empty() {
        return Err(syntax("The expression can not be empty;"));
    }
    let mut parser = Parser::new(input)?;
    parser.parse_update()
}

/// Parse a projection expression to its paths. Syntax only; no validation.
pub fn parse_projection_ast(input: &str) -> Result<Vec<AttributePath>, SyntaxError> {
    if input.trim().is_empty() {
        return Err(syntax("The expression can not be empty;"));
    }
    let mut parser = Parser::new(input)?;
    let paths = parser.parse_projection()?;
    parser.expect_end()?;
    Ok(paths)
}
