//! Expression tree and its recursive-descent parser.
//!
//! Every bare identifier that is not a reserved word becomes
//! [`Expr::Identifier`], a lookup in the scope. Identifiers on the right of a
//! `.` are property names, never lookups.

use std::fmt;

use super::lexer::{tokenize, Token};

/// Words that never resolve against the scope.
pub const RESERVED: &[&str] = &["true", "false", "null", "undefined", "Infinity", "NaN", "Math"];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Scope lookup of a root name.
    Identifier(String),
    /// The `Math` namespace.
    Math,
    Array(Vec<Expr>),
    Member {
        object: Box<Expr>,
        property: Property,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

impl BinaryOp {
    fn from_punct(p: &str) -> Option<Self> {
        Some(match p {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNe,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Parse a complete expression.
pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.conditional()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, offset)) => Err(format!("unexpected {} at {offset}", describe(token))),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {n}"),
        Token::Str(s) => format!("string {s:?}"),
        Token::Ident(name) => format!("identifier `{name}`"),
        Token::Punct(p) => format!("`{p}`"),
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek_punct(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some((Token::Punct(p), _)) => Some(p),
            _ => None,
        }
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.peek_punct() == Some(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), String> {
        if self.eat(punct) {
            return Ok(());
        }
        Err(match self.tokens.get(self.pos) {
            Some((token, offset)) => format!("expected `{punct}`, found {} at {offset}", describe(token)),
            None => format!("expected `{punct}`, found end of input"),
        })
    }

    fn conditional(&mut self) -> Result<Expr, String> {
        let test = self.logical_or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.conditional()?;
        self.expect(":")?;
        let alternate = self.conditional()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, String> {
        let mut left = self.logical_and()?;
        while self.eat("||") {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, String> {
        let mut left = self.binary(0)?;
        while self.eat("&&") {
            let right = self.binary(0)?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Left-associative binary levels: equality, relational, additive, multiplicative.
    fn binary(&mut self, level: usize) -> Result<Expr, String> {
        const LEVELS: [&[&str]; 4] = [
            &["===", "!==", "==", "!="],
            &["<", "<=", ">", ">="],
            &["+", "-"],
            &["*", "/", "%"],
        ];
        if level == LEVELS.len() {
            return self.unary();
        }

        let mut left = self.binary(level + 1)?;
        while let Some(p) = self.peek_punct().filter(|p| LEVELS[level].contains(p)) {
            self.pos += 1;
            let right = self.binary(level + 1)?;
            let op = BinaryOp::from_punct(p).ok_or_else(|| format!("unknown operator `{p}`"))?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        let op = match self.peek_punct() {
            Some("!") => UnaryOp::Not,
            Some("-") => UnaryOp::Neg,
            Some("+") => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                match self.tokens.get(self.pos) {
                    Some((Token::Ident(name), _)) => {
                        let name = name.clone();
                        self.pos += 1;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property: Property::Named(name),
                        };
                    }
                    Some((token, offset)) => {
                        return Err(format!("expected property name, found {} at {offset}", describe(token)));
                    }
                    None => return Err("expected property name, found end of input".to_string()),
                }
            } else if self.eat("[") {
                let key = self.conditional()?;
                self.expect("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Computed(Box::new(key)),
                };
            } else if self.eat("(") {
                let args = self.list(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close` (consumed).
    fn list(&mut self, close: &str) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.conditional()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let Some((token, offset)) = self.tokens.get(self.pos).cloned() else {
            return Err("unexpected end of input".to_string());
        };
        self.pos += 1;

        match token {
            Token::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Literal::String(s))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                "Infinity" => Expr::Literal(Literal::Number(f64::INFINITY)),
                "NaN" => Expr::Literal(Literal::Number(f64::NAN)),
                "Math" => Expr::Math,
                _ => Expr::Identifier(name),
            }),
            Token::Punct("(") => {
                let inner = self.conditional()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Punct("[") => Ok(Expr::Array(self.list("]")?)),
            token => Err(format!("unexpected {} at {offset}", describe(&token))),
        }
    }
}

// =============================================================================
// Display (used in error messages)
// =============================================================================

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::Undefined) => f.write_str("undefined"),
            Expr::Literal(Literal::Null) => f.write_str("null"),
            Expr::Literal(Literal::Bool(b)) => write!(f, "{b}"),
            Expr::Literal(Literal::Number(n)) => f.write_str(&crate::types::format_number(*n)),
            Expr::Literal(Literal::String(s)) => write!(f, "{s:?}"),
            Expr::Identifier(name) => f.write_str(name),
            Expr::Math => f.write_str("Math"),
            Expr::Array(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Member { object, property: Property::Named(name) } => write!(f, "{object}.{name}"),
            Expr::Member { object, property: Property::Computed(key) } => write!(f, "{object}[{key}]"),
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Unary { op, operand } => {
                let op = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                };
                write!(f, "{op}{operand}")
            }
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.as_str()),
            Expr::Logical { op, left, right } => {
                let op = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "({left} {op} {right})")
            }
            Expr::Conditional { test, consequent, alternate } => {
                write!(f, "({test} ? {consequent} : {alternate})")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * c").unwrap();
        assert_eq!(expr.to_string(), "(a + (b * c))");

        let expr = parse("a || b && c ? 1 : 2").unwrap();
        assert_eq!(expr.to_string(), "((a || (b && c)) ? 1 : 2)");
    }

    #[test]
    fn test_member_names_are_not_lookups() {
        let expr = parse("user.name").unwrap();
        assert_eq!(
            expr,
            Expr::Member {
                object: ident("user"),
                property: Property::Named("name".to_string()),
            }
        );
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(parse("Math.PI").unwrap().to_string(), "Math.PI");
        assert!(matches!(parse("Math").unwrap(), Expr::Math));
        assert_eq!(parse("undefined").unwrap(), Expr::Literal(Literal::Undefined));
    }

    #[test]
    fn test_calls_and_arrays() {
        let expr = parse("fmt(a[0], [1, 'x'])").unwrap();
        assert_eq!(expr.to_string(), "fmt(a[0], [1, \"x\"])");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("a +").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("a ? b").is_err());
        assert!(parse("a.").is_err());
    }
}
