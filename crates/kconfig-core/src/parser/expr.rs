use {
    crate::parser::{Expected, KConfigError, Located, Location, Token, TokenLine},
    log::trace,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// An expression in the Kconfig language, with symbols referenced by name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    /// Named symbol (terminal).
    Symbol(String),

    /// Hex constant (terminal).
    Hex(u64),

    /// Integer constant (terminal).
    Integer(i64),

    /// String literal (terminal).
    String(String),

    /// Comparison expression.
    Cmp(ExprCmpOp, Box<LocExpr>, Box<LocExpr>),

    /// Unary negation.
    Not(Box<LocExpr>),

    /// Boolean AND.
    And(Box<LocExpr>, Box<LocExpr>),

    /// Boolean OR.
    Or(Box<LocExpr>, Box<LocExpr>),
}

/// Comparison operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExprCmpOp {
    /// Equals
    Eq,

    /// Not equals
    Ne,

    /// Less than
    Lt,

    /// Less than or equal
    Le,

    /// Greater than
    Gt,

    /// Greater than or equal
    Ge,
}

/// An expression with location information.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocExpr {
    /// The expression.
    pub expr: Expr,

    /// The location of the expression.
    pub location: Location,
}

impl LocExpr {
    /// Create a new located expression from the given raw expression and location.
    pub fn new(expr: Expr, location: Location) -> Self {
        Self {
            expr,
            location,
        }
    }

    /// Parse an expression.
    ///
    /// Precedence, loosest first: `||`, `&&`, `!`, comparison, terminal. Comparison operands
    /// are terminals, matching the reference grammar.
    pub fn parse(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let result = Self::parse_or(prev, tokens)?;

        if let Some(t) = tokens.peek() {
            if t.token != Token::If {
                return Err(KConfigError::unexpected(&t.token, Expected::Eol, t.location()));
            }
        }

        Ok(result)
    }

    /// Parse a `depends on <expr>` line.
    pub fn parse_depends_on(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        Self::parse_dep_vis(tokens, "depends", Token::On, Expected::On)
    }

    /// Parse a `visible if <expr>` line.
    pub fn parse_visible_if(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        Self::parse_dep_vis(tokens, "visible", Token::If, Expected::If)
    }

    /// The guts of the parsing logic for `depends on <expr>` or `visible if <expr>` lines.
    fn parse_dep_vis(
        tokens: &mut TokenLine,
        statement: &str,
        preposition: Token,
        expected: Expected,
    ) -> Result<Self, KConfigError> {
        let Some(cmd) = tokens.next() else {
            panic!("Expected {statement} command");
        };

        // prep_token ("preposition token") is either `if` or `on`.
        let Some(prep_token) = tokens.next() else {
            return Err(KConfigError::missing(expected, cmd.location()));
        };

        if prep_token.token != preposition {
            return Err(KConfigError::unexpected(prep_token, expected, prep_token.location()));
        }

        let expr = Self::parse(prep_token.location(), tokens)?;

        if let Some(unexpected) = tokens.next() {
            return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
        }

        Ok(expr)
    }

    /// Parse an OR (`||`) expression, or return the underlying AND expression.
    fn parse_or(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let mut lhs = Self::parse_and(prev, tokens)?;

        while tokens.peek().is_some_and(|t| t.token == Token::Or) {
            let op = tokens.next().unwrap();
            let rhs = Self::parse_and(op.location(), tokens)?;
            let loc = lhs.location();
            lhs = Self::new(Expr::Or(lhs.into(), rhs.into()), loc);
        }

        Ok(lhs)
    }

    /// Parse an AND (`&&`) expression, or return the underlying unary-not expression.
    fn parse_and(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let mut lhs = Self::parse_unary_not(prev, tokens)?;

        while tokens.peek().is_some_and(|t| t.token == Token::And) {
            let op = tokens.next().unwrap();
            let rhs = Self::parse_unary_not(op.location(), tokens)?;
            let loc = lhs.location();
            lhs = Self::new(Expr::And(lhs.into(), rhs.into()), loc);
        }

        Ok(lhs)
    }

    /// Parse a unary not expression, or return the underlying comparison expression.
    fn parse_unary_not(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let Some(token) = tokens.peek() else {
            return Err(KConfigError::missing(Expected::Expr, prev));
        };

        if token.token == Token::Not {
            let loc = token.location();
            _ = tokens.next();
            let expr = Self::parse_unary_not(loc, tokens)?;
            Ok(Self::new(Expr::Not(expr.into()), loc))
        } else {
            Self::parse_comparison(prev, tokens)
        }
    }

    /// Parse a comparison expression, or return the underlying terminal expression.
    fn parse_comparison(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let lhs = Self::parse_terminal(prev, tokens)?;

        let Some(op) = tokens.peek() else {
            return Ok(lhs);
        };

        if !op.token.is_cmp() {
            return Ok(lhs);
        }

        let op = op.clone();
        _ = tokens.next();

        let rhs = Self::parse_terminal(op.location(), tokens)?;
        let loc = lhs.location();
        let cmp = op.token.try_into().unwrap();

        Ok(Self::new(Expr::Cmp(cmp, lhs.into(), rhs.into()), loc))
    }

    /// Parse a terminal or an expression in parentheses.
    fn parse_terminal(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let Some(token) = tokens.peek() else {
            return Err(KConfigError::missing(Expected::Expr, prev));
        };

        let loc = token.location();
        let expr = match &token.token {
            Token::Symbol(s) => Expr::Symbol(s.clone()),
            Token::HexLit(i) => Expr::Hex(*i),
            Token::IntLit(i) => Expr::Integer(*i),
            Token::StrLit(s) => Expr::String(s.clone()),
            Token::LParen => return Self::parse_paren(prev, tokens),
            _ => return Err(KConfigError::unexpected(token, Expected::Expr, token.location())),
        };

        _ = tokens.next();
        Ok(Self::new(expr, loc))
    }

    /// Parse an expression in parentheses.
    fn parse_paren(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        trace!("parse_paren: tokens={tokens:?}");

        let Some(lparen) = tokens.next() else {
            return Err(KConfigError::missing(Expected::Expr, prev));
        };

        if lparen.token != Token::LParen {
            return Err(KConfigError::unexpected(&lparen.token, Expected::Expr, lparen.location()));
        }

        let result = Self::parse_or(lparen.location(), tokens)?;

        let Some(rparen) = tokens.next() else {
            return Err(KConfigError::missing(Expected::RParen, lparen.location()));
        };

        if rparen.token != Token::RParen {
            return Err(KConfigError::unexpected(&rparen.token, Expected::RParen, rparen.location()));
        }

        Ok(result)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Hex(i) => write!(f, "0x{i:x}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Cmp(op, lhs, rhs) => {
                let lhs = match lhs.expr {
                    Self::And(_, _) | Self::Or(_, _) => format!("({})", lhs.expr),
                    _ => format!("{}", lhs.expr),
                };

                let rhs = match rhs.expr {
                    Self::And(_, _) | Self::Or(_, _) => format!("({})", rhs.expr),
                    _ => format!("{}", rhs.expr),
                };

                write!(f, "{lhs} {op} {rhs}")
            }
            Self::Not(inner) => match inner.expr {
                Self::Cmp(_, _, _) | Self::And(_, _) | Self::Or(_, _) => write!(f, "!({})", inner.expr),
                _ => write!(f, "!{}", inner.expr),
            },
            Self::And(lhs, rhs) => {
                let lhs = match lhs.expr {
                    Self::Or(_, _) => format!("({})", lhs.expr),
                    _ => format!("{}", lhs.expr),
                };

                let rhs = match rhs.expr {
                    Self::Or(_, _) => format!("({})", rhs.expr),
                    _ => format!("{}", rhs.expr),
                };

                write!(f, "{lhs} && {rhs}")
            }
            Self::Or(lhs, rhs) => write!(f, "{} || {}", lhs.expr, rhs.expr),
        }
    }
}

impl Display for ExprCmpOp {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

impl TryFrom<Token> for ExprCmpOp {
    type Error = ();

    fn try_from(token: Token) -> Result<Self, Self::Error> {
        match token {
            Token::Eq => Ok(Self::Eq),
            Token::Ne => Ok(Self::Ne),
            Token::Lt => Ok(Self::Lt),
            Token::Le => Ok(Self::Le),
            Token::Gt => Ok(Self::Gt),
            Token::Ge => Ok(Self::Ge),
            _ => Err(()),
        }
    }
}

impl Located for LocExpr {
    fn location(&self) -> Location {
        self.location
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{Expr, LocExpr},
        crate::parser::{LocToken, Location, Token, TokenLine},
        std::path::Path,
    };

    fn parse(tokens: Vec<Token>) -> LocExpr {
        let path = Path::new("test");
        let tokens: Vec<LocToken> =
            tokens.into_iter().enumerate().map(|(i, t)| LocToken::new(t, Location::new(path, 1, i + 1))).collect();
        let mut line = TokenLine::new(&tokens);
        LocExpr::parse(Location::new(path, 1, 1), &mut line).unwrap()
    }

    fn sym(s: &str) -> Token {
        Token::Symbol(s.to_string())
    }

    #[test_log::test]
    fn two_or_comparison() {
        let expr = parse(vec![sym("FOO"), Token::Eq, sym("BAR"), Token::Or, sym("BAZ"), Token::Eq, sym("QUX")]);
        assert_eq!(format!("{}", expr.expr), "FOO = BAR || BAZ = QUX");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse(vec![sym("A"), Token::And, sym("B"), Token::Or, sym("C")]);
        let Expr::Or(lhs, _) = &expr.expr else {
            panic!("expected || at the top: {}", expr.expr);
        };
        assert!(matches!(lhs.expr, Expr::And(_, _)));
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let expr = parse(vec![Token::Not, sym("A"), Token::And, sym("B")]);
        let Expr::And(lhs, _) = &expr.expr else {
            panic!("expected && at the top: {}", expr.expr);
        };
        assert!(matches!(lhs.expr, Expr::Not(_)));
    }

    #[test]
    fn not_applies_to_comparison() {
        let expr = parse(vec![Token::Not, sym("A"), Token::Eq, sym("B")]);
        let Expr::Not(inner) = &expr.expr else {
            panic!("expected ! at the top: {}", expr.expr);
        };
        assert!(matches!(inner.expr, Expr::Cmp(_, _, _)));
    }

    #[test]
    fn parenthesized() {
        let expr =
            parse(vec![Token::LParen, sym("A"), Token::Or, sym("B"), Token::RParen, Token::And, sym("C")]);
        assert_eq!(format!("{}", expr.expr), "(A || B) && C");
    }
}
