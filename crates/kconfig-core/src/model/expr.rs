use crate::{model::SymbolId, parser::ExprCmpOp};

/// A dependency expression with symbols referenced by handle.
///
/// This is the evaluated form of [`parser::Expr`][crate::parser::Expr]: every atom has been
/// interned into the model's symbol table, with literals becoming constant symbols.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    /// A symbol or constant (terminal).
    Sym(SymbolId),

    /// Unary negation.
    Not(Box<Expr>),

    /// Boolean AND.
    And(Box<Expr>, Box<Expr>),

    /// Boolean OR.
    Or(Box<Expr>, Box<Expr>),

    /// Comparison between two atoms.
    Cmp(ExprCmpOp, SymbolId, SymbolId),
}

impl Expr {
    /// AND `b` into an optional accumulated condition. `None` acts as `y`.
    pub(crate) fn and_join(a: Option<Expr>, b: Expr) -> Expr {
        match a {
            None => b,
            Some(a) => Expr::And(a.into(), b.into()),
        }
    }

    /// OR `b` into an optional accumulated expression. `None` acts as `n`.
    pub(crate) fn or_join(a: Option<Expr>, b: Expr) -> Expr {
        match a {
            None => b,
            Some(a) => Expr::Or(a.into(), b.into()),
        }
    }

    /// AND two optional conditions, either of which may be absent (`y`).
    pub(crate) fn and_opt(a: Option<Expr>, b: Option<Expr>) -> Option<Expr> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(Expr::And(a.into(), b.into())),
        }
    }
}
