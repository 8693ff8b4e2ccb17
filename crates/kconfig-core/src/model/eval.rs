use {
    crate::{
        model::{Expr, Model, SymbolId, SymbolValue},
        parser::{Expr as ParseExpr, ExprCmpOp, LocExpr, Type},
        Tristate,
    },
    std::cmp::Ordering,
};

impl Model {
    /// Evaluate an expression to a tristate in the current model state.
    ///
    /// `&&` is `min`, `||` is `max`, `!` swaps `n` and `y`. Comparisons yield `y` or `n`.
    pub(crate) fn expr_tristate(&self, expr: &Expr) -> Tristate {
        match expr {
            Expr::Sym(id) => self.sym_tristate(*id),
            Expr::Not(inner) => self.expr_tristate(inner).not(),
            Expr::And(lhs, rhs) => self.expr_tristate(lhs).and(self.expr_tristate(rhs)),
            Expr::Or(lhs, rhs) => self.expr_tristate(lhs).or(self.expr_tristate(rhs)),
            Expr::Cmp(op, lhs, rhs) => {
                compare_strs(*op, &self.str_value(*lhs), &self.str_value(*rhs)).into()
            }
        }
    }

    /// Evaluate an optional condition; `None` acts as `y`.
    pub(crate) fn cond_tristate(&self, cond: &Option<Expr>) -> Tristate {
        match cond {
            None => Tristate::Yes,
            Some(expr) => self.expr_tristate(expr),
        }
    }

    /// A symbol's current value coerced to a tristate: nonzero numeric and nonempty string
    /// values coerce to `y`.
    pub(crate) fn sym_tristate(&self, id: SymbolId) -> Tristate {
        match self.value(id) {
            SymbolValue::Tristate(t) => t,
            SymbolValue::String(s) => (!s.is_empty()).into(),
            SymbolValue::Int(i) => (i != 0).into(),
            SymbolValue::Hex(h) => (h != 0).into(),
        }
    }

    /// The string form of a symbol's current value, as comparisons and `.config` output see it.
    pub(crate) fn str_value(&self, id: SymbolId) -> String {
        let sym = &self.symbols[id];

        // Undeclared non-constant symbols read as the empty string.
        if sym.const_value.is_none() && sym.kind == Type::Unknown {
            return String::new();
        }

        self.value(id).to_string()
    }

    /// Evaluate a textual expression directly, resolving atoms by name. Unknown symbols read
    /// as `n`. Used for ad-hoc queries so that evaluation never mutates the symbol table.
    pub(crate) fn eval_parsed(&self, expr: &ParseExpr) -> Tristate {
        match expr {
            ParseExpr::Symbol(name) => match name.as_str() {
                "n" => Tristate::No,
                "m" => Tristate::Mod,
                "y" => Tristate::Yes,
                _ => match self.symbol(name) {
                    Some(id) => self.sym_tristate(id),
                    None => Tristate::No,
                },
            },
            ParseExpr::Integer(i) => (*i != 0).into(),
            ParseExpr::Hex(h) => (*h != 0).into(),
            ParseExpr::String(s) => (!s.is_empty()).into(),
            ParseExpr::Not(inner) => self.eval_parsed(&inner.expr).not(),
            ParseExpr::And(lhs, rhs) => self.eval_parsed(&lhs.expr).and(self.eval_parsed(&rhs.expr)),
            ParseExpr::Or(lhs, rhs) => self.eval_parsed(&lhs.expr).or(self.eval_parsed(&rhs.expr)),
            ParseExpr::Cmp(op, lhs, rhs) => {
                compare_strs(*op, &self.parsed_atom_str(lhs), &self.parsed_atom_str(rhs)).into()
            }
        }
    }

    fn parsed_atom_str(&self, expr: &LocExpr) -> String {
        match &expr.expr {
            ParseExpr::Symbol(name) => match name.as_str() {
                "n" | "m" | "y" => name.clone(),
                _ => match self.symbol(name) {
                    Some(id) => self.str_value(id),
                    None => String::new(),
                },
            },
            ParseExpr::Integer(i) => i.to_string(),
            ParseExpr::Hex(h) => format!("0x{h:x}"),
            ParseExpr::String(s) => s.clone(),
            _ => String::new(),
        }
    }
}

/// Compare two symbol string values.
///
/// `=` and `!=` compare textually. The ordering operators compare numerically when both sides
/// parse as integers, otherwise lexicographically.
pub(crate) fn compare_strs(op: ExprCmpOp, lhs: &str, rhs: &str) -> bool {
    match op {
        ExprCmpOp::Eq => lhs == rhs,
        ExprCmpOp::Ne => lhs != rhs,
        _ => {
            let ordering = match (parse_number(lhs), parse_number(rhs)) {
                (Some(l), Some(r)) => l.cmp(&r),
                _ => lhs.cmp(rhs),
            };

            matches!(
                (op, ordering),
                (ExprCmpOp::Lt, Ordering::Less)
                    | (ExprCmpOp::Le, Ordering::Less | Ordering::Equal)
                    | (ExprCmpOp::Gt, Ordering::Greater)
                    | (ExprCmpOp::Ge, Ordering::Greater | Ordering::Equal)
            )
        }
    }
}

/// Parse a decimal or `0x`-prefixed value for comparison purposes.
pub(crate) fn parse_number(s: &str) -> Option<i128> {
    let s = s.trim();

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }

    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use {
        super::{compare_strs, parse_number},
        crate::parser::ExprCmpOp,
    };

    #[test]
    fn numeric_comparison_when_both_sides_numeric() {
        assert!(compare_strs(ExprCmpOp::Lt, "9", "10"));
        assert!(compare_strs(ExprCmpOp::Ge, "0x10", "16"));
    }

    #[test]
    fn lexicographic_fallback() {
        // "10" < "9" lexicographically.
        assert!(compare_strs(ExprCmpOp::Lt, "10", "9abc"));
        assert!(compare_strs(ExprCmpOp::Eq, "foo", "foo"));
        assert!(compare_strs(ExprCmpOp::Ne, "foo", "bar"));
    }

    #[test]
    fn number_forms() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("-3"), Some(-3));
        assert_eq!(parse_number("0x2A"), Some(42));
        assert_eq!(parse_number("zzz"), None);
    }
}
