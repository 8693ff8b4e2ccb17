use {
    crate::Tristate,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// A literal value appearing in a property position, e.g. a `range` bound.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LitValue {
    /// Hex value.
    Hex(u64),

    /// Integer value.
    Int(i64),

    /// String value.
    String(String),

    /// Symbol reference.
    Symbol(String),

    /// Tristate value.
    Tristate(Tristate),
}

impl Display for LitValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Hex(h) => write!(f, "0x{h:x}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => f.write_str(s),
            Self::Tristate(t) => f.write_str(t.as_str()),
        }
    }
}
