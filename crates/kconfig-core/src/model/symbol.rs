use {
    crate::{
        model::{ChoiceId, Expr},
        parser::{Location, Type},
        Tristate,
    },
    slotmap::new_key_type,
    std::{cell::RefCell, fmt::{Display, Formatter, Result as FmtResult}},
};

new_key_type! {
    /// Handle to a [`Symbol`] in a [`Model`][crate::Model].
    pub struct SymbolId;
}

/// A named configuration option, or an auto-created constant.
///
/// Properties are stored flattened: every condition has already been ANDed with the enclosing
/// `if`/`menu`/`depends on` conditions of the declaration site.
#[derive(Debug)]
pub struct Symbol {
    pub(crate) name: String,
    pub(crate) kind: Type,
    pub(crate) kind_loc: Option<Location>,

    /// Fixed value for constant symbols (quoted literals, numbers, and `y`/`m`/`n`).
    pub(crate) const_value: Option<SymbolValue>,

    pub(crate) prompts: Vec<SymbolPrompt>,
    pub(crate) defaults: Vec<SymbolDefault>,
    pub(crate) selects: Vec<SymbolTarget>,
    pub(crate) implies: Vec<SymbolTarget>,
    pub(crate) ranges: Vec<SymbolRange>,

    /// OR of `(source && cond)` for every `select` naming this symbol.
    pub(crate) rev_dep: Option<Expr>,

    /// OR of `(source && cond)` for every `imply` naming this symbol.
    pub(crate) weak_rev_dep: Option<Expr>,

    pub(crate) help: Option<String>,
    pub(crate) env_var: Option<String>,
    pub(crate) choice: Option<ChoiceId>,

    pub(crate) allnoconfig_y: bool,
    pub(crate) defconfig_list: bool,
    pub(crate) is_modules: bool,

    /// Declaration sites, in parse order.
    pub(crate) decls: Vec<Location>,

    pub(crate) user: Option<UserValue>,
    pub(crate) cache: RefCell<SymCache>,
}

/// A prompt attached to a symbol, with its flattened visibility condition.
#[derive(Clone, Debug)]
pub struct SymbolPrompt {
    /// The prompt text.
    pub text: String,

    /// The flattened visibility condition; `None` means always visible.
    pub cond: Option<Expr>,
}

/// A `default` clause attached to a symbol.
#[derive(Clone, Debug)]
pub struct SymbolDefault {
    /// The default value expression.
    pub value: Expr,

    /// The flattened condition; `None` means always applicable.
    pub cond: Option<Expr>,
}

/// A `select` or `imply` edge recorded on its source symbol.
#[derive(Clone, Debug)]
pub struct SymbolTarget {
    /// The selected or implied symbol.
    pub target: SymbolId,

    /// The flattened condition; `None` means unconditional.
    pub cond: Option<Expr>,
}

/// A `range` clause attached to a numeric symbol. Bounds are symbols: literal bounds are
/// interned as constants.
#[derive(Clone, Debug)]
pub struct SymbolRange {
    /// The lower bound.
    pub low: SymbolId,

    /// The upper bound.
    pub high: SymbolId,

    /// The flattened condition; `None` means always applicable.
    pub cond: Option<Expr>,
}

/// A user assignment held by a symbol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserValue {
    /// Assignment to a bool or tristate symbol.
    Tristate(Tristate),

    /// Assignment to a string, int, or hex symbol, stored as written.
    Text(String),
}

/// The computed current value of a symbol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SymbolValue {
    /// Value of a bool or tristate symbol.
    Tristate(Tristate),

    /// Value of a string symbol.
    String(String),

    /// Value of an int symbol.
    Int(i64),

    /// Value of a hex symbol.
    Hex(u64),
}

impl SymbolValue {
    /// The tristate value, if this is a bool or tristate symbol.
    pub fn tristate(&self) -> Option<Tristate> {
        match self {
            Self::Tristate(t) => Some(*t),
            _ => None,
        }
    }
}

impl Display for SymbolValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Tristate(t) => f.write_str(t.as_str()),
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Hex(h) => write!(f, "0x{h:x}"),
        }
    }
}

/// Per-symbol memoization, keyed by the model's epoch.
#[derive(Debug, Default)]
pub(crate) struct SymCache {
    pub(crate) epoch: u64,
    pub(crate) value: Option<SymbolValue>,
    pub(crate) visibility: Option<Tristate>,
    pub(crate) in_progress: bool,
    pub(crate) cycle_warned: bool,
}

impl Symbol {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Type::Unknown,
            kind_loc: None,
            const_value: None,
            prompts: Vec::new(),
            defaults: Vec::new(),
            selects: Vec::new(),
            implies: Vec::new(),
            ranges: Vec::new(),
            rev_dep: None,
            weak_rev_dep: None,
            help: None,
            env_var: None,
            choice: None,
            allnoconfig_y: false,
            defconfig_list: false,
            is_modules: false,
            decls: Vec::new(),
            user: None,
            cache: RefCell::new(SymCache::default()),
        }
    }

    pub(crate) fn new_const(name: impl Into<String>, value: SymbolValue) -> Self {
        let mut sym = Self::new(name);
        sym.const_value = Some(value);
        sym
    }

    /// The canonical name of the symbol.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type of the symbol.
    #[inline(always)]
    pub fn kind(&self) -> Type {
        self.kind
    }

    /// Whether this is an auto-created constant symbol.
    #[inline(always)]
    pub fn is_constant(&self) -> bool {
        self.const_value.is_some()
    }

    /// The first prompt text, if the symbol has one.
    pub fn prompt(&self) -> Option<&str> {
        self.prompts.first().map(|p| p.text.as_str())
    }

    /// All prompts attached to the symbol.
    pub fn prompts(&self) -> &[SymbolPrompt] {
        &self.prompts
    }

    /// The help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The `default` clauses declared on this symbol, in declaration order.
    pub fn defaults(&self) -> &[SymbolDefault] {
        &self.defaults
    }

    /// The `select` edges declared on this symbol.
    pub fn selects(&self) -> &[SymbolTarget] {
        &self.selects
    }

    /// The `imply` edges declared on this symbol.
    pub fn implies(&self) -> &[SymbolTarget] {
        &self.implies
    }

    /// The `range` clauses declared on this symbol.
    pub fn ranges(&self) -> &[SymbolRange] {
        &self.ranges
    }

    /// The choice this symbol belongs to, if any.
    #[inline(always)]
    pub fn choice(&self) -> Option<ChoiceId> {
        self.choice
    }

    /// The environment variable bound with `option env=`, if any.
    pub fn env_var(&self) -> Option<&str> {
        self.env_var.as_deref()
    }

    /// The current user assignment, if any.
    pub fn user_value(&self) -> Option<&UserValue> {
        self.user.as_ref()
    }

    /// Locations where this symbol was declared.
    pub fn declarations(&self) -> &[Location] {
        &self.decls
    }

    /// Whether `option allnoconfig_y` was declared on this symbol.
    #[inline(always)]
    pub fn is_allnoconfig_y(&self) -> bool {
        self.allnoconfig_y
    }
}
