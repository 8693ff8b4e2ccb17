use {
    crate::{
        model::{Expr, SymbolId},
        parser::Type,
        Tristate,
    },
    slotmap::new_key_type,
    std::cell::RefCell,
};

new_key_type! {
    /// Handle to a [`ChoiceGroup`] in a [`Model`][crate::Model].
    pub struct ChoiceId;
}

/// A choice: a group of symbols among which election rules apply.
#[derive(Debug)]
pub struct ChoiceGroup {
    pub(crate) name: Option<String>,
    pub(crate) kind: Type,

    /// The prompt text and its flattened visibility condition.
    pub(crate) prompt: Option<String>,
    pub(crate) vis: Option<Expr>,

    /// The flattened dependency of the choice itself.
    pub(crate) dep: Option<Expr>,

    pub(crate) members: Vec<SymbolId>,

    /// `default` clauses naming members, in declaration order.
    pub(crate) defaults: Vec<(SymbolId, Option<Expr>)>,

    pub(crate) optional: bool,
    pub(crate) help: Option<String>,

    pub(crate) user_mode: Option<Tristate>,
    pub(crate) user_selection: Option<SymbolId>,

    pub(crate) cache: RefCell<ChoiceCache>,
}

/// Per-choice memoization, keyed by the model's epoch.
#[derive(Debug, Default)]
pub(crate) struct ChoiceCache {
    pub(crate) epoch: u64,
    pub(crate) mode: Option<Tristate>,
    pub(crate) selection: Option<Option<SymbolId>>,
    pub(crate) mode_in_progress: bool,
    pub(crate) selection_in_progress: bool,
}

impl ChoiceGroup {
    /// The name of the choice, if it was declared with one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The type of the choice (`bool` or `tristate`).
    #[inline(always)]
    pub fn kind(&self) -> Type {
        self.kind
    }

    /// The prompt text, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// The member symbols, in declaration order.
    pub fn members(&self) -> &[SymbolId] {
        &self.members
    }

    /// Whether the choice may be left with no member selected.
    #[inline(always)]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}
