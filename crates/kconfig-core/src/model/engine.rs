use {
    crate::{
        model::{ChoiceGroup, ChoiceId, Expr, Item, ItemId, ItemIter, Symbol, SymbolId},
        parser::{
            parse_line, KConfigError, KConfig, LocExpr, Location, PeekableChars, TokenLine,
        },
        Context, SystemContext, Tristate,
    },
    log::warn,
    slotmap::SlotMap,
    std::{
        cell::{Cell, Ref, RefCell},
        collections::HashMap,
        fmt::{Display, Formatter, Result as FmtResult},
        path::Path,
    },
};

/// A non-fatal condition accumulated while parsing or loading configuration.
#[derive(Clone, Debug)]
pub struct Warning {
    /// Human-readable description.
    pub message: String,

    /// Where the condition was detected, if known.
    pub location: Option<Location>,
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(loc) = &self.location {
            write!(f, "{loc}: {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// The in-memory model of a Kconfig tree: the symbol table, choice groups, and item tree,
/// together with the user-value state and the memoized evaluation caches.
#[derive(Debug)]
pub struct Model {
    pub(crate) symbols: SlotMap<SymbolId, Symbol>,
    pub(crate) by_name: HashMap<String, SymbolId>,
    pub(crate) consts: HashMap<String, SymbolId>,

    /// The `n`, `m`, and `y` constants, in that order.
    pub(crate) tri_consts: [SymbolId; 3],

    pub(crate) choices: SlotMap<ChoiceId, ChoiceGroup>,
    pub(crate) items: SlotMap<ItemId, Item>,
    pub(crate) root: ItemId,

    pub(crate) mainmenu: Option<String>,

    /// The symbol declared with `option modules`, if any.
    pub(crate) modules: Option<SymbolId>,

    /// The symbol declared with `option defconfig_list`, if any.
    pub(crate) defconfig: Option<SymbolId>,

    /// Bumped on every user-value or selection change; value caches are keyed by it.
    pub(crate) epoch: Cell<u64>,

    pub(crate) warnings: RefCell<Vec<Warning>>,
}

impl Model {
    /// Load a Kconfig tree rooted at the given file, reading variables from the process
    /// environment. `source` paths are resolved against the root file's directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, KConfigError> {
        Self::load_with(root, &SystemContext)
    }

    /// Load a Kconfig tree rooted at the given file, reading variables from `context`.
    pub fn load_with<C>(root: impl AsRef<Path>, context: &C) -> Result<Self, KConfigError>
    where
        C: Context,
    {
        let root = root.as_ref();
        let base_dir = root.parent().unwrap_or_else(|| Path::new("."));
        let kconfig = KConfig::parse(root, base_dir, context)?;
        Self::from_kconfig(kconfig, context)
    }

    /// Build a model from a Kconfig tree held in a string. `source` paths are resolved against
    /// `base_dir`.
    pub fn load_str<C>(input: &str, base_dir: &Path, context: &C) -> Result<Self, KConfigError>
    where
        C: Context,
    {
        let kconfig = KConfig::parse_str(input, base_dir, context)?;
        Self::from_kconfig(kconfig, context)
    }

    /// The `mainmenu` title, or a generic fallback when the tree does not declare one.
    pub fn mainmenu(&self) -> &str {
        self.mainmenu.as_deref().unwrap_or("Configuration")
    }

    /// Pre-order walk of the item tree in display order.
    pub fn iter_items(&self) -> ItemIter<'_> {
        ItemIter {
            model: self,
            stack: self.item(self.root).children.iter().rev().copied().collect(),
        }
    }

    /// Look up a symbol by name.
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// All named (non-constant) symbols, in no particular order.
    pub fn all_symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols.iter().filter(|(_, sym)| !sym.is_constant()).map(|(id, _)| id)
    }

    /// Access a symbol by handle.
    pub fn sym(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    /// Access a choice group by handle.
    pub fn choice(&self, id: ChoiceId) -> &ChoiceGroup {
        &self.choices[id]
    }

    /// All choice groups, in declaration order of their keys.
    pub fn all_choices(&self) -> impl Iterator<Item = ChoiceId> + '_ {
        self.choices.keys()
    }

    /// Access an item-tree node by handle.
    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id]
    }

    /// The symbol declared with `option modules`, if any.
    pub fn modules_symbol(&self) -> Option<SymbolId> {
        self.modules
    }

    /// The default-value strings of the `option defconfig_list` symbol, in declaration order.
    pub fn defconfig_candidates(&self) -> Vec<String> {
        let Some(id) = self.defconfig else {
            return Vec::new();
        };

        self.symbols[id]
            .defaults
            .iter()
            .filter_map(|d| match &d.value {
                Expr::Sym(s) => Some(self.symbols[*s].name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Warnings accumulated during parsing and `.config` loading.
    pub fn warnings(&self) -> Ref<'_, Vec<Warning>> {
        self.warnings.borrow()
    }

    /// Discard all user assignments, returning every symbol to its default.
    pub fn alldefconfig(&mut self) {
        let ids: Vec<SymbolId> = self.symbols.keys().collect();
        for id in ids {
            self.symbols[id].user = None;
        }

        let cids: Vec<ChoiceId> = self.choices.keys().collect();
        for cid in cids {
            let choice = &mut self.choices[cid];
            choice.user_mode = None;
            choice.user_selection = None;
        }

        self.bump_epoch();
    }

    /// Set every boolean-family symbol to `n`, except `allnoconfig_y` symbols which are forced
    /// to `y`. String and numeric symbols keep their defaults.
    pub fn allnoconfig(&mut self) {
        self.alldefconfig();

        let ids: Vec<SymbolId> = self.all_symbols().collect();
        for id in ids {
            let sym = &mut self.symbols[id];
            if !sym.kind.is_bool_like() {
                continue;
            }

            let value = if sym.allnoconfig_y { Tristate::Yes } else { Tristate::No };
            sym.user = Some(crate::model::UserValue::Tristate(value));
        }

        let cids: Vec<ChoiceId> = self.choices.keys().collect();
        for cid in cids {
            self.choices[cid].user_mode = Some(Tristate::No);
        }

        self.bump_epoch();
    }

    /// Evaluate an ad-hoc expression, e.g. `"NET && (USB || PCI)"`, in the current model state.
    ///
    /// Symbols that do not exist in the model evaluate as `n`.
    pub fn eval_expression(&self, text: &str) -> Result<Tristate, KConfigError> {
        let path = Path::new("<expression>");
        let mut chars = PeekableChars::new(text, path);
        let tokens = parse_line(&mut chars, &SystemContext)?;

        if tokens.is_empty() {
            return Err(KConfigError::missing(crate::parser::Expected::Expr, Location::new(path, 1, 1)));
        }

        let mut line = TokenLine::new(&tokens);
        let parsed = LocExpr::parse(Location::new(path, 1, 1), &mut line)?;
        Ok(self.eval_parsed(&parsed.expr))
    }

    /// Record a warning and mirror it through the `log` facade.
    pub(crate) fn add_warning(&self, message: impl Into<String>, location: Option<Location>) {
        let warning = Warning {
            message: message.into(),
            location,
        };

        warn!("{warning}");
        self.warnings.borrow_mut().push(warning);
    }

    /// Invalidate all memoized values.
    pub(crate) fn bump_epoch(&self) {
        self.epoch.set(self.epoch.get() + 1);
    }

    /// The `n`/`m`/`y` constant for the given tristate.
    pub(crate) fn tri_const(&self, t: Tristate) -> SymbolId {
        self.tri_consts[t as usize]
    }

    /// The computed string form of a symbol's current value; `value(id)` rendered the way
    /// `.config` and comparisons see it.
    pub fn string_value(&self, id: SymbolId) -> String {
        self.str_value(id)
    }
}
