use {
    crate::{
        model::{
            ChoiceCache, ChoiceGroup, ChoiceId, Expr, Item, ItemId, ItemPayload, Model, Symbol, SymbolDefault,
            SymbolId, SymbolPrompt, SymbolRange, SymbolTarget, SymbolValue,
        },
        parser::{
            Block, Choice, CommentBlock, Config, ConfigOption, KConfig, KConfigError, LitValue, LocExpr, Located,
            Menu, Type, Expr as ParseExpr,
        },
        Context, Tristate,
    },
    slotmap::SlotMap,
    std::{
        cell::{Cell, RefCell},
        collections::HashMap,
    },
};

impl Model {
    /// Build a model from a parsed and resolved Kconfig hierarchy.
    pub(crate) fn from_kconfig<C>(kconfig: KConfig, context: &C) -> Result<Self, KConfigError>
    where
        C: Context,
    {
        let mut symbols: SlotMap<SymbolId, Symbol> = SlotMap::with_key();
        let n = symbols.insert(Symbol::new_const("n", SymbolValue::Tristate(Tristate::No)));
        let m = symbols.insert(Symbol::new_const("m", SymbolValue::Tristate(Tristate::Mod)));
        let y = symbols.insert(Symbol::new_const("y", SymbolValue::Tristate(Tristate::Yes)));

        let mut items: SlotMap<ItemId, Item> = SlotMap::with_key();
        let root = items.insert(Item::new(None, ItemPayload::Root));

        let mut model = Self {
            symbols,
            by_name: HashMap::new(),
            consts: HashMap::new(),
            tri_consts: [n, m, y],
            choices: SlotMap::with_key(),
            items,
            root,
            mainmenu: kconfig.mainmenu.map(|s| s.into_string()),
            modules: None,
            defconfig: None,
            epoch: Cell::new(1),
            warnings: RefCell::new(Vec::new()),
        };

        for block in kconfig.blocks {
            model.add_block(block, root, &None, &None, context)?;
        }

        Ok(model)
    }

    fn add_block<C>(
        &mut self,
        block: Block,
        parent: ItemId,
        dep: &Option<Expr>,
        vis: &Option<Expr>,
        context: &C,
    ) -> Result<(), KConfigError>
    where
        C: Context,
    {
        match block {
            Block::Config(config) => {
                self.add_config(&config, parent, dep, vis, context, None)?;
                Ok(())
            }
            Block::Choice(choice) => self.add_choice(choice, parent, dep, vis, context),
            Block::Comment(comment) => self.add_comment(&comment, parent, dep),
            Block::Menu(menu) => self.add_menu(menu, parent, dep, vis, context),
            Block::Mainmenu(_) | Block::If(_) | Block::Source(_) => {
                unreachable!("mainmenu, if, and source blocks are resolved before model construction")
            }
        }
    }

    fn add_config<C>(
        &mut self,
        config: &Config,
        parent: ItemId,
        dep: &Option<Expr>,
        vis: &Option<Expr>,
        context: &C,
        choice: Option<ChoiceId>,
    ) -> Result<SymbolId, KConfigError>
    where
        C: Context,
    {
        let id = self.intern_symbol(config.name.as_str());
        self.symbols[id].decls.push(config.name.location());

        if config.r#type != Type::Unknown {
            let sym = &self.symbols[id];
            if sym.kind != Type::Unknown && sym.kind != config.r#type {
                let previous = sym.kind_loc.unwrap_or_else(|| config.name.location());
                return Err(KConfigError::conflicting_type(
                    config.name.as_str(),
                    previous,
                    config.type_loc.unwrap_or_else(|| config.name.location()),
                ));
            }

            if sym.kind == Type::Unknown {
                let sym = &mut self.symbols[id];
                sym.kind = config.r#type;
                sym.kind_loc = config.type_loc;
            }
        }

        let mut node_dep = dep.clone();
        for d in &config.depends_on {
            let lowered = self.lower(d)?;
            node_dep = Some(Expr::and_join(node_dep.take(), lowered));
        }

        if let Some(prompt) = &config.prompt {
            let cond = self.lower_opt(prompt.condition.as_ref())?;
            let cond = Expr::and_opt(Expr::and_opt(node_dep.clone(), vis.clone()), cond);
            self.symbols[id].prompts.push(SymbolPrompt {
                text: prompt.title.as_str().to_string(),
                cond,
            });
        }

        for d in &config.defaults {
            let value = self.lower(&d.value)?;
            let cond = Expr::and_opt(node_dep.clone(), self.lower_opt(d.condition.as_ref())?);
            self.symbols[id].defaults.push(SymbolDefault {
                value,
                cond,
            });
        }

        for t in &config.selects {
            let target = self.intern_symbol(t.target.as_str());
            let cond = Expr::and_opt(node_dep.clone(), self.lower_opt(t.condition.as_ref())?);
            self.symbols[id].selects.push(SymbolTarget {
                target,
                cond: cond.clone(),
            });

            let edge = match cond {
                None => Expr::Sym(id),
                Some(c) => Expr::And(Expr::Sym(id).into(), c.into()),
            };
            let rev_dep = self.symbols[target].rev_dep.take();
            self.symbols[target].rev_dep = Some(Expr::or_join(rev_dep, edge));
        }

        for t in &config.implies {
            let target = self.intern_symbol(t.target.as_str());
            let cond = Expr::and_opt(node_dep.clone(), self.lower_opt(t.condition.as_ref())?);
            self.symbols[id].implies.push(SymbolTarget {
                target,
                cond: cond.clone(),
            });

            let edge = match cond {
                None => Expr::Sym(id),
                Some(c) => Expr::And(Expr::Sym(id).into(), c.into()),
            };
            let weak = self.symbols[target].weak_rev_dep.take();
            self.symbols[target].weak_rev_dep = Some(Expr::or_join(weak, edge));
        }

        for r in &config.ranges {
            if !self.symbols[id].kind.is_numeric() && self.symbols[id].kind != Type::Unknown {
                self.add_warning(
                    format!("range is only valid for int and hex symbols: {}", config.name.as_str()),
                    Some(r.location),
                );
                continue;
            }

            let low = self.lit_symbol(&r.start);
            let high = self.lit_symbol(&r.end);
            let cond = Expr::and_opt(node_dep.clone(), self.lower_opt(r.condition.as_ref())?);
            self.symbols[id].ranges.push(SymbolRange {
                low,
                high,
                cond,
            });
        }

        for option in &config.options {
            match option {
                ConfigOption::AllNoConfigY => self.symbols[id].allnoconfig_y = true,

                ConfigOption::DefConfigList => {
                    if self.defconfig.is_none() {
                        self.defconfig = Some(id);
                        self.symbols[id].defconfig_list = true;
                    } else {
                        self.add_warning("trying to redefine defconfig symbol", Some(config.name.location()));
                    }
                }

                ConfigOption::Env(name) => {
                    self.symbols[id].env_var = Some(name.as_str().to_string());

                    let value = match context.var(name.as_str()) {
                        Ok(value) => value,
                        Err(std::env::VarError::NotPresent) => String::new(),
                        Err(std::env::VarError::NotUnicode(_)) => {
                            return Err(KConfigError::invalid_env(name.as_str(), name.location()))
                        }
                    };

                    let value = self.intern_str_const(&value);
                    self.symbols[id].defaults.insert(
                        0,
                        SymbolDefault {
                            value: Expr::Sym(value),
                            cond: None,
                        },
                    );
                }

                ConfigOption::Modules => {
                    if config.name.as_str() != "MODULES" {
                        self.add_warning(
                            format!("option modules on symbol {} (conventionally MODULES)", config.name.as_str()),
                            Some(config.name.location()),
                        );
                    }

                    if self.modules.is_none() {
                        self.modules = Some(id);
                        self.symbols[id].is_modules = true;
                    } else if self.modules != Some(id) {
                        self.add_warning("trying to redefine the modules symbol", Some(config.name.location()));
                    }
                }
            }
        }

        if let Some(help) = &config.help {
            if self.symbols[id].help.is_none() {
                self.symbols[id].help = Some(help.as_str().to_string());
            }
        }

        if let Some(cid) = choice {
            self.symbols[id].choice = Some(cid);
        }

        let item = self.items.insert(Item::new(
            Some(parent),
            ItemPayload::Symbol {
                symbol: id,
                is_menuconfig: config.is_menuconfig,
            },
        ));
        self.items[parent].children.push(item);

        Ok(id)
    }

    fn add_choice<C>(
        &mut self,
        choice: Choice,
        parent: ItemId,
        dep: &Option<Expr>,
        vis: &Option<Expr>,
        context: &C,
    ) -> Result<(), KConfigError>
    where
        C: Context,
    {
        let mut node_dep = dep.clone();
        for d in &choice.depends_on {
            let lowered = self.lower(d)?;
            node_dep = Some(Expr::and_join(node_dep.take(), lowered));
        }

        let (prompt, prompt_cond) = match &choice.prompt {
            Some(p) => (Some(p.title.as_str().to_string()), self.lower_opt(p.condition.as_ref())?),
            None => (None, None),
        };

        let group_vis = Expr::and_opt(Expr::and_opt(node_dep.clone(), vis.clone()), prompt_cond);

        let cid = self.choices.insert(ChoiceGroup {
            name: choice.name.as_ref().map(|n| n.as_str().to_string()),
            kind: choice.r#type,
            prompt,
            vis: group_vis,
            dep: node_dep.clone(),
            members: Vec::new(),
            defaults: Vec::new(),
            optional: choice.optional,
            help: choice.help.as_ref().map(|h| h.as_str().to_string()),
            user_mode: None,
            user_selection: None,
            cache: RefCell::new(ChoiceCache::default()),
        });

        let item = self.items.insert(Item::new(
            Some(parent),
            ItemPayload::Choice {
                choice: cid,
            },
        ));
        self.items[parent].children.push(item);

        for config in &choice.configs {
            let member = self.add_config(config, item, &node_dep, vis, context, Some(cid))?;
            self.choices[cid].members.push(member);
        }

        for d in &choice.defaults {
            let target = self.intern_symbol(d.target.as_str());
            if !self.choices[cid].members.contains(&target) {
                self.add_warning(
                    format!("choice default {} is not a member of the choice", d.target.as_str()),
                    Some(d.target.location()),
                );
                continue;
            }

            let cond = Expr::and_opt(node_dep.clone(), self.lower_opt(d.condition.as_ref())?);
            self.choices[cid].defaults.push((target, cond));
        }

        Ok(())
    }

    fn add_comment(&mut self, comment: &CommentBlock, parent: ItemId, dep: &Option<Expr>) -> Result<(), KConfigError> {
        let mut node_dep = dep.clone();
        for d in &comment.depends_on {
            let lowered = self.lower(d)?;
            node_dep = Some(Expr::and_join(node_dep.take(), lowered));
        }

        let item = self.items.insert(Item::new(
            Some(parent),
            ItemPayload::Comment {
                prompt: comment.prompt.as_str().to_string(),
                dep: node_dep,
            },
        ));
        self.items[parent].children.push(item);

        Ok(())
    }

    fn add_menu<C>(
        &mut self,
        menu: Menu,
        parent: ItemId,
        dep: &Option<Expr>,
        vis: &Option<Expr>,
        context: &C,
    ) -> Result<(), KConfigError>
    where
        C: Context,
    {
        let mut node_dep = dep.clone();
        for d in &menu.depends_on {
            let lowered = self.lower(d)?;
            node_dep = Some(Expr::and_join(node_dep.take(), lowered));
        }

        let mut node_vis = vis.clone();
        for v in &menu.visible_if {
            let lowered = self.lower(v)?;
            node_vis = Some(Expr::and_join(node_vis.take(), lowered));
        }

        let item = self.items.insert(Item::new(
            Some(parent),
            ItemPayload::Menu {
                prompt: menu.prompt.as_str().to_string(),
                dep: node_dep.clone(),
            },
        ));
        self.items[parent].children.push(item);

        for block in menu.blocks {
            self.add_block(block, item, &node_dep, &node_vis, context)?;
        }

        Ok(())
    }

    /// Intern a named symbol, creating it on first use.
    pub(crate) fn intern_symbol(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }

        let id = self.symbols.insert(Symbol::new(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Intern an expression atom: `y`/`m`/`n` become the tristate constants, anything else a
    /// named symbol.
    fn intern_atom(&mut self, name: &str) -> SymbolId {
        match name {
            "n" => self.tri_consts[0],
            "m" => self.tri_consts[1],
            "y" => self.tri_consts[2],
            _ => self.intern_symbol(name),
        }
    }

    /// Intern a string literal as a constant symbol.
    pub(crate) fn intern_str_const(&mut self, text: &str) -> SymbolId {
        let key = format!("s:{text}");
        if let Some(id) = self.consts.get(&key) {
            return *id;
        }

        let id = self.symbols.insert(Symbol::new_const(text, SymbolValue::String(text.to_string())));
        self.consts.insert(key, id);
        id
    }

    fn intern_int_const(&mut self, value: i64) -> SymbolId {
        let key = format!("i:{value}");
        if let Some(id) = self.consts.get(&key) {
            return *id;
        }

        let id = self.symbols.insert(Symbol::new_const(value.to_string(), SymbolValue::Int(value)));
        self.consts.insert(key, id);
        id
    }

    fn intern_hex_const(&mut self, value: u64) -> SymbolId {
        let key = format!("h:{value:x}");
        if let Some(id) = self.consts.get(&key) {
            return *id;
        }

        let id = self.symbols.insert(Symbol::new_const(format!("0x{value:x}"), SymbolValue::Hex(value)));
        self.consts.insert(key, id);
        id
    }

    /// Intern a literal range bound as a symbol.
    fn lit_symbol(&mut self, lit: &LitValue) -> SymbolId {
        match lit {
            LitValue::Int(i) => self.intern_int_const(*i),
            LitValue::Hex(h) => self.intern_hex_const(*h),
            LitValue::String(s) => self.intern_str_const(s),
            LitValue::Symbol(s) => self.intern_atom(s),
            LitValue::Tristate(t) => self.tri_const(*t),
        }
    }

    /// Lower a textual expression into the handle-based form, interning atoms.
    pub(crate) fn lower(&mut self, expr: &LocExpr) -> Result<Expr, KConfigError> {
        match &expr.expr {
            ParseExpr::Symbol(name) => Ok(Expr::Sym(self.intern_atom(name))),
            ParseExpr::Integer(i) => Ok(Expr::Sym(self.intern_int_const(*i))),
            ParseExpr::Hex(h) => Ok(Expr::Sym(self.intern_hex_const(*h))),
            ParseExpr::String(s) => Ok(Expr::Sym(self.intern_str_const(s))),
            ParseExpr::Not(inner) => Ok(Expr::Not(self.lower(inner)?.into())),
            ParseExpr::And(lhs, rhs) => Ok(Expr::And(self.lower(lhs)?.into(), self.lower(rhs)?.into())),
            ParseExpr::Or(lhs, rhs) => Ok(Expr::Or(self.lower(lhs)?.into(), self.lower(rhs)?.into())),
            ParseExpr::Cmp(op, lhs, rhs) => {
                let lhs = self.lower_cmp_atom(lhs)?;
                let rhs = self.lower_cmp_atom(rhs)?;
                Ok(Expr::Cmp(*op, lhs, rhs))
            }
        }
    }

    fn lower_opt(&mut self, expr: Option<&LocExpr>) -> Result<Option<Expr>, KConfigError> {
        expr.map(|e| self.lower(e)).transpose()
    }

    fn lower_cmp_atom(&mut self, expr: &LocExpr) -> Result<SymbolId, KConfigError> {
        match &expr.expr {
            ParseExpr::Symbol(name) => Ok(self.intern_atom(name)),
            ParseExpr::Integer(i) => Ok(self.intern_int_const(*i)),
            ParseExpr::Hex(h) => Ok(self.intern_hex_const(*h)),
            ParseExpr::String(s) => Ok(self.intern_str_const(s)),
            _ => Err(KConfigError::syntax("comparison operands must be symbols or literals", expr.location())),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            model::{Model, SymbolValue},
            parser::Type,
        },
        std::{collections::HashMap, path::Path},
    };

    fn load_with(input: &str, vars: &[(&str, &str)]) -> Model {
        let context: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Model::load_str(input, Path::new("/tmp"), &context).unwrap()
    }

    #[test]
    fn env_option_binds_at_parse_time() {
        let model = load_with(
            "config SRCARCH\n\tstring\n\toption env=\"SRCARCH\"\n",
            &[("SRCARCH", "x86")],
        );

        let srcarch = model.symbol("SRCARCH").unwrap();
        assert_eq!(model.value(srcarch), SymbolValue::String("x86".into()));
        assert_eq!(model.sym(srcarch).env_var(), Some("SRCARCH"));
    }

    #[test]
    fn unset_env_option_binds_empty() {
        let model = load_with("config SRCARCH\n\tstring\n\toption env=\"SRCARCH\"\n", &[]);

        let srcarch = model.symbol("SRCARCH").unwrap();
        assert_eq!(model.value(srcarch), SymbolValue::String(String::new()));
    }

    #[test]
    fn re_declaration_merges_properties() {
        let model = load_with(
            "config FOO\n\tbool \"foo\"\nconfig FOO\n\tbool\n\tdefault y\n",
            &[],
        );

        let foo = model.symbol("FOO").unwrap();
        assert_eq!(model.sym(foo).kind(), Type::Bool);
        assert_eq!(model.sym(foo).prompt(), Some("foo"));
        assert_eq!(model.value(foo).tristate(), Some(crate::Tristate::Yes));
    }

    #[test]
    fn conflicting_kind_across_blocks_is_rejected() {
        let context = HashMap::<String, String>::default();
        let result = Model::load_str(
            "config FOO\n\tbool \"foo\"\nconfig FOO\n\tint \"foo\"\n",
            Path::new("/tmp"),
            &context,
        );

        assert!(result.is_err());
    }

    #[test]
    fn defconfig_list_candidates() {
        let model = load_with(
            "config DEFCONFIG_LIST\n\tstring\n\toption defconfig_list\n\
             \tdefault \"/lib/modules/defconfig\"\n\tdefault \"arch/defconfig\"\n",
            &[],
        );

        assert_eq!(
            model.defconfig_candidates(),
            vec!["/lib/modules/defconfig".to_string(), "arch/defconfig".to_string()]
        );
    }

    #[test]
    fn modules_option_on_unconventional_name_warns() {
        let model = load_with("config MODS\n\tbool \"mods\"\n\toption modules\n", &[]);

        assert!(model.warnings().iter().any(|w| w.message.contains("MODS")));
        assert_eq!(model.modules_symbol(), model.symbol("MODS"));
    }

    #[test]
    fn selects_are_recorded_on_both_ends() {
        let model = load_with(
            "config A\n\tbool \"a\"\n\tselect B\nconfig B\n\tbool\n",
            &[],
        );

        let a = model.symbol("A").unwrap();
        let b = model.symbol("B").unwrap();

        assert_eq!(model.sym(a).selects().len(), 1);
        assert_eq!(model.sym(a).selects()[0].target, b);
        assert!(model.sym(b).rev_dep.is_some());
    }

    #[test]
    fn mainmenu_fallback() {
        let model = load_with("config A\n\tbool \"a\"\n", &[]);
        assert_eq!(model.mainmenu(), "Configuration");

        let model = load_with("mainmenu \"My Project\"\nconfig A\n\tbool \"a\"\n", &[]);
        assert_eq!(model.mainmenu(), "My Project");
    }
}
