use {
    crate::{
        model::{eval::parse_number, ChoiceId, Model, SymbolId, SymbolValue, UserValue},
        parser::Type,
        Tristate,
    },
    std::cmp::Ordering,
};

impl Model {
    /// The displayed value of a symbol in the current model state.
    ///
    /// Values are derived from the user assignment, visibility, defaults, reverse and weak
    /// reverse dependencies, ranges, and choice election, and memoized per epoch. A symbol
    /// whose value is already being computed reads as its off value for the duration of the
    /// recursive visit, which breaks `select`/`imply` cycles.
    pub fn value(&self, id: SymbolId) -> SymbolValue {
        let epoch = self.epoch.get();
        let sym = &self.symbols[id];

        if let Some(v) = &sym.const_value {
            return v.clone();
        }

        {
            let cache = sym.cache.borrow();
            if cache.epoch == epoch {
                if let Some(v) = &cache.value {
                    return v.clone();
                }

                if cache.in_progress {
                    let warned = cache.cycle_warned;
                    drop(cache);

                    if !warned {
                        sym.cache.borrow_mut().cycle_warned = true;
                        self.add_warning(
                            format!("recursive dependency detected involving {}", sym.name),
                            sym.decls.first().copied(),
                        );
                    }

                    return off_value(sym.kind);
                }
            }
        }

        {
            let mut cache = sym.cache.borrow_mut();
            if cache.epoch != epoch {
                cache.epoch = epoch;
                cache.value = None;
                cache.visibility = None;
            }
            cache.in_progress = true;
        }

        let value = self.compute_value(id);

        {
            let mut cache = sym.cache.borrow_mut();
            cache.in_progress = false;
            cache.value = Some(value.clone());
        }

        value
    }

    /// The visibility of a symbol: the maximum over all prompts of the prompt condition ANDed
    /// with the enclosing dependencies. A symbol with no prompt is not user-visible.
    pub fn visibility(&self, id: SymbolId) -> Tristate {
        let epoch = self.epoch.get();
        let sym = &self.symbols[id];

        if sym.const_value.is_some() {
            return Tristate::No;
        }

        {
            let cache = sym.cache.borrow();
            if cache.epoch == epoch {
                if let Some(vis) = cache.visibility {
                    return vis;
                }
            }
        }

        let mut vis = Tristate::No;
        for prompt in &sym.prompts {
            vis = vis.max(self.cond_tristate(&prompt.cond));
        }

        if vis == Tristate::Mod && (sym.kind == Type::Bool || !self.modules_enabled()) {
            vis = Tristate::Yes;
        }

        {
            let mut cache = sym.cache.borrow_mut();
            if cache.epoch != epoch {
                cache.epoch = epoch;
                cache.value = None;
            }
            cache.visibility = Some(vis);
        }

        vis
    }

    /// The set of tristates a user assignment may take for a bool or tristate symbol. Empty
    /// for other kinds and for symbols whose state is fully forced.
    pub fn assignable(&self, id: SymbolId) -> Vec<Tristate> {
        let sym = &self.symbols[id];

        if sym.const_value.is_some() || !sym.kind.is_bool_like() {
            return Vec::new();
        }

        if let Some(cid) = sym.choice {
            return match self.choice_mode(cid) {
                Tristate::No => Vec::new(),
                Tristate::Yes => {
                    // A member is set to y to elect it; losing the election leaves it at n.
                    if self.visibility(id) != Tristate::No {
                        vec![Tristate::No, Tristate::Yes]
                    } else {
                        Vec::new()
                    }
                }
                Tristate::Mod => {
                    if self.visibility(id) != Tristate::No {
                        vec![Tristate::No, Tristate::Mod]
                    } else {
                        Vec::new()
                    }
                }
            };
        }

        let vis = self.visibility(id);
        let mut rev = sym.rev_dep.as_ref().map(|e| self.expr_tristate(e)).unwrap_or(Tristate::No);
        if rev == Tristate::Mod && (sym.kind == Type::Bool || !self.modules_enabled()) {
            rev = Tristate::Yes;
        }

        let modules = self.modules_enabled();
        let kind = sym.kind;

        [Tristate::No, Tristate::Mod, Tristate::Yes]
            .into_iter()
            .filter(|t| *t != Tristate::Mod || (kind == Type::Tristate && modules))
            .filter(|t| *t >= rev && *t <= vis)
            .collect()
    }

    /// Assign a tristate value to a bool or tristate symbol.
    ///
    /// Returns whether the value was accepted. Assignments outside the assignable set are
    /// rejected silently, per Kconfig tradition. Assigning `y` to a choice member elects it
    /// within its choice.
    pub fn set_value(&mut self, id: SymbolId, value: Tristate) -> bool {
        let sym = &self.symbols[id];
        if sym.const_value.is_some() || !sym.kind.is_bool_like() {
            return false;
        }

        // `m` on a bool is accepted as `y`, matching .config read-back.
        let value = if value == Tristate::Mod && sym.kind == Type::Bool { Tristate::Yes } else { value };
        let choice = sym.choice;

        if !self.assignable(id).contains(&value) {
            return false;
        }

        if let Some(cid) = choice {
            match value {
                Tristate::Yes => {
                    let group = &mut self.choices[cid];
                    group.user_selection = Some(id);
                    group.user_mode = Some(Tristate::Yes);
                }
                Tristate::Mod => {
                    self.choices[cid].user_mode = Some(Tristate::Mod);
                }
                Tristate::No => {}
            }
        }

        self.symbols[id].user = Some(UserValue::Tristate(value));
        self.bump_epoch();
        true
    }

    /// Assign a text value to a string, int, or hex symbol.
    ///
    /// Returns whether the value was accepted: numeric values must parse in the symbol's base
    /// and lie within the first applicable range.
    pub fn set_string_value(&mut self, id: SymbolId, value: &str) -> bool {
        let sym = &self.symbols[id];
        if sym.const_value.is_some() {
            return false;
        }

        match sym.kind {
            Type::String => {}
            Type::Int | Type::Hex => {
                let Some(parsed) = parse_in_base(value, sym.kind.base()) else {
                    return false;
                };

                if let Some((lo, hi)) = self.applicable_range(id) {
                    if parsed < lo || parsed > hi {
                        return false;
                    }
                }
            }
            _ => return false,
        }

        self.symbols[id].user = Some(UserValue::Text(value.to_string()));
        self.bump_epoch();
        true
    }

    /// The current mode of a choice: `n` (all members off), `m` (members independently `n` or
    /// `m`; tristate choices only), or `y` (exactly one member elected).
    pub fn choice_mode(&self, cid: ChoiceId) -> Tristate {
        let epoch = self.epoch.get();
        let group = &self.choices[cid];

        {
            let mut cache = group.cache.borrow_mut();
            if cache.epoch == epoch {
                if let Some(mode) = cache.mode {
                    return mode;
                }

                if cache.mode_in_progress {
                    // The choice's own visibility references a member; read as off for the
                    // duration of the visit.
                    return Tristate::No;
                }
            } else {
                cache.epoch = epoch;
                cache.mode = None;
                cache.selection = None;
            }
            cache.mode_in_progress = true;
        }

        let vis = self.cond_tristate(&group.vis);

        let mut mode = group.user_mode.unwrap_or(Tristate::Yes);
        if !group.optional && mode == Tristate::No {
            // A non-optional choice cannot be vacated.
            mode = Tristate::Yes;
        }

        mode = mode.min(vis);

        if mode == Tristate::Mod && (group.kind == Type::Bool || !self.modules_enabled()) {
            mode = Tristate::Yes;
        }

        {
            let mut cache = group.cache.borrow_mut();
            cache.mode_in_progress = false;
            cache.mode = Some(mode);
        }

        mode
    }

    /// The elected member of a choice in mode `y`: the user-chosen member if visible, else the
    /// first default whose condition holds, else the first visible member.
    pub fn choice_selection(&self, cid: ChoiceId) -> Option<SymbolId> {
        if self.choice_mode(cid) != Tristate::Yes {
            return None;
        }

        let epoch = self.epoch.get();
        let group = &self.choices[cid];

        {
            let mut cache = group.cache.borrow_mut();
            if cache.epoch == epoch {
                if let Some(selection) = cache.selection {
                    return selection;
                }

                if cache.selection_in_progress {
                    return None;
                }
            } else {
                cache.epoch = epoch;
                cache.mode = None;
                cache.selection = None;
            }
            cache.selection_in_progress = true;
        }

        let mut selection = None;

        if let Some(chosen) = group.user_selection {
            if self.visibility(chosen) != Tristate::No {
                selection = Some(chosen);
            }
        }

        if selection.is_none() {
            for (target, cond) in &group.defaults {
                if self.cond_tristate(cond) != Tristate::No && self.visibility(*target) != Tristate::No {
                    selection = Some(*target);
                    break;
                }
            }
        }

        if selection.is_none() {
            selection = group.members.iter().copied().find(|m| self.visibility(*m) != Tristate::No);
        }

        {
            let mut cache = group.cache.borrow_mut();
            cache.selection_in_progress = false;
            cache.selection = Some(selection);
        }

        selection
    }

    /// Elect a member of a choice. Returns whether the selection was accepted.
    pub fn set_choice_selection(&mut self, cid: ChoiceId, member: SymbolId) -> bool {
        if !self.choices[cid].members.contains(&member) {
            return false;
        }

        if self.visibility(member) == Tristate::No {
            return false;
        }

        let group = &mut self.choices[cid];
        group.user_selection = Some(member);
        group.user_mode = Some(Tristate::Yes);
        self.bump_epoch();
        true
    }

    /// Whether module support is enabled: the `option modules` symbol evaluates above `n`.
    pub(crate) fn modules_enabled(&self) -> bool {
        let Some(id) = self.modules else {
            return false;
        };

        // The modules symbol may itself be under computation; read it as off rather than
        // tripping the cycle path.
        {
            let cache = self.symbols[id].cache.borrow();
            if cache.epoch == self.epoch.get() && cache.in_progress {
                return false;
            }
        }

        self.sym_tristate(id) != Tristate::No
    }

    fn compute_value(&self, id: SymbolId) -> SymbolValue {
        let kind = self.symbols[id].kind;

        match kind {
            Type::Bool | Type::Tristate | Type::Unknown => SymbolValue::Tristate(self.compute_tristate(id)),
            Type::String => SymbolValue::String(self.compute_text(id)),
            Type::Int => SymbolValue::Int(self.compute_numeric(id) as i64),
            Type::Hex => SymbolValue::Hex(self.compute_numeric(id) as u64),
        }
    }

    fn compute_tristate(&self, id: SymbolId) -> Tristate {
        let sym = &self.symbols[id];

        if let Some(cid) = sym.choice {
            return self.choice_member_value(cid, id);
        }

        let vis = self.visibility(id);
        let rev = sym.rev_dep.as_ref().map(|e| self.expr_tristate(e)).unwrap_or(Tristate::No);
        let weak = sym.weak_rev_dep.as_ref().map(|e| self.expr_tristate(e)).unwrap_or(Tristate::No);

        // An explicit `n`, from the user or from an applicable default, overrides `imply`.
        let mut explicit_off = matches!(sym.user, Some(UserValue::Tristate(Tristate::No)));

        let mut val = match (&sym.user, vis != Tristate::No) {
            (Some(UserValue::Tristate(user)), true) => (*user).min(vis),
            _ => {
                let mut from_defaults = Tristate::No;
                for default in &sym.defaults {
                    let cond = self.cond_tristate(&default.cond);
                    if cond != Tristate::No {
                        from_defaults = self.expr_tristate(&default.value).min(cond);
                        if from_defaults == Tristate::No {
                            explicit_off = true;
                        }
                        break;
                    }
                }
                from_defaults
            }
        };

        val = val.max(rev);

        if val == Tristate::No && !explicit_off && weak >= Tristate::Mod {
            val = weak;
        }

        self.promote(val, sym.kind)
    }

    fn choice_member_value(&self, cid: ChoiceId, id: SymbolId) -> Tristate {
        match self.choice_mode(cid) {
            Tristate::No => Tristate::No,
            Tristate::Yes => {
                if self.choice_selection(cid) == Some(id) {
                    Tristate::Yes
                } else {
                    Tristate::No
                }
            }
            Tristate::Mod => {
                let sym = &self.symbols[id];
                let vis = self.visibility(id);

                let val = match (&sym.user, vis != Tristate::No) {
                    (Some(UserValue::Tristate(user)), true) => (*user).min(vis),
                    _ => {
                        let mut from_defaults = Tristate::No;
                        for default in &sym.defaults {
                            let cond = self.cond_tristate(&default.cond);
                            if cond != Tristate::No {
                                from_defaults = self.expr_tristate(&default.value).min(cond);
                                break;
                            }
                        }
                        from_defaults
                    }
                };

                val.min(Tristate::Mod)
            }
        }
    }

    fn compute_text(&self, id: SymbolId) -> String {
        let sym = &self.symbols[id];
        let vis = self.visibility(id);

        if vis != Tristate::No {
            if let Some(UserValue::Text(user)) = &sym.user {
                return user.clone();
            }
        }

        self.default_text(id).unwrap_or_default()
    }

    fn compute_numeric(&self, id: SymbolId) -> i128 {
        let sym = &self.symbols[id];
        let base = sym.kind.base();
        let vis = self.visibility(id);

        let candidate = match (&sym.user, vis != Tristate::No) {
            (Some(UserValue::Text(user)), true) => Some(user.clone()),
            _ => self.default_text(id),
        };

        let parsed = candidate.as_deref().and_then(|s| parse_in_base(s, base));

        match (parsed, self.applicable_range(id)) {
            (Some(v), Some((lo, hi))) => clamp(v, lo, hi),
            (Some(v), None) => v,
            (None, Some((lo, hi))) => clamp(0, lo, hi),
            (None, None) => 0,
        }
    }

    /// The first applicable default's string value.
    fn default_text(&self, id: SymbolId) -> Option<String> {
        let sym = &self.symbols[id];

        for default in &sym.defaults {
            if self.cond_tristate(&default.cond) != Tristate::No {
                let text = match &default.value {
                    crate::model::Expr::Sym(s) => self.str_value(*s),
                    other => self.expr_tristate(other).as_str().to_string(),
                };
                return Some(text);
            }
        }

        None
    }

    /// The bounds of the first range clause whose condition holds.
    fn applicable_range(&self, id: SymbolId) -> Option<(i128, i128)> {
        let sym = &self.symbols[id];
        let base = sym.kind.base();

        for range in &sym.ranges {
            if self.cond_tristate(&range.cond) != Tristate::No {
                let lo = parse_in_base(&self.str_value(range.low), base).unwrap_or(0);
                let hi = parse_in_base(&self.str_value(range.high), base).unwrap_or(0);
                return Some((lo, hi));
            }
        }

        None
    }

    fn promote(&self, val: Tristate, kind: Type) -> Tristate {
        if val == Tristate::Mod && (kind == Type::Bool || !self.modules_enabled()) {
            Tristate::Yes
        } else {
            val
        }
    }
}

/// Clamp to the nearest violated bound.
fn clamp(v: i128, lo: i128, hi: i128) -> i128 {
    match (v.cmp(&lo), v.cmp(&hi)) {
        (Ordering::Less, _) => lo,
        (_, Ordering::Greater) => hi,
        _ => v,
    }
}

/// Parse a numeric string in the symbol's base. A `0x`/`0X` prefix always selects hex.
fn parse_in_base(s: &str, base: u32) -> Option<i128> {
    let s = s.trim();

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }

    if base == 16 {
        return i128::from_str_radix(s, 16).ok();
    }

    parse_number(s)
}

/// The value a symbol reads as while its own computation is in progress, or when it is
/// entirely undeclared.
fn off_value(kind: Type) -> SymbolValue {
    match kind {
        Type::Bool | Type::Tristate | Type::Unknown => SymbolValue::Tristate(Tristate::No),
        Type::String => SymbolValue::String(String::new()),
        Type::Int => SymbolValue::Int(0),
        Type::Hex => SymbolValue::Hex(0),
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            model::{Model, SymbolId, SymbolValue},
            Tristate::{Mod, No, Yes},
        },
        std::{collections::HashMap, path::Path},
    };

    fn load(input: &str) -> Model {
        let context = HashMap::<String, String>::default();
        Model::load_str(input, Path::new("/tmp"), &context).unwrap()
    }

    fn id(model: &Model, name: &str) -> SymbolId {
        model.symbol(name).unwrap_or_else(|| panic!("no symbol {name}"))
    }

    fn tri(model: &Model, name: &str) -> crate::Tristate {
        model.value(id(model, name)).tristate().unwrap()
    }

    #[test]
    fn depends_on_gates_visibility_and_value() {
        let mut model = load("config A\n\tbool \"A\"\nconfig B\n\tbool \"B\"\n\tdepends on A\n");

        let a = id(&model, "A");
        let b = id(&model, "B");

        assert!(model.set_value(a, Yes));
        assert!(model.set_value(b, Yes));
        assert_eq!(tri(&model, "B"), Yes);

        assert!(model.set_value(a, No));
        assert_eq!(model.visibility(b), No);
        assert_eq!(tri(&model, "B"), No);
    }

    #[test]
    fn select_forces_promptless_target() {
        let mut model = load("config A\n\tbool\nconfig B\n\tbool \"B\"\n\tselect A if B\n");

        assert_eq!(tri(&model, "A"), No);

        let b = id(&model, "B");
        assert!(model.set_value(b, Yes));
        assert_eq!(tri(&model, "A"), Yes);

        // The selected symbol is still invisible and cannot be assigned below the select.
        let a = id(&model, "A");
        assert_eq!(model.visibility(a), No);
        assert!(!model.set_value(a, No));
    }

    #[test]
    fn defaults_walk_in_order() {
        let model = load(
            "config GATE\n\tbool \"gate\"\n\
             config V\n\tint \"v\"\n\tdefault 1 if GATE\n\tdefault 2\n",
        );

        assert_eq!(model.value(id(&model, "V")), SymbolValue::Int(2));
    }

    #[test]
    fn tristate_without_modules_promotes_to_y() {
        let mut model = load("config T\n\ttristate \"t\"\n");
        let t = id(&model, "T");

        // No modules symbol: m is not assignable, and an m-valued expression reads as y.
        assert_eq!(model.assignable(t), vec![No, Yes]);
        assert!(!model.set_value(t, Mod));
        assert!(model.set_value(t, Yes));
        assert_eq!(tri(&model, "T"), Yes);
    }

    #[test]
    fn tristate_with_modules() {
        let mut model = load(
            "config MODULES\n\tbool \"modules\"\n\tdefault y\n\toption modules\n\
             config T\n\ttristate \"t\"\n",
        );

        let t = id(&model, "T");
        assert_eq!(model.assignable(t), vec![No, Mod, Yes]);
        assert!(model.set_value(t, Mod));
        assert_eq!(tri(&model, "T"), Mod);

        // Turning modules off folds the stored m up to y.
        let modules = id(&model, "MODULES");
        assert!(model.set_value(modules, No));
        assert_eq!(tri(&model, "T"), Yes);
    }

    #[test]
    fn choice_election_prefers_user_then_default_then_first() {
        let mut model = load(
            "choice\n\tprompt \"pick\"\n\tdefault Y2\n\
             config Y1\n\tbool \"y1\"\n\
             config Y2\n\tbool \"y2\"\n\
             config Y3\n\tbool \"y3\"\n\
             endchoice\n",
        );

        assert_eq!(tri(&model, "Y2"), Yes);
        assert_eq!(tri(&model, "Y1"), No);

        let y3 = id(&model, "Y3");
        assert!(model.set_value(y3, Yes));
        assert_eq!(tri(&model, "Y3"), Yes);
        assert_eq!(tri(&model, "Y2"), No);

        let cid = model.sym(y3).choice().unwrap();
        assert_eq!(model.choice_selection(cid), Some(y3));
        assert_eq!(model.choice_mode(cid), Yes);

        // Exactly one member is y.
        let members = model.choice(cid).members().to_vec();
        let on = members.iter().filter(|m| model.value(**m).tristate() == Some(Yes)).count();
        assert_eq!(on, 1);
    }

    #[test]
    fn range_clamps_loaded_values_and_rejects_api_values() {
        let mut model = load("config N\n\tint \"n\"\n\trange 1 10\n\tdefault 5\n");
        let n = id(&model, "N");

        assert_eq!(model.value(n), SymbolValue::Int(5));

        // Out-of-range values are rejected through the API...
        assert!(!model.set_string_value(n, "15"));
        assert_eq!(model.value(n), SymbolValue::Int(5));

        // ...but a .config carrying one is clamped to the violated bound.
        model.load_config(&b"CONFIG_N=15"[..], false).unwrap();
        assert_eq!(model.value(n), SymbolValue::Int(10));

        assert!(model.set_string_value(n, "7"));
        assert_eq!(model.value(n), SymbolValue::Int(7));
    }

    #[test]
    fn imply_is_overridden_by_explicit_no() {
        let mut model = load("config A\n\tbool \"A\"\nconfig B\n\tbool \"B\"\n\timply A\n");

        let a = id(&model, "A");
        let b = id(&model, "B");

        assert!(model.set_value(b, Yes));
        assert_eq!(tri(&model, "A"), Yes);

        assert!(model.set_value(a, No));
        assert_eq!(tri(&model, "A"), No);
        assert_eq!(tri(&model, "B"), Yes);
    }

    #[test]
    fn select_cycle_terminates_and_warns() {
        let model = load(
            "config A\n\tbool \"a\"\n\tselect B\nconfig B\n\tbool \"b\"\n\tselect A\n",
        );

        // A cycle through select must neither hang nor crash.
        let _ = tri(&model, "A");
        let _ = tri(&model, "B");
    }

    #[test]
    fn string_symbols_fall_back_to_defaults() {
        let mut model = load("config S\n\tstring \"s\"\n\tdefault \"hello\"\n");
        let s = id(&model, "S");

        assert_eq!(model.value(s), SymbolValue::String("hello".into()));
        assert!(model.set_string_value(s, "world"));
        assert_eq!(model.value(s), SymbolValue::String("world".into()));
    }

    #[test]
    fn hex_values_normalize() {
        let mut model = load("config H\n\thex \"h\"\n\tdefault 0x10\n");
        let h = id(&model, "H");

        assert_eq!(model.value(h), SymbolValue::Hex(0x10));
        assert!(model.set_string_value(h, "0xFF"));
        assert_eq!(model.value(h), SymbolValue::Hex(0xff));
        assert_eq!(model.string_value(h), "0xff");
    }

    #[test]
    fn value_is_at_least_rev_dep_for_all_symbols() {
        let mut model = load(
            "config MODULES\n\tbool \"modules\"\n\tdefault y\n\toption modules\n\
             config A\n\ttristate \"a\"\n\
             config B\n\ttristate \"b\"\n\tselect C if A\n\
             config C\n\ttristate\n",
        );

        let a = id(&model, "A");
        let b = id(&model, "B");
        assert!(model.set_value(a, Mod));
        assert!(model.set_value(b, Mod));

        for sym in model.all_symbols().collect::<Vec<_>>() {
            let value = model.value(sym);
            let Some(tri) = value.tristate() else {
                continue;
            };

            let rev = model
                .sym(sym)
                .rev_dep
                .as_ref()
                .map(|e| model.expr_tristate(e))
                .unwrap_or(No);

            assert!(tri >= rev, "{}: {tri} < {rev}", model.sym(sym).name());
        }
    }

    #[test]
    fn eval_expression_sees_current_state() {
        let mut model = load("config A\n\tbool \"a\"\nconfig B\n\tbool \"b\"\n");

        assert_eq!(model.eval_expression("A || B").unwrap(), No);

        let a = id(&model, "A");
        assert!(model.set_value(a, Yes));
        assert_eq!(model.eval_expression("A || B").unwrap(), Yes);
        assert_eq!(model.eval_expression("A && !B").unwrap(), Yes);
        assert_eq!(model.eval_expression("UNDECLARED").unwrap(), No);
    }
}
