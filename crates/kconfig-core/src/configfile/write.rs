use {
    crate::{
        model::{ItemPayload, Model, SymbolId, SymbolValue},
        parser::Type,
        Tristate,
    },
    std::{collections::HashSet, io::Write},
};

impl Model {
    /// Write the current configuration as a `.config` stream, matching the reference tool's
    /// formatting: a four-line header, banner comments for visible menus and comments, and one
    /// line per writable symbol in item-tree order.
    pub fn write_config<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "#")?;
        writeln!(writer, "# Automatically generated file; DO NOT EDIT.")?;
        writeln!(writer, "# {}", self.mainmenu())?;
        writeln!(writer, "#")?;

        let mut written: HashSet<SymbolId> = HashSet::new();

        for (_, item) in self.iter_items() {
            match item.payload() {
                ItemPayload::Menu {
                    prompt,
                    dep,
                } => {
                    if self.cond_tristate(dep) != Tristate::No {
                        writeln!(writer, "\n#\n# {prompt}\n#")?;
                    }
                }

                ItemPayload::Comment {
                    prompt,
                    dep,
                } => {
                    if self.cond_tristate(dep) != Tristate::No {
                        writeln!(writer, "\n#\n# {prompt}\n#")?;
                    }
                }

                ItemPayload::Symbol {
                    symbol, ..
                } => {
                    if written.insert(*symbol) && self.should_write(*symbol) {
                        self.write_symbol(writer, *symbol)?;
                    }
                }

                ItemPayload::Choice { .. } | ItemPayload::Root => {}
            }
        }

        Ok(())
    }

    /// Write the current configuration as a C preprocessor header: `#define CONFIG_<NAME> …`
    /// for every enabled symbol, with the `_MODULE` suffix for `m` values.
    pub fn write_autoconf<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "/*")?;
        writeln!(writer, " * Automatically generated file; DO NOT EDIT.")?;
        writeln!(writer, " * {}", self.mainmenu())?;
        writeln!(writer, " */")?;

        let mut written: HashSet<SymbolId> = HashSet::new();

        for (_, item) in self.iter_items() {
            let ItemPayload::Symbol {
                symbol, ..
            } = item.payload()
            else {
                continue;
            };

            if !written.insert(*symbol) || !self.should_write(*symbol) {
                continue;
            }

            let name = self.sym(*symbol).name();
            match self.value(*symbol) {
                SymbolValue::Tristate(Tristate::No) => {}
                SymbolValue::Tristate(Tristate::Mod) => writeln!(writer, "#define CONFIG_{name}_MODULE 1")?,
                SymbolValue::Tristate(Tristate::Yes) => writeln!(writer, "#define CONFIG_{name} 1")?,
                SymbolValue::String(s) => writeln!(writer, "#define CONFIG_{name} \"{}\"", escape(&s))?,
                SymbolValue::Int(i) => writeln!(writer, "#define CONFIG_{name} {i}")?,
                SymbolValue::Hex(h) => writeln!(writer, "#define CONFIG_{name} 0x{h:x}")?,
            }
        }

        Ok(())
    }

    /// Whether a symbol appears in `.config` output: it must have a type and either a prompt or
    /// default applicable in the current state, or be forced on by a reverse dependency.
    fn should_write(&self, id: SymbolId) -> bool {
        let sym = self.sym(id);

        if sym.kind() == Type::Unknown || sym.is_constant() {
            return false;
        }

        if sym.prompts.iter().any(|p| self.cond_tristate(&p.cond) != Tristate::No) {
            return true;
        }

        if sym.defaults.iter().any(|d| self.cond_tristate(&d.cond) != Tristate::No) {
            return true;
        }

        if sym.rev_dep.as_ref().map(|e| self.expr_tristate(e)).unwrap_or(Tristate::No) != Tristate::No {
            return true;
        }

        // Implied symbols appear in the output whenever the imply is active.
        sym.weak_rev_dep.as_ref().map(|e| self.expr_tristate(e)).unwrap_or(Tristate::No) != Tristate::No
    }

    fn write_symbol<W: Write>(&self, writer: &mut W, id: SymbolId) -> std::io::Result<()> {
        let name = self.sym(id).name();

        match self.value(id) {
            SymbolValue::Tristate(Tristate::No) => writeln!(writer, "# CONFIG_{name} is not set"),
            SymbolValue::Tristate(Tristate::Mod) => writeln!(writer, "CONFIG_{name}=m"),
            SymbolValue::Tristate(Tristate::Yes) => writeln!(writer, "CONFIG_{name}=y"),
            SymbolValue::String(s) => writeln!(writer, "CONFIG_{name}=\"{}\"", escape(&s)),
            SymbolValue::Int(i) => writeln!(writer, "CONFIG_{name}={i}"),
            SymbolValue::Hex(h) => writeln!(writer, "CONFIG_{name}=0x{h:x}"),
        }
    }
}

/// Escape a string value for `.config` or auto-header output.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());

    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use {
        crate::Model,
        std::{collections::HashMap, path::Path},
    };

    fn load(input: &str) -> Model {
        let context = HashMap::<String, String>::default();
        Model::load_str(input, Path::new("/tmp"), &context).unwrap()
    }

    fn written(model: &Model) -> String {
        let mut out = Vec::new();
        model.write_config(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_and_banner_format() {
        let model = load(
            r##"mainmenu "Test Configuration"

config SWAP
	bool "swap"
	default y

menu "Networking"

config NET
	bool "networking"

endmenu
"##,
        );

        let text = written(&model);
        assert_eq!(
            text,
            "#\n\
             # Automatically generated file; DO NOT EDIT.\n\
             # Test Configuration\n\
             #\n\
             CONFIG_SWAP=y\n\
             \n\
             #\n\
             # Networking\n\
             #\n\
             # CONFIG_NET is not set\n"
        );
    }

    #[test]
    fn suppressed_branches_are_omitted() {
        let model = load(
            "config FOO\n\tbool \"foo\"\nif FOO\nconfig BAR\n\tbool \"bar\"\n\tdefault y\nendif\n",
        );

        // FOO defaults to n, so BAR's prompt and default are inapplicable.
        let text = written(&model);
        assert!(text.contains("# CONFIG_FOO is not set"));
        assert!(!text.contains("BAR"));
    }

    #[test]
    fn string_values_are_quoted_and_escaped(){
        let mut model = load("config NAME\n\tstring \"name\"\n\tdefault \"a\"\n");
        let id = model.symbol("NAME").unwrap();
        assert!(model.set_string_value(id, r#"quo"te\"#));

        let text = written(&model);
        assert!(text.contains(r#"CONFIG_NAME="quo\"te\\""#));
    }

    #[test]
    fn autoconf_output() {
        let mut model = load(
            "config MODULES\n\tbool \"modules\"\n\tdefault y\n\toption modules\n\
             config USB\n\ttristate \"usb\"\n\
             config HZ\n\tint \"hz\"\n\tdefault 250\n",
        );

        let usb = model.symbol("USB").unwrap();
        assert!(model.set_value(usb, crate::Tristate::Mod));

        let mut out = Vec::new();
        model.write_autoconf(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("/*\n * Automatically generated file; DO NOT EDIT.\n"));
        assert!(text.contains("#define CONFIG_MODULES 1\n"));
        assert!(text.contains("#define CONFIG_USB_MODULE 1\n"));
        assert!(text.contains("#define CONFIG_HZ 250\n"));
    }

    #[test]
    fn write_is_idempotent() {
        let model = load("config A\n\tbool \"a\"\n\tdefault y\nconfig B\n\ttristate \"b\"\n");
        assert_eq!(written(&model), written(&model));
    }
}
