use {
    crate::{
        model::{Model, UserValue},
        parser::{KConfigError, Location, Type},
        Tristate,
    },
    std::{
        io::{BufRead, BufReader, Read},
        path::Path,
    },
};

/// A single parsed `.config` line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigEntry {
    /// `CONFIG_<NAME>=<value>`.
    Assign(String, String),

    /// `# CONFIG_<NAME> is not set`.
    NotSet(String),

    /// A non-comment line that matches neither form.
    Malformed,
}

/// Parse one `.config` line. Returns `None` for blank lines and ordinary comments.
pub fn parse_config_line(line: &str) -> Option<ConfigEntry> {
    let line = line.trim_end();

    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix("# CONFIG_") {
        if let Some(name) = rest.strip_suffix(" is not set") {
            return Some(ConfigEntry::NotSet(name.to_string()));
        }

        return None;
    }

    if line.starts_with('#') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("CONFIG_") {
        if let Some((name, value)) = rest.split_once('=') {
            if !name.is_empty() {
                return Some(ConfigEntry::Assign(name.to_string(), value.to_string()));
            }
        }
    }

    Some(ConfigEntry::Malformed)
}

/// Read every assignment from a `.config` stream: `(name, Some(value))` for assignments,
/// `(name, None)` for `is not set` lines. Malformed lines are skipped.
pub fn read_config_entries<R: Read>(reader: R) -> std::io::Result<Vec<(String, Option<String>)>> {
    let mut entries = Vec::new();

    for line in BufReader::new(reader).lines() {
        match parse_config_line(&line?) {
            Some(ConfigEntry::Assign(name, value)) => entries.push((name, Some(value))),
            Some(ConfigEntry::NotSet(name)) => entries.push((name, None)),
            Some(ConfigEntry::Malformed) | None => {}
        }
    }

    Ok(entries)
}

/// Remove the surrounding double quotes and `\"`/`\\` escapes from a `.config` string value.
fn dequote(raw: &str) -> Option<String> {
    let interior = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(interior.len());
    let mut chars = interior.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next()?);
        } else if c == '"' {
            // An unescaped quote inside the value.
            return None;
        } else {
            out.push(c);
        }
    }

    Some(out)
}

impl Model {
    /// Load user values from a `.config`-formatted stream.
    ///
    /// With `replace` set, all existing user values and choice selections are discarded first;
    /// otherwise the stream's assignments are merged over the current state. Unknown names and
    /// malformed values are recorded as warnings and skipped.
    pub fn load_config<R: Read>(&mut self, reader: R, replace: bool) -> Result<(), KConfigError> {
        if replace {
            self.alldefconfig();
        }

        let label = Path::new(".config");

        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let location = Location::new(label, index + 1, 1);

            match parse_config_line(&line) {
                None => {}
                Some(ConfigEntry::Malformed) => {
                    self.add_warning(format!("unexpected data: {line}"), Some(location));
                }
                Some(ConfigEntry::NotSet(name)) => self.apply_entry(&name, None, location),
                Some(ConfigEntry::Assign(name, value)) => self.apply_entry(&name, Some(&value), location),
            }
        }

        self.bump_epoch();
        Ok(())
    }

    fn apply_entry(&mut self, name: &str, value: Option<&str>, location: Location) {
        let Some(id) = self.symbol(name) else {
            self.add_warning(format!("unknown symbol: CONFIG_{name}"), Some(location));
            return;
        };

        let kind = self.symbols[id].kind;

        let Some(raw) = value else {
            if kind.is_bool_like() {
                self.symbols[id].user = Some(UserValue::Tristate(Tristate::No));
            } else {
                self.add_warning(format!("CONFIG_{name} is not a bool or tristate symbol"), Some(location));
            }
            return;
        };

        match kind {
            Type::Bool | Type::Tristate => {
                let Some(mut tri) = Tristate::from_str_value(raw) else {
                    self.add_warning(format!("invalid value {raw:?} for CONFIG_{name}"), Some(location));
                    return;
                };

                if tri == Tristate::Mod && kind == Type::Bool {
                    tri = Tristate::Yes;
                }

                if let Some(cid) = self.symbols[id].choice {
                    match tri {
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

                self.symbols[id].user = Some(UserValue::Tristate(tri));
            }

            Type::String => {
                let Some(text) = dequote(raw) else {
                    self.add_warning(format!("invalid string value {raw} for CONFIG_{name}"), Some(location));
                    return;
                };

                self.symbols[id].user = Some(UserValue::Text(text));
            }

            Type::Int => {
                if raw.parse::<i64>().is_err() {
                    self.add_warning(format!("invalid integer value {raw:?} for CONFIG_{name}"), Some(location));
                    return;
                }

                self.symbols[id].user = Some(UserValue::Text(raw.to_string()));
            }

            Type::Hex => {
                let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
                if u64::from_str_radix(digits, 16).is_err() {
                    self.add_warning(format!("invalid hex value {raw:?} for CONFIG_{name}"), Some(location));
                    return;
                }

                self.symbols[id].user = Some(UserValue::Text(raw.to_string()));
            }

            Type::Unknown => {
                self.add_warning(format!("CONFIG_{name} has no declared type"), Some(location));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{dequote, parse_config_line, ConfigEntry};

    #[test]
    fn line_forms() {
        assert_eq!(
            parse_config_line("CONFIG_SWAP=y"),
            Some(ConfigEntry::Assign("SWAP".into(), "y".into()))
        );
        assert_eq!(parse_config_line("# CONFIG_SWAP is not set"), Some(ConfigEntry::NotSet("SWAP".into())));
        assert_eq!(parse_config_line("# just a comment"), None);
        assert_eq!(parse_config_line(""), None);
        assert_eq!(parse_config_line("bogus"), Some(ConfigEntry::Malformed));
    }

    #[test]
    fn string_dequoting() {
        assert_eq!(dequote(r#""hello""#), Some("hello".into()));
        assert_eq!(dequote(r#""a \"b\" \\ c""#), Some(r#"a "b" \ c"#.into()));
        assert_eq!(dequote("unquoted"), None);
    }
}
