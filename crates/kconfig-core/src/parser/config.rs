use crate::parser::{
    Expected, KConfigError, LitValue, LocExpr, LocString, LocToken, Located, Location, PeekableTokenLines, Prompt,
    Token, TokenLine, Type,
};

/// Configuration entry for a single symbol declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The name of the symbol for this config block.
    pub name: LocString,

    /// The type of this config block.
    pub r#type: Type,

    /// The location of the type declaration, if any.
    pub type_loc: Option<Location>,

    /// The prompt for this config, if any. A config without a prompt is not user-visible.
    pub prompt: Option<Prompt>,

    /// Default values for the config, in declaration order.
    pub defaults: Vec<ConfigDefault>,

    /// Dependencies for this config from `depends on` statements.
    pub depends_on: Vec<LocExpr>,

    /// Other configs that are selected by this config.
    pub selects: Vec<ConfigTarget>,

    /// Other configs that are implied by this config.
    pub implies: Vec<ConfigTarget>,

    /// Ranges of acceptable values for this config, in declaration order.
    pub ranges: Vec<ConfigRange>,

    /// `option` flags attached to this config.
    pub options: Vec<ConfigOption>,

    /// Help text for this config.
    pub help: Option<LocString>,

    /// Whether this was declared with `menuconfig` rather than `config`.
    pub is_menuconfig: bool,
}

/// Possible default for a configuration entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigDefault {
    /// The value of the default.
    pub value: LocExpr,

    /// An optional condition for this default. If unspecified, this is equivalent to `y` (always true).
    pub condition: Option<LocExpr>,
}

/// The target of a `select` or `imply` statement along with an optional associated condition.
///
/// These statements are in one of the following forms:
/// * `select TARGET`
/// * `select TARGET if EXPR`
/// * `imply TARGET`
/// * `imply TARGET if EXPR`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigTarget {
    /// The target of this `select` or `imply` statement.
    pub target: LocString,

    /// An optional condition. If unspecified, this is equivalent to `y` (always true).
    pub condition: Option<LocExpr>,
}

/// Range for a numeric configuration entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigRange {
    /// The lower bound of the range.
    pub start: LitValue,

    /// The upper bound of the range.
    pub end: LitValue,

    /// An optional condition. If unspecified, this is equivalent to `y` (always true).
    pub condition: Option<LocExpr>,

    /// The location of the range statement.
    pub location: Location,
}

/// A flag attached to a config with the `option` statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigOption {
    /// `option allnoconfig_y`: force the symbol to `y` in all-no configurations.
    AllNoConfigY,

    /// `option defconfig_list`: the symbol's defaults name candidate defconfig files.
    DefConfigList,

    /// `option env="NAME"`: bind the symbol's default to an environment variable at parse time.
    Env(LocString),

    /// `option modules`: the symbol controls module support.
    Modules,
}

impl Config {
    /// Parse a `config` or `menuconfig` block.
    ///
    /// Parameters:
    /// * `lines`: The lines to parse. The first line must start with a [`Token::Config`] or
    ///   [`Token::MenuConfig`] token.
    pub fn parse(lines: &mut PeekableTokenLines) -> Result<Self, KConfigError> {
        let Some(mut tokens) = lines.next() else {
            panic!("Expected config block");
        };

        let (blk_cmd, name) = tokens.read_cmd_sym(true)?;

        assert!(
            matches!(blk_cmd.token, Token::Config | Token::MenuConfig),
            "Expected config or menuconfig: {blk_cmd:?}"
        );

        let is_menuconfig = blk_cmd.token == Token::MenuConfig;

        let mut result = Self {
            name,
            r#type: Type::Unknown,
            type_loc: None,
            prompt: None,
            defaults: Vec::new(),
            depends_on: Vec::new(),
            selects: Vec::new(),
            implies: Vec::new(),
            ranges: Vec::new(),
            options: Vec::new(),
            help: None,
            is_menuconfig,
        };

        loop {
            let Some(tokens) = lines.peek() else {
                break;
            };

            let Some(cmd) = tokens.peek() else {
                panic!("Expected config entry");
            };

            match &cmd.token {
                Token::Choice
                | Token::Comment
                | Token::Config
                | Token::EndChoice
                | Token::EndIf
                | Token::EndMenu
                | Token::If
                | Token::Mainmenu
                | Token::Menu
                | Token::MenuConfig
                | Token::ORSource
                | Token::OSource
                | Token::RSource
                | Token::Source
                | Token::Visible => {
                    // Next block; stop here.
                    break;
                }

                Token::Bool | Token::Hex | Token::Int | Token::String | Token::Tristate => {
                    let mut tokens = lines.next().unwrap();
                    let type_token = tokens.next().unwrap();

                    result.set_type(type_token)?;

                    if !tokens.is_empty() {
                        result.prompt = Some(Prompt::parse(type_token.location(), &mut tokens)?);
                    }
                }

                Token::DefBool | Token::DefHex | Token::DefInt | Token::DefString | Token::DefTristate => {
                    let mut tokens = lines.next().unwrap();
                    let type_token = tokens.next().unwrap();

                    result.set_type(type_token)?;

                    let default = ConfigDefault::parse_value(type_token.location(), &mut tokens)?;
                    result.defaults.push(default);
                }

                Token::Default => {
                    let mut tokens = lines.next().unwrap();
                    let default = ConfigDefault::parse(&mut tokens)?;
                    result.defaults.push(default);
                }

                Token::Depends => {
                    let mut tokens = lines.next().unwrap();
                    let depends = LocExpr::parse_depends_on(&mut tokens)?;
                    result.depends_on.push(depends);
                }

                Token::Prompt => {
                    let mut tokens = lines.next().unwrap();
                    let cmd = tokens.next().unwrap();
                    result.prompt = Some(Prompt::parse(cmd.location(), &mut tokens)?);
                }

                Token::Help => {
                    let mut tokens = lines.next().unwrap();
                    result.help = Some(tokens.read_help()?);
                }

                Token::Imply => {
                    let mut tokens = lines.next().unwrap();
                    let config_target = ConfigTarget::parse(&mut tokens)?;
                    result.implies.push(config_target);
                }

                Token::Select => {
                    let mut tokens = lines.next().unwrap();
                    let config_target = ConfigTarget::parse(&mut tokens)?;
                    result.selects.push(config_target);
                }

                Token::Range => {
                    let mut tokens = lines.next().unwrap();
                    let range = ConfigRange::parse(&mut tokens)?;
                    result.ranges.push(range);
                }

                Token::Option => {
                    let mut tokens = lines.next().unwrap();
                    let option = parse_option(&mut tokens)?;
                    result.options.push(option);
                }

                _ => return Err(KConfigError::syntax(format!("unexpected {cmd} in config block"), cmd.location())),
            }
        }

        Ok(result)
    }

    /// Record the type from a type or `def_<type>` token, rejecting conflicting re-declarations.
    fn set_type(&mut self, type_token: &LocToken) -> Result<(), KConfigError> {
        let new_type = type_token.r#type().unwrap();

        match self.type_loc {
            Some(previous) if self.r#type != new_type => {
                Err(KConfigError::conflicting_type(self.name.as_str(), previous, type_token.location()))
            }
            Some(_) => Ok(()),
            None => {
                self.r#type = new_type;
                self.type_loc = Some(type_token.location());
                Ok(())
            }
        }
    }
}

/// Parse the remainder of an `option` statement (after the `option` keyword).
pub(crate) fn parse_option(tokens: &mut TokenLine) -> Result<ConfigOption, KConfigError> {
    let Some(cmd) = tokens.next() else {
        panic!("Expected option command");
    };

    let Some(kw) = tokens.next() else {
        return Err(KConfigError::missing(Expected::OptionKeyword, cmd.location()));
    };

    let option = match &kw.token {
        Token::AllNoConfigY => ConfigOption::AllNoConfigY,
        Token::DefConfigList => ConfigOption::DefConfigList,
        Token::Modules => ConfigOption::Modules,
        Token::Env => {
            let Some(eq_token) = tokens.next() else {
                return Err(KConfigError::missing(Expected::Eq, kw.location()));
            };

            if eq_token.token != Token::Eq {
                return Err(KConfigError::unexpected(eq_token, Expected::Eq, eq_token.location()));
            }

            let Some(env_name) = tokens.next() else {
                return Err(KConfigError::missing(Expected::StringLiteral, eq_token.location()));
            };

            let Some(name) = env_name.string_literal_value() else {
                return Err(KConfigError::unexpected(env_name, Expected::StringLiteral, env_name.location()));
            };

            ConfigOption::Env(LocString::new(name, env_name.location()))
        }
        _ => return Err(KConfigError::unknown_option(kw, kw.location())),
    };

    if let Some(unexpected) = tokens.next() {
        return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
    }

    Ok(option)
}

impl ConfigDefault {
    /// Parse the remainder of a `default` statement within a config block (everything after the
    /// `default` keyword).
    pub fn parse(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let Some(default_cmd) = tokens.next() else {
            panic!("Expected default command");
        };

        Self::parse_value(default_cmd.location(), tokens)
    }

    /// Parse the value and optional condition of a `default` or `def_<type>` statement.
    pub fn parse_value(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let value = LocExpr::parse(prev, tokens)?;
        let condition = tokens.read_if_expr(true)?;

        Ok(Self {
            value,
            condition,
        })
    }
}

impl ConfigTarget {
    /// Parse the remainder of a `select` or `imply` statement (after the `select` or `imply`
    /// keyword).
    pub fn parse(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let (cmd, target) = tokens.read_cmd_sym(false)?;
        assert!(matches!(cmd.token, Token::Select | Token::Imply));

        let condition = tokens.read_if_expr(true)?;

        Ok(Self {
            target,
            condition,
        })
    }
}

impl ConfigRange {
    /// Parse the remainder of a `range` statement (after the `range` keyword).
    pub fn parse(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let Some(range_token) = tokens.next() else {
            panic!("Expected range command");
        };

        let location = range_token.location();

        let Some(start) = tokens.next() else {
            return Err(KConfigError::missing(Expected::LitValue, location));
        };

        let Some(start) = start.literal_value() else {
            return Err(KConfigError::unexpected(start, Expected::LitValue, start.location()));
        };

        let Some(end) = tokens.next() else {
            return Err(KConfigError::missing(Expected::LitValue, location));
        };

        let Some(end) = end.literal_value() else {
            return Err(KConfigError::unexpected(end, Expected::LitValue, end.location()));
        };

        let condition = tokens.read_if_expr(true)?;

        Ok(Self {
            start,
            end,
            condition,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{Config, ConfigOption},
        crate::parser::{parse_stream, PeekableChars, PeekableTokenLinesExt, Type},
        std::{collections::HashMap, path::Path},
    };

    fn parse(input: &str) -> Config {
        let context = HashMap::<String, String>::default();
        let tokens = parse_stream(PeekableChars::new(input, Path::new("test")), &context).unwrap();
        let mut lines = tokens.peek_lines();
        Config::parse(&mut lines).unwrap()
    }

    #[test]
    fn full_config_block() {
        let config = parse(
            r##"config SWAP
	bool "Support for paging of anonymous memory" if EXPERT
	default y
	depends on MMU && BLOCK
	select CRYPTO if SWAP_CRYPT
	imply ZSWAP
	help
	  This option allows pages to be paged out.
"##,
        );

        assert_eq!(config.name, *"SWAP");
        assert_eq!(config.r#type, Type::Bool);
        assert!(config.prompt.as_ref().unwrap().condition.is_some());
        assert_eq!(config.defaults.len(), 1);
        assert_eq!(config.depends_on.len(), 1);
        assert_eq!(config.selects.len(), 1);
        assert_eq!(config.implies.len(), 1);
        assert!(config.help.unwrap().as_str().starts_with("This option"));
    }

    #[test]
    fn def_bool_sets_type_and_default() {
        let config = parse("config ARCH_HAS_FOO\n\tdef_bool y\n");
        assert_eq!(config.r#type, Type::Bool);
        assert_eq!(config.defaults.len(), 1);
        assert!(config.prompt.is_none());
    }

    #[test]
    fn options() {
        let config = parse("config MODULES\n\tbool \"Enable module support\"\n\toption modules\n");
        assert_eq!(config.options, vec![ConfigOption::Modules]);

        let config = parse("config SRCARCH\n\tstring\n\toption env=\"SRCARCH\"\n");
        let ConfigOption::Env(name) = &config.options[0] else {
            panic!("expected env option");
        };
        assert_eq!(name.as_str(), "SRCARCH");
    }

    #[test]
    fn ranges() {
        let config = parse("config LOG_BUF_SHIFT\n\tint \"Kernel log buffer size\"\n\trange 12 25\n\tdefault 17\n");
        assert_eq!(config.ranges.len(), 1);
    }

    #[test]
    fn conflicting_type_rejected() {
        let context = HashMap::<String, String>::default();
        let input = "config FOO\n\tbool \"foo\"\n\ttristate \"foo\"\n";
        let tokens = parse_stream(PeekableChars::new(input, Path::new("test")), &context).unwrap();
        let mut lines = tokens.peek_lines();
        assert!(Config::parse(&mut lines).is_err());
    }
}
