use crate::parser::{
    Config, ConfigTarget, Expected, KConfigError, LocExpr, LocString, Located, PeekableTokenLines, Prompt, Token,
    TokenLine, Type,
};

/// Choice entry: a group of configs among which election rules apply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Choice {
    /// The optional name of the choice. Most choices are anonymous.
    pub name: Option<LocString>,

    /// The type of the choice (`bool` or `tristate`).
    pub r#type: Type,

    /// Optional prompt for the choice.
    pub prompt: Option<Prompt>,

    /// Optional help text for the choice.
    pub help: Option<LocString>,

    /// Member symbols of the choice, represented as [`Config`] entries.
    pub configs: Vec<Config>,

    /// Default members for the choice, in declaration order.
    pub defaults: Vec<ConfigTarget>,

    /// Dependencies for this choice from `depends on` statements.
    pub depends_on: Vec<LocExpr>,

    /// Whether the choice may be left with no member selected (`optional`).
    pub optional: bool,
}

impl Choice {
    /// Parse a choice block.
    pub fn parse(lines: &mut PeekableTokenLines) -> Result<Self, KConfigError> {
        let Some(mut tokens) = lines.next() else {
            panic!("Expected choice block");
        };

        let blk_cmd = tokens.next().unwrap();
        assert_eq!(blk_cmd.token, Token::Choice);

        let name = match tokens.next() {
            None => None,
            Some(t) => {
                let Some(name) = t.symbol_value() else {
                    return Err(KConfigError::unexpected(t, Expected::Symbol, t.location()));
                };

                if let Some(unexpected) = tokens.next() {
                    return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
                }

                Some(LocString::new(name, t.location()))
            }
        };

        let mut result = Self {
            name,
            r#type: Type::Bool,
            prompt: None,
            help: None,
            configs: Vec::new(),
            defaults: Vec::new(),
            depends_on: Vec::new(),
            optional: false,
        };

        let mut last_loc = blk_cmd.location();

        loop {
            let Some(tokens) = lines.peek() else {
                return Err(KConfigError::unexpected_eof(Expected::EndChoice, last_loc));
            };

            let Some(cmd) = tokens.peek() else {
                panic!("Expected choice entry");
            };

            last_loc = cmd.location();

            match &cmd.token {
                Token::EndChoice => {
                    _ = lines.next();
                    break;
                }

                Token::Config => {
                    let config = Config::parse(lines)?;
                    result.configs.push(config);
                }

                Token::Default => {
                    let mut tokens = lines.next().unwrap();
                    let default = ConfigTarget::parse_choice_default(&mut tokens)?;
                    result.defaults.push(default);
                }

                Token::Depends => {
                    let mut tokens = lines.next().unwrap();
                    let depends = LocExpr::parse_depends_on(&mut tokens)?;
                    result.depends_on.push(depends);
                }

                Token::Help => {
                    let mut tokens = lines.next().unwrap();
                    result.help = Some(tokens.read_help()?);
                }

                Token::Optional => {
                    let mut tokens = lines.next().unwrap();
                    _ = tokens.next();

                    if let Some(unexpected) = tokens.next() {
                        return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
                    }

                    result.optional = true;
                }

                // The choice's type line, with an optional prompt: `bool "Processor family"`.
                Token::Bool | Token::Tristate => {
                    let mut tokens = lines.next().unwrap();
                    let type_token = tokens.next().unwrap();
                    result.r#type = type_token.r#type().unwrap();

                    if !tokens.is_empty() {
                        result.prompt = Some(Prompt::parse(type_token.location(), &mut tokens)?);
                    }
                }

                Token::Prompt => {
                    let mut tokens = lines.next().unwrap();
                    let cmd = tokens.next().unwrap();
                    result.prompt = Some(Prompt::parse(cmd.location(), &mut tokens)?);
                }

                _ => {
                    return Err(KConfigError::syntax(format!("unexpected {cmd} in choice block"), cmd.location()))
                }
            }
        }

        Ok(result)
    }
}

impl ConfigTarget {
    /// Parse the remainder of a `default` line within a choice block, which names a member symbol.
    pub fn parse_choice_default(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let (cmd, target) = tokens.read_cmd_sym(false)?;
        assert_eq!(cmd.token, Token::Default);

        let condition = tokens.read_if_expr(true)?;

        Ok(Self {
            target,
            condition,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::Choice,
        crate::parser::{parse_stream, PeekableChars, PeekableTokenLinesExt, Type},
        std::{collections::HashMap, path::Path},
    };

    fn parse(input: &str) -> Choice {
        let context = HashMap::<String, String>::default();
        let tokens = parse_stream(PeekableChars::new(input, Path::new("test")), &context).unwrap();
        let mut lines = tokens.peek_lines();
        Choice::parse(&mut lines).unwrap()
    }

    #[test]
    fn anonymous_choice() {
        let choice = parse(
            r##"choice
	prompt "Compiler optimization level"
	default CC_OPTIMIZE_FOR_PERFORMANCE

config CC_OPTIMIZE_FOR_PERFORMANCE
	bool "Optimize for performance"

config CC_OPTIMIZE_FOR_SIZE
	bool "Optimize for size"

endchoice
"##,
        );

        assert!(choice.name.is_none());
        assert_eq!(choice.r#type, Type::Bool);
        assert_eq!(choice.configs.len(), 2);
        assert_eq!(choice.defaults.len(), 1);
        assert_eq!(choice.defaults[0].target, *"CC_OPTIMIZE_FOR_PERFORMANCE");
    }

    #[test]
    fn tristate_optional_choice() {
        let choice = parse("choice FIRMWARE\n\ttristate \"Firmware\"\n\toptional\n\nconfig FW_A\n\ttristate \"A\"\nendchoice\n");
        assert_eq!(choice.name.as_ref().unwrap().as_str(), "FIRMWARE");
        assert_eq!(choice.r#type, Type::Tristate);
        assert!(choice.optional);
    }
}
