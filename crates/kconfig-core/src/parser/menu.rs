use crate::parser::{Block, Expected, KConfigError, LocExpr, LocString, Located, PeekableTokenLines, Token};

/// A menu block in a Kconfig file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Menu {
    /// The prompt for the menu.
    pub prompt: LocString,

    /// The items in the menu.
    pub blocks: Vec<Block>,

    /// Dependencies for this menu from `depends on` statements.
    pub depends_on: Vec<LocExpr>,

    /// Visibility of the contained prompts from `visible if` statements. If empty, the menu
    /// contents are visible by default (equivalent to `y`).
    pub visible_if: Vec<LocExpr>,
}

impl Menu {
    /// Parse a menu block.
    pub fn parse(lines: &mut PeekableTokenLines) -> Result<Self, KConfigError> {
        let mut tokens = lines.next().unwrap();
        assert!(!tokens.is_empty());

        let (blk_cmd, prompt) = tokens.read_cmd_str_lit(true)?;
        assert_eq!(blk_cmd.token, Token::Menu);

        let mut last_loc = prompt.location();
        let mut blocks = Vec::new();
        let mut depends_on = Vec::new();
        let mut visible_if = Vec::new();

        loop {
            let Some(tokens) = lines.peek() else {
                return Err(KConfigError::unexpected_eof(Expected::EndMenu, last_loc));
            };

            let Some(cmd) = tokens.peek() else {
                panic!("Expected menu entry");
            };

            last_loc = cmd.location();

            match cmd.token {
                Token::EndMenu => {
                    _ = lines.next();
                    break;
                }

                Token::Depends => {
                    let mut tokens = lines.next().unwrap();
                    let depends = LocExpr::parse_depends_on(&mut tokens)?;
                    depends_on.push(depends);
                }

                Token::Visible => {
                    let mut tokens = lines.next().unwrap();
                    let vis = LocExpr::parse_visible_if(&mut tokens)?;
                    visible_if.push(vis);
                }

                _ => {
                    let Some(block) = Block::parse(lines)? else {
                        return Err(KConfigError::unexpected_eof(Expected::EndMenu, last_loc));
                    };

                    blocks.push(block);
                }
            }
        }

        Ok(Self {
            prompt,
            blocks,
            depends_on,
            visible_if,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::Menu,
        crate::parser::{parse_stream, Block, PeekableChars, PeekableTokenLinesExt},
        std::{collections::HashMap, path::Path},
    };

    #[test]
    fn nested_menu() {
        let context = HashMap::<String, String>::default();
        let input = r##"menu "Power management"
	depends on PM
	visible if !EMBEDDED

config SUSPEND
	bool "Suspend to RAM"

menu "Advanced"
config HIBERNATE
	bool "Hibernate"
endmenu

endmenu
"##;
        let tokens = parse_stream(PeekableChars::new(input, Path::new("test")), &context).unwrap();
        let mut lines = tokens.peek_lines();
        let menu = Menu::parse(&mut lines).unwrap();

        assert_eq!(menu.prompt.as_str(), "Power management");
        assert_eq!(menu.depends_on.len(), 1);
        assert_eq!(menu.visible_if.len(), 1);
        assert_eq!(menu.blocks.len(), 2);
        assert!(matches!(menu.blocks[1], Block::Menu(_)));
    }
}
