use crate::parser::{
    Choice, Config, Expected, KConfigError, LocExpr, LocString, Located, Menu, PeekableTokenLines, Source, Token,
    TokenLine,
};

/// A block in a Kconfig file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Block {
    /// Choice of configuration entries.
    Choice(Choice),

    /// A comment shown to the user.
    Comment(CommentBlock),

    /// Configuration entry for a symbol (`config` or `menuconfig`).
    Config(Config),

    /// Conditional inclusion of entries.
    If(IfBlock),

    /// Main menu title.
    Mainmenu(LocString),

    /// Menu block containing other items visible to the user in a submenu.
    Menu(Menu),

    /// Source another Kconfig file.
    Source(Source),
}

/// A comment displayed in the menu and written to `.config` output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentBlock {
    /// The comment text.
    pub prompt: LocString,

    /// Dependencies for this comment from `depends on` statements.
    pub depends_on: Vec<LocExpr>,
}

/// A conditional inclusion block.
///
/// `if`/`endif` is flattened during source resolution: the condition is pushed onto the
/// dependencies of every enclosed block, and the block itself leaves no trace in the tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IfBlock {
    /// The condition for the block.
    pub condition: LocExpr,

    /// The items in the block.
    pub items: Vec<Block>,
}

impl Block {
    /// If this is a choice block, return a reference to it; otherwise, return `None`.
    #[inline(always)]
    pub fn as_choice(&self) -> Option<&Choice> {
        match self {
            Block::Choice(c) => Some(c),
            _ => None,
        }
    }

    /// If this is a config block, return a reference to it; otherwise, return `None`.
    #[inline(always)]
    pub fn as_config(&self) -> Option<&Config> {
        match self {
            Block::Config(c) => Some(c),
            _ => None,
        }
    }

    /// If this is a menu block, return a reference to it; otherwise, return `None`.
    #[inline(always)]
    pub fn as_menu(&self) -> Option<&Menu> {
        match self {
            Block::Menu(m) => Some(m),
            _ => None,
        }
    }

    /// If this is a source block, return a reference to it; otherwise, return `None`.
    #[inline(always)]
    pub fn as_source(&self) -> Option<&Source> {
        match self {
            Block::Source(s) => Some(s),
            _ => None,
        }
    }

    /// Parse the next block from the stream.
    pub fn parse(lines: &mut PeekableTokenLines) -> Result<Option<Block>, KConfigError> {
        let Some(tokens) = lines.peek() else {
            return Ok(None);
        };

        let Some(cmd) = tokens.peek() else {
            panic!("Expected block command");
        };

        match cmd.token {
            Token::Choice => {
                let choice = Choice::parse(lines)?;
                Ok(Some(Block::Choice(choice)))
            }

            Token::Comment => {
                let comment = CommentBlock::parse(lines)?;
                Ok(Some(Block::Comment(comment)))
            }

            Token::Config | Token::MenuConfig => {
                let config = Config::parse(lines)?;
                Ok(Some(Block::Config(config)))
            }

            Token::If => {
                let if_block = IfBlock::parse(lines)?;
                Ok(Some(Block::If(if_block)))
            }

            Token::Mainmenu => {
                let mut tokens = lines.next().unwrap();
                let main_menu = Self::parse_mainmenu(&mut tokens)?;
                Ok(Some(Block::Mainmenu(main_menu)))
            }

            Token::Menu => {
                let menu = Menu::parse(lines)?;
                Ok(Some(Block::Menu(menu)))
            }

            Token::Source | Token::OSource | Token::RSource | Token::ORSource => {
                let mut tokens = lines.next().unwrap();
                let source = Source::parse(&mut tokens)?;
                Ok(Some(Block::Source(source)))
            }

            _ => Err(KConfigError::syntax(format!("unexpected {cmd} at top level"), cmd.location())),
        }
    }

    fn parse_mainmenu(tokens: &mut TokenLine) -> Result<LocString, KConfigError> {
        let (cmd, title) = tokens.read_cmd_str_lit(true)?;
        assert_eq!(cmd.token, Token::Mainmenu);
        Ok(title)
    }

    /// Push a dependency condition onto this block, as part of flattening an enclosing `if`.
    pub(crate) fn push_dep(&mut self, condition: &LocExpr) {
        match self {
            Block::Choice(c) => c.depends_on.push(condition.clone()),
            Block::Comment(c) => c.depends_on.push(condition.clone()),
            Block::Config(c) => c.depends_on.push(condition.clone()),
            Block::If(i) => i.items.iter_mut().for_each(|b| b.push_dep(condition)),
            Block::Mainmenu(_) => {}
            Block::Menu(m) => m.depends_on.push(condition.clone()),
            Block::Source(s) => s.depends_on.push(condition.clone()),
        }
    }
}

impl CommentBlock {
    /// Parse a `comment` block and any trailing `depends on` lines.
    pub fn parse(lines: &mut PeekableTokenLines) -> Result<Self, KConfigError> {
        let mut tokens = lines.next().unwrap();
        let (cmd, prompt) = tokens.read_cmd_str_lit(true)?;
        assert_eq!(cmd.token, Token::Comment);

        let mut depends_on = Vec::new();

        while let Some(tokens) = lines.peek() {
            if !tokens.peek().is_some_and(|t| t.token == Token::Depends) {
                break;
            }

            let mut tokens = lines.next().unwrap();
            depends_on.push(LocExpr::parse_depends_on(&mut tokens)?);
        }

        Ok(Self {
            prompt,
            depends_on,
        })
    }
}

impl IfBlock {
    /// Parse a conditional inclusion block.
    pub fn parse(lines: &mut PeekableTokenLines) -> Result<Self, KConfigError> {
        let mut tokens = lines.next().unwrap();
        assert!(!tokens.is_empty());

        let if_token = tokens.next().unwrap();
        assert_eq!(if_token.token, Token::If);

        let condition = LocExpr::parse(if_token.location(), &mut tokens)?;

        if let Some(unexpected) = tokens.next() {
            return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
        }

        let mut items = Vec::new();
        let mut last_loc = condition.location();

        loop {
            let Some(tokens) = lines.peek() else {
                return Err(KConfigError::unexpected_eof(Expected::EndIf, last_loc));
            };

            let Some(cmd) = tokens.peek() else {
                panic!("Expected if entry");
            };

            last_loc = cmd.location();

            match cmd.token {
                Token::EndIf => {
                    lines.next();
                    break;
                }
                _ => {
                    let Some(block) = Block::parse(lines)? else {
                        return Err(KConfigError::unexpected_eof(Expected::EndIf, last_loc));
                    };

                    items.push(block);
                }
            }
        }

        Ok(Self {
            condition,
            items,
        })
    }

    /// Flatten this block: push the condition onto every enclosed block and return them in order.
    pub fn flatten(self) -> Vec<Block> {
        let mut items = Vec::with_capacity(self.items.len());

        for mut item in self.items {
            item.push_dep(&self.condition);

            match item {
                Block::If(inner) => items.extend(inner.flatten()),
                other => items.push(other),
            }
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use {
        super::Block,
        crate::parser::{parse_stream, PeekableChars, PeekableTokenLinesExt},
        std::{collections::HashMap, path::Path},
    };

    fn parse_blocks(input: &str) -> Vec<Block> {
        let context = HashMap::<String, String>::default();
        let tokens = parse_stream(PeekableChars::new(input, Path::new("test")), &context).unwrap();
        let mut lines = tokens.peek_lines();
        let mut blocks = Vec::new();

        while let Some(block) = Block::parse(&mut lines).unwrap() {
            blocks.push(block);
        }

        blocks
    }

    #[test]
    fn if_flattening_preserves_order() {
        let blocks = parse_blocks("if NET\nconfig A\n\tbool \"a\"\nif INET\nconfig B\n\tbool \"b\"\nendif\nconfig C\n\tbool \"c\"\nendif\n");
        assert_eq!(blocks.len(), 1);

        let Block::If(if_block) = blocks.into_iter().next().unwrap() else {
            panic!("expected if block");
        };

        let flat = if_block.flatten();
        let names: Vec<_> = flat.iter().map(|b| b.as_config().unwrap().name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);

        // A and C carry one pushed condition; B carries two.
        assert_eq!(flat[0].as_config().unwrap().depends_on.len(), 1);
        assert_eq!(flat[1].as_config().unwrap().depends_on.len(), 2);
    }

    #[test]
    fn comment_block() {
        let blocks = parse_blocks("comment \"Legacy options\"\n\tdepends on LEGACY\nconfig A\n\tbool \"a\"\n");
        assert_eq!(blocks.len(), 2);

        let Block::Comment(comment) = &blocks[0] else {
            panic!("expected comment block");
        };
        assert_eq!(comment.prompt.as_str(), "Legacy options");
        assert_eq!(comment.depends_on.len(), 1);
    }

    #[test]
    fn mainmenu() {
        let blocks = parse_blocks("mainmenu \"Linux Kernel Configuration\"\n");
        assert!(matches!(blocks[0], Block::Mainmenu(_)));
    }
}
