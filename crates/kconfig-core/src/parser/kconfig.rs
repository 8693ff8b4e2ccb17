use {
    crate::{
        parser::{
            cache_path, parse_stream, Block, KConfigError, LocString, PeekableChars, PeekableTokenLinesExt,
        },
        Context,
    },
    std::{fs::File, io::Read, path::Path},
};

/// A parsed Kconfig hierarchy.
///
/// All `source` statements have been inlined and all `if`/`endif` blocks flattened into the
/// dependencies of the blocks they enclosed.
#[derive(Debug, Default)]
pub struct KConfig {
    /// The main menu title, if a `mainmenu` statement was present.
    pub mainmenu: Option<LocString>,

    /// The blocks found in the hierarchy, in declaration order.
    pub blocks: Vec<Block>,
}

impl KConfig {
    /// Read a full Kconfig tree starting with the given Kconfig file.
    ///
    /// This recursively reads any configuration files in `source` (or `osource`, `orsource`,
    /// `rsource`) statements. Non-relative source paths are resolved against `base_dir`.
    pub fn parse<F, C>(filename: F, base_dir: &Path, context: &C) -> Result<Self, KConfigError>
    where
        F: AsRef<Path>,
        C: Context,
    {
        let filename = cache_path(filename.as_ref());
        let mut stack = Vec::new();
        let blocks = resolve_file(filename, base_dir, context, &mut stack)?;
        Ok(Self::from_blocks(blocks))
    }

    /// Parse a Kconfig hierarchy from the given string input.
    ///
    /// `source` statements are resolved against `base_dir`.
    pub fn parse_str<C>(input: &str, base_dir: &Path, context: &C) -> Result<Self, KConfigError>
    where
        C: Context,
    {
        let chars = PeekableChars::new(input, Path::new("<input>"));
        let blocks = parse_blocks(chars, context)?;
        let mut stack = Vec::new();
        let blocks = resolve_blocks(blocks, base_dir, context, &mut stack)?;
        Ok(Self::from_blocks(blocks))
    }

    fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut mainmenu = None;
        let mut kept = Vec::with_capacity(blocks.len());

        for block in blocks {
            match block {
                Block::Mainmenu(title) => {
                    if mainmenu.is_none() {
                        mainmenu = Some(title);
                    }
                }
                other => kept.push(other),
            }
        }

        Self {
            mainmenu,
            blocks: kept,
        }
    }
}

/// Parse a single file and resolve its `source` statements and `if` blocks.
pub(crate) fn resolve_file<C>(
    filename: &'static Path,
    base_dir: &Path,
    context: &C,
    stack: &mut Vec<&'static Path>,
) -> Result<Vec<Block>, KConfigError>
where
    C: Context,
{
    let mut file = File::open(filename)?;
    let mut input = String::new();
    file.read_to_string(&mut input)?;
    drop(file);

    let chars = PeekableChars::new(&input, filename);
    let blocks = parse_blocks(chars, context)?;

    stack.push(filename);
    let result = resolve_blocks(blocks, base_dir, context, stack);
    stack.pop();

    result
}

/// Tokenize and parse the raw block list of a single file.
fn parse_blocks<C>(chars: PeekableChars, context: &C) -> Result<Vec<Block>, KConfigError>
where
    C: Context,
{
    let tokens = parse_stream(chars, context)?;
    let mut lines = tokens.peek_lines();
    let mut blocks = Vec::new();

    while let Some(block) = Block::parse(&mut lines)? {
        blocks.push(block);
    }

    Ok(blocks)
}

/// Inline `source` statements and flatten `if` blocks, preserving declaration order.
fn resolve_blocks<C>(
    blocks: Vec<Block>,
    base_dir: &Path,
    context: &C,
    stack: &mut Vec<&'static Path>,
) -> Result<Vec<Block>, KConfigError>
where
    C: Context,
{
    let mut result = Vec::with_capacity(blocks.len());

    for block in blocks {
        match block {
            Block::Source(source) => {
                result.extend(source.resolve(base_dir, context, stack)?);
            }
            Block::If(if_block) => {
                result.extend(resolve_blocks(if_block.flatten(), base_dir, context, stack)?);
            }
            Block::Menu(mut menu) => {
                menu.blocks = resolve_blocks(std::mem::take(&mut menu.blocks), base_dir, context, stack)?;
                result.push(Block::Menu(menu));
            }
            other => result.push(other),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use {
        super::KConfig,
        crate::parser::Block,
        std::{collections::HashMap, path::Path},
    };

    fn context() -> HashMap<String, String> {
        HashMap::default()
    }

    #[test]
    fn mainmenu_and_configs() {
        let kconfig = KConfig::parse_str(
            r##"mainmenu "Test Configuration"

config FOO
	bool "Foo"

config BAR
	tristate "Bar"
	depends on FOO
"##,
            Path::new("/tmp"),
            &context(),
        )
        .unwrap();

        assert_eq!(kconfig.mainmenu.unwrap().as_str(), "Test Configuration");
        assert_eq!(kconfig.blocks.len(), 2);
    }

    #[test]
    fn menuconfig() {
        let kconfig = KConfig::parse_str(
            r##"
menuconfig VIRTUALIZATION
	bool "Virtualization"
	default y
	help
	  Say Y here to get virtualization support.
"##,
            Path::new("/tmp"),
            &context(),
        )
        .unwrap();

        assert_eq!(kconfig.blocks.len(), 1);
        let Block::Config(c) = &kconfig.blocks[0] else {
            panic!("Expected config block");
        };

        assert!(c.is_menuconfig);
        assert_eq!(c.name, *"VIRTUALIZATION");
    }

    #[test]
    fn if_blocks_are_flattened() {
        let kconfig = KConfig::parse_str(
            "if ARCH_HAS_FOO\nconfig FOO\n\tbool \"foo\"\nendif\n",
            Path::new("/tmp"),
            &context(),
        )
        .unwrap();

        assert_eq!(kconfig.blocks.len(), 1);
        let Block::Config(c) = &kconfig.blocks[0] else {
            panic!("Expected config block");
        };
        assert_eq!(c.depends_on.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = KConfig::parse("/nonexistent/Kconfig", Path::new("/nonexistent"), &context());
        assert!(result.is_err());
    }
}
