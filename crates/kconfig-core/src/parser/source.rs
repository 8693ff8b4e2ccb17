use {
    crate::{
        context::context_closure,
        parser::{cache_path, resolve_file, Block, KConfigError, LocExpr, LocString, Located, Token, TokenLine},
        Context,
    },
    log::{debug, trace},
    shellexpand::env_with_context,
    std::{
        env::VarError,
        io::ErrorKind as IoErrorKind,
        path::{Path, PathBuf},
    },
};

/// A `source` statement: inline another Kconfig file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Source {
    /// The filename to read, before variable expansion.
    pub filename: LocString,

    /// Whether the source statement is optional (`osource` or `orsource`).
    pub optional: bool,

    /// Whether the filename is relative to the current Kconfig file (`orsource` or `rsource`).
    pub relative: bool,

    /// Dependencies pushed onto this statement by enclosing `if` blocks; applied to every
    /// block the sourced file yields.
    pub depends_on: Vec<LocExpr>,
}

impl Source {
    /// Parse a source line.
    pub fn parse(tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let (cmd, filename) = tokens.read_cmd_str_lit(true)?;

        let optional = cmd.is_optional_source();
        let relative = cmd.is_relative_source();
        assert!(matches!(cmd.token, Token::Source | Token::OSource | Token::RSource | Token::ORSource));

        Ok(Source {
            filename,
            optional,
            relative,
            depends_on: Vec::new(),
        })
    }

    /// Read the sourced file and return its resolved blocks, with this statement's dependencies
    /// applied.
    ///
    /// `stack` carries the chain of files currently being read, for inclusion-cycle detection.
    pub(crate) fn resolve<C>(
        &self,
        base_dir: &Path,
        context: &C,
        stack: &mut Vec<&'static Path>,
    ) -> Result<Vec<Block>, KConfigError>
    where
        C: Context,
    {
        // Expand any $VAR references in the filename.
        let s_filename = match env_with_context(self.filename.as_str(), context_closure(context)) {
            Ok(s) => s,
            Err(e) => {
                return Err(match e.cause {
                    VarError::NotPresent => KConfigError::unknown_env(e.var_name, self.filename.location()),
                    VarError::NotUnicode(_) => KConfigError::invalid_env(e.var_name, self.filename.location()),
                })
            }
        };

        let dir: PathBuf = if self.relative {
            self.filename.location().filename.parent().unwrap_or_else(|| Path::new("/")).to_path_buf()
        } else {
            base_dir.to_path_buf()
        };

        let s_filename = cache_path(&dir.join(s_filename.as_ref()));

        if stack.contains(&s_filename) {
            return Err(KConfigError::source_cycle(s_filename.display(), self.filename.location()));
        }

        trace!("Reading source file {s_filename:?}");
        let mut blocks = match resolve_file(s_filename, base_dir, context, stack) {
            Ok(blocks) => blocks,
            Err(e) => {
                let is_not_found =
                    matches!(&e.kind, crate::parser::KConfigErrorKind::Io(io) if io.kind() == IoErrorKind::NotFound);

                if !is_not_found || !self.optional {
                    return Err(e);
                }

                debug!("Ignoring NotFound error for optional source file: {s_filename:?}");
                Vec::new()
            }
        };

        for condition in &self.depends_on {
            for block in &mut blocks {
                block.push_dep(condition);
            }
        }

        Ok(blocks)
    }
}
