use crate::parser::{Expected, KConfigError, LocExpr, LocString, Located, Location, TokenLine};

/// Prompt for a config or choice block along with an optional condition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Prompt {
    /// The prompt title.
    pub title: LocString,

    /// Optional expression that determines whether the prompt is shown.
    pub condition: Option<LocExpr>,
}

impl Prompt {
    /// Parse the remainder of a prompt statement (everything after the `prompt` keyword or a type
    /// keyword).
    pub fn parse(prev: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        let Some(title) = tokens.next() else {
            return Err(KConfigError::missing(Expected::StringLiteral, prev));
        };

        let Some(text) = title.string_literal_value() else {
            return Err(KConfigError::unexpected(title, Expected::StringLiteral, title.location()));
        };

        let title = LocString::new(text, title.location());
        let condition = tokens.read_if_expr(true)?;

        Ok(Prompt {
            title,
            condition,
        })
    }
}
