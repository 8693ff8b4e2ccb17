use crate::parser::{Expected, KConfigError, Located, PeekableChars};

/// Skip a `#` comment.
///
/// The stream must be pointing at a '#' character. This and the rest of the line, up to but not
/// including the newline, will be consumed.
pub fn parse_comment(chars: &mut PeekableChars) -> Result<(), KConfigError> {
    let Some(c) = chars.next() else {
        return Err(KConfigError::unexpected_eof(Expected::Any, chars.location()));
    };

    if c != '#' {
        return Err(KConfigError::unexpected(c, '#', chars.location()));
    }

    loop {
        let Some(c) = chars.peek() else {
            break;
        };

        if c == '\n' {
            break;
        }

        _ = chars.next();
    }

    Ok(())
}
