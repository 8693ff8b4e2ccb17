//! String literal parsing.
//!
//! A string is enclosed by double or single quotes and can contain zero or more fragments
//! consisting of:
//! * Any raw unescaped codepoint except `\` and the closing quote.
//! * One of the escape sequences `\a`, `\b`, `\e`, `\f`, `\n`, `\r`, `\t`, `\v`, `\'`, `\"`, `\\`, `\/`.
//! * A hex escape sequence of the form `\x[0-9a-fA-F]+`.
//! * A unicode escape sequence of the form `\u{...}` or `\uXXXX`.
//! * A variable reference `$NAME`, `$(NAME)`, or `${NAME}`, expanded from the parse
//!   [`Context`][crate::Context] as the literal is scanned. Unset variables expand to empty.

use crate::{
    parser::{Expected, KConfigError, Located, PeekableChars},
    Context,
};

/// Read a string literal, expanding variable references through `context`.
pub fn parse_string_literal<C>(
    chars: &mut PeekableChars,
    end_token: char,
    context: &C,
) -> Result<String, KConfigError>
where
    C: Context,
{
    let start = chars.location();

    let Some(c) = chars.next() else {
        return Err(KConfigError::unexpected_eof(end_token, start));
    };

    if c != end_token {
        return Err(KConfigError::unexpected(c, end_token, start));
    }

    let mut interior = String::new();

    loop {
        let Some(c) = chars.next() else {
            return Err(KConfigError::unexpected_eof(end_token, start));
        };

        if c == end_token {
            break;
        } else if c == '\\' {
            parse_escape(chars, &mut interior)?;
        } else if c == '$' {
            parse_var_ref(chars, &mut interior, context)?;
        } else {
            interior.push(c);
        }
    }

    Ok(interior)
}

/// Expand a `$NAME`, `$(NAME)`, or `${NAME}` reference. The leading `$` has been consumed.
fn parse_var_ref<C>(chars: &mut PeekableChars, interior: &mut String, context: &C) -> Result<(), KConfigError>
where
    C: Context,
{
    let start = chars.location();
    let mut name = String::new();

    match chars.peek() {
        Some(open @ ('(' | '{')) => {
            let close = if open == '(' { ')' } else { '}' };
            _ = chars.next();

            loop {
                let Some(c) = chars.next() else {
                    return Err(KConfigError::unexpected_eof(close, start));
                };

                if c == close {
                    break;
                }

                name.push(c);
            }
        }
        Some(c) if c.is_alphanumeric() || c == '_' => loop {
            let Some(c) = chars.peek() else {
                break;
            };

            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                _ = chars.next();
            } else {
                break;
            }
        },
        _ => {
            // A lone '$' is not a reference.
            interior.push('$');
            return Ok(());
        }
    }

    match context.var(&name) {
        Ok(value) => interior.push_str(&value),
        Err(std::env::VarError::NotPresent) => {}
        Err(std::env::VarError::NotUnicode(_)) => {
            return Err(KConfigError::invalid_env(name, start));
        }
    }

    Ok(())
}

/// Parse a string escape sequence. The leading backslash has been consumed.
pub(crate) fn parse_escape(chars: &mut PeekableChars, interior: &mut String) -> Result<(), KConfigError> {
    let start = chars.location();

    let Some(c) = chars.next() else {
        return Err(KConfigError::unexpected_eof(Expected::Any, start));
    };

    match c {
        'a' => interior.push('\u{07}'), // alarm (BEL)
        'b' => interior.push('\u{08}'), // backspace (BS)
        'e' => interior.push('\u{1B}'), // escape (ESC)
        'f' => interior.push('\u{0C}'), // form feed (FF)
        'n' => interior.push('\n'),     // newline (LF)
        'r' => interior.push('\r'),     // carriage return (CR)
        't' => interior.push('\t'),     // horizontal tab (TAB)
        'v' => interior.push('\u{0B}'), // vertical tab (VT)
        '\\' => interior.push('\\'),    // backslash
        '\'' => interior.push('\''),    // single quote
        '/' => interior.push('/'),      // forward slash
        '"' => interior.push('"'),      // double quote
        '$' => interior.push('$'),      // suppressed expansion
        'x' => interior.push(parse_hex_escape(chars)?),
        'u' => interior.push(parse_unicode_escape(chars)?),
        c => return Err(KConfigError::unexpected(c, "abefnrtv\\/'\"$xu", start)),
    }
    Ok(())
}

/// Parse a hex escape sequence, continuing until a non-hex character is found.
fn parse_hex_escape(chars: &mut PeekableChars) -> Result<char, KConfigError> {
    let start = chars.location();
    let mut hex = String::new();

    loop {
        let Some(c) = chars.peek() else {
            break;
        };

        if !c.is_ascii_hexdigit() {
            break;
        }

        _ = chars.next();
        hex.push(c);
    }

    if hex.is_empty() {
        return Err(KConfigError::missing(Expected::HexDigit, start));
    }

    let value = u32::from_str_radix(&hex, 16).map_err(|_| KConfigError::invalid_integer(&hex, start))?;
    let Some(c) = char::from_u32(value) else {
        return Err(KConfigError::invalid_unicode(value, start));
    };

    Ok(c)
}

/// Parse a unicode escape sequence.
fn parse_unicode_escape(chars: &mut PeekableChars) -> Result<char, KConfigError> {
    let start = chars.location();
    let Some(c) = chars.next() else {
        return Err(KConfigError::unexpected_eof(Expected::UnicodeEscape, start));
    };

    let mut hex = String::new();

    if c == '{' {
        loop {
            let Some(c) = chars.next() else {
                return Err(KConfigError::unexpected_eof(Expected::UnicodeEscape, chars.location()));
            };

            if c == '}' {
                break;
            }

            if !c.is_ascii_hexdigit() {
                return Err(KConfigError::unexpected(c, Expected::HexDigit, chars.location()));
            }

            hex.push(c);
        }

        if hex.is_empty() {
            return Err(KConfigError::unexpected('}', Expected::HexDigit, chars.location()));
        }
    } else if c.is_ascii_hexdigit() {
        // Get three more hex digits
        hex.push(c);

        for _ in 0..3 {
            let current = chars.location();

            let Some(c) = chars.next() else {
                return Err(KConfigError::unexpected_eof(Expected::HexDigit, current));
            };

            if !c.is_ascii_hexdigit() {
                return Err(KConfigError::unexpected(c, Expected::HexDigit, current));
            }

            hex.push(c);
        }
    } else {
        return Err(KConfigError::unexpected(c, Expected::UnicodeEscape, start));
    }

    let value = u32::from_str_radix(&hex, 16).map_err(|_| KConfigError::invalid_integer(&hex, start))?;
    let Some(c) = char::from_u32(value) else {
        return Err(KConfigError::invalid_unicode(value, start));
    };

    Ok(c)
}

#[cfg(test)]
mod tests {
    use {
        super::parse_string_literal,
        crate::parser::PeekableChars,
        std::{collections::HashMap, path::Path},
    };

    fn scan(input: &str, vars: &[(&str, &str)]) -> String {
        let context: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let mut chars = PeekableChars::new(input, Path::new("test"));
        let quote = input.chars().next().unwrap();
        parse_string_literal(&mut chars, quote, &context).unwrap()
    }

    #[test]
    fn escapes() {
        assert_eq!(scan(r#""a\"b\\c""#, &[]), "a\"b\\c");
        assert_eq!(scan(r#"'it''"#, &[]), "it");
    }

    #[test]
    fn variable_expansion() {
        assert_eq!(scan(r#""$ARCH/boot""#, &[("ARCH", "x86")]), "x86/boot");
        assert_eq!(scan(r#""$(SRCARCH)/Kconfig""#, &[("SRCARCH", "arm")]), "arm/Kconfig");
        assert_eq!(scan(r#""${FOO}bar""#, &[("FOO", "a")]), "abar");
        assert_eq!(scan(r#""$MISSING""#, &[]), "");
        assert_eq!(scan(r#""100$""#, &[]), "100$");
    }
}
