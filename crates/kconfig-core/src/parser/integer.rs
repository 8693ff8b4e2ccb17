use crate::parser::{Expected, KConfigError, Located, PeekableChars, Token};

/// Parse a decimal, hex (`0x`), or octal (leading zero) integer literal.
pub fn parse_int_hex_literal(chars: &mut PeekableChars) -> Result<Token, KConfigError> {
    let start = chars.location();

    let Some(c) = chars.peek() else {
        return Err(KConfigError::unexpected_eof(Expected::Any, start));
    };

    if c == '+' || c == '-' {
        parse_dec_literal(chars)
    } else if chars.starts_with("0x") || chars.starts_with("0X") {
        parse_hex_literal(chars)
    } else if chars.starts_with('0') {
        parse_oct_literal(chars)
    } else if !c.is_ascii_digit() {
        Err(KConfigError::unexpected(c, Expected::IntegerLiteral, start))
    } else {
        parse_dec_literal(chars)
    }
}

fn parse_dec_literal(chars: &mut PeekableChars) -> Result<Token, KConfigError> {
    let mut literal = String::new();
    let start = chars.location();

    let Some(c) = chars.peek() else {
        return Err(KConfigError::unexpected_eof(Expected::IntegerLiteral, start));
    };

    if c == '+' || c == '-' {
        literal.push(c);
        _ = chars.next();
    }

    loop {
        let Some(c) = chars.peek() else {
            break;
        };

        if c.is_ascii_digit() {
            literal.push(c);
            _ = chars.next();
        } else {
            break;
        }
    }

    #[allow(clippy::from_str_radix_10)]
    let value = i64::from_str_radix(&literal, 10).map_err(|_| KConfigError::invalid_integer(literal, start))?;

    Ok(Token::IntLit(value))
}

fn parse_hex_literal(chars: &mut PeekableChars) -> Result<Token, KConfigError> {
    let mut literal = String::new();
    let start = chars.location();

    let Some(c) = chars.next() else {
        return Err(KConfigError::unexpected_eof(Expected::IntegerLiteral, start));
    };
    if c != '0' {
        return Err(KConfigError::unexpected(c, Expected::IntegerLiteral, start));
    }

    let Some(radix_char) = chars.next() else {
        return Err(KConfigError::unexpected_eof(Expected::IntegerLiteral, start));
    };
    if radix_char != 'x' && radix_char != 'X' {
        return Err(KConfigError::unexpected(radix_char, Expected::IntegerLiteral, start));
    }

    loop {
        let Some(c) = chars.peek() else {
            break;
        };

        if c.is_ascii_hexdigit() {
            literal.push(c);
            _ = chars.next();
        } else {
            break;
        }
    }

    if literal.is_empty() {
        return Err(KConfigError::invalid_integer(format!("0{radix_char}"), start));
    }

    let value = u64::from_str_radix(&literal, 16)
        .map_err(|_| KConfigError::invalid_integer(format!("0{radix_char}{literal}"), start))?;

    Ok(Token::HexLit(value))
}

fn parse_oct_literal(chars: &mut PeekableChars) -> Result<Token, KConfigError> {
    let mut literal = String::new();
    let start = chars.location();

    let Some(c) = chars.peek() else {
        return Err(KConfigError::unexpected_eof(Expected::IntegerLiteral, start));
    };
    if c != '0' {
        return Err(KConfigError::unexpected(c, Expected::IntegerLiteral, start));
    }

    loop {
        let Some(c) = chars.peek() else {
            break;
        };

        if ('0'..='7').contains(&c) {
            literal.push(c);
            _ = chars.next();
        } else {
            break;
        }
    }

    if literal.is_empty() || literal == "0" {
        Ok(Token::IntLit(0))
    } else {
        let value =
            i64::from_str_radix(&literal, 8).map_err(|_| KConfigError::invalid_integer(format!("{literal}"), start))?;
        Ok(Token::IntLit(value))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::parse_int_hex_literal,
        crate::parser::{PeekableChars, Token},
        std::path::Path,
    };

    fn scan(input: &str) -> Token {
        let mut chars = PeekableChars::new(input, Path::new("test"));
        parse_int_hex_literal(&mut chars).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(scan("42"), Token::IntLit(42));
        assert_eq!(scan("-7"), Token::IntLit(-7));
        assert_eq!(scan("0x1F"), Token::HexLit(0x1f));
        assert_eq!(scan("0755"), Token::IntLit(0o755));
        assert_eq!(scan("0"), Token::IntLit(0));
    }
}
