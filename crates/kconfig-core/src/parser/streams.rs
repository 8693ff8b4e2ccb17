use {
    crate::{
        parser::{
            comment::parse_comment, integer::parse_int_hex_literal, string_literal::parse_string_literal,
            token::parse_keyword_or_symbol, whitespace::parse_hws0, Expected, KConfigError, LocExpr, LocString,
            LocToken, Located, Location, Token,
        },
        Context,
    },
    std::{iter::FusedIterator, ops::Deref, path::Path},
};

/// An iterator over a string slice from a file that returns characters and can peek at the next character.
///
/// This is more powerful than `Peekable<Chars>`:
/// * It can return the remainder of the string.
/// * It can peek at more than the next character.
/// * [`&str`][str] methods such as [`starts_with()`][str::starts_with()] can be used via [`Deref`][Deref].
/// * It can return the location of the current position.
#[derive(Clone, Debug)]
pub struct PeekableChars<'buf> {
    base: &'buf str,
    offset: usize,
    location: Location,
}

impl<'buf> PeekableChars<'buf> {
    /// Create a new PeekableChars from a string slice and filename.
    pub fn new(base: &'buf str, filename: &Path) -> Self {
        Self {
            base,
            offset: 0,
            location: Location::new(filename, 1, 1),
        }
    }

    /// Returns the underlying string.
    #[inline(always)]
    pub fn base_str(&self) -> &'buf str {
        self.base
    }

    /// Returns the current offset in the string.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the remaining length, in bytes, of the string.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.base.len() - self.offset
    }

    /// Returns true if there are no more bytes to read.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.base.len()
    }

    /// Peek at the next character in the string.
    #[inline(always)]
    pub fn peek(&self) -> Option<char> {
        self.base[self.offset..].chars().next()
    }

    /// Peek at the nth character in the string.
    #[inline(always)]
    pub fn peek_at(&self, n: usize) -> Option<char> {
        self.base[self.offset..].chars().nth(n)
    }

    /// Advances the offset by the given number of bytes, which must land on a char boundary.
    pub fn advance(&mut self, n: usize) {
        let target = self.offset + n;
        assert!(target <= self.base.len(), "{n} advances past the end of the string");

        while self.offset < target {
            let Some(c) = self.peek() else {
                break;
            };

            self.offset += c.len_utf8();
            if c == '\n' {
                self.location.line += 1;
                self.location.column = 1;
            } else {
                self.location.column += 1;
            }
        }

        assert_eq!(self.offset, target, "{n} does not land on a char boundary");
    }

    /// Read characters until the given predicate returns true or the end of the string is reached.
    pub fn read_until(&mut self, predicate: impl CharPredicate) -> &'buf str {
        let start = self.offset;

        loop {
            let Some(c) = self.peek() else {
                break;
            };

            if predicate.matches(c) {
                break;
            }

            self.offset += c.len_utf8();
            if c == '\n' {
                self.location.line += 1;
                self.location.column = 1;
            } else {
                self.location.column += 1;
            }
        }

        &self.base[start..self.offset]
    }
}

impl Located for PeekableChars<'_> {
    fn location(&self) -> Location {
        self.location
    }
}

impl<'buf> Deref for PeekableChars<'buf> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.base[self.offset..]
    }
}

impl<'buf> Iterator for PeekableChars<'buf> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        match self.peek() {
            Some(c) => {
                self.offset += c.len_utf8();
                match c {
                    '\n' => {
                        self.location.line += 1;
                        self.location.column = 1;
                    }
                    _ => {
                        self.location.column += 1;
                    }
                }
                Some(c)
            }
            None => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let max = self.base.len() - self.offset;
        let min = (max + 3) / 4;
        (min, Some(max))
    }
}

impl<'buf> FusedIterator for PeekableChars<'buf> {}

/// A trait for predicates that match characters.
pub trait CharPredicate {
    /// Returns true if the character matches the predicate.
    fn matches(&self, c: char) -> bool;
}

impl<F> CharPredicate for F
where
    F: Fn(char) -> bool,
{
    fn matches(&self, c: char) -> bool {
        self(c)
    }
}

impl CharPredicate for char {
    fn matches(&self, c: char) -> bool {
        *self == c
    }
}

/// An iterator over lines of tokens that can peek ahead at the next line without consuming it.
pub struct PeekableTokenLines<'buf> {
    base: &'buf [Vec<LocToken>],
    offset: usize,
}

impl<'buf> PeekableTokenLines<'buf> {
    /// Peek at the next line.
    #[inline(always)]
    pub fn peek(&self) -> Option<TokenLine<'buf>> {
        if self.offset < self.base.len() {
            Some(TokenLine {
                base: &self.base[self.offset],
                offset: 0,
            })
        } else {
            None
        }
    }

    /// Advances the offset by the given number of lines.
    #[inline(always)]
    pub fn advance(&mut self, n: usize) {
        self.offset += n;
        if self.offset > self.base.len() {
            self.offset = self.base.len();
        }
    }
}

impl<'buf> Iterator for PeekableTokenLines<'buf> {
    type Item = TokenLine<'buf>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.peek() {
            Some(line) => {
                self.offset += 1;
                Some(line)
            }
            None => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.base.len() - self.offset;
        (n, Some(n))
    }
}

impl<'buf> FusedIterator for PeekableTokenLines<'buf> {}

/// An extension trait for `&[Vec<LocToken>]` that provides `peek_lines()`.
pub trait PeekableTokenLinesExt {
    /// Return a [`PeekableTokenLines`] iterator over the slice.
    fn peek_lines(&self) -> PeekableTokenLines;
}

impl PeekableTokenLinesExt for [Vec<LocToken>] {
    fn peek_lines(&self) -> PeekableTokenLines {
        PeekableTokenLines {
            base: self,
            offset: 0,
        }
    }
}

/// An iterator over a single line of tokens that can peek ahead at the next token without consuming it.
#[derive(Debug)]
pub struct TokenLine<'buf> {
    base: &'buf [LocToken],
    offset: usize,
}

impl<'buf> TokenLine<'buf> {
    /// Create a new `TokenLine` from the given slice of tokens.
    pub fn new(base: &'buf [LocToken]) -> Self {
        Self {
            base,
            offset: 0,
        }
    }

    /// Returns the underlying line of tokens as a slice.
    #[inline(always)]
    pub fn line(&self) -> &'buf [LocToken] {
        self.base
    }

    /// Returns the remaining number of tokens to read in the line.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.base.len() - self.offset
    }

    /// Returns true if there are no more tokens to read.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.base.len()
    }

    /// Peek at the next token in the line.
    #[inline(always)]
    pub fn peek(&self) -> Option<&'buf LocToken> {
        if self.offset < self.base.len() {
            Some(&self.base[self.offset])
        } else {
            None
        }
    }

    /// Read a command followed by a symbol from the line.
    pub fn read_cmd_sym(&mut self, require_eol: bool) -> Result<(&'buf LocToken, LocString), KConfigError> {
        let Some(cmd) = self.next() else {
            panic!("Expected keyword");
        };

        let Some(name) = self.next() else {
            return Err(KConfigError::missing(Expected::Symbol, cmd.location()));
        };

        let Some(name_str) = name.symbol_value() else {
            return Err(KConfigError::unexpected(name, Expected::Symbol, name.location()));
        };

        if require_eol {
            if let Some(unexpected) = self.next() {
                return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
            }
        }

        Ok((cmd, LocString::new(name_str, name.location())))
    }

    /// Read a command followed by a string literal from the line.
    pub fn read_cmd_str_lit(&mut self, require_eol: bool) -> Result<(&'buf LocToken, LocString), KConfigError> {
        let Some(cmd) = self.next() else {
            panic!("Expected keyword");
        };

        let Some(str_lit) = self.next() else {
            return Err(KConfigError::missing(Expected::StringLiteral, cmd.location()));
        };

        let Some(text) = str_lit.string_literal_value() else {
            return Err(KConfigError::unexpected(str_lit, Expected::StringLiteral, str_lit.location()));
        };

        if require_eol {
            if let Some(unexpected) = self.next() {
                return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
            }
        }

        Ok((cmd, LocString::new(text, str_lit.location())))
    }

    /// Read an `if <expr>` trailer, if present.
    pub fn read_if_expr(&mut self, require_eol: bool) -> Result<Option<LocExpr>, KConfigError> {
        let Some(if_token) = self.next() else {
            return Ok(None);
        };

        if if_token.token != Token::If {
            return Err(KConfigError::unexpected(if_token, Expected::IfOrEol, if_token.location()));
        }

        let expr = LocExpr::parse(if_token.location(), self)?;

        if require_eol {
            if let Some(unexpected) = self.next() {
                return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
            }
        }

        Ok(Some(expr))
    }

    /// Read the help text from a `help` block.
    ///
    /// This is tokenized as [`Token::Help`] followed by a [`Token::StrLit`] holding the body.
    pub fn read_help(&mut self) -> Result<LocString, KConfigError> {
        let Some(cmd) = self.next() else {
            panic!("Expected help keyword");
        };

        if cmd.token != Token::Help {
            return Err(KConfigError::unexpected(cmd, Expected::Help, cmd.location()));
        }

        let Some(text) = self.next() else {
            return Err(KConfigError::missing(Expected::StringLiteral, cmd.location()));
        };

        let Some(body) = text.string_literal_value() else {
            return Err(KConfigError::unexpected(text, Expected::StringLiteral, text.location()));
        };

        if let Some(unexpected) = self.peek() {
            return Err(KConfigError::unexpected(unexpected, Expected::Eol, unexpected.location()));
        };

        Ok(LocString::new(body, text.location()))
    }
}

impl<'buf> Iterator for TokenLine<'buf> {
    type Item = &'buf LocToken;

    fn next(&mut self) -> Option<Self::Item> {
        match self.peek() {
            Some(c) => {
                self.offset += 1;
                Some(c)
            }
            None => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.base.len() - self.offset;
        (n, Some(n))
    }
}

impl<'buf> FusedIterator for TokenLine<'buf> {}

/// Parse the input stream into lines of tokens, expanding string variables through `context`.
pub fn parse_stream<C>(mut chars: PeekableChars, context: &C) -> Result<Vec<Vec<LocToken>>, KConfigError>
where
    C: Context,
{
    let mut lines = vec![];

    loop {
        let line = parse_line(&mut chars, context)?;
        if line.is_empty() {
            break;
        }

        lines.push(line);
    }

    Ok(lines)
}

/// Parse the next non-empty logical line from the stream.
///
/// This returns an empty vector if EOF is reached without parsing any tokens.
pub fn parse_line<C>(chars: &mut PeekableChars, context: &C) -> Result<Vec<LocToken>, KConfigError>
where
    C: Context,
{
    'outer: loop {
        let mut tokens = vec![];

        loop {
            let Some(c) = chars.peek() else {
                // EOF reached. Return what we have.
                return Ok(tokens);
            };

            match c {
                '#' => {
                    parse_comment(chars)?;
                }

                '\n' => {
                    _ = chars.next();

                    if tokens.is_empty() {
                        // This line is empty; continue parsing from the next line.
                        continue 'outer;
                    } else if tokens.len() == 1 && tokens[0].token == Token::Help {
                        // This is a help block. Collect the body and return it as a string literal.
                        let start = chars.location();
                        tokens.push(LocToken::new(Token::StrLit(read_help_block(chars)?), start));
                        return Ok(tokens);
                    } else {
                        // This line is not empty; return what we have.
                        return Ok(tokens);
                    }
                }

                '"' | '\'' => {
                    let start = chars.location();
                    let s = parse_string_literal(chars, c, context)?;
                    tokens.push(LocToken::new(Token::StrLit(s), start));
                }

                '-' if chars.starts_with("---") => {
                    // "---help---"
                    let token = parse_keyword_or_symbol(chars)?;
                    tokens.push(token);
                }

                '+' | '-' => {
                    let start = chars.location();
                    let value = parse_int_hex_literal(chars)?;
                    tokens.push(LocToken::new(value, start));
                }

                '0'..='9' => {
                    // Symbols may start with a digit (9P_FS); a digit-led run is a number
                    // only when the whole run is numeric.
                    let start = chars.location();
                    let run = peek_word(chars);

                    if is_numeric_word(&run) {
                        let value = parse_int_hex_literal(chars)?;
                        tokens.push(LocToken::new(value, start));
                    } else {
                        chars.advance(run.len());
                        tokens.push(LocToken::new(Token::Symbol(run), start));
                    }
                }

                c if c.is_whitespace() => {
                    _ = chars.next();
                }

                c if c.is_alphabetic() || c == '_' => {
                    let token = parse_keyword_or_symbol(chars)?;
                    tokens.push(token);
                }

                '&' if chars.starts_with("&&") => {
                    let start = chars.location();
                    _ = chars.next();
                    _ = chars.next();
                    tokens.push(LocToken::new(Token::And, start));
                }

                '|' if chars.starts_with("||") => {
                    let start = chars.location();
                    _ = chars.next();
                    _ = chars.next();
                    tokens.push(LocToken::new(Token::Or, start));
                }

                '=' => {
                    let start = chars.location();
                    _ = chars.next();
                    tokens.push(LocToken::new(Token::Eq, start));
                }

                '!' => {
                    let start = chars.location();
                    _ = chars.next();
                    let op = if chars.peek() == Some('=') {
                        _ = chars.next();
                        Token::Ne
                    } else {
                        Token::Not
                    };

                    tokens.push(LocToken::new(op, start));
                }

                '(' => {
                    let start = chars.location();
                    _ = chars.next();
                    tokens.push(LocToken::new(Token::LParen, start));
                }

                ')' => {
                    let start = chars.location();
                    _ = chars.next();
                    tokens.push(LocToken::new(Token::RParen, start));
                }

                '<' => {
                    let start = chars.location();
                    _ = chars.next();
                    let op = if chars.peek() == Some('=') {
                        _ = chars.next();
                        Token::Le
                    } else {
                        Token::Lt
                    };

                    tokens.push(LocToken::new(op, start));
                }

                '>' => {
                    let start = chars.location();
                    _ = chars.next();
                    let op = if chars.peek() == Some('=') {
                        _ = chars.next();
                        Token::Ge
                    } else {
                        Token::Gt
                    };

                    tokens.push(LocToken::new(op, start));
                }

                '\\' if chars.starts_with("\\\n") => {
                    // Line continuation. Skip the backslash and newline.
                    _ = chars.next();
                    _ = chars.next();
                }

                _ => return Err(KConfigError::syntax(c, chars.location())),
            }
        }
    }
}

/// Peek at the identifier-shaped run starting at the cursor, without consuming it.
fn peek_word(chars: &PeekableChars) -> String {
    let mut word = String::new();
    let mut n = 0;

    while let Some(c) = chars.peek_at(n) {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            n += 1;
        } else {
            break;
        }
    }

    word
}

/// Whether a word is a decimal, hex, or octal literal in its entirety.
fn is_numeric_word(word: &str) -> bool {
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }

    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

/// Read a help block from the stream.
///
/// The first non-empty line of the help block determines the indentation level of the rest of the
/// block. The block continues until a non-empty line is found that is indented less than the first
/// line.
fn read_help_block(chars: &mut PeekableChars) -> Result<String, KConfigError> {
    // Skip blank lines between `help` and the first body line.
    while chars.peek() == Some('\n') {
        _ = chars.next();
    }

    let indent = parse_hws0(chars)?;

    if indent.is_empty() {
        // `help` with no indented body.
        return Ok(String::new());
    }

    let mut body = vec![chars.read_until('\n').to_string()];
    if chars.peek() == Some('\n') {
        _ = chars.next();
    }

    loop {
        if chars.is_empty() {
            break;
        }

        if chars.starts_with('\n') {
            // Blank line inside (or trailing) the block.
            _ = chars.next();
            body.push(String::new());
        } else if chars.starts_with(indent) {
            chars.advance(indent.len());
            body.push(chars.read_until('\n').to_string());
            if chars.peek() == Some('\n') {
                _ = chars.next();
            }
        } else {
            break;
        }
    }

    // Trailing blank lines belong to whatever follows the block.
    while body.last().is_some_and(String::is_empty) {
        body.pop();
    }

    Ok(body.join("\n"))
}

#[cfg(test)]
mod tests {
    use {
        super::{parse_stream, PeekableChars},
        crate::parser::Token,
        std::{collections::HashMap, path::Path},
    };

    fn tokenize(input: &str) -> Vec<Vec<Token>> {
        let context = HashMap::<String, String>::default();
        let chars = PeekableChars::new(input, Path::new("test"));
        parse_stream(chars, &context)
            .unwrap()
            .into_iter()
            .map(|line| line.into_iter().map(|t| t.token).collect())
            .collect()
    }

    #[test]
    fn comments_and_blank_lines() {
        let lines = tokenize("# a comment\n\nconfig FOO\n\tbool \"Foo\" # trailing\n");
        assert_eq!(
            lines,
            vec![
                vec![Token::Config, Token::Symbol("FOO".into())],
                vec![Token::Bool, Token::StrLit("Foo".into())],
            ]
        );
    }

    #[test]
    fn line_continuation() {
        let lines = tokenize("config FOO\n\tdepends on A && \\\n\t\tB\n");
        assert_eq!(lines[1].len(), 5);
    }

    #[test]
    fn help_block_indentation() {
        let lines = tokenize("config FOO\n\thelp\n\t  First line.\n\t  Second line.\n\n\t    Indented more.\nconfig BAR\n");
        let help = &lines[1];
        assert_eq!(help[0], Token::Help);
        let Token::StrLit(body) = &help[1] else {
            panic!("expected help body");
        };
        assert_eq!(body, "First line.\nSecond line.\n\n  Indented more.");
        assert_eq!(lines[2][0], Token::Config);
    }

    #[test]
    fn digit_led_symbols() {
        let lines = tokenize("config 9P_FS\n\tdefault 0x1F\n\tdefault 42\n");
        assert_eq!(lines[0][1], Token::Symbol("9P_FS".into()));
        assert_eq!(lines[1][1], Token::HexLit(0x1f));
        assert_eq!(lines[2][1], Token::IntLit(42));
    }

    #[test]
    fn operators() {
        let lines = tokenize("if (A || B) && !C && X >= 0x10\nendif\n");
        assert_eq!(
            lines[0],
            vec![
                Token::If,
                Token::LParen,
                Token::Symbol("A".into()),
                Token::Or,
                Token::Symbol("B".into()),
                Token::RParen,
                Token::And,
                Token::Not,
                Token::Symbol("C".into()),
                Token::And,
                Token::Symbol("X".into()),
                Token::Ge,
                Token::HexLit(0x10),
            ]
        );
    }
}
