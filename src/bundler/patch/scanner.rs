//! Minimal JavaScript/TypeScript tokenizer.
//!
//! This is not a parser. It tracks just enough lexical state (strings,
//! template literals, comments, regular-expression literals) to tell real
//! identifiers and brackets apart from text that only looks like code. The
//! injection engine uses the tokens to find declaration boundaries, and
//! [`check_balance`] uses them to validate code fragments before they are
//! spliced into third-party sources.

use std::fmt;

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword, including `#private` names.
    Ident,
    /// Any single non-identifier character outside literals.
    Punct,
    /// Single- or double-quoted string literal.
    Str,
    /// A literal chunk of a template string (between backticks and `${`/`}`).
    Template,
    /// Regular-expression literal including flags.
    Regex,
    Number,
}

/// A token and its byte span in the scanned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_ident(&self, src: &str, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(src) == name
    }

    pub fn is_punct(&self, src: &str, c: char) -> bool {
        self.kind == TokenKind::Punct && src[self.start..].starts_with(c)
    }
}

/// Why a source could not be scanned or is not balanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    UnterminatedString,
    UnterminatedTemplate,
    UnterminatedComment,
    UnterminatedRegex,
    /// A closing bracket with no matching opener.
    UnexpectedClose(char),
    /// A closing bracket that does not match the innermost opener.
    MismatchedClose { expected: char, found: char },
    /// An opener that is never closed.
    Unclosed(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub kind: ScanErrorKind,
    /// Byte offset the problem was detected at.
    pub offset: usize,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ScanErrorKind::UnterminatedString => write!(f, "unterminated string literal")?,
            ScanErrorKind::UnterminatedTemplate => write!(f, "unterminated template literal")?,
            ScanErrorKind::UnterminatedComment => write!(f, "unterminated block comment")?,
            ScanErrorKind::UnterminatedRegex => write!(f, "unterminated regular expression")?,
            ScanErrorKind::UnexpectedClose(c) => write!(f, "unexpected '{c}'")?,
            ScanErrorKind::MismatchedClose { expected, found } => {
                write!(f, "expected '{expected}' but found '{found}'")?
            }
            ScanErrorKind::Unclosed(c) => write!(f, "'{c}' is never closed")?,
        }
        write!(f, " at byte {}", self.offset)
    }
}

impl std::error::Error for ScanError {}

/// Keywords after which a `/` starts a regular expression rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn closer_for(open: u8) -> char {
    match open {
        b'(' => ')',
        b'[' => ']',
        _ => '}',
    }
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    /// Open brackets with their offsets.
    brackets: Vec<(u8, usize)>,
    /// Bracket depth at which each active template substitution was opened.
    templates: Vec<usize>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            brackets: Vec::new(),
            templates: Vec::new(),
        }
    }

    fn error(&self, kind: ScanErrorKind, offset: usize) -> ScanError {
        ScanError { kind, offset }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
        });
    }

    fn regex_allowed(&self) -> bool {
        let Some(last) = self.tokens.last() else {
            return true;
        };
        match last.kind {
            TokenKind::Punct => !matches!(self.bytes[last.start], b')' | b']' | b'}'),
            TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&last.text(self.src)),
            _ => false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ScanError> {
        if self.src.starts_with("#!") {
            self.skip_line();
        }
        while let Some(b) = self.peek(0) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'/' if self.regex_allowed() => self.scan_regex()?,
                b'\'' | b'"' => self.scan_string(b)?,
                b'`' => {
                    self.pos += 1;
                    self.scan_template_chunk(self.pos - 1)?;
                }
                b'0'..=b'9' => self.scan_number(),
                b'.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.scan_number(),
                b'#' if self.peek(1).is_some_and(is_ident_start) => {
                    let start = self.pos;
                    self.pos += 1;
                    self.scan_ident_tail(start);
                }
                _ if is_ident_start(b) => {
                    let start = self.pos;
                    self.scan_ident_tail(start);
                }
                b'(' | b'[' | b'{' => {
                    self.brackets.push((b, self.pos));
                    self.pos += 1;
                    self.push(TokenKind::Punct, self.pos - 1);
                }
                b')' | b']' | b'}' => {
                    let closes_template = b == b'}'
                        && self.templates.last() == Some(&self.brackets.len());
                    if closes_template {
                        self.templates.pop();
                        let start = self.pos;
                        self.pos += 1;
                        self.scan_template_chunk(start)?;
                    } else {
                        self.close_bracket(b)?;
                        self.pos += 1;
                        self.push(TokenKind::Punct, self.pos - 1);
                    }
                }
                _ => {
                    // Punctuators are single ASCII characters; anything else
                    // non-ASCII was taken as an identifier above.
                    self.pos += 1;
                    self.push(TokenKind::Punct, self.pos - 1);
                }
            }
        }

        if !self.templates.is_empty() {
            return Err(self.error(ScanErrorKind::UnterminatedTemplate, self.pos));
        }
        if let Some(&(open, offset)) = self.brackets.last() {
            return Err(self.error(ScanErrorKind::Unclosed(open as char), offset));
        }
        Ok(self.tokens)
    }

    fn close_bracket(&mut self, close: u8) -> Result<(), ScanError> {
        match self.brackets.pop() {
            None => Err(self.error(ScanErrorKind::UnexpectedClose(close as char), self.pos)),
            Some((open, _)) if closer_for(open) as u8 != close => Err(self.error(
                ScanErrorKind::MismatchedClose {
                    expected: closer_for(open),
                    found: close as char,
                },
                self.pos,
            )),
            Some(_) => Ok(()),
        }
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        match self.src[self.pos + 2..].find("*/") {
            Some(rel) => {
                self.pos += 2 + rel + 2;
                Ok(())
            }
            None => Err(self.error(ScanErrorKind::UnterminatedComment, start)),
        }
    }

    fn scan_ident_tail(&mut self, start: usize) {
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        self.push(TokenKind::Ident, start);
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        {
            self.pos += 1;
        }
        self.push(TokenKind::Number, start);
    }

    fn scan_string(&mut self, quote: u8) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => {
                    return Err(self.error(ScanErrorKind::UnterminatedString, start));
                }
                Some(b'\\') => self.pos += 2,
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::Str, start);
        Ok(())
    }

    /// Scans template text up to the closing backtick or the next `${`.
    fn scan_template_chunk(&mut self, start: usize) -> Result<(), ScanError> {
        loop {
            match self.peek(0) {
                None => return Err(self.error(ScanErrorKind::UnterminatedTemplate, start)),
                Some(b'\\') => self.pos += 2,
                Some(b'`') => {
                    self.pos += 1;
                    break;
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.templates.push(self.brackets.len());
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::Template, start);
        Ok(())
    }

    fn scan_regex(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => {
                    return Err(self.error(ScanErrorKind::UnterminatedRegex, start));
                }
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        self.push(TokenKind::Regex, start);
        Ok(())
    }
}

/// Tokenizes `src`, failing on unterminated literals or unbalanced brackets.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ScanError> {
    Scanner::new(src).run()
}

/// Verifies that `src` has balanced brackets and no dangling literal or comment.
pub fn check_balance(src: &str) -> Result<(), ScanError> {
    tokenize(src).map(|_| ())
}

/// Returns the index of the bracket token closing the one at `open`.
pub fn matching_close(src: &str, tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match src.as_bytes()[token.start] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idents(src: &str) -> Vec<&str> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text(src))
            .collect()
    }

    #[test]
    fn strings_and_comments_hide_code() {
        let src = r#"const a = "function foo() {"; // function bar
/* function baz */ function real() {}"#;
        assert_eq!(idents(src), ["const", "a", "function", "real"]);
    }

    #[test]
    fn template_substitutions_are_scanned() {
        let src = "const s = `a ${ {x: 1}.x } b ${`nested ${y}`} c`;";
        assert!(check_balance(src).is_ok());
        assert!(idents(src).contains(&"y"));
    }

    #[test]
    fn braces_inside_templates_do_not_count() {
        assert!(check_balance("`{{{`").is_ok());
        assert!(check_balance("'}'").is_ok());
    }

    #[test]
    fn regex_literals_versus_division() {
        let src = "const r = /[/}]+/g; const d = a / b / c;";
        assert!(check_balance(src).is_ok());
        let regex = tokenize(src)
            .unwrap()
            .into_iter()
            .find(|t| t.kind == TokenKind::Regex)
            .unwrap();
        assert_eq!(regex.text(src), "/[/}]+/g");
    }

    #[test]
    fn unbalanced_fragments_are_rejected() {
        assert_eq!(
            check_balance("if (x) {").unwrap_err().kind,
            ScanErrorKind::Unclosed('{')
        );
        assert_eq!(
            check_balance("foo());").unwrap_err().kind,
            ScanErrorKind::UnexpectedClose(')')
        );
        assert_eq!(
            check_balance("[)").unwrap_err().kind,
            ScanErrorKind::MismatchedClose {
                expected: ']',
                found: ')'
            }
        );
        assert_eq!(
            check_balance("const s = 'oops;").unwrap_err().kind,
            ScanErrorKind::UnterminatedString
        );
        assert_eq!(
            check_balance("/* never closed").unwrap_err().kind,
            ScanErrorKind::UnterminatedComment
        );
    }

    #[test]
    fn matching_close_finds_body_end() {
        let src = "class A { m() { return [1, {a: 2}]; } } tail";
        let tokens = tokenize(src).unwrap();
        let open = tokens.iter().position(|t| t.is_punct(src, '{')).unwrap();
        let close = matching_close(src, &tokens, open).unwrap();
        assert_eq!(tokens[close + 1].text(src), "tail");
    }

    #[test]
    fn hashbang_and_private_names() {
        let src = "#!/usr/bin/env node\nclass A { #secret() {} }";
        assert!(idents(src).contains(&"#secret"));
    }
}
