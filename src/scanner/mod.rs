//! Hand-written, single-pass lexer.
//!
//! Tokens borrow their lexeme from the source. Malformed input never stops
//! the scanner: it produces an `Error` token and carries on with the next
//! character, leaving it to the compiler to report.

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ScanError {
    #[error("Unexpected character.")]
    UnexpectedCharacter,
    #[error("Unterminated string.")]
    UnterminatedString,
}

impl ScanError {
    pub fn code(self) -> &'static str {
        match self {
            ScanError::UnexpectedCharacter => "LOX-S001",
            ScanError::UnterminatedString => "LOX-S002",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Error(ScanError),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// The source text of the token; string tokens keep their quotes.
    pub lexeme: &'src str,
    pub line: u32,
    pub span: Span,
}

impl<'src> Token<'src> {
    /// Placeholder used before the first real token is scanned.
    pub fn synthetic(lexeme: &'src str) -> Self {
        Token { kind: TokenKind::Eof, lexeme, line: 0, span: Span::UNKNOWN }
    }
}

pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: u32,
    done: bool,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner { source, start: 0, current: 0, line: 1, done: false }
    }

    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        let kind = match c {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b'/' => TokenKind::Slash,
            b'*' => TokenKind::Star,
            b'!' => self.either(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.either(b'=', TokenKind::EqualEqual, TokenKind::Equal),
            b'<' => self.either(b'=', TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.either(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'"' => return self.string(),
            _ => {
                // Swallow the rest of a multi-byte character so the lexeme stays on a char boundary.
                while !self.source.is_char_boundary(self.current) {
                    self.current += 1;
                }
                TokenKind::Error(ScanError::UnexpectedCharacter)
            }
        };
        self.make_token(kind)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.source.as_bytes().get(self.current).copied()?;
        self.current += 1;
        Some(c)
    }

    fn peek(&self) -> u8 {
        self.source.as_bytes().get(self.current).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.source.as_bytes().get(self.current + 1).copied().unwrap_or(0)
    }

    fn either(&mut self, expected: u8, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if !self.is_at_end() && self.peek() == expected {
            self.current += 1;
            matched
        } else {
            otherwise
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            line: self.line,
            span: Span { start: self.start, end: self.current },
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => {
                    self.current += 1;
                }
                b'\n' => {
                    self.line += 1;
                    self.current += 1;
                }
                b'/' if self.peek_next() == b'/' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.current += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token<'src> {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }

        if self.is_at_end() {
            return self.make_token(TokenKind::Error(ScanError::UnterminatedString));
        }

        // closing quote
        self.current += 1;
        self.make_token(TokenKind::String)
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.current += 1;
            while self.peek().is_ascii_digit() {
                self.current += 1;
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'src> {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.current += 1;
        }
        let kind = self.identifier_kind();
        self.make_token(kind)
    }

    /// Keyword trie: branch on the first letter (and the second where several
    /// keywords share it), then compare the remaining suffix.
    fn identifier_kind(&self) -> TokenKind {
        let word = &self.source.as_bytes()[self.start..self.current];
        let rest = |skip: usize, suffix: &str, kind: TokenKind| {
            if &word[skip..] == suffix.as_bytes() { kind } else { TokenKind::Identifier }
        };

        match word[0] {
            b'a' => rest(1, "nd", TokenKind::And),
            b'c' => rest(1, "lass", TokenKind::Class),
            b'e' => rest(1, "lse", TokenKind::Else),
            b'f' if word.len() > 1 => match word[1] {
                b'a' => rest(2, "lse", TokenKind::False),
                b'o' => rest(2, "r", TokenKind::For),
                b'u' => rest(2, "n", TokenKind::Fun),
                _ => TokenKind::Identifier,
            },
            b'i' => rest(1, "f", TokenKind::If),
            b'n' => rest(1, "il", TokenKind::Nil),
            b'o' => rest(1, "r", TokenKind::Or),
            b'p' => rest(1, "rint", TokenKind::Print),
            b'r' => rest(1, "eturn", TokenKind::Return),
            b's' => rest(1, "uper", TokenKind::Super),
            b't' if word.len() > 1 => match word[1] {
                b'h' => rest(2, "is", TokenKind::This),
                b'r' => rest(2, "ue", TokenKind::True),
                _ => TokenKind::Identifier,
            },
            b'v' => rest(1, "ar", TokenKind::Var),
            b'w' => rest(1, "hile", TokenKind::While),
            _ => TokenKind::Identifier,
        }
    }
}

/// Yields every token up to and including the first `Eof`.
impl<'src> Iterator for Scanner<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        if self.done {
            return None;
        }
        let token = self.scan_token();
        self.done = token.kind == TokenKind::Eof;
        Some(token)
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|t| t.kind).collect()
    }

    #[test]
    fn punctuation_and_operators() {
        assert_eq!(
            kinds("(){};,.-+/* ! != = == > >= < <="),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn greedy_two_char_operators() {
        assert_eq!(kinds("!=="), vec![TokenKind::BangEqual, TokenKind::Equal, TokenKind::Eof]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("and class else false for fun if nil or print return super this true var while"),
            vec![
                TokenKind::And,
                TokenKind::Class,
                TokenKind::Else,
                TokenKind::False,
                TokenKind::For,
                TokenKind::Fun,
                TokenKind::If,
                TokenKind::Nil,
                TokenKind::Or,
                TokenKind::Print,
                TokenKind::Return,
                TokenKind::Super,
                TokenKind::This,
                TokenKind::True,
                TokenKind::Var,
                TokenKind::While,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefixes_are_identifiers() {
        for word in ["f", "t", "an", "android", "variable", "printer", "th", "fa", "_var", "x1"] {
            assert_eq!(kinds(word)[0], TokenKind::Identifier, "{word}");
        }
    }

    #[test]
    fn numbers() {
        let tokens: Vec<_> = Scanner::new("123 4.5 6. .7").collect();
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].lexeme, "4.5");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].lexeme, "6");
        assert_eq!(tokens[3].kind, TokenKind::Dot);
        assert_eq!(tokens[4].kind, TokenKind::Dot);
        assert_eq!(tokens[5].lexeme, "7");
    }

    #[test]
    fn string_keeps_quotes_and_counts_lines() {
        let tokens: Vec<_> = Scanner::new("\"a\nb\" x").collect();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "\"a\nb\"");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let tokens: Vec<_> = Scanner::new("\"oops").collect();
        assert_eq!(tokens[0].kind, TokenKind::Error(ScanError::UnterminatedString));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn unexpected_character_then_continue() {
        assert_eq!(
            kinds("1 @ 2"),
            vec![
                TokenKind::Number,
                TokenKind::Error(ScanError::UnexpectedCharacter),
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn non_ascii_character_is_one_error_token() {
        let tokens: Vec<_> = Scanner::new("é;").collect();
        assert_eq!(tokens[0].kind, TokenKind::Error(ScanError::UnexpectedCharacter));
        assert_eq!(tokens[0].lexeme, "é");
        assert_eq!(tokens[1].kind, TokenKind::Semicolon);
    }

    #[test]
    fn comments_and_line_numbers() {
        let tokens: Vec<_> = Scanner::new("// heading\nvar a; // trailing\n\nprint a;").collect();
        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].kind, TokenKind::Print);
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn spans_cover_lexemes() {
        let src = "var answer = 42;";
        for t in Scanner::new(src) {
            assert_eq!(&src[t.span.start..t.span.end], t.lexeme);
        }
    }

    #[test]
    fn iterator_stops_after_eof() {
        let mut s = Scanner::new("");
        assert_eq!(s.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(s.next().is_none());
    }

    #[test]
    fn token_kinds_are_hashable() {
        use std::collections::HashSet;

        let kinds: HashSet<TokenKind> = Scanner::new("@ \"open").map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::Error(ScanError::UnexpectedCharacter)));
        assert!(kinds.contains(&TokenKind::Error(ScanError::UnterminatedString)));
        assert!(kinds.contains(&TokenKind::Eof));
    }
}
