// SQL Lexer Implementation
//
// Tokenizes the restricted SELECT ... FROM ... WHERE ... shape. Every token
// carries its byte span so callers can slice verbatim text back out of the
// input.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// SQL Token types
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // Keywords
    SELECT,
    FROM,
    WHERE,
    AND,
    OR,
    AS,
    BETWEEN,

    // Literals
    STRING(String),
    NUMBER(String),

    // Identifiers (bare or double-quoted)
    IDENTIFIER(String),

    // Operators
    EQUALS,         // =
    OPERATOR(String),

    // Punctuation
    SEMICOLON,      // ;
    COMMA,          // ,
    LeftParen,      // (
    RightParen,     // )
    DOT,            // .

    // Special
    EOF,
    ILLEGAL(String),
}

/// A lexical unit with its position in the input
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({}) at {}", self.token_type, self.literal, self.start)
    }
}

/// SQL Lexer for breaking a query string into tokens
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenize the whole input. The last token is always `EOF`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.token_type == TokenType::EOF;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    /// Consume characters while `pred` holds, returning the end offset
    fn take_while(&mut self, start: usize, pred: impl Fn(char) -> bool) -> usize {
        let mut end = start;
        while let Some(&(pos, ch)) = self.chars.peek() {
            if pred(ch) {
                end = pos + ch.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        end
    }

    /// Read a quoted run; a doubled quote is an escaped quote
    fn read_quoted(&mut self, start: usize, quote: char) -> (usize, String) {
        let mut value = String::new();
        let mut end = start + quote.len_utf8();

        while let Some((pos, ch)) = self.chars.next() {
            end = pos + ch.len_utf8();
            if ch == quote {
                match self.chars.peek() {
                    Some(&(_, next)) if next == quote => {
                        self.chars.next();
                        end += quote.len_utf8();
                        value.push(quote);
                    }
                    _ => break,
                }
            } else {
                value.push(ch);
            }
        }
        (end, value)
    }

    fn lookup_identifier(ident: &str) -> TokenType {
        match ident.to_uppercase().as_str() {
            "SELECT" => TokenType::SELECT,
            "FROM" => TokenType::FROM,
            "WHERE" => TokenType::WHERE,
            "AND" => TokenType::AND,
            "OR" => TokenType::OR,
            "AS" => TokenType::AS,
            "BETWEEN" => TokenType::BETWEEN,
            _ => TokenType::IDENTIFIER(ident.to_string()),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some((start, ch)) = self.chars.next() else {
            let len = self.input.len();
            return Token {
                token_type: TokenType::EOF,
                literal: String::new(),
                start: len,
                end: len,
            };
        };

        let mut end = start + ch.len_utf8();
        let token_type = match ch {
            ';' => TokenType::SEMICOLON,
            ',' => TokenType::COMMA,
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '.' => TokenType::DOT,
            '=' => TokenType::EQUALS,
            '<' | '>' | '!' => {
                if let Some(&(pos, next)) = self.chars.peek() {
                    if next == '=' || (ch == '<' && next == '>') {
                        self.chars.next();
                        end = pos + 1;
                    }
                }
                TokenType::OPERATOR(self.input[start..end].to_string())
            }
            '+' | '-' | '*' | '/' | '%' | '|' | ':' => TokenType::OPERATOR(ch.to_string()),
            '\'' => {
                let (quoted_end, value) = self.read_quoted(start, '\'');
                end = quoted_end;
                TokenType::STRING(value)
            }
            '"' => {
                let (quoted_end, value) = self.read_quoted(start, '"');
                end = quoted_end;
                TokenType::IDENTIFIER(value)
            }
            c if is_letter(c) => {
                end = self.take_while(end, |c| is_letter(c) || c.is_ascii_digit() || c == '$');
                Self::lookup_identifier(&self.input[start..end])
            }
            c if c.is_ascii_digit() => {
                end = self.take_while(end, |c| c.is_ascii_digit() || c == '.');
                TokenType::NUMBER(self.input[start..end].to_string())
            }
            c => TokenType::ILLEGAL(c.to_string()),
        };

        Token {
            token_type,
            literal: self.input[start..end].to_string(),
            start,
            end,
        }
    }
}

/// True if `sql` has an OR outside any parentheses, so appending
/// `AND ...` to it would rebind the disjunction
pub fn has_top_level_or(sql: &str) -> bool {
    let mut depth = 0usize;
    for token in Lexer::new(sql).tokenize() {
        match token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => depth = depth.saturating_sub(1),
            TokenType::OR if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Check if a character can start an identifier
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
