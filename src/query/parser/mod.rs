// Query Extraction Module
//
// Restricted front end that turns single-block join queries into a
// QueryModel. It is not a general SQL parser.

pub mod lexer;
pub mod extractor;

pub use self::lexer::{has_top_level_or, Lexer, Token, TokenType};
pub use self::extractor::{extract, ExtractError, ExtractResult};
