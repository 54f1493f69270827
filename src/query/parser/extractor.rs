// Query Model Extraction
//
// Splits a restricted `SELECT ... FROM t1 AS a, t2 ... WHERE c1 AND c2 ...`
// query into a QueryModel. Projection and filter text are kept verbatim;
// only the FROM list and the top-level WHERE conjuncts are interpreted.

use thiserror::Error;

use crate::query::model::{ColumnRef, JoinOrderError, JoinPredicate, QueryModel};
use super::lexer::{Lexer, Token, TokenType};

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Missing {0} clause")]
    MissingClause(&'static str),

    #[error("Invalid table reference: {0}")]
    InvalidTableReference(String),

    #[error("Unexpected token {0}")]
    UnexpectedToken(String),

    #[error("WHERE clause is a top-level disjunction; only AND-connected conditions are supported")]
    TopLevelOr,

    #[error(transparent)]
    Model(#[from] JoinOrderError),
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Build a QueryModel from query text
pub fn extract(sql: &str) -> ExtractResult<QueryModel> {
    let tokens = Lexer::new(sql).tokenize();
    // Drop trailing semicolons together with EOF
    let end = tokens
        .iter()
        .rposition(|t| !matches!(t.token_type, TokenType::EOF | TokenType::SEMICOLON))
        .map_or(0, |pos| pos + 1);
    let tokens = &tokens[..end];

    let select = position(tokens, &TokenType::SELECT).ok_or(ExtractError::MissingClause("SELECT"))?;
    if select != 0 {
        return Err(ExtractError::UnexpectedToken(tokens[0].to_string()));
    }
    let from = position(tokens, &TokenType::FROM).ok_or(ExtractError::MissingClause("FROM"))?;
    let filter_start = position(tokens, &TokenType::WHERE);

    let projection = span_text(sql, &tokens[select + 1..from])
        .ok_or(ExtractError::MissingClause("SELECT list"))?;
    let mut model = QueryModel::new(projection);

    let from_items = &tokens[from + 1..filter_start.unwrap_or(tokens.len())];
    if from_items.is_empty() {
        return Err(ExtractError::MissingClause("FROM list"));
    }
    for item in split_top_level(from_items, |t| t.token_type == TokenType::COMMA) {
        let (table, alias) = table_reference(sql, item)?;
        model.add_table(table, alias.as_deref())?;
    }

    if let Some(start) = filter_start {
        // Pulling join predicates out of `x OR y AND a.id = b.id` changes its meaning
        if position(&tokens[start + 1..], &TokenType::OR).is_some() {
            return Err(ExtractError::TopLevelOr);
        }
        let mut filters = Vec::new();
        for conjunct in split_conjuncts(&tokens[start + 1..]) {
            match join_predicate(conjunct) {
                Some(join) => {
                    model.add_join(join)?;
                }
                None => filters.extend(span_text(sql, conjunct)),
            }
        }
        model.set_filter(filters.join(" AND "));
    }

    Ok(model)
}

/// First top-level occurrence of a keyword
fn position(tokens: &[Token], wanted: &TokenType) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match &token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => depth = depth.saturating_sub(1),
            t if depth == 0 && t == wanted => return Some(i),
            _ => {}
        }
    }
    None
}

/// Verbatim source text covered by a run of tokens
fn span_text<'a>(sql: &'a str, tokens: &[Token]) -> Option<&'a str> {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => Some(sql[first.start..last.end].trim()),
        _ => None,
    }
}

/// Split on separator tokens that are outside parentheses
fn split_top_level(tokens: &[Token], is_separator: impl Fn(&Token) -> bool) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_separator(token) => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

/// Split WHERE tokens on top-level AND, keeping `BETWEEN x AND y` intact
fn split_conjuncts(tokens: &[Token]) -> Vec<&[Token]> {
    let mut pending_between = false;
    let mut depth = 0usize;
    let mut separators = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => depth = depth.saturating_sub(1),
            TokenType::BETWEEN if depth == 0 => pending_between = true,
            TokenType::AND if depth == 0 => {
                if pending_between {
                    pending_between = false;
                } else {
                    separators.push(i);
                }
            }
            _ => {}
        }
    }

    let mut parts = Vec::with_capacity(separators.len() + 1);
    let mut start = 0;
    for sep in separators {
        parts.push(&tokens[start..sep]);
        start = sep + 1;
    }
    parts.push(&tokens[start..]);
    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

/// `table`, `table alias` or `table AS alias`
fn table_reference(sql: &str, item: &[Token]) -> ExtractResult<(String, Option<String>)> {
    let invalid = || ExtractError::InvalidTableReference(span_text(sql, item).unwrap_or_default().to_string());

    match item {
        [Token { token_type: TokenType::IDENTIFIER(table), .. }] => Ok((table.clone(), None)),
        [
            Token { token_type: TokenType::IDENTIFIER(table), .. },
            Token { token_type: TokenType::IDENTIFIER(alias), .. },
        ]
        | [
            Token { token_type: TokenType::IDENTIFIER(table), .. },
            Token { token_type: TokenType::AS, .. },
            Token { token_type: TokenType::IDENTIFIER(alias), .. },
        ] => Ok((table.clone(), Some(alias.clone()))),
        _ => Err(invalid()),
    }
}

/// A conjunct shaped exactly `x.col = y.col`
fn join_predicate(conjunct: &[Token]) -> Option<JoinPredicate> {
    match conjunct {
        [
            Token { token_type: TokenType::IDENTIFIER(lt), .. },
            Token { token_type: TokenType::DOT, .. },
            Token { token_type: TokenType::IDENTIFIER(lc), .. },
            Token { token_type: TokenType::EQUALS, .. },
            Token { token_type: TokenType::IDENTIFIER(rt), .. },
            Token { token_type: TokenType::DOT, .. },
            Token { token_type: TokenType::IDENTIFIER(rc), .. },
        ] => Some(JoinPredicate::new(
            ColumnRef::new(lt.as_str(), lc.as_str()),
            ColumnRef::new(rt.as_str(), rc.as_str()),
        )),
        _ => None,
    }
}
