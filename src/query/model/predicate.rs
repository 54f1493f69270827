// Join Predicate Implementation
//
// An equi-join condition between two column references, normalized so the
// lexicographically smaller reference is always printed first.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{JoinOrderError, JoinOrderResult};

/// Column reference qualified with a table alias (`alias.column`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Parse `alias.column`. Either part may be double-quoted; names are
    /// stored unquoted.
    pub fn parse(text: &str) -> JoinOrderResult<Self> {
        let text = text.trim();
        let malformed = || JoinOrderError::MalformedModel(format!("'{}' is not a qualified column reference", text));

        let (table, rest) = split_name(text).ok_or_else(malformed)?;
        let column = rest.strip_prefix('.').and_then(split_name).ok_or_else(malformed)?;
        match column {
            (column, "") => Ok(ColumnRef::new(table, column)),
            _ => Err(malformed()),
        }
    }
}

/// Read one bare or double-quoted name off the front of `text`
fn split_name(text: &str) -> Option<(String, &str)> {
    if let Some(quoted) = text.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((pos, ch)) = chars.next() {
            if ch != '"' {
                name.push(ch);
            } else if let Some(&(_, '"')) = chars.peek() {
                chars.next();
                name.push('"');
            } else {
                return (!name.is_empty()).then(|| (name, &quoted[pos + 1..]));
            }
        }
        return None;
    }

    let end = text.find(|ch: char| !is_bare_char(ch)).unwrap_or(text.len());
    (end > 0).then(|| (text[..end].to_string(), &text[end..]))
}

fn is_bare_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Render a name for SQL, double-quoting it unless it is a plain identifier
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let plain = name.chars().next().is_some_and(|ch| ch.is_alphabetic() || ch == '_')
        && name.chars().all(is_bare_char);
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_identifier(&self.table), quote_identifier(&self.column))
    }
}

impl FromStr for ColumnRef {
    type Err = JoinOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnRef::parse(s)
    }
}

/// Symmetric equi-join predicate between two columns.
///
/// `left`/`right` only fix the printing order: `b.x = a.x` and `a.x = b.x`
/// build the same predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JoinPredicate {
    left: ColumnRef,
    right: ColumnRef,
}

impl JoinPredicate {
    /// Create a predicate, storing the smaller reference on the left
    pub fn new(one: ColumnRef, other: ColumnRef) -> Self {
        if one <= other {
            JoinPredicate { left: one, right: other }
        } else {
            JoinPredicate { left: other, right: one }
        }
    }

    /// Parse `a.x = b.y`
    pub fn parse(text: &str) -> JoinOrderResult<Self> {
        let (one, other) = text.split_once('=').ok_or_else(|| {
            JoinOrderError::MalformedModel(format!("'{}' is not an equi-join condition", text.trim()))
        })?;
        Ok(JoinPredicate::new(ColumnRef::parse(one)?, ColumnRef::parse(other)?))
    }

    pub fn left(&self) -> &ColumnRef {
        &self.left
    }

    pub fn right(&self) -> &ColumnRef {
        &self.right
    }

    /// Alias of the left-hand column
    pub fn left_table(&self) -> &str {
        &self.left.table
    }

    /// Alias of the right-hand column
    pub fn right_table(&self) -> &str {
        &self.right.table
    }

    pub fn is_self_join(&self) -> bool {
        self.left.table == self.right.table
    }

    /// Short `left_table-right_table` label used in diagnostics
    pub fn label(&self) -> String {
        format!("{}-{}", self.left.table, self.right.table)
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

impl FromStr for JoinPredicate {
    type Err = JoinOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JoinPredicate::parse(s)
    }
}
