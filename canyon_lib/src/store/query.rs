use std::fmt;

use rusqlite::{Statement, types::ValueRef};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("only SELECT queries are allowed (statement starts with '{keyword}')")]
    NotSelect { keyword: String },

    #[error("only a single statement is allowed per query")]
    MultipleStatements,

    #[error("statement would modify the database; only read-only queries are allowed")]
    NotReadOnly,

    #[error("query failed: {0}")]
    Sql(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(usize),
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(n) => Self::Integer(n),
            ValueRef::Real(x) => Self::Real(x),
            ValueRef::Text(bytes) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.len()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(len) => write!(f, "<blob {len} bytes>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Set when more rows matched than the store's row cap.
    pub truncated: bool,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Renders an aligned plain-text table with a header row.
    pub fn render_table(&self) -> String {
        if self.rows.is_empty() {
            return "No results found.".to_string();
        }

        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Cell::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let mut out = String::new();
        push_line(&mut out, self.columns.iter().map(String::as_str), &widths);
        for row in &rendered {
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }

        if self.truncated {
            out.push_str(&format!(
                "... output truncated to the first {} rows; add LIMIT or aggregate to narrow it\n",
                self.rows.len()
            ));
        }

        out.trim_end().to_string()
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let width = widths.get(i).copied().unwrap_or_default();
        line.push_str(&format!("{cell:>width$}"));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Validates the statement text and returns the statement without leading
/// comments or its trailing `;`.
pub(crate) fn check_read_only(sql: &str) -> Result<&str, QueryError> {
    let body = skip_trivia(sql);
    let (statement, rest) = match find_separator(body) {
        Some(at) => (body[..at].trim_end(), &body[at + 1..]),
        None => (body.trim_end(), ""),
    };
    if statement.is_empty() {
        return Err(QueryError::Empty);
    }

    let keyword = statement
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if keyword != "SELECT" && keyword != "WITH" {
        return Err(QueryError::NotSelect { keyword });
    }

    // only whitespace and comments may follow the terminator
    if !skip_trivia(rest).is_empty() {
        return Err(QueryError::MultipleStatements);
    }

    Ok(statement)
}

/// Strips leading whitespace, `--` line comments and `/* */` block comments.
fn skip_trivia(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = match comment.find('\n') {
                Some(newline) => comment[newline + 1..].trim_start(),
                None => "",
            };
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = match comment.find("*/") {
                Some(close) => comment[close + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

/// Byte offset of the first `;` outside string literals, quoted identifiers and comments.
fn find_separator(sql: &str) -> Option<usize> {
    let mut chars = sql.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                let quote = c;
                while let Some((_, inner)) = chars.next() {
                    if inner == quote {
                        // doubled quote is an escape
                        if chars.peek().map(|&(_, next)| next) == Some(quote) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '[' => {
                for (_, inner) in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            '-' if chars.peek().map(|&(_, next)| next) == Some('-') => {
                for (_, inner) in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().map(|&(_, next)| next) == Some('*') => {
                chars.next();
                let mut prev = '\0';
                for (_, inner) in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            ';' => return Some(at),
            _ => {}
        }
    }
    None
}

pub(crate) fn collect_rows(
    stmt: &mut Statement<'_>,
    max_rows: usize,
) -> Result<QueryRows, QueryError> {
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let column_count = columns.len();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows.next()? {
        if out.len() == max_rows {
            truncated = true;
            break;
        }
        let cells = (0..column_count)
            .map(|i| row.get_ref(i).map(Cell::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(cells);
    }

    Ok(QueryRows {
        columns,
        rows: out,
        truncated,
    })
}
