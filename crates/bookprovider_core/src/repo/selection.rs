//! Row filters and ordering for `books` statements.
//!
//! # Invariants
//! - The item id is always a bound parameter, never spliced into SQL text.
//! - Sort terms only name allow-listed columns.
//! - A caller clause that passes `validate` stays inside the parentheses it
//!   is wrapped in by `and_id`.

use crate::model::book::{BookColumn, BookId};
use crate::model::values::FieldValue;
use once_cell::sync::Lazy;
use regex::Regex;

static SORT_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([a-z_]+)(?:\s+(asc|desc))?\s*$").expect("valid sort term regex")
});

/// Caller filter: a SQL boolean expression with `?` placeholders plus the
/// values bound to them, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    clause: Option<String>,
    args: Vec<FieldValue>,
}

impl Selection {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Blank clauses are treated as "no filter"; `args` are kept either way.
    pub fn new(clause: impl Into<String>, args: Vec<FieldValue>) -> Self {
        let clause = clause.into();
        let clause = if clause.trim().is_empty() {
            None
        } else {
            Some(clause)
        };
        Self { clause, args }
    }

    /// Checks the caller clause before it is spliced into a statement.
    ///
    /// # Errors
    /// - Returns the reason when the clause has unbalanced parentheses or an
    ///   unterminated literal outside quotes, or contains `;`, `--` or `/*`.
    pub fn validate(&self) -> Result<(), String> {
        match &self.clause {
            Some(clause) => check_clause(clause),
            None => Ok(()),
        }
    }

    /// Restricts this selection to one row id.
    ///
    /// Produces `id = ? AND (<clause>)` with the id bound ahead of the
    /// caller's arguments. Only validated selections keep the row scoping.
    pub fn and_id(self, id: BookId) -> Self {
        let clause = match self.clause {
            Some(clause) => format!("{} = ? AND ({clause})", BookColumn::Id),
            None => format!("{} = ?", BookColumn::Id),
        };
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(FieldValue::Integer(id));
        args.extend(self.args);
        Self {
            clause: Some(clause),
            args,
        }
    }

    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }

    pub fn args(&self) -> &[FieldValue] {
        &self.args
    }

    /// ` WHERE <clause>` or an empty string.
    pub(crate) fn where_sql(&self) -> String {
        match &self.clause {
            Some(clause) => format!(" WHERE {clause}"),
            None => String::new(),
        }
    }
}

fn check_clause(clause: &str) -> Result<(), String> {
    let mut depth = 0_usize;
    let mut closing_quote: Option<char> = None;
    let mut chars = clause.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(quote) = closing_quote {
            // A doubled quote closes and reopens, so escapes need no special case.
            if ch == quote {
                closing_quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => closing_quote = Some(ch),
            '[' => closing_quote = Some(']'),
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced `)`".to_string())?;
            }
            ';' => return Err("statement separator `;` is not allowed".to_string()),
            '-' if chars.peek() == Some(&'-') => {
                return Err("comment `--` is not allowed".to_string())
            }
            '/' if chars.peek() == Some(&'*') => {
                return Err("comment `/*` is not allowed".to_string())
            }
            _ => {}
        }
    }

    if let Some(quote) = closing_quote {
        return Err(format!("unterminated literal, missing `{quote}`"));
    }
    if depth > 0 {
        return Err("unbalanced `(`".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Validated `ORDER BY` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    terms: Vec<(BookColumn, SortDirection)>,
}

impl Default for SortOrder {
    /// By `name`, ascending.
    fn default() -> Self {
        Self {
            terms: vec![(BookColumn::Name, SortDirection::Asc)],
        }
    }
}

impl SortOrder {
    /// Parses `"<column> [ASC|DESC], ..."`. Empty or absent input yields the
    /// default order.
    ///
    /// # Errors
    /// - Returns the offending term when it is malformed or names a column
    ///   outside the allow-list.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        let raw = match raw {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Self::default()),
        };

        let mut terms = Vec::new();
        for term in raw.split(',') {
            let captures = SORT_TERM_RE
                .captures(term)
                .ok_or_else(|| term.trim().to_string())?;
            let column = BookColumn::parse(&captures[1]).ok_or_else(|| term.trim().to_string())?;
            let direction = match captures.get(2) {
                Some(direction) if direction.as_str().eq_ignore_ascii_case("desc") => {
                    SortDirection::Desc
                }
                _ => SortDirection::Asc,
            };
            terms.push((column, direction));
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[(BookColumn, SortDirection)] {
        &self.terms
    }

    pub(crate) fn order_by_sql(&self) -> String {
        let terms = self
            .terms
            .iter()
            .map(|(column, direction)| format!("{} {}", column, direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" ORDER BY {terms}")
    }
}
