//! Internal representation of query clauses.
//!
//! These types are held by [`super::QueryState`] between builder calls.

use std::fmt;

/// Join flavour. Anything unrecognized is treated as `LEFT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinType {
    #[default]
    Left,
    Right,
    Inner,
}

impl JoinType {
    pub fn parse_lenient(kind: &str) -> Self {
        match kind.trim().to_ascii_uppercase().as_str() {
            "RIGHT" => JoinType::Right,
            "INNER" => JoinType::Inner,
            _ => JoinType::Left,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Inner => "INNER",
        }
    }
}

/// Sort direction. Anything unrecognized is treated as `ASC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse_lenient(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("DESC") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
}

/// An ORDER BY item; `expression` is a validated column or caller-supplied text.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub expression: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitClause {
    pub count: u64,
    pub offset: Option<u64>,
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {}", self.kind.as_sql(), self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        write!(f, " ON {}", self.on)
    }
}

impl fmt::Display for LimitClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIMIT {}", self.count)?;
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}
