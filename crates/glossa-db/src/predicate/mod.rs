//! Predicate compiler.
//!
//! Filters arrive as nested JSON mappings whose keys carry the column, an
//! optional operator suffix and an optional connective prefix:
//!
//! | key            | value    | condition                        |
//! |----------------|----------|----------------------------------|
//! | `col`          | scalar   | `AND col = ?`                    |
//! | `!col`         | scalar   | `OR col = ?`                     |
//! | `col>` `col<`  | scalar   | `AND col > ?` / `AND col < ?`    |
//! | `col!`         | scalar   | `AND col != ?`                   |
//! | `col%`         | scalar   | `AND col LIKE ?` (`%value%`)     |
//! | `col-in`       | sequence | `AND col IN (?, ?, ...)`         |
//! | `any` / `!any` | mapping  | `AND ( ... )` / `OR ( ... )`     |
//!
//! The first condition of a group never carries a connective. Keys that do
//! not follow this grammar are dropped.
//!
//! [`Filter::parse`] builds a typed [`Predicate`] tree; rendering through
//! [`crate::traits::Expression`] emits the fragment and pushes exactly one
//! value per placeholder.

mod ops;
mod parse;

use serde_json::{Map, Value};

/// How a condition is joined to its preceding sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// Scalar comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
    Ne,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ne => "!=",
        }
    }
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> ?`
    Compare {
        column: String,
        op: CmpOp,
        value: Value,
    },
    /// `column LIKE ?`, bound as `%needle%`.
    Like { column: String, needle: String },
    /// `column IN (?, ...)`, one placeholder per member.
    In { column: String, values: Vec<Value> },
    /// Parenthesized list of terms.
    Group(Vec<Term>),
}

/// A predicate together with the connective joining it to the previous term.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub connective: Connective,
    pub predicate: Predicate,
}

impl Term {
    pub fn new(connective: Connective, predicate: Predicate) -> Self {
        Self {
            connective,
            predicate,
        }
    }
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Eq, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Gt, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Lt, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Ne, value)
    }

    pub fn compare(column: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn like(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Like {
            column: column.into(),
            needle: needle.into(),
        }
    }

    pub fn is_in<T, I>(column: impl Into<String>, values: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Group whose members are all joined with `AND`.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Group(
            predicates
                .into_iter()
                .map(|p| Term::new(Connective::And, p))
                .collect(),
        )
    }

    /// Group whose members are all joined with `OR`.
    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Group(
            predicates
                .into_iter()
                .enumerate()
                .map(|(i, p)| {
                    let connective = if i == 0 {
                        Connective::And
                    } else {
                        Connective::Or
                    };
                    Term::new(connective, p)
                })
                .collect(),
        )
    }

    /// Number of values this predicate binds.
    pub fn arity(&self) -> usize {
        match self {
            Predicate::Compare { .. } | Predicate::Like { .. } => 1,
            Predicate::In { values, .. } => values.len(),
            Predicate::Group(terms) => terms.iter().map(|t| t.predicate.arity()).sum(),
        }
    }
}

/// The top level of a filter: terms rendered without surrounding parentheses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a nested filter mapping. Malformed keys are dropped.
    pub fn parse(map: &Map<String, Value>) -> Self {
        Self {
            terms: parse::parse_terms(map),
        }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.terms.push(Term::new(Connective::And, predicate));
        self
    }

    pub fn or(mut self, predicate: Predicate) -> Self {
        self.terms.push(Term::new(Connective::Or, predicate));
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn arity(&self) -> usize {
        self.terms.iter().map(|t| t.predicate.arity()).sum()
    }
}

impl From<Predicate> for Filter {
    fn from(predicate: Predicate) -> Self {
        Filter::new().and(predicate)
    }
}
