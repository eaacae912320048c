//! SQL rendering of predicate trees.

use serde_json::Value;

use super::{Filter, Predicate, Term};
use crate::traits::Expression;

fn render_terms(terms: &[Term], params: &mut Vec<Value>) -> String {
    let mut parts = Vec::with_capacity(terms.len());

    for (idx, term) in terms.iter().enumerate() {
        let sql = term.predicate.to_sql(params);
        if idx == 0 {
            parts.push(sql);
        } else {
            parts.push(format!("{} {}", term.connective.as_sql(), sql));
        }
    }

    parts.join(" ")
}

impl Expression for Predicate {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                params.push(value.clone());
                format!("{} {} ?", column, op.as_sql())
            }
            Predicate::Like { column, needle } => {
                params.push(Value::String(format!("%{}%", needle)));
                format!("{} LIKE ?", column)
            }
            Predicate::In { column, values } => {
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().cloned());
                format!("{} IN ({})", column, placeholders)
            }
            Predicate::Group(terms) => format!("({})", render_terms(terms, params)),
        }
    }
}

impl Expression for Filter {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        render_terms(self.terms(), params)
    }
}
