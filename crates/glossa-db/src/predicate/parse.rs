//! Recursive-descent parse of filter mappings into predicate terms.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::{CmpOp, Connective, Predicate, Term};
use crate::helpers::{is_scalar, scalar_text};

static LEAF_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(!)?([A-Za-z0-9_.]+)(-in|[<>!%])?$").expect("unable to compile filter key regex")
});

fn group_connective(key: &str) -> Connective {
    if key.starts_with('!') {
        Connective::Or
    } else {
        Connective::And
    }
}

pub(super) fn parse_terms(map: &Map<String, Value>) -> Vec<Term> {
    let mut terms = Vec::with_capacity(map.len());

    for (key, value) in map {
        let term = match value {
            Value::Object(inner) => {
                let children = parse_terms(inner);
                if children.is_empty() {
                    None
                } else {
                    Some(Term::new(group_connective(key), Predicate::Group(children)))
                }
            }
            _ => parse_leaf(key, value),
        };

        match term {
            Some(term) => terms.push(term),
            None => debug!("Dropping filter condition `{}`", key),
        }
    }

    terms
}

fn parse_leaf(key: &str, value: &Value) -> Option<Term> {
    let caps = LEAF_KEY_RE.captures(key)?;
    let connective = if caps.get(1).is_some() {
        Connective::Or
    } else {
        Connective::And
    };
    let column = caps[2].to_string();
    let suffix = caps.get(3).map(|m| m.as_str());

    let predicate = match (suffix, value) {
        (Some("-in"), Value::Array(items)) => {
            if !items.iter().all(is_scalar) {
                return None;
            }
            Predicate::In {
                column,
                values: items.clone(),
            }
        }
        (Some("-in"), _) | (_, Value::Array(_)) => return None,
        (None, v) => Predicate::compare(column, CmpOp::Eq, v.clone()),
        (Some(">"), v) => Predicate::compare(column, CmpOp::Gt, v.clone()),
        (Some("<"), v) => Predicate::compare(column, CmpOp::Lt, v.clone()),
        (Some("!"), v) => Predicate::compare(column, CmpOp::Ne, v.clone()),
        (Some("%"), v) => Predicate::like(column, scalar_text(v)),
        (Some(_), _) => return None,
    };

    Some(Term::new(connective, predicate))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_leaf_keys() {
        let term = parse_leaf("!views>", &json!(3)).unwrap();
        assert_eq!(term.connective, Connective::Or);
        assert_eq!(term.predicate, Predicate::gt("views", 3));

        let term = parse_leaf("status!", &json!("draft")).unwrap();
        assert_eq!(term.connective, Connective::And);
        assert_eq!(term.predicate, Predicate::ne("status", "draft"));

        let term = parse_leaf("title%", &json!(42)).unwrap();
        assert_eq!(term.predicate, Predicate::like("title", "42"));

        let term = parse_leaf("!id-in", &json!([1, 2])).unwrap();
        assert_eq!(term.connective, Connective::Or);
        assert_eq!(term.predicate, Predicate::is_in("id", [1, 2]));
    }

    #[test]
    fn test_parse_leaf_rejects() {
        assert!(parse_leaf("a b", &json!(1)).is_none());
        assert!(parse_leaf("!!a", &json!(1)).is_none());
        assert!(parse_leaf("a-in", &json!("1,2")).is_none());
        assert!(parse_leaf("a-in", &json!([[1], 2])).is_none());
        assert!(parse_leaf("a>", &json!([1])).is_none());
        assert!(parse_leaf("a=", &json!(1)).is_none());
    }

    #[test]
    fn test_group_connective_from_key() {
        let map = json!({ "a": 1, "!grp": { "b": 2 }, "grp2": { "c": 3 } });
        let terms = parse_terms(map.as_object().unwrap());
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[1].connective, Connective::Or);
        assert_eq!(terms[2].connective, Connective::And);
        assert!(matches!(terms[1].predicate, Predicate::Group(ref t) if t.len() == 1));
    }
}
