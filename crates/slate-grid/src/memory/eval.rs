use std::cmp::Ordering;

use bson::{Bson, Document};

use super::expression::Expression;
use crate::query::get_path;

/// Evaluate whether a document matches the given expression.
pub(crate) fn matches(doc: &Document, expr: &Expression) -> bool {
    match expr {
        Expression::And(children) => children.iter().all(|child| matches(doc, child)),
        Expression::Or(children) => children.iter().any(|child| matches(doc, child)),
        Expression::Eq(field, val) => field_eq(doc, field, val),
        Expression::Ne(field, val) => !field_eq(doc, field, val),
        Expression::In(field, vals) => vals.iter().any(|val| field_eq(doc, field, val)),
        Expression::Nin(field, vals) => !vals.iter().any(|val| field_eq(doc, field, val)),
        Expression::Gt(field, val)
        | Expression::Gte(field, val)
        | Expression::Lt(field, val)
        | Expression::Lte(field, val) => {
            let predicate: fn(Ordering) -> bool = match expr {
                Expression::Gt(..) => |o| o == Ordering::Greater,
                Expression::Gte(..) => |o| o != Ordering::Less,
                Expression::Lt(..) => |o| o == Ordering::Less,
                Expression::Lte(..) => |o| o != Ordering::Greater,
                _ => unreachable!(),
            };
            match get_path(doc, field) {
                Some(Bson::Array(items)) => items
                    .iter()
                    .any(|item| value_cmp(item, val).is_some_and(predicate)),
                Some(stored) => value_cmp(stored, val).is_some_and(predicate),
                None => false,
            }
        }
        Expression::Regex(field, re) => match get_path(doc, field) {
            Some(Bson::String(s)) => re.is_match(s),
            Some(Bson::Array(items)) => items
                .iter()
                .any(|item| matches!(item, Bson::String(s) if re.is_match(s))),
            _ => false,
        },
        Expression::Elem(field, expected) => match get_path(doc, field) {
            Some(Bson::Array(items)) => items.iter().any(|item| match item {
                Bson::Document(elem) => expected.iter().all(|(key, val)| field_eq(elem, key, val)),
                _ => false,
            }),
            _ => false,
        },
    }
}

fn field_eq(doc: &Document, field: &str, val: &Bson) -> bool {
    // null matches both missing fields and explicit null values
    if matches!(val, Bson::Null) {
        return matches!(get_path(doc, field), None | Some(Bson::Null));
    }
    match get_path(doc, field) {
        Some(Bson::Array(items)) => {
            items.iter().any(|item| value_eq(item, val))
                || matches!(val, Bson::Array(expected) if expected == items)
        }
        Some(stored) => value_eq(stored, val),
        None => false,
    }
}

/// Equality: stored value vs query value, with string coercion for values
/// that arrived through a query string.
fn value_eq(stored: &Bson, query: &Bson) -> bool {
    match (stored, query) {
        (Bson::String(a), Bson::String(b)) => a == b,
        (Bson::Boolean(a), Bson::Boolean(b)) => a == b,
        (Bson::DateTime(a), Bson::DateTime(b)) => a.timestamp_millis() == b.timestamp_millis(),
        (Bson::ObjectId(a), Bson::ObjectId(b)) => a == b,
        (Bson::ObjectId(a), Bson::String(s)) => a.to_hex() == *s,

        // ── Cross-type coercion: String → stored type ───────────
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), Bson::String(s)) => {
            s.parse::<f64>().is_ok_and(|b| number(stored) == Some(b))
        }
        (Bson::Boolean(a), Bson::String(s)) => match s.as_str() {
            "true" => *a,
            "false" => !*a,
            _ => false,
        },

        (Bson::Document(a), Bson::Document(b)) => a == b,
        _ => match (number(stored), number(query)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Ordering between a stored value and a query value of a comparable type.
fn value_cmp(stored: &Bson, query: &Bson) -> Option<Ordering> {
    match (stored, query) {
        (Bson::String(a), Bson::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        (Bson::DateTime(a), Bson::String(s)) => bson::DateTime::parse_rfc3339_str(s)
            .ok()
            .map(|dt| a.timestamp_millis().cmp(&dt.timestamp_millis())),
        (_, Bson::String(s)) => {
            let b = s.parse::<f64>().ok()?;
            number(stored)?.partial_cmp(&b)
        }
        _ => number(stored)?.partial_cmp(&number(query)?),
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Total order used for sorting: missing and null first, then numbers,
/// strings, documents, arrays, booleans, dates.
pub(crate) fn sort_cmp(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Some(x), Some(y)) => match (number(x), number(y)) {
            (Some(nx), Some(ny)) => nx.partial_cmp(&ny).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

fn rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::Boolean(_)) => 5,
        Some(Bson::DateTime(_)) => 6,
        Some(_) => 7,
    }
}
