use serde::{Deserialize, Serialize};

/// Comparison operators a record store must understand.
///
/// `Match` takes a regex pattern string, `Elem` takes a sub-document that at
/// least one array element has to satisfy field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
    Match,
    Elem,
}
