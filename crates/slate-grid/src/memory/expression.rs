use bson::{Bson, Document};
use regex::Regex;
use slate_query::{FilterGroup, FilterNode, LogicalOp, Operator};

use crate::error::GridError;

/// A filter node with its regexes compiled, ready to evaluate.
#[derive(Debug, Clone)]
pub(crate) enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Eq(String, Bson),
    Ne(String, Bson),
    In(String, Vec<Bson>),
    Nin(String, Vec<Bson>),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    Regex(String, Regex),
    Elem(String, Document),
}

impl Expression {
    pub(crate) fn compile_all(nodes: &[FilterNode]) -> Result<Expression, GridError> {
        let children = nodes
            .iter()
            .map(Expression::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expression::And(children))
    }

    pub(crate) fn compile(node: &FilterNode) -> Result<Expression, GridError> {
        match node {
            FilterNode::Group(FilterGroup { logical, children }) => {
                let children = children
                    .iter()
                    .map(Expression::compile)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match logical {
                    LogicalOp::And => Expression::And(children),
                    LogicalOp::Or => Expression::Or(children),
                })
            }
            FilterNode::Condition(filter) => {
                let field = filter.field.clone();
                let value = filter.value.clone();
                Ok(match filter.operator {
                    Operator::Eq => Expression::Eq(field, value),
                    Operator::Ne => Expression::Ne(field, value),
                    Operator::In => Expression::In(field, list(value)),
                    Operator::Nin => Expression::Nin(field, list(value)),
                    Operator::Gt => Expression::Gt(field, value),
                    Operator::Gte => Expression::Gte(field, value),
                    Operator::Lt => Expression::Lt(field, value),
                    Operator::Lte => Expression::Lte(field, value),
                    Operator::Match => match value {
                        Bson::String(pattern) => {
                            let re = Regex::new(&pattern).map_err(|e| {
                                GridError::Store(format!("invalid match pattern on {field}: {e}"))
                            })?;
                            Expression::Regex(field, re)
                        }
                        Bson::RegularExpression(re) => {
                            let pattern = if re.options.as_str().contains('i') {
                                format!("(?i){}", re.pattern.as_str())
                            } else {
                                re.pattern.as_str().to_string()
                            };
                            let re = Regex::new(&pattern).map_err(|e| {
                                GridError::Store(format!("invalid match pattern on {field}: {e}"))
                            })?;
                            Expression::Regex(field, re)
                        }
                        _ => {
                            return Err(GridError::Store(format!(
                                "match on {field} needs a string pattern"
                            )));
                        }
                    },
                    Operator::Elem => match value {
                        Bson::Document(doc) => Expression::Elem(field, doc),
                        _ => {
                            return Err(GridError::Store(format!(
                                "elem on {field} needs a document"
                            )));
                        }
                    },
                })
            }
        }
    }
}

fn list(value: Bson) -> Vec<Bson> {
    match value {
        Bson::Array(items) => items,
        single => vec![single],
    }
}
