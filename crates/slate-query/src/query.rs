use serde::{Deserialize, Serialize};

use crate::filter::FilterNode;
use crate::sort::Sort;

/// Accumulated query state: every clause is ANDed, sorts apply in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<FilterNode>,
    #[serde(default)]
    pub sort: Vec<Sort>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl Query {
    pub fn push(&mut self, node: FilterNode) {
        self.filters.push(node);
    }
}
