mod filter;
mod operator;
mod query;
mod sort;

pub use filter::{Filter, FilterGroup, FilterNode, LogicalOp};
pub use operator::Operator;
pub use query::Query;
pub use sort::Sort;
