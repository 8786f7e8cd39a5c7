use serde::{Deserialize, Serialize};

/// A sort key with a signed direction.
///
/// Positive `way` sorts ascending, negative descending. The magnitude is
/// carried through untouched so stores that weight keys can use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub way: i64,
}

impl Sort {
    pub fn new(field: impl Into<String>, way: i64) -> Self {
        Self {
            field: field.into(),
            way,
        }
    }

    pub fn is_ascending(&self) -> bool {
        self.way >= 0
    }
}
