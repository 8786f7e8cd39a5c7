//! An in-process record store implementing [`GridQuery`] over BSON
//! documents. Backs tests, demos and small static datasets.

mod eval;
mod expression;

use std::sync::{Arc, RwLock};

use bson::{Bson, Document};
use slate_query::{FilterNode, Query, Sort};

use crate::error::GridError;
use crate::query::{GridQuery, GridRow, get_path};
use expression::Expression;

#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    docs: Arc<RwLock<Vec<Document>>>,
    query: Query,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, docs: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            docs: Arc::new(RwLock::new(docs)),
            query: Query::default(),
        }
    }

    /// Sets one (possibly dotted) field on the record with the given id.
    /// Returns whether a record was found.
    pub fn update_field(&self, id: &str, field: &str, value: Bson) -> Result<bool, GridError> {
        let mut docs = self
            .docs
            .write()
            .map_err(|e| GridError::Store(e.to_string()))?;
        match docs.iter_mut().find(|doc| doc.id() == id) {
            Some(doc) => {
                set_path(doc, field, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn snapshot(&self) -> Result<Vec<Document>, GridError> {
        Ok(self
            .docs
            .read()
            .map_err(|e| GridError::Store(e.to_string()))?
            .clone())
    }

    fn evaluate(&self, paginate: bool) -> Result<Vec<Document>, GridError> {
        let expr = Expression::compile_all(&self.query.filters)?;
        let docs = self
            .docs
            .read()
            .map_err(|e| GridError::Store(e.to_string()))?;

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|doc| eval::matches(doc, &expr))
            .cloned()
            .collect();
        drop(docs);

        if !self.query.sort.is_empty() {
            matched.sort_by(|a, b| compare(&self.query.sort, a, b));
        }

        if !paginate {
            return Ok(matched);
        }
        let skip = self.query.skip.unwrap_or(0);
        let take = self.query.take.unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }
}

impl GridQuery for MemoryCollection {
    type Row = Document;

    fn model_name(&self) -> String {
        self.name.clone()
    }

    fn filter(mut self, node: FilterNode) -> Self {
        self.query.push(node);
        self
    }

    fn sort(mut self, field: &str, way: i64) -> Self {
        self.query.sort.push(Sort::new(field, way));
        self
    }

    fn skip(mut self, skip: usize) -> Self {
        self.query.skip = Some(skip);
        self
    }

    fn limit(mut self, limit: usize) -> Self {
        self.query.take = Some(limit);
        self
    }

    async fn count(&self) -> Result<u64, GridError> {
        Ok(self.evaluate(false)?.len() as u64)
    }

    async fn find(&self) -> Result<Vec<Document>, GridError> {
        self.evaluate(true)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, GridError> {
        let docs = self
            .docs
            .read()
            .map_err(|e| GridError::Store(e.to_string()))?;
        Ok(docs.iter().find(|doc| doc.id() == id).cloned())
    }
}

fn compare(sorts: &[Sort], a: &Document, b: &Document) -> std::cmp::Ordering {
    for sort in sorts {
        let ord = eval::sort_cmp(get_path(a, &sort.field), get_path(b, &sort.field));
        let ord = if sort.is_ascending() { ord } else { ord.reverse() };
        if ord.is_ne() {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}

fn set_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Ok(child) = doc.get_document_mut(head) {
                set_path(child, rest, value);
            }
        }
    }
}
