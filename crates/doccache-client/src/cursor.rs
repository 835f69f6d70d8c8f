//! Restartable result cursors

use doccache_core::Document;
use std::sync::Arc;

/// An independently-restartable view over a multi-document result.
///
/// Cache hits hand out a fresh cursor over the shared cached list rather
/// than the list itself, so iterating one cursor never consumes state
/// another caller can observe, and a cursor can be rewound and iterated
/// again with consistent results.
#[derive(Debug, Clone)]
pub struct DocumentCursor {
    documents: Arc<Vec<Document>>,
    position: usize,
}

impl DocumentCursor {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(documents),
            position: 0,
        }
    }

    /// Reset iteration to the first document
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Total number of documents in the result
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Iterator for DocumentCursor {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        let doc = self.documents.get(self.position)?.clone();
        self.position += 1;
        Some(doc)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.documents.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DocumentCursor {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iterates_in_order() {
        let cursor = DocumentCursor::new(vec![json!({"i": 1}), json!({"i": 2}), json!({"i": 3})]);
        let collected: Vec<_> = cursor.collect();
        assert_eq!(collected, vec![json!({"i": 1}), json!({"i": 2}), json!({"i": 3})]);
    }

    #[test]
    fn test_rewind_restarts_iteration() {
        let mut cursor = DocumentCursor::new(vec![json!({"i": 1}), json!({"i": 2})]);
        assert_eq!(cursor.next(), Some(json!({"i": 1})));
        assert_eq!(cursor.next(), Some(json!({"i": 2})));
        assert_eq!(cursor.next(), None);

        cursor.rewind();
        assert_eq!(cursor.next(), Some(json!({"i": 1})));
    }

    #[test]
    fn test_clones_iterate_independently() {
        let mut a = DocumentCursor::new(vec![json!({"i": 1}), json!({"i": 2})]);
        a.next();
        let mut b = a.clone();

        // Each clone keeps its own position over the shared list.
        assert_eq!(a.next(), Some(json!({"i": 2})));
        assert_eq!(b.next(), Some(json!({"i": 2})));
    }

    #[test]
    fn test_len() {
        let cursor = DocumentCursor::new(vec![json!({}), json!({})]);
        assert_eq!(cursor.len(), 2);
        assert!(!cursor.is_empty());
    }
}
