//! Record transformer pipeline
//!
//! Applied to every record after parsing on read, and before serialization
//! on write.

use std::sync::Arc;

/// A type-preserving record transform
pub trait RecordTransformer<T>: Send + Sync {
    /// Transform one record
    fn transform(&self, record: T) -> T;
}

impl<T, F> RecordTransformer<T> for F
where
    F: Fn(T) -> T + Send + Sync,
{
    fn transform(&self, record: T) -> T {
        self(record)
    }
}

/// Transformer that returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> RecordTransformer<T> for Identity {
    fn transform(&self, record: T) -> T {
        record
    }
}

/// Applies a transformer across whole record sequences
pub struct TransformPipeline<T> {
    stages: Vec<Arc<dyn RecordTransformer<T>>>,
}

impl<T: 'static> TransformPipeline<T> {
    /// Create a pipeline that leaves records unchanged
    pub fn identity() -> Self {
        Self { stages: Vec::new() }
    }

    /// Create a pipeline with a single transformer
    pub fn new(transformer: impl RecordTransformer<T> + 'static) -> Self {
        Self::identity().then(transformer)
    }

    /// Append a transformer, run after the ones already present
    pub fn then(mut self, transformer: impl RecordTransformer<T> + 'static) -> Self {
        self.stages.push(Arc::new(transformer));
        self
    }

    /// Number of transform stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the pipeline is the identity
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Transform a single record through every stage
    pub fn apply_one(&self, record: T) -> T {
        self.stages
            .iter()
            .fold(record, |record, stage| stage.transform(record))
    }

    /// Transform a sequence, preserving order
    pub fn apply(&self, records: Vec<T>) -> Vec<T> {
        if self.stages.is_empty() {
            return records;
        }
        records.into_iter().map(|r| self.apply_one(r)).collect()
    }

    /// Transform a sequence with absent entries; absent entries pass through
    pub fn apply_optional(&self, records: Vec<Option<T>>) -> Vec<Option<T>> {
        if self.stages.is_empty() {
            return records;
        }
        records
            .into_iter()
            .map(|r| r.map(|r| self.apply_one(r)))
            .collect()
    }
}

impl<T: 'static> Default for TransformPipeline<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T> Clone for TransformPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T> std::fmt::Debug for TransformPipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_leaves_records() {
        let pipeline = TransformPipeline::<String>::identity();
        let records = vec!["a".to_string(), "b".to_string()];
        assert_eq!(pipeline.apply(records.clone()), records);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_closure_transform() {
        let pipeline = TransformPipeline::new(|s: String| s.to_uppercase());
        assert_eq!(
            pipeline.apply(vec!["john".to_string(), "alice".to_string()]),
            vec!["JOHN", "ALICE"]
        );
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = TransformPipeline::new(|n: i32| n + 1).then(|n: i32| n * 10);
        assert_eq!(pipeline.apply(vec![1, 2]), vec![20, 30]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_absent_records_pass_through() {
        let pipeline = TransformPipeline::new(|n: i32| n * 2);
        assert_eq!(
            pipeline.apply_optional(vec![Some(1), None, Some(3)]),
            vec![Some(2), None, Some(6)]
        );
    }

    #[test]
    fn test_explicit_identity_transformer() {
        let pipeline = TransformPipeline::new(Identity);
        assert_eq!(pipeline.apply(vec![7]), vec![7]);
    }
}
