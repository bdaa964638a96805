//! Result accumulator for one factory run.
//!
//! A pure state tracker that collects per-model outcomes in any order and
//! produces the aggregate once every model has settled. No I/O or locking
//! happens here; the accumulator is owned by the factory's aggregation task.

use adload_core::{AbstractCreative, AdLoadError};

use super::FactoryResult;

/// Collects per-model outcomes, indexed by model position.
#[derive(Debug)]
pub struct CreativeAccumulator {
    /// Outcomes indexed by model position.
    slots: Vec<Option<Result<AbstractCreative, AdLoadError>>>,
    /// Number of filled slots.
    settled: usize,
}

impl CreativeAccumulator {
    /// Create an accumulator expecting `expected` outcomes.
    pub fn new(expected: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(expected).collect(),
            settled: 0,
        }
    }

    /// Record the outcome for model `index` (first record wins).
    ///
    /// Returns `false` if the index is out of range or already settled.
    pub fn record(&mut self, index: usize, outcome: Result<AbstractCreative, AdLoadError>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(outcome);
                self.settled += 1;
                true
            }
            _ => false,
        }
    }

    /// Whether every model has an outcome.
    pub const fn is_settled(&self) -> bool {
        self.settled == self.slots.len()
    }

    /// Number of models still pending.
    pub const fn pending(&self) -> usize {
        self.slots.len() - self.settled
    }

    /// Produce the aggregate result (only meaningful once settled).
    ///
    /// Any failure fails the whole set: the error of the lowest-index failing
    /// model is returned and every built creative is dropped.
    pub fn finalize(self) -> FactoryResult {
        let mut creatives = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(Ok(creative)) => creatives.push(creative),
                Some(Err(error)) => return Err(error),
                None => {
                    return Err(AdLoadError::other(format!(
                        "creative model {index} never settled"
                    )));
                }
            }
        }
        Ok(creatives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adload_core::{CreativeBody, CreativeModel, HtmlCreative, TransactionId};
    use std::sync::Arc;

    fn creative(markup: &str) -> AbstractCreative {
        let model = Arc::new(CreativeModel::html(markup));
        let html = HtmlCreative::from_model(&model).unwrap();
        AbstractCreative::new(model, TransactionId::new(), CreativeBody::Html(html))
    }

    #[test]
    fn test_out_of_order_completion() {
        let mut acc = CreativeAccumulator::new(3);

        assert!(acc.record(2, Ok(creative("<p>2</p>"))));
        assert!(!acc.is_settled());
        assert!(acc.record(0, Ok(creative("<p>0</p>"))));
        assert!(!acc.is_settled());
        assert!(acc.record(1, Ok(creative("<p>1</p>"))));
        assert!(acc.is_settled());

        let creatives = acc.finalize().unwrap();
        let markup: Vec<_> = creatives
            .iter()
            .map(|c| c.as_html().unwrap().markup().to_string())
            .collect();
        assert_eq!(markup, vec!["<p>0</p>", "<p>1</p>", "<p>2</p>"]);
    }

    #[test]
    fn test_first_record_wins() {
        let mut acc = CreativeAccumulator::new(1);

        assert!(acc.record(0, Err(AdLoadError::malformed(0, "first"))));
        assert!(!acc.record(0, Ok(creative("<p>late</p>"))));
        assert_eq!(acc.pending(), 0);

        assert_eq!(acc.finalize().unwrap_err(), AdLoadError::malformed(0, "first"));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut acc = CreativeAccumulator::new(1);
        assert!(!acc.record(5, Ok(creative("<p/>"))));
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn test_lowest_index_failure_wins() {
        let mut acc = CreativeAccumulator::new(3);
        acc.record(2, Err(AdLoadError::unsupported_kind(2, "unknown")));
        acc.record(0, Ok(creative("<p/>")));
        acc.record(1, Err(AdLoadError::malformed(1, "no media")));

        assert_eq!(acc.finalize().unwrap_err().model_index(), Some(1));
    }

    #[test]
    fn test_unsettled_finalize_is_an_error() {
        let mut acc = CreativeAccumulator::new(2);
        acc.record(0, Ok(creative("<p/>")));
        assert!(acc.finalize().is_err());
    }
}
