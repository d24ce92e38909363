use crate::ops::Op;
use crate::range::Range;

/// One committed edit: the ops that were applied and the ops that revert them,
/// already in the order they must be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub ops: Vec<Op>,
    pub inverse_ops: Vec<Op>,
    pub selection_before: Option<Range>,
    pub selection_after: Option<Range>,
    pub source: Option<String>,
}

/// Receives a record after every top-level transform that changed something.
pub trait HistorySink: Send {
    fn record(&mut self, record: ChangeRecord);
}

impl HistorySink for Vec<ChangeRecord> {
    fn record(&mut self, record: ChangeRecord) {
        self.push(record);
    }
}

impl<T: HistorySink> HistorySink for std::sync::Arc<std::sync::Mutex<T>> {
    fn record(&mut self, record: ChangeRecord) {
        match self.lock() {
            Ok(mut sink) => sink.record(record),
            Err(poisoned) => poisoned.into_inner().record(record),
        }
    }
}
