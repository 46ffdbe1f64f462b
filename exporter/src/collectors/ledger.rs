use crate::types::QueryRecord;

/// Append-only list of external calls attempted during one cycle.
///
/// Every call a collector makes goes through [`QueryLedger::record`], so an
/// attempt can never be dropped from the ledger, whatever the outcome.
#[derive(Clone, Debug, Default)]
pub struct QueryLedger {
    records: Vec<QueryRecord>,
}

impl QueryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of `result` under `action` and passes it through.
    pub fn record<T, E>(&mut self, action: &str, result: Result<T, E>) -> Result<T, E> {
        self.records.push(QueryRecord {
            action: action.to_string(),
            succeeded: result.is_ok(),
        });
        result
    }

    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&QueryRecord> {
        self.records.last()
    }

    pub fn into_records(self) -> Vec<QueryRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_order_and_outcome() {
        let mut ledger = QueryLedger::new();
        let ok: Result<u8, ()> = ledger.record("first", Ok(1));
        let err: Result<u8, ()> = ledger.record("second", Err(()));

        assert_eq!(ok, Ok(1));
        assert_eq!(err, Err(()));
        assert_eq!(
            ledger.into_records(),
            vec![QueryRecord::success("first"), QueryRecord::failure("second")]
        );
    }

    #[test]
    fn last_reflects_latest_attempt() {
        let mut ledger = QueryLedger::new();
        assert!(ledger.last().is_none());
        let _ = ledger.record::<(), ()>("a", Err(()));
        assert_eq!(ledger.last(), Some(&QueryRecord::failure("a")));
    }
}
