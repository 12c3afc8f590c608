// ============================================================================
// Cancellation Step Log
// ============================================================================
//
// The cancellation algorithm spans several documents with no transaction
// around them. Each completed step is recorded so that a mid-algorithm
// failure surfaces exactly how far the work got instead of leaving a
// silently half-applied state. There is no rollback and no automatic
// retry; a later retry rolls forward from a consistent read.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelStep {
    /// Line items for the order were read from the customer partition.
    FetchedLineItems { count: usize },
    /// One product's ledger was restocked and persisted.
    RestockedProduct { product_id: String, restored: u32 },
    /// The order status was persisted as Cancelled.
    MarkedCancelled,
}

/// Outcome of a completed cancellation.
#[derive(Debug, Clone)]
pub struct CancellationReport {
    pub order_id: String,
    pub steps: Vec<CancelStep>,
}

impl CancellationReport {
    /// Total quantity put back into product ledgers.
    pub fn total_restored(&self) -> u32 {
        self.steps
            .iter()
            .map(|step| match step {
                CancelStep::RestockedProduct { restored, .. } => *restored,
                _ => 0,
            })
            .sum()
    }
}
