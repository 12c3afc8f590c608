use crate::domain::order::OrderStatus;
use crate::lifecycle::CancelStep;
use crate::store::StoreError;

// ============================================================================
// Order Lifecycle Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The caller saved without selecting a status. Rejected locally; no
    /// store call is made.
    #[error("no status selected")]
    NoStatusSelected,

    /// Delivered and Cancelled orders admit no further mutation.
    #[error("order {id} is {status} and cannot be modified")]
    TerminalStatus { id: String, status: OrderStatus },

    #[error("order {id} cannot move from {from} to {to}")]
    InvalidTransition { id: String, from: OrderStatus, to: OrderStatus },

    /// Cancellation is only permitted while the order is still processing.
    #[error("order {id} is {status} and can no longer be cancelled")]
    NotCancellable { id: String, status: OrderStatus },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The multi-step cancellation stopped partway: some products may be
    /// restocked while the order status is unchanged. The completed steps
    /// are carried so the half-applied state is explicit.
    #[error("cancellation of order {order_id} interrupted after {} step(s): {source}", .completed.len())]
    CancellationInterrupted {
        order_id: String,
        completed: Vec<CancelStep>,
        #[source]
        source: StoreError,
    },
}
