mod cancellation;
mod controller;

pub use cancellation::{CancelStep, CancellationReport};
pub use controller::OrderLifecycleController;
