mod errors;
mod line_item;
mod model;

pub use errors::OrderError;
pub use line_item::{LineItemView, OrderLineItem, SizeQuantity};
pub use model::{Order, OrderStatus};
