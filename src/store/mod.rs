mod client;
mod memory;

pub use client::{DocumentStore, Fields, SnapshotFeed, StoreDocument, StoreError};
pub use memory::MemoryStore;

/// Collection of order records.
pub const ORDERS: &str = "HoaDon";
/// Collection of products, each carrying the per-size inventory ledger.
pub const PRODUCTS: &str = "SanPham";
/// Field on a line-item document holding the owning order id.
pub const FIELD_ORDER_ID: &str = "id_hoadon";
/// Field on an order document holding the lifecycle status code.
pub const FIELD_STATUS: &str = "trangthai";

/// Path of the per-customer order-detail partition.
pub fn order_details_path(customer_uid: &str) -> String {
    format!("ChitietHoaDon/{}/ALL", customer_uid)
}
