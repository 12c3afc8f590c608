use serde::{Deserialize, Serialize};

use crate::domain::product::Product;
use crate::store::{StoreDocument, StoreError};

/// One (size label, quantity) pair, shared between the product ledger and
/// order line items. Quantities are non-negative by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeQuantity {
    #[serde(rename = "size")]
    pub label: String,

    #[serde(rename = "soluong")]
    pub quantity: u32,
}

impl SizeQuantity {
    pub fn new(label: impl Into<String>, quantity: u32) -> Self {
        Self { label: label.into(), quantity }
    }
}

/// One product line within an order's detail partition
/// (`ChitietHoaDon/{uid}/ALL`). Read-only to the lifecycle core except as
/// input to cancellation restock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    #[serde(skip)]
    pub id: String,

    #[serde(rename = "id_hoadon")]
    pub order_id: String,

    #[serde(rename = "id_product")]
    pub product_id: String,

    #[serde(default)]
    pub sizes: Vec<SizeQuantity>,
}

impl OrderLineItem {
    pub fn from_document(doc: &StoreDocument) -> Result<Self, StoreError> {
        let mut item: OrderLineItem = doc.decode()?;
        item.id = doc.id.clone();
        Ok(item)
    }
}

/// Line item joined with its product snapshot for the detail view. The
/// snapshot is resolved at read time; a product that has since vanished
/// leaves `product` empty instead of failing the whole view.
#[derive(Debug, Clone)]
pub struct LineItemView {
    pub line_item: OrderLineItem,
    pub product: Option<Product>,
}

impl LineItemView {
    /// Line total priced against the snapshot; zero when the product is gone.
    pub fn line_total(&self) -> f64 {
        let price = self.product.as_ref().map(|p| p.price).unwrap_or(0.0);
        let quantity: u32 = self.line_item.sizes.iter().map(|s| s.quantity).sum();
        price * f64::from(quantity)
    }
}
