use serde::{Deserialize, Serialize};

use crate::domain::order::SizeQuantity;
use crate::store::{StoreDocument, StoreError};

// ============================================================================
// Product & Inventory Ledger
// ============================================================================
//
// A product document in `SanPham` owns the per-size available-quantity
// ledger in its `sizes` array. The lifecycle core only ever mutates it by
// restocking cancelled quantities.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip)]
    pub id: String,

    #[serde(rename = "tensp", default)]
    pub name: String,

    #[serde(rename = "loaisp", default)]
    pub kind: String,

    #[serde(rename = "chatlieu", default)]
    pub material: String,

    #[serde(rename = "mota", default)]
    pub description: String,

    #[serde(rename = "giatien", default)]
    pub price: f64,

    #[serde(rename = "hinhanh", default)]
    pub image_url: String,

    #[serde(rename = "type", default)]
    pub category: String,

    /// Per-size available quantities.
    #[serde(default)]
    pub sizes: Vec<SizeQuantity>,
}

impl Product {
    pub fn from_document(doc: &StoreDocument) -> Result<Self, StoreError> {
        let mut product: Product = doc.decode()?;
        product.id = doc.id.clone();
        Ok(product)
    }

    /// Add returned quantities into the ledger, matched by size label.
    /// Labels the ledger does not carry contribute nothing; ledger entries
    /// absent from `returned` are left unchanged. Returns the total
    /// quantity actually restored.
    pub fn restock(&mut self, returned: &[SizeQuantity]) -> u32 {
        let mut restored = 0;
        for entry in &mut self.sizes {
            if let Some(r) = returned.iter().find(|r| r.label == entry.label) {
                entry.quantity = entry.quantity.saturating_add(r.quantity);
                restored += r.quantity;
            }
        }
        restored
    }

    /// Total units on hand across all sizes.
    pub fn inventory(&self) -> u32 {
        self.sizes.iter().map(|s| s.quantity).sum()
    }
}
