use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StoreDocument, StoreError};

// ============================================================================
// Order Record & Status Lifecycle
// ============================================================================

/// Lifecycle status of an order. Serialized as the bare wire integer
/// (`trangthai`) the hosted store already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OrderStatus {
    Processing = 1,
    Shipping = 2,
    Delivered = 3,
    Cancelled = 4,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Processing,
        OrderStatus::Shipping,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Delivered and Cancelled admit no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Allowed-from → allowed-to transition table for plain status edits.
    /// Transitions move toward a terminal state except for the
    /// Processing↔Shipping adjustment; saving the current status again is
    /// a permitted no-op. Cancelled is never a direct target here: reaching
    /// it restores inventory, which only the cancel operation does.
    pub fn can_become(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Delivered | Cancelled, _) => false,
            (_, Cancelled) => false,
            (Processing | Shipping, Processing | Shipping | Delivered) => true,
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OrderStatus::Processing),
            2 => Ok(OrderStatus::Shipping),
            3 => Ok(OrderStatus::Delivered),
            4 => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status code: {}", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One customer purchase, stored in the `HoaDon` collection. Field names
/// follow the deployed store schema; the document id lives outside the
/// field map and is filled in after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(skip)]
    pub id: String,

    #[serde(rename = "hoten")]
    pub customer_name: String,

    #[serde(rename = "sdt")]
    pub phone: String,

    #[serde(rename = "diachi", default)]
    pub address: String,

    /// Order date as the store records it: `DD/MM/YYYY`.
    #[serde(rename = "ngaydat", default)]
    pub ordered_on: String,

    #[serde(rename = "tongtien", default, deserialize_with = "deserialize_amount")]
    pub total: f64,

    /// Customer partition key; line items live under this partition.
    #[serde(rename = "UID")]
    pub customer_uid: String,

    #[serde(rename = "trangthai")]
    pub status: OrderStatus,
}

impl Order {
    pub fn from_document(doc: &StoreDocument) -> Result<Self, StoreError> {
        let mut order: Order = doc.decode()?;
        order.id = doc.id.clone();
        Ok(order)
    }
}

/// Deployed documents carry `tongtien` either as a number or as a
/// dot-formatted string like `"450.000"`; accept both.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("amount out of range")),
        Value::String(s) => s
            .replace('.', "")
            .trim()
            .parse::<f64>()
            .map_err(|err| D::Error::custom(format!("invalid amount {:?}: {}", s, err))),
        Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!("invalid amount: {}", other))),
    }
}
