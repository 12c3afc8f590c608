use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use futures_util::future::join_all;
use serde_json::Value;

use crate::domain::order::Order;
use crate::domain::product::Product;
use crate::store::{self, DocumentStore, StoreError};

// ============================================================================
// Sales & Revenue Statistics
// ============================================================================
//
// Per-product sold-quantity aggregation and revenue-over-time aggregation,
// joined with the current inventory ledger where relevant. Pure read path:
// no writes, no caching.
//
// Order dates are stored as `DD/MM/YYYY` strings; they are parsed and
// compared as dates rather than range-queried lexicographically, which
// would mis-order across month boundaries.
//
// ============================================================================

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub image_url: String,
    pub total_sold: u32,
    /// Sold quantity per size label.
    pub size_breakdown: BTreeMap<String, u32>,
    /// Units currently on hand across all ledger sizes.
    pub inventory: u32,
}

impl ProductSales {
    /// Best-selling size label with its sold count.
    pub fn best_size(&self) -> Option<(&str, u32)> {
        self.size_breakdown
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(label, count)| (label.as_str(), *count))
    }
}

/// Aggregate sold quantities per product for orders placed between
/// `start` and `end` inclusive. Orders whose date does not parse are
/// skipped with a warning. Results are sorted by total sold, descending.
pub async fn sales_between(
    store: &dyn DocumentStore,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ProductSales>, StoreError> {
    let docs = store.list(store::ORDERS).await?;

    let mut in_range = Vec::new();
    for doc in &docs {
        let order = match Order::from_document(doc) {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(order_id = %doc.id, error = %err, "skipping undecodable order");
                continue;
            }
        };
        match parse_order_date(&order) {
            Some(date) if date >= start && date <= end => in_range.push(order),
            _ => {}
        }
    }

    // total sold and per-size breakdown, keyed by product id
    let mut sold: BTreeMap<String, (u32, BTreeMap<String, u32>)> = BTreeMap::new();
    for order in &in_range {
        let path = store::order_details_path(&order.customer_uid);
        let details = store
            .query(&path, store::FIELD_ORDER_ID, &Value::from(order.id.clone()))
            .await?;
        for doc in &details {
            let item = match crate::domain::order::OrderLineItem::from_document(doc) {
                Ok(item) => item,
                Err(err) => {
                    tracing::warn!(detail_id = %doc.id, error = %err, "skipping undecodable line item");
                    continue;
                }
            };
            let entry = sold.entry(item.product_id.clone()).or_default();
            for size in &item.sizes {
                // same overflow posture as the ledger restock path
                entry.0 = entry.0.saturating_add(size.quantity);
                let per_size = entry.1.entry(size.label.clone()).or_default();
                *per_size = per_size.saturating_add(size.quantity);
            }
        }
    }

    // Product lookups carry no ordering dependency, so they run joined.
    let lookups = sold.keys().map(|id| store.get(store::PRODUCTS, id));
    let product_docs = join_all(lookups).await;

    let mut report = Vec::with_capacity(sold.len());
    for ((product_id, (total_sold, size_breakdown)), doc) in sold.into_iter().zip(product_docs) {
        let product = match doc? {
            Some(doc) => Product::from_document(&doc).ok(),
            None => None,
        };
        let (name, image_url, inventory) = match &product {
            Some(p) => (p.name.clone(), p.image_url.clone(), p.inventory()),
            None => (String::new(), String::new(), 0),
        };
        report.push(ProductSales {
            product_id,
            name,
            image_url,
            total_sold,
            size_breakdown,
            inventory,
        });
    }

    report.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));
    Ok(report)
}

/// Granularity of a revenue bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFrame {
    Day,
    Month,
    Year,
}

impl TimeFrame {
    /// Bucket key (a representative date, for chronological ordering) and
    /// its display label.
    fn bucket(self, date: NaiveDate) -> (NaiveDate, String) {
        match self {
            TimeFrame::Day => (date, date.format("%d/%m/%Y").to_string()),
            TimeFrame::Month => (
                date.with_day(1).unwrap_or(date),
                date.format("%m/%Y").to_string(),
            ),
            TimeFrame::Year => (
                NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
                date.format("%Y").to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueBucket {
    pub label: String,
    pub revenue: f64,
}

#[derive(Debug, Clone)]
pub struct RevenueReport {
    pub total: f64,
    /// Buckets in chronological order.
    pub buckets: Vec<RevenueBucket>,
}

/// Sum order totals (`tongtien`) per day, month, or year. `range` of
/// `None` covers every order; bounds are inclusive. Orders whose date
/// does not parse are skipped with a warning.
pub async fn revenue_between(
    store: &dyn DocumentStore,
    range: Option<(NaiveDate, NaiveDate)>,
    frame: TimeFrame,
) -> Result<RevenueReport, StoreError> {
    let docs = store.list(store::ORDERS).await?;

    let mut buckets: BTreeMap<NaiveDate, RevenueBucket> = BTreeMap::new();
    let mut total = 0.0;
    for doc in &docs {
        let order = match Order::from_document(doc) {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(order_id = %doc.id, error = %err, "skipping undecodable order");
                continue;
            }
        };
        let date = match parse_order_date(&order) {
            Some(date) => date,
            None => continue,
        };
        if let Some((start, end)) = range {
            if date < start || date > end {
                continue;
            }
        }

        let (key, label) = frame.bucket(date);
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| RevenueBucket { label, revenue: 0.0 });
        bucket.revenue += order.total;
        total += order.total;
    }

    Ok(RevenueReport { total, buckets: buckets.into_values().collect() })
}

fn parse_order_date(order: &Order) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(&order.ordered_on, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::warn!(order_id = %order.id, date = %order.ordered_on, error = %err, "skipping order with unparsable date");
            None
        }
    }
}
