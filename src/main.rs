use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod domain;
mod feed;
mod filter;
mod lifecycle;
mod stats;
mod store;

use domain::order::OrderStatus;
use feed::ChangeFeedNotifier;
use lifecycle::OrderLifecycleController;
use store::{DocumentStore, Fields, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,boutique_admin=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order lifecycle demo");

    let store = Arc::new(MemoryStore::new());
    seed_demo_data(store.as_ref()).await?;

    // === 1. Live order feed with new-order notifications ===
    let (tx, mut updates) = mpsc::unbounded_channel();
    let feed = store.subscribe(store::ORDERS);
    tokio::spawn(ChangeFeedNotifier::new().drive(feed, tx));

    let initial = updates.recv().await.expect("feed delivers initial snapshot");
    tracing::info!(orders = initial.orders.len(), "initial order list loaded");

    // === 2. Lifecycle operations ===
    let controller = OrderLifecycleController::new(store.clone());

    let orders = controller.fetch_orders().await?;
    let processing = filter::filter_orders(&orders, Some(OrderStatus::Processing), "");
    tracing::info!(count = processing.len(), "orders awaiting processing");

    let first = processing.first().expect("demo data seeds a processing order");
    tracing::info!(
        order_id = %first.id,
        customer = %first.customer_name,
        address = %first.address,
        total = first.total,
        "inspecting order"
    );
    let details = controller.fetch_order_details(first).await?;
    for view in &details {
        tracing::info!(
            product = %view.line_item.product_id,
            line_total = view.line_total(),
            "line item"
        );
    }

    controller.change_status(first, Some(OrderStatus::Shipping)).await?;
    tracing::info!(order_id = %first.id, "✅ order moved to shipping");

    // Cancel another processing order and watch the ledger restore.
    if let Some(second) = processing.get(1) {
        let report = controller.cancel(second).await?;
        tracing::info!(
            order_id = %report.order_id,
            restored = report.total_restored(),
            "✅ order cancelled"
        );
    }

    if let Some(update) = updates.recv().await {
        tracing::info!(
            orders = update.orders.len(),
            new_orders = update.new_orders.unwrap_or(0),
            "feed caught up after mutations"
        );
    }

    // === 3. Sales statistics ===
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2025, 3, 31).expect("valid date");
    for sales in stats::sales_between(store.as_ref(), start, end).await? {
        tracing::info!(
            product = %sales.product_id,
            name = %sales.name,
            sold = sales.total_sold,
            inventory = sales.inventory,
            best_size = ?sales.best_size(),
            "sales"
        );
    }

    let revenue = stats::revenue_between(store.as_ref(), Some((start, end)), stats::TimeFrame::Day).await?;
    tracing::info!(total = revenue.total, "revenue in range");
    for bucket in &revenue.buckets {
        tracing::info!(day = %bucket.label, revenue = bucket.revenue, "revenue");
    }

    tracing::info!("🎉 Demo complete");
    Ok(())
}

async fn seed_demo_data(store: &MemoryStore) -> anyhow::Result<()> {
    let fields = |value: serde_json::Value| -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("seed values are objects"),
        }
    };

    store
        .put(
            store::PRODUCTS,
            "p-linen-shirt",
            fields(json!({
                "tensp": "Ao so mi linen",
                "loaisp": "Ao",
                "chatlieu": "Linen",
                "giatien": 350000,
                "hinhanh": "https://img.example/p-linen-shirt.png",
                "sizes": [
                    {"size": "M", "soluong": 5},
                    {"size": "L", "soluong": 2},
                ],
            })),
        )
        .await?;

    store
        .put(
            store::ORDERS,
            "order-1001",
            fields(json!({
                "hoten": "Nguyen Van An",
                "sdt": "0901234567",
                "diachi": "12 Ly Thuong Kiet, Ha Noi",
                "ngaydat": "05/03/2025",
                "tongtien": 700000,
                "UID": "customer-1",
                "trangthai": 1,
            })),
        )
        .await?;

    store
        .put(
            store::ORDERS,
            "order-1002",
            fields(json!({
                "hoten": "Tran Thi Binh",
                "sdt": "0987654321",
                "diachi": "45 Hai Ba Trung, Da Nang",
                "ngaydat": "12/03/2025",
                "tongtien": 350000,
                "UID": "customer-2",
                "trangthai": 1,
            })),
        )
        .await?;

    // Line items carry store-assigned ids, like the order-placement flow
    // leaves them.
    store
        .create(
            &store::order_details_path("customer-1"),
            fields(json!({
                "id_hoadon": "order-1001",
                "id_product": "p-linen-shirt",
                "sizes": [{"size": "M", "soluong": 2}],
            })),
        )
        .await?;

    store
        .create(
            &store::order_details_path("customer-2"),
            fields(json!({
                "id_hoadon": "order-1002",
                "id_product": "p-linen-shirt",
                "sizes": [{"size": "L", "soluong": 1}]
            })),
        )
        .await?;

    tracing::debug!("demo data seeded");
    Ok(())
}
