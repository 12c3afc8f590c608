use std::sync::Arc;

use serde_json::Value;

use crate::domain::order::{LineItemView, Order, OrderError, OrderLineItem, OrderStatus};
use crate::domain::product::Product;
use crate::store::{self, DocumentStore, Fields, StoreError};

use super::cancellation::{CancelStep, CancellationReport};

// ============================================================================
// Order Lifecycle Controller
// ============================================================================
//
// Sole writer of order status and sole agent responsible for keeping the
// inventory ledger consistent with cancellations. All store access goes
// through the injected `DocumentStore`; writes are issued sequentially
// and each dependent step is awaited before the next.
//
// ============================================================================

pub struct OrderLifecycleController {
    store: Arc<dyn DocumentStore>,
}

impl OrderLifecycleController {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Full order scan. Documents that no longer decode are skipped with
    /// a warning rather than failing the whole list.
    pub async fn fetch_orders(&self) -> Result<Vec<Order>, OrderError> {
        let docs = self.store.list(store::ORDERS).await?;
        let mut orders = Vec::with_capacity(docs.len());
        for doc in &docs {
            match Order::from_document(doc) {
                Ok(order) => orders.push(order),
                Err(err) => tracing::warn!(order_id = %doc.id, error = %err, "skipping undecodable order"),
            }
        }
        Ok(orders)
    }

    /// Line items of one order, each joined with its product snapshot.
    /// A product that has since disappeared yields a view without a
    /// snapshot, matching how the dashboard renders unknown products.
    pub async fn fetch_order_details(&self, order: &Order) -> Result<Vec<LineItemView>, OrderError> {
        let items = self.fetch_line_items(order).await?;

        let mut views = Vec::with_capacity(items.len());
        for item in items {
            let product = match self.store.get(store::PRODUCTS, &item.product_id).await? {
                Some(doc) => match Product::from_document(&doc) {
                    Ok(product) => Some(product),
                    Err(err) => {
                        tracing::warn!(product_id = %item.product_id, error = %err, "skipping undecodable product snapshot");
                        None
                    }
                },
                None => None,
            };
            views.push(LineItemView { line_item: item, product });
        }
        Ok(views)
    }

    /// Persist a new status for the order. Forward transitions carry no
    /// inventory side effect; cancellation must go through [`cancel`]
    /// so the ledger is reconciled.
    ///
    /// [`cancel`]: OrderLifecycleController::cancel
    pub async fn change_status(
        &self,
        order: &Order,
        new_status: Option<OrderStatus>,
    ) -> Result<(), OrderError> {
        let new_status = new_status.ok_or(OrderError::NoStatusSelected)?;

        if order.status.is_terminal() {
            return Err(OrderError::TerminalStatus {
                id: order.id.clone(),
                status: order.status,
            });
        }
        if !order.status.can_become(new_status) {
            return Err(OrderError::InvalidTransition {
                id: order.id.clone(),
                from: order.status,
                to: new_status,
            });
        }

        self.store
            .put(store::ORDERS, &order.id, status_fields(new_status))
            .await?;

        tracing::info!(
            order_id = %order.id,
            from = %order.status,
            to = %new_status,
            "order status updated"
        );
        Ok(())
    }

    /// Cancel a processing order: restock every line item's quantities
    /// into the matching product ledger sizes, then mark the order
    /// Cancelled. The steps are not transactional; a failure partway
    /// surfaces as `CancellationInterrupted` carrying the completed steps.
    pub async fn cancel(&self, order: &Order) -> Result<CancellationReport, OrderError> {
        if order.status.is_terminal() {
            return Err(OrderError::TerminalStatus {
                id: order.id.clone(),
                status: order.status,
            });
        }
        if order.status != OrderStatus::Processing {
            return Err(OrderError::NotCancellable {
                id: order.id.clone(),
                status: order.status,
            });
        }

        let mut steps = Vec::new();
        match self.cancel_steps(order, &mut steps).await {
            Ok(()) => {
                let report = CancellationReport { order_id: order.id.clone(), steps };
                tracing::info!(
                    order_id = %order.id,
                    restored = report.total_restored(),
                    "order cancelled, inventory restored"
                );
                Ok(report)
            }
            Err(source) => {
                tracing::error!(
                    order_id = %order.id,
                    completed = steps.len(),
                    error = %source,
                    "cancellation interrupted partway"
                );
                Err(OrderError::CancellationInterrupted {
                    order_id: order.id.clone(),
                    completed: steps,
                    source,
                })
            }
        }
    }

    async fn cancel_steps(
        &self,
        order: &Order,
        steps: &mut Vec<CancelStep>,
    ) -> Result<(), StoreError> {
        let items = self.fetch_line_items(order).await?;
        steps.push(CancelStep::FetchedLineItems { count: items.len() });

        for item in &items {
            let doc = match self.store.get(store::PRODUCTS, &item.product_id).await? {
                Some(doc) => doc,
                None => {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        "product missing, nothing to restock"
                    );
                    continue;
                }
            };

            let mut product = Product::from_document(&doc)?;
            let restored = product.restock(&item.sizes);
            self.store
                .put(store::PRODUCTS, &product.id, sizes_fields(&product)?)
                .await?;
            steps.push(CancelStep::RestockedProduct {
                product_id: product.id.clone(),
                restored,
            });
        }

        self.store
            .put(store::ORDERS, &order.id, status_fields(OrderStatus::Cancelled))
            .await?;
        steps.push(CancelStep::MarkedCancelled);
        Ok(())
    }

    async fn fetch_line_items(&self, order: &Order) -> Result<Vec<OrderLineItem>, StoreError> {
        let path = store::order_details_path(&order.customer_uid);
        let docs = self
            .store
            .query(&path, store::FIELD_ORDER_ID, &Value::from(order.id.clone()))
            .await?;

        let mut items = Vec::with_capacity(docs.len());
        for doc in &docs {
            match OrderLineItem::from_document(doc) {
                Ok(item) => items.push(item),
                Err(err) => tracing::warn!(detail_id = %doc.id, error = %err, "skipping undecodable line item"),
            }
        }
        Ok(items)
    }
}

fn status_fields(status: OrderStatus) -> Fields {
    let mut fields = Fields::new();
    fields.insert(store::FIELD_STATUS.to_string(), Value::from(status.code()));
    fields
}

/// Only the ledger array is written back; other product fields are left
/// to whatever the store currently holds.
fn sizes_fields(product: &Product) -> Result<Fields, StoreError> {
    let mut fields = Fields::new();
    fields.insert(
        "sizes".to_string(),
        serde_json::to_value(&product.sizes).map_err(StoreError::Encode)?,
    );
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SnapshotFeed, StoreDocument};
    use async_trait::async_trait;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    async fn seed_order(store: &MemoryStore, id: &str, uid: &str, status: u8) {
        store
            .put(
                store::ORDERS,
                id,
                fields(json!({
                    "hoten": "Tran Thi Binh",
                    "sdt": "0987654321",
                    "diachi": "45 Hai Ba Trung",
                    "ngaydat": "01/02/2025",
                    "tongtien": 300000,
                    "UID": uid,
                    "trangthai": status,
                })),
            )
            .await
            .unwrap();
    }

    async fn seed_line_item(
        store: &MemoryStore,
        uid: &str,
        detail_id: &str,
        order_id: &str,
        product_id: &str,
        sizes: Value,
    ) {
        store
            .put(
                &store::order_details_path(uid),
                detail_id,
                fields(json!({
                    "id_hoadon": order_id,
                    "id_product": product_id,
                    "sizes": sizes,
                })),
            )
            .await
            .unwrap();
    }

    async fn seed_product(store: &MemoryStore, id: &str, sizes: Value) {
        store
            .put(
                store::PRODUCTS,
                id,
                fields(json!({
                    "tensp": "Ao so mi",
                    "giatien": 150000,
                    "sizes": sizes,
                })),
            )
            .await
            .unwrap();
    }

    async fn load_order(store: &MemoryStore, id: &str) -> Order {
        let doc = store.get(store::ORDERS, id).await.unwrap().unwrap();
        Order::from_document(&doc).unwrap()
    }

    async fn load_product(store: &MemoryStore, id: &str) -> Product {
        let doc = store.get(store::PRODUCTS, id).await.unwrap().unwrap();
        Product::from_document(&doc).unwrap()
    }

    fn controller(store: Arc<MemoryStore>) -> OrderLifecycleController {
        OrderLifecycleController::new(store)
    }

    #[tokio::test]
    async fn change_status_persists_new_status() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        ctl.change_status(&order, Some(OrderStatus::Shipping)).await.unwrap();

        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Shipping);
    }

    #[tokio::test]
    async fn change_status_requires_a_selection() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        let err = ctl.change_status(&order, None).await.unwrap_err();

        assert!(matches!(err, OrderError::NoStatusSelected));
        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn change_status_rejects_cancelled_as_direct_target() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        // Cancelling through a plain status edit would skip the ledger
        // restock; only `cancel` may reach Cancelled.
        let err = ctl
            .change_status(&order, Some(OrderStatus::Cancelled))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn terminal_orders_reject_status_change() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "done", "u1", 3).await;
        seed_order(&store, "gone", "u1", 4).await;
        let ctl = controller(store.clone());

        for id in ["done", "gone"] {
            let order = load_order(&store, id).await;
            let before = order.status;
            let err = ctl
                .change_status(&order, Some(OrderStatus::Processing))
                .await
                .unwrap_err();
            assert!(matches!(err, OrderError::TerminalStatus { .. }));
            assert_eq!(load_order(&store, id).await.status, before);
        }
    }

    #[tokio::test]
    async fn terminal_orders_reject_cancel() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "done", "u1", 3).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "done").await;

        let err = ctl.cancel(&order).await.unwrap_err();

        assert!(matches!(err, OrderError::TerminalStatus { .. }));
        assert_eq!(load_order(&store, "done").await.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn cancel_requires_processing_status() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 2).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        let err = ctl.cancel(&order).await.unwrap_err();

        assert!(matches!(err, OrderError::NotCancellable { .. }));
        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Shipping);
    }

    #[tokio::test]
    async fn cancel_restocks_matching_sizes_and_marks_cancelled() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        seed_product(&store, "pA", json!([{"size": "M", "soluong": 5}, {"size": "L", "soluong": 2}])).await;
        seed_line_item(&store, "u1", "d1", "o1", "pA", json!([{"size": "M", "soluong": 3}])).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        let report = ctl.cancel(&order).await.unwrap();

        let product = load_product(&store, "pA").await;
        assert_eq!(
            product.sizes,
            vec![
                crate::domain::order::SizeQuantity::new("M", 8),
                crate::domain::order::SizeQuantity::new("L", 2),
            ]
        );
        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Cancelled);
        assert_eq!(report.total_restored(), 3);
        assert_eq!(report.steps.last(), Some(&CancelStep::MarkedCancelled));
    }

    #[tokio::test]
    async fn cancel_ignores_sizes_missing_from_ledger() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        seed_product(&store, "pA", json!([{"size": "M", "soluong": 5}])).await;
        seed_line_item(&store, "u1", "d1", "o1", "pA", json!([{"size": "XXL", "soluong": 9}])).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        let report = ctl.cancel(&order).await.unwrap();

        assert_eq!(report.total_restored(), 0);
        let product = load_product(&store, "pA").await;
        assert_eq!(product.sizes, vec![crate::domain::order::SizeQuantity::new("M", 5)]);
        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_skips_missing_products_without_error() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        seed_line_item(&store, "u1", "d1", "o1", "vanished", json!([{"size": "M", "soluong": 2}])).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        let report = ctl.cancel(&order).await.unwrap();

        assert_eq!(report.total_restored(), 0);
        assert_eq!(load_order(&store, "o1").await.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn fetch_order_details_joins_product_snapshots() {
        let store = Arc::new(MemoryStore::new());
        seed_order(&store, "o1", "u1", 1).await;
        seed_product(&store, "pA", json!([{"size": "M", "soluong": 5}])).await;
        seed_line_item(&store, "u1", "d1", "o1", "pA", json!([{"size": "M", "soluong": 1}])).await;
        seed_line_item(&store, "u1", "d2", "o1", "vanished", json!([{"size": "S", "soluong": 1}])).await;
        seed_line_item(&store, "u1", "d3", "other", "pA", json!([{"size": "L", "soluong": 1}])).await;
        let ctl = controller(store.clone());
        let order = load_order(&store, "o1").await;

        let mut views = ctl.fetch_order_details(&order).await.unwrap();
        views.sort_by(|a, b| a.line_item.id.cmp(&b.line_item.id));

        assert_eq!(views.len(), 2);
        assert!(views[0].product.is_some());
        assert!(views[1].product.is_none());
    }

    // Store double that fails every write to one collection, leaving the
    // cancellation algorithm stranded partway.
    struct FailingStore {
        inner: MemoryStore,
        fail_path: String,
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn list(&self, path: &str) -> Result<Vec<StoreDocument>, StoreError> {
            self.inner.list(path).await
        }

        async fn query(
            &self,
            path: &str,
            field: &str,
            value: &Value,
        ) -> Result<Vec<StoreDocument>, StoreError> {
            self.inner.query(path, field, value).await
        }

        async fn get(&self, path: &str, id: &str) -> Result<Option<StoreDocument>, StoreError> {
            self.inner.get(path, id).await
        }

        async fn put(&self, path: &str, id: &str, f: Fields) -> Result<(), StoreError> {
            if path == self.fail_path {
                return Err(StoreError::Unavailable("injected write failure".to_string()));
            }
            self.inner.put(path, id, f).await
        }

        async fn create(&self, path: &str, f: Fields) -> Result<String, StoreError> {
            self.inner.create(path, f).await
        }

        async fn delete(&self, path: &str, id: &str) -> Result<(), StoreError> {
            self.inner.delete(path, id).await
        }

        fn subscribe(&self, path: &str) -> SnapshotFeed {
            self.inner.subscribe(path)
        }
    }

    #[tokio::test]
    async fn interrupted_cancellation_reports_completed_steps() {
        let inner = MemoryStore::new();
        seed_order(&inner, "o1", "u1", 1).await;
        seed_product(&inner, "pA", json!([{"size": "M", "soluong": 5}])).await;
        seed_line_item(&inner, "u1", "d1", "o1", "pA", json!([{"size": "M", "soluong": 3}])).await;

        // The status write to the orders collection fails; the product
        // restock has already been applied.
        let store = Arc::new(FailingStore { inner, fail_path: store::ORDERS.to_string() });
        let ctl = OrderLifecycleController::new(store.clone());
        let doc = store.get(store::ORDERS, "o1").await.unwrap().unwrap();
        let order = Order::from_document(&doc).unwrap();

        let err = ctl.cancel(&order).await.unwrap_err();

        match err {
            OrderError::CancellationInterrupted { order_id, completed, .. } => {
                assert_eq!(order_id, "o1");
                assert!(completed.contains(&CancelStep::RestockedProduct {
                    product_id: "pA".to_string(),
                    restored: 3,
                }));
                assert!(!completed.contains(&CancelStep::MarkedCancelled));
            }
            other => panic!("expected CancellationInterrupted, got {:?}", other),
        }

        // Half-applied on purpose: the ledger moved, the status did not.
        let product_doc = store.get(store::PRODUCTS, "pA").await.unwrap().unwrap();
        let product = Product::from_document(&product_doc).unwrap();
        assert_eq!(product.inventory(), 8);
    }
}
