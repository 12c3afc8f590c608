use crate::domain::order::{Order, OrderStatus};

// Pure, synchronous narrowing of the in-memory order list. No I/O.

/// `status` of `None` matches every status; an empty `search` matches
/// every order. The text match is case-insensitive on the customer name
/// and an exact substring match on phone and partition id.
pub fn filter_orders<'a>(
    orders: &'a [Order],
    status: Option<OrderStatus>,
    search: &str,
) -> Vec<&'a Order> {
    let needle = search.to_lowercase();
    orders
        .iter()
        .filter(|order| status.map_or(true, |wanted| order.status == wanted))
        .filter(|order| {
            search.is_empty()
                || order.customer_name.to_lowercase().contains(&needle)
                || order.phone.contains(search)
                || order.customer_uid.contains(search)
        })
        .collect()
}
