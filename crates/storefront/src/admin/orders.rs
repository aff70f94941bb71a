//! Order management: listing with backup fallback, status changes,
//! deletion and summary statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;
use vix_core::{Order, OrderId, OrderItem, OrderStatus, OrderWithItems, Price};

use super::{AdminError, AdminPanel};
use crate::gateway::{Filter, Query, Table, TableStore};

/// Where an order list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    Remote,
    /// The mirrored orders backup, after a failed remote load.
    Backup,
}

/// Result of [`AdminPanel::orders`].
#[derive(Debug, Clone)]
pub struct OrderList {
    pub orders: Vec<OrderWithItems>,
    pub source: OrderSource,
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    /// Delivered or completed orders.
    pub completed: usize,
    /// Sum of totals over delivered or completed orders.
    pub revenue: Price,
}

impl OrderStats {
    #[must_use]
    pub fn from_orders(orders: &[OrderWithItems]) -> Self {
        orders.iter().fold(Self::default(), |mut stats, order| {
            stats.total += 1;
            if order.order.status == OrderStatus::Pending {
                stats.pending += 1;
            }
            if order.order.status.is_fulfilled() {
                stats.completed += 1;
                stats.revenue = stats.revenue + order.total();
            }
            stats
        })
    }
}

#[derive(Serialize)]
struct StatusPatch {
    status: OrderStatus,
    updated_at: DateTime<Utc>,
}

impl<S: TableStore> AdminPanel<'_, S> {
    /// Every order with its items, newest first.
    ///
    /// A successful load replaces the orders backup; a failed one returns
    /// the backup instead. Orders whose items cannot be loaded are listed
    /// without items.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> OrderList {
        let orders = match self
            .store
            .select::<Order>(Table::Orders, &Query::new().newest_first())
            .await
        {
            Ok(orders) => orders,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load orders, using backup");
                return OrderList {
                    orders: self.mirror.load_orders_backup(),
                    source: OrderSource::Backup,
                };
            }
        };

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        if !orders.is_empty() {
            match self
                .store
                .select::<OrderItem>(Table::OrderItems, &Query::new().order_by("id", true))
                .await
            {
                Ok(items) => {
                    for item in items {
                        items_by_order.entry(item.order_id).or_default().push(item);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to load order items"),
            }
        }

        let orders: Vec<OrderWithItems> = orders
            .into_iter()
            .map(|order| OrderWithItems {
                order_items: items_by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect();

        self.mirror.save_orders_backup(&orders);
        tracing::info!(count = orders.len(), "Loaded orders");
        OrderList {
            orders,
            source: OrderSource::Remote,
        }
    }

    /// Set an order's status. Any status may be chosen.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Gateway` on store failure.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, AdminError> {
        let patch = StatusPatch {
            status,
            updated_at: Utc::now(),
        };
        let order: Order = self
            .store
            .update_by_id(Table::Orders, id.as_i64(), &patch)
            .await?;

        let mut backup = self.mirror.load_orders_backup();
        if let Some(entry) = backup.iter_mut().find(|o| o.order.id == id) {
            entry.order.status = order.status;
            entry.order.updated_at = order.updated_at;
            self.mirror.save_orders_backup(&backup);
        }

        tracing::info!("Order status changed");
        Ok(order)
    }

    /// Delete an order: its items first (failures logged), then the order.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Gateway` if the order delete fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete_order(&self, id: OrderId) -> Result<(), AdminError> {
        if let Err(e) = self
            .store
            .delete(Table::OrderItems, &Filter::eq("order_id", id))
            .await
        {
            tracing::warn!(error = %e, "Failed to delete order items");
        }

        self.store.delete_by_id(Table::Orders, id.as_i64()).await?;

        let backup: Vec<OrderWithItems> = self
            .mirror
            .load_orders_backup()
            .into_iter()
            .filter(|o| o.order.id != id)
            .collect();
        self.mirror.save_orders_backup(&backup);

        tracing::info!("Order deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gateway::LocalTables;
    use crate::mirror::{MemoryMirror, Mirror};

    fn order(id: i64, status: OrderStatus, total: i64) -> OrderWithItems {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "customer_name": "Mona",
            "customer_phone": "01012345678",
            "customer_address": "Cairo",
            "total_price": total,
            "status": status,
            "created_at": "2026-10-01T10:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_stats() {
        let orders = vec![
            order(1, OrderStatus::Pending, 299),
            order(2, OrderStatus::Delivered, 899),
            order(3, OrderStatus::Completed, 598),
            order(4, OrderStatus::Cancelled, 1000),
        ];
        let stats = OrderStats::from_orders(&orders);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.revenue, Price::from_whole(1497));
    }

    async fn seeded() -> (LocalTables, Mirror) {
        let store = LocalTables::new(Arc::new(MemoryMirror::new()));
        let orders = [
            serde_json::json!({"customer_name": "A", "customer_phone": "01012345678",
                "customer_address": "Cairo", "total_price": 299,
                "created_at": "2026-10-01T10:00:00Z"}),
            serde_json::json!({"customer_name": "B", "customer_phone": "01112345678",
                "customer_address": "Giza", "total_price": 899,
                "created_at": "2026-10-02T10:00:00Z"}),
        ];
        let _: Vec<Order> = store.insert(Table::Orders, &orders).await.unwrap();
        let items = [
            serde_json::json!({"order_id": 1, "product_name": "Shirt", "product_price": 299}),
            serde_json::json!({"order_id": 2, "product_name": "Jacket", "product_price": 899}),
        ];
        let _: Vec<OrderItem> = store.insert(Table::OrderItems, &items).await.unwrap();
        (store, Mirror::in_memory())
    }

    #[tokio::test]
    async fn test_orders_join_items_and_backup() {
        let (store, mirror) = seeded().await;
        let list = AdminPanel::new(&store, &mirror).orders().await;

        assert_eq!(list.source, OrderSource::Remote);
        assert_eq!(list.orders.len(), 2);
        assert_eq!(list.orders[0].order.customer_name, "B");
        assert_eq!(list.orders[0].order_items[0].product_name, "Jacket");
        assert_eq!(mirror.load_orders_backup(), list.orders);
    }

    #[tokio::test]
    async fn test_set_status_updates_backup() {
        let (store, mirror) = seeded().await;
        let panel = AdminPanel::new(&store, &mirror);
        panel.orders().await;

        let order = panel
            .set_order_status(OrderId::new(1), OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        let backup = mirror.load_orders_backup();
        let entry = backup.iter().find(|o| o.order.id == OrderId::new(1)).unwrap();
        assert_eq!(entry.order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_delete_removes_items_and_order() {
        let (store, mirror) = seeded().await;
        let panel = AdminPanel::new(&store, &mirror);
        panel.orders().await;

        panel.delete_order(OrderId::new(2)).await.unwrap();

        let list = panel.orders().await;
        assert_eq!(list.orders.len(), 1);
        let items: Vec<OrderItem> = store
            .select(Table::OrderItems, &Query::new().eq("order_id", 2))
            .await
            .unwrap();
        assert!(items.is_empty());
    }
}
