//! Order and order-item records (`orders` and `order_items` tables).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::de::{clamped_count, null_as_default};
use super::{OrderId, OrderItemId, OrderStatus, PaymentMethod, Price, ProductId};

/// A placed order with denormalized customer details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_notes: String,
    #[serde(default, alias = "total_amount", deserialize_with = "null_as_default")]
    pub total_price: Price,
    #[serde(default, deserialize_with = "clamped_count")]
    pub items_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_method: PaymentMethod,
    /// Missing timestamps read as the Unix epoch and sort oldest.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub customer_notes: String,
    pub total_price: Price,
    pub items_count: u32,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a placed order.
///
/// Product name and price are copied at submission time so later catalog
/// edits do not rewrite order history. `product_id` is nullable because the
/// product may since have been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderItemId>,
    pub order_id: OrderId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_price: Price,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl OrderItem {
    /// Price of the line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product_price.times(self.quantity)
    }
}

const fn one() -> u32 {
    1
}

/// Insert payload for the `order_items` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub product_price: Price,
    pub quantity: u32,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// An order together with its items, as shown in the admin order list and
/// kept in the local orders backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Order total: the stored total, or the sum of the items when the
    /// stored total is missing.
    #[must_use]
    pub fn total(&self) -> Price {
        if self.order.total_price.is_positive() {
            self.order.total_price
        } else {
            self.order_items.iter().map(OrderItem::line_total).sum()
        }
    }
}
