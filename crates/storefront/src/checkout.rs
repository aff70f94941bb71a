//! Order submission flow.
//!
//! ```text
//! EditingCart -> EditingCustomerInfo -> Submitting -> Success
//!                         ^                       \-> Failed
//!                         \----------- retry -------/
//! ```
//!
//! The order row is written first, then its items in one bulk insert. An
//! authentication failure on the order insert gets exactly one session
//! recovery and one retry. A failed items insert triggers a best-effort
//! delete of the order. On any failure the cart and the customer draft are
//! left untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use vix_core::{
    NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatus, OrderWithItems, PaymentMethod,
    Phone, PhoneError,
};

use crate::cart::Cart;
use crate::gateway::{GatewayError, Table, TableStore};
use crate::mirror::Mirror;

// =============================================================================
// Customer details
// =============================================================================

/// Checkout form as typed by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

/// Customer details that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCustomer {
    pub name: String,
    pub phone: Phone,
    pub address: String,
    pub notes: String,
}

/// Per-field validation messages. `None` means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl FieldErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }

    /// `(field, message)` pairs for every invalid field.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("name", self.name.as_deref()),
            ("phone", self.phone.as_deref()),
            ("address", self.address.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, message)| message.map(|m| (field, m)))
    }
}

impl CustomerInfo {
    /// Validate the form: name and address must be non-blank and the phone
    /// must be an Egyptian mobile number.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid field at once.
    pub fn validate(&self) -> Result<ValidatedCustomer, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.name = Some("Name is required".to_string());
        }

        let phone = match Phone::parse(&self.phone) {
            Ok(phone) => Some(phone),
            Err(PhoneError::Empty) => {
                errors.phone = Some("Phone number is required".to_string());
                None
            }
            Err(PhoneError::InvalidFormat) => {
                errors.phone = Some(
                    "Enter a valid Egyptian mobile number (e.g. 01012345678)".to_string(),
                );
                None
            }
        };

        let address = self.address.trim();
        if address.is_empty() {
            errors.address = Some("Address is required".to_string());
        }

        match phone {
            Some(phone) if errors.is_empty() => Ok(ValidatedCustomer {
                name: name.to_string(),
                phone,
                address: address.to_string(),
                notes: self.notes.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("cannot {action} during {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error("invalid customer details")]
    Validation(FieldErrors),

    /// Order insert rejected for lack of a session, after one recovery.
    #[error("authentication failed: {0}")]
    Authentication(#[source] GatewayError),

    #[error("order insert failed: {0}")]
    Remote(#[source] GatewayError),

    /// Order row was written but its items were not; the order was
    /// deleted again on a best-effort basis.
    #[error("order {order_id} items insert failed: {source}")]
    PartialWrite {
        order_id: OrderId,
        #[source]
        source: GatewayError,
    },
}

impl CheckoutError {
    /// Message shown to the shopper.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyCart => "Your cart is empty.",
            Self::InvalidPhase { .. } => "Your order is already being processed.",
            Self::Validation(_) => "Please correct the highlighted fields.",
            Self::Authentication(_) => {
                "We could not verify your session. Please try again in a moment."
            }
            Self::Remote(_) | Self::PartialWrite { .. } => {
                "We could not place your order. Your cart has been kept, please try again."
            }
        }
    }
}

// =============================================================================
// State machine
// =============================================================================

/// Where the shopper is in the checkout flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckoutPhase {
    #[default]
    EditingCart,
    EditingCustomerInfo,
    Submitting,
    Success {
        order_id: OrderId,
    },
    Failed {
        reason: String,
    },
}

impl CheckoutPhase {
    const fn name(&self) -> &'static str {
        match self {
            Self::EditingCart => "cart editing",
            Self::EditingCustomerInfo => "customer info editing",
            Self::Submitting => "submission",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failure",
        }
    }
}

/// Checkout flow state: phase, customer draft and the last field errors.
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    phase: CheckoutPhase,
    customer: CustomerInfo,
    field_errors: FieldErrors,
}

impl Checkout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    #[must_use]
    pub const fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    /// Mutable access to the customer draft.
    pub const fn customer_mut(&mut self) -> &mut CustomerInfo {
        &mut self.customer
    }

    #[must_use]
    pub const fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Move from the cart to the customer form.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` for an empty cart and `InvalidPhase` while a
    /// submission is in flight.
    pub fn proceed(&mut self, cart: &Cart) -> Result<(), CheckoutError> {
        if matches!(self.phase, CheckoutPhase::Submitting) {
            return Err(self.invalid("proceed to checkout"));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.phase = CheckoutPhase::EditingCustomerInfo;
        Ok(())
    }

    /// Return from the customer form to the cart, keeping the draft.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPhase` while a submission is in flight.
    pub fn back_to_cart(&mut self) -> Result<(), CheckoutError> {
        if matches!(self.phase, CheckoutPhase::Submitting) {
            return Err(self.invalid("return to the cart"));
        }
        self.phase = CheckoutPhase::EditingCart;
        Ok(())
    }

    /// Start over with an empty draft.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validate the draft and place the order.
    ///
    /// Allowed from the customer form or after a failure (retry). On
    /// success the order is added to the orders backup, the cart is
    /// cleared and the draft reset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPhase`, `EmptyCart` or `Validation` without any
    /// write; otherwise the remote failure. The cart and draft are kept.
    #[instrument(skip_all, fields(lines = cart.len()))]
    pub async fn submit<S: TableStore>(
        &mut self,
        cart: &mut Cart,
        store: &S,
        mirror: &Mirror,
    ) -> Result<OrderId, CheckoutError> {
        if !matches!(
            self.phase,
            CheckoutPhase::EditingCustomerInfo | CheckoutPhase::Failed { .. }
        ) {
            return Err(self.invalid("submit an order"));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let customer = match self.customer.validate() {
            Ok(customer) => customer,
            Err(errors) => {
                self.field_errors = errors.clone();
                self.phase = CheckoutPhase::EditingCustomerInfo;
                return Err(CheckoutError::Validation(errors));
            }
        };
        self.field_errors = FieldErrors::default();
        self.phase = CheckoutPhase::Submitting;

        match place_order(store, cart, &customer).await {
            Ok(placed) => {
                let order_id = placed.order.id;
                mirror.push_order_backup(placed);
                cart.clear();
                self.customer = CustomerInfo::default();
                self.phase = CheckoutPhase::Success { order_id };
                tracing::info!(order_id = %order_id, "Order placed");
                Ok(order_id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Order submission failed");
                self.phase = CheckoutPhase::Failed {
                    reason: e.user_message().to_string(),
                };
                Err(e)
            }
        }
    }

    fn invalid(&self, action: &'static str) -> CheckoutError {
        CheckoutError::InvalidPhase {
            action,
            phase: self.phase.name(),
        }
    }
}

// =============================================================================
// Remote writes
// =============================================================================

/// Write the order and its items for `cart`.
///
/// # Errors
///
/// See [`CheckoutError`]; on `PartialWrite` the order has been deleted
/// again unless that delete itself failed (logged).
#[instrument(skip_all, fields(total = %cart.total_price()))]
pub async fn place_order<S: TableStore>(
    store: &S,
    cart: &Cart,
    customer: &ValidatedCustomer,
) -> Result<OrderWithItems, CheckoutError> {
    let now = Utc::now();
    let new_order = NewOrder {
        customer_name: customer.name.clone(),
        customer_phone: customer.phone.as_str().to_string(),
        customer_address: customer.address.clone(),
        customer_notes: customer.notes.clone(),
        total_price: cart.total_price(),
        items_count: cart.item_count(),
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::CashOnDelivery,
        created_at: now,
        updated_at: now,
    };

    let order = insert_order(store, &new_order).await?;

    let items: Vec<NewOrderItem> = cart
        .lines()
        .iter()
        .map(|line| NewOrderItem {
            order_id: order.id,
            product_id: Some(line.product.id),
            product_name: line.product.name.clone(),
            product_price: line.product.price,
            quantity: line.quantity,
            color: line.color.clone(),
            size: line.size.clone(),
        })
        .collect();

    match store
        .insert::<_, OrderItem>(Table::OrderItems, &items)
        .await
    {
        Ok(order_items) => Ok(OrderWithItems { order, order_items }),
        Err(source) => {
            tracing::error!(order_id = %order.id, error = %source, "Failed to insert order items, deleting order");
            if let Err(e) = store.delete_by_id(Table::Orders, order.id.as_i64()).await {
                tracing::error!(order_id = %order.id, error = %e, "Failed to delete incomplete order");
            }
            Err(CheckoutError::PartialWrite {
                order_id: order.id,
                source,
            })
        }
    }
}

/// Insert the order row, recovering the session once on an auth failure.
async fn insert_order<S: TableStore>(store: &S, new_order: &NewOrder) -> Result<Order, CheckoutError> {
    match insert_one(store, new_order).await {
        Ok(order) => Ok(order),
        Err(e) if e.is_auth() => {
            tracing::warn!(error = %e, "Order insert rejected, re-establishing session");
            if let Err(auth) = store.reauthenticate().await {
                tracing::warn!(error = %auth, "Session recovery failed, retrying anyway");
            }
            insert_one(store, new_order).await.map_err(|e| {
                if e.is_auth() {
                    CheckoutError::Authentication(e)
                } else {
                    CheckoutError::Remote(e)
                }
            })
        }
        Err(e) => Err(CheckoutError::Remote(e)),
    }
}

async fn insert_one<S: TableStore>(store: &S, new_order: &NewOrder) -> Result<Order, GatewayError> {
    store
        .insert::<_, Order>(Table::Orders, std::slice::from_ref(new_order))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::NotFound("inserted order row".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use vix_core::Price;

    use super::*;
    use crate::catalog::default_catalog;
    use crate::gateway::{LocalTables, Query};
    use crate::mirror::MemoryMirror;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: " Mona Adel ".to_string(),
            phone: "01012345678".to_string(),
            address: "12 Tahrir St, Cairo".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_validate_ok_trims() {
        let valid = customer().validate().unwrap();
        assert_eq!(valid.name, "Mona Adel");
        assert_eq!(valid.phone.as_str(), "01012345678");
    }

    #[test]
    fn test_validate_reports_every_field() {
        let errors = CustomerInfo {
            name: "  ".to_string(),
            phone: "02012345678".to_string(),
            address: String::new(),
            notes: String::new(),
        }
        .validate()
        .unwrap_err();

        let fields: Vec<_> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["name", "phone", "address"]);
    }

    #[test]
    fn test_proceed_requires_items() {
        let mut checkout = Checkout::new();
        let mut cart = Cart::new();
        assert!(matches!(checkout.proceed(&cart), Err(CheckoutError::EmptyCart)));

        cart.add(&default_catalog()[0], None, None);
        checkout.proceed(&cart).unwrap();
        assert_eq!(checkout.phase(), &CheckoutPhase::EditingCustomerInfo);

        checkout.back_to_cart().unwrap();
        assert_eq!(checkout.phase(), &CheckoutPhase::EditingCart);
    }

    #[tokio::test]
    async fn test_submit_from_cart_phase_is_rejected() {
        let store = LocalTables::new(Arc::new(MemoryMirror::new()));
        let mirror = Mirror::in_memory();
        let mut cart = Cart::new();
        cart.add(&default_catalog()[0], None, None);

        let mut checkout = Checkout::new();
        let err = checkout.submit(&mut cart, &store, &mirror).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let store = LocalTables::new(Arc::new(MemoryMirror::new()));
        let mirror = Mirror::in_memory();
        let mut cart = Cart::new();
        cart.add(&default_catalog()[0], None, None);

        let mut checkout = Checkout::new();
        checkout.proceed(&cart).unwrap();
        checkout.customer_mut().phone = "0101234567".to_string();

        let err = checkout.submit(&mut cart, &store, &mirror).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(checkout.field_errors().phone.is_some());
        assert_eq!(checkout.phase(), &CheckoutPhase::EditingCustomerInfo);

        let orders: Vec<Order> = store.select(Table::Orders, &Query::new()).await.unwrap();
        assert!(orders.is_empty());
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_submit() {
        let store = LocalTables::new(Arc::new(MemoryMirror::new()));
        let mirror = Mirror::in_memory();
        let catalog = default_catalog();
        let mut cart = Cart::new();
        let shirt = cart.add(&catalog[0], Some("#000000"), Some("M"));
        cart.update_quantity(shirt, 2);
        cart.add(&catalog[1], Some("#8B4513"), Some("L"));

        let mut checkout = Checkout::new();
        checkout.proceed(&cart).unwrap();
        *checkout.customer_mut() = customer();

        let order_id = checkout.submit(&mut cart, &store, &mirror).await.unwrap();
        assert_eq!(checkout.phase(), &CheckoutPhase::Success { order_id });
        assert!(cart.is_empty());
        assert_eq!(checkout.customer(), &CustomerInfo::default());

        let order: Order = store
            .select_by_id(Table::Orders, order_id.as_i64())
            .await
            .unwrap();
        assert_eq!(order.total_price, Price::from_whole(299 * 2 + 899));
        assert_eq!(order.items_count, 3);
        assert_eq!(order.status, OrderStatus::Pending);

        let items: Vec<OrderItem> = store
            .select(
                Table::OrderItems,
                &Query::new().eq("order_id", order_id),
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_name, "VIX Classic Shirt");
        assert_eq!(items[0].size.as_deref(), Some("M"));

        let backup = mirror.load_orders_backup();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].order.id, order_id);
        assert_eq!(backup[0].order_items.len(), 2);
    }

    #[test]
    fn test_user_messages_hide_details() {
        let err = CheckoutError::Remote(GatewayError::api(500, "XX000", "relation missing"));
        assert!(!err.user_message().contains("relation"));
    }
}
