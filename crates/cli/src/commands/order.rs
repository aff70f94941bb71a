//! `vix order` - place an order from the command line.

use std::str::FromStr;

use vix_core::ProductId;
use vix_storefront::checkout::{CheckoutError, CustomerInfo};
use vix_storefront::gateway::TableStore;
use vix_storefront::{AppError, AppState};

/// One `--item` argument: `<product_id>[:<color>[:<size>]][*<qty>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: u32,
}

impl FromStr for ItemSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (choice, quantity) = match s.rsplit_once('*') {
            Some((choice, qty)) => {
                let qty = qty
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|q| *q >= 1)
                    .ok_or_else(|| format!("invalid quantity '{qty}' in '{s}'"))?;
                (choice, qty)
            }
            None => (s, 1),
        };

        let mut parts = choice.splitn(3, ':');
        let product_id = parts
            .next()
            .unwrap_or_default()
            .trim()
            .parse::<ProductId>()
            .map_err(|_| format!("invalid product id in '{s}'"))?;
        let non_empty = |part: Option<&str>| {
            part.map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            product_id,
            color: non_empty(parts.next()),
            size: non_empty(parts.next()),
            quantity,
        })
    }
}

/// Fill the cart from `items`, then run the checkout flow.
///
/// # Errors
///
/// Returns the first cart or checkout failure; field errors are logged
/// one per line first.
pub async fn place<S: TableStore>(
    state: &mut AppState<S>,
    customer: CustomerInfo,
    items: &[ItemSpec],
) -> Result<(), AppError> {
    state.load_catalog().await;

    for item in items {
        let line =
            state.add_to_cart(item.product_id, item.color.as_deref(), item.size.as_deref())?;
        if item.quantity > 1 {
            // `add_to_cart` already counted one unit
            let current = state.cart().get(line).map_or(1, |l| l.quantity);
            state
                .cart_mut()
                .update_quantity(line, merged_quantity(current, item.quantity));
        }
    }

    for line in state.cart().lines() {
        tracing::info!(
            "{} x{} {} {} = {}",
            line.product.name,
            line.quantity,
            line.color.as_deref().unwrap_or("-"),
            line.size.as_deref().unwrap_or("-"),
            line.line_total().display(),
        );
    }
    tracing::info!("Total: {} (shipping free)", state.cart().total_price().display());

    state.proceed_to_checkout()?;
    *state.checkout_mut().customer_mut() = customer;

    match state.submit_order().await {
        Ok(order_id) => {
            tracing::info!("Order #{order_id} placed. Pay cash on delivery.");
            Ok(())
        }
        Err(AppError::Checkout(CheckoutError::Validation(errors))) => {
            for (field, message) in errors.iter() {
                tracing::error!("{field}: {message}");
            }
            Err(AppError::Checkout(CheckoutError::Validation(errors)))
        }
        Err(e) => {
            e.report();
            tracing::error!("{}", e.user_message());
            Err(e)
        }
    }
}

/// Line quantity after adding `requested` units, one of which
/// `add_to_cart` already counted.
const fn merged_quantity(current: u32, requested: u32) -> u32 {
    current.saturating_add(requested.saturating_sub(1))
}
