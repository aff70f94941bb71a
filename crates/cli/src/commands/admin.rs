//! Admin back-office commands.
//!
//! # Usage
//!
//! ```bash
//! vix admin login --username admin --password '...' --secret '...'
//! vix admin products --status active --search shirt
//! vix admin add-product --name "Denim Jacket" --price 899 --category jackets \
//!     --image-file ./jacket.jpg --color '#1E3A8A' --size M --size L
//! vix admin orders --status pending --date today
//! vix admin stats
//! ```
//!
//! # Environment Variables
//!
//! - `VIX_ADMIN_USERNAME`, `VIX_ADMIN_PASSWORD`, `VIX_ADMIN_SECRET` -
//!   the credential triple checked by `login`

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Subcommand};
use vix_core::{OrderId, OrderStatus, OrderWithItems, ProductId, ProductStatus};
use vix_storefront::admin::{
    AdminError, DateBucket, ImageInput, LoginAttempt, OrderFilter, OrderSource, OrderStats,
    ProductFilter, ProductForm,
};
use vix_storefront::gateway::TableStore;
use vix_storefront::{AppError, AppState};

use super::product_line;

#[derive(Subcommand)]
pub enum AdminAction {
    /// Log in with username, password and secret code
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        secret: String,
    },
    /// End the admin session
    Logout,
    /// List products
    Products {
        #[arg(long)]
        status: Option<ProductStatus>,

        #[arg(short, long)]
        category: Option<String>,

        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a product
    AddProduct(ProductArgs),
    /// Replace a product's fields, keeping its SKU
    EditProduct {
        id: ProductId,

        #[command(flatten)]
        fields: ProductArgs,
    },
    /// Change a product's status
    ProductStatus { id: ProductId, status: ProductStatus },
    /// Delete a product
    DeleteProduct { id: ProductId },
    /// List orders with their items
    Orders {
        #[arg(long)]
        status: Option<OrderStatus>,

        /// all, today, week or month
        #[arg(short, long, default_value = "all")]
        date: DateBucket,
    },
    /// Change an order's status
    OrderStatus { id: OrderId, status: OrderStatus },
    /// Delete an order and its items
    DeleteOrder { id: OrderId },
    /// Order counters and revenue
    Stats,
}

/// Product form fields shared by `add-product` and `edit-product`.
#[derive(Args)]
pub struct ProductArgs {
    #[arg(short, long)]
    name: String,

    #[arg(short, long)]
    price: String,

    #[arg(short, long)]
    category: String,

    #[arg(short, long, default_value = "")]
    description: String,

    #[arg(long, default_value = "10")]
    stock: String,

    #[arg(long, default_value = "4.5")]
    rating: String,

    #[arg(long, default_value = "active")]
    status: ProductStatus,

    /// Image URL (`http(s)` or `data:image/`)
    #[arg(long, conflicts_with = "image_file")]
    image_url: Option<String>,

    /// Image file, stored inline (5 MiB max)
    #[arg(long)]
    image_file: Option<PathBuf>,

    /// Hex color, repeatable (defaults to black, crimson and navy)
    #[arg(long = "color")]
    colors: Vec<String>,

    /// Size label, repeatable (defaults to S, M, L, XL)
    #[arg(long = "size")]
    sizes: Vec<String>,
}

impl ProductArgs {
    fn into_form(self, mut form: ProductForm) -> Result<ProductForm, AppError> {
        form.name = self.name;
        form.price = self.price;
        form.category = self.category;
        form.description = self.description;
        form.stock = self.stock;
        form.rating = self.rating;
        form.status = self.status;

        if let Some(path) = self.image_file {
            form.image = ImageInput::from_path(&path).map_err(AdminError::from)?;
        } else if let Some(url) = self.image_url {
            form.image = ImageInput::Url(url);
        }

        if !self.colors.is_empty() {
            form.set_colors(&self.colors)
                .map_err(|e| AppError::BadRequest(format!("colors: {e}")))?;
        }
        if !self.sizes.is_empty() && !form.set_sizes(&self.sizes) {
            tracing::warn!("Ignoring blank sizes, keeping the current ones");
        }
        Ok(form)
    }
}

/// Run an admin action.
///
/// # Errors
///
/// Returns `AdminError::NotLoggedIn` for anything but `login` without an
/// admin session, or the failure of the action itself.
pub async fn run<S: TableStore>(
    state: &mut AppState<S>,
    action: AdminAction,
) -> Result<(), AppError> {
    let result = dispatch(state, action).await;
    if let Err(e) = &result {
        e.report();
        tracing::error!("{}", e.user_message());
    }
    result
}

async fn dispatch<S: TableStore>(
    state: &mut AppState<S>,
    action: AdminAction,
) -> Result<(), AppError> {
    match action {
        AdminAction::Login {
            username,
            password,
            secret,
        } => {
            state.admin_login(&LoginAttempt {
                username: &username,
                password: &password,
                secret_code: &secret,
            })?;
            tracing::info!("Logged in as {}", username.trim());
        }
        AdminAction::Logout => {
            state.admin_logout();
            tracing::info!("Logged out");
        }
        AdminAction::Products {
            status,
            category,
            search,
        } => {
            let products = state.admin()?.products().await;
            let filter = ProductFilter {
                status,
                category,
                name: search,
            };
            let shown = filter.apply(&products);
            for product in &shown {
                tracing::info!("{}", product_line(product));
            }
            tracing::info!("{} of {} product(s)", shown.len(), products.len());
        }
        AdminAction::AddProduct(fields) => {
            let form = fields.into_form(ProductForm::new())?;
            let product = state.admin()?.create_product(&form).await?;
            tracing::info!("Created {}", product_line(&product));
        }
        AdminAction::EditProduct { id, fields } => {
            let admin = state.admin()?;
            let existing = admin
                .products()
                .await
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
            let form = fields.into_form(ProductForm::from_product(&existing))?;
            let product = admin
                .update_product(id, &form, existing.sku.as_deref())
                .await?;
            tracing::info!("Updated {}", product_line(&product));
        }
        AdminAction::ProductStatus { id, status } => {
            let product = state.admin()?.set_product_status(id, status).await?;
            tracing::info!("{} is now {}", product.name, product.status.label());
        }
        AdminAction::DeleteProduct { id } => {
            state.admin()?.delete_product(id).await?;
            tracing::info!("Deleted product #{id}");
        }
        AdminAction::Orders { status, date } => {
            let list = state.admin()?.orders().await;
            if list.source == OrderSource::Backup {
                tracing::warn!("Store unavailable, showing the local orders backup");
            }
            let filter = OrderFilter { status, date };
            let shown = filter.apply(&list.orders, Utc::now());
            for entry in &shown {
                print_order(entry);
            }
            tracing::info!("{} of {} order(s)", shown.len(), list.orders.len());
        }
        AdminAction::OrderStatus { id, status } => {
            let order = state.admin()?.set_order_status(id, status).await?;
            tracing::info!("Order #{} is now {}", order.id, order.status.label());
        }
        AdminAction::DeleteOrder { id } => {
            state.admin()?.delete_order(id).await?;
            tracing::info!("Deleted order #{id}");
        }
        AdminAction::Stats => {
            let list = state.admin()?.orders().await;
            let stats = OrderStats::from_orders(&list.orders);
            tracing::info!(
                "Orders: {} | Pending: {} | Completed: {} | Revenue: {}",
                stats.total,
                stats.pending,
                stats.completed,
                stats.revenue.display(),
            );
        }
    }
    Ok(())
}

fn print_order(entry: &OrderWithItems) {
    let order = &entry.order;
    tracing::info!(
        "#{} {} {} {} | {} | {} item(s) | {} | {}",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.customer_name,
        order.customer_phone,
        order.customer_address,
        entry.order_items.len(),
        entry.total().display(),
        order.status.label(),
    );
    if !order.customer_notes.is_empty() {
        tracing::info!("    notes: {}", order.customer_notes);
    }
    for item in &entry.order_items {
        tracing::info!(
            "    {} x{} {} {} = {}",
            item.product_name,
            item.quantity,
            item.color.as_deref().unwrap_or("-"),
            item.size.as_deref().unwrap_or("-"),
            item.line_total().display(),
        );
    }
}
