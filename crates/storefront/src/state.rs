//! Root application state.
//!
//! `AppState` owns everything mutable: the loaded catalog, the cart, the
//! checkout flow and the admin session flag. Services get references to
//! the store and the mirror from here and never read ambient storage on
//! their own.

use std::sync::Arc;

use vix_core::{OrderId, Product, ProductId};

use crate::admin::{self, AdminPanel, LoginAttempt};
use crate::cart::{Cart, LineId};
use crate::catalog::{Catalog, CatalogSource};
use crate::checkout::Checkout;
use crate::config::{BackendKind, ConfigError, StoreConfig};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::gateway::{Backend, GatewayError, LocalTables, RestClient, TableStore};
use crate::mirror::{FileMirror, Mirror};

/// Application state, generic over the table store so tests can inject
/// one.
pub struct AppState<S = Backend> {
    config: StoreConfig,
    store: S,
    mirror: Mirror,
    products: Vec<Product>,
    catalog_source: Option<CatalogSource>,
    cart: Cart,
    checkout: Checkout,
    admin_logged_in: bool,
}

impl AppState<Backend> {
    /// Build the state from configuration: open the file mirror and
    /// select the table store.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror directory cannot be created or the
    /// remote client cannot be built.
    pub fn from_config(config: StoreConfig) -> Result<Self> {
        let backend: Arc<FileMirror> = Arc::new(FileMirror::open(&config.mirror_dir)?);
        let mirror = Mirror::new(backend.clone());

        let store = match config.backend {
            BackendKind::Remote => {
                let remote = config.remote.as_ref().ok_or_else(|| {
                    AppError::Config(ConfigError::MissingEnvVar(
                        "VIX_SUPABASE_URL".to_string(),
                    ))
                })?;
                Backend::Remote(RestClient::new(remote)?)
            }
            BackendKind::Local => Backend::Local(LocalTables::new(backend)),
        };

        tracing::info!(
            backend = ?config.backend,
            mirror_dir = %config.mirror_dir.display(),
            "Application state ready"
        );
        Ok(Self::new(config, store, mirror))
    }
}

impl<S: TableStore> AppState<S> {
    /// Assemble the state from its parts. The admin flag is read from the
    /// mirror once, here.
    #[must_use]
    pub fn new(config: StoreConfig, store: S, mirror: Mirror) -> Self {
        let admin_logged_in = admin::is_logged_in(&mirror);
        Self {
            config,
            store,
            mirror,
            products: Vec::new(),
            catalog_source: None,
            cart: Cart::new(),
            checkout: Checkout::new(),
            admin_logged_in,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Catalog service over this state's store and mirror.
    #[must_use]
    pub const fn catalog(&self) -> Catalog<'_, S> {
        Catalog::new(&self.store, &self.mirror)
    }

    /// Load (or reload) the product list.
    pub async fn load_catalog(&mut self) -> &[Product] {
        let loaded = self.catalog().load().await;
        self.products = loaded.products;
        self.catalog_source = Some(loaded.source);
        &self.products
    }

    /// The last loaded product list.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Where the last loaded product list came from.
    #[must_use]
    pub const fn catalog_source(&self) -> Option<CatalogSource> {
        self.catalog_source
    }

    // =========================================================================
    // Cart and checkout
    // =========================================================================

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    #[must_use]
    pub const fn checkout(&self) -> &Checkout {
        &self.checkout
    }

    pub const fn checkout_mut(&mut self) -> &mut Checkout {
        &mut self.checkout
    }

    /// Add a loaded product to the cart.
    ///
    /// A chosen color or size must be one the product offers.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a product outside the loaded catalog and
    /// `BadRequest` for an unavailable product or an option it does not
    /// offer.
    pub fn add_to_cart(
        &mut self,
        product_id: ProductId,
        color: Option<&str>,
        size: Option<&str>,
    ) -> Result<LineId> {
        let product = self
            .products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

        if !product.is_purchasable() {
            return Err(AppError::BadRequest(format!(
                "{} is not available ({})",
                product.name,
                product.status.label()
            )));
        }
        // Stored spelling, so "#8b4513" and "#8B4513" share a cart line.
        let color = color
            .map(|color| {
                product
                    .colors
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(color))
                    .map(String::as_str)
                    .ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "color {color} is not offered for {}",
                            product.name
                        ))
                    })
            })
            .transpose()?;
        if let Some(size) = size
            && !product.sizes.iter().any(|s| s == size)
        {
            return Err(AppError::BadRequest(format!(
                "size {size} is not offered for {}",
                product.name
            )));
        }

        let id = self.cart.add(product, color, size);
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", &product_id.to_string())]),
        );
        Ok(id)
    }

    /// Move from the cart to the customer form.
    ///
    /// # Errors
    ///
    /// Returns the checkout error (empty cart, submission in flight).
    pub fn proceed_to_checkout(&mut self) -> Result<()> {
        Ok(self.checkout.proceed(&self.cart)?)
    }

    /// Submit the order for the current cart and customer draft.
    ///
    /// # Errors
    ///
    /// Returns the checkout error; the cart is kept on failure.
    pub async fn submit_order(&mut self) -> Result<OrderId> {
        let Self {
            store,
            mirror,
            cart,
            checkout,
            ..
        } = self;
        Ok(checkout.submit(cart, store, mirror).await?)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.admin_logged_in
    }

    /// Log in with the configured credential triple.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotConfigured` or `InvalidCredentials`.
    pub fn admin_login(&mut self, attempt: &LoginAttempt<'_>) -> Result<()> {
        admin::login(self.config.admin.as_ref(), &self.mirror, attempt)?;
        self.admin_logged_in = true;
        Ok(())
    }

    pub fn admin_logout(&mut self) {
        admin::logout(&self.mirror);
        self.admin_logged_in = false;
    }

    /// Admin panel over this state's store and mirror.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotLoggedIn` without an admin session.
    pub fn admin(&self) -> Result<AdminPanel<'_, S>> {
        if !self.admin_logged_in {
            return Err(admin::AdminError::NotLoggedIn.into());
        }
        Ok(AdminPanel::new(&self.store, &self.mirror))
    }

    /// Re-establish the store session ahead of writes.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when no session could be obtained.
    pub async fn reauthenticate(&self) -> std::result::Result<(), GatewayError> {
        self.store.reauthenticate().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::admin::AdminCredentials;
    use crate::checkout::CheckoutPhase;
    use crate::mirror::MemoryMirror;

    fn state() -> AppState<LocalTables> {
        let mut config = StoreConfig::local("unused");
        config.admin = Some(AdminCredentials::new(
            "admin".to_string(),
            SecretString::from("vix-pass-2026"),
            SecretString::from("VIX-7781"),
        ));
        AppState::new(
            config,
            LocalTables::new(Arc::new(MemoryMirror::new())),
            Mirror::in_memory(),
        )
    }

    #[tokio::test]
    async fn test_shopping_flow() {
        let mut state = state();
        assert_eq!(state.load_catalog().await.len(), 2);
        assert_eq!(state.catalog_source(), Some(CatalogSource::Defaults));

        state
            .add_to_cart(ProductId::new(1), Some("#000000"), Some("M"))
            .unwrap();
        state.proceed_to_checkout().unwrap();
        {
            let customer = state.checkout_mut().customer_mut();
            customer.name = "Mona".to_string();
            customer.phone = "01012345678".to_string();
            customer.address = "Cairo".to_string();
        }

        let order_id = state.submit_order().await.unwrap();
        assert_eq!(state.checkout().phase(), &CheckoutPhase::Success { order_id });
        assert!(state.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_to_cart_checks_options() {
        let mut state = state();
        state.load_catalog().await;

        assert!(matches!(
            state.add_to_cart(ProductId::new(99), None, None),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            state.add_to_cart(ProductId::new(2), None, Some("S")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            state.add_to_cart(ProductId::new(2), Some("#FFFFFF"), None),
            Err(AppError::BadRequest(_))
        ));
        assert!(state.add_to_cart(ProductId::new(2), Some("#8b4513"), Some("L")).is_ok());
    }

    #[tokio::test]
    async fn test_add_to_cart_merges_color_case() {
        let mut state = state();
        state.load_catalog().await;

        let first = state
            .add_to_cart(ProductId::new(2), Some("#8b4513"), Some("L"))
            .unwrap();
        let second = state
            .add_to_cart(ProductId::new(2), Some("#8B4513"), Some("L"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(state.cart().len(), 1);
        assert_eq!(state.cart().item_count(), 2);
    }

    #[test]
    fn test_admin_gate() {
        let mut state = state();
        assert!(matches!(
            state.admin(),
            Err(AppError::Admin(admin::AdminError::NotLoggedIn))
        ));

        state
            .admin_login(&LoginAttempt {
                username: "admin",
                password: "vix-pass-2026",
                secret_code: "VIX-7781",
            })
            .unwrap();
        assert!(state.is_admin());
        assert!(state.admin().is_ok());
        assert!(state.mirror().load_admin_flag());

        state.admin_logout();
        assert!(!state.is_admin());
        assert!(!state.mirror().load_admin_flag());
    }
}
