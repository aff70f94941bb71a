//! Catalog service.
//!
//! Products come from the table store first, then from the mirrored
//! product cache, then from a built-in default catalog. Loading never
//! fails; every fallback is logged.

use tracing::instrument;
use vix_core::{Price, Product, ProductId, ProductStatus};

use crate::gateway::{Query, Table, TableStore};
use crate::mirror::Mirror;

/// Columns searched by [`Catalog::search`].
pub const SEARCH_COLUMNS: [&str; 2] = ["name", "description"];

/// Where a loaded product list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Fresh rows from the table store.
    Remote,
    /// The mirrored product cache.
    Cache,
    /// The built-in default catalog.
    Defaults,
}

/// Result of [`Catalog::load`].
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub products: Vec<Product>,
    pub source: CatalogSource,
}

/// Read access to the product catalog with cache fallback.
pub struct Catalog<'a, S> {
    store: &'a S,
    mirror: &'a Mirror,
}

impl<'a, S: TableStore> Catalog<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, mirror: &'a Mirror) -> Self {
        Self { store, mirror }
    }

    /// Load every product, newest first.
    ///
    /// A non-empty remote result overwrites the cache. A failed or empty
    /// remote result falls back to the cache; an empty cache is seeded
    /// with [`default_catalog`].
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadedCatalog {
        match self
            .store
            .select::<Product>(Table::Products, &Query::new().newest_first())
            .await
        {
            Ok(products) if !products.is_empty() => {
                self.mirror.save_products(&products);
                tracing::info!(count = products.len(), "Loaded catalog from store");
                return LoadedCatalog {
                    products,
                    source: CatalogSource::Remote,
                };
            }
            Ok(_) => tracing::warn!("Store returned no products, using cache"),
            Err(e) => tracing::warn!(error = %e, "Failed to load products, using cache"),
        }

        let cached = self.mirror.load_products();
        if !cached.is_empty() {
            return LoadedCatalog {
                products: cached,
                source: CatalogSource::Cache,
            };
        }

        tracing::warn!("Product cache is empty, installing default catalog");
        let defaults = default_catalog();
        self.mirror.save_products(&defaults);
        LoadedCatalog {
            products: defaults,
            source: CatalogSource::Defaults,
        }
    }

    /// Look up one product, falling back to the cache.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        match self
            .store
            .select_by_id::<Product>(Table::Products, id.as_i64())
            .await
        {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch product, using cache");
                self.cached().into_iter().find(|p| p.id == id)
            }
        }
    }

    /// Products in `category`, newest first.
    #[instrument(skip(self))]
    pub async fn by_category(&self, category: &str) -> Vec<Product> {
        let query = Query::new().eq("category", category).newest_first();
        match self.store.select::<Product>(Table::Products, &query).await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query category, filtering cache");
                self.cached()
                    .into_iter()
                    .filter(|p| p.category == category)
                    .collect()
            }
        }
    }

    /// Products whose name or description contains `term`, ignoring case.
    /// A blank term returns the whole catalog.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Vec<Product> {
        let term = term.trim();
        if term.is_empty() {
            return self.load().await.products;
        }

        let query = Query::new()
            .search(&SEARCH_COLUMNS, term)
            .newest_first();
        match self.store.select::<Product>(Table::Products, &query).await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to search products, filtering cache");
                let needle = term.to_lowercase();
                self.cached()
                    .into_iter()
                    .filter(|p| {
                        p.name.to_lowercase().contains(&needle)
                            || p.description.to_lowercase().contains(&needle)
                    })
                    .collect()
            }
        }
    }

    fn cached(&self) -> Vec<Product> {
        let cached = self.mirror.load_products();
        if cached.is_empty() {
            default_catalog()
        } else {
            cached
        }
    }
}

/// The two seed products installed when nothing else is available.
#[must_use]
pub fn default_catalog() -> Vec<Product> {
    vec![
        Product {
            id: ProductId::new(1),
            name: "VIX Classic Shirt".to_string(),
            price: Price::from_whole(299),
            category: "shirts".to_string(),
            description: "Premium cotton shirt with a modern fit".to_string(),
            image: "https://images.unsplash.com/photo-1596755094514-f87e34085b2c?w=500"
                .to_string(),
            colors: vec!["#000000".to_string(), "#C41E3A".to_string()],
            sizes: ["S", "M", "L", "XL"].map(String::from).to_vec(),
            stock: 15,
            rating: 4.8,
            sku: Some("VIX-001".to_string()),
            status: ProductStatus::Active,
            created_at: None,
            updated_at: None,
        },
        Product {
            id: ProductId::new(2),
            name: "VIX Leather Jacket".to_string(),
            price: Price::from_whole(899),
            category: "jackets".to_string(),
            description: "Genuine leather jacket with a timeless design".to_string(),
            image: "https://images.unsplash.com/photo-1551028719-00167b16eac5?w=500"
                .to_string(),
            colors: vec!["#000000".to_string(), "#8B4513".to_string()],
            sizes: ["M", "L", "XL"].map(String::from).to_vec(),
            stock: 8,
            rating: 4.9,
            sku: Some("VIX-002".to_string()),
            status: ProductStatus::Active,
            created_at: None,
            updated_at: None,
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gateway::LocalTables;
    use crate::mirror::MemoryMirror;

    fn setup() -> (LocalTables, Mirror) {
        (
            LocalTables::new(Arc::new(MemoryMirror::new())),
            Mirror::in_memory(),
        )
    }

    async fn seed(store: &LocalTables) {
        let rows = vec![
            serde_json::json!({"name": "Linen Shirt", "price": 350, "category": "shirts",
                "description": "Breathable", "created_at": "2026-09-01T00:00:00Z"}),
            serde_json::json!({"name": "Denim Jacket", "price": 750, "category": "jackets",
                "description": "Washed denim", "created_at": "2026-10-01T00:00:00Z"}),
        ];
        let _: Vec<Product> = store.insert(Table::Products, &rows).await.unwrap();
    }

    #[test]
    fn test_default_catalog() {
        let defaults = default_catalog();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[0].price, Price::from_whole(299));
        assert_eq!(defaults[1].price, Price::from_whole(899));
        assert!(defaults.iter().all(Product::is_purchasable));
    }

    #[tokio::test]
    async fn test_load_from_store_refreshes_cache() {
        let (store, mirror) = setup();
        seed(&store).await;

        let loaded = Catalog::new(&store, &mirror).load().await;
        assert_eq!(loaded.source, CatalogSource::Remote);
        assert_eq!(loaded.products[0].name, "Denim Jacket");
        assert_eq!(mirror.load_products(), loaded.products);
    }

    #[tokio::test]
    async fn test_empty_store_seeds_defaults() {
        let (store, mirror) = setup();

        let loaded = Catalog::new(&store, &mirror).load().await;
        assert_eq!(loaded.source, CatalogSource::Defaults);
        assert_eq!(mirror.load_products(), default_catalog());

        let again = Catalog::new(&store, &mirror).load().await;
        assert_eq!(again.source, CatalogSource::Cache);
    }

    #[tokio::test]
    async fn test_category_and_search() {
        let (store, mirror) = setup();
        seed(&store).await;
        let catalog = Catalog::new(&store, &mirror);

        let jackets = catalog.by_category("jackets").await;
        assert_eq!(jackets.len(), 1);
        assert_eq!(jackets[0].name, "Denim Jacket");

        let found = catalog.search("BREATH").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Linen Shirt");

        assert_eq!(catalog.search("  ").await.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let (store, mirror) = setup();
        seed(&store).await;
        let catalog = Catalog::new(&store, &mirror);

        let product = catalog.get(ProductId::new(2)).await.unwrap();
        assert_eq!(product.name, "Denim Jacket");
    }
}
