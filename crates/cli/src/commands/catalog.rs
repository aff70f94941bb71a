//! `vix catalog` - list products.

use vix_storefront::AppState;
use vix_storefront::catalog::CatalogSource;
use vix_storefront::gateway::TableStore;

use super::product_line;

/// List the catalog, optionally narrowed by category or a search term.
pub async fn list<S: TableStore>(
    state: &mut AppState<S>,
    category: Option<&str>,
    search: Option<&str>,
) {
    let products = match (category, search) {
        (Some(category), _) => {
            let mut products = state.catalog().by_category(category).await;
            if let Some(term) = search {
                let needle = term.trim().to_lowercase();
                products.retain(|p| {
                    p.name.to_lowercase().contains(&needle)
                        || p.description.to_lowercase().contains(&needle)
                });
            }
            products
        }
        (None, Some(term)) => state.catalog().search(term).await,
        (None, None) => {
            let products = state.load_catalog().await.to_vec();
            match state.catalog_source() {
                Some(CatalogSource::Cache) => {
                    tracing::warn!("Store unavailable, showing cached products");
                }
                Some(CatalogSource::Defaults) => {
                    tracing::warn!("Store unavailable, showing the default catalog");
                }
                _ => {}
            }
            products
        }
    };

    if products.is_empty() {
        tracing::info!("No products found");
        return;
    }

    for product in &products {
        tracing::info!("{}", product_line(product));
    }
    tracing::info!("{} product(s), free shipping, cash on delivery", products.len());
}
