//! Product records as stored in the `products` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::de::{clamped_count, null_as_default, string_list};
use super::{Price, ProductId, ProductStatus};

/// A catalog product.
///
/// Optional columns tolerate `null` and absence; `colors` and `sizes` also
/// accept the JSON-encoded string form written by older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Image URL or `data:` URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    /// Hex color values (e.g., `#000000`).
    #[serde(default, deserialize_with = "string_list")]
    pub colors: Vec<String>,
    /// Size labels, small to large by convention.
    #[serde(default, deserialize_with = "string_list")]
    pub sizes: Vec<String>,
    #[serde(default, deserialize_with = "clamped_count")]
    pub stock: u32,
    /// Average rating, 0 to 5.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ProductStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product can be put in a cart.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active && self.stock > 0
    }
}

/// Insert/update payload for the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub category: String,
    pub description: String,
    pub image: String,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub stock: u32,
    pub rating: f64,
    pub sku: String,
    pub status: ProductStatus,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_row() {
        let product: Product =
            serde_json::from_str(r#"{"id": 3, "name": "Cap", "price": 120}"#).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Price::from_whole(120));
        assert!(product.colors.is_empty());
        assert_eq!(product.status, ProductStatus::Active);
    }

    #[test]
    fn test_deserialize_nulls_as_defaults() {
        let product: Product = serde_json::from_str(
            r#"{"id": 1, "name": "Shirt", "price": "299", "description": null,
                "stock": null, "status": null, "colors": null}"#,
        )
        .unwrap();
        assert_eq!(product.description, "");
        assert_eq!(product.stock, 0);
        assert_eq!(product.status, ProductStatus::Active);
        assert!(product.colors.is_empty());
    }

    #[test]
    fn test_deserialize_encoded_lists() {
        let product: Product = serde_json::from_str(
            r##"{"id": 1, "name": "Shirt", "price": 299,
                "colors": "[\"#000000\",\"#C41E3A\"]", "sizes": ["S", "M"]}"##,
        )
        .unwrap();
        assert_eq!(product.colors, vec!["#000000", "#C41E3A"]);
        assert_eq!(product.sizes, vec!["S", "M"]);
    }

    #[test]
    fn test_negative_stock_reads_as_zero() {
        let products: Vec<Product> = serde_json::from_str(
            r#"[{"id": 1, "name": "Shirt", "price": 299, "stock": -3},
                {"id": 2, "name": "Jacket", "price": 899, "stock": 5}]"#,
        )
        .unwrap();
        assert_eq!(products[0].stock, 0);
        assert!(!products[0].is_purchasable());
        assert_eq!(products[1].stock, 5);
    }

    #[test]
    fn test_purchasable() {
        let mut product: Product =
            serde_json::from_str(r#"{"id": 1, "name": "Shirt", "price": 299, "stock": 2}"#)
                .unwrap();
        assert!(product.is_purchasable());
        product.status = ProductStatus::Archived;
        assert!(!product.is_purchasable());
    }
}
