//! Product form and product management.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use vix_core::{NewProduct, Price, Product, ProductId, ProductStatus};

use super::{AdminError, AdminPanel};
use crate::catalog::Catalog;
use crate::gateway::{GatewayError, Query, Table, TableStore};

/// Largest accepted image upload (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Colors offered on a fresh form: black, crimson, navy.
pub const DEFAULT_COLORS: [&str; 3] = ["#000000", "#C41E3A", "#1E3A8A"];

/// Sizes offered on a fresh form.
pub const DEFAULT_SIZES: [&str; 4] = ["S", "M", "L", "XL"];

/// Highest unit price the form accepts, in pounds.
pub const MAX_PRICE: i64 = 10_000_000;

const DEFAULT_STOCK: &str = "10";
const DEFAULT_RATING: &str = "4.5";

// =============================================================================
// Images
// =============================================================================

/// Errors for product images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("only image files are accepted (got {0})")]
    UnsupportedType(String),

    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: usize },

    #[error("invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Image source chosen on the product form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageInput {
    #[default]
    None,
    /// Remote image or an existing `data:` URL.
    Url(String),
    /// Uploaded file contents.
    File { content_type: String, bytes: Vec<u8> },
}

impl ImageInput {
    /// Read an image file, inferring its content type from the extension.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for non-image extensions, `TooLarge` for
    /// files over [`MAX_IMAGE_BYTES`] (checked before reading) and `Io`
    /// when the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let content_type = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "avif" => "image/avif",
            _ => return Err(ImageError::UnsupportedType(format!(".{extension}"))),
        };

        let size = std::fs::metadata(path)?.len();
        if size > MAX_IMAGE_BYTES as u64 {
            return Err(ImageError::TooLarge {
                size,
                max: MAX_IMAGE_BYTES,
            });
        }

        Ok(Self::File {
            content_type: content_type.to_string(),
            bytes: std::fs::read(path)?,
        })
    }

    /// The value stored in the product's `image` column, or `None` when no
    /// image was chosen.
    ///
    /// # Errors
    ///
    /// Returns `ImageError` for a non-image file, an oversized file or a URL
    /// that is neither `http(s)` nor `data:image/`.
    pub fn resolve(&self) -> Result<Option<String>, ImageError> {
        match self {
            Self::None => Ok(None),
            Self::Url(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Ok(None);
                }
                if raw.starts_with("data:image/") {
                    return Ok(Some(raw.to_string()));
                }
                let url = url::Url::parse(raw).map_err(|e| ImageError::InvalidUrl(e.to_string()))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ImageError::InvalidUrl(format!(
                        "unsupported scheme '{}'",
                        url.scheme()
                    )));
                }
                Ok(Some(url.to_string()))
            }
            Self::File {
                content_type,
                bytes,
            } => {
                if !content_type.starts_with("image/") {
                    return Err(ImageError::UnsupportedType(content_type.clone()));
                }
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(ImageError::TooLarge {
                        size: bytes.len() as u64,
                        max: MAX_IMAGE_BYTES,
                    });
                }
                Ok(Some(format!(
                    "data:{content_type};base64,{}",
                    STANDARD.encode(bytes)
                )))
            }
        }
    }
}

// =============================================================================
// Form
// =============================================================================

/// Per-field messages from [`ProductForm::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFormErrors {
    pub fields: Vec<(&'static str, String)>,
}

impl ProductFormErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Message for `field`, if it is invalid.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push((field, message.into()));
    }
}

impl std::fmt::Display for ProductFormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (field, message)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Admin product form, holding raw text the way it was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub category: String,
    pub description: String,
    pub stock: String,
    pub rating: String,
    pub image: ImageInput,
    pub status: ProductStatus,
    colors: Vec<String>,
    sizes: Vec<String>,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            price: String::new(),
            category: String::new(),
            description: String::new(),
            stock: DEFAULT_STOCK.to_string(),
            rating: DEFAULT_RATING.to_string(),
            image: ImageInput::None,
            status: ProductStatus::Active,
            colors: DEFAULT_COLORS.map(String::from).to_vec(),
            sizes: DEFAULT_SIZES.map(String::from).to_vec(),
        }
    }
}

impl ProductForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Form pre-filled from an existing product, for editing.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        let defaults = Self::default();
        Self {
            name: product.name.clone(),
            price: product.price.amount().to_string(),
            category: product.category.clone(),
            description: product.description.clone(),
            stock: product.stock.to_string(),
            rating: product.rating.to_string(),
            image: if product.image.is_empty() {
                ImageInput::None
            } else {
                ImageInput::Url(product.image.clone())
            },
            status: product.status,
            colors: if product.colors.is_empty() {
                defaults.colors
            } else {
                product.colors.clone()
            },
            sizes: if product.sizes.is_empty() {
                defaults.sizes
            } else {
                product.sizes.clone()
            },
        }
    }

    #[must_use]
    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    #[must_use]
    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    /// Append a color.
    ///
    /// # Errors
    ///
    /// Returns the validation message for a malformed hex color.
    pub fn add_color(&mut self, color: &str) -> Result<(), String> {
        self.colors.push(normalize_color(color)?);
        Ok(())
    }

    /// Replace the color at `index`. Out-of-range indexes are ignored.
    ///
    /// # Errors
    ///
    /// Returns the validation message for a malformed hex color.
    pub fn set_color(&mut self, index: usize, color: &str) -> Result<(), String> {
        let color = normalize_color(color)?;
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
        Ok(())
    }

    /// Remove the color at `index` unless it is the last one. Returns
    /// whether a color was removed.
    pub fn remove_color(&mut self, index: usize) -> bool {
        remove_keeping_one(&mut self.colors, index)
    }

    /// Replace every color at once.
    ///
    /// # Errors
    ///
    /// Returns the first validation message, or an error for an empty list.
    pub fn set_colors<I, T>(&mut self, colors: I) -> Result<(), String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let colors = colors
            .into_iter()
            .map(|c| normalize_color(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if colors.is_empty() {
            return Err("At least one color is required".to_string());
        }
        self.colors = colors;
        Ok(())
    }

    /// Append a size label. Blank labels are ignored.
    pub fn add_size(&mut self, size: &str) {
        let size = size.trim();
        if !size.is_empty() {
            self.sizes.push(size.to_string());
        }
    }

    /// Replace the size at `index`. Out-of-range indexes and blank labels
    /// are ignored.
    pub fn set_size(&mut self, index: usize, size: &str) {
        let size = size.trim();
        if size.is_empty() {
            return;
        }
        if let Some(slot) = self.sizes.get_mut(index) {
            *slot = size.to_string();
        }
    }

    /// Remove the size at `index` unless it is the last one. Returns
    /// whether a size was removed.
    pub fn remove_size(&mut self, index: usize) -> bool {
        remove_keeping_one(&mut self.sizes, index)
    }

    /// Replace every size at once. Blank labels are dropped; an empty
    /// result keeps the current sizes and returns `false`.
    pub fn set_sizes<I, T>(&mut self, sizes: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let sizes: Vec<String> = sizes
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sizes.is_empty() {
            return false;
        }
        self.sizes = sizes;
        true
    }

    /// Validate the form into a store payload.
    ///
    /// `existing_sku` is kept when editing; new products get a generated
    /// SKU.
    ///
    /// # Errors
    ///
    /// Returns every invalid field at once.
    pub fn build(
        &self,
        existing_sku: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<NewProduct, ProductFormErrors> {
        let mut errors = ProductFormErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("name", "Product name is required");
        }

        let price = match self.price.trim().parse::<Price>() {
            Ok(price) if price > Price::from_whole(MAX_PRICE) => {
                errors.push("price", "Price is too large");
                None
            }
            Ok(price) if price.is_positive() => Some(price),
            Ok(_) => {
                errors.push("price", "Price must be greater than zero");
                None
            }
            Err(_) => {
                errors.push("price", "Price must be a number");
                None
            }
        };

        let category = self.category.trim().to_lowercase();
        if category.is_empty() {
            errors.push("category", "Category is required");
        }

        let stock = parse_or_default(&self.stock, DEFAULT_STOCK).parse::<u32>().ok();
        if stock.is_none() {
            errors.push("stock", "Stock must be a whole number of zero or more");
        }

        let rating = parse_or_default(&self.rating, DEFAULT_RATING)
            .parse::<f64>()
            .ok()
            .filter(|r| (0.0..=5.0).contains(r));
        if rating.is_none() {
            errors.push("rating", "Rating must be between 0 and 5");
        }

        let image = match self.image.resolve() {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                errors.push("image", "A product image is required");
                None
            }
            Err(e) => {
                errors.push("image", e.to_string());
                None
            }
        };

        match (price, stock, rating, image) {
            (Some(price), Some(stock), Some(rating), Some(image)) if errors.is_empty() => {
                Ok(NewProduct {
                    name: name.to_string(),
                    price,
                    sku: existing_sku
                        .map_or_else(|| generate_sku(&category, now), str::to_string),
                    category,
                    description: self.description.trim().to_string(),
                    image,
                    colors: self.colors.clone(),
                    sizes: self.sizes.clone(),
                    stock,
                    rating,
                    status: self.status,
                    updated_at: now,
                })
            }
            _ => Err(errors),
        }
    }
}

/// SKU for a new product: `VIX-<CATEGORY>-<last six digits of epoch millis>`.
#[must_use]
pub fn generate_sku(category: &str, now: DateTime<Utc>) -> String {
    let suffix = now.timestamp_millis().rem_euclid(1_000_000);
    format!("VIX-{}-{suffix:06}", category.trim().to_uppercase())
}

fn parse_or_default<'a>(raw: &'a str, default: &'a str) -> &'a str {
    let raw = raw.trim();
    if raw.is_empty() { default } else { raw }
}

/// Accept `#RGB` or `#RRGGBB` and return the uppercase long form.
fn normalize_color(raw: &str) -> Result<String, String> {
    let hex = raw
        .trim()
        .strip_prefix('#')
        .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| format!("'{}' is not a hex color like #C41E3A", raw.trim()))?;

    match hex.len() {
        6 => Ok(format!("#{}", hex.to_ascii_uppercase())),
        3 => Ok(format!(
            "#{}",
            hex.chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_uppercase()
        )),
        _ => Err(format!("'{}' is not a hex color like #C41E3A", raw.trim())),
    }
}

fn remove_keeping_one(values: &mut Vec<String>, index: usize) -> bool {
    if values.len() <= 1 || index >= values.len() {
        return false;
    }
    values.remove(index);
    true
}

// =============================================================================
// Product management
// =============================================================================

#[derive(Serialize)]
struct StatusPatch {
    status: ProductStatus,
    updated_at: DateTime<Utc>,
}

impl<S: TableStore> AdminPanel<'_, S> {
    /// Every product, with the catalog's cache fallback.
    pub async fn products(&self) -> Vec<Product> {
        Catalog::new(self.store, self.mirror).load().await.products
    }

    /// Create a product from the form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProduct` before any write, `PermissionDenied` when
    /// the store refuses, or `Gateway` for other store failures.
    #[instrument(skip_all, fields(name = %form.name))]
    pub async fn create_product(&self, form: &ProductForm) -> Result<Product, AdminError> {
        let payload = form
            .build(None, Utc::now())
            .map_err(AdminError::InvalidProduct)?;

        let product = self
            .store
            .insert::<_, Product>(Table::Products, std::slice::from_ref(&payload))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AdminError::Gateway(GatewayError::NotFound("inserted product row".to_string()))
            })?;

        tracing::info!(product_id = %product.id, sku = ?product.sku, "Product created");
        self.refresh_products().await;
        Ok(product)
    }

    /// Replace a product's fields from the form, keeping its SKU.
    ///
    /// # Errors
    ///
    /// As [`Self::create_product`].
    #[instrument(skip(self, form), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        form: &ProductForm,
        existing_sku: Option<&str>,
    ) -> Result<Product, AdminError> {
        let payload = form
            .build(existing_sku, Utc::now())
            .map_err(AdminError::InvalidProduct)?;

        let product: Product = self
            .store
            .update_by_id(Table::Products, id.as_i64(), &payload)
            .await?;

        tracing::info!("Product updated");
        self.refresh_products().await;
        Ok(product)
    }

    /// Change a product's status.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Gateway` on store failure.
    #[instrument(skip(self), fields(product_id = %id, status = %status))]
    pub async fn set_product_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<Product, AdminError> {
        let patch = StatusPatch {
            status,
            updated_at: Utc::now(),
        };
        let product: Product = self
            .store
            .update_by_id(Table::Products, id.as_i64(), &patch)
            .await?;

        tracing::info!("Product status changed");
        self.refresh_products().await;
        Ok(product)
    }

    /// Delete a product and drop it from the cache.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Gateway` on store failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        self.store.delete_by_id(Table::Products, id.as_i64()).await?;

        let remaining: Vec<Product> = self
            .mirror
            .load_products()
            .into_iter()
            .filter(|p| p.id != id)
            .collect();
        self.mirror.save_products(&remaining);

        tracing::info!("Product deleted");
        Ok(())
    }

    /// Reload the product list into the cache after a mutation.
    async fn refresh_products(&self) {
        match self
            .store
            .select::<Product>(Table::Products, &Query::new().newest_first())
            .await
        {
            Ok(products) => self.mirror.save_products(&products),
            Err(e) => tracing::warn!(error = %e, "Failed to refresh product cache"),
        }
    }
}
