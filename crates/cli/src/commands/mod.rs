//! Subcommand implementations.

pub mod admin;
pub mod catalog;
pub mod order;

use vix_core::Product;

/// One-line product summary used by listings.
pub fn product_line(product: &Product) -> String {
    let mut line = format!(
        "#{:<4} {:<28} {:>12}  {:<10} stock {:<4} {}",
        product.id.to_string(),
        product.name,
        product.price.display(),
        product.category,
        product.stock,
        product.status.label(),
    );
    if !product.colors.is_empty() {
        line.push_str(&format!("  colors {}", product.colors.join(",")));
    }
    if !product.sizes.is_empty() {
        line.push_str(&format!("  sizes {}", product.sizes.join(",")));
    }
    line
}
