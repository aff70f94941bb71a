//! In-memory shopping cart.
//!
//! Lines are addressed by a locally generated [`LineId`]; the same product
//! appears on separate lines when chosen with a different color or size.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vix_core::{Price, Product, ProductId};

/// Cart line identifier, unique within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cart line: a product snapshot with the chosen options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub product: Product,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }

    fn same_choice(&self, product_id: ProductId, color: Option<&str>, size: Option<&str>) -> bool {
        self.product.id == product_id
            && self.color.as_deref() == color
            && self.size.as_deref() == size
    }
}

/// The shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `product` with the chosen options.
    ///
    /// An existing line with the same product, color and size is
    /// incremented; any other combination gets a new line. Returns the id
    /// of the affected line.
    pub fn add(&mut self, product: &Product, color: Option<&str>, size: Option<&str>) -> LineId {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.same_choice(product.id, color, size))
        {
            line.quantity = line.quantity.saturating_add(1);
            return line.id;
        }

        let id = LineId::generate();
        self.lines.push(CartLine {
            id,
            product: product.clone(),
            color: color.map(str::to_owned),
            size: size.map(str::to_owned),
            quantity: 1,
        });
        id
    }

    /// Remove a line. Unknown ids are ignored.
    pub fn remove(&mut self, id: LineId) {
        self.lines.retain(|line| line.id != id);
    }

    /// Set a line's quantity; anything below one removes the line.
    pub fn update_quantity(&mut self, id: LineId, quantity: u32) {
        if quantity < 1 {
            self.remove(id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == id) {
            line.quantity = quantity;
        }
    }

    /// Sum of unit price times quantity over all lines. Shipping is free.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn get(&self, id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    #[test]
    fn test_total_of_huge_price_does_not_panic() {
        let mut coat = default_catalog()[1].clone();
        coat.price = "79228162514264337593543950335".parse().unwrap();
        let mut cart = Cart::new();
        cart.add(&coat, None, None);
        cart.add(&coat, None, None);

        assert_eq!(cart.total_price(), coat.price);
    }

    #[test]
    fn test_same_choice_merges() {
        let shirt = &default_catalog()[0];
        let mut cart = Cart::new();

        let first = cart.add(shirt, Some("#000000"), Some("M"));
        let second = cart.add(shirt, Some("#000000"), Some("M"));

        assert_eq!(first, second);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(first).unwrap().quantity, 2);
    }

    #[test]
    fn test_different_choice_is_new_line() {
        let shirt = &default_catalog()[0];
        let mut cart = Cart::new();

        cart.add(shirt, Some("#000000"), Some("M"));
        cart.add(shirt, Some("#C41E3A"), Some("M"));
        cart.add(shirt, Some("#000000"), Some("L"));
        cart.add(shirt, None, None);

        assert_eq!(cart.len(), 4);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_update_quantity() {
        let catalog = default_catalog();
        let mut cart = Cart::new();
        let shirt = cart.add(&catalog[0], None, Some("S"));
        let jacket = cart.add(&catalog[1], None, Some("L"));

        cart.update_quantity(shirt, 3);
        assert_eq!(cart.get(shirt).unwrap().quantity, 3);
        assert_eq!(cart.total_price(), Price::from_whole(299 * 3 + 899));

        cart.update_quantity(jacket, 0);
        assert!(cart.get(jacket).is_none());
        assert_eq!(cart.total_price(), Price::from_whole(897));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut cart = Cart::new();
        cart.add(&default_catalog()[0], None, None);
        cart.remove(LineId::generate());
        cart.update_quantity(LineId::generate(), 5);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add(&default_catalog()[1], None, None);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Price::ZERO);
    }
}
