//! Client-side filters for the admin product and order tables.

use chrono::{DateTime, Duration, Utc};
use vix_core::{OrderStatus, OrderWithItems, Product, ProductStatus};

/// Creation-date window, relative to the time of filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateBucket {
    #[default]
    All,
    /// Same calendar day (UTC).
    Today,
    Last7Days,
    Last30Days,
}

impl DateBucket {
    /// Whether a record created at `created_at` falls in the window ending
    /// at `now`.
    #[must_use]
    pub fn contains(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Today => created_at.date_naive() == now.date_naive(),
            Self::Last7Days => created_at >= now - Duration::days(7),
            Self::Last30Days => created_at >= now - Duration::days(30),
        }
    }
}

impl std::str::FromStr for DateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" | "7d" => Ok(Self::Last7Days),
            "month" | "30d" => Ok(Self::Last30Days),
            other => Err(format!("invalid date range: {other}")),
        }
    }
}

/// Product table filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub category: Option<String>,
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.status.is_none_or(|status| product.status == status)
            && self
                .category
                .as_deref()
                .is_none_or(|category| product.category == category)
            && self.name.as_deref().is_none_or(|needle| {
                product
                    .name
                    .to_lowercase()
                    .contains(&needle.trim().to_lowercase())
            })
    }

    /// Products passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Order table filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub date: DateBucket,
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &OrderWithItems, now: DateTime<Utc>) -> bool {
        self.status.is_none_or(|status| order.order.status == status)
            && self.date.contains(order.order.created_at, now)
    }

    /// Orders passing the filter at `now`, in their original order.
    #[must_use]
    pub fn apply<'a>(
        &self,
        orders: &'a [OrderWithItems],
        now: DateTime<Utc>,
    ) -> Vec<&'a OrderWithItems> {
        orders.iter().filter(|o| self.matches(o, now)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::catalog::default_catalog;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    fn order(status: OrderStatus, created_at: DateTime<Utc>) -> OrderWithItems {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "customer_name": "Mona",
            "customer_phone": "01012345678",
            "customer_address": "Cairo",
            "status": status,
            "created_at": created_at,
        }))
        .unwrap()
    }

    #[test]
    fn test_date_buckets() {
        let now = at(18, 12);
        assert!(DateBucket::Today.contains(at(18, 0), now));
        assert!(!DateBucket::Today.contains(at(17, 23), now));
        assert!(DateBucket::Last7Days.contains(at(11, 12), now));
        assert!(!DateBucket::Last7Days.contains(at(11, 11), now));
        assert!(DateBucket::Last30Days.contains(at(1, 0), now));
        assert!(DateBucket::All.contains(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), now));
    }

    #[test]
    fn test_date_bucket_parse() {
        assert_eq!("week".parse::<DateBucket>().unwrap(), DateBucket::Last7Days);
        assert_eq!("30d".parse::<DateBucket>().unwrap(), DateBucket::Last30Days);
        assert!("year".parse::<DateBucket>().is_err());
    }

    #[test]
    fn test_product_filter() {
        let mut products = default_catalog();
        products[1].status = ProductStatus::Archived;

        let filter = ProductFilter {
            name: Some("CLASSIC".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.apply(&products).len(), 1);

        let filter = ProductFilter {
            status: Some(ProductStatus::Archived),
            category: Some("jackets".to_string()),
            name: None,
        };
        let matched = filter.apply(&products);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "VIX Leather Jacket");

        let filter = ProductFilter {
            category: Some("shoes".to_string()),
            ..ProductFilter::default()
        };
        assert!(filter.apply(&products).is_empty());
    }

    #[test]
    fn test_order_filter() {
        let now = at(18, 12);
        let orders = vec![
            order(OrderStatus::Pending, at(18, 9)),
            order(OrderStatus::Shipped, at(15, 9)),
            order(OrderStatus::Pending, at(2, 9)),
        ];

        let pending_this_week = OrderFilter {
            status: Some(OrderStatus::Pending),
            date: DateBucket::Last7Days,
        };
        assert_eq!(pending_this_week.apply(&orders, now).len(), 1);

        let this_month = OrderFilter {
            status: None,
            date: DateBucket::Last30Days,
        };
        assert_eq!(this_month.apply(&orders, now).len(), 3);
        assert_eq!(OrderFilter::default().apply(&orders, now).len(), 3);
    }
}
