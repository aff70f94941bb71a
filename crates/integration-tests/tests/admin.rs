//! Admin back-office: login gate, product and order management.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use vix_core::{OrderId, OrderStatus, OrderWithItems, Price, ProductId, ProductStatus};
use vix_integration_tests::{
    ADMIN_PASSWORD, ADMIN_SECRET, ADMIN_USERNAME, Harness, Op, ScriptedStore, customer,
    rls_denied, server_error,
};
use vix_storefront::AppError;
use vix_storefront::admin::{
    AdminError, DateBucket, ImageInput, LoginAttempt, OrderFilter, OrderSource, OrderStats,
    ProductFilter, ProductForm,
};
use vix_storefront::gateway::Table;

fn jacket_form() -> ProductForm {
    let mut form = ProductForm::new();
    form.name = "Denim Jacket".to_string();
    form.price = "649.50".to_string();
    form.category = "Jackets".to_string();
    form.description = "Washed denim".to_string();
    form.image = ImageInput::Url("https://example.com/denim.jpg".to_string());
    form
}

async fn place_order(h: &mut Harness, product: ProductId) -> OrderId {
    h.state.load_catalog().await;
    h.state.add_to_cart(product, None, None).unwrap();
    h.state.proceed_to_checkout().unwrap();
    *h.state.checkout_mut().customer_mut() = customer();
    h.state.submit_order().await.unwrap()
}

// =============================================================================
// Login gate
// =============================================================================

#[test]
fn test_login_requires_all_three_values() {
    let mut h = Harness::new();

    for (username, password, secret_code) in [
        ("admin", ADMIN_PASSWORD, "wrong"),
        ("admin", "wrong", ADMIN_SECRET),
        ("someone", ADMIN_PASSWORD, ADMIN_SECRET),
    ] {
        let err = h
            .state
            .admin_login(&LoginAttempt {
                username,
                password,
                secret_code,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Admin(AdminError::InvalidCredentials)));
    }
    assert!(!h.state.is_admin());
    assert!(matches!(
        h.state.admin(),
        Err(AppError::Admin(AdminError::NotLoggedIn))
    ));
}

#[test]
fn test_login_persists_until_logout() {
    let mut h = Harness::new();
    h.state
        .admin_login(&LoginAttempt {
            username: &format!(" {ADMIN_USERNAME} "),
            password: ADMIN_PASSWORD,
            secret_code: ADMIN_SECRET,
        })
        .unwrap();
    assert!(h.state.is_admin());

    // A fresh state over the same mirror is still logged in
    let mirror = h.mirror().clone();
    let restarted = Harness::with_parts(ScriptedStore::new(mirror.backend()), mirror.clone());
    assert!(restarted.state.is_admin());

    h.state.admin_logout();
    let restarted = Harness::with_parts(ScriptedStore::new(mirror.backend()), mirror);
    assert!(!restarted.state.is_admin());
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_create_product() {
    let mut h = Harness::seeded().await;
    h.login();

    let product = h.state.admin().unwrap().create_product(&jacket_form()).await.unwrap();

    assert_eq!(product.id, ProductId::new(3));
    assert_eq!(product.category, "jackets");
    assert_eq!(product.price, "649.50".parse::<Price>().unwrap());
    assert!(product.sku.as_deref().unwrap().starts_with("VIX-JACKETS-"));
    assert_eq!(product.colors, vec!["#000000", "#C41E3A", "#1E3A8A"]);
    assert_eq!(product.sizes, vec!["S", "M", "L", "XL"]);
    assert_eq!(product.stock, 10);
    assert!(h.mirror().load_products().iter().any(|p| p.id == product.id));
}

#[tokio::test]
async fn test_invalid_form_writes_nothing() {
    let mut h = Harness::seeded().await;
    h.login();
    let mut form = jacket_form();
    form.price = "0".to_string();
    form.image = ImageInput::None;

    let err = h.state.admin().unwrap().create_product(&form).await.unwrap_err();

    let AdminError::InvalidProduct(errors) = err else {
        panic!("expected form errors, got {err:?}");
    };
    assert!(errors.get("price").is_some());
    assert!(errors.get("image").is_some());
    assert_eq!(h.store().calls(Op::Insert, Table::Products), 0);
}

#[tokio::test]
async fn test_update_keeps_sku() {
    let mut h = Harness::seeded().await;
    h.login();
    let admin = h.state.admin().unwrap();
    let shirt = admin
        .products()
        .await
        .into_iter()
        .find(|p| p.id == ProductId::new(1))
        .unwrap();

    let mut form = ProductForm::from_product(&shirt);
    form.price = "349".to_string();
    let updated = admin
        .update_product(shirt.id, &form, shirt.sku.as_deref())
        .await
        .unwrap();

    assert_eq!(updated.sku.as_deref(), Some("VIX-001"));
    assert_eq!(updated.price, Price::from_whole(349));
    assert_eq!(updated.name, shirt.name);
}

#[tokio::test]
async fn test_status_change_and_delete() {
    let mut h = Harness::seeded().await;
    h.login();
    let admin = h.state.admin().unwrap();

    let archived = admin
        .set_product_status(ProductId::new(2), ProductStatus::Archived)
        .await
        .unwrap();
    assert_eq!(archived.status, ProductStatus::Archived);

    admin.delete_product(ProductId::new(1)).await.unwrap();
    let remaining = admin.products().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ProductId::new(2));
    assert!(h.mirror().load_products().iter().all(|p| p.id != ProductId::new(1)));
}

#[tokio::test]
async fn test_permission_denied_is_classified() {
    let mut h = Harness::seeded().await;
    h.login();
    h.store().fail_next(Op::Insert, Table::Products, rls_denied());
    h.store().fail_next(Op::Delete, Table::Products, rls_denied());
    let admin = h.state.admin().unwrap();

    let err = admin.create_product(&jacket_form()).await.unwrap_err();
    assert!(matches!(err, AdminError::PermissionDenied(_)));
    assert!(err.user_message().contains("contact the administrator"));

    let err = admin.delete_product(ProductId::new(1)).await.unwrap_err();
    assert!(matches!(err, AdminError::PermissionDenied(_)));
    assert_eq!(admin.products().await.len(), 2);
}

#[tokio::test]
async fn test_product_filter() {
    let mut h = Harness::seeded().await;
    h.login();
    let admin = h.state.admin().unwrap();
    admin
        .set_product_status(ProductId::new(2), ProductStatus::Inactive)
        .await
        .unwrap();
    let products = admin.products().await;

    let active = ProductFilter {
        status: Some(ProductStatus::Active),
        ..ProductFilter::default()
    };
    let shown = active.apply(&products);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].id, ProductId::new(1));

    let by_name = ProductFilter {
        name: Some("JACKET".to_string()),
        category: Some("jackets".to_string()),
        ..ProductFilter::default()
    };
    assert_eq!(by_name.apply(&products).len(), 1);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_orders_include_items_newest_first() {
    let mut h = Harness::seeded().await;
    let first = place_order(&mut h, ProductId::new(1)).await;
    let second = place_order(&mut h, ProductId::new(2)).await;
    h.login();

    let list = h.state.admin().unwrap().orders().await;

    assert_eq!(list.source, OrderSource::Remote);
    let ids: Vec<OrderId> = list.orders.iter().map(|o| o.order.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(list.orders[0].order_items.len(), 1);
    assert_eq!(list.orders[0].order_items[0].product_name, "VIX Leather Jacket");
    assert_eq!(h.mirror().load_orders_backup(), list.orders);
}

#[tokio::test]
async fn test_orders_fall_back_to_backup() {
    let mut h = Harness::seeded().await;
    let order_id = place_order(&mut h, ProductId::new(1)).await;
    h.login();
    h.store().fail_next(Op::Select, Table::Orders, server_error());

    let list = h.state.admin().unwrap().orders().await;

    assert_eq!(list.source, OrderSource::Backup);
    assert_eq!(list.orders.len(), 1);
    assert_eq!(list.orders[0].order.id, order_id);
}

#[tokio::test]
async fn test_set_order_status_updates_backup() {
    let mut h = Harness::seeded().await;
    let order_id = place_order(&mut h, ProductId::new(2)).await;
    h.login();
    let admin = h.state.admin().unwrap();

    let order = admin
        .set_order_status(order_id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(
        h.mirror().load_orders_backup()[0].order.status,
        OrderStatus::Delivered
    );

    let stats = OrderStats::from_orders(&admin.orders().await.orders);
    assert_eq!(stats.total, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.revenue, Price::from_whole(899));
}

#[tokio::test]
async fn test_delete_order_removes_items() {
    let mut h = Harness::seeded().await;
    let order_id = place_order(&mut h, ProductId::new(1)).await;
    let kept = place_order(&mut h, ProductId::new(2)).await;
    h.login();
    let admin = h.state.admin().unwrap();

    admin.delete_order(order_id).await.unwrap();

    let list = admin.orders().await;
    assert_eq!(list.orders.len(), 1);
    assert_eq!(list.orders[0].order.id, kept);
    assert_eq!(list.orders[0].order_items.len(), 1);
    assert!(h.mirror().load_orders_backup().iter().all(|o| o.order.id != order_id));
}

#[tokio::test]
async fn test_delete_order_continues_when_items_delete_fails() {
    let mut h = Harness::seeded().await;
    let order_id = place_order(&mut h, ProductId::new(1)).await;
    h.login();
    h.store().fail_next(Op::Delete, Table::OrderItems, server_error());

    h.state.admin().unwrap().delete_order(order_id).await.unwrap();

    assert!(h.state.admin().unwrap().orders().await.orders.is_empty());
}

#[test]
fn test_order_filter_by_status_and_date() {
    let now = Utc::now();
    let order = |id: i64, status: &str, age: Duration| -> OrderWithItems {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "customer_name": "Mona",
            "customer_phone": "01012345678",
            "customer_address": "Cairo",
            "total_price": 299,
            "status": status,
            "created_at": (now - age).to_rfc3339(),
        }))
        .unwrap()
    };
    let orders = vec![
        order(1, "pending", Duration::minutes(1)),
        order(2, "shipped", Duration::days(3)),
        order(3, "pending", Duration::days(20)),
        order(4, "pending", Duration::days(90)),
    ];

    let pending = OrderFilter {
        status: Some(OrderStatus::Pending),
        date: DateBucket::All,
    };
    assert_eq!(pending.apply(&orders, now).len(), 3);

    let week = OrderFilter {
        status: None,
        date: DateBucket::Last7Days,
    };
    assert_eq!(week.apply(&orders, now).len(), 2);

    let month_pending = OrderFilter {
        status: Some(OrderStatus::Pending),
        date: DateBucket::Last30Days,
    };
    let ids: Vec<i64> = month_pending
        .apply(&orders, now)
        .iter()
        .map(|o| o.order.id.as_i64())
        .collect();
    assert_eq!(ids, vec![1, 3]);
}
