//! Cart engine scenarios against an in-memory backend.
//!
//! Covers stock rejections, guest hydration, the login merge and ordered
//! server pushes.

use std::time::Duration;

use secrecy::SecretString;
use shopkeep_core::{Cart, CartItem, NotificationLevel, ProductId};
use shopkeep_integration_tests::{FakeShop, Shopper, priced, product};
use shopkeep_storefront::error::StoreError;
use shopkeep_storefront::storage::StoreScope;

fn pairs(cart: &Cart) -> Vec<(String, u32)> {
    cart.iter()
        .map(|item| (item.id.to_string(), item.qty))
        .collect()
}

fn owned(pairs: &[(&str, u32)]) -> Vec<(String, u32)> {
    pairs.iter().map(|(id, qty)| ((*id).to_string(), *qty)).collect()
}

fn save_guest_cart(shopper: &Shopper, lines: &[(&str, u32)], stock: i64) {
    let items = lines
        .iter()
        .map(|(id, qty)| CartItem::from_product(&product(id, stock), *qty))
        .collect();
    shopper
        .store()
        .save_cart(&Cart::from_items(items), StoreScope::Guest)
        .unwrap();
}

// =============================================================================
// Stock rules
// =============================================================================

#[tokio::test]
async fn test_second_add_over_stock_is_rejected() {
    let shop = FakeShop::new();
    let lamp = product("lamp", 3);
    shop.stock([lamp.clone()]);
    let shopper = Shopper::new(&shop);
    let mut session = shopper.guest().await;

    session.cart_mut().add_to_cart(&lamp, 2).unwrap();
    let err = session.cart_mut().add_to_cart(&lamp, 2).unwrap_err();

    assert!(matches!(err, StoreError::ExceedsStock { .. }));
    assert_eq!(pairs(session.cart().cart()), owned(&[("lamp", 2)]));

    let notes = shopper.notifications();
    assert_eq!(notes.last().unwrap().level, NotificationLevel::Error);
}

#[tokio::test]
async fn test_set_zero_equals_remove() {
    let shop = FakeShop::new();
    let a = product("a", 5);
    let b = product("b", 5);
    shop.stock([a.clone(), b.clone()]);
    let shopper = Shopper::new(&shop);
    let mut session = shopper.guest().await;

    session.cart_mut().add_to_cart(&a, 2).unwrap();
    session.cart_mut().add_to_cart(&b, 2).unwrap();
    session.cart_mut().update_qty(&a.id, 0).unwrap();
    session.cart_mut().remove_from_cart(&b.id);

    assert!(!session.cart().cart().contains(&a.id));
    assert!(!session.cart().cart().contains(&b.id));
    assert!(session.cart().cart().is_empty());
}

#[tokio::test]
async fn test_validated_cart_respects_stock_and_prices() {
    let shop = FakeShop::new();
    let shirt = priced(
        "shirt",
        2,
        rust_decimal::Decimal::new(4000, 2),
        rust_decimal::Decimal::new(500, 2),
    );
    shop.stock([shirt, product("mug", 1)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("shirt", 6), ("mug", 1)], 10);

    let session = shopper.guest().await;

    for item in session.cart().cart() {
        assert!(i64::from(item.qty) <= item.count_in_stock);
        if item.discount_price > rust_decimal::Decimal::ZERO {
            assert_eq!(item.final_price, item.price - item.discount_price);
        } else {
            assert_eq!(item.final_price, item.price);
        }
    }
    assert_eq!(
        session.cart().cart().quantity_of(&ProductId::new("shirt")),
        2
    );
}

// =============================================================================
// Hydration
// =============================================================================

#[tokio::test]
async fn test_hydration_drops_delisted_and_sold_out_lines() {
    let shop = FakeShop::new();
    shop.stock([product("a", 5), product("sold", 0)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("a", 1), ("sold", 1), ("gone", 1)], 5);

    let session = shopper.guest().await;

    assert!(session.cart().is_hydrated());
    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 1)]));
    let warnings = shopper
        .notifications()
        .into_iter()
        .filter(|n| n.level == NotificationLevel::Warning)
        .count();
    assert_eq!(warnings, 2);
}

#[tokio::test]
async fn test_hydration_keeps_lines_when_backend_is_down() {
    let shop = FakeShop::new();
    shop.stock([product("a", 5)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("a", 3)], 5);

    shop.set_offline(true);
    let session = shopper.guest().await;

    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 3)]));
    assert!(shopper.notifications().is_empty());
}

#[tokio::test]
async fn test_guest_cart_survives_restart() {
    let shop = FakeShop::new();
    let a = product("a", 5);
    shop.stock([a.clone()]);
    let shopper = Shopper::new(&shop);

    {
        let mut session = shopper.guest().await;
        session.cart_mut().add_to_cart(&a, 2).unwrap();
    }

    let session = shopper.guest().await;
    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 2)]));
    assert!(shop.pushes().is_empty());
}

// =============================================================================
// Login merge
// =============================================================================

#[tokio::test]
async fn test_login_merge_caps_at_stock_with_warning() {
    let shop = FakeShop::new();
    shop.stock([product("x", 4)]);
    shop.server_cart(&[("x", 2)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("x", 5)], 10);

    let mut session = shopper.guest().await;
    shopper.notifications();

    session.login(SecretString::from("token")).await.unwrap();
    session.cart_mut().flush().await;

    assert_eq!(pairs(session.cart().cart()), owned(&[("x", 4)]));
    assert!(shopper.notifications().iter().any(|n| {
        n.level == NotificationLevel::Warning && n.message.contains("reduced")
    }));
    assert_eq!(shop.server_lines(), owned(&[("x", 4)]));
}

#[tokio::test]
async fn test_login_merge_orders_server_lines_first() {
    let shop = FakeShop::new();
    shop.stock([product("s1", 9), product("both", 9), product("g1", 9)]);
    shop.server_cart(&[("s1", 1), ("both", 2)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("g1", 3), ("both", 1)], 9);

    let mut session = shopper.guest().await;
    session.login(SecretString::from("token")).await.unwrap();
    session.cart_mut().flush().await;

    let expected = owned(&[("s1", 1), ("both", 3), ("g1", 3)]);
    assert_eq!(pairs(session.cart().cart()), expected);
    assert_eq!(shop.server_lines(), expected);
}

#[tokio::test]
async fn test_login_merges_exactly_once() {
    let shop = FakeShop::new();
    shop.stock([product("a", 20)]);
    shop.server_cart(&[("a", 1)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("a", 2)], 20);

    let mut session = shopper.guest().await;
    session.login(SecretString::from("one")).await.unwrap();
    session.login(SecretString::from("two")).await.unwrap();
    session.cart_mut().flush().await;

    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 3)]));
    assert_eq!(shop.token().as_deref(), Some("two"));

    // A restored session does not merge again.
    let mut restored = shopper.session();
    restored.start(Some(SecretString::from("two"))).await;
    assert_eq!(pairs(restored.cart().cart()), owned(&[("a", 3)]));
}

#[tokio::test]
async fn test_guest_start_then_login_on_same_device_merges_once() {
    let shop = FakeShop::new();
    shop.stock([product("a", 20)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("a", 2)], 20);

    let mut first = shopper.guest().await;
    first.login(SecretString::from("token")).await.unwrap();
    first.cart_mut().flush().await;
    assert_eq!(shop.server_lines(), owned(&[("a", 2)]));
    assert_eq!(shopper.store().load_cart().scope, StoreScope::Account);

    let mut second = shopper.guest().await;
    assert!(second.cart().cart().is_empty());
    second.login(SecretString::from("token")).await.unwrap();
    second.cart_mut().flush().await;

    assert_eq!(pairs(second.cart().cart()), owned(&[("a", 2)]));
    assert_eq!(shop.server_lines(), owned(&[("a", 2)]));
}

#[tokio::test]
async fn test_failed_merge_keeps_guest_cart_for_retry() {
    let shop = FakeShop::new();
    shop.stock([product("a", 20)]);
    shop.server_cart(&[("a", 1)]);
    let shopper = Shopper::new(&shop);
    save_guest_cart(&shopper, &[("a", 2)], 20);

    let mut session = shopper.guest().await;
    shop.set_cart_offline(true);
    let err = session.login(SecretString::from("token")).await.unwrap_err();

    assert!(matches!(err, StoreError::MergeFailed(_)));
    assert!(session.cart().merge_pending());
    let stored = shopper.store().load_cart().guest_cart();
    assert_eq!(pairs(&stored), owned(&[("a", 2)]));

    shop.set_cart_offline(false);
    session.retry_merge().await.unwrap();
    session.cart_mut().flush().await;

    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 3)]));
    assert!(shopper.store().load_cart().guest_cart().is_empty());
}

// =============================================================================
// Server sync
// =============================================================================

#[tokio::test]
async fn test_sync_twice_is_idempotent() {
    let shop = FakeShop::new();
    shop.stock([product("a", 3), product("b", 1)]);
    shop.server_cart(&[("a", 2), ("b", 1)]);
    let shopper = Shopper::new(&shop);

    let mut session = shopper.session();
    session.start(Some(SecretString::from("token"))).await;

    session.cart_mut().sync_with_server(false).await.unwrap();
    let first = session.cart().cart().clone();
    session.cart_mut().sync_with_server(false).await.unwrap();

    assert_eq!(session.cart().cart(), &first);
    session.cart_mut().flush().await;
    assert!(shop.pushes().is_empty());
}

#[tokio::test]
async fn test_sync_pushes_stock_corrections() {
    let shop = FakeShop::new();
    shop.stock([product("a", 5)]);
    shop.server_cart(&[("a", 5)]);
    shop.set_stock("a", 2);
    let shopper = Shopper::new(&shop);

    let mut session = shopper.session();
    session.start(Some(SecretString::from("token"))).await;
    session.cart_mut().flush().await;

    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 2)]));
    assert_eq!(shop.server_lines(), owned(&[("a", 2)]));
}

#[tokio::test]
async fn test_slow_pushes_converge_on_latest_cart() {
    let shop = FakeShop::new();
    let a = product("a", 50);
    let b = product("b", 50);
    shop.stock([a.clone(), b.clone()]);
    shop.set_push_delay(Duration::from_millis(20));
    let shopper = Shopper::new(&shop);

    let mut session = shopper.session();
    session.start(Some(SecretString::from("token"))).await;

    for _ in 0..5 {
        session.cart_mut().add_to_cart(&a, 1).unwrap();
    }
    session.cart_mut().add_to_cart(&b, 4).unwrap();
    session.cart_mut().update_qty(&a.id, 3).unwrap();
    session.cart_mut().flush().await;

    let local = pairs(session.cart().cart());
    assert_eq!(local, owned(&[("a", 3), ("b", 4)]));
    assert_eq!(shop.server_lines(), local);

    // Pushes never go backwards: every push has at least as many lines as the
    // one before it in this sequence.
    let sizes: Vec<usize> = shop.pushes().iter().map(Vec::len).collect();
    assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_offline_mutations_stay_local() {
    let shop = FakeShop::new();
    let a = product("a", 5);
    shop.stock([a.clone()]);
    let shopper = Shopper::new(&shop);

    let mut session = shopper.session();
    session.start(Some(SecretString::from("token"))).await;

    shop.set_offline(true);
    session.cart_mut().add_to_cart(&a, 2).unwrap();
    session.cart_mut().flush().await;

    assert_eq!(pairs(session.cart().cart()), owned(&[("a", 2)]));
    assert!(shop.pushes().is_empty());

    let stored = shopper.store().load_cart();
    assert_eq!(stored.scope, StoreScope::Account);
    assert_eq!(pairs(&stored.cart), owned(&[("a", 2)]));
}

#[tokio::test]
async fn test_checkout_hands_off_and_clears() {
    let shop = FakeShop::new();
    let a = priced(
        "a",
        5,
        rust_decimal::Decimal::new(2000, 2),
        rust_decimal::Decimal::new(500, 2),
    );
    shop.stock([a.clone()]);
    let shopper = Shopper::new(&shop);
    let mut session = shopper.guest().await;

    session.cart_mut().add_to_cart(&a, 2).unwrap();
    let handoff = session.cart_mut().begin_checkout();

    assert_eq!(handoff.items.len(), 1);
    assert_eq!(handoff.summary.subtotal, rust_decimal::Decimal::new(3000, 2));
    assert_eq!(handoff.summary.savings, rust_decimal::Decimal::new(1000, 2));
    assert!(session.cart().cart().is_empty());
    assert!(shopper.store().load_cart().cart.is_empty());
}
