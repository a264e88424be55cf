//! Failed and refused submissions keep the checkout recoverable.

use larder_checkout::storage::keys;
use larder_checkout::{
    CheckoutError, CheckoutPhase, LocalStore, MemoryStore, OrderDraft, OrderForm,
    SessionSettings,
};
use larder_core::{DeliveryMethod, Price, ProductId};
use larder_integration_tests::{MockBackend, Product};

type Session = larder_checkout::CheckoutSession<larder_checkout::HttpStoreApi, MemoryStore>;

async fn backend() -> MockBackend {
    let backend = MockBackend::start(vec![
        Product::new(1, "Rye flour", 90, 40),
        Product::new(2, "Sea salt", 25, 10),
    ])
    .await;
    backend.put_in_cart(1, 2);
    backend.put_in_cart(2, 1);
    backend
}

async fn drafted(backend: &MockBackend) -> (Session, OrderDraft) {
    let session = backend.session(MemoryStore::new(), SessionSettings::default());
    session.fetch_cart().await.expect("Failed to fetch cart");
    session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");
    let draft = session
        .build_order_draft(&OrderForm {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+79123456789".to_string(),
            city: "Kazan".to_string(),
            address: "Baumana st., 12".to_string(),
            ..OrderForm::default()
        })
        .expect("Form should be valid");
    (session, draft)
}

#[tokio::test]
async fn test_server_error_keeps_everything_for_retry() {
    let backend = backend().await;
    let (session, draft) = drafted(&backend).await;
    backend.state().fail_orders = true;

    let err = session
        .submit_order(&draft)
        .await
        .expect_err("Server error should fail the submission");

    assert!(matches!(err, CheckoutError::Network(_)));
    assert!(err.is_retryable());
    assert_eq!(session.phase(), CheckoutPhase::SubmitFailed);
    for key in [
        keys::CART_DATA,
        keys::DELIVERY_COST,
        keys::DELIVERY_METHOD,
        keys::DELIVERY_CITY,
    ] {
        assert!(
            session.store().get(key).expect("Readable").is_some(),
            "{key} should be kept"
        );
    }
    assert_eq!(backend.state().cart.len(), 2);
    assert_eq!(backend.state().count("DELETE"), 0);

    backend.state().fail_orders = false;
    let confirmation = session
        .submit_order(&draft)
        .await
        .expect("Retry should succeed");

    assert!(!confirmation.order_number.is_empty());
    assert_eq!(session.phase(), CheckoutPhase::Confirmed);
    assert_eq!(backend.state().orders.len(), 1);
}

#[tokio::test]
async fn test_changed_cart_refuses_stale_draft() {
    let backend = backend().await;
    let (session, draft) = drafted(&backend).await;

    // Another tab adds more salt
    backend.put_in_cart(2, 4);

    let err = session
        .submit_order(&draft)
        .await
        .expect_err("Stale draft must be refused");

    assert!(matches!(err, CheckoutError::StaleDraft));
    assert_eq!(backend.state().count("POST /api/orders/"), 0);

    let cart = session.cached_cart().expect("Fresh cart applied");
    assert_eq!(
        cart.item(ProductId::new(2)).map(|item| item.quantity),
        Some(4)
    );
    assert_eq!(session.phase(), CheckoutPhase::DeliveryComputed);
    let totals = session.totals();
    assert_eq!(totals.subtotal, Price::from_units(280));
    assert_eq!(totals.total, Price::from_units(530));
}

#[tokio::test]
async fn test_changed_delivery_refuses_stale_draft() {
    let backend = backend().await;
    let (session, draft) = drafted(&backend).await;

    // Same courier price, different city
    session
        .compute_delivery_cost("Moscow", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");
    let err = session
        .submit_order(&draft)
        .await
        .expect_err("Draft for another city must be refused");
    assert!(matches!(err, CheckoutError::StaleDraft));

    session
        .compute_delivery_cost("", DeliveryMethod::Pickup)
        .await
        .expect("Pickup is always priced");
    let totals = session.totals();
    assert_eq!(totals.delivery_cost, Some(Price::ZERO));
    assert_eq!(totals.total, totals.subtotal);
    let err = session
        .submit_order(&draft)
        .await
        .expect_err("Courier draft must be refused after switching to pickup");
    assert!(matches!(err, CheckoutError::StaleDraft));
    assert_eq!(backend.state().count("POST /api/orders/"), 0);

    let pickup = session
        .build_order_draft(&OrderForm {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+79123456789".to_string(),
            ..OrderForm::default()
        })
        .expect("Pickup needs no address");
    session
        .submit_order(&pickup)
        .await
        .expect("Pickup order should be accepted");

    let state = backend.state();
    let order = &state.orders[0];
    assert_eq!(order.delivery_method, DeliveryMethod::Pickup);
    assert_eq!(order.total, order.subtotal);
}

#[tokio::test]
async fn test_uncleared_server_cart_does_not_fail_order() {
    let backend = backend().await;
    let (session, draft) = drafted(&backend).await;
    backend.state().fail_clear = true;

    let confirmation = session
        .submit_order(&draft)
        .await
        .expect("Order itself succeeded");

    assert_eq!(confirmation.order_number, "LD-00001");
    assert_eq!(session.phase(), CheckoutPhase::Confirmed);
    assert!(session.store().keys().is_empty());
    assert_eq!(backend.state().cart.len(), 2);
}

#[tokio::test]
async fn test_confirmed_checkout_restarts_on_reload() {
    let backend = backend().await;
    let (session, draft) = drafted(&backend).await;
    session
        .submit_order(&draft)
        .await
        .expect("Order should be accepted");

    let cart = session.reload().await.expect("Reload should fetch the cart");

    assert!(cart.is_empty());
    assert_eq!(session.phase(), CheckoutPhase::Blocked);
}
