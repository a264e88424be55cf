//! Delivery pricing: caching, free thresholds and the default-cost fallback.

use larder_checkout::{
    CheckoutError, CheckoutEvent, CheckoutPhase, MemoryStore, Notice, NoticeLevel,
    SessionSettings,
};
use larder_core::{DeliveryMethod, Price};
use larder_integration_tests::{MockBackend, Product, UNSERVED_CITY};

async fn backend() -> MockBackend {
    let backend = MockBackend::start(vec![Product::new(1, "Rye flour", 90, 40)]).await;
    backend.put_in_cart(1, 2);
    backend
}

#[tokio::test]
async fn test_same_inputs_same_cost() {
    let backend = backend().await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());
    session.fetch_cart().await.expect("Failed to fetch cart");

    let first = session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");
    let second = session
        .compute_delivery_cost("kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");

    assert_eq!(first.cost, second.cost);
    assert_eq!(first.is_free, second.is_free);
    assert_eq!(backend.state().count("GET /api/orders/delivery-costs"), 1);
}

#[tokio::test]
async fn test_free_delivery_from_threshold() {
    let backend = backend().await;
    backend.state().free_from = Some(Price::from_units(150));
    let session = backend.session(MemoryStore::new(), SessionSettings::default());
    session.fetch_cart().await.expect("Failed to fetch cart");

    let delivery = session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");

    assert!(delivery.is_free);
    assert_eq!(delivery.cost, Price::ZERO);
    assert_eq!(delivery.min_for_free, Some(Price::from_units(150)));
    assert_eq!(session.totals().total, Price::from_units(180));
}

#[tokio::test]
async fn test_unavailable_pricing_uses_default_cost() {
    let backend = backend().await;
    backend.state().fail_delivery = true;
    let session = backend.session(
        MemoryStore::new(),
        SessionSettings {
            default_delivery_cost: Price::from_units(350),
            ..SessionSettings::default()
        },
    );
    session.fetch_cart().await.expect("Failed to fetch cart");

    let delivery = session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Fallback is not an error");

    assert!(delivery.fallback);
    assert_eq!(delivery.cost, Price::from_units(350));
    assert_eq!(session.phase(), CheckoutPhase::DeliveryComputed);
    assert_eq!(session.totals().total, Price::from_units(530));

    // Fallbacks are not cached: the next attempt asks again
    backend.state().fail_delivery = false;
    let delivery = session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");
    assert!(!delivery.fallback);
    assert_eq!(delivery.cost, Price::from_units(250));
}

#[tokio::test]
async fn test_unserved_city_warns_with_backend_message() {
    let backend = backend().await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());
    session.fetch_cart().await.expect("Failed to fetch cart");
    let mut events = session.subscribe();

    let delivery = session
        .compute_delivery_cost(UNSERVED_CITY, DeliveryMethod::Courier)
        .await
        .expect("Fallback is not an error");
    assert!(delivery.fallback);

    let mut warnings = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CheckoutEvent::Notice(Notice {
            level: NoticeLevel::Warning,
            message,
        }) = event
        {
            warnings.push(message);
        }
    }
    assert!(
        warnings
            .iter()
            .any(|message| message.contains("No delivery to this city")),
        "unexpected warnings: {warnings:?}"
    );
}

#[tokio::test]
async fn test_courier_needs_a_city() {
    let backend = backend().await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());
    session.fetch_cart().await.expect("Failed to fetch cart");

    let err = session
        .compute_delivery_cost("", DeliveryMethod::Courier)
        .await
        .expect_err("City is required");

    assert!(matches!(err, CheckoutError::Validation(_)));
    assert_eq!(backend.state().count("GET /api/orders/delivery-costs"), 0);
    assert_eq!(session.phase(), CheckoutPhase::ItemsDisplayed);
}
