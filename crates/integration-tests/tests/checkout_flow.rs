//! End-to-end checkout against the mock storefront backend.

use larder_checkout::api::{SavedAddress, UserProfile};
use larder_checkout::storage::keys;
use larder_checkout::{
    CheckoutError, CheckoutPhase, FileStore, LocalStore, MemoryStore, OrderForm, SessionSettings,
};
use larder_core::{AddressId, DeliveryMethod, PaymentMethod, Price};
use larder_integration_tests::{MockBackend, Product};

fn catalog() -> Vec<Product> {
    vec![
        Product::new(1, "Rye flour", 90, 40).min_order(2),
        Product::new(2, "Sea salt", 25, 10),
    ]
}

async fn backend_with_cart() -> MockBackend {
    let backend = MockBackend::start(catalog()).await;
    backend.put_in_cart(1, 2);
    backend.put_in_cart(2, 1);
    backend
}

fn form() -> OrderForm {
    OrderForm {
        first_name: "Anna".to_string(),
        last_name: "Petrova".to_string(),
        email: "anna@example.com".to_string(),
        phone: "8 912 345 67 89".to_string(),
        city: "Kazan".to_string(),
        address: "Baumana st., 12".to_string(),
        postal_code: "420111".to_string(),
        ..OrderForm::default()
    }
}

#[tokio::test]
async fn test_guest_places_courier_order() {
    let backend = backend_with_cart().await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());

    let cart = session.fetch_cart().await.expect("Failed to fetch cart");
    assert_eq!(cart.total_price, Price::from_units(205));
    assert_eq!(cart.total_quantity, 3);
    assert_eq!(session.phase(), CheckoutPhase::ItemsDisplayed);

    session
        .set_payment_method(PaymentMethod::CardCourier)
        .expect("Failed to store payment method");
    let delivery = session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");
    assert_eq!(delivery.cost, Price::from_units(250));
    assert_eq!(session.phase(), CheckoutPhase::DeliveryComputed);

    let draft = session
        .build_order_draft(&form())
        .expect("Form should be valid");
    assert_eq!(draft.total, Price::from_units(455));

    let confirmation = session
        .submit_order(&draft)
        .await
        .expect("Order should be accepted");
    assert_eq!(confirmation.order_number, "LD-00001");
    assert_eq!(confirmation.total, Price::from_units(455));
    assert_eq!(session.phase(), CheckoutPhase::Confirmed);
    assert!(session.store().keys().is_empty());

    let state = backend.state();
    assert!(state.cart.is_empty(), "server cart should be cleared");
    assert_eq!(state.rejected_csrf, 0);
    assert_eq!(state.orders.len(), 1);
    let order = &state.orders[0];
    assert_eq!(order.subtotal, Price::from_units(205));
    assert_eq!(order.total, order.subtotal + order.delivery_cost);
    assert_eq!(order.phone, "+79123456789");
    assert_eq!(order.payment_method, PaymentMethod::CardCourier);
    assert_eq!(order.items.len(), 2);
}

#[tokio::test]
async fn test_pickup_order_skips_delivery_pricing() {
    let backend = backend_with_cart().await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());

    session.fetch_cart().await.expect("Failed to fetch cart");
    let delivery = session
        .compute_delivery_cost("", DeliveryMethod::Pickup)
        .await
        .expect("Pickup is always priced");
    assert!(delivery.is_free);

    let pickup_form = OrderForm {
        city: String::new(),
        address: String::new(),
        ..form()
    };
    let draft = session
        .build_order_draft(&pickup_form)
        .expect("Pickup needs no address");
    session
        .submit_order(&draft)
        .await
        .expect("Order should be accepted");

    let state = backend.state();
    assert_eq!(state.count("GET /api/orders/delivery-costs"), 0);
    assert_eq!(state.orders[0].delivery_cost, Price::ZERO);
    assert_eq!(state.orders[0].total, state.orders[0].subtotal);
    assert_eq!(state.orders[0].delivery_method, DeliveryMethod::Pickup);
}

#[tokio::test]
async fn test_empty_cart_blocks_checkout() {
    let backend = MockBackend::start(catalog()).await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());

    let cart = session.fetch_cart().await.expect("Failed to fetch cart");
    assert!(cart.is_empty());
    assert_eq!(session.phase(), CheckoutPhase::Blocked);

    assert!(matches!(
        session
            .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
            .await,
        Err(CheckoutError::Blocked)
    ));
    assert!(matches!(
        session.build_order_draft(&form()),
        Err(CheckoutError::Blocked)
    ));
    assert_eq!(backend.state().count("POST /api/orders/"), 0);
}

#[tokio::test]
async fn test_signed_in_customer_is_prefilled() {
    let backend = backend_with_cart().await;
    {
        let mut state = backend.state();
        state.user = Some(UserProfile {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+79123456789".to_string(),
            ..UserProfile::default()
        });
        state.addresses = vec![SavedAddress {
            id: AddressId::new(1),
            title: "Home".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            city: "Kazan".to_string(),
            street: "Baumana st.".to_string(),
            building: "12".to_string(),
            apartment: None,
            postal_code: "420111".to_string(),
        }];
    }
    let session = backend.session(
        MemoryStore::new(),
        SessionSettings {
            authenticated: true,
            ..SessionSettings::default()
        },
    );

    session.fetch_cart().await.expect("Failed to fetch cart");
    session
        .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
        .await
        .expect("Failed to price delivery");

    let mut form = OrderForm::default();
    assert!(session.prefill_form(&mut form).await);
    let addresses = session.saved_addresses().await;
    form.apply_address(&addresses[0]);

    let draft = session
        .build_order_draft(&form)
        .expect("Prefilled form should be valid");
    assert_eq!(draft.delivery.address, "Baumana st., 12");
    session
        .submit_order(&draft)
        .await
        .expect("Order should be accepted");
}

#[tokio::test]
async fn test_guest_prefill_does_not_call_backend() {
    let backend = backend_with_cart().await;
    let session = backend.session(MemoryStore::new(), SessionSettings::default());

    let mut form = OrderForm::default();
    assert!(!session.prefill_form(&mut form).await);
    assert_eq!(backend.state().count("GET /api/users/me/"), 0);
}

#[tokio::test]
async fn test_choices_survive_restart() {
    let backend = backend_with_cart().await;
    let path = std::env::temp_dir()
        .join(format!("larder-it-{}", uuid::Uuid::new_v4()))
        .join("state.json");

    {
        let store = FileStore::open(&path).expect("Failed to open state file");
        let session = backend.session(store, SessionSettings::default());
        session.fetch_cart().await.expect("Failed to fetch cart");
        session
            .compute_delivery_cost("Kazan", DeliveryMethod::Courier)
            .await
            .expect("Failed to price delivery");
        session
            .set_payment_method(PaymentMethod::Sbp)
            .expect("Failed to store payment method");
    }

    let store = FileStore::open(&path).expect("Failed to reopen state file");
    assert_eq!(
        store.get(keys::DELIVERY_COST).expect("Readable"),
        Some("250".to_string())
    );
    let session = backend.session(store, SessionSettings::default());

    assert_eq!(session.phase(), CheckoutPhase::Loading);
    assert_eq!(session.payment_method(), PaymentMethod::Sbp);
    assert_eq!(
        session.delivery_preferences(),
        ("Kazan".to_string(), DeliveryMethod::Courier)
    );
    let cached = session.cached_cart().expect("Cart should be restored");
    assert_eq!(cached.total_price, Price::from_units(205));

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
