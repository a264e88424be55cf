//! In-memory [`StoreApi`] for unit tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use larder_core::{DeliveryMethod, Price, ProductId};
use tokio::sync::oneshot;

use super::types::{
    CartLinePayload, CartPayload, DeliveryQuotePayload, OrderReply, OrderRequest, SavedAddress,
    UserProfile,
};
use super::{ApiError, StoreApi};

/// A failure the fake can be told to produce.
#[derive(Debug, Clone)]
pub enum Failure {
    Status(u16),
    Business(String),
}

impl Failure {
    fn into_error(self) -> ApiError {
        match self {
            Self::Status(status) => ApiError::Status {
                status,
                body: "fake failure".to_string(),
            },
            Self::Business(message) => ApiError::Business(message),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    lines: Vec<CartLinePayload>,
    calls: Vec<String>,
    delivery_cost: Price,
    free_from: Option<Price>,
    fail_fetch: Option<Failure>,
    fail_update: Option<Failure>,
    fail_quote: Option<Failure>,
    fail_order: Option<Failure>,
    fail_clear: Option<Failure>,
    fail_prefill: Option<Failure>,
    omit_order_number: bool,
    orders: Vec<OrderRequest>,
    user: UserProfile,
    addresses: Vec<SavedAddress>,
}

#[derive(Debug, Default)]
pub struct FakeStoreApi {
    state: Mutex<FakeState>,
    fetch_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

pub fn line(id: i64, name: &str, price: i64, quantity: u32, stock: u32) -> CartLinePayload {
    CartLinePayload {
        id: ProductId::new(id),
        name: name.to_string(),
        slug: None,
        quantity,
        price: Price::from_units(price),
        total_price: None,
        available: quantity <= stock,
        stock,
        min_order_quantity: 1,
        measure_unit: Some("pcs".to_string()),
    }
}

impl FakeStoreApi {
    pub fn with_lines(lines: Vec<CartLinePayload>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.lock();
            state.lines = lines;
            state.delivery_cost = Price::from_units(250);
        }
        fake
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.lock().orders.clone()
    }

    pub fn lines(&self) -> Vec<CartLinePayload> {
        self.lock().lines.clone()
    }

    pub fn set_lines(&self, lines: Vec<CartLinePayload>) {
        self.lock().lines = lines;
    }

    pub fn set_delivery(&self, cost: i64, free_from: Option<i64>) {
        let mut state = self.lock();
        state.delivery_cost = Price::from_units(cost);
        state.free_from = free_from.map(Price::from_units);
    }

    pub fn fail_fetch(&self, failure: Option<Failure>) {
        self.lock().fail_fetch = failure;
    }

    pub fn fail_update(&self, failure: Option<Failure>) {
        self.lock().fail_update = failure;
    }

    pub fn fail_quote(&self, failure: Option<Failure>) {
        self.lock().fail_quote = failure;
    }

    pub fn fail_order(&self, failure: Option<Failure>) {
        self.lock().fail_order = failure;
    }

    pub fn fail_clear(&self, failure: Option<Failure>) {
        self.lock().fail_clear = failure;
    }

    pub fn fail_prefill(&self, failure: Option<Failure>) {
        self.lock().fail_prefill = failure;
    }

    pub fn omit_order_number(&self) {
        self.lock().omit_order_number = true;
    }

    pub fn set_user(&self, user: UserProfile) {
        self.lock().user = user;
    }

    pub fn set_addresses(&self, addresses: Vec<SavedAddress>) {
        self.lock().addresses = addresses;
    }

    /// Make the next `fetch_cart` wait until the returned sender fires.
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.fetch_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(rx);
        tx
    }

    fn mutate(
        &self,
        call: String,
        apply: impl FnOnce(&mut Vec<CartLinePayload>),
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(failure) = state.fail_update.clone() {
            return Err(failure.into_error());
        }
        apply(&mut state.lines);
        for line in &mut state.lines {
            line.available = line.quantity <= line.stock;
        }
        Ok(())
    }
}

impl StoreApi for FakeStoreApi {
    async fn fetch_cart(&self) -> Result<CartPayload, ApiError> {
        self.record("fetch_cart".to_string());
        let gate = self
            .fetch_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let state = self.lock();
        if let Some(failure) = state.fail_fetch.clone() {
            return Err(failure.into_error());
        }
        let total_price = state
            .lines
            .iter()
            .map(|line| line.price * line.quantity)
            .sum();
        Ok(CartPayload {
            items: state.lines.clone(),
            total_quantity: None,
            total_price: Some(total_price),
        })
    }

    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.mutate(format!("add_item {product_id} {quantity}"), |lines| {
            if let Some(line) = lines.iter_mut().find(|l| l.id == product_id) {
                line.quantity += quantity;
            } else {
                let mut added = line(product_id.as_i64(), "Added", 100, quantity, 100);
                added.id = product_id;
                lines.push(added);
            }
        })
    }

    async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.mutate(format!("update_item {product_id} {quantity}"), |lines| {
            if let Some(line) = lines.iter_mut().find(|l| l.id == product_id) {
                line.quantity = quantity;
            }
        })
    }

    async fn remove_item(&self, product_id: ProductId) -> Result<(), ApiError> {
        self.mutate(format!("remove_item {product_id}"), |lines| {
            lines.retain(|l| l.id != product_id);
        })
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push("clear_cart".to_string());
        if let Some(failure) = state.fail_clear.clone() {
            return Err(failure.into_error());
        }
        state.lines.clear();
        Ok(())
    }

    async fn quote_delivery(
        &self,
        city: &str,
        method: DeliveryMethod,
        subtotal: Price,
    ) -> Result<DeliveryQuotePayload, ApiError> {
        let mut state = self.lock();
        state
            .calls
            .push(format!("quote_delivery {city} {method} {subtotal}"));
        if let Some(failure) = state.fail_quote.clone() {
            return Err(failure.into_error());
        }
        let is_free = state.free_from.is_some_and(|min| subtotal >= min);
        Ok(DeliveryQuotePayload {
            cost: state.delivery_cost,
            is_free,
            min_for_free: state.free_from,
        })
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderReply, ApiError> {
        let mut state = self.lock();
        state.calls.push("submit_order".to_string());
        if let Some(failure) = state.fail_order.clone() {
            return Err(failure.into_error());
        }
        state.orders.push(order.clone());
        let order_number = (!state.omit_order_number).then(|| format!("LD-{:05}", state.orders.len()));
        Ok(OrderReply {
            order_number,
            total: Some(order.total),
            payment_method: Some(order.payment_method),
            status_display: Some("New".to_string()),
        })
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let mut state = self.lock();
        state.calls.push("current_user".to_string());
        if let Some(failure) = state.fail_prefill.clone() {
            return Err(failure.into_error());
        }
        Ok(state.user.clone())
    }

    async fn saved_addresses(&self) -> Result<Vec<SavedAddress>, ApiError> {
        let mut state = self.lock();
        state.calls.push("saved_addresses".to_string());
        if let Some(failure) = state.fail_prefill.clone() {
            return Err(failure.into_error());
        }
        Ok(state.addresses.clone())
    }
}
