//! The cart/checkout reconciler.
//!
//! [`CheckoutSession`] keeps three things consistent: the server-side cart,
//! the locally mirrored checkout state, and the delivery cost computed for
//! the current subtotal. Every cart write is followed by a fresh cart fetch;
//! nothing is merged optimistically.
//!
//! # Concurrency
//!
//! Session state sits behind a mutex that is only held for short synchronous
//! updates, never across an `.await`. Cart fetches and delivery quotes each
//! draw a ticket from their own [`RequestSequence`]; a response whose ticket
//! has been superseded is dropped with [`CheckoutError::Superseded`].

use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use larder_core::{DeliveryMethod, PaymentMethod, Price, ProductId};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, StoreApi};
use crate::cart::CartSnapshot;
use crate::config::SessionSettings;
use crate::confirm::{Confirm, ConfirmPrompt};
use crate::delivery::{DeliveryQuoter, DeliverySelection, QuoteSource};
use crate::draft::{self, OrderConfirmation, OrderDraft, OrderForm, Totals};
use crate::error::{CheckoutError, Operation};
use crate::events::{CheckoutEvent, EventBus, Notice};
use crate::flow::CheckoutPhase;
use crate::sequence::RequestSequence;
use crate::storage::{LocalStore, keys, read_json, write_json};
use crate::validation::{DraftField, FieldError, FieldProblem, ValidationErrors};

/// Delivery inputs remembered across a cart write so the cost can be
/// re-quoted against the new subtotal.
type DeliveryInputs = Option<(String, DeliveryMethod)>;

// =============================================================================
// CheckoutSession
// =============================================================================

/// A checkout in progress.
///
/// Cloning is cheap; clones share the same state.
pub struct CheckoutSession<A, S> {
    inner: Arc<SessionInner<A, S>>,
}

impl<A, S> Clone for CheckoutSession<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<A, S> {
    api: A,
    store: S,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    cart_seq: RequestSequence,
    delivery_seq: RequestSequence,
    quoter: DeliveryQuoter,
    events: EventBus,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: CheckoutPhase,
    cart: Option<CartSnapshot>,
    delivery: Option<DeliverySelection>,
    delivery_city: String,
    delivery_method: DeliveryMethod,
    payment_method: PaymentMethod,
}

impl SessionState {
    fn totals(&self) -> Totals {
        Totals::new(
            self.cart.as_ref().map_or(Price::ZERO, |cart| cart.total_price),
            self.delivery.as_ref().map(|delivery| delivery.cost),
        )
    }

    fn delivery_inputs(&self) -> DeliveryInputs {
        self.delivery
            .as_ref()
            .map(|delivery| (delivery.city.clone(), delivery.method))
    }
}

impl<A: StoreApi, S: LocalStore> CheckoutSession<A, S> {
    /// Create a session, restoring choices mirrored by an earlier one.
    ///
    /// Unreadable stored values are logged and ignored.
    pub fn new(api: A, store: S, settings: SessionSettings) -> Self {
        let state = restore(&store);
        let quoter = DeliveryQuoter::new(
            settings.default_delivery_cost,
            settings.delivery_cache_ttl,
        );

        Self {
            inner: Arc::new(SessionInner {
                api,
                store,
                settings,
                state: Mutex::new(state),
                cart_seq: RequestSequence::new(),
                delivery_seq: RequestSequence::new(),
                quoter,
                events: EventBus::new(),
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Receive state-change events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> CheckoutPhase {
        self.state().phase
    }

    #[must_use]
    pub fn totals(&self) -> Totals {
        self.state().totals()
    }

    /// Last cart snapshot, fetched or restored from local storage.
    #[must_use]
    pub fn cached_cart(&self) -> Option<CartSnapshot> {
        self.state().cart.clone()
    }

    /// Delivery selection for the current subtotal, if computed.
    #[must_use]
    pub fn delivery(&self) -> Option<DeliverySelection> {
        self.state().delivery.clone()
    }

    /// Last chosen city and delivery method.
    #[must_use]
    pub fn delivery_preferences(&self) -> (String, DeliveryMethod) {
        let state = self.state();
        (state.delivery_city.clone(), state.delivery_method)
    }

    #[must_use]
    pub fn payment_method(&self) -> PaymentMethod {
        self.state().payment_method
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the authoritative cart and make it the current snapshot.
    ///
    /// An empty cart blocks the checkout.
    ///
    /// # Errors
    ///
    /// Returns a network or business error (also announced as a notice),
    /// `Superseded` if a newer fetch was started meanwhile, or a phase error
    /// if the checkout is blocked, submitting or confirmed.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<CartSnapshot, CheckoutError> {
        self.check_open(CheckoutPhase::ItemsDisplayed)?;

        let ticket = self.inner.cart_seq.next();
        let result = self.inner.api.fetch_cart().await;

        if !self.inner.cart_seq.is_current(ticket) {
            debug!(ticket = ticket.value(), "Discarding stale cart response");
            return Err(CheckoutError::Superseded(Operation::FetchCart));
        }

        match result {
            Ok(payload) => self.apply_cart(CartSnapshot::from_payload(payload)),
            Err(err) => Err(self.report(err.into())),
        }
    }

    /// Add a product to the cart, then resynchronize.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero quantity (nothing is sent), or
    /// any error of the write or the follow-up fetch.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot, CheckoutError> {
        if quantity == 0 {
            return Err(ValidationErrors::single(FieldError::new(
                DraftField::Quantity(product_id),
                FieldProblem::BelowMinimum { min: 1 },
            ))
            .into());
        }

        let prior = self.begin_mutation()?;
        let written = self.inner.api.add_item(product_id, quantity).await;
        self.reconcile(prior, written, "Added to cart").await
    }

    /// Change the quantity of a cart line, then resynchronize.
    ///
    /// The quantity must lie within the item's `[min_order_qty, stock]`;
    /// otherwise nothing is sent. Setting the current quantity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if the product is not in the snapshot, a
    /// validation error for an out-of-range quantity, or any error of the
    /// write or the follow-up fetch. A business rejection is returned after
    /// the cart has been resynchronized.
    #[instrument(skip(self))]
    pub async fn mutate_cart_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot, CheckoutError> {
        {
            let state = self.state();
            let cart = state
                .cart
                .as_ref()
                .ok_or(CheckoutError::UnknownItem(product_id))?;
            let item = cart
                .item(product_id)
                .ok_or(CheckoutError::UnknownItem(product_id))?;
            item.check_quantity(quantity)?;
            if item.quantity == quantity {
                debug!("Quantity unchanged, nothing to send");
                return Ok(cart.clone());
            }
        }

        let prior = self.begin_mutation()?;
        let written = self.inner.api.update_item(product_id, quantity).await;
        self.reconcile(prior, written, "Quantity updated").await
    }

    /// Remove a product from the cart after confirmation.
    ///
    /// Returns `Ok(None)` when the confirmation is declined; nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if the product is not in the snapshot, or any
    /// error of the write or the follow-up fetch.
    #[instrument(skip(self, confirm))]
    pub async fn remove_cart_item<C: Confirm + ?Sized>(
        &self,
        product_id: ProductId,
        confirm: &C,
    ) -> Result<Option<CartSnapshot>, CheckoutError> {
        let name = self
            .state()
            .cart
            .as_ref()
            .and_then(|cart| cart.item(product_id))
            .map(|item| item.name.clone())
            .ok_or(CheckoutError::UnknownItem(product_id))?;

        if !confirm.confirm(&ConfirmPrompt::RemoveItem { product_id, name }) {
            debug!("Removal declined");
            return Ok(None);
        }

        let prior = self.begin_mutation()?;
        let written = self.inner.api.remove_item(product_id).await;
        self.reconcile(prior, written, "Removed from cart")
            .await
            .map(Some)
    }

    /// Empty the cart after confirmation.
    ///
    /// Returns `Ok(None)` when the confirmation is declined; nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns any error of the write or the follow-up fetch.
    #[instrument(skip(self, confirm))]
    pub async fn clear_cart<C: Confirm + ?Sized>(
        &self,
        confirm: &C,
    ) -> Result<Option<CartSnapshot>, CheckoutError> {
        self.check_open(CheckoutPhase::ItemMutated)?;

        if !confirm.confirm(&ConfirmPrompt::ClearCart) {
            debug!("Clearing declined");
            return Ok(None);
        }

        let prior = self.begin_mutation()?;
        let written = self.inner.api.clear_cart().await;
        self.reconcile(prior, written, "Cart cleared").await.map(Some)
    }

    fn begin_mutation(&self) -> Result<DeliveryInputs, CheckoutError> {
        let mut state = self.state();
        check_open(&state, CheckoutPhase::ItemMutated)?;
        let prior = state.delivery_inputs();
        self.move_to(&mut state, CheckoutPhase::ItemMutated)?;
        Ok(prior)
    }

    /// Resynchronize after a cart write, whatever its outcome.
    async fn reconcile(
        &self,
        prior: DeliveryInputs,
        written: Result<(), ApiError>,
        done: &str,
    ) -> Result<CartSnapshot, CheckoutError> {
        let rejection = match written {
            Ok(()) => None,
            Err(ApiError::Business(message)) => {
                Some(self.report(CheckoutError::Business(message)))
            }
            Err(err) => {
                self.settle_mutation();
                return Err(self.report(err.into()));
            }
        };

        let cart = match self.fetch_cart().await {
            Ok(cart) => cart,
            Err(err) => {
                self.settle_mutation();
                return Err(rejection.unwrap_or(err));
            }
        };

        self.requote(prior, &cart).await;

        match rejection {
            Some(err) => Err(err),
            None => {
                self.inner.events.notice(Notice::success(done));
                Ok(cart)
            }
        }
    }

    /// Leave `ItemMutated` when no fresh cart will arrive.
    fn settle_mutation(&self) {
        let mut state = self.state();
        if state.phase != CheckoutPhase::ItemMutated {
            return;
        }
        let target = if state.delivery.is_some() {
            CheckoutPhase::DeliveryComputed
        } else {
            CheckoutPhase::ItemsDisplayed
        };
        if let Err(err) = self.move_to(&mut state, target) {
            warn!(error = %err, "Could not settle cart mutation");
        }
    }

    /// Make `cart` the current snapshot and pick the matching phase.
    fn apply_cart(&self, cart: CartSnapshot) -> Result<CartSnapshot, CheckoutError> {
        let totals = {
            let mut state = self.state();

            if state
                .delivery
                .as_ref()
                .is_some_and(|delivery| delivery.quoted_subtotal != cart.total_price)
            {
                debug!("Subtotal changed, delivery cost no longer valid");
                state.delivery = None;
            }

            let target = if cart.is_empty() {
                CheckoutPhase::Blocked
            } else if state.delivery.is_some() {
                CheckoutPhase::DeliveryComputed
            } else {
                CheckoutPhase::ItemsDisplayed
            };
            self.move_to(&mut state, target)?;

            state.cart = Some(cart.clone());
            state.totals()
        };

        self.persist_json(keys::CART_DATA, &cart);
        self.inner.events.publish(CheckoutEvent::CartUpdated(cart.clone()));
        self.inner.events.publish(CheckoutEvent::TotalsChanged(totals));
        if cart.is_empty() {
            self.inner
                .events
                .notice(Notice::warning(CheckoutError::Blocked.user_message()));
        }

        Ok(cart)
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Price delivery for the current cart subtotal.
    ///
    /// Pickup is free and never queried. If pricing fails, the configured
    /// default cost is used and a warning notice is published.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a non-pickup method has no city,
    /// `Superseded` if a newer quote was requested or the cart changed
    /// meanwhile, or a phase error if no cart is displayed.
    #[instrument(skip(self))]
    pub async fn compute_delivery_cost(
        &self,
        city: &str,
        method: DeliveryMethod,
    ) -> Result<DeliverySelection, CheckoutError> {
        let subtotal = {
            let state = self.state();
            check_open(&state, CheckoutPhase::DeliveryComputed)?;
            let from = state.phase;
            let transition = CheckoutError::InvalidTransition {
                from,
                to: CheckoutPhase::DeliveryComputed,
            };
            if !from.can_transition_to(CheckoutPhase::DeliveryComputed) {
                return Err(transition);
            }
            state
                .cart
                .as_ref()
                .map(|cart| cart.total_price)
                .ok_or(transition)?
        };

        let ticket = self.inner.delivery_seq.next();
        let quote = self
            .inner
            .quoter
            .quote(&self.inner.api, city, method, subtotal)
            .await?;

        if !self.inner.delivery_seq.is_current(ticket) {
            debug!(ticket = ticket.value(), "Discarding stale delivery quote");
            return Err(CheckoutError::Superseded(Operation::DeliveryQuote));
        }

        let selection = quote.selection;
        let (totals, city) = {
            let mut state = self.state();
            if state.cart.as_ref().map(|cart| cart.total_price) != Some(selection.quoted_subtotal)
            {
                debug!("Cart changed while quoting, discarding delivery quote");
                return Err(CheckoutError::Superseded(Operation::DeliveryQuote));
            }
            self.move_to(&mut state, CheckoutPhase::DeliveryComputed)?;
            state.delivery = Some(selection.clone());
            state.delivery_method = method;
            if !selection.city.is_empty() {
                state.delivery_city.clone_from(&selection.city);
            }
            (state.totals(), state.delivery_city.clone())
        };

        self.persist(keys::DELIVERY_COST, &selection.cost.amount().normalize().to_string());
        self.persist(keys::DELIVERY_METHOD, method.as_str());
        // Pickup keeps the last courier city
        self.persist(keys::DELIVERY_CITY, &city);

        self.inner
            .events
            .publish(CheckoutEvent::DeliveryUpdated(selection.clone()));
        self.inner.events.publish(CheckoutEvent::TotalsChanged(totals));
        self.inner.events.notice(match &quote.source {
            QuoteSource::Fallback { reason } => Notice::warning(format!(
                "Could not calculate delivery ({reason}), using the standard rate of {}",
                selection.cost
            )),
            _ if selection.is_free => Notice::info("Delivery: free"),
            _ => Notice::info(format!("Delivery: {}", selection.cost)),
        });

        Ok(selection)
    }

    /// Re-quote the delivery chosen before a cart write if the subtotal moved.
    async fn requote(&self, prior: DeliveryInputs, cart: &CartSnapshot) {
        let Some((city, method)) = prior else {
            return;
        };
        if cart.is_empty() {
            return;
        }

        let still_valid = self
            .state()
            .delivery
            .as_ref()
            .is_some_and(|delivery| delivery.matches(&city, method, cart.total_price));
        if still_valid {
            return;
        }

        if let Err(err) = self.compute_delivery_cost(&city, method).await {
            debug!(error = %err, "Delivery re-quote after cart change failed");
        }
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Remember the payment method for the order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the choice cannot be persisted.
    #[instrument(skip(self))]
    pub fn set_payment_method(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.inner.store.set(keys::PAYMENT_METHOD, method.as_str())?;
        self.state().payment_method = method;
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Validate `form` against the current cart and delivery selection.
    ///
    /// # Errors
    ///
    /// Returns `Blocked` for an empty checkout, `DeliveryNotComputed` before
    /// a delivery cost is known, or every validation failure found.
    #[instrument(skip(self, form))]
    pub fn build_order_draft(&self, form: &OrderForm) -> Result<OrderDraft, CheckoutError> {
        let state = self.state();
        if state.phase == CheckoutPhase::Blocked {
            return Err(CheckoutError::Blocked);
        }
        let cart = state
            .cart
            .as_ref()
            .ok_or(CheckoutError::DeliveryNotComputed)?;
        let delivery = state
            .delivery
            .as_ref()
            .ok_or(CheckoutError::DeliveryNotComputed)?;

        Ok(draft::build_order_draft(
            cart,
            delivery,
            form,
            state.payment_method,
        )?)
    }

    /// Place the order.
    ///
    /// The authoritative cart is fetched first; if it no longer matches the
    /// draft the order is refused and the snapshot refreshed. On success all
    /// locally mirrored state is cleared and the server cart emptied. On
    /// failure nothing is cleared and the draft may be submitted again.
    ///
    /// # Errors
    ///
    /// Returns `StaleDraft` when the cart changed, a validation error for
    /// inconsistent totals, a phase error when delivery is not computed, or
    /// the network/business error of the fetch or the order post.
    #[instrument(skip(self, draft), fields(total = %draft.total))]
    pub async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderConfirmation, CheckoutError> {
        draft.check_totals()?;

        {
            let mut state = self.state();
            let from = state.phase;
            if from == CheckoutPhase::Blocked {
                return Err(CheckoutError::Blocked);
            }
            if !from.can_transition_to(CheckoutPhase::Submitting) {
                return Err(if from == CheckoutPhase::ItemsDisplayed {
                    CheckoutError::DeliveryNotComputed
                } else {
                    CheckoutError::InvalidTransition {
                        from,
                        to: CheckoutPhase::Submitting,
                    }
                });
            }
            let delivery = state
                .delivery
                .as_ref()
                .ok_or(CheckoutError::DeliveryNotComputed)?;
            if !delivery.matches(&draft.delivery.city, draft.delivery.method, draft.subtotal)
                || delivery.cost != draft.delivery_cost
            {
                return Err(CheckoutError::StaleDraft);
            }
            self.move_to(&mut state, CheckoutPhase::Submitting)?;
        }

        let ticket = self.inner.cart_seq.next();
        let fresh = match self.inner.api.fetch_cart().await {
            Ok(payload) => CartSnapshot::from_payload(payload),
            Err(err) => return Err(self.fail_submission(err.into())),
        };

        if !draft.matches_cart(&fresh) {
            warn!("Cart changed since the order was drafted");
            let err = self.fail_submission(CheckoutError::StaleDraft);
            if self.inner.cart_seq.is_current(ticket) {
                let prior = self.state().delivery_inputs();
                if let Ok(cart) = self.apply_cart(fresh) {
                    self.requote(prior, &cart).await;
                }
            }
            return Err(err);
        }

        let reply = match self.inner.api.submit_order(&draft.to_request()).await {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail_submission(err.into())),
        };
        let confirmation = match OrderConfirmation::from_reply(reply, draft) {
            Ok(confirmation) => confirmation,
            Err(err) => return Err(self.fail_submission(err.into())),
        };

        self.complete_order(&confirmation);

        if let Err(err) = self.inner.api.clear_cart().await {
            warn!(error = %err, "Order placed but the server cart could not be cleared");
        }

        Ok(confirmation)
    }

    fn fail_submission(&self, err: CheckoutError) -> CheckoutError {
        {
            let mut state = self.state();
            if let Err(transition) = self.move_to(&mut state, CheckoutPhase::SubmitFailed) {
                warn!(error = %transition, "Could not record failed submission");
            }
        }

        if err.is_notice() {
            self.report(err)
        } else {
            self.inner
                .events
                .notice(Notice::warning(err.user_message()));
            err
        }
    }

    fn complete_order(&self, confirmation: &OrderConfirmation) {
        {
            let mut state = self.state();
            if let Err(err) = self.move_to(&mut state, CheckoutPhase::Confirmed) {
                warn!(error = %err, "Unexpected phase after order");
            }
            state.cart = None;
            state.delivery = None;
            state.delivery_city.clear();
            state.delivery_method = DeliveryMethod::default();
            state.payment_method = PaymentMethod::default();
        }

        for key in keys::ALL {
            if let Err(err) = self.inner.store.remove(key) {
                warn!(key, error = %err, "Failed to clear local checkout state");
            }
        }
        self.inner.quoter.invalidate_all();

        info!(order_number = %confirmation.order_number, "Order placed");
        self.inner
            .events
            .publish(CheckoutEvent::OrderConfirmed(confirmation.clone()));
        self.inner.events.notice(Notice::success(format!(
            "Order {} placed",
            confirmation.order_number
        )));
    }

    // =========================================================================
    // Reload
    // =========================================================================

    /// Discard in-memory state, restart at `Loading` and fetch the cart.
    ///
    /// This is the only way out of `Confirmed` and `Blocked`. Responses to
    /// requests started before the reload are discarded.
    ///
    /// # Errors
    ///
    /// Returns any error of the cart fetch.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<CartSnapshot, CheckoutError> {
        self.inner.cart_seq.next();
        self.inner.delivery_seq.next();

        {
            let mut state = self.state();
            let from = state.phase;
            *state = restore(&self.inner.store);
            if from != CheckoutPhase::Loading {
                self.inner.events.publish(CheckoutEvent::PhaseChanged {
                    from,
                    to: CheckoutPhase::Loading,
                });
            }
        }

        self.fetch_cart().await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_open(&self, to: CheckoutPhase) -> Result<(), CheckoutError> {
        check_open(&self.state(), to)
    }

    /// Move to `to`, stepping back through `ItemsDisplayed` when there is no
    /// direct edge.
    fn move_to(&self, state: &mut SessionState, to: CheckoutPhase) -> Result<(), CheckoutError> {
        let from = state.phase;
        if from.can_transition_to(to) {
            self.set_phase(state, to);
            return Ok(());
        }

        let via = CheckoutPhase::ItemsDisplayed;
        if from.can_transition_to(via) && via.can_transition_to(to) {
            self.set_phase(state, via);
            self.set_phase(state, to);
            return Ok(());
        }

        Err(CheckoutError::InvalidTransition { from, to })
    }

    fn set_phase(&self, state: &mut SessionState, to: CheckoutPhase) {
        let from = state.phase;
        state.phase = to;
        if from != to {
            debug!(%from, %to, "Checkout phase changed");
            self.inner
                .events
                .publish(CheckoutEvent::PhaseChanged { from, to });
        }
    }

    /// Log an error and announce it if it is a notice-level failure.
    fn report(&self, err: CheckoutError) -> CheckoutError {
        if err.is_notice() {
            warn!(error = %err, "Checkout operation failed");
            self.inner
                .events
                .notice(Notice::error(err.user_message()));
        }
        err
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(err) = self.inner.store.set(key, value) {
            warn!(key, error = %err, "Failed to persist checkout state");
        }
    }

    fn persist_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(err) = write_json(&self.inner.store, key, value) {
            warn!(key, error = %err, "Failed to persist checkout state");
        }
    }
}

/// Reject operations on a blocked, submitting or confirmed checkout.
fn check_open(state: &SessionState, to: CheckoutPhase) -> Result<(), CheckoutError> {
    match state.phase {
        CheckoutPhase::Blocked => Err(CheckoutError::Blocked),
        from @ (CheckoutPhase::Submitting | CheckoutPhase::Confirmed) => {
            Err(CheckoutError::InvalidTransition { from, to })
        }
        _ => Ok(()),
    }
}

/// Rebuild session state from the local store.
fn restore<S: LocalStore>(store: &S) -> SessionState {
    let mut state = SessionState::default();

    match read_json::<CartSnapshot>(store, keys::CART_DATA) {
        Ok(cart) => state.cart = cart,
        Err(err) => warn!(error = %err, "Ignoring unreadable cached cart"),
    }
    if let Some(method) = read_choice(store, keys::DELIVERY_METHOD) {
        state.delivery_method = method;
    }
    if let Some(method) = read_choice(store, keys::PAYMENT_METHOD) {
        state.payment_method = method;
    }
    match store.get(keys::DELIVERY_CITY) {
        Ok(city) => state.delivery_city = city.unwrap_or_default(),
        Err(err) => warn!(error = %err, "Ignoring unreadable delivery city"),
    }

    state
}

fn read_choice<T, S>(store: &S, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    S: LocalStore,
{
    match store.get(key) {
        Ok(Some(raw)) => raw
            .parse()
            .map_err(|err: T::Err| warn!(key, error = %err, "Ignoring invalid stored choice"))
            .ok(),
        Ok(None) => None,
        Err(err) => {
            warn!(key, error = %err, "Ignoring unreadable stored choice");
            None
        }
    }
}
