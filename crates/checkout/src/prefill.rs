//! Order form prefill for signed-in customers.
//!
//! Profile and saved addresses are conveniences: any failure is logged and
//! leaves the form as it was.

use tracing::{debug, instrument, warn};

use crate::api::{SavedAddress, StoreApi, UserProfile};
use crate::draft::OrderForm;
use crate::session::CheckoutSession;
use crate::storage::LocalStore;

impl OrderForm {
    /// Copy contact and address details from the profile.
    ///
    /// Blank profile values do not overwrite what is already typed.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        fill(&mut self.first_name, &profile.first_name);
        fill(&mut self.last_name, &profile.last_name);
        fill(&mut self.email, &profile.email);
        fill(&mut self.phone, &profile.phone);
        fill_opt(&mut self.city, profile.city.as_deref());
        fill_opt(&mut self.address, profile.address.as_deref());
        fill_opt(&mut self.postal_code, profile.postal_code.as_deref());
    }

    /// Copy a saved address into the form.
    ///
    /// The address fields are replaced outright; recipient name and phone
    /// only when the address carries them.
    pub fn apply_address(&mut self, address: &SavedAddress) {
        fill(&mut self.first_name, &address.first_name);
        fill(&mut self.last_name, &address.last_name);
        fill(&mut self.phone, &address.phone);
        self.city = address.city.trim().to_string();
        self.address = address.street_line();
        self.postal_code = address.postal_code.trim().to_string();
    }
}

impl<A: StoreApi, S: LocalStore> CheckoutSession<A, S> {
    /// Fill `form` from the customer's profile.
    ///
    /// Returns whether anything was fetched. Does nothing for guests.
    #[instrument(skip(self, form))]
    pub async fn prefill_form(&self, form: &mut OrderForm) -> bool {
        if !self.settings().authenticated {
            debug!("Guest checkout, skipping profile prefill");
            return false;
        }

        match self.api().current_user().await {
            Ok(profile) => {
                form.apply_profile(&profile);
                true
            }
            Err(err) => {
                warn!(error = %err, "Failed to load profile for prefill");
                false
            }
        }
    }

    /// The customer's saved addresses, or none for guests and on failure.
    #[instrument(skip(self))]
    pub async fn saved_addresses(&self) -> Vec<SavedAddress> {
        if !self.settings().authenticated {
            return Vec::new();
        }

        self.api().saved_addresses().await.unwrap_or_else(|err| {
            warn!(error = %err, "Failed to load saved addresses");
            Vec::new()
        })
    }
}

fn fill(field: &mut String, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        value.clone_into(field);
    }
}

fn fill_opt(field: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        fill(field, value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use larder_core::{AddressId, Price};

    use super::*;
    use crate::api::fake::{Failure, FakeStoreApi};
    use crate::config::SessionSettings;
    use crate::storage::MemoryStore;

    fn session(authenticated: bool) -> CheckoutSession<FakeStoreApi, MemoryStore> {
        let api = FakeStoreApi::with_lines(vec![]);
        api.set_user(UserProfile {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+79123456789".to_string(),
            city: Some("Kazan".to_string()),
            ..UserProfile::default()
        });
        api.set_addresses(vec![address()]);
        CheckoutSession::new(
            api,
            MemoryStore::new(),
            SessionSettings {
                default_delivery_cost: Price::from_units(300),
                delivery_cache_ttl: Duration::from_secs(60),
                authenticated,
            },
        )
    }

    fn address() -> SavedAddress {
        SavedAddress {
            id: AddressId::new(3),
            title: "Home".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone: "+79990001122".to_string(),
            city: "Kazan".to_string(),
            street: "Baumana st.".to_string(),
            building: "12".to_string(),
            apartment: Some("5".to_string()),
            postal_code: "420111".to_string(),
        }
    }

    #[tokio::test]
    async fn test_profile_fills_form() {
        let session = session(true);
        let mut form = OrderForm {
            notes: "Ring twice".to_string(),
            ..OrderForm::default()
        };

        assert!(session.prefill_form(&mut form).await);

        assert_eq!(form.first_name, "Anna");
        assert_eq!(form.email, "anna@example.com");
        assert_eq!(form.city, "Kazan");
        assert_eq!(form.notes, "Ring twice");
        assert!(form.address.is_empty());
    }

    #[tokio::test]
    async fn test_guest_is_not_prefilled() {
        let session = session(false);
        let mut form = OrderForm::default();

        assert!(!session.prefill_form(&mut form).await);
        assert!(session.saved_addresses().await.is_empty());
        assert_eq!(form, OrderForm::default());
        assert!(session.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_prefill_failure_leaves_form_untouched() {
        let session = session(true);
        session.api().fail_prefill(Some(Failure::Status(401)));
        let mut form = OrderForm {
            first_name: "Typed".to_string(),
            ..OrderForm::default()
        };
        let before = form.clone();

        assert!(!session.prefill_form(&mut form).await);
        assert_eq!(form, before);
        assert!(session.saved_addresses().await.is_empty());
    }

    #[tokio::test]
    async fn test_saved_address_applies() {
        let session = session(true);
        let mut form = OrderForm::default();
        session.prefill_form(&mut form).await;

        let addresses = session.saved_addresses().await;
        form.apply_address(&addresses[0]);

        assert_eq!(form.first_name, "Anna");
        assert_eq!(form.phone, "+79990001122");
        assert_eq!(form.address, "Baumana st., 12, apt. 5");
        assert_eq!(form.postal_code, "420111");
    }
}
