//! CLI command implementations.

pub mod cart;
pub mod render;
pub mod shell;

use larder_checkout::{CheckoutEvent, CheckoutSession, FileStore, HttpStoreApi};
use tokio::sync::broadcast;

pub type Session = CheckoutSession<HttpStoreApi, FileStore>;

/// Print every notice published since the last call.
pub fn flush_notices(events: &mut broadcast::Receiver<CheckoutEvent>) {
    loop {
        match events.try_recv() {
            Ok(CheckoutEvent::Notice(notice)) => render::notice(&notice),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Notice printer lagged");
            }
            Err(_) => break,
        }
    }
}
