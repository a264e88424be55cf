//! State-change events for rendering adapters.
//!
//! The session never prints anything itself. It publishes [`CheckoutEvent`]s
//! on a broadcast channel and whoever renders the checkout subscribes.

use tokio::sync::broadcast;

use crate::cart::CartSnapshot;
use crate::delivery::DeliverySelection;
use crate::draft::{OrderConfirmation, Totals};
use crate::flow::CheckoutPhase;

const EVENT_CAPACITY: usize = 64;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A non-blocking, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Something a renderer may want to redraw.
#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    PhaseChanged {
        from: CheckoutPhase,
        to: CheckoutPhase,
    },
    CartUpdated(CartSnapshot),
    DeliveryUpdated(DeliverySelection),
    TotalsChanged(Totals),
    Notice(Notice),
    OrderConfirmed(OrderConfirmation),
}

/// Fan-out of checkout events. Publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CheckoutEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: CheckoutEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }

    pub fn notice(&self, notice: Notice) {
        self.publish(CheckoutEvent::Notice(notice));
    }
}
