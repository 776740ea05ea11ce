//! Change events and the synchronous data-change bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::entities::MemberId;

/// Something relevant to membership changed. Consumers are free to treat
/// every event as "re-derive everything".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// Chat metadata or committers changed
    ChatUpdated { chat_id: String },

    /// Member joined the directory or a chat
    MemberAdded { member_id: MemberId },

    /// Member profile or role changed
    MemberUpdated { member_id: MemberId },

    /// Member left the directory or a chat
    MemberRemoved { member_id: MemberId },

    /// User came online
    UserOnline { member_id: MemberId },

    /// User went offline
    UserOffline { member_id: MemberId },

    /// The focused chat changed
    ActiveChatChanged { chat_id: Option<String> },

    /// Directory data was reloaded wholesale
    DirectoryRefreshed,

    /// The signed-in user's preferences changed
    PreferencesChanged { user_id: i64 },
}

impl ChatEvent {
    /// Get the chat ID associated with this event
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            ChatEvent::ChatUpdated { chat_id } => Some(chat_id),
            ChatEvent::ActiveChatChanged { chat_id } => chat_id.as_deref(),
            _ => None,
        }
    }

    /// Get the member this event is about
    pub fn member_id(&self) -> Option<MemberId> {
        match self {
            ChatEvent::MemberAdded { member_id }
            | ChatEvent::MemberUpdated { member_id }
            | ChatEvent::MemberRemoved { member_id }
            | ChatEvent::UserOnline { member_id }
            | ChatEvent::UserOffline { member_id } => Some(*member_id),
            _ => None,
        }
    }

    /// Get event type name for logging
    pub fn event_type_name(&self) -> &'static str {
        match self {
            ChatEvent::ChatUpdated { .. } => "chat_updated",
            ChatEvent::MemberAdded { .. } => "member_added",
            ChatEvent::MemberUpdated { .. } => "member_updated",
            ChatEvent::MemberRemoved { .. } => "member_removed",
            ChatEvent::UserOnline { .. } => "user_online",
            ChatEvent::UserOffline { .. } => "user_offline",
            ChatEvent::ActiveChatChanged { .. } => "active_chat_changed",
            ChatEvent::DirectoryRefreshed => "directory_refreshed",
            ChatEvent::PreferencesChanged { .. } => "preferences_changed",
        }
    }
}

/// Event plus delivery metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub event_id: String,
    /// Timestamp when event was emitted
    pub timestamp: String,
    pub event: ChatEvent,
}

impl EventEnvelope {
    pub fn new(event: ChatEvent) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            event,
        }
    }
}

/// Handle identifying one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Handler)>>,
}

impl BusInner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        before != handlers.len()
    }
}

/// Synchronous fan-out of [`ChatEvent`]s.
///
/// Handlers run on the emitting thread, in registration order, once per
/// event, in the order events are emitted. Nothing is queued, coalesced or
/// retried. Handlers may subscribe or unsubscribe from inside a callback;
/// the change applies from the next event on.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. The returned guard deregisters it when dropped.
    #[must_use = "dropping the subscription deregisters the handler"]
    pub fn on_data_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, Arc::new(handler)));
        debug!(subscription = id.0, "data change handler registered");

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Deregister a handler. Returns false if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            debug!(subscription = id.0, "data change handler removed");
        }
        removed
    }

    /// Deliver an event to every handler registered at call time
    pub fn emit(&self, event: ChatEvent) {
        let envelope = EventEnvelope::new(event);
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(
            event_type = envelope.event.event_type_name(),
            handlers = handlers.len(),
            "emitting data change"
        );

        for handler in handlers {
            handler(&envelope);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration guard returned by [`EventBus::on_data_change`]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<BusInner>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deregister now instead of on drop
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.bus.upgrade() {
            if inner.remove(self.id) {
                debug!(subscription = self.id.0, "data change handler released");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&EventEnvelope) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&log);
        let make = move |name: &str| {
            let log = Arc::clone(&shared);
            let name = name.to_string();
            Box::new(move |envelope: &EventEnvelope| {
                log.lock()
                    .unwrap()
                    .push(format!("{name}:{}", envelope.event.event_type_name()));
            }) as Box<dyn Fn(&EventEnvelope) + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_registration_and_delivery_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let _a = bus.on_data_change(make("a"));
        let _b = bus.on_data_change(make("b"));

        bus.emit(ChatEvent::MemberAdded { member_id: 1 });
        bus.emit(ChatEvent::DirectoryRefreshed);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:member_added",
                "b:member_added",
                "a:directory_refreshed",
                "b:directory_refreshed",
            ]
        );
    }

    #[test]
    fn test_dropping_subscription_deregisters() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let subscription = bus.on_data_change(make("a"));
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);

        bus.emit(ChatEvent::DirectoryRefreshed);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_off_is_idempotent() {
        let bus = EventBus::new();
        let subscription = bus.on_data_change(|_| {});
        let id = subscription.id();

        assert!(bus.off(id));
        assert!(!bus.off(id));
        // guard release after manual off is a no-op
        subscription.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new();
        let subscription = bus.on_data_change(|_| {});
        drop(bus);
        assert!(subscription.is_active());
        drop(subscription);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = EventBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let handler_slot = Arc::clone(&slot);
        let handler_calls = Arc::clone(&calls);
        let subscription = bus.on_data_change(move |_| {
            handler_calls.fetch_add(1, Ordering::SeqCst);
            handler_slot.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(subscription);

        bus.emit(ChatEvent::DirectoryRefreshed);
        bus.emit(ChatEvent::DirectoryRefreshed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_accessors() {
        let event = ChatEvent::UserOnline { member_id: 4 };
        assert_eq!(event.member_id(), Some(4));
        assert_eq!(event.chat_id(), None);

        let event = ChatEvent::ChatUpdated {
            chat_id: "g1".to_string(),
        };
        assert_eq!(event.chat_id(), Some("g1"));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ChatUpdated");
        assert_eq!(json["data"]["chat_id"], "g1");
    }

    #[test]
    fn test_envelopes_get_unique_ids() {
        let a = EventEnvelope::new(ChatEvent::DirectoryRefreshed);
        let b = EventEnvelope::new(ChatEvent::DirectoryRefreshed);
        assert_ne!(a.event_id, b.event_id);
    }
}
