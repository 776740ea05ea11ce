use std::sync::Arc;

use anyhow::{Context, Result};
use rollcall_chats::{Chat, ChatEvent, CommitterPolicyModel, EventBus, GroupType, InMemoryDirectory};
use rollcall_config::AppConfig;
use rollcall_contacts::{ContactGroupView, ViewDependencies};
use rollcall_users::UserSession;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod telemetry {
    use anyhow::Result;
    use rollcall_config::LoggingConfig;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global subscriber. `RUST_LOG` wins over `logging.filter`.
    pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&logging.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_ansi(logging.ansi)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Shared client state wired from configuration
#[derive(Clone)]
pub struct ClientServices {
    pub config: AppConfig,
    pub bus: EventBus,
    pub directory: Arc<InMemoryDirectory>,
    pub session: Arc<UserSession>,
    default_group_type: GroupType,
    events: broadcast::Sender<ChatEvent>,
}

impl ClientServices {
    pub fn initialise(config: &AppConfig) -> Result<Self> {
        let default_group_type = config
            .roster
            .default_group_type
            .parse::<GroupType>()
            .with_context(|| {
                format!(
                    "invalid roster.default_group_type {:?}",
                    config.roster.default_group_type
                )
            })?;

        let bus = EventBus::new();
        let directory = Arc::new(InMemoryDirectory::with_bus(bus.clone()));
        let session = Arc::new(UserSession::with_bus(bus.clone()));
        let (events, _) = broadcast::channel(config.roster.event_buffer.max(1));

        info!(%default_group_type, event_buffer = config.roster.event_buffer, "client services ready");

        Ok(Self {
            config: config.clone(),
            bus,
            directory,
            session,
            default_group_type,
            events,
        })
    }

    pub fn default_group_type(&self) -> GroupType {
        self.default_group_type
    }

    /// Unmounted contact view over this bundle's directory and session
    pub fn contact_view(&self) -> ContactGroupView {
        let deps = ViewDependencies {
            directory: self.directory.clone(),
            active_chat: self.directory.clone(),
            preferences: self.session.clone(),
            bus: self.bus.clone(),
        };
        ContactGroupView::new(deps, self.default_group_type)
    }

    pub fn committer_policy(&self, chat: &Chat) -> CommitterPolicyModel {
        CommitterPolicyModel::new(chat, self.directory.as_ref())
    }

    /// Sender for events produced off the main thread, such as a sync task
    pub fn event_sender(&self) -> broadcast::Sender<ChatEvent> {
        self.events.clone()
    }

    /// Start relaying [`Self::event_sender`] traffic onto the bus.
    /// Must be called from within a tokio runtime.
    pub fn spawn_event_forwarding(&self) -> JoinHandle<()> {
        forward_events(self.events.subscribe(), self.bus.clone())
    }
}

/// Pump a broadcast receiver into the synchronous bus until every sender
/// is gone. Lost events are replaced by a single `DirectoryRefreshed` so
/// subscribers still re-derive.
pub fn forward_events(mut receiver: broadcast::Receiver<ChatEvent>, bus: EventBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => bus.emit(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event forwarder lagged behind");
                    bus.emit(ChatEvent::DirectoryRefreshed);
                }
                Err(RecvError::Closed) => {
                    debug!("event channel closed, forwarder stopping");
                    break;
                }
            }
        }
    })
}
