use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use rollcall_chats::{
    Chat, ChatEvent, ChatType, CommittersType, EventEnvelope, GroupType, Member, MemberStatus,
};
use rollcall_config::AppConfig;
use rollcall_runtime::{forward_events, telemetry, ClientServices};
use rollcall_users::User;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

fn build_config(default_group_type: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.roster.default_group_type = default_group_type.into();
    config.roster.event_buffer = 16;
    config
}

fn initialise(config: &AppConfig) -> Result<ClientServices> {
    ClientServices::initialise(config).context("failed to initialise client services")
}

fn record_events(services: &ClientServices) -> (Arc<Mutex<Vec<&'static str>>>, rollcall_chats::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = services.bus.on_data_change(move |envelope: &EventEnvelope| {
        sink.lock().unwrap().push(envelope.event.event_type_name());
    });
    (seen, subscription)
}

async fn wait_for(seen: &Arc<Mutex<Vec<&'static str>>>, count: usize) -> Result<()> {
    timeout(Duration::from_secs(2), async {
        while seen.lock().unwrap().len() < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .context("timed out waiting for forwarded events")
}

#[test]
fn initialise_parses_default_group_type() -> Result<()> {
    let services = initialise(&build_config("dept"))?;
    assert_eq!(services.default_group_type(), GroupType::Dept);
    assert_eq!(services.contact_view().group_type(), GroupType::Dept);
    Ok(())
}

#[test]
fn initialise_rejects_unknown_group_type() {
    let error = match ClientServices::initialise(&build_config("alphabetical")) {
        Ok(_) => panic!("expected an unknown grouping to be rejected"),
        Err(error) => error,
    };
    let message = format!("{error:?}");
    assert!(
        message.contains("invalid roster.default_group_type"),
        "expected configuration context, got {message}"
    );
}

#[test]
fn contact_view_follows_directory_and_session() -> Result<()> {
    let services = initialise(&build_config("normal"))?;
    services.directory.set_self(Some(1));
    services.directory.upsert_member(Member::new(1, "me"));

    let mut view = services.contact_view();
    view.mount()?;
    services
        .directory
        .upsert_member(Member::new(2, "bob").with_status(MemberStatus::Online));
    assert_eq!(view.model().map(|model| model.contact_count()), Some(1));

    services.session.sign_in(User::new(1, "me"));
    view.set_group_type(GroupType::Role);
    assert_eq!(services.session.config_for(1)?.contacts_group_by_type.as_deref(), Some("role"));

    // a fresh view picks up the saved preference
    assert_eq!(services.contact_view().group_type(), GroupType::Role);
    Ok(())
}

#[test]
fn committer_policy_reads_members_from_directory() -> Result<()> {
    let services = initialise(&build_config("normal"))?;
    services.directory.upsert_member(Member::new(1, "owner"));
    services.directory.upsert_member(Member::new(2, "admin"));
    services.directory.upsert_member(Member::new(3, "plain"));

    let chat = Chat::new("g1", "Team", ChatType::Group)
        .with_owner(1)
        .with_members([2, 3])
        .with_admins([2])
        .with_committers(",");

    let policy = services.committer_policy(&chat);
    assert_eq!(policy.mode(), CommittersType::Whitelist);
    assert_eq!(policy.members_count(), 3);
    assert_eq!(policy.get_committers().to_wire(), "1,2");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn forwarding_relays_sender_events_onto_bus() -> Result<()> {
    let services = initialise(&build_config("normal"))?;
    let (seen, _subscription) = record_events(&services);
    let handle = services.spawn_event_forwarding();

    let sender = services.event_sender();
    sender.send(ChatEvent::UserOnline { member_id: 7 })?;
    sender.send(ChatEvent::ChatUpdated { chat_id: "g1".into() })?;

    wait_for(&seen, 2).await?;
    assert_eq!(*seen.lock().unwrap(), vec!["user_online", "chat_updated"]);

    handle.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn forwarder_stops_when_senders_are_dropped() -> Result<()> {
    let services = initialise(&build_config("normal"))?;
    let (sender, receiver) = broadcast::channel(4);
    let handle = forward_events(receiver, services.bus.clone());

    drop(sender);
    timeout(Duration::from_secs(2), handle)
        .await
        .context("forwarder did not stop")??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn lagging_forwarder_requests_full_refresh() -> Result<()> {
    let services = initialise(&build_config("normal"))?;
    let (seen, _subscription) = record_events(&services);

    let (sender, receiver) = broadcast::channel(1);
    sender.send(ChatEvent::UserOnline { member_id: 1 })?;
    sender.send(ChatEvent::UserOnline { member_id: 2 })?;
    sender.send(ChatEvent::MemberUpdated { member_id: 3 })?;
    drop(sender);

    let handle = forward_events(receiver, services.bus.clone());
    timeout(Duration::from_secs(2), handle)
        .await
        .context("forwarder did not stop")??;

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["directory_refreshed", "member_updated"]
    );
    Ok(())
}

#[test]
fn init_tracing_installs_global_subscriber_once() {
    let config = AppConfig::default();
    assert!(telemetry::init_tracing(&config.logging).is_ok());
    assert!(telemetry::init_tracing(&config.logging).is_err());
}
