use std::sync::Arc;
use std::time::Duration;

use pubsub_websocket::events::{ConnectivityEvent, PubSubEvent};
use pubsub_websocket::transport::InMemoryTransport;
use pubsub_websocket::{Credentials, PubSubConfig, PubSubManager};

// Timers run against tokio's paused clock: `sleep` in a test auto-advances
// time once every task is idle, so the 5-minute heartbeat runs instantly.

const PING: &str = "{\"type\":\"PING\"}";
const PONG: &str = "{\"type\":\"PONG\"}";

async fn manager_with_transport() -> (PubSubManager<InMemoryTransport>, Arc<InMemoryTransport>) {
	let (transport, events) = InMemoryTransport::with_events(64);
	let transport = Arc::new(transport);
	let manager = PubSubManager::with_transport(PubSubConfig::default(), Arc::clone(&transport), events);
	(manager, transport)
}

async fn wait_for_connections(manager: &PubSubManager<InMemoryTransport>, expected: usize) {
	for _ in 0..1000 {
		if manager.active_connections().await.unwrap() == expected {
			return;
		}
		tokio::task::yield_now().await;
	}
	panic!("pool never reached {expected} active connections");
}

fn ping_count(transport: &InMemoryTransport) -> usize {
	transport.sent_frames().iter().filter(|(_, frame)| frame == PING).count()
}

fn degraded_connections(events: &mut async_broadcast::Receiver<PubSubEvent>) -> Vec<u64> {
	let mut degraded = Vec::new();
	while let Ok(event) = events.try_recv() {
		if let PubSubEvent::Connectivity(ConnectivityEvent::ConnectionDegraded { connection }) = event {
			degraded.push(connection);
		}
	}
	degraded
}

#[tokio::test(start_paused = true)]
async fn test_first_ping_is_sent_when_connection_starts() {
	let (manager, transport) = manager_with_transport().await;
	let connection = transport.open_connection().await;
	wait_for_connections(&manager, 1).await;

	let frames = transport.sent_frames();
	assert_eq!(frames, vec![(connection, PING.to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_pong_before_deadline_keeps_connection_healthy() {
	let (manager, transport) = manager_with_transport().await;
	let mut events = manager.subscribe_events();
	let connection = transport.open_connection().await;
	wait_for_connections(&manager, 1).await;
	assert_eq!(ping_count(&transport), 1);

	transport.inject_message(connection, PONG).await;

	tokio::time::sleep(Duration::from_secs(16)).await;

	assert_eq!(manager.active_connections().await.unwrap(), 1);
	assert_eq!(transport.connect_requests(), 0);
	assert!(degraded_connections(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missed_pong_degrades_and_recycles_the_connection() {
	let (manager, transport) = manager_with_transport().await;
	let mut events = manager.subscribe_events();
	let connection = transport.open_connection().await;
	wait_for_connections(&manager, 1).await;

	manager
		.subscribe(vec!["whispers.9".to_string()], Credentials::new("9", "oauth-token"))
		.await
		.unwrap();
	assert!(manager.is_subscribed("whispers.9").await.unwrap());

	// No PONG arrives within the 15 second deadline
	tokio::time::sleep(Duration::from_secs(16)).await;

	assert_eq!(degraded_connections(&mut events), vec![connection.as_u64()]);
	assert_eq!(manager.active_connections().await.unwrap(), 0);
	assert!(!transport.is_open(connection));

	// The orphaned listener went back to the pending queue and a replacement
	// connection was requested
	assert!(!manager.is_subscribed("whispers.9").await.unwrap());
	assert!(transport.connect_requests() >= 1);

	transport.open_connection().await;
	wait_for_connections(&manager, 1).await;
	assert!(manager.is_subscribed("whispers.9").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_repeats_on_its_period() {
	let (manager, transport) = manager_with_transport().await;
	let connection = transport.open_connection().await;
	wait_for_connections(&manager, 1).await;
	assert_eq!(ping_count(&transport), 1);

	transport.inject_message(connection, PONG).await;
	tokio::time::sleep(Duration::from_secs(301)).await;

	assert_eq!(ping_count(&transport), 2, "second PING after the 5 minute period");
	assert_eq!(manager.active_connections().await.unwrap(), 1);

	transport.inject_message(connection, PONG).await;
	tokio::time::sleep(Duration::from_secs(300)).await;

	assert_eq!(ping_count(&transport), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timers_fire_as_noops_after_connection_close() {
	let (manager, transport) = manager_with_transport().await;
	let connection = transport.open_connection().await;
	wait_for_connections(&manager, 1).await;

	transport.drop_connection(connection).await;
	wait_for_connections(&manager, 0).await;

	// Both the pong deadline and the next ping tick fire for a gone
	// connection; the pool must shrug them off
	tokio::time::sleep(Duration::from_secs(301)).await;

	assert_eq!(ping_count(&transport), 1, "no heartbeat for a removed connection");
	assert_eq!(manager.active_connections().await.unwrap(), 0);
}
