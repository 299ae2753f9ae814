// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-level tests driving the connection manager, liveness timers and
//! state components through mock adapters.

use std::sync::Arc;
use std::time::Duration;

use portal_core::{ClientEvent, ConnectionState, NotificationId, ServerEvent, UserId};
use portal_realtime::{SessionEvent, SessionHandle, SyncClient, SyncSession};
use portal_test_utils::fixtures::{fast_config, notification};
use portal_test_utils::{AuthReply, MockApi, MockTransport};
use secrecy::SecretString;
use tokio::sync::broadcast;

fn token() -> SecretString {
    SecretString::from("session-token".to_string())
}

fn start(transport: &MockTransport, api: &MockApi) -> SessionHandle {
    SyncSession::start(
        &fast_config(),
        token(),
        Box::new(transport.clone()),
        Arc::new(api.clone()),
    )
}

async fn wait_for_state(handle: &SessionHandle, target: ConnectionState) {
    let mut rx = handle.watch_state();
    let reached = tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| *s == target))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
    assert!(reached, "state {target} not reached");
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..600 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not met in time");
}

async fn next_matching(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    let found = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;
    found.ok().flatten().expect("expected session event")
}

#[tokio::test(start_paused = true)]
async fn connects_and_authenticates_in_order() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;

    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StateChanged(state) = event {
            states.push(state);
        }
    }
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::ConnectedUnauthenticated,
            ConnectionState::ConnectedAuthenticated,
        ]
    );

    let sent = transport.sent_events().await;
    assert_eq!(
        sent[..2],
        [
            ClientEvent::AuthInit {
                token: "session-token".to_string(),
            },
            ClientEvent::PresencePing,
        ]
    );

    handle.end().await;
    assert!(transport.close_count() >= 1);
    assert!(!transport.connected());
}

#[tokio::test(start_paused = true)]
async fn auth_rejection_stops_reconnects() {
    let transport = MockTransport::new();
    transport
        .set_auth_reply(AuthReply::Reject("token expired".to_string()))
        .await;
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    let event = next_matching(&mut events, |e| matches!(e, SessionEvent::AuthRejected { .. })).await;
    assert_eq!(
        event,
        SessionEvent::AuthRejected {
            reason: "token expired".to_string(),
        }
    );

    let pings_at_rejection = api.ping_count();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(transport.connect_count(), 1);
    // The fallback timer must not keep presenting the rejected token.
    assert_eq!(api.ping_count(), pings_at_rejection);
    assert!(handle.is_auth_rejected());
    assert!(!handle.is_degraded());
    assert_eq!(handle.state(), ConnectionState::Disconnected);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_drop() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    transport.drop_connection().await;

    wait_until(|| {
        transport.connect_count() == 2 && handle.state() == ConnectionState::ConnectedAuthenticated
    })
    .await;
    assert!(!handle.is_degraded());

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn degrades_after_exhausted_attempts() {
    let transport = MockTransport::new().failing_connects();
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    let event = next_matching(&mut events, |e| matches!(e, SessionEvent::Degraded { .. })).await;
    assert_eq!(event, SessionEvent::Degraded { attempts: 3 });
    assert!(handle.is_degraded());
    assert_eq!(handle.state(), ConnectionState::Disconnected);
    // Initial attempt plus three retries.
    assert_eq!(transport.connect_count(), 4);

    let pings_before = api.ping_count();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.connect_count(), 4);
    // The liveness fallback outlives the reconnect budget.
    assert!(api.ping_count() > pings_before);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn handshake_timeout_is_a_transport_failure() {
    let transport = MockTransport::new();
    transport.set_auth_reply(AuthReply::Silent).await;
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    next_matching(&mut events, |e| matches!(e, SessionEvent::Degraded { .. })).await;
    assert_eq!(transport.connect_count(), 4);
    assert!(!handle.is_auth_rejected());

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn authentication_resets_attempt_counter() {
    let transport = MockTransport::new().failing_connects();
    transport.script_connects([false, false, true]).await;
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    transport.drop_connection().await;

    let event = next_matching(&mut events, |e| matches!(e, SessionEvent::Degraded { .. })).await;
    assert_eq!(event, SessionEvent::Degraded { attempts: 3 });
    // Three attempts before authenticating, then a fresh budget of three
    // retries after the drop.
    assert_eq!(transport.connect_count(), 6);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn primary_heartbeat_while_connected() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    tokio::time::sleep(Duration::from_secs(31)).await;

    // Handshake ping plus one per 10 s tick.
    assert_eq!(transport.ping_count().await, 4);
    // Only the start-of-session out-of-band ping.
    assert_eq!(api.ping_count(), 1);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn fallback_ping_only_while_disconnected() {
    let transport = MockTransport::new().failing_connects();
    let api = MockApi::new();
    let handle = start(&transport, &api);

    tokio::time::sleep(Duration::from_secs(31)).await;

    // Immediate ping plus one per 15 s tick.
    assert_eq!(api.ping_count(), 3);
    assert_eq!(transport.ping_count().await, 0);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn bulk_fetch_populates_buffer_on_authentication() {
    let transport = MockTransport::new();
    let api = MockApi::with_notifications(vec![
        notification(1, 0),
        notification(3, 20),
        notification(2, 10),
    ]);
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    for _ in 0..100 {
        if handle.notifications().await.len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let ids: Vec<u64> = handle.notifications().await.iter().map(|n| n.id.0).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(handle.unread_count().await, 3);
    assert_eq!(api.fetch_count(), 1);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn failed_bulk_fetch_is_swallowed() {
    let transport = MockTransport::new();
    let api = MockApi::with_notifications(vec![notification(1, 0)]);
    api.set_failing(true);
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    wait_until(|| api.fetch_count() == 1).await;

    assert_eq!(handle.state(), ConnectionState::ConnectedAuthenticated);
    assert!(handle.notifications().await.is_empty());

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn end_does_not_wait_for_slow_bulk_fetch() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    api.set_fetch_delay(Duration::from_secs(3_600));
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    wait_until(|| api.fetch_count() == 1).await;

    let started = tokio::time::Instant::now();
    handle.end().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn toast_is_not_repeated_after_reconnect_refetch() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    transport
        .inject(ServerEvent::NotificationNew(notification(10, 0)))
        .await;
    let first = next_matching(&mut events, |e| matches!(e, SessionEvent::Toast(_))).await;
    assert!(matches!(first, SessionEvent::Toast(n) if n.id == NotificationId(10)));

    // The refetch after reconnect serves id 10 again plus an id never pushed.
    api.set_notifications(vec![notification(11, 1), notification(10, 0)])
        .await;
    transport.drop_connection().await;
    wait_until(|| {
        transport.connect_count() == 2 && handle.state() == ConnectionState::ConnectedAuthenticated
    })
    .await;
    for _ in 0..100 {
        if handle.notifications().await.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(handle.notifications().await.len(), 2);

    transport
        .inject(ServerEvent::NotificationNew(notification(10, 0)))
        .await;
    transport
        .inject(ServerEvent::PresenceSnapshot {
            users: vec![UserId(5)],
        })
        .await;
    for _ in 0..100 {
        if handle.is_online(UserId(5)).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_online(UserId(5)).await);

    let mut later_toasts = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Toast(n) = event {
            later_toasts.push(n.id);
        }
    }
    assert!(later_toasts.is_empty(), "unexpected toasts: {later_toasts:?}");

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn pushed_notification_toasts_once() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);
    let mut events = handle.subscribe();

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    transport
        .inject(ServerEvent::NotificationNew(notification(10, 0)))
        .await;
    transport
        .inject(ServerEvent::NotificationNew(notification(10, 0)))
        .await;
    // Marker: once user 5 is online, both deliveries have been processed.
    transport
        .inject(ServerEvent::PresenceSnapshot {
            users: vec![UserId(5)],
        })
        .await;
    for _ in 0..100 {
        if handle.is_online(UserId(5)).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut toasts = 0;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Toast(n) = event {
            assert_eq!(n.id, NotificationId(10));
            toasts += 1;
        }
    }
    assert_eq!(toasts, 1);
    assert_eq!(handle.notifications().await.len(), 1);
    assert_eq!(handle.unread_count().await, 1);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn presence_events_update_aggregator() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    transport
        .inject(ServerEvent::PresenceSnapshot {
            users: vec![UserId(1), UserId(2)],
        })
        .await;
    transport
        .inject(ServerEvent::PresenceUpdate {
            user_id: UserId(1),
            state: portal_core::PresenceState::Offline,
        })
        .await;

    for _ in 0..100 {
        if handle.is_online(UserId(2)).await && !handle.is_online(UserId(1)).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(!handle.is_online(UserId(1)).await);
    assert!(handle.is_online(UserId(2)).await);
    assert!(!handle.is_online(UserId(3)).await);
    assert_eq!(handle.presence_snapshot().await.len(), 2);
    assert_eq!(handle.online_users().await, vec![UserId(2)]);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn acknowledge_is_optimistic_and_idempotent() {
    let transport = MockTransport::new();
    let api = MockApi::with_notifications(vec![notification(1, 0), notification(2, 5)]);
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    for _ in 0..100 {
        if handle.notifications().await.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Server failures never roll the local state back.
    api.set_failing(true);
    handle.acknowledge(NotificationId(1)).await;
    assert_eq!(handle.unread_count().await, 1);

    let read_at = |list: Vec<portal_core::Notification>| {
        list.into_iter()
            .find(|n| n.id == NotificationId(1))
            .and_then(|n| n.read_at)
    };
    let first = read_at(handle.notifications().await);
    assert!(first.is_some());

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.acknowledge(NotificationId(1)).await;
    assert_eq!(read_at(handle.notifications().await), first);

    let mut acked = Vec::new();
    for _ in 0..100 {
        acked = api.acknowledged().await;
        if acked.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(acked, vec![NotificationId(1), NotificationId(1)]);

    handle.acknowledge_all().await;
    assert_eq!(handle.unread_count().await, 0);
    wait_until(|| api.acknowledge_all_calls() == 1).await;

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn dismiss_is_local_only() {
    let transport = MockTransport::new();
    let api = MockApi::with_notifications(vec![notification(1, 0), notification(2, 5)]);
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    for _ in 0..100 {
        if handle.notifications().await.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(handle.dismiss(NotificationId(2)).await);
    assert!(!handle.dismiss(NotificationId(2)).await);
    assert_eq!(handle.notifications().await.len(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(api.acknowledged().await.is_empty());
    assert_eq!(api.acknowledge_all_calls(), 0);

    handle.end().await;
}

#[tokio::test(start_paused = true)]
async fn end_stops_timers_and_closes_transport() {
    let transport = MockTransport::new();
    let api = MockApi::new();
    let handle = start(&transport, &api);

    wait_for_state(&handle, ConnectionState::ConnectedAuthenticated).await;
    handle.end().await;

    assert!(transport.close_count() >= 1);
    assert!(!transport.connected());

    let api_pings = api.ping_count();
    let ws_pings = transport.ping_count().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(api.ping_count(), api_pings);
    assert_eq!(transport.ping_count().await, ws_pings);
    assert_eq!(transport.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn client_ends_previous_session_before_starting_next() {
    let mut client = SyncClient::new(fast_config());

    let first = MockTransport::new();
    let first_api = MockApi::new();
    client
        .start_session(token(), Box::new(first.clone()), Arc::new(first_api.clone()))
        .await;
    wait_until(|| first.connected()).await;

    let second = MockTransport::new();
    let handle = client
        .start_session(token(), Box::new(second.clone()), Arc::new(MockApi::new()))
        .await;

    // The first session is fully torn down before the second starts.
    assert!(first.close_count() >= 1);
    assert!(!first.connected());
    wait_for_state(handle, ConnectionState::ConnectedAuthenticated).await;

    let first_pings = first_api.ping_count();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(first_api.ping_count(), first_pings);
    assert_eq!(first.connect_count(), 1);

    client.end_session().await;
    assert!(client.session().is_none());
    assert!(!second.connected());
}
