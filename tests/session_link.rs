//! End-to-end behaviour of a session against a fake controller.

#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use astropixels_link::auth::TokenStore;
use astropixels_link::service::SendOutcome;
use astropixels_link::{LinkError, Observers};
use common::{Device, eventually, push_to, read, shared, wait_connected};
use serde_json::{Value, json};

#[tokio::test]
async fn connected_command_uses_live_channel_only() {
    let device = Device::start(true).await;
    let session = device.session(Observers::new(), TokenStore::in_memory());
    assert!(wait_connected(&session).await, "live channel never opened");

    assert_eq!(session.send_command(":OP00").await, SendOutcome::LiveChannel);
    assert!(eventually(|| device.ws_frames() == vec![":OP00".to_string()]).await);
    assert!(device.posts().is_empty(), "no HTTP request expected");

    session.shutdown().await;
}

#[tokio::test]
async fn disconnected_command_falls_back_with_token() {
    let device = Device::start(false).await;
    let token = TokenStore::in_memory();
    token.set(Some("droid-secret"));
    let session = device.session(Observers::new(), token);

    assert_eq!(session.send_command(":OP00").await, SendOutcome::Fallback);
    let posts = device.posts();
    assert_eq!(posts.len(), 1);
    let Some(post) = posts.first() else {
        panic!("one post recorded");
    };
    assert_eq!(post.path, "/api/cmd");
    assert_eq!(post.body, "cmd=%3AOP00");
    assert_eq!(post.token.as_deref(), Some("droid-secret"));
    assert_eq!(
        post.content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert!(device.ws_frames().is_empty());
}

#[tokio::test]
async fn fallback_without_token_sends_no_header() {
    let device = Device::start(false).await;
    let session = device.session(Observers::new(), TokenStore::in_memory());

    assert_eq!(session.send_command("$R").await, SendOutcome::Fallback);
    let posts = device.posts();
    let Some(post) = posts.first() else {
        panic!("one post recorded");
    };
    assert_eq!(post.body, "cmd=%24R");
    assert_eq!(post.token, None);
}

#[tokio::test]
async fn unauthorized_fallback_notifies_once_without_retry() {
    let device = Device::start(false).await;
    device.set_write_status(401);
    let unauthorized = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&unauthorized);
    let observers = Observers::new().on_notice(move |err| {
        if matches!(err, LinkError::Unauthorized) {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    });
    let session = device.session(observers, TokenStore::in_memory());

    assert_eq!(session.send_command(":CL00").await, SendOutcome::Failed);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(unauthorized.load(Ordering::SeqCst), 1);
    assert_eq!(device.posts().len(), 1);
}

#[tokio::test]
async fn unreachable_device_reports_transport_notice() {
    // Nothing listens on the discard port.
    let Ok(mut config) = astropixels_link::LinkConfig::new("http://127.0.0.1:9") else {
        panic!("config");
    };
    config.state_poll_interval = Duration::ZERO;
    let notices = shared::<Vec<u32>>();
    let sink = Arc::clone(&notices);
    let observers = Observers::new().on_notice(move |err| push_to(&sink, err.code()));
    let Ok(session) = astropixels_link::Session::start(&config, observers, TokenStore::in_memory())
    else {
        panic!("session");
    };

    assert_eq!(session.send_command(":OP00").await, SendOutcome::Failed);
    assert_eq!(read(&notices), vec![LinkError::TransportUnavailable(String::new()).code()]);
}

#[tokio::test]
async fn oversized_command_never_leaves_the_client() {
    for with_ws in [true, false] {
        let device = Device::start(with_ws).await;
        let notices = shared::<Vec<u32>>();
        let sink = Arc::clone(&notices);
        let observers = Observers::new().on_notice(move |err| push_to(&sink, err.code()));
        let session = device.session(observers, TokenStore::in_memory());
        if with_ws {
            assert!(wait_connected(&session).await);
        }

        let long = "A".repeat(64);
        assert_eq!(session.send_command(&long).await, SendOutcome::Invalid);
        assert_eq!(session.send_command("").await, SendOutcome::Invalid);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(device.posts().is_empty());
        assert!(device.ws_frames().is_empty());
        assert_eq!(read(&notices), vec![1001, 1001]);
    }
}

#[tokio::test]
async fn inbound_frames_reach_their_hooks() {
    let device = Device::start(true).await;
    let states = shared::<Vec<Value>>();
    let logs = shared::<Vec<String>>();
    let progress = shared::<Vec<Value>>();
    let health_calls = Arc::new(AtomicUsize::new(0));

    let (s, l, p, h) = (
        Arc::clone(&states),
        Arc::clone(&logs),
        Arc::clone(&progress),
        Arc::clone(&health_calls),
    );
    let observers = Observers::new()
        .on_state(move |v| push_to(&s, v))
        .on_log(move |line| push_to(&l, line))
        .on_ota_progress(move |v| push_to(&p, v))
        .on_health(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
    let session = device.session(observers, TokenStore::in_memory());
    assert!(wait_connected(&session).await);

    device.push(r#"{"type":"state","data":{"droidName":"R2"}}"#);
    device.push("definitely not json");
    device.push(r#"{"type":"mystery","data":1}"#);
    device.push(r#"{"type":"log","line":"[API] cmd: :OP00"}"#);
    device.push(r#"{"type":"ota","progress":55}"#);

    assert!(eventually(|| read(&progress) == vec![json!(55)]).await);
    let r2 = json!({"droidName": "R2"});
    let live_states: Vec<Value> = read(&states).into_iter().filter(|v| *v == r2).collect();
    assert_eq!(live_states.len(), 1);
    assert_eq!(read(&logs), vec!["[API] cmd: :OP00".to_string()]);
    assert_eq!(health_calls.load(Ordering::SeqCst), 0);

    session.shutdown().await;
}

#[tokio::test]
async fn reconnects_after_device_drops_channel() {
    let device = Device::start(true).await;
    let transitions = shared::<Vec<bool>>();
    let sink = Arc::clone(&transitions);
    let observers = Observers::new().on_connectivity(move |up| push_to(&sink, up));
    let session = device.session(observers, TokenStore::in_memory());
    assert!(wait_connected(&session).await);

    device.kick();
    assert!(eventually(|| read(&transitions) == vec![true, false, true]).await);
    assert!(session.is_connected());

    // Commands flow over the new channel.
    assert_eq!(session.send_command("*ON00").await, SendOutcome::LiveChannel);
    assert!(eventually(|| device.ws_frames().contains(&"*ON00".to_string())).await);

    session.shutdown().await;
}

#[tokio::test]
async fn bootstrap_and_fallback_polling_deliver_state() {
    let device = Device::start(false).await;
    let states = shared::<Vec<Value>>();
    let sink = Arc::clone(&states);
    let observers = Observers::new().on_state(move |v| push_to(&sink, v));
    let session = device.session_with(
        observers,
        TokenStore::in_memory(),
        Duration::from_millis(30),
    );

    assert!(eventually(|| read(&states).len() >= 3).await);
    assert!(device.state_gets() >= 3);
    let first = read(&states).into_iter().next();
    assert_eq!(first, Some(json!({"wifiEnabled": true, "source": "poll"})));

    session.shutdown().await;
}

#[tokio::test]
async fn polling_pauses_while_connected() {
    let device = Device::start(true).await;
    let session = device.session_with(
        Observers::new(),
        TokenStore::in_memory(),
        Duration::from_millis(20),
    );
    assert!(wait_connected(&session).await);
    // Let any poll that raced the connect finish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = device.state_gets();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(device.state_gets(), before);

    session.shutdown().await;
}

#[tokio::test]
async fn administrative_writes_share_auth_contract() {
    let device = Device::start(false).await;
    let token = TokenStore::in_memory();
    token.set(Some("t0k"));
    let notices = shared::<Vec<u32>>();
    let sink = Arc::clone(&notices);
    let observers = Observers::new().on_notice(move |err| push_to(&sink, err.code()));
    let session = device.session(observers, token);
    let api = session.api();

    assert!(api.set_preference("msound", "1", true).await.is_ok());
    assert!(api.factory_reset().await.is_ok());
    assert!(api.reboot().await.is_ok());

    let posts = device.posts();
    let bodies: Vec<(&str, &str)> = posts
        .iter()
        .map(|p| (p.path.as_str(), p.body.as_str()))
        .collect();
    assert_eq!(
        bodies,
        vec![
            ("/api/pref", "key=msound&val=1&reboot=1"),
            ("/api/pref", "key=_clear&val="),
            ("/api/reboot", ""),
        ]
    );
    assert!(posts.iter().all(|p| p.token.as_deref() == Some("t0k")));

    device.set_write_status(401);
    assert!(matches!(
        api.set_preference("msound", "0", false).await,
        Err(LinkError::Unauthorized)
    ));
    assert_eq!(read(&notices), vec![3001]);

    device.set_write_status(400);
    assert!(matches!(
        api.reboot().await,
        Err(LinkError::Rejected { status: 400 })
    ));
    assert_eq!(read(&notices), vec![3001, 3002]);
}

#[tokio::test]
async fn reads_do_not_carry_token() {
    let device = Device::start(false).await;
    let session = device.session(Observers::new(), TokenStore::in_memory());

    let Ok(prefs) = session.api().fetch_preferences(&["msound", "wifi"]).await else {
        panic!("prefs");
    };
    assert_eq!(prefs.get("msound").map(String::as_str), Some("1"));
    assert_eq!(prefs.get("wifi").map(String::as_str), Some(""));

    let Ok(state) = session.api().fetch_state().await else {
        panic!("state");
    };
    assert_eq!(state["wifiEnabled"], json!(true));
    assert!(device.posts().is_empty());
}

#[tokio::test]
async fn firmware_upload_is_authorized_multipart() {
    let device = Device::start(false).await;
    let token = TokenStore::in_memory();
    token.set(Some("flash"));
    let session = device.session(Observers::new(), token);

    let Ok(reply) = session
        .api()
        .upload_firmware("fw.bin", b"\x01\x02image".to_vec())
        .await
    else {
        panic!("upload");
    };
    assert_eq!(reply, "Update OK - Rebooting...");

    let posts = device.posts();
    let Some(post) = posts.first() else {
        panic!("upload recorded");
    };
    assert_eq!(post.path, "/upload/firmware");
    assert_eq!(post.token.as_deref(), Some("flash"));
    assert!(
        post.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("multipart/form-data"))
    );
    assert!(post.body.contains(r#"name="firmware"; filename="fw.bin""#));
}

#[tokio::test]
async fn manual_reconnect_cuts_backoff_short() {
    let device = Device::start(true).await;
    let Ok(mut config) = astropixels_link::LinkConfig::new(&device.base_url()) else {
        panic!("config");
    };
    config.state_poll_interval = Duration::ZERO;
    config.backoff.floor = Duration::from_secs(30);
    config.backoff.ceiling = Duration::from_secs(30);
    let Ok(session) =
        astropixels_link::Session::start(&config, Observers::new(), TokenStore::in_memory())
    else {
        panic!("session");
    };
    assert!(wait_connected(&session).await);

    device.kick();
    let mut rx = session.watch_connection();
    let dropped = tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| !s.is_connected()),
    )
    .await;
    assert!(matches!(dropped, Ok(Ok(_))));
    drop(dropped);

    // Backoff would wait 30 s; the manual trigger reconnects at once.
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.reconnect_now();
    assert!(wait_connected(&session).await);

    session.shutdown().await;
}
