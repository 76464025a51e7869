//! End-to-end socket tests against a real listener on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use charging_gateway::application::{HubDirectory, SharedHubDirectory};
use charging_gateway::interfaces::GatewayServer;
use charging_gateway::shared::ShutdownSignal;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Gateway {
    addr: SocketAddr,
    hubs: SharedHubDirectory,
    shutdown: ShutdownSignal,
}

impl Gateway {
    async fn start() -> Self {
        Self::start_with_idle_timeout(None).await
    }

    async fn start_with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        let hubs = Arc::new(HubDirectory::from_classes(&["ocpp", "hardware", "solar"], true));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let server = GatewayServer::new(hubs.clone())
            .with_idle_timeout(idle_timeout)
            .with_shutdown(shutdown.clone());
        tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });
        Self {
            addr,
            hubs,
            shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    async fn connect(&self, path: &str) -> Client {
        let (ws, _) = connect_async(self.url(path)).await.unwrap();
        ws
    }

    async fn dashboard(&self, class: &str) -> Client {
        let registry = self.hubs.get(class).unwrap().registry().clone();
        let before = registry.dashboard_count();
        let ws = self.connect(&format!("/frontend/{}", class)).await;
        wait_until(|| registry.dashboard_count() > before).await;
        ws
    }

    async fn hardware(&self, class: &str, device_id: &str) -> Client {
        let registry = self.hubs.get(class).unwrap().registry().clone();
        let ws = self.connect(&format!("/{}/{}", class, device_id)).await;
        wait_until(|| registry.is_connected(device_id)).await;
        ws
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

async fn next_text(ws: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("socket error");
        match msg {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {:?}", other),
        }
    }
}

async fn assert_silent(ws: &mut Client) {
    let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(next.is_err(), "expected no message, got {:?}", next);
}

async fn send(ws: &mut Client, text: impl Into<String>) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

#[tokio::test]
async fn boot_notification_is_acknowledged_and_relayed() {
    let gw = Gateway::start().await;
    let mut dashboard = gw.dashboard("ocpp").await;

    let mut request = gw.url("/ocpp/CP-1").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("ocpp1.6"));
    let (mut charger, response) = connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("Sec-WebSocket-Protocol").unwrap(),
        "ocpp1.6"
    );

    let boot = r#"[2,"m1","BootNotification",{"chargePointVendor":"Acme","chargePointModel":"X1"}]"#;
    send(&mut charger, boot).await;

    assert_eq!(next_text(&mut charger).await, "ready");
    let reply: Value = serde_json::from_str(&next_text(&mut charger).await).unwrap();
    assert_eq!(reply[0], 3);
    assert_eq!(reply[1], "m1");
    assert_eq!(reply[2]["status"], "Accepted");
    assert_eq!(reply[2]["interval"], 30);
    assert!(reply[2]["currentTime"].is_string());

    assert_eq!(next_text(&mut dashboard).await, boot);
}

#[tokio::test]
async fn meter_values_get_an_empty_result() {
    let gw = Gateway::start().await;
    let mut charger = gw.hardware("ocpp", "CP-2").await;

    send(&mut charger, r#"[2,"mv-1","MeterValues",{"connectorId":1,"meterValue":[]}]"#).await;

    assert_eq!(next_text(&mut charger).await, "ready");
    let reply: Value = serde_json::from_str(&next_text(&mut charger).await).unwrap();
    assert_eq!(reply, json!([3, "mv-1", {}]));
}

#[tokio::test]
async fn unknown_action_is_relayed_but_not_answered() {
    let gw = Gateway::start().await;
    let mut dashboard = gw.dashboard("ocpp").await;
    let mut charger = gw.hardware("ocpp", "CP-3").await;

    let frame = r#"[2,"m9","Authorize",{"idTag":"ABC"}]"#;
    send(&mut charger, frame).await;

    assert_eq!(next_text(&mut charger).await, "ready");
    assert_eq!(next_text(&mut dashboard).await, frame);
    assert_silent(&mut charger).await;
}

#[tokio::test]
async fn undecodable_frames_are_acknowledged_then_dropped() {
    let gw = Gateway::start().await;
    let mut dashboard = gw.dashboard("ocpp").await;
    let mut charger = gw.hardware("ocpp", "CP-4").await;

    send(&mut charger, "not json").await;
    assert_eq!(next_text(&mut charger).await, "ready");
    assert_silent(&mut dashboard).await;

    // the connection survives
    send(&mut charger, r#"[2,"m2","Heartbeat",{}]"#).await;
    assert_eq!(next_text(&mut charger).await, "ready");
}

#[tokio::test]
async fn every_dashboard_gets_every_frame() {
    let gw = Gateway::start().await;
    let mut first = gw.dashboard("solar").await;
    let mut second = gw.dashboard("solar").await;
    let mut panel = gw.hardware("solar", "inv-1").await;

    for i in 0..3 {
        send(&mut panel, json!({"watts": i}).to_string()).await;
    }
    for i in 0..3 {
        let expected = json!({"watts": i}).to_string();
        assert_eq!(next_text(&mut first).await, expected);
        assert_eq!(next_text(&mut second).await, expected);
    }
}

#[tokio::test]
async fn dashboards_only_see_their_own_class() {
    let gw = Gateway::start().await;
    let mut solar_dash = gw.dashboard("solar").await;
    let mut hardware = gw.hardware("hardware", "relay-1").await;

    send(&mut hardware, r#"{"state":"on"}"#).await;
    assert_eq!(next_text(&mut hardware).await, "ready");
    assert_silent(&mut solar_dash).await;
}

#[tokio::test]
async fn dashboard_command_reaches_the_device() {
    let gw = Gateway::start().await;
    let mut device = gw.hardware("hardware", "relay-7").await;
    let mut dashboard = gw.dashboard("hardware").await;

    send(
        &mut dashboard,
        json!({"device_id": "relay-7", "command": {"relay": "off"}}).to_string(),
    )
    .await;

    let received: Value = serde_json::from_str(&next_text(&mut device).await).unwrap();
    assert_eq!(received, json!({"type": "command", "payload": {"relay": "off"}}));
}

#[tokio::test]
async fn unknown_paths_are_rejected_with_404() {
    let gw = Gateway::start().await;

    for path in ["/", "/ocpp", "/bogus/CP-1", "/ocpp/CP-1/extra", "/frontend/bogus"] {
        match connect_async(gw.url(path)).await {
            Err(WsError::Http(response)) => assert_eq!(response.status(), 404, "{}", path),
            other => panic!("{} should be rejected, got {:?}", path, other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn disconnect_unregisters_the_device() {
    let gw = Gateway::start().await;
    let registry = gw.hubs.get("ocpp").unwrap().registry().clone();
    let mut charger = gw.hardware("ocpp", "CP-5").await;

    charger.close(None).await.unwrap();
    wait_until(|| !registry.is_connected("CP-5")).await;
    assert_eq!(registry.hardware_count(), 0);
}

#[tokio::test]
async fn reconnect_supersedes_the_old_socket() {
    let gw = Gateway::start().await;
    let registry = gw.hubs.get("ocpp").unwrap().registry().clone();
    let mut old = gw.hardware("ocpp", "CP-6").await;
    let old_id = registry.hardware("CP-6").unwrap().id();

    let mut new = gw.connect("/ocpp/CP-6").await;
    wait_until(|| registry.hardware("CP-6").map(|c| c.id()) != Some(old_id)).await;

    // the old socket is closed by the server
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match old.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    // and its exit does not evict the replacement
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.is_connected("CP-6"));
    send(&mut new, r#"[2,"m1","Heartbeat",{}]"#).await;
    assert_eq!(next_text(&mut new).await, "ready");
}

#[tokio::test]
async fn idle_timeout_drops_silent_hardware_but_not_dashboards() {
    let gw = Gateway::start_with_idle_timeout(Some(Duration::from_millis(300))).await;
    let registry = gw.hubs.get("hardware").unwrap().registry().clone();
    let mut dashboard = gw.dashboard("hardware").await;
    let _silent = gw.hardware("hardware", "relay-idle").await;

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!registry.is_connected("relay-idle"));
    assert_eq!(registry.dashboard_count(), 1);

    let mut device = gw.hardware("hardware", "relay-2").await;
    send(&mut device, r#"{"v":1}"#).await;
    assert_eq!(next_text(&mut dashboard).await, r#"{"v":1}"#);
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let gw = Gateway::start().await;
    let mut charger = gw.hardware("ocpp", "CP-7").await;
    let mut dashboard = gw.dashboard("ocpp").await;

    gw.shutdown.trigger();

    for ws in [&mut charger, &mut dashboard] {
        let ended = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(ended.is_ok());
    }
    assert!(connect_async(gw.url("/ocpp/CP-8")).await.is_err());
}
