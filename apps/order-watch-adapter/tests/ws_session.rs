//! WebSocket Session Integration Tests
//!
//! Runs the JSON-RPC session against a scripted local WebSocket server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use order_watch_adapter::infrastructure::mesh::{
    MeshChannel, MeshClientConfig, MeshConnection, MeshConnector, MeshError, MeshNotification,
    MeshSession, WsMeshConnector,
};

const HEARTBEAT_SUB: &str = "0xab12";
const ORDERS_SUB: &str = "0xcd34";

type Script = Arc<dyn Fn(&Message) -> Vec<Message> + Send + Sync>;

/// Start a server that answers every inbound frame with `script(frame)`.
///
/// The replies to one frame are queued and flushed together, so they reach
/// the client in a single read.
async fn scripted_server(script: Script) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let script = Arc::clone(&script);
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    for reply in script(&msg) {
                        let closing = matches!(reply, Message::Close(_));
                        if ws.feed(reply).await.is_err() {
                            return;
                        }
                        if closing {
                            let _ = ws.flush().await;
                            return;
                        }
                    }
                    if ws.flush().await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

fn request(msg: &Message) -> Option<(u64, String, Value)> {
    let Message::Text(text) = msg else {
        return None;
    };
    let value: Value = serde_json::from_str(text.as_str()).ok()?;
    Some((
        value["id"].as_u64()?,
        value["method"].as_str()?.to_string(),
        value["params"].clone(),
    ))
}

fn response(id: u64, result: &Value) -> Message {
    Message::text(json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string())
}

fn notification(subscription: &str, result: &Value) -> Message {
    Message::text(
        json!({
            "jsonrpc": "2.0",
            "method": "mesh_subscription",
            "params": {"subscription": subscription, "result": result},
        })
        .to_string(),
    )
}

fn order_event_json() -> Value {
    json!({
        "orderHash": "0x8e5b8b1b3a2c1d0f",
        "signedOrder": {
            "senderAddress": "0x0000000000000000000000000000000000000000",
            "makerAddress": "0x6ecbe1db9ef729cbe972c83fb886247691fb6beb",
            "takerAddress": "0x0000000000000000000000000000000000000000",
            "makerFee": "0",
            "takerFee": "0",
            "makerAssetAmount": "100",
            "takerAssetAmount": "42",
            "makerAssetData": "0xf47261b0000000000000000000000000871dd7c2b4b25e1aa18728e9d5f2af4c4e431f5c",
            "takerAssetData": "0xf47261b00000000000000000000000000b1ba0af832d7c05fd64161e0db78e85978e8082",
            "salt": "1548619145450",
            "exchangeAddress": "0x48bacb9266a570d521063ef5dd96e61686dbe788",
            "feeRecipientAddress": "0x0000000000000000000000000000000000000000",
            "expirationTimeSeconds": "1893456000",
            "signature": "0x1c"
        },
        "kind": "ADDED",
        "fillableTakerAssetAmount": "42",
        "txHash": "0x"
    })
}

/// Answers subscriptions and pushes one heartbeat and one order event once
/// the orders subscription is open.
fn relay_script() -> Script {
    Arc::new(|msg: &Message| {
        let Some((id, method, params)) = request(msg) else {
            return Vec::new();
        };
        match (method.as_str(), params[0].as_str()) {
            ("mesh_subscribe", Some("heartbeat")) => vec![response(id, &json!(HEARTBEAT_SUB))],
            ("mesh_subscribe", Some("orders")) => vec![
                response(id, &json!(ORDERS_SUB)),
                notification(HEARTBEAT_SUB, &json!("tick")),
                notification("0xunknown", &json!(null)),
                notification(ORDERS_SUB, &json!([order_event_json()])),
            ],
            ("mesh_getOrders", _) => vec![response(
                id,
                &json!({"snapshotID": "snap-7", "ordersInfos": null}),
            )],
            _ => Vec::new(),
        }
    })
}

async fn connect(addr: SocketAddr, request_timeout: Duration) -> MeshConnection {
    let config = MeshClientConfig {
        request_timeout,
        ..MeshClientConfig::new(format!("ws://{addr}"))
    };
    timeout(Duration::from_secs(5), WsMeshConnector::new(config).connect())
        .await
        .expect("connect timed out")
        .unwrap()
}

#[tokio::test]
async fn subscriptions_route_notifications_to_channels() {
    let addr = scripted_server(relay_script()).await;
    let MeshConnection {
        session,
        mut notifications,
    } = connect(addr, Duration::from_secs(5)).await;

    assert_eq!(session.subscribe(MeshChannel::Heartbeat).await.unwrap(), HEARTBEAT_SUB);
    assert_eq!(session.subscribe(MeshChannel::Orders).await.unwrap(), ORDERS_SUB);

    let first = timeout(Duration::from_secs(2), notifications.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, MeshNotification::Heartbeat);

    let second = timeout(Duration::from_secs(2), notifications.recv())
        .await
        .unwrap()
        .unwrap();
    let MeshNotification::OrderEvents(events) = second else {
        panic!("expected order events, got {second:?}");
    };
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "ADDED");
    assert_eq!(events[0].signed_order.salt, "1548619145450");

    session.close().await;
}

#[tokio::test]
async fn notification_queued_behind_subscribe_response_is_delivered() {
    let script: Script = Arc::new(|msg: &Message| {
        request(msg).map_or_else(Vec::new, |(id, _, _)| {
            vec![
                response(id, &json!(HEARTBEAT_SUB)),
                notification(HEARTBEAT_SUB, &json!("tick")),
            ]
        })
    });

    for _ in 0..20 {
        let addr = scripted_server(Arc::clone(&script)).await;
        let MeshConnection {
            session,
            mut notifications,
        } = connect(addr, Duration::from_secs(5)).await;

        session.subscribe(MeshChannel::Heartbeat).await.unwrap();

        let first = timeout(Duration::from_millis(500), notifications.recv())
            .await
            .expect("first notification was dropped")
            .unwrap();
        assert_eq!(first, MeshNotification::Heartbeat);
        session.close().await;
    }
}

#[tokio::test]
async fn get_orders_decodes_null_page_as_empty() {
    let addr = scripted_server(relay_script()).await;
    let connection = connect(addr, Duration::from_secs(5)).await;

    let page = connection.session.get_orders(0, 1000, "").await.unwrap();

    assert_eq!(page.snapshot_id, "snap-7");
    assert!(page.orders_infos.is_empty());
}

#[tokio::test]
async fn rpc_errors_are_returned() {
    let addr = scripted_server(Arc::new(|msg: &Message| {
        request(msg).map_or_else(Vec::new, |(id, _, _)| {
            vec![Message::text(
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32000, "message": "orders array too large"},
                })
                .to_string(),
            )]
        })
    }))
    .await;
    let connection = connect(addr, Duration::from_secs(5)).await;

    let err = connection.session.add_orders(Vec::new()).await.unwrap_err();

    assert!(matches!(err, MeshError::Rpc { code: -32000, .. }));
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let addr = scripted_server(Arc::new(|_: &Message| Vec::new())).await;
    let connection = connect(addr, Duration::from_millis(100)).await;

    let err = connection
        .session
        .get_orders(0, 1000, "")
        .await
        .unwrap_err();

    assert!(matches!(err, MeshError::Timeout { method: "mesh_getOrders", .. }));
}

#[tokio::test]
async fn server_close_fails_in_flight_requests_and_ends_notifications() {
    let addr = scripted_server(Arc::new(|msg: &Message| {
        if request(msg).is_some() {
            vec![Message::Close(None)]
        } else {
            Vec::new()
        }
    }))
    .await;
    let MeshConnection {
        session,
        mut notifications,
    } = connect(addr, Duration::from_secs(5)).await;

    let err = timeout(Duration::from_secs(2), session.subscribe(MeshChannel::Heartbeat))
        .await
        .expect("request hung after close")
        .unwrap_err();
    assert!(matches!(err, MeshError::ConnectionClosed));

    let end = timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("notification channel stayed open");
    assert!(end.is_none());

    let err = session.get_orders(0, 1, "").await.unwrap_err();
    assert!(matches!(err, MeshError::ConnectionClosed));
}

#[tokio::test]
async fn server_pings_are_answered() {
    let addr = scripted_server(Arc::new(|msg: &Message| match msg {
        Message::Text(_) => request(msg).map_or_else(Vec::new, |(id, _, _)| {
            vec![response(id, &json!(HEARTBEAT_SUB)), Message::Ping("mesh".into())]
        }),
        Message::Pong(_) => vec![notification(HEARTBEAT_SUB, &json!("tick"))],
        _ => Vec::new(),
    }))
    .await;
    let MeshConnection {
        session,
        mut notifications,
    } = connect(addr, Duration::from_secs(5)).await;

    session.subscribe(MeshChannel::Heartbeat).await.unwrap();

    let pushed = timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("no heartbeat after pong")
        .unwrap();
    assert_eq!(pushed, MeshNotification::Heartbeat);
}

#[tokio::test]
async fn unreachable_endpoint_fails_to_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = MeshClientConfig::new(format!("ws://{addr}"));
    let result = WsMeshConnector::new(config).connect().await;

    assert!(result.is_err());
}
