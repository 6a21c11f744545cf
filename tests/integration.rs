//! End-to-end scenarios against a real socket, driving the router
//! through its actual WebSocket upgrade and JSON wire format rather
//! than any internal API. Covers the literal scenarios enumerated in
//! spec §8.

use std::time::Duration;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wamp_router::{server, RouterConfig};

async fn start_router(realms: &[&str]) -> String {
    start_router_with(realms, false).await
}

async fn start_router_with(realms: &[&str], drop_offending_messages: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut config = RouterConfig::parse_from(["wamp-router"]);
    config.realms = realms.iter().map(|r| r.to_string()).collect();
    config.drop_offending_messages = drop_offending_messages;
    tokio::spawn(server::serve_on(listener, config));
    format!("ws://{addr}/ws")
}

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(url: &str) -> Client {
    let mut req = url.into_client_request().unwrap();
    req.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        "wamp.2.json".parse().unwrap(),
    );
    let (ws, _response) = tokio_tungstenite::connect_async(req).await.unwrap();
    ws
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(WsMessage::Text(value.to_string())).await.unwrap();
}

async fn recv(ws: &mut Client) -> Value {
    let frame = timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a reply")
        .expect("connection closed unexpectedly")
        .unwrap();
    match frame {
        WsMessage::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

async fn recv_is_none(ws: &mut Client) -> bool {
    timeout(Duration::from_millis(200), ws.next()).await.is_err()
}

#[tokio::test]
async fn handshake_on_known_realm() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut ws = connect(&url).await;
    send(&mut ws, json!([1, "akka.wamp.realm", {"roles": {"publisher": {}}}])).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply[0], 2);
    assert_eq!(reply[2]["roles"]["broker"], json!({}));
    assert_eq!(reply[2]["roles"]["dealer"], json!({}));
}

#[tokio::test]
async fn duplicate_hello_aborts_the_session() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut ws = connect(&url).await;
    send(&mut ws, json!([1, "akka.wamp.realm", {"roles": {"publisher": {}}}])).await;
    recv(&mut ws).await;

    send(&mut ws, json!([1, "akka.wamp.realm", {"roles": {"publisher": {}}}])).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply[0], 3);
    assert_eq!(reply[2], "akka.wamp.error.session_already_open");
}

#[tokio::test]
async fn bad_goodbye_reason_is_dropped_then_real_one_closes() {
    // this scenario only makes sense with drop-offending-messages on:
    // by default a malformed frame terminates the pipeline (spec §7
    // taxon 1), so the "session remains open" step requires it.
    let url = start_router_with(&["akka.wamp.realm"], true).await;
    let mut ws = connect(&url).await;
    send(&mut ws, json!([1, "akka.wamp.realm", {"roles": {"publisher": {}}}])).await;
    recv(&mut ws).await;

    send(&mut ws, json!([6, {}, "invalid..reason"])).await;
    assert!(recv_is_none(&mut ws).await, "malformed GOODBYE should get no reply");

    send(&mut ws, json!([6, {}, "wamp.error.close_realm"])).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply, json!([6, {}, "wamp.error.goodbye_and_out"]));
}

#[tokio::test]
async fn subscribe_then_publish_with_ack_delivers_event() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut ws = connect(&url).await;
    send(
        &mut ws,
        json!([1, "akka.wamp.realm", {"roles": {"subscriber": {}, "publisher": {}}}]),
    )
    .await;
    recv(&mut ws).await;

    send(&mut ws, json!([32, 1, {}, "myapp.TOPIC-"])).await;
    let subscribed = recv(&mut ws).await;
    assert_eq!(subscribed[0], 33);
    assert_eq!(subscribed[1], 1);
    let subid = subscribed[2].clone();

    send(&mut ws, json!([16, 2, {"acknowledge": true}, "myapp.TOPIC-"])).await;
    let published = recv(&mut ws).await;
    assert_eq!(published[0], 17);
    assert_eq!(published[1], 2);
    let pubid = published[2].clone();

    let event = recv(&mut ws).await;
    assert_eq!(event[0], 36);
    assert_eq!(event[1], subid);
    assert_eq!(event[2], pubid);
}

#[tokio::test]
async fn register_duplicate_procedure_errors() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut a = connect(&url).await;
    send(&mut a, json!([1, "akka.wamp.realm", {"roles": {"callee": {}}}])).await;
    recv(&mut a).await;
    send(&mut a, json!([64, 1, {}, "p"])).await;
    let registered = recv(&mut a).await;
    assert_eq!(registered[0], 65);

    let mut b = connect(&url).await;
    send(&mut b, json!([1, "akka.wamp.realm", {"roles": {"callee": {}}}])).await;
    recv(&mut b).await;
    send(&mut b, json!([64, 1, {}, "p"])).await;
    let error = recv(&mut b).await;
    assert_eq!(error, json!([8, 64, 1, {}, "wamp.error.procedure_already_exists"]));
}

#[tokio::test]
async fn call_with_no_registration_errors() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut ws = connect(&url).await;
    send(&mut ws, json!([1, "akka.wamp.realm", {"roles": {"caller": {}}}])).await;
    recv(&mut ws).await;

    send(&mut ws, json!([48, 7, {}, "missing"])).await;
    let error = recv(&mut ws).await;
    assert_eq!(error, json!([8, 48, 7, {}, "wamp.error.no_such_procedure"]));
}

#[tokio::test]
async fn messages_before_hello_are_silently_dropped() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut ws = connect(&url).await;

    send(&mut ws, json!([6, {}, "wamp.error.close_realm"])).await;
    assert!(recv_is_none(&mut ws).await);

    send(&mut ws, json!([48, 1, {}, "anything"])).await;
    assert!(recv_is_none(&mut ws).await);

    // the connection is still alive: HELLO now succeeds normally.
    send(&mut ws, json!([1, "akka.wamp.realm", {"roles": {"publisher": {}}}])).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply[0], 2);
}

#[tokio::test]
async fn call_routes_through_to_a_registered_callee() {
    let url = start_router(&["akka.wamp.realm"]).await;
    let mut callee = connect(&url).await;
    send(&mut callee, json!([1, "akka.wamp.realm", {"roles": {"callee": {}}}])).await;
    recv(&mut callee).await;
    send(&mut callee, json!([64, 1, {}, "add"])).await;
    let registered = recv(&mut callee).await;
    let regid = registered[2].clone();

    let mut caller = connect(&url).await;
    send(&mut caller, json!([1, "akka.wamp.realm", {"roles": {"caller": {}}}])).await;
    recv(&mut caller).await;
    send(&mut caller, json!([48, 42, {}, "add", [1, 2]])).await;

    let invocation = recv(&mut callee).await;
    assert_eq!(invocation[0], 68);
    assert_eq!(invocation[2], regid);
    let invocation_request_id = invocation[1].clone();

    send(&mut callee, json!([70, invocation_request_id, {}, [3]])).await;
    let result = recv(&mut caller).await;
    assert_eq!(result, json!([50, 42, {}, [3]]));
}

#[tokio::test]
async fn upgrade_without_subprotocol_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut config = RouterConfig::parse_from(["wamp-router"]);
    config.realms = vec!["akka.wamp.realm".to_string()];
    tokio::spawn(server::serve_on(listener, config));

    let url = format!("ws://{addr}/ws");
    let req = url.into_client_request().unwrap();
    let result = tokio_tungstenite::connect_async(req).await;
    match result.unwrap_err() {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 400);
            assert_eq!(
                response.headers().get("Sec-WebSocket-Protocol").unwrap(),
                "wamp.2.json"
            );
        }
        other => panic!("expected an HTTP rejection, got: {other:?}"),
    }
}
