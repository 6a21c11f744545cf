//! C1/C2: TCP listener and the HTTP→WebSocket upgrade (spec §4.2/§4.3).
//! Accepts connections, negotiates the `wamp.2.json` sub-protocol and
//! the configured path, then hands each socket off to
//! [`crate::connection::run`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::config::RouterConfig;
use crate::connection;
use crate::error::RouterError;
use crate::router::{Router, RouterCommand};
use crate::transport::Transport;

const SUBPROTOCOL: &str = "wamp.2.json";

pub async fn serve(config: RouterConfig) -> Result<(), RouterError> {
    if !config.wspath.starts_with('/') {
        return Err(RouterError::InvalidPath(config.wspath.clone()));
    }

    let addr = format!("{}:{}", config.iface, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RouterError::Bind(addr.clone(), e))?;
    info!("listening on {addr}{}", config.wspath);

    serve_on(listener, config).await
}

/// Drives the accept loop against an already-bound listener, so tests
/// can bind to an ephemeral port and learn the real address before the
/// loop starts.
pub async fn serve_on(listener: TcpListener, config: RouterConfig) -> Result<(), RouterError> {
    let router = Router::new(&config);
    let (router_tx, router_rx) = mpsc::channel(1024);
    tokio::spawn(router.run(router_rx));

    let next_conn = Arc::new(AtomicU64::new(1));
    let wspath = Arc::new(config.wspath.clone());
    let strict_uris = config.validate_strict_uris;
    let drop_offending_messages = config.drop_offending_messages;

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };
        let conn = next_conn.fetch_add(1, Ordering::Relaxed);
        let wspath = wspath.clone();
        let router_tx = router_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = accept_connection(
                stream,
                conn,
                &wspath,
                strict_uris,
                drop_offending_messages,
                router_tx,
            )
            .await
            {
                warn!("websocket upgrade with {peer} failed: {e}");
            }
        });
    }
}

async fn accept_connection(
    stream: TcpStream,
    conn: u64,
    wspath: &str,
    strict_uris: bool,
    drop_offending_messages: bool,
    router_tx: mpsc::Sender<RouterCommand>,
) -> Result<(), RouterError> {
    if !peek_is_websocket_upgrade(&stream).await? {
        reject_non_upgrade(stream).await?;
        return Ok(());
    }

    let wspath = wspath.to_string();
    let callback = move |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() != wspath {
            let mut rejection = ErrorResponse::new(Some("not found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            return Err(rejection);
        }
        if !offers_subprotocol(req) {
            let mut rejection = ErrorResponse::new(Some(format!(
                "requires sub-protocol {SUBPROTOCOL}; supported sub-protocols: {SUBPROTOCOL}"
            )));
            *rejection.status_mut() = StatusCode::BAD_REQUEST;
            rejection.headers_mut().insert(
                "Sec-WebSocket-Protocol",
                SUBPROTOCOL.parse().expect("static subprotocol string is a valid header value"),
            );
            return Err(rejection);
        }
        let mut response = response;
        response.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            SUBPROTOCOL.parse().expect("static subprotocol string is a valid header value"),
        );
        Ok(response)
    };

    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback).await?;
    let transport = Transport::new(ws_stream, strict_uris, drop_offending_messages);
    connection::run(conn, transport, router_tx).await;
    Ok(())
}

/// Peeks the request's leading bytes for an `Upgrade: websocket` header
/// without consuming them, so a plain GET gets the spec's literal 400
/// body (spec §6: "Non-Upgrade GETs are out of scope... yield 400")
/// instead of whatever error `accept_hdr_async`'s own handshake parsing
/// produces. Gives up and defers to the real handshake if the headers
/// don't show up quickly — better to let a slow client through than to
/// misclassify it.
async fn peek_is_websocket_upgrade(stream: &TcpStream) -> std::io::Result<bool> {
    let mut buf = [0u8; 2048];
    for _ in 0..20 {
        let n = stream.peek(&mut buf).await?;
        let head = String::from_utf8_lossy(&buf[..n]).to_ascii_lowercase();
        if head.contains("upgrade: websocket") {
            return Ok(true);
        }
        if head.contains("\r\n\r\n") {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(true)
}

async fn reject_non_upgrade(mut stream: TcpStream) -> Result<(), RouterError> {
    const BODY: &str = "Expected WebSocket Upgrade request";
    let response = format!(
        "HTTP/1.1 400 Bad Request\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{}",
        BODY.len(),
        BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn offers_subprotocol(req: &Request) -> bool {
    req.headers()
        .get("Sec-WebSocket-Protocol")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').any(|p| p.trim() == SUBPROTOCOL))
        .unwrap_or(false)
}
