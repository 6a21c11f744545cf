//! C4: connection handler. Owns a [`Transport`] and forwards messages
//! between it and the router's mailbox (spec §4.4). States: *Starting
//! → Connected → Disconnected*, tracked implicitly by which branch of
//! the loop below is executing rather than as a stored enum — there is
//! no observable state between registering with the router and the
//! final `Disconnected` send.

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::router::{ConnId, PeerCommand, RouterCommand, PEER_QUEUE_CAPACITY};
use crate::transport::Transport;

pub async fn run<S>(conn: ConnId, stream: Transport<S>, router_tx: mpsc::Sender<RouterCommand>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut transport = stream;
    let (peer_tx, mut peer_rx) = mpsc::channel(PEER_QUEUE_CAPACITY);

    if router_tx
        .send(RouterCommand::Connected { conn, sender: peer_tx })
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            inbound = transport.recv() => {
                match inbound {
                    Some(message) => {
                        if router_tx.send(RouterCommand::Inbound { conn, message }).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            outbound = peer_rx.recv() => {
                match outbound {
                    Some(PeerCommand::Send(message)) => {
                        if transport.send(&message).await.is_err() {
                            break;
                        }
                    }
                    Some(PeerCommand::Disconnect) | None => break,
                }
            }
        }
    }

    transport.close().await;
    let _ = router_tx.send(RouterCommand::Disconnected { conn }).await;
    debug!("connection {conn} closed");
}
