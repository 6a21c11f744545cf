//! C3: transport pipeline between WebSocket frames and validated WAMP
//! messages (spec §4.3). Supervision policy (drop-offending vs.
//! disconnect) lives here, driven by `drop-offending-messages`.

use futures::{SinkExt, StreamExt};
use log::warn;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use crate::codec;
use crate::error::{DecodeError, TransportError};
use crate::messages::Message;

pub struct Transport<S> {
    stream: WebSocketStream<S>,
    strict_uris: bool,
    drop_offending_messages: bool,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: WebSocketStream<S>, strict_uris: bool, drop_offending_messages: bool) -> Transport<S> {
        Transport {
            stream,
            strict_uris,
            drop_offending_messages,
        }
    }

    /// Next validated inbound message, or `None` once the pipeline
    /// should be torn down: the peer closed, a transport error
    /// occurred, or an offending frame arrived and
    /// `drop-offending-messages` is off.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            let frame = match self.stream.next().await {
                None => return None,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    warn!("websocket error: {e}");
                    return None;
                }
            };
            let decoded = match frame {
                WsMessage::Text(text) => codec::decode(&text, self.strict_uris),
                WsMessage::Binary(_) => Err(DecodeError::BinaryFrame),
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
                WsMessage::Close(_) => return None,
            };
            match decoded {
                Ok(message) => return Some(message),
                Err(e) if self.drop_offending_messages => {
                    warn!("dropping offending frame: {e}");
                    continue;
                }
                Err(e) => {
                    warn!("terminating connection on offending frame: {e}");
                    return None;
                }
            }
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let text = codec::encode(message);
        self.stream.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    pub async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::{ClientRoles, HelloDetails, URI};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (Transport<tokio::io::DuplexStream>, Transport<tokio::io::DuplexStream>) {
        let (client, server) = tokio::io::duplex(4096);
        let server_ws = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
        let client_ws = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        (
            Transport::new(client_ws, false, false),
            Transport::new(server_ws, false, false),
        )
    }

    #[tokio::test]
    async fn decodes_one_text_frame_into_a_message() {
        let (mut client, mut server) = pair().await;
        let hello = Message::Hello(URI::new("realm1"), HelloDetails::new(ClientRoles::basic()));
        client.send(&hello).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), hello);
    }

    #[tokio::test]
    async fn drops_offending_frame_and_resumes_when_configured() {
        let (mut client, mut server) = pair().await;
        server.drop_offending_messages = true;
        client.stream.send(WsMessage::Text("not json".to_string())).await.unwrap();
        let hello = Message::Hello(URI::new("realm1"), HelloDetails::new(ClientRoles::basic()));
        client.send(&hello).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), hello);
    }

    #[tokio::test]
    async fn terminates_connection_on_offending_frame_by_default() {
        let (mut client, mut server) = pair().await;
        client.stream.send(WsMessage::Text("not json".to_string())).await.unwrap();
        assert!(server.recv().await.is_none());
    }
}
