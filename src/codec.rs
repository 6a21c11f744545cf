//! C2: JSON codec. `decode` turns one WebSocket text frame into a
//! validated `Message`; `encode` turns an outbound `Message` back into
//! a frame. Validation here is purely structural/URI/id-range (spec
//! §4.1, §4.2) — it never looks at `args`/`kwargs` payloads, which stay
//! opaque JSON all the way through the router.

use crate::error::DecodeError;
use crate::id::is_valid_id;
use crate::messages::{Message, Reason, URI};

/// Decode one WAMP text frame. `strict_uris` selects the URI character
/// class (spec §3): loose by default, strict when
/// `validate-strict-uris` is configured.
pub fn decode(text: &str, strict_uris: bool) -> Result<Message, DecodeError> {
    let message: Message = serde_json::from_str(text)?;
    validate(&message, strict_uris)?;
    Ok(message)
}

pub fn encode(message: &Message) -> String {
    // `Message`'s hand-written `Serialize` impl only fails for types it
    // doesn't implement (it has none), so this can't panic in practice.
    serde_json::to_string(message).expect("Message serialization is infallible")
}

fn validate(message: &Message, strict: bool) -> Result<(), DecodeError> {
    match message {
        Message::Hello(realm, _) => {
            check_uri(realm, strict)?;
        }
        Message::Welcome(session, _) => check_id(*session)?,
        Message::Abort(_, reason) => check_reason(reason, strict)?,
        Message::Goodbye(_, reason) => check_reason(reason, strict)?,
        Message::Error(_, request, _, reason, _, _) => {
            check_id(*request)?;
            check_reason(reason, strict)?;
        }
        Message::Subscribe(request, _, topic) => {
            check_id(*request)?;
            check_uri(topic, strict)?;
        }
        Message::Subscribed(request, subscription) => {
            check_id(*request)?;
            check_id(*subscription)?;
        }
        Message::Unsubscribe(request, subscription) => {
            check_id(*request)?;
            check_id(*subscription)?;
        }
        Message::Unsubscribed(request) => check_id(*request)?,
        Message::Publish(request, _, topic, _, _) => {
            check_id(*request)?;
            check_uri(topic, strict)?;
        }
        Message::Published(request, publication) => {
            check_id(*request)?;
            check_id(*publication)?;
        }
        Message::Event(subscription, publication, _, _, _) => {
            check_id(*subscription)?;
            check_id(*publication)?;
        }
        Message::Register(request, _, procedure) => {
            check_id(*request)?;
            check_uri(procedure, strict)?;
        }
        Message::Registered(request, registration) => {
            check_id(*request)?;
            check_id(*registration)?;
        }
        Message::Unregister(request, registration) => {
            check_id(*request)?;
            check_id(*registration)?;
        }
        Message::Unregistered(request) => check_id(*request)?,
        Message::Call(request, _, procedure, _, _) => {
            check_id(*request)?;
            check_uri(procedure, strict)?;
        }
        Message::Invocation(request, registration, _, _, _) => {
            check_id(*request)?;
            check_id(*registration)?;
        }
        Message::Yield(request, _, _, _) => check_id(*request)?,
        Message::Result(request, _, _, _) => check_id(*request)?,
    }
    Ok(())
}

fn check_uri(uri: &URI, strict: bool) -> Result<(), DecodeError> {
    if uri.is_valid(strict) {
        Ok(())
    } else {
        Err(DecodeError::InvalidUri(uri.clone()))
    }
}

fn check_id(id: u64) -> Result<(), DecodeError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(DecodeError::IdOutOfRange(id))
    }
}

fn check_reason(reason: &Reason, strict: bool) -> Result<(), DecodeError> {
    if let Reason::CustomReason(uri) = reason {
        check_uri(uri, strict)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::{ClientRoles, HelloDetails};

    #[test]
    fn decode_encode_round_trips_hello() {
        let text = "[1,\"ca.dal.wamp.test\",{\"roles\":{\"publisher\":{}}}]";
        let message = decode(text, false).unwrap();
        assert_eq!(
            message,
            Message::Hello(
                URI::new("ca.dal.wamp.test"),
                HelloDetails::new(ClientRoles::new(
                    [crate::messages::ClientRole::Publisher].into_iter().collect()
                ))
            )
        );
        assert_eq!(encode(&message), text);
    }

    #[test]
    fn decode_rejects_invalid_realm_uri() {
        let text = "[1,\"a..b\",{\"roles\":{\"publisher\":{}}}]";
        assert!(decode(text, false).is_err());
    }

    #[test]
    fn decode_rejects_strict_uri_violation_when_strict_enabled() {
        let text = "[32,1,{},\"myapp.TOPIC-\"]";
        assert!(decode(text, false).is_ok());
        assert!(decode(text, true).is_err());
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(decode("not json", false).is_err());
    }

    #[test]
    fn decode_rejects_bad_goodbye_reason() {
        let text = "[6,{},\"invalid..reason\"]";
        assert!(decode(text, false).is_err());
    }

    #[test]
    fn decode_rejects_id_out_of_range() {
        let text = "[34,1,18014398509481984]";
        assert!(decode(text, false).is_err());
    }
}
