//! C6: broker role — `SUBSCRIBE`/`UNSUBSCRIBE`/`PUBLISH` (spec §4.2).
//! Every function here is pure: it mutates the realm's subscription
//! index and returns the outbound messages the caller owes to sessions,
//! without knowing how those sessions map to connections.

use crate::id::RouterIds;
use crate::messages::{Dict, ErrorType, List, Message, PublishOptions, Reason, SubscribeOptions, URI};
use crate::realm::{Outbound, Realm};
use crate::ID;

pub fn handle_subscribe(
    realm: &mut Realm,
    ids: &mut RouterIds,
    session: ID,
    request_id: ID,
    _options: SubscribeOptions,
    topic: URI,
) -> Outbound {
    let subid = realm.subscribe(ids, session, &topic.uri);
    Outbound {
        session,
        message: Message::Subscribed(request_id, subid),
    }
}

pub fn handle_unsubscribe(realm: &mut Realm, ids: &mut RouterIds, session: ID, request_id: ID, subid: ID) -> Outbound {
    let message = match realm.unsubscribe(ids, session, subid) {
        Ok(()) => Message::Unsubscribed(request_id),
        Err(()) => Message::Error(
            ErrorType::Unsubscribe,
            request_id,
            Dict::new(),
            Reason::NoSuchSubscription,
            None,
            None,
        ),
    };
    Outbound { session, message }
}

/// Returns the full set of outbound messages owed for one `PUBLISH`:
/// an optional `PUBLISHED` ack to the publisher (spec §4.2, only when
/// `options.acknowledge`), followed by one `EVENT` per live subscriber
/// other than the publisher when `exclude_me` applies.
pub fn handle_publish(
    realm: &mut Realm,
    ids: &mut RouterIds,
    session: ID,
    request_id: ID,
    options: PublishOptions,
    topic: URI,
    args: Option<List>,
    kwargs: Option<Dict>,
) -> Vec<Outbound> {
    let publication_id = ids.alloc_transient();
    let subid = realm.subscription_for_topic(&topic.uri);

    let mut out = Vec::new();
    if options.should_acknowledge() {
        out.push(Outbound {
            session,
            message: Message::Published(request_id, publication_id),
        });
    }

    let Some(subid) = subid else {
        return out;
    };
    for subscriber in realm.subscribers(subid) {
        if subscriber == session && options.excludes_publisher() {
            continue;
        }
        out.push(Outbound {
            session: subscriber,
            message: Message::Event(
                subid,
                publication_id,
                crate::messages::EventDetails::new(),
                args.clone(),
                kwargs.clone(),
            ),
        });
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::{MonotonicIdGenerator, RouterIds};

    fn ids() -> RouterIds {
        RouterIds::new(Box::new(MonotonicIdGenerator::new()))
    }

    #[test]
    fn publish_without_acknowledge_emits_no_published() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let out = handle_publish(
            &mut realm,
            &mut ids,
            1,
            10,
            PublishOptions::new(false),
            URI::new("a.topic"),
            None,
            None,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn publish_fans_out_to_subscribers_excluding_publisher_by_default() {
        let mut realm = Realm::new();
        let mut ids = ids();
        realm.subscribe(&mut ids, 1, "a.topic");
        realm.subscribe(&mut ids, 2, "a.topic");
        let out = handle_publish(
            &mut realm,
            &mut ids,
            1,
            10,
            PublishOptions::new(false),
            URI::new("a.topic"),
            None,
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].session, 2);
    }

    #[test]
    fn unsubscribe_unknown_returns_error() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let out = handle_unsubscribe(&mut realm, &mut ids, 1, 5, 999);
        match out.message {
            Message::Error(ErrorType::Unsubscribe, 5, _, Reason::NoSuchSubscription, None, None) => {}
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
