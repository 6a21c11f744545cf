//! C6/C7 realm state: the subscription and registration indices plus
//! the pending-call table, scoped to one realm URI (spec §3 "Realm",
//! "Pending call").

use std::collections::{HashMap, HashSet};

use crate::id::RouterIds;
use crate::messages::Message;
use crate::ID;

struct Subscription {
    topic: String,
    subscribers: HashSet<ID>,
}

struct Registration {
    procedure: String,
    callee: ID,
}

/// An in-flight call from caller to callee (spec §3 "Pending call").
/// Keyed by `(callee_session, invocation_request_id)` in the realm's
/// pending-call table, since that's the correlation the callee's
/// `YIELD`/`ERROR` arrives with.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub call_request_id: ID,
    pub caller_session: ID,
    pub invocation_request_id: ID,
    pub callee_session: ID,
    pub registration_id: ID,
}

/// One message addressed to one session, produced by a broker/dealer
/// operation. The router resolves `session` to a connection and
/// delivers `message` there.
pub struct Outbound {
    pub session: ID,
    pub message: Message,
}

/// A routing namespace: subscriptions, registrations, and in-flight
/// calls, all scoped to this realm only (spec §3 "Realm").
#[derive(Default)]
pub struct Realm {
    subscriptions: HashMap<ID, Subscription>,
    topic_index: HashMap<String, ID>,
    registrations: HashMap<ID, Registration>,
    procedure_index: HashMap<String, ID>,
    pending_calls: HashMap<(ID, ID), PendingCall>,
}

impl Realm {
    pub fn new() -> Realm {
        Realm::default()
    }

    // ---- broker (C6) ----

    /// `SUBSCRIBE`: reuse an existing subscription for `topic` if this
    /// session already has one, else allocate a fresh subscription ID.
    pub fn subscribe(&mut self, ids: &mut RouterIds, session: ID, topic: &str) -> ID {
        if let Some(&subid) = self.topic_index.get(topic) {
            self.subscriptions
                .get_mut(&subid)
                .expect("topic_index entries always have a matching subscription")
                .subscribers
                .insert(session);
            return subid;
        }
        let subid = ids.alloc();
        self.subscriptions.insert(
            subid,
            Subscription {
                topic: topic.to_string(),
                subscribers: HashSet::from([session]),
            },
        );
        self.topic_index.insert(topic.to_string(), subid);
        subid
    }

    /// `UNSUBSCRIBE`: remove `session` from `subid`'s member set,
    /// dropping the subscription entirely once it has no members left.
    /// Fails if `subid` is unknown or not owned by `session`.
    pub fn unsubscribe(&mut self, ids: &mut RouterIds, session: ID, subid: ID) -> Result<(), ()> {
        let sub = self.subscriptions.get_mut(&subid).ok_or(())?;
        if !sub.subscribers.remove(&session) {
            return Err(());
        }
        if sub.subscribers.is_empty() {
            self.topic_index.remove(&sub.topic);
            self.subscriptions.remove(&subid);
            ids.release(subid);
        }
        Ok(())
    }

    pub fn subscription_for_topic(&self, topic: &str) -> Option<ID> {
        self.topic_index.get(topic).copied()
    }

    /// Current members of `subid`, or an empty iterator if it doesn't exist.
    pub fn subscribers(&self, subid: ID) -> impl Iterator<Item = ID> + '_ {
        self.subscriptions
            .get(&subid)
            .into_iter()
            .flat_map(|sub| sub.subscribers.iter().copied())
    }

    // ---- dealer (C7) ----

    /// `REGISTER`: fails if `procedure` already has a live registration
    /// (spec §3 invariant 4: at most one callee per procedure per realm).
    pub fn register(&mut self, ids: &mut RouterIds, session: ID, procedure: &str) -> Result<ID, ()> {
        if self.procedure_index.contains_key(procedure) {
            return Err(());
        }
        let regid = ids.alloc();
        self.registrations.insert(
            regid,
            Registration {
                procedure: procedure.to_string(),
                callee: session,
            },
        );
        self.procedure_index.insert(procedure.to_string(), regid);
        Ok(regid)
    }

    /// `UNREGISTER`: fails if `regid` is unknown or not owned by
    /// `session`. On success, returns the pending calls against this
    /// registration so the caller can be told `wamp.error.canceled`.
    pub fn unregister(
        &mut self,
        ids: &mut RouterIds,
        session: ID,
        regid: ID,
    ) -> Result<Vec<PendingCall>, ()> {
        let owned = matches!(self.registrations.get(&regid), Some(reg) if reg.callee == session);
        if !owned {
            return Err(());
        }
        let reg = self.registrations.remove(&regid).unwrap();
        self.procedure_index.remove(&reg.procedure);
        ids.release(regid);

        let cancelled_keys: Vec<(ID, ID)> = self
            .pending_calls
            .iter()
            .filter(|(_, pc)| pc.registration_id == regid)
            .map(|(key, _)| *key)
            .collect();
        let cancelled = cancelled_keys
            .into_iter()
            .filter_map(|key| self.pending_calls.remove(&key))
            .collect();
        Ok(cancelled)
    }

    pub fn registration_for_procedure(&self, procedure: &str) -> Option<ID> {
        self.procedure_index.get(procedure).copied()
    }

    pub fn callee_of(&self, regid: ID) -> Option<ID> {
        self.registrations.get(&regid).map(|reg| reg.callee)
    }

    pub fn begin_call(
        &mut self,
        call_request_id: ID,
        caller_session: ID,
        invocation_request_id: ID,
        callee_session: ID,
        registration_id: ID,
    ) {
        self.pending_calls.insert(
            (callee_session, invocation_request_id),
            PendingCall {
                call_request_id,
                caller_session,
                invocation_request_id,
                callee_session,
                registration_id,
            },
        );
    }

    /// `YIELD` / `ERROR(INVOCATION, ...)`: consumes and returns the
    /// pending call this response correlates to, or `None` if it has
    /// already been resolved or the callee vanished.
    pub fn take_pending_call(&mut self, callee_session: ID, invocation_request_id: ID) -> Option<PendingCall> {
        self.pending_calls.remove(&(callee_session, invocation_request_id))
    }

    // ---- session teardown (spec §3 invariant 3) ----

    /// Release every subscription and registration this session owns,
    /// cancelling in-flight calls against its registrations and
    /// discarding (without notifying the callee) calls it originated.
    /// Returns the `ERROR(CALL, ..., canceled)` messages owed to callers
    /// whose calls were in flight to this session.
    pub fn remove_session(&mut self, ids: &mut RouterIds, session: ID) -> Vec<PendingCall> {
        let sub_ids: Vec<ID> = self
            .subscriptions
            .iter()
            .filter(|(_, sub)| sub.subscribers.contains(&session))
            .map(|(id, _)| *id)
            .collect();
        for subid in sub_ids {
            let _ = self.unsubscribe(ids, session, subid);
        }

        let reg_ids: Vec<ID> = self
            .registrations
            .iter()
            .filter(|(_, reg)| reg.callee == session)
            .map(|(id, _)| *id)
            .collect();
        let mut cancelled = Vec::new();
        for regid in reg_ids {
            if let Ok(mut pending) = self.unregister(ids, session, regid) {
                cancelled.append(&mut pending);
            }
        }

        let caller_keys: Vec<(ID, ID)> = self
            .pending_calls
            .iter()
            .filter(|(_, pc)| pc.caller_session == session)
            .map(|(key, _)| *key)
            .collect();
        for key in caller_keys {
            self.pending_calls.remove(&key);
        }

        cancelled
    }

    pub fn is_empty_of(&self, session: ID) -> bool {
        !self.subscriptions.values().any(|s| s.subscribers.contains(&session))
            && !self.registrations.values().any(|r| r.callee == session)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::{MonotonicIdGenerator, RouterIds};

    fn ids() -> RouterIds {
        RouterIds::new(Box::new(MonotonicIdGenerator::new()))
    }

    #[test]
    fn subscribe_reuses_existing_subscription_for_same_session() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let a = realm.subscribe(&mut ids, 1, "topic");
        let b = realm.subscribe(&mut ids, 1, "topic");
        assert_eq!(a, b);
    }

    #[test]
    fn unsubscribe_drops_subscription_once_empty() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let subid = realm.subscribe(&mut ids, 1, "topic");
        assert!(realm.unsubscribe(&mut ids, 1, subid).is_ok());
        assert_eq!(realm.subscription_for_topic("topic"), None);
    }

    #[test]
    fn unsubscribe_unknown_fails() {
        let mut realm = Realm::new();
        let mut ids = ids();
        assert!(realm.unsubscribe(&mut ids, 1, 999).is_err());
    }

    #[test]
    fn register_duplicate_procedure_fails() {
        let mut realm = Realm::new();
        let mut ids = ids();
        assert!(realm.register(&mut ids, 1, "proc").is_ok());
        assert!(realm.register(&mut ids, 2, "proc").is_err());
    }

    #[test]
    fn unregister_cancels_pending_calls() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let regid = realm.register(&mut ids, 10, "proc").unwrap();
        realm.begin_call(1, 20, 100, 10, regid);
        let cancelled = realm.unregister(&mut ids, 10, regid).unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].call_request_id, 1);
        assert_eq!(cancelled[0].caller_session, 20);
    }

    #[test]
    fn remove_session_releases_everything_it_owns() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let subid = realm.subscribe(&mut ids, 1, "topic");
        let regid = realm.register(&mut ids, 1, "proc").unwrap();
        realm.begin_call(5, 2, 200, 1, regid);
        let cancelled = realm.remove_session(&mut ids, 1);
        assert_eq!(cancelled.len(), 1);
        assert!(realm.subscription_for_topic("topic").is_none());
        assert!(realm.registration_for_procedure("proc").is_none());
        assert_eq!(realm.subscribers(subid).count(), 0);
    }

    #[test]
    fn remove_session_discards_callers_pending_calls_silently() {
        let mut realm = Realm::new();
        let mut ids = ids();
        let regid = realm.register(&mut ids, 10, "proc").unwrap();
        realm.begin_call(1, 20, 100, 10, regid);
        let cancelled = realm.remove_session(&mut ids, 20);
        assert!(cancelled.is_empty());
        assert!(realm.take_pending_call(10, 100).is_none());
    }
}
