//! C8: router orchestrator. A single task owns all realm/session state
//! (spec §5, §9 "actor-per-connection translated"): connections talk to
//! it only through the message-passing mailbox in [`RouterCommand`],
//! never through shared mutable state.

use std::collections::HashMap;

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::config::RouterConfig;
use crate::id::{IdGenerator, RandomIdGenerator, RouterIds};
use crate::messages::{CallOptions, Dict, ErrorDetails, ErrorType, HelloDetails, InvocationDetails, List, Message, Reason, URI};
use crate::realm::{Outbound, Realm};
use crate::session::Session;
use crate::ID;

mod broker;
mod dealer;
mod handshake;

/// Opaque per-connection identifier, assigned by whatever accepts the
/// connection (spec §9 "cyclic references": a stable handle in place of
/// a peer actor reference).
pub type ConnId = u64;

/// The bounded outbound queue size per connection (spec §5: "small,
/// e.g. 4 messages"); exceeding it fails the connection.
pub const PEER_QUEUE_CAPACITY: usize = 4;

/// What a connection task tells the router.
pub enum RouterCommand {
    Connected {
        conn: ConnId,
        sender: mpsc::Sender<PeerCommand>,
    },
    Inbound {
        conn: ConnId,
        message: Message,
    },
    Disconnected {
        conn: ConnId,
    },
    Shutdown,
}

/// What the router tells a connection task.
#[derive(Debug, Clone)]
pub enum PeerCommand {
    Send(Message),
    Disconnect,
}

pub struct Router {
    realms: HashMap<String, Realm>,
    sessions: HashMap<ConnId, Session>,
    session_index: HashMap<ID, ConnId>,
    peers: HashMap<ConnId, mpsc::Sender<PeerCommand>>,
    session_ids: RouterIds,
    router_ids: RouterIds,
    auto_create_realms: bool,
    abort_unknown_realms: bool,
    agent: String,
}

impl Router {
    pub fn new(config: &RouterConfig) -> Router {
        let mut realms = HashMap::new();
        for realm in &config.realms {
            realms.insert(realm.clone(), Realm::new());
        }
        Router {
            realms,
            sessions: HashMap::new(),
            session_index: HashMap::new(),
            peers: HashMap::new(),
            session_ids: RouterIds::new(Box::new(RandomIdGenerator::new())),
            router_ids: RouterIds::new(Box::new(RandomIdGenerator::new())),
            auto_create_realms: config.auto_create_realms,
            abort_unknown_realms: config.abort_unknown_realms,
            agent: format!("wamp-router/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn add_realm(&mut self, realm: &str) {
        self.realms.entry(realm.to_string()).or_insert_with(Realm::new);
    }

    fn rejects_unknown_realm(&self) -> bool {
        self.abort_unknown_realms || !self.auto_create_realms
    }

    pub fn has_session(&self, conn: ConnId) -> bool {
        self.sessions.contains_key(&conn)
    }

    /// Consume the router, driving it from `rx` until a `Shutdown`
    /// command arrives or the last sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<RouterCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                RouterCommand::Connected { conn, sender } => {
                    self.peers.insert(conn, sender);
                }
                RouterCommand::Inbound { conn, message } => self.dispatch(conn, message),
                RouterCommand::Disconnected { conn } => {
                    self.close_session(conn);
                    self.peers.remove(&conn);
                }
                RouterCommand::Shutdown => {
                    self.shutdown().await;
                    return;
                }
            }
        }
        self.shutdown().await;
    }

    /// Broadcasts `GOODBYE(system_shutdown)`, waits for peers to react,
    /// then disconnects whoever is left (teacher's `Router::shutdown`).
    async fn shutdown(&mut self) {
        let message = Message::Goodbye(
            ErrorDetails::new_with_message("The host is shutting down now"),
            Reason::SystemShutdown,
        );
        for conn in self.peers.keys().copied().collect::<Vec<_>>() {
            self.send_to_conn(conn, message.clone());
        }
        info!("goodbye messages sent, waiting 5 seconds for responses");
        tokio::time::sleep(Duration::from_secs(5)).await;
        for (_, sender) in self.peers.drain() {
            let _ = sender.try_send(PeerCommand::Disconnect);
        }
    }

    fn dispatch(&mut self, conn: ConnId, message: Message) {
        match message {
            Message::Hello(realm, details) => handshake::handle_hello(self, conn, realm, details),
            Message::Goodbye(_, _) => handshake::handle_goodbye(self, conn),
            Message::Abort(_, _) => {}
            other => self.dispatch_session_message(conn, other),
        }
    }

    /// Dispatch precondition (spec §4.5): anything besides HELLO/GOODBYE/
    /// ABORT arriving on a connection without an *Open* session is
    /// dropped silently.
    fn dispatch_session_message(&mut self, conn: ConnId, message: Message) {
        let Some(session) = self.sessions.get(&conn) else {
            return;
        };
        let session_id = session.id;
        let realm_name = session.realm.clone();

        match message {
            Message::Subscribe(request, options, topic) => {
                self.with_realm(&realm_name, |realm, ids| {
                    broker::handle_subscribe(realm, ids, session_id, request, options, topic)
                });
            }
            Message::Unsubscribe(request, subscription) => {
                self.with_realm(&realm_name, |realm, ids| {
                    broker::handle_unsubscribe(realm, ids, session_id, request, subscription)
                });
            }
            Message::Publish(request, options, topic, args, kwargs) => {
                self.with_realm_many(&realm_name, |realm, ids| {
                    broker::handle_publish(realm, ids, session_id, request, options, topic, args, kwargs)
                });
            }
            Message::Register(request, options, procedure) => {
                self.with_realm(&realm_name, |realm, ids| {
                    dealer::handle_register(realm, ids, session_id, request, options, procedure)
                });
            }
            Message::Unregister(request, registration) => {
                self.with_realm_many(&realm_name, |realm, ids| {
                    dealer::handle_unregister(realm, ids, session_id, request, registration)
                });
            }
            Message::Call(request, options, procedure, args, kwargs) => {
                self.handle_call(session_id, &realm_name, request, options, procedure, args, kwargs);
            }
            Message::Yield(request, _options, args, kwargs) => {
                if let Some(realm) = self.realms.get_mut(&realm_name) {
                    if let Some(out) = dealer::handle_yield(realm, session_id, request, args, kwargs) {
                        self.deliver(vec![out]);
                    }
                }
            }
            Message::Error(ErrorType::Invocation, request, details, reason, args, kwargs) => {
                if let Some(realm) = self.realms.get_mut(&realm_name) {
                    if let Some(out) =
                        dealer::handle_invocation_error(realm, session_id, request, details, reason, args, kwargs)
                    {
                        self.deliver(vec![out]);
                    }
                }
            }
            _ => {}
        }
    }

    fn with_realm(&mut self, realm_name: &str, f: impl FnOnce(&mut Realm, &mut RouterIds) -> Outbound) {
        if let Some(realm) = self.realms.get_mut(realm_name) {
            let out = f(realm, &mut self.router_ids);
            self.deliver(vec![out]);
        }
    }

    fn with_realm_many(&mut self, realm_name: &str, f: impl FnOnce(&mut Realm, &mut RouterIds) -> Vec<Outbound>) {
        if let Some(realm) = self.realms.get_mut(realm_name) {
            let out = f(realm, &mut self.router_ids);
            self.deliver(out);
        }
    }

    /// `CALL` needs both the realm's registration table and the
    /// callee's per-session invocation-id generator, so it is handled
    /// here rather than in `dealer`, which only ever sees `&mut Realm`.
    #[allow(clippy::too_many_arguments)]
    fn handle_call(
        &mut self,
        session_id: ID,
        realm_name: &str,
        request_id: ID,
        _options: CallOptions,
        procedure: URI,
        args: Option<List>,
        kwargs: Option<Dict>,
    ) {
        let Some(realm) = self.realms.get_mut(realm_name) else {
            return;
        };
        let Some(regid) = realm.registration_for_procedure(&procedure.uri) else {
            self.send_to_session(
                session_id,
                Message::Error(ErrorType::Call, request_id, Dict::new(), Reason::NoSuchProcedure, None, None),
            );
            return;
        };
        let callee_session = realm
            .callee_of(regid)
            .expect("registration_for_procedure implies a live callee");

        let Some(&callee_conn) = self.session_index.get(&callee_session) else {
            return;
        };
        let Some(callee) = self.sessions.get_mut(&callee_conn) else {
            return;
        };
        let invocation_request_id = callee.request_ids.next_id(&mut |_| false);

        realm.begin_call(request_id, session_id, invocation_request_id, callee_session, regid);

        self.send_to_session(
            callee_session,
            Message::Invocation(invocation_request_id, regid, InvocationDetails::new(), args, kwargs),
        );
    }

    /// Session teardown (spec §3 invariant 3, §4.7 asymmetric disconnect):
    /// releases everything the session owns and cancels in-flight calls
    /// against its registrations. Used both by `GOODBYE` and by a
    /// connection's `Disconnected` signal.
    fn close_session(&mut self, conn: ConnId) {
        let Some(session) = self.sessions.remove(&conn) else {
            return;
        };
        self.session_index.remove(&session.id);
        self.session_ids.release(session.id);

        if let Some(realm) = self.realms.get_mut(&session.realm) {
            let cancelled = realm.remove_session(&mut self.router_ids, session.id);
            let outbound: Vec<Outbound> = cancelled
                .into_iter()
                .map(|pc| Outbound {
                    session: pc.caller_session,
                    message: Message::Error(ErrorType::Call, pc.call_request_id, Dict::new(), Reason::Cancelled, None, None),
                })
                .collect();
            self.deliver(outbound);
        }
    }

    fn deliver(&mut self, outbound: Vec<Outbound>) {
        for out in outbound {
            self.send_to_session(out.session, out.message);
        }
    }

    fn send_to_session(&mut self, session: ID, message: Message) {
        if let Some(&conn) = self.session_index.get(&session) {
            self.send_to_conn(conn, message);
        }
    }

    fn send_to_conn(&mut self, conn: ConnId, message: Message) {
        let Some(sender) = self.peers.get(&conn) else {
            return;
        };
        if sender.try_send(PeerCommand::Send(message)).is_err() {
            warn!("outbound queue full or closed for connection {conn}, failing it");
            let _ = sender.try_send(PeerCommand::Disconnect);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::{ClientRoles, List};
    use clap::Parser;
    use tokio::sync::mpsc;

    fn config() -> RouterConfig {
        let mut config = RouterConfig::parse_from(["wamp-router"]);
        config.realms = vec!["realm1".to_string()];
        config
    }

    fn open_session(router: &mut Router, conn: ConnId) -> (mpsc::Sender<PeerCommand>, mpsc::Receiver<PeerCommand>) {
        let (tx, rx) = mpsc::channel(PEER_QUEUE_CAPACITY);
        router.peers.insert(conn, tx.clone());
        handshake::handle_hello(router, conn, URI::new("realm1"), HelloDetails::new(ClientRoles::basic()));
        (tx, rx)
    }

    #[test]
    fn call_with_no_registration_errors() {
        let mut router = Router::new(&config());
        let (_tx, mut rx) = open_session(&mut router, 1);
        let _ = rx.try_recv();
        router.dispatch(1, Message::Call(7, CallOptions::new(), URI::new("missing"), None, None));
        match rx.try_recv().unwrap() {
            PeerCommand::Send(Message::Error(ErrorType::Call, 7, _, Reason::NoSuchProcedure, None, None)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn call_routes_invocation_to_callee_and_result_back_to_caller() {
        let mut router = Router::new(&config());
        let (_caller_tx, mut caller_rx) = open_session(&mut router, 1);
        let _ = caller_rx.try_recv();
        let (_callee_tx, mut callee_rx) = open_session(&mut router, 2);
        let _ = callee_rx.try_recv();

        router.dispatch(2, Message::Register(1, crate::messages::RegisterOptions::new(), URI::new("p")));
        assert!(matches!(
            callee_rx.try_recv().unwrap(),
            PeerCommand::Send(Message::Registered(1, _))
        ));

        router.dispatch(1, Message::Call(42, CallOptions::new(), URI::new("p"), Some(vec![]), None));
        let invocation_request_id = match callee_rx.try_recv().unwrap() {
            PeerCommand::Send(Message::Invocation(invreq, _, _, _, _)) => invreq,
            other => panic!("unexpected: {:?}", other),
        };

        router.dispatch(
            2,
            Message::Yield(invocation_request_id, crate::messages::YieldOptions::new(), Some(vec![]), None),
        );
        match caller_rx.try_recv().unwrap() {
            PeerCommand::Send(Message::Result(42, _, Some(List::default()), None)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn disconnect_releases_registration_and_cancels_pending_call() {
        let mut router = Router::new(&config());
        let (_caller_tx, mut caller_rx) = open_session(&mut router, 1);
        let _ = caller_rx.try_recv();
        let (_callee_tx, mut callee_rx) = open_session(&mut router, 2);
        let _ = callee_rx.try_recv();

        router.dispatch(2, Message::Register(1, crate::messages::RegisterOptions::new(), URI::new("p")));
        let _ = callee_rx.try_recv();
        router.dispatch(1, Message::Call(42, CallOptions::new(), URI::new("p"), None, None));
        let _ = callee_rx.try_recv();

        router.close_session(2);
        match caller_rx.try_recv().unwrap() {
            PeerCommand::Send(Message::Error(ErrorType::Call, 42, _, Reason::Cancelled, None, None)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
