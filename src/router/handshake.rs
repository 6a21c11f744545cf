//! Session handshake (spec §4.5): `HELLO`/`GOODBYE` are handled directly
//! against `Router` state rather than delegated to broker/dealer, since
//! they create and tear down the session itself. Client-origin `ABORT`
//! is not handled here at all — `Router::dispatch` drops it.

use crate::messages::{ErrorDetails, HelloDetails, Message, Reason, RouterRoles, WelcomeDetails, URI};
use crate::realm::Realm;
use crate::router::{ConnId, Router};
use crate::session::Session;

pub fn handle_hello(router: &mut Router, conn: ConnId, realm: URI, details: HelloDetails) {
    if router.sessions.contains_key(&conn) {
        router.send_to_conn(conn, Message::Abort(ErrorDetails::new(), Reason::SessionAlreadyOpen));
        router.close_session(conn);
        return;
    }

    let realm_name = realm.uri;
    if !router.realms.contains_key(&realm_name) {
        if router.rejects_unknown_realm() {
            router.send_to_conn(
                conn,
                Message::Abort(
                    ErrorDetails::new_with_message(&format!("The realm {} does not exist.", realm_name)),
                    Reason::NoSuchRealm,
                ),
            );
            return;
        }
        router.realms.insert(realm_name.clone(), Realm::new());
    }

    let sid = router.session_ids.alloc();
    let roles = details.roles().clone().into_set();
    router.sessions.insert(conn, Session::new(sid, realm_name, roles));
    router.session_index.insert(sid, conn);

    let agent = router.agent.clone();
    router.send_to_conn(
        conn,
        Message::Welcome(sid, WelcomeDetails::new_with_agent(RouterRoles::basic(), &agent)),
    );
}

pub fn handle_goodbye(router: &mut Router, conn: ConnId) {
    if !router.sessions.contains_key(&conn) {
        return;
    }
    router.close_session(conn);
    router.send_to_conn(conn, Message::Goodbye(ErrorDetails::new(), Reason::GoodbyeAndOut));
}
