//! Session record and lifecycle (spec §3 "Session").

use std::collections::HashSet;

use crate::id::MonotonicIdGenerator;
use crate::messages::ClientRole;
use crate::ID;

/// A connection's session lifecycle: *None → Establishing → Open →
/// Closing → Closed*. A connection with no session is `None`.
///
/// The router models this as presence/absence in its session table
/// rather than a stored enum: a connection not yet in the table is
/// `None`; once inserted it is `Open`; `close_session` removing it
/// covers both `Closing`→`Closed` (GOODBYE) and the disconnect path.
/// This type documents the state space the router's bookkeeping walks
/// through.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SessionState {
    None,
    Establishing,
    Open,
    Closing,
    Closed,
}

/// An open WAMP session: a global ID, the realm it is bound to, the
/// roles its peer advertised in `HELLO`, and the generator the dealer
/// uses to mint `INVOCATION` request IDs addressed to this session
/// (spec §4.8: "a fresh request ID in the callee's session scope").
#[derive(Debug)]
pub struct Session {
    pub id: ID,
    pub realm: String,
    pub roles: HashSet<ClientRole>,
    pub request_ids: MonotonicIdGenerator,
}

impl Session {
    pub fn new(id: ID, realm: String, roles: HashSet<ClientRole>) -> Session {
        Session {
            id,
            realm,
            roles,
            request_ids: MonotonicIdGenerator::new(),
        }
    }
}
