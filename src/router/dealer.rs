//! C7: dealer role — `REGISTER`/`UNREGISTER`/`YIELD`/invocation-`ERROR`
//! (spec §4.3). `CALL` itself is handled by `Router::handle_call`
//! rather than here: routing a call needs both the realm's
//! registration table and the callee session's per-session invocation
//! id generator, and `Router` is the only place that can borrow both.

use crate::id::RouterIds;
use crate::messages::{Dict, ErrorType, Message, Reason, RegisterOptions};
use crate::realm::{Outbound, Realm};
use crate::ID;

pub fn handle_register(
    realm: &mut Realm,
    ids: &mut RouterIds,
    session: ID,
    request_id: ID,
    _options: RegisterOptions,
    procedure: crate::messages::URI,
) -> Outbound {
    let message = match realm.register(ids, session, &procedure.uri) {
        Ok(regid) => Message::Registered(request_id, regid),
        Err(()) => Message::Error(
            ErrorType::Register,
            request_id,
            Dict::new(),
            Reason::ProcedureAlreadyExists,
            None,
            None,
        ),
    };
    Outbound { session, message }
}

/// Returns the reply owed to the unregistering session plus one
/// `ERROR(CALL, ..., cancelled)` per caller whose call was in flight to
/// this registration (spec §3 invariant 3).
pub fn handle_unregister(
    realm: &mut Realm,
    ids: &mut RouterIds,
    session: ID,
    request_id: ID,
    regid: ID,
) -> Vec<Outbound> {
    match realm.unregister(ids, session, regid) {
        Ok(cancelled) => {
            let mut out = vec![Outbound {
                session,
                message: Message::Unregistered(request_id),
            }];
            out.extend(cancelled.into_iter().map(|pc| Outbound {
                session: pc.caller_session,
                message: Message::Error(
                    ErrorType::Call,
                    pc.call_request_id,
                    Dict::new(),
                    Reason::Cancelled,
                    None,
                    None,
                ),
            }));
            out
        }
        Err(()) => vec![Outbound {
            session,
            message: Message::Error(
                ErrorType::Unregister,
                request_id,
                Dict::new(),
                Reason::NoSuchRegistration,
                None,
                None,
            ),
        }],
    }
}

/// `YIELD`: resolves the pending call this invocation answers and
/// returns the `RESULT` owed to the original caller, or `None` if the
/// call has already been resolved (duplicate `YIELD`, or the caller
/// vanished and the pending call was discarded).
pub fn handle_yield(
    realm: &mut Realm,
    callee_session: ID,
    invocation_request_id: ID,
    args: Option<crate::messages::List>,
    kwargs: Option<Dict>,
) -> Option<Outbound> {
    let pending = realm.take_pending_call(callee_session, invocation_request_id)?;
    Some(Outbound {
        session: pending.caller_session,
        message: Message::Result(
            pending.call_request_id,
            crate::messages::ResultDetails::new(),
            args,
            kwargs,
        ),
    })
}

/// `ERROR(INVOCATION, ...)`: the callee reporting that an invocation
/// failed. Forwarded to the caller as `ERROR(CALL, ...)`.
pub fn handle_invocation_error(
    realm: &mut Realm,
    callee_session: ID,
    invocation_request_id: ID,
    details: Dict,
    reason: Reason,
    args: Option<crate::messages::List>,
    kwargs: Option<Dict>,
) -> Option<Outbound> {
    let pending = realm.take_pending_call(callee_session, invocation_request_id)?;
    Some(Outbound {
        session: pending.caller_session,
        message: Message::Error(ErrorType::Call, pending.call_request_id, details, reason, args, kwargs),
    })
}
