//! Replay of historical call records into live executions

mod matcher;

pub use matcher::{ReplayMatcher, ReplayTicket, argument_overrides};

use crate::error::{RetraceError, RetraceResult};
use crate::record::CallRecord;
use crate::session;

/// Install a replay set on the current session, replacing any previous one.
/// Fails when no session scope is active.
pub fn install_replay_set(records: Vec<CallRecord>) -> RetraceResult<()> {
    let session = session::current()
        .ok_or_else(|| RetraceError::no_active_session("install_replay_set"))?;
    session.install_replay_set(records)
}

/// Drop the current session's replay set. Subsequent calls run live.
pub fn clear_replay_set() -> RetraceResult<()> {
    let session =
        session::current().ok_or_else(|| RetraceError::no_active_session("clear_replay_set"))?;
    session.clear_replay_set();
    Ok(())
}
