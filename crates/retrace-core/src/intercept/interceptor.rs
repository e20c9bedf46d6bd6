//! The interception pipeline around instrumented calls

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::ReplayError;
use crate::intercept::args::CallArgs;
use crate::intercept::spec::CallSpec;
use crate::intercept::vars::CallFrame;
use crate::record::{CallRecord, now_millis, serialize_or_sentinel};
use crate::replay::argument_overrides;
use crate::session;

impl CallSpec {
    /// Run `call` under this spec: resolve replay overrides, execute,
    /// capture, emit one record to the active session, and hand back the
    /// caller-visible result. Without an active session the call runs
    /// untouched and nothing is recorded.
    ///
    /// Replay changes what the caller observes in exactly two places.
    /// Argument positions marked replayable are substituted before the
    /// call body runs, and a successful return value is swapped for the
    /// historical one when return override is enabled. A historical value
    /// that no longer fits the live types aborts with a [`ReplayError`]
    /// converted into the caller's error type; errors from the call body
    /// itself are recorded and re-raised as-is.
    #[instrument(level = "debug", skip_all, fields(tag = %self.label()))]
    pub async fn invoke<A, T, E, F, Fut>(&self, args: A, call: F) -> Result<T, E>
    where
        A: CallArgs,
        T: Serialize + DeserializeOwned,
        E: std::fmt::Display + From<ReplayError>,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(current) = session::current() else {
            debug!("call outside any session; running uninstrumented");
            return call(args).await;
        };

        let started = now_millis();
        // bound at call start so emission survives the session ending
        // while this call is still running
        let sink = current.bind_sink();
        let ticket = current.replay().peek(self.label());

        let mut replay_applied = false;
        let args = match &ticket {
            Some(ticket) => {
                let overrides = argument_overrides(ticket.record(), self.params());
                if overrides.iter().any(Option::is_some) {
                    match args.overlay(&overrides, self.label()) {
                        Ok(overlaid) => {
                            replay_applied = true;
                            overlaid
                        }
                        Err(e) => {
                            warn!(error = %e, "argument substitution failed; call aborted");
                            return Err(E::from(e));
                        }
                    }
                } else {
                    args
                }
            }
            None => args,
        };

        // capture sees post-substitution values
        let mask: Vec<bool> = (0..A::ARITY).map(|i| self.param_mode(i).captures()).collect();
        let mut record =
            CallRecord::new(self.label()).with_context(current.project(), current.name());
        record.timestamp = started;
        for (index, value) in args.capture(&mask).into_iter().enumerate() {
            if let Some(value) = value {
                record = record.with_arg(self.param_key(index), value);
            }
        }

        let frame = CallFrame::new();
        let result = frame.scope(call(args)).await;
        let ended = now_millis();

        let vars = frame.take();
        if !vars.is_empty() {
            record.payload.vars = Some(vars);
        }
        record.payload.end = Some(ended);
        record.payload.duration_ms = Some((ended - started).max(0) as u64);
        match &result {
            Ok(value) => {
                if self.return_mode().captures() {
                    record.payload.return_value =
                        Some(serialize_or_sentinel(value, "return value"));
                }
            }
            Err(e) => {
                record.payload.error = Some(e.to_string());
            }
        }

        let mut override_value: Option<T> = None;
        let mut substitution_failure: Option<ReplayError> = None;
        if let Some(ticket) = ticket {
            let historical = ticket.consume();
            if let Some(historical_vars) = &historical.payload.vars {
                if !historical_vars.is_empty() {
                    // historical vars win over live captures of the same name
                    let vars = record.payload.vars.get_or_insert_with(BTreeMap::new);
                    for (name, capture) in historical_vars {
                        vars.insert(name.clone(), capture.clone());
                    }
                    replay_applied = true;
                }
            }
            if result.is_ok() && self.return_mode().replays() && self.return_override() {
                if let Some(historical_return) = &historical.payload.return_value {
                    match serde_json::from_value::<T>(historical_return.clone()) {
                        Ok(value) => {
                            record.payload.return_value = Some(historical_return.clone());
                            override_value = Some(value);
                            replay_applied = true;
                        }
                        Err(e) => {
                            let failure = ReplayError::ReturnMismatch {
                                label: self.label().to_string(),
                                message: e.to_string(),
                            };
                            warn!(error = %failure, "return substitution failed");
                            substitution_failure = Some(failure);
                        }
                    }
                }
            }
        }
        if replay_applied {
            record.payload.replayed = Some(true);
        }

        current.collector().append(record.clone());
        if let Some(tx) = sink {
            if tx.send(record).is_err() {
                warn!("record channel closed; external emission skipped");
            }
        }

        if let Some(failure) = substitution_failure {
            return Err(E::from(failure));
        }
        match result {
            Ok(live) => Ok(override_value.unwrap_or(live)),
            Err(e) => Err(e),
        }
    }
}
