//! Ambient variable capture inside instrumented calls

use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::record::{VarCapture, serialize_or_sentinel};

tokio::task_local! {
    static CALL_FRAME: CallFrame;
}

/// Mutable var table of the innermost instrumented call
#[derive(Clone, Default)]
pub(crate) struct CallFrame {
    vars: Arc<Mutex<BTreeMap<String, VarCapture>>>,
}

impl CallFrame {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn set(&self, name: &str, capture: VarCapture) {
        self.vars.lock().insert(name.to_string(), capture);
    }

    pub(crate) fn take(&self) -> BTreeMap<String, VarCapture> {
        std::mem::take(&mut *self.vars.lock())
    }

    /// Run `fut` with this frame receiving [`capture_var`] writes
    pub(crate) async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        CALL_FRAME.scope(self.clone(), fut).await
    }
}

/// Capture a named value into the record of the innermost instrumented
/// call, tagged with the `file:line` of the capture site. The last write
/// per name wins. Outside any instrumented call this is a no-op.
#[track_caller]
pub fn capture_var<T: Serialize>(name: &str, value: &T) {
    let location = Location::caller();
    let capture = VarCapture {
        value: serialize_or_sentinel(value, name),
        at: format!("{}:{}", location.file(), location.line()),
    };
    if CALL_FRAME.try_with(|frame| frame.set(name, capture)).is_err() {
        debug!(name, "capture_var outside any instrumented call; ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_lands_in_innermost_frame() {
        let outer = CallFrame::new();
        let inner = CallFrame::new();
        outer
            .scope(async {
                capture_var("outer_only", &1);
                inner
                    .scope(async {
                        capture_var("inner_only", &2);
                    })
                    .await;
            })
            .await;

        let outer_vars = outer.take();
        assert!(outer_vars.contains_key("outer_only"));
        assert!(!outer_vars.contains_key("inner_only"));
        assert!(inner.take().contains_key("inner_only"));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let frame = CallFrame::new();
        frame
            .scope(async {
                capture_var("attempt", &"first");
                capture_var("attempt", &"second");
            })
            .await;

        let vars = frame.take();
        assert_eq!(vars["attempt"].value, serde_json::json!("second"));
        assert!(vars["attempt"].at.contains("vars.rs"));
    }

    #[test]
    fn test_no_frame_is_a_noop() {
        capture_var("nowhere", &42);
    }
}
