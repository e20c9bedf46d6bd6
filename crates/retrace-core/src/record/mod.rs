//! Normalized call-record model

mod entry;

pub use entry::{
    CallPayload, CallRecord, VarCapture, alias_of, now_millis, serialize_or_sentinel,
};
