//! Call interception: specs, argument capture, replay-aware invocation

mod args;
mod interceptor;
mod registry;
mod spec;
mod vars;

pub use args::CallArgs;
pub use registry::{Instrumentor, InstrumentorBuilder, replayable_method};
pub use spec::{CallSpec, CaptureMode, ParamSpec};
pub use vars::capture_var;
