//! Per-type registration of instrumented methods
//!
//! Registration is explicit: each service type lists the methods it
//! instruments and their capture modes up front, and call sites fetch the
//! spec by method name. Labels take the form `TypeName.method`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::intercept::spec::{CallSpec, CaptureMode, short_type_name};

/// The instrumented methods of one service type
#[derive(Debug, Clone)]
pub struct Instrumentor {
    type_name: String,
    methods: HashMap<String, Arc<CallSpec>>,
}

impl Instrumentor {
    /// Start registration for `T`, deriving the label prefix from its type
    /// name
    pub fn of<T: ?Sized>() -> InstrumentorBuilder {
        InstrumentorBuilder::new(short_type_name::<T>())
    }

    /// Start registration under an explicit label prefix
    pub fn named(type_name: impl Into<String>) -> InstrumentorBuilder {
        InstrumentorBuilder::new(type_name)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Spec for a registered method
    pub fn spec(&self, method: &str) -> Option<Arc<CallSpec>> {
        self.methods.get(method).cloned()
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

pub struct InstrumentorBuilder {
    type_name: String,
    methods: HashMap<String, Arc<CallSpec>>,
}

impl InstrumentorBuilder {
    fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: HashMap::new(),
        }
    }

    /// Register a method; `configure` receives a spec already labeled
    /// `TypeName.method` with trace-everything defaults
    pub fn method(mut self, name: &str, configure: impl FnOnce(CallSpec) -> CallSpec) -> Self {
        let spec = configure(CallSpec::new(format!("{}.{}", self.type_name, name)));
        self.methods.insert(name.to_string(), Arc::new(spec));
        self
    }

    /// Register a method with default capture (every position traced, no
    /// replay eligibility)
    pub fn traced_method(self, name: &str) -> Self {
        self.method(name, |spec| spec)
    }

    pub fn build(self) -> Instrumentor {
        Instrumentor {
            type_name: self.type_name,
            methods: self.methods,
        }
    }
}

/// Convenience for a one-off replayable method spec: every declared
/// parameter and the return value in replay-eligible mode
pub fn replayable_method<T: ?Sized>(method: &str, params: &[&str]) -> CallSpec {
    let mut spec = CallSpec::for_method::<T>(method).returns(CaptureMode::TraceAndReplay);
    for name in params {
        spec = spec.param(*name, CaptureMode::TraceAndReplay);
    }
    spec
}
