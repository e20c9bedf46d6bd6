//! Instrumentation specs: what gets captured and what may be replayed
//!
//! A [`CallSpec`] describes one instrumented operation: its logical label,
//! a capture mode per parameter, and a capture mode for the return value.
//! Parameter names are declared here, never recovered from source text; an
//! undeclared name falls back to the positional key `arg{index}`.

use serde::{Deserialize, Serialize};

/// How one parameter or the return value participates in capture/replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Not captured, not replayable
    Off,
    /// Captured into the record; never overrides execution
    #[default]
    Trace,
    /// Captured; eligible to override the live value when replay is active
    /// (pre-call for arguments, post-call for the return value)
    TraceAndReplay,
}

impl CaptureMode {
    /// Whether values in this mode are written into the record
    pub fn captures(self) -> bool {
        !matches!(self, CaptureMode::Off)
    }

    /// Whether values in this mode may be substituted from history
    pub fn replays(self) -> bool {
        matches!(self, CaptureMode::TraceAndReplay)
    }
}

/// Spec for a single parameter position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Declared parameter name; `None` uses the positional fallback key
    pub name: Option<String>,
    /// Capture mode for this position
    pub mode: CaptureMode,
}

impl ParamSpec {
    /// A named parameter
    pub fn named(name: impl Into<String>, mode: CaptureMode) -> Self {
        Self {
            name: Some(name.into()),
            mode,
        }
    }

    /// An unnamed parameter, captured under `arg{index}`
    pub fn positional(mode: CaptureMode) -> Self {
        Self { name: None, mode }
    }

    /// The capture key for this parameter at the given position
    pub fn key(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("arg{}", index),
        }
    }
}

/// Spec for one instrumented operation
#[derive(Debug, Clone)]
pub struct CallSpec {
    label: String,
    params: Vec<ParamSpec>,
    return_mode: CaptureMode,
    return_override: bool,
}

impl CallSpec {
    /// Create a spec with the given logical label. Parameters default to
    /// [`CaptureMode::Trace`] under positional keys; the return value
    /// defaults to [`CaptureMode::Trace`]; return override is off.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            params: Vec::new(),
            return_mode: CaptureMode::Trace,
            return_override: false,
        }
    }

    /// Create a spec labeled `TypeName.method`, deriving the type name from
    /// `T` (generics stripped, module path dropped)
    pub fn for_method<T: ?Sized>(method: &str) -> Self {
        Self::new(format!("{}.{}", short_type_name::<T>(), method))
    }

    /// Declare the next parameter with a name
    pub fn param(mut self, name: impl Into<String>, mode: CaptureMode) -> Self {
        self.params.push(ParamSpec::named(name, mode));
        self
    }

    /// Declare the next parameter without a name (positional key)
    pub fn param_unnamed(mut self, mode: CaptureMode) -> Self {
        self.params.push(ParamSpec::positional(mode));
        self
    }

    /// Set the return-value capture mode
    pub fn returns(mut self, mode: CaptureMode) -> Self {
        self.return_mode = mode;
        self
    }

    /// Explicitly enable (or disable) substituting the live return value
    /// with a historical one. Takes effect only when the return mode is
    /// [`CaptureMode::TraceAndReplay`] and a matching historical record
    /// carries a return value.
    pub fn with_return_override(mut self, enabled: bool) -> Self {
        self.return_override = enabled;
        self
    }

    /// The logical label of this operation
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Declared parameter specs, in positional order
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Return-value capture mode
    pub fn return_mode(&self) -> CaptureMode {
        self.return_mode
    }

    /// Whether return override has been explicitly enabled
    pub fn return_override(&self) -> bool {
        self.return_override
    }

    /// Capture mode for position `index`; positions beyond the declared
    /// list default to [`CaptureMode::Trace`]
    pub(crate) fn param_mode(&self, index: usize) -> CaptureMode {
        self.params
            .get(index)
            .map(|p| p.mode)
            .unwrap_or(CaptureMode::Trace)
    }

    /// Capture key for position `index`
    pub(crate) fn param_key(&self, index: usize) -> String {
        self.params
            .get(index)
            .map(|p| p.key(index))
            .unwrap_or_else(|| format!("arg{}", index))
    }

    /// Declared name for position `index`, if any
    pub(crate) fn param_name(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(|p| p.name.as_deref())
    }
}

/// Last path segment of a type name, generics stripped
/// (`app::svc::Calculator<u32>` → `Calculator`)
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
