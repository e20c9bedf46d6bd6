//! Argument tuples crossing the capture boundary

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ReplayError;
use crate::record::serialize_or_sentinel;

/// The argument tuple of an instrumented call. Implemented for tuples of up
/// to eight serde-representable elements; positions line up with the
/// declared parameter list. Context that cannot cross a serde boundary
/// stays out of the tuple and rides in the call closure instead.
pub trait CallArgs: Sized + Send {
    /// Number of positions in this tuple
    const ARITY: usize;

    /// Serialize the selected positions; `mask[i]` false skips position
    /// `i`. Serialization failures capture a sentinel string rather than
    /// failing the call.
    fn capture(&self, mask: &[bool]) -> Vec<Option<Value>>;

    /// Replace every position that carries a historical override. A value
    /// that no longer fits the live element type is an error.
    fn overlay(self, overrides: &[Option<Value>], label: &str) -> Result<Self, ReplayError>;
}

impl CallArgs for () {
    const ARITY: usize = 0;

    fn capture(&self, _mask: &[bool]) -> Vec<Option<Value>> {
        Vec::new()
    }

    fn overlay(self, _overrides: &[Option<Value>], _label: &str) -> Result<Self, ReplayError> {
        Ok(self)
    }
}

macro_rules! impl_call_args {
    ($arity:literal, $($T:ident : $idx:tt),+) => {
        impl<$($T,)+> CallArgs for ($($T,)+)
        where
            $($T: Serialize + DeserializeOwned + Send,)+
        {
            const ARITY: usize = $arity;

            fn capture(&self, mask: &[bool]) -> Vec<Option<Value>> {
                let mut out = Vec::with_capacity($arity);
                $(
                    out.push(if mask.get($idx).copied().unwrap_or(true) {
                        Some(serialize_or_sentinel(
                            &self.$idx,
                            concat!("argument ", stringify!($idx)),
                        ))
                    } else {
                        None
                    });
                )+
                out
            }

            fn overlay(
                mut self,
                overrides: &[Option<Value>],
                label: &str,
            ) -> Result<Self, ReplayError> {
                $(
                    if let Some(Some(value)) = overrides.get($idx) {
                        self.$idx = serde_json::from_value::<$T>(value.clone()).map_err(|e| {
                            ReplayError::ArgumentMismatch {
                                label: label.to_string(),
                                index: $idx,
                                message: e.to_string(),
                            }
                        })?;
                    }
                )+
                Ok(self)
            }
        }
    };
}

impl_call_args!(1, A0: 0);
impl_call_args!(2, A0: 0, A1: 1);
impl_call_args!(3, A0: 0, A1: 1, A2: 2);
impl_call_args!(4, A0: 0, A1: 1, A2: 2, A3: 3);
impl_call_args!(5, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
impl_call_args!(6, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);
impl_call_args!(7, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6);
impl_call_args!(8, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_respects_mask() {
        let args = (1u32, "secret".to_string(), true);
        let captured = args.capture(&[true, false, true]);
        assert_eq!(captured[0], Some(json!(1)));
        assert_eq!(captured[1], None);
        assert_eq!(captured[2], Some(json!(true)));
    }

    #[test]
    fn test_overlay_replaces_only_present_positions() {
        let args = (1u32, "live".to_string());
        let overlaid = args
            .overlay(&[Some(json!(42)), None], "Svc.compute")
            .unwrap();
        assert_eq!(overlaid, (42u32, "live".to_string()));
    }

    #[test]
    fn test_overlay_type_mismatch_reports_position() {
        let args = (1u32,);
        let err = args
            .overlay(&[Some(json!("not a number"))], "Svc.compute")
            .unwrap_err();
        match err {
            ReplayError::ArgumentMismatch { label, index, .. } => {
                assert_eq!(label, "Svc.compute");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unit_args_are_inert() {
        assert_eq!(<() as CallArgs>::ARITY, 0);
        assert!(().capture(&[]).is_empty());
        assert!(().overlay(&[], "Svc.ping").is_ok());
    }
}
