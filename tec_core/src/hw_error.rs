//! Maps `Box<dyn Error>` from the session boundary to typed `TecError`.
//!
//! The traits in `tec_traits` use `Box<dyn Error + Send + Sync>` so any
//! transport can plug in; this module converts those to our typed error
//! enum, with an optional feature-gated path for `tec_hardware::HwError`.

use crate::error::TecError;

/// Map a session-boundary error to a typed `TecError`.
///
/// Known hardware error types are downcast first, then string heuristics
/// apply. The message of untyped errors is carried through verbatim.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TecError {
    #[cfg(feature = "hardware-errors")]
    {
        use tec_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => TecError::Timeout,
                HwError::Disconnected => TecError::LinkLost(hw.to_string()),
                other => TecError::DeviceFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        TecError::Timeout
    } else if lower.contains("disconnected") || lower.contains("broken pipe") {
        TecError::LinkLost(s)
    } else {
        TecError::Device(s)
    }
}
