//! Unit Normalizer
//!
//! Humidity may arrive as a fraction in [0, 1] or as a percentage in
//! [0, 100]. Humidity-like values at or below [`FRACTION_CEILING`] are scaled
//! by 100; everything else passes through unchanged.
//!
//! The rule runs exactly once, inside acquisition, before a `Reading` exists.
//! It is not idempotent at the boundary: a genuine 1.0 % reading would become
//! 100 % if normalized again, and a 0.8 % reading arriving already as a
//! percentage is indistinguishable from a 0.8 fraction. Both are known and
//! accepted; canonical readings are never fed back through this step.

use crate::types::SensorKey;

/// Values at or below this are treated as fractions for humidity-like keys
pub const FRACTION_CEILING: f64 = 1.0;

/// Normalize one resolved numeric value for `key`
pub fn normalize(key: SensorKey, value: f64) -> f64 {
    if key.is_fraction_scaled() && value <= FRACTION_CEILING {
        value * 100.0
    } else {
        value
    }
}
