//! Mapping between the bus level range of a gear and the 0-255 range
//! used by MQTT clients.
//!
//! Level 0 is off on both sides and never goes through the linear
//! mapping.

/// Highest logical level
pub const LOGICAL_MAX: u8 = 255;
/// Lowest non-zero logical level
pub const LOGICAL_MIN: u8 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Value {value} outside range {min}..={max}")]
pub struct LevelError {
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

/// Linearly rescale `value` from `[src_min, src_max]` to
/// `[dst_min, dst_max]`, rounding halves away from zero.
///
/// A source range of a single point maps to `dst_max`.
pub fn normalize(
    value: i64,
    src_min: i64,
    src_max: i64,
    dst_min: i64,
    dst_max: i64,
) -> Result<i64, LevelError> {
    if value < src_min || value > src_max {
        return Err(LevelError {
            value,
            min: src_min,
            max: src_max,
        });
    }
    if src_max == src_min {
        return Ok(dst_max);
    }
    let scaled = (value - src_min) as f64 * (dst_max - dst_min) as f64
        / (src_max - src_min) as f64;
    Ok(dst_min + scaled.round() as i64)
}

/// Physical level to send for a logical level. `min_level..=max_level` is
/// the physical range of the gear or group.
pub fn to_physical(logical: u8, min_level: u8, max_level: u8) -> Result<u8, LevelError> {
    if logical == 0 {
        return Ok(0);
    }
    let p = normalize(
        logical as i64,
        LOGICAL_MIN as i64,
        LOGICAL_MAX as i64,
        min_level as i64,
        max_level as i64,
    )?;
    Ok(p as u8)
}

/// Logical level for a physical level read from the bus. A non-zero
/// physical level is never reported as off.
pub fn to_logical(physical: u8, min_level: u8, max_level: u8) -> Result<u8, LevelError> {
    if physical == 0 {
        return Ok(0);
    }
    let l = normalize(
        physical as i64,
        min_level as i64,
        max_level as i64,
        LOGICAL_MIN as i64,
        LOGICAL_MAX as i64,
    )?;
    Ok(l.max(LOGICAL_MIN as i64) as u8)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_test() {
        assert_eq!(normalize(0, 0, 10, 0, 100), Ok(0));
        assert_eq!(normalize(5, 0, 10, 0, 100), Ok(50));
        assert_eq!(normalize(10, 0, 10, 0, 100), Ok(100));
        // Halves round away from zero
        assert_eq!(normalize(1, 0, 2, 0, 1), Ok(1));
        assert_eq!(normalize(1, 0, 2, 0, -1), Ok(-1));
        assert_eq!(normalize(4, 4, 4, 1, 254), Ok(254));
        assert!(normalize(11, 0, 10, 0, 100).is_err());
        assert!(normalize(-1, 0, 10, 0, 100).is_err());
    }

    #[test]
    fn monotonic_test() {
        let mut last = 0;
        for v in 1..=255u8 {
            let p = to_physical(v, 85, 254).unwrap();
            assert!(p >= last);
            assert!((85..=254).contains(&p));
            last = p;
        }
    }

    #[test]
    fn identity_test() {
        for v in 0..=100 {
            assert_eq!(normalize(v, 0, 100, 0, 100), Ok(v));
        }
    }

    #[test]
    fn round_trip_test() {
        for (min, max) in [(1, 254), (85, 254), (1, 100), (170, 200)] {
            for p in min..=max {
                let l = to_logical(p, min, max).unwrap();
                let back = to_physical(l, min, max).unwrap();
                assert!((back as i16 - p as i16).abs() <= 1, "{} -> {} -> {}", p, l, back);
            }
        }
    }

    #[test]
    fn zero_bypass_test() {
        assert_eq!(to_physical(0, 85, 254), Ok(0));
        assert_eq!(to_logical(0, 85, 254), Ok(0));
        assert_eq!(to_physical(1, 85, 254), Ok(85));
        assert_eq!(to_physical(255, 85, 254), Ok(254));
        assert_eq!(to_logical(85, 85, 254), Ok(1));
        assert!(to_logical(10, 85, 254).is_err());
    }
}
