use serde_json::Value;

pub const MIN_RETENTION_LIMIT: usize = 5;
pub const MAX_RECOVERY_ENTRIES: usize = 120;

/// Bound a stored retention setting to `[MIN_RETENTION_LIMIT, MAX_RECOVERY_ENTRIES]`.
///
/// Anything that is not a finite JSON number keeps the maximum: losing
/// checkpoints is worse than keeping a few more than asked for.
pub fn clamp_retention_limit(raw: &Value) -> usize {
    match raw.as_f64() {
        Some(n) => clamp_retention_limit_f64(n),
        None => MAX_RECOVERY_ENTRIES,
    }
}

pub fn clamp_retention_limit_f64(raw: f64) -> usize {
    if !raw.is_finite() {
        return MAX_RECOVERY_ENTRIES;
    }
    let floored = raw.floor();
    if floored <= MIN_RETENTION_LIMIT as f64 {
        MIN_RETENTION_LIMIT
    } else if floored >= MAX_RECOVERY_ENTRIES as f64 {
        MAX_RECOVERY_ENTRIES
    } else {
        floored as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_numeric_input_keeps_the_maximum() {
        assert_eq!(clamp_retention_limit(&json!("50")), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit(&Value::Null), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit(&json!(true)), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit(&json!({"limit": 10})), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit_f64(f64::NAN), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit_f64(f64::INFINITY), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit_f64(f64::NEG_INFINITY), MAX_RECOVERY_ENTRIES);
    }

    #[test]
    fn numbers_are_floored_and_clamped() {
        assert_eq!(clamp_retention_limit(&json!(-10)), MIN_RETENTION_LIMIT);
        assert_eq!(clamp_retention_limit(&json!(0)), MIN_RETENTION_LIMIT);
        assert_eq!(clamp_retention_limit(&json!(999)), MAX_RECOVERY_ENTRIES);
        assert_eq!(clamp_retention_limit(&json!(42.9)), 42);
        assert_eq!(clamp_retention_limit(&json!(5.5)), 5);
        assert_eq!(clamp_retention_limit(&json!(u64::MAX)), MAX_RECOVERY_ENTRIES);
    }

    #[test]
    fn result_always_within_bounds() {
        for raw in [-1e300, -0.5, 4.99, 5.0, 60.0, 119.99, 120.0, 1e300] {
            let n = clamp_retention_limit_f64(raw);
            assert!((MIN_RETENTION_LIMIT..=MAX_RECOVERY_ENTRIES).contains(&n), "{raw} -> {n}");
        }
    }
}
