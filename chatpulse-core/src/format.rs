//! Formatting helpers shared by the aggregator and the front ends.

/// Report key for a member name (e.g., "Mary-Jane Doe" → "mary_jane_doe").
pub fn member_key(name: &str) -> String {
    name.trim().replace([' ', '-'], "_").to_lowercase()
}

/// Round to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `num` as a percentage of `total`, rounded to two places. Zero when `total` is zero.
pub fn to_percentage(num: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(num as f64 / total as f64 * 100.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_key() {
        assert_eq!(member_key("Alice"), "alice");
        assert_eq!(member_key(" Mary-Jane Doe "), "mary_jane_doe");
        assert_eq!(member_key("+1 555-0100"), "+1_555_0100");
    }

    #[test]
    fn test_to_percentage() {
        assert_eq!(to_percentage(1, 3), 33.33);
        assert_eq!(to_percentage(2, 3), 66.67);
        assert_eq!(to_percentage(5, 0), 0.0);
        assert_eq!(to_percentage(0, 10), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
