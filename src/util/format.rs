//! Number formatting and rounding.

/// Round half away from zero to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Format a cost in USD with thousands separators.
#[must_use]
pub fn format_cost(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Format a count with thousands separators.
#[must_use]
pub fn format_count(value: usize) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_places() {
        assert!((round_to(1.23456, 4) - 1.2346).abs() < 1e-12);
        assert!((round_to(2.5, 0) - 3.0).abs() < 1e-12);
        assert!((round_to(100.0 + 200.0, 2) - 300.0).abs() < 1e-12);
    }

    #[test]
    fn format_cost_groups_thousands() {
        assert_eq!(format_cost(1234567.891), "$1,234,567.89");
        assert_eq!(format_cost(0.5), "$0.50");
        assert_eq!(format_cost(-12.0), "-$12.00");
    }

    #[test]
    fn format_count_small_and_large() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
    }
}
