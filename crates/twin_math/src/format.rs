// Locale-free number formatting for USDA output.
//
// Float Display is always '.'-separated and prints the shortest
// representation that parses back to the same value. Integral values print
// without a fraction ("1", not "1.0").

/// Format an `f32` for USDA output.
///
/// Negative zero and non-finite values print as `0`.
pub fn format_real(value: f32) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// Format an `f64` for USDA output (stage time codes, matrices read as double).
pub fn format_real_f64(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// Format components as a parenthesized tuple: `(1, 0.5, 0)`.
pub fn format_tuple(components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|&c| format_real(c)).collect();
    format!("({})", parts.join(", "))
}
