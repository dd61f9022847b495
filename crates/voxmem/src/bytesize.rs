//! Parsing and formatting of human-readable byte quantities.
//!
//! Dump policy parameters are configured as strings like `"512"`, `"64K"`
//! or `"2GiB"`. Units are powers of 1024; a bare number means bytes.

/// Parses a byte quantity such as `"1024"`, `"512B"`, `"64K"` or `"2GiB"`.
///
/// Returns `None` for empty input, negative values, unknown units, or
/// quantities that overflow `u64`.
#[must_use]
pub fn parse(input: &str) -> Option<u64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let digits_end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(digits_end);
    let value: u64 = digits.parse().ok()?;

    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1u64 << 40,
        _ => return None,
    };

    value.checked_mul(factor)
}

/// Formats a byte count using the largest fitting power-of-1024 unit.
#[must_use]
pub fn format(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
