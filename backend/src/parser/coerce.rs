//! Numeric coercion for count cells.
//!
//! Count cells are free text: `"1,234"`, `" 42 "`, `""`, `"-"`, `"n.a."`.
//! None of those may abort a parse, so every cell coerces to an integer and
//! anything unusable becomes 0.

/// Coerce a raw cell to an integer count.
///
/// Commas are stripped first, surrounding whitespace is ignored, then the
/// longest leading base-10 integer (with optional sign) is taken. Trailing
/// text after the digits is ignored, so `"12.7"` reads as 12. Absent cells,
/// cells without leading digits and values outside `i64` read as 0.
pub fn safe_parse(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return 0;
    };

    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();

    let (negative, digits) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }

    match digits[..end].parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) => 0,
    }
}
