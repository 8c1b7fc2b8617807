//! Number parsing and canonical float formatting.
//!
//! Three parse modes are used across the runtime: exact integer parsing for
//! table key normalization, whole-string parsing for equality and truthiness,
//! and longest-prefix parsing for arithmetic coercion.

/// A parsed numeric value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }
}

/// Parse an optional sign followed by decimal digits, nothing else.
/// Overflow and any other byte (including whitespace) reject.
pub fn parse_int_exact(s: &[u8]) -> Option<i64> {
    let (neg, digits) = match s.first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let mut acc: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        let d = (b - b'0') as i64;
        acc = acc.checked_mul(10)?;
        acc = if neg {
            acc.checked_sub(d)?
        } else {
            acc.checked_add(d)?
        };
    }
    Some(acc)
}

/// Parse a whole string as a number. Leading and trailing ASCII whitespace
/// is allowed; anything else that isn't part of the number rejects.
pub fn parse_number(s: &[u8]) -> Option<Number> {
    let s = s.trim_ascii();
    if s.is_empty() {
        return None;
    }
    let (n, used) = scan_prefix(s)?;
    if used == s.len() {
        Some(n)
    } else {
        None
    }
}

/// Numeric value of the longest numeric prefix, after leading whitespace.
/// A string with no numeric prefix is `Int(0)`.
pub fn parse_prefix(s: &[u8]) -> Number {
    let s = s.trim_ascii_start();
    scan_prefix(s).map(|(n, _)| n).unwrap_or(Number::Int(0))
}

/// Scan a decimal number at the start of `s`. Returns the value and the
/// number of bytes consumed, or `None` when no digits are present.
fn scan_prefix(s: &[u8]) -> Option<(Number, usize)> {
    let mut i = 0;
    if matches!(s.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut is_float = false;

    let mut frac_digits = 0;
    if i < s.len() && s[i] == b'.' {
        let mut j = i + 1;
        while j < s.len() && s[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - i - 1;
        if int_digits > 0 || frac_digits > 0 {
            is_float = true;
            i = j;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if i < s.len() && (s[i] == b'e' || s[i] == b'E') {
        let mut j = i + 1;
        if j < s.len() && (s[j] == b'+' || s[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < s.len() && s[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            is_float = true;
            i = j;
        }
    }

    let text = std::str::from_utf8(&s[..i]).ok()?;
    if !is_float {
        if let Some(n) = parse_int_exact(&s[..i]) {
            return Some((Number::Int(n), i));
        }
    }
    // Digits-only text that overflowed i64 lands here too.
    text.parse::<f64>().ok().map(|f| (Number::Float(f), i))
}

/// Shortest round-trip text for a float. Integral values print without a
/// fraction; very large or very small magnitudes use exponent notation.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = f.abs();
    if abs >= 1e16 || (abs != 0.0 && abs < 1e-4) {
        format!("{:e}", f)
    } else {
        format!("{}", f)
    }
}
