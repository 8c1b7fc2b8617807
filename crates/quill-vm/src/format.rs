//! printf-style string formatting service.

use crate::coerce::{fltval, intval};
use quill_core::value::Value;
use thiserror::Error;

/// Largest output a single format call may produce.
pub const MAX_OUTPUT: usize = 64 * 1024;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("invalid conversion '%{0}' in format string")]
    UnknownConversion(char),

    #[error("incomplete conversion at end of format string")]
    Incomplete,

    #[error("formatted output exceeds {MAX_OUTPUT} bytes")]
    TooLong,
}

/// Formats a format string against argument values.
pub trait Formatter {
    fn format(&mut self, spec: &[u8], args: &[Value]) -> Result<Vec<u8>, FormatError>;
}

/// C printf subset: `%d %i %u %x %X %o %c %s %f %e %g` (and upper-case
/// float forms) with flags `- 0 + # space`, width and precision.
/// Missing arguments read as `Null`.
#[derive(Default)]
pub struct PrintfFormatter;

#[derive(Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

impl Formatter for PrintfFormatter {
    fn format(&mut self, spec: &[u8], args: &[Value]) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::new();
        let mut args = args.iter();
        let mut i = 0;
        while i < spec.len() {
            let b = spec[i];
            i += 1;
            if b != b'%' {
                out.push(b);
                continue;
            }
            if spec.get(i) == Some(&b'%') {
                out.push(b'%');
                i += 1;
                continue;
            }

            let mut s = Spec::default();
            while let Some(&f) = spec.get(i) {
                match f {
                    b'-' => s.left = true,
                    b'0' => s.zero = true,
                    b'+' => s.plus = true,
                    b' ' => s.space = true,
                    b'#' => s.alt = true,
                    _ => break,
                }
                i += 1;
            }
            s.width = read_count(spec, &mut i)?;
            if spec.get(i) == Some(&b'.') {
                i += 1;
                s.precision = Some(read_count(spec, &mut i)?);
            }
            let conv = *spec.get(i).ok_or(FormatError::Incomplete)?;
            i += 1;

            let arg = args.next().cloned().unwrap_or_default();
            render(&mut out, conv, &s, &arg)?;
            if out.len() > MAX_OUTPUT {
                return Err(FormatError::TooLong);
            }
        }
        Ok(out)
    }
}

fn read_count(spec: &[u8], i: &mut usize) -> Result<usize, FormatError> {
    let mut n: usize = 0;
    while let Some(d) = spec.get(*i).filter(|d| d.is_ascii_digit()) {
        n = n * 10 + (d - b'0') as usize;
        if n > MAX_OUTPUT {
            return Err(FormatError::TooLong);
        }
        *i += 1;
    }
    Ok(n)
}

fn render(out: &mut Vec<u8>, conv: u8, s: &Spec, arg: &Value) -> Result<(), FormatError> {
    match conv {
        b'd' | b'i' => {
            let n = intval(arg);
            let digits = int_digits(n.unsigned_abs().to_string(), s);
            let sign = sign_of(n < 0, s);
            pad_number(out, sign, "", &digits, s, s.precision.is_none());
        }
        b'u' | b'x' | b'X' | b'o' => {
            let n = intval(arg) as u64;
            let (text, prefix) = match conv {
                b'u' => (n.to_string(), ""),
                b'x' => (format!("{n:x}"), if s.alt && n != 0 { "0x" } else { "" }),
                b'X' => (format!("{n:X}"), if s.alt && n != 0 { "0X" } else { "" }),
                _ => (format!("{n:o}"), if s.alt && n != 0 { "0" } else { "" }),
            };
            let digits = int_digits(text, s);
            pad_number(out, "", prefix, &digits, s, s.precision.is_none());
        }
        b'c' => pad_text(out, &[intval(arg) as u8], s),
        b's' => {
            let mut text = arg.to_bytes();
            if let Some(p) = s.precision {
                text.truncate(p);
            }
            pad_text(out, &text, s);
        }
        b'f' | b'F' | b'e' | b'E' | b'g' | b'G' => {
            let x = fltval(arg);
            let upper = conv.is_ascii_uppercase();
            let sign = sign_of(x.is_sign_negative() && !x.is_nan(), s);
            if !x.is_finite() {
                let text = match (x.is_nan(), upper) {
                    (true, false) => "nan",
                    (true, true) => "NAN",
                    (false, false) => "inf",
                    (false, true) => "INF",
                };
                pad_number(out, sign, "", text, s, false);
                return Ok(());
            }
            let p = s.precision.unwrap_or(6);
            let body = match conv.to_ascii_lowercase() {
                b'f' => format!("{:.*}", p, x.abs()),
                b'e' => exp_form(x.abs(), p, upper),
                _ => general_form(x.abs(), p, upper, s.alt),
            };
            pad_number(out, sign, "", &body, s, true);
        }
        other => return Err(FormatError::UnknownConversion(other as char)),
    }
    Ok(())
}

fn sign_of(negative: bool, s: &Spec) -> &'static str {
    if negative {
        "-"
    } else if s.plus {
        "+"
    } else if s.space {
        " "
    } else {
        ""
    }
}

/// Apply integer precision (minimum digit count; `.0` prints zero as empty).
fn int_digits(text: String, s: &Spec) -> String {
    match s.precision {
        Some(0) if text == "0" => String::new(),
        Some(p) if text.len() < p => format!("{}{}", "0".repeat(p - text.len()), text),
        _ => text,
    }
}

fn pad_number(out: &mut Vec<u8>, sign: &str, prefix: &str, digits: &str, s: &Spec, zero_ok: bool) {
    let len = sign.len() + prefix.len() + digits.len();
    let fill = s.width.saturating_sub(len);
    if s.left {
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(digits.as_bytes());
        out.resize(out.len() + fill, b' ');
    } else if s.zero && zero_ok {
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.resize(out.len() + fill, b'0');
        out.extend_from_slice(digits.as_bytes());
    } else {
        out.resize(out.len() + fill, b' ');
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(digits.as_bytes());
    }
}

fn pad_text(out: &mut Vec<u8>, text: &[u8], s: &Spec) {
    let fill = s.width.saturating_sub(text.len());
    if s.left {
        out.extend_from_slice(text);
        out.resize(out.len() + fill, b' ');
    } else {
        out.resize(out.len() + fill, b' ');
        out.extend_from_slice(text);
    }
}

/// `d.ddde+XX` with at least two exponent digits.
fn exp_form(x: f64, precision: usize, upper: bool) -> String {
    let text = format!("{:.*e}", precision, x);
    let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

/// `%g`: fixed or exponent form by magnitude, trailing zeros removed
/// unless `#` is given.
fn general_form(x: f64, precision: usize, upper: bool, alt: bool) -> String {
    let p = precision.max(1);
    let exp = if x == 0.0 {
        0
    } else {
        let text = format!("{:.*e}", p - 1, x);
        text.split_once('e')
            .and_then(|(_, e)| e.parse::<i64>().ok())
            .unwrap_or(0)
    };
    if exp < -4 || exp >= p as i64 {
        let text = exp_form(x, p - 1, upper);
        if alt {
            return text;
        }
        match text.find(['e', 'E']) {
            Some(at) => format!("{}{}", strip_zeros(&text[..at]), &text[at..]),
            None => text,
        }
    } else {
        let decimals = (p as i64 - 1 - exp).max(0) as usize;
        let text = format!("{:.*}", decimals, x);
        if alt {
            text
        } else {
            strip_zeros(&text).to_string()
        }
    }
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
