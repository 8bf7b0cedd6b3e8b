//! String Escaper - Bounded JSON string literals
//!
//! Text embedded in records is capped to a number of code units and escaped
//! into a fixed-capacity scratch buffer:
//!
//! - `0x00..=0x1f` and anything above `0x7e` → `\u00XX` / `\uXXXX`
//! - `\`, `/`, `"` → backslash escape
//! - everything else → verbatim
//!
//! Supplementary code points in wide text become a UTF-16 surrogate pair,
//! which is the worst case at 12 bytes per unit. The buffer never grows;
//! running out of room is an error rather than a truncated escape.

use crate::error::{DumpError, Result};
use crate::object::TextUnits;

/// Worst-case escaped bytes for one input unit (`\uXXXX\uXXXX`)
pub const MAX_ESCAPE_BYTES_PER_UNIT: usize = 12;

/// Buffer capacity that always fits `units` escaped units plus quotes
///
/// Saturates at `usize::MAX`, which no buffer can satisfy.
pub const fn escaped_capacity(units: usize) -> usize {
    units.saturating_mul(MAX_ESCAPE_BYTES_PER_UNIT).saturating_add(2)
}

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Fixed-capacity scratch buffer for escaped literals
///
/// # Example
///
/// ```rust
/// use heapgraph::escape::EscapeBuffer;
///
/// let mut buf = EscapeBuffer::with_capacity(64);
/// let out = buf.escape_bytes(br#"a/b"c"#, 100).unwrap();
/// assert_eq!(out, br#""a\/b\"c""#);
/// ```
#[derive(Debug)]
pub struct EscapeBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl EscapeBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Escape an 8-bit string, keeping at most `max_len` bytes of input
    pub fn escape_bytes(&mut self, input: &[u8], max_len: usize) -> Result<&[u8]> {
        self.buf.clear();
        self.push(b"\"")?;
        for &c in &input[..input.len().min(max_len)] {
            self.push_narrow(c)?;
        }
        self.push(b"\"")?;
        Ok(&self.buf)
    }

    /// Escape text, keeping at most `max_len` code units of input
    pub fn escape_text(&mut self, text: TextUnits<'_>, max_len: usize) -> Result<&[u8]> {
        self.buf.clear();
        self.push(b"\"")?;
        match text {
            TextUnits::Narrow(units) => {
                for &c in &units[..units.len().min(max_len)] {
                    self.push_narrow(c)?;
                }
            }
            TextUnits::Ucs2(units) => {
                for &c in &units[..units.len().min(max_len)] {
                    self.push_wide(u32::from(c))?;
                }
            }
            TextUnits::Ucs4(units) => {
                for &c in &units[..units.len().min(max_len)] {
                    self.push_wide(c)?;
                }
            }
        }
        self.push(b"\"")?;
        Ok(&self.buf)
    }

    /// Escape a Rust string, keeping at most `max_len` characters
    ///
    /// Used for type, module and code names reported by the object model.
    pub fn escape_str(&mut self, input: &str, max_len: usize) -> Result<&[u8]> {
        self.buf.clear();
        self.push(b"\"")?;
        for c in input.chars().take(max_len) {
            self.push_wide(u32::from(c))?;
        }
        self.push(b"\"")?;
        Ok(&self.buf)
    }

    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let needed = self.buf.len() + bytes.len();
        if needed > self.capacity {
            return Err(DumpError::EscapeOverflow {
                needed,
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn push_narrow(&mut self, c: u8) -> Result<()> {
        if c <= 0x1f || c > 0x7e {
            self.push(&[
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[(c >> 4) as usize],
                HEX[(c & 0xf) as usize],
            ])
        } else if c == b'\\' || c == b'/' || c == b'"' {
            self.push(&[b'\\', c])
        } else {
            self.push(&[c])
        }
    }

    fn push_wide(&mut self, c: u32) -> Result<()> {
        if c > 0x7e || c <= 0x1f {
            if c > 0xffff {
                // Out-of-range values are not characters at all
                let c = if c > 0x10ffff { 0xfffd } else { c };
                if c > 0xffff {
                    let v = c - 0x10000;
                    self.push_unit_escape(0xd800 | (v >> 10))?;
                    return self.push_unit_escape(0xdc00 | (v & 0x3ff));
                }
                return self.push_unit_escape(c);
            }
            self.push_unit_escape(c)
        } else {
            // Printable ASCII from here on
            self.push_narrow(c as u8)
        }
    }

    fn push_unit_escape(&mut self, unit: u32) -> Result<()> {
        self.push(&[
            b'\\',
            b'u',
            HEX[((unit >> 12) & 0xf) as usize],
            HEX[((unit >> 8) & 0xf) as usize],
            HEX[((unit >> 4) & 0xf) as usize],
            HEX[(unit & 0xf) as usize],
        ])
    }
}

/// Escape an 8-bit string into a new vector
pub fn escape_bytes(input: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let mut buf = EscapeBuffer::with_capacity(escaped_capacity(max_len.min(input.len())));
    buf.escape_bytes(input, max_len).map(<[u8]>::to_vec)
}

/// Escape text into a new vector
pub fn escape_text(text: TextUnits<'_>, max_len: usize) -> Result<Vec<u8>> {
    let mut buf = EscapeBuffer::with_capacity(escaped_capacity(max_len.min(text.len())));
    buf.escape_text(text, max_len).map(<[u8]>::to_vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrow(input: &[u8]) -> String {
        String::from_utf8(escape_bytes(input, 100).unwrap()).unwrap()
    }

    fn wide(input: &str) -> String {
        let units: Vec<u32> = input.chars().map(u32::from).collect();
        String::from_utf8(escape_text(TextUnits::Ucs4(&units), 100).unwrap()).unwrap()
    }

    #[test]
    fn test_empty() {
        assert_eq!(narrow(b""), r#""""#);
        assert_eq!(wide(""), r#""""#);
    }

    #[test]
    fn test_simple_strings() {
        assert_eq!(narrow(b"foo"), r#""foo""#);
        assert_eq!(narrow(b"aoeu aoeu"), r#""aoeu aoeu""#);
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(narrow(br#"\x/y""#), r#""\\x\/y\"""#);
        assert_eq!(wide(r#"\x/y""#), r#""\\x\/y\"""#);
    }

    #[test]
    fn test_control_escapes() {
        assert_eq!(narrow(b"\x00\x01\x02\x1f"), r#""\u0000\u0001\u0002\u001f""#);
        assert_eq!(narrow(b"\x7f\xff"), r#""\u007f\u00ff""#);
    }

    #[test]
    fn test_wide_escapes() {
        assert_eq!(wide("\u{12}\u{b5}\u{2030}\u{1f}"), r#""\u0012\u00b5\u2030\u001f""#);
    }

    #[test]
    fn test_supplementary_becomes_surrogate_pair() {
        assert_eq!(wide("\u{1f600}"), r#""\ud83d\ude00""#);
        let parsed: String = serde_json::from_str(&wide("a\u{1f600}b")).unwrap();
        assert_eq!(parsed, "a\u{1f600}b");
    }

    #[test]
    fn test_ucs2_units() {
        let units: Vec<u16> = "h\u{e9}".encode_utf16().collect();
        let out = escape_text(TextUnits::Ucs2(&units), 100).unwrap();
        assert_eq!(out, br#""h\u00e9""#);
    }

    #[test]
    fn test_truncates_to_max_len() {
        let long = vec![b'a'; 250];
        let out = escape_bytes(&long, 100).unwrap();
        assert_eq!(out.len(), 102);

        let units = vec![0x2030u32; 250];
        let out = escape_text(TextUnits::Ucs4(&units), 100).unwrap();
        assert_eq!(out.len(), 100 * 6 + 2);
    }

    #[test]
    fn test_output_is_valid_json() {
        let input: Vec<u8> = (0u8..=255).collect();
        let out = escape_bytes(&input, 256).unwrap();
        let parsed: String = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.chars().count(), 256);
    }

    #[test]
    fn test_escape_str_counts_chars() {
        let mut buf = EscapeBuffer::with_capacity(64);
        assert_eq!(buf.escape_str("caf\u{e9}/x", 4).unwrap(), br#""caf\u00e9""#);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut buf = EscapeBuffer::with_capacity(10);
        let err = buf.escape_bytes(&[0u8; 5], 100).unwrap_err();
        assert!(matches!(err, DumpError::EscapeOverflow { capacity: 10, .. }));
    }

    #[test]
    fn test_worst_case_fits_capacity() {
        let units = vec![0x10ffffu32; 100];
        let mut buf = EscapeBuffer::with_capacity(escaped_capacity(100));
        let out = buf.escape_text(TextUnits::Ucs4(&units), 100).unwrap();
        assert_eq!(out.len(), escaped_capacity(100));
    }

    #[test]
    fn test_capacity_saturates() {
        assert_eq!(escaped_capacity(usize::MAX), usize::MAX);
        assert_eq!(escaped_capacity(usize::MAX / 12), usize::MAX);
    }
}
