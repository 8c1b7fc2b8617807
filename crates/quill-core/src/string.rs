/// Script string type: owned bytes with a lazily computed, memoized hash.
///
/// Strings are not interned. Two `Str`s with the same content are distinct
/// objects that compare equal; the hash is computed on first use and cached
/// for the lifetime of the object.
use std::borrow::Cow;
use std::cell::OnceCell;
use std::fmt;

/// djb2 string hash, xor variant (`h = h * 33 ^ c`).
pub fn djb2(bytes: &[u8]) -> u32 {
    let mut h: u32 = 5381;
    for &b in bytes {
        h = (h << 5).wrapping_add(h) ^ b as u32;
    }
    h
}

/// An immutable byte string with a memoized hash.
pub struct Str {
    bytes: Box<[u8]>,
    hash: OnceCell<u32>,
}

impl Str {
    /// Create a string owning `bytes`.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Str {
            bytes: bytes.into(),
            hash: OnceCell::new(),
        }
    }

    /// Get the bytes of this string.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The string's hash, computed on first call.
    pub fn hash_code(&self) -> u32 {
        *self.hash.get_or_init(|| djb2(&self.bytes))
    }

    /// Returns true once the hash has been computed.
    pub fn has_hash(&self) -> bool {
        self.hash.get().is_some()
    }

    /// Content equality. Hashes are only compared when both are already
    /// known, as a fast reject; the bytes always decide.
    pub fn content_eq(&self, other: &Str) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        if let (Some(a), Some(b)) = (self.hash.get(), other.hash.get()) {
            if a != b {
                return false;
            }
        }
        self.bytes == other.bytes
    }

    /// View as UTF-8, replacing invalid sequences.
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for Str {}

impl Clone for Str {
    fn clone(&self) -> Self {
        Str {
            bytes: self.bytes.clone(),
            hash: self.hash.clone(),
        }
    }
}

impl From<&str> for Str {
    fn from(s: &str) -> Self {
        Str::new(s.as_bytes())
    }
}

impl From<String> for Str {
    fn from(s: String) -> Self {
        Str::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for Str {
    fn from(bytes: Vec<u8>) -> Self {
        Str::new(bytes)
    }
}

impl From<&[u8]> for Str {
    fn from(bytes: &[u8]) -> Self {
        Str::new(bytes)
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(s) = std::str::from_utf8(&self.bytes) {
            write!(f, "\"{}\"", s)
        } else {
            write!(f, "<binary string len={}>", self.len())
        }
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}
