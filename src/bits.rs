//! Arbitrary-length bit sequences backed by packed bytes.
//!
//! Bits are addressed in MSB-first order: bit 0 is the high bit of the first
//! byte. Numeric conversion is big-endian; this is the single byte order used
//! everywhere in the crate.

use crate::errors::BitsError;

/// An owned, growable sequence of bits.
///
/// Storage invariant: bits beyond `len` in the final byte are always zero, so
/// structural equality and hashing work on the packed representation.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bits {
    data: Vec<u8>,
    len: usize,
}

impl Bits {
    /// An empty sequence.
    pub fn new() -> Self {
        Bits::default()
    }

    /// `n` zero bits.
    pub fn zeros(n: usize) -> Self {
        Bits {
            data: vec![0u8; n.div_ceil(8)],
            len: n,
        }
    }

    /// `n` copies of `bit`.
    pub fn repeat(bit: bool, n: usize) -> Self {
        let mut out = Bits::zeros(n);
        if bit {
            for i in 0..n {
                out.set(i, true);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<bool> {
        if i >= self.len {
            return None;
        }
        Some(self.data[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Sets bit `i`. Panics if `i` is out of bounds; all growth goes through
    /// [Bits::push] or [Bits::extend].
    pub fn set(&mut self, i: usize, bit: bool) {
        assert!(i < self.len, "bit index {i} out of bounds for length {}", self.len);
        let mask = 0x80 >> (i % 8);
        if bit {
            self.data[i / 8] |= mask;
        } else {
            self.data[i / 8] &= !mask;
        }
    }

    /// Appends a single bit.
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        self.len += 1;
        if bit {
            self.set(self.len - 1, true);
        }
    }

    /// Copies the bits `[start, end)` into a new sequence.
    pub fn slice(&self, start: usize, end: usize) -> Result<Bits, BitsError> {
        if start > end || end > self.len {
            return Err(BitsError::OutOfBounds {
                start,
                end,
                len: self.len,
            });
        }
        let mut out = Bits::zeros(end - start);
        for i in start..end {
            if self.data[i / 8] & (0x80 >> (i % 8)) != 0 {
                out.set(i - start, true);
            }
        }
        Ok(out)
    }

    /// Appends all bits of `other`.
    pub fn extend(&mut self, other: &Bits) {
        for i in 0..other.len {
            self.push(other.get(i).unwrap_or(false));
        }
    }

    /// `self` followed by `other`, as a new sequence.
    pub fn concat(&self, other: &Bits) -> Bits {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    /// Overwrites `other.len()` bits in place starting at `offset`.
    ///
    /// This is the write path for field mutation: the sequence keeps its
    /// length, only the addressed span changes.
    pub fn splice(&mut self, offset: usize, other: &Bits) -> Result<(), BitsError> {
        let end = offset + other.len;
        if end > self.len {
            return Err(BitsError::OutOfBounds {
                start: offset,
                end,
                len: self.len,
            });
        }
        for i in 0..other.len {
            self.set(offset + i, other.get(i).unwrap_or(false));
        }
        Ok(())
    }

    /// Builds a sequence of `bytes.len() * 8` bits.
    pub fn from_bytes(bytes: &[u8]) -> Bits {
        Bits {
            data: bytes.to_vec(),
            len: bytes.len() * 8,
        }
    }

    /// Packs the bits into bytes, right-padding with zero bits to the next
    /// byte boundary. This is the one byte-boundary policy of the crate.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// The low `width` bits of `value`, MSB first.
    pub fn from_int(value: u64, width: usize) -> Result<Bits, BitsError> {
        if width > 64 {
            return Err(BitsError::TooManyBits(width));
        }
        if width < 64 && value >> width != 0 {
            return Err(BitsError::Overflow { value, width });
        }
        let mut out = Bits::zeros(width);
        for i in 0..width {
            if value >> (width - 1 - i) & 1 != 0 {
                out.set(i, true);
            }
        }
        Ok(out)
    }

    /// Big-endian unsigned interpretation of the whole sequence.
    pub fn to_uint(&self) -> Result<u64, BitsError> {
        if self.len > 64 {
            return Err(BitsError::TooManyBits(self.len));
        }
        let mut value = 0u64;
        for i in 0..self.len {
            value = value << 1 | self.get(i).unwrap_or(false) as u64;
        }
        Ok(value)
    }

    /// Prepends zero bits to reach length `n`. No-op if already at least `n`.
    pub fn pad_left(&self, n: usize) -> Bits {
        if self.len >= n {
            return self.clone();
        }
        Bits::zeros(n - self.len).concat(self)
    }

    /// Appends zero bits to reach length `n`. No-op if already at least `n`.
    pub fn pad_right(&self, n: usize) -> Bits {
        let mut out = self.clone();
        while out.len < n {
            out.push(false);
        }
        out
    }

    /// Lowercase hex of [Bits::to_bytes].
    pub fn hex(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Debug for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bits<{},{}>", self.hex(), self.len)
    }
}
