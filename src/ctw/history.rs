use crate::codec::Bit;

/// Append-only bit sequence shared by the context tree. Reads walk
/// newest-to-oldest (the context-path hot path), so `from_end` is the
/// primary accessor rather than plain indexing.
#[derive(Clone, Debug, Default)]
pub struct History {
    bits: Vec<Bit>,
}

impl History {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn push(&mut self, bit: Bit) {
        self.bits.push(bit);
    }

    pub fn pop(&mut self) -> Option<Bit> {
        self.bits.pop()
    }

    /// The bit `offset` positions back from the end; `offset == 1` is the
    /// most recently appended bit. Panics if `offset` is out of range.
    pub fn from_end(&self, offset: usize) -> Bit {
        self.bits[self.bits.len() - offset]
    }

    /// Truncates the last `k` bits. Panics if `k > len()` — callers that
    /// want a silent no-op on over-truncation should drain with `pop`.
    pub fn truncate_from_end(&mut self, k: usize) {
        assert!(k <= self.bits.len(), "cannot truncate more bits than exist");
        let new_len = self.bits.len() - k;
        self.bits.truncate(new_len);
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }
}
