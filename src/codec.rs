//! Pure bit-vector codec: turns nonnegative integers into fixed-width,
//! little-endian-within-field bit sequences and back. The agent serializes
//! actions and percepts through these two functions only; nothing else in
//! the crate reasons about integer-to-bit layout.

use thiserror::Error;

/// A single binary symbol. The design is explicitly binary (see crate docs);
/// generalizing to larger alphabets would require a different KT estimator.
pub type Bit = u8;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CodecError {
    #[error("value {value} does not fit in {width} bits")]
    ValueOutOfRange { value: u64, width: u32 },
    #[error("need at least {width} bits to decode, only {available} available")]
    InsufficientBits { width: u32, available: usize },
}

/// Encode `value` as `width` bits, low-order bit first.
pub fn encode(value: u64, width: u32) -> Result<Vec<Bit>, CodecError> {
    if width < 64 && value >= (1u64 << width) {
        return Err(CodecError::ValueOutOfRange { value, width });
    }
    Ok((0..width).map(|i| ((value >> i) & 1) as Bit).collect())
}

/// Decode the last `width` bits of `bits`, the last bit being most significant.
pub fn decode(bits: &[Bit], width: u32) -> Result<u64, CodecError> {
    if (bits.len() as u64) < width as u64 {
        return Err(CodecError::InsufficientBits {
            width,
            available: bits.len(),
        });
    }
    let start = bits.len() - width as usize;
    let mut value = 0u64;
    for (i, &b) in bits[start..].iter().enumerate() {
        value |= (b as u64) << i;
    }
    Ok(value)
}

/// Smallest bit width able to represent every value in `0..=maximum`.
pub fn bits_for_maximum(maximum: u64) -> u32 {
    u64::BITS - maximum.leading_zeros().min(u64::BITS - 1)
}
