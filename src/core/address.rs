// Obfuscated file pointers ("channel_offset:O...")
//
// A pointer is 8 little-endian bytes b0..b7 that decode to a 24-bit offset
// through a fixed XOR network. b2 and b4..b7 are free on the encode side, so
// many pointers map to the same offset.

use serde::{Deserialize, Serialize};

/// First offset that can no longer be addressed.
pub const MAX_OFFSET: u32 = 1 << 24;

/// The free bytes b7..b4 placed verbatim in the high half of an encoded pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMagic {
    pub b7: u8,
    pub b6: u8,
    pub b5: u8,
    pub b4: u8,
}

impl AddressMagic {
    pub const fn new(b7: u8, b6: u8, b5: u8, b4: u8) -> Self {
        Self { b7, b6, b5, b4 }
    }
}

impl Default for AddressMagic {
    /// Values the analyzer has been observed to accept.
    fn default() -> Self {
        Self::new(0, 3, 72, 97)
    }
}

/// Recovers the real file offset from an obfuscated pointer.
pub fn decode(pointer: u64) -> u32 {
    let [b0, b1, _, b3, b4, b5, b6, b7] = pointer.to_le_bytes();
    let a0 = b6 ^ b0;
    let a1 = b5 ^ b4 ^ b3;
    let a2 = b7 ^ b1;
    u32::from_le_bytes([a0, a1, a2, 0])
}

/// Obfuscates `offset`. Only the low 24 bits are encoded; callers must keep
/// offsets below [`MAX_OFFSET`].
pub fn encode(offset: u32, magic: AddressMagic) -> u64 {
    let [a0, a1, a2, _] = offset.to_le_bytes();
    let AddressMagic { b7, b6, b5, b4 } = magic;
    let mid = a1 ^ b5 ^ b4;
    u64::from_le_bytes([a0 ^ b6, a2 ^ b7, mid, mid, b4, b5, b6, b7])
}
