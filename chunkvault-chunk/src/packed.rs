//! Bit packing used by 1.13 chunks (block states and heightmaps).
//!
//! Entries are packed least significant bit first and may straddle two
//! longs; 1.16 later changed this, which is not handled here.

/// Bits per block state index for a palette of `len` entries (at least 4).
pub(crate) fn bits_for_palette(len: usize) -> u32 {
    let needed = usize::BITS - len.saturating_sub(1).leading_zeros();
    needed.max(4)
}

/// Number of longs holding `count` entries of `bits` each.
pub(crate) fn packed_len(count: usize, bits: u32) -> usize {
    (count * bits as usize).div_ceil(64)
}

pub(crate) fn pack(values: impl ExactSizeIterator<Item = u32>, bits: u32) -> Vec<i64> {
    let mut words = vec![0u64; packed_len(values.len(), bits)];
    for (i, value) in values.enumerate() {
        let bit = i * bits as usize;
        let index = bit / 64;
        let offset = (bit % 64) as u32;
        let value = value as u64;
        words[index] |= value << offset;
        if offset + bits > 64 {
            words[index + 1] |= value >> (64 - offset);
        }
    }
    words.into_iter().map(|w| w as i64).collect()
}

/// Unpack `count` entries; `None` if `words` has the wrong length.
pub(crate) fn unpack(words: &[i64], bits: u32, count: usize) -> Option<Vec<u32>> {
    if bits == 0 || bits > 32 || words.len() != packed_len(count, bits) {
        return None;
    }
    let mask = (1u64 << bits) - 1;
    let values = (0..count)
        .map(|i| {
            let bit = i * bits as usize;
            let index = bit / 64;
            let offset = (bit % 64) as u32;
            let mut value = (words[index] as u64) >> offset;
            if offset + bits > 64 {
                value |= (words[index + 1] as u64) << (64 - offset);
            }
            (value & mask) as u32
        })
        .collect();
    Some(values)
}
