//! 4-bit arrays (block data, light), low nibble first.

#[inline]
pub(crate) fn get(array: &[u8], index: usize) -> u8 {
    let byte = array[index >> 1];
    if index & 1 == 0 { byte & 0x0F } else { byte >> 4 }
}

#[inline]
pub(crate) fn set(array: &mut [u8], index: usize, value: u8) {
    let byte = &mut array[index >> 1];
    if index & 1 == 0 {
        *byte = (*byte & 0xF0) | (value & 0x0F);
    } else {
        *byte = (*byte & 0x0F) | (value << 4);
    }
}
