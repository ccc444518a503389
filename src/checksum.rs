//! The 16-bit Internet checksum (one's complement sum with end-around carry).

/// Checksum over big-endian 16-bit words. An odd-length input is padded with
/// one zero byte before summing.
pub fn ones_complement(data: &[u8]) -> u16 {
    let mut sum = 0u32;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
