/// Reverses a 32-byte hash between Bitcoin's internal (little-endian)
/// order and the display/relay (big-endian) order.
pub fn reverse32(h: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = h[31 - i];
    }
    out
}

pub fn read_u64_be(b: &[u8]) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[..8]);
    u64::from_be_bytes(a)
}
