//! Reserved IPv4 blocks
//!
//! Addresses in these blocks are never geolocated; they resolve to the
//! canonical "Reserved" record without touching the dataset.
//! See <https://en.wikipedia.org/wiki/Reserved_IP_addresses>.

/// (network, prefix length)
const RESERVED_BLOCKS: &[(u32, u32)] = &[
    (ipv4(0, 0, 0, 0), 8),
    (ipv4(10, 0, 0, 0), 8),
    (ipv4(100, 64, 0, 0), 10),
    (ipv4(127, 0, 0, 0), 8),
    (ipv4(169, 254, 0, 0), 16),
    (ipv4(172, 16, 0, 0), 12),
    (ipv4(192, 0, 0, 0), 29),
    (ipv4(192, 0, 2, 0), 24),
    (ipv4(192, 88, 99, 0), 24),
    (ipv4(192, 168, 0, 0), 16),
    (ipv4(198, 18, 0, 0), 15),
    (ipv4(198, 51, 100, 0), 24),
    (ipv4(203, 0, 113, 0), 24),
    (ipv4(224, 0, 0, 0), 4),
    (ipv4(240, 0, 0, 0), 4),
    (ipv4(255, 255, 255, 255), 32),
];

const fn ipv4(a: u8, b: u8, c: u8, d: u8) -> u32 {
    u32::from_be_bytes([a, b, c, d])
}

#[inline]
fn prefix_mask(prefix_len: u32) -> u32 {
    u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0)
}

/// Whether `key` falls inside any reserved block.
pub fn is_reserved(key: u32) -> bool {
    RESERVED_BLOCKS.iter().any(|&(network, prefix_len)| {
        let mask = prefix_mask(prefix_len);
        key & mask == network & mask
    })
}
