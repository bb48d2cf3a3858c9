//! The protocol's rolling chunk checksum.

/// Checksum over a decrypted chunk payload, as carried in depot manifests.
///
/// An Adler-style pair of running sums, both reduced mod 65521, with the
/// byte sum in the low half. Unlike standard Adler-32 the byte sum starts
/// at zero.
pub fn chunk_checksum(data: &[u8]) -> u32 {
    const MOD: u32 = 65521;
    let mut low: u32 = 0;
    let mut high: u32 = 0;
    for &byte in data {
        low = (low + u32::from(byte)) % MOD;
        high = (high + low) % MOD;
    }
    low | (high << 16)
}
