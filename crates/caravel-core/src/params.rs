use crate::address::Address;
use crate::hash::sha256;

/// Immutable per-vault configuration. Never stored on the ledger; only
/// its [`commitment`](SpvVaultParameters::commitment) is, and callers
/// re-supply the struct by value on every operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpvVaultParameters {
    pub btc_relay: Address,
    pub token0: Address,
    pub token1: Address,
    /// Raw BTC-denominated units times this multiplier yield
    /// settlement-chain token units.
    pub token0_multiplier: u128,
    pub token1_multiplier: u128,
    /// Minimum Bitcoin confirmations before a claim is honored.
    pub confirmations: u32,
}

impl SpvVaultParameters {
    /// Canonical structural hash, the vault's parameters commitment.
    pub fn commitment(&self) -> [u8; 32] {
        let mut buf = [0u8; 20 + 20 + 20 + 16 + 16 + 4];
        buf[0..20].copy_from_slice(self.btc_relay.as_bytes());
        buf[20..40].copy_from_slice(self.token0.as_bytes());
        buf[40..60].copy_from_slice(self.token1.as_bytes());
        buf[60..76].copy_from_slice(&self.token0_multiplier.to_be_bytes());
        buf[76..92].copy_from_slice(&self.token1_multiplier.to_be_bytes());
        buf[92..96].copy_from_slice(&self.confirmations.to_be_bytes());
        sha256(&buf)
    }

    pub fn from_raw_token0(&self, raw: u64) -> Option<u128> {
        (raw as u128).checked_mul(self.token0_multiplier)
    }

    pub fn from_raw_token1(&self, raw: u64) -> Option<u128> {
        (raw as u128).checked_mul(self.token1_multiplier)
    }
}
