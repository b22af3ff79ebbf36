//! Fee shares smuggled through Bitcoin sequence numbers.
//!
//! Each of the first two inputs carries a 32-bit sequence split into
//! named bit ranges:
//!
//! ```text
//! bits  0..20  input 0: caller fee share     input 1: execution fee share
//! bits 20..30  input 0: fronting share high  input 1: fronting share low
//! bits 30..32  unused
//! ```
//!
//! The 20-bit fronting share is reassembled as `(high10 << 10) | low10`.
//! Shares are numerators over [`FEE_SHARE_DENOMINATOR`].

pub const FEE_SHARE_DENOMINATOR: u64 = 100_000;

pub const FEE_SHARE_BITS: u32 = 20;
pub const FEE_SHARE_MASK: u32 = (1 << FEE_SHARE_BITS) - 1;
pub const FRONTING_HALF_BITS: u32 = 10;
pub const FRONTING_HALF_MASK: u32 = (1 << FRONTING_HALF_BITS) - 1;

/// The named bit ranges of one sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceFields {
    /// Bits 0..20. Caller fee share on input 0, execution handler fee
    /// share on input 1.
    pub fee_share: u32,
    /// Bits 20..30, one half of the fronting fee share.
    pub fronting_half: u32,
}

impl SequenceFields {
    pub fn unpack(sequence: u32) -> Self {
        Self {
            fee_share: sequence & FEE_SHARE_MASK,
            fronting_half: (sequence >> FEE_SHARE_BITS) & FRONTING_HALF_MASK,
        }
    }

    pub fn pack(&self) -> u32 {
        debug_assert!(self.fee_share <= FEE_SHARE_MASK);
        debug_assert!(self.fronting_half <= FRONTING_HALF_MASK);
        (self.fronting_half << FEE_SHARE_BITS) | (self.fee_share & FEE_SHARE_MASK)
    }
}

/// Reassembles the 20-bit fronting share: input 0 carries the high ten
/// bits, input 1 the low ten.
pub fn fronting_fee_share(seq0: SequenceFields, seq1: SequenceFields) -> u32 {
    (seq0.fronting_half << FRONTING_HALF_BITS) | seq1.fronting_half
}

/// Splits a 20-bit fronting share back into the two sequence halves.
pub fn split_fronting_fee_share(share: u32) -> (u32, u32) {
    debug_assert!(share <= FEE_SHARE_MASK);
    (share >> FRONTING_HALF_BITS, share & FRONTING_HALF_MASK)
}

/// `value * share / 100000`, widened to u128 for the multiply. Returns
/// `None` instead of wrapping when the quotient does not fit u64.
pub fn calculate_fee(value: u64, share_over_100k: u32) -> Option<u64> {
    let product = (value as u128) * (share_over_100k as u128);
    let fee = product / FEE_SHARE_DENOMINATOR as u128;
    u64::try_from(fee).ok()
}
