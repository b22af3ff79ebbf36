use crate::address::Address;
use crate::endian::read_u64_be;
use crate::error::{ErrorCode, VaultError};
use crate::fees::{calculate_fee, fronting_fee_share, split_fronting_fee_share, SequenceFields};
use crate::hash::sha256;
use crate::tx::BtcTx;

pub const OP_RETURN: u8 = 0x6a;

/// Fixed offset distinguishing the execution-expiry channel from real
/// Unix-scale locktimes: the claim transaction encodes
/// `expiry - 1_000_000_000` in the locktime field.
pub const EXECUTION_EXPIRY_OFFSET: u64 = 1_000_000_000;

/// Accepted OP_RETURN payload lengths: recipient+amount0, +amount1,
/// +executionHash, +amount1+executionHash.
pub const PAYLOAD_LEN_SHORT: usize = 28;
pub const PAYLOAD_LEN_AMOUNT1: usize = 36;
pub const PAYLOAD_LEN_EXECUTION: usize = 60;
pub const PAYLOAD_LEN_FULL: usize = 68;

/// The swap payload recovered from a claim transaction: recipient and
/// amounts from output 1's OP_RETURN, fee shares from the first two
/// inputs' sequence numbers, already converted to fee amounts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultTxData {
    pub recipient: Address,
    pub amount0: u64,
    pub amount1: u64,
    pub caller_fee0: u64,
    pub caller_fee1: u64,
    pub fronting_fee0: u64,
    pub fronting_fee1: u64,
    /// Execution handler fee; applies to token0 only.
    pub execution_fee0: u64,
    /// Zero means no execution is scheduled.
    pub execution_hash: [u8; 32],
    pub execution_expiry: u64,
}

fn malformed(msg: &'static str) -> VaultError {
    VaultError::new(ErrorCode::TxDataMalformed, msg)
}

fn fee_overflow(msg: &'static str) -> VaultError {
    VaultError::new(ErrorCode::TxDataFeeOverflow, msg)
}

impl VaultTxData {
    /// Extracts the payload from a parsed transaction. Every error here
    /// is recoverable: inside a claim it closes the vault instead of
    /// reverting, so the exact reason strings are part of the surface.
    pub fn from_tx(tx: &BtcTx) -> Result<VaultTxData, VaultError> {
        if tx.inputs.len() < 2 {
            return Err(malformed("txData: input count <2"));
        }
        if tx.outputs.len() < 2 {
            return Err(malformed("txData: output count <2"));
        }

        let script = tx.outputs[1].script_pubkey.as_slice();
        if script.is_empty() {
            return Err(malformed("txData: output 1 empty script"));
        }
        if script[0] != OP_RETURN {
            return Err(malformed("txData: output 1 not OP_RETURN"));
        }
        // Single push-length byte, then the payload, nothing else.
        if script.len() < 2 || script.len() != 2 + script[1] as usize {
            return Err(malformed("txData: output 1 invalid len"));
        }
        let payload = &script[2..];

        let (amount1, execution_hash) = match payload.len() {
            PAYLOAD_LEN_SHORT => (0u64, [0u8; 32]),
            PAYLOAD_LEN_AMOUNT1 => (read_u64_be(&payload[28..36]), [0u8; 32]),
            PAYLOAD_LEN_EXECUTION => {
                let mut h = [0u8; 32];
                h.copy_from_slice(&payload[28..60]);
                (0u64, h)
            }
            PAYLOAD_LEN_FULL => {
                let mut h = [0u8; 32];
                h.copy_from_slice(&payload[36..68]);
                (read_u64_be(&payload[28..36]), h)
            }
            _ => return Err(malformed("txData: output 1 invalid len")),
        };

        let mut recipient = [0u8; 20];
        recipient.copy_from_slice(&payload[0..20]);
        let amount0 = read_u64_be(&payload[20..28]);

        let execution_expiry = if execution_hash == [0u8; 32] {
            0
        } else {
            tx.locktime as u64 + EXECUTION_EXPIRY_OFFSET
        };

        let seq0 = SequenceFields::unpack(tx.inputs[0].sequence);
        let seq1 = SequenceFields::unpack(tx.inputs[1].sequence);
        let caller_share = seq0.fee_share;
        let execution_share = seq1.fee_share;
        let fronting_share = fronting_fee_share(seq0, seq1);

        let caller_fee0 =
            calculate_fee(amount0, caller_share).ok_or_else(|| fee_overflow("txData: caller fee 0"))?;
        let fronting_fee0 =
            calculate_fee(amount0, fronting_share).ok_or_else(|| fee_overflow("txData: fronting fee 0"))?;
        let execution_fee0 = calculate_fee(amount0, execution_share)
            .ok_or_else(|| fee_overflow("txData: execution fee 0"))?;
        let caller_fee1 =
            calculate_fee(amount1, caller_share).ok_or_else(|| fee_overflow("txData: caller fee 1"))?;
        let fronting_fee1 =
            calculate_fee(amount1, fronting_share).ok_or_else(|| fee_overflow("txData: fronting fee 1"))?;

        Ok(VaultTxData {
            recipient: Address(recipient),
            amount0,
            amount1,
            caller_fee0,
            caller_fee1,
            fronting_fee0,
            fronting_fee1,
            execution_fee0,
            execution_hash,
            execution_expiry,
        })
    }

    pub fn has_execution(&self) -> bool {
        self.execution_hash != [0u8; 32]
    }

    /// Principal plus every same-token fee, checked; sizes the vault's
    /// outgoing transfer.
    pub fn full_amounts(&self) -> Option<(u64, u64)> {
        let full0 = self
            .amount0
            .checked_add(self.caller_fee0)?
            .checked_add(self.fronting_fee0)?
            .checked_add(self.execution_fee0)?;
        let full1 = self
            .amount1
            .checked_add(self.caller_fee1)?
            .checked_add(self.fronting_fee1)?;
        Some((full0, full1))
    }

    /// Canonical fixed-width serialization of the decoded payload.
    pub fn canonical_bytes(&self) -> [u8; 20 + 8 * 7 + 32 + 8] {
        let mut out = [0u8; 20 + 8 * 7 + 32 + 8];
        out[0..20].copy_from_slice(self.recipient.as_bytes());
        out[20..28].copy_from_slice(&self.amount0.to_be_bytes());
        out[28..36].copy_from_slice(&self.amount1.to_be_bytes());
        out[36..44].copy_from_slice(&self.caller_fee0.to_be_bytes());
        out[44..52].copy_from_slice(&self.caller_fee1.to_be_bytes());
        out[52..60].copy_from_slice(&self.fronting_fee0.to_be_bytes());
        out[60..68].copy_from_slice(&self.fronting_fee1.to_be_bytes());
        out[68..76].copy_from_slice(&self.execution_fee0.to_be_bytes());
        out[76..108].copy_from_slice(&self.execution_hash);
        out[108..116].copy_from_slice(&self.execution_expiry.to_be_bytes());
        out
    }

    /// Hash identifying one exact payload of one exact Bitcoin
    /// transaction; keys fronting records.
    pub fn hash_with_txid(&self, btc_txid: &[u8; 32]) -> [u8; 32] {
        let mut buf = Vec::with_capacity(116 + 32);
        buf.extend_from_slice(&self.canonical_bytes());
        buf.extend_from_slice(btc_txid);
        sha256(&buf)
    }
}

/// Builds output 1's OP_RETURN script for a given payload shape. The
/// encoder counterpart of [`VaultTxData::from_tx`].
pub fn op_return_script(
    recipient: Address,
    amount0: u64,
    amount1: Option<u64>,
    execution_hash: Option<[u8; 32]>,
) -> Vec<u8> {
    let len = 20
        + 8
        + if amount1.is_some() { 8 } else { 0 }
        + if execution_hash.is_some() { 32 } else { 0 };
    let mut script = Vec::with_capacity(2 + len);
    script.push(OP_RETURN);
    script.push(len as u8);
    script.extend_from_slice(recipient.as_bytes());
    script.extend_from_slice(&amount0.to_be_bytes());
    if let Some(a1) = amount1 {
        script.extend_from_slice(&a1.to_be_bytes());
    }
    if let Some(h) = execution_hash {
        script.extend_from_slice(&h);
    }
    script
}

/// Packs the three fee shares into the two sequence numbers of inputs 0
/// and 1.
pub fn fee_share_sequences(
    caller_share: u32,
    fronting_share: u32,
    execution_share: u32,
) -> (u32, u32) {
    let (high, low) = split_fronting_fee_share(fronting_share);
    let seq0 = SequenceFields {
        fee_share: caller_share,
        fronting_half: high,
    };
    let seq1 = SequenceFields {
        fee_share: execution_share,
        fronting_half: low,
    };
    (seq0.pack(), seq1.pack())
}
