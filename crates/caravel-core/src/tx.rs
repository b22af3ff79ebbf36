use crate::compactsize::read_compact_size;
use crate::error::{ErrorCode, VaultError};
use crate::hash::sha256d;
use crate::wire_read::Reader;

/// A (txid, output index) pair identifying spendable Bitcoin value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Outpoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A legacy (non-witness) Bitcoin transaction, parsed from the exact
/// serialization its txid commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BtcTx {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

/// Parses a raw legacy Bitcoin transaction and returns it together with
/// its txid (double-SHA256 of the buffer, internal byte order).
///
/// The buffer must be the stripped (non-segwit) serialization and must
/// be fully consumed: a segwit marker fails with
/// [`ErrorCode::TxWitnessNotStripped`], leftover bytes after the
/// locktime fail with [`ErrorCode::TxTrailingData`], and any field
/// running past the end fails with [`ErrorCode::TxTooShort`]. Buffers of
/// 64 bytes or fewer are rejected outright at that same boundary, so a
/// witness-marker-shaped truncated buffer can never be misread.
pub fn parse_btc_tx(b: &[u8]) -> Result<(BtcTx, [u8; 32]), VaultError> {
    if b.len() <= 64 {
        return Err(VaultError::new(ErrorCode::TxTooShort, "tx too short"));
    }

    let mut r = Reader::new(b);
    let version = r.read_u32_le()? as i32;

    // Segwit marker 0x00 + flag 0x01 sitting where the input-count
    // varint belongs. Callers must supply the stripped serialization.
    let rem = r.remaining();
    if rem.len() >= 2 && rem[0] == 0x00 && rem[1] == 0x01 {
        return Err(VaultError::new(
            ErrorCode::TxWitnessNotStripped,
            "segwit marker present",
        ));
    }

    let (in_count_u64, _) = read_compact_size(&mut r)?;
    let in_count: usize = in_count_u64
        .try_into()
        .map_err(|_| VaultError::new(ErrorCode::TxTooShort, "input_count overflows usize"))?;
    let mut inputs = Vec::with_capacity(in_count.min(1024));
    for _ in 0..in_count {
        let prev = r.read_bytes(32)?;
        let mut prev_txid = [0u8; 32];
        prev_txid.copy_from_slice(prev);

        let prev_vout = r.read_u32_le()?;

        let (script_sig_len_u64, _) = read_compact_size(&mut r)?;
        let script_sig_len: usize = script_sig_len_u64
            .try_into()
            .map_err(|_| VaultError::new(ErrorCode::TxTooShort, "script_sig_len overflows usize"))?;
        let script_sig = r.read_bytes(script_sig_len)?.to_vec();

        let sequence = r.read_u32_le()?;

        inputs.push(TxInput {
            prev_txid,
            prev_vout,
            script_sig,
            sequence,
        });
    }

    let (out_count_u64, _) = read_compact_size(&mut r)?;
    let out_count: usize = out_count_u64
        .try_into()
        .map_err(|_| VaultError::new(ErrorCode::TxTooShort, "output_count overflows usize"))?;
    let mut outputs = Vec::with_capacity(out_count.min(1024));
    for _ in 0..out_count {
        let value = r.read_u64_le()?;

        let (script_len_u64, _) = read_compact_size(&mut r)?;
        let script_len: usize = script_len_u64
            .try_into()
            .map_err(|_| VaultError::new(ErrorCode::TxTooShort, "script_len overflows usize"))?;
        let script_pubkey = r.read_bytes(script_len)?.to_vec();

        outputs.push(TxOutput {
            value,
            script_pubkey,
        });
    }

    let locktime = r.read_u32_le()?;

    if r.offset() != b.len() {
        return Err(VaultError::new(ErrorCode::TxTrailingData, "trailing bytes"));
    }

    let txid = sha256d(b);
    Ok((
        BtcTx {
            version,
            inputs,
            outputs,
            locktime,
        },
        txid,
    ))
}

impl BtcTx {
    /// The outpoint spent by input `i`.
    pub fn input_utxo(&self, i: usize) -> Result<Outpoint, VaultError> {
        let input = self
            .inputs
            .get(i)
            .ok_or_else(|| VaultError::new(ErrorCode::TxInputNotFound, "input index out of range"))?;
        Ok(Outpoint {
            txid: input.prev_txid,
            vout: input.prev_vout,
        })
    }

    pub fn output_value(&self, i: usize) -> Result<u64, VaultError> {
        self.outputs
            .get(i)
            .map(|o| o.value)
            .ok_or_else(|| VaultError::new(ErrorCode::TxOutputNotFound, "output index out of range"))
    }

    pub fn output_script(&self, i: usize) -> Result<&[u8], VaultError> {
        self.outputs
            .get(i)
            .map(|o| o.script_pubkey.as_slice())
            .ok_or_else(|| VaultError::new(ErrorCode::TxOutputNotFound, "output index out of range"))
    }
}
