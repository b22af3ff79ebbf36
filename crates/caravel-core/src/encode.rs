use crate::compactsize::encode_compact_size;
use crate::tx::{BtcTx, TxInput, TxOutput};

pub fn tx_input_bytes(input: &TxInput, out: &mut Vec<u8>) {
    out.extend_from_slice(&input.prev_txid);
    out.extend_from_slice(&input.prev_vout.to_le_bytes());
    encode_compact_size(input.script_sig.len() as u64, out);
    out.extend_from_slice(&input.script_sig);
    out.extend_from_slice(&input.sequence.to_le_bytes());
}

pub fn tx_output_bytes(output: &TxOutput, out: &mut Vec<u8>) {
    out.extend_from_slice(&output.value.to_le_bytes());
    encode_compact_size(output.script_pubkey.len() as u64, out);
    out.extend_from_slice(&output.script_pubkey);
}

/// Serializes a transaction back into the exact legacy form
/// [`crate::tx::parse_btc_tx`] consumes.
pub fn btc_tx_bytes(tx: &BtcTx) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&tx.version.to_le_bytes());
    encode_compact_size(tx.inputs.len() as u64, &mut out);
    for input in &tx.inputs {
        tx_input_bytes(input, &mut out);
    }
    encode_compact_size(tx.outputs.len() as u64, &mut out);
    for output in &tx.outputs {
        tx_output_bytes(output, &mut out);
    }
    out.extend_from_slice(&tx.locktime.to_le_bytes());
    out
}
