use crate::address::Address;
use crate::encode::btc_tx_bytes;
use crate::endian::reverse32;
use crate::error::{ErrorCode, Severity};
use crate::fees::{
    calculate_fee, fronting_fee_share, split_fronting_fee_share, SequenceFields, FEE_SHARE_MASK,
    FRONTING_HALF_MASK,
};
use crate::hash::sha256d;
use crate::merkle::{build_proof, merkle_root_txids, verify_inclusion};
use crate::params::SpvVaultParameters;
use crate::state::SpvVaultState;
use crate::tx::{parse_btc_tx, BtcTx, Outpoint, TxInput, TxOutput};
use crate::txdata::{fee_share_sequences, op_return_script, VaultTxData, EXECUTION_EXPIRY_OFFSET};

fn input(prev_txid: [u8; 32], prev_vout: u32, sequence: u32) -> TxInput {
    TxInput {
        prev_txid,
        prev_vout,
        script_sig: Vec::new(),
        sequence,
    }
}

fn two_in_two_out(seq0: u32, seq1: u32, out1_script: Vec<u8>, locktime: u32) -> BtcTx {
    BtcTx {
        version: 1,
        inputs: vec![input([0x11; 32], 0, seq0), input([0x22; 32], 1, seq1)],
        outputs: vec![
            TxOutput {
                value: 5_000,
                script_pubkey: vec![0x51],
            },
            TxOutput {
                value: 0,
                script_pubkey: out1_script,
            },
        ],
        locktime,
    }
}

#[test]
fn parse_encode_roundtrip_and_txid() {
    let tx = two_in_two_out(3, 7, vec![0x6a, 0x00], 42);
    let bytes = btc_tx_bytes(&tx);
    let (parsed, txid) = parse_btc_tx(&bytes).expect("parse");
    assert_eq!(parsed, tx);
    assert_eq!(txid, sha256d(&bytes));
    assert_eq!(btc_tx_bytes(&parsed), bytes);
}

#[test]
fn parse_known_mainnet_tx() {
    // Block 170's second transaction, the first ever BTC payment.
    let raw = hex::decode(concat!(
        "0100000001c997a5e56e104102fa209c6a852dd90660a20b2d9c352423edce25",
        "857fcd3704000000004847304402204e45e16932b8af514961a1d3a1a25fdf3f",
        "4f7732e9d624c6c61548ab5fb8cd410220181522ec8eca07de4860a4acdd1290",
        "9d831cc56cbbac4622082221a8768d1d0901ffffffff0200ca9a3b0000000043",
        "4104ae1a62fe09c5f51b13905f07f06b99a2f7159b2225f374cd378d71302fa2",
        "8414e7aab37397f554a7df5f142c21c1b7303b8a0626f1baded5c72a704f7e6c",
        "d84cac00286bee0000000043410411db93e1dcdb8a016b49840f8c53bc1eb68a",
        "382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b",
        "64f9d4c03f999b8643f656b412a3ac00000000",
    ))
    .expect("hex");
    let (tx, txid) = parse_btc_tx(&raw).expect("parse");
    assert_eq!(tx.version, 1);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[0].value, 10_0000_0000);
    assert_eq!(
        hex::encode(reverse32(&txid)),
        "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16"
    );
}

#[test]
fn parse_rejects_witness_marker() {
    let tx = two_in_two_out(0, 0, vec![0x6a, 0x00], 0);
    let mut bytes = btc_tx_bytes(&tx);
    // Insert segwit marker+flag where the input-count varint sits.
    bytes.splice(4..4, [0x00, 0x01]);
    let err = parse_btc_tx(&bytes).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxWitnessNotStripped);
}

#[test]
fn parse_rejects_length_boundary() {
    // Anything at or below 64 bytes is refused before field reads.
    let err = parse_btc_tx(&[0u8; 64]).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxTooShort);
    assert_eq!(err.msg, "tx too short");
    let err = parse_btc_tx(&[]).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxTooShort);
}

#[test]
fn parse_rejects_trailing_data() {
    let tx = two_in_two_out(0, 0, vec![0x6a, 0x00], 0);
    let mut bytes = btc_tx_bytes(&tx);
    bytes.push(0x00);
    let err = parse_btc_tx(&bytes).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxTrailingData);
}

#[test]
fn parse_rejects_truncation() {
    let tx = two_in_two_out(0, 0, vec![0x6a, 0x00], 0);
    let bytes = btc_tx_bytes(&tx);
    let err = parse_btc_tx(&bytes[..bytes.len() - 1]).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxTooShort);
}

#[test]
fn parse_rejects_nonminimal_compact_size() {
    let tx = two_in_two_out(0, 0, vec![0x6a, 0x00], 0);
    let mut bytes = btc_tx_bytes(&tx);
    // input_count 2 re-encoded as 0xfd 0x02 0x00.
    bytes.splice(4..5, [0xfd, 0x02, 0x00]);
    let err = parse_btc_tx(&bytes).unwrap_err();
    assert_eq!(err.code, ErrorCode::TxNonMinimalVarint);
}

#[test]
fn accessors_bounds_checked() {
    let tx = two_in_two_out(0, 0, vec![0x6a, 0x00], 0);
    assert_eq!(
        tx.input_utxo(0).expect("in 0"),
        Outpoint {
            txid: [0x11; 32],
            vout: 0
        }
    );
    assert_eq!(tx.output_value(0).expect("out 0"), 5_000);
    assert_eq!(
        tx.input_utxo(2).unwrap_err().code,
        ErrorCode::TxInputNotFound
    );
    assert_eq!(
        tx.output_script(2).unwrap_err().code,
        ErrorCode::TxOutputNotFound
    );
}

#[test]
fn calculate_fee_basics_and_overflow() {
    assert_eq!(calculate_fee(1_000, 10_000), Some(100));
    assert_eq!(calculate_fee(0, FEE_SHARE_MASK), Some(0));
    assert_eq!(calculate_fee(u64::MAX, 100_000), Some(u64::MAX));
    // Quotient exactly 2^64 must fail, one less must pass.
    assert_eq!(calculate_fee(u64::MAX / 2 + 1, 200_000), None);
    assert_eq!(calculate_fee(u64::MAX / 2, 200_000), Some(u64::MAX - 1));
    assert_eq!(calculate_fee(u64::MAX, FEE_SHARE_MASK), None);
}

#[test]
fn sequence_fields_roundtrip() {
    for fee_share in [0u32, 1, 0x12345, FEE_SHARE_MASK] {
        for fronting_half in [0u32, 1, 0x2aa, FRONTING_HALF_MASK] {
            let fields = SequenceFields {
                fee_share,
                fronting_half,
            };
            assert_eq!(SequenceFields::unpack(fields.pack()), fields);
        }
    }
    // Bits 30..32 are ignored on unpack.
    let fields = SequenceFields::unpack(0xc000_0000 | 0x1234);
    assert_eq!(fields.fee_share, 0x1234);
    assert_eq!(fields.fronting_half, 0);
}

#[test]
fn fronting_share_split_roundtrip() {
    for share in [0u32, 1, 0x3ff, 0x400, 0xabcde, FEE_SHARE_MASK] {
        let (high, low) = split_fronting_fee_share(share);
        let seq0 = SequenceFields {
            fee_share: 0,
            fronting_half: high,
        };
        let seq1 = SequenceFields {
            fee_share: 0,
            fronting_half: low,
        };
        assert_eq!(fronting_fee_share(seq0, seq1), share);
    }
}

#[test]
fn txdata_roundtrip_full_payload() {
    let recipient = Address([0xab; 20]);
    let execution_hash = [0x5e; 32];
    let expiry = 1_700_000_123u64;
    let (seq0, seq1) = fee_share_sequences(10_000, 2_000, 500);
    let script = op_return_script(recipient, 40_000, Some(7_000), Some(execution_hash));
    let tx = two_in_two_out(seq0, seq1, script, (expiry - EXECUTION_EXPIRY_OFFSET) as u32);

    let data = VaultTxData::from_tx(&tx).expect("decode");
    assert_eq!(data.recipient, recipient);
    assert_eq!(data.amount0, 40_000);
    assert_eq!(data.amount1, 7_000);
    assert_eq!(data.caller_fee0, 4_000);
    assert_eq!(data.caller_fee1, 700);
    assert_eq!(data.fronting_fee0, 800);
    assert_eq!(data.fronting_fee1, 140);
    assert_eq!(data.execution_fee0, 200);
    assert_eq!(data.execution_hash, execution_hash);
    assert_eq!(data.execution_expiry, expiry);
    assert_eq!(data.full_amounts(), Some((45_000, 7_840)));
}

#[test]
fn txdata_short_payload_defaults() {
    let (seq0, seq1) = fee_share_sequences(0, 0, 0);
    let script = op_return_script(Address([0x01; 20]), 123, None, None);
    let tx = two_in_two_out(seq0, seq1, script, 777);
    let data = VaultTxData::from_tx(&tx).expect("decode");
    assert_eq!(data.amount1, 0);
    assert_eq!(data.execution_hash, [0u8; 32]);
    // No execution fields: expiry stays zero regardless of locktime.
    assert_eq!(data.execution_expiry, 0);
    assert!(!data.has_execution());
}

#[test]
fn txdata_reason_strings() {
    let script = op_return_script(Address([0x01; 20]), 1, None, None);

    let mut tx = two_in_two_out(0, 0, script.clone(), 0);
    tx.inputs.truncate(1);
    let err = VaultTxData::from_tx(&tx).unwrap_err();
    assert_eq!(err.msg, "txData: input count <2");
    assert_eq!(err.severity(), Severity::Recoverable);

    let mut tx = two_in_two_out(0, 0, script.clone(), 0);
    tx.outputs.truncate(1);
    let err = VaultTxData::from_tx(&tx).unwrap_err();
    assert_eq!(err.msg, "txData: output count <2");

    let tx = two_in_two_out(0, 0, Vec::new(), 0);
    let err = VaultTxData::from_tx(&tx).unwrap_err();
    assert_eq!(err.msg, "txData: output 1 empty script");

    let mut bad = script.clone();
    bad[0] = 0x6b;
    let tx = two_in_two_out(0, 0, bad, 0);
    let err = VaultTxData::from_tx(&tx).unwrap_err();
    assert_eq!(err.msg, "txData: output 1 not OP_RETURN");

    // Push byte disagrees with the actual payload length.
    let mut bad = script.clone();
    bad[1] += 1;
    let tx = two_in_two_out(0, 0, bad, 0);
    let err = VaultTxData::from_tx(&tx).unwrap_err();
    assert_eq!(err.msg, "txData: output 1 invalid len");

    // 29-byte payload is not an accepted shape.
    let mut bad = script;
    bad.push(0x00);
    bad[1] += 1;
    let tx = two_in_two_out(0, 0, bad, 0);
    let err = VaultTxData::from_tx(&tx).unwrap_err();
    assert_eq!(err.msg, "txData: output 1 invalid len");
}

#[test]
fn txdata_fee_overflow_reasons() {
    let script = op_return_script(Address([0x01; 20]), u64::MAX, None, None);

    let (seq0, seq1) = fee_share_sequences(FEE_SHARE_MASK, 0, 0);
    let err = VaultTxData::from_tx(&two_in_two_out(seq0, seq1, script.clone(), 0)).unwrap_err();
    assert_eq!(err.msg, "txData: caller fee 0");
    assert_eq!(err.code, ErrorCode::TxDataFeeOverflow);

    let (seq0, seq1) = fee_share_sequences(0, FEE_SHARE_MASK, 0);
    let err = VaultTxData::from_tx(&two_in_two_out(seq0, seq1, script.clone(), 0)).unwrap_err();
    assert_eq!(err.msg, "txData: fronting fee 0");

    let (seq0, seq1) = fee_share_sequences(0, 0, FEE_SHARE_MASK);
    let err = VaultTxData::from_tx(&two_in_two_out(seq0, seq1, script.clone(), 0)).unwrap_err();
    assert_eq!(err.msg, "txData: execution fee 0");

    let script1 = op_return_script(Address([0x01; 20]), 0, Some(u64::MAX), None);
    let (seq0, seq1) = fee_share_sequences(FEE_SHARE_MASK, 0, 0);
    let err = VaultTxData::from_tx(&two_in_two_out(seq0, seq1, script1.clone(), 0)).unwrap_err();
    assert_eq!(err.msg, "txData: caller fee 1");

    let (seq0, seq1) = fee_share_sequences(0, FEE_SHARE_MASK, 0);
    let err = VaultTxData::from_tx(&two_in_two_out(seq0, seq1, script1, 0)).unwrap_err();
    assert_eq!(err.msg, "txData: fronting fee 1");
}

#[test]
fn full_amounts_overflow() {
    let script = op_return_script(Address([0x01; 20]), u64::MAX, None, None);
    let (seq0, seq1) = fee_share_sequences(1, 0, 0);
    let data = VaultTxData::from_tx(&two_in_two_out(seq0, seq1, script, 0)).expect("decode");
    // amount0 + caller_fee0 wraps past u64.
    assert_eq!(data.full_amounts(), None);
}

fn test_txids(n: usize) -> Vec<[u8; 32]> {
    (0..n)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0xc4;
            sha256d(&seed)
        })
        .collect()
}

#[test]
fn merkle_proofs_verify_for_every_leaf() {
    for n in [1usize, 2, 3, 7, 8, 13] {
        let txids = test_txids(n);
        let root = merkle_root_txids(&txids).expect("root");
        for (i, txid) in txids.iter().enumerate() {
            let (siblings, position) = build_proof(&txids, i).expect("proof");
            assert!(
                verify_inclusion(&root, *txid, &siblings, position),
                "n={n} i={i}"
            );
        }
    }
}

#[test]
fn merkle_proof_rejects_any_corruption() {
    // Power-of-two width: no duplicated nodes on any path, so every
    // single-bit corruption must flip the verdict.
    let txids = test_txids(8);
    let root = merkle_root_txids(&txids).expect("root");
    for i in 0..8 {
        let (siblings, position) = build_proof(&txids, i).expect("proof");

        for s in 0..siblings.len() {
            for byte in [0usize, 15, 31] {
                let mut bad = siblings.clone();
                bad[s][byte] ^= 0x01;
                assert!(
                    !verify_inclusion(&root, txids[i], &bad, position),
                    "sibling {s} byte {byte} of leaf {i}"
                );
            }
        }
        for bit in 0..siblings.len() {
            assert!(
                !verify_inclusion(&root, txids[i], &siblings, position ^ (1u64 << bit)),
                "position bit {bit} of leaf {i}"
            );
        }
        let mut bad_root = root;
        bad_root[0] ^= 0x01;
        assert!(!verify_inclusion(&bad_root, txids[i], &siblings, position));
    }
}

#[test]
fn merkle_empty_proof_is_identity() {
    let leaf = sha256d(b"sole");
    assert!(verify_inclusion(&leaf, leaf, &[], 0));
}

#[test]
fn merkle_rejects_paths_deeper_than_position_bits() {
    // 65 levels cannot be ordered by a 64-bit position; must fail
    // cleanly, not overflow the per-level shift.
    let leaf = sha256d(b"deep");
    let siblings = [[0u8; 32]; 65];
    assert!(!verify_inclusion(&[0u8; 32], leaf, &siblings, u64::MAX));
    assert!(!verify_inclusion(&[0u8; 32], leaf, &siblings, 0));
}

fn params() -> SpvVaultParameters {
    SpvVaultParameters {
        btc_relay: Address([0x0e; 20]),
        token0: Address::ZERO,
        token1: Address([0x02; 20]),
        token0_multiplier: 1,
        token1_multiplier: 1_000_000,
        confirmations: 3,
    }
}

#[test]
fn params_commitment_binds_every_field() {
    let base = params();
    let mut other = base.clone();
    other.token1_multiplier += 1;
    assert_ne!(base.commitment(), other.commitment());
    let mut other = base.clone();
    other.confirmations += 1;
    assert_ne!(base.commitment(), other.commitment());
    assert_eq!(base.commitment(), base.clone().commitment());
}

#[test]
fn params_scaling_checked() {
    let p = params();
    assert_eq!(p.from_raw_token1(2), Some(2_000_000));
    let mut p = p;
    p.token0_multiplier = u128::MAX;
    assert_eq!(p.from_raw_token0(2), None);
    assert_eq!(p.from_raw_token0(0), Some(0));
}

fn genesis_utxo() -> Outpoint {
    Outpoint {
        txid: [0x77; 32],
        vout: 1,
    }
}

#[test]
fn state_open_close_lifecycle() {
    let p = params();
    let mut st = SpvVaultState::unopened();
    assert!(!st.is_opened());
    assert_eq!(
        st.check_opened_and_params(&p).unwrap_err().msg,
        "spvState: closed"
    );

    st.open(&p, genesis_utxo(), 900).expect("open");
    assert!(st.is_opened());
    assert_eq!(st.open_blockheight, 900);
    assert_eq!(st.utxo, genesis_utxo());
    st.check_opened_and_params(&p).expect("params match");

    let err = st.open(&p, genesis_utxo(), 901).unwrap_err();
    assert_eq!(err.msg, "open: already opened");

    let mut wrong = p.clone();
    wrong.confirmations = 99;
    assert_eq!(
        st.check_opened_and_params(&wrong).unwrap_err().msg,
        "spvState: wrong params"
    );

    st.close();
    assert!(!st.is_opened());
    assert_eq!(
        st.check_opened_and_params(&p).unwrap_err().msg,
        "spvState: closed"
    );
    // Minimal write: counters and UTXO are left behind.
    assert_eq!(st.utxo, genesis_utxo());
}

#[test]
fn state_withdraw_checked_and_nonced() {
    let p = params();
    let mut st = SpvVaultState::unopened();
    st.open(&p, genesis_utxo(), 0).expect("open");
    st.deposit(1_000, 500).expect("deposit");
    assert_eq!(st.deposit_count, 1);

    let new_utxo = Outpoint {
        txid: [0x88; 32],
        vout: 0,
    };
    let before = st.clone();
    let err = st.withdraw(new_utxo, 1_001, 0).unwrap_err();
    assert_eq!(err.msg, "withdraw: amount 0");
    assert_eq!(st, before, "failed withdraw must not mutate");
    let err = st.withdraw(new_utxo, 0, 501).unwrap_err();
    assert_eq!(err.msg, "withdraw: amount 1");
    assert_eq!(st, before);

    let prior = st.withdraw(new_utxo, 400, 500).expect("withdraw");
    assert_eq!(prior, 0);
    assert_eq!(st.withdraw_count, 1);
    assert_eq!(st.token0_amount, 600);
    assert_eq!(st.token1_amount, 0);
    assert_eq!(st.utxo, new_utxo);
}

#[test]
fn state_deposit_overflow_is_fatal() {
    let p = params();
    let mut st = SpvVaultState::unopened();
    st.open(&p, genesis_utxo(), 0).expect("open");
    st.deposit(u128::MAX, 0).expect("deposit");
    let err = st.deposit(1, 0).unwrap_err();
    assert_eq!(err.msg, "deposit: amount 0");
    assert_eq!(err.severity(), Severity::Fatal);
    let err = st.deposit(0, u128::MAX).err().map(|e| e.msg);
    assert_eq!(err, None, "token1 headroom untouched");
}

#[test]
fn severity_table() {
    use ErrorCode::*;
    for code in [TxDataMalformed, TxDataFeeOverflow, ClaimFullAmounts, WithdrawUnderflow] {
        assert_eq!(code.severity(), Severity::Recoverable);
    }
    for code in [
        TxTooShort,
        TxWitnessNotStripped,
        TxTrailingData,
        VaultClosed,
        VaultWrongParams,
        DepositOverflow,
        FrontAlreadyProcessed,
        FrontAlreadyFronted,
        ClaimConfirmations,
        ClaimMerkleInvalid,
        ClaimWrongUtxo,
        TransferFailed,
    ] {
        assert_eq!(code.severity(), Severity::Fatal);
    }
}
