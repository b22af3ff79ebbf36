#![no_main]

use libfuzzer_sys::fuzz_target;

use caravel_core::VaultTxData;

// Payload extraction never panics on any parseable transaction, is
// deterministic, and its full amounts always cover every component.
fuzz_target!(|data: &[u8]| {
    let Ok((tx, txid)) = caravel_core::parse_btc_tx(data) else {
        return;
    };
    let Ok(d) = VaultTxData::from_tx(&tx) else {
        return;
    };
    let Ok(d2) = VaultTxData::from_tx(&tx) else {
        panic!("from_tx non-deterministic");
    };
    if d != d2 {
        panic!("from_tx value mismatch");
    }
    if d.hash_with_txid(&txid) != d2.hash_with_txid(&txid) {
        panic!("payload hash non-deterministic");
    }
    if let Some((full0, full1)) = d.full_amounts() {
        let sum0 = (d.amount0 as u128)
            + (d.caller_fee0 as u128)
            + (d.fronting_fee0 as u128)
            + (d.execution_fee0 as u128);
        let sum1 = (d.amount1 as u128) + (d.caller_fee1 as u128) + (d.fronting_fee1 as u128);
        if (full0 as u128) != sum0 || (full1 as u128) != sum1 {
            panic!("full amounts disagree with components");
        }
    }
});
