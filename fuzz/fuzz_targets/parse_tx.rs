#![no_main]

use libfuzzer_sys::fuzz_target;

// Parsing accepts exactly the serializations the encoder produces:
// any accepted input re-encodes byte-identically and its txid is the
// double-SHA256 of the input.
fuzz_target!(|data: &[u8]| {
    let Ok((tx, txid)) = caravel_core::parse_btc_tx(data) else {
        return;
    };
    let enc = caravel_core::btc_tx_bytes(&tx);
    if enc != data {
        panic!("re-encode mismatch: got={enc:02x?} want={data:02x?}");
    }
    if txid != caravel_core::sha256d(data) {
        panic!("txid not sha256d of exact buffer");
    }
});
