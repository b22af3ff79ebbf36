#![no_main]

use libfuzzer_sys::fuzz_target;

use caravel_core::{build_proof, merkle_root_txids, verify_inclusion};

// Builds a tree from fuzz-chosen leaves and checks every generated
// proof verifies against the root and against nothing else.
fuzz_target!(|data: &[u8]| {
    if data.len() < 32 {
        return;
    }
    let n = (data.len() / 32).min(16);
    let mut txids = Vec::with_capacity(n);
    for i in 0..n {
        let mut id = [0u8; 32];
        id.copy_from_slice(&data[i * 32..(i + 1) * 32]);
        txids.push(id);
    }
    let Some(root) = merkle_root_txids(&txids) else {
        return;
    };

    for (i, txid) in txids.iter().enumerate() {
        let Some((siblings, position)) = build_proof(&txids, i) else {
            panic!("no proof for leaf {i} of {n}");
        };
        if !verify_inclusion(&root, *txid, &siblings, position) {
            panic!("own proof failed for leaf {i} of {n}");
        }
        let mut bad_root = root;
        bad_root[0] ^= 0x01;
        if verify_inclusion(&bad_root, *txid, &siblings, position) {
            panic!("proof matched a corrupted root");
        }
    }
});
