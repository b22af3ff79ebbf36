use crate::hash::sha256d;

/// Recomputes a Merkle root from `leaf` and an ordered sibling path.
///
/// Bit `i` of `position` orders proof step `i`: a set bit means the
/// running hash is the right operand (the sibling sits on the left).
/// Each node is double-SHA256 over the 64-byte concatenation, matching
/// Bitcoin's pairwise construction. The proof is caller-supplied and
/// pre-computed, so no odd-leaf duplication logic is needed here.
pub fn verify_inclusion(
    root: &[u8; 32],
    leaf: [u8; 32],
    siblings: &[[u8; 32]],
    position: u64,
) -> bool {
    // `position` orders at most 64 levels; a deeper path cannot be a
    // valid proof and would overflow the shift below.
    if siblings.len() > 64 {
        return false;
    }
    let mut cur = leaf;
    let mut cat = [0u8; 64];
    for (i, sibling) in siblings.iter().enumerate() {
        if (position >> i) & 1 == 1 {
            cat[..32].copy_from_slice(sibling);
            cat[32..].copy_from_slice(&cur);
        } else {
            cat[..32].copy_from_slice(&cur);
            cat[32..].copy_from_slice(sibling);
        }
        cur = sha256d(&cat);
    }
    cur == *root
}

/// Builds a Bitcoin-rule Merkle root over txids (odd levels duplicate
/// the last node). Used to produce headers for proofs generated with
/// [`build_proof`].
pub fn merkle_root_txids(txids: &[[u8; 32]]) -> Option<[u8; 32]> {
    if txids.is_empty() {
        return None;
    }
    let mut level = txids.to_vec();
    let mut cat = [0u8; 64];
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = if pair.len() == 2 { pair[1] } else { pair[0] };
            cat[..32].copy_from_slice(&pair[0]);
            cat[32..].copy_from_slice(&right);
            next.push(sha256d(&cat));
        }
        level = next;
    }
    Some(level[0])
}

/// Generates the (siblings, position) pair for `index` under the same
/// duplicate-last rule as [`merkle_root_txids`].
pub fn build_proof(txids: &[[u8; 32]], index: usize) -> Option<(Vec<[u8; 32]>, u64)> {
    if index >= txids.len() {
        return None;
    }
    let mut level = txids.to_vec();
    let mut idx = index;
    let mut siblings = Vec::new();
    let mut position = 0u64;
    let mut cat = [0u8; 64];
    while level.len() > 1 {
        let sibling_idx = idx ^ 1;
        let sibling = if sibling_idx < level.len() {
            level[sibling_idx]
        } else {
            level[idx]
        };
        siblings.push(sibling);
        if idx & 1 == 1 {
            position |= 1u64 << (siblings.len() - 1);
        }

        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = if pair.len() == 2 { pair[1] } else { pair[0] };
            cat[..32].copy_from_slice(&pair[0]);
            cat[32..].copy_from_slice(&right);
            next.push(sha256d(&cat));
        }
        level = next;
        idx /= 2;
    }
    Some((siblings, position))
}
