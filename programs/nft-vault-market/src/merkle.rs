use anchor_lang::prelude::*;
use solana_program::keccak;

/// Leaf committing to a claimable amount: `keccak256(user || amount_le)`.
pub fn leaf(user: &Pubkey, amount: u64) -> [u8; 32] {
    keccak::hashv(&[user.as_ref(), amount.to_le_bytes().as_ref()]).0
}

/// Hashes a pair in sorted order so proofs carry no left/right flags.
pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    if a <= b {
        keccak::hashv(&[a.as_ref(), b.as_ref()]).0
    } else {
        keccak::hashv(&[b.as_ref(), a.as_ref()]).0
    }
}

pub fn verify(proof: &[[u8; 32]], root: &[u8; 32], leaf: [u8; 32]) -> bool {
    let computed = proof.iter().fold(leaf, |node, sibling| hash_pair(&node, sibling));
    computed == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds every level of a tree over `leaves`, promoting an odd node unchanged.
    fn levels(leaves: Vec<[u8; 32]>) -> Vec<Vec<[u8; 32]>> {
        let mut levels = vec![leaves];
        while levels.last().map_or(false, |l| l.len() > 1) {
            let next = levels
                .last()
                .map(|level| {
                    level
                        .chunks(2)
                        .map(|pair| match pair {
                            [a, b] => hash_pair(a, b),
                            [a] => *a,
                            _ => unreachable!(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            levels.push(next);
        }
        levels
    }

    fn proof(levels: &[Vec<[u8; 32]>], mut index: usize) -> Vec<[u8; 32]> {
        let mut proof = Vec::new();
        for level in &levels[..levels.len() - 1] {
            let sibling = index ^ 1;
            if sibling < level.len() {
                proof.push(level[sibling]);
            }
            index /= 2;
        }
        proof
    }

    #[test]
    fn proofs_verify_for_every_leaf() {
        let users: Vec<Pubkey> = (0..5).map(|_| Pubkey::new_unique()).collect();
        let leaves: Vec<[u8; 32]> = users
            .iter()
            .enumerate()
            .map(|(i, u)| leaf(u, (i as u64 + 1) * 1_000))
            .collect();
        let tree = levels(leaves.clone());
        let root = tree.last().unwrap()[0];

        for (i, l) in leaves.iter().enumerate() {
            assert!(verify(&proof(&tree, i), &root, *l));
        }
    }

    #[test]
    fn tampered_amount_fails() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let tree = levels(vec![leaf(&alice, 5), leaf(&bob, 10)]);
        let root = tree.last().unwrap()[0];
        let alice_proof = proof(&tree, 0);

        assert!(verify(&alice_proof, &root, leaf(&alice, 5)));
        assert!(!verify(&alice_proof, &root, leaf(&alice, 6)));
        assert!(!verify(&alice_proof, &root, leaf(&bob, 5)));
    }

    #[test]
    fn pair_hash_is_order_independent() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
    }
}
