//! Commit-reveal randomness.
//!
//! Each round a miner commits `OutValue = H(InValue)` and reveals `InValue`
//! one round later. The in-value is also split into Shamir shares, one per
//! peer keyed by the peer's order, so that the peers can recover it if the
//! miner never reveals.

use super::{ConsensusError, ConsensusResult, Hash, MinerKey, Round};
use rand::RngCore;
use shared_crypto::{reconstruct, split_with_rng, threshold_for, Share};
use std::collections::BTreeMap;

/// `InValue = H(random_hash || H(round_id))`.
pub fn calculate_in_value(random_hash: &Hash, round_id: i64) -> Hash {
    Hash::concat_and_compute(random_hash, &Hash::from_i64(round_id))
}

pub fn calculate_out_value(in_value: &Hash) -> Hash {
    Hash::compute_from(in_value.as_bytes())
}

/// Signature binding this miner's value to the round it follows.
///
/// With a previous round of the same term the signature chains every
/// previous signature in key order; a miner that never signed contributes
/// `H(pubkey)`. Otherwise it is `H(out_value || random_hash)`.
pub fn calculate_signature(
    in_value: &Hash,
    out_value: &Hash,
    random_hash: &Hash,
    previous_round_of_same_term: Option<&Round>,
) -> Hash {
    match previous_round_of_same_term {
        Some(previous) => {
            let folded = previous
                .real_time_miners_information
                .values()
                .fold(Hash::empty(), |acc, miner| {
                    let signature = miner
                        .signature
                        .unwrap_or_else(|| Hash::compute_from(miner.pubkey.as_bytes()));
                    Hash::concat_and_compute(&acc, &signature)
                });
            Hash::concat_and_compute(in_value, &folded)
        }
        None => Hash::concat_and_compute(out_value, random_hash),
    }
}

/// Split `in_value` into plaintext shares for every miner of `round` except `sender`.
///
/// The share for the miner at order `k` is the polynomial evaluated at `k`.
pub fn split_in_value<R: RngCore + ?Sized>(
    in_value: &Hash,
    round: &Round,
    sender: &str,
    rng: &mut R,
) -> ConsensusResult<BTreeMap<MinerKey, Vec<u8>>> {
    let total = round.miner_count();
    let shares = split_with_rng(in_value.as_bytes(), threshold_for(total), total, rng)
        .map_err(|e| ConsensusError::SecretSharing(e.to_string()))?;

    let mut by_peer = BTreeMap::new();
    for miner in round.real_time_miners_information.values() {
        if miner.pubkey == sender {
            continue;
        }
        let share = usize::try_from(miner.order - 1)
            .ok()
            .and_then(|index| shares.get(index))
            .ok_or_else(|| ConsensusError::InvalidOrder {
                pubkey: miner.pubkey.clone(),
                order: miner.order,
                miners: total,
            })?;
        by_peer.insert(miner.pubkey.clone(), share.y.clone());
    }
    Ok(by_peer)
}

/// Recover a miner's previous in-value from the shares its peers opened.
///
/// `decrypted` maps each decryptor to its plaintext share; the decryptor's
/// order in `previous` is the x-coordinate. Returns `None` below threshold.
pub fn reconstruct_in_value(
    decrypted: &BTreeMap<MinerKey, Vec<u8>>,
    previous: &Round,
) -> ConsensusResult<Option<Hash>> {
    let threshold = threshold_for(previous.miner_count());
    let shares: Vec<Share> = decrypted
        .iter()
        .filter_map(|(decryptor, y)| {
            let order = previous.miner(decryptor)?.order;
            let x = u8::try_from(order).ok().filter(|x| *x != 0)?;
            Some(Share { x, y: y.clone() })
        })
        .collect();
    if shares.len() < threshold {
        return Ok(None);
    }

    let secret = reconstruct(&shares, threshold)
        .map_err(|e| ConsensusError::SecretSharing(e.to_string()))?;
    Hash::from_slice(&secret)
        .map(Some)
        .ok_or_else(|| ConsensusError::SecretSharing(format!("recovered {} bytes", secret.len())))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{key, mine, round_with};
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn keys(n: u8) -> Vec<String> {
        (1..=n).map(key).collect()
    }

    #[test]
    fn test_out_value_commits_to_in_value() {
        let random = Hash::compute_from(b"seed");
        let in_value = calculate_in_value(&random, 42);
        assert_eq!(calculate_out_value(&in_value), Hash::compute_from(in_value.as_bytes()));
        assert_ne!(calculate_in_value(&random, 43), in_value);
    }

    #[test]
    fn test_signature_depends_on_previous_round() {
        let all = keys(3);
        let random = Hash::compute_from(b"seed");
        let in_value = calculate_in_value(&random, 1);
        let out_value = calculate_out_value(&in_value);

        let mut previous = round_with(&all, 0, 4_000);
        let fresh = calculate_signature(&in_value, &out_value, &random, None);
        let unsigned = calculate_signature(&in_value, &out_value, &random, Some(&previous));
        assert_ne!(fresh, unsigned);

        mine(&mut previous, &all[1], 1);
        let signed = calculate_signature(&in_value, &out_value, &random, Some(&previous));
        assert_ne!(signed, unsigned);
    }

    #[test]
    fn test_peers_recover_in_value() {
        let all = keys(5);
        let round = round_with(&all, 0, 4_000);
        let in_value = Hash::compute_from(b"in");
        let mut rng = StdRng::seed_from_u64(1);

        let shares = split_in_value(&in_value, &round, &all[0], &mut rng).unwrap();
        assert_eq!(shares.len(), 4);
        assert!(!shares.contains_key(&all[0]));

        // threshold_for(5) == 3
        let mut opened: BTreeMap<MinerKey, Vec<u8>> = BTreeMap::new();
        for peer in &all[1..3] {
            opened.insert(peer.clone(), shares[peer].clone());
        }
        assert_eq!(reconstruct_in_value(&opened, &round).unwrap(), None);

        opened.insert(all[4].clone(), shares[&all[4]].clone());
        assert_eq!(reconstruct_in_value(&opened, &round).unwrap(), Some(in_value));
    }

    #[test]
    fn test_unknown_decryptors_ignored() {
        let all = keys(3);
        let round = round_with(&all, 0, 4_000);
        let mut opened = BTreeMap::new();
        opened.insert("stranger".to_string(), vec![0u8; 32]);
        opened.insert("another".to_string(), vec![0u8; 32]);
        assert_eq!(reconstruct_in_value(&opened, &round).unwrap(), None);
    }
}
