//! Byte-at-a-time recovery of the secret an ECB oracle appends to its input.

use rand::{thread_rng, Rng};
use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::config::{AttackConfig, Termination};
use crate::crypto::pkcs7;
use crate::oracle::{BudgetExhausted, Counted, Oracle};
use crate::probe::{
    discover_block_size, discover_prefix_length_with, discover_secret_length, is_ecb_oracle_with,
    ProbeError,
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecoverError {
    #[error("oracle is not using ecb mode")]
    NotEcb,
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    QueryBudgetExceeded(#[from] BudgetExhausted),
    #[error("recovered bytes do not end in valid padding")]
    InvalidPadding,
    #[error("no candidate byte matched at secret offset {0}")]
    NoCandidate(usize),
}

/// Recovers `secret` from an oracle computing `ECB(input || secret)`.
pub fn recover_secret<O: Oracle + ?Sized>(oracle: &O) -> Result<Vec<u8>, RecoverError> {
    Recovery::default().recover(oracle)
}

/// Recovers `secret` from an oracle computing `ECB(prefix || input || secret)`
/// with a fixed, unknown `prefix`.
pub fn recover_secret_with_prefix<O: Oracle + ?Sized>(oracle: &O) -> Result<Vec<u8>, RecoverError> {
    Recovery::default().recover_with_prefix(oracle)
}

#[derive(Debug, Clone, Default)]
pub struct Recovery {
    config: AttackConfig,
}

impl Recovery {
    pub fn new(config: AttackConfig) -> Recovery {
        Recovery { config: config }
    }

    #[instrument(skip(self, oracle))]
    pub fn recover<O: Oracle + ?Sized>(&self, oracle: &O) -> Result<Vec<u8>, RecoverError> {
        let oracle = Counted::with_budget(oracle, self.config.max_queries);
        let bs = probe_ecb(&oracle)?;
        self.run(&oracle, bs, 0)
    }

    #[instrument(skip(self, oracle))]
    pub fn recover_with_prefix<O: Oracle + ?Sized>(&self, oracle: &O) -> Result<Vec<u8>, RecoverError> {
        let oracle = Counted::with_budget(oracle, self.config.max_queries);
        let bs = probe_ecb(&oracle)?;

        let mut reference = vec![0_u8; bs];
        thread_rng().fill(&mut reference[..]);
        let prefix_len = discover_prefix_length_with(&oracle, &reference, self.config.magic_repetitions);
        oracle.check()?;
        let prefix_len = prefix_len?;

        self.run(&oracle, bs, prefix_len)
    }

    fn run<O: Oracle + ?Sized>(
        &self,
        oracle: &Counted<O>,
        bs: usize,
        prefix_len: usize,
    ) -> Result<Vec<u8>, RecoverError> {
        let target = match self.config.termination {
            Termination::NoMatch => None,
            Termination::KnownLength => {
                let len = discover_secret_length(oracle, bs, prefix_len);
                oracle.check()?;
                Some(len?)
            }
        };
        debug!(bs, prefix_len, ?target, "starting byte-at-a-time recovery");

        let mut res: Vec<u8> = Vec::new();
        while target != Some(res.len()) {
            match next_byte(oracle, bs, prefix_len, &res)? {
                Some(b) => {
                    trace!(offset = res.len(), byte = b, "recovered byte");
                    res.push(b);
                }
                None => break,
            }
        }

        // Running off the end of the secret recovers the single 0x01 pad
        // byte before the next round fails, so strip it the PKCS#7 way.
        let res = match target {
            Some(len) if res.len() == len => res,
            Some(_) => return Err(RecoverError::NoCandidate(res.len())),
            None => pkcs7::unpad(res).ok_or(RecoverError::InvalidPadding)?,
        };

        info!(len = res.len(), queries = oracle.queries(), "recovered secret");
        Ok(res)
    }
}

/// Block size of the oracle, provided it is ECB.
///
/// Probe results are only trusted once the budget check passes, since a
/// refused query answers with no bytes.
fn probe_ecb<O: Oracle + ?Sized>(oracle: &Counted<O>) -> Result<usize, RecoverError> {
    let bs = discover_block_size(oracle);
    oracle.check()?;
    let bs = bs?;

    let ecb = is_ecb_oracle_with(oracle, bs);
    oracle.check()?;
    if !ecb {
        return Err(RecoverError::NotEcb);
    }
    Ok(bs)
}

/// One round: line the byte after `known` up as the last byte of a block,
/// then try all 256 values for it.
fn next_byte<O: Oracle + ?Sized>(
    oracle: &Counted<O>,
    bs: usize,
    prefix_len: usize,
    known: &[u8],
) -> Result<Option<u8>, RecoverError> {
    let filler = vec![0_u8; bs - ((prefix_len + known.len()) % bs) - 1];

    // encrypt(prefix || filler || secret || pad)
    let want = oracle.try_encrypt(&filler)?;

    // filler || known || guess
    let mut input = Vec::with_capacity(filler.len() + known.len() + 1);
    input.extend_from_slice(&filler);
    input.extend_from_slice(known);
    input.push(0);

    let bound = prefix_len + input.len();
    let want = match want.get(..bound) {
        Some(want) => want,
        None => return Ok(None),
    };

    let last = input.len() - 1;
    for b in u8::MIN..=u8::MAX {
        input[last] = b;
        let output = oracle.try_encrypt(&input)?;
        if output.get(..bound) == Some(want) {
            return Ok(Some(b));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use crate::config::{AttackConfig, Termination};
    use crate::crypto::block::{Aes128, RustCryptoBlock, ToyCipher};
    use crate::oracle::{BudgetExhausted, ModeKind, PrefixSuffixOracle};
    use crate::probe::ProbeError;
    use super::*;

    fn toy_oracle(bs: usize, prefix_len: usize, secret: &[u8]) -> PrefixSuffixOracle<ToyCipher> {
        let key: Vec<u8> = (0..bs as u8).map(|i| i.wrapping_mul(101) ^ 0xa5).collect();
        PrefixSuffixOracle::new(
            ToyCipher::new(&key),
            ModeKind::Ecb,
            Vec::new(),
            vec![0xee; prefix_len],
            secret.to_vec(),
        ).unwrap()
    }

    fn both_rules() -> Vec<Recovery> {
        vec![
            Recovery::new(AttackConfig::default()),
            Recovery::new(AttackConfig::default().with_termination(Termination::KnownLength)),
        ]
    }

    #[test]
    fn test_recover_empty_secret() {
        for recovery in both_rules() {
            assert_eq!(recovery.recover(&toy_oracle(16, 0, b"")), Ok(Vec::new()));
            assert_eq!(recovery.recover_with_prefix(&toy_oracle(16, 9, b"")), Ok(Vec::new()));
        }
    }

    #[test]
    fn test_recover_block_multiple_lengths() {
        for recovery in both_rules() {
            for &bs in &[8, 16, 32] {
                for &len in &[bs - 1, bs, bs + 1, 2 * bs] {
                    let secret: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
                    assert_eq!(recovery.recover(&toy_oracle(bs, 0, &secret)), Ok(secret.clone()));
                    for &prefix_len in &[1, bs - 1, bs, bs + 5] {
                        let oracle = toy_oracle(bs, prefix_len, &secret);
                        assert_eq!(recovery.recover_with_prefix(&oracle), Ok(secret.clone()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_recover_every_byte_value() {
        let secret: Vec<u8> = (u8::MIN..=u8::MAX).rev().collect();
        assert_eq!(recover_secret(&toy_oracle(16, 0, &secret)), Ok(secret.clone()));
        assert_eq!(recover_secret_with_prefix(&toy_oracle(16, 3, &secret)), Ok(secret));
    }

    #[test]
    fn test_recover_secret_ending_in_pad_like_bytes() {
        for secret in &[&b"ends in one\x01"[..], &b"\x02\x02"[..], &b"sixteen bytes!\x01\x01"[..]] {
            assert_eq!(recover_secret(&toy_oracle(16, 0, secret)), Ok(secret.to_vec()));
        }
    }

    #[test]
    fn test_recover_blowfish() {
        let secret = b"Did you stop? No, I just drove by\n";
        let oracle = PrefixSuffixOracle::new(
            RustCryptoBlock::blowfish(b"a blowfish key"),
            ModeKind::Ecb,
            Vec::new(),
            b"some prefix".to_vec(),
            secret.to_vec(),
        ).unwrap();
        assert_eq!(recover_secret_with_prefix(&oracle), Ok(secret.to_vec()));
    }

    #[test]
    fn test_not_ecb() {
        let oracle = PrefixSuffixOracle::new(
            Aes128::new(&[1_u8; 16]).unwrap(),
            ModeKind::Cbc,
            vec![0; 16],
            Vec::new(),
            b"secret".to_vec(),
        ).unwrap();
        assert_eq!(recover_secret(&oracle), Err(RecoverError::NotEcb));
        assert_eq!(recover_secret_with_prefix(&oracle), Err(RecoverError::NotEcb));
    }

    #[test]
    fn test_fixed_output_oracle() {
        let oracle = |_: &[u8]| vec![0_u8; 48];
        assert_eq!(
            recover_secret(&oracle),
            Err(RecoverError::Probe(ProbeError::BlockSizeNotFound(256)))
        );
    }

    #[test]
    fn test_query_budget() {
        let oracle = toy_oracle(16, 0, b"a longer secret than the budget allows");
        let recovery = Recovery::new(AttackConfig::default().with_max_queries(300));
        assert_eq!(
            recovery.recover(&oracle),
            Err(RecoverError::QueryBudgetExceeded(BudgetExhausted(300)))
        );

        // plenty of room
        let recovery = Recovery::new(AttackConfig::default().with_max_queries(256 * 64));
        assert_eq!(recovery.recover(&toy_oracle(16, 0, b"short")), Ok(b"short".to_vec()));
    }

    #[test]
    fn test_query_budget_covers_probes() {
        let inner = toy_oracle(16, 0, b"secret");
        let calls = Cell::new(0);
        let oracle = |input: &[u8]| {
            calls.set(calls.get() + 1);
            inner.encrypt(input)
        };

        // block size discovery alone takes 10 queries here
        let recovery = Recovery::new(AttackConfig::default().with_max_queries(5));
        assert_eq!(
            recovery.recover_with_prefix(&oracle),
            Err(RecoverError::QueryBudgetExceeded(BudgetExhausted(5)))
        );
        assert_eq!(calls.get(), 5);

        calls.set(0);
        assert_eq!(
            recovery.recover(&oracle),
            Err(RecoverError::QueryBudgetExceeded(BudgetExhausted(5)))
        );
        assert_eq!(calls.get(), 5);

        // enough for the probes, not for prefix discovery
        calls.set(0);
        let recovery = Recovery::new(AttackConfig::default().with_max_queries(12));
        assert_eq!(
            recovery.recover_with_prefix(&oracle),
            Err(RecoverError::QueryBudgetExceeded(BudgetExhausted(12)))
        );
        assert_eq!(calls.get(), 12);
    }

    #[test]
    fn test_recover_behind_long_repeated_prefix() {
        let secret = b"behind a wall of 0x17";
        let oracle = PrefixSuffixOracle::new(
            ToyCipher::new(&[0x3c; 16]),
            ModeKind::Ecb,
            Vec::new(),
            vec![0x17; 1925],
            secret.to_vec(),
        ).unwrap();
        assert_eq!(recover_secret_with_prefix(&oracle), Ok(secret.to_vec()));

        let recovery = Recovery::new(AttackConfig::default().with_magic_repetitions(3));
        assert_eq!(recovery.recover_with_prefix(&oracle), Ok(secret.to_vec()));
    }

    #[test]
    fn test_too_few_magic_repetitions() {
        let recovery = Recovery::new(AttackConfig::default().with_magic_repetitions(1));
        assert_eq!(
            recovery.recover_with_prefix(&toy_oracle(16, 5, b"secret")),
            Err(RecoverError::Probe(ProbeError::MagicBlockNotFound))
        );
    }
}
