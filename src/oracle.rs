use std::cell::Cell;
use std::fmt;

use rand::{thread_rng, Rng};
use ssl::error::ErrorStack;
use thiserror::Error;

use crate::crypto::block::{Aes128, BlockCipher};
use crate::crypto::pkcs7;
use crate::mode::{BlockMode, CbcEncrypter, EcbEncrypter, ModeError};

/// A black box that encrypts attacker input alongside hidden data.
///
/// For a fixed input two calls must return identical bytes.
pub trait Oracle {
    fn encrypt(&self, input: &[u8]) -> Vec<u8>;
}

impl<F> Oracle for F
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        self(input)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("oracle query budget of {0} exhausted")]
pub struct BudgetExhausted(pub usize);

/// Counts the queries made through it and optionally refuses to go past a
/// budget.
///
/// A refused `encrypt` returns no bytes without reaching the inner oracle
/// and marks the wrapper exhausted; `check` reports it afterwards, so
/// callers that only see the `Oracle` trait still stay within budget.
pub struct Counted<'a, O: ?Sized> {
    inner: &'a O,
    queries: Cell<usize>,
    refused: Cell<bool>,
    budget: Option<usize>,
}

impl<'a, O: Oracle + ?Sized> Counted<'a, O> {
    pub fn new(inner: &'a O) -> Counted<'a, O> {
        Counted::with_budget(inner, None)
    }

    pub fn with_budget(inner: &'a O, budget: Option<usize>) -> Counted<'a, O> {
        Counted {
            inner: inner,
            queries: Cell::new(0),
            refused: Cell::new(false),
            budget: budget,
        }
    }

    /// Queries that reached the inner oracle.
    pub fn queries(&self) -> usize {
        self.queries.get()
    }

    /// Fails once any query has been refused.
    pub fn check(&self) -> Result<(), BudgetExhausted> {
        match self.budget {
            Some(budget) if self.refused.get() => Err(BudgetExhausted(budget)),
            _ => Ok(()),
        }
    }

    pub fn try_encrypt(&self, input: &[u8]) -> Result<Vec<u8>, BudgetExhausted> {
        let output = self.encrypt(input);
        self.check()?;
        Ok(output)
    }
}

impl<'a, O: Oracle + ?Sized> Oracle for Counted<'a, O> {
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        if let Some(budget) = self.budget {
            if self.queries.get() >= budget {
                self.refused.set(true);
                return Vec::new();
            }
        }
        self.queries.set(self.queries.get() + 1);
        self.inner.encrypt(input)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ModeKind {
    Ecb,
    Cbc,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("openssl: {0}")]
    Ssl(#[from] ErrorStack),
    #[error(transparent)]
    Mode(#[from] ModeError),
}

/// `mode(pad(prefix || input || suffix))` under a fixed key, iv, prefix
/// and suffix.
pub struct PrefixSuffixOracle<B> {
    cipher: B,
    mode: ModeKind,
    iv: Vec<u8>,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

impl<B: BlockCipher> PrefixSuffixOracle<B> {
    /// `iv` is only checked, and only used, for `ModeKind::Cbc`.
    pub fn new(
        cipher: B,
        mode: ModeKind,
        iv: Vec<u8>,
        prefix: Vec<u8>,
        suffix: Vec<u8>,
    ) -> Result<PrefixSuffixOracle<B>, ModeError> {
        if mode == ModeKind::Cbc {
            CbcEncrypter::new(&cipher, &iv)?;
        }
        Ok(PrefixSuffixOracle {
            cipher: cipher,
            mode: mode,
            iv: iv,
            prefix: prefix,
            suffix: suffix,
        })
    }

    /// Which mode this oracle encrypts under. Attacks never look at this;
    /// it is for checking their answers.
    pub fn mode(&self) -> ModeKind {
        self.mode
    }
}

fn random_bytes<R: Rng>(rng: &mut R, n: usize) -> Vec<u8> {
    (0..n).map(|_| rng.gen::<u8>()).collect()
}

impl PrefixSuffixOracle<Aes128> {
    fn random_aes(
        mode: ModeKind,
        prefix: Vec<u8>,
        suffix: Vec<u8>,
    ) -> Result<PrefixSuffixOracle<Aes128>, OracleError> {
        let mut rng = thread_rng();
        let key = rng.gen::<[u8; 16]>();
        let iv = random_bytes(&mut rng, Aes128::BLOCK_SIZE);
        let cipher = Aes128::new(&key)?;
        Ok(PrefixSuffixOracle::new(cipher, mode, iv, prefix, suffix)?)
    }

    /// AES-128-ECB(input || secret) under a random key.
    pub fn ecb_suffix(secret: &[u8]) -> Result<PrefixSuffixOracle<Aes128>, OracleError> {
        PrefixSuffixOracle::random_aes(ModeKind::Ecb, Vec::new(), secret.to_vec())
    }

    /// AES-128-ECB(prefix || input || secret) under a random key, with a
    /// random prefix of 1 to 50 bytes.
    pub fn ecb_prefix_suffix(secret: &[u8]) -> Result<PrefixSuffixOracle<Aes128>, OracleError> {
        let mut rng = thread_rng();
        let prefix_len = rng.gen_range(1..=50);
        let prefix = random_bytes(&mut rng, prefix_len);
        PrefixSuffixOracle::random_aes(ModeKind::Ecb, prefix, secret.to_vec())
    }

    /// 5 to 10 random bytes on each side of the input, then AES-128 in
    /// `mode` with a random key and iv.
    pub fn with_mode(mode: ModeKind) -> Result<PrefixSuffixOracle<Aes128>, OracleError> {
        let mut rng = thread_rng();
        let pad_left_len = rng.gen_range(5..=10);
        let pad_left = random_bytes(&mut rng, pad_left_len);
        let pad_right_len = rng.gen_range(5..=10);
        let pad_right = random_bytes(&mut rng, pad_right_len);
        PrefixSuffixOracle::random_aes(mode, pad_left, pad_right)
    }

    /// `with_mode` with ECB or CBC picked by a coin flip.
    pub fn random_mode() -> Result<PrefixSuffixOracle<Aes128>, OracleError> {
        let mode = if thread_rng().gen::<bool>() { ModeKind::Ecb } else { ModeKind::Cbc };
        PrefixSuffixOracle::with_mode(mode)
    }
}

impl<B: BlockCipher> Oracle for PrefixSuffixOracle<B> {
    fn encrypt(&self, input: &[u8]) -> Vec<u8> {
        let mut m: Vec<u8> = Vec::with_capacity(self.prefix.len() + input.len() + self.suffix.len());
        m.extend_from_slice(&self.prefix);
        m.extend_from_slice(input);
        m.extend_from_slice(&self.suffix);

        let mut m = pkcs7::pad(m, self.cipher.block_size());

        let res = match self.mode {
            ModeKind::Ecb => EcbEncrypter::new(&self.cipher).crypt_in_place(&mut m),
            ModeKind::Cbc => CbcEncrypter::new(&self.cipher, &self.iv)
                .and_then(|mut mode| mode.crypt_in_place(&mut m)),
        };
        res.expect("iv checked on construction and input padded to full blocks");

        m
    }
}

impl<B: BlockCipher> fmt::Debug for PrefixSuffixOracle<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrefixSuffixOracle")
            .field("mode", &self.mode)
            .field("block_size", &self.cipher.block_size())
            .finish()
    }
}
