//! Electronic codebook and cipher block chaining over a raw `BlockCipher`.
//!
//! Every engine works on whole blocks only; padding is the caller's problem.

use std::ops::Range;

use thiserror::Error;

use crate::crypto::block::BlockCipher;
use crate::util::xor_in_place;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ModeError {
    #[error("input not full blocks: {len} is not a multiple of {block_size}")]
    InvalidInputLength { len: usize, block_size: usize },
    #[error("output smaller than input: {dst} < {src}")]
    BufferTooSmall { dst: usize, src: usize },
    #[error("invalid buffer overlap")]
    InvalidOverlap,
    #[error("invalid iv length: {got}, expected {expected}")]
    InvalidIvLength { got: usize, expected: usize },
}

fn check_lengths(block_size: usize, dst: usize, src: usize) -> Result<(), ModeError> {
    if src % block_size != 0 {
        return Err(ModeError::InvalidInputLength { len: src, block_size: block_size });
    }
    if dst < src {
        return Err(ModeError::BufferTooSmall { dst: dst, src: src });
    }
    Ok(())
}

pub trait BlockMode {
    fn block_size(&self) -> usize;

    /// Transforms `src` into the first `src.len()` bytes of `dst`.
    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), ModeError>;

    fn crypt_in_place(&mut self, buf: &mut [u8]) -> Result<(), ModeError>;

    /// Transforms `buf[src]` into `buf[dest..dest + src.len()]`, like
    /// `slice::copy_within`. The two regions must either coincide exactly
    /// or not overlap at all.
    ///
    /// # Panics
    ///
    /// Panics if `src` is out of bounds of `buf`.
    fn crypt_within(&mut self, buf: &mut [u8], src: Range<usize>, dest: usize) -> Result<(), ModeError> {
        assert!(src.start <= src.end && src.end <= buf.len(), "src is out of bounds");

        let len = src.end - src.start;
        check_lengths(self.block_size(), buf.len().saturating_sub(dest), len)?;
        if len == 0 {
            return Ok(());
        }

        if dest == src.start {
            self.crypt_in_place(&mut buf[src])
        } else if dest >= src.end {
            let (head, tail) = buf.split_at_mut(dest);
            self.crypt_blocks(&mut tail[..len], &head[src])
        } else if dest + len <= src.start {
            let (head, tail) = buf.split_at_mut(src.start);
            self.crypt_blocks(&mut head[dest..dest + len], &tail[..len])
        } else {
            Err(ModeError::InvalidOverlap)
        }
    }
}

pub struct EcbEncrypter<B> {
    cipher: B,
}

impl<B: BlockCipher> EcbEncrypter<B> {
    pub fn new(cipher: B) -> EcbEncrypter<B> {
        EcbEncrypter { cipher: cipher }
    }
}

impl<B: BlockCipher> BlockMode for EcbEncrypter<B> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), ModeError> {
        check_lengths(self.block_size(), dst.len(), src.len())?;
        let dst = &mut dst[..src.len()];
        dst.copy_from_slice(src);
        self.crypt_in_place(dst)
    }

    fn crypt_in_place(&mut self, buf: &mut [u8]) -> Result<(), ModeError> {
        let bs = self.block_size();
        check_lengths(bs, buf.len(), buf.len())?;
        for block in buf.chunks_exact_mut(bs) {
            self.cipher.encrypt_block(block);
        }
        Ok(())
    }
}

pub struct EcbDecrypter<B> {
    cipher: B,
}

impl<B: BlockCipher> EcbDecrypter<B> {
    pub fn new(cipher: B) -> EcbDecrypter<B> {
        EcbDecrypter { cipher: cipher }
    }
}

impl<B: BlockCipher> BlockMode for EcbDecrypter<B> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), ModeError> {
        check_lengths(self.block_size(), dst.len(), src.len())?;
        let dst = &mut dst[..src.len()];
        dst.copy_from_slice(src);
        self.crypt_in_place(dst)
    }

    fn crypt_in_place(&mut self, buf: &mut [u8]) -> Result<(), ModeError> {
        let bs = self.block_size();
        check_lengths(bs, buf.len(), buf.len())?;
        for block in buf.chunks_exact_mut(bs) {
            self.cipher.decrypt_block(block);
        }
        Ok(())
    }
}

fn check_iv(block_size: usize, iv: &[u8]) -> Result<Vec<u8>, ModeError> {
    if iv.len() != block_size {
        return Err(ModeError::InvalidIvLength { got: iv.len(), expected: block_size });
    }
    Ok(iv.to_vec())
}

/// CBC encryption. The chaining block carries over between calls, so one
/// encrypter is one logical stream.
pub struct CbcEncrypter<B> {
    cipher: B,
    iv: Vec<u8>,
}

impl<B: BlockCipher> CbcEncrypter<B> {
    pub fn new(cipher: B, iv: &[u8]) -> Result<CbcEncrypter<B>, ModeError> {
        let iv = check_iv(cipher.block_size(), iv)?;
        Ok(CbcEncrypter { cipher: cipher, iv: iv })
    }
}

impl<B: BlockCipher> BlockMode for CbcEncrypter<B> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), ModeError> {
        check_lengths(self.block_size(), dst.len(), src.len())?;
        let dst = &mut dst[..src.len()];
        dst.copy_from_slice(src);
        self.crypt_in_place(dst)
    }

    fn crypt_in_place(&mut self, buf: &mut [u8]) -> Result<(), ModeError> {
        let bs = self.block_size();
        check_lengths(bs, buf.len(), buf.len())?;
        for block in buf.chunks_exact_mut(bs) {
            xor_in_place(block, &self.iv);
            self.cipher.encrypt_block(block);
            self.iv.copy_from_slice(block);
        }
        Ok(())
    }
}

/// CBC decryption. After each call the chaining block is the last
/// ciphertext block of that call, so a message may be fed in pieces.
pub struct CbcDecrypter<B> {
    cipher: B,
    iv: Vec<u8>,
}

impl<B: BlockCipher> CbcDecrypter<B> {
    pub fn new(cipher: B, iv: &[u8]) -> Result<CbcDecrypter<B>, ModeError> {
        let iv = check_iv(cipher.block_size(), iv)?;
        Ok(CbcDecrypter { cipher: cipher, iv: iv })
    }
}

impl<B: BlockCipher> BlockMode for CbcDecrypter<B> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), ModeError> {
        let bs = self.block_size();
        check_lengths(bs, dst.len(), src.len())?;
        if src.is_empty() {
            return Ok(());
        }

        for (i, (out, block)) in dst.chunks_exact_mut(bs).zip(src.chunks_exact(bs)).enumerate() {
            out.copy_from_slice(block);
            self.cipher.decrypt_block(out);
            if i == 0 {
                xor_in_place(out, &self.iv);
            } else {
                xor_in_place(out, &src[(i - 1) * bs..i * bs]);
            }
        }

        self.iv.copy_from_slice(&src[src.len() - bs..]);
        Ok(())
    }

    fn crypt_in_place(&mut self, buf: &mut [u8]) -> Result<(), ModeError> {
        let bs = self.block_size();
        check_lengths(bs, buf.len(), buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }

        // Walk backwards so each ciphertext block is still intact when the
        // block after it needs it for the xor.
        let next_iv = buf[buf.len() - bs..].to_vec();
        let mut start = buf.len() - bs;
        while start > 0 {
            let (prev, cur) = buf.split_at_mut(start);
            let block = &mut cur[..bs];
            self.cipher.decrypt_block(block);
            xor_in_place(block, &prev[start - bs..]);
            start -= bs;
        }

        let first = &mut buf[..bs];
        self.cipher.decrypt_block(first);
        xor_in_place(first, &self.iv);

        self.iv = next_iv;
        Ok(())
    }
}
