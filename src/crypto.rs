pub mod pkcs7 {
    pub fn pad(mut data: Vec<u8>, blocksize: usize) -> Vec<u8> {
        assert!(blocksize > 0 && blocksize < 256);

        let len = data.len();
        let rem = len % blocksize;
        let pad = (blocksize - rem) as u8;

        for _ in 0..pad {
            data.push(pad);
        }

        data
    }

    pub fn unpad(mut data: Vec<u8>) -> Option<Vec<u8>> {
        let len = data.len();
        let pad = *data.last()? as usize;
        if pad > len || pad == 0 {
            return None;
        }
        for i in 0..pad {
            let idx = len - i - 1;
            if data[idx] != pad as u8 {
                return None;
            }
        }
        data.truncate(len - pad);
        Some(data)
    }
}

pub mod block {
    use std::cell::RefCell;

    use rust_crypto::aessafe::{AesSafe128Decryptor, AesSafe128Encryptor};
    use rust_crypto::blowfish::Blowfish;
    use rust_crypto::symmetriccipher::{BlockDecryptor, BlockEncryptor};
    use ssl::error::ErrorStack;
    use ssl::symm::{Cipher, Crypter, Mode};

    /// A keyed permutation over one fixed-size block.
    ///
    /// Both directions transform `block` in place; callers guarantee
    /// `block.len() == self.block_size()`.
    pub trait BlockCipher {
        fn block_size(&self) -> usize;

        fn encrypt_block(&self, block: &mut [u8]);

        fn decrypt_block(&self, block: &mut [u8]);
    }

    impl<'a, B: BlockCipher + ?Sized> BlockCipher for &'a B {
        fn block_size(&self) -> usize {
            (**self).block_size()
        }

        fn encrypt_block(&self, block: &mut [u8]) {
            (**self).encrypt_block(block)
        }

        fn decrypt_block(&self, block: &mut [u8]) {
            (**self).decrypt_block(block)
        }
    }

    /// AES-128 over a pair of OpenSSL ECB crypters with padding disabled.
    pub struct Aes128 {
        enc: RefCell<Crypter>,
        dec: RefCell<Crypter>,
    }

    impl Aes128 {
        pub const BLOCK_SIZE: usize = 16;

        pub fn new(key: &[u8; 16]) -> Result<Aes128, ErrorStack> {
            let mut enc = Crypter::new(Cipher::aes_128_ecb(), Mode::Encrypt, key, None)?;
            enc.pad(false);
            let mut dec = Crypter::new(Cipher::aes_128_ecb(), Mode::Decrypt, key, None)?;
            dec.pad(false);

            Ok(Aes128 {
                enc: RefCell::new(enc),
                dec: RefCell::new(dec),
            })
        }

        fn update(crypter: &RefCell<Crypter>, block: &mut [u8]) {
            assert_eq!(block.len(), Self::BLOCK_SIZE);

            // openssl wants room for one extra block of output
            let mut out = [0_u8; 2 * Aes128::BLOCK_SIZE];
            let n = crypter
                .borrow_mut()
                .update(block, &mut out)
                .expect("unpadded aes-128-ecb update on a full block");
            debug_assert_eq!(n, Self::BLOCK_SIZE);

            block.copy_from_slice(&out[..Self::BLOCK_SIZE]);
        }
    }

    impl BlockCipher for Aes128 {
        fn block_size(&self) -> usize {
            Self::BLOCK_SIZE
        }

        fn encrypt_block(&self, block: &mut [u8]) {
            Aes128::update(&self.enc, block)
        }

        fn decrypt_block(&self, block: &mut [u8]) {
            Aes128::update(&self.dec, block)
        }
    }

    /// Adapts a rust-crypto encryptor/decryptor pair to `BlockCipher`.
    pub struct RustCryptoBlock<E, D> {
        enc: E,
        dec: D,
    }

    impl<E: BlockEncryptor, D: BlockDecryptor> RustCryptoBlock<E, D> {
        pub fn new(enc: E, dec: D) -> RustCryptoBlock<E, D> {
            assert_eq!(enc.block_size(), dec.block_size());
            RustCryptoBlock { enc: enc, dec: dec }
        }
    }

    impl RustCryptoBlock<AesSafe128Encryptor, AesSafe128Decryptor> {
        pub fn aes_safe128(key: &[u8; 16]) -> Self {
            RustCryptoBlock::new(AesSafe128Encryptor::new(key), AesSafe128Decryptor::new(key))
        }
    }

    impl RustCryptoBlock<Blowfish, Blowfish> {
        /// Blowfish has an 8 byte block. `key` must be 4 to 56 bytes.
        pub fn blowfish(key: &[u8]) -> Self {
            RustCryptoBlock::new(Blowfish::new(key), Blowfish::new(key))
        }
    }

    impl<E: BlockEncryptor, D: BlockDecryptor> BlockCipher for RustCryptoBlock<E, D> {
        fn block_size(&self) -> usize {
            self.enc.block_size()
        }

        fn encrypt_block(&self, block: &mut [u8]) {
            let input = block.to_vec();
            self.enc.encrypt_block(&input, block);
        }

        fn decrypt_block(&self, block: &mut [u8]) {
            let input = block.to_vec();
            self.dec.decrypt_block(&input, block);
        }
    }

    /// Small keyed ARX permutation with a block as wide as its key. Equal
    /// blocks map to equal blocks and distinct blocks to distinct ones,
    /// which is all the mode and attack tests need from a cipher.
    #[cfg(test)]
    pub struct ToyCipher {
        key: Vec<u8>,
    }

    #[cfg(test)]
    impl ToyCipher {
        const ROUNDS: usize = 4;

        pub fn new(key: &[u8]) -> ToyCipher {
            assert!(!key.is_empty());
            ToyCipher { key: key.to_vec() }
        }
    }

    #[cfg(test)]
    impl BlockCipher for ToyCipher {
        fn block_size(&self) -> usize {
            self.key.len()
        }

        fn encrypt_block(&self, block: &mut [u8]) {
            for _ in 0..Self::ROUNDS {
                for (b, k) in block.iter_mut().zip(self.key.iter()) {
                    *b = (*b ^ k).rotate_left(3);
                }
                for i in 1..block.len() {
                    block[i] = block[i].wrapping_add(block[i - 1]);
                }
                block.rotate_left(1);
            }
        }

        fn decrypt_block(&self, block: &mut [u8]) {
            for _ in 0..Self::ROUNDS {
                block.rotate_right(1);
                for i in (1..block.len()).rev() {
                    block[i] = block[i].wrapping_sub(block[i - 1]);
                }
                for (b, k) in block.iter_mut().zip(self.key.iter()) {
                    *b = b.rotate_right(3) ^ k;
                }
            }
        }
    }
}
