//! End-to-end runs of the attacks against AES-128 oracles with random keys.

mod p11;
mod p12;
mod p14;
