extern crate crypto as rust_crypto;
extern crate openssl as ssl;
extern crate rand;
extern crate rustc_serialize as serialize;

pub mod config;
pub mod crypto;
pub mod mode;
pub mod oracle;
pub mod probe;
pub mod recover;
pub mod util;

#[cfg(test)]
mod set2;

pub use crate::config::{AttackConfig, Termination};
pub use crate::oracle::Oracle;
pub use crate::probe::{discover_block_size, discover_prefix_length, is_ecb_oracle};
pub use crate::recover::{recover_secret, recover_secret_with_prefix};
