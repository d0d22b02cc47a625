use std::error::Error;

use rustc_serialize::base64::FromBase64;
use tracing::info;

use cryptopals_ecb::oracle::PrefixSuffixOracle;
use cryptopals_ecb::probe::{discover_block_size, is_ecb_oracle};
use cryptopals_ecb::recover_secret_with_prefix;

const UNKNOWN: &str = "Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkg\
                       aGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBq\
                       dXN0IHRvIHNheSBoaQpEaWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUg\
                       YnkK";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let unknown = UNKNOWN.from_base64()?;
    let oracle = PrefixSuffixOracle::ecb_prefix_suffix(&unknown)?;

    let blocksize = discover_block_size(&oracle)?;
    info!(blocksize, ecb = is_ecb_oracle(&oracle), "probed oracle");

    let plaintext = recover_secret_with_prefix(&oracle)?;
    print!("{}", String::from_utf8_lossy(&plaintext));

    Ok(())
}
