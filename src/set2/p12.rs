use serialize::base64::FromBase64;

use crate::config::{AttackConfig, Termination};
use crate::oracle::PrefixSuffixOracle;
use crate::probe::discover_block_size;
use crate::recover::{recover_secret, Recovery};

pub const UNKNOWN: &str = "Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkg\
                           aGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBq\
                           dXN0IHRvIHNheSBoaQpEaWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUg\
                           YnkK";

pub const EXPECTED: &str = "Rollin' in my 5.0\n\
                            With my rag-top down so my hair can blow\n\
                            The girlies on standby waving just to say hi\n\
                            Did you stop? No, I just drove by\n";

#[test]
fn run() {
    // unknown text we will attempt to decode with attacker controlled input
    // to the encryption oracle
    let unknown = UNKNOWN.from_base64().unwrap();
    assert_eq!(unknown.len(), 138);

    let oracle = PrefixSuffixOracle::ecb_suffix(&unknown).unwrap();
    assert_eq!(discover_block_size(&oracle), Ok(16));

    let plaintext = recover_secret(&oracle).unwrap();
    assert_eq!(String::from_utf8_lossy(&plaintext), EXPECTED);

    // same oracle, same answer
    assert_eq!(recover_secret(&oracle), Ok(plaintext));
}

#[test]
fn run_known_length() {
    let unknown = UNKNOWN.from_base64().unwrap();
    let oracle = PrefixSuffixOracle::ecb_suffix(&unknown).unwrap();

    let recovery = Recovery::new(AttackConfig::default().with_termination(Termination::KnownLength));
    assert_eq!(recovery.recover(&oracle), Ok(unknown));
}
