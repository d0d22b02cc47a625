use rand::{thread_rng, Rng};
use serialize::base64::FromBase64;

use crate::crypto::block::Aes128;
use crate::oracle::{ModeKind, PrefixSuffixOracle};
use crate::probe::discover_prefix_length;
use crate::recover::recover_secret_with_prefix;

use super::p12::{EXPECTED, UNKNOWN};

#[test]
fn run() {
    let unknown = UNKNOWN.from_base64().unwrap();
    let mut rng = thread_rng();

    for _ in 0..5 {
        let key = rng.gen::<[u8; 16]>();
        let prefix = {
            let prefix_len: usize = rng.gen_range(1..=50);
            (0..prefix_len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>()
        };

        let oracle = PrefixSuffixOracle::new(
            Aes128::new(&key).unwrap(),
            ModeKind::Ecb,
            Vec::new(),
            prefix.clone(),
            unknown.clone(),
        ).unwrap();

        assert_eq!(discover_prefix_length(&oracle, 16), Ok(prefix.len()));

        let plaintext = recover_secret_with_prefix(&oracle).unwrap();
        assert_eq!(String::from_utf8_lossy(&plaintext), EXPECTED);
    }
}

#[test]
fn run_random_prefix() {
    let unknown = UNKNOWN.from_base64().unwrap();
    let oracle = PrefixSuffixOracle::ecb_prefix_suffix(&unknown).unwrap();
    assert_eq!(recover_secret_with_prefix(&oracle), Ok(unknown));
}
