use crate::oracle::{ModeKind, PrefixSuffixOracle};
use crate::probe::is_ecb_oracle;

#[test]
fn run() {
    let runs = 100;

    for _ in 0..runs {
        let oracle = PrefixSuffixOracle::random_mode().unwrap();
        let guess = if is_ecb_oracle(&oracle) { ModeKind::Ecb } else { ModeKind::Cbc };
        assert_eq!(oracle.mode(), guess);
    }

    println!("Successfully guessed the correct AES 128 Mode {} times!", runs);
}
