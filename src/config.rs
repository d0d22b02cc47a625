/// When byte-at-a-time recovery decides the secret is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop at the first round where no candidate byte matches, then strip
    /// the PKCS#7 byte(s) that were recovered on the way out.
    NoMatch,
    /// Measure the secret length up front from ciphertext length growth and
    /// recover exactly that many bytes.
    KnownLength,
}

#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// How many copies of the reference block the prefix probe submits.
    pub magic_repetitions: usize,
    /// Upper bound on oracle queries for one recovery. `None` is unbounded.
    pub max_queries: Option<usize>,
    pub termination: Termination,
}

impl Default for AttackConfig {
    fn default() -> AttackConfig {
        AttackConfig {
            magic_repetitions: 100,
            max_queries: None,
            termination: Termination::NoMatch,
        }
    }
}

impl AttackConfig {
    pub fn with_magic_repetitions(mut self, n: usize) -> AttackConfig {
        self.magic_repetitions = n;
        self
    }

    pub fn with_max_queries(mut self, n: usize) -> AttackConfig {
        self.max_queries = Some(n);
        self
    }

    pub fn with_termination(mut self, termination: Termination) -> AttackConfig {
        self.termination = termination;
        self
    }
}

#[test]
fn test_config_builder() {
    let config = AttackConfig::default()
        .with_max_queries(10)
        .with_termination(Termination::KnownLength);
    assert_eq!(config.magic_repetitions, 100);
    assert_eq!(config.max_queries, Some(10));
    assert_eq!(config.termination, Termination::KnownLength);
}
