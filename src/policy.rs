//! TTL policy for freshly generated responses.

/// One day.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Chooses how long a newly generated response stays servable.
pub trait TtlPolicy: Send + Sync {
    fn ttl_secs(&self, prompt: &str) -> u64;
}

/// The same lifetime for every prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTtl {
    secs: u64,
}

impl FixedTtl {
    pub fn new(secs: u64) -> Self {
        Self { secs }
    }
}

impl Default for FixedTtl {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

impl TtlPolicy for FixedTtl {
    fn ttl_secs(&self, _prompt: &str) -> u64 {
        self.secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ttl_ignores_prompt() {
        let policy = FixedTtl::new(30);
        assert_eq!(policy.ttl_secs("hello"), 30);
        assert_eq!(policy.ttl_secs("what is recursion"), 30);
    }

    #[test]
    fn test_default_is_one_day() {
        assert_eq!(FixedTtl::default().ttl_secs("x"), 86_400);
    }
}
