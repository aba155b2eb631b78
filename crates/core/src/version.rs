//! Optimistic concurrency for stored records.
//!
//! Every stored row carries a version that starts at 1 on insert and grows by
//! one on each update. A writer that read version `n` asks for
//! `ExpectedVersion::Exact(n)`; the store refuses the write if anyone else got
//! there first.

/// Version a row starts at when inserted.
pub const INITIAL_VERSION: u64 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Last writer wins.
    Any,
    /// Only write over exactly this version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_only_matches_its_own_version() {
        assert!(ExpectedVersion::Any.matches(7));
        assert!(ExpectedVersion::Exact(INITIAL_VERSION).matches(1));
        assert!(!ExpectedVersion::Exact(1).matches(2));
    }
}
