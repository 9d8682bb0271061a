/// Accounts seeded for one run.
///
/// Emails are `loadtest+<run_id>+<i>@example.com` for `i` in `1..=size`, so a
/// pool is reproducible from its run id and disjoint from other runs' pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPool {
    emails: Vec<String>,
}

impl UserPool {
    pub fn generate(run_id: &str, size: usize) -> Self {
        let emails = (1..=size)
            .map(|i| format!("loadtest+{run_id}+{i}@example.com"))
            .collect();
        Self { emails }
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Account assigned to a virtual user, `None` for an empty pool.
    pub fn for_vu(&self, vu_id: u64) -> Option<&str> {
        if self.emails.is_empty() {
            return None;
        }
        self.emails
            .get(select_index(vu_id, self.emails.len()))
            .map(String::as_str)
    }
}

/// Round-robin slot for a 1-based virtual user id: `(vu_id - 1) mod pool_size`.
///
/// `pool_size` must be non-zero. Id 0 maps to slot 0.
pub fn select_index(vu_id: u64, pool_size: usize) -> usize {
    (vu_id.saturating_sub(1) % pool_size as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[test]
    fn test_generate_format_and_order() {
        let pool = UserPool::generate("1700000000000", 3);
        assert_eq!(
            pool.emails(),
            &[
                "loadtest+1700000000000+1@example.com",
                "loadtest+1700000000000+2@example.com",
                "loadtest+1700000000000+3@example.com",
            ]
        );
    }

    #[test]
    fn test_generate_is_deterministic_and_distinct() {
        let a = UserPool::generate("run-a", 20);
        assert_eq!(a, UserPool::generate("run-a", 20));
        assert_eq!(a.emails().iter().collect::<HashSet<_>>().len(), 20);

        let b = UserPool::generate("run-b", 20);
        assert!(a.emails().iter().all(|e| !b.emails().contains(e)));
    }

    #[rstest]
    #[case(1, 20, 0)]
    #[case(2, 20, 1)]
    #[case(20, 20, 19)]
    #[case(21, 20, 0)]
    #[case(50, 20, 9)]
    #[case(7, 1, 0)]
    #[case(0, 5, 0)]
    fn test_select_index(#[case] vu: u64, #[case] size: usize, #[case] expected: usize) {
        assert_eq!(select_index(vu, size), expected);
    }

    #[test]
    fn test_for_vu() {
        let pool = UserPool::generate("r", 2);
        assert_eq!(pool.for_vu(1), Some("loadtest+r+1@example.com"));
        assert_eq!(pool.for_vu(2), Some("loadtest+r+2@example.com"));
        assert_eq!(pool.for_vu(3), Some("loadtest+r+1@example.com"));
        assert_eq!(UserPool::generate("r", 0).for_vu(1), None);
    }
}
