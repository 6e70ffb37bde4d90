use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of the random reference suffix.
pub const SUFFIX_LEN: usize = 6;

/// Mints gateway references of the form `{document-id}_{millis}_{suffix}`.
///
/// The millisecond component is strictly increasing per generator, even
/// when the wall clock stalls or steps back, so one generator never mints
/// the same reference twice. The random suffix separates generators
/// running in different processes.
#[derive(Debug, Default)]
pub struct ReferenceGenerator {
    last_millis: AtomicU64,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a reference for `document_id` that differs from every `used` one.
    pub fn mint<'a>(&self, document_id: &str, used: impl IntoIterator<Item = &'a str>) -> String {
        let used: Vec<&str> = used.into_iter().collect();
        loop {
            let reference = format!("{document_id}_{}_{}", self.next_millis(), suffix());
            if !used.contains(&reference.as_str()) {
                return reference;
            }
        }
    }

    fn next_millis(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_millis.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => prev = current,
            }
        }
    }
}

fn suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_shape() {
        let generator = ReferenceGenerator::new();
        let reference = generator.mint("doc-42", []);
        let parts: Vec<&str> = reference.rsplitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), SUFFIX_LEN);
        assert!(parts[0].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2], "doc-42");
    }

    #[test]
    fn consecutive_references_differ() {
        let generator = ReferenceGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generator.mint("doc", [])));
        }
    }

    #[test]
    fn millis_strictly_increase() {
        let generator = ReferenceGenerator::new();
        let a = generator.next_millis();
        let b = generator.next_millis();
        assert!(b > a);
    }

    #[test]
    fn skips_used_references() {
        let generator = ReferenceGenerator::new();
        let first = generator.mint("doc", []);
        let second = generator.mint("doc", [first.as_str()]);
        assert_ne!(first, second);
    }
}
