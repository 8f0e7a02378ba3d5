//! Runtime cipher capability detection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use once_cell::sync::OnceCell;

/// Cipher names containing this marker belong to draft JWE algorithms.
const DRAFT_CIPHER_MARKER: &str = "chacha";

/// One-shot advisory for draft cipher families.
pub(crate) struct DraftAdvisory {
    warned: AtomicBool,
    emitted: AtomicUsize,
}

impl DraftAdvisory {
    pub(crate) const fn new() -> Self {
        DraftAdvisory {
            warned: AtomicBool::new(false),
            emitted: AtomicUsize::new(0),
        }
    }

    fn warn(&self, cipher: &str) {
        if self
            .warned
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.emitted.fetch_add(1, Ordering::AcqRel);
        tracing::warn!(
            cipher,
            "JWE algorithms based on ChaCha20-Poly1305 are drafts and may change in incompatible ways"
        );
    }

    /// Number of advisories emitted so far (0 or 1).
    #[cfg(test)]
    pub(crate) fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Acquire)
    }
}

/// Shared by every [`CipherCapability`], whatever engine it belongs to.
pub(crate) static DRAFT_ADVISORY: DraftAdvisory = DraftAdvisory::new();

/// Set of symmetric ciphers a crypto engine can run.
///
/// The set is built by the engine's detection function on first use and kept for the lifetime of the
/// process. Querying a draft cipher family logs an advisory once per process, whatever
/// the answer, however many engines exist and however many threads ask at the same time.
pub struct CipherCapability {
    detect: fn() -> Vec<&'static str>,
    ciphers: OnceCell<HashSet<&'static str>>,
    advisory: Option<&'static DraftAdvisory>,
}

impl CipherCapability {
    pub const fn new(detect: fn() -> Vec<&'static str>) -> Self {
        CipherCapability {
            detect,
            ciphers: OnceCell::new(),
            advisory: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_advisory(
        detect: fn() -> Vec<&'static str>,
        advisory: &'static DraftAdvisory,
    ) -> Self {
        CipherCapability {
            detect,
            ciphers: OnceCell::new(),
            advisory: Some(advisory),
        }
    }

    fn advisory(&self) -> &'static DraftAdvisory {
        self.advisory.unwrap_or(&DRAFT_ADVISORY)
    }

    /// Return `true` if the engine supports `cipher` (OpenSSL-style name, e.g. `aes-128-gcm`).
    pub fn supports(&self, cipher: &str) -> bool {
        if cipher.contains(DRAFT_CIPHER_MARKER) {
            self.advisory().warn(cipher);
        }
        self.ciphers().contains(cipher)
    }

    /// All supported cipher names.
    pub fn ciphers(&self) -> &HashSet<&'static str> {
        self.ciphers
            .get_or_init(|| (self.detect)().into_iter().collect())
    }
}

impl std::fmt::Debug for CipherCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherCapability")
            .field("ciphers", &self.ciphers.get())
            .field("draft_warned", &self.advisory().warned.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed() -> Vec<&'static str> {
        vec!["aes-128-gcm", "aes-256-gcm", "chacha20-poly1305"]
    }

    fn nothing_listed() -> Vec<&'static str> {
        vec![]
    }

    fn fresh_advisory() -> &'static DraftAdvisory {
        Box::leak(Box::new(DraftAdvisory::new()))
    }

    #[test]
    fn supports_listed_ciphers() {
        let advisory = fresh_advisory();
        let caps = CipherCapability::with_advisory(listed, advisory);
        assert!(caps.supports("aes-128-gcm"));
        assert!(caps.supports("aes-256-gcm"));
        assert!(!caps.supports("aes-192-gcm"));
        assert_eq!(advisory.emitted(), 0);
    }

    #[test]
    fn advisory_once_sequential() {
        for n in [1usize, 10, 1000] {
            let advisory = fresh_advisory();
            let caps = CipherCapability::with_advisory(listed, advisory);
            for _ in 0..n {
                assert!(caps.supports("chacha20-poly1305"));
            }
            assert_eq!(advisory.emitted(), 1);
        }
    }

    #[test]
    fn advisory_once_concurrent() {
        for n in [1usize, 10, 1000] {
            let advisory = fresh_advisory();
            let caps = CipherCapability::with_advisory(listed, advisory);
            let threads = n.min(16);
            std::thread::scope(|s| {
                for t in 0..threads {
                    let caps = &caps;
                    s.spawn(move || {
                        let mut i = t;
                        while i < n {
                            caps.supports("chacha20-poly1305");
                            i += threads;
                        }
                    });
                }
            });
            assert_eq!(advisory.emitted(), 1);
        }
    }

    #[test]
    fn advisory_is_independent_of_support() {
        let advisory = fresh_advisory();
        let caps = CipherCapability::with_advisory(nothing_listed, advisory);
        assert!(!caps.supports("xchacha20-poly1305"));
        assert!(!caps.supports("chacha20-poly1305"));
        assert_eq!(advisory.emitted(), 1);
    }

    #[test]
    fn advisory_is_shared_across_instances() {
        let advisory = fresh_advisory();
        let first = CipherCapability::with_advisory(listed, advisory);
        let second = CipherCapability::with_advisory(nothing_listed, advisory);
        first.supports("chacha20-poly1305");
        second.supports("chacha20-poly1305");
        second.supports("xchacha20-poly1305");
        assert_eq!(advisory.emitted(), 1);
    }

    #[test]
    fn advisory_is_once_per_process() {
        static FIRST: CipherCapability = CipherCapability::new(listed);
        static SECOND: CipherCapability = CipherCapability::new(nothing_listed);
        FIRST.supports("chacha20-poly1305");
        SECOND.supports("chacha20-poly1305");
        assert_eq!(DRAFT_ADVISORY.emitted(), 1);
    }
}
