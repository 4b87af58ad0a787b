// ============================================================================
// src/vault/shared.rs – one vault shared by several owners, wiped on last release
// ============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::vault::PasswordVault;

struct Inner {
    vault: Mutex<PasswordVault>,
    holders: AtomicUsize,
}

/// Shared handle to a [`PasswordVault`].
///
/// Owners call [`hold`](SharedVault::hold) and keep the returned
/// [`VaultHold`] for as long as they need the password. When the last hold
/// is dropped the vault forgets its password and key.
#[derive(Clone)]
pub struct SharedVault {
    inner: Arc<Inner>,
}

impl SharedVault {
    pub fn new(vault: PasswordVault) -> Self {
        Self {
            inner: Arc::new(Inner {
                vault: Mutex::new(vault),
                holders: AtomicUsize::new(0),
            }),
        }
    }

    pub fn hold(&self) -> VaultHold {
        let holders = self.inner.holders.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(holders, "vault held");
        VaultHold {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn holders(&self) -> usize {
        self.inner.holders.load(Ordering::SeqCst)
    }

    /// Lock the vault without taking a hold.
    pub fn lock(&self) -> MutexGuard<'_, PasswordVault> {
        lock_vault(&self.inner)
    }
}

/// Scope guard returned by [`SharedVault::hold`].
pub struct VaultHold {
    inner: Arc<Inner>,
}

impl VaultHold {
    pub fn lock(&self) -> MutexGuard<'_, PasswordVault> {
        lock_vault(&self.inner)
    }
}

impl Drop for VaultHold {
    fn drop(&mut self) {
        let before = self.inner.holders.fetch_sub(1, Ordering::SeqCst);
        debug!(holders = before - 1, "vault released");
        if before == 1 {
            let mut vault = lock_vault(&self.inner);
            // A new hold may have been taken before the lock was acquired.
            if self.inner.holders.load(Ordering::SeqCst) == 0 {
                vault.forget_password();
            }
        }
    }
}

// Poisoned locks are recovered; every vault method leaves a consistent state.
fn lock_vault(inner: &Inner) -> MutexGuard<'_, PasswordVault> {
    inner.vault.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::KdfParams;

    fn keyed_vault() -> PasswordVault {
        let mut vault = PasswordVault::with_params(KdfParams {
            iterations: 1,
            ..KdfParams::default()
        });
        vault.set_password("shared");
        vault.add_salt().unwrap();
        vault.encrypt("warm up").unwrap();
        vault
    }

    #[test]
    fn last_release_forgets_password() {
        let shared = SharedVault::new(keyed_vault());
        let first = shared.hold();
        let second = shared.clone().hold();
        assert_eq!(shared.holders(), 2);

        drop(first);
        assert!(shared.lock().has_key());

        drop(second);
        assert_eq!(shared.holders(), 0);
        assert!(!shared.lock().has_key());
        assert!(shared.lock().get_password().is_none());
    }

    #[test]
    fn release_happens_on_early_return() {
        fn use_vault(shared: &SharedVault, fail: bool) -> Result<(), &'static str> {
            let hold = shared.hold();
            if fail {
                return Err("bail");
            }
            hold.lock().encrypt("x").map_err(|_| "encrypt")?;
            Ok(())
        }

        let shared = SharedVault::new(keyed_vault());
        assert!(use_vault(&shared, true).is_err());
        assert_eq!(shared.holders(), 0);
        assert!(!shared.lock().has_key());
    }

    #[test]
    fn hold_taken_during_last_release_keeps_password() {
        let shared = SharedVault::new(keyed_vault());
        let only = shared.hold();

        let mut guard = shared.lock();
        let releaser = std::thread::spawn(move || drop(only));
        while shared.holders() != 0 {
            std::thread::yield_now();
        }
        // The releasing thread is now waiting for the vault lock.
        let next = shared.hold();
        guard.set_password("still-held");
        drop(guard);
        releaser.join().unwrap();

        assert_eq!(shared.holders(), 1);
        assert_eq!(
            shared.lock().get_password().unwrap().as_str(),
            "still-held"
        );

        drop(next);
        assert!(shared.lock().get_password().is_none());
    }

    #[test]
    fn holds_work_across_threads() {
        let shared = SharedVault::new(keyed_vault());
        let outer = shared.hold();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    let hold = shared.hold();
                    let code = hold.lock().encrypt("threaded").unwrap();
                    assert_eq!(hold.lock().decrypt(&code).unwrap(), "threaded");
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.holders(), 1);
        assert!(outer.lock().has_key());
    }
}
