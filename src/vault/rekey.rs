// ============================================================================
// src/vault/rekey.rs – set, change or clear the password over all private fields
// ============================================================================

use tracing::{debug, info, warn};

use crate::error::{VaultError, VaultResult};
use crate::store::{FieldStore, FieldValue, RecordStore};
use crate::vault::{KdfParams, PasswordVault, SharedVault};

/// Counts of fields touched by [`change_password`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RekeyReport {
    pub decrypted: usize,
    pub encrypted: usize,
}

/// Move every private field from `old` to `new`.
///
/// - `old` given: it must match the stored record; all encrypted fields are
///   decrypted and the record removed.
/// - `old` absent: there must be no stored record.
/// - `new` given: a fresh record is stored and all plain fields encrypted.
///
/// A keyed `shared` vault is moved to `new`, or made to forget when the
/// password is cleared.
pub fn change_password<S>(
    store: &mut S,
    old: Option<&str>,
    new: Option<&str>,
    params: KdfParams,
    shared: Option<&SharedVault>,
) -> VaultResult<RekeyReport>
where
    S: RecordStore + FieldStore,
{
    let mut report = RekeyReport::default();
    let mut vault = PasswordVault::with_params(params);

    match old {
        Some(old) => {
            if !vault.has_password(&*store)? {
                warn!("old password given but no password is stored");
                return Err(VaultError::WrongPassword);
            }
            vault.set_password(old);
            if !vault.check_password(&*store)? {
                return Err(VaultError::WrongPassword);
            }
            report.decrypted = decrypt_all(&mut vault, store)?;
            vault.remove_password(store)?;
            vault.forget_password();
        }
        None => {
            if vault.has_password(&*store)? {
                warn!("a password is stored; the old password is required");
                return Err(VaultError::WrongPassword);
            }
        }
    }

    if let Some(new) = new {
        vault = PasswordVault::with_params(params);
        vault.set_password(new);
        vault.store_password(store)?;
        report.encrypted = encrypt_all(&mut vault, store)?;
        vault.forget_password();
    }

    if let Some(shared) = shared {
        let mut global = shared.lock();
        if global.has_key() {
            match new {
                Some(new) => {
                    global.set_password(new);
                    global.check_password(&*store)?;
                }
                None => global.forget_password(),
            }
        }
    }

    info!(
        decrypted = report.decrypted,
        encrypted = report.encrypted,
        "password change complete"
    );
    Ok(report)
}

fn decrypt_all<S: FieldStore>(vault: &mut PasswordVault, store: &mut S) -> VaultResult<usize> {
    let mut count = 0;
    for (name, value) in store.fields()? {
        if let FieldValue::Encrypted(code) = value {
            let text = vault.decrypt(&code)?;
            store.set_field(&name, FieldValue::Plain(text))?;
            count += 1;
            debug!(count, "decrypted field");
        }
    }
    Ok(count)
}

fn encrypt_all<S: FieldStore>(vault: &mut PasswordVault, store: &mut S) -> VaultResult<usize> {
    let mut count = 0;
    for (name, value) in store.fields()? {
        if let FieldValue::Plain(text) = value {
            let code = vault.encrypt(&text)?;
            store.set_field(&name, FieldValue::Encrypted(code))?;
            count += 1;
            debug!(count, "encrypted field");
        }
    }
    Ok(count)
}
