//! Campaign identities.
//!
//! One identity pairs a social handle with a wallet address. Pairs are read
//! from two line-oriented input files; the lists must match in length after
//! blank lines are dropped.

use std::fs;
use std::path::Path;

use crate::config::ConfigError;

/// One handle+wallet pair processed by the campaign. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub handle: String,
    pub wallet: String,
}

impl Identity {
    pub fn new(handle: impl Into<String>, wallet: impl Into<String>) -> Self {
        Self {
            handle: normalize_handle(&handle.into()),
            wallet: wallet.into().trim().to_string(),
        }
    }

    /// Zip two equal-length lists into identities. Length mismatch is fatal.
    pub fn pair_up<H, W>(handles: &[H], wallets: &[W]) -> Result<Vec<Identity>, ConfigError>
    where
        H: AsRef<str>,
        W: AsRef<str>,
    {
        if handles.len() != wallets.len() {
            return Err(ConfigError::CountMismatch {
                handles: handles.len(),
                wallets: wallets.len(),
            });
        }

        Ok(handles
            .iter()
            .zip(wallets)
            .map(|(handle, wallet)| Identity::new(handle.as_ref(), wallet.as_ref()))
            .collect())
    }

    /// Read handle and wallet lists from disk and pair them up.
    pub fn load_pairs(handles_path: &Path, wallets_path: &Path) -> Result<Vec<Identity>, ConfigError> {
        let handles = read_entries(handles_path)?;
        let wallets = read_entries(wallets_path)?;
        Self::pair_up(&handles, &wallets)
    }
}

/// Canonical handle form: exactly one leading `@`. Idempotent.
pub fn normalize_handle(handle: &str) -> String {
    let bare = handle.trim().trim_start_matches('@');
    format!("@{bare}")
}

fn read_entries(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_prefixes_once() {
        assert_eq!(normalize_handle("alice"), "@alice");
        assert_eq!(normalize_handle("@alice"), "@alice");
        assert_eq!(normalize_handle("@@alice"), "@alice");
        assert_eq!(normalize_handle("  bob  "), "@bob");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_handle("carol");
        assert_eq!(normalize_handle(&once), once);
    }

    #[test]
    fn pair_up_zips_matching_lists() {
        let identities = Identity::pair_up(&["alice", "@bob"], &["0xaaa", "0xbbb"]).unwrap();
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].handle, "@alice");
        assert_eq!(identities[1].handle, "@bob");
        assert_eq!(identities[1].wallet, "0xbbb");
    }

    #[test]
    fn pair_up_rejects_count_mismatch() {
        let err = Identity::pair_up(&["alice", "bob"], &["0xaaa"]).expect_err("mismatch");
        assert!(matches!(
            err,
            crate::config::ConfigError::CountMismatch {
                handles: 2,
                wallets: 1
            }
        ));
    }
}
