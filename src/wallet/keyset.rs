//! Keyset cache and rotation detection
//!
//! The wallet keeps the issuer's current public keys plus every older keyset
//! it has seen. Signatures name the keyset that produced them; a name that
//! differs from the cached one means either the issuer rotated or a
//! transient mismatch, and [`KeysetCache::detect_rotation`] tells the two
//! apart by refetching.

use crate::crypto::curve::{point_to_hex, sha256};
use crate::error::{WalletError, WalletResult};
use crate::mint::MintConnector;
use crate::types::{KeysetId, MintKeys};
use crate::{log_info, log_warn};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::HashMap;

const MODULE: &str = "wallet::keyset";

/// Length of a derived keyset id in characters
pub const KEYSET_ID_LEN: usize = 12;

/// Derive the id of a keyset
///
/// SHA-256 over the concatenated compressed-hex public keys in ascending
/// amount order, standard base64, first 12 characters.
pub fn derive_keyset_id(keys: &MintKeys) -> KeysetId {
    let concatenated: String = keys.iter().map(|(_, pk)| point_to_hex(pk)).collect();
    let encoded = BASE64.encode(sha256(concatenated.as_bytes()));
    KeysetId::new(&encoded[..KEYSET_ID_LEN])
}

/// Current keyset of the wallet's issuer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeysetState {
    #[default]
    Uninitialized,
    Ready { keys: MintKeys, id: KeysetId },
}

#[derive(Debug, Clone, Default)]
pub struct KeysetCache {
    state: KeysetState,
    archived: HashMap<KeysetId, MintKeys>,
}

impl KeysetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache seeded with keys the caller persisted earlier
    pub fn with_keys(keys: MintKeys) -> Self {
        let id = derive_keyset_id(&keys);
        Self {
            state: KeysetState::Ready { keys, id },
            archived: HashMap::new(),
        }
    }

    pub fn state(&self) -> &KeysetState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, KeysetState::Ready { .. })
    }

    pub fn current_id(&self) -> Option<&KeysetId> {
        match &self.state {
            KeysetState::Ready { id, .. } => Some(id),
            KeysetState::Uninitialized => None,
        }
    }

    pub fn current_keys(&self) -> Option<&MintKeys> {
        match &self.state {
            KeysetState::Ready { keys, .. } => Some(keys),
            KeysetState::Uninitialized => None,
        }
    }

    /// Keys already known for `id`, current or archived
    pub fn lookup(&self, id: &KeysetId) -> Option<&MintKeys> {
        match &self.state {
            KeysetState::Ready { keys, id: current } if current == id => Some(keys),
            _ => self.archived.get(id),
        }
    }

    /// Fetch the issuer's current keys if none are cached yet
    pub async fn ensure_ready<C: MintConnector>(&mut self, client: &C, mint_url: &str) -> WalletResult<&KeysetId> {
        if !self.is_ready() {
            let keys = client.get_keys(mint_url, None).await?;
            let id = derive_keyset_id(&keys);
            log_info!(MODULE, "Loaded mint keys", keyset_id = id, amounts = keys.len());
            self.state = KeysetState::Ready { keys, id };
        }

        self.current_id()
            .ok_or_else(|| WalletError::internal("Keyset cache not ready after load"))
    }

    /// Keys for `id`, fetching and archiving them when not known yet.
    ///
    /// Fetched keys must derive to `id`; anything else is rejected and not
    /// archived.
    pub async fn keys_for<C: MintConnector>(
        &mut self,
        client: &C,
        mint_url: &str,
        id: &KeysetId,
    ) -> WalletResult<&MintKeys> {
        if self.lookup(id).is_none() {
            let keys = client.get_keys(mint_url, Some(id)).await?;
            let derived = derive_keyset_id(&keys);
            if &derived != id {
                log_warn!(
                    MODULE,
                    "Fetched keyset does not derive to requested id",
                    requested = id,
                    derived = derived
                );
                return Err(WalletError::mint_error(format!(
                    "Mint returned keyset {} when asked for {}",
                    derived, id
                )));
            }
            self.archived.insert(id.clone(), keys);
        }

        self.lookup(id)
            .ok_or_else(|| WalletError::missing_key(format!("No keys for keyset {}", id)))
    }

    /// Compare signature keyset ids against the cached id.
    ///
    /// On any difference the current keys are refetched. A new derived id
    /// replaces the cache and is returned; the same id means the mismatch was
    /// transient and the cache is left alone.
    pub async fn detect_rotation<C: MintConnector>(
        &mut self,
        client: &C,
        mint_url: &str,
        ids: &[KeysetId],
    ) -> WalletResult<Option<MintKeys>> {
        let current = self.ensure_ready(client, mint_url).await?.clone();
        if ids.iter().all(|id| *id == current) {
            return Ok(None);
        }

        let keys = client.get_keys(mint_url, None).await?;
        let fetched = derive_keyset_id(&keys);

        if fetched == current {
            log_warn!(MODULE, "Keyset id mismatch without rotation", keyset_id = current);
            return Ok(None);
        }

        log_info!(MODULE, "Mint rotated keyset", old = current, new = fetched);
        let previous = std::mem::replace(
            &mut self.state,
            KeysetState::Ready {
                keys: keys.clone(),
                id: fetched,
            },
        );
        if let KeysetState::Ready { keys: old_keys, id: old_id } = previous {
            self.archived.insert(old_id, old_keys);
        }

        Ok(Some(keys))
    }
}
