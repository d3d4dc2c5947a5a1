//! Construction entry point and the teardown hook it registers.

use std::any::{type_name, Any};

use tracing::{debug, warn};

use trieenv_core::Config;

use crate::adapter::TrieBackingStore;
use crate::error::{HostError, HostResult};
use crate::host::{HostEnvironment, HostValue, TeardownReport};

/// Give `env` a fresh trie backing store.
///
/// Builds an empty table, wraps it in a [`TrieBackingStore`] and hands it to
/// the host together with [`destroy_trie_env`] as its finalizer. This is the
/// only function a loader has to expose.
pub fn install_trie_env<V, E>(env: &mut E, config: &Config) -> HostResult<()>
where
    V: HostValue,
    E: HostEnvironment<V> + ?Sized,
{
    let store = TrieBackingStore::<V>::new(config)?;
    env.install_backing_store(Box::new(store), destroy_trie_env::<V>);
    debug!(
        max_entries = ?config.max_entries,
        max_key_size = ?config.max_key_size,
        "trie backing store installed"
    );
    Ok(())
}

/// Finalizer for stores created by [`install_trie_env`].
///
/// Anything other than a `TrieBackingStore<V>` is a contract violation and
/// is rejected with [`HostError::NotATable`]. Running it twice on the same
/// store is harmless.
pub fn destroy_trie_env<V: HostValue>(object: &mut dyn Any) -> HostResult<TeardownReport> {
    let expected = type_name::<TrieBackingStore<V>>();
    let Some(store) = object.downcast_mut::<TrieBackingStore<V>>() else {
        warn!(expected, "finalizer called on a foreign object");
        return Err(HostError::NotATable { expected });
    };
    store.teardown()
}
