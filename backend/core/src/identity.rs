use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A known user identity, independent of whether they are currently online.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Host-side source of identities for the identity-lookup resolver.
pub trait IdentityDirectory: Send + Sync {
    /// Look up a previously seen identity by its exact name. Never performs
    /// remote lookups.
    fn cached(&self, name: &str) -> Option<Identity>;

    /// Names of identities currently online, in a stable order.
    fn online(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    known: HashMap<String, Identity>,
    online: Vec<String>,
}

/// In-memory directory, suitable for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identity as known (cached) without marking it online.
    pub fn remember(&self, identity: Identity) {
        self.state
            .write()
            .known
            .insert(identity.name.clone(), identity);
    }

    /// Record an identity and mark it online. Returns the stored identity.
    pub fn join(&self, name: &str) -> Identity {
        let mut state = self.state.write();
        let identity = state
            .known
            .entry(name.to_string())
            .or_insert_with(|| Identity::new(name))
            .clone();
        if !state.online.iter().any(|n| n == name) {
            state.online.push(name.to_string());
        }
        identity
    }

    /// Mark an identity offline. It stays cached.
    pub fn leave(&self, name: &str) {
        self.state.write().online.retain(|n| n != name);
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn cached(&self, name: &str) -> Option<Identity> {
        self.state.read().known.get(name).cloned()
    }

    fn online(&self) -> Vec<String> {
        self.state.read().online.clone()
    }
}
