use super::namespace_dns::NamespaceDns;
use dashmap::DashMap;
use nsresolv_domain::DomainError;
use std::sync::Arc;

/// Namespaces with a running proxy, keyed by namespace id.
#[derive(Default)]
pub struct ActiveNamespaces {
    entries: DashMap<String, Arc<NamespaceDns>>,
}

impl ActiveNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, namespace: Arc<NamespaceDns>) -> Result<(), DomainError> {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(namespace.id().to_string()) {
            Entry::Occupied(entry) => Err(DomainError::NamespaceExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(namespace);
                Ok(())
            }
        }
    }

    pub fn remove(&self, id: &str) -> Result<Arc<NamespaceDns>, DomainError> {
        self.entries
            .remove(id)
            .map(|(_, namespace)| namespace)
            .ok_or_else(|| DomainError::NamespaceNotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Arc<NamespaceDns>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Point-in-time copy; callers never hold a map guard across an await.
    pub fn list(&self) -> Vec<Arc<NamespaceDns>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
