//! Bidirectional name/id mapping built once from the provider snapshot.

use crate::config::DuplicatePolicy;
use crate::error::{Error, Result};
use crate::types::ProviderId;
use std::collections::HashMap;
use tracing::warn;

/// Which kind of record a map holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Users, named by email.
    Principal,
    /// Roles, named by role name.
    Group,
}

impl NameKind {
    fn label(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Group => "group",
        }
    }

    fn unknown(self, name: &str) -> Error {
        match self {
            Self::Principal => Error::UnknownPrincipal(name.to_string()),
            Self::Group => Error::UnknownGroup(name.to_string()),
        }
    }
}

/// Outcome of [`NameIdMapBuilder::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// New pair added.
    Inserted,
    /// The exact pair was already present.
    Unchanged,
    /// A colliding pair was replaced (`LastWins`).
    Replaced,
    /// The pair collided and was dropped (`FirstWins`).
    Ignored,
}

/// Mutable map used while the snapshot is loading.
#[derive(Debug)]
pub struct NameIdMapBuilder {
    kind: NameKind,
    policy: DuplicatePolicy,
    name_to_id: HashMap<String, ProviderId>,
    id_to_name: HashMap<ProviderId, String>,
}

impl NameIdMapBuilder {
    /// Creates an empty builder.
    pub fn new(kind: NameKind, policy: DuplicatePolicy) -> Self {
        Self {
            kind,
            policy,
            name_to_id: HashMap::new(),
            id_to_name: HashMap::new(),
        }
    }

    /// Records a `(name, id)` pair in both directions.
    ///
    /// Either both directions are updated or neither is. Collisions on the
    /// name or on the id are resolved with the configured [`DuplicatePolicy`].
    pub fn record(&mut self, name: impl Into<String>, id: ProviderId) -> Result<Recorded> {
        let name = name.into();
        let existing_id = self.name_to_id.get(&name).cloned();
        let existing_name = self.id_to_name.get(&id).cloned();

        if existing_id.as_ref() == Some(&id) {
            return Ok(Recorded::Unchanged);
        }
        if existing_id.is_none() && existing_name.is_none() {
            self.insert(name, id);
            return Ok(Recorded::Inserted);
        }

        match self.policy {
            DuplicatePolicy::Reject => Err(match existing_id {
                Some(existing) => Error::DuplicateName {
                    name,
                    existing,
                    incoming: id,
                },
                None => Error::DuplicateId {
                    id,
                    existing: existing_name.unwrap_or_default(),
                    incoming: name,
                },
            }),
            DuplicatePolicy::FirstWins => {
                warn!(
                    kind = self.kind.label(),
                    name = %name,
                    id = %id,
                    "duplicate mapping ignored"
                );
                Ok(Recorded::Ignored)
            }
            DuplicatePolicy::LastWins => {
                warn!(
                    kind = self.kind.label(),
                    name = %name,
                    id = %id,
                    previous_id = ?existing_id,
                    previous_name = ?existing_name,
                    "duplicate mapping replaced"
                );
                if let Some(stale_id) = existing_id {
                    self.id_to_name.remove(&stale_id);
                }
                if let Some(stale_name) = existing_name {
                    self.name_to_id.remove(&stale_name);
                }
                self.insert(name, id);
                Ok(Recorded::Replaced)
            }
        }
    }

    fn insert(&mut self, name: String, id: ProviderId) {
        self.id_to_name.insert(id.clone(), name.clone());
        self.name_to_id.insert(name, id);
    }

    /// Number of pairs recorded so far.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    /// Returns whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Ends the loading phase.
    pub fn freeze(self) -> NameIdMap {
        NameIdMap {
            kind: self.kind,
            name_to_id: self.name_to_id,
            id_to_name: self.id_to_name,
        }
    }
}

/// Read-only name/id map.
///
/// Built by [`NameIdMapBuilder::freeze`]; offers no mutation, so shared
/// references can be read from many threads without locking.
#[derive(Debug, Clone)]
pub struct NameIdMap {
    kind: NameKind,
    name_to_id: HashMap<String, ProviderId>,
    id_to_name: HashMap<ProviderId, String>,
}

impl NameIdMap {
    /// Kind of records held.
    pub fn kind(&self) -> NameKind {
        self.kind
    }

    /// Looks up the provider id for a name.
    pub fn lookup_id(&self, name: &str) -> Option<&ProviderId> {
        self.name_to_id.get(name)
    }

    /// Looks up the name for a provider id.
    pub fn lookup_name(&self, id: &str) -> Option<&str> {
        self.id_to_name.get(id).map(String::as_str)
    }

    /// Looks up the provider id, mapping a miss to
    /// [`Error::UnknownPrincipal`] or [`Error::UnknownGroup`].
    pub fn require_id(&self, name: &str) -> Result<&ProviderId> {
        self.lookup_id(name).ok_or_else(|| self.kind.unknown(name))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    /// Returns whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Iterates `(name, id)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderId)> {
        self.name_to_id.iter().map(|(name, id)| (name.as_str(), id))
    }
}
