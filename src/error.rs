use crate::types::ProviderId;
use thiserror::Error;

/// Error type returned by the remote directory client.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The identity provider session could not be established.
    #[error("cannot establish identity provider session: {0}")]
    Configuration(#[source] StoreError),
    /// The principal name was not present in the loaded snapshot.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),
    /// The group name was not present in the loaded snapshot.
    #[error("unknown group: {0}")]
    UnknownGroup(String),
    /// A page fetch failed; the enumeration was abandoned.
    #[error("failed to fetch page {page} of {resource}: {source}")]
    Pagination {
        resource: &'static str,
        page: u32,
        #[source]
        source: StoreError,
    },
    /// The enumeration reported more pages than the configured bound.
    #[error("{resource} enumeration exceeded {max_pages} pages")]
    PageLimitExceeded {
        resource: &'static str,
        max_pages: u32,
    },
    /// A domain qualifier was supplied.
    #[error("domain-scoped roles are not supported")]
    DomainNotSupported,
    /// The operation is not supported by this backend.
    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },
    /// Two records share a name under the `Reject` duplicate policy.
    #[error("duplicate name {name}: already mapped to {existing}, got {incoming}")]
    DuplicateName {
        name: String,
        existing: ProviderId,
        incoming: ProviderId,
    },
    /// One provider id was reported under two names under the `Reject` duplicate policy.
    #[error("duplicate id {id}: already named {existing}, got {incoming}")]
    DuplicateId {
        id: ProviderId,
        existing: String,
        incoming: String,
    },
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
}

impl Error {
    /// Returns true for lookup misses against the loaded snapshot.
    pub fn is_unknown_name(&self) -> bool {
        matches!(self, Self::UnknownPrincipal(_) | Self::UnknownGroup(_))
    }
}
