use std::fmt;

/// Default number of records requested per page.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Policy applied when two records map the same name during a load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DuplicatePolicy {
    /// The later record replaces the earlier one.
    #[default]
    LastWins,
    /// The earlier record is kept and the later one ignored.
    FirstWins,
    /// The load fails with [`Error::DuplicateName`](crate::Error::DuplicateName).
    Reject,
}

/// Tunables for loading and querying the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoleManagerConfig {
    /// Records requested per page.
    pub per_page: u32,
    /// Upper bound on pages per enumeration. `None` means unbounded.
    pub max_pages: Option<u32>,
    /// Name collision handling during the bulk load.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for RoleManagerConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            max_pages: None,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl RoleManagerConfig {
    /// Page size actually sent to the provider; never zero.
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.max(1)
    }
}

/// Client credentials for the identity provider management API.
///
/// The values are handed to a [`Connector`](crate::Connector) as-is.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Credentials {
    /// API client identifier.
    pub client_id: String,
    /// API client secret.
    pub client_secret: String,
    /// Tenant (realm) name, e.g. `abc` for `abc.auth0.com`.
    pub tenant: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant: tenant.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant", &self.tenant)
            .finish()
    }
}
