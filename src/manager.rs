use crate::config::{Credentials, DuplicatePolicy, RoleManagerConfig};
use crate::directory::{Connector, DirectoryClient};
use crate::error::{Error, Result};
use crate::loader::{Snapshot, load_all};
use crate::name_map::NameIdMap;
use crate::pager::{PageRequest, Pager};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Operations a role-manager backend actually supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `get_roles`, `get_users` and `has_link` answer queries.
    pub query_links: bool,
    /// `add_link` and `delete_link` change the role graph.
    pub mutate_links: bool,
    /// `print_roles` dumps the role graph.
    pub print_roles: bool,
}

impl Capabilities {
    /// Query-only backend whose role graph lives elsewhere.
    pub const READ_ONLY: Self = Self {
        query_links: true,
        mutate_links: false,
        print_roles: false,
    };
}

/// Read side of the role-manager contract used by policy engines.
///
/// `domain` carries optional tenant qualifiers; backends that have no notion
/// of domains reject any non-empty slice.
#[async_trait]
pub trait RoleReader: Send + Sync {
    /// Returns the roles a subject inherits.
    async fn get_roles(&self, name: &str, domain: &[&str]) -> Result<Vec<String>>;

    /// Returns the subjects that inherit a role.
    async fn get_users(&self, name: &str, domain: &[&str]) -> Result<Vec<String>>;

    /// Returns whether `name1` inherits `name2`.
    async fn has_link(&self, name1: &str, name2: &str, domain: &[&str]) -> Result<bool> {
        reject_domain(domain)?;
        let roles = self.get_roles(name1, domain).await?;
        Ok(roles.iter().any(|role| role == name2))
    }
}

/// Full role-manager contract.
#[async_trait]
pub trait RoleManager: RoleReader {
    /// Reports which operations succeed on this backend.
    fn capabilities(&self) -> Capabilities;

    /// Adds an inheritance link `name1 -> name2`.
    async fn add_link(&self, name1: &str, name2: &str, domain: &[&str]) -> Result<()>;

    /// Removes an inheritance link `name1 -> name2`.
    async fn delete_link(&self, name1: &str, name2: &str, domain: &[&str]) -> Result<()>;

    /// Resets local state.
    async fn clear(&self) -> Result<()>;

    /// Logs the role graph.
    async fn print_roles(&self) -> Result<()>;
}

fn reject_domain(domain: &[&str]) -> Result<()> {
    if domain.is_empty() {
        Ok(())
    } else {
        Err(Error::DomainNotSupported)
    }
}

/// Builder for [`IdpRoleManager`].
#[derive(Debug, Clone, Default)]
pub struct RoleManagerBuilder {
    config: RoleManagerConfig,
}

impl RoleManagerBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RoleManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets records requested per page.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.config.per_page = per_page;
        self
    }

    /// Bounds pages per enumeration.
    pub fn max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Sets how name collisions are handled during the load.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Opens a provider session and loads the snapshot.
    ///
    /// A connection failure yields [`Error::Configuration`]; a load failure
    /// is returned as-is. Either way no manager is produced.
    pub async fn connect<K>(
        self,
        connector: &K,
        credentials: &Credentials,
    ) -> Result<IdpRoleManager<K::Client>>
    where
        K: Connector,
    {
        info!(tenant = %credentials.tenant, "connecting to identity provider");
        let client = connector
            .connect(credentials)
            .await
            .map_err(Error::Configuration)?;
        self.load(client).await
    }

    /// Loads the snapshot through an already connected client.
    ///
    /// Any load failure is fatal here: the partial snapshot is discarded and
    /// only the cause is returned.
    pub async fn load<C>(self, client: C) -> Result<IdpRoleManager<C>>
    where
        C: DirectoryClient,
    {
        let snapshot = load_all(&client, &self.config).await?;
        info!(
            principals = snapshot.principals.len(),
            groups = snapshot.groups.len(),
            "role manager ready"
        );
        Ok(IdpRoleManager {
            client,
            snapshot,
            config: self.config,
        })
    }
}

/// Role manager that answers from an identity provider.
///
/// Names are resolved against the snapshot loaded at construction; role
/// memberships are fetched live on every query. The snapshot never changes
/// after construction.
#[derive(Debug)]
pub struct IdpRoleManager<C> {
    client: C,
    snapshot: Snapshot,
    config: RoleManagerConfig,
}

impl<C> IdpRoleManager<C> {
    /// Principal (email) mappings.
    pub fn principals(&self) -> &NameIdMap {
        &self.snapshot.principals
    }

    /// Group (role name) mappings.
    pub fn groups(&self) -> &NameIdMap {
        &self.snapshot.groups
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RoleManagerConfig {
        &self.config
    }

    /// Underlying provider client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C> IdpRoleManager<C>
where
    C: DirectoryClient,
{
    #[instrument(skip(self, name), fields(principal = %name))]
    async fn principal_roles(&self, name: &str) -> Result<Vec<String>> {
        let id = self.snapshot.principals.require_id(name)?;
        let client = &self.client;
        let roles = Pager::new(
            "user roles",
            self.config.effective_per_page(),
            move |page: PageRequest| client.user_roles(id, page),
        )
        .max_pages(self.config.max_pages)
        .try_collect()
        .await?;
        debug!(count = roles.len(), "resolved roles");
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    #[instrument(skip(self, name), fields(group = %name))]
    async fn group_members(&self, name: &str) -> Result<Vec<String>> {
        let id = self.snapshot.groups.require_id(name)?;
        let client = &self.client;
        let users = Pager::new(
            "role users",
            self.config.effective_per_page(),
            move |page: PageRequest| client.role_users(id, page),
        )
        .max_pages(self.config.max_pages)
        .try_collect()
        .await?;
        debug!(count = users.len(), "resolved members");
        Ok(users.into_iter().filter_map(|user| user.email).collect())
    }
}

#[async_trait]
impl<C> RoleReader for IdpRoleManager<C>
where
    C: DirectoryClient,
{
    async fn get_roles(&self, name: &str, domain: &[&str]) -> Result<Vec<String>> {
        reject_domain(domain)?;
        self.principal_roles(name).await
    }

    async fn get_users(&self, name: &str, domain: &[&str]) -> Result<Vec<String>> {
        reject_domain(domain)?;
        self.group_members(name).await
    }
}

#[async_trait]
impl<C> RoleManager for IdpRoleManager<C>
where
    C: DirectoryClient,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }

    async fn add_link(&self, _name1: &str, _name2: &str, _domain: &[&str]) -> Result<()> {
        Err(Error::Unsupported {
            operation: "add_link",
        })
    }

    async fn delete_link(&self, _name1: &str, _name2: &str, _domain: &[&str]) -> Result<()> {
        Err(Error::Unsupported {
            operation: "delete_link",
        })
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn print_roles(&self) -> Result<()> {
        Err(Error::Unsupported {
            operation: "print_roles",
        })
    }
}
