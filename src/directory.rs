use crate::config::Credentials;
use crate::error::StoreError;
use crate::pager::{Page, PageRequest};
use crate::types::{DirectoryRole, DirectoryUser, ProviderId};
use async_trait::async_trait;

/// Client for the identity provider's paginated management API.
///
/// Every method fetches exactly one page. Implementations report whether a
/// further page exists through [`Page::has_next`].
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Lists one page of all users.
    async fn list_users(
        &self,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryUser>, StoreError>;

    /// Lists one page of all roles.
    async fn list_roles(
        &self,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryRole>, StoreError>;

    /// Lists one page of the roles assigned to a user.
    async fn user_roles(
        &self,
        user: &ProviderId,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryRole>, StoreError>;

    /// Lists one page of the users assigned to a role.
    async fn role_users(
        &self,
        role: &ProviderId,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryUser>, StoreError>;
}

/// Establishes a credentialed session with the identity provider.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Client produced by a successful connection.
    type Client: DirectoryClient;

    /// Opens a session using client credentials.
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Self::Client, StoreError>;
}
