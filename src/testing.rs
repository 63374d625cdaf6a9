use crate::config::Credentials;
use crate::directory::{Connector, DirectoryClient};
use crate::error::StoreError;
use crate::pager::{Page, PageRequest};
use crate::types::{DirectoryRole, DirectoryUser, ProviderId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Endpoint {
    ListUsers,
    ListRoles,
    UserRoles,
    RoleUsers,
}

/// Scripted directory that records every request and can fail one page.
#[derive(Debug, Default)]
pub(crate) struct FakeDirectory {
    pub users: Vec<DirectoryUser>,
    pub roles: Vec<DirectoryRole>,
    pub user_roles: HashMap<ProviderId, Vec<DirectoryRole>>,
    pub role_users: HashMap<ProviderId, Vec<DirectoryUser>>,
    pub fail_at: Option<(Endpoint, u32)>,
    pub requests: Mutex<Vec<(Endpoint, PageRequest)>>,
}

pub(crate) fn id(value: &str) -> ProviderId {
    ProviderId::try_from(value).unwrap()
}

impl FakeDirectory {
    /// alice (u1) in admin (r1); bob (u2) in admin and billing (r2).
    pub fn sample() -> Self {
        let alice = DirectoryUser::new(id("u1"), "alice@example.com");
        let bob = DirectoryUser::new(id("u2"), "bob@example.com");
        let admin = DirectoryRole::new(id("r1"), "admin");
        let billing = DirectoryRole::new(id("r2"), "billing");

        let mut directory = Self {
            users: vec![alice.clone(), bob.clone()],
            roles: vec![admin.clone(), billing.clone()],
            ..Self::default()
        };
        directory
            .user_roles
            .insert(id("u1"), vec![admin.clone()]);
        directory
            .user_roles
            .insert(id("u2"), vec![admin, billing]);
        directory
            .role_users
            .insert(id("r1"), vec![alice, bob.clone()]);
        directory.role_users.insert(id("r2"), vec![bob]);
        directory
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<u32> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(seen, _)| *seen == endpoint)
            .map(|(_, request)| request.index)
            .collect()
    }

    fn serve<T: Clone>(
        &self,
        endpoint: Endpoint,
        request: PageRequest,
        records: &[T],
    ) -> std::result::Result<Page<T>, StoreError> {
        self.requests.lock().unwrap().push((endpoint, request));
        if self.fail_at == Some((endpoint, request.index)) {
            return Err(format!("{endpoint:?} page {} unavailable", request.index).into());
        }
        let start = request.offset().min(records.len());
        let end = (start + request.per_page as usize).min(records.len());
        Ok(Page::new(records[start..end].to_vec(), end < records.len()))
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn list_users(
        &self,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryUser>, StoreError> {
        self.serve(Endpoint::ListUsers, page, &self.users)
    }

    async fn list_roles(
        &self,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryRole>, StoreError> {
        self.serve(Endpoint::ListRoles, page, &self.roles)
    }

    async fn user_roles(
        &self,
        user: &ProviderId,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryRole>, StoreError> {
        let roles = self.user_roles.get(user).cloned().unwrap_or_default();
        self.serve(Endpoint::UserRoles, page, &roles)
    }

    async fn role_users(
        &self,
        role: &ProviderId,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryUser>, StoreError> {
        let users = self.role_users.get(role).cloned().unwrap_or_default();
        self.serve(Endpoint::RoleUsers, page, &users)
    }
}

/// Connector that hands out a prepared directory for one tenant only.
pub(crate) struct FakeConnector {
    pub tenant: String,
    pub directory: Mutex<Option<FakeDirectory>>,
}

#[async_trait]
impl Connector for FakeConnector {
    type Client = FakeDirectory;

    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<FakeDirectory, StoreError> {
        if credentials.tenant != self.tenant {
            return Err(format!("unknown tenant {}", credentials.tenant).into());
        }
        self.directory
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| "directory already taken".into())
    }
}
