use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::config::Credentials;
use crate::directory::{Connector, DirectoryClient};
use crate::pager::{Page, PageRequest};
use crate::types::{DirectoryRole, DirectoryUser, ProviderId};

/// In-memory identity provider for tests and demos.
///
/// Records keep insertion order so paging is deterministic. Clones share
/// state, which lets a test keep a handle while the role manager owns another.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    credentials: RwLock<Option<Credentials>>,
    users: RwLock<Vec<DirectoryUser>>,
    roles: RwLock<Vec<DirectoryRole>>,
    assignments: RwLock<Vec<(ProviderId, ProviderId)>>,
    requests: AtomicUsize,
}

impl MemoryDirectory {
    /// Creates an empty directory that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accepts connections presenting exactly these credentials.
    pub fn require_credentials(&self, credentials: Credentials) {
        let mut guard = self.inner.credentials.write().expect("poisoned lock");
        *guard = Some(credentials);
    }

    /// Adds a user.
    pub fn add_user(&self, user: DirectoryUser) {
        let mut guard = self.inner.users.write().expect("poisoned lock");
        guard.push(user);
    }

    /// Adds a role.
    pub fn add_role(&self, role: DirectoryRole) {
        let mut guard = self.inner.roles.write().expect("poisoned lock");
        guard.push(role);
    }

    /// Assigns a role to a user.
    pub fn assign_role(&self, user: ProviderId, role: ProviderId) {
        let mut guard = self.inner.assignments.write().expect("poisoned lock");
        if !guard.contains(&(user.clone(), role.clone())) {
            guard.push((user, role));
        }
    }

    /// Number of page requests served so far.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::Relaxed)
    }

    fn page_of<T: Clone>(&self, records: &[T], request: PageRequest) -> Page<T> {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        let start = request.offset().min(records.len());
        let end = start
            .saturating_add(request.per_page as usize)
            .min(records.len());
        Page::new(records[start..end].to_vec(), end < records.len())
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn list_users(
        &self,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryUser>, crate::StoreError> {
        let guard = self.inner.users.read().expect("poisoned lock");
        Ok(self.page_of(&guard, page))
    }

    async fn list_roles(
        &self,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryRole>, crate::StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(self.page_of(&guard, page))
    }

    async fn user_roles(
        &self,
        user: &ProviderId,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryRole>, crate::StoreError> {
        let roles: Vec<DirectoryRole> = {
            let assignments = self.inner.assignments.read().expect("poisoned lock");
            let all_roles = self.inner.roles.read().expect("poisoned lock");
            let by_id: HashMap<&ProviderId, &DirectoryRole> =
                all_roles.iter().map(|role| (&role.id, role)).collect();
            assignments
                .iter()
                .filter(|(assigned_user, _)| assigned_user == user)
                .filter_map(|(_, role)| by_id.get(role).map(|role| (*role).clone()))
                .collect()
        };
        Ok(self.page_of(&roles, page))
    }

    async fn role_users(
        &self,
        role: &ProviderId,
        page: PageRequest,
    ) -> std::result::Result<Page<DirectoryUser>, crate::StoreError> {
        let users: Vec<DirectoryUser> = {
            let assignments = self.inner.assignments.read().expect("poisoned lock");
            let all_users = self.inner.users.read().expect("poisoned lock");
            let by_id: HashMap<&ProviderId, &DirectoryUser> =
                all_users.iter().map(|user| (&user.id, user)).collect();
            assignments
                .iter()
                .filter(|(_, assigned_role)| assigned_role == role)
                .filter_map(|(user, _)| by_id.get(user).map(|user| (*user).clone()))
                .collect()
        };
        Ok(self.page_of(&users, page))
    }
}

#[async_trait]
impl Connector for MemoryDirectory {
    type Client = MemoryDirectory;

    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<MemoryDirectory, crate::StoreError> {
        let expected = self.inner.credentials.read().expect("poisoned lock").clone();
        match expected {
            Some(expected) if &expected != credentials => {
                Err(format!("invalid client credentials for tenant {}", credentials.tenant).into())
            }
            _ => Ok(self.clone()),
        }
    }
}
