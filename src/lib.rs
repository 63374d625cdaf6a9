//! Read-only RBAC role manager backed by a remote identity provider.
//!
//! Instead of keeping its own role graph, [`IdpRoleManager`] answers
//! "which roles does this principal have?" and "who holds this role?" by
//! asking the identity provider. Users (named by email) and roles (named by
//! role name) are enumerated once at construction into immutable name/id
//! maps; memberships are paged in live on every query. Structural changes
//! (`add_link`, `delete_link`) are rejected because the provider owns the
//! graph, and domain-scoped queries are not supported.
//!
//! The provider is reached through the [`DirectoryClient`] and [`Connector`]
//! traits.
//!
//! # Examples
//!
//! Using the in-memory directory (enable `memory-directory`):
//! ```no_run
//! # #[cfg(feature = "memory-directory")]
//! # {
//! use futures::executor::block_on;
//! use rs_idp_roles::{
//!     Credentials, DirectoryRole, DirectoryUser, MemoryDirectory, ProviderId,
//!     RoleManagerBuilder, RoleReader,
//! };
//! let directory = MemoryDirectory::new();
//! let user = ProviderId::try_from("auth0|u1").unwrap();
//! let role = ProviderId::try_from("rol_admin").unwrap();
//! directory.add_user(DirectoryUser::new(user.clone(), "alice@example.com"));
//! directory.add_role(DirectoryRole::new(role.clone(), "admin"));
//! directory.assign_role(user, role);
//!
//! let credentials = Credentials::new("client-id", "client-secret", "acme");
//! let manager = block_on(RoleManagerBuilder::new().connect(&directory, &credentials)).unwrap();
//! assert!(block_on(manager.has_link("alice@example.com", "admin", &[])).unwrap());
//! # }
//! ```
#![forbid(unsafe_code)]

mod config;
mod directory;
mod error;
mod loader;
mod manager;
mod name_map;
mod pager;
mod types;

#[cfg(feature = "memory-directory")]
mod memory_directory;

#[cfg(test)]
mod testing;

#[cfg(feature = "axum")]
pub mod axum;

pub use crate::config::{Credentials, DEFAULT_PER_PAGE, DuplicatePolicy, RoleManagerConfig};
pub use crate::directory::{Connector, DirectoryClient};
pub use crate::error::{Error, Result, StoreError};
pub use crate::loader::{LoadError, Snapshot, load_all, load_groups, load_principals};
pub use crate::manager::{
    Capabilities, IdpRoleManager, RoleManager, RoleManagerBuilder, RoleReader,
};
pub use crate::name_map::{NameIdMap, NameIdMapBuilder, NameKind, Recorded};
pub use crate::pager::{Page, PageRequest, Pager};
pub use crate::types::{DirectoryRole, DirectoryUser, ProviderId};

#[cfg(feature = "memory-directory")]
pub use crate::memory_directory::MemoryDirectory;
