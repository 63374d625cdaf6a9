//! One-shot bulk load of users and roles into name/id maps.

use crate::config::RoleManagerConfig;
use crate::directory::DirectoryClient;
use crate::error::{Error, Result};
use crate::name_map::{NameIdMap, NameIdMapBuilder, NameKind};
use crate::pager::{PageRequest, Pager};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Frozen principal and group maps produced by [`load_all`].
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Email to user id.
    pub principals: NameIdMap,
    /// Role name to role id.
    pub groups: NameIdMap,
}

/// Failed bulk load together with whatever was recorded before the failure.
///
/// The maps in `partial` are frozen as they stood when the enumeration
/// stopped: a role enumeration failure leaves every principal in place and
/// the group map partly filled.
#[derive(Debug, Error)]
#[error("bulk load failed: {source}")]
pub struct LoadError {
    /// Cause of the failure.
    #[source]
    pub source: Error,
    /// Mappings recorded before the failure.
    pub partial: Snapshot,
}

impl From<LoadError> for Error {
    fn from(error: LoadError) -> Self {
        error.source
    }
}

/// Enumerates every user and then every role through the pager.
///
/// Users without an email are skipped. The first failure stops the load and
/// is returned with the partial snapshot; the caller decides whether that
/// state is usable.
pub async fn load_all<C>(
    client: &C,
    config: &RoleManagerConfig,
) -> std::result::Result<Snapshot, LoadError>
where
    C: DirectoryClient + ?Sized,
{
    let mut principals = NameIdMapBuilder::new(NameKind::Principal, config.duplicate_policy);
    let mut groups = NameIdMapBuilder::new(NameKind::Group, config.duplicate_policy);

    let outcome = match load_principals(client, config, &mut principals).await {
        Ok(()) => load_groups(client, config, &mut groups).await,
        Err(err) => Err(err),
    };

    let snapshot = Snapshot {
        principals: principals.freeze(),
        groups: groups.freeze(),
    };
    match outcome {
        Ok(()) => Ok(snapshot),
        Err(source) => {
            warn!(
                principals = snapshot.principals.len(),
                groups = snapshot.groups.len(),
                error = %source,
                "bulk load stopped early"
            );
            Err(LoadError {
                source,
                partial: snapshot,
            })
        }
    }
}

/// Records `(email, id)` for every user into `principals`.
pub async fn load_principals<C>(
    client: &C,
    config: &RoleManagerConfig,
    principals: &mut NameIdMapBuilder,
) -> Result<()>
where
    C: DirectoryClient + ?Sized,
{
    info!("loading principal mappings");
    let mut users = Pager::new("users", config.effective_per_page(), move |page: PageRequest| {
        client.list_users(page)
    })
    .max_pages(config.max_pages);
    let mut skipped = 0usize;
    while let Some(page) = users.next_page().await {
        for user in page?.items {
            let Some(email) = user.email else {
                debug!(id = %user.id, "skipping user without email");
                skipped += 1;
                continue;
            };
            debug!(id = %user.id, email = %email, "principal mapping");
            principals.record(email, user.id)?;
        }
    }
    info!(
        principals = principals.len(),
        skipped,
        pages = users.pages_fetched(),
        "loaded principal mappings"
    );
    Ok(())
}

/// Records `(name, id)` for every role into `groups`.
pub async fn load_groups<C>(
    client: &C,
    config: &RoleManagerConfig,
    groups: &mut NameIdMapBuilder,
) -> Result<()>
where
    C: DirectoryClient + ?Sized,
{
    info!("loading group mappings");
    let mut roles = Pager::new("roles", config.effective_per_page(), move |page: PageRequest| {
        client.list_roles(page)
    })
    .max_pages(config.max_pages);
    while let Some(page) = roles.next_page().await {
        for role in page?.items {
            debug!(id = %role.id, name = %role.name, "group mapping");
            groups.record(role.name, role.id)?;
        }
    }
    info!(
        groups = groups.len(),
        pages = roles.pages_fetched(),
        "loaded group mappings"
    );
    Ok(())
}
