use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::smartschool::api::config::GroupPolicy;
use crate::smartschool::api::dates;
use crate::smartschool::api::error::{ApiError, ErrorCatalog, Result};
use crate::smartschool::api::io::markup::{self, Ingested};
use crate::smartschool::api::io::snapshot;
use crate::smartschool::api::model::{Account, Group, GroupId, GroupKind, GroupTree};
use crate::smartschool::api::service::{GroupService, Reply, ResultCode, SaveClass, SaveGroup};
use crate::smartschool::api::tree;

/// Most member listings [`GroupManager::load_accounts`] requests at once.
pub const ACCOUNT_FETCH_LIMIT: usize = 8;

/// Owner of the group tree mirrored from the platform.
///
/// The manager starts unloaded. [`GroupManager::load`] fetches the tree once,
/// [`GroupManager::reload`] always fetches a fresh one and replaces the
/// previous tree only after the new one was ingested completely. Handles
/// taken from an older tree are stale after a reload.
///
/// The manager does no locking of its own. Mutating calls take `&mut self`;
/// callers that share a manager between tasks must serialise reloads and
/// writes themselves, for example behind a mutex.
pub struct GroupManager<S> {
    service: S,
    policy: GroupPolicy,
    tree: Option<GroupTree>,
    catalog: OnceLock<ErrorCatalog>,
}

impl<S: GroupService> GroupManager<S> {
    pub fn new(service: S, policy: GroupPolicy) -> Self {
        Self {
            service,
            policy,
            tree: None,
            catalog: OnceLock::new(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn policy(&self) -> &GroupPolicy {
        &self.policy
    }

    pub fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    /// The full ingested tree, rooted at the synthetic wrapper.
    pub fn tree(&self) -> Option<&GroupTree> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut GroupTree> {
        self.tree.as_mut()
    }

    /// The usable top group: the first child of the wrapper root.
    pub fn root(&self) -> Option<GroupId> {
        self.tree.as_ref()?.top_level()
    }

    /// Drops the current tree.
    pub fn reset(&mut self) {
        self.tree = None;
    }

    /// Loads the tree unless one is already present.
    #[instrument(level = "info", skip_all)]
    pub async fn load(&mut self) -> Result<()> {
        if self.is_loaded() {
            debug!("group tree already loaded");
            return Ok(());
        }
        self.reload().await
    }

    /// Fetches, ingests and sorts a fresh tree, then publishes it.
    #[instrument(level = "info", skip_all)]
    pub async fn reload(&mut self) -> Result<()> {
        let payload = match self.service.fetch_group_tree_markup().await {
            Reply::Payload(payload) => payload,
            Reply::Code(code) => return Err(self.remote_failure(code, "fetch group tree").await),
        };

        let Ingested {
            mut tree,
            diagnostics,
        } = markup::ingest_payload(&payload).inspect_err(|err| {
            error!(%err, "group tree ingestion failed, keeping previous tree");
        })?;

        for diagnostic in &diagnostics {
            warn!(
                group = %tree.group(diagnostic.group).name,
                field = diagnostic.field,
                value = %diagnostic.value,
                reason = %diagnostic.reason,
                "group field kept its previous value"
            );
        }

        let root = tree.root();
        tree::sort(&mut tree, root);
        info!(
            groups = tree.len().saturating_sub(1),
            ignored_fields = diagnostics.len(),
            "group tree published"
        );
        self.tree = Some(tree);
        Ok(())
    }

    /// Looks a group up by name below the usable root.
    pub fn find(&self, name: &str) -> Option<GroupId> {
        let tree = self.tree.as_ref()?;
        tree::find(tree, tree.top_level()?, &self.policy.discard_subgroups, name)
    }

    /// Number of groups below and including the usable root, or only the
    /// official ones. Zero when nothing is loaded.
    pub fn count(&self, classes_only: bool) -> usize {
        match (self.tree.as_ref(), self.root()) {
            (Some(tree), Some(root)) => {
                tree::count(tree, root, &self.policy.discard_subgroups, classes_only)
            }
            _ => 0,
        }
    }

    /// Number of accounts loaded anywhere below the usable root.
    pub fn count_members(&self) -> usize {
        match (self.tree.as_ref(), self.root()) {
            (Some(tree), Some(root)) => {
                tree::count_members(tree, root, &self.policy.discard_subgroups)
            }
            _ => 0,
        }
    }

    /// Every reachable group, children before their parent.
    pub fn flatten(&self) -> Vec<GroupId> {
        match (self.tree.as_ref(), self.root()) {
            (Some(tree), Some(root)) => tree::flatten(tree, root, &self.policy.discard_subgroups),
            _ => Vec::new(),
        }
    }

    /// Name of the group a class should be placed under. See
    /// [`GroupPolicy::logical_parent`].
    pub fn logical_parent(&self, class_name: &str) -> String {
        self.policy.logical_parent(class_name)
    }

    /// Adds a group to the local tree, typically right before [`save`].
    ///
    /// [`save`]: GroupManager::save
    pub fn add_group(&mut self, parent: GroupId, group: Group) -> Result<GroupId> {
        let tree = self.tree.as_mut().ok_or(ApiError::NotLoaded)?;
        if !tree.contains(parent) {
            return Err(ApiError::UnknownGroup(parent.index()));
        }
        Ok(tree.add_child(parent, group))
    }

    /// Pushes the attributes of `id` to the platform.
    #[instrument(level = "info", skip(self))]
    pub async fn save(&self, id: GroupId) -> Result<()> {
        let tree = self.loaded_tree()?;
        let node = tree
            .try_get(id)
            .ok_or(ApiError::UnknownGroup(id.index()))?;
        let group = &node.group;
        let parent_code = node
            .parent
            .map(|parent| tree.group(parent).code.clone())
            .unwrap_or_default();

        if group.description.is_empty() {
            warn!(group = %group.name, "the platform rejects groups without a description");
        }

        let code = match group.kind {
            GroupKind::Class => {
                if parent_code.is_empty() {
                    return Err(precondition(format!(
                        "class '{}' needs a parent with a code",
                        group.name
                    )));
                }
                if group.official && (group.admin_number == 0 || group.institute_number.is_empty())
                {
                    return Err(precondition(format!(
                        "official class '{}' needs an admin number and an institute number",
                        group.name
                    )));
                }
                let request = SaveClass {
                    name: group.name.clone(),
                    description: group.description.clone(),
                    code: group.code.clone(),
                    parent_code,
                    untis: group.untis.clone(),
                    institute_number: group.institute_number.clone(),
                    admin_number: group.admin_number.to_string(),
                    extra: String::new(),
                };
                self.service.save_class(&request).await
            }
            GroupKind::Group => {
                let request = SaveGroup {
                    name: group.name.clone(),
                    description: group.description.clone(),
                    code: group.code.clone(),
                    parent_code,
                    untis: group.untis.clone(),
                };
                self.service.save_group(&request).await
            }
            GroupKind::Invalid => {
                return Err(precondition(format!(
                    "group '{}' has no valid type",
                    group.name
                )));
            }
        };

        self.check(code, "save group").await?;
        info!(group = %group.name, "group saved");
        Ok(())
    }

    /// Deletes `id` on the platform and, on success, from the local tree.
    #[instrument(level = "info", skip(self))]
    pub async fn delete(&mut self, id: GroupId) -> Result<()> {
        let (name, code) = {
            let tree = self.loaded_tree()?;
            if id == tree.root() {
                return Err(precondition("the wrapper root cannot be deleted".into()));
            }
            let group = &tree
                .try_get(id)
                .ok_or(ApiError::UnknownGroup(id.index()))?
                .group;
            if group.code.is_empty() {
                return Err(precondition(format!(
                    "group '{}' has no code to delete",
                    group.name
                )));
            }
            (group.name.clone(), group.code.clone())
        };

        let result = self.service.delete_group(&code).await;
        self.check(result, "delete group").await?;

        if let Some(tree) = self.tree.as_mut() {
            tree.detach(id);
        }
        info!(group = %name, "group deleted");
        Ok(())
    }

    /// Official class change for a student, effective at `date`.
    #[instrument(level = "info", skip_all, fields(uid = %account.uid, class = %class.name))]
    pub async fn move_account_to_class(
        &self,
        account: &Account,
        class: &Group,
        date: NaiveDate,
    ) -> Result<()> {
        if class.kind != GroupKind::Class || !class.official {
            return Err(precondition(
                "accounts can only be moved to official classes".into(),
            ));
        }
        let code = self
            .service
            .move_account_to_class(&account.uid, &class.name, &dates::to_remote(date))
            .await;
        self.check(code, "move account to class").await
    }

    /// Adds an account to a non-official group.
    #[instrument(level = "info", skip_all, fields(uid = %account.uid, group = %group.name))]
    pub async fn add_account_to_group(&self, account: &Account, group: &Group) -> Result<()> {
        if group.official {
            return Err(precondition(
                "accounts cannot be added to official classes, move them instead".into(),
            ));
        }
        let code = self
            .service
            .add_account_to_group(&account.uid, &group.name)
            .await;
        self.check(code, "add account to group").await
    }

    /// Removes an account from a non-official group as of `date`, usually
    /// [`dates::today`].
    #[instrument(level = "info", skip_all, fields(uid = %account.uid, group = %group.name))]
    pub async fn remove_account_from_group(
        &self,
        account: &Account,
        group: &Group,
        date: NaiveDate,
    ) -> Result<()> {
        if group.official {
            return Err(precondition(
                "accounts cannot be removed from official classes".into(),
            ));
        }
        let code = self
            .service
            .remove_account_from_group(&account.uid, &group.name, &dates::to_remote(date))
            .await;
        self.check(code, "remove account from group").await
    }

    /// Loads the direct members of every group in the subtree of `id`.
    ///
    /// At most [`ACCOUNT_FETCH_LIMIT`] requests run at a time. A group the
    /// platform reports as having no direct accounts keeps its current
    /// members; other failures are logged and skipped. Returns the number of
    /// groups whose members were replaced.
    #[instrument(level = "info", skip(self))]
    pub async fn load_accounts(&mut self, id: GroupId) -> Result<usize> {
        let targets: Vec<(GroupId, String)> = {
            let tree = self.loaded_tree()?;
            if !tree.contains(id) {
                return Err(ApiError::UnknownGroup(id.index()));
            }
            tree::flatten(tree, id, &self.policy.discard_subgroups)
                .into_iter()
                .map(|group| (group, tree.group(group).name.clone()))
                .collect()
        };

        let service = &self.service;
        let replies: Vec<(GroupId, String, Reply)> = stream::iter(targets)
            .map(|(group, name)| async move {
                let reply = service.fetch_accounts_for_group(&name).await;
                (group, name, reply)
            })
            .buffer_unordered(ACCOUNT_FETCH_LIMIT)
            .collect()
            .await;

        let mut updates = Vec::new();
        for (group, name, reply) in replies {
            match reply {
                Reply::Code(ResultCode::NO_ACCOUNTS) => {
                    debug!(group = %name, "group has no direct accounts");
                }
                Reply::Code(code) => {
                    self.report_remote_failure(code, "fetch accounts").await;
                }
                Reply::Payload(payload) => match serde_json::from_str::<Vec<Account>>(&payload) {
                    Ok(mut accounts) => {
                        for account in &mut accounts {
                            account.group = name.clone();
                        }
                        info!(group = %name, accounts = accounts.len(), "accounts loaded");
                        updates.push((group, accounts));
                    }
                    Err(err) => {
                        error!(group = %name, %err, "account list is malformed");
                    }
                },
            }
        }

        let tree = self.tree.as_mut().ok_or(ApiError::NotLoaded)?;
        let updated = updates.len();
        for (group, accounts) in updates {
            tree.get_mut(group).members = accounts;
        }
        Ok(updated)
    }

    /// Snapshot of the usable root and everything below it.
    pub fn snapshot(&self) -> Result<Value> {
        let tree = self.loaded_tree()?;
        let root = tree.top_level().ok_or(ApiError::NotLoaded)?;
        snapshot::encode(tree, root)
    }

    /// Writes [`GroupManager::snapshot`] to `path`.
    #[instrument(level = "info", skip(self), fields(output = %path.display()))]
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let tree = self.loaded_tree()?;
        let root = tree.top_level().ok_or(ApiError::NotLoaded)?;
        snapshot::write_snapshot(path, tree, root)
    }

    fn loaded_tree(&self) -> Result<&GroupTree> {
        self.tree.as_ref().ok_or(ApiError::NotLoaded)
    }

    async fn check(&self, code: ResultCode, operation: &str) -> Result<()> {
        if code.is_success() {
            return Ok(());
        }
        Err(self.remote_failure(code, operation).await)
    }

    /// Reports a failed remote call and turns it into an error value.
    async fn remote_failure(&self, code: ResultCode, operation: &str) -> ApiError {
        let message = self.remote_message(code).await;
        error!(operation, code = code.0, message = %message, "remote call failed");
        ApiError::Remote {
            code: code.0,
            message,
        }
    }

    /// Logs a failed remote call that does not abort the current operation.
    async fn report_remote_failure(&self, code: ResultCode, operation: &str) {
        let message = self.remote_message(code).await;
        error!(operation, code = code.0, message = %message, "remote call failed");
    }

    async fn remote_message(&self, code: ResultCode) -> String {
        match self.error_catalog().await {
            Some(catalog) => catalog.message(code.0),
            None => ErrorCatalog::default().message(code.0),
        }
    }

    async fn error_catalog(&self) -> Option<&ErrorCatalog> {
        if let Some(catalog) = self.catalog.get() {
            return Some(catalog);
        }
        match self.service.fetch_error_codes().await {
            Reply::Payload(source) => match ErrorCatalog::from_json(&source) {
                Ok(catalog) => Some(self.catalog.get_or_init(|| catalog)),
                Err(err) => {
                    warn!(%err, "error code table is malformed");
                    None
                }
            },
            Reply::Code(code) => {
                warn!(%code, "error code table is unavailable");
                None
            }
        }
    }
}

fn precondition(reason: String) -> ApiError {
    error!(reason = %reason, "request rejected locally");
    ApiError::Precondition(reason)
}
