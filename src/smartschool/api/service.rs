//! Boundary to the remote platform.
//!
//! The transport, credentials and wire format live behind [`GroupService`];
//! this crate only sees positional arguments going out and result codes or
//! payload strings coming back.

use std::fmt;

use async_trait::async_trait;

/// Numeric result code returned by every remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(0);
    /// Returned by the member listing for groups without direct accounts.
    pub const NO_ACCOUNTS: ResultCode = ResultCode(19);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reply of a remote call that returns data on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Payload(String),
    Code(ResultCode),
}

/// Arguments of the remote "save group" call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveGroup {
    pub name: String,
    pub description: String,
    pub code: String,
    pub parent_code: String,
    pub untis: String,
}

/// Arguments of the remote "save class" call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveClass {
    pub name: String,
    pub description: String,
    pub code: String,
    pub parent_code: String,
    pub untis: String,
    pub institute_number: String,
    pub admin_number: String,
    /// Free-form class metadata; the platform accepts an empty string.
    pub extra: String,
}

/// Calls the remote platform offers for groups and their members.
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Base64 encoded markup of every group and class.
    async fn fetch_group_tree_markup(&self) -> Reply;

    async fn save_group(&self, request: &SaveGroup) -> ResultCode;

    async fn save_class(&self, request: &SaveClass) -> ResultCode;

    async fn delete_group(&self, code: &str) -> ResultCode;

    /// Official class change, effective at `date` (`Y-M-D`).
    async fn move_account_to_class(&self, uid: &str, class_name: &str, date: &str) -> ResultCode;

    async fn add_account_to_group(&self, uid: &str, group_name: &str) -> ResultCode;

    async fn remove_account_from_group(&self, uid: &str, group_name: &str, date: &str) -> ResultCode;

    /// JSON list of the accounts directly in `group_name`.
    async fn fetch_accounts_for_group(&self, group_name: &str) -> Reply;

    /// JSON object mapping result codes to messages.
    async fn fetch_error_codes(&self) -> Reply;
}

// Implement GroupService for Box<dyn GroupService> to allow dynamic dispatch
#[async_trait]
impl GroupService for Box<dyn GroupService> {
    async fn fetch_group_tree_markup(&self) -> Reply {
        (**self).fetch_group_tree_markup().await
    }

    async fn save_group(&self, request: &SaveGroup) -> ResultCode {
        (**self).save_group(request).await
    }

    async fn save_class(&self, request: &SaveClass) -> ResultCode {
        (**self).save_class(request).await
    }

    async fn delete_group(&self, code: &str) -> ResultCode {
        (**self).delete_group(code).await
    }

    async fn move_account_to_class(&self, uid: &str, class_name: &str, date: &str) -> ResultCode {
        (**self).move_account_to_class(uid, class_name, date).await
    }

    async fn add_account_to_group(&self, uid: &str, group_name: &str) -> ResultCode {
        (**self).add_account_to_group(uid, group_name).await
    }

    async fn remove_account_from_group(&self, uid: &str, group_name: &str, date: &str) -> ResultCode {
        (**self).remove_account_from_group(uid, group_name, date).await
    }

    async fn fetch_accounts_for_group(&self, group_name: &str) -> Reply {
        (**self).fetch_accounts_for_group(group_name).await
    }

    async fn fetch_error_codes(&self) -> Reply {
        (**self).fetch_error_codes().await
    }
}
