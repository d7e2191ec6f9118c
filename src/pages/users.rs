use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::config::Config;
use crate::models::user::{User, UserDeletion};
use crate::pages::filter_panel::FilterField;
use crate::pages::list_page::{ListPage, Notice};
use crate::services::users::UserService;

/// Fields of the user filter panel. The password is never a filter.
pub const USER_FILTERS: &[FilterField] = &[
    FilterField::text("username", "Username"),
    FilterField::text("email", "Email"),
    FilterField::text("firstname", "First Name"),
    FilterField::text("lastname", "Last Name"),
    FilterField::text("idNumber", "ID Number"),
    FilterField::choice("role", "Role", &["USER", "ADMIN", "SUPER_ADMIN"]),
    FilterField::choice("status", "Status", &["ACTIVE", "SUSPENDED", "DELETED"]),
];

/// The `/admin/usersManagement` screen. Deleting a user goes through a
/// confirmation step that echoes the user's id number back to the backend.
pub struct UsersPage {
    list: ListPage<UserService>,
    service: UserService,
    pending_delete: Option<UserDeletion>,
}

impl UsersPage {
    pub fn new(service: UserService, config: &Config) -> Self {
        Self {
            list: ListPage::new(
                Arc::new(service.clone()),
                USER_FILTERS,
                config.search_debounce,
                config.filter_debounce,
            ),
            service,
            pending_delete: None,
        }
    }

    /// Opens the confirmation for deleting `user`. Already deleted users
    /// and rows without an id cannot be deleted.
    pub fn request_delete(&mut self, user: &User) -> Option<&UserDeletion> {
        if user.is_deleted() {
            return None;
        }
        self.pending_delete = Some(UserDeletion::for_user(user)?);
        self.pending_delete.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&UserDeletion> {
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Performs the confirmed deletion, if one is pending.
    pub async fn confirm_delete(&mut self) -> Option<Notice> {
        let target = self.pending_delete.take()?;
        Some(self.list.remove(&target).await)
    }

    /// Invalidates every token of `user`. The list is left as is.
    pub async fn revoke_tokens(&self, user: &User) -> Notice {
        let Some(id) = user.id else {
            return Notice::error("Failed to revoke tokens");
        };
        match self.service.revoke_tokens(id).await {
            Ok(ack) => Notice::success(
                ack.message
                    .unwrap_or_else(|| "Tokens revoked successfully!".to_string()),
            ),
            Err(e) => {
                tracing::warn!("❌ Revoking tokens of user {} failed: {}", id, e);
                Notice::error(
                    e.backend_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| "Failed to revoke tokens".to_string()),
                )
            }
        }
    }
}

impl Deref for UsersPage {
    type Target = ListPage<UserService>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl DerefMut for UsersPage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}
