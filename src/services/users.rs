use async_trait::async_trait;
use serde::Serialize;

use crate::api::client::{Ack, ApiClient};
use crate::controllers::list::{Resource, ResourceMessages};
use crate::error::{AppError, Result};
use crate::models::filter::{ListQuery, Sort};
use crate::models::page::PagePayload;
use crate::models::user::{NewUser, User, UserDeletion, UserUpdate};

const USERS_PATH: &str = "/api/users";

/// Body of `DELETE /api/users/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteConfirmation<'a> {
    user_id_number: &'a str,
}

/// The `/api/users` endpoints.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User> {
        let user: Option<User> = self.api.get(&format!("{}/{}", USERS_PATH, id), &[]).await?;
        user.ok_or_else(|| AppError::UnexpectedResponse(format!("User {} not found", id)))
    }

    pub async fn get_by_id_number(&self, id_number: &str) -> Result<User> {
        let user: Option<User> = self
            .api
            .get(&format!("{}/by-id-number/{}", USERS_PATH, id_number), &[])
            .await?;
        user.ok_or_else(|| {
            AppError::UnexpectedResponse(format!("User with id number {} not found", id_number))
        })
    }

    /// Invalidates every token issued to the user.
    pub async fn revoke_tokens(&self, id: i64) -> Result<Ack> {
        tracing::info!("🔑 Revoking tokens of user {}", id);
        self.api
            .post_empty(&format!("{}/{}/revoke-tokens", USERS_PATH, id))
            .await
    }
}

#[async_trait]
impl Resource for UserService {
    type Item = User;
    type Draft = NewUser;
    type Patch = UserUpdate;
    type Target = UserDeletion;

    const MESSAGES: ResourceMessages = ResourceMessages {
        fetch_failed: "Failed to fetch users",
        created: "User created successfully!",
        create_failed: "Failed to create user",
        updated: "User updated successfully!",
        update_failed: "Failed to update user",
        deleted: "User deleted successfully!",
        delete_failed: "Failed to delete user",
    };

    fn default_sort() -> Sort {
        Sort::desc("createdAt")
    }

    async fn fetch_page(&self, query: &ListQuery) -> Result<PagePayload<User>> {
        let page: Option<PagePayload<User>> = self.api.get(USERS_PATH, &query.to_pairs()).await?;
        Ok(page.unwrap_or(PagePayload::Items(Vec::new())))
    }

    async fn create(&self, draft: &NewUser) -> Result<Ack> {
        tracing::debug!("Creating user {}", draft.username);
        self.api.post(USERS_PATH, draft).await
    }

    async fn update(&self, id: i64, patch: &UserUpdate) -> Result<Ack> {
        tracing::debug!("Updating user {}", id);
        self.api.put(&format!("{}/{}", USERS_PATH, id), patch).await
    }

    async fn remove(&self, target: &UserDeletion) -> Result<Ack> {
        tracing::debug!("Deleting user {}", target.id);
        self.api
            .delete_with(
                &format!("{}/{}", USERS_PATH, target.id),
                &DeleteConfirmation {
                    user_id_number: &target.id_number,
                },
            )
            .await
    }
}
