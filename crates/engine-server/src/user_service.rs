//! User-service capability.
//!
//! The dispatcher only sees the [`UserService`] trait; the in-memory
//! implementation below is what the server wires in by default.

use std::collections::HashMap;

use async_trait::async_trait;
use engine_protocol::users::{CreateUserParams, UpdateUserParams, User};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum UserServiceError {
    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email {0} is already registered")]
    DuplicateEmail(String),
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, UserServiceError>;
    async fn get_user(&self, user_id: Uuid) -> Result<User, UserServiceError>;
    async fn update_user(&self, params: UpdateUserParams) -> Result<User, UserServiceError>;
    async fn delete_user(&self, user_id: Uuid) -> Result<(), UserServiceError>;
    async fn list_users(&self) -> Result<Vec<User>, UserServiceError>;
}

/// Process-local user store.
#[derive(Debug, Default)]
pub struct InMemoryUserService {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserService for InMemoryUserService {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, UserServiceError> {
        validate_fields(&params.first_name, &params.last_name, &params.email)?;

        let mut users = self.users.write().await;
        ensure_email_free(&users, &params.email, None)?;

        let user = User::from_create(Uuid::new_v4(), params);
        users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, UserServiceError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(UserServiceError::NotFound(user_id))
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<User, UserServiceError> {
        validate_fields(&params.first_name, &params.last_name, &params.email)?;

        let mut users = self.users.write().await;
        if !users.contains_key(&params.user_id) {
            return Err(UserServiceError::NotFound(params.user_id));
        }
        ensure_email_free(&users, &params.email, Some(params.user_id))?;

        let user = User::from_update(params);
        users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), UserServiceError> {
        self.users
            .write()
            .await
            .remove(&user_id)
            .map(|_| ())
            .ok_or(UserServiceError::NotFound(user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(all)
    }
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

fn validate_fields(first_name: &str, last_name: &str, email: &str) -> Result<(), UserServiceError> {
    validate_name("first_name", first_name)?;
    validate_name("last_name", last_name)?;
    if !looks_like_email(email) {
        return Err(UserServiceError::Validation(format!("invalid email {email:?}")));
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), UserServiceError> {
    let len = value.trim().chars().count();
    if (NAME_MIN..=NAME_MAX).contains(&len) {
        Ok(())
    } else {
        Err(UserServiceError::Validation(format!(
            "{field} must be {NAME_MIN}..={NAME_MAX} characters"
        )))
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn ensure_email_free(
    users: &HashMap<Uuid, User>,
    email: &str,
    except: Option<Uuid>,
) -> Result<(), UserServiceError> {
    let taken = users
        .values()
        .any(|u| Some(u.user_id) != except && u.email.eq_ignore_ascii_case(email));
    if taken {
        Err(UserServiceError::DuplicateEmail(email.to_string()))
    } else {
        Ok(())
    }
}
