use std::sync::Arc;

use cache::GroupCache;
use config::{AdminBootstrap, Config};
use database::Store;
use domain::{Role, User};
use error::AppError;
use notify::Notifier;

pub mod cache;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod notify;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub cache: Option<GroupCache>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn invalidate_group_listing(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate().await;
        }
    }
}

/// Creates the configured admin account unless its email is already taken.
/// Returns whether an account was created.
pub async fn ensure_admin(
    store: &dyn Store,
    admin: &AdminBootstrap,
    bcrypt_cost: u32,
) -> Result<bool, AppError> {
    let email = domain::user::normalize_email(&admin.email);
    if let Some(existing) = store.find_user_by_email(&email).await? {
        if existing.is_admin() {
            tracing::debug!("Admin account {} already exists", email);
        } else {
            tracing::warn!(
                "ADMIN_EMAIL {} belongs to a regular user, no admin account was created",
                email
            );
        }
        return Ok(false);
    }

    let password = admin.password.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || utils::hash_password(&password, bcrypt_cost))
            .await
            .map_err(AppError::internal)??;

    let user = User::new(&admin.name, &email, "", password_hash, Role::Admin);
    store.insert_user(&user).await?;
    tracing::info!("Created admin account {}", user.email);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn bootstrap() -> AdminBootstrap {
        AdminBootstrap {
            email: "Root@Example.com".to_string(),
            name: "Root".to_string(),
            password: "root-password".to_string(),
        }
    }

    #[tokio::test]
    async fn admin_is_created_once() {
        let store = MemoryStore::new();
        assert!(ensure_admin(&store, &bootstrap(), 4).await.unwrap());
        assert!(!ensure_admin(&store, &bootstrap(), 4).await.unwrap());

        let admin = store
            .find_user_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn email_held_by_regular_user_is_left_alone() {
        let store = MemoryStore::new();
        let user = User::new("Plain", "root@example.com", "", "x".into(), Role::User);
        store.insert_user(&user).await.unwrap();

        assert!(!ensure_admin(&store, &bootstrap(), 4).await.unwrap());
        let held = store.find_user(user.id).await.unwrap().unwrap();
        assert!(!held.is_admin());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }
}
