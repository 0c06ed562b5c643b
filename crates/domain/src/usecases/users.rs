//! User registration use case

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    model::{NewUser, User},
    ports::{Clock, UserError, UserStore},
};

/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 60;

/// Use case for registering and listing dashboard users
pub struct UserService<S: UserStore + ?Sized, C: Clock + ?Sized> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: UserStore + ?Sized, C: Clock + ?Sized> UserService<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Validate and persist a new user
    pub async fn register(&self, input: NewUser) -> Result<User, UserError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(UserError::Validation("Name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(UserError::Validation(format!(
                "Name cannot be more than {MAX_NAME_LEN} characters"
            )));
        }

        let email = input.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(UserError::Validation("Email is required".to_string()));
        }
        if !email.contains('@') {
            return Err(UserError::Validation(
                "Please provide a valid email".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            created_at: self.clock.now(),
        };
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// All users in creation order
    pub async fn list(&self) -> Result<Vec<User>, UserError> {
        self.store.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::macros::datetime;

    #[derive(Default)]
    struct FakeUserStore {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserStore for FakeUserStore {
        async fn list_users(&self) -> Result<Vec<User>, UserError> {
            Ok(self.users.lock().unwrap().clone())
        }

        async fn insert_user(&self, user: &User) -> Result<(), UserError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == user.email) {
                return Err(UserError::Duplicate(user.email.clone()));
            }
            users.push(user.clone());
            Ok(())
        }
    }

    fn service() -> UserService<FakeUserStore, FixedClock> {
        UserService::new(
            Arc::new(FakeUserStore::default()),
            Arc::new(FixedClock(datetime!(2024-01-05 10:00 UTC))),
        )
    }

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_input() {
        let user = service()
            .register(new_user("  Dana  ", " Dana@Example.COM "))
            .await
            .unwrap();

        assert_eq!(user.name, "Dana");
        assert_eq!(user.email, "dana@example.com");
        assert_eq!(user.created_at, datetime!(2024-01-05 10:00 UTC));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let service = service();
        for input in [
            new_user("", "a@b.c"),
            new_user("   ", "a@b.c"),
            new_user(&"x".repeat(MAX_NAME_LEN + 1), "a@b.c"),
            new_user("Dana", ""),
            new_user("Dana", "not-an-email"),
        ] {
            assert!(matches!(
                service.register(input).await,
                Err(UserError::Validation(_))
            ));
        }

        assert!(
            service
                .register(new_user(&"x".repeat(MAX_NAME_LEN), "a@b.c"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let service = service();
        service.register(new_user("Dana", "dana@example.com")).await.unwrap();

        let err = service
            .register(new_user("Other", "DANA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let service = service();
        service.register(new_user("A", "a@example.com")).await.unwrap();
        service.register(new_user("B", "b@example.com")).await.unwrap();

        let names: Vec<_> = service.list().await.unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
