use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("User already exists: {0}")]
    Conflict(String),
}

/// Users keyed by email. Emails are unique; there is no update or delete.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts `user` unless its email is already taken. The check and the
    /// insert are one atomic step.
    async fn insert_if_absent(&self, user: User) -> Result<(), RegistryError>;
    async fn find_by_email(&self, email: &str) -> Option<User>;
}

/// Process-lifetime registry. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert_if_absent(&self, user: User) -> Result<(), RegistryError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(RegistryError::Conflict(user.email)),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        self.users.get(email).map(|u| u.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(email: &str, hash: &str) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: hash.to_string(),
            name: "Test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryUserRepository::new();
        repo.insert_if_absent(user("a@x.io", "h1")).await.unwrap();

        let found = repo.find_by_email("a@x.io").await.unwrap();
        assert_eq!(found.password_hash, "h1");
        assert!(repo.find_by_email("b@x.io").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_does_not_overwrite() {
        let repo = InMemoryUserRepository::new();
        repo.insert_if_absent(user("a@x.io", "first")).await.unwrap();

        let err = repo
            .insert_if_absent(user("a@x.io", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(_)));
        assert_eq!(
            repo.find_by_email("a@x.io").await.unwrap().password_hash,
            "first"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.insert_if_absent(user("race@x.io", &format!("h{}", i)))
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(repo.find_by_email("race@x.io").await.is_some());
    }
}
