//! In-memory user store for tests

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::models::{NewUser, User};
use crate::repositories::UserStore;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    fail_lookups: AtomicBool,
    fail_increments: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with the given upload count; email is `{username}@example.com`
    pub fn insert_user(&self, username: &str, upload_count: i32) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            password_hash: String::new(),
            name: Some(username.to_string()),
            avatar: None,
            upload_count,
            created_at: Utc::now(),
        };
        self.lock().insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.lock().get(&id).cloned()
    }

    pub fn upload_count(&self, id: Uuid) -> Option<i32> {
        self.get(id).map(|u| u.upload_count)
    }

    pub fn set_upload_count(&self, id: Uuid, upload_count: i32) {
        if let Some(user) = self.lock().get_mut(&id) {
            user.upload_count = upload_count;
        }
    }

    pub fn remove(&self, id: Uuid) {
        self.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every lookup return an error
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make `increment_upload_count` return an error
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, User>> {
        self.users.lock().expect("user store lock poisoned")
    }

    fn check_lookup(&self) -> Result<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            anyhow::bail!("user store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.check_lookup()?;
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_lookup()?;
        Ok(self.lock().values().find(|u| u.email == email).cloned())
    }

    async fn exists_with_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        self.check_lookup()?;
        Ok(self
            .lock()
            .values()
            .any(|u| u.email == email || u.username == username))
    }

    async fn create(&self, new_user: &NewUser) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            name: new_user.name.clone(),
            avatar: None,
            upload_count: 0,
            created_at: Utc::now(),
        };
        self.lock().insert(user.id, user.clone());
        Ok(user)
    }

    async fn increment_upload_count(&self, id: Uuid) -> Result<()> {
        if self.fail_increments.load(Ordering::SeqCst) {
            anyhow::bail!("user store unavailable");
        }
        match self.lock().get_mut(&id) {
            Some(user) => {
                user.upload_count += 1;
                Ok(())
            }
            None => anyhow::bail!("User {} not found", id),
        }
    }
}
