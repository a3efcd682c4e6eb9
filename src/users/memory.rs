//! In-memory `UserStore` used by the test suite.

use async_trait::async_trait;
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::{ProfileChanges, StoreError, UserStore, EMAIL_CONSTRAINT, NICKNAME_CONSTRAINT};
use crate::users::repo_types::User;

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        users: &[User],
        id: Uuid,
        email: &str,
        nickname: &str,
    ) -> Result<(), StoreError> {
        for other in users.iter().filter(|u| u.id != id) {
            if other.email == email {
                return Err(StoreError::UniqueViolation(EMAIL_CONSTRAINT.into()));
            }
            if other.nickname == nickname {
                return Err(StoreError::UniqueViolation(NICKNAME_CONSTRAINT.into()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.nickname == nickname).cloned())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert(&self, user: &User) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        Self::check_unique(&users, user.id, &user.email, &user.nickname)?;
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(current) = users.iter().find(|u| u.id == id).cloned() else {
            return Ok(None);
        };
        let mut next = current;
        let set = |slot: &mut Option<String>, value: &Option<String>| {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        };
        if let Some(email) = &changes.email {
            next.email = email.clone();
        }
        if let Some(nickname) = &changes.nickname {
            next.nickname = nickname.clone();
        }
        if let Some(hash) = &changes.hashed_password {
            next.hashed_password = hash.clone();
        }
        set(&mut next.first_name, &changes.first_name);
        set(&mut next.last_name, &changes.last_name);
        set(&mut next.bio, &changes.bio);
        set(&mut next.profile_picture_url, &changes.profile_picture_url);
        set(&mut next.linkedin_profile_url, &changes.linkedin_profile_url);
        set(&mut next.github_profile_url, &changes.github_profile_url);
        next.updated_at = OffsetDateTime::now_utc();

        Self::check_unique(&users, id, &next.email, &next.nickname)?;
        if let Some(slot) = users.iter_mut().find(|u| u.id == id) {
            *slot = next.clone();
        }
        Ok(Some(next))
    }

    async fn save(&self, user: &User) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(slot) = users.iter_mut().find(|u| u.id == user.id) else {
            return Ok(None);
        };
        slot.hashed_password = user.hashed_password.clone();
        slot.role = user.role;
        slot.email_verified = user.email_verified;
        slot.verification_token = user.verification_token.clone();
        slot.is_locked = user.is_locked;
        slot.failed_login_attempts = user.failed_login_attempts;
        slot.is_professional = user.is_professional;
        slot.professional_status_updated_at = user.professional_status_updated_at;
        slot.last_login_at = user.last_login_at;
        slot.updated_at = OffsetDateTime::now_utc();
        Ok(Some(slot.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}
