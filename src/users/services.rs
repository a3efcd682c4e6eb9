//! User lifecycle: creation, profile updates, login and lockout, email
//! verification, professional upgrade.
//!
//! Every operation takes the store explicitly; nothing here holds state.

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    auth::password::{generate_verification_token, hash_password, verify_password},
    config::AccountPolicy,
    notifier::{EmailNotifier, EmailTemplate},
    users::{
        dto::{UserCreate, UserUpdate},
        nickname::generate_nickname,
        repo::{ProfileChanges, StoreError, UniqueField, UserStore},
        repo_types::{User, UserRole},
        validation::{normalize_email, Normalize},
    },
};

const NICKNAME_ATTEMPTS: usize = 20;

#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    DuplicateEmail,
    DuplicateNickname,
    Invalid(ValidationErrors),
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(User),
    NotFound,
    DuplicateEmail,
    DuplicateNickname,
    Invalid(ValidationErrors),
}

pub async fn get_by_id(store: &dyn UserStore, id: Uuid) -> anyhow::Result<Option<User>> {
    Ok(store.find_by_id(id).await?)
}

pub async fn get_by_email(store: &dyn UserStore, email: &str) -> anyhow::Result<Option<User>> {
    Ok(store.find_by_email(&normalize_email(email)).await?)
}

pub async fn get_by_nickname(store: &dyn UserStore, nickname: &str) -> anyhow::Result<Option<User>> {
    Ok(store.find_by_nickname(nickname).await?)
}

pub async fn count(store: &dyn UserStore) -> anyhow::Result<i64> {
    Ok(store.count().await?)
}

pub async fn list_users(store: &dyn UserStore, skip: i64, limit: i64) -> anyhow::Result<Vec<User>> {
    Ok(store.list(skip, limit).await?)
}

pub async fn delete(store: &dyn UserStore, id: Uuid) -> anyhow::Result<bool> {
    let deleted = store.delete(id).await?;
    if deleted {
        info!(user_id = %id, "user deleted");
    }
    Ok(deleted)
}

/// Draw candidates from `next` until one is free, at most
/// `NICKNAME_ATTEMPTS` times.
async fn unique_nickname_with(
    store: &dyn UserStore,
    mut next: impl FnMut() -> String + Send,
) -> anyhow::Result<String> {
    for _ in 0..NICKNAME_ATTEMPTS {
        let candidate = next();
        if get_by_nickname(store, &candidate).await?.is_none() {
            return Ok(candidate);
        }
        debug!(nickname = %candidate, "generated nickname taken, retrying");
    }
    anyhow::bail!("no free nickname after {NICKNAME_ATTEMPTS} attempts")
}

/// Create a user through the public path. The first account becomes a
/// verified `ADMIN`; later ones start `ANONYMOUS` with a verification token.
pub async fn create(
    store: &dyn UserStore,
    notifier: &EmailNotifier,
    data: UserCreate,
) -> anyhow::Result<CreateOutcome> {
    create_with_role(store, notifier, data, None).await
}

pub async fn register_user(
    store: &dyn UserStore,
    notifier: &EmailNotifier,
    data: UserCreate,
) -> anyhow::Result<CreateOutcome> {
    create(store, notifier, data).await
}

/// Like [`create`], but an admin may grant `role` up front. Any role other
/// than `ANONYMOUS` is created verified and gets no verification email.
#[instrument(skip(store, notifier, data), fields(email = %data.email))]
pub async fn create_with_role(
    store: &dyn UserStore,
    notifier: &EmailNotifier,
    mut data: UserCreate,
    granted: Option<UserRole>,
) -> anyhow::Result<CreateOutcome> {
    data.normalize();
    if let Err(errors) = data.validate() {
        warn!(?errors, "user create rejected");
        return Ok(CreateOutcome::Invalid(errors));
    }

    if store.find_by_email(&data.email).await?.is_some() {
        warn!("user with this email already exists");
        return Ok(CreateOutcome::DuplicateEmail);
    }

    let nickname = match data.nickname.take() {
        Some(nickname) => {
            if get_by_nickname(store, &nickname).await?.is_some() {
                warn!(%nickname, "nickname already taken");
                return Ok(CreateOutcome::DuplicateNickname);
            }
            nickname
        }
        None => unique_nickname_with(store, generate_nickname).await?,
    };

    let hashed_password = hash_password(&data.password)?;
    let role = if store.count().await? == 0 {
        UserRole::Admin
    } else {
        granted.unwrap_or(UserRole::Anonymous)
    };

    let mut user = User::new(data.email, nickname, hashed_password, role);
    user.first_name = data.first_name;
    user.last_name = data.last_name;
    user.bio = data.bio;
    user.profile_picture_url = data.profile_picture_url;
    user.linkedin_profile_url = data.linkedin_profile_url;
    user.github_profile_url = data.github_profile_url;
    if role == UserRole::Anonymous {
        user.verification_token = Some(generate_verification_token());
    } else {
        user.email_verified = true;
    }

    let user = match store.insert(&user).await {
        Ok(user) => user,
        Err(e) => return conflict_or_err(e, CreateOutcome::DuplicateEmail, CreateOutcome::DuplicateNickname),
    };
    info!(user_id = %user.id, role = %user.role, "user created");

    if user.verification_token.is_some() {
        if let Err(e) = notifier.send_verification_email(&user).await {
            error!(error = ?e, user_id = %user.id, "failed to send verification email");
        }
    }

    Ok(CreateOutcome::Created(user))
}

fn conflict_or_err<T>(e: StoreError, on_email: T, on_nickname: T) -> anyhow::Result<T> {
    match e.conflicting_field() {
        Some(UniqueField::Email) => {
            warn!("email collided on write");
            Ok(on_email)
        }
        Some(UniqueField::Nickname) => {
            warn!("nickname collided on write");
            Ok(on_nickname)
        }
        None => Err(e.into()),
    }
}

/// Apply a partial profile update. Only fields present on [`UserUpdate`] can
/// change; a new password is re-hashed.
#[instrument(skip(store, data))]
pub async fn update(
    store: &dyn UserStore,
    id: Uuid,
    mut data: UserUpdate,
) -> anyhow::Result<UpdateOutcome> {
    data.normalize();
    if let Err(errors) = data.validate() {
        warn!(?errors, "user update rejected");
        return Ok(UpdateOutcome::Invalid(errors));
    }

    let hashed_password = data.password.as_deref().map(hash_password).transpose()?;
    let changes = ProfileChanges {
        email: data.email,
        nickname: data.nickname,
        hashed_password,
        first_name: data.first_name,
        last_name: data.last_name,
        bio: data.bio,
        profile_picture_url: data.profile_picture_url,
        linkedin_profile_url: data.linkedin_profile_url,
        github_profile_url: data.github_profile_url,
    };

    match store.update_profile(id, &changes).await {
        Ok(Some(user)) => {
            info!(user_id = %id, "user updated");
            Ok(UpdateOutcome::Updated(user))
        }
        Ok(None) => Ok(UpdateOutcome::NotFound),
        Err(e) => conflict_or_err(e, UpdateOutcome::DuplicateEmail, UpdateOutcome::DuplicateNickname),
    }
}

/// Check credentials. Requires, in order: a verified account, not locked, and
/// a matching password. Any failure against an existing account counts
/// towards the lockout threshold. Callers only learn success or failure.
#[instrument(skip(store, policy, password))]
pub async fn login(
    store: &dyn UserStore,
    policy: &AccountPolicy,
    email: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let Some(mut user) = store.find_by_email(&normalize_email(email)).await? else {
        debug!("login for unknown email");
        return Ok(None);
    };

    if user.email_verified && !user.is_locked && verify_password(password, &user.hashed_password)? {
        user.failed_login_attempts = 0;
        user.last_login_at = Some(OffsetDateTime::now_utc());
        let saved = store.save(&user).await?;
        info!(user_id = %user.id, "user logged in");
        return Ok(saved);
    }

    user.failed_login_attempts = user.failed_login_attempts.saturating_add(1);
    if user.failed_login_attempts >= policy.max_login_attempts && !user.is_locked {
        user.is_locked = true;
        warn!(user_id = %user.id, attempts = user.failed_login_attempts, "account locked");
    }
    store.save(&user).await?;
    warn!(user_id = %user.id, attempts = user.failed_login_attempts, "login failed");
    Ok(None)
}

pub async fn is_account_locked(store: &dyn UserStore, email: &str) -> anyhow::Result<bool> {
    Ok(get_by_email(store, email)
        .await?
        .map(|u| u.is_locked)
        .unwrap_or(false))
}

/// Set a new password and clear any lockout.
#[instrument(skip(store, new_password))]
pub async fn reset_password(
    store: &dyn UserStore,
    id: Uuid,
    new_password: &str,
) -> anyhow::Result<Option<User>> {
    let Some(mut user) = store.find_by_id(id).await? else {
        return Ok(None);
    };
    user.hashed_password = hash_password(new_password)?;
    user.failed_login_attempts = 0;
    user.is_locked = false;
    let saved = store.save(&user).await?;
    info!(user_id = %id, "password reset");
    Ok(saved)
}

/// Consume the one-time verification token. Succeeds at most once per token.
#[instrument(skip(store, token))]
pub async fn verify_email_with_token(
    store: &dyn UserStore,
    id: Uuid,
    token: &str,
) -> anyhow::Result<bool> {
    let Some(mut user) = store.find_by_id(id).await? else {
        return Ok(false);
    };
    if user.verification_token.as_deref() != Some(token) {
        warn!(user_id = %id, "verification token mismatch");
        return Ok(false);
    }

    user.verification_token = None;
    user.email_verified = true;
    if user.role == UserRole::Anonymous {
        user.role = UserRole::Authenticated;
    }
    let saved = store.save(&user).await?.is_some();
    info!(user_id = %id, "email verified");
    Ok(saved)
}

/// Mark the user professional. The upgrade is kept even if the notification
/// email cannot be sent.
#[instrument(skip(store, notifier))]
pub async fn upgrade_to_professional(
    store: &dyn UserStore,
    notifier: &EmailNotifier,
    id: Uuid,
) -> anyhow::Result<Option<User>> {
    debug!("upgrading user to professional");
    let Some(mut user) = store.find_by_id(id).await? else {
        warn!(user_id = %id, "user not found");
        return Ok(None);
    };

    user.is_professional = true;
    user.professional_status_updated_at = Some(OffsetDateTime::now_utc());
    let Some(user) = store.save(&user).await? else {
        return Ok(None);
    };
    info!(user_id = %id, email = %user.email, "user upgraded to professional");

    match notifier
        .send_user_email(&user, EmailTemplate::ProfessionalUpgrade)
        .await
    {
        Ok(()) => info!(email = %user.email, "professional upgrade email sent"),
        Err(e) => error!(error = ?e, "failed to send professional upgrade email"),
    }

    Ok(Some(user))
}
