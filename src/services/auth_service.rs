use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::{CatalogError, CatalogResult};
use crate::models::User;
use crate::utils::hashing::{hash_password, verify_password};

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

fn invalid(msg: &str) -> CatalogError {
    CatalogError::Registration(msg.to_string())
}

pub async fn handle_register(users: &dyn UserRepository, req: RegisterRequest) -> CatalogResult<User> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(invalid("All fields are required."));
    }
    if username.len() > MAX_USERNAME_LEN
        || !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(invalid(
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(invalid("Invalid email format."));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(invalid("Password too short. It must contain at least 8 characters."));
    }
    if req.password != req.password_confirm {
        return Err(invalid("The two password fields didn't match."));
    }
    if users.get_by_username(username).await?.is_some() {
        return Err(invalid("Username already taken."));
    }
    if users.get_by_email(email).await?.is_some() {
        return Err(invalid("Email already in use."));
    }

    let user = User {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(&req.password)?,
        created_at: Utc::now(),
    };
    users.create(&user).await?;
    info!("Registered user {} ({})", user.username, user.user_id);
    Ok(user)
}

/// Accepts a username or an email as `identity`.
///
/// Every failure is the same [`CatalogError::InvalidCredentials`], whether
/// the identity is unknown or the password is wrong.
pub async fn login_user(users: &dyn UserRepository, identity: &str, password: &str) -> CatalogResult<User> {
    let identity = identity.trim();
    if identity.is_empty() || password.is_empty() {
        return Err(CatalogError::InvalidCredentials);
    }

    let candidates = [
        users.get_by_username(identity).await?,
        users.get_by_email(identity).await?,
    ];
    for user in candidates.into_iter().flatten() {
        if verify_password(&user.password, password) {
            return Ok(user);
        }
    }
    Err(CatalogError::InvalidCredentials)
}
