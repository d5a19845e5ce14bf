//! Request authentication
//!
//! - Admins log in with `x-admin-password` and receive a `token` cookie
//! - A valid `token` cookie grants admin and user access
//! - Users present their password in `x-password` or a `password` form field

mod credentials;
mod jwt;

pub use credentials::{Credential, CredentialList};
pub use jwt::{issue_token, verify_token, Claims, IssuedToken};

use axum::http::{header, HeaderMap};

use crate::config::AuthConfig;

/// Header carrying an admin password
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Header carrying a user password
pub const USER_PASSWORD_HEADER: &str = "x-password";

/// Cookie holding the admin session token
pub const TOKEN_COOKIE: &str = "token";

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

/// Outcome of checking a request's headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Valid session cookie or password header
    Granted,
    /// Admin login succeeded; the token should be set as a cookie
    Issued(IssuedToken),
    /// A password header was presented and did not match
    Denied,
    /// Nothing usable was presented
    NoCredentials,
}

/// Checks credentials against the configured admin and user lists
#[derive(Debug, Clone)]
pub struct Authenticator {
    admins: CredentialList,
    users: CredentialList,
    expiry_days: i64,
}

impl Authenticator {
    pub fn new(admins: CredentialList, users: CredentialList, expiry_days: i64) -> Self {
        Self {
            admins,
            users,
            expiry_days,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            CredentialList::parse(&config.admins),
            CredentialList::parse(&config.users),
            config.jwt_expiry_days,
        )
    }

    /// Check the cookie and password headers of a request for `role`
    pub fn authorize(&self, headers: &HeaderMap, role: Role) -> Result<Access, AuthError> {
        if let Some(token) = token_from_cookies(headers) {
            if verify_token(&token, &self.admins).is_some() {
                return Ok(Access::Granted);
            }
        }

        match role {
            Role::Admin => {
                let Some(password) = header_str(headers, ADMIN_PASSWORD_HEADER) else {
                    return Ok(Access::NoCredentials);
                };
                match self.admins.find_by_password(password) {
                    Some(admin) => Ok(Access::Issued(issue_token(admin, self.expiry_days)?)),
                    None => Ok(Access::Denied),
                }
            }
            Role::User => {
                let Some(password) = header_str(headers, USER_PASSWORD_HEADER) else {
                    return Ok(Access::NoCredentials);
                };
                if self.check_user_password(Some(password)) {
                    Ok(Access::Granted)
                } else {
                    Ok(Access::Denied)
                }
            }
        }
    }

    /// Whether `password` belongs to a configured user
    pub fn check_user_password(&self, password: Option<&str>) -> bool {
        match password {
            Some(password) if !password.is_empty() => {
                self.users.find_by_password(password).is_some()
            }
            _ => false,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Value of the `token` cookie, if any
fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == TOKEN_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}
