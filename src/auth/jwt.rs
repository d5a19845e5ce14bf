//! Admin session tokens
//!
//! Tokens are HS256 JWTs signed with the password of the admin they were
//! issued to, so changing that password revokes every session of theirs.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::credentials::{Credential, CredentialList};
use super::AuthError;

/// Payload stored in JWT token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly issued token and its lifetime in seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub max_age_secs: i64,
}

impl IssuedToken {
    /// `Set-Cookie` header value carrying this token
    pub fn cookie(&self) -> String {
        format!(
            "token={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={}",
            self.token, self.max_age_secs
        )
    }
}

/// Issue a token for `admin` valid for `expiry_days`
pub fn issue_token(admin: &Credential, expiry_days: i64) -> Result<IssuedToken, AuthError> {
    let max_age_secs = expiry_days.max(0) * 24 * 60 * 60;
    let claims = Claims {
        username: admin.username.clone(),
        exp: Utc::now().timestamp() + max_age_secs,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(admin.password.as_bytes()),
    )?;

    Ok(IssuedToken {
        token,
        max_age_secs,
    })
}

/// Verify `token` against every admin; the signer's username must match the claims
pub fn verify_token(token: &str, admins: &CredentialList) -> Option<Claims> {
    let validation = Validation::new(Algorithm::HS256);

    admins.iter().find_map(|admin| {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(admin.password.as_bytes()),
            &validation,
        )
        .ok()?;

        (data.claims.username == admin.username).then_some(data.claims)
    })
}
