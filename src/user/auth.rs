//! Authentication primitives: password hashing, bearer tokens, reset tokens.

use anyhow::{bail, Result};

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Bearer tokens expire one hour after issuance.
pub const AUTH_TOKEN_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Password reset tokens are valid for fifteen minutes.
pub const RESET_TOKEN_MAX_AGE: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: usize,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
    pub value: AuthTokenValue,
}

impl AuthToken {
    pub fn issue(user_id: usize) -> AuthToken {
        AuthToken {
            user_id,
            created: SystemTime::now(),
            last_used: None,
            value: AuthTokenValue::generate(),
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        match now.duration_since(self.created) {
            Ok(age) => age >= AUTH_TOKEN_MAX_AGE,
            // Token created "in the future" only happens with a skewed clock.
            Err(_) => false,
        }
    }
}

/// Single-use token for the out-of-band password reset flow.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PasswordResetToken {
    pub user_id: usize,
    pub value: String,
    pub created: SystemTime,
    pub used: bool,
}

impl PasswordResetToken {
    pub fn issue(user_id: usize) -> PasswordResetToken {
        PasswordResetToken {
            user_id,
            value: uuid::Uuid::new_v4().to_string(),
            created: SystemTime::now(),
            used: false,
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        match now.duration_since(self.created) {
            Ok(age) => age >= RESET_TOKEN_MAX_AGE,
            Err(_) => false,
        }
    }
}

mod hsound_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum HsoundHasher {
    Argon2,
}

impl FromStr for HsoundHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(HsoundHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for HsoundHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HsoundHasher::Argon2 => write!(f, "argon2"),
        }
    }
}

impl HsoundHasher {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            HsoundHasher::Argon2 => hsound_argon2::generate_b64_salt(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            HsoundHasher::Argon2 => hsound_argon2::hash(plain, b64_salt),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        match self {
            HsoundHasher::Argon2 => {
                hsound_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UsernamePasswordCredentials {
    pub user_id: usize,
    pub salt: String,
    pub hash: String,
    pub hasher: HsoundHasher,

    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
}

impl UsernamePasswordCredentials {
    pub fn from_plain_password(user_id: usize, password: &str) -> Result<Self> {
        let hasher = HsoundHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_used: None,
        })
    }
}
