use serde::Serialize;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: usize,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub created: SystemTime,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("unknown user")]
    UnknownUser,
    #[error("wrong password")]
    WrongPassword,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PasswordResetError {
    #[error("unknown email")]
    UnknownEmail,
    #[error("invalid or expired reset token")]
    InvalidToken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
