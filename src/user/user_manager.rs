use super::auth::{AuthToken, AuthTokenValue, PasswordResetToken, UsernamePasswordCredentials};
use super::user_models::{LoginError, PasswordResetError, RegistrationError, User};
use super::user_store::UserStore;
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Orchestrates registration, login and the password reset flow over a
/// [`UserStore`]. All methods are cheap wrappers around store calls, the store
/// itself serializes database access.
pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, RegistrationError> {
        if username.trim().is_empty() {
            return Err(RegistrationError::InvalidInput(
                "username cannot be empty".to_string(),
            ));
        }
        if email.trim().is_empty() {
            return Err(RegistrationError::InvalidInput(
                "email cannot be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(RegistrationError::InvalidInput(
                "password cannot be empty".to_string(),
            ));
        }

        if self.user_store.get_user_by_username(username)?.is_some() {
            return Err(RegistrationError::DuplicateUsername);
        }
        if self.user_store.get_user_by_email(email)?.is_some() {
            return Err(RegistrationError::DuplicateEmail);
        }

        let user_id = self.user_store.create_user(username, email)?;
        let credentials = UsernamePasswordCredentials::from_plain_password(user_id, password)
            .map_err(RegistrationError::Internal)?;
        self.user_store.set_password_credentials(credentials)?;

        debug!("registered user {} (id {})", username, user_id);
        self.user_store
            .get_user(user_id)?
            .ok_or_else(|| RegistrationError::Internal(anyhow::anyhow!("user vanished after insert")))
    }

    /// Logs in by username or email, issuing a fresh bearer token.
    pub fn login(&self, identifier: &str, password: &str) -> Result<(User, AuthToken), LoginError> {
        let user = match self.find_by_identifier(identifier)? {
            Some(user) => user,
            None => return Err(LoginError::UnknownUser),
        };

        let credentials = self
            .user_store
            .get_password_credentials(user.id)
            .map_err(LoginError::Internal)?
            .ok_or(LoginError::UnknownUser)?;

        let verified = credentials
            .hasher
            .verify(password, &credentials.hash)
            .map_err(LoginError::Internal)?;
        if !verified {
            return Err(LoginError::WrongPassword);
        }

        self.user_store
            .touch_password_credentials(user.id)
            .map_err(LoginError::Internal)?;

        let token = AuthToken::issue(user.id);
        self.user_store
            .add_auth_token(token.clone())
            .map_err(LoginError::Internal)?;
        Ok((user, token))
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, LoginError> {
        if let Some(user) = self
            .user_store
            .get_user_by_username(identifier)
            .map_err(LoginError::Internal)?
        {
            return Ok(Some(user));
        }
        self.user_store
            .get_user_by_email(identifier)
            .map_err(LoginError::Internal)
    }

    /// Resolves a bearer token into its owning user. Expired tokens are pruned
    /// on sight and treated as absent.
    pub fn resolve_session(&self, value: &AuthTokenValue) -> Result<Option<(User, AuthToken)>> {
        let token = match self.user_store.get_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };

        if token.is_expired(SystemTime::now()) {
            debug!("pruning expired auth token of user {}", token.user_id);
            self.user_store.delete_auth_token(value)?;
            return Ok(None);
        }

        self.user_store.touch_auth_token(value)?;

        let user = match self.user_store.get_user(token.user_id)? {
            Some(user) => user,
            None => return Ok(None),
        };
        Ok(Some((user, token)))
    }

    pub fn logout(&self, user_id: usize, value: &AuthTokenValue) -> Result<()> {
        let token = match self.user_store.get_auth_token(value)? {
            Some(token) => token,
            None => bail!("Auth token not found"),
        };
        if token.user_id != user_id {
            warn!(
                "user {} tried to delete a token owned by user {}",
                user_id, token.user_id
            );
            bail!("Auth token is not owned by the authenticated user");
        }
        self.user_store.delete_auth_token(value)?;
        Ok(())
    }

    /// Starts the reset flow for the given email. The returned token is handed
    /// to the mailer by the caller, it is never exposed in the HTTP response.
    pub fn start_password_reset(
        &self,
        email: &str,
    ) -> Result<PasswordResetToken, PasswordResetError> {
        let user = self
            .user_store
            .get_user_by_email(email)
            .map_err(PasswordResetError::Internal)?
            .ok_or(PasswordResetError::UnknownEmail)?;

        let token = PasswordResetToken::issue(user.id);
        self.user_store
            .add_reset_token(token.clone())
            .map_err(PasswordResetError::Internal)?;
        Ok(token)
    }

    pub fn confirm_password_reset(
        &self,
        token_value: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        if new_password.is_empty() {
            return Err(PasswordResetError::InvalidInput(
                "password cannot be empty".to_string(),
            ));
        }

        let token = self
            .user_store
            .get_reset_token(token_value)
            .map_err(PasswordResetError::Internal)?
            .ok_or(PasswordResetError::InvalidToken)?;

        if token.used || token.is_expired(SystemTime::now()) {
            return Err(PasswordResetError::InvalidToken);
        }

        let credentials =
            UsernamePasswordCredentials::from_plain_password(token.user_id, new_password)
                .map_err(PasswordResetError::Internal)?;
        self.user_store
            .set_password_credentials(credentials)
            .map_err(PasswordResetError::Internal)?;
        self.user_store
            .mark_reset_token_used(token_value)
            .map_err(PasswordResetError::Internal)?;
        Ok(())
    }
}
