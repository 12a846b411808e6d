use super::auth::{AuthToken, AuthTokenValue, PasswordResetToken, UsernamePasswordCredentials};
use super::user_models::User;
use anyhow::Result;

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns the auth token with the given value.
    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Adds a new auth token.
    fn add_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Deletes an auth token, returning it if it existed.
    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Stamps the token's last_used timestamp with the current time.
    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()>;
}

pub trait PasswordResetStore: Send + Sync {
    /// Adds a new reset token.
    fn add_reset_token(&self, token: PasswordResetToken) -> Result<()>;

    /// Returns the reset token with the given value.
    /// Returns Ok(None) if the token does not exist.
    fn get_reset_token(&self, value: &str) -> Result<Option<PasswordResetToken>>;

    /// Flags a reset token as consumed.
    fn mark_reset_token_used(&self, value: &str) -> Result<()>;
}

pub trait UserStore: UserAuthTokenStore + PasswordResetStore + Send + Sync {
    /// Creates a new user and returns the user id.
    /// Fails if the username or email is already taken.
    fn create_user(&self, username: &str, email: &str) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has this username.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has this email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns Ok(None) if the user has no password credentials.
    fn get_password_credentials(
        &self,
        user_id: usize,
    ) -> Result<Option<UsernamePasswordCredentials>>;

    /// Inserts or overwrites the user's password credentials.
    fn set_password_credentials(&self, credentials: UsernamePasswordCredentials) -> Result<()>;

    /// Stamps the credentials' last_used timestamp with the current time.
    fn touch_password_credentials(&self, user_id: usize) -> Result<()>;

    /// Returns all usernames.
    fn all_usernames(&self) -> Result<Vec<String>>;
}
