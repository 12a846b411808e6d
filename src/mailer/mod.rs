//! Out-of-band delivery of password reset tokens.

use tracing::info;

pub trait Mailer: Send + Sync {
    /// Delivers a reset token to the given address. Delivery failures are the
    /// mailer's own problem, the reset flow answered 200 the moment the token
    /// was issued.
    fn send_password_reset(&self, email: &str, token_value: &str);
}

/// Writes the reset link to the log instead of sending mail. Stands in for a
/// real delivery channel during development and self-hosted setups.
pub struct LogMailer {
    base_url: String,
}

impl LogMailer {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Mailer for LogMailer {
    fn send_password_reset(&self, email: &str, token_value: &str) {
        info!(
            "password reset for {}: {}/reset-password.html?token={}",
            email, self.base_url, token_value
        );
    }
}
