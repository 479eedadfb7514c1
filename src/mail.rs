use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MailError(pub String);

/// Narrow mail contract: `(to, subject, body)` in, success or failure out.
/// Callers decide whether a failure is fatal; everywhere except
/// forgot-password it is logged and swallowed.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Default mailer: writes outbound mail to the log instead of an SMTP relay.
/// Useful in development and as a stand-in until a real dispatcher is wired.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, body_bytes = body.len(), "email dispatched (log only)");
        Ok(())
    }
}

/// Body templates. Each ends with the raw token as the final word so simple
/// clients (and tests) can extract it.
pub fn verification_email(first_name: &str, token: &str) -> (String, String) {
    (
        "Verify your email address".to_owned(),
        format!(
            "Hi {first_name},\n\n\
             Welcome! Please verify your email address within 24 hours using \
             the token below.\n\n\
             Verification token: {token}"
        ),
    )
}

pub fn password_reset_email(first_name: &str, token: &str) -> (String, String) {
    (
        "Reset your password".to_owned(),
        format!(
            "Hi {first_name},\n\n\
             A password reset was requested for your account. The token below \
             is valid for one hour; if you did not request this, ignore this \
             email.\n\n\
             Reset token: {token}"
        ),
    )
}
