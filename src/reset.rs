//! Password reset wizard
//!
//! `Initial -> TokenGenerated -> TokenConfirmed -> Completed`. Each step only
//! advances after its API call succeeds; a failed call leaves the wizard on
//! the same step with the error recorded.

use crate::api::AuthApi;
use crate::error::{Error, Result};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// Waiting for the account email
    Initial,
    /// A reset token has been emailed
    TokenGenerated,
    /// The emailed token was accepted
    TokenConfirmed,
    Completed,
}

impl fmt::Display for ResetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetStep::Initial => write!(f, "INITIAL"),
            ResetStep::TokenGenerated => write!(f, "TOKEN_GENERATED"),
            ResetStep::TokenConfirmed => write!(f, "TOKEN_CONFIRMED"),
            ResetStep::Completed => write!(f, "COMPLETED"),
        }
    }
}

pub struct PasswordReset<A> {
    api: A,
    step: ResetStep,
    email: Option<String>,
    token: Option<String>,
    error: Option<String>,
}

impl<A: AuthApi> PasswordReset<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            step: ResetStep::Initial,
            email: None,
            token: None,
            error: None,
        }
    }

    pub fn step(&self) -> ResetStep {
        self.step
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Message from the last failed step
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Ask the API to email a reset token
    pub async fn request_token(&mut self, email: &str) -> Result<()> {
        self.expect_step(ResetStep::Initial, "request a reset token")?;
        let email = required(email, "email")?;

        let result = self.api.request_password_reset(&email).await;
        self.settle(result)?;

        info!("Reset token requested for {}", email);
        self.email = Some(email);
        self.step = ResetStep::TokenGenerated;
        Ok(())
    }

    /// Send the token again. The step does not change.
    pub async fn resend_token(&mut self) -> Result<()> {
        self.expect_step(ResetStep::TokenGenerated, "resend the reset token")?;
        let email = self.email.clone().unwrap_or_default();

        let result = self.api.request_password_reset(&email).await;
        self.settle(result)?;
        debug!("Reset token re-sent to {}", email);
        Ok(())
    }

    /// Check the token the user received
    pub async fn confirm_token(&mut self, token: &str) -> Result<()> {
        self.expect_step(ResetStep::TokenGenerated, "confirm a reset token")?;
        let token = required(token, "token")?;
        let email = self.email.clone().unwrap_or_default();

        let result = self.api.verify_reset_token(&email, &token).await;
        self.settle(result)?;

        self.token = Some(token);
        self.step = ResetStep::TokenConfirmed;
        Ok(())
    }

    /// Set the new password
    pub async fn complete(&mut self, password: &str, confirmation: &str) -> Result<()> {
        self.expect_step(ResetStep::TokenConfirmed, "set a new password")?;
        if password.is_empty() {
            return Err(self.invalid("password is required"));
        }
        if password != confirmation {
            return Err(self.invalid("passwords do not match"));
        }
        let email = self.email.clone().unwrap_or_default();
        let token = self.token.clone().unwrap_or_default();

        let result = self.api.reset_password(&email, &token, password).await;
        self.settle(result)?;

        info!("Password reset completed for {}", email);
        self.token = None;
        self.step = ResetStep::Completed;
        Ok(())
    }

    /// Abandon the flow and start over
    pub fn restart(&mut self) {
        self.step = ResetStep::Initial;
        self.email = None;
        self.token = None;
        self.error = None;
    }

    fn expect_step(&self, expected: ResetStep, action: &str) -> Result<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition(format!(
                "cannot {} while in {}",
                action, self.step
            )))
        }
    }

    fn invalid(&mut self, message: &str) -> Error {
        self.error = Some(message.to_string());
        Error::Validation(message.to_string())
    }

    /// Record the outcome of a step's API call
    fn settle(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Password reset step {} failed: {}", self.step, e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}
