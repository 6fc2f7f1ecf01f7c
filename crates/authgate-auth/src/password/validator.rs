//! Password policy enforcement for new passwords.

use authgate_core::config::AuthConfig;

/// Validates password strength against configured policies.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    /// Minimum password length in characters.
    min_length: usize,
    /// Minimum zxcvbn score, 0 to 4.
    min_score: u8,
}

impl PasswordValidator {
    /// Creates a new validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
            min_score: config.password_min_score.min(4),
        }
    }

    /// Validates a password, returning a description of the first violation.
    ///
    /// `user_inputs` are words the password must not lean on, such as the
    /// username.
    pub fn validate(&self, password: &str, user_inputs: &[&str]) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }

        let estimate = zxcvbn::zxcvbn(password, user_inputs);
        if (estimate.score() as u8) < self.min_score {
            return Err(
                "Password is too weak. Please use a stronger password with more entropy."
                    .to_string(),
            );
        }

        Ok(())
    }
}
