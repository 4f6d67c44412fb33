//! crates/paypeek_core/src/auth.rs
//!
//! Client-side form validation and the user-facing authentication error taxonomy.

use crate::ports::PortError;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

pub const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Error Types
//=========================================================================================

/// A form check that failed before anything was sent to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error(
        "Password must be at least 8 characters with at least one uppercase letter, one lowercase letter, and one number"
    )]
    WeakPassword,
}

/// Every auth failure reduces to one of these; `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unable to reach the authentication service. Please check your connection and try again.")]
    NetworkFailure(String),
    #[error(transparent)]
    ValidationFailure(#[from] ValidationError),
    #[error("{0}")]
    Provider(String),
    #[error("Something went wrong. Please try again.")]
    Unexpected(String),
}

impl From<PortError> for AuthError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unauthorized => AuthError::InvalidCredentials,
            PortError::Network(detail) => AuthError::NetworkFailure(detail),
            PortError::Rejected(message) => AuthError::Provider(message),
            other => AuthError::Unexpected(other.to_string()),
        }
    }
}

//=========================================================================================
// Forms
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.email) || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    /// Checks run in the order the form reports them: presence, e-mail shape,
    /// confirmation match, then password strength.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.display_name)
            || is_blank(&self.email)
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ValidationError::MissingFields);
        }
        validate_email(&self.email)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        validate_password(&self.password)
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_PATTERN.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// At least eight characters with a lowercase letter, an uppercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_lower && has_upper && has_digit {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            display_name: "Mia".into(),
            email: "mia@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn sign_in_requires_both_fields() {
        let form = SignInForm {
            email: "  ".into(),
            password: "secret".into(),
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingFields));

        let form = SignInForm {
            email: "a@b.co".into(),
            password: "x".into(),
        };
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn sign_up_checks_confirmation_before_strength() {
        assert_eq!(
            sign_up("short", "different").validate(),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            sign_up("short", "short").validate(),
            Err(ValidationError::WeakPassword)
        );
        assert_eq!(sign_up("Sunny2024", "Sunny2024").validate(), Ok(()));
    }

    #[test]
    fn sign_up_rejects_malformed_email() {
        let mut form = sign_up("Sunny2024", "Sunny2024");
        form.email = "not-an-email".into();
        assert_eq!(form.validate(), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn password_policy_needs_every_character_class() {
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password("Ab1").is_err());
        assert!(validate_password("Abcdefg1").is_ok());
    }

    #[test]
    fn port_errors_map_to_user_facing_taxonomy() {
        assert_eq!(AuthError::from(PortError::Unauthorized), AuthError::InvalidCredentials);
        assert_eq!(
            AuthError::from(PortError::Rejected("User already registered".into())).to_string(),
            "User already registered"
        );
        assert!(matches!(
            AuthError::from(PortError::Network("timeout".into())),
            AuthError::NetworkFailure(_)
        ));
        assert!(matches!(
            AuthError::from(PortError::Malformed("no id".into())),
            AuthError::Unexpected(_)
        ));
    }
}
