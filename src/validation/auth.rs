use crate::error::{AppError, FieldErrors, Result};

/// Upper bound on the username the login form accepts.
const MAX_USERNAME_LEN: usize = 255;
/// Upper bound on the password the login form accepts.
const MAX_PASSWORD_LEN: usize = 128;

/// Validates a username.
///
/// # Arguments
///
/// * `username` - The username to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the username is valid.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AppError::invalid("username", "Username is required"));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(AppError::invalid(
            "username",
            format!("Username must be at most {} characters", MAX_USERNAME_LEN),
        ));
    }

    Ok(())
}

/// Validates a password.
///
/// # Arguments
///
/// * `password` - The password to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the password is valid.
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(AppError::invalid("password", "Password is required"));
    }

    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::invalid(
            "password",
            format!("Password must be at most {} characters", MAX_PASSWORD_LEN),
        ));
    }

    Ok(())
}

/// Checks both login fields, reporting every failing one.
pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    let mut errors = FieldErrors::new();
    for result in [validate_username(username), validate_password(password)] {
        if let Err(AppError::Validation(fields)) = result {
            errors.extend(fields);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
