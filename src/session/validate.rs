//! Input checks for registration and login.

use crate::error::ApiError;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_NAME_LENGTH: usize = 64;

/// Trim and check an email address. Returns the trimmed address.
pub fn email(email: &str) -> Result<&str, ApiError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }

    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Email cannot be longer than {} characters",
            MAX_EMAIL_LENGTH
        )));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Email is not valid"));
    }

    Ok(email)
}

/// Check a password. Passwords are never trimmed.
pub fn password(password: &str) -> Result<&str, ApiError> {
    if password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password cannot be longer than {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }

    Ok(password)
}

/// Trim and check a display name. Returns the trimmed name.
pub fn name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Name cannot be longer than {} characters",
            MAX_NAME_LENGTH
        )));
    }

    Ok(name)
}
