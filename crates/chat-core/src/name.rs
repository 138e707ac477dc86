//! Participant display names.
//!
//! A name is the only identity a participant has, so it has to survive
//! the console front-end's command syntax (`/p <name> <text>`) and the
//! `, `-joined user list.

use thiserror::Error;

/// Maximum name length, in characters.
pub const MAX_NAME_LEN: usize = 20;

/// Why a proposed name was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name is {0} characters long (max {MAX_NAME_LEN})")]
    TooLong(usize),

    #[error("name must not contain whitespace")]
    Whitespace,

    #[error("name must not contain ','")]
    Comma,

    #[error("name must not start with '/'")]
    CommandPrefix,
}

/// Check a name against the registration rules.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(NameError::Empty);
    }
    if len > MAX_NAME_LEN {
        return Err(NameError::TooLong(len));
    }
    if name.starts_with('/') {
        return Err(NameError::CommandPrefix);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(NameError::Whitespace);
    }
    if name.contains(',') {
        return Err(NameError::Comma);
    }
    Ok(())
}
