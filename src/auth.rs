//! Credential validation
//!
//! Pure check of a raw `<username>\n<password>\n` payload against the room secret.

use crate::error::{AuthError, MalformedCredentials};
use crate::room::Room;

/// Validate a credential payload, returning the trimmed username
///
/// The payload must hold exactly two lines; a trailing newline ends the
/// last line rather than opening an empty third one.
pub fn authenticate(payload: &[u8], room: &Room) -> Result<String, AuthError> {
    let text = std::str::from_utf8(payload).map_err(|_| MalformedCredentials::LineCount)?;

    let mut lines = text.lines();
    let (Some(username), Some(password), None) = (lines.next(), lines.next(), lines.next())
    else {
        return Err(MalformedCredentials::LineCount.into());
    };

    let username = username.trim();
    let password = password.trim();

    if username.is_empty() {
        return Err(MalformedCredentials::EmptyUsername.into());
    }

    if password.is_empty() {
        return Err(MalformedCredentials::EmptyPassword.into());
    }

    if !room.password_matches(password) {
        return Err(AuthError::WrongPassword);
    }

    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new("lobby", "swordfish")
    }

    #[test]
    fn test_valid_credentials() {
        assert_eq!(authenticate(b"bob\nswordfish\n", &room()), Ok("bob".to_string()));
        assert_eq!(authenticate(b"bob\nswordfish", &room()), Ok("bob".to_string()));
    }

    #[test]
    fn test_credentials_are_trimmed() {
        assert_eq!(
            authenticate(b"  bob \r\n\tswordfish  \r\n", &room()),
            Ok("bob".to_string())
        );
    }

    #[test]
    fn test_wrong_line_count() {
        let malformed = Err(AuthError::Malformed(MalformedCredentials::LineCount));
        assert_eq!(authenticate(b"onlyoneline\n", &room()), malformed);
        assert_eq!(authenticate(b"", &room()), malformed);
        assert_eq!(authenticate(b"bob\nswordfish\nextra\n", &room()), malformed);
        assert_eq!(authenticate(b"bob\n\nswordfish\n", &room()), malformed);
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(
            authenticate(b"   \nswordfish\n", &room()),
            Err(AuthError::Malformed(MalformedCredentials::EmptyUsername))
        );
        assert_eq!(
            authenticate(b"bob\n  \n", &room()),
            Err(AuthError::Malformed(MalformedCredentials::EmptyPassword))
        );
    }

    #[test]
    fn test_wrong_password() {
        assert_eq!(authenticate(b"bob\nwrong\n", &room()), Err(AuthError::WrongPassword));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let result = authenticate(b"b\xffb\nswordfish\n", &room());
        assert!(result.unwrap_err().is_malformed());
    }
}
