use crate::error::ApiError;

/// Maximum message length for chat requests, in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Validate a chat message and return it trimmed.
pub fn validate_chat_request(message: &str) -> Result<&str, ApiError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ApiError::InvalidInput("No message provided".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(message)
}

/// Validate language code format (e.g. en, en-US, en_US, cmn-CN, es-419)
pub fn is_valid_language_code(code: &str) -> bool {
    let parts: Vec<&str> = code.split(|c: char| c == '-' || c == '_').collect();
    let language_ok = |p: &str| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_lowercase());
    let region_ok = |p: &str| {
        (p.len() == 2 && p.chars().all(|c| c.is_ascii_uppercase()))
            || (p.len() == 3 && p.chars().all(|c| c.is_ascii_digit()))
    };
    match parts.as_slice() {
        [lang] => language_ok(*lang),
        [lang, region] => language_ok(*lang) && region_ok(*region),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_chat_request_valid() {
        assert_eq!(validate_chat_request("  Hello  ").unwrap(), "Hello");
        assert!(validate_chat_request(&"a".repeat(MAX_MESSAGE_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_chat_request_empty_message() {
        for message in ["", "   ", "\n\t"] {
            let result = validate_chat_request(message);
            match result {
                Err(ApiError::InvalidInput(msg)) => assert_eq!(msg, "No message provided"),
                _ => panic!("expected InvalidInput for {message:?}"),
            }
        }
    }

    #[test]
    fn test_validate_chat_request_too_long() {
        let long_message = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        let result = validate_chat_request(&long_message);
        assert!(result.is_err());
        if let Err(ApiError::InvalidInput(msg)) = result {
            assert!(msg.contains("too long"));
        }
    }

    #[test]
    fn test_language_codes() {
        for ok in ["en", "de", "en-US", "en_US", "cmn-CN", "es-419"] {
            assert!(is_valid_language_code(ok), "{ok}");
        }
        for bad in ["", "english", "EN", "en-us", "en-US-x", "e"] {
            assert!(!is_valid_language_code(bad), "{bad}");
        }
    }
}
