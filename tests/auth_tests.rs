/// Unit tests for authentication helpers
/// Password hashing, email validation and Indian phone normalization.
use rust_riskscore_api::auth::{hash_password, is_valid_email, validate_in_phone, verify_password};

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_is_the_sha256_hex_digest() {
        assert_eq!(
            hash_password("password123"),
            "ef92b778bafe771e89245b89ecbc08a44a4e166c06659911881f383d4473e94f"
        );
    }

    #[test]
    fn hash_shape_is_stable() {
        let hash = hash_password("demo");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_password("demo"));
    }

    #[test]
    fn verify_accepts_the_right_password_only() {
        let hash = hash_password("s3cret");
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("s3cret ", &hash));
        assert!(!verify_password("other", &hash));
    }
}

#[cfg(test)]
mod email_validation_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user@example.com"));
        assert!(is_valid_email("user+tag@example.co.uk"));
        assert!(is_valid_email("user_name@example-domain.com"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn test_invalid_emails_basic() {
        // Missing @ or .
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@examplecom"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));

        // Too short
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_invalid_emails_malformed() {
        assert!(!is_valid_email("user @example.com")); // space
        assert!(!is_valid_email("user@exam ple.com")); // space in domain
    }
}

#[cfg(test)]
mod phone_validation_tests {
    use super::*;

    #[test]
    fn test_valid_indian_mobiles() {
        let (valid, normalized) = validate_in_phone("9876543210");
        assert!(valid);
        assert_eq!(normalized, "+919876543210");

        // With country code
        let (valid, normalized) = validate_in_phone("+919876543210");
        assert!(valid);
        assert_eq!(normalized, "+919876543210");

        // With formatting
        let (valid, normalized) = validate_in_phone("+91 98765 43210");
        assert!(valid);
        assert_eq!(normalized, "+919876543210");
    }

    #[test]
    fn test_invalid_phones() {
        // Too short
        let (valid, _) = validate_in_phone("1234");
        assert!(!valid);

        // Empty
        let (valid, _) = validate_in_phone("");
        assert!(!valid);

        // Only spaces
        let (valid, _) = validate_in_phone("   ");
        assert!(!valid);
    }
}
