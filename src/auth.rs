//! Registration and login helpers: password hashing and contact validation.

use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Hash a password to its SHA-256 hex digest.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    hash_password(password) == hashed
}

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    // Basic checks
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::warn!("❌ Invalid email format: {}", email);
        return false;
    }

    true
}

/// Validate and normalize an Indian mobile number
///
/// Uses the phonenumber library (port of Google's libphonenumber) to:
/// - Parse the phone number with the Indian region (IN)
/// - Validate if it's a valid Indian number
/// - Return normalized E.164 format (+919876543210)
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_in_phone(raw: &str) -> (bool, String) {
    // Skip empty or very short strings
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    // Parse with Indian country code
    match phonenumber::parse(Some(CountryId::IN), raw) {
        Ok(number) => {
            // Check if valid
            if phonenumber::is_valid(&number) {
                // Format to E.164 (+919876543210)
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("✓ Valid IN phone: {} → {}", raw, formatted);
                (true, formatted)
            } else {
                (false, format!("Invalid Indian phone number: {}", raw))
            }
        }
        Err(e) => (false, format!("Failed to parse phone number: {}", e)),
    }
}
