//! Holder identity validation.

use slotgate_core::error::AppError;
use slotgate_core::result::AppResult;
use slotgate_database::ledger::HolderDetails;

/// Longest accepted holder name, in characters.
pub const MAX_HOLDER_NAME_CHARS: usize = 100;
/// Longest accepted holder contact, in characters.
pub const MAX_HOLDER_CONTACT_CHARS: usize = 40;

/// Trim and check the identity recorded on confirmation.
pub fn validate_holder(name: &str, contact: &str) -> AppResult<HolderDetails> {
    let name = name.trim();
    let contact = contact.trim();

    if name.is_empty() {
        return Err(AppError::validation("Holder name is required"));
    }
    if contact.is_empty() {
        return Err(AppError::validation("Holder contact is required"));
    }
    if name.chars().count() > MAX_HOLDER_NAME_CHARS {
        return Err(AppError::validation(format!(
            "Holder name exceeds {MAX_HOLDER_NAME_CHARS} characters"
        )));
    }
    if contact.chars().count() > MAX_HOLDER_CONTACT_CHARS {
        return Err(AppError::validation(format!(
            "Holder contact exceeds {MAX_HOLDER_CONTACT_CHARS} characters"
        )));
    }

    Ok(HolderDetails {
        name: name.to_string(),
        contact: contact.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_surrounding_whitespace() {
        let holder = validate_holder("  Grace Hopper ", " 555-0100 ").unwrap();
        assert_eq!(holder.name, "Grace Hopper");
        assert_eq!(holder.contact, "555-0100");
    }

    #[test]
    fn test_rejects_blank_fields() {
        assert!(validate_holder("   ", "555-0100").is_err());
        assert!(validate_holder("Grace", "").is_err());
    }

    #[test]
    fn test_limits_count_characters_not_bytes() {
        let name: String = "é".repeat(MAX_HOLDER_NAME_CHARS);
        assert!(validate_holder(&name, "555-0100").is_ok());

        let contact = "9".repeat(MAX_HOLDER_CONTACT_CHARS + 1);
        assert!(validate_holder("Grace", &contact).is_err());
    }
}
