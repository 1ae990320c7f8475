pub use crm_db::{Direction, MediaType};

/// Telegram account id (numeric). Distinct from the local contact id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(pub i64);

/// One inbound platform event, as delivered by the adapter layer.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub sender_id: AccountId,
    pub sender_name: String,
    pub sender_phone: Option<String>,
    /// The platform's message id within the conversation.
    pub message_id: i64,
    pub text: String,
    pub media_type: MediaType,
    pub media_file_id: Option<String>,
    pub outgoing: bool,
}

/// `+` followed by digits only. The stricter original format (`+7XXXXXXXXXX`)
/// is a UI hint, not a storage rule.
pub fn is_valid_phone(phone: &str) -> bool {
    let mut chars = phone.chars();
    chars.next() == Some('+') && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_phone;

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("+79001234567"));
        assert!(is_valid_phone("+1"));
        assert!(!is_valid_phone("79001234567"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("+7900 123"));
        assert!(!is_valid_phone("+id777"));
    }
}
