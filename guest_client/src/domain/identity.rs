use uuid::Uuid;

const MAX_GUEST_ID_LEN: usize = 64;

// Stable per-device guest identifier. Correlates requests with the server
// counter; it is not a credential.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GuestIdentity(String);

impl GuestIdentity {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    // Accepts only identifiers the quota server would accept.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = !value.is_empty()
            && value.len() <= MAX_GUEST_ID_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Who a generation request is made on behalf of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    Guest(GuestIdentity),
    // Signed-in user; the token comes from the identity provider.
    Member { access_token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_identity_is_generated_then_it_round_trips_through_parse() {
        let identity = GuestIdentity::generate();

        assert_eq!(GuestIdentity::parse(identity.as_str()), Some(identity));
    }

    #[test]
    fn when_value_has_surrounding_whitespace_then_it_is_trimmed() {
        let identity = GuestIdentity::parse("  guest-7 \n").expect("expected valid id");

        assert_eq!(identity.as_str(), "guest-7");
    }

    #[test]
    fn when_value_is_empty_or_has_symbols_then_parse_rejects_it() {
        assert_eq!(GuestIdentity::parse(""), None);
        assert_eq!(GuestIdentity::parse("guest 7"), None);
        assert_eq!(GuestIdentity::parse("guest/7"), None);
        assert_eq!(GuestIdentity::parse(&"a".repeat(65)), None);
    }
}
