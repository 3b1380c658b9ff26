use rand::rngs::OsRng;
use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// 32 random bytes from the operating system, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken(String);

impl VerificationToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);

        Self(hex::encode(bytes))
    }

    pub fn parse(s: String) -> Result<VerificationToken, String> {
        let is_right_length = s.len() == TOKEN_BYTES * 2;
        let is_lower_hex = s
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

        if is_right_length && is_lower_hex {
            Ok(Self(s))
        } else {
            Err(format!("{} is not a valid verification token", s))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for VerificationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
