use crate::domain::full_name::FullName;
use crate::domain::recipient_email::RecipientEmail;
use serde::Deserialize;

/// A document from the `users` table as it appears in the stream's new image.
/// Other attributes, `verificationToken` included, are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// A user with everything required to address a verification email.
#[derive(Debug)]
pub struct NewUser {
    pub email: RecipientEmail,
    pub full_name: FullName,
}

impl TryFrom<UserRecord> for NewUser {
    type Error = String;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let (email, full_name) = match (value.email, value.full_name) {
            (Some(email), Some(full_name)) => (email, full_name),
            _ => return Err("Missing email or fullName in user data".to_string()),
        };

        let email = RecipientEmail::parse(email)?;
        let full_name = FullName::parse(full_name)?;

        Ok(NewUser { email, full_name })
    }
}
