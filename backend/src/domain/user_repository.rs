use crate::domain::verification_token::VerificationToken;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Attach `token` to the existing user document `user_id`.
    async fn store_verification_token(
        &self,
        user_id: &str,
        token: &VerificationToken,
    ) -> Result<(), anyhow::Error>;
}
