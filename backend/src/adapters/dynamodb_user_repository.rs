use crate::domain::user_repository::UserRepository;
use crate::domain::verification_token::VerificationToken;
use crate::stream_record::RECORD_KEY;
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

#[derive(Debug, Clone)]
pub struct DynamoDbUserRepository {
    client: Client,
    table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[tracing::instrument(name = "store_verification_token", skip(self, token))]
    async fn store_verification_token(
        &self,
        user_id: &str,
        token: &VerificationToken,
    ) -> Result<(), anyhow::Error> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(RECORD_KEY, AttributeValue::S(user_id.to_string()))
            .update_expression("SET #token = :token")
            .expression_attribute_names("#token", "verificationToken")
            .expression_attribute_values(":token", AttributeValue::S(token.as_str().to_string()))
            .condition_expression(format!("attribute_exists({})", RECORD_KEY))
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failure storing the verification token for user {}. Using table {}",
                    user_id, &self.table_name
                )
            })?;

        Ok(())
    }
}
