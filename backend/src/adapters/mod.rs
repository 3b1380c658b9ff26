pub mod dynamodb_user_repository;
pub mod emailjs_email_client;
pub mod postmark_email_client;

pub use crate::adapters::dynamodb_user_repository::DynamoDbUserRepository;
pub use crate::adapters::emailjs_email_client::EmailJsClient;
pub use crate::adapters::postmark_email_client::PostmarkEmailClient;
