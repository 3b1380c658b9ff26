use crate::domain::recipient_email::RecipientEmail;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Named values substituted into a provider-hosted template.
pub type TemplateParams = BTreeMap<String, String>;

/// A provider that takes a fully rendered message.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send_email_to(
        &self,
        recipient: &RecipientEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), anyhow::Error>;
}

/// A provider that renders a template it hosts itself.
#[async_trait]
pub trait TemplatedEmailClient: Send + Sync {
    async fn send_template(
        &self,
        template_id: &str,
        template_params: &TemplateParams,
    ) -> Result<(), anyhow::Error>;
}
