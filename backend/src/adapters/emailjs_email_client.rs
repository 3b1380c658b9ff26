use crate::domain::email_client::{TemplateParams, TemplatedEmailClient};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

/// Client for the EmailJS REST API.
///
/// Server-side calls must be allowed in the EmailJS account security
/// settings; the private key is only needed when strict mode is enabled.
#[derive(Clone)]
pub struct EmailJsClient {
    http_client: Client,
    base_url: String,
    service_id: String,
    public_key: String,
    private_key: Option<Secret<String>>,
}

impl EmailJsClient {
    pub fn new(
        base_url: String,
        service_id: String,
        public_key: String,
        private_key: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            service_id,
            public_key,
            private_key,
        })
    }
}

#[async_trait]
impl TemplatedEmailClient for EmailJsClient {
    #[tracing::instrument(name = "emailjs_send_template", skip(self, template_params))]
    async fn send_template(
        &self,
        template_id: &str,
        template_params: &TemplateParams,
    ) -> Result<(), anyhow::Error> {
        let url = format!("{}/api/v1.0/email/send", self.base_url);
        let request_body = SendTemplateRequest {
            service_id: &self.service_id,
            template_id,
            user_id: &self.public_key,
            access_token: self
                .private_key
                .as_ref()
                .map(|key| key.expose_secret().as_str()),
            template_params,
        };

        self.http_client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Failed to reach the EmailJS API")?
            .error_for_status()
            .context("EmailJS rejected the email")?;

        Ok(())
    }
}

#[derive(serde::Serialize)]
struct SendTemplateRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a TemplateParams,
}
