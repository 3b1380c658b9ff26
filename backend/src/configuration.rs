use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ssm::config::ProvideCredentials;
use aws_sdk_ssm::Client;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use anyhow::Context;
use config::FileFormat;
use reqwest::Url;
use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;
use telemetry::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
    pub email_settings: EmailClientSettings,
    pub template_email_settings: TemplateEmailSettings,
    pub verification: VerificationSettings,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub user_table_name: String,
    pub use_local: bool,
}

/// Postmark, used for the order confirmation email.
#[derive(Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub authorization_token: Secret<String>,
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

/// EmailJS, used for the verification email.
#[derive(Deserialize, Clone)]
pub struct TemplateEmailSettings {
    pub base_url: String,
    pub service_id: String,
    pub public_key: String,
    pub private_key: Option<Secret<String>>,
    pub timeout_milliseconds: u64,
}

impl TemplateEmailSettings {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(Deserialize, Clone)]
pub struct VerificationSettings {
    pub base_url: String,
    pub template_id: String,
}

impl VerificationSettings {
    pub fn base_url(&self) -> Result<Url, anyhow::Error> {
        Url::parse(&self.base_url)
            .with_context(|| format!("{} is not a valid verification base url", self.base_url))
    }
}

pub async fn get_configuration() -> Result<Settings, anyhow::Error> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(anyhow::Error::msg)?;

    let builder = match environment {
        Environment::Local => {
            let base_path =
                std::env::current_dir().context("Failed to determine the current directory")?;
            let configuration_directory = base_path.join("configuration");
            let environment_filename = format!("{}.yaml", environment.as_str());

            config::Config::builder()
                .add_source(config::File::from(
                    configuration_directory.join("base.yaml"),
                ))
                .add_source(config::File::from(
                    configuration_directory.join(environment_filename),
                ))
        }
        Environment::Production => {
            let parameter_name = std::env::var("CONFIG_PARAMETER_NAME")
                .context("CONFIG_PARAMETER_NAME must be set in production")?;
            let document = read_parameter(&parameter_name).await?;

            config::Config::builder().add_source(config::File::from_str(
                document.as_str(),
                FileFormat::Yaml,
            ))
        }
    };

    // Add in settings from environment variables (with a prefix of APP and '__' as separator)
    // E.g. `APP_VERIFICATION__BASE_URL=https://... would set `Settings.verification.base_url`
    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.verification.base_url()?;

    Ok(settings)
}

async fn read_parameter(parameter_name: &str) -> Result<String, anyhow::Error> {
    let ssm_client = Client::from_conf(configure_ssm().await?);

    ssm_client
        .get_parameter()
        .name(parameter_name)
        .with_decryption(true)
        .send()
        .await
        .context("Parameter retrieval not successful")?
        .parameter
        .and_then(|parameter| parameter.value)
        .with_context(|| format!("Parameter {} has no value", parameter_name))
}

async fn configure_ssm() -> Result<aws_sdk_ssm::Config, anyhow::Error> {
    let region = RegionProviderChain::default_provider()
        .or_else(Region::new("us-east-1"))
        .region()
        .await
        .context("Failed to resolve an AWS region")?;

    let credentials = DefaultCredentialsChain::builder()
        .region(region.clone())
        .build()
        .await
        .provide_credentials()
        .await
        .context("Failed to load AWS credentials")?;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    Ok(aws_sdk_ssm::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .http_client(HyperClientBuilder::new().build(https_connector))
        .region(region)
        .build())
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a support environment. Use either local or production",
                other
            )),
        }
    }
}
