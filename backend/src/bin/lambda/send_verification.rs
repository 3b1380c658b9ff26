use std::sync::Arc;

use anyhow::Context;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_lambda_events::event::dynamodb::Event;
use aws_sdk_dynamodb::config::ProvideCredentials;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use lambda_extension::Extension;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use telemetry::{get_subscriber, init_subscriber, init_tracer, TraceFlushExtension};
use tokio::sync::mpsc::unbounded_channel;
use transactional_mail::adapters::{DynamoDbUserRepository, EmailJsClient};
use transactional_mail::configuration::{get_configuration, DatabaseSettings};
use transactional_mail::send_verification_handler::SendVerificationEventHandler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let configuration = get_configuration().await?;

    let tracer = init_tracer(&configuration.telemetry)?;
    let subscriber = get_subscriber(
        configuration.telemetry.dataset_name.clone(),
        "info".into(),
        std::io::stdout,
        &configuration.telemetry,
        &tracer,
    );

    init_subscriber(subscriber);

    let email_settings = &configuration.template_email_settings;
    let email_adapter = EmailJsClient::new(
        email_settings.base_url.clone(),
        email_settings.service_id.clone(),
        email_settings.public_key.clone(),
        email_settings.private_key.clone(),
        email_settings.timeout_duration(),
    )?;

    let dynamo_config = configure_dynamo(&configuration.database).await?;
    let user_repo = DynamoDbUserRepository::new(
        aws_sdk_dynamodb::Client::from_conf(dynamo_config),
        configuration.database.user_table_name.clone(),
    );

    let (request_done_sender, request_done_receiver) = unbounded_channel::<()>();

    let flush_extension = Arc::new(TraceFlushExtension::new(request_done_receiver));

    let arc_tracer = Arc::new(tracer);
    let extension = Extension::new()
        // Internal extensions only support INVOKE events.
        .with_events(&["INVOKE"])
        .with_events_processor(service_fn(|event| {
            let cloned_tracer = arc_tracer.clone();

            let flush_extension = flush_extension.clone();
            async move { flush_extension.invoke(event, cloned_tracer).await }
        }))
        // Internal extension names MUST be unique within a given Lambda function.
        .with_extension_name("internal-flush")
        // Extensions MUST be registered before calling lambda_runtime::run(), which ends the Init
        // phase and begins the Invoke phase.
        .register()
        .await?;

    let handler = Arc::new(SendVerificationEventHandler::new(request_done_sender));

    //https://github.com/awslabs/aws-lambda-rust-runtime/blob/main/examples/extension-internal-flush/src/main.rs
    tokio::try_join!(
        run(service_fn(|event: LambdaEvent<Event>| {
            let handler = handler.clone();
            let email_adapter = email_adapter.clone();
            let repo = user_repo.clone();
            let settings = configuration.verification.clone();

            async move {
                Ok::<_, Error>(
                    handler
                        .invoke(event.payload, &repo, &email_adapter, &settings)
                        .await,
                )
            }
        })),
        extension.run(),
    )?;

    Ok(())
}

async fn configure_dynamo(
    db_settings: &DatabaseSettings,
) -> Result<aws_sdk_dynamodb::Config, anyhow::Error> {
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

    let conf_builder = aws_sdk_dynamodb::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .http_client(HyperClientBuilder::new().build(https_connector))
        .region(region);

    Ok(match db_settings.use_local {
        true => conf_builder.endpoint_url("http://localhost:8000").build(),
        false => conf_builder.build(),
    })
}
