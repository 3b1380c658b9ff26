use std::sync::Arc;

use aws_lambda_events::event::dynamodb::Event;
use lambda_extension::Extension;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use telemetry::{get_subscriber, init_subscriber, init_tracer, TraceFlushExtension};
use tokio::sync::mpsc::unbounded_channel;
use transactional_mail::adapters::PostmarkEmailClient;
use transactional_mail::configuration::get_configuration;
use transactional_mail::domain::RecipientEmail;
use transactional_mail::send_order_confirmation_handler::SendOrderConfirmationEventHandler;

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

    let sender = RecipientEmail::parse(configuration.email_settings.sender_email.clone())?;
    let email_adapter = PostmarkEmailClient::new(
        configuration.email_settings.base_url.clone(),
        sender,
        configuration.email_settings.authorization_token.clone(),
        configuration.email_settings.timeout_duration(),
    )?;

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
        .register()
        .await?;

    let handler = Arc::new(SendOrderConfirmationEventHandler::new(request_done_sender));

    tokio::try_join!(
        run(service_fn(|event: LambdaEvent<Event>| {
            let handler = handler.clone();
            let email_adapter = email_adapter.clone();

            async move { Ok::<_, Error>(handler.invoke(event.payload, &email_adapter).await) }
        })),
        extension.run(),
    )?;

    Ok(())
}
