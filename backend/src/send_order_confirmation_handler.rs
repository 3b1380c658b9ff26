use crate::domain::email_client::EmailClient;
use crate::domain::order_confirmation_email::{OrderConfirmationEmail, OrderSummary};
use crate::domain::{OrderRecord, RecipientEmail};
use crate::stream_record::{batch_item_failure, is_insert, parse_inserted};
use crate::utils::error_chain_fmt;
use anyhow::Context;
use aws_lambda_events::dynamodb::Event;
use aws_lambda_events::streams::DynamoDbEventResponse;
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(thiserror::Error)]
pub enum OrderConfirmationError {
    /// The order cannot be confirmed as stored; retrying will not help.
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl std::fmt::Debug for OrderConfirmationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Consumes DynamoDB stream batches from the `orders` table.
pub struct SendOrderConfirmationEventHandler {
    request_done_sender: UnboundedSender<()>,
}

impl SendOrderConfirmationEventHandler {
    pub fn new(request_done_sender: UnboundedSender<()>) -> Self {
        Self {
            request_done_sender,
        }
    }

    /// Internal failures are reported back as batch item failures so the
    /// stream redelivers them; invalid orders are only logged.
    pub async fn invoke<TEmail: EmailClient>(
        &self,
        event: Event,
        email_client: &TEmail,
    ) -> DynamoDbEventResponse {
        let mut response = DynamoDbEventResponse {
            batch_item_failures: Vec::new(),
        };

        for record in event.records.iter().filter(|record| is_insert(record)) {
            let span = tracing::info_span!("process_order_record", event_id = %record.event_id);
            if let Some(ctx) = telemetry::parse_context_from(record) {
                span.set_parent(ctx);
            }

            let (order_id, order) = match parse_inserted::<OrderRecord>(record) {
                Ok(parsed) => parsed,
                Err(e) => {
                    span.in_scope(|| {
                        tracing::error!(
                            error.cause_chain = ?e,
                            error.message = %e,
                            "Skipping an unreadable order record"
                        )
                    });
                    continue;
                }
            };

            match handle_new_order(order, &order_id, email_client)
                .instrument(span)
                .await
            {
                Ok(()) => {}
                Err(OrderConfirmationError::InvalidArgument(reason)) => {
                    tracing::error!(
                        order_id = %order_id,
                        reason = %reason,
                        "Rejected order record"
                    );
                }
                Err(e @ OrderConfirmationError::Internal(_)) => {
                    tracing::error!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        order_id = %order_id,
                        "Failure handling order record"
                    );
                    response.batch_item_failures.push(batch_item_failure(record));
                }
            }
        }

        // Notify the extension to flush traces.
        let _ = self.request_done_sender.send(());

        response
    }
}

/// Render and send the confirmation email for a newly created order.
#[tracing::instrument(
    name = "send_order_confirmation_email",
    skip(record, order_id, email_client),
    fields(order_id = %order_id)
)]
pub async fn handle_new_order<TEmail: EmailClient>(
    record: OrderRecord,
    order_id: &str,
    email_client: &TEmail,
) -> Result<(), OrderConfirmationError> {
    let recipient = match record.email.clone() {
        Some(email) => {
            RecipientEmail::parse(email).map_err(OrderConfirmationError::InvalidArgument)?
        }
        None => {
            return Err(OrderConfirmationError::InvalidArgument(
                "Missing email in order data".to_string(),
            ))
        }
    };

    let summary = OrderSummary::from_record(&record, Utc::now());
    let email = OrderConfirmationEmail::render(&summary)
        .context("Failed to render the order confirmation email")?;

    email_client
        .send_email_to(
            &recipient,
            &email.subject,
            &email.html_body,
            &email.text_body,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Error sending order confirmation email"
            );
            e
        })
        .context("Failed to send the order confirmation email")?;

    tracing::info!("Order confirmation email sent to {}", recipient);

    Ok(())
}
