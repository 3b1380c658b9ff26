use crate::configuration::VerificationSettings;
use crate::domain::email_client::{TemplateParams, TemplatedEmailClient};
use crate::domain::user_repository::UserRepository;
use crate::domain::{NewUser, UserRecord, VerificationToken};
use crate::stream_record::{batch_item_failure, is_insert, parse_inserted};
use crate::utils::error_chain_fmt;
use anyhow::Context;
use aws_lambda_events::dynamodb::Event;
use aws_lambda_events::streams::DynamoDbEventResponse;
use reqwest::Url;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// How a single user record was dealt with.
#[derive(Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    Sent,
    /// The record lacked a usable email or full name; nothing was written or sent.
    Skipped(String),
    /// The token was stored but the provider did not accept the email.
    DeliveryFailed,
}

/// Consumes DynamoDB stream batches from the `users` table.
pub struct SendVerificationEventHandler {
    request_done_sender: UnboundedSender<()>,
}

impl SendVerificationEventHandler {
    pub fn new(request_done_sender: UnboundedSender<()>) -> Self {
        Self {
            request_done_sender,
        }
    }

    pub async fn invoke<TRepo: UserRepository, TEmail: TemplatedEmailClient>(
        &self,
        event: Event,
        repo: &TRepo,
        email_client: &TEmail,
        settings: &VerificationSettings,
    ) -> DynamoDbEventResponse {
        let mut response = DynamoDbEventResponse {
            batch_item_failures: Vec::new(),
        };

        for record in event.records.iter().filter(|record| is_insert(record)) {
            let span = tracing::info_span!("process_user_record", event_id = %record.event_id);
            if let Some(ctx) = telemetry::parse_context_from(record) {
                span.set_parent(ctx);
            }

            let (user_id, user) = match parse_inserted::<UserRecord>(record) {
                Ok(parsed) => parsed,
                Err(e) => {
                    span.in_scope(|| {
                        tracing::error!(
                            error.cause_chain = ?e,
                            error.message = %e,
                            "Skipping an unreadable user record"
                        )
                    });
                    continue;
                }
            };

            if let Err(e) = handle_new_user(user, &user_id, repo, email_client, settings)
                .instrument(span)
                .await
            {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    user_id = %user_id,
                    "Failure handling user record"
                );
                response.batch_item_failures.push(batch_item_failure(record));
            }
        }

        // Notify the extension to flush traces.
        let _ = self.request_done_sender.send(());

        response
    }
}

/// Attach a fresh verification token to a new user and email them a link to it.
///
/// Missing or unusable `email`/`fullName` fields end processing without side
/// effects. A failed delivery is logged only; the stored token stays in place.
#[tracing::instrument(
    name = "send_verification_email",
    skip(record, user_id, repo, email_client, settings),
    fields(user_id = %user_id)
)]
pub async fn handle_new_user<TRepo: UserRepository, TEmail: TemplatedEmailClient>(
    record: UserRecord,
    user_id: &str,
    repo: &TRepo,
    email_client: &TEmail,
    settings: &VerificationSettings,
) -> Result<VerificationOutcome, VerificationError> {
    let new_user: NewUser = match record.try_into() {
        Ok(user) => user,
        Err(reason) => {
            tracing::error!(reason = %reason, "Missing email or fullName in user data");
            return Ok(VerificationOutcome::Skipped(reason));
        }
    };

    let token = VerificationToken::generate();
    repo.store_verification_token(user_id, &token)
        .await
        .context("Failed to store the verification token")?;

    let link = verification_link(&settings.base_url()?, &token, user_id);

    let template_params = TemplateParams::from([
        ("to_email".to_string(), new_user.email.to_string()),
        ("to_name".to_string(), new_user.full_name.inner().to_string()),
        ("verification_link".to_string(), link.to_string()),
    ]);

    match email_client
        .send_template(&settings.template_id, &template_params)
        .await
    {
        Ok(()) => {
            tracing::info!("Verification email sent to {}", new_user.email);
            Ok(VerificationOutcome::Sent)
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Error sending verification email"
            );
            Ok(VerificationOutcome::DeliveryFailed)
        }
    }
}

/// `<base_url>?token=<token>&uid=<user_id>`
pub fn verification_link(base_url: &Url, token: &VerificationToken, user_id: &str) -> Url {
    let mut link = base_url.clone();

    link.query_pairs_mut()
        .append_pair("token", token.as_str())
        .append_pair("uid", user_id);

    link
}
