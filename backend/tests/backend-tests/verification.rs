use crate::helpers::{
    spawn_app, stream_event, InMemoryUserRepository, StreamRecord, VERIFICATION_BASE_URL,
};
use claims::assert_ok_eq;
use reqwest::Url;
use tokio::sync::mpsc::unbounded_channel;
use transactional_mail::domain::{UserRecord, VerificationToken};
use transactional_mail::send_verification_handler::{
    handle_new_user, SendVerificationEventHandler, VerificationOutcome,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn user(email: Option<&str>, full_name: Option<&str>) -> UserRecord {
    UserRecord {
        email: email.map(str::to_string),
        full_name: full_name.map(str::to_string),
    }
}

#[tokio::test]
async fn a_new_user_gets_a_token_and_a_verification_email() {
    let app = spawn_app().await;

    Mock::given(path("/api/v1.0/email/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let outcome = handle_new_user(
        user(Some("ursula@test.com"), Some("Ursula Le Guin")),
        "user-1",
        &app.user_repo,
        &app.template_email_client,
        &app.verification_settings,
    )
    .await;

    assert_ok_eq!(outcome, VerificationOutcome::Sent);
}

#[tokio::test]
async fn the_stored_token_matches_the_link_in_the_email() {
    let app = spawn_app().await;

    Mock::given(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    handle_new_user(
        user(Some("ursula@test.com"), Some("Ursula Le Guin")),
        "user-1",
        &app.user_repo,
        &app.template_email_client,
        &app.verification_settings,
    )
    .await
    .unwrap();

    let params = app.sent_template_params().await;
    assert_eq!(params["to_email"], "ursula@test.com");
    assert_eq!(params["to_name"], "Ursula Le Guin");

    let link = Url::parse(params["verification_link"].as_str().unwrap()).unwrap();
    assert!(link.as_str().starts_with(VERIFICATION_BASE_URL));

    let query_value = |name: &str| {
        link.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .unwrap()
    };

    let stored_token = app.user_repo.token_for("user-1").unwrap();
    assert!(VerificationToken::parse(stored_token.clone()).is_ok());
    assert_eq!(query_value("token"), stored_token);
    assert_eq!(query_value("uid"), "user-1");
}

#[tokio::test]
async fn a_user_missing_required_fields_is_skipped_without_side_effects() {
    let app = spawn_app().await;

    Mock::given(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let test_cases = vec![
        (user(None, Some("Ursula Le Guin")), "missing email"),
        (user(Some("ursula@test.com"), None), "missing full name"),
        (user(Some(""), Some("Ursula Le Guin")), "empty email"),
        (user(Some("ursula@test.com"), Some("   ")), "blank full name"),
    ];

    for (record, description) in test_cases {
        let outcome = handle_new_user(
            record,
            "user-1",
            &app.user_repo,
            &app.template_email_client,
            &app.verification_settings,
        )
        .await
        .unwrap();

        assert!(
            matches!(outcome, VerificationOutcome::Skipped(_)),
            "The user was not skipped when the record had a {}",
            description
        );
    }

    assert_eq!(app.user_repo.write_count(), 0);
}

#[tokio::test]
async fn a_delivery_failure_is_logged_and_keeps_the_token() {
    let app = spawn_app().await;

    Mock::given(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let outcome = handle_new_user(
        user(Some("ursula@test.com"), Some("Ursula Le Guin")),
        "user-1",
        &app.user_repo,
        &app.template_email_client,
        &app.verification_settings,
    )
    .await;

    assert_ok_eq!(outcome, VerificationOutcome::DeliveryFailed);
    assert!(app.user_repo.token_for("user-1").is_some());
}

#[tokio::test]
async fn a_failed_token_write_sends_no_email() {
    let app = spawn_app().await;
    let repo = InMemoryUserRepository::unavailable();

    Mock::given(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let outcome = handle_new_user(
        user(Some("ursula@test.com"), Some("Ursula Le Guin")),
        "user-1",
        &repo,
        &app.template_email_client,
        &app.verification_settings,
    )
    .await;

    assert!(outcome.is_err());
}

#[tokio::test]
async fn only_inserted_users_are_processed_from_the_stream() {
    let app = spawn_app().await;
    let (sender, _receiver) = unbounded_channel();
    let handler = SendVerificationEventHandler::new(sender);

    Mock::given(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let event = stream_event(vec![
        StreamRecord {
            event_name: "INSERT",
            sequence_number: "100",
            id: "user-1",
            new_image: serde_json::json!({
                "id": { "S": "user-1" },
                "email": { "S": "ursula@test.com" },
                "fullName": { "S": "Ursula Le Guin" }
            }),
        },
        StreamRecord {
            event_name: "MODIFY",
            sequence_number: "101",
            id: "user-2",
            new_image: serde_json::json!({
                "id": { "S": "user-2" },
                "email": { "S": "ged@test.com" },
                "fullName": { "S": "Sparrowhawk" },
                "verificationToken": { "S": "abc" }
            }),
        },
    ]);

    let response = handler
        .invoke(
            event,
            &app.user_repo,
            &app.template_email_client,
            &app.verification_settings,
        )
        .await;

    assert!(response.batch_item_failures.is_empty());
    assert!(app.user_repo.token_for("user-1").is_some());
    assert!(app.user_repo.token_for("user-2").is_none());
}

#[tokio::test]
async fn a_failed_token_write_is_reported_as_a_batch_item_failure() {
    let app = spawn_app().await;
    let repo = InMemoryUserRepository::unavailable();
    let (sender, _receiver) = unbounded_channel();
    let handler = SendVerificationEventHandler::new(sender);

    let event = stream_event(vec![StreamRecord {
        event_name: "INSERT",
        sequence_number: "200",
        id: "user-1",
        new_image: serde_json::json!({
            "id": { "S": "user-1" },
            "email": { "S": "ursula@test.com" },
            "fullName": { "S": "Ursula Le Guin" }
        }),
    }]);

    let response = handler
        .invoke(event, &repo, &app.template_email_client, &app.verification_settings)
        .await;

    assert_eq!(response.batch_item_failures.len(), 1);
    assert_eq!(
        response.batch_item_failures[0].item_identifier.as_deref(),
        Some("200")
    );
}

#[tokio::test]
async fn the_token_is_stored_before_the_link_is_built() {
    let mut app = spawn_app().await;
    app.verification_settings.base_url = "not a url".to_string();

    Mock::given(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let outcome = handle_new_user(
        user(Some("ursula@test.com"), Some("Ursula Le Guin")),
        "user-1",
        &app.user_repo,
        &app.template_email_client,
        &app.verification_settings,
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(app.user_repo.write_count(), 1);
}
