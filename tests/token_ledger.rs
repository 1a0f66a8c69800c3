mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use rstest::rstest;
use uuid::Uuid;

use meetcheck::database::{check_in_tokens_repo, check_ins_repo};
use meetcheck::models::format_timestamp;
use meetcheck::services::token_service::{self, CheckInClaims, TokenError, AUDIENCE, ISSUER};

use common::{spawn_app, ALICE, BOB, ORGANIZER};

fn claims_for(jti: &str, event_id: &str, participant_id: Option<&str>) -> CheckInClaims {
    let now = Utc::now().timestamp();
    CheckInClaims {
        jti: jti.to_string(),
        sub: event_id.to_string(),
        pid: participant_id.map(str::to_string),
        iss: ISSUER.to_string(),
        aud: AUDIENCE.to_string(),
        iat: now,
        nbf: now,
        exp: now + 600,
    }
}

#[rstest]
#[tokio::test]
async fn prune_deletes_only_tokens_expired_beyond_grace() {
    let app = spawn_app().await;
    let event_id = app.create_open_event("Housekeeping").await;
    let now = Utc::now();
    let issued_at = format_timestamp(now - Duration::hours(72));

    for (token_id, expires_at) in [
        ("long-gone", now - Duration::hours(48)),
        ("recently-expired", now - Duration::hours(1)),
        ("still-valid", now + Duration::hours(1)),
    ] {
        let expires_at = format_timestamp(expires_at);
        check_in_tokens_repo::insert_token(
            &app.state.pool,
            check_in_tokens_repo::NewCheckInToken {
                token_id,
                event_id: &event_id,
                participant_id: None,
                issued_by_user_id: ORGANIZER,
                issued_at: &issued_at,
                expires_at: &expires_at,
            },
        )
        .await
        .unwrap();
    }

    let deleted = token_service::prune_expired_tokens(&app.state.pool, now, 24)
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let mut left: Vec<String> = check_in_tokens_repo::list_event_tokens(&app.state.pool, &event_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.token_id)
        .collect();
    left.sort();
    assert_eq!(left, ["recently-expired", "still-valid"]);

    let again = token_service::prune_expired_tokens(&app.state.pool, now, 24)
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[rstest]
#[tokio::test]
async fn signed_token_without_ledger_entry_is_unknown() {
    let app = spawn_app().await;
    let event_id = app.create_open_event("Ledger").await;
    let config = &app.state.config;

    let jti = Uuid::new_v4().to_string();
    let token = token_service::sign_claims(config, &claims_for(&jti, &event_id, None)).unwrap();

    let err = token_service::verify_token(&app.state.pool, config, &token, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::Unknown), "{err:?}");

    let resp = app.check_in(ALICE, &token).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case::other_participant(true, false)]
#[case::other_event(false, true)]
#[case::participant_dropped(false, false)]
#[tokio::test]
async fn claims_that_disagree_with_the_ledger_are_refused(
    #[case] swap_participant: bool,
    #[case] swap_event: bool,
) {
    let app = spawn_app().await;
    let event_id = app.create_open_event("Ledger").await;
    let other_event_id = app.create_open_event("Elsewhere").await;
    let alice = app.register(&event_id, "Alice", Some(ALICE), "attendee").await;
    let bob = app.register(&event_id, "Bob", Some(BOB), "attendee").await;
    let issued = app.issue_token(&event_id, Some(&alice)).await;
    let token_id = issued["token_id"].as_str().unwrap();

    // Re-sign the ledger's jti with claims that differ from its row.
    let sub = if swap_event { &other_event_id } else { &event_id };
    let pid = match (swap_participant, swap_event) {
        (true, _) => Some(bob.as_str()),
        (false, true) => Some(alice.as_str()),
        (false, false) => None,
    };
    let config = &app.state.config;
    let forged = token_service::sign_claims(config, &claims_for(token_id, sub, pid)).unwrap();

    let err = token_service::verify_token(&app.state.pool, config, &forged, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, TokenError::EventMismatch), "{err:?}");
}

#[rstest]
#[tokio::test]
async fn fresh_check_in_reports_the_stored_row() {
    let app = spawn_app().await;
    let event_id = app.create_open_event("Ledger").await;
    let alice = app.register(&event_id, "Alice", Some(ALICE), "vip").await;
    let issued = app.issue_token(&event_id, Some(&alice)).await;

    let resp = app.check_in(ALICE, issued["token"].as_str().unwrap()).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);

    let stored = check_ins_repo::load_check_in(&app.state.pool, &event_id, &alice)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resp.body["check_in"], serde_json::to_value(&stored).unwrap());
    assert_eq!(stored.token_id.as_deref(), issued["token_id"].as_str());
    assert_eq!(stored.participant_type, "vip");
}
