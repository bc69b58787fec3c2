use super::*;
use serde_json::json;

fn sample_user() -> User {
    User {
        id: "u-1".into(),
        email: Some("0400@phone.local".into()),
        user_metadata: json!({ "mobile": "0400" }).as_object().cloned().unwrap(),
        created_at: None,
    }
}

fn sample_session(expires_at: Option<i64>) -> Session {
    Session {
        access_token: "at".into(),
        refresh_token: Some("rt".into()),
        token_type: "bearer".into(),
        expires_in: Some(3600),
        expires_at,
        user: sample_user(),
    }
}

// =============================================================================
// User
// =============================================================================

#[test]
fn user_mobile_reads_metadata() {
    assert_eq!(sample_user().mobile(), Some("0400"));
}

#[test]
fn user_deserialize_minimal() {
    let user: User = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
    assert_eq!(user.id, "abc");
    assert!(user.email.is_none());
    assert!(user.user_metadata.is_empty());
    assert!(user.mobile().is_none());
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn session_deserialize_defaults_token_type() {
    let session: Session = serde_json::from_str(r#"{"access_token": "a", "user": {"id": "u"}}"#).unwrap();
    assert_eq!(session.token_type, "bearer");
    assert!(session.refresh_token.is_none());
    assert!(session.expires_at.is_none());
}

#[test]
fn session_without_expiry_never_expires() {
    assert!(!sample_session(None).is_expired_at(i64::MAX, 10));
}

#[test]
fn session_expiry_respects_margin() {
    let session = sample_session(Some(1_000));
    assert!(!session.is_expired_at(980, 10));
    assert!(session.is_expired_at(990, 10));
    assert!(session.is_expired_at(1_500, 10));
}

#[test]
fn with_expiry_from_fills_missing_expires_at() {
    let session = sample_session(None).with_expiry_from(100);
    assert_eq!(session.expires_at, Some(3_700));
}

#[test]
fn with_expiry_from_keeps_existing_expires_at() {
    let session = sample_session(Some(42)).with_expiry_from(100);
    assert_eq!(session.expires_at, Some(42));
}

// =============================================================================
// AuthEvent / AuthData / AuthSnapshot
// =============================================================================

#[test]
fn auth_event_serializes_screaming_snake() {
    assert_eq!(serde_json::to_value(AuthEvent::SignedIn).unwrap(), json!("SIGNED_IN"));
    assert_eq!(serde_json::to_value(AuthEvent::TokenRefreshed).unwrap(), json!("TOKEN_REFRESHED"));
}

#[test]
fn auth_data_from_session_carries_user() {
    let data = AuthData::from_session(sample_session(None));
    assert_eq!(data.user.as_ref().map(|u| u.id.as_str()), Some("u-1"));
    assert!(data.session.is_some());
}

#[test]
fn snapshot_pending_is_loading() {
    let snap = AuthSnapshot::default();
    assert!(snap.loading);
    assert!(!snap.is_authenticated());
}

#[test]
fn snapshot_resolved_pairs_user_with_session() {
    let snap = AuthSnapshot::resolved(Some(sample_session(None)));
    assert!(!snap.loading);
    assert!(snap.is_authenticated());
    assert_eq!(snap.user, Some(sample_user()));
}

#[test]
fn snapshot_resolved_none_is_signed_out() {
    assert_eq!(AuthSnapshot::resolved(None), AuthSnapshot::signed_out());
}
