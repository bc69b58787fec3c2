use super::*;
use crate::store::MemoryStore;

fn manager() -> (LocalSessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (LocalSessionManager::new(store.clone(), "phone.local"), store)
}

// =============================================================================
// bytes_to_hex / generate_token
// =============================================================================

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a, 0xff]), "0aff");
}

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// initial state
// =============================================================================

#[test]
fn starts_signed_out_and_resolved() {
    let (local, _) = manager();
    assert_eq!(local.snapshot(), AuthSnapshot::signed_out());
    assert!(local.users().unwrap().is_empty());
}

// =============================================================================
// sign_up / sign_in
// =============================================================================

#[test]
fn sign_up_then_sign_in_returns_same_user_id() {
    let (local, _) = manager();

    let signed_up = local.sign_up("0400111222", "pw").unwrap();
    local.sign_out().unwrap();
    let signed_in = local.sign_in("0400111222", "pw").unwrap();

    let up_id = signed_up.user.unwrap().id;
    let in_id = signed_in.user.unwrap().id;
    assert_eq!(up_id, in_id);
    assert_eq!(local.snapshot().user.map(|u| u.id), Some(in_id));
}

#[test]
fn sign_up_persists_record_with_timestamp() {
    let (local, store) = manager();

    local.sign_up(" 0400111222 ", "pw").unwrap();

    let users = local.users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].mobile, "0400111222");
    assert!(OffsetDateTime::parse(&users[0].created_at, &Rfc3339).is_ok());
    assert!(store.get_item(REGISTRY_KEY).unwrap().is_some());
}

#[test]
fn sign_up_marks_user_current_with_synthetic_email() {
    let (local, _) = manager();

    let data = local.sign_up("0400", "pw").unwrap();

    let user = data.user.unwrap();
    assert_eq!(user.email.as_deref(), Some("0400@phone.local"));
    assert_eq!(user.mobile(), Some("0400"));
    assert!(local.snapshot().is_authenticated());
}

#[test]
fn sign_up_duplicate_is_already_exists() {
    let (local, _) = manager();
    local.sign_up("0400", "pw").unwrap();

    let err = local.sign_up("0400", "other").unwrap_err();

    assert!(matches!(err, AuthError::UserAlreadyExists));
    assert!(err.to_string().contains("already exists"));
    assert_eq!(local.users().unwrap().len(), 1);
}

#[test]
fn sign_in_unknown_is_not_found() {
    let (local, _) = manager();

    let err = local.sign_in("0499", "pw").unwrap_err();

    assert!(matches!(err, AuthError::UserNotFound));
    assert!(err.to_string().contains("not found"));
    assert!(!local.snapshot().is_authenticated());
}

#[test]
fn sign_in_issues_fresh_session_each_time() {
    let (local, _) = manager();
    local.sign_up("0400", "pw").unwrap();

    let first = local.sign_in("0400", "pw").unwrap().session.unwrap();
    let second = local.sign_in("0400", "pw").unwrap().session.unwrap();

    assert_ne!(first.access_token, second.access_token);
    assert_eq!(first.user.id, second.user.id);
}

#[test]
fn corrupt_registry_is_decode_error() {
    let (local, store) = manager();
    store.set_item(REGISTRY_KEY, "{oops").unwrap();

    assert!(matches!(local.sign_in("0400", "pw"), Err(AuthError::Decode(_))));
}

#[test]
fn registry_is_shared_through_the_store() {
    let store = Arc::new(MemoryStore::new());
    let first = LocalSessionManager::new(store.clone(), "phone.local");
    let id = first.sign_up("0400", "pw").unwrap().user.unwrap().id;

    let second = LocalSessionManager::new(store, "phone.local");
    // Current session is per-instance; the registry is not.
    assert!(!second.snapshot().is_authenticated());
    assert_eq!(second.sign_in("0400", "pw").unwrap().user.unwrap().id, id);
}

// =============================================================================
// sign_out / reset_auth
// =============================================================================

#[test]
fn sign_out_clears_current_and_is_idempotent() {
    let (local, _) = manager();
    local.sign_up("0400", "pw").unwrap();
    let mut rx = local.watch();

    local.sign_out().unwrap();
    local.sign_out().unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), AuthSnapshot::signed_out());
}

#[test]
fn reset_auth_clears_current_but_keeps_registry() {
    let (local, _) = manager();
    local.sign_up("0400", "pw").unwrap();

    local.reset_auth();

    assert_eq!(local.snapshot(), AuthSnapshot::signed_out());
    assert_eq!(local.users().unwrap().len(), 1);
}
