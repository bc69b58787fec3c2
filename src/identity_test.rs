use super::*;

#[test]
fn synthetic_email_appends_domain() {
    assert_eq!(synthetic_email("0412345678", "phone.local"), "0412345678@phone.local");
}

#[test]
fn synthetic_email_trims_identifier() {
    assert_eq!(synthetic_email("  0412345678 ", "phone.local"), "0412345678@phone.local");
}

#[test]
fn synthetic_email_tolerates_leading_at_in_domain() {
    assert_eq!(synthetic_email("555", "@example.test"), "555@example.test");
}

#[test]
fn redirect_target_root_base_path() {
    assert_eq!(redirect_target("https://app.example.com", "/"), "https://app.example.com/");
}

#[test]
fn redirect_target_nested_base_path() {
    assert_eq!(redirect_target("https://app.example.com/", "/portal/"), "https://app.example.com/portal/");
}

#[test]
fn redirect_target_base_path_without_slash() {
    assert_eq!(redirect_target("http://localhost:5173", "portal"), "http://localhost:5173/portal");
}

#[test]
fn redirect_target_empty_base_path() {
    assert_eq!(redirect_target("http://localhost:5173", ""), "http://localhost:5173/");
}
