use super::is_allowed_domain;

fn domains(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_exact_domain_allowed() {
    assert!(is_allowed_domain("a@x.com", &domains(&["x.com"])));
}

#[test]
fn test_suffix_is_not_substring() {
    // evilx.com ends with "x.com" as a string but is a different domain
    assert!(!is_allowed_domain("a@evilx.com", &domains(&["x.com"])));
}

#[test]
fn test_subdomain_allowed() {
    assert!(is_allowed_domain("a@mail.x.com", &domains(&["x.com"])));
}

#[test]
fn test_multiple_domains() {
    let allowed = domains(&["example.com", "example.org"]);
    assert!(is_allowed_domain("a@example.org", &allowed));
    assert!(is_allowed_domain("a@example.com", &allowed));
    assert!(!is_allowed_domain("a@example.net", &allowed));
}

#[test]
fn test_case_sensitive() {
    assert!(!is_allowed_domain("a@X.com", &domains(&["x.com"])));
}

#[test]
fn test_malformed_email_rejected() {
    let allowed = domains(&["x.com"]);
    assert!(!is_allowed_domain("no-at-sign", &allowed));
    assert!(!is_allowed_domain("trailing@", &allowed));
    assert!(!is_allowed_domain("", &allowed));
}

#[test]
fn test_at_in_local_part() {
    // rsplit takes the final @, so a quoted @ in the local part is harmless
    assert!(is_allowed_domain("weird@local@x.com", &domains(&["x.com"])));
}

#[test]
fn test_empty_allow_list() {
    assert!(!is_allowed_domain("a@x.com", &[]));
}
