//! Email domain allow-list.
//!
//! Login is restricted to approved email domains. The check runs after a
//! successful credential exchange and before any session is created.

#[cfg(test)]
mod tests;

/// Returns true iff `email`'s domain is one of the allowed domains or a
/// subdomain of one.
///
/// The match is anchored at a label boundary: `a@x.com` passes `["x.com"]`
/// but `a@evilx.com` does not. Comparison is case-sensitive as configured.
pub fn is_allowed_domain(email: &str, allowed: &[String]) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if domain.is_empty() {
        return false;
    }

    allowed.iter().any(|allow| {
        domain == allow || domain.ends_with(&format!(".{}", allow))
    })
}
