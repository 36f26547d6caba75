//! Caller policy applied at verification time
//!
//! A [`Policy`] restricts the accepted algorithms and the `aud` / `iss`
//! claims, and can bound the token lifetime. [`validator::validate`] applies
//! the claim part of it once the cryptographic checks have passed.

pub mod validator;

pub use validator::{Outcome, validate};

/// Accepted values for one header field or claim
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(Vec<String>);

impl AllowList {
    /// Build from any sequence of strings
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    /// `true` when `value` is listed
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// `true` for an empty list, which accepts nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AllowList {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for AllowList {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for AllowList {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<Vec<&str>> for AllowList {
    fn from(values: Vec<&str>) -> Self {
        Self::new(values)
    }
}

impl From<&[&str]> for AllowList {
    fn from(values: &[&str]) -> Self {
        Self::new(values.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for AllowList {
    fn from(values: [&str; N]) -> Self {
        Self::new(values)
    }
}

/// Verification policy
///
/// Every restriction is optional; `None` accepts anything. For JWS the
/// algorithm list holds `alg` values; for JWE it holds key management
/// algorithms and the encryption list holds `enc` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Accepted `alg` header values
    pub algorithms: Option<AllowList>,
    /// Accepted `enc` header values
    pub encryptions: Option<AllowList>,
    /// Maximum age in seconds counted from `iat`
    pub lifetime: Option<i64>,
    /// Accepted `aud` claim values
    pub audience: Option<AllowList>,
    /// Accepted `iss` claim values
    pub issuer: Option<AllowList>,
}

impl Policy {
    /// Policy without restrictions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `alg`
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: impl Into<AllowList>) -> Self {
        self.algorithms = Some(algorithms.into());
        self
    }

    /// Restrict `enc`
    #[must_use]
    pub fn with_encryptions(mut self, encryptions: impl Into<AllowList>) -> Self {
        self.encryptions = Some(encryptions.into());
        self
    }

    /// Bound the lifetime; zero or negative values are ignored
    #[must_use]
    pub fn with_lifetime(mut self, seconds: i64) -> Self {
        if seconds > 0 {
            self.lifetime = Some(seconds);
        }
        self
    }

    /// Require `aud` to be one of `audience`
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<AllowList>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Require `iss` to be one of `issuer`
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<AllowList>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub(crate) fn allows_algorithm(&self, alg: &str) -> bool {
        self.algorithms.as_ref().is_none_or(|list| list.contains(alg))
    }

    pub(crate) fn allows_encryption(&self, enc: &str) -> bool {
        self.encryptions.as_ref().is_none_or(|list| list.contains(enc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_conversions() {
        assert!(AllowList::from("HS256").contains("HS256"));
        assert!(AllowList::from(["HS384", "HS512"]).contains("HS512"));
        assert!(!AllowList::from(vec!["HS384"]).contains("HS256"));
        assert!(AllowList::from(vec!["a".to_string(), "b".to_string()]).contains("b"));
        assert!(AllowList::from(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn unrestricted_policy_allows_everything() {
        let policy = Policy::new();
        assert!(policy.allows_algorithm("HS256"));
        assert!(policy.allows_encryption("A128GCM"));
    }

    #[test]
    fn restricted_policy() {
        let policy = Policy::new()
            .with_algorithms(["HS384", "HS512"])
            .with_encryptions("A256GCM");
        assert!(!policy.allows_algorithm("HS256"));
        assert!(policy.allows_algorithm("HS512"));
        assert!(!policy.allows_encryption("A128GCM"));
    }

    #[test]
    fn non_positive_lifetime_is_ignored() {
        assert_eq!(Policy::new().with_lifetime(0).lifetime, None);
        assert_eq!(Policy::new().with_lifetime(-5).lifetime, None);
        assert_eq!(Policy::new().with_lifetime(60).lifetime, Some(60));
        // a later invalid value keeps the earlier one
        assert_eq!(Policy::new().with_lifetime(60).with_lifetime(0).lifetime, Some(60));
    }
}
