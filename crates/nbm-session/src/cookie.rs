use serde::{Deserialize, Serialize};

/// A cookie harvested from the browser engine
///
/// Only the name and value are kept; domain, path and expiry are irrelevant once the cookies are
/// flattened into a [`Credential`].
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

impl CookieRecord {
    /// Creates a new cookie record
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// We manually implement Debug to make sure we don't print sensitive cookie values
impl std::fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieRecord")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Header-ready credential string of `name=value` pairs joined by `;`
///
/// This is the unit that is cached by the [`crate::CredentialStore`] and injected as the `cookie`
/// header. An empty credential means no session is available.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps an already formatted credential string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the credential string
    ///
    /// The value is a session secret; avoid logging it.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when no session cookie is present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the credential string in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Consumes the credential and returns the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential")
            .field(&format_args!("[REDACTED; {} bytes]", self.0.len()))
            .finish()
    }
}

/// Formats harvested cookies into a single credential string
///
/// Pairs are joined with `=` and records with `;`, keeping the input order and without a trailing
/// separator. Names and values are not escaped, matching the string form of the browser's cookie
/// jar.
///
/// # Example
///
/// ```
/// # use nbm_session::{CookieRecord, format_credential};
/// let credential = format_credential(&[CookieRecord::new("a", "1"), CookieRecord::new("b", "2")]);
/// assert_eq!(credential.as_str(), "a=1;b=2");
/// ```
pub fn format_credential(cookies: &[CookieRecord]) -> Credential {
    let formatted = cookies
        .iter()
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect::<Vec<_>>()
        .join(";");

    Credential(formatted)
}
