// Auth session types and redirect parsing

/// Expiry sentinel: the provider reported no lifetime for the token.
/// Treated as not-yet-expired.
pub const NO_KNOWN_EXPIRY: i64 = -1;

/// The authenticated state of the subsystem at one point in time.
///
/// `authenticated == true` implies a non-empty `access_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    /// Absolute expiry in epoch seconds, or [`NO_KNOWN_EXPIRY`].
    pub expires_at: i64,
    pub user_email: Option<String>,
    pub authenticated: bool,
}

impl AuthSession {
    /// A session with no credentials.
    pub fn signed_out() -> Self {
        Self {
            access_token: String::new(),
            expires_at: NO_KNOWN_EXPIRY,
            user_email: None,
            authenticated: false,
        }
    }

    pub fn is_expired(&self, now_epoch_secs: i64) -> bool {
        self.expires_at != NO_KNOWN_EXPIRY && self.expires_at < now_epoch_secs
    }
}

/// Fields carried by the implicit-grant redirect fragment.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RedirectFragment {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Parse the fragment of the redirect URL. Accepts either the bare
/// fragment (`access_token=..&expires_in=..`) or a full URL containing
/// `#`.
pub fn parse_fragment(raw: &str) -> RedirectFragment {
    let fragment = match raw.split_once('#') {
        Some((_, rest)) => rest,
        None => raw,
    };

    let mut parsed = RedirectFragment::default();
    for pair in fragment.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "access_token" => parsed.access_token = Some(value.to_string()),
            "expires_in" => parsed.expires_in = value.parse().ok(),
            _ => {}
        }
    }

    parsed
}
