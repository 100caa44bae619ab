/*
 * Copyright 2026 Telecare Contributors
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Session credentials handed out by the booking API.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fmt;

/// Credentials for one join attempt, obtained from the booking API.
///
/// They are opaque to this crate apart from a structural well-formedness
/// check on the token; they are single-use and time-limited, so a stale set
/// must produce a precondition error rather than a retry loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCredentials {
    pub session_identifier: String,
    pub session_token: String,
    pub application_id: String,
}

/// Why a set of credentials was rejected before any network call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    /// A required field was empty.
    MissingField(&'static str),
    /// The session token is not a well-formed signed token.
    MalformedToken,
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::MissingField(field) => {
                write!(f, "missing {field} in the appointment link")
            }
            CredentialsError::MalformedToken => {
                write!(f, "the session token in the appointment link is malformed or expired")
            }
        }
    }
}

impl std::error::Error for CredentialsError {}

impl SessionCredentials {
    pub fn new(session_identifier: &str, session_token: &str, application_id: &str) -> Self {
        Self {
            session_identifier: session_identifier.to_string(),
            session_token: session_token.to_string(),
            application_id: application_id.to_string(),
        }
    }

    /// Check the credentials locally before any network or device call.
    ///
    /// Distinguishes "this link is broken" (fail here, tell the user to use
    /// the link from their reminder email) from "the transport rejected the
    /// token" (a transport error with its own guidance). The token must look
    /// like a signed token: three dot-separated segments whose first two are
    /// base64url-decodable.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.session_identifier.trim().is_empty() {
            return Err(CredentialsError::MissingField("session identifier"));
        }
        if self.application_id.trim().is_empty() {
            return Err(CredentialsError::MissingField("application id"));
        }
        if self.session_token.trim().is_empty() {
            return Err(CredentialsError::MissingField("session token"));
        }

        let segments: Vec<&str> = self.session_token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(CredentialsError::MalformedToken);
        }
        for segment in &segments[..2] {
            if URL_SAFE_NO_PAD.decode(segment).is_err() {
                return Err(CredentialsError::MalformedToken);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_token() -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\"}");
        let claims = URL_SAFE_NO_PAD.encode(b"{\"session\":\"abc\"}");
        format!("{header}.{claims}.signature-bits")
    }

    #[test]
    fn well_formed_credentials_pass() {
        let creds = SessionCredentials::new("1_MX4...", &signed_token(), "app-47");
        assert_eq!(creds.validate(), Ok(()));
    }

    #[test]
    fn empty_fields_are_named() {
        let creds = SessionCredentials::new("", &signed_token(), "app-47");
        assert_eq!(
            creds.validate(),
            Err(CredentialsError::MissingField("session identifier"))
        );

        let creds = SessionCredentials::new("sid", &signed_token(), "");
        assert_eq!(
            creds.validate(),
            Err(CredentialsError::MissingField("application id"))
        );

        let creds = SessionCredentials::new("sid", "", "app-47");
        assert_eq!(
            creds.validate(),
            Err(CredentialsError::MissingField("session token"))
        );
    }

    #[test]
    fn token_without_three_segments_is_malformed() {
        let creds = SessionCredentials::new("sid", "not-a-token", "app");
        assert_eq!(creds.validate(), Err(CredentialsError::MalformedToken));

        let creds = SessionCredentials::new("sid", "a.b", "app");
        assert_eq!(creds.validate(), Err(CredentialsError::MalformedToken));
    }

    #[test]
    fn token_with_undecodable_segments_is_malformed() {
        let creds = SessionCredentials::new("sid", "???.???.sig", "app");
        assert_eq!(creds.validate(), Err(CredentialsError::MalformedToken));
    }
}
