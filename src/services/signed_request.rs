//! Signing and validation of host platform requests.
//!
//! The host platform launches an application by posting a parameter mapping
//! signed with the application's shared secret. The signature is the base64
//! HMAC-SHA256 of the canonical query string: every parameter except
//! `signature`, sorted by key, RFC 3986 encoded and joined with `&`.
//! Validation checks that the required keys are present, that the signature
//! matches and that `issuedAt` falls inside the freshness window.

use crate::{
    config::SignedRequestConfig,
    models::{
        ISSUED_AT_FIELD, NETWORK_EID_FIELD, Params, SIGNATURE_FIELD, SignedPayload, Timestamp,
        USER_EID_FIELD, ValidationAuditEvent, ValidationEventType,
    },
    services::{
        clock::{Clock, SystemClock},
        window::SignatureWindow,
    },
    utils::{hmac, query},
};
use tracing::{debug, error};

/// Reasons a signed request is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignedRequestError {
    #[error("missing payload properties: {}", missing.join(", "))]
    IncompletePayload { missing: Vec<&'static str> },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("expired signature")]
    ExpiredSignature,

    #[error("malformed issuedAt timestamp: {0}")]
    MalformedTimestamp(String),
}

impl SignedRequestError {
    fn event_type(&self) -> ValidationEventType {
        match self {
            Self::IncompletePayload { .. } => ValidationEventType::IncompletePayload,
            Self::InvalidSignature => ValidationEventType::InvalidSignature,
            Self::ExpiredSignature => ValidationEventType::ExpiredSignature,
            Self::MalformedTimestamp(_) => ValidationEventType::MalformedTimestamp,
        }
    }
}

/// Canonical query string for a parameter mapping
///
/// Drops any `signature` key, sorts by key bytes and RFC 3986 encodes.
pub fn canonical_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(key, _)| *key != SIGNATURE_FIELD)
        .collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    query::build_query(pairs)
}

/// Signs and validates requests for one application
///
/// Holds the shared secret for its whole lifetime. Signing and validation
/// take `&self` and keep no mutable state, so one instance can be shared
/// across threads.
pub struct SignedRequest<C: Clock = SystemClock> {
    app_id: String,
    app_secret: Vec<u8>,
    window: SignatureWindow,
    clock: C,
}

impl SignedRequest<SystemClock> {
    /// Create a validator with the default 60 second window and the system clock
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            window: SignatureWindow::default(),
            clock: SystemClock,
        }
    }

    pub fn from_config(config: &SignedRequestConfig) -> Self {
        Self::new(config.app_id.clone(), config.app_secret.clone())
            .with_window(SignatureWindow::new(config.window_seconds))
    }
}

impl<C: Clock> SignedRequest<C> {
    pub fn with_window(mut self, window: SignatureWindow) -> Self {
        self.window = window;
        self
    }

    /// Replace the time source used for freshness checks
    pub fn with_clock<D: Clock>(self, clock: D) -> SignedRequest<D> {
        SignedRequest {
            app_id: self.app_id,
            app_secret: self.app_secret,
            window: self.window,
            clock,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn window(&self) -> SignatureWindow {
        self.window
    }

    /// Signature over `params`, ignoring any `signature` entry
    ///
    /// HMAC accepts keys of any length. Should key setup still fail, the
    /// signature is empty, which never validates.
    pub fn signature_for(&self, params: &Params) -> String {
        let message = canonical_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        hmac::generate_signature(&self.app_secret, &message).unwrap_or_else(|e| {
            error!(app_id = %self.app_id, error = %e, "failed to sign request");
            String::new()
        })
    }

    /// Return `params` with a `signature` entry added or replaced
    pub fn sign<I, K, V>(&self, params: I) -> Params
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let signature = self.signature_for(&params);
        params.insert(SIGNATURE_FIELD.to_string(), signature);
        params
    }

    /// Sign `params` and serialize them as an RFC 3986 query string
    ///
    /// This is the form handed to the browser-side proxy.
    pub fn sign_to_query_string<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let signed = self.sign(params);
        query::build_query(signed.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Validate a signed parameter mapping
    ///
    /// Checks, in order: required keys present, signature matches
    /// (constant-time), `issuedAt` parses, and `issuedAt` lies within the
    /// window ending now. Every outcome is recorded as an audit event.
    pub fn validate(&self, params: &Params) -> Result<SignedPayload, SignedRequestError> {
        let now = self.clock.now();
        let result = self.check(params, &now);

        let event_type = match &result {
            Ok(_) => ValidationEventType::SignatureAccepted,
            Err(e) => e.event_type(),
        };
        ValidationAuditEvent::new(event_type, &self.app_id, now)
            .with_subject(
                params.get(NETWORK_EID_FIELD).cloned(),
                params.get(USER_EID_FIELD).cloned(),
            )
            .with_issued_at(params.get(ISSUED_AT_FIELD).cloned())
            .with_details(result.as_ref().err().map(ToString::to_string))
            .log();

        result
    }

    /// Parse an RFC 3986 query string and validate it
    ///
    /// Repeated keys keep their last value.
    pub fn validate_query_string(&self, query: &str) -> Result<SignedPayload, SignedRequestError> {
        let params: Params = query::parse_query(query).into_iter().collect();
        self.validate(&params)
    }

    fn check(&self, params: &Params, now: &Timestamp) -> Result<SignedPayload, SignedRequestError> {
        let payload = SignedPayload::from_params(params).ok_or_else(|| {
            SignedRequestError::IncompletePayload {
                missing: SignedPayload::missing_fields(params),
            }
        })?;

        let message = canonical_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        match hmac::verify_signature(&self.app_secret, &message, &payload.signature) {
            Ok(true) => {}
            Ok(false) => return Err(SignedRequestError::InvalidSignature),
            Err(e) => {
                error!(app_id = %self.app_id, error = %e, "failed to verify signature");
                return Err(SignedRequestError::InvalidSignature);
            }
        }

        let issued_at = payload
            .issued_at()
            .map_err(|_| SignedRequestError::MalformedTimestamp(payload.issued_at.clone()))?;

        if !self.window.contains(&issued_at, now) {
            debug!(
                issued_at = %issued_at,
                now = %now,
                age_seconds = %SignatureWindow::age(&issued_at, now),
                window_seconds = self.window.size(),
                "issuedAt outside signature window"
            );
            return Err(SignedRequestError::ExpiredSignature);
        }

        Ok(payload)
    }
}
