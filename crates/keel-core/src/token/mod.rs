//! Signed consent-state token codec.
//!
//! The consent state travels through an untrusted, client-held round trip,
//! so it is serialized, MAC'd with a server-held secret, and emitted as a
//! versioned three-segment string:
//!
//! ```text
//! v1.<base64url(payload)>.<base64url(hmac-sha256(payload))>
//! ```
//!
//! Decoding walks an ordered list of format handlers. The current `v1`
//! handler verifies the MAC with a constant-time comparison and checks the
//! session binding; a legacy unsigned `v0` handler (`v0.<payload>`) is kept
//! for the migration window and is explicitly weaker. Any token no handler
//! accepts decodes to the fresh empty state — fail closed, not fail open.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use crate::state::ConsentState;

type HmacSha256 = Hmac<Sha256>;

/// Version tag of the current signed format.
const TOKEN_VERSION_V1: &str = "v1";

/// Version tag of the legacy unsigned format.
const TOKEN_VERSION_V0: &str = "v0";

/// Errors that can occur when encoding a token.
///
/// Decoding is infallible by design: every failure degrades to the empty
/// state instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The consent state could not be serialized.
    #[error("consent state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The signing key was rejected by the MAC construction.
    #[error("signing key rejected by MAC construction")]
    MacKey,
}

/// Codec for the client-held consent token.
///
/// Purely functional given the secret: no ambient state, no I/O. The secret
/// is injected at construction time so tests can supply distinct secrets
/// without process-wide side effects.
pub struct TokenCodec {
    secret: SecretString,
}

impl TokenCodec {
    /// Creates a codec signing with the given secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Encodes and signs a consent state.
    ///
    /// When `session_id` is supplied, a one-way digest of it is embedded in
    /// the payload so that a token captured in one session cannot be
    /// replayed in another.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or the MAC cannot
    /// be constructed.
    pub fn encode(
        &self,
        state: &ConsentState,
        session_id: Option<&str>,
    ) -> Result<String, TokenError> {
        let mut payload_state = state.clone();
        if let Some(sid) = session_id {
            payload_state.session_binding = Some(session_digest(sid));
        }
        let payload = serde_json::to_vec(&payload_state)?;
        let mac = self.mac_bytes(&payload)?;
        Ok(format!(
            "{TOKEN_VERSION_V1}.{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(mac)
        ))
    }

    /// Decodes a token, trying each known format in order.
    ///
    /// Never fails: a malformed, tampered, wrong-version, or
    /// session-mismatched token decodes to [`ConsentState::default`].
    #[must_use]
    pub fn decode(&self, token: &str, session_id: Option<&str>) -> ConsentState {
        for format in FORMATS {
            if let Some(state) = (format.decode)(self, token, session_id) {
                return state;
            }
        }
        debug!("token matched no known format; resetting to empty state");
        ConsentState::default()
    }

    fn mac_bytes(&self, payload: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::MacKey)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// One decode handler in the versioned-parser list.
struct TokenFormat {
    decode: fn(&TokenCodec, &str, Option<&str>) -> Option<ConsentState>,
}

/// Ordered decode handlers; the first that accepts wins. Removing the `v0`
/// entry ends the legacy migration window.
const FORMATS: &[TokenFormat] = &[
    TokenFormat { decode: decode_v1 },
    TokenFormat { decode: decode_v0 },
];

fn decode_v1(codec: &TokenCodec, token: &str, session_id: Option<&str>) -> Option<ConsentState> {
    let mut segments = token.split('.');
    let version = segments.next()?;
    let payload_segment = segments.next()?;
    let signature_segment = segments.next()?;
    if version != TOKEN_VERSION_V1 || segments.next().is_some() {
        return None;
    }

    let payload = URL_SAFE_NO_PAD.decode(payload_segment).ok()?;
    let signature = URL_SAFE_NO_PAD.decode(signature_segment).ok()?;
    let expected = codec.mac_bytes(&payload).ok()?;
    if !bool::from(expected.ct_eq(&signature)) {
        debug!("v1 token rejected: signature mismatch");
        return None;
    }

    let state: ConsentState = serde_json::from_slice(&payload).ok()?;
    verify_binding(state, session_id)
}

fn decode_v0(_codec: &TokenCodec, token: &str, session_id: Option<&str>) -> Option<ConsentState> {
    let mut segments = token.split('.');
    let version = segments.next()?;
    let payload_segment = segments.next()?;
    if version != TOKEN_VERSION_V0 || segments.next().is_some() {
        return None;
    }

    let payload = URL_SAFE_NO_PAD.decode(payload_segment).ok()?;
    let state: ConsentState = serde_json::from_slice(&payload).ok()?;
    debug!("accepted legacy unsigned token");
    verify_binding(state, session_id)
}

/// Verifies the session binding when both sides carry one.
///
/// Tokens minted before binding existed have no digest and stay valid
/// through the migration window; a mismatched digest always resets.
fn verify_binding(state: ConsentState, session_id: Option<&str>) -> Option<ConsentState> {
    match (session_id, state.session_binding.as_deref()) {
        (Some(sid), Some(bound)) => {
            let expected = session_digest(sid);
            if bool::from(expected.as_bytes().ct_eq(bound.as_bytes())) {
                Some(state)
            } else {
                debug!("token rejected: session binding mismatch");
                None
            }
        },
        _ => Some(state),
    }
}

/// One-way digest binding a token to a session identifier.
fn session_digest(session_id: &str) -> String {
    hex::encode(Sha256::digest(session_id.as_bytes()))
}
