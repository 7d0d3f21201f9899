use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use thiserror::Error;

use pinboard_types::api::Claims;
use pinboard_types::models::Principal;

/// Why a token was rejected. The distinction matters for the server log;
/// clients always see a single generic authentication failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    SignatureInvalid,
}

/// Validates bearer tokens for the chat socket.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Decode a token into the principal it names. No side effects.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
                    _ => AuthError::Malformed,
                }
            })?;

        Ok(Principal {
            id: data.claims.sub,
            username: data.claims.username,
        })
    }
}
