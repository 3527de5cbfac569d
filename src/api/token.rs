//! Signed session tokens.
//!
//! Compact `header.claims.signature` tokens, HMAC-SHA256 over the base64url
//! signing input. Verification is offline: a request is authenticated by the
//! signature and the embedded claims alone, no session table is consulted.
//! Expired tokens are reported separately from malformed or forged ones so
//! the API can tell the caller to log in again versus rejecting garbage.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use super::handlers::auth::types::Rol;

type HmacSha256 = Hmac<Sha256>;

/// Fixed session lifetime: 8 hours, no refresh.
pub const TOKEN_TTL_SECONDS: i64 = 8 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Identity claims carried by the session token.
///
/// `villa_id` is `Some` exactly when the user is a dirigente; admins carry
/// `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub nombre: String,
    pub email: String,
    pub rol: Rol,
    pub villa_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.rol, Rol::Admin)
    }

    #[must_use]
    pub const fn is_dirigente(&self) -> bool {
        matches!(self.rol, Rol::Dirigente)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Create an HS256-signed session token.
///
/// # Errors
///
/// Returns an error if the header or claims cannot be encoded as JSON.
pub fn sign_hs256(secret: &[u8], claims: &Claims) -> Result<String, Error> {
    let header_b64 = b64e_json(&TokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::InvalidSignature)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify an HS256 session token and return its decoded claims.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - the algorithm is not HS256,
/// - the signature does not verify under `secret`,
/// - the token expired at or before `now_unix_seconds`.
pub fn verify_hs256(token: &str, secret: &[u8], now_unix_seconds: i64) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != "HS256" {
        return Err(Error::UnsupportedAlg(header.alg));
    }

    // Check the signature before trusting a single claim byte.
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::InvalidSignature)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| Error::InvalidSignature)?;

    let claims: Claims = b64d_json(claims_b64)?;
    if claims.exp <= now_unix_seconds {
        return Err(Error::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"cambia-esto-en-produccion";
    const NOW: i64 = 1_700_000_000;

    fn test_claims(rol: Rol, villa_id: Option<Uuid>) -> Claims {
        Claims {
            sub: Uuid::nil(),
            nombre: "Maria Soto".to_string(),
            email: "maria@example.com".to_string(),
            rol,
            villa_id,
            iat: NOW,
            exp: NOW + TOKEN_TTL_SECONDS,
        }
    }

    #[test]
    fn sign_and_verify_round_trip() -> Result<(), Error> {
        let claims = test_claims(Rol::Admin, None);
        let token = sign_hs256(SECRET, &claims)?;
        let verified = verify_hs256(&token, SECRET, NOW)?;
        assert_eq!(verified, claims);
        Ok(())
    }

    #[test]
    fn dirigente_claims_keep_villa_reference() -> Result<(), Error> {
        let villa = Uuid::new_v4();
        let claims = test_claims(Rol::Dirigente, Some(villa));
        let token = sign_hs256(SECRET, &claims)?;
        let verified = verify_hs256(&token, SECRET, NOW)?;
        assert_eq!(verified.rol, Rol::Dirigente);
        assert_eq!(verified.villa_id, Some(villa));
        assert!(verified.is_dirigente());
        assert!(!verified.is_admin());
        Ok(())
    }

    #[test]
    fn rejects_expired_token() -> Result<(), Error> {
        let claims = test_claims(Rol::Admin, None);
        let token = sign_hs256(SECRET, &claims)?;
        let result = verify_hs256(&token, SECRET, NOW + TOKEN_TTL_SECONDS);
        assert!(matches!(result, Err(Error::Expired)));
        Ok(())
    }

    #[test]
    fn rejects_wrong_secret() -> Result<(), Error> {
        let claims = test_claims(Rol::Admin, None);
        let token = sign_hs256(SECRET, &claims)?;
        let result = verify_hs256(&token, b"otro-secreto", NOW);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_tampered_claims() -> Result<(), Error> {
        let claims = test_claims(Rol::Dirigente, Some(Uuid::new_v4()));
        let token = sign_hs256(SECRET, &claims)?;

        // Swap the claims segment for one that says ADMIN.
        let forged_claims = b64e_json(&test_claims(Rol::Admin, None))?;
        let mut parts = token.split('.');
        let header = parts.next().ok_or(Error::TokenFormat)?;
        let sig = parts.nth(1).ok_or(Error::TokenFormat)?;
        let forged = format!("{header}.{forged_claims}.{sig}");

        let result = verify_hs256(&forged, SECRET, NOW);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(
            verify_hs256("not-a-token", SECRET, NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            verify_hs256("a.b", SECRET, NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            verify_hs256("a.b.c.d", SECRET, NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            verify_hs256("!!.!!.!!", SECRET, NOW),
            Err(Error::Base64)
        ));
    }

    #[test]
    fn rejects_unsupported_algorithm() -> Result<(), Error> {
        let header = b64e_json(&TokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })?;
        let claims = b64e_json(&test_claims(Rol::Admin, None))?;
        let token = format!("{header}.{claims}.AAAA");
        let result = verify_hs256(&token, SECRET, NOW);
        assert!(matches!(result, Err(Error::UnsupportedAlg(alg)) if alg == "none"));
        Ok(())
    }
}
