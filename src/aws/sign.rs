//! Signature Version 4 request signing.
//!
//! Every Query-protocol call is signed with HMAC-SHA256 over a canonical
//! rendering of the request. The canonical header set is fixed to the three
//! headers all of our requests share (`content-type`, `host`, `x-amz-date`),
//! plus the security-token header when temporary credentials are in use.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Content type sent (and signed) with every Query-protocol request.
pub(crate) const REQUEST_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static credentials used to derive request signatures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Credentials {
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret signing key.
    pub secret_access_key: String,
    /// Session token accompanying temporary credentials.
    pub session_token: Option<String>,
}

/// Request fields that participate in the canonical rendering.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RequestToSign<'a> {
    /// HTTP method, upper case.
    pub method: &'a str,
    /// Host header value, including any non-default port.
    pub host: &'a str,
    /// Absolute request path.
    pub path: &'a str,
    /// Canonical query string (sorted, encoded); empty for POSTed forms.
    pub query: &'a str,
    /// Request body exactly as transmitted.
    pub payload: &'a str,
}

/// Headers produced by signing, ready to attach to the outgoing request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SignedRequest {
    /// `x-amz-date` header value (basic ISO-8601, UTC).
    pub amz_date: String,
    /// Complete `authorization` header value.
    pub authorization: String,
}

/// Raised when the HMAC implementation rejects the key material.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("signing key material was rejected")]
pub(crate) struct SigningError;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError)?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Derives the per-day signing key for a credential scope.
pub(crate) fn derive_signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let seeded = format!("AWS4{secret_access_key}");
    let k_date = hmac_sha256(seeded.as_bytes(), date)?;
    let k_region = hmac_sha256(&k_date, region)?;
    let k_service = hmac_sha256(&k_region, service)?;
    hmac_sha256(&k_service, "aws4_request")
}

/// Signs a request, returning the date and authorization headers to send.
pub(crate) fn sign(
    request: &RequestToSign<'_>,
    credentials: &Credentials,
    region: &str,
    service: &str,
    timestamp: &DateTime<Utc>,
) -> Result<SignedRequest, SigningError> {
    let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date = timestamp.format("%Y%m%d").to_string();

    let (canonical_headers, signed_headers) = match &credentials.session_token {
        Some(token) => (
            format!(
                "content-type:{REQUEST_CONTENT_TYPE}\nhost:{host}\nx-amz-date:{amz_date}\nx-amz-security-token:{token}\n",
                host = request.host
            ),
            "content-type;host;x-amz-date;x-amz-security-token",
        ),
        None => (
            format!(
                "content-type:{REQUEST_CONTENT_TYPE}\nhost:{host}\nx-amz-date:{amz_date}\n",
                host = request.host
            ),
            "content-type;host;x-amz-date",
        ),
    };

    let canonical_request = format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        method = request.method,
        path = request.path,
        query = request.query,
        payload_hash = sha256_hex(request.payload),
    );

    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{canonical_hash}",
        canonical_hash = sha256_hex(&canonical_request),
    );

    let signing_key = derive_signing_key(&credentials.secret_access_key, &date, region, service)?;
    let signature = hex::encode(hmac_sha256(&signing_key, &string_to_sign)?);

    let authorization = format!(
        "{ALGORITHM} Credential={access_key}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        access_key = credentials.access_key_id,
    );

    Ok(SignedRequest {
        amz_date,
        authorization,
    })
}
