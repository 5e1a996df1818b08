//! Error types for key conversion
//!
//! Every [`ConvertError`] carries a stable code and named parameters so
//! callers can render their own messages.

use std::collections::BTreeMap;

use affinidi_asn1::{Asn1Error, OkpCurve};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Invalid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Invalid JWK: {reason}")]
    InvalidJwk { reason: String },

    /// `warnings` holds the per-block failures when no block converted
    #[error("Invalid PEM: {reason}")]
    InvalidPem {
        reason: String,
        warnings: Vec<ConversionWarning>,
    },

    #[error("JWK is missing required member '{field}'")]
    MissingField { field: String },

    #[error("{kty} JWK is missing public key member '{field}'")]
    MissingPublicKey { kty: String, field: String },

    #[error("{kty} JWK is missing private key member '{field}'")]
    MissingPrivateKey { kty: String, field: String },

    #[error("Unsupported key type: {kty}")]
    UnsupportedKty { kty: String },

    #[error("Unsupported curve: {curve}")]
    UnsupportedCurve { curve: String },

    #[error("Unsupported algorithm: {oid}")]
    UnsupportedAlgorithm { oid: String },

    #[error("Unsupported PEM label: {label}")]
    UnsupportedPemLabel { label: String },

    #[error("{curve} private key has no public key and it can't be derived")]
    OkpPublicKeyMissing { curve: OkpCurve },

    #[error("Crypto provider failed: {0}")]
    WebCryptoFailed(#[from] ProviderError),

    #[error("No crypto provider is available for RSA and EC keys")]
    WebCryptoUnavailable,
}

impl ConvertError {
    pub(crate) fn invalid_pem(reason: impl Into<String>) -> Self {
        ConvertError::InvalidPem {
            reason: reason.into(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn invalid_jwk(reason: impl Into<String>) -> Self {
        ConvertError::InvalidJwk {
            reason: reason.into(),
        }
    }

    /// Stable code identifying the failure
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::InvalidJson { .. } => "InvalidJson",
            ConvertError::InvalidJwk { .. } => "InvalidJwk",
            ConvertError::InvalidPem { .. } => "InvalidPem",
            ConvertError::MissingField { .. } => "MissingField",
            ConvertError::MissingPublicKey { .. } => "MissingPublicKey",
            ConvertError::MissingPrivateKey { .. } => "MissingPrivateKey",
            ConvertError::UnsupportedKty { .. } => "UnsupportedKty",
            ConvertError::UnsupportedCurve { .. } => "UnsupportedCurve",
            ConvertError::UnsupportedAlgorithm { .. } => "UnsupportedAlgorithm",
            ConvertError::UnsupportedPemLabel { .. } => "UnsupportedPemLabel",
            ConvertError::OkpPublicKeyMissing { .. } => "OkpPublicKeyMissing",
            ConvertError::WebCryptoFailed(_) => "WebCryptoFailed",
            ConvertError::WebCryptoUnavailable => "WebCryptoUnavailable",
        }
    }

    /// Named parameters for message formatting
    pub fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        match self {
            ConvertError::InvalidJson { reason }
            | ConvertError::InvalidJwk { reason }
            | ConvertError::InvalidPem { reason, .. } => {
                params.insert("reason".to_string(), reason.clone());
            }
            ConvertError::MissingField { field } => {
                params.insert("field".to_string(), field.clone());
            }
            ConvertError::MissingPublicKey { kty, field }
            | ConvertError::MissingPrivateKey { kty, field } => {
                params.insert("kty".to_string(), kty.clone());
                params.insert("field".to_string(), field.clone());
            }
            ConvertError::UnsupportedKty { kty } => {
                params.insert("kty".to_string(), kty.clone());
            }
            ConvertError::UnsupportedCurve { curve } => {
                params.insert("curve".to_string(), curve.clone());
            }
            ConvertError::UnsupportedAlgorithm { oid } => {
                params.insert("oid".to_string(), oid.clone());
            }
            ConvertError::UnsupportedPemLabel { label } => {
                params.insert("label".to_string(), label.clone());
            }
            ConvertError::OkpPublicKeyMissing { curve } => {
                params.insert("curve".to_string(), curve.to_string());
            }
            ConvertError::WebCryptoFailed(e) => {
                params.insert("reason".to_string(), e.to_string());
            }
            ConvertError::WebCryptoUnavailable => {}
        }
        params
    }
}

impl From<Asn1Error> for ConvertError {
    fn from(e: Asn1Error) -> Self {
        ConvertError::invalid_pem(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// A PEM block that failed to convert while others succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    /// Stable error code, see [`ConvertError::code`]
    pub key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl ConversionWarning {
    /// Records `error` against the 1-based PEM `block` index
    pub fn from_error(error: &ConvertError, block: usize) -> Self {
        let mut params = error.params();
        params.insert("block".to_string(), block.to_string());
        ConversionWarning {
            key: error.code().to_string(),
            params,
        }
    }
}

/// Failures raised by a [`crate::CryptoProvider`], named after the
/// DOMException types a platform crypto API reports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("DataError: {0}")]
    Data(String),

    #[error("NotSupportedError: {0}")]
    NotSupported(String),

    #[error("InvalidAccessError: {0}")]
    InvalidAccess(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_params() {
        let error = ConvertError::MissingPrivateKey {
            kty: "RSA".into(),
            field: "d".into(),
        };
        assert_eq!(error.code(), "MissingPrivateKey");
        assert_eq!(error.params()["kty"], "RSA");
        assert_eq!(error.params()["field"], "d");

        assert_eq!(ConvertError::WebCryptoUnavailable.code(), "WebCryptoUnavailable");
        assert!(ConvertError::WebCryptoUnavailable.params().is_empty());
    }

    #[test]
    fn asn1_errors_become_invalid_pem() {
        let error: ConvertError = Asn1Error::InvalidDer("missing tag at offset 0".into()).into();
        assert_eq!(error.code(), "InvalidPem");
        assert!(error.to_string().contains("missing tag"));
    }

    #[test]
    fn provider_errors_become_webcrypto_failed() {
        let error: ConvertError = ProviderError::Data("bad key".into()).into();
        assert_eq!(error.code(), "WebCryptoFailed");
        assert_eq!(error.params()["reason"], "DataError: bad key");
    }

    #[test]
    fn warning_carries_block_index() {
        let warning = ConversionWarning::from_error(
            &ConvertError::UnsupportedPemLabel {
                label: "CERTIFICATE".into(),
            },
            2,
        );
        assert_eq!(warning.key, "UnsupportedPemLabel");
        assert_eq!(warning.params["label"], "CERTIFICATE");
        assert_eq!(warning.params["block"], "2");

        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["key"], "UnsupportedPemLabel");
    }
}
