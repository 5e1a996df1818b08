//! Encoding errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    #[error("Invalid DER: {0}")]
    InvalidDer(String),

    #[error("Invalid object identifier: {0}")]
    InvalidOid(String),

    #[error("Invalid PEM: {0}")]
    InvalidPem(String),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(String),
}

pub type Result<T> = std::result::Result<T, Asn1Error>;
