//! JWK to PEM and PEM to JWK key conversion
//!
//! This crate provides:
//! - JWK (JSON Web Key) types per RFC 7517, for RSA, EC and OKP keys
//! - SPKI and PKCS#8 PEM output from a JWK or JWK Set
//! - JWK output from PEM (SPKI, PKCS#8, PKCS#1 and SEC1) or bare base64 DER,
//!   with per-block warnings when several PEM blocks are given
//!
//! ```rust
//! use affinidi_key_convert::{OutputType, jwk_to_pem, pem_to_jwk};
//!
//! let jwk = r#"{"kty":"OKP","crv":"Ed25519","x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#;
//! let pem = jwk_to_pem(jwk, OutputType::Public).unwrap();
//! assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
//!
//! let result = pem_to_jwk(&pem).unwrap();
//! assert!(result.warnings.is_empty());
//! ```

mod config;
mod converter;
mod error;
mod jwk;

pub mod container;
pub mod okp;
pub mod provider;

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use converter::{JwkOutput, KeyConverter, PemConversionResult, jwk_to_pem, pem_to_jwk};
pub use error::{ConversionWarning, ConvertError, ProviderError, Result};
pub use jwk::{
    ECParams, JWK, JwkSet, KeyRequest, OKPParams, OutputType, Params, PrivateKeyRequest,
    PublicKeyRequest, RSAParams, RsaPrivateMembers, decode_member, encode_member,
};
pub use provider::{
    Algorithm, CryptoKey, CryptoProvider, KeyData, KeyFormat, KeyKind, KeyUsage,
    RustCryptoProvider,
};

pub use affinidi_asn1::{EcCurve, LineEnding, OkpCurve};
