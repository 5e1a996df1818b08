//! Crypto provider interface for RSA and EC keys
//!
//! The converter never builds RSA or EC DER itself. It imports key material
//! into a [`CryptoProvider`] and exports it in the other format, the way a
//! platform crypto API's `importKey`/`exportKey` pair is used.

use std::fmt;

use affinidi_asn1::EcCurve;
use zeroize::Zeroizing;

use crate::{JWK, ProviderError};

mod rust_crypto;

pub use rust_crypto::{CryptoKey, RustCryptoProvider};

/// Serialization a key is imported from or exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Jwk,
    Spki,
    Pkcs8,
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyFormat::Jwk => write!(f, "jwk"),
            KeyFormat::Spki => write!(f, "spki"),
            KeyFormat::Pkcs8 => write!(f, "pkcs8"),
        }
    }
}

/// Key material crossing the provider boundary
#[derive(Debug, Clone)]
pub enum KeyData {
    Jwk(JWK),
    Der(Zeroizing<Vec<u8>>),
}

/// Algorithm descriptor handed to the provider
///
/// Only the key shape matters, the provider is never asked to encrypt or sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RsaOaep,
    Ecdsa { named_curve: EcCurve },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
}

/// Public or private half of a key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    Private,
}

impl Algorithm {
    /// The nominal usages requested when importing a key of `kind`
    pub fn usages(&self, kind: KeyKind) -> &'static [KeyUsage] {
        match (self, kind) {
            (Algorithm::RsaOaep, KeyKind::Public) => &[KeyUsage::Encrypt],
            (Algorithm::RsaOaep, KeyKind::Private) => &[KeyUsage::Decrypt],
            (Algorithm::Ecdsa { .. }, KeyKind::Public) => &[KeyUsage::Verify],
            (Algorithm::Ecdsa { .. }, KeyKind::Private) => &[KeyUsage::Sign],
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Algorithm::RsaOaep => write!(f, "RSA-OAEP"),
            Algorithm::Ecdsa { named_curve } => write!(f, "ECDSA ({named_curve})"),
        }
    }
}

/// Imports and exports RSA and EC keys between JWK, SPKI and PKCS#8
pub trait CryptoProvider {
    /// Opaque handle to imported key material
    type Key;

    fn import_key(
        &self,
        format: KeyFormat,
        data: KeyData,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<Self::Key, ProviderError>;

    fn export_key(&self, format: KeyFormat, key: &Self::Key) -> Result<KeyData, ProviderError>;
}
