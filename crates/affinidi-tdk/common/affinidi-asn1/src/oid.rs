//! Object identifier encoding/decoding and the key algorithm registry
//!
//! OIDs are carried around as dotted strings. The registry below is static,
//! read-only data: lookups are exact matches and anything unrecognised is
//! surfaced as [`AlgorithmOid::Unknown`] so callers can report precisely what
//! was not supported.
//!
//! See: X.690 §8.19

use std::fmt;

use crate::{Asn1Error, Result};

// ****************************************************************************
// Registry
// See: RFC 8017, RFC 5480, RFC 8410
// ****************************************************************************
pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const SECP256R1: &str = "1.2.840.10045.3.1.7";
pub const SECP384R1: &str = "1.3.132.0.34";
pub const SECP521R1: &str = "1.3.132.0.35";
pub const X25519: &str = "1.3.101.110";
pub const X448: &str = "1.3.101.111";
pub const ED25519: &str = "1.3.101.112";
pub const ED448: &str = "1.3.101.113";

pub const RSA_ENCRYPTION_BYTES: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
pub const EC_PUBLIC_KEY_BYTES: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
pub const SECP256R1_BYTES: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
pub const SECP384R1_BYTES: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x22];
pub const SECP521R1_BYTES: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x23];
pub const X25519_BYTES: &[u8] = &[0x2b, 0x65, 0x6e];
pub const X448_BYTES: &[u8] = &[0x2b, 0x65, 0x6f];
pub const ED25519_BYTES: &[u8] = &[0x2b, 0x65, 0x70];
pub const ED448_BYTES: &[u8] = &[0x2b, 0x65, 0x71];

/// Recognised but unsupported identifiers, used for diagnostics only
const DIAGNOSTIC_NAMES: &[(&str, &str)] = &[
    ("1.2.840.113549.1.1.10", "RSASSA-PSS"),
    ("1.2.840.10040.4.1", "DSA"),
    ("1.2.840.113549.1.3.1", "DH"),
    ("1.2.840.10046.2.1", "X9.42 DH"),
    ("1.3.132.0.10", "secp256k1"),
    ("1.3.36.3.3.2.8.1.1.7", "brainpoolP256r1"),
];

/// Algorithm named by the first OID of an AlgorithmIdentifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmOid {
    Rsa,
    /// id-ecPublicKey, the curve comes from the parameters
    Ec,
    Okp(OkpCurve),
    Unknown(String),
}

impl AlgorithmOid {
    pub fn from_oid(oid: &str) -> Self {
        match oid {
            RSA_ENCRYPTION => AlgorithmOid::Rsa,
            EC_PUBLIC_KEY => AlgorithmOid::Ec,
            other => match OkpCurve::from_oid(other) {
                Some(curve) => AlgorithmOid::Okp(curve),
                None => AlgorithmOid::Unknown(other.to_string()),
            },
        }
    }
}

/// Human readable name of a registered or diagnostic OID
pub fn oid_name(oid: &str) -> Option<&'static str> {
    match oid {
        RSA_ENCRYPTION => Some("rsaEncryption"),
        EC_PUBLIC_KEY => Some("id-ecPublicKey"),
        other => EcCurve::from_oid(other)
            .map(|curve| curve.jwk_name())
            .or_else(|| OkpCurve::from_oid(other).map(|curve| curve.jwk_name()))
            .or_else(|| {
                DIAGNOSTIC_NAMES
                    .iter()
                    .find(|(dotted, _)| *dotted == other)
                    .map(|(_, name)| *name)
            }),
    }
}

/// NIST curves supported for `kty: "EC"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    pub const ALL: [EcCurve; 3] = [EcCurve::P256, EcCurve::P384, EcCurve::P521];

    pub fn oid(&self) -> &'static str {
        match self {
            EcCurve::P256 => SECP256R1,
            EcCurve::P384 => SECP384R1,
            EcCurve::P521 => SECP521R1,
        }
    }

    pub fn oid_bytes(&self) -> &'static [u8] {
        match self {
            EcCurve::P256 => SECP256R1_BYTES,
            EcCurve::P384 => SECP384R1_BYTES,
            EcCurve::P521 => SECP521R1_BYTES,
        }
    }

    /// `crv` value used in a JWK
    pub fn jwk_name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    /// Size in bytes of a coordinate or private scalar
    pub fn field_size(&self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.oid() == oid)
    }

    pub fn from_oid_bytes(bytes: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.oid_bytes() == bytes)
    }

    pub fn from_jwk_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.jwk_name() == name)
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.jwk_name())
    }
}

/// Edwards and Montgomery curves supported for `kty: "OKP"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OkpCurve {
    Ed25519,
    Ed448,
    X25519,
    X448,
}

impl OkpCurve {
    pub const ALL: [OkpCurve; 4] = [
        OkpCurve::Ed25519,
        OkpCurve::Ed448,
        OkpCurve::X25519,
        OkpCurve::X448,
    ];

    pub fn oid(&self) -> &'static str {
        match self {
            OkpCurve::Ed25519 => ED25519,
            OkpCurve::Ed448 => ED448,
            OkpCurve::X25519 => X25519,
            OkpCurve::X448 => X448,
        }
    }

    pub fn oid_bytes(&self) -> &'static [u8] {
        match self {
            OkpCurve::Ed25519 => ED25519_BYTES,
            OkpCurve::Ed448 => ED448_BYTES,
            OkpCurve::X25519 => X25519_BYTES,
            OkpCurve::X448 => X448_BYTES,
        }
    }

    pub fn jwk_name(&self) -> &'static str {
        match self {
            OkpCurve::Ed25519 => "Ed25519",
            OkpCurve::Ed448 => "Ed448",
            OkpCurve::X25519 => "X25519",
            OkpCurve::X448 => "X448",
        }
    }

    /// Raw key length in bytes (RFC 8032, RFC 7748); public and private keys
    /// have the same length
    pub fn key_length(&self) -> usize {
        match self {
            OkpCurve::Ed25519 | OkpCurve::X25519 => 32,
            OkpCurve::Ed448 => 57,
            OkpCurve::X448 => 56,
        }
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.oid() == oid)
    }

    pub fn from_oid_bytes(bytes: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.oid_bytes() == bytes)
    }

    pub fn from_jwk_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.jwk_name() == name)
    }
}

impl fmt::Display for OkpCurve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.jwk_name())
    }
}

/// Decodes the content bytes of an OBJECT IDENTIFIER into dotted form
///
/// Empty input decodes to an empty string.
pub fn decode_oid(bytes: &[u8]) -> Result<String> {
    let mut arcs: Vec<u64> = Vec::new();
    let mut value: u64 = 0;
    let mut pending = false;

    for byte in bytes {
        if value > (u64::MAX >> 7) {
            return Err(Asn1Error::InvalidOid(
                "sub-identifier does not fit in 64 bits".into(),
            ));
        }
        value = (value << 7) | (byte & 0x7f) as u64;
        pending = true;

        if byte & 0x80 == 0 {
            if arcs.is_empty() {
                // first sub-identifier packs the first two arcs as 40 * X + Y
                let (first, second) = match value {
                    0..=39 => (0, value),
                    40..=79 => (1, value - 40),
                    _ => (2, value - 80),
                };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(value);
            }
            value = 0;
            pending = false;
        }
    }

    if pending {
        return Err(Asn1Error::InvalidDer(
            "OBJECT IDENTIFIER ends inside a sub-identifier".into(),
        ));
    }

    Ok(arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("."))
}

/// Encodes a dotted OID into OBJECT IDENTIFIER content bytes
pub fn encode_oid(dotted: &str) -> Result<Vec<u8>> {
    if dotted.is_empty() {
        return Err(Asn1Error::InvalidDer(
            "an OID needs at least two components".into(),
        ));
    }

    let arcs = dotted
        .split('.')
        .map(|arc| {
            arc.parse::<u64>().map_err(|_| {
                Asn1Error::InvalidOid(format!("invalid component '{arc}' in '{dotted}'"))
            })
        })
        .collect::<Result<Vec<u64>>>()?;

    let [first, second, rest @ ..] = arcs.as_slice() else {
        return Err(Asn1Error::InvalidDer(format!(
            "an OID needs at least two components, got '{dotted}'"
        )));
    };
    if *first > 2 || (*first < 2 && *second >= 40) {
        return Err(Asn1Error::InvalidOid(format!(
            "first two components of '{dotted}' are out of range"
        )));
    }
    let head = (first * 40).checked_add(*second).ok_or_else(|| {
        Asn1Error::InvalidOid(format!("second component of '{dotted}' is too large"))
    })?;

    let mut encoded = Vec::with_capacity(arcs.len() * 2);
    push_base128(&mut encoded, head);
    for arc in rest {
        push_base128(&mut encoded, *arc);
    }
    Ok(encoded)
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut start = groups.len();
    loop {
        start -= 1;
        groups[start] = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            break;
        }
    }

    let last = groups.len() - 1;
    for (index, group) in groups.iter().enumerate().skip(start) {
        out.push(if index < last { group | 0x80 } else { *group });
    }
}
