//! Key container detection and legacy container re-wrapping
//!
//! SPKI (RFC 5280) and PKCS#8 (RFC 5958) are the canonical containers.
//! PKCS#1 RSA keys and SEC1 EC private keys are wrapped into those, so the
//! rest of the conversion only ever sees SPKI or PKCS#8.

use affinidi_asn1::{
    AlgorithmOid, EcCurve, Element, OkpCurve, TAG_CONTEXT_0, TAG_INTEGER, TAG_OID, TAG_SEQUENCE,
    decode_oid, encode_bit_string, encode_integer, encode_null, encode_octet_string,
    encode_sequence, encode_tag, oid, read_children, read_element, read_root,
};
use tracing::debug;

use crate::{ConvertError, error::Result};

/// Container kind of a DER document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Pkcs8,
    Spki,
    Unknown,
}

/// Key algorithm named by an AlgorithmIdentifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ec(EcCurve),
    Okp(OkpCurve),
    /// Dotted OID of an algorithm that isn't RSA, EC or OKP
    Unknown(String),
}

/// Detects SPKI versus PKCS#8 from the first child of the outer SEQUENCE
///
/// A version INTEGER means PKCS#8, a nested AlgorithmIdentifier SEQUENCE
/// means SPKI. Malformed DER is reported as [`ContainerKind::Unknown`].
pub fn detect_der_key_type(der: &[u8]) -> ContainerKind {
    let kind = match read_root(der) {
        Ok((_, children)) => match children.first().map(|child| child.tag) {
            Some(TAG_INTEGER) => ContainerKind::Pkcs8,
            Some(TAG_SEQUENCE) => ContainerKind::Spki,
            _ => ContainerKind::Unknown,
        },
        Err(_) => ContainerKind::Unknown,
    };
    debug!("detected DER container: {kind:?}");
    kind
}

/// Algorithm of a SubjectPublicKeyInfo
pub fn parse_spki_algorithm(der: &[u8]) -> Result<KeyAlgorithm> {
    let (_, children) = read_root(der)?;
    let algorithm = children
        .first()
        .ok_or_else(|| ConvertError::invalid_pem("SPKI has no AlgorithmIdentifier"))?;
    parse_algorithm_identifier(der, algorithm)
}

/// Algorithm of a PKCS#8 PrivateKeyInfo
pub fn parse_pkcs8_algorithm(der: &[u8]) -> Result<KeyAlgorithm> {
    let (_, children) = read_root(der)?;
    let algorithm = children
        .get(1)
        .ok_or_else(|| ConvertError::invalid_pem("PKCS#8 has no AlgorithmIdentifier"))?;
    parse_algorithm_identifier(der, algorithm)
}

/// Classifies `SEQUENCE { OID, parameters }`
///
/// EC keys must name their curve in the parameters. A missing or unknown
/// curve is `UnsupportedCurve`, never a default.
pub(crate) fn parse_algorithm_identifier(der: &[u8], element: &Element) -> Result<KeyAlgorithm> {
    element.expect_tag(TAG_SEQUENCE, "AlgorithmIdentifier SEQUENCE")?;
    let parts = read_children(der, element)?;
    let algorithm = parts
        .first()
        .ok_or_else(|| ConvertError::invalid_pem("empty AlgorithmIdentifier"))?;
    algorithm.expect_tag(TAG_OID, "algorithm OID")?;
    let algorithm_oid = decode_oid(algorithm.value(der))?;

    Ok(match AlgorithmOid::from_oid(&algorithm_oid) {
        AlgorithmOid::Rsa => KeyAlgorithm::Rsa,
        AlgorithmOid::Okp(curve) => KeyAlgorithm::Okp(curve),
        AlgorithmOid::Unknown(other) => KeyAlgorithm::Unknown(other),
        AlgorithmOid::Ec => {
            let curve = match parts.get(1) {
                Some(parameter) if parameter.tag == TAG_OID => {
                    let curve_oid = decode_oid(parameter.value(der))?;
                    EcCurve::from_oid(&curve_oid).ok_or_else(|| ConvertError::UnsupportedCurve {
                        curve: describe_oid(&curve_oid),
                    })?
                }
                Some(parameter) => {
                    return Err(ConvertError::UnsupportedCurve {
                        curve: format!("explicit parameters (tag 0x{:02x})", parameter.tag),
                    });
                }
                None => {
                    return Err(ConvertError::UnsupportedCurve {
                        curve: "none".to_string(),
                    });
                }
            };
            KeyAlgorithm::Ec(curve)
        }
    })
}

/// Dotted OID followed by its name when the registry knows one
pub(crate) fn describe_oid(dotted: &str) -> String {
    match oid::oid_name(dotted) {
        Some(name) => format!("{dotted} ({name})"),
        None => dotted.to_string(),
    }
}

fn rsa_algorithm_identifier() -> Vec<u8> {
    encode_sequence(&[
        &encode_tag(TAG_OID, oid::RSA_ENCRYPTION_BYTES),
        &encode_null(),
    ])
}

/// Wraps a PKCS#1 RSAPrivateKey into PKCS#8
pub fn build_pkcs8_from_pkcs1(pkcs1: &[u8]) -> Result<Vec<u8>> {
    read_root(pkcs1)?;
    Ok(encode_sequence(&[
        &encode_integer(0),
        &rsa_algorithm_identifier(),
        &encode_octet_string(pkcs1),
    ]))
}

/// Wraps a PKCS#1 RSAPublicKey into SPKI
pub fn build_spki_from_rsa_public_key(pkcs1: &[u8]) -> Result<Vec<u8>> {
    read_root(pkcs1)?;
    Ok(encode_sequence(&[
        &rsa_algorithm_identifier(),
        &encode_bit_string(pkcs1),
    ]))
}

/// Wraps a SEC1 ECPrivateKey into PKCS#8
///
/// The curve comes from the `[0]` parameters of the SEC1 structure, a key
/// without them can't be wrapped.
pub fn build_pkcs8_from_sec1(sec1: &[u8]) -> Result<Vec<u8>> {
    let (_, children) = read_root(sec1)?;

    let parameters = children
        .iter()
        .find(|child| child.tag == TAG_CONTEXT_0)
        .ok_or_else(|| ConvertError::UnsupportedCurve {
            curve: "none".to_string(),
        })?;
    let named_curve = read_element(sec1, parameters.value_start)?;
    if named_curve.end != parameters.value_end || named_curve.tag != TAG_OID {
        return Err(ConvertError::UnsupportedCurve {
            curve: "explicit parameters".to_string(),
        });
    }
    let curve = EcCurve::from_oid_bytes(named_curve.value(sec1)).ok_or_else(|| {
        ConvertError::UnsupportedCurve {
            curve: decode_oid(named_curve.value(sec1))
                .map(|dotted| describe_oid(&dotted))
                .unwrap_or_else(|_| "malformed OID".to_string()),
        }
    })?;
    debug!("SEC1 private key names curve {curve}");

    Ok(encode_sequence(&[
        &encode_integer(0),
        &encode_sequence(&[
            &encode_tag(TAG_OID, oid::EC_PUBLIC_KEY_BYTES),
            &encode_tag(TAG_OID, curve.oid_bytes()),
        ]),
        &encode_octet_string(sec1),
    ]))
}
