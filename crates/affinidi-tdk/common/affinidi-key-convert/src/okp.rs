//! OKP (Ed25519, Ed448, X25519, X448) keys in SPKI and PKCS#8
//!
//! RFC 8410 keys are built and parsed directly from raw key bytes. The
//! PKCS#8 private key field holds a second, inner OCTET STRING with the raw
//! key, so it is unwrapped exactly once.

use affinidi_asn1::{
    Element, OkpCurve, TAG_BIT_STRING, TAG_CONTEXT_1, TAG_CONTEXT_1_PRIMITIVE, TAG_OCTET_STRING,
    TAG_OID, TAG_SEQUENCE, bit_string_payload, decode_oid, encode_bit_string, encode_integer,
    encode_octet_string, encode_sequence, encode_tag, read_children, read_element, read_root,
    read_unsigned,
};
use ed25519_dalek::SigningKey;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{ConvertError, JWK, container::describe_oid, error::Result};

/// Public JWK from an OKP SubjectPublicKeyInfo
pub fn parse_okp_spki(der: &[u8]) -> Result<JWK> {
    let (_, children) = read_root(der)?;
    let [algorithm, public_key] = children.as_slice() else {
        return Err(ConvertError::invalid_pem(format!(
            "SPKI must hold 2 elements, found {}",
            children.len()
        )));
    };

    let curve = okp_curve(der, algorithm)?;
    public_key.expect_tag(TAG_BIT_STRING, "subjectPublicKey BIT STRING")?;
    let x = bit_string_payload(public_key.value(der))?;
    check_length(curve, x, "public key").map_err(ConvertError::invalid_pem)?;

    Ok(JWK::okp(curve, x, None))
}

/// Private JWK from an OKP PKCS#8 (v1 PrivateKeyInfo or v2 OneAsymmetricKey)
///
/// The public key is taken from the optional `[1]` field. When it is absent
/// it is derived, which only Ed25519 supports.
pub fn parse_okp_pkcs8(der: &[u8]) -> Result<JWK> {
    let (_, children) = read_root(der)?;
    let [version, algorithm, private_key, optional @ ..] = children.as_slice() else {
        return Err(ConvertError::invalid_pem(format!(
            "PKCS#8 must hold at least 3 elements, found {}",
            children.len()
        )));
    };

    let version = read_unsigned(der, version)?;
    if version > 1 {
        return Err(ConvertError::invalid_pem(format!(
            "unsupported PKCS#8 version {version}"
        )));
    }

    let curve = okp_curve(der, algorithm)?;

    private_key.expect_tag(TAG_OCTET_STRING, "privateKey OCTET STRING")?;
    let wrapped = private_key.value(der);
    let inner = read_element(wrapped, 0)?;
    inner.expect_tag(TAG_OCTET_STRING, "CurvePrivateKey OCTET STRING")?;
    if inner.end != wrapped.len() {
        return Err(ConvertError::invalid_pem(
            "trailing bytes after CurvePrivateKey",
        ));
    }
    let d = inner.value(wrapped);
    check_length(curve, d, "private key").map_err(ConvertError::invalid_pem)?;

    let x = match embedded_public_key(der, optional)? {
        Some(x) => {
            check_length(curve, x, "public key").map_err(ConvertError::invalid_pem)?;
            x.to_vec()
        }
        None => derive_public_key(curve, d)?,
    };

    Ok(JWK::okp(curve, &x, Some(d)))
}

/// SubjectPublicKeyInfo for a raw OKP public key
pub fn encode_okp_spki(curve: OkpCurve, public_key: &[u8]) -> Result<Vec<u8>> {
    check_length(curve, public_key, "public key").map_err(ConvertError::invalid_jwk)?;
    Ok(encode_sequence(&[
        &okp_algorithm_identifier(curve),
        &encode_bit_string(public_key),
    ]))
}

/// Version 0 PKCS#8 for a raw OKP private key, without the public key
pub fn encode_okp_pkcs8(curve: OkpCurve, private_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    check_length(curve, private_key, "private key").map_err(ConvertError::invalid_jwk)?;
    let inner = Zeroizing::new(encode_octet_string(private_key));
    let outer = Zeroizing::new(encode_octet_string(&inner));
    Ok(Zeroizing::new(encode_sequence(&[
        &encode_integer(0),
        &okp_algorithm_identifier(curve),
        &outer,
    ])))
}

/// OneAsymmetricKey (PKCS#8 version 1) carrying the public key as `[1] IMPLICIT BIT STRING`
///
/// Used for curves whose public key cannot be derived on import.
pub fn encode_okp_pkcs8_with_public_key(
    curve: OkpCurve,
    private_key: &[u8],
    public_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    check_length(curve, private_key, "private key").map_err(ConvertError::invalid_jwk)?;
    check_length(curve, public_key, "public key").map_err(ConvertError::invalid_jwk)?;
    let inner = Zeroizing::new(encode_octet_string(private_key));
    let outer = Zeroizing::new(encode_octet_string(&inner));
    let mut payload = Vec::with_capacity(public_key.len() + 1);
    payload.push(0);
    payload.extend_from_slice(public_key);
    Ok(Zeroizing::new(encode_sequence(&[
        &encode_integer(1),
        &okp_algorithm_identifier(curve),
        &outer,
        &encode_tag(TAG_CONTEXT_1_PRIMITIVE, &payload),
    ])))
}

/// PKCS#8 for a private OKP JWK
///
/// An Ed25519 `x` must match the key derived from `d` and is left out, other
/// curves embed the supplied `x` in a version 1 OneAsymmetricKey.
pub fn encode_okp_private_key(
    curve: OkpCurve,
    private_key: &[u8],
    public_key: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>> {
    match public_key {
        Some(public_key) if curve == OkpCurve::Ed25519 => {
            check_length(curve, private_key, "private key").map_err(ConvertError::invalid_jwk)?;
            check_length(curve, public_key, "public key").map_err(ConvertError::invalid_jwk)?;
            if derive_public_key(curve, private_key)? != public_key {
                return Err(ConvertError::invalid_jwk(
                    "Ed25519 member 'x' does not match the public key of 'd'",
                ));
            }
            encode_okp_pkcs8(curve, private_key)
        }
        Some(public_key) => encode_okp_pkcs8_with_public_key(curve, private_key, public_key),
        None => encode_okp_pkcs8(curve, private_key),
    }
}

fn okp_algorithm_identifier(curve: OkpCurve) -> Vec<u8> {
    encode_sequence(&[&encode_tag(TAG_OID, curve.oid_bytes())])
}

fn okp_curve(der: &[u8], algorithm: &Element) -> Result<OkpCurve> {
    algorithm.expect_tag(TAG_SEQUENCE, "AlgorithmIdentifier SEQUENCE")?;
    let parts = read_children(der, algorithm)?;
    let oid = parts
        .first()
        .ok_or_else(|| ConvertError::invalid_pem("empty AlgorithmIdentifier"))?;
    oid.expect_tag(TAG_OID, "algorithm OID")?;

    match OkpCurve::from_oid_bytes(oid.value(der)) {
        Some(curve) => Ok(curve),
        None => Err(ConvertError::UnsupportedAlgorithm {
            oid: describe_oid(&decode_oid(oid.value(der))?),
        }),
    }
}

/// Public key from the `[1]` field, explicit (`0xA1`) or implicit (`0x81`)
fn embedded_public_key<'a>(der: &'a [u8], optional: &[Element]) -> Result<Option<&'a [u8]>> {
    for element in optional {
        match element.tag {
            TAG_CONTEXT_1 => {
                let bit_string = read_element(der, element.value_start)?;
                bit_string.expect_tag(TAG_BIT_STRING, "publicKey BIT STRING")?;
                if bit_string.end != element.value_end {
                    return Err(ConvertError::invalid_pem(
                        "trailing bytes after publicKey",
                    ));
                }
                return Ok(Some(bit_string_payload(bit_string.value(der))?));
            }
            TAG_CONTEXT_1_PRIMITIVE => {
                return Ok(Some(bit_string_payload(element.value(der))?));
            }
            _ => {}
        }
    }
    Ok(None)
}

fn derive_public_key(curve: OkpCurve, private_key: &[u8]) -> Result<Vec<u8>> {
    match curve {
        OkpCurve::Ed25519 => {
            debug!("deriving Ed25519 public key from the private key");
            let seed: Zeroizing<[u8; 32]> =
                Zeroizing::new(private_key.try_into().map_err(|_| {
                    ConvertError::invalid_pem("Ed25519 private key must be 32 bytes")
                })?);
            let signing_key = SigningKey::from_bytes(&seed);
            Ok(signing_key.verifying_key().to_bytes().to_vec())
        }
        _ => Err(ConvertError::OkpPublicKeyMissing { curve }),
    }
}

fn check_length(curve: OkpCurve, key: &[u8], what: &str) -> std::result::Result<(), String> {
    if key.len() == curve.key_length() {
        Ok(())
    } else {
        Err(format!(
            "{curve} {what} must be {} bytes, got {}",
            curve.key_length(),
            key.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Params;
    use affinidi_asn1::{TAG_CONTEXT_0, decode_bare_base64};
    use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};

    // RFC 8032 section 7.1, test 1
    const SEED: [u8; 32] = [
        0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c,
        0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae,
        0x7f, 0x60,
    ];
    const PUBLIC: [u8; 32] = [
        0xd7, 0x5a, 0x98, 0x01, 0x82, 0xb1, 0x0a, 0xb7, 0xd5, 0x4b, 0xfe, 0xd3, 0xc9, 0x64, 0x07,
        0x3a, 0x0e, 0xe1, 0x72, 0xf3, 0xda, 0xa6, 0x23, 0x25, 0xaf, 0x02, 0x1a, 0x68, 0xf7, 0x07,
        0x51, 0x1a,
    ];

    fn okp_members(jwk: &JWK) -> (String, String, Option<String>) {
        let Params::OKP(params) = &jwk.params else {
            panic!("Expected OKP params");
        };
        (params.curve.clone(), params.x.clone(), params.d.clone())
    }

    #[test]
    fn pkcs8_layout() {
        let pkcs8 = encode_okp_pkcs8(OkpCurve::Ed25519, &SEED).unwrap();

        let prefix = [
            0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22,
            0x04, 0x20,
        ];
        assert_eq!(&pkcs8[..16], &prefix);
        assert_eq!(&pkcs8[16..], &SEED);
        assert_eq!(
            pkcs8.as_slice(),
            decode_bare_base64("MC4CAQAwBQYDK2VwBCIEIJ1hsZ3v/VpguoRK9JLsLMREScVpezJpGXA7rAMcrn9g")
                .unwrap()
                .as_slice()
        );
    }

    #[test]
    fn spki_layout() {
        let spki = encode_okp_spki(OkpCurve::Ed25519, &PUBLIC).unwrap();
        assert_eq!(
            spki,
            decode_bare_base64("MCowBQYDK2VwAyEA11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=")
                .unwrap()
        );
    }

    #[test]
    fn ed25519_public_key_is_derived() {
        let pkcs8 = encode_okp_pkcs8(OkpCurve::Ed25519, &SEED).unwrap();
        let jwk = parse_okp_pkcs8(&pkcs8).unwrap();

        let (curve, x, d) = okp_members(&jwk);
        assert_eq!(curve, "Ed25519");
        assert_eq!(x, BASE64_URL_SAFE_NO_PAD.encode(PUBLIC));
        assert_eq!(d.unwrap(), BASE64_URL_SAFE_NO_PAD.encode(SEED));
    }

    #[test]
    fn ed25519_public_key_must_match_seed() {
        let pkcs8 = encode_okp_private_key(OkpCurve::Ed25519, &SEED, Some(&PUBLIC)).unwrap();
        assert_eq!(pkcs8, encode_okp_pkcs8(OkpCurve::Ed25519, &SEED).unwrap());

        let short = encode_okp_private_key(OkpCurve::Ed25519, &SEED, Some(&[0x01]));
        assert!(matches!(short, Err(ConvertError::InvalidJwk { .. })));

        let other = encode_okp_private_key(OkpCurve::Ed25519, &SEED, Some(&[0; 32]));
        assert!(matches!(other, Err(ConvertError::InvalidJwk { .. })));
    }

    #[test]
    fn private_key_without_public_key() {
        let pkcs8 = encode_okp_private_key(OkpCurve::X448, &[0x11; 56], None).unwrap();
        assert_eq!(pkcs8, encode_okp_pkcs8(OkpCurve::X448, &[0x11; 56]).unwrap());

        let embedded =
            encode_okp_private_key(OkpCurve::X25519, &[0x11; 32], Some(&[0x22; 32])).unwrap();
        let jwk = parse_okp_pkcs8(&embedded).unwrap();
        assert_eq!(okp_members(&jwk).1, BASE64_URL_SAFE_NO_PAD.encode([0x22; 32]));
    }

    #[test]
    fn x25519_needs_embedded_public_key() {
        let pkcs8 = encode_okp_pkcs8(OkpCurve::X25519, &[0x42; 32]).unwrap();
        assert_eq!(
            parse_okp_pkcs8(&pkcs8).unwrap_err(),
            ConvertError::OkpPublicKeyMissing {
                curve: OkpCurve::X25519
            }
        );
    }

    fn one_asymmetric_key(curve: OkpCurve, private_key: &[u8], public_field: Vec<u8>) -> Vec<u8> {
        encode_sequence(&[
            &encode_integer(1),
            &okp_algorithm_identifier(curve),
            &encode_octet_string(&encode_octet_string(private_key)),
            &encode_tag(TAG_CONTEXT_0, &[]),
            &public_field,
        ])
    }

    #[test]
    fn embedded_public_key_explicit_and_implicit() {
        let public = [0x24; 32];

        let explicit = one_asymmetric_key(
            OkpCurve::X25519,
            &[0x42; 32],
            encode_tag(TAG_CONTEXT_1, &encode_bit_string(&public)),
        );
        let (_, x, _) = okp_members(&parse_okp_pkcs8(&explicit).unwrap());
        assert_eq!(x, BASE64_URL_SAFE_NO_PAD.encode(public));

        let mut implicit_value = vec![0x00];
        implicit_value.extend_from_slice(&public);
        let implicit = one_asymmetric_key(
            OkpCurve::X25519,
            &[0x42; 32],
            encode_tag(TAG_CONTEXT_1_PRIMITIVE, &implicit_value),
        );
        let (_, x, _) = okp_members(&parse_okp_pkcs8(&implicit).unwrap());
        assert_eq!(x, BASE64_URL_SAFE_NO_PAD.encode(public));
    }

    #[test]
    fn spki_round_trip_all_curves() {
        for curve in OkpCurve::ALL {
            let public = vec![0x5a; curve.key_length()];
            let spki = encode_okp_spki(curve, &public).unwrap();
            let (name, x, d) = okp_members(&parse_okp_spki(&spki).unwrap());

            assert_eq!(name, curve.jwk_name());
            assert_eq!(x, BASE64_URL_SAFE_NO_PAD.encode(&public));
            assert!(d.is_none());
        }
    }

    #[test]
    fn wrong_lengths() {
        assert_eq!(
            encode_okp_spki(OkpCurve::Ed448, &[0; 32]).unwrap_err().code(),
            "InvalidJwk"
        );
        assert_eq!(
            encode_okp_pkcs8(OkpCurve::X448, &[0; 57]).unwrap_err().code(),
            "InvalidJwk"
        );

        let mut spki = encode_okp_spki(OkpCurve::Ed25519, &PUBLIC).unwrap();
        // relabel as Ed448, whose keys are 57 bytes
        spki[8] = 0x71;
        assert_eq!(parse_okp_spki(&spki).unwrap_err().code(), "InvalidPem");
    }

    #[test]
    fn one_asymmetric_key_round_trip() {
        let d = [0x42u8; 56];
        let x = [0x17u8; 56];
        let der = encode_okp_pkcs8_with_public_key(OkpCurve::X448, &d, &x).unwrap();
        let (_, children) = read_root(&der).unwrap();
        assert_eq!(read_unsigned(&der, &children[0]).unwrap(), 1);
        assert_eq!(children[3].tag, TAG_CONTEXT_1_PRIMITIVE);
        let jwk = parse_okp_pkcs8(&der).unwrap();
        let (crv, jwk_x, jwk_d) = okp_members(&jwk);
        assert_eq!(crv, "X448");
        assert_eq!(jwk_x, BASE64_URL_SAFE_NO_PAD.encode(x));
        assert_eq!(jwk_d, Some(BASE64_URL_SAFE_NO_PAD.encode(d)));

        assert!(encode_okp_pkcs8_with_public_key(OkpCurve::X448, &d, &x[..32]).is_err());
    }

    #[test]
    fn single_wrapped_private_key_is_rejected() {
        let pkcs8 = encode_sequence(&[
            &encode_integer(0),
            &okp_algorithm_identifier(OkpCurve::Ed25519),
            &encode_octet_string(&SEED),
        ]);
        assert_eq!(parse_okp_pkcs8(&pkcs8).unwrap_err().code(), "InvalidPem");
    }

    #[test]
    fn non_okp_algorithm() {
        let algorithm = encode_sequence(&[&encode_tag(
            TAG_OID,
            affinidi_asn1::oid::RSA_ENCRYPTION_BYTES,
        )]);
        let spki = encode_sequence(&[&algorithm, &encode_bit_string(&[0; 4])]);
        assert_eq!(
            parse_okp_spki(&spki).unwrap_err(),
            ConvertError::UnsupportedAlgorithm {
                oid: "1.2.840.113549.1.1.1 (rsaEncryption)".into()
            }
        );
    }
}
