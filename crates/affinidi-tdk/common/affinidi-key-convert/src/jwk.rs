//! JWK (JSON Web Key) types per RFC 7517 and RFC 7518
//!
//! [`JWK`] is the wire shape. [`KeyRequest`] is a JWK that has been checked
//! for the members a conversion direction needs, with every member already
//! base64url decoded.

use std::{fmt, str::FromStr};

use affinidi_asn1::{EcCurve, OkpCurve};
use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    prelude::BASE64_URL_SAFE_NO_PAD,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{ConvertError, error::Result};

/// base64url decoding that accepts members with or without padding
const BASE64_URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// RFC 7517 JWK Struct
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct JWK {
    #[serde(rename = "kid")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(flatten)]
    pub params: Params,
}

impl JWK {
    /// `kty` value of this key
    pub fn kty(&self) -> &'static str {
        match &self.params {
            Params::RSA(_) => "RSA",
            Params::EC(_) => "EC",
            Params::OKP(_) => "OKP",
        }
    }

    /// True when the key carries the private member `d`
    pub fn is_private(&self) -> bool {
        match &self.params {
            Params::RSA(params) => params.d.is_some(),
            Params::EC(params) => params.d.is_some(),
            Params::OKP(params) => params.d.is_some(),
        }
    }

    /// Builds an RSA public JWK from the raw modulus and exponent
    pub fn rsa_public(n: &[u8], e: &[u8]) -> Self {
        JWK {
            key_id: None,
            params: Params::RSA(RSAParams {
                n: encode_member(n),
                e: encode_member(e),
                d: None,
                p: None,
                q: None,
                dp: None,
                dq: None,
                qi: None,
            }),
        }
    }

    /// Builds an EC JWK from raw coordinates and optional private scalar
    pub fn ec(curve: EcCurve, x: &[u8], y: &[u8], d: Option<&[u8]>) -> Self {
        JWK {
            key_id: None,
            params: Params::EC(ECParams {
                curve: curve.jwk_name().to_string(),
                x: encode_member(x),
                y: encode_member(y),
                d: d.map(encode_member),
            }),
        }
    }

    /// Builds an OKP JWK from raw key bytes
    pub fn okp(curve: OkpCurve, x: &[u8], d: Option<&[u8]>) -> Self {
        JWK {
            key_id: None,
            params: Params::OKP(OKPParams {
                curve: curve.jwk_name().to_string(),
                x: encode_member(x),
                d: d.map(encode_member),
            }),
        }
    }
}

/// JWK Key Types and associated Parameters
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
#[serde(tag = "kty")]
pub enum Params {
    RSA(RSAParams),
    EC(ECParams),
    OKP(OKPParams),
}

/// RSA parameters, the CRT members are only present on private keys
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct RSAParams {
    pub n: String,
    pub e: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

/// Elliptic Curve parameters (P-256, P-384, P-521)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct ECParams {
    #[serde(rename = "crv")]
    pub curve: String,
    pub x: String,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// Octet Key Pair parameters (Ed25519, Ed448, X25519, X448)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct OKPParams {
    #[serde(rename = "crv")]
    pub curve: String,
    pub x: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// RFC 7517 JWK Set
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JwkSet {
    pub keys: Vec<JWK>,
}

/// Encodes a JWK member as base64url without padding
pub fn encode_member(bytes: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a JWK member, padded or not
pub fn decode_member(name: &str, value: &str) -> Result<Vec<u8>> {
    let bytes = BASE64_URL_LENIENT.decode(value).map_err(|e| {
        ConvertError::invalid_jwk(format!("member '{name}' is not valid base64url: {e}"))
    })?;
    if bytes.is_empty() {
        return Err(ConvertError::invalid_jwk(format!(
            "member '{name}' is empty"
        )));
    }
    Ok(bytes)
}

/// Which half of a key pair `jwk_to_pem` writes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Public,
    Private,
}

impl FromStr for OutputType {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "public" => Ok(OutputType::Public),
            "private" => Ok(OutputType::Private),
            other => Err(ConvertError::invalid_jwk(format!(
                "output type must be 'public' or 'private', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputType::Public => write!(f, "public"),
            OutputType::Private => write!(f, "private"),
        }
    }
}

/// A JWK validated for one conversion direction
#[derive(Debug)]
pub enum KeyRequest {
    Public(PublicKeyRequest),
    Private(PrivateKeyRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyRequest {
    Rsa {
        n: Vec<u8>,
        e: Vec<u8>,
    },
    Ec {
        curve: EcCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    Okp {
        curve: OkpCurve,
        x: Vec<u8>,
    },
}

#[derive(Debug)]
pub enum PrivateKeyRequest {
    Rsa(RsaPrivateMembers),
    Ec {
        curve: EcCurve,
        x: Vec<u8>,
        y: Vec<u8>,
        d: Zeroizing<Vec<u8>>,
    },
    /// `x` is optional, only `d` is needed to write PKCS#8
    Okp {
        curve: OkpCurve,
        x: Option<Vec<u8>>,
        d: Zeroizing<Vec<u8>>,
    },
}

/// RSA private members, CRT members as supplied
#[derive(Debug)]
pub struct RsaPrivateMembers {
    pub n: Vec<u8>,
    pub e: Vec<u8>,
    pub d: Zeroizing<Vec<u8>>,
    pub p: Option<Zeroizing<Vec<u8>>>,
    pub q: Option<Zeroizing<Vec<u8>>>,
    pub dp: Option<Zeroizing<Vec<u8>>>,
    pub dq: Option<Zeroizing<Vec<u8>>>,
    pub qi: Option<Zeroizing<Vec<u8>>>,
}

impl KeyRequest {
    /// Checks a JSON object for the members `output` requires
    ///
    /// Presence is checked before any member is decoded, so a key missing
    /// `d` reports `MissingPrivateKey` even when other members are malformed.
    pub fn from_json(object: &Map<String, Value>, output: OutputType) -> Result<Self> {
        let kty = match object.get("kty") {
            None | Some(Value::Null) => {
                return Err(ConvertError::MissingField {
                    field: "kty".to_string(),
                });
            }
            Some(Value::String(kty)) => kty.as_str(),
            Some(_) => return Err(ConvertError::invalid_jwk("member 'kty' must be a string")),
        };

        match kty {
            "RSA" => rsa_request(object, output),
            "EC" => ec_request(object, output),
            "OKP" => okp_request(object, output),
            other => Err(ConvertError::UnsupportedKty {
                kty: other.to_string(),
            }),
        }
    }

    /// The `kty` this request was built from
    pub fn kty(&self) -> &'static str {
        match self {
            KeyRequest::Public(PublicKeyRequest::Rsa { .. })
            | KeyRequest::Private(PrivateKeyRequest::Rsa(_)) => "RSA",
            KeyRequest::Public(PublicKeyRequest::Ec { .. })
            | KeyRequest::Private(PrivateKeyRequest::Ec { .. }) => "EC",
            KeyRequest::Public(PublicKeyRequest::Okp { .. })
            | KeyRequest::Private(PrivateKeyRequest::Okp { .. }) => "OKP",
        }
    }
}

impl RsaPrivateMembers {
    /// Canonical JWK for a crypto provider, members re-encoded without padding
    pub fn to_jwk(&self) -> JWK {
        let encode = |member: &Option<Zeroizing<Vec<u8>>>| {
            member.as_ref().map(|m| encode_member(m))
        };
        JWK {
            key_id: None,
            params: Params::RSA(RSAParams {
                n: encode_member(&self.n),
                e: encode_member(&self.e),
                d: Some(encode_member(&self.d)),
                p: encode(&self.p),
                q: encode(&self.q),
                dp: encode(&self.dp),
                dq: encode(&self.dq),
                qi: encode(&self.qi),
            }),
        }
    }
}

/// A string member; absent, `null` and `""` all read as missing
fn member<'a>(object: &'a Map<String, Value>, name: &str) -> Result<Option<&'a str>> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(ConvertError::invalid_jwk(format!(
            "member '{name}' must be a string"
        ))),
    }
}

fn decode_secret(name: &str, value: &str) -> Result<Zeroizing<Vec<u8>>> {
    decode_member(name, value).map(Zeroizing::new)
}

fn decode_optional_secret(name: &str, value: Option<&str>) -> Result<Option<Zeroizing<Vec<u8>>>> {
    value.map(|value| decode_secret(name, value)).transpose()
}

fn rsa_request(object: &Map<String, Value>, output: OutputType) -> Result<KeyRequest> {
    let missing = |field: &str| ConvertError::MissingField {
        field: field.to_string(),
    };
    let n = member(object, "n")?.ok_or_else(|| missing("n"))?;
    let e = member(object, "e")?.ok_or_else(|| missing("e"))?;

    match output {
        OutputType::Public => Ok(KeyRequest::Public(PublicKeyRequest::Rsa {
            n: decode_member("n", n)?,
            e: decode_member("e", e)?,
        })),
        OutputType::Private => {
            let d = member(object, "d")?.ok_or_else(|| ConvertError::MissingPrivateKey {
                kty: "RSA".to_string(),
                field: "d".to_string(),
            })?;
            Ok(KeyRequest::Private(PrivateKeyRequest::Rsa(RsaPrivateMembers {
                n: decode_member("n", n)?,
                e: decode_member("e", e)?,
                d: decode_secret("d", d)?,
                p: decode_optional_secret("p", member(object, "p")?)?,
                q: decode_optional_secret("q", member(object, "q")?)?,
                dp: decode_optional_secret("dp", member(object, "dp")?)?,
                dq: decode_optional_secret("dq", member(object, "dq")?)?,
                qi: decode_optional_secret("qi", member(object, "qi")?)?,
            })))
        }
    }
}

fn ec_request(object: &Map<String, Value>, output: OutputType) -> Result<KeyRequest> {
    let crv = member(object, "crv")?.ok_or_else(|| ConvertError::MissingField {
        field: "crv".to_string(),
    })?;
    let curve = EcCurve::from_jwk_name(crv).ok_or_else(|| ConvertError::UnsupportedCurve {
        curve: crv.to_string(),
    })?;

    let missing_public = |field: &str| ConvertError::MissingPublicKey {
        kty: "EC".to_string(),
        field: field.to_string(),
    };
    let x = member(object, "x")?.ok_or_else(|| missing_public("x"))?;
    let y = member(object, "y")?.ok_or_else(|| missing_public("y"))?;

    let d = match output {
        OutputType::Public => None,
        OutputType::Private => Some(member(object, "d")?.ok_or_else(|| {
            ConvertError::MissingPrivateKey {
                kty: "EC".to_string(),
                field: "d".to_string(),
            }
        })?),
    };

    let x = decode_member("x", x)?;
    let y = decode_member("y", y)?;
    check_coordinates(curve, &x, &y)?;

    match d {
        None => Ok(KeyRequest::Public(PublicKeyRequest::Ec { curve, x, y })),
        Some(d) => Ok(KeyRequest::Private(PrivateKeyRequest::Ec {
            curve,
            x,
            y,
            d: decode_secret("d", d)?,
        })),
    }
}

fn check_coordinates(curve: EcCurve, x: &[u8], y: &[u8]) -> Result<()> {
    let size = curve.field_size();
    if x.len() != size || y.len() != size {
        return Err(ConvertError::invalid_jwk(format!(
            "{curve} coordinates must be {size} bytes, got x={} y={}",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

fn okp_request(object: &Map<String, Value>, output: OutputType) -> Result<KeyRequest> {
    let crv = member(object, "crv")?.ok_or_else(|| ConvertError::MissingField {
        field: "crv".to_string(),
    })?;
    let curve = OkpCurve::from_jwk_name(crv).ok_or_else(|| ConvertError::UnsupportedCurve {
        curve: crv.to_string(),
    })?;

    match output {
        OutputType::Public => {
            let x = member(object, "x")?.ok_or_else(|| ConvertError::MissingPublicKey {
                kty: "OKP".to_string(),
                field: "x".to_string(),
            })?;
            Ok(KeyRequest::Public(PublicKeyRequest::Okp {
                curve,
                x: decode_member("x", x)?,
            }))
        }
        OutputType::Private => {
            let d = member(object, "d")?.ok_or_else(|| ConvertError::MissingPrivateKey {
                kty: "OKP".to_string(),
                field: "d".to_string(),
            })?;
            Ok(KeyRequest::Private(PrivateKeyRequest::Okp {
                curve,
                x: member(object, "x")?
                    .map(|x| decode_member("x", x))
                    .transpose()?,
                d: decode_secret("d", d)?,
            }))
        }
    }
}
