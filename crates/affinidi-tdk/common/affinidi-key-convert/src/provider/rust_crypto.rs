//! [`CryptoProvider`] backed by the RustCrypto `rsa`, `p256`, `p384` and
//! `p521` crates

use std::fmt;

use affinidi_asn1::EcCurve;
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    traits::{PrivateKeyParts, PublicKeyParts},
};
use tracing::debug;
use zeroize::Zeroizing;

use super::{Algorithm, CryptoProvider, KeyData, KeyFormat, KeyKind, KeyUsage};
use crate::{JWK, Params, ProviderError, RSAParams};

/// Default provider for RSA and EC keys
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoProvider;

/// Imported key handle
pub struct CryptoKey {
    algorithm: Algorithm,
    extractable: bool,
    usages: Vec<KeyUsage>,
    material: KeyMaterial,
}

enum KeyMaterial {
    RsaPublic(RsaPublicKey),
    RsaPrivate(RsaPrivateKey),
    EcPublic(EcPublicKey),
    EcPrivate(EcSecretKey),
}

enum EcPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

enum EcSecretKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl CryptoKey {
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    pub fn kind(&self) -> KeyKind {
        match self.material {
            KeyMaterial::RsaPublic(_) | KeyMaterial::EcPublic(_) => KeyKind::Public,
            KeyMaterial::RsaPrivate(_) | KeyMaterial::EcPrivate(_) => KeyKind::Private,
        }
    }

    pub fn extractable(&self) -> bool {
        self.extractable
    }

    pub fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }
}

impl fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoKey")
            .field("algorithm", &self.algorithm)
            .field("kind", &self.kind())
            .field("extractable", &self.extractable)
            .field("usages", &self.usages)
            .finish()
    }
}

impl CryptoProvider for RustCryptoProvider {
    type Key = CryptoKey;

    fn import_key(
        &self,
        format: KeyFormat,
        data: KeyData,
        algorithm: &Algorithm,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> Result<CryptoKey, ProviderError> {
        let kind = match (&format, &data) {
            (KeyFormat::Spki, KeyData::Der(_)) => KeyKind::Public,
            (KeyFormat::Pkcs8, KeyData::Der(_)) => KeyKind::Private,
            (KeyFormat::Jwk, KeyData::Jwk(jwk)) if jwk.is_private() => KeyKind::Private,
            (KeyFormat::Jwk, KeyData::Jwk(_)) => KeyKind::Public,
            _ => {
                return Err(ProviderError::Syntax(format!(
                    "key data doesn't match the '{format}' format"
                )));
            }
        };
        check_usages(algorithm, kind, usages)?;
        debug!("importing {kind:?} {algorithm} key from {format}");

        let material = match (algorithm, data) {
            (Algorithm::RsaOaep, KeyData::Der(der)) => match kind {
                KeyKind::Public => RsaPublicKey::from_public_key_der(&der)
                    .map(KeyMaterial::RsaPublic)
                    .map_err(|e| ProviderError::Data(format!("RSA SPKI: {e}")))?,
                KeyKind::Private => RsaPrivateKey::from_pkcs8_der(&der)
                    .map(KeyMaterial::RsaPrivate)
                    .map_err(|e| ProviderError::Data(format!("RSA PKCS#8: {e}")))?,
            },
            (Algorithm::RsaOaep, KeyData::Jwk(jwk)) => rsa_from_jwk(&jwk)?,
            (Algorithm::Ecdsa { named_curve }, KeyData::Der(der)) => match kind {
                KeyKind::Public => KeyMaterial::EcPublic(ec_public_from_der(*named_curve, &der)?),
                KeyKind::Private => KeyMaterial::EcPrivate(ec_secret_from_der(*named_curve, &der)?),
            },
            (Algorithm::Ecdsa { named_curve }, KeyData::Jwk(jwk)) => {
                ec_from_jwk(*named_curve, &jwk)?
            }
        };

        Ok(CryptoKey {
            algorithm: *algorithm,
            extractable,
            usages: usages.to_vec(),
            material,
        })
    }

    fn export_key(&self, format: KeyFormat, key: &CryptoKey) -> Result<KeyData, ProviderError> {
        if !key.extractable {
            return Err(ProviderError::InvalidAccess(
                "key is not extractable".to_string(),
            ));
        }
        debug!("exporting {:?} {} key to {format}", key.kind(), key.algorithm);

        match (format, &key.material) {
            (KeyFormat::Jwk, KeyMaterial::RsaPublic(public)) => {
                Ok(KeyData::Jwk(rsa_public_jwk(public)))
            }
            (KeyFormat::Jwk, KeyMaterial::RsaPrivate(private)) => {
                rsa_private_jwk(private).map(KeyData::Jwk)
            }
            (KeyFormat::Jwk, KeyMaterial::EcPublic(public)) => {
                ec_public_jwk(public).map(KeyData::Jwk)
            }
            (KeyFormat::Jwk, KeyMaterial::EcPrivate(secret)) => {
                ec_private_jwk(secret).map(KeyData::Jwk)
            }

            (KeyFormat::Spki, KeyMaterial::RsaPublic(public)) => public
                .to_public_key_der()
                .map(|document| KeyData::Der(Zeroizing::new(document.into_vec())))
                .map_err(|e| ProviderError::Data(format!("RSA SPKI: {e}"))),
            (KeyFormat::Spki, KeyMaterial::EcPublic(public)) => ec_public_der(public),

            (KeyFormat::Pkcs8, KeyMaterial::RsaPrivate(private)) => private
                .to_pkcs8_der()
                .map(|document| KeyData::Der(document.to_bytes()))
                .map_err(|e| ProviderError::Data(format!("RSA PKCS#8: {e}"))),
            (KeyFormat::Pkcs8, KeyMaterial::EcPrivate(secret)) => ec_secret_der(secret),

            (KeyFormat::Spki, _) => Err(ProviderError::InvalidAccess(
                "only public keys can be exported as spki".to_string(),
            )),
            (KeyFormat::Pkcs8, _) => Err(ProviderError::InvalidAccess(
                "only private keys can be exported as pkcs8".to_string(),
            )),
        }
    }
}

/// Usages must be allowed for the algorithm and key kind, and a private key
/// needs at least one
fn check_usages(
    algorithm: &Algorithm,
    kind: KeyKind,
    usages: &[KeyUsage],
) -> Result<(), ProviderError> {
    let allowed = algorithm.usages(kind);
    if let Some(usage) = usages.iter().find(|usage| !allowed.contains(usage)) {
        return Err(ProviderError::Syntax(format!(
            "usage {usage:?} is not valid for a {kind:?} {algorithm} key"
        )));
    }
    if kind == KeyKind::Private && usages.is_empty() {
        return Err(ProviderError::Syntax(
            "usages can't be empty for a private key".to_string(),
        ));
    }
    Ok(())
}

// ****************************************************************************
// RSA
// ****************************************************************************

fn decode_uint(name: &str, value: &str) -> Result<BigUint, ProviderError> {
    let bytes = Zeroizing::new(
        BASE64_URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| ProviderError::Data(format!("member '{name}': {e}")))?,
    );
    Ok(BigUint::from_bytes_be(&bytes))
}

fn encode_uint(value: &BigUint) -> String {
    let bytes = Zeroizing::new(value.to_bytes_be());
    BASE64_URL_SAFE_NO_PAD.encode(&bytes)
}

fn rsa_from_jwk(jwk: &JWK) -> Result<KeyMaterial, ProviderError> {
    let Params::RSA(params) = &jwk.params else {
        return Err(ProviderError::Data(format!(
            "expected an RSA JWK, got kty '{}'",
            jwk.kty()
        )));
    };

    let n = decode_uint("n", &params.n)?;
    let e = decode_uint("e", &params.e)?;

    let Some(d) = &params.d else {
        return RsaPublicKey::new(n, e)
            .map(KeyMaterial::RsaPublic)
            .map_err(|e| ProviderError::Data(format!("RSA public key: {e}")));
    };
    let (Some(p), Some(q)) = (&params.p, &params.q) else {
        return Err(ProviderError::Data(
            "RSA private JWK must include the primes p and q".to_string(),
        ));
    };

    let primes = vec![decode_uint("p", p)?, decode_uint("q", q)?];
    RsaPrivateKey::from_components(n, e, decode_uint("d", d)?, primes)
        .map(KeyMaterial::RsaPrivate)
        .map_err(|e| ProviderError::Data(format!("RSA private key: {e}")))
}

fn rsa_public_jwk(public: &RsaPublicKey) -> JWK {
    JWK {
        key_id: None,
        params: Params::RSA(RSAParams {
            n: encode_uint(public.n()),
            e: encode_uint(public.e()),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        }),
    }
}

fn rsa_private_jwk(private: &RsaPrivateKey) -> Result<JWK, ProviderError> {
    let [p, q] = private.primes() else {
        return Err(ProviderError::NotSupported(format!(
            "RSA keys with {} primes can't be exported",
            private.primes().len()
        )));
    };
    let crt = |value: Option<&BigUint>, name: &str| {
        value
            .map(encode_uint)
            .ok_or_else(|| ProviderError::Data(format!("RSA key has no CRT value {name}")))
    };

    Ok(JWK {
        key_id: None,
        params: Params::RSA(RSAParams {
            n: encode_uint(private.n()),
            e: encode_uint(private.e()),
            d: Some(encode_uint(private.d())),
            p: Some(encode_uint(p)),
            q: Some(encode_uint(q)),
            dp: Some(crt(private.dp(), "dp")?),
            dq: Some(crt(private.dq(), "dq")?),
            qi: Some(crt(private.crt_coefficient().as_ref(), "qi")?),
        }),
    })
}

// ****************************************************************************
// EC
// ****************************************************************************

fn ec_public_from_der(curve: EcCurve, der: &[u8]) -> Result<EcPublicKey, ProviderError> {
    let data_error = |e: String| ProviderError::Data(format!("{curve} SPKI: {e}"));
    match curve {
        EcCurve::P256 => p256::PublicKey::from_public_key_der(der)
            .map(EcPublicKey::P256)
            .map_err(|e| data_error(e.to_string())),
        EcCurve::P384 => p384::PublicKey::from_public_key_der(der)
            .map(EcPublicKey::P384)
            .map_err(|e| data_error(e.to_string())),
        EcCurve::P521 => p521::PublicKey::from_public_key_der(der)
            .map(EcPublicKey::P521)
            .map_err(|e| data_error(e.to_string())),
    }
}

fn ec_secret_from_der(curve: EcCurve, der: &[u8]) -> Result<EcSecretKey, ProviderError> {
    let data_error = |e: String| ProviderError::Data(format!("{curve} PKCS#8: {e}"));
    match curve {
        EcCurve::P256 => p256::SecretKey::from_pkcs8_der(der)
            .map(EcSecretKey::P256)
            .map_err(|e| data_error(e.to_string())),
        EcCurve::P384 => p384::SecretKey::from_pkcs8_der(der)
            .map(EcSecretKey::P384)
            .map_err(|e| data_error(e.to_string())),
        EcCurve::P521 => p521::SecretKey::from_pkcs8_der(der)
            .map(EcSecretKey::P521)
            .map_err(|e| data_error(e.to_string())),
    }
}

/// Imports through the curve crates' own JWK parsing, which also checks that
/// a private `d` matches `x` and `y`
fn ec_from_jwk(curve: EcCurve, jwk: &JWK) -> Result<KeyMaterial, ProviderError> {
    let Params::EC(params) = &jwk.params else {
        return Err(ProviderError::Data(format!(
            "expected an EC JWK, got kty '{}'",
            jwk.kty()
        )));
    };
    if params.curve != curve.jwk_name() {
        return Err(ProviderError::Data(format!(
            "JWK curve '{}' doesn't match the algorithm's {curve}",
            params.curve
        )));
    }

    let json = Zeroizing::new(
        serde_json::to_string(jwk).map_err(|e| ProviderError::Data(e.to_string()))?,
    );
    let data_error = |e: String| ProviderError::Data(format!("{curve} JWK: {e}"));

    if params.d.is_some() {
        let secret = match curve {
            EcCurve::P256 => p256::SecretKey::from_jwk_str(&json).map(EcSecretKey::P256),
            EcCurve::P384 => p384::SecretKey::from_jwk_str(&json).map(EcSecretKey::P384),
            EcCurve::P521 => p521::SecretKey::from_jwk_str(&json).map(EcSecretKey::P521),
        }
        .map_err(|e| data_error(e.to_string()))?;
        Ok(KeyMaterial::EcPrivate(secret))
    } else {
        let public = match curve {
            EcCurve::P256 => p256::PublicKey::from_jwk_str(&json).map(EcPublicKey::P256),
            EcCurve::P384 => p384::PublicKey::from_jwk_str(&json).map(EcPublicKey::P384),
            EcCurve::P521 => p521::PublicKey::from_jwk_str(&json).map(EcPublicKey::P521),
        }
        .map_err(|e| data_error(e.to_string()))?;
        Ok(KeyMaterial::EcPublic(public))
    }
}

fn parse_jwk(json: &str) -> Result<JWK, ProviderError> {
    serde_json::from_str(json).map_err(|e| ProviderError::Data(format!("exported JWK: {e}")))
}

fn ec_public_jwk(public: &EcPublicKey) -> Result<JWK, ProviderError> {
    let json = match public {
        EcPublicKey::P256(key) => key.to_jwk_string(),
        EcPublicKey::P384(key) => key.to_jwk_string(),
        EcPublicKey::P521(key) => key.to_jwk_string(),
    };
    parse_jwk(&json)
}

fn ec_private_jwk(secret: &EcSecretKey) -> Result<JWK, ProviderError> {
    let json = match secret {
        EcSecretKey::P256(key) => key.to_jwk_string(),
        EcSecretKey::P384(key) => key.to_jwk_string(),
        EcSecretKey::P521(key) => key.to_jwk_string(),
    };
    parse_jwk(&json)
}

fn ec_public_der(public: &EcPublicKey) -> Result<KeyData, ProviderError> {
    match public {
        EcPublicKey::P256(key) => key.to_public_key_der(),
        EcPublicKey::P384(key) => key.to_public_key_der(),
        EcPublicKey::P521(key) => key.to_public_key_der(),
    }
    .map(|document| KeyData::Der(Zeroizing::new(document.into_vec())))
    .map_err(|e| ProviderError::Data(format!("EC SPKI: {e}")))
}

fn ec_secret_der(secret: &EcSecretKey) -> Result<KeyData, ProviderError> {
    match secret {
        EcSecretKey::P256(key) => key.to_pkcs8_der(),
        EcSecretKey::P384(key) => key.to_pkcs8_der(),
        EcSecretKey::P521(key) => key.to_pkcs8_der(),
    }
    .map(|document| KeyData::Der(document.to_bytes()))
    .map_err(|e| ProviderError::Data(format!("EC PKCS#8: {e}")))
}
