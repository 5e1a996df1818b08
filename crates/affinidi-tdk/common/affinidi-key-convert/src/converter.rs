//! JWK to PEM and PEM to JWK conversion
//!
//! OKP keys are built and parsed directly. RSA and EC keys go through the
//! configured [`CryptoProvider`].

use affinidi_asn1::{PemArmor, decode_bare_base64, encode_pem, find_pem_blocks};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::{
    ConversionWarning, ConvertError, JWK, JwkSet, KeyRequest, OutputType, ProviderError,
    config::ConverterConfig,
    container::{
        ContainerKind, KeyAlgorithm, build_pkcs8_from_pkcs1, build_pkcs8_from_sec1,
        build_spki_from_rsa_public_key, describe_oid, detect_der_key_type, parse_pkcs8_algorithm,
        parse_spki_algorithm,
    },
    error::Result,
    jwk::{PrivateKeyRequest, PublicKeyRequest},
    okp::{encode_okp_private_key, encode_okp_spki, parse_okp_pkcs8, parse_okp_spki},
    provider::{Algorithm, CryptoProvider, KeyData, KeyFormat, KeyKind, RustCryptoProvider},
};

const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Converted key(s) plus the blocks that were skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PemConversionResult {
    pub jwk: JwkOutput,
    pub warnings: Vec<ConversionWarning>,
}

/// A single JWK when one block converted, a JWK Set when several did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JwkOutput {
    Set(JwkSet),
    Key(JWK),
}

impl JwkOutput {
    /// All converted keys in block order
    pub fn keys(&self) -> Vec<&JWK> {
        match self {
            JwkOutput::Set(set) => set.keys.iter().collect(),
            JwkOutput::Key(jwk) => vec![jwk],
        }
    }

    pub fn into_keys(self) -> Vec<JWK> {
        match self {
            JwkOutput::Set(set) => set.keys,
            JwkOutput::Key(jwk) => vec![jwk],
        }
    }
}

/// Container a PEM label routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Spki,
    Pkcs8,
    RsaPrivate,
    RsaPublic,
    EcPrivate,
}

impl BlockKind {
    fn from_label(label: &str) -> Result<Self> {
        match label {
            PUBLIC_KEY_LABEL => Ok(BlockKind::Spki),
            PRIVATE_KEY_LABEL => Ok(BlockKind::Pkcs8),
            "RSA PRIVATE KEY" => Ok(BlockKind::RsaPrivate),
            "RSA PUBLIC KEY" => Ok(BlockKind::RsaPublic),
            "EC PRIVATE KEY" => Ok(BlockKind::EcPrivate),
            _ => Err(ConvertError::UnsupportedPemLabel {
                label: label.to_string(),
            }),
        }
    }
}

/// Converts keys between JWK and PEM
///
/// `provider` handles RSA and EC keys. Without one, only OKP keys convert.
pub struct KeyConverter<P: CryptoProvider = RustCryptoProvider> {
    config: ConverterConfig,
    provider: Option<P>,
}

impl Default for KeyConverter<RustCryptoProvider> {
    fn default() -> Self {
        KeyConverter::new(ConverterConfig::default(), Some(RustCryptoProvider))
    }
}

impl<P: CryptoProvider> KeyConverter<P> {
    pub fn new(config: ConverterConfig, provider: Option<P>) -> Self {
        KeyConverter { config, provider }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Converts a JWK or JWK Set in JSON text to PEM
    ///
    /// A JWK Set produces one PEM block per key, joined by the configured separator.
    pub fn jwk_to_pem(&self, input: &str, output: OutputType) -> Result<String> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| ConvertError::InvalidJson {
                reason: e.to_string(),
            })?;
        self.jwk_value_to_pem(&value, output)
    }

    /// Same as [`KeyConverter::jwk_to_pem`] for already parsed JSON
    pub fn jwk_value_to_pem(&self, value: &Value, output: OutputType) -> Result<String> {
        let Value::Object(object) = value else {
            return Err(ConvertError::invalid_jwk("JWK must be a JSON object"));
        };

        match object.get("keys") {
            None => self.key_to_pem(object, output),
            Some(Value::Array(keys)) if keys.is_empty() => {
                Err(ConvertError::invalid_jwk("JWK Set 'keys' is empty"))
            }
            Some(Value::Array(keys)) => {
                debug!("converting JWK Set of {} keys", keys.len());
                let blocks = keys
                    .iter()
                    .enumerate()
                    .map(|(index, key)| match key {
                        Value::Object(key) => self.key_to_pem(key, output),
                        _ => Err(ConvertError::invalid_jwk(format!(
                            "JWK Set member {index} is not an object"
                        ))),
                    })
                    .collect::<Result<Vec<String>>>()?;
                Ok(blocks.join(&self.config.jwk_set_separator))
            }
            Some(_) => Err(ConvertError::invalid_jwk("JWK Set 'keys' must be an array")),
        }
    }

    /// Converts a [`JWK`] to PEM
    pub fn convert_jwk(&self, jwk: &JWK, output: OutputType) -> Result<String> {
        let value = serde_json::to_value(jwk).map_err(|e| ConvertError::InvalidJwk {
            reason: e.to_string(),
        })?;
        self.jwk_value_to_pem(&value, output)
    }

    fn key_to_pem(&self, object: &Map<String, Value>, output: OutputType) -> Result<String> {
        let request = KeyRequest::from_json(object, output)?;
        debug!("writing {} key as {output} PEM", request.kty());

        let (label, der) = match &request {
            KeyRequest::Public(public) => (PUBLIC_KEY_LABEL, self.public_key_der(public)?),
            KeyRequest::Private(private) => (PRIVATE_KEY_LABEL, self.private_key_der(private)?),
        };

        Ok(encode_pem(
            label,
            &der,
            self.config.line_width,
            self.config.line_ending,
        ))
    }

    fn public_key_der(&self, request: &PublicKeyRequest) -> Result<Zeroizing<Vec<u8>>> {
        let (jwk, algorithm) = match request {
            PublicKeyRequest::Okp { curve, x } => {
                return Ok(Zeroizing::new(encode_okp_spki(*curve, x)?));
            }
            PublicKeyRequest::Rsa { n, e } => (JWK::rsa_public(n, e), Algorithm::RsaOaep),
            PublicKeyRequest::Ec { curve, x, y } => (
                JWK::ec(*curve, x, y, None),
                Algorithm::Ecdsa {
                    named_curve: *curve,
                },
            ),
        };

        let exported = self.provider_round_trip(
            KeyData::Jwk(jwk),
            KeyFormat::Jwk,
            algorithm,
            KeyKind::Public,
            KeyFormat::Spki,
        )?;
        expect_der(exported)
    }

    fn private_key_der(&self, request: &PrivateKeyRequest) -> Result<Zeroizing<Vec<u8>>> {
        let (jwk, algorithm) = match request {
            PrivateKeyRequest::Okp { curve, x, d } => {
                return encode_okp_private_key(*curve, d, x.as_deref());
            }
            PrivateKeyRequest::Rsa(members) => (members.to_jwk(), Algorithm::RsaOaep),
            PrivateKeyRequest::Ec { curve, x, y, d } => (
                JWK::ec(*curve, x, y, Some(d.as_slice())),
                Algorithm::Ecdsa {
                    named_curve: *curve,
                },
            ),
        };

        let exported = self.provider_round_trip(
            KeyData::Jwk(jwk),
            KeyFormat::Jwk,
            algorithm,
            KeyKind::Private,
            KeyFormat::Pkcs8,
        )?;
        expect_der(exported)
    }

    /// Converts PEM text, or bare base64 DER, to JWK
    ///
    /// With several PEM blocks, failing blocks become warnings and the call
    /// only fails when no block converts.
    pub fn pem_to_jwk(&self, input: &str) -> Result<PemConversionResult> {
        let input = input.trim();
        let blocks = find_pem_blocks(input);
        debug!("found {} PEM block(s)", blocks.len());

        match blocks.as_slice() {
            [] => self.bare_der_to_jwk(input).map(|jwk| PemConversionResult {
                jwk: JwkOutput::Key(jwk),
                warnings: Vec::new(),
            }),
            [armor] => self.armor_to_jwk(armor).map(|jwk| PemConversionResult {
                jwk: JwkOutput::Key(jwk),
                warnings: Vec::new(),
            }),
            _ => self.blocks_to_jwk(&blocks),
        }
    }

    fn blocks_to_jwk(&self, blocks: &[PemArmor<'_>]) -> Result<PemConversionResult> {
        let mut keys = Vec::with_capacity(blocks.len());
        let mut warnings = Vec::new();

        for (index, armor) in blocks.iter().enumerate() {
            match self.armor_to_jwk(armor) {
                Ok(jwk) => keys.push(jwk),
                Err(e) => {
                    warn!("PEM block {} ({}) skipped: {e}", index + 1, armor.label);
                    warnings.push(ConversionWarning::from_error(&e, index + 1));
                }
            }
        }

        let jwk = match keys.len() {
            0 => {
                return Err(ConvertError::InvalidPem {
                    reason: format!(
                        "none of the {} PEM blocks could be converted",
                        blocks.len()
                    ),
                    warnings,
                });
            }
            1 => JwkOutput::Key(keys.remove(0)),
            _ => JwkOutput::Set(JwkSet { keys }),
        };

        Ok(PemConversionResult { jwk, warnings })
    }

    fn armor_to_jwk(&self, armor: &PemArmor<'_>) -> Result<JWK> {
        let kind = BlockKind::from_label(armor.label)?;
        let block = armor.decode()?;
        debug!("converting '{}' block as {kind:?}", block.label);

        match kind {
            BlockKind::Spki => self.spki_to_jwk(&block.der),
            BlockKind::Pkcs8 => self.pkcs8_to_jwk(&block.der),
            BlockKind::RsaPublic => {
                let spki = build_spki_from_rsa_public_key(&block.der)?;
                self.spki_to_jwk(&spki)
            }
            BlockKind::RsaPrivate => {
                let pkcs8 = Zeroizing::new(build_pkcs8_from_pkcs1(&block.der)?);
                self.pkcs8_to_jwk(&pkcs8)
            }
            BlockKind::EcPrivate => {
                let pkcs8 = Zeroizing::new(build_pkcs8_from_sec1(&block.der)?);
                self.pkcs8_to_jwk(&pkcs8)
            }
        }
    }

    fn bare_der_to_jwk(&self, input: &str) -> Result<JWK> {
        if input.is_empty() {
            return Err(ConvertError::invalid_pem("input is empty"));
        }
        let der = Zeroizing::new(decode_bare_base64(input).map_err(|e| {
            ConvertError::invalid_pem(format!("no PEM block found and not base64 DER: {e}"))
        })?);

        match detect_der_key_type(&der) {
            ContainerKind::Spki => self.spki_to_jwk(&der),
            ContainerKind::Pkcs8 => self.pkcs8_to_jwk(&der),
            ContainerKind::Unknown => Err(ConvertError::invalid_pem(
                "DER is neither SubjectPublicKeyInfo nor PKCS#8",
            )),
        }
    }

    fn spki_to_jwk(&self, der: &[u8]) -> Result<JWK> {
        let algorithm = match parse_spki_algorithm(der)? {
            KeyAlgorithm::Okp(_) => return parse_okp_spki(der),
            KeyAlgorithm::Rsa => Algorithm::RsaOaep,
            KeyAlgorithm::Ec(curve) => Algorithm::Ecdsa { named_curve: curve },
            KeyAlgorithm::Unknown(oid) => {
                return Err(ConvertError::UnsupportedAlgorithm {
                    oid: describe_oid(&oid),
                });
            }
        };

        let exported = self.provider_round_trip(
            KeyData::Der(Zeroizing::new(der.to_vec())),
            KeyFormat::Spki,
            algorithm,
            KeyKind::Public,
            KeyFormat::Jwk,
        )?;
        expect_jwk(exported)
    }

    fn pkcs8_to_jwk(&self, der: &[u8]) -> Result<JWK> {
        let algorithm = match parse_pkcs8_algorithm(der)? {
            KeyAlgorithm::Okp(_) => return parse_okp_pkcs8(der),
            KeyAlgorithm::Rsa => Algorithm::RsaOaep,
            KeyAlgorithm::Ec(curve) => Algorithm::Ecdsa { named_curve: curve },
            KeyAlgorithm::Unknown(oid) => {
                return Err(ConvertError::UnsupportedAlgorithm {
                    oid: describe_oid(&oid),
                });
            }
        };

        let exported = self.provider_round_trip(
            KeyData::Der(Zeroizing::new(der.to_vec())),
            KeyFormat::Pkcs8,
            algorithm,
            KeyKind::Private,
            KeyFormat::Jwk,
        )?;
        expect_jwk(exported)
    }

    /// Imports `data` into the provider as an extractable key and exports it again
    fn provider_round_trip(
        &self,
        data: KeyData,
        import_format: KeyFormat,
        algorithm: Algorithm,
        kind: KeyKind,
        export_format: KeyFormat,
    ) -> Result<KeyData> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(ConvertError::WebCryptoUnavailable)?;

        debug!("provider {import_format} -> {export_format} for {algorithm}");
        let key = provider.import_key(
            import_format,
            data,
            &algorithm,
            true,
            algorithm.usages(kind),
        )?;
        Ok(provider.export_key(export_format, &key)?)
    }
}

fn expect_der(data: KeyData) -> Result<Zeroizing<Vec<u8>>> {
    match data {
        KeyData::Der(der) => Ok(der),
        KeyData::Jwk(_) => Err(ProviderError::Data(
            "provider returned a JWK, expected DER".to_string(),
        )
        .into()),
    }
}

fn expect_jwk(data: KeyData) -> Result<JWK> {
    match data {
        KeyData::Jwk(jwk) => Ok(jwk),
        KeyData::Der(_) => Err(ProviderError::Data(
            "provider returned DER, expected a JWK".to_string(),
        )
        .into()),
    }
}

/// Converts a JWK or JWK Set to PEM with the default configuration
pub fn jwk_to_pem(input: &str, output: OutputType) -> Result<String> {
    KeyConverter::default().jwk_to_pem(input, output)
}

/// Converts PEM text or bare base64 DER to JWK with the default configuration
pub fn pem_to_jwk(input: &str) -> Result<PemConversionResult> {
    KeyConverter::default().pem_to_jwk(input)
}
