//! ASN.1 DER, OID and PEM encoding utilities for Affinidi TDK
//!
//! This crate provides the encoding primitives used for key conversion:
//! - DER tag-length-value parsing and encoding over borrowed buffers
//! - Object identifier encoding/decoding and the RSA/EC/OKP registry
//! - PEM armour scanning and writing, and bare base64 DER decoding

pub mod der;
pub mod oid;
pub mod pem;

pub use der::{
    Element, TAG_BIT_STRING, TAG_CONTEXT_0, TAG_CONTEXT_1, TAG_CONTEXT_1_PRIMITIVE, TAG_INTEGER,
    TAG_NULL, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE, bit_string_payload, encode_bit_string,
    encode_integer, encode_length, encode_null, encode_octet_string, encode_oid_element,
    encode_sequence, encode_tag, read_children, read_element, read_root, read_unsigned,
};
pub use oid::{AlgorithmOid, EcCurve, OkpCurve, decode_oid, encode_oid};
pub use pem::{LineEnding, PemArmor, PemBlock, decode_bare_base64, encode_pem, find_pem_blocks};

mod error;
pub use error::{Asn1Error, Result};
