// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Minimal DER helpers for the structures this crate builds or inspects.
//!
//! Full CMS encoding and decoding belong to the codec layer (see
//! [`crate::codec`]). The functions here only cover what the hash index,
//! attribute values, and time stamp requests need: building TLVs around
//! already-encoded content and walking the elements of a constructed value
//! while keeping their exact encodings.

use std::borrow::Cow;

use asn1_rs::{Any, Class, FromDer, Header, Length, Oid, Tag, ToDer};
use thiserror::Error;

pub mod attributes;
pub mod oids;

/// Describes errors that can occur while encoding or decoding DER values.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Asn1Error {
    /// The input is not valid DER.
    #[error("malformed DER value: {0}")]
    Malformed(String),

    /// A value with a different tag was expected.
    #[error("unexpected tag: expected {expected}, found {found}")]
    UnexpectedTag {
        /// Expected tag number
        expected: u32,

        /// Tag number found in the input
        found: u32,
    },

    /// The value could not be encoded.
    #[error("unable to encode DER value: {0}")]
    Encoding(String),

    /// The algorithm identified by this OID is not supported.
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
}

/// A single TLV parsed from a DER buffer.
///
/// `raw` is the complete encoding (header and content) exactly as it
/// appeared in the input.
#[derive(Clone, Debug)]
pub struct DerElement<'a> {
    /// Class of the element's tag
    pub class: Class,

    /// Tag number
    pub tag: Tag,

    /// True if the constructed bit is set
    pub constructed: bool,

    /// Complete encoding of the element
    pub raw: &'a [u8],

    /// Content octets of the element
    pub content: &'a [u8],
}

impl DerElement<'_> {
    /// Returns true if this is a universal element with the given tag.
    pub fn is_universal(&self, tag: Tag) -> bool {
        self.class == Class::Universal && self.tag == tag
    }

    /// Returns true if this is a context-specific element with tag `[n]`.
    pub fn is_context(&self, n: u32) -> bool {
        self.class == Class::ContextSpecific && self.tag == Tag(n)
    }

    fn expect_universal(&self, tag: Tag) -> Result<(), Asn1Error> {
        if self.is_universal(tag) {
            Ok(())
        } else {
            Err(Asn1Error::UnexpectedTag {
                expected: tag.0,
                found: self.tag.0,
            })
        }
    }
}

/// Parses one element from the start of `input`, returning the remaining
/// bytes.
pub fn parse_element(input: &[u8]) -> Result<(&[u8], DerElement<'_>), Asn1Error> {
    let (rem, any) = Any::from_der(input).map_err(|e| Asn1Error::Malformed(e.to_string()))?;

    let consumed = input.len() - rem.len();
    let raw = &input[..consumed];
    let content = &raw[consumed - any.data.len()..];

    Ok((
        rem,
        DerElement {
            class: any.header.class(),
            tag: any.header.tag(),
            constructed: any.header.is_constructed(),
            raw,
            content,
        },
    ))
}

/// Parses `input`, which must hold exactly one element.
pub fn parse_single(input: &[u8]) -> Result<DerElement<'_>, Asn1Error> {
    let (rem, element) = parse_element(input)?;
    if !rem.is_empty() {
        return Err(Asn1Error::Malformed(format!(
            "{} trailing bytes after value",
            rem.len()
        )));
    }
    Ok(element)
}

/// Splits concatenated DER elements (the content of a constructed value).
pub fn parse_elements(mut content: &[u8]) -> Result<Vec<DerElement<'_>>, Asn1Error> {
    let mut elements = Vec::new();
    while !content.is_empty() {
        let (rem, element) = parse_element(content)?;
        elements.push(element);
        content = rem;
    }
    Ok(elements)
}

/// Parses a `SEQUENCE` and returns its elements.
pub fn sequence_elements(der: &[u8]) -> Result<Vec<DerElement<'_>>, Asn1Error> {
    let sequence = parse_single(der)?;
    sequence.expect_universal(Tag::Sequence)?;
    parse_elements(sequence.content)
}

/// Parses a `SET` and returns its elements.
pub fn set_elements(der: &[u8]) -> Result<Vec<DerElement<'_>>, Asn1Error> {
    let set = parse_single(der)?;
    set.expect_universal(Tag::Set)?;
    parse_elements(set.content)
}

/// Wraps `content` in a TLV with the given class, form, and tag.
pub fn encode_tlv(
    class: Class,
    constructed: bool,
    tag: Tag,
    content: &[u8],
) -> Result<Vec<u8>, Asn1Error> {
    let header = Header::new(class, constructed, tag, Length::Definite(content.len()));
    Any::new(header, content)
        .to_der_vec()
        .map_err(|e| Asn1Error::Encoding(e.to_string()))
}

/// Encodes a `SEQUENCE` whose elements are already DER-encoded.
pub fn encode_sequence<T: AsRef<[u8]>>(elements: &[T]) -> Result<Vec<u8>, Asn1Error> {
    encode_tlv(Class::Universal, true, Tag::Sequence, &concat(elements))
}

/// Encodes a `SET OF` whose elements are already DER-encoded.
///
/// Elements are sorted by their encodings as DER requires.
pub fn encode_set_of<T: AsRef<[u8]>>(elements: &[T]) -> Result<Vec<u8>, Asn1Error> {
    let mut sorted: Vec<&[u8]> = elements.iter().map(|e| e.as_ref()).collect();
    sorted.sort();
    encode_tlv(Class::Universal, true, Tag::Set, &concat(&sorted))
}

/// Encodes an explicitly tagged, context-specific constructed value `[n]`.
pub fn encode_context<T: AsRef<[u8]>>(n: u32, elements: &[T]) -> Result<Vec<u8>, Asn1Error> {
    encode_tlv(Class::ContextSpecific, true, Tag(n), &concat(elements))
}

/// Encodes an `OCTET STRING`.
pub fn encode_octet_string(value: &[u8]) -> Result<Vec<u8>, Asn1Error> {
    encode_tlv(Class::Universal, false, Tag::OctetString, value)
}

/// Encodes an `OBJECT IDENTIFIER`.
pub fn encode_oid(oid: &Oid) -> Result<Vec<u8>, Asn1Error> {
    oid.to_der_vec()
        .map_err(|e| Asn1Error::Encoding(e.to_string()))
}

/// Encodes an `INTEGER` from its big-endian two's complement content octets.
pub fn encode_integer(content: &[u8]) -> Result<Vec<u8>, Asn1Error> {
    encode_tlv(Class::Universal, false, Tag::Integer, content)
}

/// Encodes a non-negative `INTEGER` from an unsigned value.
pub fn encode_unsigned(value: u64) -> Result<Vec<u8>, Asn1Error> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut content = Vec::with_capacity(9);
    if bytes[first] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[first..]);
    encode_integer(&content)
}

/// Decodes an `OBJECT IDENTIFIER`.
pub fn decode_oid(der: &[u8]) -> Result<Oid<'static>, Asn1Error> {
    let element = parse_single(der)?;
    oid_from_element(&element)
}

/// Decodes the content of an `OBJECT IDENTIFIER` element.
pub fn oid_from_element(element: &DerElement<'_>) -> Result<Oid<'static>, Asn1Error> {
    element.expect_universal(Tag::Oid)?;
    Ok(Oid::new(Cow::Owned(element.content.to_vec())))
}

/// Decodes an `OCTET STRING` element and returns its content.
pub fn octet_string_from_element<'a>(element: &DerElement<'a>) -> Result<&'a [u8], Asn1Error> {
    element.expect_universal(Tag::OctetString)?;
    Ok(element.content)
}

/// Returns the algorithm OID of a DER `AlgorithmIdentifier`.
///
/// Some producers write a bare OID where an `AlgorithmIdentifier` is
/// expected; that form is accepted too.
pub fn algorithm_identifier_oid(der: &[u8]) -> Result<Oid<'static>, Asn1Error> {
    let element = parse_single(der)?;
    if element.is_universal(Tag::Oid) {
        return oid_from_element(&element);
    }

    element.expect_universal(Tag::Sequence)?;
    let fields = parse_elements(element.content)?;
    let first = fields
        .first()
        .ok_or_else(|| Asn1Error::Malformed("empty AlgorithmIdentifier".to_string()))?;
    oid_from_element(first)
}

/// Replaces the implicit `[0]` tag of CMS signed attributes with the
/// universal `SET OF` tag, which is the form the signature is computed over.
pub fn signed_attributes_as_set(signed_attrs: &[u8]) -> Vec<u8> {
    let mut data = signed_attrs.to_vec();
    if let Some(first) = data.first_mut() {
        if *first == 0xa0 {
            *first = 0x31;
        }
    }
    data
}

fn concat<T: AsRef<[u8]>>(elements: &[T]) -> Vec<u8> {
    let mut content = Vec::with_capacity(elements.iter().map(|e| e.as_ref().len()).sum());
    for element in elements {
        content.extend_from_slice(element.as_ref());
    }
    content
}
