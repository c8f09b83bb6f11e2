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

//! Encodings of the validation-data attribute values and of revocation
//! objects embedded in `SignedData.crls`.

use asn1_rs::{Class, Oid, Tag};

use super::{
    encode_context, encode_oid, encode_sequence, encode_tlv, octet_string_from_element,
    oid_from_element, oids, parse_elements, parse_single, sequence_elements, Asn1Error,
};
use crate::container::RevocationKind;

/// Encodes a `certificate-values` attribute value
/// (`SEQUENCE OF Certificate`).
pub fn encode_certificate_values<T: AsRef<[u8]>>(certificates: &[T]) -> Result<Vec<u8>, Asn1Error> {
    encode_sequence(certificates)
}

/// Decodes a `certificate-values` attribute value.
pub fn decode_certificate_values(value: &[u8]) -> Result<Vec<Vec<u8>>, Asn1Error> {
    Ok(sequence_elements(value)?
        .into_iter()
        .map(|element| element.raw.to_vec())
        .collect())
}

/// Encodes a `revocation-values` attribute value:
///
/// ```text
/// RevocationValues ::= SEQUENCE {
///     crlVals  [0] SEQUENCE OF CertificateList OPTIONAL,
///     ocspVals [1] SEQUENCE OF BasicOCSPResponse OPTIONAL,
///     otherRevVals [2] OtherRevVals OPTIONAL }
/// ```
pub fn encode_revocation_values<T: AsRef<[u8]>>(
    crls: &[T],
    basic_ocsp_responses: &[T],
) -> Result<Vec<u8>, Asn1Error> {
    let mut fields = Vec::with_capacity(2);
    if !crls.is_empty() {
        fields.push(encode_context(0, &[encode_sequence(crls)?])?);
    }
    if !basic_ocsp_responses.is_empty() {
        fields.push(encode_context(1, &[encode_sequence(basic_ocsp_responses)?])?);
    }
    encode_sequence(&fields)
}

/// Decodes a `revocation-values` attribute value into its CRLs and basic
/// OCSP responses. Other revocation values are ignored.
pub fn decode_revocation_values(value: &[u8]) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>), Asn1Error> {
    let mut crls = Vec::new();
    let mut ocsps = Vec::new();

    for field in sequence_elements(value)? {
        let target = if field.is_context(0) {
            &mut crls
        } else if field.is_context(1) {
            &mut ocsps
        } else {
            continue;
        };

        let inner = parse_single(field.content)?;
        for element in parse_elements(inner.content)? {
            target.push(element.raw.to_vec());
        }
    }

    Ok((crls, ocsps))
}

/// Encodes `other [1] IMPLICIT OtherRevocationInfoFormat`.
pub fn other_revocation_info(format: &Oid, info: &[u8]) -> Result<Vec<u8>, Asn1Error> {
    let mut content = encode_oid(format)?;
    content.extend_from_slice(info);
    encode_tlv(Class::ContextSpecific, true, Tag(1), &content)
}

/// Classifies an encoded `RevocationInfoChoice` and returns the wrapped
/// revocation object.
pub fn decode_revocation_info_choice(
    encoded: &[u8],
) -> Result<(RevocationKind, Vec<u8>), Asn1Error> {
    let element = parse_single(encoded)?;

    if element.is_universal(Tag::Sequence) {
        return Ok((RevocationKind::Crl, encoded.to_vec()));
    }

    if !element.is_context(1) {
        return Err(Asn1Error::UnexpectedTag {
            expected: 1,
            found: element.tag.0,
        });
    }

    let fields = parse_elements(element.content)?;
    let (Some(format), Some(info)) = (fields.first(), fields.get(1)) else {
        return Err(Asn1Error::Malformed(
            "incomplete OtherRevocationInfoFormat".to_string(),
        ));
    };

    let format = oid_from_element(format)?;
    let kind = if format == oids::ID_RI_OCSP_RESPONSE_OID {
        RevocationKind::OcspResponse
    } else if format == oids::ID_PKIX_OCSP_BASIC_OID {
        RevocationKind::BasicOcspResponse
    } else {
        return Err(Asn1Error::UnsupportedAlgorithm(format.to_id_string()));
    };

    Ok((kind, info.raw.to_vec()))
}

/// Extracts the `BasicOCSPResponse` from an `OCSPResponse`:
///
/// ```text
/// OCSPResponse ::= SEQUENCE {
///     responseStatus OCSPResponseStatus,
///     responseBytes  [0] EXPLICIT ResponseBytes OPTIONAL }
///
/// ResponseBytes ::= SEQUENCE {
///     responseType OBJECT IDENTIFIER,
///     response     OCTET STRING }
/// ```
pub fn basic_ocsp_response(ocsp_response: &[u8]) -> Result<Vec<u8>, Asn1Error> {
    let fields = sequence_elements(ocsp_response)?;

    let response_bytes = fields
        .iter()
        .find(|field| field.is_context(0))
        .ok_or_else(|| Asn1Error::Malformed("OCSP response has no responseBytes".to_string()))?;

    let response_bytes = sequence_elements(response_bytes.content)?;
    let (Some(response_type), Some(response)) = (response_bytes.first(), response_bytes.get(1))
    else {
        return Err(Asn1Error::Malformed("incomplete ResponseBytes".to_string()));
    };

    let response_type = oid_from_element(response_type)?;
    if response_type != oids::ID_PKIX_OCSP_BASIC_OID {
        return Err(Asn1Error::UnsupportedAlgorithm(response_type.to_id_string()));
    }

    Ok(octet_string_from_element(response)?.to_vec())
}
