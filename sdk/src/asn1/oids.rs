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

//! Object identifiers used by CAdES, CMS, and the supported signature
//! algorithms.

use asn1_rs::{oid, Oid};

// -- digest algorithms --

/// SHA-1
pub const SHA1_OID: Oid<'static> = oid!(1.3.14 .3 .2 .26);
/// SHA-256
pub const SHA256_OID: Oid<'static> = oid!(2.16.840 .1 .101 .3 .4 .2 .1);
/// SHA-384
pub const SHA384_OID: Oid<'static> = oid!(2.16.840 .1 .101 .3 .4 .2 .2);
/// SHA-512
pub const SHA512_OID: Oid<'static> = oid!(2.16.840 .1 .101 .3 .4 .2 .3);

// -- signature algorithms --

/// rsaEncryption
pub const RSA_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .1);
/// sha256WithRSAEncryption
pub const SHA256_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .11);
/// sha384WithRSAEncryption
pub const SHA384_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .12);
/// sha512WithRSAEncryption
pub const SHA512_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .13);

/// id-ecPublicKey
pub const EC_PUBLICKEY_OID: Oid<'static> = oid!(1.2.840 .10045 .2 .1);
/// ecdsa-with-SHA256
pub const ECDSA_WITH_SHA256_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .2);
/// ecdsa-with-SHA384
pub const ECDSA_WITH_SHA384_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .3);
/// ecdsa-with-SHA512
pub const ECDSA_WITH_SHA512_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .4);

/// NIST P-384
pub const SECP384R1_OID: Oid<'static> = oid!(1.3.132 .0 .34);
/// NIST P-256
pub const PRIME256V1_OID: Oid<'static> = oid!(1.2.840 .10045 .3 .1 .7);

/// Ed25519
pub const ED25519_OID: Oid<'static> = oid!(1.3.101 .112);

// -- CMS content types and signed attributes --

/// id-data
pub const ID_DATA_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .7 .1);
/// id-signedData
pub const ID_SIGNED_DATA_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .7 .2);
/// id-ct-TSTInfo
pub const ID_CT_TST_INFO_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .1 .4);

/// content-type
pub const CONTENT_TYPE_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .3);
/// message-digest
pub const MESSAGE_DIGEST_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .4);
/// signing-time
pub const SIGNING_TIME_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .5);
/// countersignature
pub const COUNTER_SIGNATURE_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .6);

/// signing-certificate (ESS, v1 with SHA-1 certificate hashes)
pub const SIGNING_CERTIFICATE_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .12);
/// signing-certificate-v2
pub const SIGNING_CERTIFICATE_V2_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .47);
/// content-time-stamp
pub const CONTENT_TIMESTAMP_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .20);

// -- CAdES unsigned attributes --

/// signature-time-stamp
pub const SIGNATURE_TIMESTAMP_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .14);
/// complete-certificate-references
pub const COMPLETE_CERTIFICATE_REFS_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .21);
/// complete-revocation-references
pub const COMPLETE_REVOCATION_REFS_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .22);
/// certificate-values
pub const CERTIFICATE_VALUES_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .23);
/// revocation-values
pub const REVOCATION_VALUES_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .24);
/// CAdES-C-time-stamp
pub const ESC_TIMESTAMP_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .25);
/// time-stamped-certs-crls-references
pub const CERT_CRL_TIMESTAMP_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .26);
/// attribute-certificate-references
pub const ATTRIBUTE_CERTIFICATE_REFS_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .44);
/// attribute-revocation-references
pub const ATTRIBUTE_REVOCATION_REFS_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .45);

/// archive-time-stamp-v2
pub const ARCHIVE_TIMESTAMP_V2_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .9 .16 .2 .48);
/// archive-time-stamp-v3
pub const ARCHIVE_TIMESTAMP_V3_OID: Oid<'static> = oid!(0.4.0 .1733 .2 .4);

/// ats-hash-index (first edition of the attribute)
pub const ATS_HASH_INDEX_OID: Oid<'static> = oid!(0.4.0 .1733 .2 .5);
/// ats-hash-index-v2
pub const ATS_HASH_INDEX_V2_OID: Oid<'static> = oid!(0.4.0 .19122 .1 .4);
/// ats-hash-index-v3
pub const ATS_HASH_INDEX_V3_OID: Oid<'static> = oid!(0.4.0 .19122 .1 .5);

// -- revocation information formats --

/// id-ri-ocsp-response
pub const ID_RI_OCSP_RESPONSE_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .16 .2);
/// id-pkix-ocsp-basic
pub const ID_PKIX_OCSP_BASIC_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .48 .1 .1);

/// Returns true if `oid` identifies an archive time stamp attribute whose
/// token may carry nested validation data.
pub fn is_archive_timestamp(oid: &Oid) -> bool {
    *oid == ARCHIVE_TIMESTAMP_V2_OID || *oid == ARCHIVE_TIMESTAMP_V3_OID
}

/// Returns true if `oid` identifies any kind of time stamp attribute.
pub fn is_timestamp(oid: &Oid) -> bool {
    is_archive_timestamp(oid)
        || *oid == SIGNATURE_TIMESTAMP_OID
        || *oid == CONTENT_TIMESTAMP_OID
        || *oid == ESC_TIMESTAMP_OID
        || *oid == CERT_CRL_TIMESTAMP_OID
}
