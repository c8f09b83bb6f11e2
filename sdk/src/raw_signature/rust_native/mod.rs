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

//! This module binds Rust native logic for validating raw signatures to this
//! crate's [`RawSignatureValidator`] trait.

use asn1_rs::Oid;

use crate::{
    asn1::oids::*,
    raw_signature::RawSignatureValidator,
};

mod ecdsa_validator;
pub(crate) use ecdsa_validator::EcdsaValidator;

mod ed25519_validator;
pub(crate) use ed25519_validator::Ed25519Validator;

mod rsa_legacy_validator;
pub(crate) use rsa_legacy_validator::RsaLegacyValidator;

/// Select validator based on signing algorithm and hash type.
pub(crate) fn validator_for_sig_and_hash_algs(
    sig_alg: &Oid,
    hash_alg: &Oid,
) -> Option<Box<dyn RawSignatureValidator>> {
    // try signature algs first
    if *sig_alg == ECDSA_WITH_SHA256_OID {
        return Some(Box::new(EcdsaValidator::Es256));
    }
    if *sig_alg == ECDSA_WITH_SHA384_OID {
        return Some(Box::new(EcdsaValidator::Es384));
    }
    if *sig_alg == ECDSA_WITH_SHA512_OID {
        return Some(Box::new(EcdsaValidator::Es512));
    }
    if *sig_alg == SHA256_WITH_RSAENCRYPTION_OID {
        return Some(Box::new(RsaLegacyValidator::Rsa256));
    }
    if *sig_alg == SHA384_WITH_RSAENCRYPTION_OID {
        return Some(Box::new(RsaLegacyValidator::Rsa384));
    }
    if *sig_alg == SHA512_WITH_RSAENCRYPTION_OID {
        return Some(Box::new(RsaLegacyValidator::Rsa512));
    }
    if *sig_alg == ED25519_OID {
        return Some(Box::new(Ed25519Validator {}));
    }

    // Test for public key algs next

    if *sig_alg == RSA_OID {
        if *hash_alg == SHA256_OID {
            return Some(Box::new(RsaLegacyValidator::Rsa256));
        } else if *hash_alg == SHA384_OID {
            return Some(Box::new(RsaLegacyValidator::Rsa384));
        } else if *hash_alg == SHA512_OID {
            return Some(Box::new(RsaLegacyValidator::Rsa512));
        }
    }

    if *sig_alg == EC_PUBLICKEY_OID {
        if *hash_alg == SHA256_OID {
            return Some(Box::new(EcdsaValidator::Es256));
        } else if *hash_alg == SHA384_OID {
            return Some(Box::new(EcdsaValidator::Es384));
        } else if *hash_alg == SHA512_OID {
            return Some(Box::new(EcdsaValidator::Es512));
        }
    }

    None
}
