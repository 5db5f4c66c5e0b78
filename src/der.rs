// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! DER structures for public key encoding.
//!
//! Only the RSA SubjectPublicKeyInfo shape is produced; on the parse
//! side the algorithm identifier is inspected so non-RSA keys can be
//! rejected by name.

use std::borrow::Cow;

use crate::error::{Error, Result};

use asn1;
use zeroize::Zeroize;

pub const RSA_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 113549, 1, 1, 1);
pub const DSA_OID: asn1::ObjectIdentifier = asn1::oid!(1, 2, 840, 10040, 4, 1);
pub const EC_OID: asn1::ObjectIdentifier = asn1::oid!(1, 2, 840, 10045, 2, 1);

/// A big unsigned integer in DER INTEGER form.
///
/// INTEGERs are signed in DER, so a number whose top bit is set gains
/// a leading zero octet on encode; redundant leading zeroes are
/// stripped. Owned buffers are zeroized on drop.
pub struct DerEncBigUint<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> DerEncBigUint<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::param("empty big integer"));
        }
        let mut de = DerEncBigUint {
            data: Cow::from(data),
        };
        if de.data[0] & 0x80 == 0x80 {
            let mut v = Vec::with_capacity(de.data.len() + 1);
            v.push(0);
            v.extend_from_slice(&de.data);
            de = DerEncBigUint {
                data: Cow::Owned(v),
            };
        } else {
            // Skip leading zeroes that do not affect the sign of the
            // resulting integer
            let mut skip = 0;
            while de.data[skip] == 0
                && skip + 1 < de.data.len()
                && de.data[skip + 1] & 0x80 == 0
            {
                skip += 1;
            }
            de = DerEncBigUint {
                data: Cow::from(&data[skip..]),
            };
        }
        match asn1::BigUint::new(&de.data) {
            Some(_) => Ok(de),
            None => Err(Error::param("malformed big integer")),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the integer bytes without possible leading NULL bytes.
    #[allow(dead_code)]
    pub fn as_nopad_bytes(&self) -> &[u8] {
        let mut skip = 0;
        for val in self.data.as_ref() {
            if *val != 0 {
                break;
            }
            skip += 1;
        }
        &self.data[skip..]
    }
}

impl Drop for DerEncBigUint<'_> {
    fn drop(&mut self) {
        match &self.data {
            Cow::Owned(_) => self.data.to_mut().zeroize(),
            _ => (),
        }
    }
}

impl<'a> asn1::SimpleAsn1Readable<'a> for DerEncBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn parse_data(data: &'a [u8]) -> asn1::ParseResult<Self> {
        match DerEncBigUint::new(data) {
            Ok(x) => Ok(x),
            Err(_) => {
                Err(asn1::ParseError::new(asn1::ParseErrorKind::InvalidValue))
            }
        }
    }
}
impl<'a> asn1::SimpleAsn1Writable for DerEncBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn write_data(&self, dest: &mut asn1::WriteBuf) -> asn1::WriteResult {
        dest.push_slice(self.as_bytes())
    }
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct AlgorithmIdentifier<'a> {
    pub oid: asn1::ObjectIdentifier,
    pub params: Option<asn1::Tlv<'a>>,
}

static NULL_TLV_BYTES: [u8; 2] = [0x05, 0x00];

fn null_params() -> Result<asn1::Tlv<'static>> {
    Ok(asn1::parse_single::<asn1::Tlv>(&NULL_TLV_BYTES)?)
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct SubjectPublicKeyInfo<'a> {
    pub algorithm: AlgorithmIdentifier<'a>,
    pub subject_public_key: asn1::BitString<'a>,
}

impl<'a> SubjectPublicKeyInfo<'a> {
    /// Wraps an encoded RSA public key into an SPKI structure.
    pub fn new_rsa(key_bytes: &'a [u8]) -> Result<SubjectPublicKeyInfo<'a>> {
        Ok(SubjectPublicKeyInfo {
            algorithm: AlgorithmIdentifier {
                oid: RSA_OID.clone(),
                params: Some(null_params()?),
            },
            subject_public_key: match asn1::BitString::new(key_bytes, 0) {
                Some(b) => b,
                None => {
                    return Err(Error::param("invalid public key bit string"))
                }
            },
        })
    }
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct RsaPublicKey<'a> {
    pub modulus: DerEncBigUint<'a>,
    pub public_exponent: DerEncBigUint<'a>,
}

impl<'a> RsaPublicKey<'a> {
    pub fn new(
        modulus: &'a [u8],
        public_exponent: &'a [u8],
    ) -> Result<RsaPublicKey<'a>> {
        Ok(RsaPublicKey {
            modulus: DerEncBigUint::new(modulus)?,
            public_exponent: DerEncBigUint::new(public_exponent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biguint_strips_redundant_zeros() {
        let der = DerEncBigUint::new(&[0x00, 0x00, 0x03]).unwrap();
        assert_eq!(der.as_bytes(), &[0x03]);
        assert_eq!(der.as_nopad_bytes(), &[0x03]);
    }

    #[test]
    fn biguint_gains_sign_octet() {
        let der = DerEncBigUint::new(&[0x81, 0x02]).unwrap();
        assert_eq!(der.as_bytes(), &[0x00, 0x81, 0x02]);
        assert_eq!(der.as_nopad_bytes(), &[0x81, 0x02]);
    }

    #[test]
    fn biguint_rejects_empty() {
        assert!(DerEncBigUint::new(&[]).is_err());
    }

    #[test]
    fn rsa_spki_round_trip() {
        let modulus = [0xc2, 0x01, 0x02, 0x03];
        let exponent = [0x01, 0x00, 0x01];
        let rsa = RsaPublicKey::new(&modulus, &exponent).unwrap();
        let inner = asn1::write_single(&rsa).unwrap();
        let spki = SubjectPublicKeyInfo::new_rsa(&inner).unwrap();
        let der = asn1::write_single(&spki).unwrap();

        let parsed = asn1::parse_single::<SubjectPublicKeyInfo>(&der).unwrap();
        assert_eq!(parsed.algorithm.oid, RSA_OID);
        let body = parsed.subject_public_key.as_bytes();
        let back = asn1::parse_single::<RsaPublicKey>(body).unwrap();
        assert_eq!(back.modulus.as_nopad_bytes(), &modulus[..]);
        assert_eq!(back.public_exponent.as_bytes(), &exponent[..]);
    }
}
