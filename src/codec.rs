// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Public key material exchange in SubjectPublicKeyInfo DER form.
//!
//! Export reads the RSA components off a token object and serializes
//! the standard SPKI shape; import parses the same shape and creates
//! a token object. Only RSA is supported, but DSA and EC keys are
//! recognized on import so they can be refused by name instead of as
//! opaque parse failures.

use log::debug;
use num_bigint::BigUint;

use crate::attribute::Template;
use crate::capability::{Capability, CapabilityVector, KeyClass};
use crate::der::{
    DSA_OID, EC_OID, RSA_OID, RsaPublicKey, SubjectPublicKeyInfo,
};
use crate::error::{Error, Result};
use crate::locator::KeyIdentity;
use crate::pkcs11::*;
use crate::session::KeySession;

impl KeySession<'_> {
    /// Serializes the public key behind `handle` as DER encoded
    /// SubjectPublicKeyInfo bytes.
    pub fn export_public_key(
        &self,
        handle: CK_OBJECT_HANDLE,
    ) -> Result<Vec<u8>> {
        let class = self.read_attr_bytes(handle, CKA_CLASS, "read class")?;
        let class = attr_to_ulong(CKA_CLASS, class)?;
        if class != CKO_PUBLIC_KEY {
            return Err(Error::TypeMismatch(
                "object is not a public key".to_string(),
            ));
        }
        let ktype =
            self.read_attr_bytes(handle, CKA_KEY_TYPE, "read key type")?;
        let ktype = attr_to_ulong(CKA_KEY_TYPE, ktype)?;
        if ktype != CKK_RSA {
            return Err(Error::UnsupportedKeyType(format!(
                "cannot encode key type {:#x}",
                ktype
            )));
        }

        let modulus =
            self.read_attr_bytes(handle, CKA_MODULUS, "read modulus")?;
        let exponent = self.read_attr_bytes(
            handle,
            CKA_PUBLIC_EXPONENT,
            "read public exponent",
        )?;
        let rsa = RsaPublicKey::new(&modulus, &exponent)?;
        let inner = asn1::write_single(&rsa)?;
        let spki = SubjectPublicKeyInfo::new_rsa(&inner)?;
        Ok(asn1::write_single(&spki)?)
    }

    /// Parses DER encoded SubjectPublicKeyInfo bytes and creates a
    /// public key token object from them.
    ///
    /// Returns the handle of the created object.
    pub fn import_public_key(
        &self,
        label: &str,
        id: &[u8],
        der: &[u8],
        overrides: &[(Capability, bool)],
    ) -> Result<CK_OBJECT_HANDLE> {
        let caps = CapabilityVector::build(KeyClass::Public, overrides)?;
        let identity = KeyIdentity {
            id: Some(id.to_vec()),
            label: Some(label.to_string()),
        };
        if self.key_exists(&identity, KeyClass::Public)? {
            return Err(Error::duplicate(format!(
                "public key with label '{}' already exists",
                label
            )));
        }

        let spki = asn1::parse_single::<SubjectPublicKeyInfo>(der)?;
        if spki.algorithm.oid != RSA_OID {
            let name = if spki.algorithm.oid == DSA_OID {
                "DSA".to_string()
            } else if spki.algorithm.oid == EC_OID {
                "EC".to_string()
            } else {
                spki.algorithm.oid.to_string()
            };
            return Err(Error::UnsupportedKeyType(format!(
                "cannot import {} public keys",
                name
            )));
        }
        let rsa = asn1::parse_single::<RsaPublicKey>(
            spki.subject_public_key.as_bytes(),
        )?;
        // canonical unsigned form, without any DER sign octet
        let modulus =
            BigUint::from_bytes_be(rsa.modulus.as_bytes()).to_bytes_be();
        let exponent = BigUint::from_bytes_be(rsa.public_exponent.as_bytes())
            .to_bytes_be();
        debug!("importing {} byte RSA modulus", modulus.len());

        let mut tmpl = Template::with_capacity(16);
        tmpl.add_bytes(CKA_ID, id.to_vec());
        tmpl.add_ulong(CKA_CLASS, CKO_PUBLIC_KEY);
        tmpl.add_ulong(CKA_KEY_TYPE, CKK_RSA);
        tmpl.add_bool(CKA_TOKEN, true);
        tmpl.add_string(CKA_LABEL, label);
        tmpl.add_bytes(CKA_MODULUS, modulus);
        tmpl.add_bytes(CKA_PUBLIC_EXPONENT, exponent);
        caps.extend_template(&mut tmpl);
        match self.backend().create_object(self.handle(), &tmpl) {
            Ok(h) => Ok(h),
            Err(rv) => Err(Error::token("create public key object", rv)),
        }
    }
}

/// Decodes a native-endian CK_ULONG attribute value.
fn attr_to_ulong(
    t: CK_ATTRIBUTE_TYPE,
    value: Vec<u8>,
) -> Result<CK_ULONG> {
    crate::attribute::Attribute::from_raw(t, value)?.to_ulong()
}
