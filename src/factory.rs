// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Key generation and destruction.

use log::info;

use crate::attribute::Template;
use crate::capability::{Capability, CapabilityVector, KeyClass};
use crate::error::{Error, Result};
use crate::locator::KeyIdentity;
use crate::pkcs11::*;
use crate::session::KeySession;

/// AES key lengths the generator accepts, in bytes.
const AES_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// RSA public exponent used for every generated pair (65537).
const RSA_PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

fn creation_identity(label: &str, id: &[u8]) -> Result<KeyIdentity> {
    if label.is_empty() || id.is_empty() {
        return Err(Error::param("key label and id must not be empty"));
    }
    Ok(KeyIdentity {
        id: Some(id.to_vec()),
        label: Some(label.to_string()),
    })
}

impl KeySession<'_> {
    /// Generates an AES secret key as a token object.
    ///
    /// The identity must not collide with an existing secret key.
    /// Returns the handle of the new key.
    pub fn generate_secret_key(
        &self,
        label: &str,
        id: &[u8],
        key_len_bytes: usize,
        overrides: &[(Capability, bool)],
    ) -> Result<CK_OBJECT_HANDLE> {
        if !AES_KEY_LENGTHS.contains(&key_len_bytes) {
            return Err(Error::param(format!(
                "invalid AES key length: {} bytes",
                key_len_bytes
            )));
        }
        let caps = CapabilityVector::build(KeyClass::Secret, overrides)?;
        let identity = creation_identity(label, id)?;
        if self.key_exists(&identity, KeyClass::Secret)? {
            return Err(Error::duplicate(format!(
                "secret key with label '{}' already exists",
                label
            )));
        }
        let mut tmpl = Template::with_capacity(16);
        tmpl.add_bytes(CKA_ID, id.to_vec());
        tmpl.add_string(CKA_LABEL, label);
        tmpl.add_bool(CKA_TOKEN, true);
        tmpl.add_ulong(CKA_VALUE_LEN, CK_ULONG::try_from(key_len_bytes)?);
        caps.extend_template(&mut tmpl);
        let handle = match self.backend().generate_key(
            self.handle(),
            CKM_AES_KEY_GEN,
            &tmpl,
        ) {
            Ok(h) => h,
            Err(rv) => return Err(Error::token("key generation", rv)),
        };
        info!(
            "generated secret key '{}' (id {})",
            label,
            hex::encode(id)
        );
        Ok(handle)
    }

    /// Generates an RSA key pair as token objects.
    ///
    /// Both halves share the identity; the identity must not collide
    /// with an existing key of either class. Returns the public handle
    /// first, then the private one.
    pub fn generate_rsa_key_pair(
        &self,
        label: &str,
        id: &[u8],
        modulus_bits: usize,
        pub_overrides: &[(Capability, bool)],
        priv_overrides: &[(Capability, bool)],
    ) -> Result<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        let pub_caps = CapabilityVector::build(KeyClass::Public, pub_overrides)?;
        let priv_caps =
            CapabilityVector::build(KeyClass::Private, priv_overrides)?;
        let identity = creation_identity(label, id)?;
        if self.key_exists(&identity, KeyClass::Private)? {
            return Err(Error::duplicate(format!(
                "private key with label '{}' already exists",
                label
            )));
        }
        if self.key_exists(&identity, KeyClass::Public)? {
            return Err(Error::duplicate(format!(
                "public key with label '{}' already exists",
                label
            )));
        }

        let mut pub_tmpl = Template::with_capacity(14);
        pub_tmpl.add_bytes(CKA_ID, id.to_vec());
        pub_tmpl.add_string(CKA_LABEL, label);
        pub_tmpl.add_bool(CKA_TOKEN, true);
        pub_tmpl.add_ulong(CKA_MODULUS_BITS, CK_ULONG::try_from(modulus_bits)?);
        pub_tmpl.add_bytes(CKA_PUBLIC_EXPONENT, RSA_PUBLIC_EXPONENT.to_vec());
        pub_caps.extend_template(&mut pub_tmpl);

        let mut priv_tmpl = Template::with_capacity(16);
        priv_tmpl.add_bytes(CKA_ID, id.to_vec());
        priv_tmpl.add_string(CKA_LABEL, label);
        priv_tmpl.add_bool(CKA_TOKEN, true);
        priv_caps.extend_template(&mut priv_tmpl);

        let (public, private) = match self.backend().generate_key_pair(
            self.handle(),
            CKM_RSA_PKCS_KEY_PAIR_GEN,
            &pub_tmpl,
            &priv_tmpl,
        ) {
            Ok(pair) => pair,
            Err(rv) => return Err(Error::token("key pair generation", rv)),
        };
        info!("generated {} bit RSA key pair '{}'", modulus_bits, label);
        Ok((public, private))
    }

    /// Destroys a key object by handle.
    pub fn destroy_key(&self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        match self.backend().destroy_object(self.handle(), handle) {
            Ok(()) => Ok(()),
            Err(rv) => Err(Error::token("object destruction", rv)),
        }
    }
}
