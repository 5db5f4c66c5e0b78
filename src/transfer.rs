// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Wrapped key material transfer.
//!
//! Moves sensitive key material on and off the token as opaque
//! wrapped blobs, so the plaintext never crosses the boundary. The
//! wrapping mechanism is the caller's choice from a small fixed set;
//! no mechanism takes parameters here.

use log::info;

use crate::attribute::Template;
use crate::capability::{Capability, CapabilityVector, KeyClass};
use crate::error::{Error, Result};
use crate::locator::KeyIdentity;
use crate::pkcs11::*;
use crate::session::{read_sized_buf, KeySession, SizedReadError};

/// Wrapping mechanisms available for key transfer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WrapMechanism {
    RsaPkcs,
    RsaPkcsOaep,
    AesKeyWrap,
    AesKeyWrapPad,
}

impl Default for WrapMechanism {
    fn default() -> Self {
        WrapMechanism::RsaPkcs
    }
}

impl WrapMechanism {
    pub fn mechanism_type(&self) -> CK_MECHANISM_TYPE {
        match self {
            WrapMechanism::RsaPkcs => CKM_RSA_PKCS,
            WrapMechanism::RsaPkcsOaep => CKM_RSA_PKCS_OAEP,
            WrapMechanism::AesKeyWrap => CKM_AES_KEY_WRAP,
            WrapMechanism::AesKeyWrapPad => CKM_AES_KEY_WRAP_PAD,
        }
    }

    pub fn from_mechanism_type(
        mech: CK_MECHANISM_TYPE,
    ) -> Result<WrapMechanism> {
        match mech {
            CKM_RSA_PKCS => Ok(WrapMechanism::RsaPkcs),
            CKM_RSA_PKCS_OAEP => Ok(WrapMechanism::RsaPkcsOaep),
            CKM_AES_KEY_WRAP => Ok(WrapMechanism::AesKeyWrap),
            CKM_AES_KEY_WRAP_PAD => Ok(WrapMechanism::AesKeyWrapPad),
            _ => Err(Error::param(format!(
                "mechanism {:#x} is not a supported wrapping mechanism",
                mech
            ))),
        }
    }
}

/// Key type of a wrapped key being imported.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyType {
    Rsa,
    Aes,
}

impl KeyType {
    pub fn to_ck(&self) -> CK_KEY_TYPE {
        match self {
            KeyType::Rsa => CKK_RSA,
            KeyType::Aes => CKK_AES,
        }
    }
}

impl KeySession<'_> {
    /// Wraps `key` under `wrapping_key` and returns the wrapped blob.
    ///
    /// The wrap call is two-phase: a length query sizes the output
    /// buffer before the wrapping call fills it.
    pub fn export_wrapped_key(
        &self,
        key: CK_OBJECT_HANDLE,
        wrapping_key: CK_OBJECT_HANDLE,
        mechanism: WrapMechanism,
    ) -> Result<Vec<u8>> {
        let mech = mechanism.mechanism_type();
        match read_sized_buf(|buf| {
            self.backend()
                .wrap_key(self.handle(), mech, wrapping_key, key, buf)
        }) {
            Ok(blob) => Ok(blob),
            Err(SizedReadError::Size(rv)) => {
                Err(Error::token("key wrapping: get buffer length", rv))
            }
            Err(SizedReadError::Fill(rv)) => {
                Err(Error::token("key wrapping", rv))
            }
            Err(SizedReadError::Unavailable) => {
                Err(Error::token("key wrapping", CKR_GENERAL_ERROR))
            }
            Err(SizedReadError::Exhausted) => Err(Error::ResourceExhausted),
        }
    }

    /// Unwraps a wrapped blob into a new key object of the given
    /// class and type.
    ///
    /// Only secret and private keys can carry wrapped material.
    /// Returns the handle of the created key.
    pub fn import_wrapped_key(
        &self,
        label: &str,
        id: &[u8],
        wrapped: &[u8],
        unwrapping_key: CK_OBJECT_HANDLE,
        mechanism: WrapMechanism,
        key_type: KeyType,
        class: KeyClass,
        overrides: &[(Capability, bool)],
    ) -> Result<CK_OBJECT_HANDLE> {
        match class {
            KeyClass::Secret | KeyClass::Private => (),
            KeyClass::Public => {
                return Err(Error::param(
                    "public keys are not transferred in wrapped form",
                ))
            }
        }
        let caps = CapabilityVector::build(class, overrides)?;
        let identity = KeyIdentity {
            id: Some(id.to_vec()),
            label: Some(label.to_string()),
        };
        if self.key_exists(&identity, class)? {
            return Err(Error::duplicate(format!(
                "{:?} key with label '{}' already exists",
                class, label
            )));
        }

        let mut tmpl = Template::with_capacity(18);
        tmpl.add_ulong(CKA_CLASS, class.to_ck());
        tmpl.add_ulong(CKA_KEY_TYPE, key_type.to_ck());
        tmpl.add_bytes(CKA_ID, id.to_vec());
        tmpl.add_string(CKA_LABEL, label);
        tmpl.add_bool(CKA_TOKEN, true);
        caps.extend_template(&mut tmpl);
        let handle = match self.backend().unwrap_key(
            self.handle(),
            mechanism.mechanism_type(),
            unwrapping_key,
            wrapped,
            &tmpl,
        ) {
            Ok(h) => h,
            Err(rv) => return Err(Error::token("key unwrapping", rv)),
        };
        info!("imported wrapped key '{}' (id {})", label, hex::encode(id));
        Ok(handle)
    }
}
