// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Per-class capability flag defaults and overrides.
//!
//! Every key class carries a fixed set of boolean capability flags.
//! [CapabilityVector::build] starts from the class defaults and folds
//! caller overrides on top, rejecting any flag the class does not
//! carry. The resulting vector drives template construction for key
//! generation, import and wrapped transfer.

use std::collections::BTreeMap;

use crate::attribute::Template;
use crate::error::{Error, Result};
use crate::pkcs11::*;

/// Object class of a key, restricted to the three key classes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyClass {
    Secret,
    Public,
    Private,
}

impl KeyClass {
    pub fn to_ck(&self) -> CK_OBJECT_CLASS {
        match self {
            KeyClass::Secret => CKO_SECRET_KEY,
            KeyClass::Public => CKO_PUBLIC_KEY,
            KeyClass::Private => CKO_PRIVATE_KEY,
        }
    }

    pub fn from_ck(class: CK_OBJECT_CLASS) -> Result<KeyClass> {
        match class {
            CKO_SECRET_KEY => Ok(KeyClass::Secret),
            CKO_PUBLIC_KEY => Ok(KeyClass::Public),
            CKO_PRIVATE_KEY => Ok(KeyClass::Private),
            _ => Err(Error::param("not a key object class")),
        }
    }
}

/// A boolean capability flag of a key object.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Capability {
    AlwaysAuthenticate,
    Copyable,
    Decrypt,
    Derive,
    Encrypt,
    Extractable,
    Modifiable,
    Private,
    Sensitive,
    Sign,
    SignRecover,
    Trusted,
    Unwrap,
    Verify,
    VerifyRecover,
    Wrap,
    WrapWithTrusted,
}

impl Capability {
    pub fn to_ck(&self) -> CK_ATTRIBUTE_TYPE {
        match self {
            Capability::AlwaysAuthenticate => CKA_ALWAYS_AUTHENTICATE,
            Capability::Copyable => CKA_COPYABLE,
            Capability::Decrypt => CKA_DECRYPT,
            Capability::Derive => CKA_DERIVE,
            Capability::Encrypt => CKA_ENCRYPT,
            Capability::Extractable => CKA_EXTRACTABLE,
            Capability::Modifiable => CKA_MODIFIABLE,
            Capability::Private => CKA_PRIVATE,
            Capability::Sensitive => CKA_SENSITIVE,
            Capability::Sign => CKA_SIGN,
            Capability::SignRecover => CKA_SIGN_RECOVER,
            Capability::Trusted => CKA_TRUSTED,
            Capability::Unwrap => CKA_UNWRAP,
            Capability::Verify => CKA_VERIFY,
            Capability::VerifyRecover => CKA_VERIFY_RECOVER,
            Capability::Wrap => CKA_WRAP,
            Capability::WrapWithTrusted => CKA_WRAP_WITH_TRUSTED,
        }
    }
}

/// Default flags of a secret key. Extractable by default so zone keys
/// can be moved between replicas under a wrapping key.
const SECRET_DEFAULTS: [(Capability, bool); 13] = [
    (Capability::Copyable, true),
    (Capability::Decrypt, false),
    (Capability::Derive, false),
    (Capability::Encrypt, false),
    (Capability::Extractable, true),
    (Capability::Modifiable, true),
    (Capability::Private, true),
    (Capability::Sensitive, true),
    (Capability::Sign, false),
    (Capability::Unwrap, true),
    (Capability::Verify, false),
    (Capability::Wrap, true),
    (Capability::WrapWithTrusted, false),
];

/// Default flags of a public key.
const PUBLIC_DEFAULTS: [(Capability, bool); 9] = [
    (Capability::Copyable, true),
    (Capability::Derive, false),
    (Capability::Encrypt, false),
    (Capability::Modifiable, true),
    (Capability::Private, true),
    (Capability::Trusted, false),
    (Capability::Verify, false),
    (Capability::VerifyRecover, false),
    (Capability::Wrap, true),
];

/// Default flags of a private key. Extractable by default to keep key
/// material transferable, the same as the secret class.
const PRIVATE_DEFAULTS: [(Capability, bool); 12] = [
    (Capability::AlwaysAuthenticate, false),
    (Capability::Copyable, true),
    (Capability::Decrypt, false),
    (Capability::Derive, false),
    (Capability::Extractable, true),
    (Capability::Modifiable, true),
    (Capability::Private, true),
    (Capability::Sensitive, true),
    (Capability::Sign, false),
    (Capability::SignRecover, false),
    (Capability::Unwrap, true),
    (Capability::WrapWithTrusted, false),
];

fn class_defaults(class: KeyClass) -> &'static [(Capability, bool)] {
    match class {
        KeyClass::Secret => &SECRET_DEFAULTS,
        KeyClass::Public => &PUBLIC_DEFAULTS,
        KeyClass::Private => &PRIVATE_DEFAULTS,
    }
}

/// The resolved capability flags of a key being created.
#[derive(Debug, Clone)]
pub struct CapabilityVector {
    class: KeyClass,
    flags: BTreeMap<Capability, bool>,
}

impl CapabilityVector {
    /// Builds the vector for a class from its defaults plus caller
    /// overrides. An override naming a flag the class does not carry
    /// is rejected.
    pub fn build(
        class: KeyClass,
        overrides: &[(Capability, bool)],
    ) -> Result<CapabilityVector> {
        let mut flags = BTreeMap::new();
        for (cap, val) in class_defaults(class) {
            flags.insert(*cap, *val);
        }
        for (cap, val) in overrides {
            match flags.get_mut(cap) {
                Some(slot) => *slot = *val,
                None => {
                    return Err(Error::param(format!(
                        "capability {:?} not valid for {:?} keys",
                        cap, class
                    )))
                }
            }
        }
        Ok(CapabilityVector {
            class: class,
            flags: flags,
        })
    }

    pub fn class(&self) -> KeyClass {
        self.class
    }

    pub fn get(&self, cap: Capability) -> Option<bool> {
        self.flags.get(&cap).copied()
    }

    /// Appends the flags to a creation template.
    ///
    /// CKA_COPYABLE stays out of the submitted template. SoftHSM
    /// rejects templates that carry it, so the flag is tracked here
    /// but left to the token default.
    pub fn extend_template(&self, tmpl: &mut Template) {
        for (cap, val) in &self.flags {
            if *cap == Capability::Copyable {
                continue;
            }
            tmpl.add_bool(cap.to_ck(), *val);
        }
    }
}
