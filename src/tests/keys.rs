// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

use crate::capability::Capability;
use crate::error::Error;
use crate::pkcs11::*;

use super::session;
use super::token::MockToken;

fn attr_bool(attrs: &[crate::attribute::Attribute], t: CK_ATTRIBUTE_TYPE) -> bool {
    attrs
        .iter()
        .find(|a| a.get_type() == t)
        .unwrap()
        .to_bool()
        .unwrap()
}

#[test]
fn generate_secret_key_defaults() {
    let token = MockToken::new();
    let s = session(&token);
    let h = s
        .generate_secret_key("zone master", &[0x01], 32, &[])
        .unwrap();
    let attrs = token.object_attrs(h).unwrap();

    assert!(attr_bool(&attrs, CKA_TOKEN));
    assert!(attr_bool(&attrs, CKA_SENSITIVE));
    assert!(attr_bool(&attrs, CKA_EXTRACTABLE));
    assert!(attr_bool(&attrs, CKA_WRAP));
    assert!(attr_bool(&attrs, CKA_UNWRAP));
    assert!(!attr_bool(&attrs, CKA_SIGN));
    // the token decides copyability
    assert!(attrs.iter().all(|a| a.get_type() != CKA_COPYABLE));
    let len = attrs
        .iter()
        .find(|a| a.get_type() == CKA_VALUE_LEN)
        .unwrap()
        .to_ulong()
        .unwrap();
    assert_eq!(len, 32);
}

#[test]
fn generate_secret_key_rejects_bad_length() {
    let token = MockToken::new();
    let s = session(&token);
    for bad in [0usize, 8, 15, 33, 64] {
        match s.generate_secret_key("k", &[1], bad, &[]) {
            Err(Error::InvalidParameter(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
    assert_eq!(token.counts().generate, 0);
}

#[test]
fn generate_secret_key_applies_overrides() {
    let token = MockToken::new();
    let s = session(&token);
    let h = s
        .generate_secret_key(
            "k",
            &[1],
            16,
            &[(Capability::Sign, true), (Capability::Extractable, false)],
        )
        .unwrap();
    let attrs = token.object_attrs(h).unwrap();
    assert!(attr_bool(&attrs, CKA_SIGN));
    assert!(!attr_bool(&attrs, CKA_EXTRACTABLE));
}

#[test]
fn generate_secret_key_refuses_duplicate() {
    let token = MockToken::new();
    let s = session(&token);
    s.generate_secret_key("k", &[1], 16, &[]).unwrap();
    match s.generate_secret_key("k", &[1], 16, &[]) {
        Err(Error::DuplicateKey(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(token.counts().generate, 1);
}

#[test]
fn generate_rsa_key_pair() {
    let token = MockToken::new();
    let s = session(&token);
    let (public, private) = s
        .generate_rsa_key_pair("signer", &[0x02], 2048, &[], &[])
        .unwrap();
    assert_ne!(public, private);

    let pub_attrs = token.object_attrs(public).unwrap();
    let bits = pub_attrs
        .iter()
        .find(|a| a.get_type() == CKA_MODULUS_BITS)
        .unwrap()
        .to_ulong()
        .unwrap();
    assert_eq!(bits, 2048);
    let exponent = pub_attrs
        .iter()
        .find(|a| a.get_type() == CKA_PUBLIC_EXPONENT)
        .unwrap()
        .get_value()
        .clone();
    assert_eq!(exponent, vec![0x01, 0x00, 0x01]);
    assert!(attr_bool(&pub_attrs, CKA_WRAP));

    let priv_attrs = token.object_attrs(private).unwrap();
    assert!(attr_bool(&priv_attrs, CKA_SENSITIVE));
    assert!(attr_bool(&priv_attrs, CKA_EXTRACTABLE));
    assert!(attr_bool(&priv_attrs, CKA_UNWRAP));
    assert!(!attr_bool(&priv_attrs, CKA_SIGN));
}

#[test]
fn generate_rsa_key_pair_refuses_duplicate() {
    let token = MockToken::new();
    let s = session(&token);
    s.generate_rsa_key_pair("signer", &[2], 2048, &[], &[])
        .unwrap();
    match s.generate_rsa_key_pair("signer", &[2], 2048, &[], &[]) {
        Err(Error::DuplicateKey(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(token.counts().generate_pair, 1);
}

#[test]
fn generate_rejects_foreign_capability() {
    let token = MockToken::new();
    let s = session(&token);
    // Sensitive is not a public key capability
    match s.generate_rsa_key_pair(
        "signer",
        &[2],
        2048,
        &[(Capability::Sensitive, true)],
        &[],
    ) {
        Err(Error::InvalidParameter(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(token.counts().find_init, 0);
}

#[test]
fn generate_requires_identity() {
    let token = MockToken::new();
    let s = session(&token);
    match s.generate_secret_key("", &[1], 16, &[]) {
        Err(Error::InvalidParameter(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    match s.generate_secret_key("k", &[], 16, &[]) {
        Err(Error::InvalidParameter(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn destroy_key() {
    let token = MockToken::new();
    let s = session(&token);
    let h = s.generate_secret_key("k", &[1], 16, &[]).unwrap();
    s.destroy_key(h).unwrap();
    assert_eq!(token.object_count(), 0);
    match s.destroy_key(h) {
        Err(Error::TokenOperationFailed { rv, .. }) => {
            assert_eq!(rv, CKR_OBJECT_HANDLE_INVALID)
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
