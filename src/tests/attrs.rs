// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

use crate::accessor::AttrValue;
use crate::attribute::Template;
use crate::error::Error;
use crate::pkcs11::*;

use super::session;
use super::token::MockToken;

fn stored_key(token: &MockToken) -> CK_OBJECT_HANDLE {
    let mut tmpl = Template::new();
    tmpl.add_string(CKA_LABEL, "zone key");
    tmpl.add_bytes(CKA_ID, vec![0x0a, 0x0b]);
    tmpl.add_ulong(CKA_CLASS, CKO_SECRET_KEY);
    tmpl.add_ulong(CKA_KEY_TYPE, CKK_AES);
    tmpl.add_bool(CKA_SIGN, false);
    tmpl.add_bool(CKA_SENSITIVE, true);
    token.insert_object(tmpl)
}

#[test]
fn typed_reads() {
    let token = MockToken::new();
    let h = stored_key(&token);
    let s = session(&token);

    assert_eq!(
        s.get_key_attribute(h, CKA_SENSITIVE).unwrap(),
        AttrValue::Bool(true)
    );
    assert_eq!(
        s.get_key_attribute(h, CKA_SIGN).unwrap(),
        AttrValue::Bool(false)
    );
    assert_eq!(
        s.get_key_attribute(h, CKA_LABEL).unwrap(),
        AttrValue::Text("zone key".to_string())
    );
    assert_eq!(
        s.get_key_attribute(h, CKA_ID).unwrap(),
        AttrValue::Bytes(vec![0x0a, 0x0b])
    );
    assert_eq!(
        s.get_key_attribute(h, CKA_KEY_TYPE).unwrap(),
        AttrValue::Num(CKK_AES)
    );
}

#[test]
fn read_is_two_phase() {
    let token = MockToken::new();
    let h = stored_key(&token);
    let s = session(&token);
    s.get_key_attribute(h, CKA_LABEL).unwrap();
    assert_eq!(token.counts().get_attr, 2);
}

#[test]
fn unknown_attributes_refused_up_front() {
    let token = MockToken::new();
    let h = stored_key(&token);
    let s = session(&token);

    // recognized by the engine elsewhere, but not through the accessor
    match s.get_key_attribute(h, CKA_MODULUS) {
        Err(Error::UnknownAttribute(t)) => assert_eq!(t, CKA_MODULUS),
        other => panic!("unexpected result: {:?}", other),
    }
    match s.get_key_attribute(h, 0x80004242) {
        Err(Error::UnknownAttribute(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(token.counts().get_attr, 0);
}

#[test]
fn absent_attribute_not_found() {
    let token = MockToken::new();
    let h = stored_key(&token);
    let s = session(&token);
    match s.get_key_attribute(h, CKA_TRUSTED) {
        Err(Error::AttributeNotFound(t)) => assert_eq!(t, CKA_TRUSTED),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn invalid_type_report_maps_to_not_found() {
    let token = MockToken::new();
    let h = stored_key(&token);
    token.fail_with("get_attr", CKR_ATTRIBUTE_TYPE_INVALID);
    let s = session(&token);
    match s.get_key_attribute(h, CKA_SENSITIVE) {
        Err(Error::AttributeNotFound(t)) => assert_eq!(t, CKA_SENSITIVE),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn undisclosed_attribute_not_found() {
    let token = MockToken::new();
    let h = stored_key(&token);
    token.hide_attr(h, CKA_SENSITIVE);
    let s = session(&token);
    match s.get_key_attribute(h, CKA_SENSITIVE) {
        Err(Error::AttributeNotFound(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn typed_writes() {
    let token = MockToken::new();
    let h = stored_key(&token);
    let s = session(&token);

    s.set_key_attribute(h, CKA_LABEL, &AttrValue::Text("renamed".to_string()))
        .unwrap();
    assert_eq!(
        s.get_key_attribute(h, CKA_LABEL).unwrap(),
        AttrValue::Text("renamed".to_string())
    );
    s.set_key_attribute(h, CKA_SIGN, &AttrValue::Bool(true)).unwrap();
    assert_eq!(
        s.get_key_attribute(h, CKA_SIGN).unwrap(),
        AttrValue::Bool(true)
    );
}

#[test]
fn write_value_type_must_match() {
    let token = MockToken::new();
    let h = stored_key(&token);
    let s = session(&token);
    match s.set_key_attribute(h, CKA_SIGN, &AttrValue::Num(1)) {
        Err(Error::InvalidParameter(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    match s.set_key_attribute(h, 0x80004242, &AttrValue::Bool(true)) {
        Err(Error::UnknownAttribute(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(token.counts().set_attr, 0);
}

#[test]
fn write_failure_is_reported() {
    let token = MockToken::new();
    let h = stored_key(&token);
    token.fail_with("set_attr", CKR_TEMPLATE_INCONSISTENT);
    let s = session(&token);
    match s.set_key_attribute(h, CKA_SIGN, &AttrValue::Bool(true)) {
        Err(Error::TokenOperationFailed { rv, .. }) => {
            assert_eq!(rv, CKR_TEMPLATE_INCONSISTENT)
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
