// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Typed single-attribute reads and writes on key objects.
//!
//! The accessor recognizes the same closed attribute set the rest of
//! the engine uses: the capability booleans plus id, label and key
//! type. Anything else is refused up front rather than passed through
//! to the token.

use crate::attribute::{AttrType, Attribute, Attrmap};
use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::session::KeySession;

/// A typed attribute value read off a key object.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    Num(CK_ULONG),
}

fn accessor_type(attribute: CK_ATTRIBUTE_TYPE) -> Result<AttrType> {
    match attribute {
        CKA_ID => Ok(AttrType::BytesType),
        CKA_LABEL => Ok(AttrType::StringType),
        CKA_KEY_TYPE => Ok(AttrType::NumType),
        _ => match Attrmap::search_by_id(attribute) {
            Some(map) if map.attr_type() == AttrType::BoolType => {
                Ok(AttrType::BoolType)
            }
            _ => Err(Error::UnknownAttribute(attribute)),
        },
    }
}

impl KeySession<'_> {
    /// Reads one attribute of a key object as a typed value.
    ///
    /// An attribute the object does not carry, or one the token will
    /// not disclose, is [Error::AttributeNotFound].
    pub fn get_key_attribute(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
    ) -> Result<AttrValue> {
        let atype = accessor_type(attribute)?;
        let raw = self.read_attr_bytes(object, attribute, "get attribute")?;
        let attr = Attribute::from_raw(attribute, raw)?;
        match atype {
            AttrType::BoolType => Ok(AttrValue::Bool(attr.to_bool()?)),
            AttrType::NumType => Ok(AttrValue::Num(attr.to_ulong()?)),
            AttrType::StringType => Ok(AttrValue::Text(attr.to_text()?)),
            AttrType::BytesType => Ok(AttrValue::Bytes(attr.to_bytes()?.clone())),
        }
    }

    /// Writes one attribute of a key object.
    ///
    /// The value must match the attribute's semantic type; the token
    /// decides whether the attribute is settable at all.
    pub fn set_key_attribute(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
        value: &AttrValue,
    ) -> Result<()> {
        let atype = accessor_type(attribute)?;
        let attr = match (atype, value) {
            (AttrType::BoolType, AttrValue::Bool(b)) => {
                Attribute::from_bool(attribute, *b)
            }
            (AttrType::NumType, AttrValue::Num(n)) => {
                Attribute::from_ulong(attribute, *n)
            }
            (AttrType::StringType, AttrValue::Text(s)) => {
                Attribute::from_string(attribute, s)
            }
            (AttrType::BytesType, AttrValue::Bytes(b)) => {
                Attribute::from_bytes(attribute, b.clone())
            }
            _ => {
                return Err(Error::param(format!(
                    "value type does not match attribute {:#x}",
                    attribute
                )))
            }
        };
        match self
            .backend()
            .set_attribute_value(self.handle(), object, &attr)
        {
            Ok(()) => Ok(()),
            Err(rv) => Err(Error::token("set attribute", rv)),
        }
    }
}
