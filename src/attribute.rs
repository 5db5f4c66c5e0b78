// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Typed PKCS#11 attribute values and search/creation templates.
//!
//! The engine recognizes a closed set of attributes, each with one of
//! four semantic types ([AttrType]). The [Attrmap] table maps the
//! attribute id to its type and printable name; [Template] is the
//! ordered (tag, value) sequence submitted to the token.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::pkcs11::*;

use zeroize::Zeroize;

/// The attribute semantic types this engine understands.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AttrType {
    /// A CK_BBOOL capability flag.
    BoolType,
    /// A CK_ULONG value (class, key type, value length, modulus bits).
    NumType,
    /// UTF-8 label text.
    StringType,
    /// An opaque byte string (id, modulus, public exponent).
    BytesType,
}

/// Maps a PKCS#11 attribute id to a semantic type and printable name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Attrmap<'a> {
    id: CK_ATTRIBUTE_TYPE,
    name: &'a str,
    atype: AttrType,
}

impl PartialOrd for Attrmap<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attrmap<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Attrmap<'_> {
    /// Searches for a mapping by attribute id.
    pub fn search_by_id(
        id: CK_ATTRIBUTE_TYPE,
    ) -> Option<&'static Attrmap<'static>> {
        match &ATTRMAP.binary_search(&Attrmap {
            id: id,
            name: "",
            atype: AttrType::BytesType,
        }) {
            Ok(i) => Some(&ATTRMAP[*i]),
            Err(_) => None,
        }
    }

    pub fn attr_type(&self) -> AttrType {
        self.atype
    }
}

/// Helper macro to populate the static attributes map
macro_rules! attrmap_element {
    ($id:expr; as $attrtype:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            atype: AttrType::$attrtype,
        }
    };
}

/// All attributes the engine knows, ordered by id for binary search.
static ATTRMAP: [Attrmap<'_>; 30] = [
    attrmap_element!(CKA_CLASS; as NumType),
    attrmap_element!(CKA_TOKEN; as BoolType),
    attrmap_element!(CKA_PRIVATE; as BoolType),
    attrmap_element!(CKA_LABEL; as StringType),
    attrmap_element!(CKA_VALUE; as BytesType),
    attrmap_element!(CKA_TRUSTED; as BoolType),
    attrmap_element!(CKA_KEY_TYPE; as NumType),
    attrmap_element!(CKA_ID; as BytesType),
    attrmap_element!(CKA_SENSITIVE; as BoolType),
    attrmap_element!(CKA_ENCRYPT; as BoolType),
    attrmap_element!(CKA_DECRYPT; as BoolType),
    attrmap_element!(CKA_WRAP; as BoolType),
    attrmap_element!(CKA_UNWRAP; as BoolType),
    attrmap_element!(CKA_SIGN; as BoolType),
    attrmap_element!(CKA_SIGN_RECOVER; as BoolType),
    attrmap_element!(CKA_VERIFY; as BoolType),
    attrmap_element!(CKA_VERIFY_RECOVER; as BoolType),
    attrmap_element!(CKA_DERIVE; as BoolType),
    attrmap_element!(CKA_MODULUS; as BytesType),
    attrmap_element!(CKA_MODULUS_BITS; as NumType),
    attrmap_element!(CKA_PUBLIC_EXPONENT; as BytesType),
    attrmap_element!(CKA_VALUE_LEN; as NumType),
    attrmap_element!(CKA_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_LOCAL; as BoolType),
    attrmap_element!(CKA_NEVER_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_ALWAYS_SENSITIVE; as BoolType),
    attrmap_element!(CKA_MODIFIABLE; as BoolType),
    attrmap_element!(CKA_COPYABLE; as BoolType),
    attrmap_element!(CKA_ALWAYS_AUTHENTICATE; as BoolType),
    attrmap_element!(CKA_WRAP_WITH_TRUSTED; as BoolType),
];

/// A typed attribute holding an owned copy of the value bytes.
///
/// Booleans are stored as a single CK_BBOOL byte and numbers as
/// native-endian CK_ULONG bytes, matching what crosses the token
/// interface.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Attribute {
    ck_type: CK_ATTRIBUTE_TYPE,
    attrtype: AttrType,
    value: Vec<u8>,
}

impl Attribute {
    /// Returns the PKCS#11 attribute 'type', which is the attribute id.
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.ck_type
    }

    /// Returns the internal semantic type.
    pub fn get_attrtype(&self) -> AttrType {
        self.attrtype
    }

    /// Returns a reference to the raw value bytes.
    pub fn get_value(&self) -> &Vec<u8> {
        &self.value
    }

    /// Returns the name of the attribute as an allocated String.
    pub fn name(&self) -> String {
        match Attrmap::search_by_id(self.ck_type) {
            Some(a) => a.name.to_string(),
            None => self.ck_type.to_string(),
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        if self.attrtype != AttrType::BoolType {
            return Err(Error::param("boolean attribute expected"));
        }
        if self.value.len() != 1 {
            return Err(Error::param("malformed boolean value"));
        }
        Ok(self.value[0] != 0)
    }

    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        if self.attrtype != AttrType::NumType {
            return Err(Error::param("numeric attribute expected"));
        }
        match self.value.as_slice().try_into() {
            Ok(bytes) => Ok(CK_ULONG::from_ne_bytes(bytes)),
            Err(_) => Err(Error::param("malformed numeric value")),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        if self.attrtype != AttrType::StringType {
            return Err(Error::param("text attribute expected"));
        }
        match std::str::from_utf8(&self.value) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(Error::param("attribute value is not UTF-8")),
        }
    }

    pub fn to_bytes(&self) -> Result<&Vec<u8>> {
        if self.attrtype != AttrType::BytesType {
            return Err(Error::param("byte string attribute expected"));
        }
        Ok(&self.value)
    }

    /// Zeroizes the internal value.
    pub fn zeroize(&mut self) {
        self.value.zeroize();
    }

    pub fn from_bool(t: CK_ATTRIBUTE_TYPE, val: bool) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BoolType,
            value: vec![if val { CK_TRUE } else { CK_FALSE }],
        }
    }

    pub fn from_ulong(t: CK_ATTRIBUTE_TYPE, val: CK_ULONG) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::NumType,
            value: Vec::from(val.to_ne_bytes()),
        }
    }

    pub fn from_string(t: CK_ATTRIBUTE_TYPE, val: &str) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::StringType,
            value: Vec::from(val.as_bytes()),
        }
    }

    pub fn from_bytes(t: CK_ATTRIBUTE_TYPE, val: Vec<u8>) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BytesType,
            value: val,
        }
    }

    /// Constructs a typed attribute from raw value bytes, using the
    /// attribute map to find the semantic type.
    pub fn from_raw(t: CK_ATTRIBUTE_TYPE, val: Vec<u8>) -> Result<Attribute> {
        let atype = match Attrmap::search_by_id(t) {
            Some(a) => a.atype,
            None => return Err(Error::UnknownAttribute(t)),
        };
        Ok(Attribute {
            ck_type: t,
            attrtype: atype,
            value: val,
        })
    }
}

/// An ordered sequence of attributes forming a search or creation
/// template. Built once per token call and never mutated after
/// submission.
#[derive(Debug, Clone, Default)]
pub struct Template {
    attrs: Vec<Attribute>,
}

impl Template {
    pub fn new() -> Template {
        Template { attrs: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Template {
        Template {
            attrs: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    pub fn add_bool(&mut self, t: CK_ATTRIBUTE_TYPE, val: bool) {
        self.attrs.push(Attribute::from_bool(t, val));
    }

    pub fn add_ulong(&mut self, t: CK_ATTRIBUTE_TYPE, val: CK_ULONG) {
        self.attrs.push(Attribute::from_ulong(t, val));
    }

    pub fn add_string(&mut self, t: CK_ATTRIBUTE_TYPE, val: &str) {
        self.attrs.push(Attribute::from_string(t, val));
    }

    pub fn add_bytes(&mut self, t: CK_ATTRIBUTE_TYPE, val: Vec<u8>) {
        self.attrs.push(Attribute::from_bytes(t, val));
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn as_slice(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Finds an attribute by id and returns a reference to it if
    /// present.
    pub fn find_attr(&self, t: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.get_type() == t)
    }
}

impl<'a> IntoIterator for &'a Template {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}
