// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Error taxonomy for the key management engine.
//!
//! Every operation reports the first failure it encounters as one of
//! the distinguishable kinds below; nothing is retried and nothing is
//! folded into a generic failure. Token-reported failures carry the
//! stage name and the raw `CK_RV` for diagnostics.

use std::error;
use std::fmt;

use crate::pkcs11::{CK_ATTRIBUTE_TYPE, CK_RV};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Neither id nor label was supplied for a lookup that needs a
    /// unique result.
    InvalidQuery,
    /// Out of range or wrong-shaped caller input.
    InvalidParameter(String),
    /// The query matched no object.
    KeyNotFound,
    /// An identity collision, either with a pre-existing object or
    /// between multiple search matches.
    DuplicateKey(String),
    /// Key material of a type this engine does not handle (only RSA
    /// and AES are implemented).
    UnsupportedKeyType(String),
    /// The object exists but has the wrong class for the requested
    /// operation.
    TypeMismatch(String),
    /// DER/ASN.1 structural failure while encoding or decoding.
    CodecError(Box<dyn error::Error + Send + Sync>),
    /// The object does not carry the requested attribute.
    AttributeNotFound(CK_ATTRIBUTE_TYPE),
    /// The attribute name is outside the recognized set.
    UnknownAttribute(CK_ATTRIBUTE_TYPE),
    /// A buffer allocation failed.
    ResourceExhausted,
    /// The token provider reported a failure; `stage` names the
    /// operation step that failed.
    TokenOperationFailed { stage: &'static str, rv: CK_RV },
}

impl Error {
    pub fn token(stage: &'static str, rv: CK_RV) -> Error {
        Error::TokenOperationFailed { stage, rv }
    }

    pub fn param<S: Into<String>>(msg: S) -> Error {
        Error::InvalidParameter(msg.into())
    }

    pub fn duplicate<S: Into<String>>(msg: S) -> Error {
        Error::DuplicateKey(msg.into())
    }

    pub fn codec<E>(origin: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error::CodecError(origin.into())
    }

    /// True for the errors a caller probing before create treats as a
    /// clean miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound | Error::AttributeNotFound(_))
    }

    /// The raw token return value, when this is a token failure.
    pub fn rv(&self) -> Option<CK_RV> {
        match self {
            Error::TokenOperationFailed { rv, .. } => Some(*rv),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidQuery => {
                write!(f, "key 'id' or 'label' required")
            }
            Error::InvalidParameter(msg) => {
                write!(f, "invalid parameter: {}", msg)
            }
            Error::KeyNotFound => write!(f, "key not found"),
            Error::DuplicateKey(msg) => write!(f, "{}", msg),
            Error::UnsupportedKeyType(what) => {
                write!(f, "unsupported key type: {}", what)
            }
            Error::TypeMismatch(msg) => write!(f, "{}", msg),
            Error::CodecError(origin) => {
                write!(f, "codec error: {}", origin)
            }
            Error::AttributeNotFound(attr) => {
                write!(f, "attribute {:#x} does not exist", attr)
            }
            Error::UnknownAttribute(attr) => {
                write!(f, "unknown attribute {:#x}", attr)
            }
            Error::ResourceExhausted => write!(f, "allocation failed"),
            Error::TokenOperationFailed { stage, rv } => {
                write!(f, "error at {}: {:#x}", stage, rv)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::CodecError(origin) => Some(origin.as_ref()),
            _ => None,
        }
    }
}

impl From<asn1::ParseError> for Error {
    fn from(error: asn1::ParseError) -> Error {
        Error::codec(error)
    }
}

impl From<asn1::WriteError> for Error {
    fn from(error: asn1::WriteError) -> Error {
        Error::codec(error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::param(error.to_string())
    }
}
