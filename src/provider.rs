// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! The token backend seam.
//!
//! Everything above this trait speaks typed attributes and engine
//! errors; everything below it speaks raw CK_RV. The production
//! implementation drives a loaded PKCS#11 library; tests substitute
//! an in-process token.

use crate::attribute::{Attribute, Template};
use crate::pkcs11::*;

/// Return type of raw token calls. The error side is the CK_RV value
/// the token returned, before any translation into engine errors.
pub type TokenRv<T> = std::result::Result<T, CK_RV>;

/// Operations the engine needs from a PKCS#11 token.
///
/// Length queries follow the two-phase convention: the attribute and
/// wrapping calls take an optional output buffer and report the
/// required or produced length, so one size query plus one fill call
/// covers both phases.
pub trait TokenBackend {
    fn find_objects_init(
        &self,
        session: CK_SESSION_HANDLE,
        template: &Template,
    ) -> TokenRv<()>;

    /// Fetches the next matching handle, or None when the enumeration
    /// is exhausted.
    fn find_next_object(
        &self,
        session: CK_SESSION_HANDLE,
    ) -> TokenRv<Option<CK_OBJECT_HANDLE>>;

    fn find_objects_final(&self, session: CK_SESSION_HANDLE) -> TokenRv<()>;

    fn create_object(
        &self,
        session: CK_SESSION_HANDLE,
        template: &Template,
    ) -> TokenRv<CK_OBJECT_HANDLE>;

    fn generate_key(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        template: &Template,
    ) -> TokenRv<CK_OBJECT_HANDLE>;

    fn generate_key_pair(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        public_template: &Template,
        private_template: &Template,
    ) -> TokenRv<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)>;

    /// Reads one attribute. With `buf` set to None this is a length
    /// query; otherwise the value is written into `buf`. Returns the
    /// length the token reported.
    fn get_attribute_value(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
        buf: Option<&mut [u8]>,
    ) -> TokenRv<CK_ULONG>;

    fn set_attribute_value(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        attribute: &Attribute,
    ) -> TokenRv<()>;

    /// Wraps `key` under `wrapping_key`. Same two-phase convention as
    /// [TokenBackend::get_attribute_value].
    fn wrap_key(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        wrapping_key: CK_OBJECT_HANDLE,
        key: CK_OBJECT_HANDLE,
        buf: Option<&mut [u8]>,
    ) -> TokenRv<CK_ULONG>;

    fn unwrap_key(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        unwrapping_key: CK_OBJECT_HANDLE,
        wrapped: &[u8],
        template: &Template,
    ) -> TokenRv<CK_OBJECT_HANDLE>;

    fn destroy_object(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
    ) -> TokenRv<()>;
}
