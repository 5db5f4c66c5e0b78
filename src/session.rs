// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! A logged-in token session bound to a backend.
//!
//! [KeySession] is the handle every engine operation hangs off. The
//! operations themselves live with their subject matter (locator,
//! factory, codec, transfer, accessor modules); this module holds the
//! session itself and the sized-buffer read primitive they share.

use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::provider::{TokenBackend, TokenRv};

/// How a sized read failed, before translation into engine errors.
pub(crate) enum SizedReadError {
    /// The length query failed.
    Size(CK_RV),
    /// The fill call failed.
    Fill(CK_RV),
    /// The token reported the value unavailable.
    Unavailable,
    /// The buffer allocation failed.
    Exhausted,
}

/// Runs a two-phase token call: a length query with no buffer, then
/// the same call again with a buffer of the reported size. A zero
/// length skips the fill call.
///
/// All output-producing token calls (attribute reads, key wrapping)
/// go through here so the buffer handling exists once.
pub(crate) fn read_sized_buf<F>(
    mut call: F,
) -> std::result::Result<Vec<u8>, SizedReadError>
where
    F: FnMut(Option<&mut [u8]>) -> TokenRv<CK_ULONG>,
{
    let len = call(None).map_err(SizedReadError::Size)?;
    if len == CK_UNAVAILABLE_INFORMATION {
        return Err(SizedReadError::Unavailable);
    }
    let size =
        usize::try_from(len).map_err(|_| SizedReadError::Exhausted)?;
    if size == 0 {
        return Ok(Vec::new());
    }
    let mut buf = Vec::new();
    if buf.try_reserve_exact(size).is_err() {
        return Err(SizedReadError::Exhausted);
    }
    buf.resize(size, 0);
    let filled = call(Some(&mut buf)).map_err(SizedReadError::Fill)?;
    if filled == CK_UNAVAILABLE_INFORMATION {
        return Err(SizedReadError::Unavailable);
    }
    buf.truncate(
        usize::try_from(filled).map_err(|_| SizedReadError::Exhausted)?,
    );
    Ok(buf)
}

/// A session on a token, open and authenticated by the caller.
///
/// The session borrows the backend; sessions are cheap and a caller
/// can hold several against one module.
pub struct KeySession<'a> {
    backend: &'a dyn TokenBackend,
    handle: CK_SESSION_HANDLE,
}

impl<'a> KeySession<'a> {
    pub fn new(
        backend: &'a dyn TokenBackend,
        handle: CK_SESSION_HANDLE,
    ) -> KeySession<'a> {
        KeySession {
            backend: backend,
            handle: handle,
        }
    }

    pub(crate) fn backend(&self) -> &dyn TokenBackend {
        self.backend
    }

    pub(crate) fn handle(&self) -> CK_SESSION_HANDLE {
        self.handle
    }

    /// Reads one attribute of an object through [read_sized_buf].
    ///
    /// A token that reports the attribute type invalid, or an
    /// unavailable length, does not carry the attribute on this
    /// object; both map to [Error::AttributeNotFound].
    pub(crate) fn read_attr_bytes(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
        stage: &'static str,
    ) -> Result<Vec<u8>> {
        match read_sized_buf(|buf| {
            self.backend.get_attribute_value(
                self.handle,
                object,
                attribute,
                buf,
            )
        }) {
            Ok(value) => Ok(value),
            Err(SizedReadError::Size(CKR_ATTRIBUTE_TYPE_INVALID))
            | Err(SizedReadError::Fill(CKR_ATTRIBUTE_TYPE_INVALID))
            | Err(SizedReadError::Unavailable) => {
                Err(Error::AttributeNotFound(attribute))
            }
            Err(SizedReadError::Size(rv))
            | Err(SizedReadError::Fill(rv)) => Err(Error::token(stage, rv)),
            Err(SizedReadError::Exhausted) => Err(Error::ResourceExhausted),
        }
    }
}
