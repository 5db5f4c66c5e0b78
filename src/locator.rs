// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Key object location.
//!
//! Translates a typed identity and capability filter into a PKCS#11
//! search template and runs the three-call find sequence, enforcing
//! the uniqueness rules the rest of the engine relies on.

use log::debug;

use crate::attribute::Template;
use crate::capability::KeyClass;
use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::session::KeySession;

/// Handles fetched per FindObjects call.
const FIND_CHUNK: usize = 32;

/// Identifies key objects by id bytes and/or label text within one
/// object class.
#[derive(Debug, Clone, Default)]
pub struct KeyIdentity {
    pub id: Option<Vec<u8>>,
    pub label: Option<String>,
}

impl KeyIdentity {
    pub fn by_id(id: Vec<u8>) -> KeyIdentity {
        KeyIdentity {
            id: Some(id),
            label: None,
        }
    }

    pub fn by_label(label: &str) -> KeyIdentity {
        KeyIdentity {
            id: None,
            label: Some(label.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.label.is_none()
    }
}

/// Optional wrap/unwrap capability constraints on a search.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityFilter {
    pub wrap: Option<bool>,
    pub unwrap: Option<bool>,
}

fn search_template(
    identity: &KeyIdentity,
    filter: &CapabilityFilter,
    class: KeyClass,
) -> Template {
    let mut tmpl = Template::with_capacity(5);
    if let Some(label) = &identity.label {
        tmpl.add_string(CKA_LABEL, label);
    }
    if let Some(id) = &identity.id {
        tmpl.add_bytes(CKA_ID, id.clone());
    }
    if let Some(wrap) = filter.wrap {
        tmpl.add_bool(CKA_WRAP, wrap);
    }
    if let Some(unwrap) = filter.unwrap {
        tmpl.add_bool(CKA_UNWRAP, unwrap);
    }
    tmpl.add_ulong(CKA_CLASS, class.to_ck());
    tmpl
}

impl KeySession<'_> {
    /// Finds all key objects matching the identity, filter and class.
    ///
    /// An identity with neither id nor label is a valid match-by-class
    /// query here. Zero matches is an empty vector, not an error.
    pub fn find_key_handles(
        &self,
        identity: &KeyIdentity,
        filter: &CapabilityFilter,
        class: KeyClass,
    ) -> Result<Vec<CK_OBJECT_HANDLE>> {
        let tmpl = search_template(identity, filter, class);
        match self
            .backend()
            .find_objects_init(self.handle(), &tmpl)
        {
            Ok(()) => (),
            Err(rv) => return Err(Error::token("object search init", rv)),
        }
        let mut handles = Vec::new();
        loop {
            if handles.len() == handles.capacity() {
                if handles.try_reserve(FIND_CHUNK).is_err() {
                    return Err(Error::ResourceExhausted);
                }
            }
            match self.backend().find_next_object(self.handle()) {
                Ok(Some(h)) => handles.push(h),
                Ok(None) => break,
                Err(rv) => return Err(Error::token("object search", rv)),
            }
        }
        match self.backend().find_objects_final(self.handle()) {
            Ok(()) => (),
            Err(rv) => return Err(Error::token("object search final", rv)),
        }
        debug!("search matched {} object(s)", handles.len());
        Ok(handles)
    }

    /// Finds exactly one key object.
    ///
    /// Requires at least one of id or label so a forgotten identity
    /// cannot silently select an arbitrary key. Zero matches is
    /// [Error::KeyNotFound], more than one is [Error::DuplicateKey].
    pub fn get_key_handle(
        &self,
        identity: &KeyIdentity,
        filter: &CapabilityFilter,
        class: KeyClass,
    ) -> Result<CK_OBJECT_HANDLE> {
        if identity.is_empty() {
            return Err(Error::InvalidQuery);
        }
        let handles = self.find_key_handles(identity, filter, class)?;
        match handles.len() {
            0 => Err(Error::KeyNotFound),
            1 => Ok(handles[0]),
            n => Err(Error::duplicate(format!(
                "{} objects match a unique key query",
                n
            ))),
        }
    }

    /// Checks whether any key object with this identity and class
    /// exists. Used as a pre-creation guard by the factory and the
    /// import paths.
    pub fn key_exists(
        &self,
        identity: &KeyIdentity,
        class: KeyClass,
    ) -> Result<bool> {
        let mut tmpl = Template::with_capacity(3);
        if let Some(id) = &identity.id {
            tmpl.add_bytes(CKA_ID, id.clone());
        }
        if let Some(label) = &identity.label {
            tmpl.add_string(CKA_LABEL, label);
        }
        tmpl.add_ulong(CKA_CLASS, class.to_ck());
        match self
            .backend()
            .find_objects_init(self.handle(), &tmpl)
        {
            Ok(()) => (),
            Err(rv) => return Err(Error::token("existence check init", rv)),
        }
        let found = match self.backend().find_next_object(self.handle()) {
            Ok(h) => h.is_some(),
            Err(rv) => return Err(Error::token("existence check", rv)),
        };
        match self.backend().find_objects_final(self.handle()) {
            Ok(()) => (),
            Err(rv) => return Err(Error::token("existence check final", rv)),
        }
        Ok(found)
    }
}
