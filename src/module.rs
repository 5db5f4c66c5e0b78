// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! Loading and driving a PKCS#11 module.
//!
//! [Pkcs11Module] dlopens a vendor module, resolves its function list
//! and implements [TokenBackend] over it. All unsafe FFI lives here;
//! nothing above this module touches raw pointers.

use log::{debug, error};

use crate::attribute::{Attribute, Template};
use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::provider::{TokenBackend, TokenRv};

/// Resolves a function pointer from the module's function list or
/// fails the call with CKR_GENERAL_ERROR.
macro_rules! ck_fn {
    ($module:expr, $name:ident) => {
        match $module.funcs.$name {
            Some(f) => f,
            None => return Err(CKR_GENERAL_ERROR),
        }
    };
}

fn ck_rv(rv: CK_RV) -> TokenRv<()> {
    if rv == CKR_OK {
        Ok(())
    } else {
        Err(rv)
    }
}

fn ck_attrs(template: &Template) -> Vec<CK_ATTRIBUTE> {
    let mut attrs = Vec::with_capacity(template.len());
    for attr in template {
        attrs.push(CK_ATTRIBUTE {
            type_: attr.get_type(),
            pValue: attr.get_value().as_ptr() as CK_VOID_PTR,
            ulValueLen: attr.get_value().len() as CK_ULONG,
        });
    }
    attrs
}

/// A loaded PKCS#11 module.
///
/// The library handle is kept alive for as long as any function
/// pointer from its list may be called.
pub struct Pkcs11Module {
    _lib: libloading::Library,
    funcs: CK_FUNCTION_LIST,
}

impl Pkcs11Module {
    /// Loads the module at `path` and resolves its function list.
    pub fn load(path: &str) -> Result<Pkcs11Module> {
        type GetFunctionList =
            unsafe extern "C" fn(*mut CK_FUNCTION_LIST_PTR) -> CK_RV;

        let lib = unsafe {
            match libloading::Library::new(path) {
                Ok(l) => l,
                Err(e) => {
                    error!("failed to load PKCS#11 module {}: {}", path, e);
                    return Err(Error::param(format!(
                        "cannot load PKCS#11 module {}: {}",
                        path, e
                    )));
                }
            }
        };
        let mut list: CK_FUNCTION_LIST_PTR = std::ptr::null_mut();
        let rv = unsafe {
            let get_list: libloading::Symbol<GetFunctionList> =
                match lib.get(b"C_GetFunctionList\0") {
                    Ok(s) => s,
                    Err(e) => {
                        return Err(Error::param(format!(
                            "{} exports no C_GetFunctionList: {}",
                            path, e
                        )))
                    }
                };
            get_list(&mut list)
        };
        if rv != CKR_OK {
            return Err(Error::token("get function list", rv));
        }
        if list.is_null() {
            return Err(Error::token("get function list", CKR_GENERAL_ERROR));
        }
        debug!("loaded PKCS#11 module {}", path);
        Ok(Pkcs11Module {
            _lib: lib,
            funcs: unsafe { *list },
        })
    }

    /// Initializes the module. Must precede any session call.
    pub fn initialize(&self) -> Result<()> {
        let f = match self.funcs.C_Initialize {
            Some(f) => f,
            None => {
                return Err(Error::token("initialize", CKR_GENERAL_ERROR))
            }
        };
        let rv = unsafe { f(std::ptr::null_mut()) };
        if rv != CKR_OK {
            return Err(Error::token("initialize", rv));
        }
        Ok(())
    }

    pub fn finalize(&self) -> Result<()> {
        let f = match self.funcs.C_Finalize {
            Some(f) => f,
            None => return Err(Error::token("finalize", CKR_GENERAL_ERROR)),
        };
        let rv = unsafe { f(std::ptr::null_mut()) };
        if rv != CKR_OK {
            return Err(Error::token("finalize", rv));
        }
        Ok(())
    }

    /// Opens a read-write serial session on `slot`.
    pub fn open_session(&self, slot: CK_SLOT_ID) -> Result<CK_SESSION_HANDLE> {
        let f = match self.funcs.C_OpenSession {
            Some(f) => f,
            None => {
                return Err(Error::token("open session", CKR_GENERAL_ERROR))
            }
        };
        let mut handle: CK_SESSION_HANDLE = CK_INVALID_HANDLE;
        let rv = unsafe {
            f(
                slot,
                CKF_SERIAL_SESSION | CKF_RW_SESSION,
                std::ptr::null_mut(),
                None,
                &mut handle,
            )
        };
        if rv != CKR_OK {
            return Err(Error::token("open session", rv));
        }
        Ok(handle)
    }

    pub fn close_session(&self, session: CK_SESSION_HANDLE) -> Result<()> {
        let f = match self.funcs.C_CloseSession {
            Some(f) => f,
            None => {
                return Err(Error::token("close session", CKR_GENERAL_ERROR))
            }
        };
        let rv = unsafe { f(session) };
        if rv != CKR_OK {
            return Err(Error::token("close session", rv));
        }
        Ok(())
    }

    /// Logs the user in. A session that is already authenticated is
    /// not an error.
    pub fn login(&self, session: CK_SESSION_HANDLE, pin: &str) -> Result<()> {
        let f = match self.funcs.C_Login {
            Some(f) => f,
            None => return Err(Error::token("login", CKR_GENERAL_ERROR)),
        };
        let rv = unsafe {
            f(
                session,
                CKU_USER,
                pin.as_ptr() as *mut CK_BYTE,
                pin.len() as CK_ULONG,
            )
        };
        match rv {
            CKR_OK | CKR_USER_ALREADY_LOGGED_IN => Ok(()),
            _ => Err(Error::token("login", rv)),
        }
    }

    pub fn logout(&self, session: CK_SESSION_HANDLE) -> Result<()> {
        let f = match self.funcs.C_Logout {
            Some(f) => f,
            None => return Err(Error::token("logout", CKR_GENERAL_ERROR)),
        };
        let rv = unsafe { f(session) };
        match rv {
            CKR_OK | CKR_USER_NOT_LOGGED_IN => Ok(()),
            _ => Err(Error::token("logout", rv)),
        }
    }
}

impl TokenBackend for Pkcs11Module {
    fn find_objects_init(
        &self,
        session: CK_SESSION_HANDLE,
        template: &Template,
    ) -> TokenRv<()> {
        let f = ck_fn!(self, C_FindObjectsInit);
        let mut attrs = ck_attrs(template);
        ck_rv(unsafe {
            f(session, attrs.as_mut_ptr(), attrs.len() as CK_ULONG)
        })
    }

    fn find_next_object(
        &self,
        session: CK_SESSION_HANDLE,
    ) -> TokenRv<Option<CK_OBJECT_HANDLE>> {
        let f = ck_fn!(self, C_FindObjects);
        let mut handle: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
        let mut count: CK_ULONG = 0;
        ck_rv(unsafe { f(session, &mut handle, 1, &mut count) })?;
        if count == 0 {
            Ok(None)
        } else {
            Ok(Some(handle))
        }
    }

    fn find_objects_final(&self, session: CK_SESSION_HANDLE) -> TokenRv<()> {
        let f = ck_fn!(self, C_FindObjectsFinal);
        ck_rv(unsafe { f(session) })
    }

    fn create_object(
        &self,
        session: CK_SESSION_HANDLE,
        template: &Template,
    ) -> TokenRv<CK_OBJECT_HANDLE> {
        let f = ck_fn!(self, C_CreateObject);
        let mut attrs = ck_attrs(template);
        let mut handle: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
        ck_rv(unsafe {
            f(
                session,
                attrs.as_mut_ptr(),
                attrs.len() as CK_ULONG,
                &mut handle,
            )
        })?;
        Ok(handle)
    }

    fn generate_key(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        template: &Template,
    ) -> TokenRv<CK_OBJECT_HANDLE> {
        let f = ck_fn!(self, C_GenerateKey);
        let mut mech = CK_MECHANISM {
            mechanism: mechanism,
            pParameter: std::ptr::null_mut(),
            ulParameterLen: 0,
        };
        let mut attrs = ck_attrs(template);
        let mut handle: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
        ck_rv(unsafe {
            f(
                session,
                &mut mech,
                attrs.as_mut_ptr(),
                attrs.len() as CK_ULONG,
                &mut handle,
            )
        })?;
        Ok(handle)
    }

    fn generate_key_pair(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        public_template: &Template,
        private_template: &Template,
    ) -> TokenRv<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        let f = ck_fn!(self, C_GenerateKeyPair);
        let mut mech = CK_MECHANISM {
            mechanism: mechanism,
            pParameter: std::ptr::null_mut(),
            ulParameterLen: 0,
        };
        let mut pub_attrs = ck_attrs(public_template);
        let mut priv_attrs = ck_attrs(private_template);
        let mut public: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
        let mut private: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
        ck_rv(unsafe {
            f(
                session,
                &mut mech,
                pub_attrs.as_mut_ptr(),
                pub_attrs.len() as CK_ULONG,
                priv_attrs.as_mut_ptr(),
                priv_attrs.len() as CK_ULONG,
                &mut public,
                &mut private,
            )
        })?;
        Ok((public, private))
    }

    fn get_attribute_value(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
        buf: Option<&mut [u8]>,
    ) -> TokenRv<CK_ULONG> {
        let f = ck_fn!(self, C_GetAttributeValue);
        let mut attr = match buf {
            Some(b) => CK_ATTRIBUTE {
                type_: attribute,
                pValue: b.as_mut_ptr() as CK_VOID_PTR,
                ulValueLen: b.len() as CK_ULONG,
            },
            None => CK_ATTRIBUTE {
                type_: attribute,
                pValue: std::ptr::null_mut() as CK_VOID_PTR,
                ulValueLen: 0,
            },
        };
        ck_rv(unsafe { f(session, object, &mut attr, 1) })?;
        Ok(attr.ulValueLen)
    }

    fn set_attribute_value(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
        attribute: &Attribute,
    ) -> TokenRv<()> {
        let f = ck_fn!(self, C_SetAttributeValue);
        let mut attr = CK_ATTRIBUTE {
            type_: attribute.get_type(),
            pValue: attribute.get_value().as_ptr() as CK_VOID_PTR,
            ulValueLen: attribute.get_value().len() as CK_ULONG,
        };
        ck_rv(unsafe { f(session, object, &mut attr, 1) })
    }

    fn wrap_key(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        wrapping_key: CK_OBJECT_HANDLE,
        key: CK_OBJECT_HANDLE,
        buf: Option<&mut [u8]>,
    ) -> TokenRv<CK_ULONG> {
        let f = ck_fn!(self, C_WrapKey);
        let mut mech = CK_MECHANISM {
            mechanism: mechanism,
            pParameter: std::ptr::null_mut(),
            ulParameterLen: 0,
        };
        let (ptr, mut len) = match buf {
            Some(b) => (b.as_mut_ptr(), b.len() as CK_ULONG),
            None => (std::ptr::null_mut(), 0),
        };
        ck_rv(unsafe {
            f(session, &mut mech, wrapping_key, key, ptr, &mut len)
        })?;
        Ok(len)
    }

    fn unwrap_key(
        &self,
        session: CK_SESSION_HANDLE,
        mechanism: CK_MECHANISM_TYPE,
        unwrapping_key: CK_OBJECT_HANDLE,
        wrapped: &[u8],
        template: &Template,
    ) -> TokenRv<CK_OBJECT_HANDLE> {
        let f = ck_fn!(self, C_UnwrapKey);
        let mut mech = CK_MECHANISM {
            mechanism: mechanism,
            pParameter: std::ptr::null_mut(),
            ulParameterLen: 0,
        };
        let mut attrs = ck_attrs(template);
        let mut handle: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
        ck_rv(unsafe {
            f(
                session,
                &mut mech,
                unwrapping_key,
                wrapped.as_ptr() as *mut CK_BYTE,
                wrapped.len() as CK_ULONG,
                attrs.as_mut_ptr(),
                attrs.len() as CK_ULONG,
                &mut handle,
            )
        })?;
        Ok(handle)
    }

    fn destroy_object(
        &self,
        session: CK_SESSION_HANDLE,
        object: CK_OBJECT_HANDLE,
    ) -> TokenRv<()> {
        let f = ck_fn!(self, C_DestroyObject);
        ck_rv(unsafe { f(session, object) })
    }
}
