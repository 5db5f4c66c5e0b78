// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

//! This is p11keys
//!
//! A key location, generation and wrapped-transfer engine over the
//! PKCS#11 standard API

pub mod pkcs11;

mod accessor;
mod attribute;
mod capability;
mod codec;
mod config;
mod der;
mod error;
mod factory;
mod locator;
mod logging;
mod module;
mod provider;
mod session;
mod transfer;

pub use accessor::AttrValue;
pub use attribute::{AttrType, Attribute, Template};
pub use capability::{Capability, CapabilityVector, KeyClass};
pub use config::Config;
pub use error::{Error, Result};
pub use locator::{CapabilityFilter, KeyIdentity};
pub use logging::log_init;
pub use module::Pkcs11Module;
pub use provider::{TokenBackend, TokenRv};
pub use session::KeySession;
pub use transfer::{KeyType, WrapMechanism};

#[cfg(test)]
mod tests;
