// Copyright 2025 p11keys contributors
// See LICENSE.txt file for terms

use crate::pkcs11::*;
use crate::session::KeySession;


use token::MockToken;

pub const SESSION: CK_SESSION_HANDLE = 1;

fn session(token: &MockToken) -> KeySession<'_> {
    KeySession::new(token, SESSION)
}

mod attrs;
mod keys;
