//! Key derivation and integrity primitives for the EAP methods.

pub mod fips_prf;
pub mod keys;
pub mod mac;
pub mod mschapv2;
