#![allow(dead_code)]

use samling::keys::loader::{load_certificates_pem, load_pem};
use samling::keys::Key;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn der(pem: &str) -> Vec<u8> {
    load_certificates_pem(pem.as_bytes()).unwrap().remove(0)
}

pub fn ca_der() -> Vec<u8> {
    der(include_str!("../../../samling-keys/testdata/ca-cert.pem"))
}

pub fn intermediate_der() -> Vec<u8> {
    der(include_str!("../../../samling-keys/testdata/intermediate-cert.pem"))
}

pub fn leaf_der() -> Vec<u8> {
    der(include_str!("../../../samling-keys/testdata/leaf-cert.pem"))
}

pub fn deep_leaf_der() -> Vec<u8> {
    der(include_str!("../../../samling-keys/testdata/deep-leaf-cert.pem"))
}

pub fn rogue_der() -> Vec<u8> {
    der(include_str!("../../../samling-keys/testdata/rogue-cert.pem"))
}

pub fn rsa_der() -> Vec<u8> {
    der(include_str!("../../../samling-keys/testdata/rsa-cert.pem"))
}

/// The leaf key, carrying its certificate.
pub fn leaf_key() -> Key {
    load_pem(include_bytes!("../../../samling-keys/testdata/leaf-key.pem"))
        .unwrap()
        .with_certificates(vec![leaf_der()])
}

/// A self-signed key pair claiming the leaf's subject.
pub fn rogue_key() -> Key {
    load_pem(include_bytes!("../../../samling-keys/testdata/rogue-key.pem"))
        .unwrap()
        .with_certificates(vec![rogue_der()])
}

pub fn rsa_key() -> Key {
    load_pem(include_bytes!("../../../samling-keys/testdata/rsa-key.pem"))
        .unwrap()
        .with_certificates(vec![rsa_der()])
}

/// Inside the validity period of every fixture certificate.
pub fn verification_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_900_000_000)
}
