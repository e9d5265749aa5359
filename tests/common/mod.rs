//! Self-signed certificates and an in-process TLS server for tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use std::io::Read;
use std::net::TcpListener;
use std::thread;

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

/// Self-signed certificate valid from `now + not_before` to `now + not_after`.
pub fn certificate(
    key: &PKey<Private>,
    common_name: &str,
    not_before: Duration,
    not_after: Duration,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    let name = name.build();

    let now = Utc::now();
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix((now + not_before).timestamp()).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix((now + not_after).timestamp()).unwrap())
        .unwrap();
    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Serves `cert` on an ephemeral localhost port until the test process exits.
pub fn serve(cert: X509, key: PKey<Private>) -> u16 {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&key).unwrap();
    acceptor.set_certificate(&cert).unwrap();
    acceptor.check_private_key().unwrap();
    let acceptor = acceptor.build();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            if let Ok(mut tls) = acceptor.accept(stream) {
                let mut buf = [0u8; 1];
                let _ = tls.read(&mut buf);
                let _ = tls.shutdown();
            }
        }
    });

    port
}

/// Serves a fresh certificate expiring `not_after` from now.
pub fn serve_expiring_in(not_after: Duration) -> u16 {
    let key = ec_key();
    let cert = certificate(&key, "localhost", Duration::days(-400), not_after);
    serve(cert, key)
}
