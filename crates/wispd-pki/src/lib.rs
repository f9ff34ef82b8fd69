//! certificate issuance for the openvpn management overlay.
//!
//! two operations: generating a root CA (done lazily, once, when the first
//! openvpn reconcile runs) and issuing short-lived ECDSA P-256 client
//! certificates for devices. persistence belongs to the caller; this crate
//! only turns parameters into PEM material.

#![warn(missing_docs)]

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, PKCS_ECDSA_P256_SHA256, SerialNumber,
};

/// errors from certificate generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// key generation or signing failed.
    #[error("certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),

    /// a stored pem could not be parsed back into usable material.
    #[error("invalid stored {0} PEM")]
    BadPem(&'static str),

    /// a timestamp fell outside the representable range.
    #[error("invalid validity timestamp")]
    BadTimestamp,
}

/// freshly generated certificate material, ready to persist.
#[derive(Debug, Clone)]
pub struct GeneratedCert {
    /// pem-encoded certificate.
    pub cert_pem: String,
    /// pem-encoded private key.
    pub key_pem: String,
    /// validity window start.
    pub not_before: DateTime<Utc>,
    /// validity window end.
    pub not_after: DateTime<Utc>,
}

/// generate a self-signed root CA.
///
/// ECDSA P-256, `IsCA` with a zero max path length, key usages for signing
/// and revocation, valid from one hour in the past (clock-skew slack) until
/// `now + ttl_hours`.
pub fn generate_root_ca(name: &str, ttl_hours: u32, now: DateTime<Utc>) -> Result<GeneratedCert, Error> {
    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

    let (not_before, not_after) = validity(now, ttl_hours);
    let mut params = CertificateParams::default();
    params.distinguished_name = common_name(name);
    params.serial_number = Some(random_serial());
    params.not_before = to_offset(not_before)?;
    params.not_after = to_offset(not_after)?;
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
    params.key_usages = vec![
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];

    let cert = params.self_signed(&key_pair)?;
    Ok(GeneratedCert {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        not_before,
        not_after,
    })
}

/// issue a device client certificate signed by a stored CA.
///
/// ECDSA P-256, CN = the device uuid, `ClientAuth` extended key usage,
/// random 128-bit serial, same validity slack as the CA.
pub fn issue_device_cert(
    ca_cert_pem: &str,
    ca_key_pem: &str,
    cn: &str,
    ttl_hours: u32,
    now: DateTime<Utc>,
) -> Result<GeneratedCert, Error> {
    let ca_key = KeyPair::from_pem(ca_key_pem).map_err(|_| Error::BadPem("CA key"))?;
    let ca_params =
        CertificateParams::from_ca_cert_pem(ca_cert_pem).map_err(|_| Error::BadPem("CA cert"))?;
    let ca_cert = ca_params.self_signed(&ca_key)?;

    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

    let (not_before, not_after) = validity(now, ttl_hours);
    let mut params = CertificateParams::default();
    params.distinguished_name = common_name(cn);
    params.serial_number = Some(random_serial());
    params.not_before = to_offset(not_before)?;
    params.not_after = to_offset(not_after)?;
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];

    let cert = params.signed_by(&key_pair, &ca_cert, &ca_key)?;
    Ok(GeneratedCert {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        not_before,
        not_after,
    })
}

/// validity window: one hour of backdating against clock skew.
fn validity(now: DateTime<Utc>, ttl_hours: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::hours(1), now + Duration::hours(i64::from(ttl_hours)))
}

fn common_name(cn: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    dn
}

/// random 128-bit serial number.
fn random_serial() -> SerialNumber {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    SerialNumber::from(bytes.to_vec())
}

fn to_offset(dt: DateTime<Utc>) -> Result<time::OffsetDateTime, Error> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp()).map_err(|_| Error::BadTimestamp)
}

#[cfg(test)]
mod tests {
    use x509_parser::prelude::*;

    use super::*;

    fn parse(pem: &str) -> Vec<u8> {
        let (_, parsed) = x509_parser::pem::parse_x509_pem(pem.as_bytes()).unwrap();
        parsed.contents
    }

    #[test]
    fn root_ca_has_expected_shape() {
        let now = Utc::now();
        let ca = generate_root_ca("Test CA", 24, now).unwrap();

        assert!(ca.cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(ca.key_pem.contains("PRIVATE KEY"));
        assert_eq!(ca.not_before, now - Duration::hours(1));
        assert_eq!(ca.not_after, now + Duration::hours(24));

        let der = parse(&ca.cert_pem);
        let (_, cert) = X509Certificate::from_der(&der).unwrap();
        assert!(cert.is_ca());
        assert!(cert.subject().to_string().contains("Test CA"));
        // self-signed
        assert_eq!(cert.subject(), cert.issuer());
    }

    #[test]
    fn device_cert_is_client_auth_signed_by_ca() {
        let now = Utc::now();
        let ca = generate_root_ca("Test CA", 24, now).unwrap();
        let device = issue_device_cert(
            &ca.cert_pem,
            &ca.key_pem,
            "11111111-2222-3333-4444-555555555555",
            24,
            now,
        )
        .unwrap();

        let der = parse(&device.cert_pem);
        let (_, cert) = X509Certificate::from_der(&der).unwrap();
        assert!(!cert.is_ca());
        assert!(
            cert.subject()
                .to_string()
                .contains("11111111-2222-3333-4444-555555555555")
        );
        assert!(cert.issuer().to_string().contains("Test CA"));

        let eku = cert.extended_key_usage().unwrap().unwrap();
        assert!(eku.value.client_auth);
    }

    #[test]
    fn serials_are_unique_across_issuance() {
        let now = Utc::now();
        let ca = generate_root_ca("Test CA", 24, now).unwrap();
        let a = issue_device_cert(&ca.cert_pem, &ca.key_pem, "dev", 24, now).unwrap();
        let b = issue_device_cert(&ca.cert_pem, &ca.key_pem, "dev", 24, now).unwrap();

        let der_a = parse(&a.cert_pem);
        let der_b = parse(&b.cert_pem);
        let (_, cert_a) = X509Certificate::from_der(&der_a).unwrap();
        let (_, cert_b) = X509Certificate::from_der(&der_b).unwrap();
        assert_ne!(cert_a.raw_serial(), cert_b.raw_serial());
    }

    #[test]
    fn issuing_from_garbage_pem_fails_cleanly() {
        let now = Utc::now();
        let err = issue_device_cert("not pem", "not pem", "dev", 1, now).unwrap_err();
        assert!(matches!(err, Error::BadPem(_)));
    }
}
