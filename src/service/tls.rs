use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use super::{AppError, AppResult};

/// Loads a PEM certificate chain and private key into a server-side TLS
/// configuration with no client authentication. The returned handle is meant
/// to be shared between the caller and any acceptors built from it.
pub fn load_tls_config<C, K>(cert_file: C, key_file: K) -> AppResult<Arc<rustls::ServerConfig>>
where
    C: AsRef<Path>,
    K: AsRef<Path>,
{
    let mut cert_reader = BufReader::new(File::open(cert_file.as_ref())?);
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_reader).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(AppError::InvalidValue(format!(
            "no certificates found in {}",
            cert_file.as_ref().to_string_lossy()
        )));
    }

    let mut key_reader = BufReader::new(File::open(key_file.as_ref())?);
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_reader)?.ok_or_else(
        || {
            AppError::InvalidValue(format!(
                "no private key found in {}",
                key_file.as_ref().to_string_lossy()
            ))
        },
    )?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_self_signed_pair() {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("server.crt");
        let key_path = dir.path().join("server.key");
        std::fs::write(&cert_path, certified.cert.pem()).unwrap();
        std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();

        let config = load_tls_config(&cert_path, &key_path).unwrap();
        assert_eq!(Arc::strong_count(&config), 1);
    }

    #[test]
    fn missing_certificate_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_tls_config(dir.path().join("absent.crt"), dir.path().join("absent.key"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn empty_key_file_is_rejected() {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("server.crt");
        let key_path = dir.path().join("server.key");
        std::fs::write(&cert_path, certified.cert.pem()).unwrap();
        std::fs::write(&key_path, "").unwrap();

        let result = load_tls_config(&cert_path, &key_path);
        assert!(matches!(result, Err(AppError::InvalidValue(_))));
    }
}
