use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::config::Config;
use crate::error::{Error, Result};

impl Config {
    /// Build a TLS client configuration from the current context's cluster
    /// (CA certificate, skip-verify flag) and user (client certificate/key).
    ///
    /// All referenced paths support `~` and `~user` expansion. With
    /// `insecure-skip-tls-verify` set, server certificates are not validated
    /// and the CA path is never read. Without a CA and without skip-verify
    /// the root store is empty, so every server certificate will be rejected
    /// at connect time.
    pub fn tls_client_config(&self) -> Result<ClientConfig> {
        // Both rustls backends are compiled in (reqwest pulls in `ring`), so
        // the provider must be selected explicitly before building a config.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let cluster = &self.current_cluster()?.cluster;

        let builder = if cluster.insecure_skip_tls_verify {
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(DisabledServerVerification))
        } else {
            let mut roots = RootCertStore::empty();
            if let Some(ca_path) = &cluster.certificate_authority {
                for cert in load_certs(ca_path)? {
                    roots
                        .add(cert)
                        .map_err(|e| Error::Cert(format!("invalid CA certificate in {ca_path}: {e}")))?;
                }
            }
            ClientConfig::builder().with_root_certificates(roots)
        };

        let identity = match self.current_user()? {
            Some(named) => {
                let user = &named.user;
                match (&user.client_certificate, &user.client_key) {
                    (Some(cert_path), Some(key_path)) => {
                        Some((load_certs(cert_path)?, load_private_key(key_path)?))
                    }
                    _ => None,
                }
            }
            None => None,
        };

        let config = match identity {
            Some((certs, key)) => builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| Error::Cert(format!("client certificate rejected: {e}")))?,
            None => builder.with_no_client_auth(),
        };

        Ok(config)
    }
}

/// Expand a leading `~` or `~user` to the corresponding home directory.
/// Paths without a tilde pass through untouched.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };

    if rest.is_empty() || rest.starts_with('/') {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Path("home directory cannot be determined".to_string()))?;
        return Ok(home.join(rest.trim_start_matches('/')));
    }

    let (user, tail) = match rest.split_once('/') {
        Some((user, tail)) => (user, tail),
        None => (rest, ""),
    };
    let home = user_home_dir(user)?;
    Ok(home.join(tail))
}

/// Home directory of another user, from the system account database.
fn user_home_dir(user: &str) -> Result<PathBuf> {
    let passwd = fs::read_to_string("/etc/passwd")
        .map_err(|e| Error::Path(format!("cannot read account database: {e}")))?;
    passwd
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let home = fields.nth(4)?;
            (name == user).then(|| PathBuf::from(home))
        })
        .next()
        .ok_or_else(|| Error::Path(format!("unknown user {user:?}")))
}

fn read_expanded(path: &str) -> Result<Vec<u8>> {
    let expanded = expand_home(path)?;
    fs::read(&expanded).map_err(|e| Error::Path(format!("cannot read {}: {e}", expanded.display())))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let pem = read_expanded(path)?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<std::io::Result<_>>()
        .map_err(|e| Error::Cert(format!("malformed PEM in {path}: {e}")))?;
    if certs.is_empty() {
        return Err(Error::Cert(format!("no certificates found in {path}")));
    }
    Ok(certs)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let pem = read_expanded(path)?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|e| Error::Cert(format!("malformed PEM in {path}: {e}")))?
        .ok_or_else(|| Error::Cert(format!("no private key found in {path}")))
}

/// Accept-all verifier backing `insecure-skip-tls-verify`.
#[derive(Debug)]
struct DisabledServerVerification;

impl ServerCertVerifier for DisabledServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
