//! Internal module for establishing the TLS connection to the IMAP server.

use rustls::ClientConfig;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};
use webpki_roots::TLS_SERVER_ROOTS;

/// A TLS stream over TCP, used for IMAP communication.
pub(crate) type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Low-level connection failures.
///
/// These stay internal; the mailbox adapter boxes them into
/// [`Error::MailboxConnect`](crate::Error::MailboxConnect) at the seam.
#[derive(Debug, Error)]
pub(crate) enum ConnectError {
    /// The host is not a valid DNS name for TLS SNI.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        host: String,
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    /// TCP connect failed.
    #[error("failed to connect to {target}")]
    Tcp {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS handshake failed.
    #[error("TLS handshake with {target} failed")]
    Tls {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

/// Establishes a TLS connection to the IMAP server.
#[instrument(
    name = "connection::establish_tls",
    skip_all,
    fields(imap_host = %imap_host, target_addr = %target_addr)
)]
pub(crate) async fn establish_tls_connection(
    imap_host: &str,
    target_addr: &str,
) -> Result<TlsStream, ConnectError> {
    let connector = create_tls_connector();
    let server_name = parse_server_name(imap_host)?;

    debug!("establishing TCP connection");
    let tcp_stream =
        TcpStream::connect(target_addr)
            .await
            .map_err(|source| ConnectError::Tcp {
                target: target_addr.to_string(),
                source,
            })?;

    debug!("performing TLS handshake");
    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|source| ConnectError::Tls {
            target: target_addr.to_string(),
            source,
        })
}

/// Creates a TLS connector with the bundled root certificates.
fn create_tls_connector() -> TlsConnector {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let tls_config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(tls_config))
}

/// Parses server name for TLS SNI.
fn parse_server_name(host: &str) -> Result<rustls::ServerName, ConnectError> {
    rustls::ServerName::try_from(host).map_err(|source| ConnectError::InvalidDnsName {
        host: host.to_string(),
        source,
    })
}
