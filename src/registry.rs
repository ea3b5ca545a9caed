//! Server identities and the client registry.
//!
//! A path's "drive" names the server it lives on. The registry maps each
//! normalized [`ServerIdentity`] to one shared authenticated client, so
//! paths resolve "which server do I talk to" without re-authenticating.
//! It is an explicit object with a reset hook rather than a process-wide
//! singleton, so tests can tear it down between runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::api::AlistClient;
use crate::error::{AlistError, Result};
use crate::path::AlistPath;

/// Normalized (scheme, host, port) triple identifying one AList server.
///
/// URLs differing only in default-port notation (`:80` under `http`,
/// `:443` under `https`) normalize to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerIdentity {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl ServerIdentity {
    /// Parse a server URL or drive string such as `https://host:5244`.
    /// Anything after the authority is ignored.
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| AlistError::InvalidPath(format!("no scheme in server url: {url}")))?;
        if scheme != "http" && scheme != "https" {
            return Err(AlistError::InvalidPath(format!(
                "unsupported scheme: {scheme}"
            )));
        }

        let authority = rest.split('/').next().unwrap_or("");
        if authority.is_empty() {
            return Err(AlistError::InvalidPath(format!("no host in server url: {url}")));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port_str)) if !port_str.is_empty() => {
                let port: u16 = port_str.parse().map_err(|_| {
                    AlistError::InvalidPath(format!("invalid port in server url: {url}"))
                })?;
                (host.to_string(), Some(port))
            }
            _ => (authority.to_string(), None),
        };

        // Default ports collapse to None so "host:80" and "host" compare equal.
        let port = match (scheme, port) {
            ("http", Some(80)) | ("https", Some(443)) => None,
            (_, port) => port,
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            port,
        })
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme, self.host, port),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

/// How to authenticate against a server on first contact.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-issued API token; used as-is.
    Token(String),
    /// Username and password (plus optional one-time code) for the login
    /// endpoint.
    Password {
        username: String,
        password: String,
        otp_code: Option<String>,
    },
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Password {
            username: username.into(),
            password: password.into(),
            otp_code: None,
        }
    }
}

/// Mapping from server identity to its authenticated client.
#[derive(Debug, Default)]
pub struct Registry {
    clients: Mutex<HashMap<ServerIdentity, Arc<AlistClient>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the client for `server`, creating and authenticating one on
    /// first contact. Idempotent: a known identity returns the existing
    /// client without re-authenticating.
    pub async fn login(&self, server: &str, credentials: Credentials) -> Result<Arc<AlistClient>> {
        let identity = ServerIdentity::parse(server)?;
        if let Some(existing) = self.get(&identity) {
            return Ok(existing);
        }

        let client = Arc::new(AlistClient::new(&identity.to_string())?);
        match credentials {
            Credentials::Token(token) => {
                client.set_token(token);
                client.me().await?;
            }
            Credentials::Password {
                username,
                password,
                otp_code,
            } => {
                client.login(&username, &password, otp_code.as_deref()).await?;
            }
        }

        let mut clients = self.clients.lock().expect("registry lock poisoned");
        // A racing login for the same identity may have won; keep the first.
        let entry = clients.entry(identity).or_insert_with(|| client.clone());
        Ok(entry.clone())
    }

    /// Already-registered client for `identity`, if any.
    pub fn get(&self, identity: &ServerIdentity) -> Option<Arc<AlistClient>> {
        self.clients
            .lock()
            .expect("registry lock poisoned")
            .get(identity)
            .cloned()
    }

    /// Register an externally-constructed client (tests, pre-built tokens).
    pub fn insert(&self, client: Arc<AlistClient>) -> Result<()> {
        let identity = ServerIdentity::parse(client.base_url())?;
        self.clients
            .lock()
            .expect("registry lock poisoned")
            .insert(identity, client);
        Ok(())
    }

    /// Bind a fully-qualified path string to its registered client.
    pub fn path(&self, s: &str) -> Result<AlistPath> {
        let pure = crate::path::PureAlistPath::new(s);
        let drive = pure.drive();
        if drive.is_empty() {
            return Err(AlistError::InvalidPath(format!(
                "path has no server drive: {s}"
            )));
        }
        let identity = ServerIdentity::parse(drive)?;
        let client = self
            .get(&identity)
            .ok_or_else(|| AlistError::UnknownServer(drive.to_string()))?;
        Ok(AlistPath::bound(pure, client))
    }

    /// Drop every registered client. Test lifecycle hook.
    pub fn reset(&self) {
        self.clients.lock().expect("registry lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parsing() {
        let id = ServerIdentity::parse("https://server:5244/some/path").unwrap();
        assert_eq!(id.scheme, "https");
        assert_eq!(id.host, "server");
        assert_eq!(id.port, Some(5244));
        assert_eq!(id.to_string(), "https://server:5244");
    }

    #[test]
    fn test_default_ports_normalize_away() {
        let plain = ServerIdentity::parse("http://server").unwrap();
        let with_port = ServerIdentity::parse("http://server:80").unwrap();
        assert_eq!(plain, with_port);
        assert_eq!(with_port.to_string(), "http://server");

        let tls = ServerIdentity::parse("https://server:443").unwrap();
        assert_eq!(tls, ServerIdentity::parse("https://server").unwrap());

        // A non-default port is preserved.
        let custom = ServerIdentity::parse("http://server:5244").unwrap();
        assert_ne!(plain, custom);
    }

    #[test]
    fn test_identity_rejects_bad_urls() {
        assert!(ServerIdentity::parse("server:5244").is_err());
        assert!(ServerIdentity::parse("ftp://server").is_err());
        assert!(ServerIdentity::parse("http://server:notaport").is_err());
        assert!(ServerIdentity::parse("http://").is_err());
    }

    #[test]
    fn test_registry_reset_and_unknown_server() {
        let registry = Registry::new();
        let client = Arc::new(AlistClient::new("http://server:5244").unwrap());
        registry.insert(client).unwrap();

        let identity = ServerIdentity::parse("http://server:5244").unwrap();
        assert!(registry.get(&identity).is_some());
        assert!(registry.path("http://server:5244/local/f.txt").is_ok());

        registry.reset();
        assert!(registry.get(&identity).is_none());
        match registry.path("http://server:5244/local/f.txt") {
            Err(AlistError::UnknownServer(drive)) => assert_eq!(drive, "http://server:5244"),
            other => panic!("expected UnknownServer, got {other:?}"),
        }
    }

    #[test]
    fn test_registry_path_requires_drive() {
        let registry = Registry::new();
        assert!(matches!(
            registry.path("/local/f.txt"),
            Err(AlistError::InvalidPath(_))
        ));
    }
}
