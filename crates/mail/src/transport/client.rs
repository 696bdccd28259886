//! Blocking IMAP session

use imap::types::NameAttribute;
use log::{debug, info};
use native_tls::{TlsConnector, TlsStream};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};

use super::auth::XOAuth2;
use crate::config::{ImapAccount, ImapAuth};
use crate::models::{RawMailbox, Uid, attributes};
use crate::session::{MailSession, SearchCriteria, SessionError, uid_set};

type TlsSession = imap::Session<TlsStream<TcpStream>>;

impl From<imap::error::Error> for SessionError {
    fn from(err: imap::error::Error) -> Self {
        use imap::error::Error;

        match err {
            Error::Io(e) => classify_io(e),
            Error::ConnectionLost => SessionError::ConnectionLost,
            Error::No(msg) => SessionError::Rejected(format!("NO {msg}")),
            Error::Bad(msg) => SessionError::Rejected(format!("BAD {msg}")),
            Error::Tls(e) => SessionError::Tls(e.to_string()),
            other => SessionError::Protocol(other.to_string()),
        }
    }
}

/// Map socket errors onto timeout / lost connection where possible
fn classify_io(err: io::Error) -> SessionError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => SessionError::Timeout,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => SessionError::ConnectionLost,
        _ => SessionError::Io(err),
    }
}

/// Convert a LIST attribute into its wire form (e.g. `\Noselect`)
#[allow(unreachable_patterns)]
fn attribute_name(attr: &NameAttribute<'_>) -> String {
    match attr {
        NameAttribute::NoSelect => attributes::NOSELECT.to_string(),
        NameAttribute::NoInferiors => "\\Noinferiors".to_string(),
        NameAttribute::Marked => "\\Marked".to_string(),
        NameAttribute::Unmarked => "\\Unmarked".to_string(),
        NameAttribute::Custom(name) => name.to_string(),
        other => format!("{other:?}"),
    }
}

/// Authenticated IMAP session over TLS
pub struct ImapSession {
    inner: TlsSession,
}

impl ImapSession {
    /// Connect, complete the TLS handshake and authenticate.
    ///
    /// The account timeout bounds the TCP connect and every later read
    /// and write on the socket.
    pub fn connect(account: &ImapAccount) -> Result<Self, SessionError> {
        let addr = (account.host.as_str(), account.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                SessionError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("could not resolve {}", account.host),
                ))
            })?;

        debug!("Connecting to {}:{} ({})", account.host, account.port, addr);
        let tcp = TcpStream::connect_timeout(&addr, account.timeout).map_err(classify_io)?;
        tcp.set_read_timeout(Some(account.timeout))?;
        tcp.set_write_timeout(Some(account.timeout))?;

        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| SessionError::Tls(e.to_string()))?;
        let tls = connector
            .connect(&account.host, tcp)
            .map_err(|e| SessionError::Tls(e.to_string()))?;

        let mut client = imap::Client::new(tls);
        client.read_greeting()?;

        let user = &account.credentials.user;
        let inner = match &account.credentials.auth {
            ImapAuth::XOAuth2(token) => {
                let session = client
                    .authenticate(XOAuth2::MECHANISM, &XOAuth2::new(user, token))
                    .map_err(|(e, _)| SessionError::Auth(format!("XOAUTH2 failed: {e}")))?;
                info!("Authenticated via XOAUTH2");
                session
            }
            ImapAuth::Password(password) => {
                let session = client
                    .login(user, password)
                    .map_err(|(e, _)| SessionError::Auth(format!("login failed: {e}")))?;
                info!("Authenticated with password");
                session
            }
        };

        Ok(Self { inner })
    }
}

impl MailSession for ImapSession {
    fn open(&mut self, mailbox: &str, read_only: bool) -> Result<u32, SessionError> {
        let opened = if read_only {
            self.inner.examine(mailbox)?
        } else {
            self.inner.select(mailbox)?
        };
        Ok(opened.exists)
    }

    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>, SessionError> {
        let mut uids: Vec<Uid> = self
            .inner
            .uid_search(criteria.to_imap_query())?
            .into_iter()
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    fn mark_deleted(&mut self, uids: &[Uid]) -> Result<(), SessionError> {
        if uids.is_empty() {
            return Ok(());
        }
        self.inner
            .uid_store(uid_set(uids), "+FLAGS.SILENT (\\Deleted)")?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<(), SessionError> {
        self.inner.expunge()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.inner.close()?;
        Ok(())
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.inner.logout()?;
        Ok(())
    }

    fn list_mailboxes(&mut self) -> Result<Vec<RawMailbox>, SessionError> {
        let names = self.inner.list(None, Some("*"))?;
        Ok(names
            .iter()
            .map(|name| RawMailbox {
                name: name.name().to_string(),
                delimiter: name.delimiter().map(str::to_string),
                attributes: name.attributes().iter().map(attribute_name).collect(),
            })
            .collect())
    }
}
