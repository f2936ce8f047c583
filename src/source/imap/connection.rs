use std::{num::Wrapping, time::Duration};

use futures::{SinkExt as _, StreamExt as _};
use log::{debug, trace, warn};
use tokio::{net::TcpStream, time::timeout};
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;

use super::{
    ImapError,
    codec::{Command, ImapCodec, Response, Status},
};

pub type ImapStream = Framed<TlsStream<TcpStream>, ImapCodec>;

#[derive(Debug)]
struct TagGenerator {
    last_tag: Wrapping<u16>,
}

impl TagGenerator {
    fn next(&mut self) -> String {
        self.last_tag += 1;
        format!("{:04x}", self.last_tag)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self {
            last_tag: Wrapping(u16::MAX),
        }
    }
}

/// One TLS session to an IMAP server. Every network wait is bounded by `timeout`.
#[derive(Debug)]
pub struct Connection {
    stream: ImapStream,
    tag_generator: TagGenerator,
    timeout: Duration,
}

impl Connection {
    pub async fn connect_to(host: &str, port: u16, limit: Duration) -> Result<Self, ImapError> {
        debug!("connecting to {host}:{port}");
        let tls = TlsConnector::from(native_tls::TlsConnector::new()?);
        let stream = timeout(limit, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ImapError::Timeout("connect"))??;
        let stream = timeout(limit, tls.connect(host, stream))
            .await
            .map_err(|_| ImapError::Timeout("tls handshake"))??;

        let mut connection = Self {
            stream: Framed::new(stream, ImapCodec),
            tag_generator: TagGenerator::default(),
            timeout: limit,
        };
        match connection.receive("greeting").await? {
            Response::Untagged {
                status: Status::Ok | Status::PreAuth,
                information,
            } => {
                trace!("greeting = {information:?}");
                Ok(connection)
            }
            Response::Untagged {
                status: Status::Bye,
                information,
            } => Err(ImapError::Closed(information)),
            greeting => Err(ImapError::UnexpectedGreeting(format!("{greeting:?}"))),
        }
    }

    /// Sends one command and collects the untagged responses until its completion.
    ///
    /// Only the command name ends up in logs and errors, arguments may hold credentials.
    pub async fn send(&mut self, text: &str) -> Result<Vec<Response>, ImapError> {
        let tag = self.tag_generator.next();
        let name = text.split(' ').next().unwrap_or_default().to_string();
        trace!("{tag}: sending {name}");

        timeout(
            self.timeout,
            self.stream.send(Command {
                tag: tag.clone(),
                text: text.to_string(),
            }),
        )
        .await
        .map_err(|_| ImapError::Timeout("send"))??;

        let mut untagged = Vec::new();
        loop {
            match self.receive("response").await? {
                Response::Done {
                    tag: done_tag,
                    status,
                    information,
                } if done_tag == tag => {
                    return match status {
                        Status::Ok => Ok(untagged),
                        status => Err(ImapError::Rejected {
                            command: name,
                            status,
                            information,
                        }),
                    };
                }
                Response::Done { tag: other, .. } => {
                    warn!("ignoring completion of unknown command {other}");
                }
                response => untagged.push(response),
            }
        }
    }

    async fn receive(&mut self, waiting_for: &'static str) -> Result<Response, ImapError> {
        timeout(self.timeout, self.stream.next())
            .await
            .map_err(|_| ImapError::Timeout(waiting_for))?
            .ok_or(ImapError::Closed(None))?
    }
}

/// Quotes `value` as an IMAP quoted string.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');

    quoted
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[test]
    fn test_tags_are_unique_and_wrap() {
        let mut tags = TagGenerator::default();

        assert_eq!(tags.next(), "0000");
        assert_eq!(tags.next(), "0001");
        tags.last_tag = Wrapping(u16::MAX - 1);
        assert_eq!(tags.next(), "ffff");
        assert_eq!(tags.next(), "0000");
    }

    #[rstest]
    #[case("INBOX", "\"INBOX\"")]
    #[case("a \"b\"", "\"a \\\"b\\\"\"")]
    #[case("back\\slash", "\"back\\\\slash\"")]
    fn test_quote(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(quote(value), expected);
    }
}
