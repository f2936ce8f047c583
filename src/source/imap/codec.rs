use bytes::{Buf as _, BufMut as _, BytesMut};
use imap_proto::{AttributeValue, MailboxDatum, NameAttribute};
use log::{trace, warn};
use tokio_util::codec::{Decoder, Encoder};

use super::ImapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
    PreAuth,
    Bye,
}

impl From<&imap_proto::Status> for Status {
    fn from(status: &imap_proto::Status) -> Self {
        match status {
            imap_proto::Status::Ok => Self::Ok,
            imap_proto::Status::No => Self::No,
            imap_proto::Status::Bad => Self::Bad,
            imap_proto::Status::PreAuth => Self::PreAuth,
            imap_proto::Status::Bye => Self::Bye,
        }
    }
}

/// The subset of server responses an export needs, detached from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Done {
        tag: String,
        status: Status,
        information: Option<String>,
    },
    Untagged {
        status: Status,
        information: Option<String>,
    },
    Continue,
    List {
        name: String,
        delimiter: Option<char>,
        selectable: bool,
    },
    Exists(u32),
    Fetch {
        uid: Option<u32>,
        body: Option<Vec<u8>>,
    },
    Other,
}

impl From<&imap_proto::Response<'_>> for Response {
    fn from(response: &imap_proto::Response<'_>) -> Self {
        match response {
            imap_proto::Response::Done {
                tag,
                status,
                information,
                ..
            } => Self::Done {
                tag: tag.0.to_string(),
                status: status.into(),
                information: information.as_ref().map(ToString::to_string),
            },
            imap_proto::Response::Data {
                status,
                information,
                ..
            } => Self::Untagged {
                status: status.into(),
                information: information.as_ref().map(ToString::to_string),
            },
            imap_proto::Response::Continue { .. } => Self::Continue,
            imap_proto::Response::MailboxData(MailboxDatum::List {
                name_attributes,
                delimiter,
                name,
            }) => Self::List {
                name: name.to_string(),
                delimiter: delimiter.as_ref().and_then(|delimiter| delimiter.chars().next()),
                selectable: !name_attributes
                    .iter()
                    .any(|attribute| matches!(attribute, NameAttribute::NoSelect)),
            },
            imap_proto::Response::MailboxData(MailboxDatum::Exists(exists)) => {
                Self::Exists(*exists)
            }
            imap_proto::Response::Fetch(_, attributes) => {
                let mut uid = None;
                let mut body = None;
                for attribute in attributes {
                    match attribute {
                        AttributeValue::Uid(value) => uid = Some(*value),
                        AttributeValue::BodySection {
                            data: Some(data), ..
                        }
                        | AttributeValue::Rfc822(Some(data)) => body = Some(data.to_vec()),
                        _ => {}
                    }
                }
                Self::Fetch { uid, body }
            }
            _ => Self::Other,
        }
    }
}

/// A tagged command line, `text` must not contain a line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ImapCodec;

impl Decoder for ImapCodec {
    type Item = Response;
    type Error = ImapError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let (consumed, response) = match imap_proto::parser::parse_response(&src[..]) {
            Ok((rest, response)) => (src.len() - rest.len(), Response::from(&response)),
            Err(nom::Err::Incomplete(_)) => return Ok(None),
            Err(_) => {
                let Some(line_end) = src.windows(2).position(|window| window == b"\r\n") else {
                    return Ok(None);
                };
                warn!(
                    "skipping unparsable response {:?}",
                    String::from_utf8_lossy(&src[..line_end])
                );
                (line_end + 2, Response::Other)
            }
        };
        src.advance(consumed);
        trace!("received {response:?}");

        Ok(Some(response))
    }
}

impl Encoder<Command> for ImapCodec {
    type Error = ImapError;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(command.tag.len() + command.text.len() + 3);
        dst.put_slice(command.tag.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(command.text.as_bytes());
        dst.put_slice(b"\r\n");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Response> {
        let mut codec = ImapCodec;
        let mut buffer = BytesMut::from(input);
        let mut responses = Vec::new();
        while let Some(response) = codec.decode(&mut buffer).unwrap() {
            responses.push(response);
        }
        responses
    }

    #[test]
    fn test_decode_greeting() {
        assert_eq!(
            decode_all(b"* OK IMAP4rev1 ready\r\n"),
            vec![Response::Untagged {
                status: Status::Ok,
                information: Some("IMAP4rev1 ready".to_string())
            }]
        );
    }

    #[test]
    fn test_decode_tagged_completion() {
        assert_eq!(
            decode_all(b"0000 NO invalid credentials\r\n"),
            vec![Response::Done {
                tag: "0000".to_string(),
                status: Status::No,
                information: Some("invalid credentials".to_string())
            }]
        );
    }

    #[rstest]
    #[case(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n", "INBOX", Some('/'), true)]
    #[case(b"* LIST (\\Noselect \\HasChildren) \".\" \"[Gmail]\"\r\n", "[Gmail]", Some('.'), false)]
    #[case(b"* LIST () NIL Archive\r\n", "Archive", None, true)]
    fn test_decode_list(
        #[case] input: &[u8],
        #[case] name: &str,
        #[case] delimiter: Option<char>,
        #[case] selectable: bool,
    ) {
        assert_eq!(
            decode_all(input),
            vec![Response::List {
                name: name.to_string(),
                delimiter,
                selectable
            }]
        );
    }

    #[test]
    fn test_decode_exists_and_uid_fetch() {
        assert_eq!(
            decode_all(b"* 2 EXISTS\r\n* 1 FETCH (UID 17)\r\n* 2 FETCH (UID 42)\r\n"),
            vec![
                Response::Exists(2),
                Response::Fetch {
                    uid: Some(17),
                    body: None
                },
                Response::Fetch {
                    uid: Some(42),
                    body: None
                },
            ]
        );
    }

    #[test]
    fn test_decode_body_literal() {
        assert_eq!(
            decode_all(b"* 1 FETCH (UID 17 BODY[] {11}\r\nSubject: a\n)\r\n"),
            vec![Response::Fetch {
                uid: Some(17),
                body: Some(b"Subject: a\n".to_vec())
            }]
        );
    }

    #[test]
    fn test_decode_waits_for_complete_literal() {
        let mut codec = ImapCodec;
        let mut buffer = BytesMut::from(&b"* 1 FETCH (UID 17 BODY[] {11}\r\nSubj"[..]);

        assert_none!(codec.decode(&mut buffer).unwrap());

        buffer.extend_from_slice(b"ect: a\n)\r\n");
        assert_some!(codec.decode(&mut buffer).unwrap());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_skips_garbage_line() {
        let responses = decode_all(b")garbage(\r\n* 3 EXISTS\r\n");

        assert_eq!(responses, vec![Response::Other, Response::Exists(3)]);
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = ImapCodec;
        let mut buffer = BytesMut::new();

        codec
            .encode(
                Command {
                    tag: "0001".to_string(),
                    text: "LOGOUT".to_string(),
                },
                &mut buffer,
            )
            .unwrap();

        assert_eq!(&buffer[..], b"0001 LOGOUT\r\n");
    }
}
