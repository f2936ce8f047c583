use std::fmt::{Debug, Formatter};

use derive_builder::Builder;
use derive_getters::Getters;
use mail_parser::{Addr, HeaderName, MessageParser, MimeHeaders};

use super::{FolderName, MessageId, sanitize};

/// One mailbox participant. Either part may be missing in malformed headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct Address {
    name: Option<String>,
    email: Option<String>,
}

impl Address {
    pub fn new(name: Option<&str>, email: Option<&str>) -> Self {
        Self {
            name: name.map(ToString::to_string),
            email: email.map(ToString::to_string),
        }
    }

    /// Whether this participant is the archive owner.
    pub fn is(&self, address: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|email| email.trim().eq_ignore_ascii_case(address.trim()))
    }
}

impl From<&Addr<'_>> for Address {
    fn from(addr: &Addr<'_>) -> Self {
        Self::new(addr.name.as_deref(), addr.address.as_deref())
    }
}

#[derive(Clone, PartialEq, Eq, Getters)]
pub struct Attachment {
    filename: String,
    content_type: String,
    size: usize,
    #[getter(skip)]
    content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: &str, content_type: &str, content: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: content.len(),
            content,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Size rendered for people, e.g. `12.50 KiB`.
    pub fn human_size(&self) -> String {
        const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

        if self.size < 1024 {
            return if self.size == 1 {
                "1 byte".to_string()
            } else {
                format!("{} bytes", self.size)
            };
        }
        #[expect(clippy::cast_precision_loss)]
        let mut size = self.size as f64 / 1024.0;
        let mut unit = UNITS[0];
        for next in &UNITS[1..] {
            if size < 1024.0 {
                break;
            }
            size /= 1024.0;
            unit = next;
        }

        format!("{size:.2} {unit}")
    }
}

impl Debug for Attachment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A fetched message, normalized into the fields every sink can render.
///
/// `raw` always holds the exact bytes the source delivered so that sinks and fallbacks can store
/// the original source.
#[derive(Clone, Builder, Getters)]
#[builder(setter(into))]
pub struct Message {
    folder: FolderName,
    id: MessageId,
    #[builder(default)]
    subject: String,
    #[builder(default)]
    from: Option<Address>,
    #[builder(default)]
    to: Vec<Address>,
    #[builder(default)]
    cc: Vec<Address>,
    #[builder(default)]
    bcc: Vec<Address>,
    /// Raw value of the `Date` header.
    #[builder(default)]
    date: Option<String>,
    #[builder(default)]
    text_body: String,
    #[builder(default)]
    html_body: Option<String>,
    #[builder(default)]
    attachments: Vec<Attachment>,
    #[builder(default)]
    #[getter(skip)]
    raw: Vec<u8>,
}

impl Message {
    /// Parses a raw RFC 5322 message. Malformed parts degrade to empty fields, the raw bytes are
    /// kept untouched.
    pub fn parse(
        raw: Vec<u8>,
        folder: FolderName,
        id: MessageId,
    ) -> Result<Self, MessageBuilderError> {
        let mut builder = MessageBuilder::default();
        builder.folder(folder).id(id);

        if let Some(parsed) = MessageParser::default().parse(&raw[..]) {
            builder
                .subject(parsed.subject().unwrap_or_default())
                .from(addresses(parsed.from()).into_iter().next())
                .to(addresses(parsed.to()))
                .cc(addresses(parsed.cc()))
                .bcc(addresses(parsed.bcc()))
                .date(raw_date(&parsed))
                .text_body(parsed.body_text(0).unwrap_or_default().into_owned())
                .html_body(parsed.body_html(0).map(std::borrow::Cow::into_owned))
                .attachments(
                    parsed
                        .attachments()
                        .filter_map(|part| {
                            let filename = sanitize(part.attachment_name()?);
                            let content_type = part.content_type().map_or_else(
                                || "application/octet-stream".to_string(),
                                |content_type| match content_type.subtype() {
                                    Some(subtype) => format!("{}/{subtype}", content_type.ctype()),
                                    None => content_type.ctype().to_string(),
                                },
                            );
                            Some(Attachment::new(
                                &filename,
                                &content_type,
                                part.contents().to_vec(),
                            ))
                        })
                        .collect::<Vec<_>>(),
                );
        }

        builder.raw(raw).build()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Every recipient in `To`, `Cc` and `Bcc` order.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("folder", &self.folder)
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("from", &self.from)
            .field("date", &self.date)
            .finish_non_exhaustive()
    }
}

fn addresses(header: Option<&mail_parser::Address<'_>>) -> Vec<Address> {
    match header {
        Some(mail_parser::Address::List(list)) => list.iter().map(Address::from).collect(),
        Some(mail_parser::Address::Group(groups)) => groups
            .iter()
            .flat_map(|group| group.addresses.iter().map(Address::from))
            .collect(),
        None => Vec::new(),
    }
}

fn raw_date(parsed: &mail_parser::Message<'_>) -> Option<String> {
    let header = parsed
        .headers()
        .iter()
        .find(|header| header.name == HeaderName::Date)?;
    let start = usize::try_from(header.offset_start).ok()?;
    let end = usize::try_from(header.offset_end).ok()?;
    let value = parsed.raw_message().get(start..end)?;
    let value = String::from_utf8_lossy(value);

    Some(value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[fixture]
    fn raw() -> Vec<u8> {
        concat!(
            "From: Alice Example <alice@example.com>\r\n",
            "To: Bob <bob@example.com>, carol@example.com\r\n",
            "Cc: Team: dave@example.com;\r\n",
            "Subject: Quarterly report\r\n",
            "Date: Sun, 8 Jan 2024 22:41:44 +0100\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=\"sep\"\r\n",
            "\r\n",
            "--sep\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "See attachment.\r\n",
            "--sep\r\n",
            "Content-Type: application/pdf; name=\"report.pdf\"\r\n",
            "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "aGVsbG8=\r\n",
            "--sep--\r\n",
        )
        .as_bytes()
        .to_vec()
    }

    #[rstest]
    fn test_parse_extracts_headers(raw: Vec<u8>) {
        let message = Message::parse(raw.clone(), "Inbox".into(), 7.into()).unwrap();

        assert_eq!(message.subject(), "Quarterly report");
        assert_eq!(
            message.from(),
            &Some(Address::new(Some("Alice Example"), Some("alice@example.com")))
        );
        assert_eq!(message.to().len(), 2);
        assert_eq!(
            message.cc(),
            &vec![Address::new(None, Some("dave@example.com"))]
        );
        assert_eq!(
            message.date().as_deref(),
            Some("Sun, 8 Jan 2024 22:41:44 +0100")
        );
        assert_contains!(message.text_body(), "See attachment.");
        assert_eq!(message.raw(), &raw[..]);
        assert_eq!(message.recipients().count(), 3);
    }

    #[rstest]
    fn test_parse_extracts_attachments(raw: Vec<u8>) {
        let message = Message::parse(raw, "Inbox".into(), 7.into()).unwrap();

        let [attachment] = &message.attachments()[..] else {
            panic!("expected exactly one attachment");
        };
        assert_eq!(attachment.filename(), "report.pdf");
        assert_eq!(attachment.content_type(), "application/pdf");
        assert_eq!(attachment.content(), b"hello");
        assert_eq!(attachment.human_size(), "5 bytes");
    }

    #[test]
    fn test_parse_keeps_garbage_as_raw() {
        let message = Message::parse(b"\xff\xfe".to_vec(), "Inbox".into(), 1.into()).unwrap();

        assert_eq!(message.raw(), b"\xff\xfe");
        assert_none!(message.from());
        assert_none!(message.date());
    }

    #[rstest]
    #[case(0, "0 bytes")]
    #[case(1, "1 byte")]
    #[case(1023, "1023 bytes")]
    #[case(1024, "1.00 KiB")]
    #[case(1536, "1.50 KiB")]
    #[case(3 * 1024 * 1024, "3.00 MiB")]
    fn test_human_size(#[case] size: usize, #[case] expected: &str) {
        let attachment = Attachment::new("a.bin", "application/octet-stream", vec![0; size]);

        assert_eq!(attachment.human_size(), expected);
    }

    #[test]
    fn test_self_address_matches_case_insensitively() {
        let address = Address::new(None, Some("Me@Example.com"));

        assert!(address.is("me@example.com"));
        assert!(!address.is("you@example.com"));
        assert!(!Address::default().is("me@example.com"));
    }
}
