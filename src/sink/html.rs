use std::fmt::Write as _;

use enumflags2::BitFlags;
use html_escape::{encode_double_quoted_attribute, encode_text};
use log::debug;

use super::{Sink, SinkCapability, SinkContext, SinkError};
use crate::{
    atomic_file,
    message::{Address, Message},
};

const EXTENSION: &str = "html";

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:60em}\
th{text-align:left;padding-right:1em;vertical-align:top}\
pre{white-space:pre-wrap}\
iframe{border:1px solid #ccc;width:100%;min-height:40em}";

/// Renders each message into a self-contained page: headers, body and attachment list.
#[derive(Debug)]
pub struct HtmlSink {
    context: SinkContext,
}

impl HtmlSink {
    pub fn new(context: SinkContext) -> Self {
        Self { context }
    }
}

impl Sink for HtmlSink {
    fn context(&self) -> &SinkContext {
        &self.context
    }

    fn persist(&mut self, message: &Message) -> Result<(), SinkError> {
        let filename = self.context.filename(message);
        let path = self
            .context
            .layout()
            .message_path(message, &filename, EXTENSION);

        debug!("rendering e-mail ({}) to {}", message.id(), path.display());
        atomic_file::write(&path, render(message).as_bytes()).map_err(SinkError::io(path))
    }

    fn capabilities(&self) -> BitFlags<SinkCapability> {
        SinkCapability::RetainSource.into()
    }
}

fn render(message: &Message) -> String {
    let subject = encode_text(message.subject());
    let mut page = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{subject}</title>\n\
         <style>{STYLE}</style>\n</head>\n<body>\n<h1>{subject}</h1>\n<table>\n"
    );

    header_row(&mut page, "From", message.from().iter());
    header_row(&mut page, "To", message.to().iter());
    header_row(&mut page, "Cc", message.cc().iter());
    header_row(&mut page, "Bcc", message.bcc().iter());
    if let Some(date) = message.date() {
        let _ = writeln!(page, "<tr><th>Date</th><td>{}</td></tr>", encode_text(date));
    }
    page.push_str("</table>\n<hr>\n");

    match message.html_body() {
        Some(html) => {
            let _ = writeln!(
                page,
                "<iframe sandbox srcdoc=\"{}\"></iframe>",
                encode_double_quoted_attribute(html)
            );
        }
        None => {
            let _ = writeln!(page, "<pre>{}</pre>", encode_text(message.text_body()));
        }
    }

    if !message.attachments().is_empty() {
        page.push_str("<hr>\n<h2>Attachments</h2>\n<ul>\n");
        for attachment in message.attachments() {
            let _ = writeln!(
                page,
                "<li>{} ({}, {})</li>",
                encode_text(attachment.filename()),
                encode_text(attachment.content_type()),
                attachment.human_size()
            );
        }
        page.push_str("</ul>\n");
    }
    page.push_str("</body>\n</html>\n");

    page
}

fn header_row<'a>(page: &mut String, label: &str, addresses: impl Iterator<Item = &'a Address>) {
    let rendered: Vec<String> = addresses
        .map(|address| match (address.name(), address.email()) {
            (Some(name), Some(email)) => {
                format!("{} &lt;{}&gt;", encode_text(name), encode_text(email))
            }
            (Some(only), None) | (None, Some(only)) => encode_text(only).into_owned(),
            (None, None) => String::new(),
        })
        .filter(|rendered| !rendered.is_empty())
        .collect();
    if !rendered.is_empty() {
        let _ = writeln!(
            page,
            "<tr><th>{label}</th><td>{}</td></tr>",
            rendered.join(", ")
        );
    }
}
