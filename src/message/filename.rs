use jiff::{Timestamp, civil::Date, tz::TimeZone};

use super::Message;

pub const MAX_FILENAME_LEN: usize = 50;

const SUBSTITUTE: char = '-';

/// Derives the storage name (without extension) of a message.
///
/// Composed as `<date> - <counterpart> - <subject>` where the counterpart is the local part of the
/// sender, or of the first recipient when the archive owner sent the message. Falls back to
/// `email-<id>` when the message carries no usable date.
pub fn derive_filename(message: &Message, self_address: &str) -> String {
    let Some(date) = message.date().as_deref().and_then(parse_date) else {
        return sanitize(&format!("email-{}", message.id()));
    };
    let counterpart = match message.from() {
        Some(from) if from.is(self_address) => message.to().first(),
        from => from.as_ref(),
    };
    let local_part = counterpart
        .and_then(|address| address.email().as_deref())
        .and_then(|email| email.split('@').next())
        .unwrap_or_default();

    let composed = format!(
        "{date} - {} - {}",
        sanitize(local_part),
        message.subject()
    );
    let filename = sanitize(&composed);
    if filename.is_empty() {
        sanitize(&format!("email-{}", message.id()))
    } else {
        filename
    }
}

/// Restricts `input` to `[A-Za-z0-9_.-]`.
///
/// Every other character becomes `-`, runs of `-` collapse, the result is cut to
/// [`MAX_FILENAME_LEN`] and stripped of leading and trailing `-`. Idempotent.
pub fn sanitize(input: &str) -> String {
    let mut sanitized = String::with_capacity(input.len().min(MAX_FILENAME_LEN));
    for c in input.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            c
        } else {
            SUBSTITUTE
        };
        if c == SUBSTITUTE && sanitized.ends_with(SUBSTITUTE) {
            continue;
        }
        sanitized.push(c);
        if sanitized.len() >= MAX_FILENAME_LEN {
            break;
        }
    }

    sanitized.trim_matches(SUBSTITUTE).to_string()
}

/// Calendar date of a raw `Date` header.
///
/// Accepts RFC 2822 with trailing comments and mismatching weekdays, then RFC 3339.
pub fn parse_date(raw: &str) -> Option<Date> {
    let mut value = raw.trim();
    if value.ends_with(')')
        && let Some(comment) = value.rfind('(')
    {
        value = value[..comment].trim_end();
    }
    if let Some((weekday, rest)) = value.split_once(',')
        && weekday.trim().chars().all(|c| c.is_ascii_alphabetic())
    {
        value = rest.trim_start();
    }
    let value = match value.strip_suffix(" UT") {
        Some(stripped) => format!("{stripped} +0000"),
        None => value.to_string(),
    };

    if let Ok(zoned) = jiff::fmt::rfc2822::parse(&value) {
        return Some(zoned.date());
    }
    value
        .parse::<Timestamp>()
        .ok()
        .map(|timestamp| timestamp.to_zoned(TimeZone::UTC).date())
}
