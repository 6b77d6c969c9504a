//! RFC 5322 header summary: the handful of fields the mailbox index records.
//!
//! Only the header block is examined. Parsing never fails; a payload with no
//! recognisable headers yields an empty summary.

use mail_parser::MessageParser;
use tracing::debug;

use crate::model::address::EmailAddress;

/// How much of a payload is inspected for headers.
pub const HEADER_SCAN_LIMIT: usize = 64 * 1024;

/// Maximum number of `To:` recipients kept in the index.
const MAX_RECIPIENTS: usize = 5;

/// Header fields extracted for the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSummary {
    pub subject: String,
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
}

/// Summarise the header block at the start of `head`.
///
/// `head` may be a prefix of the full message; anything after the first
/// blank line is ignored.
pub fn parse_summary(head: &[u8]) -> HeaderSummary {
    let end = find_header_end(head).unwrap_or(head.len());
    let text = decode_header_bytes(&head[..end]);
    let headers = unfold_headers(&text);

    let subject = get_header(&headers, "subject")
        .map(|s| decode_encoded_words(&s))
        .unwrap_or_default();

    let from = get_header(&headers, "from")
        .map(|s| EmailAddress::parse(&decode_encoded_words(&s)))
        .unwrap_or_default();

    let mut to = get_header(&headers, "to")
        .map(|s| EmailAddress::parse_list(&decode_encoded_words(&s)))
        .unwrap_or_default();
    to.truncate(MAX_RECIPIENTS);

    debug!(subject = %subject, from = %from, recipients = to.len(), "Parsed header summary");

    HeaderSummary { subject, from, to }
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    (0..data.len()).find(|&i| {
        data[i..].starts_with(b"\n\n") || data[i..].starts_with(b"\r\n\r\n")
    })
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Join continuation lines with their header.
///
/// Returns `(lowercase_name, value)` pairs in order of appearance.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            result.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    result
}

/// First value for a header name.
fn get_header(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Plain values are returned untouched. Encoded values are handed to
/// `mail-parser` wrapped in a minimal message; if that fails the original
/// text is kept.
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }

    let fake_msg = format!("Subject: {input}\n\n");
    MessageParser::default()
        .parse(fake_msg.as_bytes())
        .and_then(|msg| msg.subject().map(str::to_string))
        .unwrap_or_else(|| input.to_string())
}
