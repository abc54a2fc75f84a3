use super::{DecodeError, DecodeStep};
use crate::model::CommitRecord;
use crate::util::truncate_chars;
use chrono::DateTime;
use log::debug;

/// `git log --pretty=format:` template producing one `<entry>` per commit.
pub const ENTRY_TEMPLATE: &str = "<entry><commit>%H</commit><author>%an</author><date>%cI</date><message>%B</message></entry>";

pub const SHORT_HASH_LEN: usize = 6;

const ENTRY_OPEN: &str = "<entry";
const ENTRY_CLOSE: &str = "</entry>";

#[derive(Debug, Default)]
struct Fields {
    commit: Option<String>,
    author: Option<String>,
    date: Option<String>,
    message: Option<String>,
}

impl Fields {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "commit" | "hash" => self.commit = Some(value.trim().to_string()),
            "author" => self.author = Some(value.trim().to_string()),
            "date" => self.date = Some(value.trim().to_string()),
            "message" => self.message = Some(value.trim_end().to_string()),
            _ => {}
        }
    }
}

/// Cursor over a stream of commit fragments.
///
/// Field text is taken literally up to its closing tag, so unescaped `<` and
/// `&` inside messages or author names are accepted. Structural faults
/// (unterminated tags, stray text between records) are fatal.
pub struct CommitDecoder<'a> {
    input: &'a str,
    pos: usize,
    project: &'a str,
}

impl<'a> CommitDecoder<'a> {
    pub fn new(input: &'a str, project: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            project,
        }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn next_record(&mut self) -> Result<DecodeStep<CommitRecord>, DecodeError> {
        self.skip_whitespace();
        if self.rest().is_empty() {
            return Ok(DecodeStep::End);
        }
        let fields = self.read_entry()?;
        Ok(build_record(fields, self.project))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn read_entry(&mut self) -> Result<Fields, DecodeError> {
        let start = self.pos;
        let rest = self.rest();
        if !rest.starts_with(ENTRY_OPEN) {
            return Err(DecodeError::new(start, "expected <entry>"));
        }
        let close = rest
            .find('>')
            .ok_or_else(|| DecodeError::new(start, "unterminated <entry> tag"))?;
        let tag = &rest[1..close];
        if tag_name(tag) != "entry" {
            return Err(DecodeError::new(start, format!("expected <entry>, found <{tag}>")));
        }
        self.pos += close + 1;

        let mut fields = Fields::default();
        if tag.ends_with('/') {
            return Ok(fields);
        }

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(DecodeError::new(start, "unterminated <entry>"));
            }
            if rest.starts_with(ENTRY_CLOSE) {
                self.pos += ENTRY_CLOSE.len();
                return Ok(fields);
            }
            if !rest.starts_with('<') {
                return Err(DecodeError::new(self.pos, "unexpected text inside <entry>"));
            }
            self.read_field(&mut fields)?;
        }
    }

    fn read_field(&mut self, fields: &mut Fields) -> Result<(), DecodeError> {
        let at = self.pos;
        let rest = self.rest();
        let close = rest
            .find('>')
            .ok_or_else(|| DecodeError::new(at, "unterminated tag"))?;
        let tag = &rest[1..close];
        if tag.starts_with('/') {
            return Err(DecodeError::new(at, format!("unexpected closing tag <{tag}>")));
        }
        let name = tag_name(tag);
        if name.is_empty() {
            return Err(DecodeError::new(at, "empty tag"));
        }
        self.pos += close + 1;

        if tag.ends_with('/') {
            fields.set(name, String::new());
            return Ok(());
        }

        let closing = format!("</{name}>");
        let end = self
            .find_field_end(&closing)
            .ok_or_else(|| DecodeError::new(at, format!("unterminated <{name}>")))?;
        let value = unescape(&self.input[self.pos..end]);
        self.pos = end + closing.len();
        fields.set(name, value);
        Ok(())
    }

    /// First closing tag that is followed by markup, so literal closing tags
    /// inside free text do not end the field early.
    fn find_field_end(&self, closing: &str) -> Option<usize> {
        let rest = self.rest();
        let mut from = 0;
        while let Some(found) = rest[from..].find(closing) {
            let idx = from + found;
            let after = rest[idx + closing.len()..].trim_start();
            let opens_tag = after.starts_with('<') && !after.starts_with("</");
            if after.is_empty() || opens_tag || after.starts_with(ENTRY_CLOSE) {
                return Some(self.pos + idx);
            }
            from = idx + closing.len();
        }
        None
    }
}

fn tag_name(tag: &str) -> &str {
    tag.split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
}

fn build_record(fields: Fields, project: &str) -> DecodeStep<CommitRecord> {
    let hash = match fields.commit {
        Some(hash) if hash.chars().count() >= SHORT_HASH_LEN => hash,
        _ => return DecodeStep::Skipped("missing commit hash".to_string()),
    };
    let timestamp = match fields.date.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(timestamp)) => timestamp,
        _ => return DecodeStep::Skipped(format!("unreadable date for commit {hash}")),
    };

    DecodeStep::Record(CommitRecord {
        short_hash: truncate_chars(&hash, SHORT_HASH_LEN),
        author: fields.author.unwrap_or_default(),
        timestamp,
        message: fields.message.unwrap_or_default(),
        project: project.to_string(),
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let resolved = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| resolve_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match resolved {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Decodes a whole `git log` output, dropping skipped fragments.
pub fn decode_commits(raw: &[u8], project: &str) -> Result<Vec<CommitRecord>, DecodeError> {
    let text = String::from_utf8_lossy(raw);
    let mut decoder = CommitDecoder::new(&text, project);
    let mut records = Vec::new();
    loop {
        match decoder.next_record()? {
            DecodeStep::Record(record) => records.push(record),
            DecodeStep::Skipped(reason) => {
                debug!("skipping commit fragment in {project} at byte {}: {reason}", decoder.offset())
            }
            DecodeStep::End => return Ok(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(hash: &str, date: &str, message: &str) -> String {
        format!(
            "<entry><commit>{hash}</commit><author>alice</author><date>{date}</date><message>{message}</message></entry>"
        )
    }

    #[test]
    fn decodes_back_to_back_records() {
        let raw = format!(
            "{}\n{}",
            entry("0123456789abcdef", "2024-01-05T14:30:00+01:00", "second\n"),
            entry("fedcba9876543210", "2024-01-05T09:00:00+01:00", "first\n\nbody\n")
        );

        let commits = decode_commits(raw.as_bytes(), "A").unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].short_hash, "012345");
        assert_eq!(commits[0].author, "alice");
        assert_eq!(commits[0].message, "second");
        assert_eq!(commits[0].project, "A");
        assert_eq!(commits[0].timestamp.to_rfc3339(), "2024-01-05T14:30:00+01:00");
        assert_eq!(commits[1].short_hash, "fedcba");
        assert_eq!(commits[1].message, "first\n\nbody");
    }

    #[test]
    fn empty_stream_ends_cleanly() {
        assert!(decode_commits(b"", "A").unwrap().is_empty());
        assert!(decode_commits(b"\n  \n", "A").unwrap().is_empty());
    }

    #[test]
    fn tolerates_markup_and_ampersands_in_free_text() {
        let raw = entry(
            "0123456789",
            "2024-01-05T09:00:00Z",
            "fix a < b && c > d in <Widget>; see </message> docs",
        );

        let commits = decode_commits(raw.as_bytes(), "A").unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(
            commits[0].message,
            "fix a < b && c > d in <Widget>; see </message> docs"
        );
    }

    #[test]
    fn resolves_entities() {
        let raw = entry("0123456789", "2024-01-05T09:00:00Z", "&lt;tag&gt; &amp; &#65;&#x42; &bogus;");

        let commits = decode_commits(raw.as_bytes(), "A").unwrap();
        assert_eq!(commits[0].message, "<tag> & AB &bogus;");
    }

    #[test]
    fn short_hash_counts_codepoints() {
        let raw = entry("ééééééééé", "2024-01-05T09:00:00Z", "unicode");

        let commits = decode_commits(raw.as_bytes(), "A").unwrap();
        assert_eq!(commits[0].short_hash, "éééééé");
        assert_eq!(commits[0].short_hash.chars().count(), SHORT_HASH_LEN);
    }

    #[test]
    fn skips_fragments_without_hash_or_date() {
        let raw = format!(
            "<entry><author>bob</author><date>2024-01-05T09:00:00Z</date><message>no hash</message></entry>\n{}\n{}\n{}",
            entry("abc", "2024-01-05T09:00:00Z", "hash too short"),
            entry("0123456789", "yesterday", "bad date"),
            entry("9876543210", "2024-01-05T10:00:00Z", "kept"),
        );

        let commits = decode_commits(raw.as_bytes(), "A").unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "kept");
    }

    #[test]
    fn stepwise_decoding_reports_each_outcome() {
        let raw = format!(
            "<entry/>\n{}",
            entry("0123456789", "2024-01-05T09:00:00Z", "ok")
        );
        let mut decoder = CommitDecoder::new(&raw, "A");

        assert!(matches!(decoder.next_record(), Ok(DecodeStep::Skipped(_))));
        assert!(matches!(decoder.next_record(), Ok(DecodeStep::Record(_))));
        assert_eq!(decoder.next_record(), Ok(DecodeStep::End));
        assert_eq!(decoder.offset(), raw.len());
    }

    #[test]
    fn truncated_record_is_fatal() {
        let full = entry("0123456789", "2024-01-05T09:00:00Z", "ok");
        let raw = format!("{full}\n<entry><commit>abcdef0123</commit><message>cut");

        let err = decode_commits(raw.as_bytes(), "A").unwrap_err();
        assert_eq!(err.offset, full.len() + 1 + "<entry><commit>abcdef0123</commit>".len());
        assert!(err.reason.contains("unterminated <message>"));
    }

    #[test]
    fn stray_text_between_records_is_fatal() {
        let raw = format!("garbage{}", entry("0123456789", "2024-01-05T09:00:00Z", "ok"));

        let err = decode_commits(raw.as_bytes(), "A").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.reason, "expected <entry>");
    }
}
