use super::{empty_map, type_name, DocumentValue, ParsedDocument};
use crate::error::{FrontschemaError, Result};
use crate::io::{DataFormat, StructuredDecoder};

const DELIMITER: &str = "---";
const ALT_CLOSING: &str = "...";

/// Splits raw documents into header and body and decodes the header.
pub struct FrontmatterProcessor<'a> {
    decoder: &'a dyn StructuredDecoder,
}

impl<'a> FrontmatterProcessor<'a> {
    pub fn new(decoder: &'a dyn StructuredDecoder) -> Self {
        FrontmatterProcessor { decoder }
    }

    /// Extract the header and body. Text without a delimited header block is
    /// returned whole as the body with an empty header.
    pub fn extract(&self, raw: &str) -> Result<ParsedDocument> {
        match split_frontmatter(raw) {
            None => Ok(ParsedDocument {
                header: empty_map(),
                body: raw.to_string(),
                has_frontmatter: false,
            }),
            Some((header, body)) => Ok(ParsedDocument {
                header: self.decode_header(header)?,
                body: body.to_string(),
                has_frontmatter: true,
            }),
        }
    }

    /// Like [`extract`](Self::extract), but a missing header block is `NoFrontmatter`.
    pub fn extract_required(&self, raw: &str, source: &str) -> Result<ParsedDocument> {
        let parsed = self.extract(raw)?;
        if !parsed.has_frontmatter {
            return Err(FrontschemaError::NoFrontmatter(source.to_string()));
        }
        Ok(parsed)
    }

    fn decode_header(&self, header: &str) -> Result<DocumentValue> {
        if header.trim().is_empty() {
            return Ok(empty_map());
        }

        let value = self
            .decoder
            .decode(header, DataFormat::Yaml)
            .map_err(|e| match e {
                FrontschemaError::Parse { message, raw, .. } => {
                    FrontschemaError::MalformedFrontmatter { message, raw }
                }
                other => other,
            })?;

        match value {
            DocumentValue::Object(_) => Ok(value),
            // comment-only headers decode to null
            DocumentValue::Null => Ok(empty_map()),
            other => Err(FrontschemaError::MalformedFrontmatter {
                message: format!("header must be a mapping, got {}", type_name(&other)),
                raw: header.to_string(),
            }),
        }
    }
}

/// Locate a delimited header block. Returns `(header, body)` slices of `raw`.
pub fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let (first_line, mut rest) = match text.find('\n') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => (text, ""),
    };
    if first_line.trim_end() != DELIMITER {
        return None;
    }

    let header_start = rest;
    let mut header_len = 0;
    loop {
        let (line, next, consumed) = match rest.find('\n') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..], pos + 1),
            None if rest.is_empty() => return None,
            None => (rest, "", rest.len()),
        };

        let trimmed = line.trim_end();
        if trimmed == DELIMITER || trimmed == ALT_CLOSING {
            return Some((&header_start[..header_len], next));
        }

        header_len += consumed;
        rest = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SerdeDecoder;
    use serde_json::json;

    fn processor() -> FrontmatterProcessor<'static> {
        FrontmatterProcessor::new(&SerdeDecoder)
    }

    #[test]
    fn test_extract_header_and_body() {
        let raw = "---\ntitle: Hello\ntags: [a, b]\n---\n# Body\n\ntext\n";
        let parsed = processor().extract(raw).unwrap();
        assert!(parsed.has_frontmatter);
        assert_eq!(parsed.header, json!({ "title": "Hello", "tags": ["a", "b"] }));
        assert_eq!(parsed.body, "# Body\n\ntext\n");
    }

    #[test]
    fn test_no_frontmatter_returns_whole_body() {
        for raw in [
            "",
            "# Just markdown\n",
            "text\n---\nnot: header\n---\n",
            "---\nnever closed: true\n",
            "----\na: 1\n----\n",
        ] {
            let parsed = processor().extract(raw).unwrap();
            assert!(!parsed.has_frontmatter, "{raw:?}");
            assert_eq!(parsed.header, json!({}));
            assert_eq!(parsed.body, raw);
        }
    }

    #[test]
    fn test_crlf_and_bom() {
        let raw = "\u{feff}---\r\ntitle: Hi\r\n---\r\nbody";
        let parsed = processor().extract(raw).unwrap();
        assert_eq!(parsed.header, json!({ "title": "Hi" }));
        assert_eq!(parsed.body, "body");
    }

    #[test]
    fn test_alternate_closing_delimiter() {
        let raw = "---\na: 1\n...\nrest";
        let parsed = processor().extract(raw).unwrap();
        assert_eq!(parsed.header, json!({ "a": 1 }));
        assert_eq!(parsed.body, "rest");
    }

    #[test]
    fn test_closing_delimiter_at_end_of_text() {
        let parsed = processor().extract("---\na: 1\n---").unwrap();
        assert_eq!(parsed.header, json!({ "a": 1 }));
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_empty_and_comment_only_headers() {
        let parsed = processor().extract("---\n---\nbody").unwrap();
        assert!(parsed.has_frontmatter);
        assert_eq!(parsed.header, json!({}));

        let parsed = processor().extract("---\n# just a comment\n---\nbody").unwrap();
        assert_eq!(parsed.header, json!({}));
    }

    #[test]
    fn test_malformed_header() {
        let err = processor()
            .extract("---\ntitle: [unclosed\n---\nbody")
            .unwrap_err();
        match err {
            FrontschemaError::MalformedFrontmatter { raw, .. } => {
                assert_eq!(raw, "title: [unclosed\n");
            }
            other => panic!("expected MalformedFrontmatter, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_header_is_malformed() {
        let err = processor().extract("---\njust text\n---\n").unwrap_err();
        assert!(matches!(err, FrontschemaError::MalformedFrontmatter { .. }));
    }

    #[test]
    fn test_extract_required() {
        let err = processor()
            .extract_required("no header", "notes.md")
            .unwrap_err();
        assert!(matches!(err, FrontschemaError::NoFrontmatter(ref p) if p == "notes.md"));
    }
}
