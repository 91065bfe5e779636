//! Bracket-tagged text templates.
//!
//! A document is UTF-8 text; a placeholder is any non-empty run of text
//! enclosed in `[` and `]` that contains no bracket itself, e.g.
//! `[Company Name]`. Anything that does not decode as UTF-8 is not a text
//! document and is rejected as malformed.
//!
//! Scanning, rewriting and rendering share one token pattern, so a stray
//! `[` or `]` is plain text everywhere and never turns into a tag later.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use docfill_core::error::{MalformedDocumentError, RenderError};
use docfill_core::placeholder::PlaceholderToken;
use docfill_core::template::{Delimiters, TemplateEngine};
use regex_lite::{Captures, Regex};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("token pattern is valid"));

/// The text templating engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextTemplateEngine;

impl TextTemplateEngine {
    pub fn new() -> Self {
        Self
    }

    fn decode(document: &[u8]) -> Result<&str, MalformedDocumentError> {
        std::str::from_utf8(document).map_err(|e| {
            MalformedDocumentError::new(format!("not a UTF-8 text document: {e}"))
        })
    }
}

impl TemplateEngine for TextTemplateEngine {
    fn name(&self) -> &str {
        "text"
    }

    fn delimiters(&self) -> Delimiters {
        Delimiters::BRACKETS
    }

    fn scan(&self, document: &[u8]) -> Result<Vec<PlaceholderToken>, MalformedDocumentError> {
        let text = Self::decode(document)?;
        Ok(TOKEN
            .captures_iter(text)
            .enumerate()
            .map(|(i, caps)| PlaceholderToken {
                occurrence_index: i,
                raw_tag: caps[1].to_string(),
            })
            .collect())
    }

    fn rewrite(&self, document: &[u8], tags: &[String]) -> Result<Vec<u8>, MalformedDocumentError> {
        let text = Self::decode(document)?;
        let matches: Vec<_> = TOKEN.find_iter(text).collect();
        if matches.len() != tags.len() {
            return Err(MalformedDocumentError::new(format!(
                "document has {} tokens but {} replacements were given",
                matches.len(),
                tags.len()
            )));
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (m, tag) in matches.iter().zip(tags) {
            out.push_str(&text[cursor..m.start()]);
            out.push_str(tag);
            cursor = m.end();
        }
        out.push_str(&text[cursor..]);
        Ok(out.into_bytes())
    }

    fn render(
        &self,
        document: &[u8],
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, RenderError> {
        let text =
            std::str::from_utf8(document).map_err(|e| RenderError::InvalidEncoding(e.to_string()))?;
        let delims = self.delimiters();

        // Replacements are not re-scanned, so values may contain brackets.
        let out = TOKEN.replace_all(text, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => delims.wrap(&caps[1]),
        });
        Ok(out.into_owned().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn scan_finds_tokens_in_order() {
        let engine = TextTemplateEngine::new();
        let tokens = engine
            .scan(b"Dear [Name], your [Name] account at [Bank] is open.")
            .unwrap();
        let raw: Vec<&str> = tokens.iter().map(|t| t.raw_tag.as_str()).collect();
        assert_eq!(raw, vec!["Name", "Name", "Bank"]);
        assert_eq!(tokens[2].occurrence_index, 2);
    }

    #[test]
    fn scan_ignores_stray_and_empty_brackets() {
        let engine = TextTemplateEngine::new();
        let tokens = engine.scan(b"a [ b [x] c] [] d").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw_tag, "x");
    }

    #[test]
    fn non_utf8_is_malformed() {
        let engine = TextTemplateEngine::new();
        let err = engine.scan(&[0x50, 0x4b, 0x03, 0x04, 0xff, 0xfe]).unwrap_err();
        assert!(err.reason.contains("UTF-8"));
    }

    #[test]
    fn rewrite_replaces_positionally() {
        let engine = TextTemplateEngine::new();
        let out = engine
            .rewrite(b"[X] and [X]", &["[full_name]".into(), "[email]".into()])
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[full_name] and [email]");
    }

    #[test]
    fn rewrite_rejects_count_mismatch() {
        let engine = TextTemplateEngine::new();
        assert!(engine.rewrite(b"[X] and [X]", &["[a]".into()]).is_err());
    }

    #[test]
    fn render_substitutes_and_reemits_missing() {
        let engine = TextTemplateEngine::new();
        let out = engine
            .render(b"Hi [full_name] <[email]>", &values(&[("full_name", "Ana")]))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hi Ana <[email]>");
    }

    #[test]
    fn render_does_not_recurse_into_values() {
        let engine = TextTemplateEngine::new();
        let out = engine
            .render(b"[a]", &values(&[("a", "[b]"), ("b", "nope")]))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[b]");
    }

    #[test]
    fn render_treats_stray_brackets_as_text() {
        let engine = TextTemplateEngine::new();
        let out = engine
            .render(
                b"Signed by [Signer]. See clause 4[b for details, or [a[b]] and [].",
                &values(&[("Signer", "Ana"), ("b", "B")]),
            )
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Signed by Ana. See clause 4[b for details, or [aB] and []."
        );
    }

    #[test]
    fn render_matches_what_scan_found() {
        let engine = TextTemplateEngine::new();
        let doc = b"x [ y [one] z] [two] [";
        let tokens = engine.scan(doc).unwrap();
        let all: BTreeMap<String, String> = tokens
            .iter()
            .map(|t| (t.raw_tag.clone(), "#".to_string()))
            .collect();
        let out = engine.render(doc, &all).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x [ y # z] # [");
    }

    #[test]
    fn render_rejects_invalid_utf8() {
        let engine = TextTemplateEngine::new();
        assert!(matches!(
            engine.render(&[b'[', 0xff, b']'], &BTreeMap::new()),
            Err(RenderError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn render_keeps_stray_closing_bracket() {
        let engine = TextTemplateEngine::new();
        let out = engine.render("1) item ] ünïcode".as_bytes(), &BTreeMap::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1) item ] ünïcode");
    }
}
