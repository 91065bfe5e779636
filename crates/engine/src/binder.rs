//! Occurrence binder: positional identity binding.
//!
//! The i-th raw token found in the document is bound to the i-th name handed
//! out by the extraction service, whatever the token's text says. Two
//! `[Name]` tokens at different positions can therefore become two distinct
//! placeholders. Tokens the service did not name get a synthetic
//! `placeholder_NNN` name derived from their 1-based position.
//!
//! The binder produces the rewritten document and the ordered name list once;
//! nothing downstream ever re-scans document content to recover identities.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use docfill_core::error::MalformedDocumentError;
use docfill_core::placeholder::{DuplicateNamePolicy, PlaceholderSpec, PlaceholderToken};
use docfill_core::template::{Delimiters, TemplateEngine};
use tracing::{debug, warn};

/// Prefix of names synthesized for tokens the service left unnamed.
pub const DEFAULT_FALLBACK_PREFIX: &str = "placeholder";

/// Knobs for [`bind`].
#[derive(Debug, Clone)]
pub struct BindOptions {
    pub duplicates: DuplicateNamePolicy,
    pub fallback_prefix: String,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicateNamePolicy::default(),
            fallback_prefix: DEFAULT_FALLBACK_PREFIX.into(),
        }
    }
}

/// A document whose tokens have been rewritten to canonical tags.
#[derive(Debug, Clone)]
pub struct BoundDocument {
    bytes: Arc<[u8]>,
    names: Arc<[String]>,
    /// What the service called each occurrence, before disambiguation.
    service_names: Arc<[String]>,
    descriptions: HashMap<String, String>,
}

impl BoundDocument {
    /// The rewritten document.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `names()[i]` is the name bound to the token at occurrence index `i`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The name the service knows `name` by.
    ///
    /// Differs from `name` only for disambiguated duplicates: the service
    /// calls both `Company Name` and `Company Name_2` "Company Name".
    pub fn service_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.names
            .iter()
            .position(|n| n == name)
            .map_or(name, |i| self.service_names[i].as_str())
    }

    /// Every canonical name the service calls `service_name`, in occurrence
    /// order, without repeats.
    pub fn siblings(&self, service_name: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (name, service) in self.names.iter().zip(self.service_names.iter()) {
            if service == service_name && !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }

    pub fn descriptions(&self) -> &HashMap<String, String> {
        &self.descriptions
    }

    pub fn token_count(&self) -> usize {
        self.names.len()
    }
}

/// Bind a document's raw tokens to the service's names, by position.
pub fn bind(
    engine: &dyn TemplateEngine,
    document: &[u8],
    specs: &[PlaceholderSpec],
    options: &BindOptions,
) -> Result<BoundDocument, MalformedDocumentError> {
    let tokens = engine.scan(document)?;
    let delims = engine.delimiters();

    let mut specs: Vec<&PlaceholderSpec> = specs.iter().collect();
    specs.sort_by_key(|s| s.order);

    if specs.len() > tokens.len() {
        warn!(
            tokens = tokens.len(),
            names = specs.len(),
            "Extraction service returned more names than tokens; ignoring the surplus"
        );
    }

    let mut namer = Namer::new(delims, options);
    let mut names = Vec::with_capacity(tokens.len());
    let mut service_names = Vec::with_capacity(tokens.len());
    let mut descriptions: HashMap<String, String> = HashMap::new();

    for token in &tokens {
        let spec = specs.get(token.occurrence_index).copied();
        let (name, service_name, description) = namer.name_for(token, spec);
        debug!(
            occurrence = token.occurrence_index,
            raw = %token.raw_tag,
            name = %name,
            "Bound token"
        );
        let entry = descriptions.entry(name.clone()).or_default();
        if entry.is_empty() {
            *entry = description;
        }
        names.push(name);
        service_names.push(service_name);
    }

    let tags: Vec<String> = names.iter().map(|n| delims.wrap(n)).collect();
    let bytes = engine.rewrite(document, &tags)?;

    Ok(BoundDocument {
        bytes: bytes.into(),
        names: names.into(),
        service_names: service_names.into(),
        descriptions,
    })
}

/// Hands out names while keeping them unique under the duplicate policy.
struct Namer<'a> {
    delims: Delimiters,
    options: &'a BindOptions,
    taken: HashSet<String>,
    /// Names that came from the service rather than being synthesized.
    from_service: HashSet<String>,
}

impl<'a> Namer<'a> {
    fn new(delims: Delimiters, options: &'a BindOptions) -> Self {
        Self {
            delims,
            options,
            taken: HashSet::new(),
            from_service: HashSet::new(),
        }
    }

    fn name_for(
        &mut self,
        token: &PlaceholderToken,
        spec: Option<&PlaceholderSpec>,
    ) -> (String, String, String) {
        let candidate = spec
            .map(|s| self.delims.strip(&s.name).trim().to_string())
            .filter(|n| !n.is_empty());

        match candidate {
            Some(name) => {
                let description = spec.map(|s| s.description.trim().to_string()).unwrap_or_default();
                let shared = self.options.duplicates == DuplicateNamePolicy::Share
                    && self.from_service.contains(&name);
                let canonical = if shared || !self.taken.contains(&name) {
                    name.clone()
                } else {
                    self.disambiguate(&name)
                };
                self.from_service.insert(canonical.clone());
                self.taken.insert(canonical.clone());
                (canonical, name, description)
            }
            None => {
                let position = token.occurrence_index + 1;
                let base = fallback_name(&self.options.fallback_prefix, position);
                let name = if self.taken.contains(&base) {
                    self.disambiguate(&base)
                } else {
                    base
                };
                self.taken.insert(name.clone());
                let description = format!(
                    "Unnamed field #{position}, written as {}",
                    self.delims.wrap(&token.raw_tag)
                );
                (name.clone(), name, description)
            }
        }
    }

    fn disambiguate(&self, base: &str) -> String {
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// `placeholder_007` for position 7; widens past 999.
pub fn fallback_name(prefix: &str, position: usize) -> String {
    format!("{prefix}_{position:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_template::TextTemplateEngine;

    fn spec(order: u32, name: &str) -> PlaceholderSpec {
        PlaceholderSpec {
            order,
            name: name.into(),
            description: format!("{name} field"),
        }
    }

    fn text(bound: &BoundDocument) -> String {
        String::from_utf8(bound.bytes().to_vec()).unwrap()
    }

    #[test]
    fn identical_tokens_bind_to_distinct_names() {
        let engine = TextTemplateEngine::new();
        let bound = bind(
            &engine,
            b"Name: [X]\nMail: [X]",
            &[spec(1, "full_name"), spec(2, "email")],
            &BindOptions::default(),
        )
        .unwrap();

        assert_eq!(bound.names(), &["full_name".to_string(), "email".to_string()]);
        assert_eq!(text(&bound), "Name: [full_name]\nMail: [email]");
        assert_eq!(bound.descriptions()["email"], "email field");
    }

    #[test]
    fn specs_are_sorted_by_order() {
        let engine = TextTemplateEngine::new();
        let bound = bind(
            &engine,
            b"[a] [b]",
            &[spec(2, "second"), spec(1, "first")],
            &BindOptions::default(),
        )
        .unwrap();
        assert_eq!(bound.names(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn shortfall_gets_padded_fallback_names() {
        let engine = TextTemplateEngine::new();
        let bound = bind(
            &engine,
            b"[a] [b] [c]",
            &[spec(1, "Company")],
            &BindOptions::default(),
        )
        .unwrap();
        assert_eq!(
            bound.names(),
            &[
                "Company".to_string(),
                "placeholder_002".to_string(),
                "placeholder_003".to_string()
            ]
        );
        assert!(bound.descriptions()["placeholder_003"].contains("[c]"));
        assert_eq!(text(&bound), "[Company] [placeholder_002] [placeholder_003]");
    }

    #[test]
    fn name_count_matches_token_count_and_names_are_unique() {
        let engine = TextTemplateEngine::new();
        let doc = b"[a] [b] [c] [d] [e]";
        let specs = [
            spec(1, "Party"),
            spec(2, "Party"),
            spec(3, "placeholder_005"),
            spec(4, ""),
        ];
        let bound = bind(&engine, doc, &specs, &BindOptions::default()).unwrap();
        assert_eq!(bound.token_count(), 5);

        let unique: HashSet<&String> = bound.names().iter().collect();
        assert_eq!(unique.len(), 5);
        assert_eq!(bound.names()[1], "Party_2");
        assert_eq!(bound.names()[3], "placeholder_004");
        assert_eq!(bound.names()[4], "placeholder_005_2");
    }

    #[test]
    fn disambiguated_names_remember_the_service_name() {
        let engine = TextTemplateEngine::new();
        let bound = bind(
            &engine,
            b"[A] agrees ... [Date] ... signed for [A].",
            &[spec(1, "Company Name"), spec(2, "Date"), spec(3, "Company Name")],
            &BindOptions::default(),
        )
        .unwrap();

        assert_eq!(bound.names()[2], "Company Name_2");
        assert_eq!(bound.service_name("Company Name_2"), "Company Name");
        assert_eq!(bound.service_name("Date"), "Date");
        assert_eq!(bound.service_name("unknown"), "unknown");
        assert_eq!(bound.siblings("Company Name"), vec!["Company Name", "Company Name_2"]);
        assert_eq!(bound.siblings("Date"), vec!["Date"]);
        assert!(bound.siblings("Company Name_2").is_empty());
    }

    #[test]
    fn share_policy_reuses_service_names() {
        let engine = TextTemplateEngine::new();
        let options = BindOptions {
            duplicates: DuplicateNamePolicy::Share,
            ..BindOptions::default()
        };
        let bound = bind(
            &engine,
            b"[Company] ... [COMPANY] ... [Date]",
            &[spec(1, "Company Name"), spec(2, "Company Name"), spec(3, "Date")],
            &options,
        )
        .unwrap();
        assert_eq!(bound.names()[0], bound.names()[1]);
        assert_eq!(bound.siblings("Company Name"), vec!["Company Name"]);
        assert_eq!(bound.descriptions().len(), 2);
        assert_eq!(text(&bound), "[Company Name] ... [Company Name] ... [Date]");
    }

    #[test]
    fn binding_ignores_token_content() {
        let engine = TextTemplateEngine::new();
        let specs = [spec(1, "a"), spec(2, "b")];
        let one = bind(&engine, b"x [foo] y [bar]", &specs, &BindOptions::default()).unwrap();
        let two = bind(&engine, b"x [baz] y [foo]", &specs, &BindOptions::default()).unwrap();
        assert_eq!(one.names(), two.names());
    }

    #[test]
    fn service_names_are_sanitized() {
        let engine = TextTemplateEngine::new();
        let bound = bind(
            &engine,
            b"[x]",
            &[spec(1, "  [Effective] Date ")],
            &BindOptions::default(),
        )
        .unwrap();
        assert_eq!(bound.names()[0], "Effective Date");
    }

    #[test]
    fn surplus_names_are_ignored() {
        let engine = TextTemplateEngine::new();
        let bound = bind(
            &engine,
            b"only [one]",
            &[spec(1, "a"), spec(2, "b")],
            &BindOptions::default(),
        )
        .unwrap();
        assert_eq!(bound.names(), &["a".to_string()]);
    }

    #[test]
    fn malformed_document_fails_without_output() {
        let engine = TextTemplateEngine::new();
        let result = bind(&engine, &[0xff, 0x00, 0xfe], &[], &BindOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn fallback_name_widens() {
        assert_eq!(fallback_name("placeholder", 7), "placeholder_007");
        assert_eq!(fallback_name("placeholder", 1234), "placeholder_1234");
    }
}
