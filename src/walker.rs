//! Graph walker.
//!
//! Starting from one entry, visits every field, follows entry links and
//! inline sub-entries depth-first, and registers each field it meets as a
//! [`TranslationEntry`] candidate. Traversal is bounded three ways:
//!
//! - depth: entries at `depth >= max_depth` are skipped, except the root
//! - cycles: an entry already on the active path is skipped
//! - size: once the registry holds `max_fields` candidates, nothing more is
//!   registered or descended into
//!
//! [`Walker::analyze`] walks the same graph read-only and reports a verdict per
//! leaf, for operators deciding what to translate.

use crate::classifier::{Classifier, TextClass};
use crate::config::TranslateConfig;
use crate::content::client::ContentClient;
use crate::content::model::{Entry, FieldValue};
use crate::registry::{ActivePath, FieldRegistry, Registration};
use crate::rich_text;
use crate::translation::TranslationEntry;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error, trace, warn};

type Visit<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Demote per-field discovery events from `debug` to `trace`
    pub silent: bool,
}

pub struct Walker<'a> {
    client: &'a dyn ContentClient,
    classifier: &'a Classifier,
    max_depth: usize,
    max_fields: usize,
    source_locale: String,
    options: WalkOptions,
}

/// Where a traversal currently stands
#[derive(Clone, Copy)]
struct Position<'p> {
    depth: usize,
    root_id: &'p str,
}

impl<'a> Walker<'a> {
    pub fn new(
        config: &TranslateConfig,
        classifier: &'a Classifier,
        client: &'a dyn ContentClient,
    ) -> Self {
        Self {
            client,
            classifier,
            max_depth: config.max_depth,
            max_fields: config.max_fields,
            source_locale: config.source_locale.clone(),
            options: WalkOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// Discover every field reachable from `root`, as candidates for `locale`
    pub async fn collect(&self, root: &Entry, locale: &str) -> FieldRegistry {
        let mut registry = FieldRegistry::new(self.max_fields);
        let mut path = ActivePath::new();
        let start = Position {
            depth: 0,
            root_id: root.id(),
        };
        self.visit(root, start, locale, &mut path, &mut registry)
            .await;

        debug!(
            entry_id = root.id(),
            locale,
            fields = registry.len(),
            entries = registry.entry_ids().len(),
            "collection finished"
        );
        registry
    }

    /// Whether an entry may be visited at `at`; logs the reason when not
    fn admits(&self, entry_id: &str, at: Position<'_>, path: &ActivePath) -> bool {
        if path.contains(entry_id) {
            warn!(entry_id, "circular reference detected, skipping");
            return false;
        }
        if entry_id != at.root_id && at.depth >= self.max_depth {
            warn!(
                entry_id,
                max_depth = self.max_depth,
                "max depth reached, skipping deeper traversal"
            );
            return false;
        }
        true
    }

    fn visit<'v>(
        &'v self,
        entry: &'v Entry,
        at: Position<'v>,
        locale: &'v str,
        path: &'v mut ActivePath,
        registry: &'v mut FieldRegistry,
    ) -> Visit<'v> {
        Box::pin(async move {
            if !self.admits(entry.id(), at, path) {
                return;
            }

            let mut guard = path.enter(entry.id());
            registry.cache_entry(entry.clone());

            for (name, localized) in &entry.fields {
                let value = localized.get(&self.source_locale);
                let existing = localized
                    .as_object()
                    .is_some_and(|locales| locales.keys().any(|l| *l != self.source_locale));

                self.discovered(entry.id(), name, value);

                let candidate = TranslationEntry::new(
                    entry.id(),
                    name,
                    value.cloned().unwrap_or(Value::Null),
                    &self.source_locale,
                    locale,
                )
                .with_existing_translation(existing);

                if registry.register(candidate) == Registration::CapReached {
                    return;
                }

                let Some(value) = value else { continue };
                let children = match FieldValue::decode(value) {
                    FieldValue::Array(items) => items,
                    single => vec![single],
                };

                for child in children {
                    if registry.is_full() {
                        return;
                    }
                    let next = Position {
                        depth: at.depth + 1,
                        root_id: at.root_id,
                    };
                    if let Some(child) = self.child_entry(&child, registry.resolved_mut()).await {
                        self.visit(&child, next, locale, &mut guard, registry).await;
                    }
                }
            }
        })
    }

    fn discovered(&self, entry_id: &str, field: &str, value: Option<&Value>) {
        let kind = value
            .map(|v| FieldValue::decode(v).type_name())
            .unwrap_or("missing");
        if self.options.silent {
            trace!(entry_id, field, kind, "collecting field");
        } else {
            debug!(entry_id, field, kind, "collecting field");
        }
    }

    /// The entry behind a link or inline sub-entry, if the value is either
    async fn child_entry(
        &self,
        value: &FieldValue<'_>,
        cache: &mut HashMap<String, Entry>,
    ) -> Option<Entry> {
        match value {
            FieldValue::EntryLink(id) => self.resolve(id, cache).await,
            FieldValue::SubEntry(raw) => match serde_json::from_value::<Entry>((*raw).clone()) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(error = %err, "inline entry could not be decoded, skipping");
                    None
                }
            },
            _ => None,
        }
    }

    /// Fetch a linked entry, consulting the run's cache first
    async fn resolve(&self, entry_id: &str, cache: &mut HashMap<String, Entry>) -> Option<Entry> {
        if let Some(entry) = cache.get(entry_id) {
            return Some(entry.clone());
        }
        match self.client.get_entry(entry_id).await {
            Ok(Some(entry)) => {
                cache.insert(entry_id.to_string(), entry.clone());
                Some(entry)
            }
            Ok(None) => {
                warn!(entry_id, "linked entry not found, skipping");
                None
            }
            Err(err) => {
                error!(entry_id, error = %err, "failed to resolve linked entry");
                None
            }
        }
    }

    /// Report a verdict for every leaf reachable from `root`
    pub async fn analyze(&self, root: &Entry) -> Vec<FieldAnalysis> {
        let mut report = Vec::new();
        let mut cache = HashMap::new();
        let mut path = ActivePath::new();
        let start = Position {
            depth: 0,
            root_id: root.id(),
        };
        self.analyze_entry(root, "", start, &mut path, &mut cache, &mut report)
            .await;
        report
    }

    fn analyze_entry<'v>(
        &'v self,
        entry: &'v Entry,
        prefix: &'v str,
        at: Position<'v>,
        path: &'v mut ActivePath,
        cache: &'v mut HashMap<String, Entry>,
        report: &'v mut Vec<FieldAnalysis>,
    ) -> Visit<'v> {
        Box::pin(async move {
            if !self.admits(entry.id(), at, path) {
                return;
            }
            let mut guard = path.enter(entry.id());
            let next = Position {
                depth: at.depth + 1,
                root_id: at.root_id,
            };

            for (name, localized) in &entry.fields {
                let full = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };

                if self.classifier.is_skippable(name) {
                    report.push(FieldAnalysis::skipped(&full, SkipReason::SkipList));
                    continue;
                }

                let Some(value) = localized.get(&self.source_locale) else {
                    report.push(FieldAnalysis::skipped(&full, SkipReason::Unsupported("missing")));
                    continue;
                };

                match FieldValue::decode(value) {
                    FieldValue::Text(text) => {
                        report.push(FieldAnalysis::text(&full, self.classifier.classify_text(text)))
                    }
                    FieldValue::RichDocument(raw) => match rich_text::parse_document(raw) {
                        Ok(document) => {
                            for key in rich_text::extract(&document).into_keys() {
                                report.push(FieldAnalysis::translatable(&format!("{}.{}", full, key)));
                            }
                        }
                        Err(_) => report.push(FieldAnalysis::skipped(
                            &full,
                            SkipReason::Unsupported("richText"),
                        )),
                    },
                    FieldValue::AssetLink => {
                        report.push(FieldAnalysis::skipped(&full, SkipReason::AssetReference))
                    }
                    FieldValue::Object(map) => self.analyze_object(&full, map, report),
                    FieldValue::Array(items) => {
                        for (i, item) in items.iter().enumerate() {
                            let item_path = format!("{}[{}]", full, i);
                            if let FieldValue::Object(map) = item {
                                self.analyze_object(&item_path, map, report);
                            } else if let Some(child) = self.child_entry(item, cache).await {
                                self.analyze_entry(&child, &item_path, next, &mut guard, cache, report)
                                    .await;
                            }
                        }
                    }
                    link @ (FieldValue::EntryLink(_) | FieldValue::SubEntry(_)) => {
                        if let Some(child) = self.child_entry(&link, cache).await {
                            self.analyze_entry(&child, &full, next, &mut guard, cache, report)
                                .await;
                        }
                    }
                    other @ FieldValue::Opaque(_) => report.push(FieldAnalysis::skipped(
                        &full,
                        SkipReason::Unsupported(other.type_name()),
                    )),
                }
            }
        })
    }

    /// Synthetic `<path>.<key>` leaves for the string properties of a plain object
    fn analyze_object(
        &self,
        path: &str,
        map: &serde_json::Map<String, Value>,
        report: &mut Vec<FieldAnalysis>,
    ) {
        for (key, value) in map {
            if let Value::String(text) = value {
                let leaf = format!("{}.{}", path, key);
                if self.classifier.is_skippable(key) {
                    report.push(FieldAnalysis::skipped(&leaf, SkipReason::SkipList));
                } else {
                    report.push(FieldAnalysis::text(&leaf, self.classifier.classify_text(text)));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SkipList,
    AbsoluteUrl,
    RelativePath,
    AnchorLink,
    TooShort,
    AssetReference,
    Unsupported(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SkipList => f.write_str("skip list"),
            SkipReason::AbsoluteUrl => f.write_str("absolute URL"),
            SkipReason::RelativePath => f.write_str("relative path"),
            SkipReason::AnchorLink => f.write_str("anchor link"),
            SkipReason::TooShort => f.write_str("too short"),
            SkipReason::AssetReference => f.write_str("asset reference"),
            SkipReason::Unsupported(kind) => write!(f, "not translatable ({})", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStatus {
    Translatable,
    /// Translatable, but looks like it could be a path
    PossibleUrl,
    Skipped(SkipReason),
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStatus::Translatable => f.write_str("✓"),
            FieldStatus::PossibleUrl => f.write_str("! possible URL"),
            FieldStatus::Skipped(reason) => write!(f, "✗ {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnalysis {
    pub path: String,
    pub status: FieldStatus,
}

impl FieldAnalysis {
    fn translatable(path: &str) -> Self {
        Self {
            path: path.to_string(),
            status: FieldStatus::Translatable,
        }
    }

    fn skipped(path: &str, reason: SkipReason) -> Self {
        Self {
            path: path.to_string(),
            status: FieldStatus::Skipped(reason),
        }
    }

    fn text(path: &str, class: TextClass) -> Self {
        let status = match class {
            TextClass::Translatable => FieldStatus::Translatable,
            TextClass::PossibleUrl => FieldStatus::PossibleUrl,
            TextClass::TooShort => FieldStatus::Skipped(SkipReason::TooShort),
            TextClass::AbsoluteUrl => FieldStatus::Skipped(SkipReason::AbsoluteUrl),
            TextClass::RelativePath => FieldStatus::Skipped(SkipReason::RelativePath),
            TextClass::AnchorLink => FieldStatus::Skipped(SkipReason::AnchorLink),
        };
        Self {
            path: path.to_string(),
            status,
        }
    }

    pub fn is_translatable(&self) -> bool {
        !matches!(self.status, FieldStatus::Skipped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::memory::MemoryClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn link(id: &str) -> Value {
        json!({"sys": {"type": "Link", "linkType": "Entry", "id": id}})
    }

    fn fields(registry: &FieldRegistry) -> Vec<String> {
        registry
            .all()
            .iter()
            .map(|e| format!("{}.{}", e.entry_id, e.field_name))
            .collect()
    }

    fn config(max_depth: usize, max_fields: usize) -> TranslateConfig {
        TranslateConfig {
            max_depth,
            max_fields,
            ..TranslateConfig::default()
        }
    }

    // ========== Collect ==========

    #[tokio::test]
    async fn collects_depth_first_in_field_order() {
        let root = Entry::new("root", "page")
            .with_field("title", "en", json!("Home"))
            .with_field("sections", "en", json!([link("s1"), link("s2")]))
            .with_field("footer", "en", json!("Footer text"));
        let client = MemoryClient::with_entries([
            Entry::new("s1", "section").with_field("heading", "en", json!("First")),
            Entry::new("s2", "section").with_field("heading", "en", json!("Second")),
        ]);
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let registry = Walker::new(&config, &classifier, &client)
            .collect(&root, "de")
            .await;

        assert_eq!(
            fields(&registry),
            vec![
                "root.title",
                "root.sections",
                "s1.heading",
                "s2.heading",
                "root.footer"
            ]
        );
        assert!(registry.resolved_entry("s1").is_some());
    }

    #[tokio::test]
    async fn inline_sub_entries_are_walked() {
        let inline = json!({
            "sys": {"id": "inline1", "contentType": {"sys": {"type": "Link", "linkType": "ContentType", "id": "card"}}},
            "fields": {"caption": {"en": "A caption"}}
        });
        let root = Entry::new("root", "page").with_field("card", "en", inline);
        let client = MemoryClient::new();
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let registry = Walker::new(&config, &classifier, &client)
            .collect(&root, "de")
            .await;

        assert_eq!(fields(&registry), vec!["root.card", "inline1.caption"]);
    }

    #[tokio::test]
    async fn missing_links_are_skipped() {
        let root = Entry::new("root", "page")
            .with_field("related", "en", link("gone"))
            .with_field("title", "en", json!("Still here"));
        let client = MemoryClient::new();
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let registry = Walker::new(&config, &classifier, &client)
            .collect(&root, "de")
            .await;

        assert_eq!(fields(&registry), vec!["root.related", "root.title"]);
    }

    #[tokio::test]
    async fn links_are_fetched_once_per_run() {
        let root = Entry::new("root", "page")
            .with_field("a", "en", link("shared"))
            .with_field("b", "en", link("shared"));
        let client = MemoryClient::with_entries([
            Entry::new("shared", "card").with_field("text", "en", json!("Shared text")),
        ]);
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let registry = Walker::new(&config, &classifier, &client)
            .collect(&root, "de")
            .await;

        assert_eq!(client.call_count("get_entry:shared"), 1);
        assert_eq!(fields(&registry), vec!["root.a", "shared.text", "root.b"]);
    }

    #[tokio::test]
    async fn existing_translation_flag() {
        let root = Entry::new("root", "page")
            .with_field("title", "en", json!("Hello"))
            .with_field("title", "de", json!("Hallo"))
            .with_field("body", "en", json!("Body text"));
        let client = MemoryClient::new();
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let registry = Walker::new(&config, &classifier, &client)
            .collect(&root, "fr")
            .await;

        assert!(registry.get("root", "title").unwrap().has_existing_translation);
        assert!(!registry.get("root", "body").unwrap().has_existing_translation);
        let names: Vec<String> = registry
            .translatable(&classifier)
            .into_iter()
            .map(|e| e.field_name)
            .collect();
        assert_eq!(names, vec!["body"]);
    }

    #[tokio::test]
    async fn root_is_processed_even_at_minimum_depth() {
        let root = Entry::new("root", "page")
            .with_field("title", "en", json!("Home"))
            .with_field("next", "en", link("child"));
        let client = MemoryClient::with_entries([
            Entry::new("child", "page").with_field("title", "en", json!("Child")),
        ]);
        let config = config(1, 100);
        let classifier = Classifier::new(&config).unwrap();
        let registry = Walker::new(&config, &classifier, &client)
            .with_options(WalkOptions { silent: true })
            .collect(&root, "de")
            .await;

        assert_eq!(fields(&registry), vec!["root.title", "root.next"]);
    }

    // ========== Analyze ==========

    #[tokio::test]
    async fn analyze_reports_every_leaf() {
        let doc = json!({
            "nodeType": "document", "data": {},
            "content": [{"nodeType": "paragraph", "data": {}, "content": [
                {"nodeType": "text", "value": "Rich words", "marks": [], "data": {}}
            ]}]
        });
        let root = Entry::new("root", "page")
            .with_field("title", "en", json!("Home"))
            .with_field("slug", "en", json!("home"))
            .with_field("href", "en", json!("https://example.com/x"))
            .with_field("path", "en", json!("docs/getting-started"))
            .with_field("body", "en", doc)
            .with_field("meta", "en", json!({"caption": "A caption", "width": 3}))
            .with_field("image", "en", json!({"sys": {"type": "Link", "linkType": "Asset", "id": "img"}}))
            .with_field("cards", "en", json!([link("c1")]))
            .with_field("order", "en", json!(4));
        let client = MemoryClient::with_entries([
            Entry::new("c1", "card").with_field("label", "en", json!("Card label")),
        ]);
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let report = Walker::new(&config, &classifier, &client).analyze(&root).await;

        let rows: Vec<(String, FieldStatus)> =
            report.into_iter().map(|a| (a.path, a.status)).collect();
        assert_eq!(
            rows,
            vec![
                ("title".to_string(), FieldStatus::Translatable),
                ("slug".to_string(), FieldStatus::Skipped(SkipReason::SkipList)),
                ("href".to_string(), FieldStatus::Skipped(SkipReason::AbsoluteUrl)),
                ("path".to_string(), FieldStatus::PossibleUrl),
                ("body.content[0].content[0]".to_string(), FieldStatus::Translatable),
                ("meta.caption".to_string(), FieldStatus::Translatable),
                ("image".to_string(), FieldStatus::Skipped(SkipReason::AssetReference)),
                ("cards[0].label".to_string(), FieldStatus::Translatable),
                ("order".to_string(), FieldStatus::Skipped(SkipReason::Unsupported("value"))),
            ]
        );
    }

    fn paths(report: Vec<FieldAnalysis>) -> Vec<String> {
        report.into_iter().map(|a| a.path).collect()
    }

    #[tokio::test]
    async fn analyze_stops_at_cycles() {
        let a = Entry::new("a", "page")
            .with_field("title", "en", json!("Entry A"))
            .with_field("partner", "en", link("b"));
        let b = Entry::new("b", "page")
            .with_field("title", "en", json!("Entry B"))
            .with_field("partner", "en", link("a"));
        let client = MemoryClient::with_entries([a.clone(), b]);
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let report = Walker::new(&config, &classifier, &client).analyze(&a).await;

        assert_eq!(paths(report), vec!["title", "partner.title"]);
    }

    #[tokio::test]
    async fn analyze_respects_max_depth() {
        let chain: Vec<Entry> = (0..4)
            .map(|i| {
                Entry::new(&format!("e{}", i), "page")
                    .with_field("title", "en", json!(format!("Title {}", i)))
                    .with_field("next", "en", link(&format!("e{}", i + 1)))
            })
            .collect();
        let client = MemoryClient::with_entries(chain.clone());
        let config = config(2, 100);
        let classifier = Classifier::new(&config).unwrap();
        let report = Walker::new(&config, &classifier, &client)
            .analyze(&chain[0])
            .await;

        assert_eq!(paths(report), vec!["title", "next.title"]);
        assert_eq!(client.call_count("get_entry:e2"), 1);
        assert_eq!(client.call_count("get_entry:e3"), 0);
    }

    #[tokio::test]
    async fn analyze_walks_inline_entries_in_arrays() {
        let inline = json!({
            "sys": {"id": "inline1", "contentType": {"sys": {"type": "Link", "linkType": "ContentType", "id": "card"}}},
            "fields": {"caption": {"en": "A caption"}}
        });
        let root = Entry::new("root", "page")
            .with_field("cards", "en", json!([inline, {"note": "Plain note"}]));
        let client = MemoryClient::new();
        let config = TranslateConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let report = Walker::new(&config, &classifier, &client).analyze(&root).await;

        let rows: Vec<(String, FieldStatus)> =
            report.into_iter().map(|a| (a.path, a.status)).collect();
        assert_eq!(
            rows,
            vec![
                ("cards[0].caption".to_string(), FieldStatus::Translatable),
                ("cards[1].note".to_string(), FieldStatus::Translatable),
            ]
        );
    }

    #[test]
    fn status_labels() {
        assert_eq!(FieldStatus::Translatable.to_string(), "✓");
        assert_eq!(
            FieldStatus::Skipped(SkipReason::AnchorLink).to_string(),
            "✗ anchor link"
        );
    }
}
