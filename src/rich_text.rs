//! Rich-text document codec.
//!
//! [`extract`] flattens every text leaf of a document into a map keyed by its
//! positional [`PathKey`]; [`reconstruct`] produces a copy of the document with
//! translated values spliced in at the same keys. Both passes derive keys with
//! the same rule, so `reconstruct(d, extract(d))` is always well-formed and
//! leaves every node's kind, marks and data untouched.

use crate::mt::translator::{MachineTranslator, translate_text};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DOCUMENT: &str = "document";
pub const TEXT: &str = "text";
pub const EMBEDDED_ENTRY_BLOCK: &str = "embedded-entry-block";
pub const EMBEDDED_ENTRY_INLINE: &str = "embedded-entry-inline";

/// One node of a rich-text tree
///
/// Keys this type does not model are kept in `extra` so a node serializes back
/// to exactly what was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How the codec treats a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    /// Reference to another entry; never descended into
    EmbeddedEntry,
    Container,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.node_type.as_str() {
            TEXT => NodeKind::Text,
            EMBEDDED_ENTRY_BLOCK | EMBEDDED_ENTRY_INLINE => NodeKind::EmbeddedEntry,
            _ => NodeKind::Container,
        }
    }

    pub fn text(value: &str) -> Self {
        Self {
            node_type: TEXT.into(),
            value: Some(value.into()),
            marks: Some(Vec::new()),
            data: Some(Value::Object(Map::new())),
            content: None,
            extra: Map::new(),
        }
    }

    pub fn container(node_type: &str, content: Vec<Node>) -> Self {
        Self {
            node_type: node_type.into(),
            value: None,
            marks: None,
            data: Some(Value::Object(Map::new())),
            content: Some(content),
            extra: Map::new(),
        }
    }

    /// Total number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self
            .content
            .iter()
            .flatten()
            .map(Node::node_count)
            .sum::<usize>()
    }
}

/// Positional address of a node: `content[i].content[j]...`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey(Vec<usize>);

impl PathKey {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "content[{}]", index)?;
        }
        Ok(())
    }
}

impl FromStr for PathKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('.')
            .map(|segment| {
                segment
                    .strip_prefix("content[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .and_then(|index| index.parse::<usize>().ok())
                    .ok_or_else(|| format!("invalid path segment '{}'", segment))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Text leaves in document order
pub type TextMap = BTreeMap<PathKey, String>;

pub fn parse_document(value: &Value) -> Result<Node, serde_json::Error> {
    Node::deserialize(value)
}

/// Collect every non-empty text leaf under its path key
pub fn extract(document: &Node) -> TextMap {
    let mut leaves = TextMap::new();
    collect_text(document, PathKey::root(), &mut leaves);
    leaves
}

fn collect_text(node: &Node, path: PathKey, leaves: &mut TextMap) {
    match node.kind() {
        NodeKind::Text => {
            if let Some(value) = node.value.as_deref().filter(|v| !v.is_empty()) {
                leaves.insert(path, value.to_string());
            }
        }
        NodeKind::EmbeddedEntry => {}
        NodeKind::Container => {
            for (i, child) in node.content.iter().flatten().enumerate() {
                collect_text(child, path.child(i), leaves);
            }
        }
    }
}

/// Copy `document`, replacing text values found in `translations`
pub fn reconstruct(document: &Node, translations: &TextMap) -> Node {
    rebuild(document, &PathKey::root(), translations)
}

fn rebuild(node: &Node, path: &PathKey, translations: &TextMap) -> Node {
    let mut copy = node.clone();
    match node.kind() {
        NodeKind::Text => {
            if node.value.as_deref().is_some_and(|v| !v.is_empty()) {
                if let Some(translated) = translations.get(path) {
                    copy.value = Some(translated.clone());
                }
            }
        }
        NodeKind::EmbeddedEntry => {}
        NodeKind::Container => {
            if let Some(children) = &node.content {
                copy.content = Some(
                    children
                        .iter()
                        .enumerate()
                        .map(|(i, child)| rebuild(child, &path.child(i), translations))
                        .collect(),
                );
            }
        }
    }
    copy
}

/// Outcome of translating a whole document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTranslation {
    pub document: Node,
    pub translated: usize,
    /// Leaves whose translation failed; they keep their source text
    pub failed: Vec<PathKey>,
}

/// Extract, translate every leaf, and splice the results back
pub async fn translate_document(
    document: &Node,
    translator: &dyn MachineTranslator,
    source_locale: &str,
    target_locale: &str,
) -> DocumentTranslation {
    let leaves = extract(document);
    let mut translations = TextMap::new();
    let mut failed = Vec::new();

    for (path, text) in leaves {
        match translate_text(translator, &text, source_locale, target_locale).await {
            Some(translated) => {
                translations.insert(path, translated);
            }
            None => failed.push(path),
        }
    }

    DocumentTranslation {
        document: reconstruct(document, &translations),
        translated: translations.len(),
        failed,
    }
}
