//! Entry, link and content-type shapes as the content service serializes them.
//!
//! Field values stay as raw JSON on the entry so that anything the tool does not
//! understand survives a fetch/update round trip untouched. [`FieldValue::decode`]
//! turns one raw value into a closed set of variants exactly once, and the
//! classifier and walker match on that instead of re-sniffing the JSON.

use crate::classifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ "sys": { "type": "Link", "linkType": "Entry", "id": "..." } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    #[serde(rename = "type")]
    pub kind: String,
    pub link_type: String,
    pub id: String,
}

impl Link {
    pub fn content_type(id: &str) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".into(),
                link_type: "ContentType".into(),
                id: id.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySys {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A content entry: `fields` maps field id → locale → value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Entry {
    pub fn new(id: &str, content_type: &str) -> Self {
        Self {
            sys: EntrySys {
                id: id.into(),
                kind: Some("Entry".into()),
                version: Some(1),
                content_type: Some(Link::content_type(content_type)),
                extra: Map::new(),
            },
            fields: Map::new(),
        }
    }

    /// Builder used by fixtures: set `fields[name][locale] = value`
    pub fn with_field(mut self, name: &str, locale: &str, value: Value) -> Self {
        let slot = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(locales) = slot {
            locales.insert(locale.to_string(), value);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn content_type_id(&self) -> Option<&str> {
        self.sys.content_type.as_ref().map(|l| l.sys.id.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Locale map of one field
    pub fn localized(&self, name: &str) -> Option<&Map<String, Value>> {
        self.fields.get(name).and_then(Value::as_object)
    }

    pub fn value(&self, name: &str, locale: &str) -> Option<&Value> {
        self.localized(name).and_then(|locales| locales.get(locale))
    }

    /// Write one locale of an existing field. Returns false if the field does not exist.
    pub fn set_value(&mut self, name: &str, locale: &str, value: Value) -> bool {
        match self.fields.get_mut(name).and_then(Value::as_object_mut) {
            Some(locales) => {
                locales.insert(locale.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Human label: `title`, then `name`, then the id
    pub fn display_title(&self, locale: &str) -> String {
        ["title", "name"]
            .iter()
            .find_map(|f| self.value(f, locale).and_then(Value::as_str))
            .unwrap_or(&self.sys.id)
            .to_string()
    }
}

/// One field value, decoded once.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    RichDocument(&'a Value),
    /// Link to another entry, carrying the target id
    EntryLink(&'a str),
    AssetLink,
    /// Entry embedded inline (has `sys.contentType`)
    SubEntry(&'a Value),
    Array(Vec<FieldValue<'a>>),
    /// Plain object that is neither a link, a document nor an entry
    Object(&'a Map<String, Value>),
    /// Numbers, booleans, null and links of other kinds
    Opaque(&'a Value),
}

impl<'a> FieldValue<'a> {
    pub fn decode(value: &'a Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => FieldValue::Array(items.iter().map(FieldValue::decode).collect()),
            Value::Object(map) => {
                if classifier::is_asset_reference(value) {
                    FieldValue::AssetLink
                } else if let Some(id) = classifier::entry_link_id(value) {
                    FieldValue::EntryLink(id)
                } else if classifier::is_rich_document(value) {
                    FieldValue::RichDocument(value)
                } else if classifier::is_sub_entry(value) {
                    FieldValue::SubEntry(value)
                } else if map.contains_key("sys") {
                    FieldValue::Opaque(value)
                } else {
                    FieldValue::Object(map)
                }
            }
            _ => FieldValue::Opaque(value),
        }
    }

    /// Short type label used in reports
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::RichDocument(_) => "richText",
            FieldValue::EntryLink(_) => "entry link",
            FieldValue::AssetLink => "asset",
            FieldValue::SubEntry(_) => "entry",
            FieldValue::Array(_) => "array",
            FieldValue::Object(_) => "object",
            FieldValue::Opaque(_) => "value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeSys {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub sys: ContentTypeSys,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl ContentType {
    pub fn new(id: &str, fields: Vec<FieldSchema>) -> Self {
        Self {
            sys: ContentTypeSys { id: id.into() },
            name: None,
            fields,
        }
    }

    pub fn field(&self, id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub validations: Vec<Value>,
}

impl FieldSchema {
    pub const SYMBOL_MAX_CHARS: usize = 255;
    pub const TEXT_MAX_CHARS: usize = 50_000;

    pub fn new(id: &str, field_type: &str) -> Self {
        Self {
            id: id.into(),
            field_type: field_type.into(),
            validations: Vec::new(),
        }
    }

    pub fn with_max_size(mut self, max: usize) -> Self {
        self.validations
            .push(serde_json::json!({ "size": { "max": max } }));
        self
    }

    /// Character limit for string values, if the field type is length-constrained
    ///
    /// An explicit `size.max` validation wins over the type's built-in limit.
    pub fn max_length(&self) -> Option<usize> {
        let explicit = self.validations.iter().find_map(|v| {
            v.pointer("/size/max")
                .and_then(Value::as_u64)
                .map(|max| max as usize)
        });

        match self.field_type.as_str() {
            "Symbol" => Some(explicit.unwrap_or(Self::SYMBOL_MAX_CHARS)),
            "Text" => Some(explicit.unwrap_or(Self::TEXT_MAX_CHARS)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn entry_round_trips_unknown_sys_keys() {
        let raw = json!({
            "sys": {
                "id": "e1",
                "type": "Entry",
                "version": 7,
                "space": { "sys": { "id": "s" } },
                "contentType": { "sys": { "type": "Link", "linkType": "ContentType", "id": "page" } }
            },
            "fields": { "title": { "en": "Hello" } }
        });
        let entry: Entry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.id(), "e1");
        assert_eq!(entry.content_type_id(), Some("page"));
        assert_eq!(entry.sys.version, Some(7));
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn field_order_is_preserved() {
        let raw = r#"{"sys":{"id":"e"},"fields":{"zeta":{"en":"z"},"alpha":{"en":"a"},"mid":{"en":"m"}}}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        let names: Vec<&str> = entry.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn set_value_only_touches_existing_fields() {
        let mut entry = Entry::new("e1", "page").with_field("title", "en", json!("Hello"));
        assert!(entry.set_value("title", "de", json!("Hallo")));
        assert!(!entry.set_value("missing", "de", json!("x")));
        assert_eq!(entry.value("title", "de"), Some(&json!("Hallo")));
        assert_eq!(entry.value("title", "en"), Some(&json!("Hello")));
    }

    #[test]
    fn display_title_falls_back() {
        let titled = Entry::new("e1", "page").with_field("title", "en", json!("Home"));
        assert_eq!(titled.display_title("en"), "Home");
        let named = Entry::new("e2", "page").with_field("name", "en", json!("Footer"));
        assert_eq!(named.display_title("en"), "Footer");
        assert_eq!(Entry::new("e3", "page").display_title("en"), "e3");
    }

    // ========== Decode Tests ==========

    #[test]
    fn decode_variants() {
        let text = json!("Hello");
        assert_eq!(FieldValue::decode(&text), FieldValue::Text("Hello"));

        let entry_link = json!({"sys": {"type": "Link", "linkType": "Entry", "id": "x"}});
        assert_eq!(FieldValue::decode(&entry_link), FieldValue::EntryLink("x"));

        let asset_link = json!({"sys": {"type": "Link", "linkType": "Asset", "id": "a"}});
        assert_eq!(FieldValue::decode(&asset_link), FieldValue::AssetLink);

        let asset = json!({"sys": {"type": "Asset", "id": "a"}, "fields": {}});
        assert_eq!(FieldValue::decode(&asset), FieldValue::AssetLink);

        let doc = json!({"nodeType": "document", "data": {}, "content": []});
        assert_eq!(FieldValue::decode(&doc), FieldValue::RichDocument(&doc));

        let sub = json!({"sys": {"id": "s", "contentType": {"sys": {"id": "card"}}}, "fields": {}});
        assert_eq!(FieldValue::decode(&sub), FieldValue::SubEntry(&sub));

        let object = json!({"caption": "A caption"});
        assert!(matches!(FieldValue::decode(&object), FieldValue::Object(_)));

        let number = json!(42);
        assert_eq!(FieldValue::decode(&number), FieldValue::Opaque(&number));

        let tag_link = json!({"sys": {"type": "Link", "linkType": "Tag", "id": "t"}});
        assert_eq!(FieldValue::decode(&tag_link), FieldValue::Opaque(&tag_link));
    }

    #[test]
    fn decode_array_elements() {
        let value = json!(["one", {"sys": {"type": "Link", "linkType": "Entry", "id": "x"}}, 3]);
        let three = json!(3);
        assert_eq!(
            FieldValue::decode(&value),
            FieldValue::Array(vec![
                FieldValue::Text("one"),
                FieldValue::EntryLink("x"),
                FieldValue::Opaque(&three),
            ])
        );
    }

    // ========== Schema Tests ==========

    #[test]
    fn max_length_by_type_and_validation() {
        assert_eq!(FieldSchema::new("t", "Symbol").max_length(), Some(255));
        assert_eq!(FieldSchema::new("t", "Text").max_length(), Some(50_000));
        assert_eq!(
            FieldSchema::new("t", "Symbol").with_max_size(80).max_length(),
            Some(80)
        );
        assert_eq!(FieldSchema::new("t", "RichText").max_length(), None);
        assert_eq!(FieldSchema::new("t", "Integer").with_max_size(3).max_length(), None);
    }

    #[test]
    fn content_type_deserializes_schema() {
        let ct: ContentType = serde_json::from_value(json!({
            "sys": {"id": "page"},
            "name": "Page",
            "fields": [
                {"id": "title", "type": "Symbol", "localized": true, "validations": [{"size": {"max": 60}}]},
                {"id": "body", "type": "RichText"}
            ]
        }))
        .unwrap();
        assert_eq!(ct.field("title").and_then(FieldSchema::max_length), Some(60));
        assert_eq!(ct.field("body").and_then(FieldSchema::max_length), None);
        assert!(ct.field("nope").is_none());
    }
}
