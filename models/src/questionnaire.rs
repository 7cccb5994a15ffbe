//! Questionnaires: forms whose items nest to arbitrary depth.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use record_codec_core::{
    ArrayNode, BooleanNode, CollectFields, DecodeContext, DecodeError, Decoder, Encoder,
    EncodingError, FieldLayers, FieldSet, LazyValue, ObjectView, ObjectWriter, OneOfNode,
    Optionalish, OptionalishDefault, Recursive, SchemaBuildError, SharedNode, StringNode, array,
    boolean, non_empty_string, one_of, optionalish, optionalish_default, recursive, shared, string,
};
use serde_json::Value;

use crate::resource::{ResourceBase, ResourceFields};

/// Kind of answer an item collects, from its `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    /// Container for nested items; collects no answer itself
    Group,
    /// Static text shown to the respondent
    Display,
    Boolean,
    Decimal,
    Integer,
    Date,
    String,
    Text,
    Choice,
}

/// One question, group or text block of a questionnaire.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionnaireItem {
    /// Id that responses use to point back at this item (e.g., "1.2")
    pub link_id: String,
    /// Prompt shown to the respondent
    pub text: Option<String>,
    /// Encoded as `type`
    pub kind: ItemType,
    /// Defaults to `false` when absent
    pub required: bool,
    /// Whether more than one answer is allowed; defaults to `false`
    pub repeats: bool,
    /// Nested items, encoded as `item`
    pub items: Option<Vec<QuestionnaireItem>>,
}

impl QuestionnaireItem {
    /// An item with no text, children or flags set.
    pub fn new(link_id: impl Into<String>, kind: ItemType) -> Self {
        Self {
            link_id: link_id.into(),
            text: None,
            kind,
            required: false,
            repeats: false,
            items: None,
        }
    }

    /// Direct children, empty when the item has none.
    pub fn children(&self) -> &[QuestionnaireItem] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// Codec for one [`QuestionnaireItem`], recursing into nested items.
pub struct QuestionnaireItemSchema {
    link_id: StringNode,
    text: Optionalish<StringNode>,
    kind: OneOfNode<ItemType>,
    flag: OptionalishDefault<BooleanNode>,
    items: Optionalish<ArrayNode<Recursive<QuestionnaireItem>>>,
}

impl QuestionnaireItemSchema {
    fn new() -> Self {
        Self {
            link_id: non_empty_string(),
            text: optionalish(string()),
            kind: one_of(&[
                ("group", ItemType::Group),
                ("display", ItemType::Display),
                ("boolean", ItemType::Boolean),
                ("decimal", ItemType::Decimal),
                ("integer", ItemType::Integer),
                ("date", ItemType::Date),
                ("string", ItemType::String),
                ("text", ItemType::Text),
                ("choice", ItemType::Choice),
            ]),
            flag: optionalish_default(boolean(), false),
            items: optionalish(array(recursive("QuestionnaireItem", item_schema))),
        }
    }
}

/// The process-wide questionnaire item node.
///
/// Nested `item` arrays refer back to this node through a thunk, so the
/// node is built once and its children are resolved on first use.
pub fn item_schema() -> SharedNode<QuestionnaireItem> {
    static ITEM: OnceLock<SharedNode<QuestionnaireItem>> = OnceLock::new();
    ITEM.get_or_init(|| shared(QuestionnaireItemSchema::new()))
        .clone()
}

impl Decoder for QuestionnaireItemSchema {
    type Output = QuestionnaireItem;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<QuestionnaireItem, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (link_id, text, kind, required, repeats, items) = (
            object.field(cx, "linkId", &self.link_id),
            object.field(cx, "text", &self.text),
            object.field(cx, "type", &self.kind),
            object.field(cx, "required", &self.flag),
            object.field(cx, "repeats", &self.flag),
            object.field(cx, "item", &self.items),
        )
            .collect_fields()?;
        Ok(QuestionnaireItem {
            link_id,
            text,
            kind,
            required,
            repeats,
            items,
        })
    }

    fn expected(&self) -> String {
        "QuestionnaireItem".to_string()
    }
}

impl Encoder for QuestionnaireItemSchema {
    type Input = QuestionnaireItem;

    fn encode(&self, item: &QuestionnaireItem) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("linkId", &self.link_id, &item.link_id)?
            .field("text", &self.text, &item.text)?
            .field("type", &self.kind, &item.kind)?
            .field("required", &self.flag, &item.required)?
            .field("repeats", &self.flag, &item.repeats)?
            .field("item", &self.items, &item.items)?;
        Ok(out.finish())
    }
}

/// Publication state of a questionnaire definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationStatus {
    Draft,
    Active,
    Retired,
    Unknown,
}

/// Child positions leading from the top-level items to one item.
type LinkIndex = BTreeMap<String, Vec<usize>>;

fn index_links(items: &[QuestionnaireItem]) -> LinkIndex {
    fn walk(items: &[QuestionnaireItem], trail: &mut Vec<usize>, index: &mut LinkIndex) {
        for (position, item) in items.iter().enumerate() {
            trail.push(position);
            index
                .entry(item.link_id.clone())
                .or_insert_with(|| trail.clone());
            walk(item.children(), trail, index);
            trail.pop();
        }
    }

    let mut index = LinkIndex::new();
    walk(items, &mut Vec::new(), &mut index);
    tracing::trace!(links = index.len(), "indexed questionnaire items");
    index
}

/// A questionnaire definition.
///
/// Item lookup by `linkId` goes through an index that is built the first
/// time it is needed. When a `linkId` repeats, the first item in document
/// order wins.
pub struct Questionnaire {
    pub base: ResourceBase,
    /// Canonical URL responses reference this definition by
    pub url: Option<String>,
    pub title: Option<String>,
    pub status: PublicationStatus,
    items: Arc<[QuestionnaireItem]>,
    links: LazyValue<LinkIndex>,
}

impl Questionnaire {
    /// A questionnaire over `items`; the link index is built on first lookup.
    pub fn new(
        base: ResourceBase,
        url: Option<String>,
        title: Option<String>,
        status: PublicationStatus,
        items: Vec<QuestionnaireItem>,
    ) -> Self {
        Self::with_items(base, url, title, status, items.into())
    }

    fn with_items(
        base: ResourceBase,
        url: Option<String>,
        title: Option<String>,
        status: PublicationStatus,
        items: Arc<[QuestionnaireItem]>,
    ) -> Self {
        let source = Arc::clone(&items);
        Self {
            base,
            url,
            title,
            status,
            items,
            links: LazyValue::from_fn(move || index_links(&source)),
        }
    }

    /// Top-level items.
    pub fn items(&self) -> &[QuestionnaireItem] {
        &self.items
    }

    /// The item with `link_id`, at any depth.
    pub fn item(&self, link_id: &str) -> Option<&QuestionnaireItem> {
        let trail = self.links.force().get(link_id)?;
        let (first, rest) = trail.split_first()?;
        let mut item = self.items.get(*first)?;
        for position in rest {
            item = item.children().get(*position)?;
        }
        Some(item)
    }

    /// Every `linkId`, sorted.
    pub fn link_ids(&self) -> impl Iterator<Item = &str> {
        self.links.force().keys().map(String::as_str)
    }

    /// Returns `true` once the link index has been built.
    pub fn is_indexed(&self) -> bool {
        self.links.is_resolved()
    }
}

impl Clone for Questionnaire {
    fn clone(&self) -> Self {
        Self::with_items(
            self.base.clone(),
            self.url.clone(),
            self.title.clone(),
            self.status,
            Arc::clone(&self.items),
        )
    }
}

impl PartialEq for Questionnaire {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.url == other.url
            && self.title == other.title
            && self.status == other.status
            && self.items == other.items
    }
}

impl fmt::Debug for Questionnaire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Questionnaire")
            .field("base", &self.base)
            .field("url", &self.url)
            .field("title", &self.title)
            .field("status", &self.status)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

/// Codec for [`Questionnaire`].
pub struct QuestionnaireSchema {
    base: ResourceFields,
    layers: FieldLayers,
    status: OneOfNode<PublicationStatus>,
    item: SharedNode<QuestionnaireItem>,
}

impl QuestionnaireSchema {
    pub fn new() -> Result<Self, SchemaBuildError> {
        let base = ResourceFields::new("Questionnaire");
        let layers = FieldLayers::new()
            .with(&base)?
            .with_keys(&["url", "title", "status", "item"])?;
        Ok(Self {
            base,
            layers,
            status: one_of(&[
                ("draft", PublicationStatus::Draft),
                ("active", PublicationStatus::Active),
                ("retired", PublicationStatus::Retired),
                ("unknown", PublicationStatus::Unknown),
            ]),
            item: item_schema(),
        })
    }

    pub fn keys(&self) -> &[&'static str] {
        self.layers.keys()
    }
}

impl Decoder for QuestionnaireSchema {
    type Output = Questionnaire;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Questionnaire, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (base, url, title, status, items) = (
            self.base.read(&object, cx),
            object.field(cx, "url", &optionalish(string())),
            object.field(cx, "title", &optionalish(string())),
            object.field(cx, "status", &self.status),
            object.field(cx, "item", &optionalish(array(self.item.clone()))),
        )
            .collect_fields()?;
        Ok(Questionnaire::new(
            base,
            url,
            title,
            status,
            items.unwrap_or_default(),
        ))
    }

    fn expected(&self) -> String {
        "Questionnaire".to_string()
    }
}

impl Encoder for QuestionnaireSchema {
    type Input = Questionnaire;

    fn encode(&self, questionnaire: &Questionnaire) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        self.base.write(&questionnaire.base, &mut out)?;
        out.field("url", &optionalish(string()), &questionnaire.url)?
            .field("title", &optionalish(string()), &questionnaire.title)?
            .field("status", &self.status, &questionnaire.status)?;
        if !questionnaire.items.is_empty() {
            let items = questionnaire
                .items()
                .iter()
                .map(|item| self.item.encode(item))
                .collect::<Result<Vec<_>, _>>()?;
            out.insert("item", Value::Array(items));
        }
        Ok(out.finish())
    }
}

#[cfg(test)]
mod tests {
    use record_codec_core::DecodeOptions;
    use serde_json::json;

    use super::*;

    fn intake() -> Value {
        json!({
            "resourceType": "Questionnaire",
            "id": "intake",
            "status": "active",
            "item": [
                {
                    "linkId": "history",
                    "type": "group",
                    "item": [
                        {"linkId": "smoker", "type": "boolean", "required": true},
                        {
                            "linkId": "meds",
                            "type": "group",
                            "repeats": true,
                            "item": [{"linkId": "med-name", "type": "string", "text": "Name"}]
                        }
                    ]
                },
                {"linkId": "notes", "type": "text"}
            ]
        })
    }

    #[test]
    fn test_required_defaults_to_false() {
        let questionnaire = QuestionnaireSchema::new().unwrap().decode(&intake()).unwrap();
        assert!(!questionnaire.items()[1].required);
        assert!(questionnaire.item("smoker").unwrap().required);
    }

    #[test]
    fn test_link_index_is_built_on_first_lookup() {
        let questionnaire = QuestionnaireSchema::new().unwrap().decode(&intake()).unwrap();
        assert!(!questionnaire.is_indexed());
        assert_eq!(questionnaire.item("med-name").unwrap().text.as_deref(), Some("Name"));
        assert!(questionnaire.is_indexed());
        assert!(questionnaire.item("missing").is_none());
        assert_eq!(
            questionnaire.link_ids().collect::<Vec<_>>(),
            vec!["history", "med-name", "meds", "notes", "smoker"]
        );
    }

    #[test]
    fn test_first_duplicate_link_wins() {
        let mut first = QuestionnaireItem::new("q", ItemType::String);
        first.text = Some("first".to_string());
        let mut second = QuestionnaireItem::new("q", ItemType::String);
        second.text = Some("second".to_string());
        let mut group = QuestionnaireItem::new("g", ItemType::Group);
        group.items = Some(vec![first]);
        let questionnaire = Questionnaire::new(
            ResourceBase::default(),
            None,
            None,
            PublicationStatus::Draft,
            vec![group, second],
        );
        assert_eq!(questionnaire.item("q").unwrap().text.as_deref(), Some("first"));
    }

    #[test]
    fn test_nested_issue_carries_full_path() {
        let mut raw = intake();
        raw["item"][0]["item"][1]["item"][0]["type"] = json!("video");
        let err = QuestionnaireSchema::new().unwrap().decode(&raw).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path.to_string(), "item[0].item[1].item[0].type");
    }

    #[test]
    fn test_depth_guard_applies_to_nested_items() {
        let schema = QuestionnaireSchema::new().unwrap();
        let options = DecodeOptions::default().with_max_depth(1);
        let err = schema.decode_with(&intake(), &options).unwrap_err();
        assert!(matches!(err, DecodeError::DepthExceeded { limit: 1, .. }));
        assert!(schema.decode_with(&intake(), &DecodeOptions::default().with_max_depth(2)).is_ok());
    }

    #[test]
    fn test_roundtrip_is_stable() {
        let schema = QuestionnaireSchema::new().unwrap();
        let first = schema.decode(&intake()).unwrap();
        let encoded = schema.encode(&first).unwrap();
        assert_eq!(encoded["item"][1]["required"], json!(false));
        assert_eq!(schema.decode(&encoded).unwrap(), first);
    }

    #[test]
    fn test_clone_shares_items_with_fresh_index() {
        let questionnaire = QuestionnaireSchema::new().unwrap().decode(&intake()).unwrap();
        questionnaire.item("notes");
        let copy = questionnaire.clone();
        assert!(!copy.is_indexed());
        assert_eq!(copy, questionnaire);
    }
}
