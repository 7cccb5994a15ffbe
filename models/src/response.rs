//! Filled-in questionnaires.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use record_codec_core::{
    ArrayNode, CollectFields, DateTimeSchema, DecodeContext, DecodeError, Decoder, Encoder,
    EncodingError, FieldLayers, FieldSet, ObjectView, ObjectWriter, OneOfNode, OpenRecord,
    Optionalish, Recursive, SchemaBuildError, SharedNode, array, boolean, date_time, integer,
    non_empty_string, number, one_of, open_record, optionalish, recursive, shared, string,
};
use serde_json::Value;

use crate::datatypes::{Coding, CodingSchema, Reference, ReferenceSchema};
use crate::resource::{ResourceBase, ResourceFields};

/// One answer to a question.
///
/// Answers of a kind the schema does not model are kept whole in
/// [`Answer::Open`].
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// `valueBoolean`
    Boolean(bool),
    /// `valueDecimal`
    Decimal(f64),
    /// `valueInteger`
    Integer(i64),
    /// `valueString`
    String(String),
    /// `valueCoding`
    Coding(Coding),
    /// Any other answer object (e.g., `valueAttachment`), kept as read
    Open(OpenRecord),
}

impl Answer {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Answer::String(value) => Some(value),
            _ => None,
        }
    }
}

const VALUE_KEYS: [&str; 5] = [
    "valueBoolean",
    "valueDecimal",
    "valueInteger",
    "valueString",
    "valueCoding",
];

/// Codec for [`Answer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerSchema;

impl Decoder for AnswerSchema {
    type Output = Answer;

    /// The first recognised `value*` key decides the variant; an object
    /// without one is an open answer.
    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Answer, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let Some(key) = VALUE_KEYS.into_iter().find(|key| object.get(key).is_some()) else {
            return open_record().decode_in(raw, cx).map(Answer::Open);
        };
        match key {
            "valueBoolean" => object.field(cx, key, &boolean()).map(Answer::Boolean),
            "valueDecimal" => object.field(cx, key, &number()).map(Answer::Decimal),
            "valueInteger" => object.field(cx, key, &integer()).map(Answer::Integer),
            "valueString" => object.field(cx, key, &string()).map(Answer::String),
            _ => object.field(cx, key, &CodingSchema).map(Answer::Coding),
        }
    }

    fn expected(&self) -> String {
        "answer".to_string()
    }
}

impl Encoder for AnswerSchema {
    type Input = Answer;

    fn encode(&self, answer: &Answer) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        match answer {
            Answer::Boolean(value) => out.field("valueBoolean", &boolean(), value)?,
            Answer::Decimal(value) => out.field("valueDecimal", &number(), value)?,
            Answer::Integer(value) => out.field("valueInteger", &integer(), value)?,
            Answer::String(value) => out.field("valueString", &string(), value)?,
            Answer::Coding(value) => out.field("valueCoding", &CodingSchema, value)?,
            Answer::Open(record) => return open_record().encode(record),
        };
        Ok(out.finish())
    }
}

/// The answers given to one questionnaire item.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseItem {
    /// `linkId` of the questionnaire item being answered
    pub link_id: String,
    pub text: Option<String>,
    /// Encoded as `answer`
    pub answers: Option<Vec<Answer>>,
    /// Nested items, encoded as `item`
    pub items: Option<Vec<ResponseItem>>,
}

impl ResponseItem {
    /// Direct children, empty when the item has none.
    pub fn children(&self) -> &[ResponseItem] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// Codec for one [`ResponseItem`], recursing into nested items.
pub struct ResponseItemSchema {
    answers: Optionalish<ArrayNode<AnswerSchema>>,
    items: Optionalish<ArrayNode<Recursive<ResponseItem>>>,
}

/// The process-wide response item node.
pub fn response_item_schema() -> SharedNode<ResponseItem> {
    static ITEM: OnceLock<SharedNode<ResponseItem>> = OnceLock::new();
    ITEM.get_or_init(|| {
        shared(ResponseItemSchema {
            answers: optionalish(array(AnswerSchema)),
            items: optionalish(array(recursive("ResponseItem", response_item_schema))),
        })
    })
    .clone()
}

impl Decoder for ResponseItemSchema {
    type Output = ResponseItem;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<ResponseItem, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (link_id, text, answers, items) = (
            object.field(cx, "linkId", &non_empty_string()),
            object.field(cx, "text", &optionalish(string())),
            object.field(cx, "answer", &self.answers),
            object.field(cx, "item", &self.items),
        )
            .collect_fields()?;
        Ok(ResponseItem {
            link_id,
            text,
            answers,
            items,
        })
    }

    fn expected(&self) -> String {
        "ResponseItem".to_string()
    }
}

impl Encoder for ResponseItemSchema {
    type Input = ResponseItem;

    fn encode(&self, item: &ResponseItem) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("linkId", &non_empty_string(), &item.link_id)?
            .field("text", &optionalish(string()), &item.text)?
            .field("answer", &self.answers, &item.answers)?
            .field("item", &self.items, &item.items)?;
        Ok(out.finish())
    }
}

/// Progress of a response, encoded in kebab case (e.g., "in-progress").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    InProgress,
    Completed,
    /// Changed after completion
    Amended,
    EnteredInError,
    /// Abandoned before completion
    Stopped,
}

/// Answers to a questionnaire from one respondent.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionnaireResponse {
    pub base: ResourceBase,
    /// Canonical URL of the questionnaire answered
    pub questionnaire: Option<String>,
    pub status: ResponseStatus,
    /// Who the answers are about
    pub subject: Option<Reference>,
    /// When the answers were recorded
    pub authored: Option<DateTime<Utc>>,
    /// Top-level answered items, encoded as `item`
    pub items: Option<Vec<ResponseItem>>,
}

impl QuestionnaireResponse {
    /// Answers given for `link_id`, searching nested items depth first.
    pub fn answers_for(&self, link_id: &str) -> Vec<&Answer> {
        fn walk<'a>(items: &'a [ResponseItem], link_id: &str, found: &mut Vec<&'a Answer>) {
            for item in items {
                if item.link_id == link_id {
                    found.extend(item.answers.iter().flatten());
                }
                walk(item.children(), link_id, found);
            }
        }

        let mut found = Vec::new();
        walk(self.items.as_deref().unwrap_or_default(), link_id, &mut found);
        found
    }
}

/// Codec for [`QuestionnaireResponse`].
pub struct QuestionnaireResponseSchema {
    base: ResourceFields,
    layers: FieldLayers,
    status: OneOfNode<ResponseStatus>,
    authored: Optionalish<DateTimeSchema>,
    items: Optionalish<ArrayNode<SharedNode<ResponseItem>>>,
}

impl QuestionnaireResponseSchema {
    pub fn new() -> Result<Self, SchemaBuildError> {
        let base = ResourceFields::new("QuestionnaireResponse");
        let layers = FieldLayers::new().with(&base)?.with_keys(&[
            "questionnaire",
            "status",
            "subject",
            "authored",
            "item",
        ])?;
        Ok(Self {
            base,
            layers,
            status: one_of(&[
                ("in-progress", ResponseStatus::InProgress),
                ("completed", ResponseStatus::Completed),
                ("amended", ResponseStatus::Amended),
                ("entered-in-error", ResponseStatus::EnteredInError),
                ("stopped", ResponseStatus::Stopped),
            ]),
            authored: optionalish(date_time()),
            items: optionalish(array(response_item_schema())),
        })
    }

    pub fn keys(&self) -> &[&'static str] {
        self.layers.keys()
    }
}

impl Decoder for QuestionnaireResponseSchema {
    type Output = QuestionnaireResponse;

    fn decode_in(
        &self,
        raw: &Value,
        cx: &mut DecodeContext,
    ) -> Result<QuestionnaireResponse, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (base, questionnaire, status, subject, authored, items) = (
            self.base.read(&object, cx),
            object.field(cx, "questionnaire", &optionalish(string())),
            object.field(cx, "status", &self.status),
            object.field(cx, "subject", &optionalish(ReferenceSchema)),
            object.field(cx, "authored", &self.authored),
            object.field(cx, "item", &self.items),
        )
            .collect_fields()?;
        Ok(QuestionnaireResponse {
            base,
            questionnaire,
            status,
            subject,
            authored,
            items,
        })
    }

    fn expected(&self) -> String {
        "QuestionnaireResponse".to_string()
    }
}

impl Encoder for QuestionnaireResponseSchema {
    type Input = QuestionnaireResponse;

    fn encode(&self, response: &QuestionnaireResponse) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        self.base.write(&response.base, &mut out)?;
        out.field("questionnaire", &optionalish(string()), &response.questionnaire)?
            .field("status", &self.status, &response.status)?
            .field("subject", &optionalish(ReferenceSchema), &response.subject)?
            .field("authored", &self.authored, &response.authored)?
            .field("item", &self.items, &response.items)?;
        Ok(out.finish())
    }
}
