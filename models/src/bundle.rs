//! The resource union and bundles of mixed resources.

use record_codec_core::{
    CollectFields, DecodeContext, DecodeError, Decoder, Discriminated, DiscriminatedCollection,
    DiscriminatedUnion, Encoder, EncodingError, FieldLayers, FieldSet, ObjectView, ObjectWriter,
    OneOfNode, Optionalish, SchemaBuildError, SchemaConverter, discriminated_collection, one_of, optionalish,
};
use serde_json::Value;

use crate::questionnaire::Questionnaire;
use crate::resource::{Observation, Patient, ResourceBase, ResourceFields};
use crate::response::QuestionnaireResponse;

/// Any resource, tagged by `resourceType`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Patient(Patient),
    Observation(Observation),
    Questionnaire(Questionnaire),
    QuestionnaireResponse(QuestionnaireResponse),
}

impl Resource {
    /// Shared fields of whichever resource this is.
    pub fn base(&self) -> &ResourceBase {
        match self {
            Resource::Patient(patient) => &patient.base,
            Resource::Observation(observation) => &observation.base,
            Resource::Questionnaire(questionnaire) => &questionnaire.base,
            Resource::QuestionnaireResponse(response) => &response.base,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }
}

impl Discriminated for Resource {
    fn discriminant(&self) -> &str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Observation(_) => "Observation",
            Resource::Questionnaire(_) => "Questionnaire",
            Resource::QuestionnaireResponse(_) => "QuestionnaireResponse",
        }
    }
}

/// Converters for every resource type the union dispatches to.
pub struct ResourceConverters {
    pub patient: SchemaConverter<Patient>,
    pub observation: SchemaConverter<Observation>,
    pub questionnaire: SchemaConverter<Questionnaire>,
    pub response: SchemaConverter<QuestionnaireResponse>,
}

/// Builds the `resourceType` union.
pub fn resource_union(
    converters: ResourceConverters,
) -> Result<DiscriminatedUnion<Resource>, SchemaBuildError> {
    DiscriminatedUnion::builder("resourceType")
        .variant("Patient", converters.patient, Resource::Patient, |resource| {
            match resource {
                Resource::Patient(patient) => Some(patient),
                _ => None,
            }
        })
        .variant(
            "Observation",
            converters.observation,
            Resource::Observation,
            |resource| match resource {
                Resource::Observation(observation) => Some(observation),
                _ => None,
            },
        )
        .variant(
            "Questionnaire",
            converters.questionnaire,
            Resource::Questionnaire,
            |resource| match resource {
                Resource::Questionnaire(questionnaire) => Some(questionnaire),
                _ => None,
            },
        )
        .variant(
            "QuestionnaireResponse",
            converters.response,
            Resource::QuestionnaireResponse,
            |resource| match resource {
                Resource::QuestionnaireResponse(response) => Some(response),
                _ => None,
            },
        )
        .build()
}

/// Purpose of a bundle, from its `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    /// Loose set of resources with no further meaning
    Collection,
    /// Resources forming one signed document
    Document,
    /// Results of a search
    Searchset,
    /// Writes to apply together
    Transaction,
}

/// A bundle of resources of mixed types.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub base: ResourceBase,
    /// Encoded as `type`
    pub kind: BundleType,
    /// Resources in document order; empty when `entry` is absent
    pub entry: Vec<Resource>,
}

impl Bundle {
    /// Resources of one type, in bundle order.
    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Resource> {
        self.entry
            .iter()
            .filter(move |resource| resource.discriminant() == resource_type)
    }
}

/// Codec for [`Bundle`], dispatching entries through the resource union.
pub struct BundleSchema {
    base: ResourceFields,
    layers: FieldLayers,
    kind: OneOfNode<BundleType>,
    entry: Optionalish<DiscriminatedCollection<Resource>>,
}

impl BundleSchema {
    pub fn new(resources: DiscriminatedUnion<Resource>) -> Result<Self, SchemaBuildError> {
        let base = ResourceFields::new("Bundle");
        let layers = FieldLayers::new()
            .with(&base)?
            .with_keys(&["type", "entry"])?;
        Ok(Self {
            base,
            layers,
            kind: one_of(&[
                ("collection", BundleType::Collection),
                ("document", BundleType::Document),
                ("searchset", BundleType::Searchset),
                ("transaction", BundleType::Transaction),
            ]),
            entry: optionalish(discriminated_collection(resources)),
        })
    }

    pub fn keys(&self) -> &[&'static str] {
        self.layers.keys()
    }
}

impl Decoder for BundleSchema {
    type Output = Bundle;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Bundle, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (base, kind, entry) = (
            self.base.read(&object, cx),
            object.field(cx, "type", &self.kind),
            object.field(cx, "entry", &self.entry),
        )
            .collect_fields()?;
        Ok(Bundle {
            base,
            kind,
            entry: entry.unwrap_or_default(),
        })
    }

    fn expected(&self) -> String {
        "Bundle".to_string()
    }
}

impl Encoder for BundleSchema {
    type Input = Bundle;

    fn encode(&self, bundle: &Bundle) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        self.base.write(&bundle.base, &mut out)?;
        out.field("type", &self.kind, &bundle.kind)?
            .field("entry", self.entry.inner(), &bundle.entry)?;
        Ok(out.finish())
    }
}
