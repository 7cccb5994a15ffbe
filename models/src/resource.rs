//! Fields every resource carries, and the resources built on top of them.
//!
//! Each resource schema is the shared [`ResourceFields`] layer followed by
//! its own keys. The layering is checked when the schema is built, so a
//! resource cannot silently redefine `id` or `meta`.

use chrono::{DateTime, NaiveDate, Utc};
use record_codec_core::{
    ArrayNode, CollectFields, DateTimeSchema, DecodeContext, DecodeError, Decoder, Encoder,
    EncodingError, FieldLayers, FieldSet, LiteralNode, Mapped, ObjectView, ObjectWriter,
    OneOfNode, Optionalish, SchemaBuildError, SchemaConverter, StringNode, TagFilter,
    TaggedCollection, array, boolean, date_time, literal, one_of, optionalish, string, try_map,
};
use serde_json::Value;

use crate::datatypes::{CodeableConcept, Identifier, Quantity, Reference, ReferenceSchema};

/// Version and change metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    /// Server-assigned version, changed on every write
    pub version_id: Option<String>,
    /// When the resource last changed, in UTC
    pub last_updated: Option<DateTime<Utc>>,
}

/// Codec for [`Meta`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaSchema;

impl Decoder for MetaSchema {
    type Output = Meta;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Meta, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (version_id, last_updated) = (
            object.field(cx, "versionId", &optionalish(string())),
            object.field(cx, "lastUpdated", &optionalish(date_time())),
        )
            .collect_fields()?;
        Ok(Meta {
            version_id,
            last_updated,
        })
    }

    fn expected(&self) -> String {
        "Meta".to_string()
    }
}

impl Encoder for MetaSchema {
    type Input = Meta;

    fn encode(&self, meta: &Meta) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("versionId", &optionalish(string()), &meta.version_id)?
            .field("lastUpdated", &optionalish(date_time()), &meta.last_updated)?;
        Ok(out.finish())
    }
}

/// Values of the shared resource layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceBase {
    /// Logical id, unique within its resource type
    pub id: Option<String>,
    pub meta: Option<Meta>,
}

/// The `resourceType`, `id` and `meta` keys, checked against one type name.
#[derive(Debug, Clone)]
pub struct ResourceFields {
    resource_type: LiteralNode,
    id: Optionalish<StringNode>,
    meta: Optionalish<MetaSchema>,
}

impl ResourceFields {
    /// Fields that accept only `resource_type` as the `resourceType` value.
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: literal(resource_type),
            id: optionalish(string()),
            meta: optionalish(MetaSchema),
        }
    }

    pub fn resource_type(&self) -> &str {
        self.resource_type.text()
    }
}

impl FieldSet for ResourceFields {
    type Fields = ResourceBase;

    fn keys(&self) -> &[&'static str] {
        &["resourceType", "id", "meta"]
    }

    fn read(&self, object: &ObjectView<'_>, cx: &mut DecodeContext) -> Result<ResourceBase, DecodeError> {
        let ((), id, meta) = (
            object.field(cx, "resourceType", &self.resource_type),
            object.field(cx, "id", &self.id),
            object.field(cx, "meta", &self.meta),
        )
            .collect_fields()?;
        Ok(ResourceBase { id, meta })
    }

    fn write(&self, base: &ResourceBase, out: &mut ObjectWriter) -> Result<(), EncodingError> {
        out.field("resourceType", &self.resource_type, &())?
            .field("id", &self.id, &base.id)?
            .field("meta", &self.meta, &base.meta)?;
        Ok(())
    }
}

/// Administrative gender, encoded in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
    /// Recorded as not known, distinct from an absent value
    Unknown,
}

type BirthDateNode = Mapped<
    StringNode,
    NaiveDate,
    fn(String) -> Result<NaiveDate, String>,
    fn(&NaiveDate) -> String,
>;

fn parse_date(text: String) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| "date (YYYY-MM-DD)".to_string())
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// A person receiving care.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub base: ResourceBase,
    /// Business identifiers (e.g., medical record numbers)
    pub identifier: Option<Vec<Identifier>>,
    /// Whether the record is in active use
    pub active: Option<bool>,
    pub gender: Option<Gender>,
    /// Calendar date of birth, encoded as `YYYY-MM-DD`
    pub birth_date: Option<NaiveDate>,
}

impl Patient {
    /// The first identifier value issued by `system`.
    pub fn identifier_value(&self, system: &str) -> Option<&str> {
        self.identifier
            .find_first(&[TagFilter::system(system)])
            .and_then(|identifier| identifier.value.as_deref())
    }
}

/// Codec for [`Patient`].
pub struct PatientSchema {
    base: ResourceFields,
    layers: FieldLayers,
    identifier: Optionalish<ArrayNode<SchemaConverter<Identifier>>>,
    gender: Optionalish<OneOfNode<Gender>>,
    birth_date: Optionalish<BirthDateNode>,
}

impl PatientSchema {
    /// Builds the schema around an already registered identifier converter.
    pub fn new(identifier: SchemaConverter<Identifier>) -> Result<Self, SchemaBuildError> {
        let base = ResourceFields::new("Patient");
        let layers = FieldLayers::new()
            .with(&base)?
            .with_keys(&["identifier", "active", "gender", "birthDate"])?;
        let birth_date: BirthDateNode = try_map(
            string(),
            parse_date as fn(String) -> Result<NaiveDate, String>,
            format_date as fn(&NaiveDate) -> String,
        );
        Ok(Self {
            base,
            layers,
            identifier: optionalish(array(identifier)),
            gender: optionalish(one_of(&[
                ("male", Gender::Male),
                ("female", Gender::Female),
                ("other", Gender::Other),
                ("unknown", Gender::Unknown),
            ])),
            birth_date: optionalish(birth_date),
        })
    }

    /// Every key the schema reads, shared layer first.
    pub fn keys(&self) -> &[&'static str] {
        self.layers.keys()
    }
}

impl Decoder for PatientSchema {
    type Output = Patient;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Patient, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (base, identifier, active, gender, birth_date) = (
            self.base.read(&object, cx),
            object.field(cx, "identifier", &self.identifier),
            object.field(cx, "active", &optionalish(boolean())),
            object.field(cx, "gender", &self.gender),
            object.field(cx, "birthDate", &self.birth_date),
        )
            .collect_fields()?;
        Ok(Patient {
            base,
            identifier,
            active,
            gender,
            birth_date,
        })
    }

    fn expected(&self) -> String {
        "Patient".to_string()
    }
}

impl Encoder for PatientSchema {
    type Input = Patient;

    fn encode(&self, patient: &Patient) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        self.base.write(&patient.base, &mut out)?;
        out.field("identifier", &self.identifier, &patient.identifier)?
            .field("active", &optionalish(boolean()), &patient.active)?
            .field("gender", &self.gender, &patient.gender)?
            .field("birthDate", &self.birth_date, &patient.birth_date)?;
        Ok(out.finish())
    }
}

/// Lifecycle of an observation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationStatus {
    /// Exists but no result yet
    Registered,
    /// Early result that may still change
    Preliminary,
    Final,
    /// Changed after being final
    Amended,
    Cancelled,
    /// Recorded by mistake, encoded as `"entered-in-error"`
    EnteredInError,
}

/// A measurement or assertion about a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub base: ResourceBase,
    pub status: ObservationStatus,
    /// Broad classification (e.g., vital signs)
    pub category: Option<Vec<CodeableConcept>>,
    /// What was observed
    pub code: CodeableConcept,
    /// Who or what the observation is about
    pub subject: Option<Reference>,
    /// Clinically relevant time, encoded as `effectiveDateTime`
    pub effective: Option<DateTime<Utc>>,
    /// Measured result, encoded as `valueQuantity`
    pub value: Option<Quantity>,
    /// Device that took the measurement
    pub device: Option<Reference>,
}

/// Codec for [`Observation`].
pub struct ObservationSchema {
    base: ResourceFields,
    layers: FieldLayers,
    status: OneOfNode<ObservationStatus>,
    category: Optionalish<ArrayNode<SchemaConverter<CodeableConcept>>>,
    code: SchemaConverter<CodeableConcept>,
    reference: Optionalish<ReferenceSchema>,
    effective: Optionalish<DateTimeSchema>,
    value: Optionalish<SchemaConverter<Quantity>>,
}

impl ObservationSchema {
    /// Builds the schema around registered concept and quantity converters.
    pub fn new(
        concept: SchemaConverter<CodeableConcept>,
        quantity: SchemaConverter<Quantity>,
    ) -> Result<Self, SchemaBuildError> {
        let base = ResourceFields::new("Observation");
        let layers = FieldLayers::new().with(&base)?.with_keys(&[
            "status",
            "category",
            "code",
            "subject",
            "effectiveDateTime",
            "valueQuantity",
            "device",
        ])?;
        Ok(Self {
            base,
            layers,
            status: one_of(&[
                ("registered", ObservationStatus::Registered),
                ("preliminary", ObservationStatus::Preliminary),
                ("final", ObservationStatus::Final),
                ("amended", ObservationStatus::Amended),
                ("cancelled", ObservationStatus::Cancelled),
                ("entered-in-error", ObservationStatus::EnteredInError),
            ]),
            category: optionalish(array(concept.clone())),
            code: concept,
            reference: optionalish(ReferenceSchema),
            effective: optionalish(date_time()),
            value: optionalish(quantity),
        })
    }

    pub fn keys(&self) -> &[&'static str] {
        self.layers.keys()
    }
}

impl Decoder for ObservationSchema {
    type Output = Observation;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Observation, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (base, status, category, code, subject, effective, value, device) = (
            self.base.read(&object, cx),
            object.field(cx, "status", &self.status),
            object.field(cx, "category", &self.category),
            object.field(cx, "code", &self.code),
            object.field(cx, "subject", &self.reference),
            object.field(cx, "effectiveDateTime", &self.effective),
            object.field(cx, "valueQuantity", &self.value),
            object.field(cx, "device", &self.reference),
        )
            .collect_fields()?;
        Ok(Observation {
            base,
            status,
            category,
            code,
            subject,
            effective,
            value,
            device,
        })
    }

    fn expected(&self) -> String {
        "Observation".to_string()
    }
}

impl Encoder for ObservationSchema {
    type Input = Observation;

    fn encode(&self, observation: &Observation) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        self.base.write(&observation.base, &mut out)?;
        out.field("status", &self.status, &observation.status)?
            .field("category", &self.category, &observation.category)?
            .field("code", &self.code, &observation.code)?
            .field("subject", &self.reference, &observation.subject)?
            .field("effectiveDateTime", &self.effective, &observation.effective)?
            .field("valueQuantity", &self.value, &observation.value)?
            .field("device", &self.reference, &observation.device)?;
        Ok(out.finish())
    }
}

#[cfg(test)]
mod tests {
    use record_codec_core::{Path, ValidationIssue};
    use serde_json::json;

    use super::*;
    use crate::datatypes::{CodeableConceptSchema, IdentifierSchema, QuantitySchema};

    fn patients() -> PatientSchema {
        PatientSchema::new(SchemaConverter::from_node(IdentifierSchema)).unwrap()
    }

    fn observations() -> ObservationSchema {
        ObservationSchema::new(
            SchemaConverter::from_node(CodeableConceptSchema),
            SchemaConverter::from_node(QuantitySchema),
        )
        .unwrap()
    }

    #[test]
    fn test_patient_roundtrip_and_lookup() {
        let raw = json!({
            "resourceType": "Patient",
            "id": "p1",
            "meta": {"lastUpdated": "2024-03-01T10:00:00Z"},
            "identifier": [
                {"system": "urn:mrn", "value": "123"},
                {"system": "urn:ssn", "value": "999"}
            ],
            "gender": "female",
            "birthDate": "1990-07-14"
        });
        let patient = patients().decode(&raw).unwrap();
        assert_eq!(patient.identifier_value("urn:ssn"), Some("999"));
        assert_eq!(patient.identifier_value("urn:other"), None);
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1990, 7, 14));
        assert_eq!(patients().encode(&patient).unwrap(), raw);
    }

    #[test]
    fn test_patient_rejects_wrong_resource_type_and_bad_date() {
        let err = patients()
            .decode(&json!({"resourceType": "Observation", "birthDate": "14/07/1990"}))
            .unwrap_err();
        let paths: Vec<String> = err.issues().iter().map(|i| i.path.to_string()).collect();
        assert_eq!(paths, vec!["resourceType", "birthDate"]);
        assert_eq!(err.issues()[1].expected, "date (YYYY-MM-DD)");
    }

    #[test]
    fn test_layers_are_shared_first() {
        assert_eq!(
            &patients().keys()[..4],
            &["resourceType", "id", "meta", "identifier"]
        );
        assert!(observations().keys().contains(&"valueQuantity"));
    }

    #[test]
    fn test_observation_requires_status_and_code() {
        let err = observations()
            .decode(&json!({"resourceType": "Observation"}))
            .unwrap_err();
        assert_eq!(
            err.issues(),
            &[
                ValidationIssue::new(
                    Path::root().join("status"),
                    r#""registered" | "preliminary" | "final" | "amended" | "cancelled" | "entered-in-error""#,
                    "undefined"
                ),
                ValidationIssue::new(Path::root().join("code"), "CodeableConcept", "undefined"),
            ]
        );
    }

    #[test]
    fn test_observation_roundtrip_omits_absent_fields() {
        let raw = json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]},
            "subject": {"reference": "Patient/p1"},
            "effectiveDateTime": "2024-03-01T10:00:00Z",
            "valueQuantity": {"value": 72.0, "unit": "beats/minute"}
        });
        let observation = observations().decode(&raw).unwrap();
        assert_eq!(observation.subject, Some(Reference::to("Patient/p1")));
        assert_eq!(observation.device, None);
        assert_eq!(observations().encode(&observation).unwrap(), raw);
    }
}
