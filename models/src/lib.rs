//! Resource schemas built on `record-codec-core`.
//!
//! The types here cover every codec mechanism: plain records with optional
//! fields ([`UserDevice`]), tagged collections with lookups
//! ([`CodeableConcept`], [`Identifier`]), layered resource fields
//! ([`Patient`], [`Observation`]), self-referential items with a lazily
//! built index ([`Questionnaire`]), open answers ([`Answer::Open`]), and a
//! discriminated union over `resourceType` ([`Resource`], [`Bundle`]).
//!
//! [`registry`] returns every converter keyed by type name.

mod bundle;
mod datatypes;
mod device;
mod questionnaire;
mod registry;
mod resource;
mod response;

pub use bundle::{Bundle, BundleSchema, BundleType, Resource, ResourceConverters, resource_union};
pub use datatypes::{
    CodeableConcept, CodeableConceptSchema, Coding, CodingSchema, Identifier, IdentifierSchema,
    Quantity, QuantitySchema, Reference, ReferenceSchema,
};
pub use device::{Platform, UserDevice, UserDeviceSchema};
pub use questionnaire::{
    ItemType, PublicationStatus, Questionnaire, QuestionnaireItem, QuestionnaireItemSchema,
    QuestionnaireSchema, item_schema,
};
pub use registry::{build_registry, registry};
pub use resource::{
    Gender, Meta, MetaSchema, Observation, ObservationSchema, ObservationStatus, Patient,
    PatientSchema, ResourceBase, ResourceFields,
};
pub use response::{
    Answer, AnswerSchema, QuestionnaireResponse, QuestionnaireResponseSchema, ResponseItem,
    ResponseItemSchema, ResponseStatus, response_item_schema,
};
