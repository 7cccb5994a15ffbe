//! The registry of every model schema, built once per process.

use std::sync::OnceLock;

use record_codec_core::{RegistryBuilder, SchemaBuildError, SchemaConverter, SchemaRegistry};

use crate::bundle::{BundleSchema, ResourceConverters, resource_union};
use crate::datatypes::{
    CodeableConceptSchema, CodingSchema, IdentifierSchema, QuantitySchema, ReferenceSchema,
};
use crate::device::UserDeviceSchema;
use crate::questionnaire::{QuestionnaireSchema, item_schema};
use crate::resource::{MetaSchema, ObservationSchema, PatientSchema};
use crate::response::{QuestionnaireResponseSchema, response_item_schema};

/// Builds a fresh registry.
///
/// Leaf types are registered first; each composite takes the converters it
/// embeds from the builder.
pub fn build_registry() -> Result<SchemaRegistry, SchemaBuildError> {
    let mut builder = RegistryBuilder::new();
    builder
        .register("Coding", SchemaConverter::from_node(CodingSchema))?
        .register("Identifier", SchemaConverter::from_node(IdentifierSchema))?
        .register("Quantity", SchemaConverter::from_node(QuantitySchema))?
        .register("Reference", SchemaConverter::from_node(ReferenceSchema))?
        .register("Meta", SchemaConverter::from_node(MetaSchema))?
        .register("UserDevice", SchemaConverter::from_node(UserDeviceSchema))?
        .register("CodeableConcept", SchemaConverter::from_node(CodeableConceptSchema))?
        .register("QuestionnaireItem", SchemaConverter::from_node(item_schema()))?
        .register("ResponseItem", SchemaConverter::from_node(response_item_schema()))?;

    let patient = PatientSchema::new(builder.require("Identifier")?)?;
    builder.register("Patient", SchemaConverter::from_node(patient))?;

    let observation =
        ObservationSchema::new(builder.require("CodeableConcept")?, builder.require("Quantity")?)?;
    builder
        .register("Observation", SchemaConverter::from_node(observation))?
        .register("Questionnaire", SchemaConverter::from_node(QuestionnaireSchema::new()?))?
        .register(
            "QuestionnaireResponse",
            SchemaConverter::from_node(QuestionnaireResponseSchema::new()?),
        )?;

    let resources = resource_union(ResourceConverters {
        patient: builder.require("Patient")?,
        observation: builder.require("Observation")?,
        questionnaire: builder.require("Questionnaire")?,
        response: builder.require("QuestionnaireResponse")?,
    })?;
    let bundle = BundleSchema::new(resources.clone())?;
    builder
        .register("Resource", SchemaConverter::from_node(resources))?
        .register("Bundle", SchemaConverter::from_node(bundle))?;

    Ok(builder.build())
}

/// The process-wide registry.
///
/// The first call builds it; a build failure is cached and returned to
/// every caller.
pub fn registry() -> Result<&'static SchemaRegistry, SchemaBuildError> {
    static REGISTRY: OnceLock<Result<SchemaRegistry, SchemaBuildError>> = OnceLock::new();
    REGISTRY
        .get_or_init(build_registry)
        .as_ref()
        .map_err(Clone::clone)
}
