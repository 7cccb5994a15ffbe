//! Small value types shared by several resources.

use record_codec_core::{
    CollectFields, DecodeContext, DecodeError, Decoder, Encoder, EncodingError, ObjectView,
    ObjectWriter, SystemTagged, TagFilter, TaggedCollection, array, number, optionalish, string,
};
use serde_json::Value;

/// A code from a terminology system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coding {
    /// URI of the terminology (e.g., "http://loinc.org")
    pub system: Option<String>,
    /// Code within `system` (e.g., "8867-4")
    pub code: Option<String>,
    /// Human-readable label
    pub display: Option<String>,
}

impl Coding {
    /// A coding with `system` and `code` set and no display text.
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }
}

impl SystemTagged for Coding {
    fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    fn value(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Codec for [`Coding`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CodingSchema;

impl Decoder for CodingSchema {
    type Output = Coding;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Coding, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (system, code, display) = (
            object.field(cx, "system", &optionalish(string())),
            object.field(cx, "code", &optionalish(string())),
            object.field(cx, "display", &optionalish(string())),
        )
            .collect_fields()?;
        Ok(Coding {
            system,
            code,
            display,
        })
    }

    fn expected(&self) -> String {
        "Coding".to_string()
    }
}

impl Encoder for CodingSchema {
    type Input = Coding;

    fn encode(&self, coding: &Coding) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("system", &optionalish(string()), &coding.system)?
            .field("code", &optionalish(string()), &coding.code)?
            .field("display", &optionalish(string()), &coding.display)?;
        Ok(out.finish())
    }
}

/// A concept expressed as zero or more codings plus free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeableConcept {
    pub coding: Option<Vec<Coding>>,
    /// Plain text when no coding says it well enough
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Codes of codings from any of `systems`, in coding order.
    pub fn codes_in<'a>(&'a self, systems: &[&str]) -> Vec<&'a str> {
        let filters: Vec<TagFilter> = systems.iter().copied().map(TagFilter::system).collect();
        self.coding.values_matching(&filters)
    }

    /// Returns `true` if some coding carries `code` in `system`.
    pub fn has_code(&self, system: &str, code: &str) -> bool {
        self.coding
            .find_first(&[TagFilter::system(system).with_value(code)])
            .is_some()
    }
}

/// Codec for [`CodeableConcept`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeableConceptSchema;

impl Decoder for CodeableConceptSchema {
    type Output = CodeableConcept;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<CodeableConcept, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (coding, text) = (
            object.field(cx, "coding", &optionalish(array(CodingSchema))),
            object.field(cx, "text", &optionalish(string())),
        )
            .collect_fields()?;
        Ok(CodeableConcept { coding, text })
    }

    fn expected(&self) -> String {
        "CodeableConcept".to_string()
    }
}

impl Encoder for CodeableConceptSchema {
    type Input = CodeableConcept;

    fn encode(&self, concept: &CodeableConcept) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("coding", &optionalish(array(CodingSchema)), &concept.coding)?
            .field("text", &optionalish(string()), &concept.text)?;
        Ok(out.finish())
    }
}

/// A business identifier scoped by a system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identifier {
    /// Namespace the value is unique in (e.g., "urn:mrn")
    pub system: Option<String>,
    pub value: Option<String>,
}

impl Identifier {
    /// An identifier with both `system` and `value` set.
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            value: Some(value.into()),
        }
    }
}

impl SystemTagged for Identifier {
    fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Codec for [`Identifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierSchema;

impl Decoder for IdentifierSchema {
    type Output = Identifier;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Identifier, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (system, value) = (
            object.field(cx, "system", &optionalish(string())),
            object.field(cx, "value", &optionalish(string())),
        )
            .collect_fields()?;
        Ok(Identifier { system, value })
    }

    fn expected(&self) -> String {
        "Identifier".to_string()
    }
}

impl Encoder for IdentifierSchema {
    type Input = Identifier;

    fn encode(&self, identifier: &Identifier) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("system", &optionalish(string()), &identifier.system)?
            .field("value", &optionalish(string()), &identifier.value)?;
        Ok(out.finish())
    }
}

/// A measured amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// Numeric amount; must be finite to encode
    pub value: f64,
    /// Display unit (e.g., "beats/minute")
    pub unit: Option<String>,
    /// System defining `code`, usually UCUM
    pub system: Option<String>,
    /// Coded form of the unit (e.g., "/min")
    pub code: Option<String>,
}

/// Codec for [`Quantity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantitySchema;

impl Decoder for QuantitySchema {
    type Output = Quantity;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Quantity, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (value, unit, system, code) = (
            object.field(cx, "value", &number()),
            object.field(cx, "unit", &optionalish(string())),
            object.field(cx, "system", &optionalish(string())),
            object.field(cx, "code", &optionalish(string())),
        )
            .collect_fields()?;
        Ok(Quantity {
            value,
            unit,
            system,
            code,
        })
    }

    fn expected(&self) -> String {
        "Quantity".to_string()
    }
}

impl Encoder for QuantitySchema {
    type Input = Quantity;

    fn encode(&self, quantity: &Quantity) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("value", &number(), &quantity.value)?
            .field("unit", &optionalish(string()), &quantity.unit)?
            .field("system", &optionalish(string()), &quantity.system)?
            .field("code", &optionalish(string()), &quantity.code)?;
        Ok(out.finish())
    }
}

/// A link to another resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    /// Relative target (e.g., "Patient/p1")
    pub reference: Option<String>,
    /// Text shown in place of the target
    pub display: Option<String>,
}

impl Reference {
    /// A reference to `reference` with no display text.
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            display: None,
        }
    }
}

/// Codec for [`Reference`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSchema;

impl Decoder for ReferenceSchema {
    type Output = Reference;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Reference, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let (reference, display) = (
            object.field(cx, "reference", &optionalish(string())),
            object.field(cx, "display", &optionalish(string())),
        )
            .collect_fields()?;
        Ok(Reference { reference, display })
    }

    fn expected(&self) -> String {
        "Reference".to_string()
    }
}

impl Encoder for ReferenceSchema {
    type Input = Reference;

    fn encode(&self, reference: &Reference) -> Result<Value, EncodingError> {
        let mut out = ObjectWriter::new();
        out.field("reference", &optionalish(string()), &reference.reference)?
            .field("display", &optionalish(string()), &reference.display)?;
        Ok(out.finish())
    }
}
