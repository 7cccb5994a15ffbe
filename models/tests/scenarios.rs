use record_codec_core::{CodecError, DecodeError, SchemaConverter, UnknownDiscriminantError};
use record_codec_models::{Bundle, Platform, Questionnaire, Resource, UserDevice, registry};
use serde_json::{Value, json};

fn devices() -> &'static SchemaConverter<UserDevice> {
    registry().unwrap().get::<UserDevice>("UserDevice").unwrap()
}

fn resources() -> &'static SchemaConverter<Resource> {
    registry().unwrap().get::<Resource>("Resource").unwrap()
}

fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "p1",
        "identifier": [{"system": "urn:mrn", "value": "123"}],
        "active": true
    })
}

fn observation() -> Value {
    json!({
        "resourceType": "Observation",
        "id": "o1",
        "status": "final",
        "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]},
        "subject": {"reference": "Patient/p1"},
        "valueQuantity": {"value": 64, "unit": "beats/minute"}
    })
}

fn questionnaire() -> Value {
    json!({
        "resourceType": "Questionnaire",
        "id": "q1",
        "status": "draft",
        "item": [{"linkId": "a", "type": "group", "item": [{"linkId": "a.1", "type": "string"}]}]
    })
}

#[test]
fn test_minimal_device_reencodes_to_exactly_the_given_keys() {
    let raw = json!({"notificationToken": "tok1", "platform": "iOS"});
    let device = devices().decode(&raw).unwrap();

    assert_eq!(device.notification_token, "tok1");
    assert_eq!(device.platform, Platform::Ios);
    assert_eq!(device.os_version, None);
    assert_eq!(device.app_version, None);
    assert_eq!(device.app_build, None);
    assert_eq!(device.language, None);
    assert_eq!(device.time_zone, None);

    let encoded = devices().encode(&device).unwrap();
    let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(encoded, raw);
}

#[test]
fn test_device_nulls_are_normalized_away() {
    let raw = json!({
        "notificationToken": "tok1",
        "platform": "Android",
        "osVersion": null,
        "language": "fi",
        "legacyField": 1
    });
    let device = devices().decode(&raw).unwrap();
    assert_eq!(device.language.as_deref(), Some("fi"));
    assert_eq!(
        devices().encode(&device).unwrap(),
        json!({"notificationToken": "tok1", "platform": "Android", "language": "fi"})
    );
}

#[test]
fn test_round_trip_is_stable_for_every_resource() {
    for raw in [patient(), observation(), questionnaire()] {
        let first = resources().decode(&raw).unwrap();
        let again = resources()
            .decode(&resources().encode(&first).unwrap())
            .unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn test_union_branch_matches_direct_decode() {
    let registry = registry().unwrap();
    let via_union = resources().decode(&questionnaire()).unwrap();
    let direct = registry
        .get::<Questionnaire>("Questionnaire")
        .unwrap()
        .decode(&questionnaire())
        .unwrap();
    assert_eq!(via_union, Resource::Questionnaire(direct));
}

fn assert_send<T: Send>() {}

#[test]
fn test_decoded_models_are_send() {
    assert_send::<Resource>();
    assert_send::<Bundle>();
    assert_send::<Questionnaire>();
    assert_send::<UserDevice>();
}

#[test]
fn test_questionnaire_is_indexed_on_another_thread() {
    let decoded = registry()
        .unwrap()
        .get::<Questionnaire>("Questionnaire")
        .unwrap()
        .decode(&questionnaire())
        .unwrap();
    assert!(!decoded.is_indexed());

    let handle = std::thread::spawn(move || {
        let found = decoded.item("a.1").map(|item| item.link_id.clone());
        (decoded, found)
    });
    let (decoded, found) = handle.join().unwrap();
    assert_eq!(found.as_deref(), Some("a.1"));
    assert!(decoded.is_indexed());
}

#[test]
fn test_unknown_resource_type_lists_known_values() {
    let err = resources()
        .decode(&json!({"resourceType": "Encounter", "id": "e1"}))
        .unwrap_err();
    let DecodeError::UnknownDiscriminant(UnknownDiscriminantError {
        field, value, known, ..
    }) = err
    else {
        panic!("expected an unknown discriminant");
    };
    assert_eq!(field, "resourceType");
    assert_eq!(value.as_deref(), Some("Encounter"));
    assert_eq!(
        known,
        vec!["Patient", "Observation", "Questionnaire", "QuestionnaireResponse"]
    );
}

#[test]
fn test_bundle_reports_entry_positions() {
    let bundles = registry().unwrap().get::<Bundle>("Bundle").unwrap();
    let mut broken = observation();
    broken["status"] = json!("done");
    let err = bundles
        .decode(&json!({"resourceType": "Bundle", "type": "collection", "entry": [patient(), broken]}))
        .unwrap_err();
    assert_eq!(err.issues().len(), 1);
    assert_eq!(err.issues()[0].path.to_string(), "entry[1].status");
}

#[test]
fn test_bundle_filters_by_resource_type() {
    let bundles = registry().unwrap().get::<Bundle>("Bundle").unwrap();
    let bundle = bundles
        .decode(&json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [patient(), observation(), patient()]
        }))
        .unwrap();
    assert_eq!(bundle.of_type("Patient").count(), 2);
    assert_eq!(
        bundle.of_type("Observation").next().and_then(Resource::id),
        Some("o1")
    );
}

#[test]
fn test_registry_normalize_strips_unknown_keys() {
    let normalized = registry()
        .unwrap()
        .normalize("Patient", &json!({"resourceType": "Patient", "id": "p9", "extra": [1, 2]}))
        .unwrap();
    assert_eq!(normalized, json!({"resourceType": "Patient", "id": "p9"}));
}

#[test]
fn test_registry_rejects_unknown_type_name() {
    assert_eq!(
        registry().unwrap().normalize("Encounter", &json!({})),
        Err(CodecError::UnknownType("Encounter".to_string()))
    );
}

#[test]
fn test_registry_lists_every_type() {
    let names: Vec<&str> = registry().unwrap().type_names().collect();
    for expected in ["Bundle", "Patient", "Resource", "UserDevice", "QuestionnaireItem"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}
