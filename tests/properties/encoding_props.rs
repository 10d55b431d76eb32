use mortality_risk::features::{FeatureInput, MAX_AGE, clamp_age};
use mortality_risk::inference::{InferenceRequest, InferenceService, RiskLevel};
use mortality_risk::model::{ModelArtifacts, RandomForest, StandardScaler};
use mortality_risk::models::{AdmissionType, Gender};
use mortality_risk::{EncodingMode, ForestConfig, encode_features};
use proptest::prelude::*;
use serde_json::json;

fn admission_type() -> impl Strategy<Value = Option<AdmissionType>> {
    prop_oneof![
        Just(None),
        Just(Some(AdmissionType::Elective)),
        Just(Some(AdmissionType::Emergency)),
        Just(Some(AdmissionType::Urgent)),
        "[A-Z]{3,10}".prop_map(|s| Some(AdmissionType::from(s.as_str()))),
    ]
}

fn gender() -> impl Strategy<Value = Option<Gender>> {
    prop_oneof![
        Just(None),
        Just(Some(Gender::Male)),
        Just(Some(Gender::Female)),
        Just(Some(Gender::Unknown)),
    ]
}

fn mode() -> impl Strategy<Value = EncodingMode> {
    prop_oneof![Just(EncodingMode::Batch), Just(EncodingMode::Single)]
}

fn small_service() -> InferenceService {
    let x = vec![
        [30.0, 0.0, 10.0, 1.0, 0.0, 1.0, 0.0],
        [80.0, 1.0, 50.0, 20.0, 0.0, 1.0, 0.0],
        [35.0, 1.0, 12.0, 0.0, 1.0, 0.0, 0.0],
        [85.0, 0.0, 60.0, 25.0, 0.0, 0.0, 1.0],
        [45.0, 0.0, 20.0, 2.0, 1.0, 0.0, 0.0],
        [90.0, 1.0, 70.0, 30.0, 0.0, 1.0, 0.0],
    ];
    let y = vec![false, true, false, true, false, true];
    let scaler = StandardScaler::fit(&x).unwrap();
    let forest = RandomForest::fit(
        &scaler.transform_all(&x),
        &y,
        &ForestConfig {
            n_trees: 8,
            ..ForestConfig::default()
        },
    )
    .unwrap();
    InferenceService::from_artifacts(ModelArtifacts { scaler, forest })
}

proptest! {
    #[test]
    fn age_is_always_clamped(admit in 1800i32..2300, birth in 1700i32..2400) {
        let age = clamp_age(i64::from(admit) - i64::from(birth));
        prop_assert!(age <= MAX_AGE);
        if birth > admit || admit - birth > 90 {
            prop_assert_eq!(age, MAX_AGE);
        }
    }

    #[test]
    fn encoded_vectors_hold_invariants(
        age in proptest::option::of(-200i64..300),
        gender in gender(),
        admission_type in admission_type(),
        lab_count in proptest::option::of(0u64..10_000),
        abnormal_count in proptest::option::of(0u64..10_000),
        mode in mode(),
    ) {
        let input = FeatureInput { age, gender, admission_type, lab_count, abnormal_count };
        if let Ok(v) = encode_features(&input, mode) {
            prop_assert!(v.age <= MAX_AGE);
            prop_assert!(v.lab_count >= v.abnormal_count);
            prop_assert!(v.type_elective + v.type_emergency + v.type_urgent <= 1);
            prop_assert!(v.gender <= 1);
        }
    }

    #[test]
    fn negative_request_ages_clamp_to_max(age in -500.0f64..-0.0001) {
        let request = InferenceRequest::from_json(&json!({ "age": age })).unwrap();
        let v = encode_features(&request.to_feature_input().unwrap(), EncodingMode::Single).unwrap();
        prop_assert_eq!(v.age, MAX_AGE);
    }

    #[test]
    fn missing_gender_encodes_as_male(age in 0i64..90, mode in mode()) {
        let input = FeatureInput { age: Some(age), ..FeatureInput::default() };
        let v = encode_features(&input, mode).unwrap();
        prop_assert_eq!(v.gender, 0);
    }

    #[test]
    fn tiers_partition_the_unit_interval(p in 0.0f64..=1.0) {
        let expected = if p > 0.55 {
            RiskLevel::High
        } else if p >= 0.35 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        };
        prop_assert_eq!(RiskLevel::from_probability(p), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn repeated_inference_is_identical(
        age in 0u32..110,
        female in any::<bool>(),
        type_index in 0usize..4,
        labs in 0u64..80,
        abnormal_share in 0.0f64..=1.0,
    ) {
        let service = small_service();
        let abnormal = (labs as f64 * abnormal_share).floor() as u64;
        let admission_type = ["ELECTIVE", "EMERGENCY", "URGENT", "OTHER"][type_index];
        let body = json!({
            "age": age,
            "gender": if female { "F" } else { "M" },
            "admission_type": admission_type,
            "lab_count": labs,
            "abnormal_count": abnormal,
        });
        let request = InferenceRequest::from_json(&body).unwrap();

        let first = service.predict(&request).unwrap();
        let second = service.predict(&request).unwrap();
        prop_assert_eq!(first, second);
        prop_assert!((0.0..=1.0).contains(&first.mortality_risk));
        prop_assert_eq!(first.risk_level, RiskLevel::from_probability(first.mortality_risk));
    }
}

#[test]
fn scenario_emergency_admission() {
    let request = InferenceRequest::from_json(&json!({
        "age": 65, "gender": "M", "admission_type": "EMERGENCY",
        "lab_count": 40, "abnormal_count": 5
    }))
    .unwrap();
    let v = encode_features(&request.to_feature_input().unwrap(), EncodingMode::Single).unwrap();
    assert_eq!(v.to_array(), [65.0, 0.0, 40.0, 5.0, 0.0, 1.0, 0.0]);

    let prediction = small_service().predict(&request).unwrap();
    assert_eq!(prediction.features, v);
}

#[test]
fn scenario_elective_indicators() {
    let input = FeatureInput {
        age: Some(50),
        admission_type: Some(AdmissionType::from("ELECTIVE")),
        ..FeatureInput::default()
    };
    for mode in [EncodingMode::Batch, EncodingMode::Single] {
        let v = encode_features(&input, mode).unwrap();
        assert_eq!(v.type_indicators(), [1, 0, 0]);
    }
}

#[test]
fn scenario_serving_defaults() {
    let v = encode_features(&FeatureInput::default(), EncodingMode::Single).unwrap();
    assert_eq!(v.to_array(), [60.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
}
