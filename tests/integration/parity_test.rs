use mortality_risk::features::{FEATURE_COLUMNS, feature_column_names};
use mortality_risk::inference::InferenceRequest;
use mortality_risk::loader::load_raw_tables;
use mortality_risk::{EncodingMode, Result, build_feature_matrix, encode_features};
use serde_json::json;

use crate::utils::{SyntheticEncounter, synthetic_cohort, write_raw_extracts};

/// Re-derive every training row through the serving path from the same raw values
#[test]
fn test_training_and_serving_vectors_match() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cohort = synthetic_cohort(60, 21);
    write_raw_extracts(dir.path(), &cohort);

    let matrix = build_feature_matrix(&load_raw_tables(dir.path())?);
    assert_eq!(matrix.len(), cohort.len());

    for (raw, row) in cohort.iter().zip(&matrix.rows) {
        let request = InferenceRequest::from_json(&json!({
            "age": raw.admit_year - raw.birth_year,
            "gender": raw.gender,
            "admission_type": raw.admission_type,
            "lab_count": raw.lab_count,
            "abnormal_count": raw.abnormal_count,
        }))?;
        let served = encode_features(&request.to_feature_input()?, EncodingMode::Single)
            .map_err(|e| mortality_risk::PipelineError::InvalidInput(e.to_string()))?;

        assert_eq!(served, row.features, "encounter {}", raw.hadm_id);
        assert_eq!(served.to_array(), row.features.to_array());
        assert_eq!(row.label, raw.died);
    }
    Ok(())
}

#[test]
fn test_column_order_is_fixed() {
    assert_eq!(
        feature_column_names(),
        FEATURE_COLUMNS.iter().map(ToString::to_string).collect::<Vec<_>>()
    );
    assert_eq!(
        FEATURE_COLUMNS,
        [
            "age",
            "gender",
            "lab_count",
            "abnormal_count",
            "type_ELECTIVE",
            "type_EMERGENCY",
            "type_URGENT"
        ]
    );
}

#[test]
fn test_encounter_without_labs_is_kept() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cohort = vec![
        SyntheticEncounter::new(1, 70, "URGENT", (0, 0), true),
        SyntheticEncounter::new(2, 40, "ELECTIVE", (3, 1), false),
    ];
    write_raw_extracts(dir.path(), &cohort);

    let matrix = build_feature_matrix(&load_raw_tables(dir.path())?);
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix.rows[0].features.to_array(), [70.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    assert_eq!(matrix.rows[1].features.to_array(), [40.0, 0.0, 3.0, 1.0, 1.0, 0.0, 0.0]);
    Ok(())
}
