use std::path::PathBuf;

use krippendorff_alpha::detect::{detect, infer_data_type};
use krippendorff_alpha::{
    compute_alpha, load_table, AlphaConfig, AlphaRequest, AnnotationLevel, Cell, DataType,
    IngestError, ReliabilityError, ScaleLibrary,
};
use tempfile::{tempdir, TempDir};

fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn annotator_cols() -> Vec<String> {
    vec!["annotator_1".into(), "annotator_2".into(), "annotator_3".into()]
}

#[test]
fn csv_numbers_and_blanks_are_typed() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "ratings.csv",
        "Sentence,annotator_1,annotator_2,annotator_3\n\
         first,1,2,1\n\
         second,3,,3\n\
         third,5,4,5\n",
    );
    let table = load_table(&path).unwrap();
    assert_eq!(table.n_rows(), 3);
    assert_eq!(table.cell(0, "annotator_2"), Some(&Cell::Number(2.0)));
    assert_eq!(table.cell(1, "annotator_2"), Some(&Cell::Missing));
    assert_eq!(table.cell(2, "Sentence"), Some(&Cell::Text("third".into())));

    let detection = detect(&table, AnnotationLevel::TextLevel, &AlphaConfig::default()).unwrap();
    assert_eq!(detection.columns.text_col.as_deref(), Some("Sentence"));
    assert_eq!(detection.columns.annotator_cols, annotator_cols());
    assert_eq!(detection.data_type, DataType::Ordinal);
}

#[test]
fn tsv_uses_tab_delimiter() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "labels.tsv",
        "text\tannotator_1\tannotator_2\tannotator_3\n\
         a, b\tpos\tpos\tneg\n\
         c\tneg\tneg\tneg\n\
         d\tpos\tpos\tpos\n",
    );
    let table = load_table(&path).unwrap();
    assert_eq!(table.cell(0, "text"), Some(&Cell::Text("a, b".into())));
    let result = compute_alpha(
        &table,
        &AlphaRequest::new(DataType::Nominal, annotator_cols()),
        &AlphaConfig::default(),
    )
    .unwrap();
    assert!(result.alpha < 1.0);
}

#[test]
fn json_annotations_become_rows() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "docs.json",
        r#"[
            {"text": "doc one", "annotations": [
                {"annotator_1": "Agree", "annotator_2": "Agree", "annotator_3": "Neutral"}
            ]},
            {"text": "doc two", "annotations": [
                {"annotator_1": "Disagree", "annotator_2": "Strongly Disagree", "annotator_3": "Disagree"}
            ]},
            {"text": "doc three", "annotations": [
                {"annotator_1": "Strongly Agree", "annotator_2": "Agree", "annotator_3": null}
            ]}
        ]"#,
    );
    let table = load_table(&path).unwrap();
    assert_eq!(table.n_rows(), 3);
    assert_eq!(table.cell(1, "text"), Some(&Cell::Text("doc two".into())));
    assert!(table.cell(2, "annotator_3").unwrap().is_missing());

    let data_type = infer_data_type(&table, &annotator_cols(), &ScaleLibrary::canonical()).unwrap();
    assert_eq!(data_type, DataType::Ordinal);
}

#[test]
fn jsonl_annotator_label_pairs_pivot_to_columns() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "labels.jsonl",
        concat!(
            r#"{"text": "x", "annotations": [{"annotator": "annotator_1", "label": "cat"}, {"annotator": "annotator_2", "label": "dog"}, {"annotator": "annotator_3", "label": "cat"}]}"#,
            "\n\n",
            r#"{"text": "y", "annotations": [{"annotator": "annotator_1", "label": "dog"}, {"annotator": "annotator_3", "label": "dog"}]}"#,
            "\n",
        ),
    );
    let table = load_table(&path).unwrap();
    assert_eq!(table.columns(), &["text", "annotator_1", "annotator_2", "annotator_3"]);
    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.cell(1, "annotator_2"), Some(&Cell::Missing));
}

#[test]
fn jsonl_tokens_support_token_level_detection() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "tokens.jsonl",
        concat!(
            r#"{"text": "Paris is big", "annotations": ["#,
            r#"{"word": "Paris", "annotator_1": "LOC", "annotator_2": "LOC", "annotator_3": "ORG"}, "#,
            r#"{"word": "is", "annotator_1": "O", "annotator_2": "O", "annotator_3": "O"}, "#,
            r#"{"word": "big", "annotator_1": "O", "annotator_2": "O", "annotator_3": "O"}]}"#,
            "\n",
        ),
    );
    let table = load_table(&path).unwrap();
    assert_eq!(table.n_rows(), 3);

    let detection = detect(&table, AnnotationLevel::TokenLevel, &AlphaConfig::default()).unwrap();
    assert_eq!(detection.columns.word_col.as_deref(), Some("word"));
    assert_eq!(detection.data_type, DataType::Nominal);
}

#[test]
fn token_level_without_word_column_is_an_error() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "plain.csv",
        "text,annotator_1,annotator_2,annotator_3\na,x,x,y\n",
    );
    let table = load_table(&path).unwrap();
    let err = detect(&table, AnnotationLevel::TokenLevel, &AlphaConfig::default()).unwrap_err();
    assert_eq!(
        err,
        ReliabilityError::UndetectedColumn {
            role: "word".into()
        }
    );
}

#[test]
fn configured_aliases_extend_detection() {
    let dir = tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "reviews.csv",
        "review_body,annotator_1,annotator_2,annotator_3\ngood,1.5,2.5,2\n",
    );
    let table = load_table(&path).unwrap();
    assert!(detect(&table, AnnotationLevel::TextLevel, &AlphaConfig::default()).is_err());

    let config = AlphaConfig {
        text_column_aliases: vec!["Review_Body".into()],
        ..AlphaConfig::default()
    };
    let detection = detect(&table, AnnotationLevel::TextLevel, &config).unwrap();
    assert_eq!(detection.columns.text_col.as_deref(), Some("review_body"));
    assert_eq!(detection.data_type, DataType::Ratio);
}

#[test]
fn unsupported_extension_and_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_table(dir.path().join("sheet.xlsx")).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat(ext) if ext == ".xlsx"));

    let err = load_table(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}
