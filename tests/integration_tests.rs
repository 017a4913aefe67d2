/// End-to-end scenarios for the delay pipeline: CSV history -> training ->
/// model store -> prediction service -> HTTP.
///
/// Run with: cargo test --test integration_tests -- --nocapture

use std::{io::Write, path::Path, sync::Arc};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use flight_delay::{
    api::{self, AppState},
    dataset,
    model::BoostParams,
    store::{FileModelStore, LayeredModelStore, ModelStore},
    types::PeriodDay,
    DelayClassifier, FeatureBuilder, FeatureSchema, FeatureSelector, FlightDetail, FlightRecord,
    PredictionService, TrainOptions,
};

const HEADER: &str = "Fecha-I,Vlo-I,Ori-I,Des-I,Emp-I,Fecha-O,Vlo-O,Ori-O,Des-O,Emp-O,DIA,MES,AÑO,DIANOM,TIPOVUELO,OPERA,SIGLAORI,SIGLADES";
const AIRLINES: [(&str, &str); 4] = [
    ("Grupo LATAM", "LAN"),
    ("Sky Airline", "SKU"),
    ("Latin American Wings", "LAW"),
    ("Copa Air", "CMP"),
];

/// Historical log where Latin American Wings and July flights leave 40
/// minutes late and everything else 5 minutes late. One row has an
/// unparsable scheduled time.
fn write_history(path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for i in 0..300u32 {
        let (airline, code) = AIRLINES[(i % 4) as usize];
        let month = (i / 4) % 12 + 1;
        let day = i % 28 + 1;
        let late = airline == "Latin American Wings" || month == 7;
        let operated_min = if late { 40 } else { 5 };
        let flight_type = if i % 3 == 0 { "I" } else { "N" };
        writeln!(
            file,
            "2017-{month:02}-{day:02} 10:00:00,{i},SCEL,SCFA,{code},2017-{month:02}-{day:02} 10:{operated_min:02}:00,{i},SCEL,SCFA,{code},{day},{month},2017,Lunes,{flight_type},{airline},Santiago,Antofagasta"
        )
        .unwrap();
    }
    writeln!(
        file,
        "not a date,999,SCEL,SCFA,SKU,2017-01-01 10:00:00,999,SCEL,SCFA,SKU,1,1,2017,Lunes,N,Sky Airline,Santiago,Antofagasta"
    )
    .unwrap();
}

fn fast_options() -> TrainOptions {
    TrainOptions {
        boost: BoostParams {
            n_estimators: 40,
            learning_rate: 0.3,
            max_depth: 3,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn train_from_csv(path: &Path) -> (DelayClassifier, dataset::RowSummary) {
    let schema = FeatureSchema::default();
    let selector = FeatureSelector::from_schema(&schema).unwrap();
    let records = dataset::load_records(path).unwrap();
    let (set, summary) = dataset::build_training_set(records, &FeatureBuilder::new(), &selector);
    let classifier = DelayClassifier::new();
    classifier.train(&set, &schema, &fast_options()).unwrap();
    (classifier, summary)
}

fn record(scheduled: &str, operated: &str) -> FlightRecord {
    FlightRecord {
        scheduled_at: scheduled.into(),
        scheduled_flight: "1".into(),
        scheduled_origin: "SCEL".into(),
        scheduled_destination: "SCFA".into(),
        scheduled_airline: "LAN".into(),
        operated_at: Some(operated.into()),
        operated_flight: Some("1".into()),
        operated_origin: Some("SCEL".into()),
        operated_destination: Some("SCFA".into()),
        operated_airline: Some("LAN".into()),
        day: 3,
        month: 3,
        year: 2017,
        day_name: "Viernes".into(),
        flight_type: "N".into(),
        operator: "Grupo LATAM".into(),
        origin_city: "Santiago".into(),
        destination_city: "Antofagasta".into(),
    }
}

#[test]
fn test_late_night_flight_scenario() {
    println!("\n=== Test: Late Night Flight Scenario ===");
    let builder = FeatureBuilder::new();

    let features = builder
        .build(&record("2017-03-03 23:00:00", "2017-03-03 23:30:00"))
        .unwrap();
    assert!(features.high_season, "March 3rd closes the summer window");
    assert_eq!(features.min_diff, Some(30.0));
    assert_eq!(features.period_day, PeriodDay::Night);
    assert_eq!(features.delay, Some(true));
    println!("✓ high_season=1 min_diff=30 period_day=night delay=1");

    let next_day = builder
        .build(&record("2017-03-03 23:00:00", "2017-03-04 23:30:00"))
        .unwrap();
    assert_eq!(next_day.min_diff, Some(1470.0));
    println!("✓ operated a day later gives min_diff=1470");

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("history.csv");
    write_history(&csv);
    let (classifier, _) = train_from_csv(&csv);
    let service = PredictionService::new(FeatureSchema::default(), Arc::new(classifier)).unwrap();

    let flight = [FlightDetail::new("Grupo LATAM", "N", 3)];
    let results = service.predict(&flight).unwrap();
    assert_eq!(results.len(), 1);
    let result = results[0];
    assert!((0.0..=1.0).contains(&result.probability), "{result:?}");
    assert_eq!(result.delayed, result.probability > 0.5);

    let out = service.predict_response(&flight).unwrap();
    assert_eq!(out.predict, vec![result.label()]);
    println!(
        "✓ Grupo LATAM / N / 3 -> p={:.4} predict={:?}",
        result.probability, out.predict
    );
}

#[test]
fn test_train_save_load_predict() {
    println!("\n=== Test: Train, Save, Load, Predict ===");
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("history.csv");
    write_history(&csv);

    let (trained, summary) = train_from_csv(&csv);
    assert_eq!(summary.processed, 301);
    assert_eq!(summary.kept, 300);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.errors[0].row, 301);
    println!("✓ {} rows kept, {} dropped", summary.kept, summary.dropped);

    let store = FileModelStore::new(dir.path().join("models").join("model.json"));
    store.save(&trained.snapshot().unwrap()).unwrap();
    println!("✓ Saved to {}", store.location());

    let loaded = Arc::new(DelayClassifier::new());
    loaded.load_from(&store).unwrap();
    let service = PredictionService::new(FeatureSchema::default(), Arc::clone(&loaded)).unwrap();

    let flights = vec![
        FlightDetail::new("Latin American Wings", "N", 3),
        FlightDetail::new("Grupo LATAM", "N", 3),
        FlightDetail::new("Copa Air", "I", 7),
    ];
    let results = service.predict(&flights).unwrap();
    assert!(results[0].delayed, "{:?}", results[0]);
    assert!(!results[1].delayed, "{:?}", results[1]);
    assert!(results[2].delayed, "{:?}", results[2]);
    println!("✓ Verdicts: {:?}", results.iter().map(|r| r.label()).collect::<Vec<_>>());

    let selector = FeatureSelector::from_schema(&FeatureSchema::default()).unwrap();
    let rows: Vec<_> = flights
        .iter()
        .map(|f| service.features(&service.validate(f).unwrap()))
        .collect();
    assert_eq!(
        trained.predict_proba(&rows).unwrap(),
        loaded.predict_proba(&rows).unwrap(),
        "reloaded model must score identically"
    );
    assert_eq!(selector.columns(), rows[0].columns());
    println!("✓ Reloaded model scores identically");
}

#[test]
fn test_training_is_reproducible() {
    println!("\n=== Test: Reproducible Training ===");
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("history.csv");
    write_history(&csv);

    let (a, _) = train_from_csv(&csv);
    let (b, _) = train_from_csv(&csv);
    let a = a.snapshot().unwrap();
    let b = b.snapshot().unwrap();
    assert_eq!(a.ensemble, b.ensemble);
    assert_eq!(a.scale_pos_weight, b.scale_pos_weight);
    println!(
        "✓ Two runs produced identical ensembles ({} trees, scale_pos_weight={:.3})",
        a.ensemble.trees.len(),
        a.scale_pos_weight
    );
}

#[test]
fn test_fallback_store() {
    println!("\n=== Test: Fallback Model Store ===");
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("history.csv");
    write_history(&csv);
    let (trained, _) = train_from_csv(&csv);

    let fallback = FileModelStore::new(dir.path().join("fallback.json"));
    fallback.save(&trained.snapshot().unwrap()).unwrap();

    let layered = LayeredModelStore::new(
        Box::new(FileModelStore::new(dir.path().join("missing.json"))),
        Box::new(fallback),
    );
    let model = layered.load().unwrap();
    assert_eq!(model.columns(), FeatureSchema::default().columns.as_slice());
    println!("✓ Primary missing, model loaded from fallback");
}

#[tokio::test]
async fn test_http_predict_roundtrip() {
    println!("\n=== Test: HTTP Predict ===");
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("history.csv");
    write_history(&csv);
    let (classifier, _) = train_from_csv(&csv);
    let service = PredictionService::new(FeatureSchema::default(), Arc::new(classifier)).unwrap();
    let app = api::router(AppState::new(service));

    let body = r#"{"flights": [
        {"OPERA": "Latin American Wings", "TIPOVUELO": "N", "MES": 3},
        {"OPERA": "Grupo LATAM", "TIPOVUELO": "N", "MES": 3}
    ]}"#;
    let resp = app
        .clone()
        .oneshot(
            Request::post("/predict")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json, serde_json::json!({ "predict": [1, 0] }));
    println!("✓ POST /predict -> {json}");

    let resp = app
        .oneshot(
            Request::post("/predict")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"flights": [{"OPERA": "Grupo LATAM", "TIPOVUELO": "O", "MES": 3}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    println!("✓ Unknown TIPOVUELO rejected with 400");
}
