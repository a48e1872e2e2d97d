mod support;

use std::io::Read;
use std::thread;

use support::app_root::AppRootGuard;
use support::fixtures::{self, LABEL};
use tabpredict::config::{self, Settings};
use tabpredict::store::ModelArtifact;
use tabpredict::web::{AppState, WebServer, handle};
use tabpredict::{store, workflow};
use tempfile::tempdir;

fn trained(dir: &std::path::Path) -> (Settings, ModelArtifact) {
    let path = fixtures::write_csv(dir, "players.csv", &fixtures::players_csv(60));
    let settings = fixtures::settings_for(dir, path);
    let run = workflow::run_training(&settings).expect("train fixture model");
    (settings, run.artifact)
}

#[test]
fn missing_model_renders_message_instead_of_failing() {
    let dir = tempdir().unwrap();
    let mut settings = Settings::default();
    settings.model.path = dir.path().join("nothing-here.json");
    let state = AppState::load(settings);
    assert!(state.model.is_err());

    let home = handle(&state, "GET", "/", None, b"");
    assert_eq!(home.status, 200);
    assert!(home.text().contains("No model available."));
    assert!(home.text().contains("nothing-here.json"));

    let predict = handle(&state, "POST", "/predict", None, b"minutos=10&puntos=3");
    assert_eq!(predict.status, 503);
    assert!(predict.text().contains("nothing-here.json"));
}

#[test]
fn settings_are_read_from_the_app_directory() {
    let dir = tempdir().unwrap();
    let _root = AppRootGuard::set(dir.path().join("app"));
    assert_eq!(config::load_or_default().unwrap(), Settings::default());

    let mut settings = Settings::default();
    settings.server.port = 9100;
    settings.dataset.label_column = LABEL.to_string();
    let path = config::config_path().unwrap();
    assert!(path.starts_with(dir.path()));
    config::save_to_path(&settings, &path).unwrap();
    assert_eq!(config::load_or_default().unwrap(), settings);
}

#[test]
fn predict_form_returns_label_and_probability() {
    let dir = tempdir().unwrap();
    let (settings, _) = trained(dir.path());
    let state = AppState::load(settings);
    let artifact = state.model.as_ref().expect("model loads");
    assert_eq!(artifact.label_column, LABEL);

    let home = handle(&state, "GET", "/", None, b"");
    assert!(home.text().contains("name=\"minutos\""));
    assert!(home.text().contains("name=\"puntos\""));

    let reply = handle(&state, "POST", "/predict", None, b"minutos=72&puntos=26");
    assert_eq!(reply.status, 200);
    let page = reply.text();
    assert!(page.contains("titular with probability"), "{page}");
    assert!(page.contains("Class probabilities"));

    let reply = handle(&state, "POST", "/predict", None, b"minutos=&puntos=6");
    assert_eq!(reply.status, 200);
    assert!(reply.text().contains("Imputed: minutos"));
}

#[test]
fn invalid_feature_values_are_rejected() {
    let dir = tempdir().unwrap();
    let (settings, artifact) = trained(dir.path());
    let state = AppState::with_model(settings, artifact);
    let reply = handle(&state, "POST", "/predict", None, b"minutos=lots&puntos=6");
    assert_eq!(reply.status, 400);
    assert!(reply.text().contains("Not a number"));
    assert!(reply.text().contains("value=\"lots\""));
}

#[test]
fn upload_renders_statistics_and_batch_predictions() {
    let dir = tempdir().unwrap();
    let (settings, artifact) = trained(dir.path());
    let state = AppState::with_model(settings, artifact);
    let body = fixtures::multipart_upload(
        "tabpredictBoundary",
        &fixtures::players_csv(40),
        &[("sample_rows", "30"), ("seed", "7"), ("chart", "bar"), ("chart", "histogram")],
    );
    let reply = handle(
        &state,
        "POST",
        "/upload",
        Some("multipart/form-data; boundary=tabpredictBoundary"),
        &body,
    );
    assert_eq!(reply.status, 200);
    let page = reply.text();
    assert!(page.contains("players.csv"));
    assert!(page.contains("Numeric summary"));
    assert!(page.contains("Count by equipo"));
    assert!(page.contains("Histogram of minutos"));
    assert!(page.contains("Accuracy against"));
    assert!(page.contains("Showing a random sample of 30 of 40 rows"));
}

#[test]
fn upload_download_returns_processed_csv() {
    let dir = tempdir().unwrap();
    let state = AppState {
        settings: fixtures::settings_for(dir.path(), dir.path().join("unused.csv")),
        model: Err("no model".to_string()),
    };
    let body = fixtures::multipart_upload(
        "dlBoundary",
        &fixtures::players_csv(40),
        &[
            ("sample_rows", "15"),
            ("columns", "puntos,nivel"),
            ("missing_pct", "10"),
            ("action", "download"),
        ],
    );
    let reply = handle(
        &state,
        "POST",
        "/upload",
        Some("multipart/form-data; boundary=dlBoundary"),
        &body,
    );
    assert_eq!(reply.status, 200);
    assert!(reply.content_type.starts_with("text/csv"));
    assert_eq!(reply.attachment.as_deref(), Some("players_actual.csv"));
    let text = reply.text();
    assert!(text.starts_with("puntos,nivel\n"));
    assert_eq!(text.lines().count(), 16);
}

#[test]
fn upload_with_bad_schema_is_reported() {
    let dir = tempdir().unwrap();
    let state = AppState {
        settings: fixtures::settings_for(dir.path(), dir.path().join("unused.csv")),
        model: Err("no model".to_string()),
    };
    let body = fixtures::multipart_upload("b0undary", "a,b\n1,2\n3\n", &[]);
    let reply = handle(
        &state,
        "POST",
        "/upload",
        Some("multipart/form-data; boundary=b0undary"),
        &body,
    );
    assert_eq!(reply.status, 400);
    assert!(reply.text().contains("SchemaMismatch"));
}

#[test]
fn serves_pages_over_a_real_socket() {
    let dir = tempdir().unwrap();
    let (mut settings, _) = trained(dir.path());
    settings.server.max_upload_bytes = 256;
    let model_path = settings.model.path.clone();
    assert!(store::load(&model_path).is_ok());

    let state = AppState::load(settings);
    let server = WebServer::bind(state, "127.0.0.1:0").expect("bind");
    let base = format!("http://{}", server.local_addr().expect("addr"));
    thread::spawn(move || server.serve());

    let home = ureq::get(&format!("{base}/")).call().expect("home page");
    assert_eq!(home.status(), 200);
    assert!(home.content_type().starts_with("text/html"));
    assert!(home.into_string().unwrap().contains("Model loaded"));

    let predicted = ureq::post(&format!("{base}/predict"))
        .send_form(&[("minutos", "21"), ("puntos", "5.5")])
        .expect("predict");
    assert!(predicted.into_string().unwrap().contains("suplente with probability"));

    match ureq::get(&format!("{base}/missing")).call() {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 404),
        other => panic!("expected 404, got {other:?}"),
    }

    let oversized = vec![b'x'; 1024];
    match ureq::post(&format!("{base}/predict")).send_bytes(&oversized) {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 413),
        other => panic!("expected 413, got {other:?}"),
    }

    let csv = ureq::get(&format!("{base}/synthetic.csv?rows=12&seed=3"))
        .call()
        .expect("synthetic csv");
    assert!(csv.content_type().starts_with("text/csv"));
    let mut text = String::new();
    csv.into_reader().read_to_string(&mut text).unwrap();
    assert_eq!(text.lines().count(), 13);
    assert!(text.starts_with("deporte,equipo"));
}
