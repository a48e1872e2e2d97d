use std::path::{Path, PathBuf};

use tabpredict::config::Settings;

/// Feature columns of [`players_csv`].
pub const FEATURES: [&str; 2] = ["minutos", "puntos"];
pub const LABEL: &str = "nivel";

/// Two well separated classes plus a text column and a few blanks.
pub fn players_csv(rows: usize) -> String {
    let mut text = String::from("equipo,minutos,puntos,nivel\n");
    for i in 0..rows {
        let team = ["Tigres", "Leones", "Pumas"][i % 3];
        let jitter = (i * 7 % 11) as f64 / 10.0;
        let (minutes, points, level) = if i % 2 == 0 {
            (20.0 + jitter, 5.0 + jitter, "suplente")
        } else {
            (70.0 + jitter, 25.0 + jitter, "titular")
        };
        let minutes = if i % 17 == 5 {
            "NA".to_string()
        } else {
            format!("{minutes:.1}")
        };
        text.push_str(&format!("{team},{minutes},{points:.1},{level}\n"));
    }
    text
}

pub fn single_class_csv(rows: usize) -> String {
    let mut text = String::from("minutos,puntos,nivel\n");
    for i in 0..rows {
        text.push_str(&format!("{},{},titular\n", 60 + i, 20 + i % 5));
    }
    text
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write csv fixture");
    path
}

/// Settings reading `data` and saving the model under `dir`.
pub fn settings_for(dir: &Path, data: PathBuf) -> Settings {
    let mut settings = Settings::default();
    settings.dataset.path = data;
    settings.dataset.label_column = LABEL.to_string();
    settings.model.path = dir.join("models").join("model.json");
    settings.server.port = 0;
    settings
}

/// Multipart body with one CSV file part and extra text fields.
pub fn multipart_upload(boundary: &str, csv: &str, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"players.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{boundary}--\r\n"
    ));
    body.into_bytes()
}
