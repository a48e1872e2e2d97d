//! Deterministic synthetic sports dataset for demos and tests.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use time::macros::{date, format_description};

use crate::dataset::{Cell, Table};

const SPORTS: &[&str] = &["Fútbol", "Baloncesto", "Béisbol", "Tenis", "Atletismo", "Natación"];
const TEAMS: &[&str] = &[
    "Tigres", "Leones", "Águilas", "Toros", "Pumas", "Lobos", "Halcones", "Tiburones",
];
const POSITIONS: &[&str] = &[
    "Portero",
    "Defensa",
    "Mediocampo",
    "Delantero",
    "Alero",
    "Base",
    "Lanzador",
    "Receptor",
];
const COUNTRIES: &[&str] = &[
    "Colombia",
    "Argentina",
    "Brasil",
    "España",
    "EEUU",
    "México",
    "Francia",
    "Alemania",
];
const SEXES: &[&str] = &["M", "F"];

/// Column order of [`generate_sports`].
pub const SPORTS_COLUMNS: &[&str] = &[
    "deporte",
    "equipo",
    "posicion",
    "pais",
    "sexo",
    "lesionado",
    "fecha_partido",
    "edad",
    "altura_cm",
    "peso_kg",
    "minutos_jugados",
    "puntos",
    "asistencias",
    "rebotes",
    "velocidad_max_kmh",
    "salario_miles_usd",
];

/// Generate `rows` player records; the same seed always yields the same table.
///
/// Numeric columns carry soft correlations: weight follows height, points
/// follow minutes and peak around age 27, salary follows points, assists and
/// rebounds.
pub fn generate_sports(rows: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let date_format = format_description!("[year]-[month]-[day]");
    let first_match = date!(2023 - 01 - 01);

    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        let age = normal(&mut rng, 25.0, 5.0).clamp(16.0, 45.0).round();
        let height = round1(normal(&mut rng, 178.0, 10.0).clamp(150.0, 210.0));
        let weight = round1(((height - 100.0) + normal(&mut rng, 10.0, 8.0)).clamp(45.0, 120.0));
        let minutes = normal(&mut rng, 45.0, 20.0).clamp(0.0, 120.0).round();
        let form = minutes / 3.0 - (age - 27.0).powi(2) / 50.0 + normal(&mut rng, 0.0, 5.0);
        let points = (form + 15.0).max(0.0).round();
        let assists = (points * rng.random_range(0.1..0.4) + normal(&mut rng, 0.0, 2.0))
            .max(0.0)
            .round();
        let rebounds = (points.sqrt() * rng.random_range(0.5..2.0) + normal(&mut rng, 0.0, 1.0))
            .max(0.0)
            .round();
        let speed = round1(normal(&mut rng, 28.0, 4.0).clamp(15.0, 40.0));
        let salary = round1(
            (points * 3.0 + assists * 2.0 + rebounds * 1.5 + normal(&mut rng, 0.0, 20.0))
                .clamp(10.0, 500.0),
        );

        let injured = if rng.random::<f64>() < 0.15 { "Sí" } else { "No" };
        let match_day = first_match
            .checked_add(time::Duration::days(rng.random_range(0..900)))
            .unwrap_or(first_match);
        let match_day = match_day.format(date_format).unwrap_or_default();

        out.push(vec![
            pick(&mut rng, SPORTS),
            pick(&mut rng, TEAMS),
            pick(&mut rng, POSITIONS),
            pick(&mut rng, COUNTRIES),
            pick(&mut rng, SEXES),
            Cell::Text(injured.to_string()),
            Cell::Text(match_day),
            Cell::number(age),
            Cell::number(height),
            Cell::number(weight),
            Cell::number(minutes),
            Cell::number(points),
            Cell::number(assists),
            Cell::number(rebounds),
            Cell::number(speed),
            Cell::number(salary),
        ]);
    }
    let headers = SPORTS_COLUMNS.iter().map(|c| (*c).to_string()).collect();
    // Headers are unique and every row matches their width.
    Table::new(headers, out).unwrap_or_default()
}

fn pick(rng: &mut StdRng, values: &[&str]) -> Cell {
    Cell::Text(values.choose(rng).copied().unwrap_or_default().to_string())
}

/// Box-Muller normal sample.
fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    mean + std * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
