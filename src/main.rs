//! Entry point for the tabpredict web application.

use tabpredict::config;
use tabpredict::logging;
use tabpredict::web::{AppState, WebServer};

fn main() {
    if let Err(err) = logging::init("tabpredict") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = config::load_or_default()?;
    let addr = settings.bind_address();
    let state = AppState::load(settings);
    let server = WebServer::bind(state, &addr)?;
    println!("tabpredict listening on http://{}", server.local_addr()?);
    server.serve();
    Ok(())
}
