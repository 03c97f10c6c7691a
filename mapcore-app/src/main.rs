use anyhow::Context;
use mapcore::prelude::*;

/// Headless demo client: resolves (or establishes) a session against a live
/// backend, mounts an in-memory surface, walks the full hydration sequence,
/// then exercises layer toggles and the measurement tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let api_base =
        std::env::var("MAPCORE_API").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let backend = HttpBackend::new(&api_base)?;
    let mut session = SessionCoordinator::new(backend, MapConfig::new(&api_base));

    session.start().await?;
    if !session.is_authenticated() {
        let email = std::env::var("MAPCORE_EMAIL").ok();
        let password = std::env::var("MAPCORE_PASSWORD").ok();
        match (email, password) {
            (Some(email), Some(password)) => session.login(&email, &password).await?,
            _ => anyhow::bail!(
                "no stored session; set MAPCORE_EMAIL and MAPCORE_PASSWORD to sign in"
            ),
        }
    }
    let user = session
        .identity()
        .and_then(|i| i.display_handle().map(str::to_string))
        .unwrap_or_else(|| "<anonymous>".to_string());
    log::info!("signed in as {}", user);

    // Mount a headless surface and drive it through hydration
    let directive = session
        .mount_request()
        .context("surface mount already requested")?;
    let epoch = directive.epoch;
    session.attach_surface(
        epoch,
        Box::new(RecordingSurface::with_style(&directive.style)),
    );
    session.handle_style_loaded(epoch).await?;
    session.handle_render_idle(epoch);

    let descriptors = session.layers().descriptors().to_vec();
    println!("{} layers available:", descriptors.len());
    for d in &descriptors {
        println!(
            "  #{:<4} {:<30} {}",
            d.id,
            d.name,
            d.description.as_deref().unwrap_or("")
        );
    }

    // Toggle the first layer on and show a tile URL the surface would fetch
    if let Some(first) = descriptors.first() {
        session.toggle_layer_enabled(first.id, Instant::now())?;
        let probe = TileCoord::from_lat_lng(&LatLng::new(46.2276, 2.2137), 6);
        println!("tile probe: {}", session.backend().tile_url(first.id, probe));
    }

    // Measurement demo: Paris to Lyon as the crow flies
    session.set_measure_tool(MeasureMode::Length)?;
    session.handle_map_click(epoch, LatLng::new(48.8566, 2.3522), Point::new(0.0, 0.0))?;
    session.handle_map_click(epoch, LatLng::new(45.7640, 4.8357), Point::new(0.0, 0.0))?;
    println!(
        "Paris-Lyon: {}",
        format_length(session.measurement().current_length())
    );
    session.clear_measurement()?;

    // Let the debounced autosave flush before signing off
    let mut pump = tokio::time::interval(std::time::Duration::from_millis(250));
    for _ in 0..8 {
        pump.tick().await;
        session.tick(Instant::now()).await;
    }

    session.logout().await;
    log::info!("session closed");
    Ok(())
}
