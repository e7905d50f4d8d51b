fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()
        .expect("failed to build logger instance");

    let channels = vigil_bridge::BridgeChannels::default();
    let backend = vigil_backend::run(channels.backend_rx, channels.backend_tx);
    vigil_frontend::run(channels.frontend_rx, channels.frontend_tx)?;

    if backend.join().is_err() {
        log::error!("Backend thread panicked");
    }
    Ok(())
}
