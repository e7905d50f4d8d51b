use vigil_bridge::MessageFromBackend;

/// Handles an incoming configuration request (see
/// [`vigil_bridge::MessageToBackend::ConfigurationRequest`]).
pub async fn handle_config_request(context: super::AppContextHandle) {
    let config = {
        let state = context.state.read().await;
        state.config.clone()
    };
    context
        .send(MessageFromBackend::ConfigurationResponse(config))
        .await;
}

/// Handles [`vigil_bridge::MessageToBackend::SetTrafficLog`]: toggles the
/// traffic log and remembers the choice in the config file.
pub async fn handle_set_traffic_log(context: super::AppContextHandle, enabled: bool) {
    let (config, config_file) = {
        let mut state = context.state.write().await;
        state.debug.set_enabled(enabled);
        state.config.debug.traffic_log = enabled;
        (state.config.clone(), state.paths.config_file.clone())
    };

    if let Err(error) = crate::config::save_config_to(&config, &config_file).await {
        log::warn!("Failed to save configuration: {error}");
    }
}
