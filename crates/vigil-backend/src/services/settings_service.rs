use vigil_bridge::notification::NotificationMessage;
use vigil_bridge::settings::ClientSettings;

use crate::store::{self, keys};

/// Handles [`vigil_bridge::MessageToBackend::UpdateSettings`]. The volume is
/// only persisted locally; a new recording quality is also sent to the
/// server.
pub async fn handle_update_settings(context: super::AppContextHandle, settings: ClientSettings) {
    let api = {
        let state = context.state.read().await;
        state.session.write().await.settings.merge(settings.clone());
        if let Some(volume) = settings.alert_volume {
            if let Err(error) = store::write(state.store.as_ref(), keys::ALERT_VOLUME, &volume) {
                log::warn!("Failed to persist alert volume: {error}");
            }
        }
        state.api.clone()
    };

    let Some(quality) = settings.recording_quality else {
        return;
    };
    match api.set_recording_quality(&quality).await {
        Ok(()) => {
            context
                .send_notification(NotificationMessage::success(format!(
                    "Recording quality set to {quality}"
                )))
                .await;
        }
        Err(error) => {
            log::error!("Error updating recording quality: {error}");
            context
                .send_notification(NotificationMessage::error(format!(
                    "Failed to update recording quality: {error}"
                )))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use vigil_bridge::MessageToBackend;
    use vigil_bridge::settings::ClientSettings;

    use crate::app::testing;
    use crate::store::{self, keys};

    #[tokio::test]
    async fn volume_is_persisted_and_merged_into_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let (context, _manager, mut rx) = testing::context(dir.path());

        context
            .dispatch_message(MessageToBackend::UpdateSettings(ClientSettings {
                recording_quality: None,
                alert_volume: Some(0.7),
            }))
            .await;

        let state = context.state.read().await;
        assert_eq!(
            store::read::<f32>(state.store.as_ref(), keys::ALERT_VOLUME).unwrap(),
            Some(0.7)
        );
        assert_eq!(state.session.read().await.settings.alert_volume, Some(0.7));
        assert!(rx.try_recv().is_err());
    }
}
