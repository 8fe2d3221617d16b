use crate::audio::adapter::PlaybackAdapter;
use crate::audio::controller::{AdapterCommand, BackendEvent, PlaybackController, Telemetry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drives the adapter from controller snapshots and feeds backend telemetry
/// back into the controller. Runs until aborted.
pub fn spawn_playback_loop(
    controller: PlaybackController,
    mut adapter: PlaybackAdapter,
    mut commands: mpsc::UnboundedReceiver<AdapterCommand>,
    mut telemetry: mpsc::UnboundedReceiver<BackendEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut snapshots = controller.watch_transport();
        let initial = snapshots.borrow_and_update().clone();
        adapter.sync(&initial);

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    adapter.sync(&snapshot);
                }
                Some(command) = commands.recv() => adapter.apply(command),
                Some(event) = telemetry.recv() => {
                    if event.kind == Telemetry::Ended {
                        // Advancing may await the resolver; keep servicing snapshots meanwhile.
                        let controller = controller.clone();
                        tokio::spawn(async move { controller.report(event).await });
                    } else {
                        controller.report(event).await;
                    }
                }
                else => break,
            }
        }

        adapter.unmount();
        log::info!("[engine] playback loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{PlayableSource, Track};
    use crate::api::resolver::VideoResolver;
    use crate::audio::adapter::{BackendFactory, MediaBackend, TelemetrySink};
    use crate::error::AppResult;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct NoVideo;

    #[async_trait]
    impl VideoResolver for NoVideo {
        async fn resolve(&self, _title: &str, _artist: &str) -> AppResult<Option<String>> {
            Ok(None)
        }
    }

    struct Silent;

    impl MediaBackend for Silent {
        fn set_playing(&mut self, _playing: bool) -> AppResult<()> {
            Ok(())
        }
        fn set_volume(&mut self, _volume: f32) {}
        fn seek(&mut self, _position: f64) {}
    }

    /// Hands every sink to the test so it can play the backend's part.
    struct CapturingFactory(Arc<Mutex<Vec<TelemetrySink>>>);

    impl BackendFactory for CapturingFactory {
        fn mount(&mut self, _target: &str, telemetry: TelemetrySink) -> AppResult<Box<dyn MediaBackend>> {
            self.0.lock().unwrap().push(telemetry);
            Ok(Box::new(Silent))
        }
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn ended_advances_through_queue() {
        let (controller, commands) = PlaybackController::new(Arc::new(NoVideo), 1.0);
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let (adapter, telemetry) = PlaybackAdapter::new();
        let adapter = adapter.with_audio(CapturingFactory(Arc::clone(&sinks)));
        let handle = spawn_playback_loop(controller.clone(), adapter, commands, telemetry);

        let tracks: Vec<Track> = ["a", "b"]
            .iter()
            .map(|id| {
                Track::new(*id, *id, "x")
                    .with_source(PlayableSource::DirectUrl(format!("https://cdn/{}.mp3", id)))
            })
            .collect();
        controller.set_queue(tracks.clone());
        controller.play(tracks[0].clone()).await;

        wait_for(|| sinks.lock().unwrap().len() == 1).await;
        let first = sinks.lock().unwrap()[0].clone();
        first.duration(180.0);
        first.progress(90.0);
        wait_for(|| controller.transport().progress == 90.0).await;

        first.ended();
        wait_for(|| controller.current_track().map(|t| t.id) == Some("b".into())).await;
        wait_for(|| sinks.lock().unwrap().len() == 2).await;

        // Late telemetry from the first mount is ignored.
        first.progress(120.0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.transport().progress, 0.0);

        handle.abort();
    }
}
