//! Property-based tests for queue navigation and transport bounds.

mod common;

use common::{direct, NullResolver};
use pocketplay_lib::audio::controller::{BackendEvent, PlaybackController, Telemetry};
use proptest::prelude::*;
use std::sync::Arc;

// ===== Helpers =====

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Small id alphabet so duplicates show up often.
fn arbitrary_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]", 1..12)
}

fn controller_with_queue(ids: &[String]) -> PlaybackController {
    let (c, _) = PlaybackController::new(Arc::new(NullResolver), 1.0);
    c.set_queue(ids.iter().map(|id| direct(id)).collect());
    c
}

// ===== Property Tests =====

proptest! {
    /// Property: stepping forward len times from any start visits every
    /// position in order and returns to the start.
    #[test]
    fn forward_navigation_is_cyclic(
        (ids, start) in arbitrary_ids().prop_flat_map(|ids| {
            let len = ids.len();
            (Just(ids), 0..len)
        })
    ) {
        runtime().block_on(async {
            let c = controller_with_queue(&ids);
            c.play_index(start).await;

            for step in 1..=ids.len() {
                prop_assert!(c.next().await);
                let expected = (start + step) % ids.len();
                prop_assert_eq!(c.queue().current_index, Some(expected));
                prop_assert_eq!(c.current_track().map(|t| t.id), Some(ids[expected].clone()));
            }
            prop_assert_eq!(c.queue().current_index, Some(start));
            Ok(())
        })?;
    }

    /// Property: previous undoes next.
    #[test]
    fn previous_undoes_next(
        (ids, start, steps) in arbitrary_ids().prop_flat_map(|ids| {
            let len = ids.len();
            (Just(ids), 0..len, 0usize..30)
        })
    ) {
        runtime().block_on(async {
            let c = controller_with_queue(&ids);
            c.play_index(start).await;

            for _ in 0..steps {
                c.next().await;
            }
            for _ in 0..steps {
                c.previous().await;
            }
            prop_assert_eq!(c.queue().current_index, Some(start));
            Ok(())
        })?;
    }

    /// Property: progress stays within [0, duration] whatever is sought or reported.
    #[test]
    fn progress_stays_in_range(
        duration in 1.0f64..3600.0,
        seeks in prop::collection::vec(-5.0f64..5.0, 1..20),
        reports in prop::collection::vec(-100.0f64..8000.0, 0..20)
    ) {
        runtime().block_on(async {
            let (c, _commands) = PlaybackController::new(Arc::new(NullResolver), 1.0);
            c.play(direct("a")).await;
            let generation = c.transport().generation;
            c.report(BackendEvent {
                track_id: "a".into(),
                generation,
                kind: Telemetry::Duration(duration),
            })
            .await;

            for fraction in seeks {
                prop_assert!(c.seek_to(fraction));
                let t = c.transport();
                prop_assert!(t.progress >= 0.0 && t.progress <= t.duration);
            }
            for seconds in reports {
                c.report(BackendEvent {
                    track_id: "a".into(),
                    generation,
                    kind: Telemetry::Progress(seconds),
                })
                .await;
                let t = c.transport();
                prop_assert!(t.progress >= 0.0 && t.progress <= t.duration);
                prop_assert!((0.0..=1.0).contains(&t.progress_fraction()));
            }
            Ok(())
        })?;
    }

    /// Property: volume always lands in [0, 1].
    #[test]
    fn volume_is_always_clamped(levels in prop::collection::vec(-10.0f32..10.0, 1..20)) {
        let (c, _) = PlaybackController::new(Arc::new(NullResolver), 1.0);
        for level in levels {
            let applied = c.set_volume(level);
            prop_assert!((0.0..=1.0).contains(&applied));
            prop_assert_eq!(applied, c.volume());
        }
    }
}
