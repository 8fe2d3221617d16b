mod common;

use common::{direct, MemoryStore};
use pocketplay_lib::collection::Collection;
use pocketplay_lib::error::{AppError, FailureKind};
use pocketplay_lib::events::NoticePayload;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::broadcast;

fn collection() -> (Collection, Arc<MemoryStore>, broadcast::Receiver<NoticePayload>) {
    let store = Arc::new(MemoryStore::default());
    let (notices, rx) = broadcast::channel(16);
    (Collection::new(store.clone(), notices), store, rx)
}

mod likes {
    use super::*;

    #[tokio::test]
    async fn like_marks_track_after_store_confirms() {
        let (c, store, _notices) = collection();
        assert!(c.like("u1", &direct("t1")).await);
        assert!(c.is_liked("t1"));
        assert_eq!(store.liked_count("u1"), 1);
    }

    #[tokio::test]
    async fn liking_twice_inserts_once() {
        let (c, store, _notices) = collection();
        c.like("u1", &direct("t1")).await;
        c.clear();
        assert!(c.like("u1", &direct("t1")).await);

        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert!(c.is_liked("t1"));
    }

    #[tokio::test]
    async fn failed_like_leaves_indicator_and_raises_notice() {
        let (c, store, mut notices) = collection();
        store.fail_writes.store(true, Ordering::SeqCst);

        assert!(!c.like("u1", &direct("t1")).await);
        assert!(!c.is_liked("t1"));

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.failure, Some(FailureKind::Transient));
        assert!(notice.message.starts_with("Couldn't like song"));
    }

    #[tokio::test]
    async fn failed_unlike_keeps_like() {
        let (c, store, mut notices) = collection();
        c.like("u1", &direct("t1")).await;
        store.fail_writes.store(true, Ordering::SeqCst);

        assert!(!c.unlike("u1", "t1").await);
        assert!(c.is_liked("t1"));
        assert!(notices.try_recv().is_ok());
    }

    #[tokio::test]
    async fn toggle_like_flips_state() {
        let (c, _store, _notices) = collection();
        let track = direct("t1");
        assert!(c.toggle_like("u1", &track).await);
        assert!(!c.toggle_like("u1", &track).await);
        assert!(!c.is_liked("t1"));
    }

    #[tokio::test]
    async fn refresh_replaces_local_set() {
        let (c, _store, _notices) = collection();
        c.like("u1", &direct("t1")).await;
        c.like("u1", &direct("t2")).await;
        c.clear();
        assert!(c.liked_ids().is_empty());

        let tracks = c.refresh_likes("u1").await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(c.is_liked("t1") && c.is_liked("t2"));
        assert!(c.refresh_likes("someone-else").await.unwrap().is_empty());
        assert!(c.liked_ids().is_empty());
    }
}

mod playlists {
    use super::*;

    #[tokio::test]
    async fn adding_duplicate_is_a_noop() {
        let (c, store, _notices) = collection();
        let playlist = c.create_playlist("u1", "Road trip", None).await.unwrap();

        assert!(c.add_to_playlist(&playlist.id, &direct("t1")).await.unwrap());
        assert!(!c.add_to_playlist(&playlist.id, &direct("t1")).await.unwrap());

        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(c.playlist_tracks(&playlist.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (c, _store, _notices) = collection();
        let err = c.create_playlist("u1", "   ", None).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(c.playlists("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn playlists_are_scoped_to_user() {
        let (c, _store, _notices) = collection();
        c.create_playlist("u1", "Mine", Some("desc")).await.unwrap();
        c.create_playlist("u2", "Theirs", None).await.unwrap();

        let mine = c.playlists("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].description.as_deref(), Some("desc"));
    }

    #[tokio::test]
    async fn delete_removes_playlist_and_tracks() {
        let (c, _store, _notices) = collection();
        let playlist = c.create_playlist("u1", "Gone", None).await.unwrap();
        c.add_to_playlist(&playlist.id, &direct("t1")).await.unwrap();

        c.delete_playlist("u1", &playlist.id).await.unwrap();
        assert!(c.playlists("u1").await.unwrap().is_empty());
        assert!(c.playlist_tracks(&playlist.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_is_reported() {
        let (c, store, mut notices) = collection();
        let playlist = c.create_playlist("u1", "List", None).await.unwrap();
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = c.add_to_playlist(&playlist.id, &direct("t1")).await.unwrap_err();
        assert!(err.is_transient());
        let notice = notices.try_recv().unwrap();
        assert!(notice.message.starts_with("Couldn't add to playlist"));
    }

    #[tokio::test]
    async fn remove_drops_track() {
        let (c, _store, _notices) = collection();
        let playlist = c.create_playlist("u1", "List", None).await.unwrap();
        c.add_to_playlist(&playlist.id, &direct("t1")).await.unwrap();
        c.add_to_playlist(&playlist.id, &direct("t2")).await.unwrap();

        c.remove_from_playlist(&playlist.id, "t1").await.unwrap();
        let ids: Vec<String> = c
            .playlist_tracks(&playlist.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t2".to_string()]);
    }
}
