use filedeck_core::watch::ChangeKind;
use tokio::time::{sleep, Duration};


#[test]
fn test_reports_file_and_directory_changes() {
    fixture::run(|mut fixture| async move {
        let root = fixture.workspace_path();
        let watched = fixture.service.watch(&root).await.unwrap();
        assert_eq!(watched, root);

        let dir = fixture.mkdir("src");
        let (event, _) = fixture.wait_for(|e| e.path == dir).await;
        assert_eq!(event.event, ChangeKind::AddDir);

        let file = fixture.write("notes.txt", "one");
        let (event, _) = fixture.wait_for(|e| e.path == file).await;
        assert_eq!(event.event, ChangeKind::Add);

        std::fs::write(&file, "two").unwrap();
        fixture
            .wait_for(|e| e.path == file && e.event == ChangeKind::Change)
            .await;

        std::fs::remove_file(&file).unwrap();
        fixture
            .wait_for(|e| e.path == file && e.event == ChangeKind::Unlink)
            .await;

        std::fs::remove_dir(&dir).unwrap();
        fixture
            .wait_for(|e| e.path == dir && e.event == ChangeKind::UnlinkDir)
            .await;

        assert!(fixture.service.stop_watching().await);
        assert_eq!(fixture.service.watched_root().await, None);
    });
}

#[test]
fn test_replacing_watch_silences_previous_root() {
    fixture::run(|mut fixture| async move {
        let a = fixture.mkdir("a");
        let b = fixture.mkdir("b");

        fixture.service.watch(&a).await.unwrap();
        let first = fixture.write("a/first.txt", "x");
        fixture.wait_for(|e| e.path == first).await;

        fixture.service.watch(&b).await.unwrap();
        // Anything queued so far was published before the switch.
        fixture.drain_events();

        fixture.write("a/late.txt", "x");
        let in_b = fixture.write("b/new.txt", "x");
        let (_, before) = fixture.wait_for(|e| e.path == in_b).await;
        assert!(
            before.iter().all(|e| !e.path.starts_with(&a)),
            "events from the old root: {before:?}"
        );

        sleep(Duration::from_millis(200)).await;
        let after = fixture.drain_events();
        assert!(
            after.iter().all(|e| !e.path.starts_with(&a)),
            "events from the old root: {after:?}"
        );
        assert_eq!(fixture.service.watched_root().await, Some(b));
    });
}

#[test]
fn test_no_events_after_stop() {
    fixture::run(|mut fixture| async move {
        fixture.service.watch(fixture.workspace_path()).await.unwrap();
        let path = fixture.write("before.txt", "x");
        fixture.wait_for(|e| e.path == path).await;

        fixture.service.stop_watching().await;
        fixture.drain_events();

        fixture.write("after.txt", "x");
        sleep(Duration::from_millis(200)).await;
        assert!(fixture.drain_events().is_empty());
    });
}

#[test]
fn test_hidden_paths_dropped_when_configured() {
    fixture::run_with(
        fixture::TrashBehavior::Succeed,
        |settings| settings.watch.ignore_hidden = true,
        |mut fixture| async move {
            fixture.service.watch(fixture.workspace_path()).await.unwrap();

            fixture.write(".cache/blob", "x");
            let visible = fixture.write("visible.txt", "x");
            let (_, before) = fixture.wait_for(|e| e.path == visible).await;
            assert!(before.is_empty(), "unexpected events: {before:?}");
        },
    );
}

#[test]
fn test_watch_missing_root_fails() {
    fixture::run(|fixture| async move {
        let err = fixture
            .service
            .watch(fixture.path("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), filedeck_core::ErrorCode::WatcherFailure);
        assert_eq!(fixture.service.watched_root().await, None);
    });
}
