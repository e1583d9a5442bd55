use filedeck_core::file::access::FileReadResult;
use filedeck_core::file::manager::{DeleteMethod, PERMANENT_DELETE_WARNING};
use filedeck_core::ErrorCode;


use fixture::TrashBehavior;

#[test]
fn test_delete_moves_to_trash() {
    fixture::run(|fixture| async move {
        let path = fixture.write("draft.txt", "x");

        let outcome = fixture.service.delete(&path).await.unwrap();
        assert_eq!(outcome.method, DeleteMethod::Trash);
        assert_eq!(outcome.warning, None);
        assert!(!path.exists());
        assert!(fixture.trash_dir.path().join("draft.txt").exists());
    });
}

#[test]
fn test_delete_falls_back_to_permanent_removal() {
    fixture::run_with(TrashBehavior::Fail, |_| {}, |fixture| async move {
        let dir = fixture.write("build/out/app.bin", "bin");
        let dir = dir.parent().unwrap().parent().unwrap().to_path_buf();

        let outcome = fixture.service.delete(&dir).await.unwrap();
        assert_eq!(outcome.method, DeleteMethod::Permanent);
        assert_eq!(outcome.warning.as_deref(), Some(PERMANENT_DELETE_WARNING));
        assert!(!dir.exists());
    });
}

#[test]
fn test_delete_fails_when_fallback_fails() {
    fixture::run_with(
        TrashBehavior::FailAfterRemoving,
        |_| {},
        |fixture| async move {
            let path = fixture.write("locked.txt", "x");

            let err = fixture.service.delete(&path).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::DeleteFailure);
        },
    );
}

#[test]
fn test_delete_missing_path_is_not_found() {
    fixture::run(|fixture| async move {
        let err = fixture
            .service
            .delete(fixture.path("ghost.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    });
}

#[test]
fn test_rename_rejects_invalid_names_without_touching_disk() {
    fixture::run(|fixture| async move {
        let path = fixture.write("keep.txt", "x");

        for name in ["a/b", "", "   "] {
            let err = fixture.service.rename(&path, name).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidName, "{name:?}");
        }

        assert!(path.exists());
        assert!(!fixture.path("a").exists());
        let entries: Vec<_> = std::fs::read_dir(fixture.workspace_path())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    });
}

#[test]
fn test_rename_within_parent() {
    fixture::run(|fixture| async move {
        let path = fixture.write("docs/old.md", "x");

        let new_path = fixture.service.rename(&path, "new.md").await.unwrap();
        assert_eq!(new_path, fixture.path("docs/new.md"));
        assert_eq!(std::fs::read_to_string(new_path).unwrap(), "x");
    });
}

#[test]
fn test_create_folder_then_write_and_stat() {
    fixture::run(|fixture| async move {
        let folder = fixture.path("a/b");
        fixture.service.create_folder(&folder).await.unwrap();
        fixture.service.create_folder(&folder).await.unwrap();

        let file = folder.join("c.txt");
        fixture.service.write_file(&file, "hello").await.unwrap();

        let stats = fixture.service.stat(&file).await.unwrap();
        assert!(stats.is_file);
        assert_eq!(stats.size, 5);

        let err = fixture
            .service
            .stat(fixture.path("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    });
}

#[test]
fn test_image_cap_is_inclusive() {
    fixture::run_with(
        TrashBehavior::Succeed,
        |settings| settings.file.image_cap_bytes = 64,
        |fixture| async move {
            let at_cap = fixture.write("at_cap.png", vec![1u8; 64]);
            let over_cap = fixture.write("over_cap.png", vec![1u8; 65]);

            match fixture.service.read_file(&at_cap).await {
                FileReadResult::Image {
                    mime_type, size, ..
                } => {
                    assert_eq!(mime_type, "image/png");
                    assert_eq!(size, 64);
                }
                other => panic!("expected image, got {other:?}"),
            }

            let result = fixture.service.read_file(&over_cap).await;
            assert_eq!(result.size(), Some(65));
            assert_eq!(result.data_url(), None);
            match result {
                FileReadResult::Error { code, .. } => assert_eq!(code, ErrorCode::ImageTooLarge),
                other => panic!("expected error, got {other:?}"),
            }
        },
    );
}

#[test]
fn test_text_over_cap_is_truncated_to_cap() {
    fixture::run_with(
        TrashBehavior::Succeed,
        |settings| settings.file.text_cap_bytes = 100,
        |fixture| async move {
            let path = fixture.write("log.txt", "z".repeat(200));

            match fixture.service.read_file(&path).await {
                FileReadResult::Text {
                    content,
                    truncated,
                    size,
                } => {
                    assert!(truncated);
                    assert_eq!(content.len(), 100);
                    assert_eq!(size, 200);
                }
                other => panic!("expected text, got {other:?}"),
            }
        },
    );
}

#[test]
fn test_svg_is_an_image() {
    fixture::run(|fixture| async move {
        let path = fixture.write("logo.SVG", "<svg/>");

        let result = fixture.service.read_file(&path).await;
        let url = result.data_url().unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"));
    });
}
