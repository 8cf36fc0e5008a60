//! Per-board scoping: switching, deleting and the storage each board owns

use std::sync::Arc;
use taskboard_kanban::{
    Attachment, AttachmentKind, BoardError, BoardSession, DropPosition, NewTask,
};
use taskboard_store::{BlobStore, MemoryBlobStore, MemoryScalarStore};

#[test_log::test(tokio::test)]
async fn test_switching_boards_never_mixes_tasks() {
    let mut session = BoardSession::in_memory().await.unwrap();
    let first = session.current_board().unwrap().id.clone();
    session
        .add_task(NewTask::new("first board task", "todo"))
        .await
        .unwrap();

    let second = session.create_board("Second", "", None).await.unwrap();
    session.switch_board(&second).await.unwrap();
    assert!(session.tasks().is_empty());
    session
        .add_task(NewTask::new("second board task", "todo"))
        .await
        .unwrap();

    session.switch_board(&first).await.unwrap();
    let titles: Vec<&str> = session
        .tasks()
        .tasks()
        .iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(titles, vec!["first board task"]);

    session.switch_board(&second).await.unwrap();
    assert_eq!(session.tasks().len(), 1);
    assert_eq!(session.tasks().tasks()[0].title, "second board task");
}

#[tokio::test]
async fn test_current_board_survives_reopen() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let scalars = Arc::new(MemoryScalarStore::new());

    let second = {
        let mut session = BoardSession::with_stores(blobs.clone(), scalars.clone())
            .await
            .unwrap();
        let second = session.create_board("Second", "", None).await.unwrap();
        session.switch_board(&second).await.unwrap();
        session
            .add_task(NewTask::new("persisted", "inprogress"))
            .await
            .unwrap();
        second
    };

    let session = BoardSession::with_stores(blobs, scalars).await.unwrap();
    assert_eq!(session.boards().len(), 2);
    assert_eq!(session.current_board().unwrap().id, second);
    assert_eq!(session.tasks().tasks()[0].title, "persisted");
}

#[tokio::test]
async fn test_deleting_last_board_is_rejected() {
    let mut session = BoardSession::in_memory().await.unwrap();
    session
        .add_task(NewTask::new("keep me", "todo"))
        .await
        .unwrap();
    let only = session.current_board().unwrap().id.clone();

    let err = session.delete_board(&only).await.unwrap_err();
    assert!(matches!(err, BoardError::InvariantViolation { .. }));
    assert_eq!(session.boards().len(), 1);
    assert_eq!(session.current_board().unwrap().id, only);
    assert_eq!(session.tasks().len(), 1);
}

#[tokio::test]
async fn test_deleting_board_purges_its_attachments() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let scalars = Arc::new(MemoryScalarStore::new());
    let mut session = BoardSession::with_stores(blobs.clone(), scalars)
        .await
        .unwrap();
    let first = session.current_board().unwrap().id.clone();

    let doomed = session.create_board("Doomed", "", None).await.unwrap();
    session.switch_board(&doomed).await.unwrap();
    let task = session
        .add_task(NewTask::new("with file", "todo").with_attachments(vec![Attachment::new(
            "notes.txt",
            AttachmentKind::File,
            b"hello".to_vec(),
        )]))
        .await
        .unwrap();
    assert!(blobs.get(task.id.as_str()).await.unwrap().is_some());

    session.delete_board(&doomed).await.unwrap();
    assert!(blobs.get(task.id.as_str()).await.unwrap().is_none());
    assert_eq!(session.current_board().unwrap().id, first);
    assert!(session.tasks().is_empty());
}

#[tokio::test]
async fn test_attachments_round_trip_through_session() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let scalars = Arc::new(MemoryScalarStore::new());
    let attachments = vec![
        Attachment::new("a.png", AttachmentKind::Image, vec![0x89, 0x50, 0x4e, 0x47]),
        Attachment::new("b.pdf", AttachmentKind::File, vec![0x25, 0x50, 0x44, 0x46]),
    ];

    {
        let mut session = BoardSession::with_stores(blobs.clone(), scalars.clone())
            .await
            .unwrap();
        session
            .add_task(NewTask::new("files", "todo").with_attachments(attachments.clone()))
            .await
            .unwrap();
    }

    let session = BoardSession::with_stores(blobs, scalars).await.unwrap();
    assert_eq!(session.tasks().tasks()[0].attachments, attachments);
}

#[tokio::test]
async fn test_priorities_stay_contiguous_across_operations() {
    let mut session = BoardSession::in_memory().await.unwrap();
    let mut ids = Vec::new();
    for title in ["a", "b", "c", "d", "e"] {
        ids.push(
            session
                .add_task(NewTask::new(title, "todo"))
                .await
                .unwrap()
                .id,
        );
    }

    let tasks = session.tasks_mut();
    tasks
        .reorder(&ids[4], &ids[0], DropPosition::Before)
        .await
        .unwrap();
    tasks
        .reorder(&ids[1], &ids[3], DropPosition::After)
        .await
        .unwrap();
    tasks.move_to(&ids[2], "completed").await.unwrap();
    tasks.delete(&ids[0]).await.unwrap();

    for status in ["todo", "completed"] {
        let priorities: Vec<u32> = tasks
            .tasks_by_status(&status.into())
            .iter()
            .map(|t| t.priority)
            .collect();
        let expected: Vec<u32> = (0..priorities.len() as u32).collect();
        assert_eq!(priorities, expected, "column {status}");
    }
    let order: Vec<&str> = tasks
        .tasks_by_status(&"todo".into())
        .iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(order, vec!["e", "d", "b"]);
}
