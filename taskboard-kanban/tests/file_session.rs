//! File-backed sessions, configuration and recurrence end to end

use chrono::{NaiveDate, TimeZone, Utc};
use taskboard_kanban::{
    BoardConfig, BoardError, BoardSession, NewTask, RecurrenceKind, RecurrencePattern,
    RuleTemplate, SortMode, TaskUpdate,
};
use tempfile::TempDir;

#[test_log::test(tokio::test)]
async fn test_file_session_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    let config = BoardConfig::at(temp.path());

    let task_id = {
        let mut session = BoardSession::open(&config).await.unwrap();
        let task = session
            .add_task(NewTask::new("durable", "todo"))
            .await
            .unwrap();
        session
            .tasks_mut()
            .update(
                &task.id,
                TaskUpdate::new().with_due_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            )
            .await
            .unwrap();
        task.id
    };

    assert!(config.blob_dir().is_dir());
    assert!(config.scalar_dir().is_dir());

    let session = BoardSession::open(&config).await.unwrap();
    let task = session.tasks().get(&task_id).unwrap();
    assert_eq!(task.title, "durable");
    assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 6, 1));
}

#[tokio::test]
async fn test_unopenable_data_dir_is_storage_unavailable() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file in the way").unwrap();

    let err = BoardSession::open(&BoardConfig::at(&blocker))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::StorageUnavailable(_)));
}

#[tokio::test]
async fn test_quota_failure_keeps_memory_and_save_retries() {
    let mut config = BoardConfig::in_memory();
    config.max_scalar_bytes = Some(2048);
    let mut session = BoardSession::open(&config).await.unwrap();

    let err = session
        .add_task(NewTask::new("huge", "todo").with_description("x".repeat(4096)))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::StorageWriteFailed { .. }));
    assert!(err.is_retryable());

    let tasks = session.tasks_mut();
    assert_eq!(tasks.len(), 1);
    assert!(tasks.has_unsaved_changes());
    assert!(tasks.save().await.is_err());

    let id = tasks.tasks()[0].id.clone();
    tasks
        .update(&id, TaskUpdate::new().with_description("short"))
        .await
        .unwrap();
    assert!(!tasks.has_unsaved_changes());
}

#[tokio::test]
async fn test_configured_sort_applies_to_view() {
    let mut config = BoardConfig::in_memory();
    config.default_sort = SortMode::TitleAsc;
    let mut session = BoardSession::open(&config).await.unwrap();
    for title in ["cherry", "apple", "banana"] {
        session.add_task(NewTask::new(title, "todo")).await.unwrap();
    }
    let titles: Vec<&str> = session
        .tasks()
        .get_filtered()
        .iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(titles, vec!["apple", "banana", "cherry"]);
}

#[tokio::test]
async fn test_recurring_rules_create_tasks_on_current_board() {
    let temp = TempDir::new().unwrap();
    let config = BoardConfig::at(temp.path());
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

    {
        let mut session = BoardSession::open(&config).await.unwrap();
        let recurring = session.recurring_mut();
        let rule = recurring
            .create_rule(
                RuleTemplate::new("Weekly review", "todo"),
                RecurrencePattern::new(RecurrenceKind::Weekly),
                created_at,
            )
            .unwrap();
        recurring.add(rule).await.unwrap();
    }

    let mut session = BoardSession::open(&config).await.unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
    let created = session.run_recurring(now).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].due_date, NaiveDate::from_ymd_opt(2024, 1, 8));

    // Same instant again: already advanced to the next week
    assert!(session.run_recurring(now).await.unwrap().is_empty());
    assert_eq!(session.tasks().len(), 1);

    let rule = session.recurring().rules()[0].clone();
    assert_eq!(
        rule.next_due,
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_out_of_range_retention_is_rejected_at_open() {
    for retention_days in [-1, 0, i64::MAX] {
        let config = BoardConfig {
            retention_days,
            ..BoardConfig::in_memory()
        };
        let err = BoardSession::open(&config).await.unwrap_err();
        assert!(
            matches!(err, BoardError::InvalidValue { .. }),
            "retention_days = {retention_days}"
        );
    }
}
