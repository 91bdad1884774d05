use exam_core::model::{
    AnswerMap, CandidateId, ExamState, ExamStateError, ExamStateKey, QuestionId, SchemeId,
};
use storage::repository::{ExamStateRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

fn key(candidate: &str) -> ExamStateKey {
    ExamStateKey::for_exam(&CandidateId::new(candidate), &SchemeId::new("ADS"))
}

fn state(answer: &str, time_left: u32) -> ExamState {
    let mut answers = AnswerMap::new();
    answers.set(QuestionId::new("Q1"), answer);
    ExamState::new(answers, time_left)
}

#[tokio::test]
async fn sqlite_upserts_and_deletes_exam_state() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get_state(&key("c1")).await.unwrap(), None);

    repo.set_state(&key("c1"), &state("draft", 2100)).await.unwrap();
    repo.set_state(&key("c1"), &state("final", 2099)).await.unwrap();
    repo.set_state(&key("c2"), &state("other", 10)).await.unwrap();

    assert_eq!(
        repo.get_state(&key("c1")).await.unwrap(),
        Some(state("final", 2099))
    );

    repo.delete_state(&key("c1")).await.unwrap();
    assert_eq!(repo.get_state(&key("c1")).await.unwrap(), None);
    assert_eq!(
        repo.get_state(&key("c2")).await.unwrap(),
        Some(state("other", 10))
    );
}

#[tokio::test]
async fn sqlite_state_survives_a_new_connection() {
    let url = "sqlite:file:memdb_reopen?mode=memory&cache=shared";
    let first = Storage::sqlite(url).await.expect("open");
    first
        .exam_states
        .set_state(&key("c1"), &state("x", 600))
        .await
        .unwrap();

    // Migrations are idempotent on an existing schema.
    let second = Storage::sqlite(url).await.expect("reopen");
    assert_eq!(
        second.exam_states.get_state(&key("c1")).await.unwrap(),
        Some(state("x", 600))
    );
}

#[tokio::test]
async fn sqlite_reports_unknown_payloads_as_corrupt() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_corrupt?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    sqlx::query("INSERT INTO exam_states (key, payload, updated_at) VALUES (?1, ?2, ?3)")
        .bind(key("c1").as_str())
        .bind(r#"{"version":9,"answers":{},"timeLeftSeconds":1}"#)
        .bind(chrono::Utc::now())
        .execute(repo.pool())
        .await
        .unwrap();

    let err = repo.get_state(&key("c1")).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Corrupt(ExamStateError::UnsupportedVersion(_))
    ));
}
