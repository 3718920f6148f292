use chrono::Duration;
use storage::repository::{ResponseSink, ResponseSource, Storage};
use storage::sqlite::SqliteRepository;
use study_core::model::{Answer, CompletionStatus, RESPONSE_COLUMNS, ResponseRecord};
use study_core::time::fixed_now;

fn record(participant: &str, statement: &str, answer: Answer, secs: i64) -> ResponseRecord {
    ResponseRecord {
        participant_id: participant.into(),
        email: "no".into(),
        statement_text: statement.into(),
        answer,
        feedback: "We do not know whether this statement is true or false".into(),
        timestamp: fixed_now() + Duration::seconds(secs),
        completion_status: CompletionStatus::Completed,
    }
}

#[tokio::test]
async fn sqlite_appends_and_reads_structured_table() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_responses?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // migrations are idempotent
    repo.migrate().await.expect("migrate twice");

    let first = record("p1", "AAPL lower on May 13", Answer::True, 0);
    let second = record("p2", "AAPL lower on May 13", Answer::False, 30)
        .with_status(CompletionStatus::Incomplete);
    repo.append_row(&first.to_row()).await.unwrap();
    repo.append_row(&second.to_row()).await.unwrap();

    let table = repo.read_table().await.expect("read table");
    assert_eq!(table.headers().len(), RESPONSE_COLUMNS.len());
    let records = table.records().expect("parse records");
    assert_eq!(records, vec![first, second]);
}

#[tokio::test]
async fn sqlite_raw_rows_start_with_column_names() {
    let storage = Storage::sqlite("sqlite:file:memdb_raw_rows?mode=memory&cache=shared")
        .await
        .expect("storage");

    let raw = storage.source.read_raw_rows().await.unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0], RESPONSE_COLUMNS.map(str::to_owned).to_vec());

    storage
        .sink
        .append_row(&record("p1", "MSFT lower on May 11", Answer::True, 0).to_row())
        .await
        .unwrap();

    let raw = storage.source.read_raw_rows().await.unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0], RESPONSE_COLUMNS.map(str::to_owned).to_vec());
    assert_eq!(raw[1][3], "true");
    assert_eq!(raw[1][5], "2023-11-14 22:13:20");
}
