use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use exam_core::model::{AnswerMap, CandidateId, QuestionCategory, QuestionId, SchemeId, UnitId};
use services::{EligibilityLookup, PortalClient, PortalError, QuestionBank, SubmissionSink};

fn client(server: &MockServer) -> PortalClient {
    let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    PortalClient::new(base)
}

#[tokio::test]
async fn fetches_exam_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/candidates/C-001/exam-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prerequisiteMet": true,
            "scheduled": true,
            "schedule": {
                "tanggal": "2026-10-18T09:00:00+07:00",
                "waktu": "09:00",
                "ruangan": "Lab 2"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server)
        .exam_status(&CandidateId::new("C-001"))
        .await
        .unwrap();

    assert!(record.prerequisite_met);
    assert!(!record.completed);
    let schedule = record.schedule.unwrap();
    assert_eq!(schedule.date.to_string(), "2026-10-18");
    assert_eq!(schedule.room, "Lab 2");
}

#[tokio::test]
async fn fetches_units_and_theory_questions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schemes/ADS/units"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "U1", "order": 1, "title": "Data Wrangling", "theoryDurationMinutes": 15},
            {"id": "U2", "order": 2, "title": "Modelling"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/units/U1/questions"))
        .and(query_param("category", "UJIAN_TEORI"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "Q1", "unitId": "U1", "text": "Explain normalisation"}
        ])))
        .mount(&server)
        .await;

    let client = client(&server);
    let units = client.units_for_scheme(&SchemeId::new("ADS")).await.unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[1].theory_duration_minutes, 15);

    let questions = client
        .questions_for_unit(&UnitId::new("U1"), QuestionCategory::Theory)
        .await
        .unwrap();
    assert_eq!(questions[0].id.as_str(), "Q1");
    assert_eq!(questions[0].unit_id.as_str(), "U1");
}

#[tokio::test]
async fn posts_answers_and_reads_the_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/candidates/C-001/theory-submissions"))
        .and(body_json(json!({"answers": {"Q1": "because", "Q2": ""}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"submissionId": "S-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut answers = AnswerMap::new();
    answers.set(QuestionId::new("Q1"), "because");
    answers.set(QuestionId::new("Q2"), "");

    let receipt = client(&server)
        .submit_theory(&CandidateId::new("C-001"), &answers)
        .await
        .unwrap();
    assert_eq!(receipt.submission_id, "S-9");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/candidates/C-001/theory-submissions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server)
        .submit_theory(&CandidateId::new("C-001"), &AnswerMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::HttpStatus(status) if status.as_u16() == 503));
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schemes/ADS/units"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .units_for_scheme(&SchemeId::new("ADS"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Http(_)));
}
