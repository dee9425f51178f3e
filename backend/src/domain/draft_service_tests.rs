//! Tests for draft reconciliation.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mockable::MockClock;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ports::MockDraftRepository;
use crate::domain::{DraftId, DraftPayload, ErrorCode, SessionToken, UserId};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .single()
        .expect("valid instant")
}

fn clock() -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now());
    Arc::new(clock)
}

fn owner(token: &str, user: Option<i64>) -> DraftOwner {
    DraftOwner::new(
        SessionToken::new(token).expect("token"),
        user.map(|raw| UserId::new(raw).expect("user id")),
    )
}

fn report(raw: i64) -> ReportId {
    ReportId::new(raw).expect("report id")
}

fn stored(id: i64, owner: DraftOwner, report_id: Option<ReportId>) -> Draft {
    let created = now() - chrono::Duration::minutes(10);
    NewDraft::create(
        DraftWrite {
            owner,
            payload: DraftPayload::try_from(json!({ "notes": "hello", "site": "North" }))
                .expect("object payload"),
            current_tab: Some("general".to_owned()),
        },
        report_id,
        created,
    )
    .expect("valid draft")
    .into_draft(DraftId::new(id))
}

#[fixture]
fn request() -> SaveDraftRequest {
    SaveDraftRequest {
        report_id: None,
        owner: owner("abc", Some(7)),
        current_tab: None,
        payload: DraftPayload::try_from(json!({ "notes": "hello world" }))
            .expect("object payload"),
    }
}

fn service(repo: MockDraftRepository) -> DraftService<MockDraftRepository> {
    DraftService::new(Arc::new(repo), clock())
}

#[rstest]
#[tokio::test]
async fn first_save_inserts_a_floating_draft(request: SaveDraftRequest) {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached().times(0);
    repo.expect_find_floating().times(1).returning(|_| Ok(None));
    repo.expect_insert()
        .withf(|draft, id| draft.report_id().is_none() && id.is_none())
        .times(1)
        .returning(|draft, _| Ok(draft.clone().into_draft(DraftId::new(11))));

    let response = service(repo).save(request).await.expect("save succeeds");

    assert_eq!(response.outcome, SaveOutcome::Created);
    assert_eq!(response.draft_id, DraftId::new(11));
    assert_eq!(response.revision, 1);
    assert_eq!(response.saved_at, now());
    assert_eq!(response.data_size, r#"{"notes":"hello world"}"#.len());
}

#[rstest]
#[tokio::test]
async fn second_save_updates_the_floating_draft(request: SaveDraftRequest) {
    let existing = stored(11, owner("abc", Some(7)), None);
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_insert().times(0);
    repo.expect_update()
        .withf(|draft| {
            draft.revision() == 2
                && draft.payload().get("notes") == Some(&json!("hello world"))
                && draft.payload().get("site") == Some(&json!("North"))
        })
        .times(1)
        .returning(|_| Ok(()));

    let response = service(repo).save(request).await.expect("save succeeds");

    assert_eq!(response.outcome, SaveOutcome::Updated);
    assert_eq!(response.draft_id, DraftId::new(11));
    assert_eq!(response.revision, 2);
}

#[rstest]
#[tokio::test]
async fn attached_draft_is_found_by_report_alone(mut request: SaveDraftRequest) {
    let existing = stored(4, owner("someone-else", Some(99)), Some(report(12)));
    request.report_id = Some(report(12));
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached()
        .withf(|report_id| *report_id == report(12))
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_find_floating().times(0);
    repo.expect_update()
        .withf(|draft| draft.owner().session_token().as_ref() == "someone-else")
        .times(1)
        .returning(|_| Ok(()));

    let response = service(repo).save(request).await.expect("save succeeds");

    assert_eq!(response.outcome, SaveOutcome::Updated);
    assert_eq!(response.draft_id, DraftId::new(4));
    assert_eq!(response.report_id, Some(report(12)));
}

#[rstest]
#[tokio::test]
async fn floating_draft_is_attached_when_report_has_none(mut request: SaveDraftRequest) {
    let existing = stored(11, owner("abc", Some(7)), None);
    request.report_id = Some(report(12));
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached().times(1).returning(|_| Ok(None));
    repo.expect_find_floating()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_update()
        .withf(|draft| draft.report_id() == Some(report(12)) && draft.revision() == 2)
        .times(1)
        .returning(|_| Ok(()));

    let response = service(repo).save(request).await.expect("save succeeds");

    assert_eq!(response.outcome, SaveOutcome::Attached);
    assert_eq!(response.report_id, Some(report(12)));
}

#[rstest]
#[tokio::test]
async fn new_attached_draft_is_inserted_when_nothing_matches(mut request: SaveDraftRequest) {
    request.report_id = Some(report(12));
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached().times(1).returning(|_| Ok(None));
    repo.expect_find_floating().times(1).returning(|_| Ok(None));
    repo.expect_insert()
        .withf(|draft, _| draft.report_id() == Some(report(12)))
        .times(1)
        .returning(|draft, _| Ok(draft.clone().into_draft(DraftId::new(20))));

    let response = service(repo).save(request).await.expect("save succeeds");

    assert_eq!(response.outcome, SaveOutcome::Created);
    assert_eq!(response.report_id, Some(report(12)));
}

#[rstest]
#[tokio::test]
async fn anonymous_floating_draft_is_claimed_on_update(request: SaveDraftRequest) {
    let existing = stored(11, owner("abc", None), None);
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_update()
        .withf(|draft| draft.owner().user_id() == UserId::new(7).ok())
        .times(1)
        .returning(|_| Ok(()));

    service(repo).save(request).await.expect("save succeeds");
}

#[rstest]
#[tokio::test]
async fn zero_key_collision_retries_once_with_next_free_id(request: SaveDraftRequest) {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating().returning(|_| Ok(None));
    repo.expect_insert()
        .withf(|_, id| id.is_none())
        .times(1)
        .returning(|_, _| Err(DraftRepositoryError::zero_key_collision()));
    repo.expect_next_free_id()
        .times(1)
        .returning(|| Ok(DraftId::new(42)));
    repo.expect_insert()
        .withf(|_, id| *id == Some(DraftId::new(42)))
        .times(1)
        .returning(|draft, id| {
            Ok(draft
                .clone()
                .into_draft(id.unwrap_or(DraftId::new(0))))
        });

    let response = service(repo).save(request).await.expect("recovered save");

    assert_eq!(response.draft_id, DraftId::new(42));
    assert_eq!(response.revision, 1);
}

#[rstest]
#[tokio::test]
async fn second_zero_key_collision_is_a_storage_error(request: SaveDraftRequest) {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating().returning(|_| Ok(None));
    repo.expect_next_free_id()
        .times(1)
        .returning(|| Ok(DraftId::new(42)));
    repo.expect_insert()
        .times(2)
        .returning(|_, _| Err(DraftRepositoryError::zero_key_collision()));

    let err = service(repo).save(request).await.expect_err("no second retry");

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert!(err.message().contains("primary key 0"));
}

#[rstest]
#[tokio::test]
async fn zero_key_recovery_can_be_switched_off(request: SaveDraftRequest) {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating().returning(|_| Ok(None));
    repo.expect_next_free_id().times(0);
    repo.expect_insert()
        .times(1)
        .returning(|_, _| Err(DraftRepositoryError::zero_key_collision()));

    let service = service(repo).with_config(DraftServiceConfig {
        zero_key_recovery: false,
    });
    let err = service.save(request).await.expect_err("recovery disabled");

    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn losing_a_floating_insert_race_updates_the_winner(request: SaveDraftRequest) {
    let winner = stored(30, owner("abc", Some(7)), None);
    let mut lookups = 0;
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating().times(2).returning(move |_| {
        lookups += 1;
        if lookups == 1 {
            Ok(None)
        } else {
            Ok(Some(winner.clone()))
        }
    });
    repo.expect_insert()
        .times(1)
        .returning(|_, _| Err(DraftRepositoryError::duplicate_floating()));
    repo.expect_update()
        .withf(|draft| draft.id() == DraftId::new(30) && draft.revision() == 2)
        .times(1)
        .returning(|_| Ok(()));

    let response = service(repo).save(request).await.expect("race resolved");

    assert_eq!(response.outcome, SaveOutcome::Updated);
    assert_eq!(response.draft_id, DraftId::new(30));
}

#[rstest]
#[tokio::test]
async fn claim_into_an_occupied_slot_updates_the_callers_own_draft(request: SaveDraftRequest) {
    let anonymous = stored(40, owner("abc", None), None);
    let own = stored(41, owner("abc", Some(7)), None);
    let mut lookups = 0;
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating().times(2).returning(move |_| {
        lookups += 1;
        if lookups == 1 {
            Ok(Some(anonymous.clone()))
        } else {
            Ok(Some(own.clone()))
        }
    });
    repo.expect_update()
        .withf(|draft| draft.id() == DraftId::new(40))
        .times(1)
        .returning(|_| Err(DraftRepositoryError::duplicate_floating()));
    repo.expect_update()
        .withf(|draft| draft.id() == DraftId::new(41) && draft.revision() == 2)
        .times(1)
        .returning(|_| Ok(()));
    repo.expect_insert().times(0);

    let response = service(repo).save(request).await.expect("collision resolved");

    assert_eq!(response.draft_id, DraftId::new(41));
    assert_eq!(response.revision, 2);
}

#[rstest]
#[tokio::test]
async fn connection_failures_map_to_service_unavailable(request: SaveDraftRequest) {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating()
        .returning(|_| Err(DraftRepositoryError::connection("pool exhausted")));

    let err = service(repo).save(request).await.expect_err("storage down");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(err.message().contains("pool exhausted"));
}

#[rstest]
#[tokio::test]
async fn overlong_tab_is_an_invalid_request(mut request: SaveDraftRequest) {
    request.current_tab = Some("t".repeat(200));
    let mut repo = MockDraftRepository::new();
    repo.expect_find_floating().returning(|_| Ok(None));
    repo.expect_insert().times(0);

    let err = service(repo).save(request).await.expect_err("tab rejected");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn load_never_creates() {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached().times(1).returning(|_| Ok(None));
    repo.expect_find_floating().times(1).returning(|_| Ok(None));
    repo.expect_insert().times(0);
    repo.expect_update().times(0);

    let response = service(repo)
        .load(LoadDraftRequest {
            report_id: Some(report(5)),
            owner: owner("abc", None),
        })
        .await
        .expect("load succeeds");

    assert!(response.draft.is_none());
}

#[rstest]
#[tokio::test]
async fn load_prefers_the_attached_draft() {
    let attached = stored(4, owner("other", None), Some(report(5)));
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached()
        .times(1)
        .return_once(move |_| Ok(Some(attached)));
    repo.expect_find_floating().times(0);

    let response = service(repo)
        .load(LoadDraftRequest {
            report_id: Some(report(5)),
            owner: owner("abc", Some(7)),
        })
        .await
        .expect("load succeeds");

    assert_eq!(response.draft.map(|draft| draft.id()), Some(DraftId::new(4)));
}
