//! Tests for measurement updates.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mockable::{Clock, MockClock};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    DisabledStringNotesProjection, MockDraftRepository, MockStringNotesProjection,
    StringNotesProjectionError,
};
use crate::domain::{
    Draft, DraftId, FieldUpdate, MEASUREMENTS_FIELD, MeasurementField, MeasurementKey, NewDraft,
    SessionToken, UserId,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0)
        .single()
        .expect("valid instant")
}

fn clock() -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now());
    Arc::new(clock)
}

fn owner() -> DraftOwner {
    DraftOwner::new(
        SessionToken::new("abc").expect("token"),
        Some(UserId::new(7).expect("user id")),
    )
}

fn report() -> ReportId {
    ReportId::new(12).expect("report id")
}

fn attached_draft() -> Draft {
    NewDraft::create(
        DraftWrite {
            owner: owner(),
            payload: DraftPayload::try_from(json!({
                "site_name": "Plant 4",
                "mppt_data": [
                    { "inverter_index": 0, "mppt": 1, "string_num": 1, "voc": "801" },
                    { "inverter_index": 0, "mppt": 1, "string_num": 2, "voc": "802" }
                ]
            }))
            .expect("object payload"),
            current_tab: Some("strings".to_owned()),
        },
        Some(report()),
        now(),
    )
    .expect("valid draft")
    .into_draft(DraftId::new(3))
}

fn service(
    repo: MockDraftRepository,
    projection: Arc<dyn StringNotesProjection>,
) -> MeasurementService<MockDraftRepository> {
    MeasurementService::new(DraftService::new(Arc::new(repo), clock()), projection)
}

fn field_request(key: MeasurementKey, value: &str) -> UpdateMeasurementFieldRequest {
    UpdateMeasurementFieldRequest {
        report_id: report(),
        owner: owner(),
        key,
        field: MeasurementField::Voc,
        value: value.to_owned(),
    }
}

fn measurements(draft: &Draft) -> Value {
    draft.payload().get(MEASUREMENTS_FIELD).cloned().unwrap_or(Value::Null)
}

#[rstest]
#[tokio::test]
async fn field_update_touches_one_entry_and_mirrors() {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached()
        .times(2)
        .returning(|_| Ok(Some(attached_draft())));
    repo.expect_update()
        .withf(|draft| {
            draft.revision() == 2
                && draft.payload().get("site_name") == Some(&json!("Plant 4"))
                && measurements(draft)
                    == json!([
                        { "inverter_index": 0, "mppt": 1, "string_num": 1, "voc": "801" },
                        { "inverter_index": 0, "mppt": 1, "string_num": 2, "voc": "799.5" }
                    ])
        })
        .times(1)
        .returning(|_| Ok(()));
    let mut projection = MockStringNotesProjection::new();
    projection
        .expect_mirror()
        .withf(|report_id, key, field, value| {
            *report_id == report()
                && *key == MeasurementKey::new(0, 1, 2)
                && *field == MeasurementField::Voc
                && value == "799.5"
        })
        .times(1)
        .returning(|_, _, _, _| Ok(1));

    let response = service(repo, Arc::new(projection))
        .update_field(field_request(MeasurementKey::new(0, 1, 2), "799.5"))
        .await
        .expect("update succeeds");

    assert_eq!(response.update, FieldUpdate::Updated);
    assert_eq!(response.draft_id, DraftId::new(3));
    assert_eq!(response.revision, 2);
    assert_eq!(response.value, "799.5");
}

#[rstest]
#[tokio::test]
async fn mirror_failures_do_not_fail_the_update() {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached()
        .returning(|_| Ok(Some(attached_draft())));
    repo.expect_update().times(1).returning(|_| Ok(()));
    let mut projection = MockStringNotesProjection::new();
    projection
        .expect_mirror()
        .times(1)
        .returning(|_, _, _, _| Err(StringNotesProjectionError::query("deadlock")));

    let response = service(repo, Arc::new(projection))
        .update_field(field_request(MeasurementKey::new(0, 1, 1), "640"))
        .await
        .expect("projection errors are swallowed");

    assert_eq!(response.update, FieldUpdate::Updated);
}

#[rstest]
#[tokio::test]
async fn missing_entry_is_synthesised_in_a_new_draft() {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached().times(2).returning(|_| Ok(None));
    repo.expect_find_floating().times(2).returning(|_| Ok(None));
    repo.expect_insert()
        .withf(|draft, _| {
            draft.report_id() == Some(report())
                && matches!(
                    draft.payload().get(MEASUREMENTS_FIELD),
                    Some(Value::Array(entries)) if entries.len() == 1
                )
        })
        .times(1)
        .returning(|draft, _| Ok(draft.clone().into_draft(DraftId::new(8))));

    let response = service(repo, Arc::new(DisabledStringNotesProjection))
        .update_field(field_request(MeasurementKey::new(2, 3, 4), "712"))
        .await
        .expect("update succeeds");

    assert_eq!(response.update, FieldUpdate::Synthesized);
    assert_eq!(response.revision, 1);
}

#[rstest]
#[tokio::test]
async fn batch_replace_keeps_other_form_fields() {
    let mut repo = MockDraftRepository::new();
    repo.expect_find_attached()
        .times(2)
        .returning(|_| Ok(Some(attached_draft())));
    repo.expect_update()
        .withf(|draft| {
            draft.payload().get("site_name") == Some(&json!("Plant 4"))
                && measurements(draft)
                    == json!([{ "inverter_index": 1, "mppt": 1, "string_num": 1, "voc": "700" }])
        })
        .times(1)
        .returning(|_| Ok(()));

    let response = service(repo, Arc::new(DisabledStringNotesProjection))
        .replace_batch(ReplaceMeasurementBatchRequest {
            report_id: report(),
            owner: owner(),
            entries: vec![json!({ "inverter_index": 1, "mppt": 1, "string_num": 1, "voc": "700" })],
        })
        .await
        .expect("batch succeeds");

    assert_eq!(response.entry_count, 1);
    assert_eq!(response.revision, 2);
}
