//! Wire-name and serde roundtrip tests for `roster-core` types.
//!
//! Each `#[case]` is isolated; no shared state.

use chrono::Utc;
use roster_core::types::{
    Decision, ErrorCode, Job, JobId, JobStatus, JobSummary, OrgUnitType, RecordAction,
    RecordStatus, Trigger,
};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Wire names: Display, FromStr and serde agree
// ---------------------------------------------------------------------------

#[rstest]
#[case(JobStatus::Running, "running")]
#[case(JobStatus::Success, "success")]
#[case(JobStatus::Partial, "partial")]
#[case(JobStatus::Error, "error")]
fn job_status_wire_name(#[case] status: JobStatus, #[case] wire: &str) {
    assert_eq!(status.to_string(), wire);
    assert_eq!(wire.parse::<JobStatus>().expect("parse"), status);
    assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{wire}\""));
}

#[rstest]
#[case(RecordAction::Create, "create")]
#[case(RecordAction::Update, "update")]
#[case(RecordAction::Archive, "archive")]
fn record_action_wire_name(#[case] action: RecordAction, #[case] wire: &str) {
    assert_eq!(action.as_str(), wire);
    assert_eq!(wire.parse::<RecordAction>().expect("parse"), action);
}

#[rstest]
#[case(RecordStatus::Applied, "applied")]
#[case(RecordStatus::Error, "error")]
#[case(RecordStatus::Orphaned, "orphaned")]
fn record_status_wire_name(#[case] status: RecordStatus, #[case] wire: &str) {
    assert_eq!(status.as_str(), wire);
    assert_eq!(wire.parse::<RecordStatus>().expect("parse"), status);
}

#[rstest]
#[case(OrgUnitType::Group, "group")]
#[case(OrgUnitType::Domain, "domain")]
#[case(OrgUnitType::LegalEntity, "legal_entity")]
#[case(OrgUnitType::Department, "department")]
#[case(OrgUnitType::Direction, "direction")]
fn org_unit_type_yaml_matches_wire_name(#[case] unit_type: OrgUnitType, #[case] wire: &str) {
    let yaml = serde_yaml::to_string(&unit_type).expect("serialize");
    assert_eq!(yaml.trim(), wire);
    let back: OrgUnitType = serde_yaml::from_str(wire).expect("deserialize");
    assert_eq!(back, unit_type);
}

#[rstest]
#[case(ErrorCode::OrgUnitMissing)]
#[case(ErrorCode::OrgUnitNotFound)]
#[case(ErrorCode::EmailMissing)]
#[case(ErrorCode::DuplicateInBatch)]
#[case(ErrorCode::UpsertFailed)]
fn error_code_display_parses_back(#[case] code: ErrorCode) {
    assert_eq!(code.to_string().parse::<ErrorCode>().expect("parse"), code);
}

#[test]
fn decision_and_trigger_reject_unknown_values() {
    assert!("maybe".parse::<Decision>().is_err());
    assert!("cron".parse::<Trigger>().is_err());
}

// ---------------------------------------------------------------------------
// Job payload as returned to callers
// ---------------------------------------------------------------------------

#[test]
fn job_json_carries_summary_counters() {
    let job = Job {
        id: JobId(3),
        trigger: Trigger::Manual,
        status: JobStatus::Partial,
        started_at: Utc::now(),
        finished_at: Some(Utc::now()),
        summary: Some(JobSummary {
            created: 1,
            errors: 1,
            ..Default::default()
        }),
    };
    let json = serde_json::to_value(&job).expect("serialize");
    assert_eq!(json["id"], 3);
    assert_eq!(json["status"], "partial");
    assert_eq!(json["summary"]["created"], 1);
    assert_eq!(json["summary"]["errors"], 1);

    let back: Job = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, job);
}
