//! Data models for the application

use crate::completeness::is_complete;
use crate::workflow::Transition;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// Enums
// =============================================================================

/// Workflow-event label describing what last happened to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "permit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermitStatus {
    Submitted,
    ForwardedToSp,
    ForwardedToSdpo,
    ForwardedToOc,
    OcVerified,
    SdpoReviewed,
    SpRecommended,
    Approved,
    Rejected,
}

impl PermitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PermitStatus::Submitted => "SUBMITTED",
            PermitStatus::ForwardedToSp => "FORWARDED_TO_SP",
            PermitStatus::ForwardedToSdpo => "FORWARDED_TO_SDPO",
            PermitStatus::ForwardedToOc => "FORWARDED_TO_OC",
            PermitStatus::OcVerified => "OC_VERIFIED",
            PermitStatus::SdpoReviewed => "SDPO_REVIEWED",
            PermitStatus::SpRecommended => "SP_RECOMMENDED",
            PermitStatus::Approved => "APPROVED",
            PermitStatus::Rejected => "REJECTED",
        }
    }

    /// The only stage a record carrying this status may sit in.
    pub fn stage(self) -> WorkflowStage {
        match self {
            PermitStatus::Submitted => WorkflowStage::DcPending,
            PermitStatus::ForwardedToSp => WorkflowStage::SpPending,
            PermitStatus::ForwardedToSdpo => WorkflowStage::SdpoPending,
            PermitStatus::ForwardedToOc => WorkflowStage::OcPending,
            PermitStatus::OcVerified => WorkflowStage::SdpoReviewPending,
            PermitStatus::SdpoReviewed => WorkflowStage::SpReviewPending,
            PermitStatus::SpRecommended => WorkflowStage::DcFinalPending,
            PermitStatus::Approved | PermitStatus::Rejected => WorkflowStage::Completed,
        }
    }

    pub fn pairs_with(self, stage: WorkflowStage) -> bool {
        self.stage() == stage
    }
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which authority the application is currently waiting on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "workflow_stage", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    DcPending,
    SpPending,
    SdpoPending,
    OcPending,
    SdpoReviewPending,
    SpReviewPending,
    DcFinalPending,
    Completed,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 8] = [
        WorkflowStage::DcPending,
        WorkflowStage::SpPending,
        WorkflowStage::SdpoPending,
        WorkflowStage::OcPending,
        WorkflowStage::SdpoReviewPending,
        WorkflowStage::SpReviewPending,
        WorkflowStage::DcFinalPending,
        WorkflowStage::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::DcPending => "DC_PENDING",
            WorkflowStage::SpPending => "SP_PENDING",
            WorkflowStage::SdpoPending => "SDPO_PENDING",
            WorkflowStage::OcPending => "OC_PENDING",
            WorkflowStage::SdpoReviewPending => "SDPO_REVIEW_PENDING",
            WorkflowStage::SpReviewPending => "SP_REVIEW_PENDING",
            WorkflowStage::DcFinalPending => "DC_FINAL_PENDING",
            WorkflowStage::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == WorkflowStage::Completed
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown workflow stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for WorkflowStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        WorkflowStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Authorities that leave remarks on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    Dc,
    Sp,
    Sdpo,
    Oc,
}

// =============================================================================
// Permit Application
// =============================================================================

/// One entry of an application's remark history. Entries are only appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemarkEntry {
    pub authority: Authority,
    pub transition: Transition,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PermitApplication {
    pub id: Uuid,
    pub user_id: i64,
    pub event_title: String,
    pub purpose: String,
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
    pub permit_type: String,
    pub location_tag: String,
    pub document_path: Option<String>,
    pub document_file_name: Option<String>,
    pub status: PermitStatus,
    pub current_stage: WorkflowStage,
    pub dc_remarks: Option<String>,
    pub sp_remarks: Option<String>,
    pub sdpo_remarks: Option<String>,
    pub oc_report: Option<String>,
    pub remark_log: Json<Vec<RemarkEntry>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermitApplication {
    /// Build a freshly submitted application awaiting the Deputy Commissioner.
    pub fn submitted(input: CreatePermitApplication, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            event_title: input.event_title,
            purpose: input.purpose,
            start_date_time: input.start_date_time,
            end_date_time: input.end_date_time,
            permit_type: input.permit_type,
            location_tag: input.location_tag,
            document_path: None,
            document_file_name: None,
            status: PermitStatus::Submitted,
            current_stage: WorkflowStage::DcPending,
            dc_remarks: None,
            sp_remarks: None,
            sdpo_remarks: None,
            oc_report: None,
            remark_log: Json(Vec::new()),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        is_complete(
            &self.event_title,
            self.start_date_time,
            self.end_date_time,
            self.document_file_name.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermitApplication {
    pub user_id: i64,
    #[validate(length(max = 255))]
    pub event_title: String,
    #[validate(length(max = 2000))]
    pub purpose: String,
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
    #[validate(length(max = 255))]
    pub permit_type: String,
    #[validate(length(max = 255))]
    pub location_tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermitApplication {
    #[validate(length(max = 255))]
    pub event_title: Option<String>,
    #[validate(length(max = 2000))]
    pub purpose: Option<String>,
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
    #[validate(length(max = 255))]
    pub permit_type: Option<String>,
    #[validate(length(max = 255))]
    pub location_tag: Option<String>,
    pub status: Option<PermitStatus>,
    pub expected_version: Option<i64>,
}

/// External representation of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitApplicationResponse {
    pub id: Uuid,
    pub user_id: i64,
    pub event_title: String,
    pub purpose: String,
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
    pub permit_type: String,
    pub location_tag: String,
    pub document_path: Option<String>,
    pub document_file_name: Option<String>,
    pub status: PermitStatus,
    pub current_stage: WorkflowStage,
    pub dc_remarks: Option<String>,
    pub sp_remarks: Option<String>,
    pub sdpo_remarks: Option<String>,
    pub oc_report: Option<String>,
    pub remark_log: Vec<RemarkEntry>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub complete: bool,
}

impl From<PermitApplication> for PermitApplicationResponse {
    fn from(app: PermitApplication) -> Self {
        let complete = app.is_complete();
        Self {
            id: app.id,
            user_id: app.user_id,
            event_title: app.event_title,
            purpose: app.purpose,
            start_date_time: app.start_date_time,
            end_date_time: app.end_date_time,
            permit_type: app.permit_type,
            location_tag: app.location_tag,
            document_path: app.document_path,
            document_file_name: app.document_file_name,
            status: app.status,
            current_stage: app.current_stage,
            dc_remarks: app.dc_remarks,
            sp_remarks: app.sp_remarks,
            sdpo_remarks: app.sdpo_remarks,
            oc_report: app.oc_report,
            remark_log: app.remark_log.0,
            version: app.version,
            created_at: app.created_at,
            updated_at: app.updated_at,
            complete,
        }
    }
}

// `complete` is derived and therefore dropped on the way back.
impl From<PermitApplicationResponse> for PermitApplication {
    fn from(resp: PermitApplicationResponse) -> Self {
        Self {
            id: resp.id,
            user_id: resp.user_id,
            event_title: resp.event_title,
            purpose: resp.purpose,
            start_date_time: resp.start_date_time,
            end_date_time: resp.end_date_time,
            permit_type: resp.permit_type,
            location_tag: resp.location_tag,
            document_path: resp.document_path,
            document_file_name: resp.document_file_name,
            status: resp.status,
            current_stage: resp.current_stage,
            dc_remarks: resp.dc_remarks,
            sp_remarks: resp.sp_remarks,
            sdpo_remarks: resp.sdpo_remarks,
            oc_report: resp.oc_report,
            remark_log: Json(resp.remark_log),
            version: resp.version,
            created_at: resp.created_at,
            updated_at: resp.updated_at,
        }
    }
}

// =============================================================================
// Authority Actions
// =============================================================================

/// Body of every authority transition request. The OC report endpoint reads
/// `report`, all others read `remarks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityActionRequest {
    pub remarks: Option<String>,
    pub report: Option<String>,
    pub expected_version: Option<i64>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 1)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp")
    }

    fn fixture() -> PermitApplication {
        let mut app = PermitApplication::submitted(
            CreatePermitApplication {
                user_id: 7,
                event_title: "Diwali Mela".to_string(),
                purpose: "Community festival".to_string(),
                start_date_time: Some(at(10)),
                end_date_time: Some(at(18)),
                permit_type: "PUBLIC_EVENT".to_string(),
                location_tag: "Imphal West".to_string(),
            },
            Utc::now(),
        );
        app.document_path = Some("uploads/abc_perm.pdf".to_string());
        app.document_file_name = Some("perm.pdf".to_string());
        app.dc_remarks = Some("Looks fine".to_string());
        app
    }

    #[test]
    fn test_status_stage_pairs() {
        assert!(PermitStatus::Submitted.pairs_with(WorkflowStage::DcPending));
        assert!(PermitStatus::Approved.pairs_with(WorkflowStage::Completed));
        assert!(PermitStatus::Rejected.pairs_with(WorkflowStage::Completed));
        assert!(!PermitStatus::Approved.pairs_with(WorkflowStage::DcFinalPending));
        assert!(!PermitStatus::OcVerified.pairs_with(WorkflowStage::OcPending));
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!(
            "SDPO_PENDING".parse::<WorkflowStage>(),
            Ok(WorkflowStage::SdpoPending)
        );
        assert_eq!(
            "sdpo_review_pending".parse::<WorkflowStage>(),
            Ok(WorkflowStage::SdpoReviewPending)
        );
        assert!("ARCHIVED".parse::<WorkflowStage>().is_err());
    }

    #[test]
    fn test_wire_names_match_stage_names() {
        for stage in WorkflowStage::ALL {
            let json = serde_json::to_string(&stage).expect("serialize");
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
        let json = serde_json::to_string(&PermitStatus::ForwardedToSdpo).expect("serialize");
        assert_eq!(json, "\"FORWARDED_TO_SDPO\"");
    }

    #[test]
    fn test_response_round_trip_preserves_fields() {
        let app = fixture();
        let response = PermitApplicationResponse::from(app.clone());
        assert!(response.complete);

        let back = PermitApplication::from(response);
        assert_eq!(back, app);
    }

    #[test]
    fn test_complete_is_recomputed_not_round_tripped() {
        let app = fixture();
        let mut response = PermitApplicationResponse::from(app);
        response.document_file_name = None;
        // a stale flag on the way in is ignored
        response.complete = true;

        let back = PermitApplication::from(response);
        assert!(!PermitApplicationResponse::from(back).complete);
    }

    #[test]
    fn test_response_uses_camel_case() {
        let value = serde_json::to_value(PermitApplicationResponse::from(fixture()))
            .expect("serialize");
        assert_eq!(value["eventTitle"], "Diwali Mela");
        assert_eq!(value["currentStage"], "DC_PENDING");
        assert_eq!(value["documentFileName"], "perm.pdf");
        assert_eq!(value["complete"], true);
    }
}
