//! Permit approval workflow
//!
//! Applications move through a fixed chain of authorities:
//!
//! ```text
//! DC_PENDING -> SP_PENDING -> SDPO_PENDING -> OC_PENDING -> SDPO_REVIEW_PENDING
//!            -> SP_REVIEW_PENDING -> DC_FINAL_PENDING -> COMPLETED (approved | rejected)
//! ```
//!
//! Every move is one [`Transition`]. The table in [`Transition::rule`] is the
//! single source of truth for which stage a transition may start from, which
//! (status, stage) pair it produces and which remark field it writes.

pub mod access;
pub mod engine;

pub use engine::WorkflowEngine;

use crate::models::{Authority, PermitApplication, PermitStatus, RemarkEntry, WorkflowStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    ForwardToSp,
    ForwardToSdpo,
    ForwardToOc,
    SubmitOcReport,
    ForwardToSpFromSdpo,
    RecommendToDc,
    ApproveByDc,
    RejectByDc,
}

/// The remark or report column a transition overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarkField {
    DcRemarks,
    SpRemarks,
    SdpoRemarks,
    OcReport,
}

impl RemarkField {
    pub fn authority(self) -> Authority {
        match self {
            RemarkField::DcRemarks => Authority::Dc,
            RemarkField::SpRemarks => Authority::Sp,
            RemarkField::SdpoRemarks => Authority::Sdpo,
            RemarkField::OcReport => Authority::Oc,
        }
    }

    /// Longest text the column accepts.
    pub fn max_len(self) -> usize {
        match self {
            RemarkField::OcReport => 4000,
            _ => 2000,
        }
    }

    fn slot(self, app: &mut PermitApplication) -> &mut Option<String> {
        match self {
            RemarkField::DcRemarks => &mut app.dc_remarks,
            RemarkField::SpRemarks => &mut app.sp_remarks,
            RemarkField::SdpoRemarks => &mut app.sdpo_remarks,
            RemarkField::OcReport => &mut app.oc_report,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: WorkflowStage,
    pub status: PermitStatus,
    pub to: WorkflowStage,
    pub field: RemarkField,
}

impl Transition {
    #[cfg(test)]
    pub const ALL: [Transition; 8] = [
        Transition::ForwardToSp,
        Transition::ForwardToSdpo,
        Transition::ForwardToOc,
        Transition::SubmitOcReport,
        Transition::ForwardToSpFromSdpo,
        Transition::RecommendToDc,
        Transition::ApproveByDc,
        Transition::RejectByDc,
    ];

    pub const fn rule(self) -> TransitionRule {
        use PermitStatus as S;
        use RemarkField as F;
        use WorkflowStage as W;

        let (from, status, to, field) = match self {
            Transition::ForwardToSp => (W::DcPending, S::ForwardedToSp, W::SpPending, F::DcRemarks),
            Transition::ForwardToSdpo => {
                (W::SpPending, S::ForwardedToSdpo, W::SdpoPending, F::SpRemarks)
            }
            Transition::ForwardToOc => {
                (W::SdpoPending, S::ForwardedToOc, W::OcPending, F::SdpoRemarks)
            }
            Transition::SubmitOcReport => {
                (W::OcPending, S::OcVerified, W::SdpoReviewPending, F::OcReport)
            }
            Transition::ForwardToSpFromSdpo => (
                W::SdpoReviewPending,
                S::SdpoReviewed,
                W::SpReviewPending,
                F::SdpoRemarks,
            ),
            Transition::RecommendToDc => (
                W::SpReviewPending,
                S::SpRecommended,
                W::DcFinalPending,
                F::SpRemarks,
            ),
            Transition::ApproveByDc => {
                (W::DcFinalPending, S::Approved, W::Completed, F::DcRemarks)
            }
            Transition::RejectByDc => {
                (W::DcFinalPending, S::Rejected, W::Completed, F::DcRemarks)
            }
        };

        TransitionRule {
            from,
            status,
            to,
            field,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Transition::ForwardToSp => "forward_to_sp",
            Transition::ForwardToSdpo => "forward_to_sdpo",
            Transition::ForwardToOc => "forward_to_oc",
            Transition::SubmitOcReport => "submit_oc_report",
            Transition::ForwardToSpFromSdpo => "forward_to_sp_from_sdpo",
            Transition::RecommendToDc => "recommend_to_dc",
            Transition::ApproveByDc => "approve_by_dc",
            Transition::RejectByDc => "reject_by_dc",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot {transition} an application in stage {stage}")]
pub struct InvalidTransition {
    pub transition: Transition,
    pub stage: WorkflowStage,
}

/// Apply `transition` to `app` in place.
///
/// Rejects the move unless the record sits in the transition's precondition
/// stage; on rejection `app` is left untouched. Writes the new status and
/// stage, overwrites exactly one remark field and appends to the remark log.
pub fn apply(
    app: &mut PermitApplication,
    transition: Transition,
    text: String,
    now: DateTime<Utc>,
) -> Result<(), InvalidTransition> {
    let rule = transition.rule();
    if app.current_stage != rule.from {
        return Err(InvalidTransition {
            transition,
            stage: app.current_stage,
        });
    }

    app.status = rule.status;
    app.current_stage = rule.to;
    app.remark_log.0.push(RemarkEntry {
        authority: rule.field.authority(),
        transition,
        text: text.clone(),
        recorded_at: now,
    });
    *rule.field.slot(app) = Some(text);
    app.updated_at = now;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatePermitApplication;

    fn submitted() -> PermitApplication {
        PermitApplication::submitted(
            CreatePermitApplication {
                user_id: 1,
                event_title: "Diwali Mela".to_string(),
                purpose: "Festival".to_string(),
                start_date_time: None,
                end_date_time: None,
                permit_type: "PUBLIC_EVENT".to_string(),
                location_tag: "Imphal East".to_string(),
            },
            Utc::now(),
        )
    }

    fn remarks(app: &PermitApplication) -> [Option<String>; 4] {
        [
            app.dc_remarks.clone(),
            app.sp_remarks.clone(),
            app.sdpo_remarks.clone(),
            app.oc_report.clone(),
        ]
    }

    fn field_index(field: RemarkField) -> usize {
        match field {
            RemarkField::DcRemarks => 0,
            RemarkField::SpRemarks => 1,
            RemarkField::SdpoRemarks => 2,
            RemarkField::OcReport => 3,
        }
    }

    #[test]
    fn test_every_rule_produces_a_valid_pair() {
        for t in Transition::ALL {
            let rule = t.rule();
            assert!(rule.status.pairs_with(rule.to), "{t} yields an unpaired status");
            assert!(!rule.from.is_terminal(), "{t} starts from a terminal stage");
        }
    }

    #[test]
    fn test_each_stage_has_expected_operations() {
        for stage in WorkflowStage::ALL {
            let allowed: Vec<_> = Transition::ALL
                .into_iter()
                .filter(|t| t.rule().from == stage)
                .collect();
            match stage {
                WorkflowStage::Completed => assert!(allowed.is_empty()),
                WorkflowStage::DcFinalPending => assert_eq!(
                    allowed,
                    vec![Transition::ApproveByDc, Transition::RejectByDc]
                ),
                _ => assert_eq!(allowed.len(), 1, "stage {stage}"),
            }
        }
    }

    #[test]
    fn test_transition_from_precondition_stage() {
        for t in Transition::ALL {
            let rule = t.rule();
            let mut app = submitted();
            app.current_stage = rule.from;
            app.dc_remarks = Some("earlier dc".to_string());
            app.sp_remarks = Some("earlier sp".to_string());
            let before = remarks(&app);

            apply(&mut app, t, format!("note for {t}"), Utc::now()).expect("legal move");

            assert_eq!(app.status, rule.status);
            assert_eq!(app.current_stage, rule.to);
            let after = remarks(&app);
            for i in 0..4 {
                if i == field_index(rule.field) {
                    assert_eq!(after[i].as_deref(), Some(format!("note for {t}").as_str()));
                } else {
                    assert_eq!(after[i], before[i], "{t} touched another remark field");
                }
            }
        }
    }

    #[test]
    fn test_transition_from_wrong_stage_is_rejected() {
        for t in Transition::ALL {
            for stage in WorkflowStage::ALL {
                if stage == t.rule().from {
                    continue;
                }
                let mut app = submitted();
                app.current_stage = stage;
                let before = app.clone();

                let err = apply(&mut app, t, "x".to_string(), Utc::now())
                    .expect_err("illegal move must be rejected");
                assert_eq!(err.transition, t);
                assert_eq!(err.stage, stage);
                assert_eq!(app, before);
            }
        }
    }

    #[test]
    fn test_full_chain_to_approval() {
        let mut app = submitted();
        let chain = [
            Transition::ForwardToSp,
            Transition::ForwardToSdpo,
            Transition::ForwardToOc,
            Transition::SubmitOcReport,
            Transition::ForwardToSpFromSdpo,
            Transition::RecommendToDc,
            Transition::ApproveByDc,
        ];
        for t in chain {
            apply(&mut app, t, t.name().to_string(), Utc::now()).expect("legal move");
        }

        assert_eq!(app.status, PermitStatus::Approved);
        assert_eq!(app.current_stage, WorkflowStage::Completed);
        assert_eq!(app.remark_log.0.len(), chain.len());
        assert_eq!(app.remark_log.0[3].authority, Authority::Oc);
        // sdpo wrote twice; the column holds the latest, the log holds both
        assert_eq!(app.sdpo_remarks.as_deref(), Some("forward_to_sp_from_sdpo"));
        assert_eq!(app.remark_log.0[2].text, "forward_to_oc");
    }

    #[test]
    fn test_completed_accepts_nothing() {
        let mut app = submitted();
        app.status = PermitStatus::Rejected;
        app.current_stage = WorkflowStage::Completed;
        assert!(Transition::ALL
            .into_iter()
            .all(|t| apply(&mut app, t, String::new(), Utc::now()).is_err()));
    }
}
