//! Covenant reminder run: find due covenants, mail them, stamp them.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use stoactl_core::config::ReminderSection;
use stoactl_core::email::{render_covenant_reminder, CovenantReminder};

use crate::db::repos::covenants::{CovenantRepo, ReminderCandidate};
use crate::db::DbError;
use crate::mail::Mailer;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn to_reminder(candidate: &ReminderCandidate, as_of: NaiveDate) -> CovenantReminder {
    CovenantReminder {
        covenant_id: candidate.covenant_id,
        to: candidate.reminder_email.trim().to_owned(),
        project_name: candidate.project_name.clone(),
        lender_name: candidate.lender_name.clone(),
        loan_id: candidate.loan_id,
        covenant_type: candidate.covenant_type.clone(),
        requirement: candidate.requirement.clone(),
        compliance_date: candidate.compliance_date,
        days_remaining: (candidate.compliance_date - as_of).num_days(),
    }
}

/// Send every reminder due on `as_of`.
///
/// A failed send leaves the covenant unstamped so the next run retries it.
pub async fn send_due_reminders(
    pool: &PgPool,
    mailer: &dyn Mailer,
    settings: &ReminderSection,
    as_of: NaiveDate,
) -> Result<ReminderReport, DbError> {
    let repo = CovenantRepo::new(pool);
    let candidates = repo
        .reminder_candidates(as_of, settings.default_days_before)
        .await?;
    tracing::info!(%as_of, candidates = candidates.len(), "covenant reminder run");

    let mut report = ReminderReport::default();
    for candidate in &candidates {
        let reminder = to_reminder(candidate, as_of);
        if !reminder.to.contains('@') {
            tracing::warn!(covenant_id = reminder.covenant_id, to = %reminder.to, "skipping reminder with invalid address");
            report.skipped += 1;
            continue;
        }

        let message = render_covenant_reminder(&settings.from_address, &reminder);
        match mailer.send(&message).await {
            Ok(()) => {
                repo.mark_reminded(reminder.covenant_id).await?;
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!(covenant_id = reminder.covenant_id, error = %e, "reminder not sent");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
