//! Read path: fetch stored records and render them as text.
//!
//! Records in the store may be half-written (feedback still `""`) or, after a
//! manual edit, not parseable at all. Listing keeps the former and skips the
//! latter with a warning; it never fails because of one bad entry.

use crate::backend::KeyValueStore;
use crate::error::ReviewError;
use crate::record::{FeedbackState, ResumeRecord, TipKind};
use std::fmt::Write as _;
use tracing::{debug, warn};

pub const EMPTY_LISTING: &str = "No resumes found. Upload yours to get feedback.";

/// All records under `prefix`, in store order.
pub async fn list_records(
    kv: &dyn KeyValueStore,
    prefix: &str,
) -> Result<Vec<ResumeRecord>, ReviewError> {
    let pattern = format!("{prefix}*");
    let items = kv
        .list(&pattern, true)
        .await
        .map_err(|e| ReviewError::StoreFailed {
            key: pattern.clone(),
            reason: e.to_string(),
        })?;
    debug!("{} entries match {}", items.len(), pattern);

    let records = items
        .into_iter()
        .filter_map(|item| {
            let Some(value) = item.value else {
                warn!("Skipping {}: no value", item.key);
                return None;
            };
            match ResumeRecord::from_json(&value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping {}: {}", item.key, e);
                    None
                }
            }
        })
        .collect();

    Ok(records)
}

/// One record by id, or `None` if nothing is stored under `<prefix><id>`.
pub async fn load_record(
    kv: &dyn KeyValueStore,
    prefix: &str,
    id: &str,
) -> Result<Option<ResumeRecord>, ReviewError> {
    let key = format!("{prefix}{id}");
    let store_failed = |reason: String| ReviewError::StoreFailed {
        key: key.clone(),
        reason,
    };

    match kv.get(&key).await.map_err(|e| store_failed(e.to_string()))? {
        Some(value) => ResumeRecord::from_json(&value)
            .map(Some)
            .map_err(|e| store_failed(e.to_string())),
        None => Ok(None),
    }
}

/// One line per record: company, title and score (or `pending`).
pub fn render_listing(records: &[ResumeRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec![EMPTY_LISTING.to_string()];
    }

    records
        .iter()
        .map(|r| {
            let score = match &r.feedback {
                FeedbackState::Ready(f) => format!("{:.0}/100", f.overall_score),
                FeedbackState::Pending => "pending".to_string(),
            };
            format!(
                "{}  {} | {} | {}",
                r.id(),
                display_or_dash(&r.company_name),
                display_or_dash(&r.job_title),
                score
            )
        })
        .collect()
}

/// Detail view: header, overall score, then each category with its tips.
pub fn render_record(record: &ResumeRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} | {}",
        display_or_dash(&record.company_name),
        display_or_dash(&record.job_title)
    );
    let _ = writeln!(out, "Resume: {}", record.resume_path);
    let _ = writeln!(out, "Image:  {}", record.image_path);

    let Some(feedback) = record.feedback.as_ready() else {
        let _ = writeln!(out, "\nFeedback is pending.");
        return out;
    };

    let _ = writeln!(out, "\nOverall score: {:.0}/100", feedback.overall_score);
    for (name, category) in feedback.categories() {
        let _ = writeln!(out, "\n{name}: {:.0}/100", category.score);
        for tip in &category.tips {
            let mark = match tip.kind {
                TipKind::Good => "+",
                TipKind::Improve => "!",
            };
            let _ = writeln!(out, "  {mark} {}", tip.tip);
            if let Some(explanation) = tip.explanation.as_deref().filter(|e| !e.is_empty()) {
                let _ = writeln!(out, "      {explanation}");
            }
        }
    }
    out
}

fn display_or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "-"
    } else {
        s
    }
}
