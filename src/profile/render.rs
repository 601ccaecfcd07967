//! Deterministic, bounded text rendering of owner documents for extraction
//!
//! This rendering is intentionally bounded (at most 10 prior roles, truncated
//! task text) because the extraction prompt only needs enough signal to
//! classify seniority and skills. The embedding pipeline uses its own fuller
//! rendering; see `crate::embeddings::text`.

use crate::models::Candidate;
use crate::models::Job;

/// Inputs shorter than this are skipped as `insufficient_data`
pub const MIN_EXTRACTION_INPUT_LEN: usize = 80;

const MAX_WORK_ENTRIES: usize = 10;
const MAX_TASK_CHARS: usize = 600;

/// Render a candidate's structured fields into a fixed, bounded document
#[must_use]
pub fn render_candidate_text(candidate: &Candidate) -> String {
    let mut sections = Vec::new();

    if let Some(position) = non_empty(candidate.position.as_deref()) {
        sections.push(format!("Current position: {position}"));
    }

    if let Some(history) = &candidate.work_history {
        let mut roles = Vec::new();
        for entry in history.0.iter().take(MAX_WORK_ENTRIES) {
            let mut line = entry.position.clone();
            if let Some(company) = non_empty(entry.company.as_deref()) {
                line.push_str(&format!(" at {company}"));
            }
            match (entry.start_year, entry.end_year) {
                (Some(from), Some(to)) => line.push_str(&format!(" ({from}-{to})")),
                (Some(from), None) => line.push_str(&format!(" ({from}-present)")),
                _ => {}
            }
            if let Some(tasks) = non_empty(entry.description.as_deref()) {
                line.push_str(&format!(": {}", truncate_chars(tasks, MAX_TASK_CHARS)));
            }
            roles.push(format!("- {line}"));
        }
        if !roles.is_empty() {
            sections.push(format!("Work history:\n{}", roles.join("\n")));
        }
    }

    if let Some(education) = non_empty(candidate.education.as_deref()) {
        sections.push(format!("Education: {education}"));
    }
    if let Some(certifications) = non_empty(candidate.certifications.as_deref()) {
        sections.push(format!("Certifications: {certifications}"));
    }
    if let Some(skills) = non_empty(candidate.skills.as_deref()) {
        sections.push(format!("Skills: {skills}"));
    }
    if let Some(languages) = non_empty(candidate.languages.as_deref()) {
        sections.push(format!("Languages: {languages}"));
    }
    if let Some(free_text) = non_empty(candidate.free_text.as_deref()) {
        sections.push(format!("Notes: {}", truncate_chars(free_text, MAX_TASK_CHARS)));
    }

    sections.join("\n\n")
}

/// Render a job's fields into a fixed, bounded document
#[must_use]
pub fn render_job_text(job: &Job) -> String {
    let mut sections = vec![format!("Position: {}", job.title)];

    if let Some(description) = non_empty(job.description.as_deref()) {
        sections.push(format!(
            "Description: {}",
            truncate_chars(description, MAX_TASK_CHARS * 4)
        ));
    }
    if let Some(requirements) = non_empty(job.requirements.as_deref()) {
        sections.push(format!(
            "Requirements: {}",
            truncate_chars(requirements, MAX_TASK_CHARS * 4)
        ));
    }

    sections.join("\n\n")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Truncate to a character limit without splitting a code point
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkEntry;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn bare_candidate() -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            full_name: Some("Anna".to_string()),
            position: None,
            work_history: None,
            education: None,
            certifications: None,
            skills: None,
            languages: None,
            free_text: None,
            latitude: None,
            longitude: None,
            category: "finance".to_string(),
            hidden: false,
            deleted_at: None,
            updated_at: Utc::now(),
            profile: None,
            profile_extracted_at: None,
            embedding: None,
            embedding_generated_at: None,
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let mut candidate = bare_candidate();
        candidate.position = Some("Accountant".to_string());
        candidate.skills = Some("SAP, Excel".to_string());

        assert_eq!(
            render_candidate_text(&candidate),
            render_candidate_text(&candidate)
        );
        assert!(render_candidate_text(&candidate).contains("Current position: Accountant"));
    }

    #[test]
    fn test_name_only_candidate_renders_below_threshold() {
        let candidate = bare_candidate();
        let text = render_candidate_text(&candidate);
        assert!(text.trim().len() < MIN_EXTRACTION_INPUT_LEN);
    }

    #[test]
    fn test_work_history_bounded_to_ten_roles() {
        let mut candidate = bare_candidate();
        let entries: Vec<WorkEntry> = (0..14)
            .map(|i| WorkEntry {
                position: format!("Role {i}"),
                company: None,
                description: None,
                start_year: None,
                end_year: None,
            })
            .collect();
        candidate.work_history = Some(Json(entries));

        let text = render_candidate_text(&candidate);
        assert!(text.contains("Role 9"));
        assert!(!text.contains("Role 10"));
    }

    #[test]
    fn test_task_descriptions_truncated() {
        let mut candidate = bare_candidate();
        candidate.work_history = Some(Json(vec![WorkEntry {
            position: "Engineer".to_string(),
            company: Some("Acme".to_string()),
            description: Some("x".repeat(2000)),
            start_year: Some(2019),
            end_year: None,
        }]));

        let text = render_candidate_text(&candidate);
        assert!(text.chars().count() < 800);
        assert!(text.contains('…'));
        assert!(text.contains("(2019-present)"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let truncated = truncate_chars("ÄÖÜäöü", 3);
        assert_eq!(truncated, "ÄÖÜ…");
    }
}
