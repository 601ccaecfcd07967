//! Full-document text rendering for embeddings and deep evaluation
//!
//! Unlike the extraction rendering, nothing here is truncated: semantic
//! recall quality and evaluation quality both depend on complete task
//! descriptions, so every work-history entry goes in whole.

use crate::models::Candidate;
use crate::models::Job;

/// Render the complete candidate document, untruncated
#[must_use]
pub fn render_candidate_document(candidate: &Candidate) -> String {
    let mut sections = Vec::new();

    if let Some(position) = trimmed(candidate.position.as_deref()) {
        sections.push(format!("Position: {position}"));
    }

    if let Some(history) = &candidate.work_history {
        for entry in &history.0 {
            let mut line = entry.position.clone();
            if let Some(company) = trimmed(entry.company.as_deref()) {
                line.push_str(&format!(" at {company}"));
            }
            if let Some(description) = trimmed(entry.description.as_deref()) {
                line.push_str(&format!(". {description}"));
            }
            sections.push(line);
        }
    }

    for (label, value) in [
        ("Education", candidate.education.as_deref()),
        ("Certifications", candidate.certifications.as_deref()),
        ("Skills", candidate.skills.as_deref()),
        ("Languages", candidate.languages.as_deref()),
        ("Notes", candidate.free_text.as_deref()),
    ] {
        if let Some(value) = trimmed(value) {
            sections.push(format!("{label}: {value}"));
        }
    }

    sections.join("\n")
}

/// Render the complete job document, untruncated
#[must_use]
pub fn render_job_document(job: &Job) -> String {
    let mut sections = vec![format!("Position: {}", job.title)];

    if let Some(description) = trimmed(job.description.as_deref()) {
        sections.push(description.to_string());
    }
    if let Some(requirements) = trimmed(job.requirements.as_deref()) {
        sections.push(format!("Requirements: {requirements}"));
    }

    sections.join("\n")
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkEntry;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    #[test]
    fn test_full_task_descriptions_are_kept() {
        let long_description = "responsible for ".repeat(500);
        let candidate = Candidate {
            id: Uuid::new_v4(),
            full_name: None,
            position: Some("Controller".to_string()),
            work_history: Some(Json(vec![WorkEntry {
                position: "Accountant".to_string(),
                company: Some("Acme".to_string()),
                description: Some(long_description.clone()),
                start_year: None,
                end_year: None,
            }])),
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
        };

        let document = render_candidate_document(&candidate);
        assert!(document.contains(long_description.trim()));
    }

    #[test]
    fn test_job_document_sections() {
        let job = Job {
            id: Uuid::new_v4(),
            title: "Head of Accounting".to_string(),
            description: Some("Lead the accounting team.".to_string()),
            requirements: Some("10 years experience".to_string()),
            latitude: None,
            longitude: None,
            category: "finance".to_string(),
            hidden: false,
            deleted_at: None,
            expires_at: None,
            updated_at: Utc::now(),
            profile: None,
            profile_extracted_at: None,
            embedding: None,
            embedding_generated_at: None,
        };

        let document = render_job_document(&job);
        assert!(document.starts_with("Position: Head of Accounting"));
        assert!(document.contains("Requirements: 10 years experience"));
    }
}
