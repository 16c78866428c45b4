// src/utils.rs
use std::path::{Path, PathBuf};

const MAX_SLUG_LEN: usize = 80;

/// Sanitize a job title into a filesystem-safe slug: lowercase, whitespace
/// runs become single underscores, anything outside [a-z0-9_] is stripped,
/// repeated underscores collapse, leading/trailing underscores are trimmed.
pub fn sanitize_slug(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut last_was_underscore = false;

    for c in s.trim().to_lowercase().chars() {
        let mapped = if c.is_whitespace() { '_' } else { c };
        match mapped {
            '_' => {
                if !last_was_underscore && !slug.is_empty() {
                    slug.push('_');
                    last_was_underscore = true;
                }
            }
            'a'..='z' | '0'..='9' => {
                slug.push(mapped);
                last_was_underscore = false;
            }
            _ => {}
        }
    }

    while slug.ends_with('_') {
        slug.pop();
    }

    slug.chars().take(MAX_SLUG_LEN).collect()
}

/// Deterministic job folder name: `<job_id>_<sanitized_title>`.
/// Pure function so a re-run for the same job reuses the same folder.
pub fn make_folder_name(job_id: &str, job_title: &str) -> String {
    format!("{}_{}", job_id, sanitize_slug(job_title))
}

/// Tailored resume file name inside the job folder. Falls back to the
/// company name when the job id is empty.
pub fn resume_file_name(job_id: &str, company: &str, position: &str) -> String {
    if job_id.is_empty() {
        format!(
            "resume_{}_{}.tex",
            sanitize_slug(company),
            sanitize_slug(position)
        )
    } else {
        format!("resume_{}_{}.tex", job_id, sanitize_slug(position))
    }
}

/// Normalize text for substring matching: lowercase with collapsed whitespace.
pub fn normalize_for_match(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a list of target phrases into (matched, missing) against a document,
/// using normalized substring matching.
pub fn match_phrases(document: &str, phrases: &[String]) -> (Vec<String>, Vec<String>) {
    let haystack = normalize_for_match(document);
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for phrase in phrases {
        let needle = normalize_for_match(phrase);
        if !needle.is_empty() && haystack.contains(&needle) {
            matched.push(phrase.clone());
        } else {
            missing.push(phrase.clone());
        }
    }

    (matched, missing)
}

/// Coverage percentage in [0, 100]: matched / total * 100.
/// An empty target list counts as full coverage.
pub fn coverage_percent(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (matched as f64 / total as f64) * 100.0
}

/// Resolve a path against the current working directory.
pub fn resolve_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}
