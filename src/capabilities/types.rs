// src/capabilities/types.rs
//! Request/response wire types for the reasoning capabilities. Every field
//! defaults so a sparse backend response still parses; validators decide
//! whether it is usable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ===== Job intelligence =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobIntelligence {
    pub job_id: String,
    pub source: SourceInfo,
    pub role: RoleInfo,
    pub company: CompanyInfo,
    pub location: LocationInfo,
    pub mission_summary: String,
    pub responsibilities: Vec<Responsibility>,
    pub requirements: Requirements,
    pub skills: SkillProfile,
    pub keywords_for_ats: Vec<String>,
    pub screening_likely: ScreeningProfile,
    pub tailoring_guidance: TailoringGuidance,
    pub red_flags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceInfo {
    pub job_url: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleInfo {
    pub title: String,
    pub level: String,
    pub employment_type: String,
    pub seniority_signals: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    pub industry: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationInfo {
    pub city: String,
    pub country: String,
    pub remote_policy: String,
    pub visa_sponsorship: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Responsibility {
    pub item: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub must_have: Vec<RequirementItem>,
    pub nice_to_have: Vec<RequirementItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementItem {
    pub item: String,
    pub evidence_phrase: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillProfile {
    pub hard_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub tools_tech: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningProfile {
    pub top_5_evaluation_axes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TailoringGuidance {
    pub resume_focus: Vec<String>,
    pub cover_letter_angles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobIntelRequest {
    pub job_url: String,
    pub raw_jd_text: String,
    pub company_name: String,
    pub role_title: String,
    pub location: String,
    /// Stricter extraction instructions appended on the single retry.
    pub constraints: Vec<String>,
}

// ===== Resume tailoring =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TailorRequest {
    pub base_resume_path: String,
    pub base_resume_latex: String,
    pub job_intel: JobIntelligence,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TailorResponse {
    pub job_folder_created: String,
    pub updated_resume_path: String,
    pub updated_resume_latex: String,
    pub diff_summary: Vec<ChangeLogEntry>,
    pub ats_keyword_coverage: KeywordCoverage,
    pub risk_flags: Vec<String>,
    pub compile_sanity_checks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeLogEntry {
    pub section: String,
    pub change: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordCoverage {
    pub matched_keywords: Vec<String>,
    pub missing_unverifiable: Vec<String>,
}

// ===== Fact extraction =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FactExtractRequest {
    pub resume_latex: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifiedFacts {
    pub resume_verified_facts: Vec<String>,
}

// ===== Cover letter =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    #[default]
    En,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Formal,
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterLength {
    Short,
    #[default]
    Standard,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverLetterPrefs {
    pub language: Language,
    pub tone: Tone,
    pub length: LetterLength,
    pub include_salary_expectation: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverLetterRequest {
    pub job_intel: JobIntelligence,
    pub resume_verified_facts: Vec<String>,
    pub prefs: CoverLetterPrefs,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverLetterResponse {
    pub cover_letter: String,
    pub mapping: Vec<RequirementMapping>,
    pub missing_information: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementMapping {
    pub jd_requirement: String,
    pub resume_fact_used: String,
}

// ===== Scoring =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerRequest {
    pub job_intel: JobIntelligence,
    pub resume_base_path: String,
    pub resume_tailored_path: String,
    pub job_folder_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRecord {
    pub job_id: String,
    pub resume_base_hash: String,
    pub resume_tailored_hash: String,
    pub keyword_coverage: f64,
    pub must_have_coverage: f64,
    pub diff_size: Option<u64>,
    pub metrics_path: String,
}

// ===== Application tracking =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerRequest {
    pub job_intel: JobIntelligence,
    pub resume_ref: String,
    pub cover_letter_ref: String,
    pub date_applied: String,
    pub notes: String,
}

/// Fixed tracker schema; column order is part of the external contract.
pub const TRACKER_HEADER: [&str; 13] = [
    "job_id",
    "company",
    "role_title",
    "location",
    "remote_policy",
    "job_url",
    "date_applied",
    "status",
    "visa_sponsorship",
    "keywords",
    "updated_resume_ref",
    "cover_letter_ref",
    "notes",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerRow {
    pub job_id: String,
    pub company: String,
    pub role_title: String,
    pub location: String,
    pub remote_policy: String,
    pub job_url: String,
    pub date_applied: String,
    pub status: String,
    pub visa_sponsorship: String,
    pub keywords: Vec<String>,
    pub updated_resume_ref: String,
    pub cover_letter_ref: String,
    pub notes: String,
}

impl TrackerRow {
    /// Status defaults to "Applied" iff a date_applied is recorded.
    pub fn resolved_status(&self) -> String {
        if !self.status.is_empty() {
            return self.status.clone();
        }
        if self.date_applied.is_empty() {
            "Not Applied".to_string()
        } else {
            "Applied".to_string()
        }
    }

    /// Keywords joined with semicolons so the cell never fights the CSV
    /// delimiter.
    pub fn joined_keywords(&self) -> String {
        self.keywords.join(";")
    }

    pub fn to_row_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("job_id".to_string(), self.job_id.clone());
        map.insert("company".to_string(), self.company.clone());
        map.insert("role_title".to_string(), self.role_title.clone());
        map.insert("location".to_string(), self.location.clone());
        map.insert("remote_policy".to_string(), self.remote_policy.clone());
        map.insert("job_url".to_string(), self.job_url.clone());
        map.insert("date_applied".to_string(), self.date_applied.clone());
        map.insert("status".to_string(), self.resolved_status());
        map.insert(
            "visa_sponsorship".to_string(),
            self.visa_sponsorship.clone(),
        );
        map.insert("keywords".to_string(), self.joined_keywords());
        map.insert(
            "updated_resume_ref".to_string(),
            self.updated_resume_ref.clone(),
        );
        map.insert(
            "cover_letter_ref".to_string(),
            self.cover_letter_ref.clone(),
        );
        map.insert("notes".to_string(), self.notes.clone());
        map
    }

    /// Header plus this row as standalone CSV text, for the final bundle.
    pub fn to_csv_text(&self) -> String {
        let map = self.to_row_map();
        let mut writer = csv::Writer::from_writer(Vec::new());
        // write_record never fails on an in-memory Vec<u8> sink
        let _ = writer.write_record(TRACKER_HEADER);
        let record: Vec<String> = TRACKER_HEADER
            .iter()
            .map(|key| map.get(*key).cloned().unwrap_or_default())
            .collect();
        let _ = writer.write_record(&record);
        String::from_utf8(writer.into_inner().unwrap_or_default()).unwrap_or_default()
    }
}
