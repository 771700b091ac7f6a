//! Keyword document analyzer
//!
//! Flags vital signs, common medications and common conditions by keyword.
//! This is pattern matching, not clinical interpretation.

use regex::Regex;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};

const VITAL_SIGNS: [(&str, &str); 3] = [
    ("Blood pressure", r"(?i)\b(bp|blood pressure)\b"),
    ("Heart rate", r"(?i)\b(hr|heart rate|pulse)\b"),
    ("Temperature", r"(?i)\b(temp|temperature)\b"),
];

const MEDICATIONS: [&str; 5] = ["lisinopril", "metformin", "aspirin", "ibuprofen", "synthroid"];

const CONDITIONS: [&str; 5] = ["diabetes", "hypertension", "asthma", "copd", "hypothyroidism"];

/// Extra findings for the comprehensive tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub follow_up_required: bool,
}

/// Extra findings for the batch tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub documents_processed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFindings {
    pub analysis_type: String,
    pub characters: usize,
    pub vital_signs: Vec<String>,
    pub medications: Vec<String>,
    pub conditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<DetailedAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_summary: Option<BatchSummary>,
}

impl DocumentFindings {
    /// Plain-text report
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "{} analysis of {} characters",
                capitalize(&self.analysis_type),
                self.characters
            ),
            format!("Vital signs: {}", list_or_none(&self.vital_signs)),
            format!("Medications: {}", list_or_none(&self.medications)),
            format!("Conditions: {}", list_or_none(&self.conditions)),
        ];

        if let Some(detail) = &self.detailed_analysis {
            lines.push(format!("Risk factors: {}", list_or_none(&detail.risk_factors)));
            lines.push(format!(
                "Recommendations: {}",
                list_or_none(&detail.recommendations)
            ));
            lines.push(format!(
                "Follow-up required: {}",
                if detail.follow_up_required { "yes" } else { "no" }
            ));
        }

        if let Some(batch) = &self.batch_summary {
            lines.push(format!("Documents processed: {}", batch.documents_processed));
        }

        lines.join("\n")
    }
}

pub struct KeywordAnalyzer {
    vital_signs: Vec<(&'static str, Regex)>,
    medications: Vec<(&'static str, Regex)>,
    conditions: Vec<(&'static str, Regex)>,
}

impl KeywordAnalyzer {
    pub fn new() -> Result<Self, EngineError> {
        let vital_signs = VITAL_SIGNS
            .iter()
            .map(|(label, pattern)| Ok((*label, compile(pattern)?)))
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Self {
            vital_signs,
            medications: word_patterns(&MEDICATIONS)?,
            conditions: word_patterns(&CONDITIONS)?,
        })
    }

    pub fn analyze(&self, text: &str, analysis_type: &str, document_count: u64) -> DocumentFindings {
        let vital_signs = matching(&self.vital_signs, text, |label| label.to_string());
        let medications = matching(&self.medications, text, capitalize);
        let conditions = matching(&self.conditions, text, capitalize);

        let detailed_analysis = (analysis_type == "comprehensive").then(|| {
            let mut risk_factors = Vec::new();
            if conditions.iter().any(|c| c == "Hypertension") {
                risk_factors.push("High blood pressure detected".to_string());
            }
            if conditions.iter().any(|c| c == "Diabetes") {
                risk_factors.push("Diabetes on record".to_string());
            }

            let mut recommendations = Vec::new();
            if vital_signs.iter().any(|v| v == "Blood pressure") {
                recommendations.push("Follow up with cardiologist".to_string());
            }

            DetailedAnalysis {
                follow_up_required: !risk_factors.is_empty() || !recommendations.is_empty(),
                risk_factors,
                recommendations,
            }
        });

        let batch_summary = (analysis_type == "batch").then_some(BatchSummary {
            documents_processed: document_count,
        });

        DocumentFindings {
            analysis_type: analysis_type.to_string(),
            characters: text.chars().count(),
            vital_signs,
            medications,
            conditions,
            detailed_analysis,
            batch_summary,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|e| EngineError::Internal(format!("Invalid pattern: {}", e)))
}

fn word_patterns(words: &[&'static str]) -> Result<Vec<(&'static str, Regex)>, EngineError> {
    words
        .iter()
        .map(|word| Ok((*word, compile(&format!(r"(?i)\b{}\b", regex::escape(word)))?)))
        .collect()
}

fn matching(
    patterns: &[(&'static str, Regex)],
    text: &str,
    label: impl Fn(&str) -> String,
) -> Vec<String> {
    patterns
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| label(name))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none detected".to_string()
    } else {
        items.join(", ")
    }
}
