//! Guidance catalog
//!
//! Maps a task kind to the capabilities it needs, the order in which they
//! must be used, and the prompt template that formats the result. The
//! catalog is built once and never changes.

use sdk::guidance::{Capability, GuidanceEntry, ToolDescriptor};
use std::collections::{BTreeMap, BTreeSet};

/// Read a document, then analyze it
pub const ANALYZE_FILE: &str = "analyze_file";
/// Summarize a patient record
pub const PATIENT_SUMMARY: &str = "patient_summary";
/// Record a charge for a completed analysis
pub const BILLING: &str = "billing";
/// Retrieve external guidelines
pub const FETCH_GUIDELINES: &str = "fetch_guidelines";

/// Immutable task kind -> guidance table
#[derive(Debug, Clone)]
pub struct GuidanceCatalog {
    entries: BTreeMap<String, GuidanceEntry>,
}

impl GuidanceCatalog {
    /// Build a catalog from explicit entries
    pub fn new(entries: impl IntoIterator<Item = GuidanceEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.task_kind.clone(), entry))
                .collect(),
        }
    }

    /// The medical analysis catalog
    pub fn reference() -> Self {
        Self::new([
            entry(
                ANALYZE_FILE,
                &[Capability::Filesystem],
                &[
                    "First, use filesystem tool to read the medical document",
                    "Then analyze the content using medical_processor prompt",
                    "Do NOT attempt to analyze without reading the file first",
                ],
                Some("medical_processor"),
            ),
            entry(
                PATIENT_SUMMARY,
                &[Capability::Filesystem],
                &[
                    "Use filesystem to access patient records",
                    "Apply patient_summary prompt for formatting",
                    "Ensure HIPAA compliance in output",
                ],
                Some("patient_summary"),
            ),
            entry(
                BILLING,
                &[Capability::Filesystem, Capability::Payment],
                &[
                    "First verify the analysis was completed",
                    "Use payment tool to create billing record",
                    "Do NOT skip billing verification",
                ],
                None,
            ),
            entry(
                FETCH_GUIDELINES,
                &[Capability::Fetch],
                &[
                    "Use fetch tool to retrieve medical guidelines",
                    "Do NOT make up medical information",
                    "Always cite sources",
                ],
                None,
            ),
        ])
    }

    /// Guidance for a task kind; unknown kinds get the fallback entry
    pub fn get_guidance(&self, task_kind: &str) -> GuidanceEntry {
        self.entries
            .get(task_kind)
            .cloned()
            .unwrap_or_else(|| GuidanceEntry::unknown(task_kind))
    }

    /// Known task kinds, sorted
    pub fn task_kinds(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Descriptors for every capability, as advertised by `tools/list`
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        Capability::ALL.iter().map(Capability::descriptor).collect()
    }
}

impl Default for GuidanceCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

fn entry(
    task_kind: &str,
    capabilities: &[Capability],
    steps: &[&str],
    prompt_ref: Option<&str>,
) -> GuidanceEntry {
    GuidanceEntry {
        task_kind: task_kind.to_string(),
        required_capabilities: capabilities.iter().copied().collect::<BTreeSet<_>>(),
        ordered_steps: steps.iter().map(|s| s.to_string()).collect(),
        prompt_ref: prompt_ref.map(str::to_string),
    }
}

/// Guidance lookup against the reference catalog
pub fn get_tool_guidance(task_kind: &str) -> GuidanceEntry {
    GuidanceCatalog::reference().get_guidance(task_kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::guidance::NO_GUIDANCE_STEP;

    #[test]
    fn test_analyze_file_reads_before_analyzing() {
        let guidance = get_tool_guidance(ANALYZE_FILE);

        assert_eq!(
            guidance.required_capabilities,
            BTreeSet::from([Capability::Filesystem])
        );
        assert_eq!(guidance.ordered_steps.len(), 3);
        assert!(guidance.ordered_steps[0].contains("read"));
        assert!(guidance.ordered_steps[1].contains("medical_processor"));
        assert_eq!(guidance.prompt_ref.as_deref(), Some("medical_processor"));
    }

    #[test]
    fn test_billing_needs_payment_and_filesystem() {
        let guidance = get_tool_guidance(BILLING);

        assert!(guidance.required_capabilities.contains(&Capability::Payment));
        assert!(guidance.required_capabilities.contains(&Capability::Filesystem));
        assert!(guidance.prompt_ref.is_none());
    }

    #[test]
    fn test_fetch_guidelines() {
        let guidance = get_tool_guidance(FETCH_GUIDELINES);

        assert_eq!(
            guidance.required_capabilities,
            BTreeSet::from([Capability::Fetch])
        );
        assert_eq!(guidance.ordered_steps[2], "Always cite sources");
    }

    #[test]
    fn test_unknown_task_gets_fallback() {
        let guidance = get_tool_guidance("nonexistent_task");

        assert!(guidance.required_capabilities.is_empty());
        assert_eq!(guidance.ordered_steps, vec![NO_GUIDANCE_STEP.to_string()]);
        assert!(guidance.prompt_ref.is_none());
    }

    #[test]
    fn test_task_kinds_sorted() {
        let catalog = GuidanceCatalog::reference();
        assert_eq!(
            catalog.task_kinds(),
            vec![ANALYZE_FILE, BILLING, FETCH_GUIDELINES, PATIENT_SUMMARY]
        );
    }

    #[test]
    fn test_tools_lists_every_capability() {
        let tools = GuidanceCatalog::reference().tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["filesystem", "fetch", "payment"]);
    }
}
