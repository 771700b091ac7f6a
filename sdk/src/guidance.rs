//! Guidance and capability types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Step reported for task kinds the catalog does not know
pub const NO_GUIDANCE_STEP: &str = "No specific guidance available for this task";

/// A named external ability the orchestrator references but never implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Read a document by path
    Filesystem,
    /// Retrieve external content by reference
    Fetch,
    /// Record a billable usage event
    Payment,
}

impl Capability {
    /// All capabilities, in declaration order
    pub const ALL: [Capability; 3] = [Self::Filesystem, Self::Fetch, Self::Payment];

    /// Wire name of the capability
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Fetch => "fetch",
            Self::Payment => "payment",
        }
    }

    /// What the capability is for, as advertised by `tools/list`
    pub fn purpose(&self) -> &'static str {
        match self {
            Self::Filesystem => "Read medical documents and files",
            Self::Fetch => "Retrieve external medical resources",
            Self::Payment => "Handle billing and payment processing",
        }
    }

    /// Work items that need the capability
    pub fn required_for(&self) -> &'static [&'static str] {
        match self {
            Self::Filesystem => &["file analysis", "document reading"],
            Self::Fetch => &["guidelines", "research papers"],
            Self::Payment => &["billing", "payment tracking"],
        }
    }

    /// Descriptor entry for `tools/list`
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.as_str().to_string(),
            purpose: self.purpose().to_string(),
            required_for: self.required_for().iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filesystem" => Ok(Self::Filesystem),
            "fetch" => Ok(Self::Fetch),
            "payment" => Ok(Self::Payment),
            other => Err(format!("unknown capability '{}'", other)),
        }
    }
}

/// Entry of the `tools/list` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub purpose: String,
    pub required_for: Vec<String>,
}

/// Prescribed capability set and step order for one task kind
///
/// `ordered_steps` is a sequencing contract: step N must be reported or
/// attempted before step N+1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceEntry {
    pub task_kind: String,
    pub required_capabilities: BTreeSet<Capability>,
    pub ordered_steps: Vec<String>,
    pub prompt_ref: Option<String>,
}

impl GuidanceEntry {
    /// Guidance returned for a task kind nobody has described
    pub fn unknown(task_kind: impl Into<String>) -> Self {
        Self {
            task_kind: task_kind.into(),
            required_capabilities: BTreeSet::new(),
            ordered_steps: vec![NO_GUIDANCE_STEP.to_string()],
            prompt_ref: None,
        }
    }

    /// True when this is the fallback entry for an unknown task kind
    pub fn is_fallback(&self) -> bool {
        self.required_capabilities.is_empty()
            && self.prompt_ref.is_none()
            && self.ordered_steps.len() == 1
            && self.ordered_steps[0] == NO_GUIDANCE_STEP
    }
}
