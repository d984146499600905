//! `SyncLogicResult`: the orchestrator's user-visible outcome. A brief
//! list keyed by step kind, plus a per-target detail map for drill-down;
//! the reconciler turns this into `SyncConfig` status conditions.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStepKind {
    ReadResource,
    SyncUser,
    SyncGroup,
    SyncProject,
    SyncGroupMember,
}

impl fmt::Display for SyncStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStepKind::ReadResource => "ReadResource",
            SyncStepKind::SyncUser => "SyncUser",
            SyncStepKind::SyncGroup => "SyncGroup",
            SyncStepKind::SyncProject => "SyncProject",
            SyncStepKind::SyncGroupMember => "SyncGroupMember",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct BriefEntry {
    pub step: SyncStepKind,
    pub ok: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DetailEntry {
    pub target: String,
    pub step: SyncStepKind,
    pub ok: bool,
    pub message: Option<String>,
}

/// Accumulates per-step outcomes over the lifetime of one run. `brief`
/// captures one entry per step kind encountered anywhere in the run;
/// `detail` captures every per-target outcome for drill-down.
#[derive(Debug, Clone, Default)]
pub struct SyncLogicResult {
    pub brief: Vec<BriefEntry>,
    pub detail: HashMap<String, Vec<DetailEntry>>,
}

impl SyncLogicResult {
    pub fn record_brief(&mut self, step: SyncStepKind, ok: bool, message: Option<String>) {
        self.brief.push(BriefEntry { step, ok, message });
    }

    pub fn record_detail(&mut self, target: &str, step: SyncStepKind, ok: bool, message: Option<String>) {
        self.detail.entry(target.to_string()).or_default().push(DetailEntry {
            target: target.to_string(),
            step,
            ok,
            message,
        });
    }

    /// True if every recorded brief entry succeeded.
    pub fn succeeded(&self) -> bool {
        self.brief.iter().all(|b| b.ok)
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.detail
            .iter()
            .filter(|(_, entries)| entries.iter().any(|e| !e.ok))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}
