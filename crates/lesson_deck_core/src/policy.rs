//! crates/lesson_deck_core/src/policy.rs
//!
//! Per-operation rules the boundary layer consults: how a missing session is
//! reported, and whether a stage placeholder is written back on first read.

/// Every externally reachable operation of the session workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitSession,
    GetSession,
    ListSessions,
    DeleteSession,
    AdvanceState,
    CompleteGeneration,
    AddReferenceFiles,
    UploadReferenceFile,
    ListReferenceFiles,
    GetTarget,
    ConfirmTarget,
    GetOutline,
    ConfirmOutline,
    ListOutlineNodes,
    GetDesign,
    ConfirmDesign,
    TriggerRecall,
    UpdateSelection,
    ListRecalls,
    RunWebSearch,
    ListWebSearchResults,
    ListTemplates,
}

/// How a not-found outcome leaves the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// HTTP 200 with an error envelope.
    Envelope,
    /// Non-2xx status with a status/detail body.
    HardFault,
}

impl Operation {
    pub fn not_found_policy(self) -> NotFoundPolicy {
        match self {
            Operation::TriggerRecall | Operation::GetSession => NotFoundPolicy::HardFault,
            _ => NotFoundPolicy::Envelope,
        }
    }

    /// Envelope message used when the operation fails for a non-business reason.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::InitSession => "failed to initialise session",
            Operation::GetSession => "failed to load session",
            Operation::ListSessions => "failed to load session history",
            Operation::DeleteSession => "failed to delete session",
            Operation::AdvanceState => "failed to change session state",
            Operation::CompleteGeneration => "failed to complete generation",
            Operation::AddReferenceFiles => "failed to add reference files",
            Operation::UploadReferenceFile => "failed to upload reference file",
            Operation::ListReferenceFiles => "failed to load reference files",
            Operation::GetTarget => "failed to load teaching target",
            Operation::ConfirmTarget => "failed to confirm teaching target",
            Operation::GetOutline => "failed to load teaching outline",
            Operation::ConfirmOutline => "failed to confirm teaching outline",
            Operation::ListOutlineNodes => "failed to load outline nodes",
            Operation::GetDesign => "failed to load teaching design",
            Operation::ConfirmDesign => "failed to confirm teaching design",
            Operation::TriggerRecall => "failed to recall knowledge",
            Operation::UpdateSelection => "failed to update knowledge selection",
            Operation::ListRecalls => "failed to load knowledge recalls",
            Operation::RunWebSearch => "web search failed",
            Operation::ListWebSearchResults => "failed to load web search results",
            Operation::ListTemplates => "failed to load templates",
        }
    }
}

/// A stage whose empty field is backfilled with a placeholder on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Target,
    Outline,
    Design,
}

/// Which stages write their placeholder back to the session on first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillPolicy {
    pub persist_target: bool,
    pub persist_outline: bool,
    pub persist_design: bool,
}

impl BackfillPolicy {
    pub fn persists(&self, stage: Stage) -> bool {
        match stage {
            Stage::Target => self.persist_target,
            Stage::Outline => self.persist_outline,
            Stage::Design => self.persist_design,
        }
    }
}

impl Default for BackfillPolicy {
    /// Only the target placeholder is kept; outline and design are served transiently.
    fn default() -> Self {
        Self {
            persist_target: true,
            persist_outline: false,
            persist_design: false,
        }
    }
}
