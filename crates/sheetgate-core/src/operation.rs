//! Operation vocabulary of the remote sheet API and the quota rule attached to
//! each operation kind.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Lowest issuance rate any limiter may run at (permits per second).
pub const MIN_RATE_PER_SEC: f64 = 0.1;

/// Named category of remote call sharing one quota rule.
///
/// The set is closed: anything the classifier cannot place, and any call made
/// without a kind, is treated as [`OperationKind::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ListSheets,
    GetSheet,
    CreateSheet,
    UpdateSheet,
    DeleteSheet,
    CopySheet,
    SearchSheet,
    GetRow,
    AddRows,
    UpdateRows,
    DeleteRows,
    ListColumns,
    AddColumns,
    UpdateColumn,
    DeleteColumn,
    ListAttachments,
    AttachFile,
    AddComment,
    Generic,
}

impl OperationKind {
    /// Every kind, `Generic` last.
    pub const ALL: [OperationKind; 19] = [
        OperationKind::ListSheets,
        OperationKind::GetSheet,
        OperationKind::CreateSheet,
        OperationKind::UpdateSheet,
        OperationKind::DeleteSheet,
        OperationKind::CopySheet,
        OperationKind::SearchSheet,
        OperationKind::GetRow,
        OperationKind::AddRows,
        OperationKind::UpdateRows,
        OperationKind::DeleteRows,
        OperationKind::ListColumns,
        OperationKind::AddColumns,
        OperationKind::UpdateColumn,
        OperationKind::DeleteColumn,
        OperationKind::ListAttachments,
        OperationKind::AttachFile,
        OperationKind::AddComment,
        OperationKind::Generic,
    ];

    /// Config/metrics name (snake_case, matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::ListSheets => "list_sheets",
            OperationKind::GetSheet => "get_sheet",
            OperationKind::CreateSheet => "create_sheet",
            OperationKind::UpdateSheet => "update_sheet",
            OperationKind::DeleteSheet => "delete_sheet",
            OperationKind::CopySheet => "copy_sheet",
            OperationKind::SearchSheet => "search_sheet",
            OperationKind::GetRow => "get_row",
            OperationKind::AddRows => "add_rows",
            OperationKind::UpdateRows => "update_rows",
            OperationKind::DeleteRows => "delete_rows",
            OperationKind::ListColumns => "list_columns",
            OperationKind::AddColumns => "add_columns",
            OperationKind::UpdateColumn => "update_column",
            OperationKind::DeleteColumn => "delete_column",
            OperationKind::ListAttachments => "list_attachments",
            OperationKind::AttachFile => "attach_file",
            OperationKind::AddComment => "add_comment",
            OperationKind::Generic => "generic",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota rule for one operation kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaRule {
    /// Rolling window the permit count applies to.
    pub window: Duration,
    /// Admissions allowed per window.
    pub permits: u32,
    /// Calls against one document run one at a time.
    pub document_serialized: bool,
    /// Throttle signals are retried (the action must tolerate re-invocation).
    pub retry_on_throttle: bool,
}

impl QuotaRule {
    pub const fn new(
        window: Duration,
        permits: u32,
        document_serialized: bool,
        retry_on_throttle: bool,
    ) -> Self {
        Self {
            window,
            permits,
            document_serialized,
            retry_on_throttle,
        }
    }

    /// Steady issuance rate in permits per second, never below
    /// [`MIN_RATE_PER_SEC`].
    pub fn rate_per_sec(&self) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs <= 0.0 {
            return MIN_RATE_PER_SEC;
        }
        (f64::from(self.permits) / secs).max(MIN_RATE_PER_SEC)
    }
}
