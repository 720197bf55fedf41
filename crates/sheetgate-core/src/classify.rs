//! Request classifier: infers operation kind and document id from a raw
//! outbound request when the caller does not already know them.
//!
//! Routes are evaluated in a fixed priority order, most specific first, so a
//! `POST /sheets/{id}/rows/{row}/attachments` is an attachment upload and not
//! a row insert. The function is pure and always returns a value; anything
//! unmatched is [`OperationKind::Generic`].

use crate::operation::OperationKind;

/// API root segment whose successor is the document id.
const DOCUMENT_ROOT: &str = "sheets";

/// Segments that may follow the document root without being an id.
const RESERVED_SEGMENTS: [&str; 1] = ["import"];

/// Result of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: OperationKind,
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum DocumentRequirement {
    Any,
    Required,
    Absent,
}

impl DocumentRequirement {
    fn accepts(self, has_document: bool) -> bool {
        match self {
            DocumentRequirement::Any => true,
            DocumentRequirement::Required => has_document,
            DocumentRequirement::Absent => !has_document,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Route {
    method: Option<&'static str>, // None => any method
    fragment: &'static str,
    document: DocumentRequirement,
    kind: OperationKind,
}

const fn route(
    method: Option<&'static str>,
    fragment: &'static str,
    document: DocumentRequirement,
    kind: OperationKind,
) -> Route {
    Route {
        method,
        fragment,
        document,
        kind,
    }
}

use DocumentRequirement::{Absent, Any, Required};

// Order matters: first match wins.
const ROUTES: [Route; 19] = [
    route(Some("POST"), "/attachments/", Any, OperationKind::AttachFile),
    route(Some("GET"), "/attachments/", Any, OperationKind::ListAttachments),
    route(Some("POST"), "/discussions/", Any, OperationKind::AddComment),
    route(Some("POST"), "/comments/", Any, OperationKind::AddComment),
    route(None, "/search/", Any, OperationKind::SearchSheet),
    route(Some("POST"), "/copy/", Required, OperationKind::CopySheet),
    route(Some("POST"), "/rows/", Any, OperationKind::AddRows),
    route(Some("PUT"), "/rows/", Any, OperationKind::UpdateRows),
    route(Some("DELETE"), "/rows/", Any, OperationKind::DeleteRows),
    route(Some("GET"), "/rows/", Any, OperationKind::GetRow),
    route(Some("POST"), "/columns/", Any, OperationKind::AddColumns),
    route(Some("PUT"), "/columns/", Any, OperationKind::UpdateColumn),
    route(Some("DELETE"), "/columns/", Any, OperationKind::DeleteColumn),
    route(Some("GET"), "/columns/", Any, OperationKind::ListColumns),
    route(Some("GET"), "/sheets/", Required, OperationKind::GetSheet),
    route(Some("PUT"), "/sheets/", Required, OperationKind::UpdateSheet),
    route(Some("DELETE"), "/sheets/", Required, OperationKind::DeleteSheet),
    route(Some("GET"), "/sheets/", Absent, OperationKind::ListSheets),
    route(Some("POST"), "/sheets/", Absent, OperationKind::CreateSheet),
];

/// Classify a raw request by method and URL path (query string ignored).
pub fn classify(method: &str, path: &str) -> Classification {
    let path = strip_query(path);
    let document_id = document_id(path);
    let normalized = normalize(path);
    let method = method.trim();

    let kind = ROUTES
        .iter()
        .find(|r| {
            r.method.map_or(true, |m| m.eq_ignore_ascii_case(method))
                && r.document.accepts(document_id.is_some())
                && normalized.contains(r.fragment)
        })
        .map(|r| r.kind)
        .unwrap_or_else(|| {
            tracing::trace!(%method, %path, "no route matched; using generic kind");
            OperationKind::Generic
        });

    Classification { kind, document_id }
}

/// Extract the document id: the segment right after the document root.
pub fn document_id(path: &str) -> Option<String> {
    let mut segments = strip_query(path).split('/').filter(|s| !s.is_empty());
    segments.find(|s| s.eq_ignore_ascii_case(DOCUMENT_ROOT))?;
    let id = segments.next()?;
    if RESERVED_SEGMENTS.iter().any(|r| r.eq_ignore_ascii_case(id)) {
        return None;
    }
    Some(id.to_string())
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or_default()
}

// Lowercase, bracketed by slashes, so fragments match whole segments.
fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 2);
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(&path.to_ascii_lowercase());
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}
