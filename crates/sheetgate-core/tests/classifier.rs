#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use sheetgate_core::classify::{classify, document_id};
use sheetgate_core::OperationKind;
use sheetgate_core::OperationKind as K;

// (method, path, kind, document id)
const CASES: &[(&str, &str, K, Option<&str>)] = &[
    ("GET", "/2.0/sheets", K::ListSheets, None),
    ("POST", "/2.0/sheets", K::CreateSheet, None),
    ("POST", "/2.0/sheets/import?sheetName=x", K::CreateSheet, None),
    ("GET", "/2.0/sheets/4583173393803140", K::GetSheet, Some("4583173393803140")),
    ("PUT", "/2.0/sheets/42", K::UpdateSheet, Some("42")),
    ("DELETE", "/2.0/sheets/42/", K::DeleteSheet, Some("42")),
    ("POST", "/2.0/sheets/42/copy?include=data", K::CopySheet, Some("42")),
    ("GET", "/2.0/search/sheets/42?query=acme", K::SearchSheet, Some("42")),
    ("GET", "/2.0/search?query=acme", K::SearchSheet, None),
    ("POST", "/2.0/sheets/42/rows", K::AddRows, Some("42")),
    ("PUT", "/2.0/sheets/42/rows", K::UpdateRows, Some("42")),
    ("DELETE", "/2.0/sheets/42/rows?ids=1,2", K::DeleteRows, Some("42")),
    ("GET", "/2.0/sheets/42/rows/7", K::GetRow, Some("42")),
    ("GET", "/2.0/sheets/42/columns", K::ListColumns, Some("42")),
    ("POST", "/2.0/sheets/42/columns", K::AddColumns, Some("42")),
    ("PUT", "/2.0/sheets/42/columns/9", K::UpdateColumn, Some("42")),
    ("DELETE", "/2.0/sheets/42/columns/9", K::DeleteColumn, Some("42")),
    ("GET", "/2.0/sheets/42/attachments", K::ListAttachments, Some("42")),
    ("POST", "/2.0/sheets/42/discussions/3/comments", K::AddComment, Some("42")),
    ("GET", "/2.0/users/me", K::Generic, None),
    ("PATCH", "/2.0/sheets/42", K::Generic, Some("42")),
];

#[test]
fn route_table() {
    for &(method, path, kind, document) in CASES {
        let got = classify(method, path);
        assert_eq!(got.kind, kind, "{method} {path}");
        assert_eq!(got.document_id.as_deref(), document, "{method} {path}");
    }
}

#[test]
fn more_specific_routes_win() {
    // Attachment upload on a row is not a row insert.
    let c = classify("POST", "/2.0/sheets/42/rows/7/attachments");
    assert_eq!(c.kind, OperationKind::AttachFile);

    // Row discussion is a comment, not a row insert.
    let c = classify("POST", "/2.0/sheets/42/rows/7/discussions");
    assert_eq!(c.kind, OperationKind::AddComment);
}

#[test]
fn method_is_case_insensitive() {
    assert_eq!(classify("post", "/2.0/sheets/1/rows").kind, OperationKind::AddRows);
    assert_eq!(classify(" Get ", "/2.0/sheets/1").kind, OperationKind::GetSheet);
}

#[test]
fn fragments_match_whole_segments() {
    // "rowsets" must not be taken for "rows".
    let c = classify("POST", "/2.0/sheets/1/rowsets");
    assert_eq!(c.kind, OperationKind::Generic);
}

#[test]
fn garbage_input_still_classifies() {
    let c = classify("", "");
    assert_eq!(c.kind, OperationKind::Generic);
    assert_eq!(c.document_id, None);

    let c = classify("GET", "sheets");
    assert_eq!(c.kind, OperationKind::ListSheets);
    assert_eq!(c.document_id, None);
}

#[test]
fn document_id_positional() {
    assert_eq!(document_id("/2.0/sheets/abc123/rows"), Some("abc123".into()));
    assert_eq!(document_id("/2.0/SHEETS/77"), Some("77".into()));
    assert_eq!(document_id("/2.0/sheets/?x=1"), None);
    assert_eq!(document_id("/2.0/workspaces/5"), None);
}
