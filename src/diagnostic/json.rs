use serde::Serialize;

use super::Diagnostic;

#[derive(Serialize)]
struct Report<'a> {
    severity: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    notes: &'a [String],
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    error_code: Option<&'a str>,
}

pub fn render(d: &Diagnostic) -> String {
    let report = Report {
        severity: "error",
        message: &d.message,
        file: d.location.as_ref().map(|l| l.file.as_str()),
        line: d.location.as_ref().map(|l| l.line),
        source: d.source_line.as_deref(),
        notes: &d.notes,
        error_code: d.error_code.as_deref(),
    };
    serde_json::to_string(&report).unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}
