//! Rendering of lint results for humans and machines.

use std::collections::BTreeMap;

use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use crate::rules::{LintResult, Severity};

/// 1-based line and column (in characters) of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Count of results per severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub error: usize,
    pub warning: usize,
    pub information: usize,
    pub hint: usize,
}

impl Summary {
    pub fn of(results: &[LintResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.severity {
                Severity::Error => summary.error += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Information => summary.information += 1,
                Severity::Hint => summary.hint += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.information + self.hint
    }
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Information => "info".blue(),
        Severity::Hint => "hint".dimmed(),
    }
}

/// `file:line:col: severity[rule] message` lines plus a summary.
pub fn format_text(path: &str, text: &str, results: &[LintResult]) -> String {
    let mut out = String::new();
    for result in results {
        let (line, column) = line_col(text, result.node.offset);
        out.push_str(&format!(
            "{}:{line}:{column}: {}[{}] {}\n",
            path.bold(),
            severity_label(result.severity),
            result.rule_id,
            result.message
        ));
        if let Some(suggestion) = &result.suggestion {
            out.push_str(&format!("    {} {}\n", "fix:".green(), suggestion.title));
        }
    }

    let summary = Summary::of(results);
    if summary.total() == 0 {
        out.push_str(&format!("{} {path}: no findings\n", "✓".green()));
    } else {
        out.push_str(&format!(
            "{path}: {} error(s), {} warning(s), {} info, {} hint(s)\n",
            summary.error, summary.warning, summary.information, summary.hint
        ));
    }
    out
}

/// JSON report with positions resolved and a generation timestamp.
pub fn json_report(path: &str, text: &str, results: &[LintResult]) -> serde_json::Value {
    let mut by_rule: BTreeMap<&str, usize> = BTreeMap::new();
    for result in results {
        *by_rule.entry(result.rule_id.as_str()).or_default() += 1;
    }
    let entries: Vec<_> = results
        .iter()
        .map(|result| {
            let (line, column) = line_col(text, result.node.offset);
            json!({
                "ruleId": result.rule_id,
                "severity": result.severity,
                "message": result.message,
                "line": line,
                "column": column,
                "offset": result.node.offset,
                "length": result.node.length,
                "suggestion": result.suggestion,
            })
        })
        .collect();

    json!({
        "file": path,
        "generatedAt": chrono::Utc::now().to_rfc3339(),
        "summary": Summary::of(results),
        "byRule": by_rule,
        "results": entries,
    })
}
