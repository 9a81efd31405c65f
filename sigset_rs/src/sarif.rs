//! SARIF 2.1.0 output for code-scanning integrations.

use serde_json::json;

use crate::output::line_col;
use crate::rules::{LintResult, RuleRegistry};

pub struct SarifInputs<'a> {
    /// Path reported as the artifact location.
    pub uri: &'a str,
    /// Document text, for line/column regions.
    pub text: &'a str,
    pub results: &'a [LintResult],
    pub registry: &'a RuleRegistry,
}

/// Byte span to SARIF `(charOffset, charLength)`, counted in characters.
fn char_span(text: &str, offset: usize, length: usize) -> (usize, usize) {
    let start = offset.min(text.len());
    let end = offset.saturating_add(length).min(text.len());
    let count = |range: std::ops::Range<usize>| text.get(range).map_or(0, |s| s.chars().count());
    (count(0..start), count(start..end))
}

fn build_sarif(inputs: SarifInputs) -> serde_json::Value {
    let results: Vec<_> = inputs
        .results
        .iter()
        .map(|result| {
            let (start_line, start_column) = line_col(inputs.text, result.node.offset);
            let (end_line, end_column) = line_col(inputs.text, result.node.end());
            let (char_offset, char_length) =
                char_span(inputs.text, result.node.offset, result.node.length);
            let mut entry = json!({
                "ruleId": result.rule_id,
                "level": result.severity.sarif_level(),
                "message": { "text": result.message },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": inputs.uri },
                        "region": {
                            "startLine": start_line,
                            "startColumn": start_column,
                            "endLine": end_line,
                            "endColumn": end_column,
                            "charOffset": char_offset,
                            "charLength": char_length
                        }
                    }
                }]
            });

            if let Some(suggestion) = &result.suggestion {
                entry["fixes"] = json!([{
                    "description": { "text": suggestion.title },
                    "artifactChanges": [{
                        "artifactLocation": { "uri": inputs.uri },
                        "replacements": suggestion.edits.iter().map(|edit| {
                            let (char_offset, char_length) =
                                char_span(inputs.text, edit.offset, edit.length);
                            json!({
                                "deletedRegion": { "charOffset": char_offset, "charLength": char_length },
                                "insertedContent": { "text": edit.new_text }
                            })
                        }).collect::<Vec<_>>()
                    }]
                }]);
            }
            entry
        })
        .collect();

    let mut rules: Vec<_> = inputs
        .registry
        .rules()
        .iter()
        .map(|rule| {
            json!({
                "id": rule.id(),
                "name": rule.name(),
                "shortDescription": { "text": rule.description() },
                "defaultConfiguration": { "level": rule.config().severity.sarif_level() }
            })
        })
        .collect();
    rules.push(json!({
        "id": crate::rules::MALFORMED_RULE_ID,
        "shortDescription": { "text": "Command or signal could not be decoded" },
        "defaultConfiguration": { "level": "error" }
    }));

    let tool = json!({
        "driver": {
            "name": "sigset",
            "version": env!("CARGO_PKG_VERSION"),
            "rules": rules
        }
    });

    json!({
        "version": "2.1.0",
        "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
        "runs": [{
            "tool": tool,
            "results": results
        }]
    })
}

/// Generate SARIF report as a JSON value
pub fn generate_sarif(inputs: SarifInputs) -> serde_json::Value {
    build_sarif(inputs)
}

/// Generate SARIF report as a pretty-printed JSON string
pub fn generate_sarif_string(inputs: SarifInputs) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&build_sarif(inputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars_at(text: &str, region: &serde_json::Value) -> String {
        let offset = region["charOffset"].as_u64().unwrap() as usize;
        let length = region["charLength"].as_u64().unwrap() as usize;
        text.chars().skip(offset).take(length).collect()
    }

    #[test]
    fn test_regions_count_characters_not_bytes() {
        let text = r#"{"commands": [{"hdr": "7E0", "cmd": "0100", "signals": [
  {"id": "X", "name": "Température de l'huile", "fmt": {"len": 8, "max": 300}}
]}]}"#;
        let registry = RuleRegistry::default();
        let results: Vec<_> = registry
            .lint(text, None)
            .unwrap()
            .into_iter()
            .filter(|r| r.rule_id == "formula-range")
            .collect();
        assert_eq!(results.len(), 1);
        let node = &results[0].node;

        let sarif = generate_sarif(SarifInputs {
            uri: "signalset.json",
            text,
            results: &results,
            registry: &registry,
        });
        let result = &sarif["runs"][0]["results"][0];
        let region = &result["locations"][0]["physicalLocation"]["region"];
        assert_eq!(chars_at(text, region), &text[node.offset..node.end()]);
        assert!(region["charOffset"].as_u64().unwrap() < node.offset as u64);

        let deleted = &result["fixes"][0]["artifactChanges"][0]["replacements"][0]["deletedRegion"];
        assert_eq!(chars_at(text, deleted), "300");
    }

    #[test]
    fn test_sarif_results_carry_regions_and_fixes() {
        let text = r#"{"commands": [{"hdr": "7E0", "cmd": "0100", "signals": [
  {"id": "X", "fmt": {"len": 8, "max": 300}}
]}]}"#;
        let registry = RuleRegistry::default();
        let results = registry.lint(text, None).unwrap();
        let formula: Vec<_> = results
            .iter()
            .filter(|r| r.rule_id == "formula-range")
            .cloned()
            .collect();
        assert_eq!(formula.len(), 1);

        let sarif = generate_sarif(SarifInputs {
            uri: "signalset.json",
            text,
            results: &formula,
            registry: &registry,
        });
        assert_eq!(sarif["version"], "2.1.0");
        let run = &sarif["runs"][0];
        let result = &run["results"][0];
        assert_eq!(result["ruleId"], "formula-range");
        assert_eq!(result["level"], "warning");
        assert_eq!(
            result["locations"][0]["physicalLocation"]["region"]["startLine"],
            2
        );
        assert_eq!(
            result["fixes"][0]["artifactChanges"][0]["replacements"][0]["insertedContent"]["text"],
            "255"
        );
        let rule_ids: Vec<_> = run["tool"]["driver"]["rules"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert!(rule_ids.contains(&"bit-overlap".to_string()));
        assert!(rule_ids.contains(&"malformed-entry".to_string()));
    }
}
