//! Human and JSON rendering of analysis results.

use refprune_deps::{Suggestion, SuggestionKind};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// One suggestion and the detector that produced it
pub struct Entry {
    pub detector: &'static str,
    pub suggestion: Suggestion,
}

/// Suggestions collected over a run, in detector order
pub struct Report {
    format: OutputFormat,
    entries: Vec<Entry>,
}

impl Report {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, detector: &'static str, suggestion: Suggestion) {
        self.entries.push(Entry {
            detector,
            suggestion,
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn print(&self, projects: usize) {
        match self.format {
            OutputFormat::Human => print!("{}", self.render_human(projects)),
            OutputFormat::Json => match serde_json::to_string_pretty(&self.to_json(projects)) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error serializing results: {e}"),
            },
        }
    }

    fn render_human(&self, projects: usize) -> String {
        let mut out = String::new();
        let mut current = None;
        for entry in &self.entries {
            if current != Some(entry.detector) {
                out.push_str(&format!("\n{}\n", entry.detector));
                current = Some(entry.detector);
            }
            let mark = if entry.suggestion.is_applied() { "applied" } else { "-" };
            out.push_str(&format!("  {mark} {}\n", entry.suggestion));
        }

        let touched: BTreeSet<_> = self.entries.iter().map(|e| e.suggestion.project()).collect();
        out.push_str(&format!(
            "\n{} suggestion(s) in {} of {} project(s)\n",
            self.entries.len(),
            touched.len(),
            projects
        ));
        out
    }

    fn to_json(&self, projects: usize) -> Value {
        json!({
            "projects": projects,
            "suggestions": self.entries.iter().map(|e| {
                let mut value = describe(e.suggestion.kind());
                if let Some(object) = value.as_object_mut() {
                    object.insert("detector".into(), json!(e.detector));
                    object.insert("project".into(), json!(e.suggestion.project()));
                    object.insert("message".into(), json!(e.suggestion.message()));
                    object.insert("applied".into(), json!(e.suggestion.is_applied()));
                }
                value
            }).collect::<Vec<_>>(),
        })
    }
}

fn describe(kind: &SuggestionKind) -> Value {
    match kind {
        SuggestionKind::RemovePackage {
            package,
            provided_by,
        } => json!({
            "kind": "remove-package",
            "package": package,
            "provided_by": provided_by,
        }),
        SuggestionKind::RemoveProjectReference {
            include,
            reachable_through,
        } => json!({
            "kind": "remove-project-reference",
            "include": include,
            "reachable_through": reachable_through,
        }),
        SuggestionKind::UpgradePackage { package, from, to } => json!({
            "kind": "upgrade-package",
            "package": package,
            "from": from,
            "to": to.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_kinds() {
        let removal = describe(&SuggestionKind::RemovePackage {
            package: "Serilog".into(),
            provided_by: "project Lib".into(),
        });
        assert_eq!(removal["kind"], "remove-package");
        assert_eq!(removal["provided_by"], "project Lib");

        let upgrade = describe(&SuggestionKind::UpgradePackage {
            package: "Polly".into(),
            from: "7.2.4".into(),
            to: "8.2.0".parse().unwrap(),
        });
        assert_eq!(upgrade["to"], "8.2.0");
    }

    #[test]
    fn test_empty_report() {
        let report = Report::new(OutputFormat::Human);
        assert!(report.render_human(3).contains("0 suggestion(s) in 0 of 3 project(s)"));
        assert_eq!(report.to_json(3)["suggestions"], json!([]));
    }
}
