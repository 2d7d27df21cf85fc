//! `refprune analyze`: build the graph, run detectors, optionally apply.

use super::load_settings;
use crate::output::{OutputFormat, Report};
use anyhow::{Context, Result};
use clap::Args;
use futures::StreamExt;
use refprune_deps::{
    Detector, Error, GraphBuilder, PackageRedundancyDetector, ProjectRedundancyDetector,
    UpgradeDetector,
};
use refprune_registry::RegistryClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing the project manifests
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Report package references already provided transitively
    #[arg(long)]
    pub packages: bool,

    /// Report project references reachable through another reference
    #[arg(long)]
    pub projects: bool,

    /// Report packages with a newer acceptable version
    #[arg(long)]
    pub upgrades: bool,

    /// Write every suggestion back to the manifests
    #[arg(long)]
    pub apply: bool,

    /// Configuration file (default: ~/.refprune/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Additional ignore patterns for manifest discovery (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Output format
    #[arg(short, long = "output", value_enum, default_value = "human")]
    pub format: OutputFormat,
}

impl AnalyzeArgs {
    /// Detectors in run order. No selection flag means all of them.
    fn detectors(&self, registry: &RegistryClient) -> Vec<Box<dyn Detector>> {
        let all = !(self.packages || self.projects || self.upgrades);
        let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
        if all || self.projects {
            detectors.push(Box::new(ProjectRedundancyDetector::new()));
        }
        if all || self.packages {
            detectors.push(Box::new(PackageRedundancyDetector::new(registry.clone())));
        }
        if all || self.upgrades {
            detectors.push(Box::new(UpgradeDetector::new(registry.clone())));
        }
        detectors
    }
}

/// Runs the analysis with the given options.
pub async fn run_analysis(args: AnalyzeArgs) -> Result<ExitCode> {
    let mut settings = load_settings(args.config.as_deref()).await?;
    settings
        .ignore_patterns
        .extend(args.ignore_patterns.iter().cloned());
    let settings = Arc::new(settings);

    let root = std::fs::canonicalize(&args.root)
        .with_context(|| format!("Cannot open {}", args.root.display()))?;
    let model = GraphBuilder::native(&root)?
        .with_settings(&settings)
        .build(&root)
        .await
        .with_context(|| format!("Failed to build the project graph under {}", root.display()))?;

    let registry =
        RegistryClient::new(settings.clone()).context("Failed to create the registry client")?;
    let mut report = Report::new(args.format);
    for detector in args.detectors(&registry) {
        let mut suggestions = detector.analyze(&model);
        while let Some(suggestion) = suggestions.next().await {
            let suggestion =
                suggestion.with_context(|| format!("{} analysis failed", detector.name()))?;
            report.push(detector.name(), suggestion);
        }
    }

    let mut failed = 0usize;
    if args.apply {
        // One at a time: each apply re-reads the manifest it edits
        for entry in report.entries() {
            match entry.suggestion.apply().await {
                Ok(_) => {}
                Err(Error::Mutation(e)) => {
                    tracing::warn!(error = %e, "suggestion no longer applies, skipped");
                }
                Err(e) => {
                    tracing::error!(suggestion = %entry.suggestion, error = %e, "apply failed");
                    failed += 1;
                }
            }
        }
    }

    report.print(model.len());
    if failed > 0 {
        eprintln!("{failed} suggestion(s) could not be applied");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
