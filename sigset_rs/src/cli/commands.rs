//! Subcommand handlers. Each returns the process exit code.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use super::args::{FilterArgs, IdsArgs, LintArgs, ProjectArgs, RulesArgs};
use crate::config::SigsetConfig;
use crate::coverage::{CoverageEngine, FilterChange, FilterPlan, format_year_set};
use crate::document::{Document, Filter, apply_edits, format_filter};
use crate::output::{Summary, format_text, json_report};
use crate::rules::{LintResult, RuleRegistry};
use crate::sarif::{SarifInputs, generate_sarif_string};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FINDINGS: i32 = 2;

fn read_document(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Document::parse(text).with_context(|| format!("{} is not a valid signal set", path.display()))
}

struct Project {
    root: PathBuf,
    config: SigsetConfig,
}

impl Project {
    fn resolve(root: Option<&Path>) -> Self {
        let root = root.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let config = SigsetConfig::load(&root);
        Self { root, config }
    }

    fn coverage(&self, args: &ProjectArgs) -> CoverageEngine {
        let test_cases = args
            .test_cases
            .clone()
            .unwrap_or_else(|| self.config.coverage.test_cases_under(&self.root));
        let generations = args
            .generations
            .clone()
            .unwrap_or_else(|| self.config.coverage.generations_under(&self.root));
        tracing::debug!(
            test_cases = %test_cases.display(),
            generations = %generations.display(),
            "loading coverage data"
        );
        CoverageEngine::load(&test_cases, &generations)
    }
}

pub fn lint(args: &LintArgs) -> Result<i32> {
    let project = Project::resolve(args.project.root.as_deref());
    let registry = RuleRegistry::from_config(&project.config);
    let engine = project.coverage(&args.project);
    let coverage = engine.has_data().then_some(&engine);

    let mut doc = read_document(&args.file)?;
    let mut results = registry.run(&doc, coverage);

    if args.fix {
        let edits: Vec<_> = results
            .iter()
            .filter_map(|r| r.suggestion.as_ref())
            .flat_map(|s| s.edits.iter().cloned())
            .collect();
        let (fixed, applied) = apply_edits(doc.text(), &edits);
        if applied > 0 {
            fs::write(&args.file, &fixed)
                .with_context(|| format!("failed to write {}", args.file.display()))?;
            eprintln!("Applied {applied} fix(es) to {}", args.file.display());
            doc = Document::parse(fixed).context("fixes produced invalid JSON")?;
            results = registry.run(&doc, coverage);
        }
    }

    let path = args.file.display().to_string();
    if args.sarif {
        let sarif = generate_sarif_string(SarifInputs {
            uri: &path,
            text: doc.text(),
            results: &results,
            registry: &registry,
        })?;
        println!("{sarif}");
    } else if args.json {
        let report = json_report(&path, doc.text(), &results);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_text(&path, doc.text(), &results));
    }

    Ok(exit_code(&results))
}

fn exit_code(results: &[LintResult]) -> i32 {
    if Summary::of(results).error > 0 {
        EXIT_FINDINGS
    } else {
        EXIT_OK
    }
}

fn describe_filter(filter: Option<&Filter>, dbg: bool) -> String {
    match (filter, dbg) {
        (Some(filter), _) => format_filter(filter),
        (None, true) => "none (unconditional dbg)".to_string(),
        (None, false) => "none".to_string(),
    }
}

fn or_dash(years: String) -> String {
    if years.is_empty() { "-".to_string() } else { years }
}

fn print_plan(engine: &CoverageEngine, plan: &FilterPlan, dbg: bool) {
    let header = match &plan.generation {
        Some(generation) => format!("{} [{generation}]", plan.id),
        None => plan.id.clone(),
    };
    println!("{}", header.bold());
    println!("  supported:   {}", or_dash(format_year_set(&plan.support.supported)));
    println!("  unsupported: {}", or_dash(format_year_set(&plan.support.unsupported)));

    let grouped = engine.generations().group_years(&plan.support.supported);
    if grouped.len() > 1 {
        let parts: Vec<String> = grouped
            .iter()
            .map(|(name, years)| {
                let label = name.as_deref().unwrap_or("ungrouped");
                let set: BTreeSet<i32> = years.iter().copied().collect();
                format!("{label}: {}", format_year_set(&set))
            })
            .collect();
        println!("  by generation: {}", parts.join("; "));
    }

    let before = describe_filter(plan.before.as_ref(), dbg);
    match &plan.change {
        FilterChange::Keep => println!("  filter: {before} (unchanged)"),
        FilterChange::Unconditional => {
            println!("  filter: {before} (no year data to bound it)")
        }
        FilterChange::Set(filter) => {
            println!("  before: {before}");
            println!("  after:  {}", format_filter(filter).green());
        }
        FilterChange::Remove => {
            println!("  before: {before}");
            println!("  after:  {}", "removed".green());
        }
    }
}

pub fn filters(args: &FilterArgs) -> Result<i32> {
    let project = Project::resolve(args.project.root.as_deref());
    let engine = project.coverage(&args.project);
    let doc = read_document(&args.file)?;
    let model = doc.model();

    if !engine.has_data() {
        tracing::warn!("no model-year test cases found; filters cannot be bounded");
    }

    let plans: Vec<_> = model
        .commands
        .iter()
        .map(|command| (command, engine.plan(command, args.generation.as_deref())))
        .collect();

    if args.json {
        let list: Vec<_> = plans.iter().map(|(_, plan)| plan).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        for (command, plan) in &plans {
            print_plan(&engine, plan, command.command.dbg);
        }
    }

    let edits: Vec<_> = plans
        .iter()
        .filter(|(_, plan)| plan.is_change())
        .filter_map(|(command, plan)| plan.edit(doc.text(), command))
        .flat_map(|suggestion| suggestion.edits)
        .collect();
    let changed = plans.iter().filter(|(_, plan)| plan.is_change()).count();

    if changed == 0 {
        eprintln!("All debug filters are up to date.");
    } else if args.commit {
        let (updated, applied) = apply_edits(doc.text(), &edits);
        fs::write(&args.file, updated)
            .with_context(|| format!("failed to write {}", args.file.display()))?;
        eprintln!(
            "Updated {applied} debug filter(s) in {}",
            args.file.display()
        );
    } else {
        eprintln!("{changed} debug filter change(s); run with --commit to write them.");
    }
    Ok(EXIT_OK)
}

pub fn ids(args: &IdsArgs) -> Result<i32> {
    let doc = read_document(&args.file)?;
    let model = doc.model();
    for command in &model.commands {
        println!("{}", command.command.identifier());
    }
    Ok(EXIT_OK)
}

pub fn rules(args: &RulesArgs) -> Result<i32> {
    let project = Project::resolve(args.root.as_deref());
    let registry = RuleRegistry::from_config(&project.config);

    if args.json {
        let list: Vec<_> = registry
            .rules()
            .iter()
            .map(|rule| {
                serde_json::json!({
                    "id": rule.id(),
                    "name": rule.name(),
                    "description": rule.description(),
                    "severity": rule.config().severity,
                    "enabled": rule.config().enabled,
                    "granularities": rule.granularities(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(EXIT_OK);
    }

    for rule in registry.rules() {
        let config = rule.config();
        let granularities: Vec<_> = rule.granularities().iter().map(|g| g.as_str()).collect();
        let state = if config.enabled {
            config.severity.to_string()
        } else {
            "off".dimmed().to_string()
        };
        println!(
            "{:<24} {:<12} {:<18} {}",
            rule.id(),
            state,
            granularities.join(","),
            rule.description()
        );
    }
    Ok(EXIT_OK)
}
