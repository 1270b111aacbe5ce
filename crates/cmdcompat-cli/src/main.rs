use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

use cmdcompat_core::{
    AnalysisFault, BaselineStatus, Config, Issue, IssueCategory, MetadataSnapshot, ModuleReport,
    Report, Severity,
};
use cmdcompat_engine::{
    load_baseline, Baseline, CmdletDiff, HelpSource, ModuleAnalyzer, ModuleInput,
};

const DEFAULT_CONFIG: &str = "cmdcompat.toml";

/// cmdcompat - Breaking change and convention checks for command modules
#[derive(Parser)]
#[command(name = "cmdcompat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: cmdcompat.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every module in the snapshot directory
    Check {
        /// Output directory (overrides output_dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// Exit with status 1 when any breaking change is found
        #[arg(long)]
        fail_on_breaking: bool,
    },

    /// Compare two snapshots of one module
    Compare {
        /// Prior snapshot
        #[arg(long)]
        old: PathBuf,

        /// New snapshot
        #[arg(long)]
        new: PathBuf,

        /// Print the issues as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run convention rules over a single snapshot
    Rules {
        snapshot: PathBuf,

        /// Documented command names, one per line
        #[arg(long)]
        help_records: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Check { output, markdown, fail_on_breaking } => {
            check_command(&config, output, markdown.as_deref(), fail_on_breaking, cli.verbose)
        }
        Commands::Compare { old, new, json } => compare_command(&config, &old, &new, json),
        Commands::Rules { snapshot, help_records } => {
            rules_command(&config, &snapshot, help_records.as_deref())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        Config::from_file(default_path).with_context(|| format!("Failed to load {}", DEFAULT_CONFIG))
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Ok(Config::default())
    }
}

/// A discovered module: ready to analyze, or already failed
enum Discovered {
    /// Faults found while loading are merged into the module's report
    Ready {
        input: ModuleInput,
        faults: Vec<AnalysisFault>,
    },
    Failed(ModuleReport),
}

/// Find module snapshots under the configured snapshot directory
fn discover_modules(config: &Config) -> Result<Vec<Discovered>> {
    let snapshot_dir = config
        .snapshot_dir
        .as_ref()
        .map(|dir| config.resolve_path(dir))
        .ok_or_else(|| anyhow::anyhow!("No snapshot_dir configured. Add it to {}.", DEFAULT_CONFIG))?;

    if !snapshot_dir.is_dir() {
        anyhow::bail!("Snapshot directory not found: {}", snapshot_dir.display());
    }

    let baseline_dir = config.baseline_dir.as_ref().map(|dir| config.resolve_path(dir));
    let help_dir = config.help_dir.as_ref().map(|dir| config.resolve_path(dir));

    let mut modules = Vec::new();

    for entry in WalkDir::new(&snapshot_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", snapshot_dir.display()))?;
        let path = entry.path();

        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        tracing::debug!(module = name, path = %path.display(), "Discovered module");

        let snapshot = match MetadataSnapshot::from_file(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(module = name, error = %e, "Failed to load module snapshot");
                let mut report = ModuleReport::new(name);
                report.faults.push(AnalysisFault::MalformedSnapshot {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
                modules.push(Discovered::Failed(report));
                continue;
            }
        };

        let mut input = ModuleInput::new(name, snapshot);
        let mut faults = Vec::new();

        if let Some(dir) = &baseline_dir {
            input = input.with_baseline(dir.join(format!("{}.json", name)));
        }

        if let Some(dir) = &help_dir {
            let help_path = dir.join(format!("{}.txt", name));
            match HelpSource::load(&help_path) {
                Ok(help) => input = input.with_help(help),
                Err(e) => {
                    tracing::error!(module = name, path = %help_path.display(), error = %e, "Failed to read help records");
                    faults.push(AnalysisFault::UnreadableHelp {
                        path: help_path.display().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        modules.push(Discovered::Ready { input, faults });
    }

    Ok(modules)
}

/// Check command - analyze every module and write reports
fn check_command(
    config: &Config,
    output: Option<PathBuf>,
    markdown: Option<&Path>,
    fail_on_breaking: bool,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{}", "Discovering modules...".cyan());
    }

    let discovered = discover_modules(config)?;
    let inputs: Vec<ModuleInput> = discovered
        .iter()
        .filter_map(|d| match d {
            Discovered::Ready { input, .. } => Some(input.clone()),
            Discovered::Failed(_) => None,
        })
        .collect();

    if verbose {
        eprintln!("{} {} modules", "Analyzing".cyan(), inputs.len());
    }

    let analyzer = ModuleAnalyzer::from_config(config);
    let mut analyzed = analyzer.analyze_all(&inputs).into_iter();

    // Put failed modules back in discovery order
    let mut report = Report::new();
    for module in discovered {
        match module {
            Discovered::Ready { faults, .. } => {
                if let Some(mut result) = analyzed.next() {
                    result.faults.extend(faults);
                    report.add_module(result);
                }
            }
            Discovered::Failed(failed) => report.add_module(failed),
        }
    }

    let output_dir = config.resolve_path(&output.unwrap_or_else(|| config.output_dir.clone()));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let json_path = output_dir.join("report.json");
    report
        .save_to_file(&json_path)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    for category in IssueCategory::ALL {
        let csv_path = output_dir.join(format!("{}.csv", category.report_name()));
        std::fs::write(&csv_path, report.to_csv(category))
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    }

    if verbose {
        eprintln!("{} {}", "Reports saved to:".green(), output_dir.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    if fail_on_breaking && report.has_breaking_changes() {
        std::process::exit(1);
    }

    Ok(())
}

/// Compare command - one-off diff of two snapshot files
fn compare_command(config: &Config, old: &Path, new: &Path, json: bool) -> Result<()> {
    let keep = |command: &cmdcompat_core::CommandMetadata| !config.filter.is_skipped(&command.name);

    let new_snapshot = MetadataSnapshot::from_file(new)
        .with_context(|| format!("Failed to load snapshot {}", new.display()))?
        .filtered(keep);

    let diff = match load_baseline(old).with_context(|| format!("Failed to load snapshot {}", old.display()))? {
        Baseline::Missing => {
            eprintln!("{} {}", "No prior snapshot at".yellow(), old.display());
            CmdletDiff::default()
        }
        Baseline::Loaded { snapshot, .. } => CmdletDiff::compare(&snapshot.filtered(keep), &new_snapshot),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&diff.issues)?);
        return Ok(());
    }

    println!(
        "Compared {} commands ({} removed, {} added)",
        diff.commands_compared, diff.commands_removed, diff.commands_added
    );
    print_issues("Breaking changes", &diff.issues);

    Ok(())
}

/// Rules command - signature and help checks for one snapshot
fn rules_command(config: &Config, snapshot_path: &Path, help_records: Option<&Path>) -> Result<()> {
    let snapshot = MetadataSnapshot::from_file(snapshot_path)
        .with_context(|| format!("Failed to load snapshot {}", snapshot_path.display()))?;

    let name = snapshot_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
        .to_string();

    let mut input = ModuleInput::new(name, snapshot);
    if let Some(path) = help_records {
        let help = HelpSource::load(path)
            .with_context(|| format!("Failed to read help records {}", path.display()))?;
        input = input.with_help(help);
    }

    let module = ModuleAnalyzer::from_config(config).analyze(&input);

    print_issues("Signature issues", &module.signature_issues);
    if help_records.is_some() {
        print_issues("Help issues", &module.help_issues);
    }
    print_faults(&module.faults);

    Ok(())
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::CRITICAL => "CRITICAL".red().bold(),
        Severity::HIGH => "HIGH".yellow().bold(),
        Severity::MEDIUM => "MEDIUM".cyan(),
        Severity(other) => format!("SEV{}", other).normal(),
    }
}

fn print_issues(title: &str, issues: &[Issue]) {
    println!();
    println!("{} ({})", title.bold(), issues.len());

    if issues.is_empty() {
        println!("  {}", "✓ None".green());
        return;
    }

    for issue in issues {
        println!(
            "  [{}] {} {}: {}",
            severity_label(issue.severity),
            issue.problem_id,
            issue.target.bold(),
            issue.description
        );
    }
}

fn print_faults(faults: &[AnalysisFault]) {
    for fault in faults {
        println!("  {} {}", "⚠ Fault:".yellow(), fault);
    }
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Command Compatibility Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Modules:          {}", summary.modules_analyzed);
    println!("  Commands:         {}", summary.commands_analyzed);
    println!("  Missing baselines: {}", summary.baselines_missing);

    if summary.breaking_changes > 0 {
        println!("  Breaking changes: {}", summary.breaking_changes.to_string().red().bold());
    } else {
        println!("  Breaking changes: {}", summary.breaking_changes.to_string().green());
    }
    println!("  Signature issues: {}", summary.signature_issues.to_string().yellow());
    println!("  Help issues:      {}", summary.help_issues.to_string().yellow());
    if summary.faults > 0 {
        println!("  Faults:           {}", summary.faults.to_string().red());
    }

    for module in &report.modules {
        println!();
        let baseline = match &module.baseline {
            BaselineStatus::NotConfigured => "no baseline configured".normal(),
            BaselineStatus::Missing { .. } => "baseline missing".yellow(),
            BaselineStatus::Compared { .. } => "compared".green(),
            BaselineStatus::Failed { .. } => "baseline failed".red(),
        };
        println!("{} ({})", module.module.bold().bright_blue(), baseline);

        for issue in module.breaking_changes.iter().chain(&module.signature_issues).chain(&module.help_issues) {
            println!(
                "  [{}] {} {}: {}",
                severity_label(issue.severity),
                issue.problem_id,
                issue.target,
                issue.description
            );
        }
        print_faults(&module.faults);
    }

    println!();
    if summary.breaking_changes == 0 && summary.signature_issues == 0 && summary.help_issues == 0 {
        println!("{}", "✓ No issues found!".green().bold());
    }
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Command Compatibility Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    let summary = &report.summary;
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Modules analyzed: {}\n", summary.modules_analyzed));
    md.push_str(&format!("- Commands analyzed: {}\n", summary.commands_analyzed));
    md.push_str(&format!("- Missing baselines: {}\n", summary.baselines_missing));
    md.push_str(&format!("- Breaking changes: {}\n", summary.breaking_changes));
    md.push_str(&format!("- Signature issues: {}\n", summary.signature_issues));
    md.push_str(&format!("- Help issues: {}\n", summary.help_issues));
    md.push_str(&format!("- Faults: {}\n\n", summary.faults));

    for module in &report.modules {
        md.push_str(&format!("## {}\n\n", module.module));

        for category in IssueCategory::ALL {
            let issues = module.issues(category);
            if issues.is_empty() {
                continue;
            }

            md.push_str(&format!("### {}\n\n", category.report_name()));
            md.push_str("| Severity | Problem | Target | Description |\n");
            md.push_str("|---|---|---|---|\n");
            for issue in issues {
                md.push_str(&format!(
                    "| {} | {} | `{}` | {} |\n",
                    issue.severity,
                    issue.problem_id,
                    issue.target,
                    issue.description.replace('|', "\\|")
                ));
            }
            md.push('\n');
        }

        for fault in &module.faults {
            md.push_str(&format!("> ⚠️ {}\n\n", fault));
        }
    }

    if !report.has_breaking_changes() {
        md.push_str("✅ **No breaking changes found!**\n");
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdcompat_core::CommandMetadata;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn discovery_pairs_baselines_and_help_by_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("snapshots");
        std::fs::create_dir_all(&snapshots).unwrap();

        let snapshot = MetadataSnapshot::new(vec![CommandMetadata::new("Get-Widget", "GetWidgetCommand")]);
        std::fs::write(snapshots.join("Contoso.json"), snapshot.to_json().unwrap()).unwrap();
        std::fs::write(snapshots.join("Broken.json"), "{").unwrap();
        std::fs::write(snapshots.join("notes.txt"), "ignored").unwrap();

        let config = Config::from_toml(&format!(
            "snapshot_dir = {:?}\nbaseline_dir = {:?}\nhelp_dir = {:?}\n",
            snapshots,
            dir.path().join("baselines"),
            dir.path().join("help"),
        ))
        .unwrap();

        let modules = discover_modules(&config).unwrap();
        assert_eq!(modules.len(), 2);

        match &modules[0] {
            Discovered::Failed(report) => {
                assert_eq!(report.module, "Broken");
                assert_eq!(report.faults.len(), 1);
            }
            Discovered::Ready { .. } => panic!("Broken.json should fail to load"),
        }

        match &modules[1] {
            Discovered::Ready { input, faults } => {
                assert!(faults.is_empty());
                assert_eq!(input.name, "Contoso");
                assert_eq!(input.baseline_path, Some(dir.path().join("baselines").join("Contoso.json")));
                assert!(matches!(input.help, Some(HelpSource::Missing { .. })));
            }
            Discovered::Failed(_) => panic!("Contoso.json should load"),
        }
    }

    #[test]
    fn unreadable_help_file_only_affects_its_module() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("snapshots");
        let help = dir.path().join("help");
        std::fs::create_dir_all(&snapshots).unwrap();
        std::fs::create_dir_all(&help).unwrap();

        for name in ["Alpha", "Beta"] {
            let snapshot = MetadataSnapshot::new(vec![CommandMetadata::new("Get-Widget", "GetWidgetCommand")]);
            std::fs::write(snapshots.join(format!("{}.json", name)), snapshot.to_json().unwrap()).unwrap();
        }
        std::fs::write(help.join("Alpha.txt"), [0xff, 0xfe, 0xfd]).unwrap();
        std::fs::write(help.join("Beta.txt"), "Get-Widget\n").unwrap();

        let config = Config::from_toml(&format!("snapshot_dir = {:?}\nhelp_dir = {:?}\n", snapshots, help)).unwrap();
        let modules = discover_modules(&config).unwrap();
        assert_eq!(modules.len(), 2);

        match &modules[0] {
            Discovered::Ready { input, faults } => {
                assert_eq!(input.name, "Alpha");
                assert!(input.help.is_none());
                assert!(matches!(faults[..], [AnalysisFault::UnreadableHelp { .. }]));
            }
            Discovered::Failed(_) => panic!("Alpha.json should load"),
        }

        match &modules[1] {
            Discovered::Ready { input, faults } => {
                assert_eq!(input.name, "Beta");
                assert!(faults.is_empty());
                assert!(matches!(input.help, Some(HelpSource::Records(_))));
            }
            Discovered::Failed(_) => panic!("Beta.json should load"),
        }
    }

    #[test]
    fn markdown_lists_issues_per_category() {
        let mut module = ModuleReport::new("Contoso");
        module.signature_issues.push(Issue::new(
            cmdcompat_core::ProblemId::NoOutputType,
            "GetWidgetCommand",
            "Get-Widget",
            "Command 'Get-Widget' has no declared output type.",
        ));

        let md = generate_markdown_report(&Report::from_modules(vec![module]));
        assert!(md.contains("## Contoso"));
        assert!(md.contains("### SignatureIssues"));
        assert!(md.contains("| 8420 |"));
        assert!(md.contains("No breaking changes found"));
    }
}
