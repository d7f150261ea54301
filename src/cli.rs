//! Command-line interface for smellcheck.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::detect::{collect_files, RuleId, RuleRegistry, Runner, Severity};
use crate::error::ConfigError;
use crate::parser::{self, LanguageAdapter};
use crate::report::{self, ReportContext};
use crate::rules::Rule;
use crate::score;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Anti-pattern and security smell analyzer.
///
/// Smellcheck parses Python, JavaScript and TypeScript sources and reports
/// hardcoded secrets, unsafe sinks, string-built queries, weak randomness
/// and maintainability smells such as high complexity, long parameter
/// lists, magic literals, unused bindings and duplicated blocks.
#[derive(Parser)]
#[command(name = "smellcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log progress information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze files or directories
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// List the built-in rules
    Rules,
    /// Create a smellcheck config from a template
    Init(InitArgs),
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Lowest severity that fails the run: info, warning, error, critical
    #[arg(long)]
    pub fail_on: Option<String>,

    /// Parse every file as this language (python, javascript, typescript, tsx)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Show suppressed findings in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "smellcheck.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub content: &'static str,
}

pub static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "All rules with their default thresholds, failing on errors",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "strict",
        description: "Tighter thresholds, failing on warnings",
        content: include_str!("templates/strict.yaml"),
    },
];

/// Output formats accepted by `--format`.
const FORMATS: &[&str] = &["pretty", "json", "sarif"];

/// Resolve `--language` into an adapter.
pub fn resolve_language(
    language: Option<&str>,
) -> Result<Option<&'static dyn LanguageAdapter>, ConfigError> {
    match language {
        None => Ok(None),
        Some(id) => parser::get_adapter_by_id(id)
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownLanguage(id.to_string())),
    }
}

/// Resolve `--fail-on` into a severity.
pub fn resolve_fail_on(fail_on: Option<&str>, config: &Config) -> Result<Severity, ConfigError> {
    match fail_on {
        None => Ok(config.fail_on),
        Some(s) => s
            .parse::<Severity>()
            .map_err(|_| ConfigError::InvalidSeverity(s.to_string())),
    }
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    if !FORMATS.contains(&args.format.as_str()) {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Everything configurable is validated before any file is read
    let (config, config_path) = match Config::resolve(args.config.as_deref(), Path::new(".")) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let fail_on = match resolve_fail_on(args.fail_on.as_deref(), &config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let language = match resolve_language(args.language.as_deref()) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Supported languages: {}", parser::language_ids().join(", "));
            return Ok(EXIT_ERROR);
        }
    };
    let registry = match RuleRegistry::from_config(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if !args.path.exists() {
        eprintln!("Error: cannot access path {:?}", args.path);
        return Ok(EXIT_ERROR);
    }

    let files = collect_files(&args.path, &config)?;
    if files.is_empty() {
        eprintln!("Warning: no files to scan");
        return Ok(EXIT_SUCCESS);
    }
    tracing::info!(files = files.len(), rules = registry.len(), "starting analysis");

    let result = Runner::new(&registry)
        .language(language)
        .timeout(config.timeout())
        .run(&files);
    let risk = score::calculate(&result);

    let path_str = args.path.to_string_lossy().to_string();
    let config_str = config_path.map(|p| p.to_string_lossy().to_string());
    let ctx = ReportContext {
        path: &path_str,
        config: config_str.as_deref(),
        fail_on,
    };

    match args.format.as_str() {
        "json" => report::write_json(&ctx, &result, &risk)?,
        "sarif" => report::write_sarif(&args.path, &result)?,
        _ => report::write_pretty(&ctx, &result, &risk, args.show_suppressed),
    }

    if ctx.passed(&result) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the rules command.
pub fn run_rules() -> anyhow::Result<i32> {
    println!("{}", "Built-in rules:".bold());
    println!();

    for id in RuleId::BUILTIN {
        let rule = Rule::builtin(id, None)?;
        let threshold = match id {
            RuleId::Complexity => "threshold 10",
            RuleId::LongParameterList => "threshold 5",
            RuleId::DuplicateBlock => "min lines 4",
            _ => "",
        };
        println!(
            "  {:<22} {:<9} {:<8} {}",
            id.as_str().cyan(),
            rule.severity().as_str(),
            id.cwe().unwrap_or("-"),
            threshold.dimmed()
        );
        println!("  {:<22} {}", "", id.description().dimmed());
    }

    println!();
    println!("Engine findings:");
    for id in [RuleId::ParseError, RuleId::RuleInternalError] {
        println!("  {:<22} {}", id.as_str().cyan(), id.description().dimmed());
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'smellcheck init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to tune rules for your project", args.output.display());
    println!("  2. Run: smellcheck check . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  smellcheck init --template <name>");

    Ok(EXIT_SUCCESS)
}
