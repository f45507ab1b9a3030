//! policy-gate - policy-as-code checks for Kubernetes manifests
//!
//! The `policy-gate` command runs OPA policies against rendered manifests in
//! CI and renders the Markdown posted back to pull requests.
//!
//! ## Commands
//!
//! - `evaluate`: Evaluate active policies and write the results artifact
//! - `report`: Render the compliance report from a results artifact
//! - `diff-report`: Render the manifest diff between two directories
//! - `test-local`: Build one overlay with kustomize and test it locally

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};

use policy_gate_core::{
    collect_manifest_diffs, load_entries, write_results_json, ComplianceReport, DiffReport,
    EvaluationMode, PolicyConfig,
};
use policy_gate_eval::{
    BuildSettings, EngineSettings, KustomizeBuilder, LocalHarness, LocalTest, OpaEngine,
    PolicyEvaluator,
};

#[derive(Parser)]
#[command(name = "policy-gate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Policy-as-code checks for Kubernetes manifests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate policies against a directory of rendered manifests
    Evaluate {
        /// Which policies to run
        #[arg(value_enum)]
        mode: Mode,

        /// Directory of rendered `*.yaml` manifests
        manifests_dir: PathBuf,

        /// Policy configuration file
        config_file: PathBuf,

        /// Directory the config's `filePath` entries are relative to
        policies_dir: PathBuf,

        /// Results file (default: policy-results-<mode>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Render the compliance report for a results file
    Report {
        /// Results file written by `evaluate`
        results_file: PathBuf,
    },

    /// Render the manifest diff report
    DiffReport {
        /// Manifests rendered from the base branch
        before_dir: PathBuf,

        /// Manifests rendered from the pull request
        after_dir: PathBuf,
    },

    /// Build one overlay and test it against a single policy
    TestLocal {
        /// Service name
        #[arg(default_value = "my-app")]
        service: String,

        /// Environment name
        #[arg(default_value = "stg")]
        environment: String,

        /// Policy file to test
        #[arg(default_value = "policies/ha.opa")]
        policy_path: PathBuf,

        /// kustomize executable
        #[arg(long, env = "POLICY_GATE_KUSTOMIZE_BIN", default_value = "kustomize")]
        kustomize_bin: String,

        /// Root holding services/<service>/environments/<environment>
        #[arg(long, default_value = "manifests")]
        manifests_root: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Only policies currently at BLOCKING level
    Blocking,
    /// Every active policy
    All,
}

impl From<Mode> for EvaluationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Blocking => EvaluationMode::Blocking,
            Mode::All => EvaluationMode::All,
        }
    }
}

#[derive(Args)]
struct EngineArgs {
    /// OPA executable
    #[arg(long, env = "POLICY_GATE_OPA_BIN", default_value = "opa")]
    opa_bin: String,

    /// Per-call engine timeout in seconds (0 disables)
    #[arg(long, env = "POLICY_GATE_ENGINE_TIMEOUT_SECS", default_value_t = 0)]
    engine_timeout_secs: u64,

    /// Fail resources when the engine errors instead of passing them
    #[arg(
        long,
        env = "POLICY_GATE_FAIL_CLOSED",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    fail_closed: bool,
}

impl EngineArgs {
    fn settings(&self) -> EngineSettings {
        let settings = EngineSettings::default()
            .with_program(&self.opa_bin)
            .with_timeout(self.engine_timeout_secs);
        if self.fail_closed {
            settings.fail_closed()
        } else {
            settings
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    policy_gate_core::init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Evaluate {
            mode,
            manifests_dir,
            config_file,
            policies_dir,
            output,
            engine,
        } => {
            cmd_evaluate(
                mode.into(),
                &manifests_dir,
                &config_file,
                &policies_dir,
                output,
                engine.settings(),
            )
            .await
        }
        Commands::Report { results_file } => cmd_report(&results_file),
        Commands::DiffReport {
            before_dir,
            after_dir,
        } => cmd_diff_report(&before_dir, &after_dir),
        Commands::TestLocal {
            service,
            environment,
            policy_path,
            kustomize_bin,
            manifests_root,
            engine,
        } => {
            let test = LocalTest {
                service,
                environment,
                policy_path,
            };
            let build = BuildSettings::default()
                .with_program(kustomize_bin)
                .with_manifests_root(manifests_root);
            cmd_test_local(&test, build, engine.settings()).await
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn cmd_evaluate(
    mode: EvaluationMode,
    manifests_dir: &Path,
    config_file: &Path,
    policies_dir: &Path,
    output: Option<PathBuf>,
    settings: EngineSettings,
) -> Result<ExitCode> {
    let config = PolicyConfig::load(config_file)
        .with_context(|| format!("Failed to load policy config {}", config_file.display()))?;
    info!(
        config = %config_file.display(),
        policies = config.policies.len(),
        "Loaded policy config"
    );

    let failure_mode = settings.failure_mode;
    let evaluator = PolicyEvaluator::new(Arc::new(OpaEngine::new(settings)), mode)
        .with_failure_mode(failure_mode);
    let results = evaluator
        .evaluate(&config, manifests_dir, policies_dir)
        .await
        .context("Policy evaluation failed")?;

    let output = output.unwrap_or_else(|| mode.results_filename());
    write_results_json(&output, &results)?;
    println!(
        "Policy evaluation complete. Results saved to {}",
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_report(results_file: &Path) -> Result<ExitCode> {
    let entries = load_entries(results_file)?;
    println!("{}", ComplianceReport::new(&entries).render_markdown());
    Ok(ExitCode::SUCCESS)
}

fn cmd_diff_report(before_dir: &Path, after_dir: &Path) -> Result<ExitCode> {
    let records = collect_manifest_diffs(before_dir, after_dir)?;
    println!("{}", DiffReport::new(&records).render_markdown());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_test_local(
    test: &LocalTest,
    build: BuildSettings,
    settings: EngineSettings,
) -> Result<ExitCode> {
    let failure_mode = settings.failure_mode;
    let harness = LocalHarness::new(
        Arc::new(KustomizeBuilder::new(build)),
        Arc::new(OpaEngine::new(settings)),
    )
    .with_failure_mode(failure_mode);

    let mut stdout = std::io::stdout();
    match harness.run(test, &mut stdout).await {
        Ok(outcome) if outcome.all_passed() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => {
            eprintln!("❌ {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
