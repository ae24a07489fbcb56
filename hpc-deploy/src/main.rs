// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line driver: load a configuration, synthesize the deployment,
//! check it, and write the assembly.

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use clap::Subcommand;
use hpc_checks::check_assembly;
use hpc_checks::Suppression;
use hpc_config::DeployConfig;
use hpc_config::DeployEnv;
use hpc_stacks::app::synthesize;
use slog::info;
use slog::warn;
use slog::Drain;
use slog::Logger;
use slog_term::FullFormat;
use slog_term::TermDecorator;

/// Synthesize the CloudFormation assembly for an HPC cluster deployment.
#[derive(Debug, Parser)]
#[command(name = "hpc-deploy")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the deployment configuration document
    #[clap(
        short = 'c',
        long,
        env = hpc_config::CONFIG_ENV_VAR,
        default_value = hpc_config::DEFAULT_CONFIG_PATH,
        global = true
    )]
    config: Utf8PathBuf,

    /// AWS account the deployment targets
    #[clap(long, env = hpc_config::ACCOUNT_ENV_VAR, global = true)]
    account: Option<String>,

    /// AWS region the deployment targets
    #[clap(long, env = hpc_config::REGION_ENV_VAR, global = true)]
    region: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Synthesize the deployment and write the assembly to a directory
    Synth {
        /// Directory the templates and manifest are written into
        #[clap(short = 'o', long, default_value = "out")]
        outdir: Utf8PathBuf,
    },
    /// Synthesize the deployment and print the check report without
    /// writing anything
    Check,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log = make_logger();

    let config = DeployConfig::from_file(&args.config)?;
    info!(
        log, "loaded configuration";
        "path" => %args.config,
        "cluster" => &config.label,
    );
    let env = deploy_env(&args)?;

    let assembly = synthesize(&log, &config, &env)?;
    let report = check_assembly(&assembly, &default_suppressions());

    match args.command {
        Command::Synth { outdir } => {
            if report.has_fatal_notes() {
                bail!("the assembly failed checks:\n{}", report);
            }
            for note in report.notes() {
                warn!(log, "check finding"; "note" => %note);
            }
            let written = assembly
                .write_to_dir(&outdir)
                .with_context(|| format!("writing the assembly to {outdir}"))?;
            info!(
                log, "wrote assembly";
                "dir" => %outdir,
                "files" => written.len(),
            );
            Ok(())
        }
        Command::Check => {
            print!("{}", report);
            if report.has_fatal_notes() {
                bail!("the assembly failed checks");
            }
            Ok(())
        }
    }
}

fn make_logger() -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, slog::o!())
}

fn deploy_env(args: &Args) -> Result<DeployEnv> {
    let account = args.account.clone().with_context(|| {
        format!(
            "an AWS account is required (--account or ${})",
            hpc_config::ACCOUNT_ENV_VAR
        )
    })?;
    let region = args.region.clone().with_context(|| {
        format!(
            "an AWS region is required (--region or ${})",
            hpc_config::REGION_ENV_VAR
        )
    })?;
    Ok(DeployEnv { account, region })
}

/// The two findings this deployment knowingly accepts.
fn default_suppressions() -> Vec<Suppression> {
    vec![
        Suppression::new(
            hpc_stacks::network::STACK_NAME,
            "flow-logs",
            "VPC flow logs not desirable for testing.",
        ),
        Suppression::new(
            hpc_stacks::lustre::STACK_NAME,
            "bucket-access-logs",
            "S3 server access logging not desirable for testing.",
        ),
    ]
}
