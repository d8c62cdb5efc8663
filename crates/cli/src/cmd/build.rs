//! Implementation of the build command.
//!
//! Turns the parsed flags into a [`BuildRequest`], wires the real
//! collaborators into a [`Pipeline`] and prints a summary of the result.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use rtcbuild_lib::compile::GnCompiler;
use rtcbuild_lib::package::LocalPackager;
use rtcbuild_lib::pattern::Patterns;
use rtcbuild_lib::pipeline::{BuildOutcome, Pipeline, PipelineError};
use rtcbuild_lib::request::{Blacklist, BuildRequest, ConfigSet, RequestError};
use rtcbuild_lib::revision::GitVersionControl;
use rtcbuild_lib::source::GitPatcher;
use rtcbuild_lib::tool::Toolchain;
use rtcbuild_lib::validate::HostDependencyChecker;

use crate::Cli;
use crate::output::{format_elapsed, print_info, print_json, print_stat, print_success};

/// Execute a build.
///
/// Runs every stage of the pipeline and prints the resolved revision, the
/// configurations built and the package files produced. Any stage failure is
/// returned with the stage named in the message.
pub fn cmd_build(cli: &Cli) -> Result<()> {
  let request = build_request(cli).map_err(PipelineError::from)?;

  // Tools run from inside the output tree, so the toolchain entry on PATH
  // must not be relative
  let toolchain_dir = std::path::absolute(&cli.toolchain_dir).context("Failed to resolve toolchain directory")?;
  debug!(toolchain = %toolchain_dir.display(), "using toolchain");
  let toolchain = Toolchain::new(toolchain_dir);

  let pipeline = Pipeline::new(
    GitVersionControl::new(cli.repo_url.clone(), toolchain.clone()),
    HostDependencyChecker::new(toolchain.clone(), cli.toolchain_url.clone()),
    GitPatcher::new(cli.patch_dir.clone(), toolchain.clone()),
    GnCompiler::new(toolchain.clone()),
    LocalPackager::new(cli.resource_dir.clone(), toolchain),
  );

  if !cli.output.is_json() {
    print_info(&format!("Building WebRTC into {}", request.out_dir.display()));
  }

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(pipeline.run(&request))?;
  let elapsed = started.elapsed();

  if cli.output.is_json() {
    print_json(&serde_json::json!({
      "target": {
        "host": outcome.target.host,
        "os": outcome.target.os,
        "cpu": outcome.target.cpu,
      },
      "revision": outcome.revision,
      "configs": request.configs.iter().collect::<Vec<_>>(),
      "package": outcome.descriptor,
      "files": outcome.packages,
      "elapsed_secs": elapsed.as_secs(),
    }))?;
  } else {
    print_summary(&request, &outcome);
    print_stat("Elapsed", &format_elapsed(elapsed));
  }

  Ok(())
}

/// Assemble and validate the request described by the command line.
fn build_request(cli: &Cli) -> Result<BuildRequest, RequestError> {
  BuildRequest {
    out_dir: cli.out_dir.clone(),
    branch: cli.branch.clone(),
    revision: cli.revision.clone(),
    target_os: cli.target_os.clone(),
    target_cpu: cli.target_cpu.clone(),
    configs: ConfigSet::parse(&cli.configs)?,
    blacklist: Blacklist::parse(&cli.blacklist),
    enable_rtti: cli.rtti == 1,
    express: cli.express,
    debian: cli.debian,
    patterns: Patterns {
      filename: cli.filename_pattern.clone(),
      name: cli.name_pattern.clone(),
      version: cli.version_pattern.clone(),
    },
  }
  .validate()
}

fn print_summary(request: &BuildRequest, outcome: &BuildOutcome) {
  print_success(&format!(
    "Built {} {} r{}",
    outcome.descriptor.name, outcome.descriptor.version, outcome.revision.number
  ));
  print_stat("Revision", &format!("{} ({})", outcome.revision.sha, outcome.revision.number));
  print_stat("Target", &outcome.target.to_string());
  print_stat("Configurations", &request.configs.to_string());
  for file in &outcome.packages {
    print_stat("Package", &file.display().to_string());
  }
}
