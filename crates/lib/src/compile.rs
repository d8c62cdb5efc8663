//! Build matrix compilation.
//!
//! Each configuration is generated with gn into `src/out/<config>`, built
//! with ninja, and its object files (minus the blacklist) are merged into a
//! single static library next to the build output.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::{COMBINED_LIB_UNIX, COMBINED_LIB_WINDOWS, SOURCE_DIR};
use crate::platform::Os;
use crate::request::{Blacklist, ConfigSet};
use crate::tool::{ToolError, Toolchain};

/// The whole build matrix, handed to the compiler in one piece.
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
  pub host: Os,
  pub out_dir: &'a Path,
  pub target_os: &'a str,
  pub target_cpu: &'a str,
  pub configs: &'a ConfigSet,
  pub blacklist: &'a Blacklist,
}

/// Compiles every configuration of a job; any failure fails the job.
#[allow(async_fn_in_trait)]
pub trait Compiler {
  async fn compile(&self, job: &CompileJob<'_>) -> Result<(), ToolError>;
}

/// Name of the combined library on `host`.
pub fn combined_library_name(host: Os) -> &'static str {
  if host.is_windows() {
    COMBINED_LIB_WINDOWS
  } else {
    COMBINED_LIB_UNIX
  }
}

/// Build directory of one configuration.
pub fn config_dir(out_dir: &Path, config: &str) -> PathBuf {
  out_dir.join(SOURCE_DIR).join("out").join(config)
}

/// gn arguments for one configuration.
pub fn gn_args(target_os: &str, target_cpu: &str, config: &str) -> String {
  let is_debug = config == "Debug";
  format!(
    "target_os=\"{target_os}\" target_cpu=\"{target_cpu}\" is_debug={is_debug} \
     is_component_build=false rtc_include_tests=false treat_warnings_as_errors=false"
  )
}

/// Object files under `obj_dir` not excluded by `blacklist`, sorted.
pub fn collect_objects(obj_dir: &Path, blacklist: &Blacklist) -> Result<Vec<PathBuf>, ToolError> {
  let mut objects = Vec::new();
  for entry in WalkDir::new(obj_dir) {
    let entry = entry.map_err(|e| ToolError::Io(e.into()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    if !path.extension().is_some_and(|ext| ext == "o" || ext == "obj") {
      continue;
    }
    let relative = path.strip_prefix(obj_dir).unwrap_or(path);
    if blacklist.excludes(&relative.to_string_lossy()) {
      debug!(object = %relative.display(), "blacklisted");
      continue;
    }
    objects.push(path.to_path_buf());
  }
  objects.sort();
  Ok(objects)
}

/// `ar` and `lib.exe` response file contents: one path per line, quoted when
/// it contains spaces.
pub fn response_file(objects: &[PathBuf]) -> String {
  let mut contents = String::new();
  for object in objects {
    let path = object.to_string_lossy();
    if path.contains(' ') {
      contents.push_str(&format!("\"{path}\"\n"));
    } else {
      contents.push_str(&path);
      contents.push('\n');
    }
  }
  contents
}

/// `libtool -filelist` contents: one raw path per line.
///
/// libtool reads each line verbatim, so quoting would become part of the name.
pub fn file_list(objects: &[PathBuf]) -> String {
  let mut contents = String::new();
  for object in objects {
    contents.push_str(&object.to_string_lossy());
    contents.push('\n');
  }
  contents
}

/// [`Compiler`] driving gn and ninja from the bundled toolchain.
#[derive(Debug, Clone)]
pub struct GnCompiler {
  toolchain: Toolchain,
}

impl GnCompiler {
  pub fn new(toolchain: Toolchain) -> Self {
    Self { toolchain }
  }

  async fn build_config(&self, job: &CompileJob<'_>, config: &str) -> Result<(), ToolError> {
    let src = job.out_dir.join(SOURCE_DIR);
    let build_dir = config_dir(job.out_dir, config);
    let relative_build_dir = Path::new("out").join(config);

    info!(config, target_os = job.target_os, target_cpu = job.target_cpu, "generating build files");
    self
      .toolchain
      .tool("gn")
      .arg("gen")
      .arg(&relative_build_dir)
      .arg(format!("--args={}", gn_args(job.target_os, job.target_cpu, config)))
      .current_dir(&src)
      .run()
      .await?;

    info!(config, "compiling");
    self
      .toolchain
      .tool("ninja")
      .arg("-C")
      .arg(&relative_build_dir)
      .current_dir(&src)
      .run()
      .await?;

    self.combine(job.host, &build_dir, job.blacklist).await
  }

  async fn combine(&self, host: Os, build_dir: &Path, blacklist: &Blacklist) -> Result<(), ToolError> {
    // The archiver runs inside build_dir, so every path handed to it must be absolute
    let build_dir = std::path::absolute(build_dir)?;
    let objects = collect_objects(&build_dir.join("obj"), blacklist)?;
    if objects.is_empty() {
      return Err(ToolError::NotFound(format!("object files under {}", build_dir.display())));
    }

    let library = build_dir.join(combined_library_name(host));
    if library.exists() {
      // ar appends to an existing archive
      tokio::fs::remove_file(&library).await?;
    }

    let rsp = build_dir.join("objects.rsp");
    let listing = match host {
      Os::Mac => file_list(&objects),
      Os::Linux | Os::Win => response_file(&objects),
    };
    tokio::fs::write(&rsp, listing).await?;
    info!(objects = objects.len(), library = %library.display(), "combining objects");

    let tool = match host {
      Os::Linux => self
        .toolchain
        .tool("ar")
        .arg("-rcs")
        .arg(&library)
        .arg(format!("@{}", rsp.display())),
      Os::Mac => self
        .toolchain
        .tool("libtool")
        .args(["-static", "-o"])
        .arg(&library)
        .arg("-filelist")
        .arg(&rsp),
      Os::Win => self
        .toolchain
        .tool("lib.exe")
        .arg(format!("/OUT:{}", library.display()))
        .arg(format!("@{}", rsp.display())),
    };
    tool.current_dir(&build_dir).run().await
  }
}

impl Compiler for GnCompiler {
  async fn compile(&self, job: &CompileJob<'_>) -> Result<(), ToolError> {
    info!(configs = %job.configs, blacklisted = job.blacklist.iter().count(), "building matrix");
    for config in job.configs.iter() {
      self.build_config(job, config).await?;
    }
    Ok(())
  }
}
