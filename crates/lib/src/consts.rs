/// Application name, as shown in usage and version output.
pub const APP_NAME: &str = "rtcbuild";

/// Source repository built by default.
pub const DEFAULT_REPO_URL: &str = "https://chromium.googlesource.com/external/webrtc";

/// Repository the bundled toolchain (depot_tools) is cloned from.
pub const DEFAULT_TOOLCHAIN_URL: &str = "https://chromium.googlesource.com/chromium/tools/depot_tools.git";

/// Directory holding the bundled toolchain, relative to the working directory.
pub const DEFAULT_TOOLCHAIN_DIR: &str = "depot_tools";

/// Directory whose files are copied into every package.
pub const DEFAULT_RESOURCE_DIR: &str = "resource";

/// Root of the per-platform patch set.
pub const DEFAULT_PATCH_DIR: &str = "patches";

/// Default output directory.
pub const DEFAULT_OUT_DIR: &str = "out";

/// Default CPU when none is requested.
pub const DEFAULT_TARGET_CPU: &str = "x64";

/// Configurations built when `-n` is not given.
pub const DEFAULT_CONFIGS: &str = "Debug Release";

pub const DEFAULT_FILENAME_PATTERN: &str = "webrtc-%rn%-%sr%-%to%-%tc%";
pub const DEFAULT_NAME_PATTERN: &str = "webrtc";
pub const DEFAULT_VERSION_PATTERN: &str = "%rn%";

/// Length of the abbreviated SHA exposed as `%sr%`.
pub const SHORT_SHA_LEN: usize = 7;

/// Name of the checked-out source tree inside the output directory.
pub const SOURCE_DIR: &str = "src";

/// Combined static library produced per configuration.
pub const COMBINED_LIB_UNIX: &str = "libwebrtc_full.a";
pub const COMBINED_LIB_WINDOWS: &str = "webrtc_full.lib";

/// File written into the staged package holding the revision number.
pub const VERSION_FILE: &str = "VERSION";
