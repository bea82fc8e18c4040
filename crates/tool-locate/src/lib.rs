//! # tool-locate
//!
//! Find the external rasterizer executables that `printsize` shells out to,
//! without touching the network or caching anything between calls.
//!
//! ## How it works
//!
//! [`locate`] resolves a [`ToolSpec`] in a fixed order (first match wins):
//!
//! 1. The tool's environment override (e.g. `INKSCAPE_EXE`), if it is set
//!    and points at an executable file.
//! 2. A `PATH` search for each of the tool's program names.
//! 3. The tool's well-known install locations for the current OS.
//!
//! The lookup is pure: it only reads the environment and stats files, so it
//! is safe to call once per conversion.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tool_locate::{locate, GHOSTSCRIPT};
//!
//! match locate(&GHOSTSCRIPT) {
//!     Ok(path) => println!("gs at {}", path.display()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ## Well-known locations
//!
//! | Tool        | OS      | Candidates                                              |
//! |-------------|---------|---------------------------------------------------------|
//! | Ghostscript | macOS   | `/opt/homebrew/bin/gs`, `/usr/local/bin/gs`             |
//! | Ghostscript | Linux   | `/usr/bin/gs`, `/usr/local/bin/gs`                      |
//! | Inkscape    | macOS   | `/Applications/Inkscape.app/…/inkscape`, `/opt/homebrew/bin/inkscape` |
//! | Inkscape    | Linux   | `/usr/bin/inkscape`, `/snap/bin/inkscape`               |
//! | Inkscape    | Windows | `C:\Program Files\Inkscape\bin\inkscape.exe` (+3 more)  |

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Tool descriptions ────────────────────────────────────────────────────────

/// Static description of an external executable and where to look for it.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Human-readable tool name used in diagnostics.
    pub name: &'static str,
    /// Program names tried on `PATH`, in order.
    pub programs: &'static [&'static str],
    /// Environment variable that may point straight at the executable.
    pub env_override: Option<&'static str>,
    /// `(os, path)` pairs; `os` matches [`std::env::consts::OS`].
    pub install_locations: &'static [(&'static str, &'static str)],
    /// Remediation text appended to "not found" errors.
    pub install_hint: &'static str,
}

/// Ghostscript: rasterizes PDF, PostScript, EPS and Illustrator files.
pub const GHOSTSCRIPT: ToolSpec = ToolSpec {
    name: "Ghostscript",
    programs: &["gs", "gswin64c", "gswin32c"],
    env_override: None,
    install_locations: &[
        ("macos", "/opt/homebrew/bin/gs"),
        ("macos", "/usr/local/bin/gs"),
        ("linux", "/usr/bin/gs"),
        ("linux", "/usr/local/bin/gs"),
    ],
    install_hint: "Install Ghostscript (e.g. `brew install ghostscript`, \
                   `apt install ghostscript`) or convert the file to PNG/JPG first.",
};

/// Inkscape: fallback SVG rasterizer.
pub const INKSCAPE: ToolSpec = ToolSpec {
    name: "Inkscape",
    programs: &["inkscape"],
    env_override: Some("INKSCAPE_EXE"),
    install_locations: &[
        ("windows", r"C:\Program Files\Inkscape\bin\inkscape.exe"),
        ("windows", r"C:\Program Files\Inkscape\inkscape.exe"),
        ("windows", r"C:\Program Files (x86)\Inkscape\bin\inkscape.exe"),
        ("windows", r"C:\Program Files (x86)\Inkscape\inkscape.exe"),
        ("macos", "/Applications/Inkscape.app/Contents/MacOS/inkscape"),
        ("macos", "/opt/homebrew/bin/inkscape"),
        ("linux", "/usr/bin/inkscape"),
        ("linux", "/snap/bin/inkscape"),
    ],
    install_hint: "Install Inkscape and add it to PATH, or set INKSCAPE_EXE \
                   to the inkscape executable.",
};

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by tool lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// None of the candidate locations held an executable.
    #[error("{tool} not found (searched PATH and {} install location(s)).\n{hint}", .searched.len())]
    NotFound {
        tool: &'static str,
        searched: Vec<PathBuf>,
        hint: &'static str,
    },
}

// ── Lookup environment ───────────────────────────────────────────────────────

/// The slice of process state a lookup depends on.
///
/// [`Environment::current`] snapshots the real process; tests build one by
/// hand so lookups stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Value of `PATH`.
    pub path: Option<OsString>,
    /// Value of the tool's override variable, already looked up.
    pub override_value: Option<OsString>,
    /// Operating system name, as in [`std::env::consts::OS`].
    pub os: &'static str,
}

impl Environment {
    /// Snapshot the current process environment for `spec`.
    pub fn current(spec: &ToolSpec) -> Self {
        Self {
            path: std::env::var_os("PATH"),
            override_value: spec.env_override.and_then(std::env::var_os),
            os: std::env::consts::OS,
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate `spec` using the current process environment.
pub fn locate(spec: &ToolSpec) -> Result<PathBuf, LocateError> {
    locate_in(spec, &Environment::current(spec))
}

/// Locate `spec` against an explicit [`Environment`].
pub fn locate_in(spec: &ToolSpec, env: &Environment) -> Result<PathBuf, LocateError> {
    // 1. Environment variable override. A stale or non-executable value falls through.
    if let Some(value) = env.override_value.as_ref().filter(|v| !v.is_empty()) {
        let p = PathBuf::from(value);
        if is_executable(&p) {
            return Ok(p);
        }
    }

    // 2. PATH search.
    if let Some(path_var) = env.path.as_deref() {
        if let Some(found) = search_path(spec.programs, path_var) {
            return Ok(found);
        }
    }

    // 3. Well-known install locations.
    let candidates = well_known_locations(spec, env.os);
    if let Some(found) = candidates.iter().find(|p| is_executable(p)) {
        return Ok(found.clone());
    }

    Err(LocateError::NotFound {
        tool: spec.name,
        searched: candidates,
        hint: spec.install_hint,
    })
}

/// Install locations of `spec` that apply to `os`.
pub fn well_known_locations(spec: &ToolSpec, os: &str) -> Vec<PathBuf> {
    spec.install_locations
        .iter()
        .filter(|(candidate_os, _)| *candidate_os == os)
        .map(|(_, p)| PathBuf::from(p))
        .collect()
}

/// Search every directory of `path_var` for the first of `programs`.
///
/// Program names without an extension get the platform executable suffix
/// appended, so `"gs"` matches `gs.exe` on Windows.
pub fn search_path(programs: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = std::env::split_paths(path_var).collect();
    programs.iter().find_map(|program| {
        let file_name = with_exe_suffix(program);
        dirs.iter()
            .filter(|d| !d.as_os_str().is_empty())
            .map(|d| d.join(&file_name))
            .find(|candidate| is_executable(candidate))
    })
}

/// `true` when `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn with_exe_suffix(program: &str) -> String {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || Path::new(program).extension().is_some() {
        program.to_string()
    } else {
        format!("{program}{suffix}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
