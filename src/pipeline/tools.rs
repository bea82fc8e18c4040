//! Running external rasterizers (Ghostscript, Inkscape).
//!
//! Every invocation is blocking. stdin is closed, stdout and stderr are
//! drained on their own threads so a chatty tool can never fill a pipe and
//! stall, and an optional timeout kills the child.

use crate::config::ToolLocation;
use crate::error::{truncate_diagnostics, ToolError};
use crate::pipeline::format::PageKind;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tool_locate::ToolSpec;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Turn a configured [`ToolLocation`] into an executable path.
pub fn resolve_tool(location: &ToolLocation, spec: &ToolSpec) -> Result<PathBuf, ToolError> {
    match location {
        ToolLocation::Disabled => Err(ToolError::Disabled { tool: spec.name }),
        ToolLocation::Path(path) => Ok(path.clone()),
        ToolLocation::Auto => Ok(tool_locate::locate(spec)?),
    }
}

/// Ghostscript arguments rendering the first page of `input` to an RGBA PNG.
pub fn ghostscript_args(kind: PageKind, dpi: u32, output: &Path, input: &Path) -> Vec<OsString> {
    let crop = match kind {
        PageKind::PostScript => "-dEPSCrop",
        PageKind::Pdf => "-dUseCropBox",
    };

    let mut output_arg = OsString::from("-sOutputFile=");
    output_arg.push(output);

    vec![
        "-dSAFER".into(),
        "-dBATCH".into(),
        "-dNOPAUSE".into(),
        crop.into(),
        "-dFirstPage=1".into(),
        "-dLastPage=1".into(),
        "-sDEVICE=pngalpha".into(),
        format!("-r{dpi}").into(),
        output_arg,
        input.as_os_str().to_owned(),
    ]
}

/// Inkscape 1.x arguments exporting `input` to PNG at `dpi`.
pub fn inkscape_args(input: &Path, dpi: u32, output: &Path) -> Vec<OsString> {
    let mut filename_arg = OsString::from("--export-filename=");
    filename_arg.push(output);

    vec![
        input.as_os_str().to_owned(),
        "--export-type=png".into(),
        format!("--export-dpi={dpi}").into(),
        filename_arg,
    ]
}

/// Run `program` to completion.
///
/// # Errors
/// - [`ToolError::Spawn`] if the process cannot be started or waited on
/// - [`ToolError::TimedOut`] if it outlives `timeout` (the child is killed)
/// - [`ToolError::Failed`] on a non-zero exit, carrying stderr (or stdout
///   when stderr is empty) truncated to
///   [`MAX_DIAGNOSTIC_CHARS`](crate::error::MAX_DIAGNOSTIC_CHARS)
pub fn run(
    tool: &'static str,
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<(), ToolError> {
    let command = command_line(program, args);
    debug!("Running {tool}: {command}");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn { tool, source })?;

    let stdout_drain = drain(child.stdout.take());
    let stderr_drain = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, timeout).map_err(|source| ToolError::Spawn { tool, source })?;

    // A killed child may leave grandchildren holding the pipes open, so the
    // drain threads are detached rather than joined on timeout.
    let Some(status) = status else {
        return Err(ToolError::TimedOut {
            tool,
            secs: timeout.map(|t| t.as_secs()).unwrap_or_default(),
        });
    };

    let stdout = collect(stdout_drain);
    let stderr = collect(stderr_drain);

    if status.success() {
        debug!("{tool} finished ({} bytes of output)", stdout.len() + stderr.len());
        return Ok(());
    }

    let text = if stderr.iter().all(u8::is_ascii_whitespace) {
        String::from_utf8_lossy(&stdout).into_owned()
    } else {
        String::from_utf8_lossy(&stderr).into_owned()
    };

    Err(ToolError::Failed {
        tool,
        status: status.to_string(),
        command,
        diagnostics: truncate_diagnostics(&text),
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Shell-like rendering of a command for diagnostics.
fn command_line(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| {
            let part = part.to_string_lossy();
            if part.contains(char::is_whitespace) {
                format!("\"{part}\"")
            } else {
                part.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn ghostscript_crop_flag_depends_on_page_kind() {
        let eps = strings(&ghostscript_args(
            PageKind::PostScript,
            300,
            Path::new("/tmp/out.png"),
            Path::new("in.eps"),
        ));
        assert!(eps.contains(&"-dEPSCrop".to_string()));
        assert!(eps.contains(&"-r300".to_string()));
        assert!(eps.contains(&"-sOutputFile=/tmp/out.png".to_string()));
        assert_eq!(eps.last().map(String::as_str), Some("in.eps"));

        let pdf = strings(&ghostscript_args(
            PageKind::Pdf,
            150,
            Path::new("o.png"),
            Path::new("in.pdf"),
        ));
        assert!(pdf.contains(&"-dUseCropBox".to_string()));
        assert!(pdf.contains(&"-sDEVICE=pngalpha".to_string()));
        assert!(pdf.contains(&"-dLastPage=1".to_string()));
    }

    #[test]
    fn inkscape_arguments() {
        let args = strings(&inkscape_args(Path::new("a.svg"), 96, Path::new("b.png")));
        assert_eq!(
            args,
            vec!["a.svg", "--export-type=png", "--export-dpi=96", "--export-filename=b.png"]
        );
    }

    #[test]
    fn disabled_tool_is_never_located() {
        let err = resolve_tool(&ToolLocation::Disabled, &tool_locate::GHOSTSCRIPT).unwrap_err();
        assert!(matches!(err, ToolError::Disabled { tool: "Ghostscript" }));

        let explicit = resolve_tool(&ToolLocation::Path("/opt/gs".into()), &tool_locate::GHOSTSCRIPT);
        assert_eq!(explicit.unwrap(), PathBuf::from("/opt/gs"));
    }

    #[test]
    fn command_line_quotes_whitespace() {
        let line = command_line(
            Path::new("gs"),
            &["-r300".into(), "my file.pdf".into()],
        );
        assert_eq!(line, "gs -r300 \"my file.pdf\"");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = run("Nope", Path::new("/definitely/not/a/tool"), &[], None).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { tool: "Nope", .. }));
    }

    #[cfg(unix)]
    #[test]
    fn failure_captures_stderr() {
        let args: Vec<OsString> = vec!["-c".into(), "echo boom >&2; exit 3".into()];
        let err = run("sh", Path::new("/bin/sh"), &args, None).unwrap_err();
        match err {
            ToolError::Failed { diagnostics, status, .. } => {
                assert_eq!(diagnostics, "boom");
                assert!(status.contains('3'), "{status}");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn failure_falls_back_to_stdout() {
        let args: Vec<OsString> = vec!["-c".into(), "echo from-stdout; exit 1".into()];
        let err = run("sh", Path::new("/bin/sh"), &args, None).unwrap_err();
        assert!(matches!(err, ToolError::Failed { ref diagnostics, .. } if diagnostics == "from-stdout"));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_the_child() {
        let args: Vec<OsString> = vec!["-c".into(), "exec sleep 30".into()];
        let started = Instant::now();
        let err = run("sh", Path::new("/bin/sh"), &args, Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { tool: "sh", .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
