// DocScan - platform/fs.rs
//
// Handing the persisted artifact to other applications.
//
// These are the open/share collaborators: they receive an `ArtifactLocation`
// from `ArtifactStore::locate` and launch the OS helper for it. Failures are
// `ConsumptionError`s; callers report them through
// `SessionController::publish_notification` rather than the sticky snapshot.

use crate::core::model::ArtifactLocation;
use crate::util::constants::OPEN_FAILED_PREFIX;
use crate::util::error::ConsumptionError;
use std::path::Path;
use std::process::Command;

/// Open `location` with the system's default PDF viewer.
///
/// Platform behaviour:
/// - **Windows**: `explorer "<path>"`
/// - **macOS**: `open "<path>"`
/// - **Linux**: `xdg-open "<path>"`
///
/// The viewer is spawned detached; only a launch failure is reported.
pub fn open_document(location: &ArtifactLocation) -> Result<(), ConsumptionError> {
    ensure_present(location)?;
    launch(open_command(&location.path)?, &location.path)
}

/// Open the system file manager at the artifact.
///
/// - **Windows**: `explorer.exe /select,"<path>"` (file pre-selected)
/// - **macOS**: `open -R "<path>"` (revealed in Finder)
/// - **Linux**: `xdg-open "<parent>"` (most file managers cannot select a
///   single file from the command line)
pub fn reveal_in_file_manager(location: &ArtifactLocation) -> Result<(), ConsumptionError> {
    ensure_present(location)?;
    launch(reveal_command(&location.path)?, &location.path)
}

/// Notification text for a failed open attempt.
pub fn open_failure_message(err: &ConsumptionError) -> String {
    format!("{OPEN_FAILED_PREFIX}: {err}")
}

fn ensure_present(location: &ArtifactLocation) -> Result<(), ConsumptionError> {
    if location.path.is_file() {
        Ok(())
    } else {
        Err(ConsumptionError::NoArtifact)
    }
}

fn launch(
    (program, mut command): (&'static str, Command),
    path: &Path,
) -> Result<(), ConsumptionError> {
    match command.spawn() {
        Ok(_child) => {
            tracing::info!(program, path = %path.display(), "Artifact handed to OS helper");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(program, path = %path.display(), error = %e, "OS helper launch failed");
            Err(ConsumptionError::Launch {
                program,
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

#[allow(unreachable_code)]
fn open_command(path: &Path) -> Result<(&'static str, Command), ConsumptionError> {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("explorer");
        cmd.arg(path);
        return Ok(("explorer", cmd));
    }
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        return Ok(("open", cmd));
    }
    #[cfg(target_os = "linux")]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        return Ok(("xdg-open", cmd));
    }
    let _ = path;
    Err(ConsumptionError::Unsupported)
}

#[allow(unreachable_code)]
fn reveal_command(path: &Path) -> Result<(&'static str, Command), ConsumptionError> {
    #[cfg(target_os = "windows")]
    {
        // `/select,<path>` must be a single argument with no space after the comma.
        let mut cmd = Command::new("explorer");
        cmd.arg(format!("/select,{}", path.display()));
        return Ok(("explorer", cmd));
    }
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg("-R").arg(path);
        return Ok(("open", cmd));
    }
    #[cfg(target_os = "linux")]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path.parent().unwrap_or(path));
        return Ok(("xdg-open", cmd));
    }
    let _ = path;
    Err(ConsumptionError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    #[test]
    fn test_open_missing_artifact_is_no_artifact() {
        let location = ArtifactLocation {
            path: PathBuf::from("/definitely/not/here/Scan.pdf"),
            size_bytes: 0,
            saved_at: Utc::now(),
        };
        assert!(matches!(
            open_document(&location),
            Err(ConsumptionError::NoArtifact)
        ));
        assert!(matches!(
            reveal_in_file_manager(&location),
            Err(ConsumptionError::NoArtifact)
        ));
    }

    #[test]
    fn test_open_failure_message_has_prefix() {
        let msg = open_failure_message(&ConsumptionError::NoArtifact);
        assert!(msg.starts_with("Failed to open PDF: "), "got {msg}");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reveal_targets_parent_directory_on_linux() {
        let (program, cmd) = reveal_command(Path::new("/data/Scan.pdf")).unwrap();
        assert_eq!(program, "xdg-open");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec![std::ffi::OsStr::new("/data")]);
    }
}
