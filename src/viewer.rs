use anyhow::{bail, Context, Result};
use std::{
    path::Path,
    process::{Command, Stdio},
};

/// Spawns the external animation viewer, optionally handing it one asset
/// path. Fire and forget: the child is detached and never waited on.
pub fn launch(executable: &Path, asset: Option<&Path>) -> Result<()> {
    if !executable.is_file() {
        bail!("viewer executable not found at {}", executable.display());
    }

    let mut command = Command::new(executable);
    if let Some(asset) = asset {
        command.arg(asset);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("launch viewer {}", executable.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_executable_names_the_expected_path() {
        let missing = PathBuf::from("/definitely/not/here/viewer");
        let err = launch(&missing, None).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here/viewer"));
    }

    #[cfg(unix)]
    #[test]
    fn existing_executable_spawns() {
        let exe = Path::new("/bin/true");
        if !exe.is_file() {
            return;
        }
        launch(exe, Some(Path::new("/tmp"))).unwrap();
    }
}
