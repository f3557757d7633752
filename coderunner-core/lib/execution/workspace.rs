use std::path::{Path, PathBuf};

use coderunner_utils::{GUEST_WORKDIR, WORKSPACE_DIR_PREFIX};
use tempfile::TempDir;

use crate::{registry::LaunchPlan, runtime::BindMount, CoderunnerResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The ephemeral host directory holding a submission while it runs.
///
/// The directory is removed by [`Workspace::close`], or on drop if that is never reached.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    source_path: PathBuf,
    guest_path: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Workspace {
    /// Creates a workspace in the system temp directory and writes the source into it.
    pub async fn create(plan: &LaunchPlan, source: &str) -> CoderunnerResult<Self> {
        Self::create_in(std::env::temp_dir(), plan, source).await
    }

    /// Creates a workspace under `parent` and writes the source into it.
    pub async fn create_in(
        parent: impl AsRef<Path>,
        plan: &LaunchPlan,
        source: &str,
    ) -> CoderunnerResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_DIR_PREFIX)
            .tempdir_in(parent)?;

        let source_path = dir.path().join(&plan.file_name);
        tokio::fs::write(&source_path, source).await?;

        // The sandbox user is not the file's owner.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&source_path, std::fs::Permissions::from_mode(0o644))
                .await?;
        }

        tracing::trace!("created workspace {}", dir.path().display());

        Ok(Self {
            dir,
            source_path,
            guest_path: format!("{}/{}", GUEST_WORKDIR, plan.file_name),
        })
    }

    /// The workspace directory on the host.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The source file on the host.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// The read-only mount placing the source under the guest working directory.
    pub fn bind(&self) -> BindMount {
        BindMount::read_only(&self.source_path, &self.guest_path)
    }

    /// Removes the workspace from disk.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Language;

    #[tokio::test]
    async fn test_workspace_lifecycle() -> CoderunnerResult<()> {
        let parent = TempDir::new()?;
        let plan = Language::Python.launch_plan("print(1)");

        let workspace = Workspace::create_in(parent.path(), &plan, "print(1)").await?;
        let dir = workspace.path().to_path_buf();

        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("codezy-"));
        assert_eq!(tokio::fs::read_to_string(workspace.source_path()).await?, "print(1)");

        let bind = workspace.bind();
        assert_eq!(bind.guest, "/app/main.py");
        assert!(bind.read_only);

        workspace.close()?;
        assert!(!dir.exists());
        Ok(())
    }
}
