use super::{ConvertError, ConvertRequest, Converter};
use std::process::Command;
use tracing::debug;

/// Runs an external converter as `<binary> <options...> -s <source> -o <target>`.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    binary: String,
}

impl PandocConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// The command a request runs. An override from the option file wins over
    /// the configured binary.
    pub fn command(&self, request: &ConvertRequest<'_>) -> Command {
        let program = request.program.unwrap_or(&self.binary);
        let mut cmd = Command::new(program);
        cmd.args(request.args())
            .arg("-s")
            .arg(request.source)
            .arg("-o")
            .arg(request.target);
        cmd
    }
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl Converter for PandocConverter {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<(), ConvertError> {
        let mut cmd = self.command(request);
        let program = cmd.get_program().to_string_lossy().to_string();
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|source| ConvertError::Spawn {
            program: program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(ConvertError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
