use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use log::trace;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{source_name} is unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
    #[error("unexpected output from {source_name}: {detail}")]
    MalformedOutput { source_name: String, detail: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("all {0} sampling rounds were degenerate")]
    NoUsableRounds(u32),
}

impl ProbeError {
    pub fn unavailable(source_name: impl Display, reason: impl Display) -> Self {
        ProbeError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_name: impl Display, detail: impl Display) -> Self {
        ProbeError::MalformedOutput {
            source_name: source_name.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Runs an external command and hands back its stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;
}

#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        trace!("running `{program} {}`", args.join(" "));

        // output() waits for the child and drops its pipes before returning
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ProbeError::unavailable(program, e))?;

        if !output.status.success() {
            return Err(ProbeError::unavailable(
                program,
                format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        String::from_utf8(output.stdout).map_err(|e| ProbeError::malformed(program, e))
    }
}

/// Something that exposes the kernel's cumulative CPU accounting table.
pub trait CounterSource {
    fn read_counters(&mut self) -> Result<String, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct ProcStat {
    path: PathBuf,
}

impl ProcStat {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for ProcStat {
    fn default() -> Self {
        Self::new("/proc/stat")
    }
}

impl CounterSource for ProcStat {
    fn read_counters(&mut self) -> Result<String, ProbeError> {
        fs::read_to_string(&self.path).map_err(|e| ProbeError::unavailable(self.path.display(), e))
    }
}


#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_proc_stat_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "cpu  1 2 3 4 5 6 7 8").expect("write");

        let mut source = ProcStat::new(file.path());
        let content = source.read_counters().expect("readable");
        assert!(content.starts_with("cpu  1 2 3 4"));
    }

    #[test]
    fn test_proc_stat_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut source = ProcStat::new(dir.path().join("stat"));

        let err = source.read_counters().unwrap_err();
        assert!(matches!(err, ProbeError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_system_runner_missing_binary() {
        let err = SystemRunner
            .run("hostprobe-definitely-not-installed", &[])
            .unwrap_err();
        assert!(matches!(err, ProbeError::SourceUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_failing_command() {
        let err = SystemRunner.run("sh", &["-c", "exit 3"]).unwrap_err();
        assert!(matches!(err, ProbeError::SourceUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_stdout() {
        let out = SystemRunner.run("sh", &["-c", "echo hello"]).expect("runs");
        assert_eq!(out, "hello\n");
    }
}
