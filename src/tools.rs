use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::BaserError;
use crate::store::ensure_dir;

const STDERR_TAIL_LINES: usize = 20;

/// One external command, as an explicit argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    pub stage: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<Utf8PathBuf>,
    /// Standard output is written to this file instead of being captured.
    pub stdout: Option<Utf8PathBuf>,
}

impl ToolInvocation {
    pub fn new(stage: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: Utf8PathBuf) -> Self {
        self.cwd = Some(dir);
        self
    }

    pub fn stdout_to(mut self, path: Utf8PathBuf) -> Self {
        self.stdout = Some(path);
        self
    }

    /// Shell-like rendering for logs and error messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(stdout) = &self.stdout {
            line.push_str(" > ");
            line.push_str(stdout.as_str());
        }
        line
    }
}

pub trait ToolRunner: Send + Sync {
    fn locate(&self, program: &str) -> Option<PathBuf>;
    fn run(&self, invocation: &ToolInvocation) -> Result<(), BaserError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemToolRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_in_path(program)
    }

    fn run(&self, invocation: &ToolInvocation) -> Result<(), BaserError> {
        let program = self
            .locate(&invocation.program)
            .ok_or_else(|| BaserError::MissingDependency(invocation.program.clone()))?;

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args);
        cmd.stdin(Stdio::null());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir.as_std_path());
        }
        if let Some(path) = &invocation.stdout {
            if let Some(parent) = path.parent() {
                ensure_dir(parent)?;
            }
            let file = File::create(path.as_std_path())
                .map_err(|err| BaserError::Filesystem(format!("create {path}: {err}")))?;
            cmd.stdout(Stdio::from(file));
        }

        tracing::debug!("running {}", invocation.command_line());
        let output = cmd.output().map_err(|err| spawn_error(invocation, err))?;

        if !output.stdout.is_empty() {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                tracing::debug!("{}: {line}", invocation.program);
            }
        }
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines = stderr.trim().lines().collect::<Vec<_>>();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Err(BaserError::ToolFailure {
            stage: invocation.stage.clone(),
            command: invocation.command_line(),
            code: output.status.code(),
            message: if tail.is_empty() {
                "no diagnostic output".to_string()
            } else {
                tail
            },
        })
    }
}

fn spawn_error(invocation: &ToolInvocation, err: io::Error) -> BaserError {
    if err.kind() == io::ErrorKind::NotFound {
        return BaserError::MissingDependency(invocation.program.clone());
    }
    BaserError::ToolFailure {
        stage: invocation.stage.clone(),
        command: invocation.command_line(),
        code: None,
        message: err.to_string(),
    }
}

/// Pre-flight check. Reports every missing executable at once.
pub fn check_dependencies(runner: &dyn ToolRunner, programs: &[&str]) -> Result<Vec<PathBuf>, BaserError> {
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for program in programs {
        match runner.locate(program) {
            Some(path) => {
                tracing::debug!("found {program} at {}", path.display());
                found.push(path);
            }
            None => missing.push(*program),
        }
    }
    if !missing.is_empty() {
        return Err(BaserError::MissingDependency(missing.join(", ")));
    }
    Ok(found)
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    find_in_dirs(name, std::env::split_paths(&path_var))
}

/// `.exe` names are only considered on Windows.
fn find_in_dirs(name: &str, dirs: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    for path in dirs {
        if cfg!(windows) {
            let exe = path.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRunner(Vec<&'static str>);

    impl ToolRunner for FixedRunner {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.0
                .iter()
                .any(|name| *name == program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        }

        fn run(&self, _invocation: &ToolInvocation) -> Result<(), BaserError> {
            Ok(())
        }
    }

    #[test]
    fn command_line_renders_redirect() {
        let invocation = ToolInvocation::new("bridge", "prokka-genbank_to_fasta_db")
            .arg("a.gbk")
            .arg("--idtag=locus_tag")
            .stdout_to(Utf8PathBuf::from("prokka/Klebsiella.faa"));
        assert_eq!(
            invocation.command_line(),
            "prokka-genbank_to_fasta_db a.gbk --idtag=locus_tag > prokka/Klebsiella.faa"
        );
    }

    #[test]
    fn missing_tools_are_all_named() {
        let runner = FixedRunner(vec!["rsync", "cd-hit"]);
        let err = check_dependencies(
            &runner,
            &["rsync", "prokka-genbank_to_fasta_db", "cd-hit", "makeblastdb"],
        )
        .unwrap_err();
        match err {
            BaserError::MissingDependency(names) => {
                assert_eq!(names, "prokka-genbank_to_fasta_db, makeblastdb")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_reports_code_and_stderr_tail() {
        let invocation = ToolInvocation::new("clustering", "sh")
            .arg("-c")
            .arg("echo x >&2; exit 3");

        let err = SystemToolRunner::new().run(&invocation).unwrap_err();

        match err {
            BaserError::ToolFailure {
                stage,
                command,
                code,
                message,
            } => {
                assert_eq!(stage, "clustering");
                assert_eq!(command, "sh -c echo x >&2; exit 3");
                assert_eq!(code, Some(3));
                assert_eq!(message, "x");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn stdout_is_redirected_into_file() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let target = root.join("prokka/Klebsiella.faa");
        let invocation = ToolInvocation::new("protein extraction", "sh")
            .arg("-c")
            .arg("echo hi")
            .stdout_to(target.clone());

        SystemToolRunner::new().run(&invocation).unwrap();

        assert_eq!(std::fs::read_to_string(target.as_std_path()).unwrap(), "hi\n");
    }

    #[cfg(unix)]
    #[test]
    fn current_dir_is_applied() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let invocation = ToolInvocation::new("indexing", "sh")
            .arg("-c")
            .arg("touch made_here")
            .current_dir(root.clone());

        SystemToolRunner::new().run(&invocation).unwrap();

        assert!(root.join("made_here").as_std_path().is_file());
    }

    #[cfg(unix)]
    #[test]
    fn exe_suffix_is_ignored_off_windows() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("cd-hit.exe"), b"").unwrap();
        assert_eq!(find_in_dirs("cd-hit", [temp.path().to_path_buf()]), None);

        std::fs::write(temp.path().join("cd-hit"), b"").unwrap();
        assert_eq!(
            find_in_dirs("cd-hit", [temp.path().to_path_buf()]),
            Some(temp.path().join("cd-hit"))
        );
    }

    #[test]
    fn unknown_program_is_a_missing_dependency() {
        let invocation = ToolInvocation::new("indexing", "genomebaser-no-such-tool-7f3a");
        let err = SystemToolRunner::new().run(&invocation).unwrap_err();
        match err {
            BaserError::MissingDependency(name) => assert_eq!(name, "genomebaser-no-such-tool-7f3a"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn spawn_not_found_maps_to_missing_dependency() {
        let invocation = ToolInvocation::new("indexing", "makeblastdb");
        let err = spawn_error(&invocation, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, BaserError::MissingDependency(name) if name == "makeblastdb"));

        let err = spawn_error(&invocation, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, BaserError::ToolFailure { code: None, .. }));
    }
}
