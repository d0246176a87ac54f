//! Native toolchain invocation: compile a persisted artifact, then run the
//! produced binary.
//!
//! The two stages are strictly sequential blocking subprocess calls. A
//! compile failure skips execution entirely and carries the compiler
//! diagnostics verbatim; this is the harness's primary error-reporting path,
//! since the generated code's validity is only discovered here.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{PortError, PortResult};

/// Configuration for the C++ toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Path to the compiler binary
    pub compiler: PathBuf,
    /// Optimization level flag
    pub opt_flag: String,
    /// Language-standard selector flag
    pub std_flag: String,
    /// Target micro-architecture tuning flags
    pub tuning_flags: Vec<String>,
    /// Name of the output binary
    pub binary_name: String,
    /// Directory the binary is written to
    pub out_dir: PathBuf,
    /// Per-stage timeout (0 = none)
    pub stage_timeout: Duration,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            compiler: PathBuf::from("clang++"),
            opt_flag: "-O3".to_string(),
            std_flag: "-std=c++17".to_string(),
            tuning_flags: vec!["-march=armv8.3-a".to_string()],
            binary_name: "optimized".to_string(),
            out_dir: PathBuf::from("."),
            stage_timeout: Duration::from_secs(300),
        }
    }
}

impl ToolchainConfig {
    /// Create a new config with the given compiler path.
    pub fn new(compiler: impl Into<PathBuf>) -> Self {
        ToolchainConfig { compiler: compiler.into(), ..Default::default() }
    }

    /// Replace the target tuning flags.
    pub fn with_tuning(mut self, flags: Vec<String>) -> Self {
        self.tuning_flags = flags;
        self
    }

    /// Set the output directory for the binary.
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Set the per-stage timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }
}

/// Result of the compile stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOutcome {
    /// Whether the compiler exited 0
    pub success: bool,
    /// Captured compiler standard-error text
    pub diagnostics: String,
    /// Compiler exit code (-1 when killed by a signal)
    pub exit_code: i32,
    /// Wall-clock compile time in milliseconds
    pub compile_time_ms: u128,
}

/// Result of running the produced binary. Only exists when the preceding
/// compile stage succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code (-1 when killed by a signal)
    pub exit_code: i32,
    /// Wall-clock run time in milliseconds
    pub run_time_ms: u128,
    /// Peak resident set size, when memory sampling is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_bytes: Option<u64>,
}

/// Combined outcome of the two sequential stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortOutcome {
    pub compile: CompileOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionOutcome>,
}

impl PortOutcome {
    /// The text a user should see for this outcome: compiler diagnostics on
    /// compile failure, captured stderr on runtime failure, stdout otherwise.
    pub fn user_visible(&self) -> &str {
        if !self.compile.success {
            return &self.compile.diagnostics;
        }
        match &self.execution {
            Some(run) if run.exit_code != 0 => &run.stderr,
            Some(run) => &run.stdout,
            None => &self.compile.diagnostics,
        }
    }
}

/// A captured child process run.
pub(crate) struct Captured {
    pub(crate) exit_code: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) elapsed_ms: u128,
    pub(crate) peak_memory_bytes: Option<u64>,
}

/// C++ compile-and-run stage driver.
pub struct Toolchain {
    config: ToolchainConfig,
}

impl Toolchain {
    /// Create a toolchain with the given configuration.
    pub fn new(config: ToolchainConfig) -> Self {
        Toolchain { config }
    }

    /// Toolchain with the default (fixed) flag set.
    pub fn default_toolchain() -> Self {
        Self::new(ToolchainConfig::default())
    }

    /// Path the compiled binary is written to.
    pub fn binary_path(&self) -> PathBuf {
        self.config.out_dir.join(&self.config.binary_name)
    }

    /// Detect the compiler version, if available.
    pub fn detect_version(&self) -> Option<String> {
        Command::new(&self.config.compiler)
            .arg("--version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
            .filter(|s| !s.is_empty())
    }

    /// Compile stage: invoke the compiler against the artifact with the
    /// fixed flag set. A non-zero exit is not an `Err`; it is a
    /// `CompileOutcome` with `success == false` and the diagnostics text.
    pub fn compile(&self, artifact: &Path) -> PortResult<CompileOutcome> {
        let binary = self.binary_path();
        let mut cmd = Command::new(&self.config.compiler);
        cmd.arg(&self.config.opt_flag).arg(&self.config.std_flag);
        for flag in &self.config.tuning_flags {
            cmd.arg(flag);
        }
        cmd.arg("-o").arg(&binary).arg(artifact);

        info!(compiler = %self.config.compiler.display(), artifact = %artifact.display(), "compiling artifact");
        let captured = run_captured(cmd, self.config.stage_timeout)
            .map_err(|e| match e {
                PortError::Message(m) => {
                    PortError::Message(format!("compile stage failed: {m}"))
                }
                other => other,
            })?;

        debug!(exit_code = captured.exit_code, ms = captured.elapsed_ms, "compiler exited");
        Ok(CompileOutcome {
            success: captured.exit_code == 0,
            diagnostics: captured.stderr,
            exit_code: captured.exit_code,
            compile_time_ms: captured.elapsed_ms,
        })
    }

    /// Execute stage: run the just-produced binary with no arguments in the
    /// current working directory, capturing both streams in full.
    pub fn execute(&self) -> PortResult<ExecutionOutcome> {
        let binary = self.binary_path();
        let cmd = Command::new(&binary);

        info!(binary = %binary.display(), "running compiled binary");
        let captured = run_captured(cmd, self.config.stage_timeout).map_err(|e| match e {
            PortError::Message(m) => PortError::Message(format!("execute stage failed: {m}")),
            other => other,
        })?;

        debug!(exit_code = captured.exit_code, ms = captured.elapsed_ms, "binary exited");
        Ok(ExecutionOutcome {
            stdout: captured.stdout,
            stderr: captured.stderr,
            exit_code: captured.exit_code,
            run_time_ms: captured.elapsed_ms,
            peak_memory_bytes: captured.peak_memory_bytes,
        })
    }

    /// Both stages, strictly sequential. Execution is entered only when the
    /// compile stage succeeded.
    pub fn verify(&self, artifact: &Path) -> PortResult<PortOutcome> {
        let compile = self.compile(artifact)?;
        if !compile.success {
            return Ok(PortOutcome { compile, execution: None });
        }
        let execution = self.execute()?;
        Ok(PortOutcome { compile, execution: Some(execution) })
    }
}

/// Spawn a command with piped stdio and supervise it: drain both pipes on
/// reader threads (so a chatty child cannot fill a pipe and stall), poll for
/// exit, and kill on deadline.
pub(crate) fn run_captured(mut cmd: Command, timeout: Duration) -> PortResult<Captured> {
    #[cfg(feature = "mem")]
    use sysinfo::{ProcessRefreshKind, RefreshKind, System};

    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().into_owned();
    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| PortError::Message(format!("failed to spawn {program}: {e}")))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_handle = std::thread::spawn(move || drain_pipe(stdout_pipe));
    let stderr_handle = std::thread::spawn(move || drain_pipe(stderr_pipe));

    #[cfg(feature = "mem")]
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    );
    #[cfg(feature = "mem")]
    let mut peak_rss: u64 = 0;

    let status = loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| PortError::Message(e.to_string()))?
        {
            #[cfg(feature = "mem")]
            {
                if let Some(pid) = child.id().try_into().ok().map(sysinfo::Pid::from_u32) {
                    sys.refresh_process(pid);
                    if let Some(p) = sys.process(pid) {
                        peak_rss = peak_rss.max(p.memory());
                    }
                }
            }
            break status;
        }

        if timeout.as_secs() > 0 && start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(PortError::Message(format!(
                "timed out after {}s",
                timeout.as_secs()
            )));
        }

        #[cfg(feature = "mem")]
        {
            if let Some(pid) = child.id().try_into().ok().map(sysinfo::Pid::from_u32) {
                sys.refresh_process(pid);
                if let Some(p) = sys.process(pid) {
                    peak_rss = peak_rss.max(p.memory());
                }
            }
        }

        std::thread::sleep(Duration::from_millis(20));
    };

    let elapsed_ms = start.elapsed().as_millis();
    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    Ok(Captured {
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
        elapsed_ms,
        peak_memory_bytes: {
            #[cfg(feature = "mem")]
            {
                Some(peak_rss)
            }
            #[cfg(not(feature = "mem"))]
            {
                None
            }
        },
    })
}

fn drain_pipe<R: std::io::Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = std::io::Read::read_to_end(&mut pipe, &mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_flags() {
        let config = ToolchainConfig::default();
        assert_eq!(config.compiler, PathBuf::from("clang++"));
        assert_eq!(config.opt_flag, "-O3");
        assert_eq!(config.std_flag, "-std=c++17");
        assert_eq!(config.binary_name, "optimized");
    }

    #[test]
    fn test_config_builder() {
        let config = ToolchainConfig::new("g++")
            .with_tuning(vec![])
            .with_out_dir("/tmp/out")
            .with_timeout(Duration::from_secs(10));
        assert_eq!(config.compiler, PathBuf::from("g++"));
        assert!(config.tuning_flags.is_empty());
        assert_eq!(config.stage_timeout, Duration::from_secs(10));
        let toolchain = Toolchain::new(config);
        assert_eq!(toolchain.binary_path(), PathBuf::from("/tmp/out/optimized"));
    }

    #[test]
    fn test_user_visible_selects_diagnostics_on_compile_failure() {
        let outcome = PortOutcome {
            compile: CompileOutcome {
                success: false,
                diagnostics: "error: expected ';'".into(),
                exit_code: 1,
                compile_time_ms: 5,
            },
            execution: None,
        };
        assert_eq!(outcome.user_visible(), "error: expected ';'");
    }

    #[test]
    fn test_user_visible_selects_stderr_on_runtime_failure() {
        let outcome = PortOutcome {
            compile: CompileOutcome {
                success: true,
                diagnostics: String::new(),
                exit_code: 0,
                compile_time_ms: 5,
            },
            execution: Some(ExecutionOutcome {
                stdout: "partial".into(),
                stderr: "segmentation fault".into(),
                exit_code: 139,
                run_time_ms: 2,
                peak_memory_bytes: None,
            }),
        };
        assert_eq!(outcome.user_visible(), "segmentation fault");
    }

    #[test]
    fn test_user_visible_selects_stdout_on_success() {
        let outcome = PortOutcome {
            compile: CompileOutcome {
                success: true,
                diagnostics: String::new(),
                exit_code: 0,
                compile_time_ms: 5,
            },
            execution: Some(ExecutionOutcome {
                stdout: "15".into(),
                stderr: String::new(),
                exit_code: 0,
                run_time_ms: 2,
                peak_memory_bytes: None,
            }),
        };
        assert_eq!(outcome.user_visible(), "15");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captured_streams_and_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 3");
        let captured = run_captured(cmd, Duration::from_secs(10)).unwrap();
        assert_eq!(captured.stdout.trim(), "out");
        assert_eq!(captured.stderr.trim(), "err");
        assert_eq!(captured.exit_code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captured_kills_on_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let start = Instant::now();
        let result = run_captured(cmd, Duration::from_secs(1));
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
