use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Environment variable holding the engine command line (program plus
/// leading arguments, whitespace-separated). Consulted when the builder is
/// not given a program explicitly.
pub const ENGINE_CMD_ENV: &str = "TAGBENCH_ENGINE_CMD";

const DEFAULT_PROGRAM: &str = "go";
const DEFAULT_ARGS: [&str; 2] = ["run", "run_models.go"];

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_SNIPPET_MAX: usize = 400;

/// Which engine variant to invoke.
///
/// Model `A` emits a plain ranked list; model `C` emits a re-ranked section
/// behind a marker line and is slower, hence the longer default timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    A,
    C,
}

impl ModelKind {
    /// Default wall-clock budget for one invocation of this variant.
    pub fn default_timeout(self) -> Duration {
        match self {
            ModelKind::A => Duration::from_secs(20),
            ModelKind::C => Duration::from_secs(30),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelKind::A => "A",
            ModelKind::C => "C",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a model selector is not `A` or `C`.
#[derive(Debug, Error)]
#[error("unknown model {0:?} (expected A or C)")]
pub struct ParseModelKindError(String);

impl FromStr for ModelKind {
    type Err = ParseModelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(ModelKind::A),
            "C" | "c" => Ok(ModelKind::C),
            other => Err(ParseModelKindError(other.to_string())),
        }
    }
}

/// Errors that can occur when invoking the engine process.
///
/// Every variant is a soft, per-record failure for callers: log it, skip the
/// record, continue the batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process could not be launched at all.
    #[error("failed to launch engine {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Polling the running engine process failed.
    #[error("failed to wait for engine: {0}")]
    Wait(#[source] io::Error),

    /// The engine did not finish within its wall-clock budget.
    #[error("engine timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The engine finished with a nonzero exit status.
    #[error("engine exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    /// No engine command was configured.
    #[error("engine command is empty")]
    EmptyCommand,
}

/// Trait for invoking the external recommendation engine.
///
/// This is the seam that lets the scoring loop be exercised against mock
/// engines in tests.
pub trait EngineRunner: Send + Sync {
    /// Invokes the engine with a pre-formatted input string and returns its
    /// captured stdout.
    fn run(&self, input: &str, model: ModelKind) -> Result<String, EngineError>;
}

/// Builder for constructing [`CommandRunner`] instances.
///
/// # Examples
///
/// ```
/// use tagbench::engine::CommandRunnerBuilder;
/// use std::time::Duration;
///
/// let runner = CommandRunnerBuilder::new()
///     .program("go")
///     .args(["run", "run_models.go"])
///     .timeout(Duration::from_secs(20))
///     .build()
///     .expect("failed to build runner");
/// ```
#[derive(Debug, Default)]
pub struct CommandRunnerBuilder {
    program: Option<String>,
    args: Option<Vec<String>>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandRunnerBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the program to launch.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Sets the fixed arguments passed before `--input=`/`--model=`.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Sets program and fixed arguments from one whitespace-separated
    /// command line, e.g. `"go run run_models.go"`.
    pub fn command_line(mut self, line: &str) -> Self {
        let mut parts = line.split_whitespace().map(str::to_string);
        self.program = parts.next();
        self.args = Some(parts.collect());
        self
    }

    /// Sets the working directory the engine is launched in.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Overrides the per-invocation timeout. Without an override each call
    /// uses the model's default budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the runner.
    ///
    /// If `program()`/`command_line()` was not called, the `TAGBENCH_ENGINE_CMD`
    /// environment variable is consulted, and failing that the default
    /// `go run run_models.go` command is used.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyCommand`] when the resolved command has no
    /// program.
    pub fn build(self) -> Result<CommandRunner, EngineError> {
        let (program, args) = if let Some(program) = self.program {
            (program, self.args.unwrap_or_default())
        } else if let Ok(line) = std::env::var(ENGINE_CMD_ENV)
            && !line.trim().is_empty()
        {
            let mut parts = line.split_whitespace().map(str::to_string);
            let program = parts.next().ok_or(EngineError::EmptyCommand)?;
            (program, parts.collect())
        } else {
            (
                DEFAULT_PROGRAM.to_string(),
                self.args
                    .unwrap_or_else(|| DEFAULT_ARGS.iter().map(|s| s.to_string()).collect()),
            )
        };

        if program.is_empty() {
            return Err(EngineError::EmptyCommand);
        }

        Ok(CommandRunner {
            program,
            args,
            current_dir: self.current_dir,
            timeout: self.timeout,
        })
    }
}

/// Blocking subprocess implementation of [`EngineRunner`].
///
/// Each invocation launches the configured program with the fixed arguments
/// followed by `--input=<input>` and `--model=<kind>`, captures stdout and
/// stderr, and enforces a wall-clock deadline by polling the child and
/// killing it on expiry. There is no retry: a timed-out invocation is simply
/// reported as [`EngineError::Timeout`].
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// Returns the program this runner launches.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the fixed leading arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl EngineRunner for CommandRunner {
    fn run(&self, input: &str, model: ModelKind) -> Result<String, EngineError> {
        let timeout = self.timeout.unwrap_or_else(|| model.default_timeout());

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(format!("--input={input}"))
            .arg(format!("--model={model}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Drain both pipes on background threads so a chatty engine cannot
        // fill a pipe buffer and deadlock against our wait loop.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_pipe(stdout));
        let stderr_reader = thread::spawn(move || read_pipe(stderr));

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(EngineError::Timeout(timeout));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineError::Wait(source));
                }
            }
        };

        let stdout_text = stdout_reader.join().unwrap_or_default();
        let stderr_text = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(EngineError::Exit {
                status,
                stderr: stderr_snippet(&stderr_text),
            });
        }

        Ok(stdout_text)
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

fn stderr_snippet(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= STDERR_SNIPPET_MAX {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(STDERR_SNIPPET_MAX).collect();
        format!("{head}...")
    }
}
