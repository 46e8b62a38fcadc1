//! Engine command builder.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::{JobId, Stage};

/// Attribution for one engine invocation.
///
/// Every operation is tagged with the job and stage that issued it, so
/// progress and log output stay attributable when the engine is reused
/// across sequential jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationTag {
    pub job_id: JobId,
    pub stage: Stage,
}

impl InvocationTag {
    pub fn new(job_id: JobId, stage: Stage) -> Self {
        Self { job_id, stage }
    }
}

impl fmt::Display for InvocationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.job_id, self.stage)
    }
}

/// One transcoding operation.
///
/// `args` hold the operation-specific tokens (inputs, mapping, codecs,
/// output format). The engine adds its own global flags and appends
/// `output` as the final token.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub tag: InvocationTag,
    pub args: Vec<String>,
    pub output: PathBuf,
    /// Expected output duration, used to turn engine timestamps into a
    /// completion fraction.
    pub expected_duration: Option<f64>,
}

impl EngineCommand {
    /// Start a command that will write `output`.
    pub fn new(tag: InvocationTag, output: impl Into<PathBuf>) -> Self {
        Self {
            tag,
            args: Vec::new(),
            output: output.into(),
            expected_duration: None,
        }
    }

    /// Add a single token.
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.args.push(token.into());
        self
    }

    /// Add a flag followed by its value.
    pub fn opt(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Add an `-i <path>` input.
    pub fn input(self, path: &Path) -> Self {
        self.opt("-i", path.to_string_lossy().to_string())
    }

    /// Set the expected output duration in seconds.
    pub fn expect_duration(mut self, secs: Option<f64>) -> Self {
        self.expected_duration = secs.filter(|d| d.is_finite() && *d > 0.0);
        self
    }

    /// Input paths in the order they were added.
    pub fn inputs(&self) -> Vec<&str> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == "-i")
            .map(|pair| pair[1].as_str())
            .collect()
    }

    /// Whether a token appears anywhere in the argument list.
    pub fn has_arg(&self, token: &str) -> bool {
        self.args.iter().any(|a| a == token)
    }

    /// Single-line rendering for logs.
    pub fn display_line(&self, program: &str) -> String {
        format!(
            "{} {} {}",
            program,
            self.args.join(" "),
            self.output.display()
        )
    }
}
