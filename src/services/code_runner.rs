use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::time::Duration;

lazy_static! {
    static ref HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .user_agent(concat!("kodr-backend/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
}

/// Output of one program run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed (timeout, signal)
    pub exit_code: Option<i32>,
}

impl RunOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes untrusted learner code somewhere else.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, language: &str, code: &str, stdin: &str) -> AppResult<RunOutput>;
}

/// Runner backed by a Piston compatible `/execute` endpoint.
pub struct PistonRunner {
    url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct PistonFile<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
    stdin: &'a str,
    run_timeout: u64,
}

#[derive(Debug, Deserialize)]
struct PistonStage {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    code: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct PistonResponse {
    compile: Option<PistonStage>,
    run: Option<PistonStage>,
    message: Option<String>,
}

impl PistonRunner {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }
}

fn into_output(response: PistonResponse) -> AppResult<RunOutput> {
    // Compilation failures never reach the run stage
    if let Some(compile) = response.compile {
        if compile.code.unwrap_or(0) != 0 {
            return Ok(RunOutput { stdout: compile.stdout, stderr: compile.stderr, exit_code: compile.code });
        }
    }

    match response.run {
        Some(run) => Ok(RunOutput { stdout: run.stdout, stderr: run.stderr, exit_code: run.code }),
        None => Err(AppError::External(
            response.message.unwrap_or_else(|| "Code runner returned no result".into()),
        )),
    }
}

#[async_trait]
impl CodeRunner for PistonRunner {
    async fn run(&self, language: &str, code: &str, stdin: &str) -> AppResult<RunOutput> {
        let body = PistonRequest {
            language,
            version: "*",
            files: vec![PistonFile { content: code }],
            stdin,
            run_timeout: 3_000,
        };

        let response = HTTP_CLIENT
            .post(&self.url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Code runner unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            log::error!("❌ Code runner error {}: {}", status, text);
            return Err(AppError::External(format!("Code runner error: {}", status)));
        }

        let parsed: PistonResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Invalid code runner response: {}", e)))?;

        into_output(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> AppResult<RunOutput> {
        into_output(serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn reads_run_stage() {
        let out = parse(r#"{"language":"python","version":"3.10.0","run":{"stdout":"42\n","stderr":"","code":0,"signal":null,"output":"42\n"}}"#).unwrap();
        assert_eq!(out.stdout, "42\n");
        assert!(out.succeeded());
    }

    #[test]
    fn compile_errors_short_circuit() {
        let out = parse(r#"{"compile":{"stdout":"","stderr":"error[E0425]","code":1},"run":{"stdout":"","stderr":"","code":0}}"#).unwrap();
        assert_eq!(out.exit_code, Some(1));
        assert_eq!(out.stderr, "error[E0425]");
    }

    #[test]
    fn killed_process_has_no_exit_code() {
        let out = parse(r#"{"run":{"stdout":"","stderr":"","code":null,"signal":"SIGKILL"}}"#).unwrap();
        assert!(!out.succeeded());
    }

    #[test]
    fn runner_message_becomes_external_error() {
        let err = parse(r#"{"message":"runtime is unknown"}"#).unwrap_err();
        assert!(matches!(err, AppError::External(m) if m == "runtime is unknown"));
    }
}
