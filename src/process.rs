// src/process.rs
use crate::types::RaptorError;
use log::debug;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const STDERR_EXCERPT: usize = 512;

/// Invocation of an external tool: program, argv and optional stdin payload.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition {
            self.arg(arg)
        } else {
            self
        }
    }

    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the tool to completion and returns its captured stdout.
    /// Launch failures and non-zero exits are errors.
    pub async fn output(self) -> Result<Vec<u8>, RaptorError> {
        debug!("running {} {}", self.program, self.args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RaptorError::ToolLaunch {
                tool: self.program.clone(),
                source: e,
            })?;

        // Feed stdin from a separate task so a chatty tool can't deadlock on a full stdout pipe.
        let writer = match (self.stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
                let res = pipe.write_all(&input).await;
                drop(pipe);
                res
            })),
            _ => None,
        };

        let output = child.wait_with_output().await.map_err(|e| RaptorError::ToolLaunch {
            tool: self.program.clone(),
            source: e,
        })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // tools may stop reading early; the exit status decides
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => {
                    return Err(RaptorError::ToolLaunch {
                        tool: self.program,
                        source: e,
                    })
                }
                Err(e) => {
                    return Err(RaptorError::Unknown(anyhow::anyhow!(
                        "stdin writer for {} panicked: {}",
                        self.program,
                        e
                    )))
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(RaptorError::ToolFailed {
                tool: self.program,
                code: output
                    .status
                    .code()
                    .map(|c| format!("status {}", c))
                    .unwrap_or_else(|| "a signal".to_string()),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}
