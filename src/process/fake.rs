//! Scripted executable for tests

use super::{Executable, Execution};
use crate::error::{ModlayerError, ModlayerResult};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;

type Effect = Box<dyn Fn(&Execution) + Send + Sync>;

/// Records every execution and replays a fixed output and exit code
pub(crate) struct RecordingExecutable {
    calls: Mutex<Vec<Execution>>,
    output: String,
    exit_code: i32,
    effect: Option<Effect>,
}

impl RecordingExecutable {
    pub(crate) fn succeeding(output: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            output: output.to_string(),
            exit_code: 0,
            effect: None,
        }
    }

    pub(crate) fn failing(output: &str, exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::succeeding(output)
        }
    }

    /// Run `effect` on each execution, e.g. to create the files a real
    /// package manager would have written
    pub(crate) fn with_effect(mut self, effect: impl Fn(&Execution) + Send + Sync + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Execution> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executable for RecordingExecutable {
    async fn execute(
        &self,
        execution: &Execution,
        output: &mut (dyn Write + Send),
    ) -> ModlayerResult<()> {
        self.calls.lock().unwrap().push(execution.clone());
        if let Some(effect) = &self.effect {
            effect(execution);
        }
        output
            .write_all(self.output.as_bytes())
            .map_err(|e| ModlayerError::io("writing fake output", e))?;

        if self.exit_code == 0 {
            Ok(())
        } else {
            Err(ModlayerError::CommandExit {
                command: self.command_line(execution),
                code: Some(self.exit_code),
            })
        }
    }

    fn command_line(&self, execution: &Execution) -> String {
        format!("npm {}", execution.args.join(" "))
    }
}
