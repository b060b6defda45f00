// ABOUTME: Finish tool — lets the model end the run by raising the shared exit signal.
// ABOUTME: Returns the final answer as its result; the loop stops at the next exit check.

use async_trait::async_trait;

use super::registry::Tool;
use crate::agent::ExitSignal;
use crate::call::CallArgs;

/// The tool name used for both registration and the instruction text.
pub const FINISH_TOOL_NAME: &str = "finish";

/// Tool that records the final answer and asks the loop to exit.
pub struct FinishTool {
    exit: ExitSignal,
}

impl FinishTool {
    pub fn new(exit: ExitSignal) -> Self {
        Self { exit }
    }
}

#[async_trait]
impl Tool for FinishTool {
    fn name(&self) -> &str {
        FINISH_TOOL_NAME
    }

    fn signature(&self) -> String {
        format!("{}(answer)", FINISH_TOOL_NAME)
    }

    fn description(&self) -> &str {
        "End the task and report the final answer."
    }

    async fn call(&self, args: CallArgs) -> anyhow::Result<String> {
        let answer = args.str(0, "answer").unwrap_or_default().to_string();
        self.exit.set();
        Ok(answer)
    }
}
