// ABOUTME: Tools module — the closed dispatch table, the invoker, and built-in tools.
// ABOUTME: Concrete file/shell/search tools are supplied by the host through the Tool trait.

pub mod dispatch;
pub mod finish;
pub mod registry;

pub use dispatch::{ABORTED_MESSAGE, Dispatcher, leading_tool_name, result_id, wrap_result};
pub use finish::{FINISH_TOOL_NAME, FinishTool};
pub use registry::{Tool, ToolFlags, ToolRegistration, ToolRegistry};
