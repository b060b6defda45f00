// ABOUTME: Integration tests for the leading instruction builder.
// ABOUTME: Verifies default assembly from registered tools and override behavior.

use std::sync::Arc;

use calloop::agent::{Agent, ExitSignal, ReplayClient};
use calloop::config::Config;
use calloop::prompt::InstructionBuilder;
use calloop::tools::{FinishTool, ToolFlags, ToolRegistry};

fn registry() -> ToolRegistry {
    ToolRegistry::new().register(FinishTool::new(ExitSignal::new()), ToolFlags::default())
}

#[test]
fn default_instruction_contains_rules_and_tools() {
    let prompt = InstructionBuilder::new().build(&registry().signatures());

    assert!(prompt.contains("# Tool Calls"), "missing call rules");
    assert!(prompt.contains("# Available Tools"), "missing tools header");
    assert!(prompt.contains("finish(answer): End the task"));
}

#[test]
fn layers_separated_by_blank_lines() {
    let prompt = InstructionBuilder::new().build("f()");
    let rules = prompt.find("# Tool Calls").expect("rules missing");
    let tools = prompt.find("# Available Tools").expect("tools header missing");
    assert!(tools > rules);
    assert!(prompt[..tools].ends_with("\n\n"));
}

#[test]
fn empty_tools_layer_skipped() {
    let mut builder = InstructionBuilder::new();
    builder.tools = String::new();
    let prompt = builder.build("f()");

    assert!(prompt.contains("# Tool Calls"));
    assert!(!prompt.contains("# Available Tools"));
}

#[test]
fn local_context_appended_last() {
    let mut builder = InstructionBuilder::new();
    builder.local = Some("Prefer read_file over shell commands.".to_string());
    let prompt = builder.build("read_file(path)");

    let local_pos = prompt.find("Prefer read_file").unwrap();
    let tools_pos = prompt.find("# Available Tools").unwrap();
    assert!(local_pos > tools_pos, "local context should come after tools");
}

#[tokio::test]
async fn agent_sends_custom_instruction() {
    let client = Arc::new(ReplayClient::new(["finish('ok')"]));
    let exit = ExitSignal::new();
    let registry =
        ToolRegistry::new().register(FinishTool::new(exit.clone()), ToolFlags::default());
    let mut agent = Agent::new(client.clone(), Arc::new(registry), exit, &Config::default())
        .with_instruction("custom rules");
    agent
        .run(vec![calloop::message::Message::human("go")])
        .await
        .unwrap();
    assert_eq!(agent.instruction(), "custom rules");
    assert_eq!(client.requests()[0].instruction, "custom rules");
}
