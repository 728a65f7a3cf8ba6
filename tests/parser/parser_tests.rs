// Parser tests - turning model completions into actions
//
// Covers the rendered-text round trip, last-marker precedence and the
// failure modes a step controller retries on.

use reagent_core::domain::{Action, Observation, ToolArgs};
use reagent_core::parser::{ParseError, parse_action};
use serde_json::{Value, json};

fn args(pairs: &[(&str, &str)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

#[test]
fn rendered_actions_parse_back_to_same_call() {
    let cases = vec![
        ("search", args(&[("query", "rust ownership")])),
        ("Files:read", args(&[("path", "/etc/hosts"), ("limit", "10")])),
        ("clock", ToolArgs::new()),
        ("write", args(&[("text", "line one\nline two")])),
        ("edit", args(&[("code", "  indented code"), ("tail", "trailing  ")])),
        ("patch", args(&[("diff", "    fn main() {\n        run();\n    }")])),
    ];

    for (tool, original) in cases {
        let action = Action::new("  planning the next move ", tool, original.clone());
        action.resolve_with(|_| Observation::text("some result"));

        let parsed = parse_action(&action.to_string()).expect("rendered text parses");

        assert_eq!(parsed.tool, tool);
        assert_eq!(parsed.args, original);
        assert_eq!(parsed.thought, "planning the next move");
        assert!(parsed.obs().is_none());
    }
}

#[test]
fn embedded_action_marker_in_thought_is_ignored() {
    let raw = "Thought: I will not write Action: foo here\nAction: real_tool\nAction Input: <x>1</x>";

    let action = parse_action(raw).expect("parses");

    assert_eq!(action.tool, "real_tool");
    assert_eq!(action.args.get("x"), Some(&json!("1")));
}

#[test]
fn completion_without_markers_is_an_error() {
    assert_eq!(
        parse_action("Thought: just thinking, no action").unwrap_err(),
        ParseError::MissingMarkers
    );
}

#[test]
fn completion_cut_at_stop_sequence_parses() {
    // The stop sequence removes "Observation:" itself, leaving a trailing newline.
    let raw = " I need the weather\nAction: weather\nAction Input: <city>Oslo</city>\n";

    let action = parse_action(raw).expect("parses");

    assert_eq!(action.thought, "I need the weather");
    assert_eq!(action.args.get("city"), Some(&json!("Oslo")));
}

#[test]
fn json_arguments_keep_their_types() {
    let raw = "Thought: x\nAction: resize\nAction Input: {\"width\": 640, \"keep_ratio\": true}";

    let action = parse_action(raw).expect("parses");

    assert_eq!(action.args.get("width"), Some(&json!(640)));
    assert_eq!(action.args.get("keep_ratio"), Some(&json!(true)));
}

#[test]
fn broken_tags_are_reported() {
    let mismatched = parse_action("Thought: x\nAction: t\nAction Input: <a>1</b>").unwrap_err();
    assert!(matches!(mismatched, ParseError::MismatchedTag { .. }));

    let unclosed = parse_action("Thought: x\nAction: t\nAction Input: <a>1</a><b>2").unwrap_err();
    assert_eq!(unclosed, ParseError::UnclosedTag("b".into()));
}

#[test]
fn blank_tool_name_is_rejected() {
    assert_eq!(
        parse_action("Thought: x\nAction:   \nAction Input: <a>1</a>").unwrap_err(),
        ParseError::EmptyTool
    );
}

#[test]
fn final_answer_is_recognised() {
    let action = parse_action("Thought: done\nAction: final_answer\nAction Input: <answer>42</answer>")
        .expect("parses");

    assert!(action.is_done());
    assert_eq!(action.args.get("answer"), Some(&json!("42")));
}
