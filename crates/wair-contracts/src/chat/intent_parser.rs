use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, INDEX_COMMANDS, NO_ARG_COMMANDS, PATH_WITH_TEXT_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_path_with_text(arg: &str) -> (String, String) {
    let mut parts = split_args(arg).into_iter();
    let path = parts.next().unwrap_or_default();
    let text = parts.collect::<Vec<String>>().join(" ");
    (path, text)
}

fn parse_indices(arg: &str) -> Vec<Value> {
    arg.split_whitespace()
        .map(|part| {
            part.parse::<u64>()
                .map(|value| Value::Number(value.into()))
                .unwrap_or(Value::Null)
        })
        .collect()
}

/// Parses one line of chat input. Lines starting with `/` are commands;
/// anything else is a styling request.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, PATH_WITH_TEXT_COMMANDS) {
                let (path, comment) = parse_path_with_text(arg);
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("path".to_string(), Value::String(path));
                intent
                    .command_args
                    .insert("text".to_string(), Value::String(comment));
                return intent;
            }

            if let Some(action) = find_action(&command, INDEX_COMMANDS) {
                let mut indices = parse_indices(arg).into_iter();
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "outfit".to_string(),
                    indices.next().unwrap_or(Value::Null),
                );
                intent
                    .command_args
                    .insert("photo".to_string(), indices.next().unwrap_or(Value::Null));
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("style_request", text);
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}
