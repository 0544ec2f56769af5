use crate::types::StreamEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEntry {
    pub role: Role,
    pub content: String,
}

/// Trace of one tool invocation, correlated to its completion by `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolEntry {
    pub tool: String,
    pub input: Value,
    pub status: ToolStatus,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    Message(MessageEntry),
    Tool(ToolEntry),
}

impl Entry {
    pub fn as_message(&self) -> Option<&MessageEntry> {
        match self {
            Entry::Message(message) => Some(message),
            Entry::Tool(_) => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolEntry> {
        match self {
            Entry::Tool(tool) => Some(tool),
            Entry::Message(_) => None,
        }
    }
}

/// What a single event did to the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    TokenAppended { index: usize, created: bool },
    /// Token with missing or empty content.
    TokenIgnored,
    ToolStarted { index: usize },
    ToolCompleted { indices: Vec<usize> },
    UnmatchedToolCompletion { run_id: String },
    Ignored,
}

/// Ordered conversation log. Append-only, except that tool entries are
/// patched in place when their completion arrives.
///
/// `open_assistant` is the index of the assistant message that receives
/// token fragments. Any appended entry other than a token closes it.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Transcript {
    entries: Vec<Entry>,
    #[serde(skip)]
    open_assistant: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn open_assistant_index(&self) -> Option<usize> {
        self.open_assistant
    }

    pub fn push_user_message(&mut self, content: impl Into<String>) -> usize {
        self.push(Entry::Message(MessageEntry {
            role: Role::User,
            content: content.into(),
        }))
    }

    pub fn apply(&mut self, event: &StreamEvent) -> Applied {
        match event {
            StreamEvent::Token { content } => match content.as_deref() {
                Some(fragment) if !fragment.is_empty() => self.append_token(fragment),
                _ => Applied::TokenIgnored,
            },
            StreamEvent::ToolStart {
                tool,
                input,
                run_id,
            } => {
                let index = self.push(Entry::Tool(ToolEntry {
                    tool: tool.clone(),
                    input: input.clone(),
                    status: ToolStatus::Running,
                    run_id: run_id.clone(),
                    output: None,
                }));
                Applied::ToolStarted { index }
            }
            StreamEvent::ToolEnd { run_id, output } => self.complete_tool(run_id, output),
            StreamEvent::Unknown => Applied::Ignored,
        }
    }

    fn push(&mut self, entry: Entry) -> usize {
        self.open_assistant = None;
        self.entries.push(entry);
        self.entries.len() - 1
    }

    fn append_token(&mut self, fragment: &str) -> Applied {
        if let Some(index) = self.open_assistant {
            if let Some(Entry::Message(message)) = self.entries.get_mut(index) {
                message.content.push_str(fragment);
                return Applied::TokenAppended {
                    index,
                    created: false,
                };
            }
        }

        let index = self.push(Entry::Message(MessageEntry {
            role: Role::Assistant,
            content: fragment.to_string(),
        }));
        self.open_assistant = Some(index);
        Applied::TokenAppended {
            index,
            created: true,
        }
    }

    fn complete_tool(&mut self, run_id: &str, output: &Value) -> Applied {
        let mut indices = Vec::new();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Entry::Tool(tool) = entry {
                if tool.run_id == run_id {
                    tool.output = Some(output.clone());
                    tool.status = ToolStatus::Done;
                    indices.push(index);
                }
            }
        }

        if indices.is_empty() {
            tracing::debug!(run_id, "tool_end without matching tool_start");
            Applied::UnmatchedToolCompletion {
                run_id: run_id.to_string(),
            }
        } else {
            Applied::ToolCompleted { indices }
        }
    }
}

/// By-value form of [`Transcript::apply`].
pub fn reduce(mut transcript: Transcript, event: &StreamEvent) -> Transcript {
    transcript.apply(event);
    transcript
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(content: &str) -> StreamEvent {
        StreamEvent::Token {
            content: Some(content.to_string()),
        }
    }

    fn tool_start(run_id: &str) -> StreamEvent {
        StreamEvent::ToolStart {
            tool: "sql_db_query".to_string(),
            input: json!({"query": "SELECT 1"}),
            run_id: run_id.to_string(),
        }
    }

    fn tool_end(run_id: &str, output: Value) -> StreamEvent {
        StreamEvent::ToolEnd {
            run_id: run_id.to_string(),
            output,
        }
    }

    #[test]
    fn test_tokens_accumulate_into_one_assistant_message() {
        let mut transcript = Transcript::new();
        transcript.push_user_message("how many users?");
        assert_eq!(
            transcript.apply(&token("There ")),
            Applied::TokenAppended {
                index: 1,
                created: true
            }
        );
        assert_eq!(
            transcript.apply(&token("are 3.")),
            Applied::TokenAppended {
                index: 1,
                created: false
            }
        );

        assert_eq!(transcript.len(), 2);
        assert_eq!(
            transcript.get(1).and_then(Entry::as_message),
            Some(&MessageEntry {
                role: Role::Assistant,
                content: "There are 3.".to_string()
            })
        );
        assert_eq!(transcript.open_assistant_index(), Some(1));
    }

    #[test]
    fn test_empty_or_missing_token_content_is_ignored() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.apply(&token("")), Applied::TokenIgnored);
        assert_eq!(
            transcript.apply(&StreamEvent::Token { content: None }),
            Applied::TokenIgnored
        );
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_tool_start_closes_open_message() {
        let mut transcript = Transcript::new();
        transcript.apply(&token("Let me check."));
        transcript.apply(&tool_start("r1"));
        assert_eq!(transcript.open_assistant_index(), None);

        transcript.apply(&token("Done."));
        assert_eq!(transcript.len(), 3);
        assert_eq!(
            transcript.get(2).and_then(Entry::as_message).map(|m| m.content.as_str()),
            Some("Done.")
        );
    }

    #[test]
    fn test_tool_end_leaves_open_message_open() {
        let mut transcript = Transcript::new();
        transcript.apply(&tool_start("r1"));
        transcript.apply(&token("Querying"));
        transcript.apply(&tool_end("r1", json!("ok")));
        transcript.apply(&token("..."));

        assert_eq!(transcript.len(), 2);
        assert_eq!(
            transcript.get(1).and_then(Entry::as_message).map(|m| m.content.as_str()),
            Some("Querying...")
        );
    }

    #[test]
    fn test_user_message_closes_open_message() {
        let mut transcript = Transcript::new();
        transcript.apply(&token("first answer"));
        transcript.push_user_message("follow-up");
        transcript.apply(&token("second answer"));
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_tool_end_marks_matching_entry_done() {
        let mut transcript = Transcript::new();
        transcript.apply(&tool_start("r1"));
        transcript.apply(&tool_start("r2"));

        assert_eq!(
            transcript.apply(&tool_end("r1", json!([{"count": 3}]))),
            Applied::ToolCompleted { indices: vec![0] }
        );

        let first = transcript.get(0).and_then(Entry::as_tool).unwrap();
        assert_eq!(first.status, ToolStatus::Done);
        assert_eq!(first.output, Some(json!([{"count": 3}])));

        let second = transcript.get(1).and_then(Entry::as_tool).unwrap();
        assert_eq!(second.status, ToolStatus::Running);
        assert_eq!(second.output, None);
    }

    #[test]
    fn test_out_of_order_completions() {
        let mut transcript = Transcript::new();
        transcript.apply(&tool_start("a"));
        transcript.apply(&tool_start("b"));
        transcript.apply(&tool_end("b", json!("B")));
        transcript.apply(&tool_end("a", json!("A")));

        let outputs: Vec<_> = transcript
            .entries()
            .iter()
            .filter_map(Entry::as_tool)
            .map(|tool| (tool.run_id.as_str(), tool.status, tool.output.clone()))
            .collect();
        assert_eq!(
            outputs,
            vec![
                ("a", ToolStatus::Done, Some(json!("A"))),
                ("b", ToolStatus::Done, Some(json!("B"))),
            ]
        );
    }

    #[test]
    fn test_unmatched_tool_end_is_a_no_op() {
        let mut transcript = Transcript::new();
        transcript.apply(&token("hi"));
        let before = transcript.clone();

        assert_eq!(
            transcript.apply(&tool_end("r2", json!(null))),
            Applied::UnmatchedToolCompletion {
                run_id: "r2".to_string()
            }
        );
        assert_eq!(transcript, before);
    }

    #[test]
    fn test_repeated_tool_end_is_idempotent() {
        let mut transcript = Transcript::new();
        transcript.apply(&tool_start("r1"));
        transcript.apply(&tool_end("r1", json!("rows")));
        let once = transcript.clone();
        transcript.apply(&tool_end("r1", json!("rows")));

        assert_eq!(transcript, once);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_unknown_event_changes_nothing() {
        let transcript = reduce(Transcript::new(), &StreamEvent::Unknown);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_transcript_serializes_tagged_entries() {
        let mut transcript = Transcript::new();
        transcript.push_user_message("q");
        transcript.apply(&tool_start("r1"));
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(
            value,
            json!({
                "entries": [
                    {"type": "message", "role": "user", "content": "q"},
                    {
                        "type": "tool",
                        "tool": "sql_db_query",
                        "input": {"query": "SELECT 1"},
                        "status": "running",
                        "run_id": "r1"
                    }
                ]
            })
        );
    }
}
