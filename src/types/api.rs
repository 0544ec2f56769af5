use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One `data:` line from the `/ask/stream` response, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token {
        #[serde(default, deserialize_with = "token_content")]
        content: Option<String>,
    },
    ToolStart {
        tool: String,
        #[serde(default)]
        input: Value,
        run_id: String,
    },
    ToolEnd {
        run_id: String,
        #[serde(default)]
        output: Value,
    },
    #[serde(other)]
    Unknown,
}

/// Token text as the server sends it. Scalars are rendered as text; falsy
/// values (`null`, `false`, `0`) carry no text.
fn token_content<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(text) => Some(text),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    })
}
