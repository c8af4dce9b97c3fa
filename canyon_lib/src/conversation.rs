use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Agent,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Agent => "agent",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    System(String),
    User(String),
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
}

impl Turn {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System(_) => Role::System,
            Self::User(_) => Role::User,
            Self::Assistant { .. } => Role::Agent,
            Self::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::System(content) | Self::User(content) => content,
            Self::Assistant { content, .. } | Self::Tool { content, .. } => content,
        }
    }
}

/// Ordered turn history for one chat session. Lives only in memory.
#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<Turn>,
    greeting: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            turns: vec![Turn::assistant(greeting.clone())],
            greeting: Some(greeting),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drops everything except the greeting, if there was one.
    pub fn clear(&mut self) {
        self.turns.clear();
        if let Some(greeting) = &self.greeting {
            self.turns.push(Turn::assistant(greeting.clone()));
        }
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    /// Returns true when the prompt had to be inserted.
    pub(crate) fn ensure_system_prompt(&mut self, prompt: &str) -> bool {
        if matches!(self.turns.first(), Some(Turn::System(_))) {
            return false;
        }
        self.turns.insert(0, Turn::System(prompt.to_string()));
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn roles_and_content() {
        let call = ToolCall {
            id: "call_0".into(),
            name: "query_feeds".into(),
            arguments: json!({ "sql": "SELECT 1" }),
        };
        let turns = [
            Turn::System("rules".into()),
            Turn::User("hi".into()),
            Turn::Assistant {
                content: String::new(),
                tool_calls: vec![call],
            },
            Turn::Tool {
                call_id: "call_0".into(),
                name: "query_feeds".into(),
                content: "1".into(),
                is_error: false,
            },
        ];

        let roles: Vec<&str> = turns.iter().map(|t| t.role().as_str()).collect();
        assert_eq!(roles, ["system", "user", "agent", "tool"]);
        assert_eq!(turns[1].content(), "hi");
        assert_eq!(turns[3].content(), "1");
    }

    #[test]
    fn system_prompt_is_inserted_once() {
        let mut session = Session::with_greeting("hello");
        assert!(session.ensure_system_prompt("rules"));
        assert!(!session.ensure_system_prompt("rules"));
        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0], Turn::System("rules".into()));
        assert_eq!(session.turns()[1].role(), Role::Agent);
    }

    #[test]
    fn clear_keeps_greeting_only() {
        let mut session = Session::with_greeting("hello");
        session.ensure_system_prompt("rules");
        session.push(Turn::User("question".into()));
        session.clear();
        assert_eq!(session.turns(), [Turn::assistant("hello")]);

        let mut bare = Session::new();
        bare.push(Turn::User("question".into()));
        bare.clear();
        assert!(bare.is_empty());
    }
}
