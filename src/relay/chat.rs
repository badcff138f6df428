//! Chat history translation
//!
//! Converts a caller-supplied conversation into the upstream's turn format
//! and splits off the message to send. The relay is stateless: callers
//! resend the full history on every request and each request seeds a fresh
//! upstream session.

use serde::{Deserialize, Deserializer};

use super::error::RelayError;
use crate::upstream::Content;

/// One message of a caller-supplied conversation
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationTurn {
    #[serde(default)]
    pub role: TurnRole,
    #[serde(default)]
    pub text: String,
}

/// Originator of a turn.
///
/// Anything that isn't the string `"user"` folds into `Assistant` rather
/// than being rejected, matching the upstream's two-role model. That
/// includes non-string role values, so deserialization accepts any JSON
/// value here instead of an enum tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnRole {
    User,
    #[default]
    Assistant,
}

impl<'de> Deserialize<'de> for TurnRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("user") => TurnRole::User,
            _ => TurnRole::Assistant,
        })
    }
}

/// Split a history into prior context and the message to send now.
///
/// The last turn is the new message; everything before it becomes the
/// upstream session seed, in original order. Fails before any upstream
/// call when the history is empty or a turn carries no text.
pub fn prepare(history: Vec<ConversationTurn>) -> Result<(Vec<Content>, String), RelayError> {
    let Some((last, prior)) = history.split_last() else {
        return Err(RelayError::InvalidHistory(
            "history must contain at least one turn".to_string(),
        ));
    };

    if history.iter().any(|turn| turn.text.is_empty()) {
        return Err(RelayError::InvalidHistory(
            "every turn must carry non-empty text".to_string(),
        ));
    }

    let prior = prior.iter().map(to_content).collect();
    Ok((prior, last.text.clone()))
}

fn to_content(turn: &ConversationTurn) -> Content {
    match turn.role {
        TurnRole::User => Content::user(turn.text.as_str()),
        TurnRole::Assistant => Content::model(turn.text.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: TurnRole, text: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_prepare_splits_last_turn() {
        let history = vec![
            turn(TurnRole::User, "Hi"),
            turn(TurnRole::Assistant, "Hello!"),
            turn(TurnRole::User, "What is the sun?"),
        ];

        let (prior, message) = prepare(history).unwrap();
        assert_eq!(prior.len(), 2);
        assert_eq!(prior[0], Content::user("Hi"));
        assert_eq!(prior[1], Content::model("Hello!"));
        assert_eq!(message, "What is the sun?");
    }

    #[test]
    fn test_prepare_single_turn_has_empty_prior() {
        let (prior, message) = prepare(vec![turn(TurnRole::User, "Hi")]).unwrap();
        assert!(prior.is_empty());
        assert_eq!(message, "Hi");
    }

    #[test]
    fn test_prepare_empty_history_fails() {
        let result = prepare(vec![]);
        assert!(matches!(result, Err(RelayError::InvalidHistory(_))));
    }

    #[test]
    fn test_prepare_empty_turn_text_fails() {
        let history = vec![turn(TurnRole::User, "Hi"), turn(TurnRole::Assistant, "")];
        let result = prepare(history);
        assert!(matches!(result, Err(RelayError::InvalidHistory(_))));
    }

    #[test]
    fn test_unknown_role_maps_to_model() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role": "system", "text": "be terse"}"#).unwrap();
        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(to_content(&turn).role, "model");
    }

    #[test]
    fn test_non_string_role_maps_to_model() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role": 42, "text": "hello"}"#).unwrap();
        assert_eq!(turn.role, TurnRole::Assistant);

        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role": null, "text": "hello"}"#).unwrap();
        assert_eq!(turn.role, TurnRole::Assistant);
    }

    #[test]
    fn test_missing_role_defaults_to_model() {
        let turn: ConversationTurn = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(turn.role, TurnRole::Assistant);
    }
}
