//! The message envelope passed between pipeline stages.

use serde::{Deserialize, Serialize};

/// One unit of work traveling on a pipeline queue.
///
/// `outputs` holds the text fragments produced in a single processing
/// cycle, in chronological order. `eos` marks the end of a logical
/// utterance and is passed through the pipeline unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Ordered text fragments produced in one processing cycle.
    pub outputs: Vec<String>,
    /// True when this message closes a logical utterance.
    pub eos: bool,
}

impl Message {
    /// Creates a message carrying the given fragments.
    pub fn new(outputs: Vec<String>, eos: bool) -> Self {
        Self { outputs, eos }
    }

    /// Creates a message carrying a single fragment.
    pub fn single(text: impl Into<String>, eos: bool) -> Self {
        Self {
            outputs: vec![text.into()],
            eos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new(vec!["hello".to_string(), "world".to_string()], false);
        assert_eq!(msg.outputs, vec!["hello", "world"]);
        assert!(!msg.eos);
    }

    #[test]
    fn test_single_fragment() {
        let msg = Message::single("hello", true);
        assert_eq!(msg.outputs, vec!["hello"]);
        assert!(msg.eos);
    }

    #[test]
    fn test_outputs_preserve_order() {
        let fragments: Vec<String> = (0..5).map(|i| format!("fragment {i}")).collect();
        let msg = Message::new(fragments.clone(), false);
        assert_eq!(msg.outputs, fragments);
    }
}
