use std::fmt;

use crate::error::TopicError;

/// Minimum length of a topic, in characters, after trimming
pub const MIN_TOPIC_CHARS: usize = 3;

/// A validated, trimmed user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        let trimmed = raw.trim();
        let actual = trimmed.chars().count();
        if actual == 0 {
            return Err(TopicError::Empty);
        }
        if actual < MIN_TOPIC_CHARS {
            return Err(TopicError::TooShort {
                min: MIN_TOPIC_CHARS,
                actual,
            });
        }
        Ok(Topic(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
