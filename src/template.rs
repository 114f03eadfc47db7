//! Prompt templates with `{{placeholder}}` substitution.
//!
//! Templates are parsed once against the placeholders their call site supplies,
//! so rendering cannot fail at dispatch time.

use crate::error::OrchestrationError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Lenient constructor for built-in templates: every `{{name}}` becomes a
    /// placeholder and an unclosed `{{` stays literal text.
    pub fn new(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut cursor = source;
        while let Some(start) = cursor.find("{{") {
            let after_open = &cursor[start + 2..];
            let Some(close_offset) = after_open.find("}}") else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Literal(cursor[..start].to_string()));
            }
            segments.push(Segment::Placeholder(
                after_open[..close_offset].trim().to_string(),
            ));
            cursor = &after_open[close_offset + 2..];
        }
        if !cursor.is_empty() {
            segments.push(Segment::Literal(cursor.to_string()));
        }
        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// Parse `source`, accepting only placeholders listed in `allowed`.
    pub fn parse(source: &str, allowed: &[&str]) -> Result<Self, OrchestrationError> {
        let mut segments = Vec::new();
        let mut cursor = source;

        while let Some(start) = cursor.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(cursor[..start].to_string()));
            }
            let after_open = &cursor[start + 2..];
            let Some(close_offset) = after_open.find("}}") else {
                return Err(OrchestrationError::Config(format!(
                    "unclosed placeholder in template: {}",
                    source
                )));
            };
            let token = after_open[..close_offset].trim();
            if !allowed.contains(&token) {
                return Err(OrchestrationError::Config(format!(
                    "unknown placeholder '{{{{{}}}}}' (expected one of: {})",
                    token,
                    allowed.join(", ")
                )));
            }
            segments.push(Segment::Placeholder(token.to_string()));
            cursor = &after_open[close_offset + 2..];
        }
        if !cursor.is_empty() {
            segments.push(Segment::Literal(cursor.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Substitute placeholders. A placeholder without a value renders empty.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some((_, value)) = vars.iter().find(|(key, _)| key == name) {
                        rendered.push_str(value);
                    }
                }
            }
        }
        rendered
    }
}
