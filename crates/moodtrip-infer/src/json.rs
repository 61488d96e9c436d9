//! Pull a JSON object out of free-form model output.

use moodtrip_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

/// Outermost `{ ... }` span, across newlines. Models often wrap JSON in prose or code fences.
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

/// Parse the first-to-last brace span of `text` as `T`.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let span = JSON_OBJECT
        .find(text)
        .ok_or_else(|| Error::ParseFailure("no JSON object in model output".into()))?;
    serde_json::from_str(span.as_str()).map_err(|e| Error::ParseFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Shape {
        a: i32,
    }

    #[test]
    fn test_fenced_json() {
        let s: Shape = parse_json_object("好的：\n```json\n{\n  \"a\": 7\n}\n```").unwrap();
        assert_eq!(s.a, 7);
    }

    #[test]
    fn test_no_json() {
        let r: Result<Shape> = parse_json_object("没有结构化内容");
        assert!(matches!(r, Err(Error::ParseFailure(_))));
    }

    #[test]
    fn test_wrong_shape() {
        let r: Result<Shape> = parse_json_object("{\"b\": 1}");
        assert!(matches!(r, Err(Error::ParseFailure(_))));
    }
}
