//! The tag-context: a record set viewed as one JSON document
//!
//! Each tag id maps to the payload of its last record (last-writer-wins
//! when a tag occurs more than once). Path expressions address into that
//! mapping two ways: plain dot/bracket paths rooted at a tag id, where the
//! longest registered tag id owning the expression as a dotted prefix
//! wins, or full JSON path queries marked by a leading `$`. Anything
//! unresolvable is `null`, never an error.

use std::collections::BTreeMap;

use jsonpath_rust::JsonPathQuery;
use serde_json::Value;
use tracing::{debug, warn};

use crate::record::CallRecord;

#[derive(Debug, Clone, Default)]
pub struct TagContext {
    tags: BTreeMap<String, Value>,
}

impl TagContext {
    /// Index a record set by tag id; later records replace earlier ones
    /// with the same tag
    pub fn from_records(records: &[CallRecord]) -> Self {
        let mut tags = BTreeMap::new();
        for record in records {
            match serde_json::to_value(&record.payload) {
                Ok(payload) => {
                    tags.insert(record.tag_id.clone(), payload);
                }
                Err(e) => {
                    warn!(tag = %record.tag_id, error = %e, "payload not representable; skipped")
                }
            }
        }
        Self { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Payload indexed under an exact tag id
    pub fn payload(&self, tag_id: &str) -> Option<&Value> {
        self.tags.get(tag_id)
    }

    /// Resolve one path expression to a value, `null` when nothing matches
    pub fn resolve(&self, path: &str) -> Value {
        if path.starts_with('$') {
            return self.resolve_json_path(path);
        }
        let Some((tag, payload)) = self.owning_tag(path) else {
            return Value::Null;
        };
        if path == tag {
            return payload.clone();
        }
        navigate(payload, &path[tag.len() + 1..])
    }

    /// Resolve every query input of a metric
    pub fn resolve_inputs(&self, query: &BTreeMap<String, String>) -> BTreeMap<String, Value> {
        query
            .iter()
            .map(|(input, path)| (input.clone(), self.resolve(path)))
            .collect()
    }

    /// The longest tag id that is the whole path or one of its dotted
    /// prefixes
    fn owning_tag(&self, path: &str) -> Option<(&str, &Value)> {
        let mut best: Option<(&str, &Value)> = None;
        for (tag, payload) in &self.tags {
            let matches = path == tag.as_str()
                || path
                    .strip_prefix(tag.as_str())
                    .is_some_and(|rest| rest.starts_with('.'));
            if matches && best.is_none_or(|(b, _)| tag.len() > b.len()) {
                best = Some((tag.as_str(), payload));
            }
        }
        best
    }

    fn resolve_json_path(&self, path: &str) -> Value {
        let root = Value::Object(
            self.tags
                .iter()
                .map(|(tag, payload)| (tag.clone(), payload.clone()))
                .collect(),
        );
        match root.path(path) {
            Ok(Value::Array(mut matches)) => match matches.len() {
                0 => Value::Null,
                1 => matches.remove(0),
                _ => Value::Array(matches),
            },
            Ok(other) => other,
            Err(e) => {
                debug!(path, error = %e, "json path query failed");
                Value::Null
            }
        }
    }
}

/// One bracket accessor inside a path segment
enum BracketStep<'a> {
    /// `[0]`: array element
    Index(usize),
    /// `["display name"]` / `['display name']`: object key, for names a
    /// plain dot segment cannot spell
    Key(&'a str),
}

/// Walk `value` along a dot path; segments may carry bracket accessors,
/// numeric for array elements (`args.items[0].name`) or quoted for object
/// keys containing spaces or dots (`args["question text"]`)
fn navigate(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in split_segments(path) {
        let (key, steps) = split_brackets(segment);
        if !key.is_empty() {
            match current.get(key) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        for step in steps {
            let next = match step {
                BracketStep::Index(index) => current.get(index),
                BracketStep::Key(key) => current.get(key),
            };
            match next {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
    }
    current.clone()
}

/// Split a dot path into segments, keeping dots inside bracket accessors
/// intact (`args["a.b"]` stays one segment)
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut in_bracket = false;
    for (at, c) in path.char_indices() {
        match quote {
            Some(open) => {
                if c == open {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' if in_bracket => quote = Some(c),
                '[' => in_bracket = true,
                ']' => in_bracket = false,
                '.' if !in_bracket => {
                    segments.push(&path[start..at]);
                    start = at + 1;
                }
                _ => {}
            },
        }
    }
    segments.push(&path[start..]);
    segments
}

/// `"items[0]['display name']"` into `("items", [Index(0), Key("display
/// name")])`; malformed brackets resolve to nothing rather than erroring
fn split_brackets(segment: &str) -> (&str, Vec<BracketStep<'_>>) {
    let Some(open) = segment.find('[') else {
        return (segment, Vec::new());
    };
    let (key, mut rest) = segment.split_at(open);
    let mut steps = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        match parse_bracket(stripped) {
            Some((step, remaining)) => {
                steps.push(step);
                rest = remaining;
            }
            None => return (key, vec![BracketStep::Index(usize::MAX)]),
        }
    }
    (key, steps)
}

/// Parse one bracket body (after `[`) up to and including its `]`,
/// returning the step and the remainder of the segment
fn parse_bracket(input: &str) -> Option<(BracketStep<'_>, &str)> {
    match input.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &input[1..];
            let end = inner.find(quote)?;
            let rest = inner[end + 1..].strip_prefix(']')?;
            Some((BracketStep::Key(&inner[..end]), rest))
        }
        _ => {
            let close = input.find(']')?;
            let index = input[..close].parse::<usize>().ok()?;
            Some((BracketStep::Index(index), &input[close + 1..]))
        }
    }
}
