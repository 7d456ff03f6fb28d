//! Schema-less manifest tree with absent-marker accessors.
//!
//! Lookups never fail: indexing into a missing key, a non-mapping or an
//! out-of-range sequence position yields [`Node::Absent`], so rubric rules can
//! treat "missing" and "wrong type" the same way.

use serde_yaml::Value;

/// A parsed manifest document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    root: Value,
}

/// Structural failure: the text is not a YAML mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

/// Parse manifest text.
///
/// An empty document is treated as an empty mapping. Any other top-level
/// value that is not a mapping is a structural failure.
pub fn parse_manifest(text: &str) -> Result<Manifest, ParseError> {
    if is_blank_document(text) {
        return Ok(Manifest {
            root: Value::Mapping(Default::default()),
        });
    }
    let root: Value = serde_yaml::from_str(text).map_err(|err| ParseError(err.to_string()))?;
    match root {
        Value::Null => Ok(Manifest {
            root: Value::Mapping(Default::default()),
        }),
        Value::Mapping(_) => Ok(Manifest { root }),
        other => Err(ParseError(format!(
            "top level must be a mapping, found {}",
            kind_name(&other)
        ))),
    }
}

impl Manifest {
    pub fn root(&self) -> Node<'_> {
        Node::Present(&self.root)
    }
}

/// A position in the manifest tree that may or may not exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Present(&'a Value),
    Absent,
}

impl<'a> Node<'a> {
    /// Child under `key` of a mapping.
    pub fn get(self, key: &str) -> Node<'a> {
        match self {
            Node::Present(Value::Mapping(map)) => map.get(key).map_or(Node::Absent, Node::Present),
            Node::Present(Value::Tagged(tagged)) => Node::Present(&tagged.value).get(key),
            _ => Node::Absent,
        }
    }

    /// Element `index` of a sequence.
    pub fn at(self, index: usize) -> Node<'a> {
        match self {
            Node::Present(Value::Sequence(items)) => {
                items.get(index).map_or(Node::Absent, Node::Present)
            }
            _ => Node::Absent,
        }
    }

    /// Follow a dotted path of mapping keys.
    pub fn path(self, path: &str) -> Node<'a> {
        path.split('.').fold(self, Node::get)
    }

    pub fn as_str(self) -> Option<&'a str> {
        match self {
            Node::Present(Value::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Integer value; floats, strings and booleans are not integers.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Node::Present(Value::Number(number)) => number.as_i64(),
            _ => None,
        }
    }

    /// True when the node exists and holds a non-empty value.
    ///
    /// Null, `false`, zero and empty strings, mappings or sequences count as
    /// missing.
    pub fn is_filled(self) -> bool {
        match self {
            Node::Absent => false,
            Node::Present(value) => match value {
                Value::Null => false,
                Value::Bool(flag) => *flag,
                Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
                Value::String(text) => !text.is_empty(),
                Value::Sequence(items) => !items.is_empty(),
                Value::Mapping(map) => !map.is_empty(),
                Value::Tagged(tagged) => Node::Present(&tagged.value).is_filled(),
            },
        }
    }
}

fn is_blank_document(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
