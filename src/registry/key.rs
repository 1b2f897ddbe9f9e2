use super::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::List => write!(f, "list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::List(_) => ValueKind::List,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::List(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = serde_json::Value;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as Json;
        match json {
            Json::Bool(v) => Ok(Self::Bool(v)),
            Json::Number(n) => match n.as_i64() {
                Some(v) => Ok(Self::Int(v)),
                None => n.as_f64().map(Self::Float).ok_or(Json::Number(n)),
            },
            Json::String(v) => Ok(Self::Text(v)),
            Json::Array(items) => {
                let list: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(String::from))
                    .collect();
                list.map(Self::List).ok_or(Json::Array(items))
            }
            other => Err(other),
        }
    }
}

/// A typed configuration identifier. The kind is fixed by the default value.
#[derive(Debug, Clone)]
pub struct Key {
    name: String,
    default: Value,
    sensitive: bool,
    render: fn(&Value) -> String,
}

impl Key {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            sensitive: false,
            render: Value::to_string,
        }
    }

    /// Marks the key as sensitive: its value is redacted in every dump.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn rendered_with(mut self, render: fn(&Value) -> String) -> Self {
        self.render = render;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.default.kind()
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn render(&self, value: &Value) -> String {
        (self.render)(value)
    }

    /// Reads `raw` as a value of this key's kind. Lists are comma separated.
    pub fn parse(&self, raw: &str) -> Result<Value, RegistryError> {
        let invalid = || RegistryError::Parse {
            key: self.name.clone(),
            expected: self.kind(),
            value: raw.to_string(),
        };
        Ok(match self.kind() {
            ValueKind::Bool => Value::Bool(raw.trim().parse().map_err(|_| invalid())?),
            ValueKind::Int => Value::Int(raw.trim().parse().map_err(|_| invalid())?),
            ValueKind::Float => Value::Float(raw.trim().parse().map_err(|_| invalid())?),
            ValueKind::Text => Value::Text(raw.to_string()),
            ValueKind::List => Value::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_default() {
        assert_eq!(Key::new("PORT", 27017_i64).kind(), ValueKind::Int);
        assert_eq!(Key::new("NAME", "server").kind(), ValueKind::Text);
    }

    #[test]
    fn custom_renderer_is_used() {
        let key = Key::new("FLAG", true).rendered_with(|v| match v {
            Value::Bool(true) => "on".into(),
            _ => "off".into(),
        });
        assert_eq!(key.render(&Value::Bool(true)), "on");
        assert_eq!(key.render(&Value::Bool(false)), "off");
    }

    #[test]
    fn parses_by_kind() {
        assert_eq!(Key::new("PORT", 1_i64).parse(" 27018 ").unwrap(), Value::Int(27018));
        assert_eq!(Key::new("AUTH", false).parse("true").unwrap(), Value::Bool(true));
        assert_eq!(
            Key::new("HOSTS", Value::List(vec![])).parse("a, b,").unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
        assert!(matches!(
            Key::new("PORT", 1_i64).parse("lots"),
            Err(RegistryError::Parse {
                expected: ValueKind::Int,
                ..
            })
        ));
    }

    #[test]
    fn converts_json_defaults() {
        use serde_json::json;
        assert_eq!(Value::try_from(json!(3)).unwrap(), Value::Int(3));
        assert_eq!(Value::try_from(json!(0.5)).unwrap(), Value::Float(0.5));
        assert_eq!(
            Value::try_from(json!(["a", "b"])).unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
        assert!(Value::try_from(json!(null)).is_err());
        assert!(Value::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn lists_render_comma_separated() {
        let value = Value::List(vec!["a".into(), "b".into()]);
        assert_eq!(value.to_string(), "[a, b]");
    }
}
