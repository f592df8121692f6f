use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarTag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Timestamp,
    /// The `<<` merge key of a mapping.
    Merge,
}

impl ScalarTag {
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarTag::Int | ScalarTag::Float)
    }

    fn is_textual(self) -> bool {
        matches!(self, ScalarTag::Str | ScalarTag::Timestamp | ScalarTag::Merge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarTag::Null => "!!null",
            ScalarTag::Bool => "!!bool",
            ScalarTag::Int => "!!int",
            ScalarTag::Float => "!!float",
            ScalarTag::Str => "!!str",
            ScalarTag::Timestamp => "!!timestamp",
            ScalarTag::Merge => "!!merge",
        }
    }
}

/// Tagged literal. `value` keeps the lexical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub tag: ScalarTag,
    pub value: String,
}

impl Scalar {
    pub fn new(tag: ScalarTag, value: impl Into<String>) -> Self {
        Self { tag, value: value.into() }
    }

    pub fn null() -> Self {
        Self::new(ScalarTag::Null, "null")
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ScalarTag::Bool, if value { "true" } else { "false" })
    }

    pub fn int(value: i64) -> Self {
        Self::new(ScalarTag::Int, value.to_string())
    }

    pub fn float(value: f64) -> Self {
        let text = if value.is_finite() && value.fract() == 0.0 {
            format!("{value:.1}")
        } else if value.is_nan() {
            String::from(".nan")
        } else if value.is_infinite() {
            String::from(if value > 0.0 { ".inf" } else { "-.inf" })
        } else {
            value.to_string()
        };
        Self::new(ScalarTag::Float, text)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ScalarTag::Str, value)
    }

    pub fn timestamp(value: impl Into<String>) -> Self {
        Self::new(ScalarTag::Timestamp, value)
    }

    pub fn merge() -> Self {
        Self::new(ScalarTag::Merge, "<<")
    }

    /// Resolve the tag of an untagged plain scalar (core schema plus
    /// timestamps).
    pub fn resolve(text: &str) -> Self {
        match text {
            "" | "~" | "null" | "Null" | "NULL" => return Self::new(ScalarTag::Null, text),
            "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => {
                return Self::new(ScalarTag::Bool, text);
            }
            ".inf" | "+.inf" | "-.inf" | ".nan" | ".Inf" | "-.Inf" | ".NaN" => {
                return Self::new(ScalarTag::Float, text);
            }
            _ => {}
        }
        if text.parse::<i64>().is_ok() {
            return Self::new(ScalarTag::Int, text);
        }
        if looks_like_float(text) && text.parse::<f64>().is_ok() {
            return Self::new(ScalarTag::Float, text);
        }
        if is_timestamp(text) {
            return Self::new(ScalarTag::Timestamp, text);
        }
        Self::new(ScalarTag::Str, text)
    }

    /// Text as written into a YAML document. Strings that would read back
    /// as another type, or that a plain scalar cannot hold, are quoted.
    pub fn to_yaml_text(&self) -> Cow<'_, str> {
        match self.tag {
            ScalarTag::Str if needs_quotes(&self.value) => Cow::Owned(quote(&self.value)),
            ScalarTag::Timestamp if !is_timestamp(&self.value) => Cow::Owned(quote(&self.value)),
            ScalarTag::Null if self.value.is_empty() => Cow::Borrowed("null"),
            _ => Cow::Borrowed(&self.value),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.tag {
            ScalarTag::Int => self.value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.tag {
            ScalarTag::Int => self.value.parse::<i64>().ok().map(|i| i as f64),
            ScalarTag::Float => match self.value.as_str() {
                ".inf" | "+.inf" | ".Inf" => Some(f64::INFINITY),
                "-.inf" | "-.Inf" => Some(f64::NEG_INFINITY),
                ".nan" | ".NaN" => Some(f64::NAN),
                other => other.parse().ok(),
            },
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self.tag {
            ScalarTag::Null => false,
            ScalarTag::Bool => self.value.eq_ignore_ascii_case("true"),
            _ => true,
        }
    }

    /// Value equality used by `==` and deep comparison.
    pub fn loosely_equals(&self, other: &Scalar) -> bool {
        if self.tag.is_numeric() && other.tag.is_numeric() {
            return match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => self.value == other.value,
            };
        }
        match (self.tag, other.tag) {
            (ScalarTag::Null, ScalarTag::Null) => true,
            (ScalarTag::Bool, ScalarTag::Bool) => self.is_truthy() == other.is_truthy(),
            (a, b) if a.is_textual() && b.is_textual() => self.value == other.value,
            _ => false,
        }
    }
}

fn looks_like_float(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

fn needs_quotes(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return true;
    };
    if text == "<<" || Scalar::resolve(text).tag != ScalarTag::Str {
        return true;
    }
    if first.is_whitespace() || text.ends_with(char::is_whitespace) {
        return true;
    }
    if "[]{},#&*!|>'\"%@`".contains(first) || text.starts_with("---") || text.starts_with("...") {
        return true;
    }
    if matches!(first, '-' | '?' | ':') && text[1..].chars().next().is_none_or(char::is_whitespace) {
        return true;
    }
    text.contains(": ") || text.contains(" #") || text.ends_with(':') || text.chars().any(char::is_control)
}

/// Single quotes unless the text holds control characters, which only the
/// double-quoted style can escape.
fn quote(text: &str) -> String {
    if !text.chars().any(char::is_control) {
        return format!("'{}'", text.replace('\'', "''"));
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// True when `text` is a YAML timestamp literal (date, or date and time with
/// optional fraction and zone).
pub fn is_timestamp(text: &str) -> bool {
    let text = text.trim();
    if text.len() < 10 || !text.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return false;
    }
    if DateTime::parse_from_rfc3339(text).is_ok() {
        return true;
    }
    const NAIVE_LAYOUTS: [&str; 3] =
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dt%H:%M:%S%.f"];
    if NAIVE_LAYOUTS.iter().any(|layout| NaiveDateTime::parse_from_str(text, layout).is_ok()) {
        return true;
    }
    if DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z").is_ok() {
        return true;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_core_schema_tags() {
        assert_eq!(Scalar::resolve("~").tag, ScalarTag::Null);
        assert_eq!(Scalar::resolve("true").tag, ScalarTag::Bool);
        assert_eq!(Scalar::resolve("-12").tag, ScalarTag::Int);
        assert_eq!(Scalar::resolve("1.5").tag, ScalarTag::Float);
        assert_eq!(Scalar::resolve("2001-12-15").tag, ScalarTag::Timestamp);
        assert_eq!(Scalar::resolve("2001-12-15T02:59:43.1Z").tag, ScalarTag::Timestamp);
        assert_eq!(Scalar::resolve("Saturday, 15-Dec-01").tag, ScalarTag::Str);
        assert_eq!(Scalar::resolve("e").tag, ScalarTag::Str);
    }

    #[test]
    fn ambiguous_strings_are_quoted() {
        assert_eq!(Scalar::string("1").to_yaml_text(), "'1'");
        assert_eq!(Scalar::string("true").to_yaml_text(), "'true'");
        assert_eq!(Scalar::string("").to_yaml_text(), "''");
        assert_eq!(Scalar::string("a: b").to_yaml_text(), "'a: b'");
        assert_eq!(Scalar::string("it's").to_yaml_text(), "it's");
        assert_eq!(Scalar::string("*x").to_yaml_text(), "'*x'");
        assert_eq!(Scalar::string("two\nlines").to_yaml_text(), "\"two\\nlines\"");
        assert_eq!(Scalar::string("x y, z").to_yaml_text(), "x y, z");
        assert_eq!(Scalar::int(1).to_yaml_text(), "1");
        assert_eq!(Scalar::new(ScalarTag::Null, "").to_yaml_text(), "null");
    }

    #[test]
    fn float_keeps_a_fraction_digit() {
        assert_eq!(Scalar::float(2.0).value, "2.0");
        assert_eq!(Scalar::float(2.5).value, "2.5");
    }
}
