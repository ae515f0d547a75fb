//! Ready-made steps for cleaning scraped values.
//!
//! Text steps reject non-text input with [`StepError::InvalidInput`]. Put
//! them after a fan-out step (such as [`split_on`]) to apply them per element.

use crate::error::{StepError, StepResult};
use crate::pipeline::{AdaptorArgs, Step};
use scrapekit_item::json_type_name;
use serde_json::{Number, Value};

/// A step over text values.
struct TextStep<F> {
    name: &'static str,
    f: F,
}

impl<F> Step for TextStep<F>
where
    F: Fn(&str) -> StepResult<Value> + Send + Sync,
{
    fn apply(&self, value: Value, _args: &mut AdaptorArgs) -> StepResult<Value> {
        match value {
            Value::String(s) => (self.f)(&s),
            other => Err(invalid_input(self.name, "text", &other)),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn text_step<F>(name: &'static str, f: F) -> TextStep<F>
where
    F: Fn(&str) -> StepResult<Value> + Send + Sync,
{
    TextStep { name, f }
}

/// A step over any value.
struct ValueStep<F> {
    name: &'static str,
    f: F,
}

impl<F> Step for ValueStep<F>
where
    F: Fn(Value, &mut AdaptorArgs) -> StepResult<Value> + Send + Sync,
{
    fn apply(&self, value: Value, args: &mut AdaptorArgs) -> StepResult<Value> {
        (self.f)(value, args)
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn value_step<F>(name: &'static str, f: F) -> ValueStep<F>
where
    F: Fn(Value, &mut AdaptorArgs) -> StepResult<Value> + Send + Sync,
{
    ValueStep { name, f }
}

fn invalid_input(step: &str, expected: &'static str, found: &Value) -> StepError {
    StepError::InvalidInput {
        step: step.to_string(),
        expected,
        found: json_type_name(found),
    }
}

fn text(s: impl Into<String>) -> StepResult<Value> {
    Ok(Value::String(s.into()))
}

// ── whitespace & case ───────────────────────────────────────────

pub fn trim() -> impl Step {
    text_step("trim", |s| text(s.trim()))
}

/// Collapses runs of whitespace into one space and trims both ends.
pub fn normalize_whitespace() -> impl Step {
    text_step("normalize_whitespace", |s| {
        text(s.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

pub fn lowercase() -> impl Step {
    text_step("lowercase", |s| text(s.to_lowercase()))
}

pub fn uppercase() -> impl Step {
    text_step("uppercase", |s| text(s.to_uppercase()))
}

/// Uppercases the first letter of every word and lowercases the rest.
/// A word starts at any letter not preceded by a letter.
pub fn title_case() -> impl Step {
    text_step("title_case", |s| {
        let mut out = String::with_capacity(s.len());
        let mut prev_alpha = false;
        for ch in s.chars() {
            if ch.is_alphabetic() {
                if prev_alpha {
                    out.extend(ch.to_lowercase());
                } else {
                    out.extend(ch.to_uppercase());
                }
                prev_alpha = true;
            } else {
                out.push(ch);
                prev_alpha = false;
            }
        }
        text(out)
    })
}

pub fn swap_case() -> impl Step {
    text_step("swap_case", |s| {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            if ch.is_uppercase() {
                out.extend(ch.to_lowercase());
            } else if ch.is_lowercase() {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
        }
        text(out)
    })
}

// ── structure ───────────────────────────────────────────────────

/// Splits text on `sep`, fanning the parts out to the next step.
/// An empty separator fails every call.
pub fn split_on(sep: impl Into<String>) -> impl Step {
    let sep = sep.into();
    text_step("split_on", move |s| {
        if sep.is_empty() {
            return Err(StepError::Custom("split_on: empty separator".to_string()));
        }
        Ok(Value::Array(s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()))
    })
}

pub fn replace(from: impl Into<String>, to: impl Into<String>) -> impl Step {
    let (from, to) = (from.into(), to.into());
    text_step("replace", move |s| text(s.replace(from.as_str(), &to)))
}

/// Drops the last `n` characters. Shorter text becomes empty.
pub fn strip_suffix_chars(n: usize) -> impl Step {
    text_step("strip_suffix_chars", move |s| {
        let keep = s.chars().count().saturating_sub(n);
        text(s.chars().take(keep).collect::<String>())
    })
}

pub fn drop_last_char() -> impl Step {
    strip_suffix_chars(1)
}

/// Removes `[ ... ]` tags such as `[CAPTAIN]`, then trims.
/// No nesting; an unclosed `[` drops the rest of the text.
pub fn strip_brackets() -> impl Step {
    text_step("strip_brackets", |s| {
        let mut out = String::with_capacity(s.len());
        let mut in_bracket = false;
        for ch in s.chars() {
            match ch {
                '[' => in_bracket = true,
                ']' => in_bracket = false,
                _ if !in_bracket => out.push(ch),
                _ => {}
            }
        }
        text(out.trim())
    })
}

/// Decodes the handful of HTML entities that survive text extraction.
pub fn decode_entities() -> impl Step {
    text_step("decode_entities", |s| {
        text(
            s.replace("&nbsp;", " ")
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&quot;", "\"")
                .replace("&#39;", "'")
                .replace("&amp;", "&"),
        )
    })
}

/// Turns empty text and nulls into no value at all.
pub fn drop_empty() -> impl Step {
    value_step("drop_empty", |value, _args| {
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        Ok(if empty { Value::Array(Vec::new()) } else { value })
    })
}

// ── coercion ────────────────────────────────────────────────────

/// Parses text into an integer. Integers pass through.
pub fn to_integer() -> impl Step {
    value_step("to_integer", |value, _args| {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| parse_error("to_integer", &s, e)),
            other => Err(invalid_input("to_integer", "text", &other)),
        }
    })
}

/// Parses text into a float. Numbers pass through.
pub fn to_float() -> impl Step {
    value_step("to_float", |value, _args| {
        match value {
            Value::Number(n) => Ok(Value::Number(n)),
            Value::String(s) => {
                let parsed = s
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| parse_error("to_float", &s, e))?;
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| parse_error("to_float", &s, "not a finite number"))
            }
            other => Err(invalid_input("to_float", "text", &other)),
        }
    })
}

/// Parses `true/yes/on/1` and `false/no/off/0`, ignoring case. Booleans pass through.
pub fn to_bool() -> impl Step {
    value_step("to_bool", |value, _args| {
        match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(parse_error("to_bool", &s, "not a boolean")),
            },
            other => Err(invalid_input("to_bool", "text", &other)),
        }
    })
}

fn parse_error(step: &str, input: &str, reason: impl ToString) -> StepError {
    StepError::Parse {
        step: step.to_string(),
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

// ── arguments ───────────────────────────────────────────────────

/// Adds the numeric side-channel argument `key` to a numeric value.
/// A missing argument counts as 0.
pub fn add_from_arg(key: impl Into<String>) -> impl Step {
    let key = key.into();
    value_step("add_from_arg", move |value, args| {
        let addend = match args.get(&key) {
            None => Value::from(0),
            Some(v @ Value::Number(_)) => v.clone(),
            Some(_) => {
                return Err(StepError::InvalidArg {
                    key: key.clone(),
                    expected: "a number",
                });
            }
        };
        match (&value, &addend) {
            (Value::Number(x), Value::Number(y)) => add_numbers(x, y),
            _ => Err(invalid_input("add_from_arg", "number", &value)),
        }
    })
}

/// Integer sums stay exact across the whole `i64`/`u64` range; anything
/// involving a float is summed as `f64`.
fn add_numbers(x: &Number, y: &Number) -> StepResult<Value> {
    if let (Some(a), Some(b)) = (as_i128(x), as_i128(y)) {
        let sum = a + b;
        return i64::try_from(sum)
            .map(Value::from)
            .or_else(|_| u64::try_from(sum).map(Value::from))
            .map_err(|_| StepError::Overflow { step: "add_from_arg".to_string() });
    }
    let (a, b) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
    Number::from_f64(a + b)
        .map(Value::Number)
        .ok_or_else(|| StepError::Overflow { step: "add_from_arg".to_string() })
}

fn as_i128(n: &Number) -> Option<i128> {
    n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
}
