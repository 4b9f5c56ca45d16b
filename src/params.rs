//! `--param name=value` parsing

use crate::error::{Result, RunForgeError};
use std::iter::FromIterator;
use std::slice;

fn parse_error(param: &str, reason: &str) -> RunForgeError {
    RunForgeError::ParamParseError {
        param: param.to_string(),
        reason: reason.to_string(),
    }
}

/// Split a single `name=value` argument on its first `=`.
///
/// The value is passed on untouched apart from surrounding whitespace;
/// typing happens in the validator.
pub fn parse_param(arg: &str) -> Result<(String, String)> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| parse_error(arg, "expected format name=value"))?;

    let name = name.trim();
    let value = value.trim();

    if name.is_empty() {
        return Err(parse_error(arg, "parameter name is empty"));
    }
    if value.is_empty() {
        return Err(parse_error(arg, "parameter value is empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(parse_error(
            arg,
            "parameter name must contain only letters, digits and underscores",
        ));
    }

    Ok((name.to_string(), value.to_string()))
}

/// Raw `name=value` strings in the order the user gave them.
///
/// Re-inserting a name moves it to the end with the new value, so the
/// last occurrence decides both the value and the position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(Vec<(String, String)>);

fn pair_refs(pair: &(String, String)) -> (&String, &String) {
    (&pair.0, &pair.1)
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|(existing, _)| *existing != name);
        self.0.push((name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter().map(pair_refs)
    }
}

impl<'a> IntoIterator for &'a RawParams {
    type Item = (&'a String, &'a String);
    type IntoIter = std::iter::Map<slice::Iter<'a, (String, String)>, fn(&'a (String, String)) -> (&'a String, &'a String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(pair_refs as fn(&'a (String, String)) -> (&'a String, &'a String))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RawParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Parse every `--param` argument, keeping input order
pub fn parse_params<S: AsRef<str>>(args: &[S]) -> Result<RawParams> {
    let mut params = RawParams::new();
    for arg in args {
        let (name, value) = parse_param(arg.as_ref())?;
        params.insert(name, value);
    }
    Ok(params)
}
