//! Stat descriptor parsing
//!
//! A descriptor takes one of the forms
//!
//! ```text
//! stat
//! name=stat
//! stat(args)
//! name=stat(args)
//! ```
//!
//! where `args` is a comma-separated list. Each argument is either a
//! positional raster name (position 0 = values, position 1 = weights;
//! positionals must precede keywords) or a `key=value` pair. A keyword
//! value may itself be a comma-separated list of numbers, so
//! `quantile(pop, q=0.25,0.5,0.75)` assigns all three numbers to `q`.
//!
//! Errors carry the stable message prefix `"Invalid stat descriptor."`.

use std::collections::BTreeMap;
use zonalite_core::{Error, Result};

/// Parsed form of a user stat specification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatDescriptor {
    /// Explicit output field name, from the `name=` prefix
    pub name: Option<String>,
    /// Stat identifier
    pub stat: String,
    /// Positional values raster name
    pub values: Option<String>,
    /// Positional weights raster name
    pub weights: Option<String>,
    /// Keyword arguments, in key order
    pub args: BTreeMap<String, String>,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidDescriptor(message.into())
}

/// Take a leading identifier (`[A-Za-z0-9_]+`) off the front of `rest`
fn take_ident<'a>(rest: &mut &'a str) -> &'a str {
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    let ident = &rest[..end];
    *rest = &rest[end..];
    ident
}

/// Parse a stat descriptor string
pub fn parse_stat_descriptor(input: &str) -> Result<StatDescriptor> {
    let descriptor = input.trim();
    if descriptor.is_empty() {
        return Err(invalid("Descriptor is empty."));
    }

    let mut rest = descriptor;
    let first = take_ident(&mut rest);
    if first.is_empty() {
        return Err(invalid("No stat name found."));
    }

    let mut sd = StatDescriptor::default();

    if let Some(after_eq) = rest.strip_prefix('=') {
        rest = after_eq;
        let stat = take_ident(&mut rest);
        if stat.is_empty() {
            return Err(invalid("No stat name found."));
        }
        sd.name = Some(first.to_string());
        sd.stat = stat.to_string();
    } else {
        sd.stat = first.to_string();
    }

    if let Some(after_paren) = rest.strip_prefix('(') {
        let Some(end) = after_paren.find(')') else {
            return Err(invalid("Unterminated argument list."));
        };
        parse_args(&after_paren[..end], &mut sd)?;
        rest = &after_paren[end + 1..];
    }

    if !rest.is_empty() {
        return Err(invalid(format!("Failed to parse: {rest}")));
    }

    Ok(sd)
}

fn parse_args(args: &str, sd: &mut StatDescriptor) -> Result<()> {
    let mut last_key: Option<String> = None;
    let mut positional = 0usize;

    for raw in args.split(',') {
        let arg = raw.trim_start();
        if arg.is_empty() {
            return Err(invalid("Empty argument."));
        }

        match arg.split_once('=') {
            Some((key, value)) => {
                if key.is_empty() || value.is_empty() || value.contains('=') {
                    return Err(invalid(format!("Malformed keyword argument: {arg}")));
                }
                if sd.args.insert(key.to_string(), value.to_string()).is_some() {
                    return Err(invalid(format!("Argument {key} specified multiple times.")));
                }
                last_key = Some(key.to_string());
            }
            None => match &last_key {
                Some(key) => {
                    // A bare number after a keyword extends that keyword's
                    // value list; anything else is out of place.
                    if arg.parse::<f64>().is_err() {
                        return Err(invalid("Raster name provided after keyword arguments."));
                    }
                    if let Some(value) = sd.args.get_mut(key) {
                        value.push(',');
                        value.push_str(arg);
                    }
                }
                None => {
                    match positional {
                        0 => sd.values = Some(arg.to_string()),
                        1 => sd.weights = Some(arg.to_string()),
                        _ => return Err(invalid("Expected keyword argument.")),
                    }
                    positional += 1;
                }
            },
        }
    }

    Ok(())
}
