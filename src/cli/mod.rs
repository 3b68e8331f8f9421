//! Terminal front end: command handlers and table rendering.

pub mod catalog;
pub mod export;
pub mod query;
pub mod setup;
pub mod ui;

use crate::core::SeriesCode;
use anyhow::{Context, Result};

/// Parses a `CODE[:LABEL]` argument such as `433:IPCA`.
pub fn parse_series_arg(arg: &str) -> Result<(SeriesCode, String)> {
    let (code, label) = match arg.split_once(':') {
        Some((code, label)) => (code, label.trim().to_string()),
        None => (arg, String::new()),
    };
    let code = code
        .parse::<SeriesCode>()
        .with_context(|| format!("Invalid series argument: {arg}"))?;
    Ok((code, label))
}
