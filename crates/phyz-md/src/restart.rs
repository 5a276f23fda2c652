//! Text restart chunks for checkpointing a parameter table.
//!
//! A chunk is line oriented:
//!
//! ```text
//! LJCut format=fixed species=2
//! species A epsilon=1 sigma=1 rCut=2.5 sigma_R=- r_A=- alpha_A=- G=- r_G=- sigma_G=-
//! species B epsilon=4 sigma=2 rCut=5 sigma_R=- r_A=- alpha_A=- G=- r_G=- sigma_G=-
//! pair A B epsilon=1.5
//! end
//! ```
//!
//! Species lines carry all fields in fixed order; `-` marks an unset field.
//! Pair lines carry only the overridden fields.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::error::{PairError, RestartFormatError, Result};
use crate::species::{FIELD_COUNT, Field, ParameterTable};

const UNSET: &str = "-";
const END: &str = "end";

/// Number formatting used when writing a chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartFormat {
    /// Shortest decimal that reads back to the same value.
    #[default]
    Fixed,
    /// Fixed number of decimal places.
    FixedPrecision(usize),
    /// Shortest scientific notation that reads back to the same value.
    Exponential,
    /// Scientific notation with a fixed number of mantissa digits.
    ExponentialPrecision(usize),
}

impl RestartFormat {
    fn format_value(self, value: f64) -> String {
        match self {
            RestartFormat::Fixed => format!("{value}"),
            RestartFormat::FixedPrecision(p) => format!("{value:.p$}"),
            RestartFormat::Exponential => format!("{value:e}"),
            RestartFormat::ExponentialPrecision(p) => format!("{value:.p$e}"),
        }
    }
}

impl fmt::Display for RestartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartFormat::Fixed => f.write_str("fixed"),
            RestartFormat::FixedPrecision(p) => write!(f, "fixed:{p}"),
            RestartFormat::Exponential => f.write_str("exp"),
            RestartFormat::ExponentialPrecision(p) => write!(f, "exp:{p}"),
        }
    }
}

impl FromStr for RestartFormat {
    type Err = RestartFormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let unknown = || RestartFormatError::UnknownFormat(s.to_string());
        let (kind, precision) = match s.split_once(':') {
            Some((kind, p)) => (kind, Some(p.parse::<usize>().map_err(|_| unknown())?)),
            None => (s, None),
        };
        match (kind, precision) {
            ("fixed", None) => Ok(RestartFormat::Fixed),
            ("fixed", Some(p)) => Ok(RestartFormat::FixedPrecision(p)),
            ("exp", None) => Ok(RestartFormat::Exponential),
            ("exp", Some(p)) => Ok(RestartFormat::ExponentialPrecision(p)),
            _ => Err(unknown()),
        }
    }
}

/// Serialize a table under the given potential tag.
pub fn write_chunk(table: &ParameterTable, tag: &str, format: RestartFormat) -> String {
    let mut out = String::new();
    out.push_str(&format!("{tag} format={format} species={}\n", table.len()));

    for (_, record) in table.records() {
        out.push_str("species ");
        out.push_str(record.handle());
        for field in Field::ALL {
            write_field(&mut out, field, record.get(field), format);
        }
        out.push('\n');
    }

    for ((a, b), values) in table.overrides() {
        // Overrides only exist between registered species.
        let (Ok(ra), Ok(rb)) = (table.record(a), table.record(b)) else {
            continue;
        };
        out.push_str(&format!("pair {} {}", ra.handle(), rb.handle()));
        for field in Field::ALL {
            if values[field.slot()].is_some() {
                write_field(&mut out, field, values[field.slot()], format);
            }
        }
        out.push('\n');
    }

    out.push_str(END);
    out.push('\n');
    out
}

fn write_field(out: &mut String, field: Field, value: Option<f64>, format: RestartFormat) {
    out.push(' ');
    out.push_str(field.name());
    out.push('=');
    match value {
        Some(v) => out.push_str(&format.format_value(v)),
        None => out.push_str(UNSET),
    }
}

/// Split `name=value` and parse both halves.
fn parse_assignment(line: usize, token: &str) -> Result<(Field, Option<f64>)> {
    let (name, text) = token
        .split_once('=')
        .ok_or_else(|| RestartFormatError::Malformed {
            line,
            message: format!("expected name=value, found '{token}'"),
        })?;
    let field = name
        .parse::<Field>()
        .map_err(|_| RestartFormatError::UnknownField {
            line,
            name: name.to_string(),
        })?;
    if text == UNSET {
        return Ok((field, None));
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok((field, Some(v))),
        _ => Err(RestartFormatError::BadNumber {
            line,
            text: text.to_string(),
        }
        .into()),
    }
}

/// Parse a chunk written by [`write_chunk`] for the given potential tag.
pub fn read_chunk(chunk: &str, tag: &str) -> Result<ParameterTable> {
    let mut lines = chunk
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (header_line, header) = lines.next().ok_or(RestartFormatError::MissingHeader)?;
    let declared = parse_header(header_line, header, tag)?;

    let mut table = ParameterTable::new();
    let mut ended = false;
    for (line, text) in lines.by_ref() {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens[0] {
            "species" => {
                let Some(&handle) = tokens.get(1) else {
                    return Err(malformed(line, "species line without a handle"));
                };
                let assignments = &tokens[2..];
                if assignments.len() != FIELD_COUNT {
                    return Err(RestartFormatError::FieldCount {
                        line,
                        expected: FIELD_COUNT,
                        found: assignments.len(),
                    }
                    .into());
                }
                let mut values = [None; FIELD_COUNT];
                for (expected, token) in Field::ALL.into_iter().zip(assignments) {
                    let (field, value) = parse_assignment(line, token)?;
                    if field != expected {
                        return Err(RestartFormatError::FieldOrder {
                            line,
                            expected: expected.name(),
                            found: field.name().to_string(),
                        }
                        .into());
                    }
                    values[field.slot()] = value;
                }
                table
                    .restore_species(handle, values)
                    .map_err(|e| malformed(line, &e.to_string()))?;
            }
            "pair" => {
                if tokens.len() < 4 {
                    return Err(malformed(line, "pair line needs two handles and a field"));
                }
                let a = table
                    .species(tokens[1])
                    .map_err(|e| malformed(line, &e.to_string()))?;
                let b = table
                    .species(tokens[2])
                    .map_err(|e| malformed(line, &e.to_string()))?;
                for token in &tokens[3..] {
                    let (field, value) = parse_assignment(line, token)?;
                    let Some(value) = value else {
                        return Err(malformed(line, "pair overrides cannot be unset"));
                    };
                    table
                        .set_pair_field(a, b, field, value)
                        .map_err(|e| malformed(line, &e.to_string()))?;
                }
            }
            END => {
                ended = true;
                break;
            }
            other => return Err(malformed(line, &format!("unexpected record '{other}'"))),
        }
    }

    if !ended {
        return Err(malformed(chunk.lines().count(), "missing end marker"));
    }
    if let Some((line, _)) = lines.next() {
        return Err(malformed(line, "content after end marker"));
    }
    if table.len() != declared {
        return Err(RestartFormatError::SpeciesCount {
            declared,
            found: table.len(),
        }
        .into());
    }

    debug!("restored {} species from {tag} restart chunk", table.len());
    Ok(table)
}

fn malformed(line: usize, message: &str) -> PairError {
    RestartFormatError::Malformed {
        line,
        message: message.to_string(),
    }
    .into()
}

/// Check the header line and return the declared species count.
fn parse_header(line: usize, header: &str, tag: &str) -> Result<usize> {
    let mut tokens = header.split_whitespace();
    let found = tokens.next().ok_or(RestartFormatError::MissingHeader)?;
    if found != tag {
        return Err(RestartFormatError::UnsupportedTag(found.to_string()).into());
    }

    let mut declared = None;
    for token in tokens {
        match token.split_once('=') {
            Some(("format", f)) => {
                f.parse::<RestartFormat>()?;
            }
            Some(("species", n)) => {
                declared = Some(n.parse::<usize>().map_err(|_| malformed(line, "bad species count"))?);
            }
            _ => return Err(malformed(line, &format!("unexpected header token '{token}'"))),
        }
    }
    declared.ok_or_else(|| malformed(line, "header lacks species count"))
}
