//! Derivation of the output header from the source header.
//!
//! Outputs carry the source header unchanged except for an optional @PG record for this
//! program, chained to the last program of the existing @PG chain.

use anyhow::Result;
use bstr::BString;
use noodles::sam::Header;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::Program;
use noodles::sam::header::record::value::map::program::tag;
use std::collections::HashSet;

/// Name and base @PG ID of this program.
pub const PROGRAM_NAME: &str = "bamsplit";

/// Get the ID of the last program in the @PG chain (for PP chaining).
///
/// The last program is the one no other program references through its PP tag.
#[must_use]
pub fn get_last_program_id(header: &Header) -> Option<String> {
    let program_map = header.programs().as_ref();

    if program_map.is_empty() {
        return None;
    }

    let referenced: HashSet<&[u8]> = program_map
        .values()
        .filter_map(|pg| pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID))
        .map(|pp| pp.as_slice())
        .collect();

    program_map
        .keys()
        .find(|id| !referenced.contains(id.as_slice()))
        .or_else(|| program_map.keys().next())
        .map(|id| String::from_utf8_lossy(id).to_string())
}

/// Create a unique program ID by appending .1, .2, etc. if needed.
#[must_use]
pub fn make_unique_program_id(header: &Header, base_id: &str) -> String {
    let program_map = header.programs().as_ref();

    if !program_map.contains_key(base_id.as_bytes()) {
        return base_id.to_string();
    }

    (1..)
        .map(|i| format!("{base_id}.{i}"))
        .find(|candidate| !program_map.contains_key(candidate.as_bytes()))
        .unwrap_or_else(|| base_id.to_string())
}

/// Build the @PG record for this program.
///
/// SAM forbids empty tag values, so an empty version or command line is left out.
pub fn build_program_record(
    version: &str,
    command_line: &str,
    previous_program: Option<&str>,
) -> Result<Map<Program>> {
    let mut builder = Map::<Program>::builder().insert(tag::NAME, PROGRAM_NAME);

    if !version.is_empty() {
        builder = builder.insert(tag::VERSION, version);
    }
    if !command_line.is_empty() {
        builder = builder.insert(tag::COMMAND_LINE, command_line);
    }
    if let Some(pp) = previous_program {
        builder = builder.insert(tag::PREVIOUS_PROGRAM_ID, pp);
    }

    Ok(builder.build()?)
}

/// Add a @PG record for this program to `header`, chained to the existing last program.
///
/// The reference catalog and read groups are untouched.
pub fn add_pg_record(mut header: Header, version: &str, command_line: &str) -> Result<Header> {
    let previous_program = get_last_program_id(&header);
    let unique_id = make_unique_program_id(&header, PROGRAM_NAME);
    let pg_record = build_program_record(version, command_line, previous_program.as_deref())?;

    header.programs_mut().add(BString::from(unique_id), pg_record)?;

    Ok(header)
}

/// Build the header written to every output.
pub fn derive_output_header(
    source: &Header,
    add_pg: bool,
    version: &str,
    command_line: &str,
) -> Result<Header> {
    let header = source.clone();
    if add_pg { add_pg_record(header, version, command_line) } else { Ok(header) }
}
