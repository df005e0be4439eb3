use std::collections::HashSet;

use serde::Deserialize;

use crate::error::GpError;

/// Top-level shape of the camera's media listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaListing {
    #[serde(default)]
    pub media: Vec<MediaDirectory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaDirectory {
    #[serde(rename = "d")]
    pub directory: String,
    #[serde(rename = "fs", default)]
    pub files: Vec<RawMediaEntry>,
}

/// One listing entry as the camera reports it: either a plain file, or a
/// grouped burst sharing aggregate size metadata. Numbers arrive as decimal
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMediaEntry {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "s")]
    pub size: String,
    #[serde(rename = "g", default)]
    pub group_id: Option<String>,
    #[serde(rename = "b", default)]
    pub first_index: Option<String>,
    #[serde(rename = "l", default)]
    pub last_index: Option<String>,
    #[serde(rename = "m", default)]
    pub deleted_indices: Vec<String>,
    #[serde(rename = "cre", default)]
    pub created: Option<String>,
    #[serde(rename = "mod", default)]
    pub modified: Option<String>,
}

/// A single downloadable file after group expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub size: u64,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Expand grouped burst records into individual files, preserving input
/// order. Pure function; plain files pass through unchanged.
pub fn expand(entries: &[RawMediaEntry]) -> Result<Vec<MediaFile>, GpError> {
    let mut files = Vec::new();
    for entry in entries {
        if entry.group_id.is_some() {
            expand_group(entry, &mut files)?;
        } else {
            files.push(MediaFile {
                name: entry.name.clone(),
                size: parse_number(&entry.size, &entry.name)?,
                created: entry.created.clone(),
                modified: entry.modified.clone(),
            });
        }
    }
    Ok(files)
}

/// A group with base B, last L, deleted set D and aggregate size S becomes
/// one file per index in `[B, L]` not in D, each of size
/// `floor(S / member_count)`; the remainder is truncated, not redistributed.
fn expand_group(entry: &RawMediaEntry, files: &mut Vec<MediaFile>) -> Result<(), GpError> {
    let first: u32 = parse_field(entry.first_index.as_deref(), "b", &entry.name)?;
    let last: u32 = parse_field(entry.last_index.as_deref(), "l", &entry.name)?;
    if last < first {
        return Err(GpError::Protocol(format!(
            "group {} has last index {last} below first index {first}",
            entry.name
        )));
    }

    let deleted = entry
        .deleted_indices
        .iter()
        .map(|index| parse_number(index, &entry.name))
        .collect::<Result<HashSet<u64>, _>>()?;

    let prefix = entry.name.get(..4).ok_or_else(|| {
        GpError::Protocol(format!("group name {:?} shorter than its prefix", entry.name))
    })?;
    let extension = entry
        .name
        .rfind('.')
        .map(|dot| &entry.name[dot..])
        .unwrap_or("");
    let total = parse_number(&entry.size, &entry.name)?;

    let members: Vec<u32> = (first..=last)
        .filter(|index| !deleted.contains(&(*index as u64)))
        .collect();
    if members.is_empty() {
        return Ok(());
    }
    let per_file = total / members.len() as u64;

    for index in members {
        files.push(MediaFile {
            name: format!("{prefix}{index:04}{extension}"),
            size: per_file,
            created: entry.created.clone(),
            modified: entry.modified.clone(),
        });
    }
    Ok(())
}

fn parse_number(value: &str, name: &str) -> Result<u64, GpError> {
    value
        .parse()
        .map_err(|_| GpError::Protocol(format!("bad number {value:?} in listing entry {name}")))
}

fn parse_field(value: Option<&str>, field: &str, name: &str) -> Result<u32, GpError> {
    let value = value.ok_or_else(|| {
        GpError::Protocol(format!("group {name} is missing its {field:?} field"))
    })?;
    value
        .parse()
        .map_err(|_| GpError::Protocol(format!("bad number {value:?} in listing entry {name}")))
}
