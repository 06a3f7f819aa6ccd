//! `decode` command implementation.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use contracts::ticks;
use serde::Serialize;
use tracing::{debug, info};
use wire::{decode_tagged, MessagePool, TimestampedValue};

use crate::cli::DecodeArgs;
use crate::error::{self, CliError};

/// Decoded payload file for JSON output
#[derive(Debug, Serialize)]
struct DecodedFile {
    path: String,
    bytes: usize,
    entries: usize,
    tags: Vec<TagSummary>,
}

/// Values of one tag within a payload
#[derive(Debug, Serialize)]
struct TagSummary {
    tag: String,
    count: usize,
    min: i64,
    max: i64,
    /// Unix milliseconds of the earliest value
    first_ms: i64,
    /// Unix milliseconds of the latest value
    last_ms: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    values: Vec<(i64, i64)>,
}

/// Execute the `decode` command
pub fn run_decode(args: &DecodeArgs) -> Result<()> {
    let pool = MessagePool::new();
    let mut decoded = Vec::with_capacity(args.files.len());

    for path in &args.files {
        info!(path = %path.display(), "Decoding payload");
        decoded.push(decode_file(path, &pool, args.values)?);
    }

    if args.json {
        let json =
            serde_json::to_string_pretty(&decoded).context("Failed to serialize decoded payloads")?;
        println!("{}", json);
    } else {
        for file in &decoded {
            print_decoded(file);
        }
    }

    Ok(())
}

fn decode_file(path: &Path, pool: &MessagePool, with_values: bool) -> error::Result<DecodedFile> {
    let payload = std::fs::read(path)?;
    let messages = decode_tagged(&payload, pool).map_err(|e| CliError::decode(path, e))?;

    // A tag spanning several messages is merged back into one summary
    let mut per_tag: BTreeMap<String, Vec<TimestampedValue>> = BTreeMap::new();
    for message in &messages {
        per_tag
            .entry(message.tag_value().to_string())
            .or_default()
            .extend_from_slice(message.entries());
    }
    debug!(messages = messages.len(), tags = per_tag.len(), "Payload decoded");
    pool.release_all(messages);

    let tags: Vec<TagSummary> = per_tag
        .into_iter()
        .map(|(tag, values)| summarize(tag, &values, with_values))
        .collect();

    Ok(DecodedFile {
        path: path.display().to_string(),
        bytes: payload.len(),
        entries: tags.iter().map(|t| t.count).sum(),
        tags,
    })
}

fn summarize(tag: String, values: &[TimestampedValue], with_values: bool) -> TagSummary {
    let min = values.iter().map(|v| v.value).min().unwrap_or_default();
    let max = values.iter().map(|v| v.value).max().unwrap_or_default();
    let first = values.iter().map(|v| v.ticks).min().unwrap_or(ticks::UNIX_EPOCH_TICKS);
    let last = values.iter().map(|v| v.ticks).max().unwrap_or(ticks::UNIX_EPOCH_TICKS);

    TagSummary {
        tag,
        count: values.len(),
        min,
        max,
        first_ms: ticks::to_unix_millis(first),
        last_ms: ticks::to_unix_millis(last),
        values: if with_values {
            values
                .iter()
                .map(|v| (ticks::to_unix_millis(v.ticks), v.value))
                .collect()
        } else {
            Vec::new()
        },
    }
}

fn print_decoded(file: &DecodedFile) {
    println!(
        "\n{} ({} bytes, {} entries)",
        file.path, file.bytes, file.entries
    );
    for tag in &file.tags {
        let name = if tag.tag.is_empty() { "<untagged>" } else { &tag.tag };
        println!(
            "  {}: n={} min={} max={} span={}ms",
            name,
            tag.count,
            tag.min,
            tag.max,
            tag.last_ms - tag.first_ms
        );
        for (millis, value) in &tag.values {
            println!("    {} {}", millis, value);
        }
    }
}
