//! Decode an SD-card capture and summarize what it contains.
//!
//! Run with:
//!   cargo run --example decode-capture -- flight.bin sd-log

use std::collections::BTreeMap;
use std::sync::Arc;

use shart::frame::{FileSource, FrameReader, FrameResult};
use shart::schema::{tag_name, Profile};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: decode-capture <FILE> [PROFILE]")?;
    let profile: Profile = args.next().as_deref().unwrap_or("sd-log").parse()?;

    let registry = Arc::new(profile.registry()?);
    let mut reader = FrameReader::new(FileSource::open(&path)?, registry);

    let mut per_tag: BTreeMap<u8, usize> = BTreeMap::new();
    let mut bad_checksums = 0usize;
    let mut first_timestamp = None;
    let mut last_timestamp = None;

    loop {
        match reader.try_read_packet()? {
            FrameResult::Ok(packet) => {
                *per_tag.entry(packet.tag).or_default() += 1;
                if let Some(timestamp) = packet.fields.first() {
                    first_timestamp.get_or_insert(timestamp.to_string());
                    last_timestamp = Some(timestamp.to_string());
                }
            }
            FrameResult::ChecksumMismatch { .. } => bad_checksums += 1,
            FrameResult::EndOfStream | FrameResult::Truncated { .. } => break,
            _ => {}
        }
    }

    println!("{path} ({profile})");
    for (tag, count) in &per_tag {
        println!("  {:<8} {count}", tag_name(*tag));
    }
    println!("  bad checksums: {bad_checksums}");
    if let (Some(first), Some(last)) = (first_timestamp, last_timestamp) {
        println!("  timestamps: {first} .. {last}");
    }
    Ok(())
}
