use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::pickup::PickupSchedule;
use crate::store::DonationStore;

/// Everything the dashboard holds in memory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub store: DonationStore,
    pub pickups: PickupSchedule,
}

/// Write a gzip-compressed bincode snapshot into any writer.
pub fn write_snapshot<W: Write>(snapshot: &Snapshot, writer: W) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut writer = BufWriter::new(encoder);
    serialize_into(&mut writer, snapshot)?;
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;
    Ok(())
}

pub fn read_snapshot<R: Read>(reader: R) -> Result<Snapshot> {
    let decoder = GzDecoder::new(reader);
    let mut reader = BufReader::new(decoder);
    Ok(deserialize_from(&mut reader)?)
}

pub fn save_snapshot(snapshot: &Snapshot, filename: impl AsRef<Path>) -> Result<()> {
    let file = File::create(filename)?;
    write_snapshot(snapshot, file)
}

pub fn load_snapshot(filename: impl AsRef<Path>) -> Result<Snapshot> {
    let file = File::open(filename)?;
    read_snapshot(file)
}

pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_snapshot(snapshot, &mut buffer)?;
    Ok(buffer)
}

pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot> {
    read_snapshot(bytes)
}
