//! Zip package container

use crate::Result;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// One entry of the zip package
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    modified: DateTime,
    is_dir: bool,
}

/// An in-memory OOXML package
///
/// Entries keep their original order, compression and timestamps so that
/// writing an unmodified package back out is deterministic.
#[derive(Debug, Clone)]
pub struct Package {
    entries: Vec<Entry>,
}

impl Package {
    /// Read a package from zip bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            if !file.is_dir() {
                file.read_to_end(&mut data)?;
            }
            entries.push(Entry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                modified: file.last_modified().unwrap_or_default(),
                is_dir: file.is_dir(),
            });
        }

        Ok(Self { entries })
    }

    /// Names of all parts, in package order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name.as_str())
    }

    /// Raw bytes of a part
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|entry| !entry.is_dir && entry.name == name)
            .map(|entry| entry.data.as_slice())
    }

    /// Whether the package contains a part
    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Replace the bytes of a part, or append a new part
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self
            .entries
            .iter_mut()
            .find(|entry| !entry.is_dir && entry.name == name)
        {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                compression: CompressionMethod::Deflated,
                modified: DateTime::default(),
                is_dir: false,
            }),
        }
    }

    /// Write the package back out as zip bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            // Only the two methods every OOXML consumer reads are written back
            let compression = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default()
                .compression_method(compression)
                .last_modified_time(entry.modified);

            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}
