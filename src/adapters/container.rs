use crate::utils::error::{Result, TransposeError};
use crate::utils::fs::write_atomic;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::ZipArchive;

pub const DEFAULT_DOCUMENT_SUFFIXES: [&str; 2] = [".xml", ".musicxml"];

const MANIFEST_DIR: &str = "META-INF/";
const MANIFEST_PATH: &str = "META-INF/container.xml";

/// The archive is already in memory, so any zip failure means bad bytes.
fn format_error(err: ZipError) -> TransposeError {
    TransposeError::container(err.to_string())
}

/// Reads the score document out of an MXL archive and writes it back.
#[derive(Debug, Clone)]
pub struct ContainerCodec {
    document_suffixes: Vec<String>,
}

impl Default for ContainerCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_SUFFIXES.iter().map(|s| s.to_string()).collect())
    }
}

impl ContainerCodec {
    pub fn new(document_suffixes: Vec<String>) -> Self {
        Self { document_suffixes }
    }

    pub fn extract(&self, archive_path: &Path) -> Result<(String, Vec<u8>)> {
        let bytes = std::fs::read(archive_path)?;
        self.extract_bytes(&bytes)
    }

    pub fn repack(
        &self,
        archive_path: &Path,
        entry_name: &str,
        new_bytes: &[u8],
        output_path: &Path,
    ) -> Result<()> {
        // 先完整讀入來源，輸出路徑與輸入相同也安全
        let source = std::fs::read(archive_path)?;
        let packed = self.repack_bytes(&source, entry_name, new_bytes)?;
        write_atomic(output_path, &packed)?;
        Ok(())
    }

    pub fn extract_bytes(&self, archive_bytes: &[u8]) -> Result<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(archive_bytes)).map_err(format_error)?;
        let entry_name = self.locate_document(&mut archive)?;
        let data = read_entry(&mut archive, &entry_name)?;

        tracing::debug!("Extracted '{}' ({} bytes)", entry_name, data.len());
        Ok((entry_name, data))
    }

    /// Copy every entry of `source` unchanged except `entry_name`, whose
    /// content becomes `new_bytes`. Entry order, the archive comment, and the
    /// compression method, timestamp and permissions of the replaced entry
    /// are kept.
    pub fn repack_bytes(&self, source: &[u8], entry_name: &str, new_bytes: &[u8]) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(source)).map_err(format_error)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut replaced = false;

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(format_error)?;

            if entry.name() != entry_name {
                writer.raw_copy_file(entry)?;
                continue;
            }

            let mut options = SimpleFileOptions::default().compression_method(entry.compression());
            if let Some(modified) = entry.last_modified() {
                options = options.last_modified_time(modified);
            }
            if let Some(mode) = entry.unix_mode() {
                options = options.unix_permissions(mode);
            }
            let name = entry.name().to_string();
            drop(entry);

            writer.start_file(name, options)?;
            writer.write_all(new_bytes)?;
            replaced = true;
        }

        if !replaced {
            return Err(TransposeError::container(format!(
                "entry '{}' not found in archive",
                entry_name
            )));
        }

        writer.set_raw_comment(archive.comment().into());
        let cursor = writer.finish()?;
        let packed = cursor.into_inner();
        tracing::debug!("Repacked {} entries ({} bytes)", archive.len(), packed.len());
        Ok(packed)
    }

    /// Name of the score document entry: the manifest's first rootfile when
    /// it exists, else the first entry outside `META-INF/` with a document
    /// suffix.
    pub fn locate_document<R: Read + std::io::Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<String> {
        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            names.push(archive.by_index_raw(index).map_err(format_error)?.name().to_string());
        }

        if names.iter().any(|name| name == MANIFEST_PATH) {
            let manifest = read_entry(archive, MANIFEST_PATH)?;
            match manifest_rootfile(&manifest) {
                Some(rootfile) if names.contains(&rootfile) => return Ok(rootfile),
                Some(rootfile) => tracing::warn!(
                    "Manifest rootfile '{}' is not in the archive, scanning entries",
                    rootfile
                ),
                None => tracing::debug!("Manifest names no rootfile, scanning entries"),
            }
        }

        names
            .into_iter()
            .find(|name| self.is_document_name(name))
            .ok_or_else(|| TransposeError::container("no document entry found"))
    }

    fn is_document_name(&self, name: &str) -> bool {
        if name.starts_with(MANIFEST_DIR) || name.ends_with('/') {
            return false;
        }
        let lower = name.to_ascii_lowercase();
        self.document_suffixes
            .iter()
            .any(|suffix| lower.ends_with(&suffix.to_ascii_lowercase()))
    }
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name).map_err(format_error)?;
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)
        .map_err(|e| TransposeError::container(format!("cannot read entry '{}': {}", name, e)))?;
    Ok(data)
}

/// `full-path` of the first `<rootfile>` in `META-INF/container.xml`.
fn manifest_rootfile(manifest: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(manifest);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"rootfile" => {
                return e
                    .attributes()
                    .filter_map(|a| a.ok())
                    .find(|a| a.key.as_ref() == b"full-path")
                    .and_then(|a| a.unescape_value().ok())
                    .map(|value| value.into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
