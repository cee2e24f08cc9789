use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::{Compression, GzBuilder};
use tracing::debug;

use crate::dumper::DumpDocument;
use crate::Result;

/// On-disk files staged for one target: the uncompressed dump and the archive
/// derived from it. Both are owned by the run that created them and are
/// deleted by the orchestrator, never by the packager.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub dump_path: PathBuf,
    pub archive_path: PathBuf,
    pub entry_name: String,
}

impl Artifact {
    /// Deterministic staging paths for a document: `<target>_<date>.sql` and
    /// `<target>_<date>.sql.gz` under `dir`.
    pub fn for_document(document: &DumpDocument, dir: &Path) -> Self {
        let stem = document.entry_stem();
        let entry_name = format!("{stem}.sql");
        Self {
            dump_path: dir.join(&entry_name),
            archive_path: dir.join(format!("{stem}.sql.gz")),
            entry_name,
        }
    }
}

/// Compresses a dump document into a single-entry gzip archive.
#[derive(Debug, Default)]
pub struct Packager;

impl Packager {
    /// Writes the staging `.sql` file and the finished archive.
    ///
    /// The archive is fully flushed and closed before this returns. The
    /// staging file is left in place so a failure between compression and
    /// cleanup stays inspectable.
    pub fn compress(&self, document: &DumpDocument, artifact: &Artifact) -> Result<()> {
        if let Some(parent) = artifact.archive_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&artifact.dump_path, document.sql.as_bytes())?;

        let archive = File::create(&artifact.archive_path)?;
        let mut encoder = GzBuilder::new()
            .filename(artifact.entry_name.as_str())
            .write(archive, Compression::best());
        encoder.write_all(document.sql.as_bytes())?;
        encoder.finish()?;

        debug!(
            "[{}] Compressed dump into {}",
            document.database,
            artifact.archive_path.display()
        );
        Ok(())
    }
}
