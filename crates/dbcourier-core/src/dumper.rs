use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// A replayable logical dump of one database, generated fresh per run and
/// consumed exactly once by the packager.
#[derive(Debug, Clone)]
pub struct DumpDocument {
    pub database: String,
    pub generated_at: DateTime<Utc>,
    pub sql: String,
}

impl DumpDocument {
    /// `<database>_<ISO-date>` stem shared by the staging file and the archive.
    pub fn entry_stem(&self) -> String {
        format!("{}_{}", self.database, self.generated_at.format("%Y-%m-%d"))
    }
}

/// Header comment plus the directives that make a dump replayable without
/// external context.
pub fn dump_preamble(database: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "-- ------------------------------------------------------\n\
         -- Logical dump of `{database}`\n\
         -- Generated: {} UTC\n\
         -- ------------------------------------------------------\n\
         \n\
         CREATE DATABASE IF NOT EXISTS `{database}`;\n\
         USE `{database}`;\n\
         \n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Trait for producing logical dumps
#[async_trait]
pub trait Dumper: Send + Sync {
    /// Dump the schema and data of the named database.
    ///
    /// Fails with [`Error::Connection`](crate::Error::Connection) or
    /// [`Error::Query`](crate::Error::Query); no partial document is ever
    /// returned as success.
    async fn dump(&self, target: &str) -> Result<DumpDocument>;
}
