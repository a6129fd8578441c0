//! File-path uniqueness across zones (§4.1 "File presence", P3).

use camino::Utf8PathBuf;
use isccfg_cfg::token::Location;
use isccfg_cfg::SymbolTable;

/// Whether a zone uses its `file` for writing (primary, and inline-signed
/// secondary) or only ever reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileAccessMode {
    ReadOnly,
    Writable,
}

/// Enforces P3: if any zone has path F as its writable file, no other
/// zone may refer to F at all; two read-only uses of the same path may
/// coexist.
#[derive(Default)]
pub struct ZoneFileRegistry {
    table: SymbolTable<Utf8PathBuf, FileAccessMode>,
}

impl ZoneFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        path: Utf8PathBuf,
        mode: FileAccessMode,
        location: Location,
    ) -> Result<(), isccfg_cfg::Definition<FileAccessMode>> {
        self.table
            .define_or_merge(path, mode, location, |existing, new| {
                *existing == FileAccessMode::ReadOnly && *new == FileAccessMode::ReadOnly
            })
            .map_err(|d| d.clone())
    }
}
