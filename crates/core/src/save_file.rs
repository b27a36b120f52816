//! Two-line JSONL save files.
//!
//! Line one is a small header carrying the format version, the generation
//! seed, and a SHA-256 checksum of the body line; line two is the body. The
//! header lets tools identify a save without parsing the whole map, and the
//! checksum rejects truncated or hand-edited files before deserialization.

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::mapgen::CityMap;
use crate::navmesh::{NavmeshTile, TileCoord, TileLayout};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum SaveLoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    MissingHeader,
    MissingBody,
    UnsupportedVersion { found: u32 },
    ChecksumMismatch,
}

impl fmt::Display for SaveLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "save file io error: {err}"),
            Self::Json(err) => write!(f, "save file is not valid json: {err}"),
            Self::MissingHeader => write!(f, "save file is empty"),
            Self::MissingBody => write!(f, "save file has a header but no body line"),
            Self::UnsupportedVersion { found } => {
                write!(f, "save format version {found} unsupported (expected {FORMAT_VERSION})")
            }
            Self::ChecksumMismatch => write!(f, "save body does not match its checksum"),
        }
    }
}

impl std::error::Error for SaveLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveLoadError {
    fn from(err: std::io::Error) -> SaveLoadError {
        SaveLoadError::Io(err)
    }
}

impl From<serde_json::Error> for SaveLoadError {
    fn from(err: serde_json::Error) -> SaveLoadError {
        SaveLoadError::Json(err)
    }
}

/// How far the background navmesh build got when the game was saved, plus
/// the tiles it had already built. Carrying the tiles keeps a resumed build
/// from losing everything rasterized before the interruption.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NavmeshProgress {
    pub done: bool,
    /// First tile a resumed build should rasterize; `None` when `done`.
    pub resume_tile: Option<TileCoord>,
    /// Layout the persisted tiles were built against; a resumed build over
    /// a different layout discards them.
    pub layout: Option<TileLayout>,
    pub tiles: Vec<NavmeshTile>,
}

/// Everything a save file persists. Derived map data (door masks, the
/// blocked-edge grid, wall colliders) is rebuilt after loading; navmesh
/// tiles are carried as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveState {
    pub seed: u64,
    pub map: CityMap,
    pub navmesh: NavmeshProgress,
}

#[derive(Serialize, Deserialize)]
struct Header {
    format_version: u32,
    seed: u64,
    body_sha256_hex: String,
}

pub fn save(path: &Path, state: &SaveState) -> Result<(), SaveLoadError> {
    let body = serde_json::to_string(state)?;
    let header = Header {
        format_version: FORMAT_VERSION,
        seed: state.seed,
        body_sha256_hex: sha256_hex(body.as_bytes()),
    };
    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", serde_json::to_string(&header)?)?;
    writeln!(file, "{body}")?;
    Ok(())
}

pub fn load(path: &Path) -> Result<SaveState, SaveLoadError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut lines = reader.lines();
    let header_line = lines.next().ok_or(SaveLoadError::MissingHeader)??;
    let body_line = lines.next().ok_or(SaveLoadError::MissingBody)??;

    let header: Header = serde_json::from_str(&header_line)?;
    if header.format_version != FORMAT_VERSION {
        return Err(SaveLoadError::UnsupportedVersion { found: header.format_version });
    }
    if sha256_hex(body_line.as_bytes()) != header.body_sha256_hex {
        return Err(SaveLoadError::ChecksumMismatch);
    }

    let mut state: SaveState = serde_json::from_str(&body_line)?;
    state.map.rebuild_derived();
    Ok(state)
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|byte| format!("{byte:02x}")).collect()
}
