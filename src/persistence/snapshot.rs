use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::hex::{CubeCoord, hex_count};
use crate::simulation::SimulationState;
use crate::store::{HISTORY_LIMIT, hex_key};

/// Metadata about a snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotMetadata {
    pub path: PathBuf,
    pub day_count: u64,
    pub timestamp: u64,
    pub file_size: u64,
}

/// Errors that can occur during snapshot operations.
#[derive(Debug)]
pub enum SnapshotError {
    Io(io::Error),
    Serialize(String),
    Deserialize(String),
    Corrupt(PathBuf),
    NoValidSnapshots,
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "I/O error: {}", e),
            SnapshotError::Serialize(e) => write!(f, "Serialization error: {}", e),
            SnapshotError::Deserialize(e) => write!(f, "Deserialization error: {}", e),
            SnapshotError::Corrupt(path) => {
                write!(f, "Corrupt snapshot: {}", path.display())
            }
            SnapshotError::NoValidSnapshots => {
                write!(
                    f,
                    "No valid snapshots found. Start a new simulation with: hexweather run"
                )
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

fn snapshot_filename(day_count: u64, timestamp: u64) -> String {
    format!("weather-day{}-{}.bin", day_count, timestamp)
}

/// Parse day count and timestamp from `weather-day{N}-{timestamp}.bin`.
fn parse_snapshot_filename(filename: &str) -> Option<(u64, u64)> {
    let stem = filename.strip_suffix(".bin")?;
    let rest = stem.strip_prefix("weather-day")?;
    let (day_str, ts_str) = rest.split_once('-')?;
    let day = day_str.parse::<u64>().ok()?;
    let ts = ts_str.parse::<u64>().ok()?;
    Some((day, ts))
}

fn unix_timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Write `bytes` to `target` through a hidden sibling temp file and a rename,
/// so readers never see a half-written snapshot.
fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    let tmp = target.with_file_name(format!(".{}.tmp", name));

    let result = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, target));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Save a simulation snapshot as `weather-day{N}-{unix_ts}.bin`.
pub fn save_snapshot(
    state: &SimulationState,
    snapshot_dir: &Path,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(snapshot_dir)?;

    let encoded = bincode::serialize(state).map_err(|e| SnapshotError::Serialize(e.to_string()))?;
    let target = snapshot_dir.join(snapshot_filename(state.day_count, unix_timestamp_now()));
    write_atomic(&target, &encoded)?;
    Ok(target)
}

/// Load a simulation state from a snapshot file, rejecting states that do
/// not describe one consistent region.
pub fn load_snapshot(path: &Path) -> Result<SimulationState, SnapshotError> {
    let data = fs::read(path)?;
    let state: SimulationState =
        bincode::deserialize(&data).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;

    if is_consistent(&state) {
        Ok(state)
    } else {
        Err(SnapshotError::Corrupt(path.to_path_buf()))
    }
}

/// The region holds exactly the hexes its radius implies, in coordinate
/// order, and every current and archived weather entry is filed under its
/// own key on the region's map.
fn is_consistent(state: &SimulationState) -> bool {
    let region = &state.region;
    let map_path = region.map_path();

    let sorted = region.hexes.windows(2).all(|w| w[0].coord < w[1].coord);
    if region.hexes.len() != hex_count(region.params.radius) || !sorted {
        return false;
    }

    let belongs = |key: &str, entry_map: &str, coord: CubeCoord| {
        entry_map == map_path
            && region.hex(coord).is_some()
            && key == hex_key(map_path, coord.q, coord.r, coord.s)
    };

    let current_ok = state
        .weather
        .current
        .iter()
        .all(|(key, e)| belongs(key, &e.map_path, e.weather.hex_coord));
    let history_ok = state.weather.history.iter().all(|(key, h)| {
        h.entries.len() <= HISTORY_LIMIT
            && h.entries
                .iter()
                .all(|entry| belongs(key, &h.map_path, entry.weather.hex_coord))
    });
    current_ok && history_ok
}

/// List snapshots in a directory, newest first. Temp files and foreign
/// names are skipped; a missing directory lists as empty.
pub fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    if !snapshot_dir.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in fs::read_dir(snapshot_dir)? {
        let entry = entry?;
        let path = entry.path();
        let parsed = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.starts_with('.'))
            .and_then(parse_snapshot_filename);
        let Some((day_count, timestamp)) = parsed else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        snapshots.push(SnapshotMetadata {
            file_size: entry.metadata().map(|m| m.len()).unwrap_or(0),
            path,
            day_count,
            timestamp,
        });
    }

    snapshots.sort_by(|a, b| (b.timestamp, b.day_count).cmp(&(a.timestamp, a.day_count)));
    Ok(snapshots)
}

/// Prune old snapshots, keeping only the `max_snapshots` most recent.
///
/// Returns the list of deleted file paths.
pub fn prune_snapshots(
    snapshot_dir: &Path,
    max_snapshots: usize,
) -> Result<Vec<PathBuf>, SnapshotError> {
    let snapshots = list_snapshots(snapshot_dir)?;

    let mut deleted = Vec::new();
    if snapshots.len() > max_snapshots {
        for snapshot in &snapshots[max_snapshots..] {
            fs::remove_file(&snapshot.path)?;
            deleted.push(snapshot.path.clone());
        }
    }

    Ok(deleted)
}

/// Load the most recent valid snapshot, falling back to older ones if the latest is corrupt.
///
/// Returns an error only if no valid snapshots exist.
pub fn load_latest_valid_snapshot(
    snapshot_dir: &Path,
) -> Result<SimulationState, SnapshotError> {
    let snapshots = list_snapshots(snapshot_dir)?;

    if snapshots.is_empty() {
        return Err(SnapshotError::NoValidSnapshots);
    }

    for snapshot in &snapshots {
        match load_snapshot(&snapshot.path) {
            Ok(state) => return Ok(state),
            Err(e) => {
                warn!(
                    path = %snapshot.path.display(),
                    error = %e,
                    "Corrupt snapshot, trying next"
                );
            }
        }
    }

    Err(SnapshotError::NoValidSnapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::region::RegionParams;
    use crate::region::generate_region;
    use crate::simulation::Simulation;
    use crate::weather::climate::get_climate_template;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn make_test_state(days: u32) -> SimulationState {
        let region = generate_region(&RegionParams {
            seed: 42,
            radius: 3,
            ..Default::default()
        });
        let mut sim = Simulation::new(
            region,
            get_climate_template("Temperate").clone(),
            NaiveDate::from_ymd_opt(2026, 3, 21).unwrap(),
            270.0,
        );
        for _ in 0..days {
            sim.step();
        }
        sim.state()
    }

    #[test]
    fn save_and_load_round_trip_identical() {
        let dir = TempDir::new().unwrap();
        let state = make_test_state(3);

        let path = save_snapshot(&state, dir.path()).unwrap();
        let restored = load_snapshot(&path).unwrap();

        assert_eq!(state, restored);
        assert_eq!(restored.day_count, 3);
        assert_eq!(restored.weather.len(), restored.region.len());
    }

    #[test]
    fn snapshot_filename_parse_round_trip() {
        let filename = snapshot_filename(45, 1708300000);
        assert_eq!(filename, "weather-day45-1708300000.bin");

        let (day, ts) = parse_snapshot_filename(&filename).unwrap();
        assert_eq!(day, 45);
        assert_eq!(ts, 1708300000);
    }

    #[test]
    fn parse_invalid_filename_returns_none() {
        assert!(parse_snapshot_filename("random.bin").is_none());
        assert!(parse_snapshot_filename("weather-day.bin").is_none());
        assert!(parse_snapshot_filename("weather-dayabc-123.bin").is_none());
        assert!(parse_snapshot_filename("weather-day100-abc.bin").is_none());
        assert!(parse_snapshot_filename("world-tick10-1000.bin").is_none());
    }

    #[test]
    fn list_snapshots_returns_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let data = bincode::serialize(&make_test_state(0)).unwrap();

        fs::write(dir.path().join("weather-day10-1000.bin"), &data).unwrap();
        fs::write(dir.path().join("weather-day20-2000.bin"), &data).unwrap();
        fs::write(dir.path().join("weather-day30-3000.bin"), &data).unwrap();

        let snapshots = list_snapshots(dir.path()).unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].day_count, 30);
        assert_eq!(snapshots[1].day_count, 20);
        assert_eq!(snapshots[2].day_count, 10);
    }

    #[test]
    fn list_snapshots_skips_non_snapshot_files() {
        let dir = TempDir::new().unwrap();
        let data = bincode::serialize(&make_test_state(0)).unwrap();

        fs::write(dir.path().join("weather-day10-1000.bin"), &data).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a snapshot").unwrap();
        fs::write(dir.path().join(".weather-day99-9999.bin.tmp"), "temp file").unwrap();

        let snapshots = list_snapshots(dir.path()).unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[test]
    fn list_snapshots_nonexistent_dir() {
        let snapshots = list_snapshots(Path::new("/tmp/nonexistent_weather_dir_12345")).unwrap();
        assert!(snapshots.is_empty());
    }

    #[test]
    fn prune_keeps_max_snapshots() {
        let dir = TempDir::new().unwrap();
        for i in 0..6u64 {
            fs::write(
                dir.path()
                    .join(format!("weather-day{}-{}.bin", i * 10, 1000 + i)),
                b"x",
            )
            .unwrap();
        }

        let deleted = prune_snapshots(dir.path(), 3).unwrap();
        assert_eq!(deleted.len(), 3);

        let remaining = list_snapshots(dir.path()).unwrap();
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[0].timestamp, 1005);
        assert_eq!(remaining[2].timestamp, 1003);
    }

    #[test]
    fn prune_noop_when_under_limit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("weather-day10-1000.bin"), b"x").unwrap();

        let deleted = prune_snapshots(dir.path(), 5).unwrap();
        assert!(deleted.is_empty());
        assert_eq!(list_snapshots(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn load_garbage_returns_deserialize_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weather-day0-1000.bin");
        fs::write(&path, b"this is not valid bincode data").unwrap();

        assert!(matches!(
            load_snapshot(&path).unwrap_err(),
            SnapshotError::Deserialize(_)
        ));
    }

    #[test]
    fn load_truncated_snapshot_returns_error() {
        let dir = TempDir::new().unwrap();
        let data = bincode::serialize(&make_test_state(1)).unwrap();

        let path = dir.path().join("weather-day1-1000.bin");
        fs::write(&path, &data[..data.len() / 2]).unwrap();

        assert!(load_snapshot(&path).is_err());
    }

    #[test]
    fn missing_hexes_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut state = make_test_state(0);
        state.region.hexes.pop();
        let path = dir.path().join("weather-day0-1000.bin");
        fs::write(&path, bincode::serialize(&state).unwrap()).unwrap();

        assert!(matches!(
            load_snapshot(&path).unwrap_err(),
            SnapshotError::Corrupt(_)
        ));
    }

    #[test]
    fn weather_for_other_map_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut state = make_test_state(1);
        if let Some(entry) = state.weather.current.values_mut().next() {
            entry.map_path = "maps/elsewhere".to_string();
        }
        let path = dir.path().join("weather-day1-1000.bin");
        fs::write(&path, bincode::serialize(&state).unwrap()).unwrap();

        assert!(matches!(
            load_snapshot(&path).unwrap_err(),
            SnapshotError::Corrupt(_)
        ));
    }

    #[test]
    fn history_for_other_map_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut state = make_test_state(3);
        let record = state.weather.history.values_mut().next().unwrap();
        record.map_path = "maps/elsewhere".to_string();
        let path = dir.path().join("weather-day3-1000.bin");
        fs::write(&path, bincode::serialize(&state).unwrap()).unwrap();

        assert!(matches!(
            load_snapshot(&path).unwrap_err(),
            SnapshotError::Corrupt(_)
        ));
    }

    #[test]
    fn history_under_wrong_key_is_corrupt() {
        let mut state = make_test_state(2);
        assert!(is_consistent(&state));
        let record = state.weather.history.values_mut().next().unwrap();
        let entry = record.entries.first_mut().unwrap();
        entry.weather.hex_coord = entry.weather.hex_coord.neighbor(0);
        assert!(!is_consistent(&state));
    }

    #[test]
    fn load_latest_valid_falls_back_on_corrupt() {
        let dir = TempDir::new().unwrap();
        let state = make_test_state(2);
        let valid_data = bincode::serialize(&state).unwrap();

        // Oldest: valid
        fs::write(dir.path().join("weather-day2-1000.bin"), &valid_data).unwrap();
        // Newest: corrupt
        fs::write(dir.path().join("weather-day4-2000.bin"), b"corrupt data here").unwrap();

        let restored = load_latest_valid_snapshot(dir.path()).unwrap();
        assert_eq!(restored.day_count, 2);
    }

    #[test]
    fn load_latest_valid_all_corrupt_returns_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("weather-day10-1000.bin"), b"corrupt1").unwrap();
        fs::write(dir.path().join("weather-day20-2000.bin"), b"corrupt2").unwrap();

        let err = load_latest_valid_snapshot(dir.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::NoValidSnapshots));
        assert!(err.to_string().contains("hexweather run"));
    }

    #[test]
    fn load_latest_valid_empty_dir_returns_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_latest_valid_snapshot(dir.path()).unwrap_err(),
            SnapshotError::NoValidSnapshots
        ));
    }

    #[test]
    fn atomic_write_no_temp_files_remain() {
        let dir = TempDir::new().unwrap();
        save_snapshot(&make_test_state(0), dir.path()).unwrap();

        let temp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with('.'))
            })
            .collect();
        assert!(temp_files.is_empty());
    }

    #[test]
    fn save_creates_directory_if_missing() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("nested").join("snapshots");

        let path = save_snapshot(&make_test_state(0), &nested).unwrap();
        assert!(path.exists());
    }
}
