use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::hex::CubeCoord;
use crate::weather::types::{HistoryEntry, WeatherState};

/// Archived states kept per hex.
pub const HISTORY_LIMIT: usize = 7;
pub const DEFAULT_PRUNE_AGE_DAYS: u32 = 30;

/// Composite store key for one hex on one map.
pub fn hex_key(map_path: &str, q: i32, r: i32, s: i32) -> String {
    format!("{}:{},{},{}", map_path, q, r, s)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentEntry {
    pub map_path: String,
    pub weather: WeatherState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub map_path: String,
    /// Oldest first.
    pub entries: Vec<HistoryEntry>,
}

/// Immutable view of the whole store at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: BTreeMap<String, CurrentEntry>,
    pub history: BTreeMap<String, HistoryRecord>,
    pub active_map: Option<String>,
    /// Bumped by every published change.
    pub version: u64,
}

impl WeatherSnapshot {
    pub fn get(&self, map_path: &str, coord: CubeCoord) -> Option<&WeatherState> {
        self.current
            .get(&hex_key(map_path, coord.q, coord.r, coord.s))
            .map(|e| &e.weather)
    }

    /// Current states of one map, ordered by coordinate.
    pub fn map_weather(&self, map_path: &str) -> Vec<WeatherState> {
        let mut states: Vec<WeatherState> = self
            .current
            .values()
            .filter(|e| e.map_path == map_path)
            .map(|e| e.weather.clone())
            .collect();
        states.sort_by_key(|w| w.hex_coord);
        states
    }

    pub fn map_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.current.values().map(|e| e.map_path.clone()).collect();
        paths.sort();
        paths.dedup();
        paths
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    // === Reducers ===

    fn with_weather(&self, map_path: &str, weather: WeatherState) -> Self {
        let mut next = self.clone();
        next.archive_and_insert(map_path, weather);
        next
    }

    fn with_weather_many(&self, map_path: &str, states: Vec<WeatherState>) -> Self {
        let mut next = self.clone();
        for weather in states {
            next.archive_and_insert(map_path, weather);
        }
        next
    }

    fn archive_and_insert(&mut self, map_path: &str, weather: WeatherState) {
        let c = weather.hex_coord;
        let key = hex_key(map_path, c.q, c.r, c.s);

        if let Some(previous) = self.current.get(&key) {
            let archived = HistoryEntry {
                date: previous.weather.last_update,
                weather: previous.weather.clone(),
            };
            let record = self.history.entry(key.clone()).or_insert_with(|| HistoryRecord {
                map_path: map_path.to_string(),
                entries: Vec::new(),
            });
            record.entries.push(archived);
            if record.entries.len() > HISTORY_LIMIT {
                let excess = record.entries.len() - HISTORY_LIMIT;
                record.entries.drain(..excess);
            }
        }

        self.current.insert(
            key,
            CurrentEntry {
                map_path: map_path.to_string(),
                weather,
            },
        );
    }

    fn with_batch(&self, map_path: &str, states: Vec<WeatherState>) -> Self {
        let mut next = self.clone();
        for weather in states {
            let c = weather.hex_coord;
            next.current.insert(
                hex_key(map_path, c.q, c.r, c.s),
                CurrentEntry {
                    map_path: map_path.to_string(),
                    weather,
                },
            );
        }
        next
    }

    fn without_map(&self, map_path: &str) -> Self {
        let mut next = self.clone();
        next.current.retain(|_, e| e.map_path != map_path);
        next.history.retain(|_, h| h.map_path != map_path);
        next
    }

    fn without_older_than(&self, cutoff: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.current.retain(|_, e| e.weather.last_update >= cutoff);
        next
    }
}

/// Cached per-hex weather with bounded history.
///
/// Every mutation builds a new [`WeatherSnapshot`] and publishes it through
/// a watch channel, so readers never observe a half-applied change.
#[derive(Debug)]
pub struct WeatherStore {
    tx: watch::Sender<Arc<WeatherSnapshot>>,
}

impl Default for WeatherStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherStore {
    pub fn new() -> Self {
        Self::from_snapshot(WeatherSnapshot::default())
    }

    pub fn from_snapshot(snapshot: WeatherSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self { tx }
    }

    /// The latest published state.
    pub fn snapshot(&self) -> Arc<WeatherSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<WeatherSnapshot>> {
        self.tx.subscribe()
    }

    /// Apply a reducer and publish its result. `None` leaves the store untouched
    /// and wakes nobody.
    fn update<F>(&self, reducer: F)
    where
        F: FnOnce(&WeatherSnapshot) -> Option<WeatherSnapshot>,
    {
        self.tx.send_if_modified(|current| match reducer(&**current) {
            Some(mut next) => {
                next.version = current.version + 1;
                *current = Arc::new(next);
                true
            }
            None => false,
        });
    }

    /// Store new weather for a hex, archiving whatever it replaces.
    pub fn set_weather(&self, map_path: &str, weather: WeatherState) {
        self.update(|s| Some(s.with_weather(map_path, weather)));
    }

    /// Store many states in one update, archiving each replaced state
    /// exactly as `set_weather` would. Subscribers see a single change.
    pub fn set_weather_many(&self, map_path: &str, states: Vec<WeatherState>) {
        if states.is_empty() {
            return;
        }
        let count = states.len();
        self.update(|s| Some(s.with_weather_many(map_path, states)));
        debug!(map = map_path, count, "Stored weather with history");
    }

    /// Store many states at once without touching history.
    pub fn set_weather_batch(&self, map_path: &str, states: Vec<WeatherState>) {
        if states.is_empty() {
            return;
        }
        let count = states.len();
        self.update(|s| Some(s.with_batch(map_path, states)));
        debug!(map = map_path, count, "Stored weather batch");
    }

    pub fn get_weather(&self, map_path: &str, q: i32, r: i32, s: i32) -> Option<WeatherState> {
        self.tx
            .borrow()
            .current
            .get(&hex_key(map_path, q, r, s))
            .map(|e| e.weather.clone())
    }

    /// Archived states for a hex, oldest first.
    pub fn get_weather_history(&self, map_path: &str, q: i32, r: i32, s: i32) -> Vec<HistoryEntry> {
        self.tx
            .borrow()
            .history
            .get(&hex_key(map_path, q, r, s))
            .map(|h| h.entries.clone())
            .unwrap_or_default()
    }

    /// Drop current weather and history for every hex of a map.
    pub fn clear_map(&self, map_path: &str) {
        self.update(|s| {
            let next = s.without_map(map_path);
            let removed = s.current.len() - next.current.len();
            if removed == 0 && next.history.len() == s.history.len() {
                return None;
            }
            debug!(map = map_path, removed, "Cleared map weather");
            Some(next)
        });
    }

    pub fn clear_all(&self) {
        self.update(|s| {
            Some(WeatherSnapshot {
                active_map: s.active_map.clone(),
                ..Default::default()
            })
        });
    }

    /// Remove current entries last updated more than `max_age_days` ago.
    /// History is left alone. Returns how many entries were removed.
    pub fn prune_old_weather(&self, max_age_days: u32) -> usize {
        self.prune_old_weather_at(Utc::now(), max_age_days)
    }

    /// [`Self::prune_old_weather`] against an explicit clock, for simulated time.
    pub fn prune_old_weather_at(&self, now: DateTime<Utc>, max_age_days: u32) -> usize {
        let cutoff = now - Duration::days(max_age_days as i64);
        let mut removed = 0;
        self.update(|s| {
            let next = s.without_older_than(cutoff);
            removed = s.current.len() - next.current.len();
            (removed > 0).then_some(next)
        });
        if removed > 0 {
            debug!(removed, max_age_days, "Pruned stale weather");
        }
        removed
    }

    /// Select the map the derived views follow. Writes are unaffected.
    pub fn set_active_map(&self, map_path: Option<&str>) {
        self.update(|s| {
            if s.active_map.as_deref() == map_path {
                return None;
            }
            let mut next = s.clone();
            next.active_map = map_path.map(str::to_string);
            Some(next)
        });
    }

    pub fn active_map(&self) -> Option<String> {
        self.tx.borrow().active_map.clone()
    }

    /// Current states of the active map, ordered by coordinate. Empty without one.
    pub fn active_map_weather(&self) -> Vec<WeatherState> {
        let snapshot = self.snapshot();
        match snapshot.active_map.as_deref() {
            Some(map) => snapshot.map_weather(map),
            None => Vec::new(),
        }
    }

    /// Live view of one hex that always reads the latest published value.
    pub fn hex_weather(&self, map_path: &str, q: i32, r: i32, s: i32) -> HexWeatherView {
        HexWeatherView {
            key: hex_key(map_path, q, r, s),
            rx: self.subscribe(),
        }
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Clear everything and close the channel; subscribers see the final empty
    /// snapshot and then `changed()` errors.
    pub fn dispose(self) {
        self.clear_all();
        debug!("Weather store disposed");
    }
}

/// Read-only handle on a single hex's current weather.
#[derive(Debug, Clone)]
pub struct HexWeatherView {
    key: String,
    rx: watch::Receiver<Arc<WeatherSnapshot>>,
}

impl HexWeatherView {
    pub fn get(&self) -> Option<WeatherState> {
        self.rx.borrow().current.get(&self.key).map(|e| e.weather.clone())
    }

    /// Wait for the next store change and return this hex's value afterwards.
    /// `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Option<WeatherState>> {
        self.rx.changed().await.ok()?;
        Some(self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::types::{WeatherCondition, WeatherType};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn weather(q: i32, r: i32, weather_type: WeatherType, temp: f64, at: DateTime<Utc>) -> WeatherState {
        WeatherState {
            hex_coord: CubeCoord::new(q, r),
            current_weather: WeatherCondition {
                weather_type,
                severity: 0.5,
                duration_hours: 6.0,
            },
            temperature_c: temp,
            wind_speed_kmh: 20.0,
            precipitation_mm_per_hour: 0.0,
            visibility_meters: 5000.0,
            last_update: at,
        }
    }

    fn at_noon() -> DateTime<Utc> {
        ts("2025-01-01T12:00:00Z")
    }

    #[test]
    fn set_and_get() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(5, 10, WeatherType::Rain, 15.0, at_noon()));
        let got = store.get_weather("map1", 5, 10, -15).unwrap();
        assert_eq!(got.weather_type(), WeatherType::Rain);
        assert_eq!(got.temperature_c, 15.0);
    }

    #[test]
    fn unknown_hex_is_none() {
        let store = WeatherStore::new();
        assert!(store.get_weather("map1", 99, 99, -198).is_none());
        assert!(store.get_weather_history("map1", 99, 99, -198).is_empty());
    }

    #[test]
    fn maps_are_isolated() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        store.set_weather("map2", weather(0, 0, WeatherType::Clear, 10.0, at_noon()));
        assert_eq!(store.get_weather("map1", 0, 0, 0).unwrap().temperature_c, 20.0);
        assert_eq!(store.get_weather("map2", 0, 0, 0).unwrap().temperature_c, 10.0);
    }

    #[test]
    fn second_set_archives_one_entry() {
        let store = WeatherStore::new();
        let first = weather(1, 2, WeatherType::Clear, 20.0, ts("2025-01-01T00:00:00Z"));
        store.set_weather("map1", first.clone());
        assert!(store.get_weather_history("map1", 1, 2, -3).is_empty());

        store.set_weather("map1", weather(1, 2, WeatherType::Rain, 15.0, ts("2025-01-02T00:00:00Z")));
        let history = store.get_weather_history("map1", 1, 2, -3);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].weather, first);
        assert_eq!(history[0].date, first.last_update);
        assert_eq!(
            store.get_weather("map1", 1, 2, -3).unwrap().weather_type(),
            WeatherType::Rain
        );
    }

    #[test]
    fn history_is_capped_oldest_evicted() {
        let store = WeatherStore::new();
        for i in 0..10 {
            store.set_weather("map1", weather(0, 0, WeatherType::Cloudy, i as f64, at_noon()));
        }
        let history = store.get_weather_history("map1", 0, 0, 0);
        assert_eq!(history.len(), HISTORY_LIMIT);
        // States 0..=8 were archived; the two oldest fell out.
        let temps: Vec<f64> = history.iter().map(|h| h.weather.temperature_c).collect();
        assert_eq!(temps, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn many_archives_like_repeated_set_weather() {
        let one_by_one = WeatherStore::new();
        let together = WeatherStore::new();
        for day in 0..9 {
            let at = at_noon() + Duration::days(day);
            let states: Vec<WeatherState> = (0..4)
                .map(|q| weather(q, -1, WeatherType::Cloudy, (day * 10 + q as i64) as f64, at))
                .collect();
            for state in states.clone() {
                one_by_one.set_weather("map1", state);
            }
            together.set_weather_many("map1", states);
        }

        let a = one_by_one.snapshot();
        let b = together.snapshot();
        assert_eq!(a.current, b.current);
        assert_eq!(a.history, b.history);
        for q in 0..4 {
            let history = together.get_weather_history("map1", q, -1, 1 - q);
            assert_eq!(history.len(), HISTORY_LIMIT);
            assert_eq!(history[0].date, at_noon() + Duration::days(1));
        }
    }

    #[test]
    fn many_publishes_once() {
        let store = WeatherStore::new();
        store.set_weather_many("map1", Vec::new());
        assert_eq!(store.snapshot().version, 0);

        let states = vec![
            weather(0, 0, WeatherType::Clear, 20.0, at_noon()),
            weather(1, 0, WeatherType::Rain, 12.0, at_noon()),
        ];
        store.set_weather_many("map1", states.clone());
        store.set_weather_many("map1", states);
        assert_eq!(store.snapshot().version, 2);
        assert_eq!(store.get_weather_history("map1", 1, 0, -1).len(), 1);
    }

    #[test]
    fn batch_does_not_archive() {
        let store = WeatherStore::new();
        let states = vec![
            weather(0, 0, WeatherType::Clear, 20.0, at_noon()),
            weather(1, 0, WeatherType::Cloudy, 18.0, at_noon()),
            weather(0, 1, WeatherType::Rain, 15.0, at_noon()),
        ];
        store.set_weather_batch("map1", states.clone());
        store.set_weather_batch("map1", states);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.get_weather("map1", 1, 0, -1).unwrap().weather_type(),
            WeatherType::Cloudy
        );
        assert!(store.get_weather_history("map1", 0, 0, 0).is_empty());
    }

    #[test]
    fn empty_batch_is_noop() {
        let store = WeatherStore::new();
        let version = store.snapshot().version;
        store.set_weather_batch("map1", Vec::new());
        assert_eq!(store.snapshot().version, version);
        assert!(store.get_weather("map1", 0, 0, 0).is_none());
    }

    #[test]
    fn clear_map_leaves_other_maps() {
        let store = WeatherStore::new();
        let w = weather(0, 0, WeatherType::Clear, 20.0, at_noon());
        store.set_weather("map1", w.clone());
        store.set_weather("map1", w.clone());
        store.set_weather("map2", weather(1, 1, WeatherType::Clear, 20.0, at_noon()));

        store.clear_map("map1");
        assert!(store.get_weather("map1", 0, 0, 0).is_none());
        assert!(store.get_weather_history("map1", 0, 0, 0).is_empty());
        assert!(store.get_weather("map2", 1, 1, -2).is_some());

        store.clear_map("nonexistent");
    }

    #[test]
    fn clear_map_does_not_match_prefixes() {
        let store = WeatherStore::new();
        store.set_weather("maps/a", weather(0, 0, WeatherType::Clear, 1.0, at_noon()));
        store.set_weather("maps/ab", weather(0, 0, WeatherType::Clear, 2.0, at_noon()));
        store.clear_map("maps/a");
        assert!(store.get_weather("maps/ab", 0, 0, 0).is_some());
    }

    #[test]
    fn clear_all_empties_store() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        store.set_weather("map2", weather(1, 1, WeatherType::Clear, 20.0, at_noon()));
        store.clear_all();
        assert!(store.is_empty());
        assert!(store.get_weather("map2", 1, 1, -2).is_none());
    }

    #[test]
    fn active_map_filters_views() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        store.set_weather("map2", weather(1, 1, WeatherType::Rain, 15.0, at_noon()));

        assert!(store.active_map_weather().is_empty());

        store.set_active_map(Some("map1"));
        let active = store.active_map_weather();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].hex_coord, CubeCoord::origin());

        store.set_active_map(Some("map2"));
        assert_eq!(store.active_map_weather()[0].temperature_c, 15.0);

        store.set_active_map(None);
        assert!(store.active_map_weather().is_empty());
    }

    #[test]
    fn hex_view_sees_later_writes() {
        let store = WeatherStore::new();
        let view = store.hex_weather("map1", 5, 10, -15);
        assert!(view.get().is_none());
        store.set_weather("map1", weather(5, 10, WeatherType::Storm, 12.0, at_noon()));
        assert_eq!(view.get().unwrap().weather_type(), WeatherType::Storm);
    }

    #[test]
    fn prune_removes_only_stale_current_entries() {
        let store = WeatherStore::new();
        let now = ts("2025-06-01T00:00:00Z");
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, now - Duration::days(40)));
        store.set_weather("map1", weather(1, 1, WeatherType::Rain, 15.0, now - Duration::days(10)));
        // Give the stale hex some history.
        store.set_weather("map1", weather(2, 0, WeatherType::Clear, 1.0, now - Duration::days(50)));
        store.set_weather("map1", weather(2, 0, WeatherType::Clear, 2.0, now - Duration::days(45)));

        let removed = store.prune_old_weather_at(now, 30);
        assert_eq!(removed, 2);
        assert!(store.get_weather("map1", 0, 0, 0).is_none());
        assert!(store.get_weather("map1", 1, 1, -2).is_some());
        assert_eq!(store.get_weather_history("map1", 2, 0, -2).len(), 1);
    }

    #[test]
    fn prune_against_wall_clock() {
        let store = WeatherStore::new();
        let now = Utc::now();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, now - Duration::days(40)));
        store.set_weather("map1", weather(1, 1, WeatherType::Clear, 20.0, now - Duration::days(5)));
        assert_eq!(store.prune_old_weather(DEFAULT_PRUNE_AGE_DAYS), 1);
        assert!(store.get_weather("map1", 1, 1, -2).is_some());
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        let before = store.snapshot();
        store.set_weather("map1", weather(0, 0, WeatherType::Rain, 10.0, at_noon()));
        assert_eq!(before.get("map1", CubeCoord::origin()).unwrap().temperature_c, 20.0);
        assert_eq!(store.snapshot().version, before.version + 1);
    }

    #[test]
    fn restore_from_snapshot() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        store.set_weather("map1", weather(0, 0, WeatherType::Fog, 8.0, at_noon()));
        store.set_active_map(Some("map1"));

        let restored = WeatherStore::from_snapshot((*store.snapshot()).clone());
        assert_eq!(restored.get_weather("map1", 0, 0, 0).unwrap().temperature_c, 8.0);
        assert_eq!(restored.get_weather_history("map1", 0, 0, 0).len(), 1);
        assert_eq!(restored.active_map().as_deref(), Some("map1"));
    }

    #[tokio::test]
    async fn subscribers_are_notified() {
        let store = WeatherStore::new();
        let mut rx = store.subscribe();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        // No-op changes publish nothing.
        store.clear_map("missing");
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn hex_view_waits_for_changes() {
        let store = WeatherStore::new();
        let mut view = store.hex_weather("map1", 3, -1, -2);
        store.set_weather("map1", weather(3, -1, WeatherType::Snow, -4.0, at_noon()));
        let seen = view.changed().await.unwrap();
        assert_eq!(seen.unwrap().weather_type(), WeatherType::Snow);
    }

    #[tokio::test]
    async fn dispose_closes_subscriptions() {
        let store = WeatherStore::new();
        store.set_weather("map1", weather(0, 0, WeatherType::Clear, 20.0, at_noon()));
        let mut view = store.hex_weather("map1", 0, 0, 0);
        store.dispose();
        // The clearing snapshot is still delivered, then the channel closes.
        assert_eq!(view.changed().await, Some(None));
        assert_eq!(view.changed().await, None);
    }
}
