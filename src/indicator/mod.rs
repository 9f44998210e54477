//! Primary-sensor registry.
//!
//! Keeps one menu entry per enabled sensor, tracks which sensor is mirrored in
//! the panel label and keeps the radio checkmarks in sync with it.

pub mod menu;
pub mod panel;
pub mod preferences;

use crate::manager::{ManagerListener, SensorManager};
use crate::models::{Reading, Sensor, SensorEvent, SubscriptionId};
use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

use menu::{ItemId, MenuSurface};
use panel::PanelLabel;
use preferences::PreferencesDialog;

pub const NO_SENSORS_LABEL: &str = "No Sensors";
pub const NO_ACTIVE_SENSORS_LABEL: &str = "No active sensors";

/// Everything the registry reacts to once the indicator is running.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorEvent {
    /// A sensor notification, tagged with the subscription that delivered it.
    Sensor(SubscriptionId, SensorEvent),
    ItemActivated(ItemId),
}

#[derive(Debug)]
struct DisplayEntry {
    path: String,
    item: ItemId,
    subscription: SubscriptionId,
    reading: Reading,
}

pub struct Indicator<M: MenuSurface, P: PanelLabel> {
    menu: M,
    panel: P,
    // Ordered by manager position, head is the fallback primary
    entries: Vec<DisplayEntry>,
    sensor_items: HashMap<String, ItemId>,
    item_sensors: HashMap<ItemId, String>,
    primary: Option<String>,
    events: UnboundedSender<IndicatorEvent>,
    prefs_dialog: Option<PreferencesDialog>,
}

impl<M: MenuSurface, P: PanelLabel> Indicator<M, P> {
    /// Sensor notifications are forwarded to `events`; the owner feeds them back
    /// through [`Indicator::handle_event`].
    pub fn new(menu: M, mut panel: P, events: UnboundedSender<IndicatorEvent>) -> Self {
        panel.set_label(NO_SENSORS_LABEL, NO_SENSORS_LABEL);
        Self {
            menu,
            panel,
            entries: Vec::new(),
            sensor_items: HashMap::new(),
            item_sensors: HashMap::new(),
            primary: None,
            events,
            prefs_dialog: None,
        }
    }

    pub fn menu(&self) -> &M {
        &self.menu
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Paths of the displayed sensors in menu order.
    pub fn sensor_paths(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.path.as_str()).collect()
    }

    pub fn item_for(&self, path: &str) -> Option<ItemId> {
        self.sensor_items.get(path).copied()
    }

    pub fn sensor_for(&self, item: ItemId) -> Option<&str> {
        self.item_sensors.get(&item).map(String::as_str)
    }

    pub fn handle_event(&mut self, event: IndicatorEvent) {
        match event {
            IndicatorEvent::Sensor(subscription, event) => {
                if !self.is_current(event.path(), subscription) {
                    debug!("Dropping stale notification from sensor {}", event.path());
                    return;
                }
                match event {
                    SensorEvent::ValueChanged(reading) | SensorEvent::LabelChanged(reading) => {
                        self.refresh_display(&reading)
                    }
                    SensorEvent::Error { path, error } => {
                        warn!("sensor {} error: {}", path, error);
                    }
                }
            }
            IndicatorEvent::ItemActivated(item) => self.on_menu_item_activated(item),
        }
    }

    pub fn on_sensor_enabled(&mut self, sensor: &mut Sensor, position: usize) {
        let path = sensor.path().to_string();
        let duplicate = self.sensor_items.contains_key(&path);
        debug_assert!(!duplicate, "sensor {} enabled twice", path);
        if duplicate {
            warn!("Ignoring duplicate enable of sensor {}", path);
            return;
        }
        debug!("enabling sensor {} at {}", path, position);

        let events = self.events.clone();
        let forward = move |id: SubscriptionId, event: &SensorEvent| {
            // The receiver only goes away on shutdown
            let _ = events.send(IndicatorEvent::Sensor(id, event.clone()));
        };
        let subscription = sensor.subscribe(Box::new(forward));

        let position = position.min(self.entries.len());
        let item = self.menu.insert_item(position);
        let reading = sensor.reading();
        self.entries.insert(
            position,
            DisplayEntry {
                path: path.clone(),
                item,
                subscription,
                reading: reading.clone(),
            },
        );
        self.sensor_items.insert(path.clone(), item);
        self.item_sensors.insert(item, path.clone());

        if self.primary.is_none() {
            self.primary = Some(path);
            self.menu.set_item_active(item, true);
        }
        self.refresh_display(&reading);
    }

    pub fn on_sensor_disabled(&mut self, sensor: &mut Sensor) {
        let path = sensor.path().to_string();
        debug!("disabling sensor {}", path);

        let Some(index) = self.entry_index(&path) else {
            warn!("Ignoring disable of unknown sensor {}", path);
            return;
        };
        let entry = self.entries.remove(index);
        self.menu.remove_item(entry.item);
        self.sensor_items.remove(&path);
        self.item_sensors.remove(&entry.item);
        sensor.unsubscribe(entry.subscription);

        if self.primary.as_deref() != Some(path.as_str()) {
            return;
        }
        match self.entries.first().map(|head| head.item) {
            None => {
                self.panel
                    .set_label(NO_ACTIVE_SENSORS_LABEL, NO_ACTIVE_SENSORS_LABEL);
                self.primary = None;
            }
            // Same path as a click on the top-most item
            Some(item) => self.on_menu_item_activated(item),
        }
    }

    pub fn on_menu_item_activated(&mut self, item: ItemId) {
        match self.item_sensors.get(&item).cloned() {
            Some(path) => self.select(&path),
            None => debug!("Ignoring activation of stale menu item {:?}", item),
        }
    }

    /// Make `path` the primary sensor. Selecting the current primary does nothing.
    pub fn select(&mut self, path: &str) {
        if self.primary.as_deref() == Some(path) {
            return;
        }
        let Some(index) = self.entry_index(path) else {
            debug!("Cannot select unknown sensor {}", path);
            return;
        };

        // The previous primary may already be gone if it was just disabled
        let old_item = self
            .primary
            .as_ref()
            .and_then(|old| self.sensor_items.get(old))
            .copied();
        if let Some(old_item) = old_item {
            self.menu.set_item_active(old_item, false);
        }

        let entry = &self.entries[index];
        self.menu.set_item_active(entry.item, true);
        debug!("displaying sensor {}", path);
        self.primary = Some(path.to_string());

        let reading = entry.reading.clone();
        self.refresh_display(&reading);
    }

    pub fn refresh_display(&mut self, reading: &Reading) {
        let Some(index) = self.entry_index(&reading.path) else {
            debug!("Ignoring update from sensor {} without an entry", reading.path);
            return;
        };
        let text = reading.display_text();
        let entry = &mut self.entries[index];
        entry.reading = reading.clone();
        self.menu.set_item_label(entry.item, &text);
        if self.primary.as_deref() == Some(reading.path.as_str()) {
            self.panel.set_label(&text, &text);
        }
    }

    /// Present the preferences view, building it on first use.
    pub fn open_preferences(&mut self, manager: &SensorManager) -> String {
        self.prefs_dialog
            .get_or_insert_with(PreferencesDialog::new)
            .present(manager)
    }

    pub fn preferences(&self) -> Option<&PreferencesDialog> {
        self.prefs_dialog.as_ref()
    }

    // Notifications queued by an earlier subscription of the same sensor are stale
    fn is_current(&self, path: &str, subscription: SubscriptionId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.path == path && entry.subscription == subscription)
    }

    fn entry_index(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.path == path)
    }
}

impl<M: MenuSurface, P: PanelLabel> ManagerListener for Indicator<M, P> {
    fn sensor_enabled(&mut self, sensor: &mut Sensor, position: usize) {
        self.on_sensor_enabled(sensor, position);
    }

    fn sensor_disabled(&mut self, sensor: &mut Sensor) {
        self.on_sensor_disabled(sensor);
    }
}

#[cfg(test)]
mod tests {
    use super::menu::TextMenu;
    use super::*;
    use crate::models::SensorError;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    #[derive(Debug, Default)]
    struct RecordingPanel {
        labels: Vec<(String, String)>,
    }

    impl RecordingPanel {
        fn current(&self) -> &str {
            self.labels.last().map(|(short, _)| short.as_str()).unwrap_or("")
        }
    }

    impl PanelLabel for RecordingPanel {
        fn set_label(&mut self, short: &str, long: &str) {
            self.labels.push((short.to_string(), long.to_string()));
        }
    }

    type TestIndicator = Indicator<TextMenu, RecordingPanel>;

    fn indicator() -> (TestIndicator, UnboundedReceiver<IndicatorEvent>) {
        let (tx, rx) = unbounded_channel();
        (Indicator::new(TextMenu::new(), RecordingPanel::default(), tx), rx)
    }

    fn sensor(path: &str, label: &str, value: f64) -> Sensor {
        let mut sensor = Sensor::temperature(path, "k10temp", label);
        sensor.set_value(value);
        sensor
    }

    fn drain(indicator: &mut TestIndicator, rx: &mut UnboundedReceiver<IndicatorEvent>) {
        while let Ok(event) = rx.try_recv() {
            indicator.handle_event(event);
        }
    }

    fn assert_consistent(indicator: &TestIndicator) {
        let active = indicator.menu().active_items();
        assert!(active.len() <= 1, "more than one active item: {:?}", active);
        match indicator.primary() {
            Some(path) => {
                let item = indicator.item_for(path).expect("primary has no entry");
                assert_eq!(active, vec![item]);
            }
            None => assert!(active.is_empty()),
        }
        let mut paths = indicator.sensor_paths();
        let count = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), count, "duplicate entries");
        assert_eq!(indicator.menu().items().len(), count);
    }

    #[test]
    fn test_initial_label() {
        let (indicator, _rx) = indicator();
        assert_eq!(indicator.panel().current(), NO_SENSORS_LABEL);
        assert_eq!(indicator.primary(), None);
    }

    #[test]
    fn test_first_enabled_becomes_primary() {
        let (mut indicator, _rx) = indicator();
        let mut cpu = sensor("cpu", "CPU", 42.37);

        indicator.on_sensor_enabled(&mut cpu, 0);

        assert_eq!(indicator.primary(), Some("cpu"));
        assert_eq!(indicator.panel().current(), "CPU: 42.4°C");
        assert_eq!(indicator.panel().labels.last().map(|l| l.1.as_str()), Some("CPU: 42.4°C"));
        let item = indicator.item_for("cpu").unwrap();
        assert_eq!(indicator.menu().item(item).unwrap().label, "CPU: 42.4°C");
        assert_eq!(indicator.sensor_for(item), Some("cpu"));
        assert_eq!(cpu.subscriber_count(), 1);
        assert_consistent(&indicator);
    }

    #[test]
    fn test_scenario_select_and_fallback() {
        let (mut indicator, mut rx) = indicator();
        let mut s1 = sensor("s1", "CPU", 40.0);
        let mut s2 = sensor("s2", "GPU", 60.0);

        indicator.on_sensor_enabled(&mut s1, 0);
        indicator.on_sensor_enabled(&mut s2, 1);
        assert_eq!(indicator.primary(), Some("s1"));
        assert_consistent(&indicator);

        let s2_item = indicator.item_for("s2").unwrap();
        indicator.on_menu_item_activated(s2_item);
        assert_eq!(indicator.primary(), Some("s2"));
        assert_eq!(indicator.panel().current(), "GPU: 60.0°C");
        assert_consistent(&indicator);

        indicator.on_sensor_disabled(&mut s2);
        assert_eq!(indicator.primary(), Some("s1"));
        assert_eq!(indicator.panel().current(), "CPU: 40.0°C");
        assert_eq!(s2.subscriber_count(), 0);
        assert_consistent(&indicator);

        indicator.on_sensor_disabled(&mut s1);
        assert_eq!(indicator.primary(), None);
        assert_eq!(indicator.panel().current(), NO_ACTIVE_SENSORS_LABEL);
        assert!(indicator.sensor_paths().is_empty());
        assert_consistent(&indicator);

        drain(&mut indicator, &mut rx);
        assert_eq!(indicator.panel().current(), NO_ACTIVE_SENSORS_LABEL);
    }

    #[test]
    fn test_fallback_picks_head_not_most_recent() {
        let (mut indicator, _rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        let mut c = sensor("c", "C", 3.0);

        indicator.on_sensor_enabled(&mut b, 0);
        indicator.on_sensor_enabled(&mut c, 1);
        // Enabled last but sits at the top
        indicator.on_sensor_enabled(&mut a, 0);
        assert_eq!(indicator.sensor_paths(), vec!["a", "b", "c"]);

        indicator.select("c");
        indicator.on_sensor_disabled(&mut c);

        assert_eq!(indicator.primary(), Some("a"));
        assert_consistent(&indicator);
    }

    #[test]
    fn test_disabling_non_primary_keeps_selection() {
        let (mut indicator, _rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        indicator.on_sensor_enabled(&mut a, 0);
        indicator.on_sensor_enabled(&mut b, 1);
        let before = indicator.panel().labels.len();

        indicator.on_sensor_disabled(&mut b);

        assert_eq!(indicator.primary(), Some("a"));
        assert_eq!(indicator.panel().labels.len(), before);
        assert_consistent(&indicator);
    }

    #[test]
    fn test_select_primary_is_noop() {
        let (mut indicator, _rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        indicator.on_sensor_enabled(&mut a, 0);
        let labels = indicator.panel().labels.len();
        let item = indicator.item_for("a").unwrap();

        indicator.on_menu_item_activated(item);
        indicator.select("a");

        assert_eq!(indicator.panel().labels.len(), labels);
        assert_eq!(indicator.primary(), Some("a"));
        assert_consistent(&indicator);
    }

    #[test]
    fn test_notifications_refresh_entry_and_panel() {
        let (mut indicator, mut rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        indicator.on_sensor_enabled(&mut a, 0);
        indicator.on_sensor_enabled(&mut b, 1);

        b.set_value(25.55);
        drain(&mut indicator, &mut rx);
        let b_item = indicator.item_for("b").unwrap();
        assert_eq!(indicator.menu().item(b_item).unwrap().label, "B: 25.6°C");
        assert_eq!(indicator.panel().current(), "A: 1.0°C");

        a.set_label("Package");
        drain(&mut indicator, &mut rx);
        assert_eq!(indicator.panel().current(), "Package: 1.0°C");
    }

    #[test]
    fn test_select_uses_latest_reading() {
        let (mut indicator, mut rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        indicator.on_sensor_enabled(&mut a, 0);
        indicator.on_sensor_enabled(&mut b, 1);

        b.set_value(70.0);
        drain(&mut indicator, &mut rx);
        indicator.select("b");

        assert_eq!(indicator.panel().current(), "B: 70.0°C");
    }

    #[test]
    fn test_late_notifications_are_ignored() {
        let (mut indicator, mut rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        indicator.on_sensor_enabled(&mut a, 0);
        indicator.on_sensor_enabled(&mut b, 1);

        // Queued before the disable, delivered after it
        b.set_value(99.0);
        indicator.on_sensor_disabled(&mut b);
        b.set_value(100.0);
        drain(&mut indicator, &mut rx);

        assert_eq!(indicator.sensor_paths(), vec!["a"]);
        assert_eq!(indicator.panel().current(), "A: 1.0°C");
        assert_consistent(&indicator);
    }

    #[test]
    fn test_reenabled_sensor_ignores_old_subscription() {
        let (mut indicator, mut rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        indicator.on_sensor_enabled(&mut a, 0);
        indicator.on_sensor_enabled(&mut b, 1);
        indicator.select("b");

        // 99.0 is queued under the first subscription, 100.0 is the current value
        b.set_value(99.0);
        indicator.on_sensor_disabled(&mut b);
        b.set_value(100.0);
        indicator.on_sensor_enabled(&mut b, 1);
        indicator.select("b");
        drain(&mut indicator, &mut rx);

        assert_eq!(indicator.sensor_paths(), vec!["a", "b"]);
        assert_eq!(indicator.panel().current(), "B: 100.0°C");
        assert_consistent(&indicator);
    }

    #[test]
    fn test_error_does_not_change_selection() {
        let (mut indicator, mut rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        indicator.on_sensor_enabled(&mut a, 0);

        a.report_error(SensorError::Vanished("a".to_string()));
        drain(&mut indicator, &mut rx);

        assert_eq!(indicator.primary(), Some("a"));
        assert_eq!(indicator.sensor_paths(), vec!["a"]);
    }

    #[test]
    fn test_stale_item_activation_is_ignored() {
        let (mut indicator, mut rx) = indicator();
        let mut a = sensor("a", "A", 1.0);
        let mut b = sensor("b", "B", 2.0);
        indicator.on_sensor_enabled(&mut a, 0);
        indicator.on_sensor_enabled(&mut b, 1);
        let b_item = indicator.item_for("b").unwrap();
        indicator.on_sensor_disabled(&mut b);

        indicator.handle_event(IndicatorEvent::ItemActivated(b_item));
        drain(&mut indicator, &mut rx);

        assert_eq!(indicator.primary(), Some("a"));
        assert_consistent(&indicator);
    }

    #[test]
    fn test_random_sequences_keep_single_primary() {
        let (mut indicator, mut rx) = indicator();
        let mut sensors: Vec<Sensor> = (0..5)
            .map(|i| sensor(&format!("s{}", i), &format!("S{}", i), i as f64))
            .collect();
        let mut enabled = vec![false; sensors.len()];
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let index = (seed % sensors.len() as u64) as usize;
            match (seed >> 8) % 4 {
                0 if !enabled[index] => {
                    let position = (seed >> 16) as usize % (indicator.sensor_paths().len() + 1);
                    indicator.on_sensor_enabled(&mut sensors[index], position);
                    enabled[index] = true;
                }
                1 if enabled[index] => {
                    indicator.on_sensor_disabled(&mut sensors[index]);
                    enabled[index] = false;
                }
                2 => {
                    let path = sensors[index].path().to_string();
                    indicator.select(&path);
                }
                _ => sensors[index].set_value((seed % 1000) as f64 / 10.0),
            }
            drain(&mut indicator, &mut rx);
            assert_consistent(&indicator);
            assert_eq!(indicator.primary().is_some(), enabled.iter().any(|e| *e));
        }
    }
}
