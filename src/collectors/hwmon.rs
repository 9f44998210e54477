use crate::models::SensorError;
use log::{debug, trace};
use std::fs::{read_dir, File};
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

pub const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// One `tempN_input` found under a hwmon device.
#[derive(Debug, Clone, PartialEq)]
pub struct HwmonInput {
    /// Path of the `tempN_input` file, used as the sensor identity.
    pub path: String,
    /// Driver name from the `name` file, e.g. `k10temp`.
    pub name: String,
    pub label: String,
    /// Thresholds in degrees Celsius, 0.0 when the driver does not expose them.
    pub min: f64,
    pub max: f64,
    /// Current temperature in degrees Celsius.
    pub celsius: Result<f64, SensorError>,
}

/// Collect every temperature input below `root`, sorted by path.
pub fn scan(root: &Path) -> Vec<HwmonInput> {
    let start = Instant::now();
    let mut inputs = Vec::new();

    // hwmonN entries are symlinks into /sys/devices
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .flatten()
    {
        if entry.file_type().is_dir() {
            from_hwmon(&mut inputs, entry.path());
        }
    }

    inputs.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        "hwmon scan found {} inputs in {} ms",
        inputs.len(),
        start.elapsed().as_millis()
    );
    inputs
}

/// Read out `hwmon` info (hardware monitor) from `folder`.
///
/// ## What is read:
///
/// - Mandatory: `name` the name of the `hwmon`.
/// - Mandatory: `tempN_input`, the input is skipped if the file is missing
/// - Optional: sensor `label`, content of `tempN_label`, else `device/model`,
///   else `"<name> tempN"`
/// - Optional: min threshold value defined in `tempN_min`
/// - Optional: max threshold value defined in `tempN_max`, else `tempN_crit`
///
/// Where `N` is a `u32` associated to a sensor like `temp1_max`, `temp1_input`.
///
/// Kernel hwmon sysfs API: https://www.kernel.org/doc/html/latest/hwmon/sysfs-interface.html
pub fn from_hwmon(inputs: &mut Vec<HwmonInput>, folder: &Path) -> Option<()> {
    let dir = read_dir(folder).ok()?;
    let name = get_file_line(&folder.join("name"), 16).unwrap_or_default();
    let model = get_file_line(&folder.join("device/model"), 16);

    for entry in dir.flatten() {
        if !entry.file_type().is_ok_and(|file_type| !file_type.is_dir()) {
            continue;
        }

        let entry = entry.path();
        let filename = entry.file_name().and_then(|x| x.to_str()).unwrap_or("");
        let Some((id, item)) = filename
            .strip_prefix("temp")
            .and_then(|f| f.split_once('_'))
            .and_then(|(id, item)| Some((id.parse::<u32>().ok()?, item)))
        else {
            continue;
        };

        if item != "input" {
            continue;
        }

        let sibling = |suffix: &str| folder.join(format!("temp{}_{}", id, suffix));
        let label = get_file_line(&sibling("label"), 16)
            .filter(|label| !label.is_empty())
            .or_else(|| model.clone())
            .unwrap_or_else(|| format!("{} temp{}", name, id));
        let min = read_temperature(&sibling("min")).unwrap_or(0.0);
        let max = read_temperature(&sibling("max"))
            .or_else(|_| read_temperature(&sibling("crit")))
            .unwrap_or(0.0);

        let input = HwmonInput {
            path: entry.to_str().unwrap_or("").into(),
            name: name.clone(),
            label,
            min,
            max,
            celsius: read_temperature(&entry),
        };
        trace!("hwmon input {:?}", input);
        inputs.push(input);
    }

    Some(())
}

// Read arbitrary string data.
pub fn get_file_line(file: &Path, capacity: usize) -> Option<String> {
    let mut reader = String::with_capacity(capacity);
    let mut f = File::open(file).ok()?;
    f.read_to_string(&mut reader).ok()?;
    reader.truncate(reader.trim_end().len());
    Some(reader)
}

/// Read a `tempN_item` sysfs file, which holds milli-degrees Celsius.
///
/// Don't call it on `label`, `name` or `type` files.
pub fn read_temperature(file: &Path) -> Result<f64, SensorError> {
    let path = file.display().to_string();
    let mut reader = [0u8; 32];
    let n = File::open(file)
        .and_then(|mut f| f.read(&mut reader))
        .map_err(|e| SensorError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
    // parse and trim would complain about `\0`.
    let raw = String::from_utf8_lossy(&reader[..n]);
    let raw = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    raw.parse::<i64>()
        .map(convert_temp_celsius)
        .map_err(|_| SensorError::InvalidValue {
            path,
            raw: raw.to_string(),
        })
}

/// Takes a raw temperature in milli-celsius and convert it to celsius.
#[inline]
fn convert_temp_celsius(temp: i64) -> f64 {
    temp as f64 / 1000f64
}
