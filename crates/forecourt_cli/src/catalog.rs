//! Device catalogs and the simulated lookup over them
//!
//! A catalog is a JSON array of `{ "value": ..., "label": ... }` objects.
//! Anything else is coerced: a document that is not an array becomes an
//! empty catalog, entries that are not options are skipped.

use anyhow::{Context, Result};
use forecourt_cn::{ComboOption, LookupError, LookupFuture, OptionLookup};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LookupSettings;

/// Read and coerce a catalog file
pub fn load_catalog(path: &Path) -> Result<Vec<ComboOption>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    let document: Value = match serde_json::from_str(&content) {
        Ok(document) => document,
        Err(err) => {
            warn!("Catalog {} is not valid JSON ({}), using an empty catalog", path.display(), err);
            return Ok(Vec::new());
        }
    };

    let options = coerce_options(document);
    debug!("Loaded {} options from {}", options.len(), path.display());
    Ok(options)
}

/// Turn an arbitrary JSON document into options
pub fn coerce_options(document: Value) -> Vec<ComboOption> {
    let Value::Array(entries) = document else {
        warn!("Catalog is not an array, using an empty catalog");
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(option) => Some(option),
            Err(err) => {
                warn!("Skipping catalog entry {}: {}", index, err);
                None
            }
        })
        .collect()
}

/// Lookup that searches a catalog after a fixed latency, standing in for
/// the device service
#[derive(Debug, Clone)]
pub struct SimulatedLookup {
    options: Arc<Vec<ComboOption>>,
    latency: Duration,
    fail_on: Arc<Vec<String>>,
}

impl SimulatedLookup {
    pub fn new(options: Vec<ComboOption>, settings: &LookupSettings) -> Self {
        Self {
            options: Arc::new(options),
            latency: Duration::from_millis(settings.latency_ms),
            fail_on: Arc::new(settings.fail_on.clone()),
        }
    }
}

impl OptionLookup for SimulatedLookup {
    fn lookup(&self, query: &str) -> LookupFuture {
        let options = Arc::clone(&self.options);
        let fail_on = Arc::clone(&self.fail_on);
        let latency = self.latency;
        let query = query.to_string();

        Box::pin(async move {
            tokio::time::sleep(latency).await;
            if fail_on.iter().any(|q| q.eq_ignore_ascii_case(&query)) {
                return Err(LookupError::Unavailable);
            }
            Ok(options
                .iter()
                .filter(|opt| opt.matches(&query))
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn devices() -> Vec<ComboOption> {
        coerce_options(json!([
            { "value": "pump-1", "label": "Pump 1 (diesel)" },
            { "value": "pump-2", "label": "Pump 2 (unleaded)" },
            { "value": "wash", "label": "Car wash" },
        ]))
    }

    #[test]
    fn test_coerce_array() {
        let values: Vec<_> = devices().into_iter().map(|o| o.value).collect();
        assert_eq!(values, ["pump-1", "pump-2", "wash"]);
    }

    #[test]
    fn test_coerce_non_array_is_empty() {
        assert!(coerce_options(json!({ "value": "pump-1", "label": "Pump 1" })).is_empty());
        assert!(coerce_options(json!("pumps")).is_empty());
        assert!(coerce_options(Value::Null).is_empty());
    }

    #[test]
    fn test_coerce_skips_bad_entries() {
        let options = coerce_options(json!([
            { "value": "pump-1", "label": "Pump 1" },
            { "value": "pump-2" },
            42,
            { "value": "wash", "label": "Car wash", "bay": 3 },
        ]));
        let values: Vec<_> = options.into_iter().map(|o| o.value).collect();
        assert_eq!(values, ["pump-1", "wash"]);
    }

    #[test]
    fn test_load_catalog_file() {
        let dir = std::env::temp_dir().join(format!("forecourt-catalog-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let good = dir.join("devices.json");
        fs::write(&good, r#"[{"value":"wash","label":"Car wash"}]"#).unwrap();
        assert_eq!(load_catalog(&good).unwrap(), [ComboOption::new("wash", "Car wash")]);

        let broken = dir.join("broken.json");
        fs::write(&broken, "[{").unwrap();
        assert!(load_catalog(&broken).unwrap().is_empty());

        assert!(load_catalog(&dir.join("missing.json")).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_lookup() {
        let settings = LookupSettings {
            latency_ms: 120,
            fail_on: vec!["offline".into()],
        };
        let lookup = SimulatedLookup::new(devices(), &settings);

        let pumps = lookup.lookup("pump").await.unwrap();
        assert_eq!(pumps.len(), 2);

        let wash = lookup.lookup("WASH").await.unwrap();
        assert_eq!(wash, [ComboOption::new("wash", "Car wash")]);

        assert_eq!(lookup.lookup("Offline").await, Err(LookupError::Unavailable));
    }
}
