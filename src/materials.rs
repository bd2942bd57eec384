//! Engineering-materials library client.
//!
//! The server exposes a library of engineering materials with mechanical and
//! thermal properties. Lookups are plain query operations; results are
//! cached briefly client-side since the library changes rarely.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;

use crate::client::ConjureClient;
use crate::error::{Classification, Error, ErrorHint};
use crate::op::{Operation, OperationKind};
use crate::Result;

/// Engineering material with physical properties, as served by the remote
/// library. Fields absent from the library entry stay `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineeringMaterial {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,

    // Mechanical
    #[serde(default)]
    pub density_kg_m3: Option<f64>,
    #[serde(default)]
    pub youngs_modulus_pa: Option<f64>,
    #[serde(default)]
    pub poissons_ratio: Option<f64>,
    #[serde(default)]
    pub yield_strength_pa: Option<f64>,
    #[serde(default)]
    pub ultimate_strength_pa: Option<f64>,
    #[serde(default)]
    pub shear_modulus_pa: Option<f64>,

    // Thermal
    #[serde(default)]
    pub thermal_conductivity_w_mk: Option<f64>,
    #[serde(default)]
    pub specific_heat_j_kgk: Option<f64>,
    #[serde(default)]
    pub thermal_expansion_1_k: Option<f64>,
    #[serde(default)]
    pub melting_point_c: Option<f64>,

    #[serde(default)]
    pub source: Option<String>,
}

const CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct CacheEntry {
    fetched: Instant,
    materials: Vec<EngineeringMaterial>,
}

/// Time-based cache of library listings, keyed by category filter.
#[derive(Debug, Default)]
pub(crate) struct MaterialsCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MaterialsCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<Vec<EngineeringMaterial>> {
        let entries = self.entries.lock().expect("materials cache poisoned");
        entries.get(key).and_then(|entry| {
            if entry.fetched.elapsed() < CACHE_TTL {
                Some(entry.materials.clone())
            } else {
                None
            }
        })
    }

    fn put(&self, key: String, materials: Vec<EngineeringMaterial>) {
        let mut entries = self.entries.lock().expect("materials cache poisoned");
        entries.insert(
            key,
            CacheEntry {
                fetched: Instant::now(),
                materials,
            },
        );
    }
}

impl ConjureClient {
    /// List library materials, optionally filtered by category. Served from
    /// the session cache when fresh.
    pub async fn list_materials(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EngineeringMaterial>> {
        let key = category.unwrap_or("*").to_string();
        if let Some(cached) = self.inner.materials.get(&key) {
            return Ok(cached);
        }

        let op = Operation::new(OperationKind::Query, "list_materials")
            .param_opt("category", category.map(str::to_string));
        let resp = self.run(&op).await?;
        let materials: Vec<EngineeringMaterial> =
            serde_json::from_value(resp.result.get("materials").cloned().unwrap_or(json!([])))?;

        self.inner.materials.put(key, materials.clone());
        Ok(materials)
    }

    /// Fetch one material by library id.
    pub async fn material(&self, id: &str) -> Result<EngineeringMaterial> {
        let op = Operation::new(OperationKind::Query, "get_material").param("id", id);
        let resp = self.run(&op).await?;
        let entry = resp.result.get("material").cloned().ok_or_else(|| {
            Error::api(
                Classification::ObjectNotFound,
                format!("material '{id}' not found in library"),
                ErrorHint::new().with_field("id"),
            )
        })?;
        Ok(serde_json::from_value(entry)?)
    }
}
