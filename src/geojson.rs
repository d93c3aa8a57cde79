use std::{fs, path::Path};

use anyhow::Context;
use serde_json::json;

use crate::view::MarkerSink;

/// A single placed marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub popup_html: String,
}

/// A marker sink that collects markers into a GeoJSON `FeatureCollection`, ready to be dropped onto any web map.
#[derive(Clone, Debug, Default)]
pub struct GeoJsonLayer {
    markers: Vec<Marker>,
}

impl MarkerSink for GeoJsonLayer {
    fn add_marker(&mut self, latitude: f64, longitude: f64, popup_html: &str) {
        self.markers.push(Marker {
            latitude,
            longitude,
            popup_html: popup_html.to_string(),
        });
    }
}

impl GeoJsonLayer {
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn to_value(&self) -> serde_json::Value {
        // GeoJSON positions are [longitude, latitude]
        let features: Vec<_> = self
            .markers
            .iter()
            .map(|m| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [m.longitude, m.latitude],
                    },
                    "properties": {
                        "popup": m.popup_html,
                    },
                })
            })
            .collect();
        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }

    pub fn to_string_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// Writes the layer to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, self.to_string_pretty()?)
            .with_context(|| format!("cannot write layer to {}", path.display()))
    }
}
