//! Remote FeatureServer aggregate source.
//!
//! Speaks the ArcGIS REST statistics protocol: the query geometry goes out
//! as Esri JSON, the sum comes back as a single feature attribute under the
//! requested alias. This is the authoritative full-dataset path behind the
//! coordinator's fallback.

use async_trait::async_trait;
use serde::Deserialize;

use crate::model::{AggregateRequest, AggregateResponse, Geometry, StatRecord};
use crate::token::QueryToken;
use crate::{Error, Result};
use super::AggregateSource;

/// An ArcGIS FeatureServer layer queried for sum statistics.
pub struct FeatureServiceSource {
    client: reqwest::Client,
    query_url: String,
}

impl FeatureServiceSource {
    /// `layer_url` is the layer endpoint, e.g.
    /// `https://host/arcgis/rest/services/NZGrid_250m_ERP/FeatureServer/1`.
    pub fn new(layer_url: impl Into<String>) -> Self {
        let layer_url = layer_url.into();
        Self {
            client: reqwest::Client::new(),
            query_url: format!("{}/query", layer_url.trim_end_matches('/')),
        }
    }

    /// Esri JSON polygon: `{"rings": [[[x, y], ...]], "spatialReference": ...}`.
    fn esri_geometry(geometry: &Geometry) -> serde_json::Value {
        let ring: Vec<[f64; 2]> = geometry.ring().iter().map(|c| [c.x, c.y]).collect();
        serde_json::json!({
            "rings": [ring],
            "spatialReference": { "wkid": geometry.spatial_ref().wkid() },
        })
    }
}

#[derive(Debug, Deserialize)]
struct FeatureSetBody {
    #[serde(default)]
    features: Vec<FeatureBody>,
}

#[derive(Debug, Deserialize)]
struct FeatureBody {
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl AggregateSource for FeatureServiceSource {
    fn name(&self) -> &str {
        "feature-service"
    }

    async fn aggregate(
        &self,
        request: &AggregateRequest,
        token: &QueryToken,
    ) -> Result<AggregateResponse> {
        if !token.is_current() {
            return Err(Error::Cancelled);
        }

        let out_statistics = serde_json::json!([{
            "statisticType": "sum",
            "onStatisticField": request.aggregation.field,
            "outStatisticFieldName": request.aggregation.alias,
        }]);
        let params = [
            ("f", "json".to_string()),
            ("where", "1=1".to_string()),
            ("geometry", Self::esri_geometry(&request.geometry).to_string()),
            ("geometryType", "esriGeometryPolygon".to_string()),
            ("inSR", request.geometry.spatial_ref().wkid().to_string()),
            ("spatialRel", "esriSpatialRelIntersects".to_string()),
            ("outStatistics", out_statistics.to_string()),
            ("returnGeometry", "false".to_string()),
        ];

        let response = self
            .client
            .post(&self.query_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let body: FeatureSetBody = response
            .json()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !token.is_current() {
            return Err(Error::Cancelled);
        }

        let alias = request.aggregation.alias.as_str();
        let records = body
            .features
            .iter()
            .filter_map(|f| f.attributes.get(alias).and_then(|v| v.as_f64()))
            .map(|total_pop| StatRecord { total_pop })
            .collect();
        Ok(AggregateResponse { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_esri_geometry_shape() {
        let g = crate::geom::geodesic_buffer(Point::new(174.0, -36.0), 1.0);
        let value = FeatureServiceSource::esri_geometry(&g);
        assert_eq!(value["spatialReference"]["wkid"], 4326);
        let rings = value["rings"].as_array().unwrap();
        assert_eq!(rings.len(), 1);
        // closed ring: first and last vertex identical
        let ring = rings[0].as_array().unwrap();
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_feature_set_parsing() {
        let body: FeatureSetBody = serde_json::from_str(
            r#"{"features": [{"attributes": {"totalPop": 1234.0}}]}"#,
        )
        .unwrap();
        assert_eq!(body.features.len(), 1);
        assert_eq!(body.features[0].attributes["totalPop"], 1234.0);
    }

    #[test]
    fn test_query_url_normalization() {
        let src = FeatureServiceSource::new("https://host/FeatureServer/1/");
        assert_eq!(src.query_url, "https://host/FeatureServer/1/query");
    }
}
