use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;

use crate::data::osm::{Bounds, ElementType, Meta, Node, OsmId, Point, Tags};
use crate::data::QueryResult;
use crate::errors::Result;

use super::materialize::{Materializer, RawElement, RawMember, RawRelation, RawWay, Side};

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonResponse {
    generator: Option<String>,
    osm3s: JsonOsm3s,
    remark: Option<String>,
    elements: Vec<JsonElement>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonOsm3s {
    timestamp_osm_base: Option<DateTime<Utc>>,
    timestamp_areas_base: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum JsonElementKind {
    Node,
    Way,
    Relation,
    #[default]
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonElement {
    #[serde(rename = "type")]
    kind: JsonElementKind,
    id: OsmId,
    lat: f64,
    lon: f64,
    timestamp: Option<DateTime<Utc>>,
    version: i64,
    changeset: i64,
    user: String,
    uid: i64,
    visible: Option<bool>,
    nodes: Vec<OsmId>,
    members: Vec<JsonMember>,
    geometry: Vec<Option<JsonPoint>>,
    bounds: Option<JsonBounds>,
    tags: Option<Tags>,
}

#[derive(Deserialize)]
struct JsonMember {
    #[serde(rename = "type")]
    kind: ElementType,
    #[serde(rename = "ref")]
    id: OsmId,
    #[serde(default)]
    role: String,
}

#[derive(Deserialize, Clone, Copy)]
struct JsonPoint {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize, Clone, Copy)]
struct JsonBounds {
    minlat: f64,
    minlon: f64,
    maxlat: f64,
    maxlon: f64,
}

impl From<JsonPoint> for Point {
    fn from(value: JsonPoint) -> Self {
        Point {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

impl From<JsonBounds> for Bounds {
    fn from(value: JsonBounds) -> Self {
        Bounds {
            min: Point { lat: value.minlat, lon: value.minlon },
            max: Point { lat: value.maxlat, lon: value.maxlon },
        }
    }
}

impl JsonElement {
    fn into_raw(self) -> Option<RawElement> {
        let meta = Meta {
            id: self.id,
            timestamp: self.timestamp,
            version: self.version,
            changeset: self.changeset,
            user: self.user,
            uid: self.uid,
            visible: self.visible,
            tags: self.tags,
        };
        match self.kind {
            JsonElementKind::Node => Some(RawElement::Node(Node {
                meta,
                lat: self.lat,
                lon: self.lon,
            })),
            JsonElementKind::Way => Some(RawElement::Way(RawWay {
                meta,
                nodes: self.nodes,
                geometry: self.geometry.into_iter()
                    .map(|point| point.map(Point::from))
                    .collect(),
                bounds: self.bounds.map(Bounds::from),
            })),
            JsonElementKind::Relation => Some(RawElement::Relation(RawRelation {
                meta,
                members: self.members.into_iter()
                    .map(|member| RawMember {
                        kind: member.kind,
                        id: member.id,
                        role: member.role,
                    })
                    .collect(),
                bounds: self.bounds.map(Bounds::from),
            })),
            JsonElementKind::Unsupported => None,
        }
    }
}

/// Decodes an `[out:json]` response, linking elements in document order.
pub fn decode_json(body: &[u8]) -> Result<QueryResult> {
    let response: JsonResponse = serde_json::from_slice(body)?;
    let count = response.elements.len();

    let mut materializer = Materializer::new();
    for element in response.elements {
        let id = element.id;
        match element.into_raw() {
            Some(raw) => materializer.store(raw, Side::Current),
            None => warn!(id = id; "Skipping element of unsupported type"),
        }
    }

    if let Some(remark) = &response.remark {
        warn!(remark = remark.as_str(); "Server attached a remark to the response");
    }
    debug!(count = count; "Decoded JSON response");

    Ok(QueryResult {
        timestamp: response.osm3s.timestamp_osm_base,
        areas_timestamp: response.osm3s.timestamp_areas_base,
        generator: response.generator,
        remark: response.remark,
        count,
        current: materializer.current,
        ..QueryResult::default()
    })
}
