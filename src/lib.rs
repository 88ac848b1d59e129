//! Client for the Overpass API that turns responses into a linked map graph.
//!
//! Every element id of a given kind resolves to exactly one record per
//! graph, so a way's node list and a relation's members point at the same
//! records that are reachable through [`QueryResult::nodes`] and friends,
//! even when the reference appears before the element itself.
//!
//! ```no_run
//! let client = overpass::Client::new()?;
//! let result = client.query("[out:json];relation(1673881);>>;out body;")?;
//! for (id, way) in result.ways().iter() {
//!     let nodes: Vec<_> = result.way_nodes(way).collect();
//!     println!("way {} has {} nodes", id, nodes.len());
//! }
//! # Ok::<(), overpass::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod data;
pub mod decode;
pub mod errors;

pub use client::{permits::PermitPool, transport::{HttpTransport, Response, Transport}, Client};
pub use config::ClientConfig;
pub use data::{
    arena::{Arena, Handle},
    osm::{Bounds, ElementType, Member, MemberRef, Meta, Node, OsmId, Point, Relation, Tags, Way},
    Create, Delete, Graph, MemberEntity, Modify, QueryResult, Revision,
};
pub use decode::{decode, decode_as, Format};
pub use errors::{Error, Result};
