use std::collections::HashMap;

use chrono::{DateTime, Utc};

use self::arena::{Arena, Handle};
use self::osm::{Member, MemberRef, Node, OsmId, Relation, Way};

pub mod arena;
pub mod osm;

/// One state of the map graph: a registry per element kind.
#[derive(Debug, Default)]
pub struct Graph {
    pub nodes: Arena<Node>,
    pub ways: Arena<Way>,
    pub relations: Arena<Relation>,
}

/// A relation member resolved against the current-state graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberEntity<'a> {
    Node(&'a Node),
    Way(&'a Way),
    Relation(&'a Relation),
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }
}

/// Elements introduced by `create` actions. Handles point into the current state.
#[derive(Debug, Default)]
pub struct Create {
    pub nodes: HashMap<OsmId, Handle<Node>>,
    pub ways: HashMap<OsmId, Handle<Way>>,
    pub relations: HashMap<OsmId, Handle<Relation>>,
}

/// Both sides of a `modify` action.
///
/// `old` points into the old-state graph, `new` into the current state.
#[derive(Debug)]
pub struct Revision<T> {
    pub old: Option<Handle<T>>,
    pub new: Option<Handle<T>>,
}

impl<T> Default for Revision<T> {
    fn default() -> Self {
        Revision { old: None, new: None }
    }
}

#[derive(Debug, Default)]
pub struct Modify {
    pub nodes: HashMap<OsmId, Revision<Node>>,
    pub ways: HashMap<OsmId, Revision<Way>>,
    pub relations: HashMap<OsmId, Revision<Relation>>,
}

/// Elements removed by `delete` actions. Handles point into the old state.
#[derive(Debug, Default)]
pub struct Delete {
    pub nodes: HashMap<OsmId, Handle<Node>>,
    pub ways: HashMap<OsmId, Handle<Way>>,
    pub relations: HashMap<OsmId, Handle<Relation>>,
}

/// Fully linked result of one Overpass response.
///
/// Way node lists and relation members always point into the current
/// state, also for records held in the old-state graph. Follow them with
/// [`QueryResult::way_nodes`] and [`QueryResult::member`].
#[derive(Debug, Default)]
pub struct QueryResult {
    pub timestamp: Option<DateTime<Utc>>,
    pub areas_timestamp: Option<DateTime<Utc>>,
    pub generator: Option<String>,
    /// Runtime message reported by the server alongside a successful status.
    pub remark: Option<String>,
    /// Top-level elements for snapshots, actions for diffs.
    pub count: usize,
    pub current: Graph,
    pub(crate) old: Option<Graph>,
    pub(crate) create: Option<Create>,
    pub(crate) modify: Option<Modify>,
    pub(crate) delete: Option<Delete>,
}

impl QueryResult {
    pub fn nodes(&self) -> &Arena<Node> {
        &self.current.nodes
    }

    pub fn ways(&self) -> &Arena<Way> {
        &self.current.ways
    }

    pub fn relations(&self) -> &Arena<Relation> {
        &self.current.relations
    }

    /// Nodes of `way`, which may come from either graph.
    pub fn way_nodes<'a>(&'a self, way: &'a Way) -> impl Iterator<Item = &'a Node> + 'a {
        way.nodes.iter().map(move |&handle| &self.current.nodes[handle])
    }

    pub fn member(&self, member: &Member) -> MemberEntity<'_> {
        let graph = &self.current;
        match member.target {
            MemberRef::Node(handle) => MemberEntity::Node(&graph.nodes[handle]),
            MemberRef::Way(handle) => MemberEntity::Way(&graph.ways[handle]),
            MemberRef::Relation(handle) => MemberEntity::Relation(&graph.relations[handle]),
        }
    }

    /// Old-state graph; present only for diffs.
    pub fn old(&self) -> Option<&Graph> {
        self.old.as_ref()
    }

    pub fn create(&self) -> Option<&Create> {
        self.create.as_ref()
    }

    pub fn modify(&self) -> Option<&Modify> {
        self.modify.as_ref()
    }

    pub fn delete(&self) -> Option<&Delete> {
        self.delete.as_ref()
    }

    pub fn is_diff(&self) -> bool {
        self.old.is_some()
    }
}
