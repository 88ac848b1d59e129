use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::Error;

use super::arena::Handle;

pub type OsmId = i64;

pub type Tags = HashMap<String, String>;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(ElementType::Node),
            "way" => Ok(ElementType::Way),
            "relation" => Ok(ElementType::Relation),
            other => Err(Error::decode(format!("unknown element type {:?}", other))),
        }
    }
}

/// Fields shared by every element kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Meta {
    pub id: OsmId,
    pub timestamp: Option<DateTime<Utc>>,
    pub version: i64,
    pub changeset: i64,
    pub user: String,
    pub uid: i64,
    pub visible: Option<bool>,
    /// `None` when the element carried no tags at all.
    pub tags: Option<Tags>,
}

impl Meta {
    pub fn with_id(id: OsmId) -> Self {
        Meta {
            id,
            ..Meta::default()
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub meta: Meta,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Way {
    pub meta: Meta,
    /// Handles into the current-state node arena.
    pub nodes: Vec<Handle<Node>>,
    pub bounds: Option<Bounds>,
    /// Positional with `nodes`; `None` where the server sent no coordinate.
    pub geometry: Vec<Option<Point>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Node(Handle<Node>),
    Way(Handle<Way>),
    Relation(Handle<Relation>),
}

impl MemberRef {
    pub fn element_type(&self) -> ElementType {
        match self {
            MemberRef::Node(_) => ElementType::Node,
            MemberRef::Way(_) => ElementType::Way,
            MemberRef::Relation(_) => ElementType::Relation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub target: MemberRef,
    pub role: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Relation {
    pub meta: Meta,
    pub members: Vec<Member>,
    pub bounds: Option<Bounds>,
}

/// Element kinds that can live in an [`super::arena::Arena`].
pub trait Element {
    fn placeholder(id: OsmId) -> Self;
    fn meta(&self) -> &Meta;
    fn meta_mut(&mut self) -> &mut Meta;
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                fn placeholder(id: OsmId) -> Self {
                    Self {
                        meta: Meta::with_id(id),
                        ..Default::default()
                    }
                }

                fn meta(&self) -> &Meta {
                    &self.meta
                }

                fn meta_mut(&mut self) -> &mut Meta {
                    &mut self.meta
                }
            }
        )*
    };
}

impl_element!(Node, Way, Relation);
