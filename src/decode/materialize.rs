use crate::data::{arena::Handle, osm::{Bounds, ElementType, Member, MemberRef, Meta, Node, OsmId, Point, Relation, Way}, Graph};

/// A way as read off the wire, node references still unresolved.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RawWay {
    pub meta: Meta,
    pub nodes: Vec<OsmId>,
    pub geometry: Vec<Option<Point>>,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawMember {
    pub kind: ElementType,
    pub id: OsmId,
    pub role: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RawRelation {
    pub meta: Meta,
    pub members: Vec<RawMember>,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawElement {
    Node(Node),
    Way(RawWay),
    Relation(RawRelation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Current,
    Old,
}

/// Links raw elements into the current and old graphs.
///
/// Elements are written into the graph selected by [`Side`]; the references
/// they carry always resolve against the current graph.
#[derive(Default)]
pub(crate) struct Materializer {
    pub current: Graph,
    pub old: Graph,
}

impl Materializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn graph_mut(&mut self, side: Side) -> &mut Graph {
        match side {
            Side::Current => &mut self.current,
            Side::Old => &mut self.old,
        }
    }

    pub fn store(&mut self, element: RawElement, side: Side) {
        match element {
            RawElement::Node(node) => {
                self.store_node(node, side);
            },
            RawElement::Way(way) => {
                self.store_way(way, side);
            },
            RawElement::Relation(relation) => {
                self.store_relation(relation, side);
            },
        }
    }

    pub fn store_node(&mut self, node: Node, side: Side) -> Handle<Node> {
        self.graph_mut(side).nodes.replace(node)
    }

    pub fn store_way(&mut self, raw: RawWay, side: Side) -> Handle<Way> {
        let handle = self.graph_mut(side).ways.get_or_create(raw.meta.id);
        let nodes: Vec<Handle<Node>> = raw.nodes.iter()
            .map(|&id| self.current.nodes.get_or_create(id))
            .collect();
        self.graph_mut(side).ways[handle] = Way {
            meta: raw.meta,
            nodes,
            bounds: raw.bounds,
            geometry: raw.geometry,
        };
        handle
    }

    pub fn store_relation(&mut self, raw: RawRelation, side: Side) -> Handle<Relation> {
        let handle = self.graph_mut(side).relations.get_or_create(raw.meta.id);
        let members: Vec<Member> = raw.members.into_iter()
            .map(|member| Member {
                target: self.resolve(member.kind, member.id),
                role: member.role,
            })
            .collect();
        self.graph_mut(side).relations[handle] = Relation {
            meta: raw.meta,
            members,
            bounds: raw.bounds,
        };
        handle
    }

    fn resolve(&mut self, kind: ElementType, id: OsmId) -> MemberRef {
        match kind {
            ElementType::Node => MemberRef::Node(self.current.nodes.get_or_create(id)),
            ElementType::Way => MemberRef::Way(self.current.ways.get_or_create(id)),
            ElementType::Relation => MemberRef::Relation(self.current.relations.get_or_create(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn raw_way(id: OsmId, nodes: Vec<OsmId>) -> RawWay {
        RawWay {
            meta: Meta::with_id(id),
            nodes,
            ..RawWay::default()
        }
    }

    #[test]
    fn forward_references_are_filled_in_place() {
        let mut materializer = Materializer::new();
        let way = materializer.store_way(raw_way(1, vec![10, 11]), Side::Current);
        let node = materializer.store_node(
            Node { meta: Meta::with_id(10), lat: 51.5, lon: -0.1 },
            Side::Current,
        );

        let graph = &materializer.current;
        assert_eq!(graph.ways[way].nodes[0], node);
        assert_eq!(graph.nodes[node].lat, 51.5);
        assert_eq!(graph.nodes.get(11).map(|n| &n.meta), Some(&Meta::with_id(11)));
    }

    #[test]
    fn old_side_references_resolve_into_current_graph() {
        let mut materializer = Materializer::new();
        let relation = RawRelation {
            meta: Meta::with_id(5),
            members: vec![RawMember { kind: ElementType::Way, id: 3, role: "outer".to_string() }],
            bounds: None,
        };
        let handle = materializer.store_relation(relation, Side::Old);

        assert!(materializer.current.relations.is_empty());
        assert!(materializer.current.ways.contains(3));
        let stored = &materializer.old.relations[handle];
        assert_eq!(stored.members[0].role, "outer");
        assert_eq!(stored.members[0].target.element_type(), ElementType::Way);
    }

    #[test]
    fn self_referencing_relation_shares_one_record() {
        let mut materializer = Materializer::new();
        let relation = RawRelation {
            meta: Meta::with_id(9),
            members: vec![RawMember { kind: ElementType::Relation, id: 9, role: String::new() }],
            bounds: None,
        };
        let handle = materializer.store_relation(relation, Side::Current);

        assert_eq!(materializer.current.relations.len(), 1);
        assert_eq!(materializer.current.relations[handle].members[0].target, MemberRef::Relation(handle));
    }
}
