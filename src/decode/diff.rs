use log::{debug, warn};

use crate::data::{Create, Delete, Modify, QueryResult, Revision};

use super::materialize::{Materializer, Side};
use super::xml::{XmlDocument, XmlRevision};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionType {
    Create,
    Modify,
    Delete,
}

impl ActionType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(ActionType::Create),
            "modify" => Some(ActionType::Modify),
            "delete" => Some(ActionType::Delete),
            _ => None,
        }
    }
}

#[derive(Default)]
struct DiffBuilder {
    materializer: Materializer,
    create: Option<Create>,
    modify: Option<Modify>,
    delete: Option<Delete>,
}

impl DiffBuilder {
    fn apply_create(&mut self, elements: XmlRevision) {
        let create = self.create.get_or_insert_with(Create::default);
        if let Some(node) = elements.node {
            let id = node.meta.id;
            create.nodes.insert(id, self.materializer.store_node(node, Side::Current));
        }
        if let Some(way) = elements.way {
            let id = way.meta.id;
            create.ways.insert(id, self.materializer.store_way(way, Side::Current));
        }
        if let Some(relation) = elements.relation {
            let id = relation.meta.id;
            create.relations.insert(id, self.materializer.store_relation(relation, Side::Current));
        }
    }

    fn apply_modify(&mut self, old: XmlRevision, new: XmlRevision) {
        let modify = self.modify.get_or_insert_with(Modify::default);

        if let Some(node) = old.node {
            let id = node.meta.id;
            let handle = self.materializer.store_node(node, Side::Old);
            modify.nodes.insert(id, Revision { old: Some(handle), new: None });
        }
        if let Some(node) = new.node {
            let id = node.meta.id;
            let handle = self.materializer.store_node(node, Side::Current);
            modify.nodes.entry(id).or_default().new = Some(handle);
        }

        if let Some(way) = old.way {
            let id = way.meta.id;
            let handle = self.materializer.store_way(way, Side::Old);
            modify.ways.insert(id, Revision { old: Some(handle), new: None });
        }
        if let Some(way) = new.way {
            let id = way.meta.id;
            let handle = self.materializer.store_way(way, Side::Current);
            modify.ways.entry(id).or_default().new = Some(handle);
        }

        // The new relation is filed under the old relation's id, not its own.
        let old_relation_id = old.relation.as_ref().map(|relation| relation.meta.id);
        if let Some(relation) = old.relation {
            let id = relation.meta.id;
            let handle = self.materializer.store_relation(relation, Side::Old);
            modify.relations.insert(id, Revision { old: Some(handle), new: None });
        }
        if let Some(relation) = new.relation {
            let id = old_relation_id.unwrap_or(relation.meta.id);
            let handle = self.materializer.store_relation(relation, Side::Current);
            modify.relations.entry(id).or_default().new = Some(handle);
        }
    }

    fn apply_delete(&mut self, old: XmlRevision, new: Option<XmlRevision>) {
        let delete = self.delete.get_or_insert_with(Delete::default);
        let graph = &mut self.materializer;

        if let Some(node) = old.node {
            let id = node.meta.id;
            delete.nodes.insert(id, graph.store_node(node, Side::Old));
        }
        if let Some(way) = old.way {
            let id = way.meta.id;
            delete.ways.insert(id, graph.store_way(way, Side::Old));
        }
        if let Some(relation) = old.relation {
            let id = relation.meta.id;
            delete.relations.insert(id, graph.store_relation(relation, Side::Old));
        }

        // The new side is a tombstone: only its visibility is carried over.
        let Some(new) = new else {
            return;
        };
        if let Some(node) = new.node {
            match delete.nodes.get(&node.meta.id) {
                Some(&handle) => graph.old.nodes[handle].meta.visible = Some(node.meta.visible.unwrap_or(false)),
                None => warn!(id = node.meta.id; "Ignoring tombstone for node without a deleted revision"),
            }
        }
        if let Some(way) = new.way {
            match delete.ways.get(&way.meta.id) {
                Some(&handle) => graph.old.ways[handle].meta.visible = Some(way.meta.visible.unwrap_or(false)),
                None => warn!(id = way.meta.id; "Ignoring tombstone for way without a deleted revision"),
            }
        }
        if let Some(relation) = new.relation {
            match delete.relations.get(&relation.meta.id) {
                Some(&handle) => graph.old.relations[handle].meta.visible = Some(relation.meta.visible.unwrap_or(false)),
                None => warn!(id = relation.meta.id; "Ignoring tombstone for relation without a deleted revision"),
            }
        }
    }
}

/// Links an action-bearing document into current and old graphs plus summaries.
pub(crate) fn materialize_diff(document: XmlDocument) -> QueryResult {
    let count = document.actions.len();
    if !(document.nodes.is_empty() && document.ways.is_empty() && document.relations.is_empty()) {
        debug!(
            nodes = document.nodes.len(), ways = document.ways.len(), relations = document.relations.len();
            "Ignoring bare elements next to actions"
        );
    }

    let mut builder = DiffBuilder::default();
    for action in document.actions {
        match ActionType::parse(&action.kind) {
            Some(ActionType::Create) => builder.apply_create(action.elements),
            Some(ActionType::Modify) => builder.apply_modify(
                action.old.unwrap_or_default(),
                action.new.unwrap_or_default(),
            ),
            Some(ActionType::Delete) => builder.apply_delete(action.old.unwrap_or_default(), action.new),
            None => warn!(action = action.kind.as_str(); "Skipping action of unknown type"),
        }
    }

    if let Some(remark) = &document.remark {
        warn!(remark = remark.as_str(); "Server attached a remark to the response");
    }
    debug!(count = count; "Decoded XML diff");

    QueryResult {
        timestamp: document.timestamp,
        areas_timestamp: document.areas_timestamp,
        generator: document.generator,
        remark: document.remark,
        count,
        current: builder.materializer.current,
        old: Some(builder.materializer.old),
        create: builder.create,
        modify: builder.modify,
        delete: builder.delete,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::data::osm::{ElementType, Meta};
    use crate::data::MemberEntity;

    use super::*;

    fn decode(body: &str) -> QueryResult {
        materialize_diff(XmlDocument::parse(body.as_bytes()).unwrap())
    }

    #[test]
    fn create_mirrors_into_current_state() {
        let result = decode(r#"<osm>
              <action type="create">
                <node id="1" lat="1.5" lon="2.5" version="1"/>
              </action>
              <action type="create">
                <way id="2" version="1"><nd ref="1"/><tag k="highway" v="path"/></way>
              </action>
            </osm>"#);

        assert_eq!(result.count, 2);
        let create = result.create().unwrap();
        assert_eq!(create.nodes[&1], result.nodes().handle(1).unwrap());
        assert_eq!(create.ways[&2], result.ways().handle(2).unwrap());
        assert_eq!(result.ways().get(2).unwrap().nodes[0], create.nodes[&1]);
        assert!(result.old().unwrap().is_empty());
        assert!(result.modify().is_none());
        assert!(result.delete().is_none());
    }

    #[test]
    fn modify_keeps_both_revisions() {
        let result = decode(r#"<osm>
              <action type="modify">
                <old><node id="7" lat="1.0" lon="1.0" version="1"><tag k="name" v="Old"/></node></old>
                <new><node id="7" lat="2.0" lon="2.0" version="2"><tag k="name" v="New"/></node></new>
              </action>
            </osm>"#);

        let revision = &result.modify().unwrap().nodes[&7];
        let old = &result.old().unwrap().nodes[revision.old.unwrap()];
        let new = &result.nodes()[revision.new.unwrap()];
        assert_eq!((old.lat, old.meta.version, old.meta.tag("name")), (1.0, 1, Some("Old")));
        assert_eq!((new.lat, new.meta.version, new.meta.tag("name")), (2.0, 2, Some("New")));
    }

    #[test]
    fn modified_relation_is_filed_under_the_old_id() {
        let result = decode(r#"<osm>
              <action type="modify">
                <old><relation id="10" version="1"/></old>
                <new><relation id="11" version="2"/></new>
              </action>
            </osm>"#);

        let relations = &result.modify().unwrap().relations;
        assert_eq!(relations.len(), 1);
        let revision = &relations[&10];
        assert_eq!(result.old().unwrap().relations[revision.old.unwrap()].meta.id, 10);
        assert_eq!(result.relations()[revision.new.unwrap()].meta.id, 11);
    }

    #[test]
    fn modify_with_only_a_new_side_is_recorded() {
        let result = decode(r#"<osm>
              <action type="modify">
                <new><way id="3"><nd ref="1"/></way></new>
              </action>
            </osm>"#);

        let revision = &result.modify().unwrap().ways[&3];
        assert!(revision.old.is_none());
        assert_eq!(revision.new, result.ways().handle(3));
    }

    #[test]
    fn delete_copies_tombstone_visibility() {
        let result = decode(r#"<osm>
              <action type="delete">
                <old><way id="4" version="3" visible="true"><nd ref="1"/></way></old>
                <new><way id="4" version="4" visible="false"/></new>
              </action>
              <action type="delete">
                <old><node id="5" lat="0" lon="0"/></old>
                <new><node id="6" visible="false"/></new>
              </action>
            </osm>"#);

        let delete = result.delete().unwrap();
        let old = result.old().unwrap();
        let way = &old.ways[delete.ways[&4]];
        assert_eq!(way.meta.version, 3);
        assert_eq!(way.meta.visible, Some(false));
        assert_eq!(old.ways.len(), 1);
        assert!(result.ways().is_empty());
        // The old way's nodes resolve into the current state.
        assert!(result.nodes().contains(1));

        assert_eq!(old.nodes[delete.nodes[&5]].meta.visible, None);
        assert!(!old.nodes.contains(6));
    }

    #[test]
    fn tombstone_without_visibility_marks_record_invisible() {
        let result = decode(r#"<osm>
              <action type="delete">
                <old><node id="8" lat="1" lon="1" visible="true"/></old>
                <new><node id="8" version="2"/></new>
              </action>
            </osm>"#);

        let old = result.old().unwrap();
        assert_eq!(old.nodes[result.delete().unwrap().nodes[&8]].meta.visible, Some(false));
    }

    #[test]
    fn old_records_walk_into_the_current_state() {
        let result = decode(r#"<osm>
              <action type="delete">
                <old><node id="5" lat="9" lon="9"/></old>
              </action>
              <action type="delete">
                <old><way id="4"><nd ref="1"/><nd ref="2"/></way></old>
              </action>
              <action type="create">
                <node id="1" lat="1.5" lon="2.5"/>
              </action>
              <action type="modify">
                <old><relation id="20"><member type="way" ref="4" role="outer"/><member type="node" ref="2" role=""/></relation></old>
                <new><relation id="20"><member type="node" ref="1" role="label"/></relation></new>
              </action>
            </osm>"#);
        let old = result.old().unwrap();

        let way = &old.ways[result.delete().unwrap().ways[&4]];
        let ids: Vec<_> = result.way_nodes(way).map(|node| node.meta.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(result.way_nodes(way).next().map(|node| node.lat), Some(1.5));

        let revision = &result.modify().unwrap().relations[&20];
        let relation = &old.relations[revision.old.unwrap()];
        let targets: Vec<_> = relation.members.iter()
            .map(|member| match result.member(member) {
                MemberEntity::Node(node) => (ElementType::Node, node.meta.id),
                MemberEntity::Way(way) => (ElementType::Way, way.meta.id),
                MemberEntity::Relation(relation) => (ElementType::Relation, relation.meta.id),
            })
            .collect();
        assert_eq!(targets, vec![(ElementType::Way, 4), (ElementType::Node, 2)]);
        // Way 4 is only mentioned in the current state, never stored there.
        assert_eq!(result.ways().get(4).unwrap().meta, Meta::with_id(4));
    }

    #[test]
    fn count_is_the_number_of_actions() {
        let result = decode(r#"<osm>
              <action type="create"><node id="1"/></action>
              <action type="rename"><node id="2"/></action>
              <action type="delete"><old><node id="3"/></old></action>
            </osm>"#);

        assert_eq!(result.count, 3);
        assert!(result.is_diff());
        assert!(!result.nodes().contains(2));
    }
}
