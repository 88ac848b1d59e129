use proptest::prelude::*;
use serde_json::{json, Value};

use overpass::{decode_as, Format, MemberRef};

const NODES: i64 = 6;
const WAYS: i64 = 3;

fn node(id: i64) -> Value {
    json!({"type": "node", "id": id, "lat": id as f64, "lon": -(id as f64)})
}

fn way(id: i64, nodes: &[i64]) -> Value {
    json!({"type": "way", "id": 100 + id, "nodes": nodes})
}

fn relation(ways: &[i64]) -> Value {
    let members: Vec<Value> = ways.iter()
        .map(|id| json!({"type": "way", "ref": 100 + id, "role": "part"}))
        .collect();
    json!({"type": "relation", "id": 1000, "members": members})
}

fn elements_strategy() -> impl Strategy<Value = Vec<Value>> {
    let way_nodes = prop::collection::vec(prop::collection::vec(1..=NODES, 1..5), WAYS as usize);
    way_nodes.prop_flat_map(|way_nodes| {
        let mut elements: Vec<Value> = (1..=NODES).map(node).collect();
        for (index, nodes) in way_nodes.iter().enumerate() {
            elements.push(way(index as i64, nodes));
        }
        elements.push(relation(&(0..WAYS).collect::<Vec<_>>()));
        Just(elements).prop_shuffle()
    })
}

proptest! {
    #[test]
    fn references_resolve_to_primary_records_in_any_order(elements in elements_strategy()) {
        let body = serde_json::to_vec(&json!({"elements": &elements})).unwrap();
        let result = decode_as(&body, Format::Json).unwrap();

        prop_assert_eq!(result.count, elements.len());
        prop_assert_eq!(result.nodes().len(), NODES as usize);
        prop_assert_eq!(result.ways().len(), WAYS as usize);

        for (_, way) in result.ways().iter() {
            for &handle in &way.nodes {
                let node = &result.nodes()[handle];
                prop_assert_eq!(result.nodes().handle(node.meta.id), Some(handle));
                prop_assert_eq!(node.lat, node.meta.id as f64);
            }
        }

        let relation = result.relations().get(1000).unwrap();
        for member in &relation.members {
            match member.target {
                MemberRef::Way(handle) => {
                    let way = &result.ways()[handle];
                    prop_assert_eq!(result.ways().handle(way.meta.id), Some(handle));
                    prop_assert!(!way.nodes.is_empty());
                },
                other => prop_assert!(false, "unexpected member {:?}", other),
            }
        }
    }
}
