use std::str;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::data::osm::{Bounds, ElementType, Meta, Node, OsmId, Point, Tags};
use crate::data::QueryResult;
use crate::errors::{Error, Result};

use super::materialize::{Materializer, RawMember, RawRelation, RawWay, Side};

/// At most one element of each kind, as found inside `action`, `old` or `new`.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct XmlRevision {
    pub node: Option<Node>,
    pub way: Option<RawWay>,
    pub relation: Option<RawRelation>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct XmlAction {
    pub kind: String,
    pub elements: XmlRevision,
    pub old: Option<XmlRevision>,
    pub new: Option<XmlRevision>,
}

/// Everything read from an XML response before any linking happens.
#[derive(Debug, Default)]
pub(crate) struct XmlDocument {
    pub generator: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub areas_timestamp: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub nodes: Vec<Node>,
    pub ways: Vec<RawWay>,
    pub relations: Vec<RawRelation>,
    pub actions: Vec<XmlAction>,
}

type XmlReader<'a> = Reader<&'a [u8]>;

fn unexpected_eof() -> Error {
    Error::decode("unexpected end of XML document")
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Ok(false),
        other => Err(Error::decode(format!("invalid boolean attribute {:?}", other))),
    }
}

/// Calls `on_child` for every direct child element until the parent closes.
fn for_each_child<'a, F>(reader: &mut XmlReader<'a>, mut on_child: F) -> Result<()>
where
    F: FnMut(&mut XmlReader<'a>, BytesStart<'a>, bool) -> Result<()>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => on_child(reader, e, true)?,
            Event::Empty(e) => on_child(reader, e, false)?,
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(unexpected_eof()),
            _ => (),
        }
    }
}

fn skip(reader: &mut XmlReader, start: &BytesStart, has_children: bool) -> Result<()> {
    if has_children {
        reader.read_to_end(start.name())?;
    }
    Ok(())
}

fn read_text(reader: &mut XmlReader, has_children: bool) -> Result<String> {
    let mut text = String::new();
    if !has_children {
        return Ok(text);
    }
    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(str::from_utf8(&e.into_inner())?),
            Event::Start(e) => {
                reader.read_to_end(e.name())?;
            },
            Event::End(_) => return Ok(text),
            Event::Eof => return Err(unexpected_eof()),
            _ => (),
        }
    }
}

fn apply_meta_attribute(meta: &mut Meta, key: &[u8], value: &str) -> Result<()> {
    match key {
        b"id" => meta.id = value.parse()?,
        b"timestamp" => meta.timestamp = Some(parse_timestamp(value)?),
        b"version" => meta.version = value.parse()?,
        b"changeset" => meta.changeset = value.parse()?,
        b"user" => meta.user = value.to_string(),
        b"uid" => meta.uid = value.parse()?,
        b"visible" => meta.visible = Some(parse_bool(value)?),
        _ => (),
    }
    Ok(())
}

fn insert_tag(tags: &mut Option<Tags>, el: &BytesStart) -> Result<()> {
    let mut key = String::new();
    let mut value = String::new();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        match attribute.key.as_ref() {
            b"k" => key = attribute.unescape_value()?.into_owned(),
            b"v" => value = attribute.unescape_value()?.into_owned(),
            _ => (),
        }
    }
    tags.get_or_insert_with(Tags::new).insert(key, value);
    Ok(())
}

fn parse_bounds(el: &BytesStart) -> Result<Bounds> {
    let mut bounds = Bounds::default();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"minlat" => bounds.min.lat = value.parse()?,
            b"minlon" => bounds.min.lon = value.parse()?,
            b"maxlat" => bounds.max.lat = value.parse()?,
            b"maxlon" => bounds.max.lon = value.parse()?,
            _ => (),
        }
    }
    Ok(bounds)
}

fn parse_node(reader: &mut XmlReader, el: &BytesStart, has_children: bool) -> Result<Node> {
    let mut node = Node::default();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"lat" => node.lat = value.parse()?,
            b"lon" => node.lon = value.parse()?,
            key => apply_meta_attribute(&mut node.meta, key, &value)?,
        }
    }
    if has_children {
        for_each_child(reader, |reader, child, has_children| {
            if child.name().as_ref() == b"tag" {
                insert_tag(&mut node.meta.tags, &child)?;
            }
            skip(reader, &child, has_children)
        })?;
    }
    Ok(node)
}

fn parse_nd(el: &BytesStart) -> Result<(OsmId, Option<Point>)> {
    let mut id: OsmId = 0;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"ref" => id = value.parse()?,
            b"lat" => lat = Some(value.parse()?),
            b"lon" => lon = Some(value.parse()?),
            _ => (),
        }
    }
    let point = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Point { lat, lon }),
        _ => None,
    };
    Ok((id, point))
}

fn parse_way(reader: &mut XmlReader, el: &BytesStart, has_children: bool) -> Result<RawWay> {
    let mut way = RawWay::default();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        apply_meta_attribute(&mut way.meta, attribute.key.as_ref(), &value)?;
    }
    let mut geometry = Vec::new();
    if has_children {
        for_each_child(reader, |reader, child, has_children| {
            match child.name().as_ref() {
                b"nd" => {
                    let (id, point) = parse_nd(&child)?;
                    way.nodes.push(id);
                    geometry.push(point);
                },
                b"tag" => insert_tag(&mut way.meta.tags, &child)?,
                b"bounds" => way.bounds = Some(parse_bounds(&child)?),
                _ => (),
            }
            skip(reader, &child, has_children)
        })?;
    }
    // Plain `out` carries no coordinates on nd elements at all.
    if geometry.iter().any(Option::is_some) {
        way.geometry = geometry;
    }
    Ok(way)
}

fn parse_member(el: &BytesStart) -> Result<RawMember> {
    let mut kind: Option<ElementType> = None;
    let mut id: OsmId = 0;
    let mut role = String::new();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"type" => kind = Some(value.parse()?),
            b"ref" => id = value.parse()?,
            b"role" => role = value.into_owned(),
            _ => (),
        }
    }
    let kind = kind.ok_or_else(|| Error::decode(format!("relation member {} has no type", id)))?;
    Ok(RawMember { kind, id, role })
}

fn parse_relation(reader: &mut XmlReader, el: &BytesStart, has_children: bool) -> Result<RawRelation> {
    let mut relation = RawRelation::default();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        apply_meta_attribute(&mut relation.meta, attribute.key.as_ref(), &value)?;
    }
    if has_children {
        for_each_child(reader, |reader, child, has_children| {
            match child.name().as_ref() {
                b"member" => relation.members.push(parse_member(&child)?),
                b"tag" => insert_tag(&mut relation.meta.tags, &child)?,
                b"bounds" => relation.bounds = Some(parse_bounds(&child)?),
                _ => (),
            }
            skip(reader, &child, has_children)
        })?;
    }
    Ok(relation)
}

/// Reads one node/way/relation child into `revision`. Returns false for other elements.
fn parse_revision_child(
    reader: &mut XmlReader,
    revision: &mut XmlRevision,
    el: &BytesStart,
    has_children: bool,
) -> Result<bool> {
    match el.name().as_ref() {
        b"node" => revision.node = Some(parse_node(reader, el, has_children)?),
        b"way" => revision.way = Some(parse_way(reader, el, has_children)?),
        b"relation" => revision.relation = Some(parse_relation(reader, el, has_children)?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_revision(reader: &mut XmlReader, has_children: bool) -> Result<XmlRevision> {
    let mut revision = XmlRevision::default();
    if has_children {
        for_each_child(reader, |reader, child, has_children| {
            if !parse_revision_child(reader, &mut revision, &child, has_children)? {
                skip(reader, &child, has_children)?;
            }
            Ok(())
        })?;
    }
    Ok(revision)
}

fn parse_action(reader: &mut XmlReader, el: &BytesStart, has_children: bool) -> Result<XmlAction> {
    let mut action = XmlAction::default();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        if attribute.key.as_ref() == b"type" {
            action.kind = attribute.unescape_value()?.into_owned();
        }
    }
    if has_children {
        for_each_child(reader, |reader, child, has_children| {
            match child.name().as_ref() {
                b"old" => action.old = Some(parse_revision(reader, has_children)?),
                b"new" => action.new = Some(parse_revision(reader, has_children)?),
                _ => {
                    if !parse_revision_child(reader, &mut action.elements, &child, has_children)? {
                        skip(reader, &child, has_children)?;
                    }
                },
            }
            Ok(())
        })?;
    }
    Ok(action)
}

impl XmlDocument {
    fn apply_meta(&mut self, el: &BytesStart) -> Result<()> {
        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            let value = attribute.unescape_value()?;
            match attribute.key.as_ref() {
                b"osm_base" => self.timestamp = Some(parse_timestamp(&value)?),
                b"areas" => self.areas_timestamp = Some(parse_timestamp(&value)?),
                _ => (),
            }
        }
        Ok(())
    }

    fn apply_root(&mut self, el: &BytesStart) -> Result<()> {
        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            if attribute.key.as_ref() == b"generator" {
                self.generator = Some(attribute.unescape_value()?.into_owned());
            }
        }
        Ok(())
    }

    fn parse_root_child(&mut self, reader: &mut XmlReader, el: BytesStart, has_children: bool) -> Result<()> {
        match el.name().as_ref() {
            b"node" => self.nodes.push(parse_node(reader, &el, has_children)?),
            b"way" => self.ways.push(parse_way(reader, &el, has_children)?),
            b"relation" => self.relations.push(parse_relation(reader, &el, has_children)?),
            b"action" => self.actions.push(parse_action(reader, &el, has_children)?),
            b"remark" => self.remark = Some(read_text(reader, has_children)?.trim().to_string()),
            b"meta" => {
                self.apply_meta(&el)?;
                skip(reader, &el, has_children)?;
            },
            _ => skip(reader, &el, has_children)?,
        }
        Ok(())
    }

    /// Reads the whole document in a single pass over `body`.
    pub fn parse(body: &[u8]) -> Result<XmlDocument> {
        let mut reader = Reader::from_reader(body);
        reader.trim_text(true);
        let mut document = XmlDocument::default();

        loop {
            match reader.read_event()? {
                Event::Start(root) => {
                    document.apply_root(&root)?;
                    for_each_child(&mut reader, |reader, child, has_children| {
                        document.parse_root_child(reader, child, has_children)
                    })?;
                    return Ok(document);
                },
                Event::Empty(root) => {
                    document.apply_root(&root)?;
                    return Ok(document);
                },
                Event::Text(_) => return Err(Error::decode("unexpected text before the root element")),
                Event::Eof => return Err(Error::decode("missing root element")),
                _ => (),
            }
        }
    }
}

/// Links a plain (non-diff) document: nodes, then ways, then relations.
pub(crate) fn materialize_snapshot(document: XmlDocument) -> QueryResult {
    let count = document.nodes.len() + document.ways.len() + document.relations.len();
    let mut materializer = Materializer::new();

    for node in document.nodes {
        materializer.store_node(node, Side::Current);
    }
    for way in document.ways {
        materializer.store_way(way, Side::Current);
    }
    for relation in document.relations {
        materializer.store_relation(relation, Side::Current);
    }

    if let Some(remark) = &document.remark {
        warn!(remark = remark.as_str(); "Server attached a remark to the response");
    }
    debug!(count = count; "Decoded XML snapshot");

    QueryResult {
        timestamp: document.timestamp,
        areas_timestamp: document.areas_timestamp,
        generator: document.generator,
        remark: document.remark,
        count,
        current: materializer.current,
        ..QueryResult::default()
    }
}
