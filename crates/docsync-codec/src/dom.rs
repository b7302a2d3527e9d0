//! Thin wrapper around `html5ever`/`markup5ever_rcdom` for parsing HTML
//! fragments into a mutable tree and serializing them back out. The rest
//! of this crate works on this tree rather than on `yrs`'s XML API
//! directly, since every rewrite rule in §4.1 is phrased as a tree
//! transform ("rewrite into a table", "split at `<hr>`", "splice
//! children").

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_document, parse_fragment, serialize, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use docsync_types::{DocResult, Error};
use tracing::warn;

/// Parses a full `<body>…</body>` document and returns the `<body>` handle.
pub fn parse_body(html: &str) -> DocResult<Handle> {
	let dom = parse_document(RcDom::default(), html5ever::ParseOpts::default())
		.from_utf8()
		.read_from(&mut html.as_bytes())
		.map_err(|e| {
			warn!("failed to parse html document: {}", e);
			Error::CodecError(format!("failed to parse html document: {e}"))
		})?;

	find_by_tag(&dom.document, "body").ok_or_else(|| {
		warn!("rejected html with no <body> element during aem2doc");
		Error::CodecError("document has no <body> element".to_string())
	})
}

/// Parses a bare fragment (no implied `<html>`/`<body>`) into a `<div>`
/// wrapper holding its top-level nodes as children.
pub fn parse_fragment_nodes(html: &str) -> DocResult<Handle> {
	let context = QualName::new(None, ns!(html), local_name!("div"));
	let dom = parse_fragment(RcDom::default(), html5ever::ParseOpts::default(), context, Vec::new())
		.from_utf8()
		.read_from(&mut html.as_bytes())
		.map_err(|e| Error::CodecError(format!("failed to parse html fragment: {e}")))?;

	find_by_tag(&dom.document, "html")
		.and_then(|html| find_by_tag(&html, "body"))
		.ok_or_else(|| Error::CodecError("fragment parse produced no body wrapper".to_string()))
}

fn find_by_tag(node: &Handle, tag: &str) -> Option<Handle> {
	if let NodeData::Element { name, .. } = &node.data {
		if name.local.as_ref() == tag {
			return Some(node.clone());
		}
	}
	for child in node.children.borrow().iter() {
		if let Some(found) = find_by_tag(child, tag) {
			return Some(found);
		}
	}
	None
}

pub fn element_name(tag: &str) -> QualName {
	QualName::new(None, ns!(html), html5ever::LocalName::from(tag))
}

pub fn new_element(tag: &str, attrs: Vec<(&str, String)>) -> Handle {
	let attrs = attrs
		.into_iter()
		.map(|(k, v)| html5ever::interface::Attribute {
			name: QualName::new(None, ns!(), html5ever::LocalName::from(k)),
			value: v.into(),
		})
		.collect::<Vec<_>>();

	markup5ever_rcdom::Node::new(NodeData::Element {
		name: element_name(tag),
		attrs: RefCell::new(attrs),
		template_contents: RefCell::new(None),
		mathml_annotation_xml_integration_point: false,
	})
}

pub fn new_text(text: impl Into<String>) -> Handle {
	markup5ever_rcdom::Node::new(NodeData::Text { contents: RefCell::new(text.into().into()) })
}

pub fn tag_name(node: &Handle) -> Option<String> {
	match &node.data {
		NodeData::Element { name, .. } => Some(name.local.to_string()),
		_ => None,
	}
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
	matches!(&node.data, NodeData::Element { name, .. } if name.local.as_ref() == tag)
}

pub fn get_attr(node: &Handle, key: &str) -> Option<String> {
	match &node.data {
		NodeData::Element { attrs, .. } => attrs
			.borrow()
			.iter()
			.find(|a| a.name.local.as_ref() == key)
			.map(|a| a.value.to_string()),
		_ => None,
	}
}

pub fn set_attr(node: &Handle, key: &str, value: impl Into<String>) {
	if let NodeData::Element { attrs, .. } = &node.data {
		let mut attrs = attrs.borrow_mut();
		if let Some(a) = attrs.iter_mut().find(|a| a.name.local.as_ref() == key) {
			a.value = value.into().into();
		} else {
			attrs.push(html5ever::interface::Attribute {
				name: QualName::new(None, ns!(), html5ever::LocalName::from(key)),
				value: value.into().into(),
			});
		}
	}
}

pub fn all_attrs(node: &Handle) -> Vec<(String, String)> {
	match &node.data {
		NodeData::Element { attrs, .. } => attrs
			.borrow()
			.iter()
			.map(|a| (a.name.local.to_string(), a.value.to_string()))
			.collect(),
		_ => Vec::new(),
	}
}

pub fn text_content(node: &Handle) -> String {
	let mut out = String::new();
	collect_text(node, &mut out);
	out
}

fn collect_text(node: &Handle, out: &mut String) {
	if let NodeData::Text { contents } = &node.data {
		out.push_str(&contents.borrow());
	}
	for child in node.children.borrow().iter() {
		collect_text(child, out);
	}
}

pub fn children(node: &Handle) -> Vec<Handle> {
	node.children.borrow().iter().cloned().collect()
}

pub fn set_children(node: &Handle, new_children: Vec<Handle>) {
	let mut children = node.children.borrow_mut();
	children.clear();
	children.extend(new_children);
}

pub fn append_child(node: &Handle, child: Handle) {
	node.children.borrow_mut().push(child);
}

/// Serializes `node`'s children (not the wrapping element itself) as HTML.
pub fn serialize_children(node: &Handle) -> DocResult<String> {
	let mut out = Vec::new();
	for child in node.children.borrow().iter() {
		let serializable: SerializableHandle = child.clone().into();
		serialize::serialize(&mut out, &serializable, serialize::SerializeOpts::default())
			.map_err(|e| Error::CodecError(format!("failed to serialize html: {e}")))?;
	}
	String::from_utf8(out).map_err(|e| Error::CodecError(format!("serialized html was not utf8: {e}")))
}

pub fn serialize_node(node: &Handle) -> DocResult<String> {
	let mut out = Vec::new();
	let serializable: SerializableHandle = node.clone().into();
	serialize::serialize(&mut out, &serializable, serialize::SerializeOpts::default())
		.map_err(|e| Error::CodecError(format!("failed to serialize html: {e}")))?;
	String::from_utf8(out).map_err(|e| Error::CodecError(format!("serialized html was not utf8: {e}")))
}

// vim: ts=4
