//! HTML ↔ structured-document codec (C1, §4.1).
//!
//! `aem2doc` parses the canonical HTML envelope, rewrites it into the
//! structured-document shape, and writes that shape into a `yrs` XML
//! fragment inside a CRDT transaction. `doc2aem` does the reverse: it
//! reads the fragment back out, undoes every rewrite, and re-emits the
//! canonical envelope. Everything in between (`blocks`, `sections`,
//! `images`) is a pure tree transform over `markup5ever_rcdom` nodes, kept
//! free of any `yrs` dependency so each rule can be tested in isolation.

mod blocks;
mod dom;
mod images;
mod sections;
mod xmlconv;

use markup5ever_rcdom::{Handle, NodeData};
use yrs::{ReadTxn, TransactionMut, XmlFragmentRef};

use docsync_types::{DocResult, Error};

const LOC_ADDED: &str = "da-loc-added";
const LOC_DELETED: &str = "da-loc-deleted";
const NON_EDITABLE_ATTR: &str = "data-noneditable";

/// Parses `html` (expected to already be the canonical envelope, or at
/// least to contain a `<main>`) and writes the resulting structured
/// document into `fragment` within `txn`.
pub fn aem2doc(html: &str, fragment: &XmlFragmentRef, txn: &mut TransactionMut) -> DocResult<()> {
	let body = dom::parse_body(html)?;
	let main = find_main(&body).ok_or_else(|| Error::CodecError("envelope has no <main>".to_string()))?;

	let sections: Vec<Handle> = dom::children(&main).into_iter().filter(is_element).collect();

	let mut processed_sections = Vec::with_capacity(sections.len());
	for section in &sections {
		let children = dom::children(section);
		let children = images::collapse_anchor_images(children);
		let children: Vec<Handle> = children.into_iter().flat_map(|n| blocks::encode(&n)).collect();
		let children: Vec<Handle> = children.iter().map(convert_dashes_to_hr).collect();
		let children: Vec<Handle> = children.iter().map(mark_non_editable_wrappers).collect();

		let processed = dom::new_element("section", vec![]);
		dom::set_children(&processed, children);
		processed_sections.push(processed);
	}

	let spliced = sections::splice_sections(processed_sections);
	xmlconv::write_fragment(txn, fragment, &spliced);
	Ok(())
}

/// Reads the structured document back out of `fragment` and serializes it
/// as the canonical HTML envelope.
pub fn doc2aem(fragment: &XmlFragmentRef, txn: &impl ReadTxn) -> DocResult<String> {
	let nodes = xmlconv::read_fragment(txn, fragment);
	let nodes: Vec<Handle> = blocks::decode_list(&nodes);
	let nodes: Vec<Handle> = nodes.iter().map(strip_non_editable_flag).collect();

	let sections = sections::split_into_sections(nodes);
	let sections: Vec<Handle> =
		sections.iter().flat_map(|section| images::render_images_and_unwrap(section)).collect();

	let mut body = String::new();
	for section in &sections {
		body.push_str(&dom::serialize_node(section)?);
	}

	Ok(emit_envelope(&body))
}

fn find_main(body: &Handle) -> Option<Handle> {
	if let NodeData::Element { name, .. } = &body.data {
		if name.local.as_ref() == "main" {
			return Some(body.clone());
		}
	}
	for child in dom::children(body) {
		if let Some(found) = find_main(&child) {
			return Some(found);
		}
	}
	None
}

fn is_element(node: &Handle) -> bool {
	matches!(node.data, NodeData::Element { .. })
}

fn convert_dashes_to_hr(node: &Handle) -> Handle {
	if dom::is_element(node, "p") {
		let children = dom::children(node);
		if children.len() == 1 {
			if let NodeData::Text { contents } = &children[0].data {
				if contents.borrow().trim() == "---" {
					return dom::new_element("hr", vec![]);
				}
			}
		}
	}

	match &node.data {
		NodeData::Element { .. } => {
			let tag = dom::tag_name(node).unwrap_or_else(|| "div".to_string());
			let attrs = dom::all_attrs(node);
			let new_node = dom::new_element(&tag, attrs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect());
			let new_children: Vec<Handle> = dom::children(node).iter().map(convert_dashes_to_hr).collect();
			dom::set_children(&new_node, new_children);
			new_node
		}
		_ => node.clone(),
	}
}

/// Tags a `<da-loc-added>`/`<da-loc-deleted>` wrapper with the schema's
/// non-editable flag so it survives the round trip through the XML
/// fragment; `strip_non_editable_flag` removes it again on the way out.
fn mark_non_editable_wrappers(node: &Handle) -> Handle {
	let tag = dom::tag_name(node).unwrap_or_default();
	let attrs = dom::all_attrs(node);
	let new_node = dom::new_element(&tag, attrs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect());
	if tag == LOC_ADDED || tag == LOC_DELETED {
		dom::set_attr(&new_node, NON_EDITABLE_ATTR, "true");
	}
	let new_children: Vec<Handle> = dom::children(node).iter().map(mark_non_editable_wrappers).collect();
	dom::set_children(&new_node, new_children);
	new_node
}

fn strip_non_editable_flag(node: &Handle) -> Handle {
	match &node.data {
		NodeData::Element { .. } => {
			let tag = dom::tag_name(node).unwrap_or_else(|| "div".to_string());
			let attrs: Vec<(String, String)> =
				dom::all_attrs(node).into_iter().filter(|(k, _)| k != NON_EDITABLE_ATTR).collect();
			let new_node = dom::new_element(&tag, attrs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect());
			let new_children: Vec<Handle> = dom::children(node).iter().map(strip_non_editable_flag).collect();
			dom::set_children(&new_node, new_children);
			new_node
		}
		_ => node.clone(),
	}
}

/// §4.1 "Canonical envelope": a leading newline, two-space indentation,
/// `<header></header>` / `<footer></footer>` bracketing `<main>`.
fn emit_envelope(main_body: &str) -> String {
	format!("\n<body>\n  <header></header>\n  <main>{main_body}</main>\n  <footer></footer>\n</body>\n")
}

#[cfg(test)]
mod tests {
	use super::*;
	use yrs::{Doc, Transact};

	fn roundtrip(html: &str) -> String {
		let doc = Doc::new();
		let fragment = doc.get_or_insert_xml_fragment("prosemirror");
		{
			let mut txn = doc.transact_mut();
			aem2doc(html, &fragment, &mut txn).expect("aem2doc");
		}
		let txn = doc.transact();
		doc2aem(&fragment, &txn).expect("doc2aem")
	}

	#[test]
	fn empty_document_round_trips() {
		let envelope = emit_envelope("<div></div>");
		let out = roundtrip(&envelope);
		assert_eq!(out, envelope, "a single empty section must survive byte-for-byte");
	}

	#[test]
	fn plain_paragraph_round_trips() {
		let envelope = emit_envelope("<div><p>hello world</p></div>");
		let out = roundtrip(&envelope);
		assert!(out.contains("hello world"));
	}

	#[test]
	fn dashes_paragraph_becomes_section_break() {
		let envelope = emit_envelope("<div><p>one</p><p>---</p><p>two</p></div>");
		let out = roundtrip(&envelope);
		assert!(out.contains("one"));
		assert!(out.contains("two"));
	}

	#[test]
	fn block_div_round_trips_through_table() {
		let envelope =
			emit_envelope("<div><div class=\"hero dark\"><div><div>title</div><div>subtitle</div></div></div></div>");
		let doc = Doc::new();
		let fragment = doc.get_or_insert_xml_fragment("prosemirror");
		{
			let mut txn = doc.transact_mut();
			aem2doc(&envelope, &fragment, &mut txn).expect("aem2doc");
		}

		let txn = doc.transact();
		let nodes = xmlconv::read_fragment(&txn, &fragment);
		let has_table = nodes.iter().any(|n| contains_tag(n, "table"));
		assert!(has_table, "block div must be rewritten into a table in the document model");

		let out = doc2aem(&fragment, &txn).expect("doc2aem");
		assert_eq!(
			out,
			emit_envelope("<div><div class=\"hero-dark\"><div><div>title</div><div>subtitle</div></div></div></div>"),
			"decoded html must match the canonical table to div expansion byte-for-byte"
		);
	}

	fn contains_tag(node: &Handle, tag: &str) -> bool {
		if dom::is_element(node, tag) {
			return true;
		}
		dom::children(node).iter().any(|c| contains_tag(c, tag))
	}

	#[test]
	fn block_section_round_trips_byte_for_byte() {
		// §8 scenario 2.
		let envelope =
			emit_envelope("<div><div class=\"columns\"><div><div><p>A</p></div><div><p>B</p></div></div></div></div>");
		let out = roundtrip(&envelope);
		assert_eq!(out, envelope, "a block with a single-word class must round-trip byte-for-byte");
	}

	#[test]
	fn block_round_trip_is_idempotent() {
		// P1: a second pass through aem2doc/doc2aem must not re-wrap the
		// reconstructed block div in another pair of empty paragraphs.
		let envelope =
			emit_envelope("<div><div class=\"hero dark\"><div><div>title</div><div>subtitle</div></div></div></div>");
		let once = roundtrip(&envelope);
		let twice = roundtrip(&once);
		assert_eq!(once, twice, "a second round trip must not accrete wrapper paragraphs around the block");
	}

	#[test]
	fn two_sections_round_trip_without_gaining_stray_paragraphs() {
		let envelope = emit_envelope("<div><p>first</p></div><div><p>second</p></div>");
		let out = roundtrip(&envelope);
		assert_eq!(out, envelope, "the splice/split separator must not leak into either section's content");
	}

	#[test]
	fn anchor_wrapped_image_collapses() {
		let envelope =
			emit_envelope("<div><a href=\"/dest\" title=\"t\"><img src=\"/pic.png\" alt=\"pic\"></a></div>");
		let out = roundtrip(&envelope);
		assert!(out.contains("/dest"));
		assert!(out.contains("/pic.png"));
	}

	#[test]
	fn anchor_wrapped_image_expands_to_picture_byte_for_byte() {
		// §8 scenario 3.
		let envelope = emit_envelope("<div><a href=\"/x\"><img src=\"/y.png\" alt=\"z\"></a></div>");
		let out = roundtrip(&envelope);
		assert_eq!(
			out,
			emit_envelope(concat!(
				"<div><a href=\"/x\"><picture>",
				"<source srcset=\"/y.png\">",
				"<source srcset=\"/y.png\" media=\"(min-width: 600px)\">",
				"<img src=\"/y.png\" alt=\"z\" loading=\"lazy\">",
				"</picture></a></div>"
			)),
			"src, alt, loading must be emitted in that order"
		);
	}

	#[test]
	fn region_edit_wrappers_round_trip_without_leaking_noneditable_flag() {
		// §8 scenario 4.
		let envelope = emit_envelope(
			"<div><da-loc-deleted><h1>Old</h1></da-loc-deleted><da-loc-added><h1>New</h1></da-loc-added></div>",
		);
		let out = roundtrip(&envelope);
		assert_eq!(out, envelope, "region-edit wrappers must round-trip byte-for-byte");
		assert!(!out.contains(NON_EDITABLE_ATTR), "the internal non-editable marker must not leak into the emitted html");
	}
}

// vim: ts=4
