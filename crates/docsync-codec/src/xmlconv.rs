//! Bridges the `markup5ever_rcdom` tree this crate rewrites against to the
//! `yrs` XML fragment the CRDT engine actually replicates (§4.1 `aem2doc`
//! rule 4, `doc2aem` rule 1).
//!
//! The structured-document schema (paragraph/heading/table/... node types)
//! is not modeled as a separate Rust type: a tag name plus its attributes
//! already carries everything the schema would otherwise encode, so each
//! HTML element maps onto one `yrs` XML element of the same tag, and each
//! HTML text node onto one `yrs` XML text node. This keeps the bijection
//! symmetric without re-deriving ProseMirror's node/mark tables in Rust.

use markup5ever_rcdom::{Handle, NodeData};
use yrs::{
	GetString, ReadTxn, TransactionMut, Xml, XmlElementPrelim, XmlFragment, XmlFragmentRef, XmlOut, XmlTextPrelim,
};

use crate::dom;

/// Replaces `fragment`'s entire contents with `nodes`.
pub fn write_fragment(txn: &mut TransactionMut, fragment: &XmlFragmentRef, nodes: &[Handle]) {
	let existing = fragment.len(txn);
	if existing > 0 {
		fragment.remove_range(txn, 0, existing);
	}
	for (index, node) in nodes.iter().enumerate() {
		write_node(txn, fragment, index as u32, node);
	}
}

fn write_node(txn: &mut TransactionMut, parent: &XmlFragmentRef, index: u32, node: &Handle) {
	match &node.data {
		NodeData::Text { contents } => {
			parent.insert(txn, index, XmlTextPrelim::new(contents.borrow().to_string()));
		}
		NodeData::Element { .. } => {
			let tag = dom::tag_name(node).unwrap_or_else(|| "div".to_string());
			let elem = parent.insert(txn, index, XmlElementPrelim::empty(tag));
			for (key, value) in dom::all_attrs(node) {
				elem.insert_attribute(txn, key, value);
			}
			write_children_into_element(txn, &elem, node);
		}
		_ => {}
	}
}

fn write_children_into_element(txn: &mut TransactionMut, elem: &yrs::XmlElementRef, node: &Handle) {
	for (index, child) in dom::children(node).into_iter().enumerate() {
		match &child.data {
			NodeData::Text { contents } => {
				elem.insert(txn, index as u32, XmlTextPrelim::new(contents.borrow().to_string()));
			}
			NodeData::Element { .. } => {
				let tag = dom::tag_name(&child).unwrap_or_else(|| "div".to_string());
				let child_elem = elem.insert(txn, index as u32, XmlElementPrelim::empty(tag));
				for (key, value) in dom::all_attrs(&child) {
					child_elem.insert_attribute(txn, key, value);
				}
				write_children_into_element(txn, &child_elem, &child);
			}
			_ => {}
		}
	}
}

/// Reads `fragment`'s contents back into a vector of sibling DOM handles.
pub fn read_fragment(txn: &impl ReadTxn, fragment: &XmlFragmentRef) -> Vec<Handle> {
	let len = fragment.len(txn);
	let mut out = Vec::with_capacity(len as usize);
	for index in 0..len {
		if let Some(child) = fragment.get(txn, index) {
			out.push(read_xml_out(txn, &child));
		}
	}
	out
}

fn read_xml_out(txn: &impl ReadTxn, node: &XmlOut) -> Handle {
	match node {
		XmlOut::Text(text) => dom::new_text(text.get_string(txn)),
		XmlOut::Element(elem) => {
			let tag = elem.tag().to_string();
			let attrs: Vec<(String, String)> = elem.attributes(txn).map(|(k, v)| (k.to_string(), v)).collect();
			let handle = dom::new_element(&tag, attrs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect());
			let len = elem.len(txn);
			let mut children = Vec::with_capacity(len as usize);
			for index in 0..len {
				if let Some(child) = elem.get(txn, index) {
					children.push(read_xml_out(txn, &child));
				}
			}
			dom::set_children(&handle, children);
			handle
		}
		XmlOut::Fragment(nested) => {
			let handle = dom::new_element("div", vec![]);
			dom::set_children(&handle, read_fragment(txn, nested));
			handle
		}
	}
}

// vim: ts=4
