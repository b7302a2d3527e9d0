//! Block-as-table encoding (§4.1, `aem2doc` rule 1 / `doc2aem` rule 2).
//!
//! A "block" is any `<div class="...">` whose class carries the block's
//! name. `encode` rewrites each one into a `<table>` (header cell names the
//! block, body rows/cells come from the div's grandchildren) surrounded by
//! empty `<p>` nodes, because the structured-document schema models blocks
//! as tables rather than as arbitrary nested divs. `decode` reverses it.

use markup5ever_rcdom::{Handle, NodeData};

use crate::dom;

/// Rewrites every `<div>` with a non-empty class, at any depth, into its
/// table form. Returns the list of nodes `node` expands to — normally one,
/// except a rewritten block becomes `<p></p><table>…</table><p></p>`.
pub fn encode(node: &Handle) -> Vec<Handle> {
	match &node.data {
		NodeData::Element { .. } if dom::is_element(node, "div") => {
			if let Some(class) = dom::get_attr(node, "class") {
				if !class.trim().is_empty() {
					return encode_block(node, &class);
				}
			}
			vec![clone_with_rewritten_children(node, encode)]
		}
		NodeData::Element { .. } => vec![clone_with_rewritten_children(node, encode)],
		_ => vec![node.clone()],
	}
}

fn encode_block(node: &Handle, class: &str) -> Vec<Handle> {
	let classes: Vec<&str> = class.split_whitespace().filter(|c| !c.is_empty()).collect();
	let first = classes.first().copied().unwrap_or("block");
	let block_name = if classes.len() > 1 {
		format!("{first} ({})", classes[1..].join(", "))
	} else {
		first.to_string()
	};

	let rows: Vec<Handle> = dom::children(node).into_iter().filter(is_element_node).collect();

	let mut body_rows = Vec::with_capacity(rows.len());
	let mut max_cols = 1usize;
	for row in &rows {
		let cells: Vec<Handle> = dom::children(row).into_iter().filter(is_element_node).collect();
		max_cols = max_cols.max(cells.len().max(1));

		let tr = dom::new_element("tr", vec![]);
		for cell in &cells {
			let td = dom::new_element("td", vec![]);
			let content: Vec<Handle> = dom::children(cell).into_iter().flat_map(|c| encode(&c)).collect();
			dom::set_children(&td, content);
			dom::append_child(&tr, td);
		}
		body_rows.push(tr);
	}

	let header_td = dom::new_element("td", vec![("colspan", max_cols.to_string())]);
	dom::append_child(&header_td, dom::new_text(block_name));
	let header_tr = dom::new_element("tr", vec![]);
	dom::append_child(&header_tr, header_td);
	let thead = dom::new_element("thead", vec![]);
	dom::append_child(&thead, header_tr);

	let tbody = dom::new_element("tbody", vec![]);
	for tr in body_rows {
		dom::append_child(&tbody, tr);
	}

	let table = dom::new_element("table", vec![]);
	dom::append_child(&table, thead);
	dom::append_child(&table, tbody);

	vec![dom::new_element("p", vec![]), table, dom::new_element("p", vec![])]
}

/// `doc2aem` rule 2: every `<table>` becomes `<div class="...">` again.
pub fn decode(node: &Handle) -> Handle {
	match &node.data {
		NodeData::Element { .. } if dom::is_element(node, "table") => decode_table(node),
		NodeData::Element { .. } => decode_element_children(node),
		_ => node.clone(),
	}
}

/// Decodes a sibling list: each node through [`decode`], then strips the
/// empty `<p>` that `encode_block` wraps every reconstructed table in
/// (§4.1 `doc2aem` rule 2 — the inverse of "Surround the generated table
/// with empty `<p>` nodes" from rule 1). Without this, a block round-trip
/// gains a leading/trailing empty `<p>` every pass, growing without bound
/// (P1).
pub fn decode_list(nodes: &[Handle]) -> Vec<Handle> {
	let decoded: Vec<Handle> = nodes.iter().map(decode).collect();
	strip_block_paragraphs(decoded)
}

fn decode_element_children(node: &Handle) -> Handle {
	let new_node = clone_element_shallow(node);
	let decoded = decode_list(&dom::children(node));
	dom::set_children(&new_node, decoded);
	new_node
}

fn decode_table(table: &Handle) -> Handle {
	let thead = dom::children(table).into_iter().find(|n| dom::is_element(n, "thead"));
	let tbody = dom::children(table).into_iter().find(|n| dom::is_element(n, "tbody"));

	let header_text = thead
		.as_ref()
		.and_then(|thead| dom::children(thead).into_iter().find(|n| dom::is_element(n, "tr")))
		.and_then(|tr| dom::children(&tr).into_iter().find(|n| dom::is_element(n, "td") || dom::is_element(n, "th")))
		.map(|td| dom::text_content(&td))
		.unwrap_or_default();

	let class = class_name_from_header(&header_text);
	let div = dom::new_element("div", vec![("class", class)]);

	if let Some(tbody) = tbody {
		for row in dom::children(&tbody).into_iter().filter(is_element_node) {
			let row_div = dom::new_element("div", vec![]);
			for cell in dom::children(&row).into_iter().filter(is_element_node) {
				let cell_div = dom::new_element("div", vec![]);
				let content = decode_list(&dom::children(&cell));
				dom::set_children(&cell_div, content);
				dom::append_child(&row_div, cell_div);
			}
			dom::append_child(&div, row_div);
		}
	}

	div
}

/// A table is only ever reconstructed into a `<div class="...">` by
/// `decode_table`, and that is the only place this crate sets a `class`
/// attribute on a `<div>` — any block-carrying class was already rewritten
/// into a table on the way in (§4.1 rule 1), so this is an unambiguous
/// marker for "this div used to be the table `encode_block` wrapped".
fn is_reconstructed_block(node: &Handle) -> bool {
	dom::is_element(node, "div") && dom::get_attr(node, "class").is_some()
}

fn is_empty_p(node: &Handle) -> bool {
	dom::is_element(node, "p") && dom::children(node).is_empty()
}

/// Removes exactly one empty `<p>` immediately before and after each
/// reconstructed block div in `nodes`, mirroring `encode_block`'s
/// `<p></p><table>…</table><p></p>` wrapping.
fn strip_block_paragraphs(nodes: Vec<Handle>) -> Vec<Handle> {
	let mut keep = vec![true; nodes.len()];
	for (i, node) in nodes.iter().enumerate() {
		if !is_reconstructed_block(node) {
			continue;
		}
		if i > 0 && is_empty_p(&nodes[i - 1]) {
			keep[i - 1] = false;
		}
		if i + 1 < nodes.len() && is_empty_p(&nodes[i + 1]) {
			keep[i + 1] = false;
		}
	}
	nodes.into_iter().zip(keep).filter_map(|(n, k)| k.then_some(n)).collect()
}

/// "lower-casing the header-cell text, replacing non-alphanumeric runs with
/// `-`, trimming leading/trailing dashes" (§4.1 `doc2aem` rule 2).
fn class_name_from_header(header: &str) -> String {
	let lower = header.to_lowercase();
	let mut out = String::with_capacity(lower.len());
	let mut last_was_dash = false;
	for ch in lower.chars() {
		if ch.is_alphanumeric() {
			out.push(ch);
			last_was_dash = false;
		} else if !last_was_dash {
			out.push('-');
			last_was_dash = true;
		}
	}
	out.trim_matches('-').to_string()
}

fn is_element_node(node: &Handle) -> bool {
	matches!(node.data, NodeData::Element { .. })
}

fn clone_with_rewritten_children(node: &Handle, f: impl Fn(&Handle) -> Vec<Handle>) -> Handle {
	let new_node = clone_element_shallow(node);
	let new_children = dom::children(node).into_iter().flat_map(|c| f(&c)).collect();
	dom::set_children(&new_node, new_children);
	new_node
}

fn clone_element_shallow(node: &Handle) -> Handle {
	let tag = dom::tag_name(node).unwrap_or_else(|| "div".to_string());
	let attrs = dom::all_attrs(node);
	dom::new_element(&tag, attrs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect())
}

// vim: ts=4
