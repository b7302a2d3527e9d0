//! Section-break handling: the splice/split transforms around `<main>`'s
//! top-level `<div>` sections (§4.1 `aem2doc` rule 3, `doc2aem` rule 4).

use markup5ever_rcdom::Handle;

use crate::dom;

/// `aem2doc` rule 3: splice each section's children inline, separated by
/// `<p></p><hr/><p></p>`.
pub fn splice_sections(sections: Vec<Handle>) -> Vec<Handle> {
	let mut out = Vec::new();
	for (i, section) in sections.iter().enumerate() {
		if i > 0 {
			out.push(dom::new_element("p", vec![]));
			out.push(dom::new_element("hr", vec![]));
			out.push(dom::new_element("p", vec![]));
		}
		out.extend(dom::children(section));
	}
	out
}

/// `doc2aem` rule 4: split a flat node sequence at each `<hr>` into
/// sections, each wrapped in its own `<div>`.
///
/// This is the exact inverse of `splice_sections`: splitting on `<hr>`
/// leaves one stray empty `<p>` on each side of the break (the
/// separator's own padding), which is stripped rather than treated as
/// section content. A lone section with no `<hr>` at all (including an
/// entirely empty one) is left untouched, so the empty-document case
/// round-trips to a single empty `<div>` instead of vanishing.
pub fn split_into_sections(nodes: Vec<Handle>) -> Vec<Handle> {
	let mut sections = Vec::new();
	let mut current = Vec::new();

	for node in nodes {
		if dom::is_element(&node, "hr") {
			sections.push(std::mem::take(&mut current));
		} else {
			current.push(node);
		}
	}
	sections.push(current);

	let last = sections.len() - 1;
	for (i, section) in sections.iter_mut().enumerate() {
		if i > 0 {
			strip_leading_empty_p(section);
		}
		if i < last {
			strip_trailing_empty_p(section);
		}
	}

	sections
		.into_iter()
		.map(|section| {
			let div = dom::new_element("div", vec![]);
			dom::set_children(&div, section);
			div
		})
		.collect()
}

fn is_empty_p(node: &Handle) -> bool {
	dom::is_element(node, "p") && dom::children(node).is_empty()
}

fn strip_leading_empty_p(section: &mut Vec<Handle>) {
	if section.first().is_some_and(is_empty_p) {
		section.remove(0);
	}
}

fn strip_trailing_empty_p(section: &mut Vec<Handle>) {
	if section.last().is_some_and(is_empty_p) {
		section.pop();
	}
}

// vim: ts=4
