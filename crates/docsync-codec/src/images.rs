//! Image/link rewriting (§4.1 `aem2doc` rule 1 second bullet, `doc2aem`
//! rule 5).

use markup5ever_rcdom::{Handle, NodeData};

use crate::dom;

/// `aem2doc` rule 1: a top-level `<a>` wrapping exactly one `<img>` is
/// collapsed by copying `href`/`title` onto the image, since the
/// structured-document engine cannot otherwise represent anchor-wrapped
/// images.
pub fn collapse_anchor_images(nodes: Vec<Handle>) -> Vec<Handle> {
	nodes
		.into_iter()
		.map(|node| {
			if !dom::is_element(&node, "a") {
				return node;
			}
			let children: Vec<Handle> = dom::children(&node).into_iter().filter(is_element).collect();
			if children.len() != 1 || !dom::is_element(&children[0], "img") {
				return node;
			}

			let img = children[0].clone();
			if let Some(href) = dom::get_attr(&node, "href") {
				dom::set_attr(&img, "href", href);
			}
			if let Some(title) = dom::get_attr(&node, "title") {
				dom::set_attr(&img, "title", title);
			}
			img
		})
		.collect()
}

fn is_element(node: &Handle) -> bool {
	matches!(node.data, NodeData::Element { .. })
}

/// `doc2aem` rule 5: per-element rendering rules applied during
/// serialization, recursively over the whole tree.
pub fn render_images_and_unwrap(node: &Handle) -> Vec<Handle> {
	if !is_element(node) {
		return vec![node.clone()];
	}

	if dom::is_element(node, "img") {
		return vec![render_picture(node)];
	}

	if dom::is_element(node, "p") {
		let children: Vec<Handle> = dom::children(node).into_iter().filter(is_element).collect();
		if children.len() == 1 && dom::is_element(&children[0], "img") {
			return render_images_and_unwrap(&children[0]);
		}
	}

	if dom::is_element(node, "li") {
		let children: Vec<Handle> = dom::children(node).into_iter().filter(is_element).collect();
		if children.len() == 1 && dom::is_element(&children[0], "p") {
			let new_li = clone_shallow(node);
			let inline: Vec<Handle> =
				dom::children(&children[0]).into_iter().flat_map(|c| render_images_and_unwrap(&c)).collect();
			dom::set_children(&new_li, inline);
			return vec![new_li];
		}
	}

	let new_node = clone_shallow(node);
	let new_children: Vec<Handle> =
		dom::children(node).into_iter().flat_map(|c| render_images_and_unwrap(&c)).collect();
	dom::set_children(&new_node, new_children);
	vec![new_node]
}

fn render_picture(img: &Handle) -> Handle {
	let src = dom::get_attr(img, "src").unwrap_or_default();
	let alt = dom::get_attr(img, "alt");
	let title = dom::get_attr(img, "title");
	let href = dom::get_attr(img, "href");
	let loading = dom::get_attr(img, "loading").unwrap_or_else(|| "lazy".to_string());

	let source_small = dom::new_element("source", vec![("srcset", src.clone())]);
	let source_large =
		dom::new_element("source", vec![("srcset", src.clone()), ("media", "(min-width: 600px)".to_string())]);

	// §8 scenario 3: `src`, then `alt` (if present), then `loading` — html5ever
	// serializes attributes in insertion order, so this order is significant.
	let mut img_attrs = vec![("src", src)];
	if let Some(alt) = &alt {
		img_attrs.push(("alt", alt.clone()));
	}
	img_attrs.push(("loading", loading));
	let img_out = dom::new_element("img", img_attrs);

	let picture = dom::new_element("picture", vec![]);
	dom::append_child(&picture, source_small);
	dom::append_child(&picture, source_large);
	dom::append_child(&picture, img_out);

	match href {
		Some(href) => {
			let mut a_attrs = vec![("href", href)];
			if let Some(title) = title {
				a_attrs.push(("title", title));
			}
			let a = dom::new_element("a", a_attrs);
			dom::append_child(&a, picture);
			a
		}
		None => picture,
	}
}

fn clone_shallow(node: &Handle) -> Handle {
	let tag = dom::tag_name(node).unwrap_or_else(|| "div".to_string());
	let attrs = dom::all_attrs(node);
	dom::new_element(&tag, attrs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect())
}

// vim: ts=4
