use std::collections::HashMap;

use markdown::mdast::AlignKind;
use markdown::mdast::AttributeContent;
use markdown::mdast::AttributeValue;
use markdown::mdast::Node;

use crate::hast::Element;
use crate::hast::HNode;
use crate::hast::Root;

/// Convert a markdown syntax tree into an HTML tree.
///
/// When `allow_raw_html` is false, raw HTML nodes are dropped. MDX
/// expressions and ESM never render; JSX elements become HTML elements, with
/// capitalized component names rendered as `div`/`span` carrying a
/// `data-mdx-component` attribute.
pub fn mdast_to_hast(root: &Node, allow_raw_html: bool) -> Root {
	let mut state = State::new(allow_raw_html);
	state.collect_definitions(root);

	let children = match root {
		Node::Root(root) => state.all(&root.children),
		other => state.one(other),
	};
	let mut children = wrap(children, false);

	if let Some(footnotes) = state.footnote_section() {
		if !children.is_empty() {
			children.push(HNode::text("\n"));
		}
		children.push(footnotes);
	}

	Root::new(children)
}

struct Definition {
	url: String,
	title: Option<String>,
}

struct State {
	allow_raw_html: bool,
	definitions: HashMap<String, Definition>,
	footnote_definitions: HashMap<String, Vec<Node>>,
	/// Footnote identifiers in first-reference order.
	footnote_order: Vec<String>,
	footnote_reference_counts: HashMap<String, usize>,
}

impl State {
	fn new(allow_raw_html: bool) -> Self {
		Self {
			allow_raw_html,
			definitions: HashMap::new(),
			footnote_definitions: HashMap::new(),
			footnote_order: Vec::new(),
			footnote_reference_counts: HashMap::new(),
		}
	}

	fn collect_definitions(&mut self, node: &Node) {
		match node {
			Node::Definition(definition) => {
				self.definitions
					.entry(definition.identifier.clone())
					.or_insert_with(|| Definition {
						url: definition.url.clone(),
						title: definition.title.clone(),
					});
			}
			Node::FootnoteDefinition(definition) => {
				self.footnote_definitions
					.entry(definition.identifier.clone())
					.or_insert_with(|| definition.children.clone());
			}
			_ => {}
		}

		if let Some(children) = node.children() {
			for child in children {
				self.collect_definitions(child);
			}
		}
	}

	fn all(&mut self, nodes: &[Node]) -> Vec<HNode> {
		nodes.iter().flat_map(|node| self.one(node)).collect()
	}

	fn one(&mut self, node: &Node) -> Vec<HNode> {
		match node {
			Node::Root(root) => self.all(&root.children),
			Node::Paragraph(paragraph) => {
				let children = self.all(&paragraph.children);
				vec![Element::new("p").with_children(children).into_node()]
			}
			Node::Heading(heading) => {
				let children = self.all(&heading.children);
				vec![
					Element::new(format!("h{}", heading.depth))
						.with_children(children)
						.into_node(),
				]
			}
			Node::Text(text) => vec![HNode::text(text.value.clone())],
			Node::Emphasis(emphasis) => {
				let children = self.all(&emphasis.children);
				vec![Element::new("em").with_children(children).into_node()]
			}
			Node::Strong(strong) => {
				let children = self.all(&strong.children);
				vec![Element::new("strong").with_children(children).into_node()]
			}
			Node::Delete(delete) => {
				let children = self.all(&delete.children);
				vec![Element::new("del").with_children(children).into_node()]
			}
			Node::InlineCode(code) => {
				vec![
					Element::new("code")
						.with_children(vec![HNode::text(code.value.clone())])
						.into_node(),
				]
			}
			Node::InlineMath(math) => {
				vec![
					Element::new("code")
						.with_class("language-math")
						.with_class("math-inline")
						.with_children(vec![HNode::text(math.value.clone())])
						.into_node(),
				]
			}
			Node::Break(_) => vec![Element::new("br").into_node(), HNode::text("\n")],
			Node::Link(link) => {
				let children = self.all(&link.children);
				let mut anchor = Element::new("a").with_attr("href", link.url.clone());
				if let Some(title) = &link.title {
					anchor.set_attr("title", title.clone());
				}
				vec![anchor.with_children(children).into_node()]
			}
			Node::Image(image) => {
				let mut img = Element::new("img")
					.with_attr("src", image.url.clone())
					.with_attr("alt", image.alt.clone());
				if let Some(title) = &image.title {
					img.set_attr("title", title.clone());
				}
				vec![img.into_node()]
			}
			Node::LinkReference(reference) => {
				let children = self.all(&reference.children);
				match self.definitions.get(&reference.identifier) {
					Some(definition) => {
						let mut anchor =
							Element::new("a").with_attr("href", definition.url.clone());
						if let Some(title) = &definition.title {
							anchor.set_attr("title", title.clone());
						}
						vec![anchor.with_children(children).into_node()]
					}
					None => {
						let mut nodes = vec![HNode::text("[")];
						nodes.extend(children);
						nodes.push(HNode::text("]"));
						nodes
					}
				}
			}
			Node::ImageReference(reference) => {
				match self.definitions.get(&reference.identifier) {
					Some(definition) => {
						let mut img = Element::new("img")
							.with_attr("src", definition.url.clone())
							.with_attr("alt", reference.alt.clone());
						if let Some(title) = &definition.title {
							img.set_attr("title", title.clone());
						}
						vec![img.into_node()]
					}
					None => vec![HNode::text(format!("![{}]", reference.alt))],
				}
			}
			Node::Blockquote(blockquote) => {
				let children = self.all(&blockquote.children);
				vec![
					Element::new("blockquote")
						.with_children(wrap(children, true))
						.into_node(),
				]
			}
			Node::List(list) => {
				let loose = list.spread
					|| list.children.iter().any(|child| {
						matches!(child, Node::ListItem(item) if item.spread)
					});
				let mut items = Vec::new();
				let mut has_task = false;
				for child in &list.children {
					if let Node::ListItem(item) = child {
						has_task |= item.checked.is_some();
					}
					items.extend(self.list_item(child, loose));
				}

				let mut element = if list.ordered {
					let mut ol = Element::new("ol");
					if let Some(start) = list.start.filter(|start| *start != 1) {
						ol.set_attr("start", start.to_string());
					}
					ol
				} else {
					Element::new("ul")
				};
				if has_task {
					element.class_name.push("contains-task-list".to_string());
				}
				vec![element.with_children(wrap(items, true)).into_node()]
			}
			Node::ListItem(_) => self.list_item(node, false),
			Node::Code(code) => {
				let mut code_element = Element::new("code");
				if let Some(lang) = &code.lang {
					code_element.class_name.push(format!("language-{lang}"));
				}
				code_element.meta.clone_from(&code.meta);
				code_element.children = vec![HNode::text(format!("{}\n", code.value))];
				vec![
					Element::new("pre")
						.with_children(vec![code_element.into_node()])
						.into_node(),
				]
			}
			Node::Math(math) => {
				let code_element = Element::new("code")
					.with_class("language-math")
					.with_class("math-display")
					.with_children(vec![HNode::text(format!("{}\n", math.value))]);
				vec![
					Element::new("pre")
						.with_children(vec![code_element.into_node()])
						.into_node(),
				]
			}
			Node::ThematicBreak(_) => vec![Element::new("hr").into_node()],
			Node::Table(table) => self.table(&table.children, &table.align),
			Node::Html(html) => {
				if self.allow_raw_html {
					vec![HNode::Raw(html.value.clone())]
				} else {
					Vec::new()
				}
			}
			Node::FootnoteReference(reference) => self.footnote_reference(&reference.identifier),
			Node::MdxJsxFlowElement(element) => {
				let children = self.all(&element.children);
				jsx_element(
					element.name.as_deref(),
					&element.attributes,
					wrap(children, false),
					true,
				)
			}
			Node::MdxJsxTextElement(element) => {
				let children = self.all(&element.children);
				jsx_element(element.name.as_deref(), &element.attributes, children, false)
			}
			// Frontmatter, definitions, and MDX expressions and ESM carry no
			// renderable content.
			_ => Vec::new(),
		}
	}

	fn list_item(&mut self, node: &Node, list_loose: bool) -> Vec<HNode> {
		let Node::ListItem(item) = node else {
			return self.one(node);
		};

		let loose = list_loose || item.spread;
		let mut children = Vec::new();
		for child in &item.children {
			match child {
				Node::Paragraph(paragraph) if !loose => {
					children.extend(self.all(&paragraph.children));
				}
				other => children.extend(self.one(other)),
			}
		}

		let mut li = Element::new("li");
		if let Some(checked) = item.checked {
			li.class_name.push("task-list-item".to_string());
			let mut input = Element::new("input")
				.with_attr("type", "checkbox")
				.with_attr("disabled", "");
			if checked {
				input.set_attr("checked", "");
			}

			let target = if loose {
				children.iter_mut().find_map(|child| {
					child
						.as_element_mut()
						.filter(|element| element.tag == "p")
						.map(|element| &mut element.children)
				})
			} else {
				None
			};
			match target {
				Some(paragraph_children) => {
					paragraph_children.insert(0, HNode::text(" "));
					paragraph_children.insert(0, input.into_node());
				}
				None => {
					children.insert(0, HNode::text(" "));
					children.insert(0, input.into_node());
				}
			}
		}

		let children = if loose {
			wrap(children, true)
		} else {
			children
		};
		vec![li.with_children(children).into_node()]
	}

	fn table(&mut self, rows: &[Node], align: &[AlignKind]) -> Vec<HNode> {
		let mut head = Vec::new();
		let mut body = Vec::new();

		for (row_index, row) in rows.iter().enumerate() {
			let Node::TableRow(row) = row else {
				continue;
			};
			let cell_tag = if row_index == 0 { "th" } else { "td" };
			let mut cells = Vec::new();
			for (cell_index, cell) in row.children.iter().enumerate() {
				let children = match cell {
					Node::TableCell(cell) => self.all(&cell.children),
					other => self.one(other),
				};
				let mut element = Element::new(cell_tag).with_children(children);
				match align.get(cell_index) {
					Some(AlignKind::Left) => element.set_attr("align", "left"),
					Some(AlignKind::Right) => element.set_attr("align", "right"),
					Some(AlignKind::Center) => element.set_attr("align", "center"),
					_ => {}
				}
				cells.push(element.into_node());
			}

			let tr = Element::new("tr")
				.with_children(wrap(cells, true))
				.into_node();
			if row_index == 0 {
				head.push(tr);
			} else {
				body.push(tr);
			}
		}

		let mut sections = vec![
			Element::new("thead")
				.with_children(wrap(head, true))
				.into_node(),
		];
		if !body.is_empty() {
			sections.push(
				Element::new("tbody")
					.with_children(wrap(body, true))
					.into_node(),
			);
		}

		vec![
			Element::new("table")
				.with_children(wrap(sections, true))
				.into_node(),
		]
	}

	fn footnote_reference(&mut self, identifier: &str) -> Vec<HNode> {
		if !self.footnote_order.iter().any(|id| id == identifier) {
			self.footnote_order.push(identifier.to_string());
		}
		let number = self
			.footnote_order
			.iter()
			.position(|id| id == identifier)
			.map_or(1, |index| index + 1);
		let count = self
			.footnote_reference_counts
			.entry(identifier.to_string())
			.or_insert(0);
		*count += 1;

		let safe_id = footnote_id(identifier);
		let reference_id = if *count > 1 {
			format!("user-content-fnref-{safe_id}-{count}")
		} else {
			format!("user-content-fnref-{safe_id}")
		};

		let anchor = Element::new("a")
			.with_attr("href", format!("#user-content-fn-{safe_id}"))
			.with_attr("id", reference_id)
			.with_attr("data-footnote-ref", "")
			.with_attr("aria-describedby", "footnote-label")
			.with_children(vec![HNode::text(number.to_string())]);

		vec![
			Element::new("sup")
				.with_children(vec![anchor.into_node()])
				.into_node(),
		]
	}

	fn footnote_section(&mut self) -> Option<HNode> {
		if self.footnote_order.is_empty() {
			return None;
		}

		let order = self.footnote_order.clone();
		let mut items = Vec::new();
		for (index, identifier) in order.iter().enumerate() {
			let Some(definition) = self.footnote_definitions.get(identifier).cloned() else {
				continue;
			};
			let safe_id = footnote_id(identifier);
			let mut children = self.all(&definition);
			let backref = Element::new("a")
				.with_attr("href", format!("#user-content-fnref-{safe_id}"))
				.with_attr("data-footnote-backref", "")
				.with_attr("aria-label", format!("Back to reference {}", index + 1))
				.with_class("data-footnote-backref")
				.with_children(vec![HNode::text("↩")])
				.into_node();

			match children
				.last_mut()
				.and_then(HNode::as_element_mut)
				.filter(|element| element.tag == "p")
			{
				Some(paragraph) => {
					paragraph.children.push(HNode::text(" "));
					paragraph.children.push(backref);
				}
				None => children.push(backref),
			}

			items.push(
				Element::new("li")
					.with_attr("id", format!("user-content-fn-{safe_id}"))
					.with_children(wrap(children, true))
					.into_node(),
			);
		}

		if items.is_empty() {
			return None;
		}

		let heading = Element::new("h2")
			.with_class("sr-only")
			.with_attr("id", "footnote-label")
			.with_children(vec![HNode::text("Footnotes")])
			.into_node();
		let list = Element::new("ol")
			.with_children(wrap(items, true))
			.into_node();

		Some(
			Element::new("section")
				.with_attr("data-footnotes", "")
				.with_class("footnotes")
				.with_children(wrap(vec![heading, list], true))
				.into_node(),
		)
	}
}

fn footnote_id(identifier: &str) -> String {
	identifier
		.chars()
		.map(|ch| if ch.is_whitespace() { '-' } else { ch })
		.collect::<String>()
		.to_lowercase()
}

fn jsx_element(
	name: Option<&str>,
	attributes: &[AttributeContent],
	children: Vec<HNode>,
	flow: bool,
) -> Vec<HNode> {
	// Fragments render only their children.
	let Some(name) = name else {
		return children;
	};

	let is_component = name.contains('.') || name.chars().next().is_some_and(char::is_uppercase);
	let mut element = if is_component {
		Element::new(if flow { "div" } else { "span" }).with_attr("data-mdx-component", name)
	} else {
		Element::new(name)
	};

	for attribute in attributes {
		let AttributeContent::Property(property) = attribute else {
			continue;
		};
		let value = match &property.value {
			None => String::new(),
			Some(AttributeValue::Literal(value)) => value.clone(),
			Some(AttributeValue::Expression(_)) => continue,
		};

		if property.name == "className" || property.name == "class" {
			element
				.class_name
				.extend(value.split_whitespace().map(str::to_string));
		} else {
			element.set_attr(property.name.clone(), value);
		}
	}

	vec![element.with_children(children).into_node()]
}

/// Join block-level nodes with newlines, optionally padding both ends.
fn wrap(nodes: Vec<HNode>, loose: bool) -> Vec<HNode> {
	let mut result = Vec::with_capacity(nodes.len() * 2 + 1);
	if loose {
		result.push(HNode::text("\n"));
	}

	let has_nodes = !nodes.is_empty();
	for (index, node) in nodes.into_iter().enumerate() {
		if index > 0 {
			result.push(HNode::text("\n"));
		}
		result.push(node);
	}

	if loose && has_nodes {
		result.push(HNode::text("\n"));
	}

	result
}
