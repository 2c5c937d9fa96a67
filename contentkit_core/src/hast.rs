//! A small HTML syntax tree that the rendering passes operate on.

use std::fmt::Write;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: [&str; 6] = ["br", "hr", "img", "input", "meta", "link"];

/// A node in the HTML tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HNode {
	Element(Element),
	Text(String),
	/// Pre-rendered HTML emitted verbatim.
	Raw(String),
}

impl HNode {
	pub fn text(value: impl Into<String>) -> Self {
		Self::Text(value.into())
	}

	pub fn as_element(&self) -> Option<&Element> {
		match self {
			Self::Element(element) => Some(element),
			_ => None,
		}
	}

	pub fn as_element_mut(&mut self) -> Option<&mut Element> {
		match self {
			Self::Element(element) => Some(element),
			_ => None,
		}
	}

	/// Concatenated text of this node and its descendants.
	pub fn text_content(&self) -> String {
		let mut out = String::new();
		collect_text(self, &mut out);
		out
	}
}

fn collect_text(node: &HNode, out: &mut String) {
	match node {
		HNode::Text(value) => out.push_str(value),
		HNode::Element(element) => {
			for child in &element.children {
				collect_text(child, out);
			}
		}
		HNode::Raw(_) => {}
	}
}

/// An HTML element. Classes are kept apart from other attributes so passes
/// can edit the token list directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
	pub tag: String,
	pub class_name: Vec<String>,
	/// Attributes in insertion order. An empty value serializes as `name=""`.
	pub attributes: Vec<(String, String)>,
	pub children: Vec<HNode>,
	/// The info string after a fenced code block's language. Not serialized.
	pub meta: Option<String>,
}

impl Element {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_children(mut self, children: Vec<HNode>) -> Self {
		self.children = children;
		self
	}

	#[must_use]
	pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_attr(name, value);
		self
	}

	#[must_use]
	pub fn with_class(mut self, class: impl Into<String>) -> Self {
		self.class_name.push(class.into());
		self
	}

	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}

	pub fn has_attr(&self, name: &str) -> bool {
		self.attributes.iter().any(|(key, _)| key == name)
	}

	/// Set an attribute, replacing an existing value in place.
	pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();
		if let Some(existing) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
			existing.1 = value;
		} else {
			self.attributes.push((name, value));
		}
	}

	pub fn remove_attr(&mut self, name: &str) -> Option<String> {
		let index = self.attributes.iter().position(|(key, _)| key == name)?;
		Some(self.attributes.remove(index).1)
	}

	pub fn is_heading(&self) -> bool {
		matches!(self.tag.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
	}

	pub fn text_content(&self) -> String {
		let mut out = String::new();
		for child in &self.children {
			collect_text(child, &mut out);
		}
		out
	}

	pub fn into_node(self) -> HNode {
		HNode::Element(self)
	}
}

/// The root of a rendered document body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Root {
	pub children: Vec<HNode>,
}

impl Root {
	pub fn new(children: Vec<HNode>) -> Self {
		Self { children }
	}

	/// Visit every element depth-first in document order, parents before
	/// their children.
	pub fn for_each_element_mut(&mut self, visit: &mut impl FnMut(&mut Element)) {
		visit_elements(&mut self.children, visit);
	}

	/// Serialize the tree to an HTML string.
	pub fn to_html(&self) -> String {
		let mut out = String::new();
		for node in &self.children {
			write_node(node, &mut out);
		}
		out
	}
}

fn visit_elements(nodes: &mut [HNode], visit: &mut impl FnMut(&mut Element)) {
	for node in nodes {
		if let HNode::Element(element) = node {
			visit(element);
			visit_elements(&mut element.children, visit);
		}
	}
}

/// Serialize a single node to HTML.
pub fn node_to_html(node: &HNode) -> String {
	let mut out = String::new();
	write_node(node, &mut out);
	out
}

fn write_node(node: &HNode, out: &mut String) {
	match node {
		HNode::Text(value) => out.push_str(&escape_text(value)),
		HNode::Raw(value) => out.push_str(value),
		HNode::Element(element) => write_element(element, out),
	}
}

fn write_element(element: &Element, out: &mut String) {
	out.push('<');
	out.push_str(&element.tag);

	if !element.class_name.is_empty() {
		let _ = write!(
			out,
			" class=\"{}\"",
			escape_attribute(&element.class_name.join(" "))
		);
	}

	for (name, value) in &element.attributes {
		let _ = write!(out, " {name}=\"{}\"", escape_attribute(value));
	}

	out.push('>');

	if VOID_ELEMENTS.contains(&element.tag.as_str()) {
		return;
	}

	for child in &element.children {
		write_node(child, out);
	}

	let _ = write!(out, "</{}>", element.tag);
}

/// Escape text content.
pub fn escape_text(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for ch in value.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			_ => escaped.push(ch),
		}
	}
	escaped
}

/// Escape an attribute value written inside double quotes.
pub fn escape_attribute(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for ch in value.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'"' => escaped.push_str("&quot;"),
			'<' => escaped.push_str("&lt;"),
			_ => escaped.push(ch),
		}
	}
	escaped
}
