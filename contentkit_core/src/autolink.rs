use crate::AutolinkBehavior;
use crate::AutolinkHeadingsConfig;
use crate::hast::Element;
use crate::hast::HNode;
use crate::hast::Root;
use crate::pipeline::HastPass;

/// Adds an anchor link to every heading with an `id`.
#[derive(Debug, Clone)]
pub struct AutolinkHeadingsPass {
	options: AutolinkHeadingsConfig,
}

impl AutolinkHeadingsPass {
	pub fn new(options: AutolinkHeadingsConfig) -> Self {
		Self { options }
	}

	fn anchor(&self, id: &str) -> Element {
		let mut anchor = Element::new("a").with_attr("href", format!("#{id}"));
		anchor.class_name.clone_from(&self.options.class_name);

		if !self.options.aria_label.is_empty() {
			anchor.set_attr("aria-label", self.options.aria_label.clone());
		}

		if self.options.class_name.is_empty()
			&& self.options.aria_label.is_empty()
			&& self.options.behavior != AutolinkBehavior::Wrap
		{
			anchor.set_attr("aria-hidden", "true");
			anchor.set_attr("tabindex", "-1");
		}

		anchor
	}

	fn link_headings(&self, nodes: &mut Vec<HNode>) {
		let mut index = 0;

		while index < nodes.len() {
			let mut sibling = None;

			if let HNode::Element(element) = &mut nodes[index] {
				if element.is_heading() {
					if let Some(id) = element.attr("id").map(str::to_string) {
						sibling = self.link_heading(element, &id);
					}
				} else {
					self.link_headings(&mut element.children);
				}
			}

			match sibling {
				Some(anchor) if self.options.behavior == AutolinkBehavior::Before => {
					nodes.insert(index, anchor);
					index += 2;
				}
				Some(anchor) => {
					nodes.insert(index + 1, anchor);
					index += 2;
				}
				None => index += 1,
			}
		}
	}

	/// Attach the anchor to `heading`. Returns the anchor when it belongs
	/// beside the heading instead of inside it.
	fn link_heading(&self, heading: &mut Element, id: &str) -> Option<HNode> {
		let anchor = self.anchor(id);

		match self.options.behavior {
			AutolinkBehavior::Prepend => {
				heading.children.insert(0, with_icon(anchor));
				None
			}
			AutolinkBehavior::Append => {
				heading.children.push(with_icon(anchor));
				None
			}
			AutolinkBehavior::Wrap => {
				let content = std::mem::take(&mut heading.children);
				heading.children = vec![anchor.with_children(content).into_node()];
				None
			}
			AutolinkBehavior::Before | AutolinkBehavior::After => Some(with_icon(anchor)),
		}
	}
}

fn with_icon(anchor: Element) -> HNode {
	let icon = Element::new("span")
		.with_class("icon")
		.with_class("icon-link")
		.into_node();
	anchor.with_children(vec![icon]).into_node()
}

impl HastPass for AutolinkHeadingsPass {
	fn name(&self) -> &'static str {
		"autolink-headings"
	}

	fn run(&self, root: &mut Root) {
		self.link_headings(&mut root.children);
	}
}
