use std::collections::HashMap;

use crate::hast::Root;
use crate::pipeline::HastPass;

/// Generates GitHub-style heading slugs, unique within one document.
#[derive(Debug, Default)]
pub struct Slugger {
	occurrences: HashMap<String, usize>,
}

impl Slugger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Slug `value`, appending `-1`, `-2`, ... when an identical slug was
	/// already produced.
	pub fn slug(&mut self, value: &str) -> String {
		let original = slugify(value);
		let mut result = original.clone();

		while self.occurrences.contains_key(&result) {
			let count = self.occurrences.entry(original.clone()).or_insert(0);
			*count += 1;
			result = format!("{original}-{count}");
		}

		self.occurrences.insert(result.clone(), 0);
		result
	}
}

/// Lowercase `value`, drop everything but letters, digits, spaces, `-`, and
/// `_`, then turn spaces into `-`.
///
/// ```rust
/// use contentkit_core::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("snake_case and-dash"), "snake_case-and-dash");
/// ```
pub fn slugify(value: &str) -> String {
	value
		.to_lowercase()
		.chars()
		.filter(|ch| ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_'))
		.map(|ch| if ch == ' ' { '-' } else { ch })
		.collect()
}

/// Adds an `id` to every heading that doesn't already have one.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingSlugPass;

impl HastPass for HeadingSlugPass {
	fn name(&self) -> &'static str {
		"slug"
	}

	fn run(&self, root: &mut Root) {
		let mut slugger = Slugger::new();
		root.for_each_element_mut(&mut |element| {
			if element.is_heading() && !element.has_attr("id") {
				let id = slugger.slug(&element.text_content());
				element.set_attr("id", id);
			}
		});
	}
}
