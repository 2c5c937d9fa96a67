//! Code block decoration.
//!
//! Every `pre > code` block becomes a `figure` whose `code` element holds one
//! `span[data-line]` per source line. Token colouring is delegated to a
//! [`Highlighter`] and the line/word hooks to a [`LineDecorator`].

use std::ops::Range;
use std::ops::RangeInclusive;

use crate::PrettyCodeConfig;
use crate::hast::Element;
use crate::hast::HNode;
use crate::hast::Root;
use crate::pipeline::HastPass;

/// Language recorded when a code block has no `language-*` class.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// Options parsed from a fenced code block's meta string, e.g.
/// `` ```rust title="main.rs" {1,3-5} /answer/ showLineNumbers ``.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMeta {
	pub title: Option<String>,
	pub caption: Option<String>,
	/// One-based inclusive line ranges.
	pub highlighted_lines: Vec<RangeInclusive<usize>>,
	pub highlighted_words: Vec<String>,
	pub show_line_numbers: bool,
}

impl CodeMeta {
	pub fn parse(meta: &str) -> Self {
		let mut parsed = Self::default();
		let chars: Vec<char> = meta.chars().collect();
		let mut index = 0;

		while index < chars.len() {
			match chars[index] {
				'{' => {
					let Some(end) = find_char(&chars, index + 1, '}') else {
						break;
					};
					let ranges: String = chars[index + 1..end].iter().collect();
					parsed.highlighted_lines.extend(parse_line_ranges(&ranges));
					index = end + 1;
				}
				'/' => {
					let Some(end) = find_char(&chars, index + 1, '/') else {
						break;
					};
					let word: String = chars[index + 1..end].iter().collect();
					if !word.is_empty() {
						parsed.highlighted_words.push(word);
					}
					index = end + 1;
				}
				ch if ch.is_whitespace() => index += 1,
				_ => {
					let start = index;
					while index < chars.len() && !chars[index].is_whitespace() && chars[index] != '=' {
						index += 1;
					}
					let key: String = chars[start..index].iter().collect();

					let value = if chars.get(index) == Some(&'=') {
						index += 1;
						match chars.get(index).copied() {
							Some(quote @ ('"' | '\'')) => {
								let end = find_char(&chars, index + 1, quote).unwrap_or(chars.len());
								let value: String = chars[index + 1..end].iter().collect();
								index = end + 1;
								Some(value)
							}
							_ => {
								let value_start = index;
								while index < chars.len() && !chars[index].is_whitespace() {
									index += 1;
								}
								Some(chars[value_start..index].iter().collect())
							}
						}
					} else {
						None
					};

					match (key.as_str(), value) {
						("title", Some(value)) => parsed.title = Some(value),
						("caption", Some(value)) => parsed.caption = Some(value),
						("showLineNumbers", None) => parsed.show_line_numbers = true,
						_ => {}
					}
				}
			}
		}

		parsed
	}

	pub fn is_line_highlighted(&self, line: usize) -> bool {
		self.highlighted_lines
			.iter()
			.any(|range| range.contains(&line))
	}
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
	chars
		.iter()
		.skip(from)
		.position(|ch| *ch == target)
		.map(|offset| from + offset)
}

/// Parse `1,3-5` into line ranges. Malformed and reversed entries are
/// skipped.
fn parse_line_ranges(value: &str) -> Vec<RangeInclusive<usize>> {
	let mut ranges = Vec::new();

	for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
		match part.split_once('-') {
			Some((start, end)) => {
				if let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
					if start <= end {
						ranges.push(start..=end);
					}
				}
			}
			None => {
				if let Ok(line) = part.parse::<usize>() {
					ranges.push(line..=line);
				}
			}
		}
	}

	ranges
}

/// A run of source text with an optional inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub content: String,
	pub style: Option<String>,
}

/// Splits a line of source into styled tokens. The tokens must concatenate
/// back to the line.
pub trait Highlighter: Send + Sync {
	fn tokenize(&self, language: &str, line: &str) -> Vec<Token>;
}

/// Emits each line as one unstyled token.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
	fn tokenize(&self, _language: &str, line: &str) -> Vec<Token> {
		if line.is_empty() {
			return Vec::new();
		}

		vec![Token {
			content: line.to_string(),
			style: None,
		}]
	}
}

/// Hooks called while code lines are built.
pub trait LineDecorator: Send + Sync {
	/// Called for every line.
	fn on_visit_line(&self, line: &mut Element);
	/// Called for lines selected with `{...}` in the meta string.
	fn on_visit_highlighted_line(&self, line: &mut Element);
	/// Called for each `/word/` match.
	fn on_visit_highlighted_word(&self, word: &mut Element);
}

/// The default decorator:
///
/// - an empty line gets a placeholder text child so it keeps its height;
/// - a highlighted line gets the highlighted-line class appended;
/// - a highlighted word's classes are replaced by the highlighted-word
///   class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLineDecorator {
	pub empty_line_placeholder: String,
	pub highlighted_line_class: String,
	pub highlighted_word_class: String,
}

impl ClassLineDecorator {
	pub fn from_config(config: &PrettyCodeConfig) -> Self {
		Self {
			empty_line_placeholder: config.empty_line_placeholder.clone(),
			highlighted_line_class: config.highlighted_line_class.clone(),
			highlighted_word_class: config.highlighted_word_class.clone(),
		}
	}
}

impl Default for ClassLineDecorator {
	fn default() -> Self {
		Self::from_config(&PrettyCodeConfig::default())
	}
}

impl LineDecorator for ClassLineDecorator {
	fn on_visit_line(&self, line: &mut Element) {
		if line.children.is_empty() {
			line.children = vec![HNode::text(self.empty_line_placeholder.clone())];
		}
	}

	fn on_visit_highlighted_line(&self, line: &mut Element) {
		line.class_name.push(self.highlighted_line_class.clone());
	}

	fn on_visit_highlighted_word(&self, word: &mut Element) {
		word.class_name = vec![self.highlighted_word_class.clone()];
	}
}

/// Rewrites code blocks into decorated line-per-span figures.
pub struct PrettyCodePass {
	theme: String,
	highlighter: Box<dyn Highlighter>,
	decorator: Box<dyn LineDecorator>,
}

impl PrettyCodePass {
	pub fn new(config: &PrettyCodeConfig) -> Self {
		Self {
			theme: config.theme.clone(),
			highlighter: Box::new(PlainHighlighter),
			decorator: Box::new(ClassLineDecorator::from_config(config)),
		}
	}

	#[must_use]
	pub fn with_highlighter(mut self, highlighter: Box<dyn Highlighter>) -> Self {
		self.highlighter = highlighter;
		self
	}

	#[must_use]
	pub fn with_decorator(mut self, decorator: Box<dyn LineDecorator>) -> Self {
		self.decorator = decorator;
		self
	}

	fn decorate_blocks(&self, nodes: &mut [HNode]) {
		for node in nodes {
			let HNode::Element(element) = node else {
				continue;
			};

			if element.tag == "pre" {
				let figure = element
					.children
					.iter()
					.filter_map(HNode::as_element)
					.find(|child| child.tag == "code")
					.map(|code| self.figure(code));
				if let Some(figure) = figure {
					*node = figure;
					continue;
				}
			}

			self.decorate_blocks(&mut element.children);
		}
	}

	fn figure(&self, code: &Element) -> HNode {
		let language = code
			.class_name
			.iter()
			.find_map(|class| class.strip_prefix("language-"))
			.filter(|language| !language.is_empty())
			.unwrap_or(DEFAULT_LANGUAGE)
			.to_string();
		let meta = CodeMeta::parse(code.meta.as_deref().unwrap_or_default());

		let text = code.text_content();
		let text = text.strip_suffix('\n').unwrap_or(&text);

		let mut lines = Vec::new();
		for (index, line) in text.split('\n').enumerate() {
			if index > 0 {
				lines.push(HNode::text("\n"));
			}
			lines.push(self.line(&language, line, index + 1, &meta));
		}

		let mut code_element = Element::new("code")
			.with_attr("data-language", language.clone())
			.with_attr("data-theme", self.theme.clone())
			.with_attr("style", "display: grid;");
		if meta.show_line_numbers {
			let line_count = text.split('\n').count();
			code_element.set_attr("data-line-numbers", "");
			code_element.set_attr(
				"data-line-numbers-max-digits",
				line_count.to_string().len().to_string(),
			);
		}
		let code_element = code_element.with_children(lines);

		let pre = Element::new("pre")
			.with_attr("tabindex", "0")
			.with_attr("data-language", language.clone())
			.with_attr("data-theme", self.theme.clone())
			.with_children(vec![code_element.into_node()]);

		let mut children = Vec::new();
		if let Some(title) = &meta.title {
			children.push(
				Element::new("figcaption")
					.with_attr("data-rehype-pretty-code-title", "")
					.with_attr("data-language", language.clone())
					.with_attr("data-theme", self.theme.clone())
					.with_children(vec![HNode::text(title.clone())])
					.into_node(),
			);
		}
		children.push(pre.into_node());
		if let Some(caption) = &meta.caption {
			children.push(
				Element::new("figcaption")
					.with_attr("data-rehype-pretty-code-caption", "")
					.with_children(vec![HNode::text(caption.clone())])
					.into_node(),
			);
		}

		Element::new("figure")
			.with_attr("data-rehype-pretty-code-figure", "")
			.with_children(children)
			.into_node()
	}

	fn line(&self, language: &str, source: &str, number: usize, meta: &CodeMeta) -> HNode {
		let tokens = self.highlighter.tokenize(language, source);
		let words = word_ranges(source, &meta.highlighted_words);

		let mut line = Element::new("span")
			.with_attr("data-line", "")
			.with_children(self.line_children(tokens, &words));

		self.decorator.on_visit_line(&mut line);
		if meta.is_line_highlighted(number) {
			line.set_attr("data-highlighted-line", "");
			self.decorator.on_visit_highlighted_line(&mut line);
		}

		line.into_node()
	}

	/// Build a line's token spans, grouping the parts that fall inside a
	/// highlighted word into `span[data-highlighted-chars]`.
	fn line_children(&self, tokens: Vec<Token>, words: &[Range<usize>]) -> Vec<HNode> {
		let mut children = Vec::new();
		let mut current_word: Option<(usize, Element)> = None;
		let mut offset = 0;

		for token in tokens {
			let token_start = offset;
			let token_end = offset + token.content.len();
			offset = token_end;

			let mut cursor = token_start;
			while cursor < token_end {
				let word_index = words
					.iter()
					.position(|range| range.start <= cursor && cursor < range.end);
				let piece_end = match word_index {
					Some(index) => words[index].end.min(token_end),
					None => words
						.iter()
						.map(|range| range.start)
						.filter(|start| *start > cursor)
						.min()
						.unwrap_or(token_end)
						.min(token_end),
				};

				let Some(content) = token
					.content
					.get(cursor - token_start..piece_end - token_start)
				else {
					self.flush_word(&mut current_word, &mut children);
					children.push(token_node(&token.content, token.style.as_deref()));
					break;
				};
				let piece = token_node(content, token.style.as_deref());

				match word_index {
					Some(index) => {
						if current_word.as_ref().map(|(active, _)| *active) != Some(index) {
							self.flush_word(&mut current_word, &mut children);
							current_word =
								Some((index, Element::new("span").with_attr("data-highlighted-chars", "")));
						}
						if let Some((_, word)) = current_word.as_mut() {
							word.children.push(piece);
						}
					}
					None => {
						self.flush_word(&mut current_word, &mut children);
						children.push(piece);
					}
				}

				cursor = piece_end;
			}
		}

		self.flush_word(&mut current_word, &mut children);
		children
	}

	fn flush_word(&self, current_word: &mut Option<(usize, Element)>, children: &mut Vec<HNode>) {
		if let Some((_, mut word)) = current_word.take() {
			self.decorator.on_visit_highlighted_word(&mut word);
			children.push(word.into_node());
		}
	}
}

fn token_node(content: &str, style: Option<&str>) -> HNode {
	let mut span = Element::new("span");
	if let Some(style) = style {
		span.set_attr("style", style);
	}
	span.with_children(vec![HNode::text(content)]).into_node()
}

/// Byte ranges of every occurrence of each word, sorted and without
/// overlaps.
fn word_ranges(line: &str, words: &[String]) -> Vec<Range<usize>> {
	let mut ranges: Vec<Range<usize>> = words
		.iter()
		.filter(|word| !word.is_empty())
		.flat_map(|word| {
			line.match_indices(word.as_str())
				.map(|(start, matched)| start..start + matched.len())
		})
		.collect();
	ranges.sort_by_key(|range| (range.start, std::cmp::Reverse(range.end)));

	let mut result: Vec<Range<usize>> = Vec::new();
	for range in ranges {
		if result.last().is_none_or(|last| range.start >= last.end) {
			result.push(range);
		}
	}

	result
}

impl HastPass for PrettyCodePass {
	fn name(&self) -> &'static str {
		"pretty-code"
	}

	fn run(&self, root: &mut Root) {
		self.decorate_blocks(&mut root.children);
	}
}
