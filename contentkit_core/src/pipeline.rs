use markdown::Constructs;
use markdown::ParseOptions;
use markdown::mdast::Node;
use markdown::to_mdast;

use crate::ContentError;
use crate::ContentResult;
use crate::MarkdownConfig;
use crate::RehypePlugin;
use crate::autolink::AutolinkHeadingsPass;
use crate::hast::Root;
use crate::heading_slug::HeadingSlugPass;
use crate::pretty_code::Highlighter;
use crate::pretty_code::PrettyCodePass;
use crate::schema::ContentType;
use crate::to_hast::mdast_to_hast;

/// A transformation applied to the HTML tree of a document body.
pub trait HastPass: Send + Sync {
	/// The plugin name used in configuration and logs.
	fn name(&self) -> &'static str;
	fn run(&self, root: &mut Root);
}

/// The configured markdown pipeline: parse options plus an ordered list of
/// tree passes.
pub struct Pipeline {
	gfm: bool,
	passes: Vec<Box<dyn HastPass>>,
}

impl Pipeline {
	/// Build the pipeline, running passes in the order `rehype_plugins` lists
	/// them.
	pub fn from_config(config: &MarkdownConfig) -> Self {
		let passes = config
			.rehype_plugins
			.iter()
			.map(|plugin| -> Box<dyn HastPass> {
				match plugin {
					RehypePlugin::Slug => Box::new(HeadingSlugPass),
					RehypePlugin::PrettyCode => Box::new(PrettyCodePass::new(&config.pretty_code)),
					RehypePlugin::AutolinkHeadings => {
						Box::new(AutolinkHeadingsPass::new(config.autolink_headings.clone()))
					}
				}
			})
			.collect();

		Self {
			gfm: config.gfm(),
			passes,
		}
	}

	/// Like [`Pipeline::from_config`] but with a custom highlighter for the
	/// pretty-code pass.
	pub fn with_highlighter(
		config: &MarkdownConfig,
		highlighter: impl Highlighter + Clone + 'static,
	) -> Self {
		let mut pipeline = Self::from_config(config);
		pipeline.passes = config
			.rehype_plugins
			.iter()
			.zip(pipeline.passes)
			.map(|(plugin, pass)| -> Box<dyn HastPass> {
				if *plugin == RehypePlugin::PrettyCode {
					Box::new(
						PrettyCodePass::new(&config.pretty_code)
							.with_highlighter(Box::new(highlighter.clone())),
					)
				} else {
					pass
				}
			})
			.collect();
		pipeline
	}

	/// Append a pass that runs after the configured ones.
	pub fn push_pass(&mut self, pass: Box<dyn HastPass>) {
		self.passes.push(pass);
	}

	/// Names of the passes in execution order.
	pub fn pass_names(&self) -> Vec<&'static str> {
		self.passes.iter().map(|pass| pass.name()).collect()
	}

	pub fn parse_options(&self, content_type: ContentType) -> ParseOptions {
		let mut constructs = match content_type {
			ContentType::Mdx => Constructs::mdx(),
			ContentType::Markdown | ContentType::Data => Constructs::default(),
		};
		constructs.frontmatter = true;

		if self.gfm {
			constructs.gfm_autolink_literal = true;
			constructs.gfm_footnote_definition = true;
			constructs.gfm_label_start_footnote = true;
			constructs.gfm_strikethrough = true;
			constructs.gfm_table = true;
			constructs.gfm_task_list_item = true;
		}

		ParseOptions {
			constructs,
			..ParseOptions::default()
		}
	}

	/// Parse `source` into a markdown syntax tree.
	pub fn parse(&self, source: &str, content_type: ContentType, path_display: &str) -> ContentResult<Node> {
		to_mdast(source, &self.parse_options(content_type)).map_err(|e| {
			ContentError::Markdown {
				path: path_display.to_string(),
				reason: e.to_string(),
			}
		})
	}

	/// Convert a parsed tree to HTML, running every pass in order.
	pub fn render(&self, mdast: &Node, content_type: ContentType) -> String {
		let mut root = mdast_to_hast(mdast, content_type == ContentType::Markdown);

		for pass in &self.passes {
			tracing::trace!(pass = pass.name(), "running pass");
			pass.run(&mut root);
		}

		root.to_html()
	}

	/// Parse and render in one step.
	pub fn render_source(
		&self,
		source: &str,
		content_type: ContentType,
		path_display: &str,
	) -> ContentResult<String> {
		let mdast = self.parse(source, content_type, path_display)?;
		Ok(self.render(&mdast, content_type))
	}
}

impl Default for Pipeline {
	fn default() -> Self {
		Self::from_config(&MarkdownConfig::default())
	}
}
