use comrak::{
    Arena, Options,
    nodes::{AstNode, NodeValue},
    parse_document,
};
use regex::Regex;
use std::sync::LazyLock;

/// Document syntax tree reduced to the element kinds the link graph cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// ATX or setext heading.
    Heading {
        /// Heading depth (1 for `#`).
        level: u8,
        /// Inline content.
        children: Vec<SyntaxNode>,
    },
    /// Inline link (`[text](url)` or a resolved reference link).
    Link {
        /// Raw destination.
        url: String,
        /// Link text.
        children: Vec<SyntaxNode>,
    },
    /// Link reference definition (`[label]: url`).
    Definition {
        /// Raw destination.
        url: String,
    },
    /// Wiki-style link (`[[target]]` / `[[target|title]]`).
    WikiLink {
        /// Permalink target (text before the pipe).
        target: String,
    },
    /// Leading YAML front matter block.
    Frontmatter {
        /// Raw block including delimiters.
        raw: String,
    },
    /// Literal text (plain text, inline code, line breaks).
    Text {
        /// Text value.
        value: String,
    },
    /// Any other container or leaf.
    Generic {
        /// Child elements (empty for leaves such as code blocks).
        children: Vec<SyntaxNode>,
    },
}

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static DEFINITION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^ {0,3}\[([^\]]+)\]:[ \t]*(<[^>]*>|\S+)"));

fn convert<'a>(node: &'a AstNode<'a>) -> SyntaxNode {
    let children = || node.children().map(convert).collect::<Vec<_>>();
    match &node.data.borrow().value {
        NodeValue::Heading(heading) => SyntaxNode::Heading {
            level: heading.level,
            children: children(),
        },
        NodeValue::Link(link) => SyntaxNode::Link {
            url: link.url.to_string(),
            children: children(),
        },
        NodeValue::WikiLink(link) => SyntaxNode::WikiLink {
            target: link.url.to_string(),
        },
        NodeValue::FrontMatter(raw) => SyntaxNode::Frontmatter {
            raw: raw.to_string(),
        },
        NodeValue::Text(value) => SyntaxNode::Text {
            value: value.to_string(),
        },
        NodeValue::Code(code) => SyntaxNode::Text {
            value: code.literal.to_string(),
        },
        NodeValue::SoftBreak | NodeValue::LineBreak => SyntaxNode::Text {
            value: " ".to_string(),
        },
        NodeValue::CodeBlock(_) | NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) => {
            SyntaxNode::Generic {
                children: Vec::new(),
            }
        }
        _ => SyntaxNode::Generic {
            children: children(),
        },
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn is_atx_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes)
        && trimmed[hashes..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
}

/// Reference definitions are consumed by comrak; recover them from the source.
///
/// A definition cannot interrupt a paragraph, so a `[x]: y` line directly
/// below paragraph text is ignored.
fn reference_definitions(content: &str) -> Vec<SyntaxNode> {
    let mut out = Vec::new();
    let mut in_fence = false;
    let mut in_paragraph = false;
    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            in_paragraph = false;
            continue;
        }
        if in_fence {
            continue;
        }
        if line.trim().is_empty() {
            in_paragraph = false;
            continue;
        }
        if !in_paragraph
            && let Some(caps) = DEFINITION_REGEX.captures(line)
            && let Some(url) = caps.get(2)
        {
            out.push(SyntaxNode::Definition {
                url: url.as_str().to_string(),
            });
            continue;
        }
        in_paragraph = !is_atx_heading(line);
    }
    out
}

/// Parse markdown content into a [`SyntaxNode`] tree rooted at a `Generic` node.
#[must_use]
pub fn parse_syntax(content: &str) -> SyntaxNode {
    let mut options = Options::default();
    options.extension.front_matter_delimiter = Some("---".to_string());
    // Obsidian-style `[[url|title]]`.
    options.extension.wikilinks_title_after_pipe = true;

    let arena = Arena::new();
    let root = parse_document(&arena, content, &options);
    let mut children: Vec<SyntaxNode> = root.children().map(convert).collect();
    children.extend(reference_definitions(content));
    SyntaxNode::Generic { children }
}

impl SyntaxNode {
    /// Direct children (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            Self::Heading { children, .. }
            | Self::Link { children, .. }
            | Self::Generic { children } => children,
            Self::Definition { .. }
            | Self::WikiLink { .. }
            | Self::Frontmatter { .. }
            | Self::Text { .. } => &[],
        }
    }

    /// Concatenated literal text below this node.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Self::Text { value } => out.push_str(value),
            Self::WikiLink { target } => out.push_str(target),
            _ => {
                for child in self.children() {
                    child.push_text(out);
                }
            }
        }
    }

    /// Title: text of the first child of the first top-level level-1 heading.
    #[must_use]
    pub fn find_title(&self) -> Option<String> {
        let first_child = self.children().iter().find_map(|child| match child {
            Self::Heading { level: 1, children } => children.first(),
            _ => None,
        })?;
        let title = first_child.text_content().trim().to_string();
        if title.is_empty() { None } else { Some(title) }
    }

    /// Raw link targets in depth-first document order (duplicates kept).
    #[must_use]
    pub fn find_links(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_links(&mut out);
        out
    }

    fn collect_links(&self, out: &mut Vec<String>) {
        match self {
            Self::Link { url, .. } | Self::Definition { url } => out.push(url.clone()),
            Self::WikiLink { target } => out.push(target.clone()),
            _ => {
                for child in self.children() {
                    child.collect_links(out);
                }
            }
        }
    }
}
