//! Prompt library for the text and vision services
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tripledger/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Each prompt file starts with YAML frontmatter followed by `# System` and
//! `# User` sections. The user section is rendered with `{{var}}` replacement
//! and `{{#if var}}...{{/if}}` blocks.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const GENERATE_SCHEMA: &str = include_str!("../../../prompts/generate_schema.md");
    pub const GENERATE_CONTENT: &str = include_str!("../../../prompts/generate_content.md");
    pub const DESCRIBE_RECEIPT: &str = include_str!("../../../prompts/describe_receipt.md");
    pub const EXTRACT_RECEIPT: &str = include_str!("../../../prompts/extract_receipt.md");
    pub const READ_ODOMETER: &str = include_str!("../../../prompts/read_odometer.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Template analysis → required/dynamic field schema (JSON)
    GenerateSchema,
    /// Short prose for one group of dynamic template fields (JSON)
    GenerateContent,
    /// One or two sentence expense description (plain text)
    DescribeReceipt,
    /// Vision: receipt image → receipt JSON
    ExtractReceipt,
    /// Vision: odometer photo → reading JSON
    ReadOdometer,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateSchema => "generate_schema",
            Self::GenerateContent => "generate_content",
            Self::DescribeReceipt => "describe_receipt",
            Self::ExtractReceipt => "extract_receipt",
            Self::ReadOdometer => "read_odometer",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[
            Self::GenerateSchema,
            Self::GenerateContent,
            Self::DescribeReceipt,
            Self::ExtractReceipt,
            Self::ReadOdometer,
        ]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::GenerateSchema => defaults::GENERATE_SCHEMA,
            Self::GenerateContent => defaults::GENERATE_CONTENT,
            Self::DescribeReceipt => defaults::DESCRIBE_RECEIPT,
            Self::ExtractReceipt => defaults::EXTRACT_RECEIPT,
            Self::ReadOdometer => defaults::READ_ODOMETER,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Bumped whenever the wording changes
    pub version: u32,
    /// `text` or `vision`
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Body after the frontmatter (system + user sections)
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the user section (or the whole body when it has no sections)
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let template = self.user_section().unwrap_or(&self.content);
        let with_blocks = resolve_conditionals(template, vars);
        vars.iter().fold(with_blocks, |acc, (key, value)| {
            acc.replace(&format!("{{{{{}}}}}", key), value)
        })
    }
}

/// A rendered system/user pair ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Embedded defaults only, never touching the filesystem
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("prompt {}", id.as_str())))
    }

    /// Load and render in one step
    pub fn render(&mut self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<RenderedPrompt> {
        let prompt = self.get(id)?;
        Ok(RenderedPrompt {
            system: prompt.system_section().map(str::to_string),
            user: prompt.render_user(vars),
        })
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|d| d.join(format!("{}.md", id.as_str())).exists())
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tripledger").join("prompts").join("overrides"))
}

/// Split a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

/// Keep `{{#if var}}` blocks whose variable is non-empty, drop the rest
fn resolve_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_end) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_end].trim().to_string();
        let block_start = var_start + var_end + 2;
        let Some(endif_pos) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_content = result[block_start..block_start + endif_pos].to_string();
        let full_end = block_start + endif_pos + 7;

        let keep = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());
        let replacement = if keep { block_content.as_str() } else { "" };
        result = format!("{}{}{}", &result[..if_start], replacement, &result[full_end..]);
    }

    result
}
