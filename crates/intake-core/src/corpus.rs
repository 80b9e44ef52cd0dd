//! Markdown corpus splitting for offline ingestion.
//!
//! The reference corpus is a set of Markdown files where every `## Heading`
//! starts one reference chunk. Both indexes are built from the same chunks.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::ReferenceChunk;

/// Split Markdown into one chunk per H2 section.
///
/// Text before the first H2 is dropped. Fails if the document has no H2.
pub fn split_markdown_by_h2(md: &str) -> Result<Vec<ReferenceChunk>> {
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    for line in md.lines() {
        if let Some(title) = h2_title(line) {
            sections.push((title.to_string(), Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }
    if sections.is_empty() {
        bail!("No H2 (##) headings found in Markdown");
    }
    Ok(sections
        .into_iter()
        .enumerate()
        .map(|(i, (title, body))| {
            let id = match slugify(&title) {
                s if s.is_empty() => format!("section-{}", i + 1),
                s => s,
            };
            ReferenceChunk { id, title, text: normalize_body(&body) }
        })
        .collect())
}

fn h2_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim();
    (!title.is_empty()).then_some(title)
}

fn normalize_body(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut blank_run = 0usize;
    for line in lines {
        let line = line.trim_end_matches([' ', '\t']);
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}

/// Lowercase, collapse runs of non-alphanumerics to `-`, trim dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Read every `.md` file under `root` and split it into chunks. Later chunks
/// replace earlier ones with the same id.
pub fn load_corpus(root: &Path) -> Result<Vec<ReferenceChunk>> {
    let files = list_markdown_files(root);
    if files.is_empty() {
        info!(dir = %root.display(), "no .md files found");
        return Ok(vec![]);
    }
    let mut by_id: BTreeMap<String, ReferenceChunk> = BTreeMap::new();
    for (file_index, file_path) in files.iter().enumerate() {
        debug!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
        let content = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(file_path)?).to_string(),
        };
        for chunk in split_markdown_by_h2(&content)? {
            by_id.insert(chunk.id.clone(), chunk);
        }
    }
    info!(files = files.len(), chunks = by_id.len(), "corpus loaded");
    Ok(by_id.into_values().collect())
}

fn list_markdown_files(root: &Path) -> Vec<PathBuf> {
    let mut md_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("md"))
        .map(|e| e.path().to_path_buf())
        .collect();
    md_files.sort();
    md_files
}
