//! Document model and source-tree discovery
//!
//! Parsing of rich formats (PDF, DOCX, HTML) is an external collaborator's
//! concern; discovery here handles plain text and markdown so the ingest
//! pipeline is exercisable end to end. A document is an ordered list of
//! sections, each with a heading, a text body, and a location label used in
//! citations and chunk identity.

use crate::error::{DocragError, Result};
use std::path::Path;
use walkdir::WalkDir;

/// One addressable span of a document
#[derive(Debug, Clone)]
pub struct Section {
    pub heading: String,
    pub text: String,
    /// Location label, e.g. "md:3" or "text:1"
    pub loc: String,
}

/// A loaded document, the chunker's input
#[derive(Debug, Clone)]
pub struct Document {
    pub doc_id: String,
    pub source_path: String,
    pub title: String,
    pub version: String,
    pub sections: Vec<Section>,
}

/// Walk the source tree and load every supported file
///
/// A missing root is a configuration problem handled by the caller; here it
/// simply yields no documents. Files with unsupported extensions are skipped.
pub fn discover_documents(root: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| DocragError::Io {
            source: e.into(),
            context: format!("Failed to walk source tree: {:?}", root),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("md") => documents.push(load_markdown(path)?),
            Some("txt") => documents.push(load_text(path)?),
            _ => continue,
        }
    }

    Ok(documents)
}

fn doc_id_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| DocragError::Io {
        source: e,
        context: format!("Failed to read source file: {:?}", path),
    })
}

/// A plain-text file becomes a single-section document
fn load_text(path: &Path) -> Result<Document> {
    let text = read_file(path)?;
    let doc_id = doc_id_for(path);

    Ok(Document {
        title: doc_id.clone(),
        doc_id,
        source_path: path.display().to_string(),
        version: "unknown".to_string(),
        sections: vec![Section {
            heading: "Body".to_string(),
            text,
            loc: "text:1".to_string(),
        }],
    })
}

/// Markdown splits into one section per heading; leading prose before the
/// first heading becomes an "Intro" section
fn load_markdown(path: &Path) -> Result<Document> {
    let content = read_file(path)?;
    let doc_id = doc_id_for(path);

    let mut sections = Vec::new();
    let mut heading = "Intro".to_string();
    let mut buffer: Vec<&str> = Vec::new();
    let mut section_idx = 0usize;

    let mut flush = |heading: &str, buffer: &mut Vec<&str>, idx: &mut usize| {
        let text = buffer.join(" ").trim().to_string();
        buffer.clear();
        if !text.is_empty() {
            *idx += 1;
            sections.push(Section {
                heading: heading.to_string(),
                text,
                loc: format!("md:{}", idx),
            });
        }
    };

    for line in content.lines() {
        if let Some(stripped) = line.strip_prefix('#') {
            flush(&heading, &mut buffer, &mut section_idx);
            heading = stripped.trim_start_matches('#').trim().to_string();
        } else if !line.trim().is_empty() {
            buffer.push(line.trim());
        }
    }
    flush(&heading, &mut buffer, &mut section_idx);

    Ok(Document {
        title: doc_id.clone(),
        doc_id,
        source_path: path.display().to_string(),
        version: "unknown".to_string(),
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_skips_unsupported_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "plain body").unwrap();
        std::fs::write(temp.path().join("b.bin"), [0u8, 1, 2]).unwrap();

        let docs = discover_documents(temp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].doc_id, "a");
        assert_eq!(docs[0].sections.len(), 1);
        assert_eq!(docs[0].sections[0].loc, "text:1");
    }

    #[test]
    fn test_markdown_splits_on_headings() {
        let temp = TempDir::new().unwrap();
        let content = "intro prose\n\n# First\nalpha line\nbeta line\n\n## Second\ngamma\n";
        std::fs::write(temp.path().join("doc.md"), content).unwrap();

        let docs = discover_documents(temp.path()).unwrap();
        let sections = &docs[0].sections;

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, "Intro");
        assert_eq!(sections[1].heading, "First");
        assert_eq!(sections[1].text, "alpha line beta line");
        assert_eq!(sections[2].loc, "md:3");
    }

    #[test]
    fn test_discovery_order_is_stable() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("zeta.txt"), "z").unwrap();
        std::fs::write(temp.path().join("alpha.txt"), "a").unwrap();

        let docs = discover_documents(temp.path()).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, ["alpha", "zeta"]);
    }
}
