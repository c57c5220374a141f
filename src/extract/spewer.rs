//! Output of extracted text. A spewer failure fails that document only.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use super::Extraction;
use crate::document::Document;
use crate::engine::tools::{normalize_path, path_relative_to};

pub trait Spewer: Send + Sync {
    fn write(&self, document: &Document, extraction: &Extraction) -> io::Result<()>;
}

/// Mirrors the scanned tree under `output_dir`: `<rel>.txt`, `<rel>.json` (metadata, optional) and
/// `<rel>.embeds/<embed path>.txt` for embedded documents.
pub struct FileSpewer {
    root: PathBuf,
    output_dir: PathBuf,
    write_metadata: bool,
}

impl FileSpewer {
    pub fn new(root: &Path, output_dir: &Path, write_metadata: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            write_metadata,
        }
    }

    /// Output base (without extension) for `document`. Paths outside the root keep their full
    /// path below the output dir, minus root/prefix components.
    pub fn output_base(&self, document: &Document) -> PathBuf {
        let rel = path_relative_to(document.path(), &self.root)
            .unwrap_or_else(|| document.path().to_path_buf());
        let rel: PathBuf = normalize_path(&rel)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        self.output_dir.join(rel)
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Keep embed paths inside their `.embeds` directory.
fn sanitize_embed_path(embed_path: &str) -> PathBuf {
    normalize_path(Path::new(embed_path))
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

impl Spewer for FileSpewer {
    fn write(&self, document: &Document, extraction: &Extraction) -> io::Result<()> {
        let base = self.output_base(document);
        write_file(&with_suffix(&base, ".txt"), extraction.text.as_bytes())?;
        if self.write_metadata {
            let json = serde_json::to_vec_pretty(document.metadata()).map_err(io::Error::other)?;
            write_file(&with_suffix(&base, ".json"), &json)?;
        }
        let embeds_dir = with_suffix(&base, ".embeds");
        for embed in &extraction.embeds {
            let embed_base = embeds_dir.join(sanitize_embed_path(embed.document.embed_path()));
            write_file(&with_suffix(&embed_base, ".txt"), embed.text.as_bytes())?;
            if self.write_metadata {
                let json = serde_json::to_vec_pretty(embed.document.metadata())
                    .map_err(io::Error::other)?;
                write_file(&with_suffix(&embed_base, ".json"), &json)?;
            }
        }
        Ok(())
    }
}

/// Prints extracted text to stdout, one document at a time.
#[derive(Default)]
pub struct StdoutSpewer;

impl Spewer for StdoutSpewer {
    fn write(&self, document: &Document, extraction: &Extraction) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "==> {} <==", document.path().display())?;
        out.write_all(extraction.text.as_bytes())?;
        if !extraction.text.ends_with('\n') {
            writeln!(out)?;
        }
        for embed in &extraction.embeds {
            writeln!(
                out,
                "==> {}!{} <==",
                document.path().display(),
                embed.document.embed_path()
            )?;
            out.write_all(embed.text.as_bytes())?;
            if !embed.text.ends_with('\n') {
                writeln!(out)?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_base_mirrors_relative_path() {
        let spewer = FileSpewer::new(Path::new("/data/in"), Path::new("/data/out"), false);
        let doc = Document::new("/data/in/a/b.txt");
        assert_eq!(spewer.output_base(&doc), PathBuf::from("/data/out/a/b.txt"));
    }

    #[test]
    fn output_base_outside_root_stays_under_output() {
        let spewer = FileSpewer::new(Path::new("/data/in"), Path::new("/data/out"), false);
        let doc = Document::new("/elsewhere/../x.txt");
        assert_eq!(spewer.output_base(&doc), PathBuf::from("/data/out/x.txt"));
    }

    #[test]
    fn embed_path_cannot_escape() {
        assert_eq!(sanitize_embed_path("../../etc/passwd"), PathBuf::from("etc/passwd"));
        assert_eq!(sanitize_embed_path("/a/./b"), PathBuf::from("a/b"));
    }
}
