use crate::error::OrganizeError;
use crate::models::Document;
use lopdf::Document as PdfDocument;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, OrganizeError>;
}

/// Reads the text layer of the first `page_limit` pages with lopdf.
#[derive(Debug, Clone, Copy)]
pub struct LopdfExtractor {
    pub page_limit: usize,
}

impl Default for LopdfExtractor {
    fn default() -> Self {
        Self { page_limit: 2 }
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, OrganizeError> {
        let document = PdfDocument::load(path).map_err(|error| OrganizeError::Extraction {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages().into_iter().take(self.page_limit) {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| OrganizeError::Extraction {
                    path: path.to_path_buf(),
                    reason: format!("page {page_no}: {error}"),
                })?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        Ok(pages)
    }
}

/// Extracts a PDF into a [`Document`], failing when no page has readable text.
pub fn extract_document<E>(extractor: &E, path: &Path) -> Result<Document, OrganizeError>
where
    E: PdfExtractor + ?Sized,
{
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| OrganizeError::MissingFileName(path.display().to_string()))?;

    let pages = extractor.extract_pages(path)?;
    let text = pages
        .iter()
        .map(|page| page.text.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return Err(OrganizeError::Extraction {
            path: path.to_path_buf(),
            reason: "pdf had no readable page text".to_string(),
        });
    }

    Ok(Document {
        path: path.to_path_buf(),
        file_name,
        text,
    })
}
