use crate::error::ExtractionError;
use lopdf::Document;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    /// Returns all extractable text of the document in page order.
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractionError> {
        let document =
            Document::load(path).map_err(|error| ExtractionError::PdfParse(error.to_string()))?;

        if document.trailer.get(b"Encrypt").is_ok() {
            return Err(ExtractionError::Encrypted(path.display().to_string()));
        }

        let page_numbers = document.get_pages().into_keys().collect::<Vec<_>>();
        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut last_error = None;

        for page_no in &page_numbers {
            match document.extract_text(&[*page_no]) {
                Ok(text) => pages.push(PageText {
                    number: *page_no,
                    text,
                }),
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        page = page_no,
                        error = %error,
                        "skipping page without extractable text"
                    );
                    last_error = Some(error);
                }
            }
        }

        if pages.is_empty() {
            if let Some(error) = last_error {
                return Err(ExtractionError::PdfParse(format!(
                    "no page of {} could be read: {error}",
                    path.display()
                )));
            }
        }

        Ok(pages)
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let pages = self.extract_pages(path)?;
        Ok(pages
            .into_iter()
            .map(|page| page.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
