use anyhow::{Context, Result};
use uuid::Uuid;

/// Download a PDF and extract its plain text. Returns a fresh document id
/// alongside the text; the id is minted here so re-uploading the same URL
/// produces a new, independent document.
pub async fn fetch_document(url: &str) -> Result<(String, String)> {
    let response = reqwest::get(url)
        .await
        .context("Failed to download PDF")?;

    if !response.status().is_success() {
        anyhow::bail!("PDF download failed: {}", response.status());
    }

    let bytes = response
        .bytes()
        .await
        .context("Failed to read PDF body")?;

    let document_id = Uuid::new_v4().to_string();
    let text = extract_text(&bytes)?;

    Ok((document_id, text))
}

/// Extract plain text from PDF bytes.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .context("Failed to extract text from PDF")?;

    if text.trim().is_empty() {
        anyhow::bail!("The document contains no text");
    }

    Ok(text)
}
