use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use tracing::{error, info};

use crate::extraction::{ExtractedText, ExtractionError, ExtractionMethod};

/// Paragraph and table text of a DOCX body, in document order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocumentModel {
    pub paragraphs: Vec<String>,
    /// table → row → cell text
    pub tables: Vec<Vec<Vec<String>>>,
}

pub fn read_document_model(bytes: &[u8]) -> Result<DocumentModel, ExtractionError> {
    let docx = read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut model = DocumentModel::default();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => model.paragraphs.push(paragraph_text(p)),
            DocumentChild::Table(t) => model.tables.push(table_cells(t)),
            _ => {}
        }
    }
    Ok(model)
}

/// Non-blank paragraphs first, then non-blank table rows (cells joined by a space).
pub fn flatten(model: &DocumentModel) -> String {
    let mut parts: Vec<String> = model
        .paragraphs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .cloned()
        .collect();

    for table in &model.tables {
        for row in table {
            let row_text = row
                .iter()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !row_text.is_empty() {
                parts.push(row_text);
            }
        }
    }

    parts.join("\n")
}

/// Parse failures yield empty text.
pub fn extract(bytes: &[u8]) -> ExtractedText {
    info!("Starting DOCX text extraction");
    let text = match read_document_model(bytes) {
        Ok(model) => flatten(&model),
        Err(e) => {
            error!("DOCX extraction failed: {e}");
            String::new()
        }
    };
    info!(chars = text.chars().count(), "Finished DOCX extraction");
    ExtractedText::new(text, ExtractionMethod::Docx)
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&paragraph.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_children(&link.children, out),
            _ => {}
        }
    }
}

fn table_cells(table: &Table) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            let paragraphs: Vec<String> = cell
                .children
                .iter()
                .filter_map(|content| match content {
                    TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                    _ => None,
                })
                .collect();
            cells.push(paragraphs.join("\n"));
        }
        rows.push(cells);
    }
    rows
}
