//! Info command implementation

use anyhow::{bail, Result};
use folio_core::extract;
use folio_core::types::{ContentInsights, MetadataFields};
use serde::Serialize;
use std::path::Path;

/// Book info output
#[derive(Serialize)]
pub(crate) struct FieldsReport {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub genre: Option<String>,
    /// Size of the cover image in bytes
    pub cover: Option<usize>,
}

impl From<&MetadataFields> for FieldsReport {
    fn from(fields: &MetadataFields) -> Self {
        Self {
            title: fields.title.clone(),
            authors: fields.authors.clone(),
            identifier: fields.identifier.as_ref().map(|i| i.to_string()),
            language: fields.language.clone(),
            publisher: fields.publisher.clone(),
            publication_date: fields.publication_date.clone(),
            tags: fields.tags.clone(),
            summary: fields.summary.clone(),
            genre: fields.genre.clone(),
            cover: fields.cover.as_ref().map(Vec::len),
        }
    }
}

#[derive(Serialize)]
struct InfoReport<'a> {
    file: &'a str,
    metadata: FieldsReport,
    content: &'a ContentInsights,
}

/// Display the metadata stored in an EPUB file
pub fn info(input: &str, json: bool) -> Result<()> {
    let record = extract(Path::new(input));
    if !record.note.is_empty() {
        bail!("{}: {}", input, record.note);
    }

    let report = InfoReport {
        file: &record.filename,
        metadata: FieldsReport::from(&record.original),
        content: &record.content,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_fields(&report.metadata);
        let content = report.content;
        if let Some(genre) = &content.genre {
            println!("Text genre:  {}", genre);
        }
        if let Some(analysis) = &content.analysis {
            println!(
                "Documents:   {} (~{} pages, {:?})",
                analysis.total_documents, analysis.estimated_pages, analysis.content_type
            );
        }
    }

    Ok(())
}

pub(crate) fn print_fields(fields: &FieldsReport) {
    println!("Title:       {}", fields.title.as_deref().unwrap_or("-"));
    if !fields.authors.is_empty() {
        println!("Authors:     {}", fields.authors.join(", "));
    }
    if let Some(identifier) = &fields.identifier {
        println!("ISBN:        {}", identifier);
    }
    println!("Language:    {}", fields.language.as_deref().unwrap_or("-"));
    if let Some(publisher) = &fields.publisher {
        println!("Publisher:   {}", publisher);
    }
    if let Some(date) = &fields.publication_date {
        println!("Date:        {}", date);
    }
    if !fields.tags.is_empty() {
        println!("Tags:        {}", fields.tags.join(", "));
    }
    if let Some(genre) = &fields.genre {
        println!("Genre:       {}", genre);
    }
    if let Some(summary) = &fields.summary {
        println!("Summary:     {}", summary);
    }
    match fields.cover {
        Some(size) => println!("Cover:       {} bytes", size),
        None => println!("Cover:       none"),
    }
}
