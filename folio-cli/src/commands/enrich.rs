//! Enrich command implementation

use super::info::{print_fields, FieldsReport};
use super::Options;
use anyhow::{bail, Context, Result};
use folio_core::types::CandidateEdition;
use serde::Serialize;

#[derive(Serialize)]
struct EnrichReport<'a> {
    file: &'a str,
    note: &'a str,
    original: FieldsReport,
    suggested: Option<FieldsReport>,
    editions: Vec<EditionSummary<'a>>,
    applied: bool,
}

/// Search candidate without its raw catalog document
#[derive(Serialize)]
struct EditionSummary<'a> {
    title: Option<&'a str>,
    authors: &'a [String],
    first_publish_year: Option<i32>,
    isbn: Option<String>,
}

impl<'a> From<&'a CandidateEdition> for EditionSummary<'a> {
    fn from(edition: &'a CandidateEdition) -> Self {
        Self {
            title: edition.title.as_deref(),
            authors: &edition.authors,
            first_publish_year: edition.first_publish_year,
            isbn: edition.first_valid_isbn().map(|i| i.to_string()),
        }
    }
}

/// Fetch suggestions for one file, optionally writing them back
pub fn enrich(input: &str, options: &Options, apply: bool, rename: bool, json: bool) -> Result<()> {
    let service = options.service();
    let mut record = service.process(input);
    if record.suggested.is_none() {
        bail!("{}: {}", input, record.note);
    }

    // report what was suggested before promotion clears it
    let suggested = record.suggested.as_ref().map(FieldsReport::from);

    if apply {
        service
            .apply(&mut record, rename)
            .with_context(|| format!("Failed to apply suggestions to {}", input))?;
    }

    let report = EnrichReport {
        file: &record.filename,
        note: &record.note,
        original: FieldsReport::from(&record.original),
        suggested,
        editions: record.found_editions.iter().map(EditionSummary::from).collect(),
        applied: record.accepted,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(suggested) = &report.suggested {
        println!("Suggestions for {}:", input);
        print_fields(suggested);
    }
    if !report.editions.is_empty() {
        println!("\nOther editions:");
        for edition in &report.editions {
            println!(
                "  {} / {} ({})",
                edition.title.unwrap_or("?"),
                edition.authors.join(", "),
                edition
                    .first_publish_year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }
    if report.applied {
        println!("\nApplied to {}", record.path.display());
    }
    Ok(())
}
