//! Batch enrichment command implementation

use super::Options;
use crate::scan::find_epubs;
use anyhow::{bail, Context, Result};
use folio_core::EnricherService;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info};

#[derive(Default)]
struct Counters {
    processed: AtomicUsize,
    with_suggestions: AtomicUsize,
    applied: AtomicUsize,
    failed: AtomicUsize,
}

/// Enrich every EPUB file under a directory
pub fn batch(input_dir: &str, options: &Options, apply: bool, rename: bool, jobs: usize) -> Result<()> {
    let files = find_epubs(Path::new(input_dir))
        .with_context(|| format!("Failed to scan {}", input_dir))?;

    if files.is_empty() {
        println!("No EPUB files found in {}", input_dir);
        return Ok(());
    }

    println!("Found {} files to process", files.len());

    let service = options.service();

    // Set up progress tracking
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .context("Invalid progress template")?
            .progress_chars("##-"),
    );

    let counters = Counters::default();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to build thread pool")?;

    pool.install(|| {
        files.par_iter().for_each(|path| {
            process_file(&service, path, apply, rename, &counters);
            progress.inc(1);
        });
    });

    progress.finish();

    let processed = counters.processed.load(Ordering::Relaxed);
    let with_suggestions = counters.with_suggestions.load(Ordering::Relaxed);
    let applied = counters.applied.load(Ordering::Relaxed);
    let failed = counters.failed.load(Ordering::Relaxed);

    println!("\nBatch complete:");
    println!("  Processed:        {}", processed);
    println!("  With suggestions: {}", with_suggestions);
    if apply {
        println!("  Applied:          {}", applied);
    }
    println!("  Failed:           {}", failed);

    if failed > 0 {
        bail!("Batch completed with {} failures", failed);
    }

    Ok(())
}

fn process_file(
    service: &EnricherService,
    path: &Path,
    apply: bool,
    rename: bool,
    counters: &Counters,
) {
    let mut record = service.process(path);
    counters.processed.fetch_add(1, Ordering::Relaxed);

    if record.suggested.is_none() {
        counters.failed.fetch_add(1, Ordering::Relaxed);
        error!(path = %path.display(), note = %record.note, "failed to process");
        return;
    }
    counters.with_suggestions.fetch_add(1, Ordering::Relaxed);

    if !apply {
        return;
    }
    match service.apply(&mut record, rename) {
        Ok(()) => {
            counters.applied.fetch_add(1, Ordering::Relaxed);
            info!(path = %record.path.display(), "applied suggestions");
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(path = %path.display(), error = %e, "failed to apply");
        }
    }
}
