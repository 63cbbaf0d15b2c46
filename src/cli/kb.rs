//! `kb`, `analyze`, `ocr`, and `compare` commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use twinsync::config::TwinConfig;
use twinsync::ingest::learner::{self, Analysis};
use twinsync::ingest::vision;
use twinsync::knowledge::KnowledgeBase;

#[derive(Subcommand)]
pub enum KbAction {
    /// Learn one file, or every supported file in a directory
    Learn {
        path: PathBuf,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Comma-separated tags, added to every learned file
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Category for every learned file
        #[arg(long)]
        category: Option<String>,
    },
    /// Learn every configured path and write a summary
    AutoLearn,
    /// Keyword search over filenames and summaries
    Search {
        keyword: String,
        /// Also search the content preview
        #[arg(long)]
        content: bool,
    },
    /// Documents with a tag
    Tag { tag: String },
    /// Documents in a category
    Category { category: String },
    /// Most recently updated documents
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove a document and its tag/category memberships
    Delete { path: String },
    /// Index statistics
    Stats,
    /// Print the learning summary
    Summary,
}

pub fn run(config: &TwinConfig, action: KbAction) -> Result<()> {
    let mut kb = KnowledgeBase::open(config.knowledge_dir())?;

    match action {
        KbAction::Learn {
            path,
            recursive,
            tags,
            category,
        } => {
            if path.is_dir() {
                let outcomes = learner::learn_directory(
                    &mut kb,
                    &path,
                    recursive,
                    &config.knowledge,
                    &tags,
                    category.as_deref(),
                )?;
                let ok = outcomes.iter().filter(|o| o.is_ok()).count();
                for o in outcomes.iter().filter(|o| !o.is_ok()) {
                    println!("  FAILED {}: {}", o.path, o.error.as_deref().unwrap_or_default());
                }
                println!("Learned {ok} of {} file(s) from {}", outcomes.len(), path.display());
            } else {
                let outcome = learner::learn_file(&mut kb, &path, &config.knowledge, &tags, category.as_deref());
                match (&outcome.entry, &outcome.error) {
                    (Some(entry), _) => {
                        println!("Learned {}", entry.filename);
                        println!("  Type:      {}", entry.extension);
                        println!("  Size:      {} bytes", entry.size);
                        println!("  Summary:   {}", entry.summary.chars().take(120).collect::<String>());
                    }
                    (None, error) => {
                        anyhow::bail!("failed to learn {}: {}", outcome.path, error.as_deref().unwrap_or("unknown error"))
                    }
                }
            }
        }
        KbAction::AutoLearn => {
            let report = learner::auto_learn(&mut kb, &config.knowledge)?;
            println!("Auto Learn");
            println!("{}", "=".repeat(40));
            println!("  Learned:   {}", report.learned);
            println!("  Failed:    {}", report.failed);
            for p in &report.skipped_paths {
                println!("  Skipped:   {p} (not found)");
            }
            if let Some(path) = &report.summary_path {
                println!("  Summary:   {}", path.display());
            }
        }
        KbAction::Search { keyword, content } => {
            let hits = kb.search(&keyword, content);
            if hits.is_empty() {
                println!("No results found.");
                return Ok(());
            }
            println!("Found {} result(s)\n", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                println!("  {}. {} (score: {})", i + 1, hit.entry.filename, hit.search_score);
                println!("     {}", hit.entry.path);
            }
        }
        KbAction::Tag { tag } => print_docs(&kb.search_by_tag(&tag)),
        KbAction::Category { category } => print_docs(&kb.search_by_category(&category)),
        KbAction::List { limit } => print_docs(&kb.list_documents(limit)),
        KbAction::Delete { path } => {
            let result = kb.delete_document(&path)?;
            if result.removed {
                println!("Deleted {} ({} membership(s) swept)", result.path, result.memberships_swept);
            } else {
                println!("Not in index: {}", result.path);
            }
        }
        KbAction::Stats => {
            let stats = kb.stats();
            println!("Knowledge Base Statistics");
            println!("{}", "=".repeat(40));
            println!("  Documents:           {}", stats.total_documents);
            println!("  Tags:                {}", stats.total_tags);
            println!("  Categories:          {}", stats.total_categories);
            println!("  Total size:          {} bytes", stats.total_size_bytes);
            println!();
            println!("By Type:");
            for (ext, count) in &stats.type_distribution {
                println!("  {:<12} {}", ext, count);
            }
        }
        KbAction::Summary => println!("{}", learner::learning_summary(&kb)),
    }
    Ok(())
}

fn print_docs(docs: &[twinsync::knowledge::DocumentEntry]) {
    if docs.is_empty() {
        println!("No documents.");
        return;
    }
    for doc in docs {
        println!("  {:<32} {:<6} {}", doc.filename, doc.extension, doc.updated_at);
    }
}

/// Analyze an image or document and print the result as JSON.
pub fn analyze(config: &TwinConfig, path: &Path) -> Result<()> {
    let analysis = learner::analyze(path, &config.knowledge)?;
    if let Analysis::Image(image) = &analysis {
        println!("{}", image.describe());
        println!();
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&analysis).context("failed to serialize analysis")?
    );
    Ok(())
}

pub async fn ocr(config: &TwinConfig, path: &Path) -> Result<()> {
    let result = vision::extract_text(path, &config.knowledge).await?;
    println!("Extracted {} char(s){}", result.text_length, if result.has_chinese { " (contains Chinese)" } else { "" });
    println!("{}", "=".repeat(40));
    println!("{}", result.text);
    Ok(())
}

pub fn compare(a: &Path, b: &Path) -> Result<()> {
    let result = vision::compare_images(a, b)?;
    println!("Similarity:  {:.4}", result.similarity);
    println!("Similar:     {}", if result.is_similar { "yes" } else { "no" });
    Ok(())
}
