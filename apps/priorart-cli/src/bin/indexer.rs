//! Build a demo index partition from a JSON corpus file.
//!
//! The corpus is a JSON array of document records (the same shape the
//! document store serves). Abstracts are embedded with the hashing
//! embedder and written as one flat or IVF partition.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use priorart_core::fakes::HashingEmbedder;
use priorart_core::traits::TextEmbedder;
use priorart_core::types::DocumentRecord;
use priorart_index::partition::{items_path, write_items};
use priorart_index::{FlatIndex, IvfIndex};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <corpus.json> <out_dir> [--partition ID] [--ivf NLISTS]", args[0]);
        eprintln!("Example: {} corpus.json ./indexes --partition H04W.patent", args[0]);
        std::process::exit(1);
    }
    let corpus_path = PathBuf::from(&args[1]);
    let out_dir = PathBuf::from(&args[2]);
    let mut partition_id = "demo.patent".to_string();
    let mut nlists: Option<usize> = None;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--partition" if i + 1 < args.len() => {
                partition_id = args[i + 1].clone();
                i += 1;
            }
            "--ivf" if i + 1 < args.len() => {
                nlists = Some(args[i + 1].parse()?);
                i += 1;
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let config = priorart_core::config::Config::load()?.app()?;
    let dim = config.index.dim;

    let file = File::open(&corpus_path)?;
    let records: Vec<DocumentRecord> = serde_json::from_reader(BufReader::new(file))?;
    anyhow::ensure!(!records.is_empty(), "corpus is empty");
    println!("Indexing {} documents at dim {}", records.len(), dim);

    let embedder = HashingEmbedder::new(dim);
    let mut vectors = Vec::with_capacity(records.len());
    let mut items = Vec::with_capacity(records.len());
    for record in &records {
        vectors.push(embedder.embed(&record.abstract_text)?);
        items.push(record.id.clone());
    }

    std::fs::create_dir_all(&out_dir)?;
    let index_file = match nlists {
        Some(nlists) => {
            let path = out_dir.join(format!("{partition_id}.ivf"));
            let nprobe = (nlists / 4).max(1);
            IvfIndex::build(&vectors, dim, nlists, nprobe)?.write(&path)?;
            path
        }
        None => {
            let path = out_dir.join(format!("{partition_id}.flat"));
            FlatIndex::write(&path, dim, &vectors)?;
            path
        }
    };
    write_items(&items_path(&index_file), &items)?;
    println!(
        "Wrote partition {} ({} vectors) to {}",
        partition_id,
        items.len(),
        index_file.display()
    );
    Ok(())
}
