//! Single-reference search against a demo index.

use std::env;
use std::path::PathBuf;

use priorart_api::SearchParams;
use priorart_cli::{build_engine, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <query> [--corpus corpus.json] [--indexes dir] [--limit N] [--floor F]",
            args[0]
        );
        eprintln!(
            "Example: {} 'fire detection drone' --corpus corpus.json --indexes ./indexes --limit 5",
            args[0]
        );
        std::process::exit(1);
    }
    let query = args[1].clone();
    let mut corpus = PathBuf::from("corpus.json");
    let mut indexes = PathBuf::from("./indexes");
    let mut limit = 10usize;
    let mut floor = Some(0.05);
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--corpus" if i + 1 < args.len() => {
                corpus = PathBuf::from(&args[i + 1]);
                i += 1;
            }
            "--indexes" if i + 1 < args.len() => {
                indexes = PathBuf::from(&args[i + 1]);
                i += 1;
            }
            "--limit" if i + 1 < args.len() => {
                limit = args[i + 1].parse()?;
                i += 1;
            }
            "--floor" if i + 1 < args.len() => {
                floor = Some(args[i + 1].parse()?);
                i += 1;
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let engine = build_engine(&corpus, &indexes, floor)?;
    let mut params = SearchParams::new(query.clone());
    params.n = limit;
    let response = engine
        .search(&params)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("Found {} results for: \"{}\"", response.results.len(), response.query);
    for (i, result) in response.results.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  id={}  [{}]",
            i + 1,
            result["score"].as_f64().unwrap_or(0.0),
            result["id"].as_str().unwrap_or("?"),
            result["index"].as_str().unwrap_or("?"),
        );
        println!(
            "     {}: {}",
            result["title"].as_str().unwrap_or("(untitled)"),
            result["abstract"].as_str().unwrap_or(""),
        );
    }
    Ok(())
}
