use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use intake_core::config::{Config, Settings};
use intake_core::corpus::load_corpus;
use intake_core::traits::Embedder;
use intake_core::types::{ChosenLabel, RequestCategory, UNSURE_LABEL};
use intake_embed::get_default_embedder;
use intake_flow::{build_generator, build_store, Action, Assistant, FirstPass, TicketDraft, TicketSession};
use intake_hybrid::Fusion;
use intake_text::KeywordIndexer;
use intake_vector::VectorIndexer;

pub async fn ingest(config: &Config, settings: &Settings, corpus_dir: Option<&str>) -> Result<()> {
    let corpus_dir = config.resolve_path(corpus_dir.unwrap_or(&settings.data.corpus_dir));
    println!("Ingesting corpus from {}", corpus_dir.display());
    let chunks = load_corpus(&corpus_dir)?;
    if chunks.is_empty() {
        println!("No reference chunks found; nothing to index.");
        return Ok(());
    }

    let keyword_dir = config.resolve_path(&settings.data.keyword_index_dir);
    let keyword_chunks = chunks.clone();
    let indexed = tokio::task::spawn_blocking(move || KeywordIndexer::new(keyword_dir)?.index(&keyword_chunks)).await??;
    println!("Keyword index: {indexed} chunks");

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let lancedb_dir: PathBuf = config.resolve_path(&settings.data.lancedb_dir);
    let written = VectorIndexer::new(lancedb_dir, &settings.data.table_name, embedder).index(&chunks).await?;
    println!("Vector table '{}': {written} chunks", settings.data.table_name);
    println!("\u{2705} Ingest complete ({} chunks)", chunks.len());
    Ok(())
}

async fn fusion(config: &Config, settings: &Settings) -> Result<Arc<Fusion>> {
    Ok(Arc::new(Fusion::from_settings(settings, |p| config.resolve_path(p)).await?))
}

async fn assistant(config: &Config, settings: &Settings) -> Result<Arc<Assistant>> {
    let fusion = fusion(config, settings).await?;
    let generator = build_generator(&settings.llm)?;
    Ok(Arc::new(Assistant::new(fusion, generator, settings.classifier.confidence_floor)))
}

pub async fn search(config: &Config, settings: &Settings, query: &str) -> Result<()> {
    let bundle = fusion(config, settings).await?.fuse(query).await;
    println!("Query: {query}");
    println!("Chunks: {}", bundle.total_chunk_count);
    if !bundle.degraded.is_empty() {
        let channels: Vec<&str> = bundle.degraded.iter().map(|c| c.as_str()).collect();
        println!("\u{26a0}\u{fe0f}  Unavailable channels: {}", channels.join(", "));
    }
    if bundle.is_empty() {
        println!("No evidence found.");
        return Ok(());
    }
    println!("Ids: {}\nTitles: {}\n\n{}", bundle.combined_id, bundle.combined_title, bundle.combined_text);
    Ok(())
}

pub async fn classify(config: &Config, settings: &Settings, text: &str, request_type: Option<&str>) -> Result<()> {
    let chosen = match request_type {
        Some(t) => ChosenLabel::parse(t).ok_or_else(|| anyhow!("unknown request type '{t}'"))?,
        None => ChosenLabel::Unsure,
    };
    let assistant = assistant(config, settings).await?;
    let result = assistant.classifier.classify(text, &mut FirstPass::new()).await;
    let decision = assistant.orchestrator.decide(&result, chosen, text).await;
    println!("Chosen:      {chosen}");
    println!("Result:      {} ({}%)", result.label, result.confidence);
    println!("Evidence:    {} chunk(s): {}", result.total_chunk_count, result.evidence_title);
    println!("Explanation: {}", result.explanation);
    println!("Summary:     {}", result.summary);
    println!("Flow:        {} -> {}", decision.flow, decision.action);
    println!("\n{}", decision.message);
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

fn request_type_choice(input: &str) -> Option<String> {
    let options: Vec<&str> = RequestCategory::ALL.iter().map(|c| c.label()).chain(std::iter::once(UNSURE_LABEL)).collect();
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(options[n - 1].to_string()),
        _ => ChosenLabel::parse(input).map(|c| c.label().to_string()),
    }
}

pub async fn chat(config: &Config, settings: &Settings) -> Result<()> {
    let assistant = assistant(config, settings).await?;
    let store = build_store(&settings.store)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Request Type:");
    for (i, c) in RequestCategory::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, c.label());
    }
    println!("  {}. {UNSURE_LABEL}", RequestCategory::ALL.len() + 1);
    let request_type = loop {
        let Some(input) = prompt(&mut lines, "> ").await? else { return Ok(()) };
        match request_type_choice(&input) {
            Some(t) => break t,
            None => println!("Please pick one of the options above."),
        }
    };
    let Some(description) = prompt(&mut lines, "Request Description: ").await? else { return Ok(()) };
    let title = prompt(&mut lines, "Content Title (optional): ").await?.unwrap_or_default();

    let mut draft = TicketDraft::new(&request_type, &description);
    if !title.trim().is_empty() {
        draft = draft.with_field("Content Title", title.trim());
    }
    let (mut session, outcome) = TicketSession::open(assistant, store, draft).await?;
    print_outcome(&outcome.message, &outcome.warnings);

    while !session.is_complete() {
        let Some(line) = prompt(&mut lines, "you> ").await? else { break };
        if line.trim().is_empty() {
            continue;
        }
        let outcome = session.respond(&line).await?;
        print_outcome(&outcome.message, &outcome.warnings);
        if outcome.action == Action::Complete {
            break;
        }
    }

    for warning in session.finalize().await {
        println!("\u{26a0}\u{fe0f}  {warning}");
    }
    if let Some(id) = session.record_id() {
        println!("Ticket record: {id}");
    }
    Ok(())
}

fn print_outcome(message: &str, warnings: &[String]) {
    println!("\nassistant> {message}\n");
    for warning in warnings {
        println!("\u{26a0}\u{fe0f}  {warning}");
    }
}
