//! `scilit`: search papers from the terminal, read their highlights and
//! full text, and draft citations.

mod command;
mod display;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scilit_client::HttpNlpBackend;
use scilit_common::error::ScilitError;
use scilit_config::Config;
use scilit_pipeline::{QueryDraft, Session};

use command::Command;

#[derive(Parser, Debug)]
#[command(name = "scilit", version, about = "Literature search and citation drafting")]
struct Args {
    /// Config file; defaults to ./scilit.toml
    #[arg(short, long, env = "SCILIT_CONFIG")]
    config: Option<PathBuf>,

    /// Context for a search run at startup
    #[arg(long)]
    context: Option<String>,

    /// `;`-separated keywords for the startup search
    #[arg(short, long)]
    keywords: Option<String>,

    /// Print the first page of the startup search as JSON and exit
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load_from(path).context("loading configuration")?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scilit=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    info!(
        backend = %config.backend.base_url,
        page_size = config.paging.page_size,
        "Configuration loaded"
    );

    let backend = HttpNlpBackend::new(&config).context("building backend client")?;
    let session = Arc::new(Session::new(Arc::new(backend), &config));
    spawn_progress_printer(&session);

    if args.context.is_some() || args.keywords.is_some() {
        let context = args.context.unwrap_or_default();
        let keywords = args.keywords.unwrap_or_default();
        if args.json {
            session.run_search(&context, &keywords).await?;
            println!("{}", serde_json::to_string_pretty(&session.page_views().await)?);
            return Ok(());
        }
        execute(&session, Command::Search(None), Some(QueryDraft::new(context, keywords))).await?;
    } else if args.json {
        bail!("--json needs --context or --keywords");
    }

    repl(&session).await
}

/// Echo progress labels to stderr while runs are in flight.
fn spawn_progress_printer(session: &Session) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.phase.is_failure() => {
                    eprintln!("{}", style(event.phase.label()).red());
                }
                Ok(event) if !event.phase.label().is_empty() => {
                    eprintln!("{}", style(event.phase.label()).dim());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Progress printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn repl(session: &Session) -> Result<()> {
    println!("{}", style("scilit: type `help` for commands").dim());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("scilit>").cyan().bold());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", style(e).red());
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(session, command, None).await {
            eprintln!("{} {e:#}", style("error:").red().bold());
        }
    }
    Ok(())
}

async fn show_page(session: &Session) {
    for view in session.page_views().await {
        display::print_paper(&view);
    }
    let total = session.results().await.len();
    println!(
        "\n{}",
        display::page_status(session.current_page().await, session.page_count().await, total)
    );
}

/// Run one command. `startup` overrides the query draft for the initial
/// search.
async fn execute(session: &Session, command: Command, startup: Option<QueryDraft>) -> Result<()> {
    match command {
        Command::Search(context) => {
            let mut draft = match startup {
                Some(draft) => draft,
                None => session.query().await,
            };
            if let Some(context) = context {
                draft.context = context;
            }
            session.run_search(&draft.context, &draft.keywords).await?;
            show_page(session).await;
        }
        Command::Keywords(keywords) => {
            let mut draft = session.query().await;
            draft.keywords = keywords;
            session.set_query(draft).await;
            println!("{}", style("keywords set; `search` to apply").dim());
        }
        Command::Page(page) => {
            session.go_to_page(page).await?;
            show_page(session).await;
        }
        Command::Show { json: true } => {
            println!("{}", serde_json::to_string_pretty(&session.page_views().await)?);
        }
        Command::Show { json: false } => show_page(session).await,
        Command::Open { paper, highlight: None } => {
            session.toggle_fulltext(paper).await?;
            print_view(session, paper).await;
        }
        Command::Open { paper, highlight: Some(highlight) } => {
            match session.open_highlight_in_fulltext(paper, highlight).await? {
                Some(target) => {
                    if let Some(view) = session.view(paper).await {
                        display::print_paper(&view);
                        display::print_target(&view, &target);
                    }
                }
                None => println!("{}", style("this highlight has no match in the full text").dim()),
            }
        }
        Command::Jump { paper, reference } => {
            let results = session.results().await;
            let title = results
                .loaded(paper)
                .and_then(|record| record.content_info.references.get(reference))
                .map(|entry| entry.title.clone())
                .filter(|title| !title.is_empty())
                .with_context(|| format!("paper {} has no reference {reference} with a title", paper + 1))?;
            lookup(session, &title).await?;
        }
        Command::Lookup(title) => lookup(session, &title).await?,
        Command::Fold => {
            if let Some(anchor) = session.fold_page().await {
                println!("{}", style(format!("folded; back at {anchor}")).dim());
            }
            show_page(session).await;
        }
        Command::Select(paper) => {
            if session.select_for_citation(paper).await? {
                println!("{} {}", style("draft:").magenta(), session.citation_draft().await);
            } else {
                println!("{}", style("selection cleared").dim());
            }
        }
        Command::Draft(text) => session.edit_citation_draft(text).await?,
        Command::Refine => {
            let refined = session.refine_citation().await?;
            let segments = scilit_render::segment_highlights(&refined.text, &refined.highlight_spans);
            println!("{} {}", style("draft:").magenta(), display::segments(&segments));
        }
        Command::Export => display::print_export(&session.export_selected().await?),
        Command::Back => {
            if session.restore_from_buffer().await {
                show_page(session).await;
            } else {
                println!("{}", style("nothing to go back to").dim());
            }
        }
        Command::Help => println!("{}", command::HELP),
        Command::Quit => {}
    }
    Ok(())
}

async fn print_view(session: &Session, paper: usize) {
    if let Some(view) = session.view(paper).await {
        display::print_paper(&view);
    }
}

async fn lookup(session: &Session, title: &str) -> Result<()> {
    match session.jump_to_paper_by_title(title).await {
        Ok(()) => {
            show_page(session).await;
            println!("{}", style("`back` returns to the previous list").dim());
            Ok(())
        }
        Err(ScilitError::NotFound(_)) => {
            println!("{}", style("Paper not found").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
