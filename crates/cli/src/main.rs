//! rewindex CLI - time-travel code search over a project tree

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use rewindex_engine::Engine;
use rewindex_query::{SearchFilters, SearchOptions};
use rewindex_watch::WatchMode;

mod output;
mod timestamp;

use output::print_json;
use timestamp::parse_timestamp;

#[derive(Parser)]
#[command(name = "rewindex")]
#[command(about = "Time-travel code search over a project tree")]
#[command(after_help = "\
QUICK START:
  rewindex init                        # Resolve config and create indices
  rewindex scan                        # Index the current tree
  rewindex search \"error handling\"     # Search indexed content
  rewindex watch                       # Keep the index live

COMMON WORKFLOWS:
  rewindex file history src/main.rs    # See every version of a file
  rewindex at src/main.rs 2026-01-01T00:00:00Z
  rewindex restore src/main.rs --at 2026-01-01T00:00:00Z")]
struct Cli {
  /// Project root (default: current directory)
  #[arg(short, long, global = true)]
  project: Option<PathBuf>,

  /// Emit machine-readable JSON instead of a formatted summary
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `rewindex file`
#[derive(Subcommand)]
enum FileCommand {
  /// Show the current record for a path
  Current {
    /// Path relative to the project root
    path: String,
  },
  /// List past versions of a path, most recent first
  History {
    /// Path relative to the project root
    path: String,
    #[arg(short, long, default_value = "20")]
    limit: usize,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve configuration, derive the project identity, and create indices
  Init,
  /// Walk the project tree and index every eligible file
  Scan,
  /// Watch the project tree and keep the index live until interrupted
  #[command(after_help = "\
Runs until Ctrl-C. Defaults to OS-level file-system notifications; pass
--poll to fall back to periodic full scans (useful on filesystems where
notify events are unreliable, e.g. some network mounts).")]
  Watch {
    /// Poll on a fixed interval instead of using OS file-system events
    #[arg(long)]
    poll: bool,
  },
  /// Report whether the backend is reachable and how many documents are indexed
  Status,
  /// Search indexed content
  #[command(after_help = "\
EXAMPLES:
  rewindex search \"error handling\"
  rewindex search \"async fn\" --language rust
  rewindex search \"TODO\" --path-prefix src/
  rewindex search \"config\" --at 2026-01-01T00:00:00Z")]
  Search {
    /// Search query
    query: String,
    #[arg(short, long, default_value = "20")]
    limit: usize,
    /// Restrict to these languages
    #[arg(long)]
    language: Option<Vec<String>>,
    /// Restrict to paths starting with this prefix
    #[arg(long)]
    path_prefix: Option<String>,
    /// Restrict to paths matching this glob
    #[arg(long)]
    path_pattern: Option<String>,
    /// Search as of this timestamp (RFC 3339 or millisecond epoch) instead of current content
    #[arg(long)]
    at: Option<String>,
    /// Lines of context before/after each match
    #[arg(long, default_value = "3")]
    context_lines: usize,
  },
  /// Inspect a single file's current record or version history
  File {
    #[command(subcommand)]
    command: FileCommand,
  },
  /// Show one version by its content hash
  Version {
    /// Content hash (sha256 hex)
    hash: String,
  },
  /// Show the version of a file at or before a given moment
  At {
    /// Path relative to the project root
    path: String,
    /// Timestamp (RFC 3339 or millisecond epoch)
    timestamp: String,
  },
  /// List every path and its content hash at a given moment
  FilesAt {
    /// Timestamp (RFC 3339 or millisecond epoch)
    timestamp: String,
  },
  /// Show how often files changed over time
  Timeline {
    /// Restrict to these paths (default: the whole project)
    paths: Vec<String>,
  },
  /// Write a past revision of a file back to disk
  #[command(after_help = "\
Refuses to overwrite an existing file unless --overwrite is given, and
refuses to write outside the project root when --output is given.")]
  Restore {
    /// Path relative to the project root
    path: String,
    /// Restore the version as of this moment instead of the current content
    #[arg(long)]
    at: Option<String>,
    /// Write to this path instead of back over the original
    #[arg(long)]
    output: Option<PathBuf>,
    /// Overwrite the destination if it already exists
    #[arg(long)]
    overwrite: bool,
  },
  /// Remove indexed records for paths that are no longer eligible (e.g. a new .gitignore rule)
  Purge {
    /// Preview what would be removed without making changes
    #[arg(long)]
    dry_run: bool,
  },
  /// Generate shell completions
  #[command(after_help = "\
EXAMPLES:
  rewindex completions bash > ~/.local/share/bash-completion/completions/rewindex
  rewindex completions zsh > ~/.zfunc/_rewindex
  rewindex completions fish > ~/.config/fish/completions/rewindex.fish")]
  Completions {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  if let Commands::Completions { shell } = &cli.command {
    print_completions(*shell);
    return Ok(());
  }

  let root = cli.project.clone().unwrap_or(std::env::current_dir().context("resolving current directory")?);

  let (_, config, _) = Engine::resolve(&root).context("resolving project configuration")?;
  rewindex_core::logging::init(&config.monitoring.log_level);

  match cli.command {
    Commands::Completions { .. } => unreachable!("handled above"),

    Commands::Init => {
      let (_, outcome) = Engine::init_project(&root).await.context("initializing project")?;
      print_json(cli.json, &outcome, |o| {
        println!("project {} ({}) ready", o.project_name, o.project_id);
        println!("  files index:    {}", o.files_index);
        println!("  versions index: {}", o.versions_index);
      });
    }

    Commands::Scan => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let outcome = engine.full_scan(now_ms()).await.context("scanning project")?;
      print_json(cli.json, &outcome, |o| {
        println!("added {} updated {} skipped {} deleted {} renamed {}", o.added, o.updated, o.skipped, o.deleted, o.renamed);
      });
    }

    Commands::Watch { poll } => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let mode = if poll { WatchMode::Polling } else { WatchMode::EventDriven };
      let handle = engine.start_watch(mode);
      tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
      eprintln!("stopping watcher...");
      handle.stop().await;
    }

    Commands::Status => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let status = engine.status().await.context("checking status")?;
      print_json(cli.json, &status, |s| {
        println!("backend reachable: {}", s.backend_reachable);
        println!("files indexed:     {}", s.files_doc_count);
        println!("versions stored:   {}", s.versions_doc_count);
        println!("watcher running:   {}", s.watcher_running);
        match s.last_update_age_ms {
          Some(age_ms) => println!("last update:       {:.1}s ago", age_ms as f64 / 1000.0),
          None => println!("last update:       never"),
        }
      });
    }

    Commands::Search {
      query,
      limit,
      language,
      path_prefix,
      path_pattern,
      at,
      context_lines,
    } => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let created_before_ms = at.as_deref().map(parse_timestamp).transpose()?;
      let filters = SearchFilters { language, path_prefix, path_pattern, created_before_ms, ..Default::default() };
      let options = SearchOptions { limit, context_lines, ..Default::default() };
      let outcome = engine.search(&query, &filters, &options).await.context("searching")?;
      print_json(cli.json, &outcome, |o| {
        println!("{} hits", o.total_hits);
        for hit in &o.results {
          println!("\n{} ({}, score {:.2})", hit.file_path, hit.language, hit.score);
          for m in &hit.matches {
            println!("  {}: {}", m.line, m.highlight);
          }
        }
      });
    }

    Commands::File { command } => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      match command {
        FileCommand::Current { path } => {
          let record = engine.file_current(&path).await.context("fetching current record")?;
          print_json(cli.json, &record, |r| match r {
            Some(r) => println!("{} ({}, {} bytes, hash {})", r.relative_path, r.language, r.size_bytes, r.content_hash),
            None => println!("not indexed: {path}"),
          });
        }
        FileCommand::History { path, limit } => {
          let versions = engine.file_history(&path, limit).await.context("fetching file history")?;
          print_json(cli.json, &versions, |versions| {
            for v in versions {
              println!("{} hash {} ({} bytes)", v.created_at, v.content_hash, v.content.len());
            }
          });
        }
      }
    }

    Commands::Version { hash } => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let version = engine.version(&hash).await.context("fetching version")?;
      print_json(cli.json, &version, |v| match v {
        Some(v) => println!("{} @ {} ({} bytes)", v.file_path, v.created_at, v.content.len()),
        None => println!("no version found for hash {hash}"),
      });
    }

    Commands::At { path, timestamp } => {
      let ts_ms = parse_timestamp(&timestamp)?;
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let outcome = engine.file_at(&path, ts_ms).await.context("resolving file at timestamp")?;
      print_json(cli.json, &outcome, |o| match o {
        rewindex_engine::FileAtOutcome::AsOf(v) => println!("{} as of {} (hash {})", path, v.created_at, v.content_hash),
        rewindex_engine::FileAtOutcome::CurrentFallback(r) => println!("{path} did not exist yet at that time; showing current content (hash {})", r.content_hash),
        rewindex_engine::FileAtOutcome::Absent => println!("no record of {path}"),
      });
    }

    Commands::FilesAt { timestamp } => {
      let ts_ms = parse_timestamp(&timestamp)?;
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let snapshots = engine.files_at(ts_ms).await.context("listing files at timestamp")?;
      print_json(cli.json, &snapshots, |snapshots| {
        for s in snapshots {
          println!("{} ({}, {})", s.relative_path, s.language, s.content_hash);
        }
      });
    }

    Commands::Timeline { paths } => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let file_paths = if paths.is_empty() { None } else { Some(paths) };
      let outcome = engine.timeline(file_paths.as_deref()).await.context("building timeline")?;
      print_json(cli.json, &outcome, |o| {
        if o.downsampled {
          eprintln!("(downsampled to {} buckets)", o.buckets.len());
        }
        for bucket in &o.buckets {
          println!("{} {}", bucket.bucket_start_ms, bucket.count);
        }
      });
    }

    Commands::Restore { path, at, output, overwrite } => {
      let ts_ms = at.as_deref().map(parse_timestamp).transpose()?;
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let destination = engine
        .restore(&path, ts_ms, output.as_deref(), overwrite)
        .await
        .context("restoring file")?;
      print_json(cli.json, &destination, |d| println!("restored {} -> {}", path, d.display()));
    }

    Commands::Purge { dry_run } => {
      let (engine, _) = Engine::init_project(&root).await.context("initializing project")?;
      let outcome = engine.purge_ignored(dry_run).await.context("purging ignored paths")?;
      print_json(cli.json, &outcome, |o| {
        let verb = if o.dry_run { "would remove" } else { "removed" };
        println!("{verb} {} files, {} versions", o.files_removed, o.versions_removed);
      });
    }
  }

  Ok(())
}

fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

fn print_completions(shell: Shell) {
  clap_complete::generate(shell, &mut Cli::command(), "rewindex", &mut io::stdout());
}
