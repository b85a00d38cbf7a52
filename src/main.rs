//! cardforge - LLM-generated flashcards with spaced-repetition review
//!
//! CLI entry point with global panic handler.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cardforge::config::{cardforge_home, Config};
use cardforge::core::{CardId, DeckId, Generator, ReviewQueue};
use cardforge::error::{exit_codes, CardError};
use cardforge::llm::HttpLlmClient;
use cardforge::storage::SqliteCardStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// cardforge - generate flashcards from text and review them
#[derive(Parser)]
#[command(name = "cardforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or list decks
    Deck {
        #[command(subcommand)]
        action: DeckAction,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },

    /// Generate cards from source text with the configured LLM
    Generate {
        /// Deck to add the cards to
        #[arg(long)]
        deck: DeckId,
        /// Number of cards to ask for
        #[arg(long, short)]
        count: Option<u32>,
        /// Read the source text from a file
        #[arg(long, short, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Source text
        text: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the next due card of a deck
    Next {
        /// Deck to review
        #[arg(long)]
        deck: DeckId,
        /// Card ids to skip (repeatable or comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<CardId>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Grade a card: again, hard, good or easy
    Grade {
        /// Card to grade
        card_id: CardId,
        /// The grade
        grade: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show how many cards of a deck are due
    Due {
        /// Deck to count
        #[arg(long)]
        deck: DeckId,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Review due cards interactively
    Study {
        /// Deck to review
        #[arg(long)]
        deck: DeckId,
        /// Keep repeating due cards until none are left
        #[arg(long = "loop")]
        repeat: bool,
        /// Output the summary as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress the summary
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum DeckAction {
    /// Create a deck
    Create {
        /// Deck name
        name: String,
    },
    /// List decks with their card counts
    List,
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cardforge error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Log to stderr, filtered by `CARDFORGE_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CARDFORGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Set up the global panic handler.
///
/// On panic, appends the message to `crash.log` in the cardforge home and
/// exits with the failure code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("cardforge panic: {}", info);

        if let Some(home) = cardforge_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::FAILURE);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, CardError> {
    let cli = Cli::parse();

    let config = Config::load();
    config.validate()?;

    match cli.command {
        Commands::Deck {
            action,
            json,
            quiet,
        } => run_deck(action, json, quiet, &config),
        Commands::Generate {
            deck,
            count,
            file,
            text,
            json,
            quiet,
        } => run_generate(deck, count, text, file, json, quiet, &config),
        Commands::Next {
            deck,
            exclude,
            json,
            quiet,
        } => run_next(deck, &exclude, json, quiet, &config),
        Commands::Grade {
            card_id,
            grade,
            json,
            quiet,
        } => run_grade(card_id, &grade, json, quiet, &config),
        Commands::Due { deck, json, quiet } => run_due(deck, json, quiet, &config),
        Commands::Study {
            deck,
            repeat,
            json,
            quiet,
        } => run_study(deck, repeat, json, quiet, &config),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Open the card database named by the config.
fn open_store(config: &Config) -> Result<SqliteCardStore, CardError> {
    let path = config.database_path().ok_or_else(|| {
        CardError::config("no database path: set storage.database_path or CARDFORGE_DATABASE")
    })?;
    tracing::debug!(path = %path.display(), "opening card database");
    SqliteCardStore::open(&path)
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_formatted(formatted: &str) {
    if formatted.is_empty() {
        return;
    }
    if formatted.ends_with('\n') {
        print!("{}", formatted);
    } else {
        println!("{}", formatted);
    }
}

fn run_deck(
    action: DeckAction,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, CardError> {
    use cardforge::cli::decks::{DeckCommand, DeckOptions};

    let cmd = DeckCommand::new(open_store(config)?);
    let options = DeckOptions { json, quiet };

    let output = match action {
        DeckAction::Create { name } => cmd.create(&name, Utc::now()),
        DeckAction::List => cmd.list(),
    };
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_generate(
    deck: DeckId,
    count: Option<u32>,
    text: Option<String>,
    file: Option<PathBuf>,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, CardError> {
    use cardforge::cli::generate::{GenerateCommand, GenerateOptions, GenerateOutput, SourceInput};

    let llm = HttpLlmClient::from_config(&config.llm)?;
    let generator = Generator::new(open_store(config)?, llm, config);
    let cmd = GenerateCommand::new(generator);
    let options = GenerateOptions { json, quiet, count };

    let output = match SourceInput::from_args(text, file) {
        Ok(source) => cmd.run(deck, &source, &options, Utc::now()),
        Err(e) => GenerateOutput::failure(deck, &e),
    };
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_next(
    deck: DeckId,
    exclude: &[CardId],
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, CardError> {
    use cardforge::cli::next::{NextCommand, NextOptions};

    let queue = ReviewQueue::new(open_store(config)?, config.scheduling.clone());
    let cmd = NextCommand::new(queue);
    let options = NextOptions { json, quiet };

    let output = cmd.run(deck, exclude, Utc::now());
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_grade(
    card_id: CardId,
    grade: &str,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, CardError> {
    use cardforge::cli::grade::{GradeCommand, GradeOptions};

    let queue = ReviewQueue::new(open_store(config)?, config.scheduling.clone());
    let cmd = GradeCommand::new(queue);
    let options = GradeOptions { json, quiet };

    let output = cmd.run(card_id, grade, Utc::now());
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_due(deck: DeckId, json: bool, quiet: bool, config: &Config) -> Result<ExitCode, CardError> {
    use cardforge::cli::due::{DueCommand, DueOptions};

    let queue = ReviewQueue::new(open_store(config)?, config.scheduling.clone());
    let cmd = DueCommand::new(queue);
    let options = DueOptions { json, quiet };

    let output = cmd.run(deck, Utc::now());
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_study(
    deck: DeckId,
    repeat: bool,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, CardError> {
    use cardforge::cli::study::{StudyCommand, StudyOptions};

    let queue = ReviewQueue::new(open_store(config)?, config.scheduling.clone());
    let mut cmd = StudyCommand::new(queue, config.review.recent_window);
    let options = StudyOptions {
        json,
        quiet,
        repeat,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let output = cmd.run(deck, &options, &mut stdin.lock(), &mut stdout.lock());
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::FAILURE, 1);
    }

    #[test]
    fn test_success_to_exit_code() {
        assert_eq!(
            success_to_exit_code(true),
            ExitCode::from(exit_codes::SUCCESS as u8)
        );
        assert_eq!(
            success_to_exit_code(false),
            ExitCode::from(exit_codes::FAILURE as u8)
        );
    }

    #[test]
    fn test_cli_parse_deck_create() {
        let cli = Cli::parse_from(["cardforge", "deck", "create", "Spanish", "--json"]);
        match cli.command {
            Commands::Deck { action, json, .. } => {
                assert!(json);
                assert!(matches!(action, DeckAction::Create { name } if name == "Spanish"));
            }
            _ => panic!("Expected Deck command"),
        }
    }

    #[test]
    fn test_cli_parse_generate_text() {
        let cli = Cli::parse_from(["cardforge", "generate", "--deck", "3", "-c", "5", "Mitochondria make ATP."]);
        match cli.command {
            Commands::Generate {
                deck,
                count,
                file,
                text,
                ..
            } => {
                assert_eq!(deck, 3);
                assert_eq!(count, Some(5));
                assert!(file.is_none());
                assert_eq!(text.as_deref(), Some("Mitochondria make ATP."));
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_cli_generate_rejects_text_and_file() {
        let result = Cli::try_parse_from([
            "cardforge",
            "generate",
            "--deck",
            "1",
            "--file",
            "notes.txt",
            "inline text",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_next_excludes() {
        let cli = Cli::parse_from(["cardforge", "next", "--deck", "1", "--exclude", "4,5", "--exclude", "9"]);
        match cli.command {
            Commands::Next { deck, exclude, .. } => {
                assert_eq!(deck, 1);
                assert_eq!(exclude, vec![4, 5, 9]);
            }
            _ => panic!("Expected Next command"),
        }
    }

    #[test]
    fn test_cli_parse_grade() {
        let cli = Cli::parse_from(["cardforge", "grade", "12", "Easy", "-q"]);
        match cli.command {
            Commands::Grade {
                card_id,
                grade,
                quiet,
                ..
            } => {
                assert_eq!(card_id, 12);
                assert_eq!(grade, "Easy");
                assert!(quiet);
            }
            _ => panic!("Expected Grade command"),
        }
    }

    #[test]
    fn test_cli_parse_study_loop() {
        let cli = Cli::parse_from(["cardforge", "study", "--deck", "2", "--loop"]);
        match cli.command {
            Commands::Study { deck, repeat, .. } => {
                assert_eq!(deck, 2);
                assert!(repeat);
            }
            _ => panic!("Expected Study command"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["cardforge"]).is_err());
    }
}
