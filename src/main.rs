use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::error;
use tracing_subscriber::EnvFilter;
use vocab_srs::models::sm2::format_interval;
use vocab_srs::seed::{export_cards_to_path, import_cards};
use vocab_srs::*;

#[derive(Debug)]
struct Options {
    db: Option<PathBuf>,
    user: String,
    seed: Option<PathBuf>,
    export: Option<PathBuf>,
    level: i32,
    goal: Option<String>,
    advance_days: i64,
    swipes: Vec<Direction>,
}

fn print_help() {
    println!("vocab-review {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Builds today's vocabulary review queue and optionally replays swipes.");
    println!();
    println!("USAGE:");
    println!("    vocab-review [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help               Print help information");
    println!("    -V, --version            Print version information");
    println!("    --db <PATH>              Database file (default: $VOCAB_DB_PATH or db.sqlite3)");
    println!("    --user <ID>              Learner id (default: local)");
    println!("    --seed <PATH>            Import cards from a JSON file first");
    println!("    --export <PATH>          Write the card catalog to a JSON file");
    println!("    --level <N>              Starting level for a first session (default: 0)");
    println!("    --goal <TAG>             Learning goal tag for a first session");
    println!("    --advance-days <N>       Pretend N days have passed");
    println!("    --swipe <LIST>           Comma separated swipes, e.g. right,left,up");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                 Log level filter (e.g., debug, info, warn)");
    println!("    VOCAB_UNDO_WINDOW_MS     Undo window for swipes (default: 3000)");
}

fn parse_args() -> std::result::Result<Options, String> {
    let mut opts = Options {
        db: None,
        user: "local".to_string(),
        seed: None,
        export: None,
        level: 0,
        goal: None,
        advance_days: 0,
        swipes: Vec::new(),
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| format!("{} requires a value", name))
        };
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("vocab-review {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--db" => opts.db = Some(PathBuf::from(value("--db")?)),
            "--user" => opts.user = value("--user")?,
            "--seed" => opts.seed = Some(PathBuf::from(value("--seed")?)),
            "--export" => opts.export = Some(PathBuf::from(value("--export")?)),
            "--goal" => opts.goal = Some(value("--goal")?),
            "--level" => {
                opts.level = value("--level")?
                    .parse()
                    .map_err(|e| format!("--level: {}", e))?
            }
            "--advance-days" => {
                opts.advance_days = value("--advance-days")?
                    .parse()
                    .map_err(|e| format!("--advance-days: {}", e))?
            }
            "--swipe" => {
                opts.swipes = value("--swipe")?
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.parse::<Direction>())
                    .collect::<std::result::Result<Vec<_>, String>>()?
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    Ok(opts)
}

fn seed_sample_cards(catalog: &SqliteCatalog) -> Result<()> {
    let samples = [
        Card::new("pl-czesc", "cześć", "hello", 0).with_tags(&["travel", "basics"]),
        Card::new("pl-dziekuje", "dziękuję", "thank you", 0).with_tags(&["travel", "basics"]),
        Card::new("pl-prosze", "proszę", "please", 0).with_tags(&["basics"]),
        Card::new("pl-dworzec", "dworzec", "railway station", 1).with_tags(&["travel"]),
        Card::new("pl-rachunek", "rachunek", "bill, invoice", 1).with_tags(&["travel", "business"]),
        Card::new("pl-umowa", "umowa", "contract", 2).with_tags(&["business"]),
    ];
    for card in &samples {
        catalog.upsert_card(card)?;
    }
    println!("Sample data created!");
    Ok(())
}

fn run(opts: Options) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(db) = opts.db {
        config.db_path = db;
    }

    let db = Database::open(&config.db_path)?;
    let catalog = SqliteCatalog::new(db.clone());

    if let Some(seed) = &opts.seed {
        let report = import_cards(seed, &catalog)?;
        println!(
            "Imported {} cards ({} rejected)",
            report.imported,
            report.error_count()
        );
        for problem in &report.errors {
            println!("  - {}", problem);
        }
    } else if catalog.card_count()? == 0 {
        seed_sample_cards(&catalog)?;
    }

    let clock = Arc::new(ManualClock::new(Utc::now()));
    clock.advance_days(opts.advance_days);
    let store = Arc::new(ScheduleStore::new(db.clone(), clock.clone()));

    let builder = QueueBuilder::new(&store, &catalog);
    let cards = if store.reviewed_card_ids(&opts.user)?.is_empty() {
        let words = builder.select_first_session_words(opts.level, opts.goal.as_deref())?;
        println!("First session for '{}': {} words", opts.user, words.len());
        words
    } else {
        let queue = builder.fetch_sr_queue(&opts.user)?;
        println!(
            "Queue for '{}': {} due + {} new, about {} min",
            opts.user, queue.due_count, queue.new_count, queue.estimated_minutes
        );
        if queue.burnout_warning() {
            println!(
                "Warning: {} cards are due. Consider a lighter day tomorrow.",
                queue.total_due
            );
        }
        queue.cards
    };

    if cards.is_empty() {
        println!("No words to study right now.");
    }
    for card in &cards {
        println!("  - {} ({})", card.word, card.definition);
    }

    if !opts.swipes.is_empty() {
        let mut session = LearningSession::new(&opts.user, store.clone(), clock, config.undo_window);
        session.start(cards);

        for direction in opts.swipes {
            let Some(word) = session.current_card().map(|c| c.word.clone()) else {
                break;
            };
            if let Some(adjustment) = session.swipe(direction)? {
                println!(
                    "{} -> {}: next review in {}",
                    word,
                    direction,
                    format_interval(adjustment.record.interval)
                );
            }
        }

        let progress = session.progress();
        println!("Reviewed {}/{} cards", progress.current, progress.total);
    }

    if let Some(path) = &opts.export {
        let count = export_cards_to_path(&catalog, path)?;
        println!("Exported {} cards to {}", count, path.display());
    }

    Ok(())
}

fn main() {
    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'vocab-review --help' for more information.");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(opts) {
        error!(code = e.code(), "{}", e);
        std::process::exit(1);
    }
}
