use clap::{Parser, Subcommand};

mod alert;
mod config;
mod error;
mod filter;
mod history;
mod ingest;
mod model;
mod render;
mod repl;
mod session;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "logdash")]
#[command(about = "Filter, summarize and alert on CSV log exports", long_about = None)]
struct Cli {
    /// Alert when ERROR logs exceed this count (overrides LOGDASH_ERROR_THRESHOLD).
    #[arg(long, global = true)]
    threshold: Option<u64>,

    /// Zone for naive timestamps and day buckets, e.g. UTC or +05:30.
    #[arg(long, global = true)]
    timezone: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis over a CSV export and write a JSON report.
    Report {
        #[arg(long)]
        source: String,

        /// Keep only these levels (repeatable, comma-separated allowed).
        #[arg(long = "level", value_delimiter = ',')]
        levels: Vec<String>,

        /// Keep only these services (repeatable, comma-separated allowed).
        #[arg(long = "service", value_delimiter = ',')]
        services: Vec<String>,

        /// Inclusive lower time bound.
        #[arg(long)]
        from: Option<String>,

        /// Exclusive upper time bound.
        #[arg(long)]
        to: Option<String>,

        /// Output path; stdout when omitted.
        #[arg(short = 'o', long)]
        out: Option<String>,
    },
    /// Interactive session on stdin: load, filter, history, report.
    Session,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut cfg = config::Config::from_env()?;
    if let Some(t) = cli.threshold {
        cfg.error_threshold = t;
    }
    if let Some(tz) = &cli.timezone {
        cfg.timezone = config::parse_timezone(tz)?;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cfg.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    let notifier: Box<dyn alert::Notifier> = match &cfg.webhook_url {
        Some(url) => {
            log::info!("alerts go to webhook {}", url);
            Box::new(alert::WebhookNotifier::new(url.clone(), cfg.notify_timeout)?)
        }
        None => Box::new(alert::LogNotifier),
    };
    let mut session = session::Session::new(cfg.error_threshold, cfg.timezone, notifier);

    match cli.cmd {
        Commands::Report {
            source,
            levels,
            services,
            from,
            to,
            out,
        } => {
            let args = repl::FilterArgs {
                levels,
                services,
                from,
                to,
            };
            // No selection means the operator's default: everything.
            let spec = if args == repl::FilterArgs::default() {
                None
            } else {
                Some(args.to_spec(&cfg.timezone)?)
            };

            let inv = session.load_file_with(&source, spec)?;
            for w in &inv.warnings {
                eprintln!("WARN: {}", w);
            }
            eprintln!("{}", inv.status_line);

            let json = render::render_json_report(&inv)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Wrote {}", path);
                }
                None => println!("{}", json),
            }
        }
        Commands::Session => {
            let stdin = std::io::stdin();
            repl::run(&mut session, stdin.lock(), std::io::stdout())?;
        }
    }

    Ok(())
}
