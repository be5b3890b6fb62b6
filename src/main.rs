use clap::{Parser, Subcommand};
use memory_book::{config, generate, merge, output, template};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "memory-book")]
#[command(about = "Static site generator for memory books and journals")]
#[command(long_about = "\
Static site generator for memory books and journals

One config.json lists the Markdown files in reading order. Each file becomes
a page; files with a password in their front matter are encrypted and
unlocked in the browser.

Source structure:

  ./
  ├── config.json                  # Reading order + siteInfo
  ├── content/
  │   ├── foreword.md              # Listed under \"prefaces\"
  │   ├── 01-childhood.md          # Listed under \"chapters\"
  │   └── afterword.md             # Listed under \"epilogues\"
  ├── static/                      # Copied verbatim to <output>/static/
  └── templates/                   # Optional: home.html + chapter.html

Front matter:

  ---
  title: The Lake House
  subtitle: 1994 to 2001
  category: Places
  tags: [summer, lake]
  illustration: photos/dock.jpg
  password: only-family-knows
  ---

Run 'memory-book gen-config' for a starter config.json.")]
#[command(version = version_string())]
struct Cli {
    /// Source directory containing config.json
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build,
    /// Load config, content and templates without writing anything
    Check,
    /// Concatenate all chapters into a single Markdown file
    Merge {
        /// Output file
        #[arg(long, default_value = merge::MERGED_FILENAME)]
        out: PathBuf,
    },
    /// Decrypt a protected page of a built site and print its HTML body
    Decrypt {
        /// Page slug, or path to the page's index.html
        page: String,
        /// Page password
        #[arg(long)]
        password: String,
    },
    /// Print a starter config.json
    GenConfig,
    /// Write the built-in templates into <source>/templates/ for editing
    GenTemplates,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memory_book=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build => {
            println!("==> Loading {}", cli.source.display());
            let plan = generate::Plan::load(&cli.source)?;
            init_thread_pool(&plan.config.processing);

            println!("==> Writing {}", cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let options = generate::BuildOptions {
                events: Some(tx),
                ..Default::default()
            };
            let report = generate::emit(&plan, &cli.source, &cli.output, options);
            printer.join().ok();
            let report = report?;
            output::print_build_summary(&report);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let plan = generate::Plan::load(&cli.source)?;
            output::print_check_output(&plan, &cli.source);
            println!("==> Content is valid");
        }
        Command::Merge { out } => {
            let site_config = config::load_config(&cli.source)?;
            let now = chrono::Local::now().naive_local();
            let report = merge::merge(&cli.source, &site_config, &out, now)?;
            output::print_merge_output(&report, &out);
        }
        Command::Decrypt { page, password } => {
            let html = generate::decrypt_page(&cli.output, &page, &password)?;
            println!("{}", html);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_json());
        }
        Command::GenTemplates => {
            let dir = cli.source.join(template::TEMPLATES_DIR);
            std::fs::create_dir_all(&dir)?;
            for (name, source) in template::builtin_sources() {
                let path = dir.join(name);
                if path.exists() {
                    println!("{} exists, left untouched", path.display());
                    continue;
                }
                std::fs::write(&path, source)?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
