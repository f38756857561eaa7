//! chapterize - segment an ebook file into chapters

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use chapterize::{SegmentConfig, segment_file};

#[derive(Parser)]
#[command(name = "chapterize")]
#[command(version, about = "Segment an ebook into chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    chapterize book.epub --book-id 42 --out static/book    Extract EPUB chapters, export images
    chapterize novel.txt --titles                          List detected chapter titles
    chapterize paper.pdf                                   Segment by bookmark outline")]
struct Cli {
    /// Input file (EPUB, PDF, or TXT)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Book identifier used to scope exported resources
    #[arg(long, default_value = "book")]
    book_id: String,

    /// Root directory for exported image resources (EPUB only)
    #[arg(long, default_value = "static/book")]
    out: PathBuf,

    /// Public URL base for rewritten image references (EPUB only)
    #[arg(long, default_value = "/static/book")]
    web_base: String,

    /// Keep the first reading-order entry instead of skipping it as a cover
    #[arg(long)]
    keep_first_spine: bool,

    /// Print chapter titles only instead of the full JSON chapter list
    #[arg(short, long)]
    titles: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SegmentConfig {
        static_root: cli.out,
        public_base: cli.web_base,
        skip_first_spine: !cli.keep_first_spine,
    };

    match segment_file(&cli.input, &cli.book_id, &config) {
        Ok(chapters) => {
            if cli.titles {
                for chapter in &chapters {
                    println!("{}. {}", chapter.order, chapter.title);
                }
            } else {
                match serde_json::to_string_pretty(&chapters) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
