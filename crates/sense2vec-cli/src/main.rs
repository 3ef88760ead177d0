//! CLI for building and querying sense2vec stores.

// CLI binaries need to print user-facing output
#![allow(
    clippy::print_stdout,
    reason = "CLI binary needs stdout for user output"
)]

use std::io::Write as _;

use eyre::WrapErr as _;
use sense2vec::KeyCodec as _;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Import {
            input,
            output,
            senses,
            delimiter,
        } => import(&input, &output, senses, delimiter)?,
        Command::Export { model, output } => export(&model, &output)?,
        Command::Similar {
            model,
            keys,
            limit,
            json,
        } => similar(&model, &keys, limit, json)?,
        Command::Senses { model, key } => {
            let s2v = load(&model)?;
            for other in s2v.get_other_senses(&key)? {
                println!("{other}");
            }
        }
        Command::BestSense { model, words } => {
            let s2v = load(&model)?;
            let word = sense2vec_key::tagged::join_phrase(&words);
            match s2v.get_best_sense(&word)? {
                (text, Some(sense)) => {
                    println!("{}", s2v.codec().make_key(&text, Some(sense.as_str()))?);
                }
                (text, None) => println!("{text} (no senses registered)"),
            }
        }
        Command::Info { model } => {
            let s2v = load(&model)?;
            println!("rows:      {}", s2v.len());
            println!("dimension: {}", s2v.dim());
            println!("delimiter: {}", s2v.config().delimiter);
            println!("senses:    {}", s2v.senses().join(", "));
        }
        Command::Vocab {
            corpus,
            min_count,
            phrases,
            delimiter,
        } => vocab(&corpus, min_count, phrases, delimiter)?,
    }

    Ok(())
}

use clap::Parser as _;

#[derive(clap::Parser)]
#[command(name = "sense2vec")]
#[command(about = "Build and query word-sense vector stores")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Build a store from vectors in word2vec text format
    Import {
        /// Text file with one `key v1 v2 ...` line per vector
        input: std::path::PathBuf,

        /// Directory to write the store to
        output: std::path::PathBuf,

        /// Registered senses, in preference order (defaults to the senses
        /// found in the keys, in order of first appearance)
        #[arg(short, long, value_delimiter = ',')]
        senses: Option<Vec<String>>,

        /// Delimiter between word and sense in keys
        #[arg(short, long, default_value_t = sense2vec::DEFAULT_DELIMITER)]
        delimiter: char,
    },

    /// Write a store's vectors in word2vec text format
    Export {
        /// Store directory
        model: std::path::PathBuf,

        /// Text file to write
        output: std::path::PathBuf,
    },

    /// Find the keys most similar to the given keys
    Similar {
        /// Store directory
        model: std::path::PathBuf,

        /// Query keys, e.g. `duck|NOUN`
        #[arg(required = true)]
        keys: Vec<String>,

        /// Maximum number of results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the other senses stored for a key's word
    Senses {
        /// Store directory
        model: std::path::PathBuf,

        /// Key to start from, e.g. `duck|NOUN`
        key: String,
    },

    /// Guess the sense of a word
    BestSense {
        /// Store directory
        model: std::path::PathBuf,

        /// Word without a sense; several words are joined into one phrase
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Show a store's shape and configuration
    Info {
        /// Store directory
        model: std::path::PathBuf,
    },

    /// Count keys in a pre-tagged corpus, most frequent first
    Vocab {
        /// Text file with one tagged sentence per line
        corpus: std::path::PathBuf,

        /// Drop keys seen fewer times than this
        #[arg(short, long, default_value = "1")]
        min_count: u64,

        /// Only count multi-word phrases such as `ice_cream|NOUN`
        #[arg(long)]
        phrases: bool,

        /// Delimiter between word and sense in tokens
        #[arg(short, long, default_value_t = sense2vec::DEFAULT_DELIMITER)]
        delimiter: char,
    },
}

/// JSON output for similarity results.
#[derive(serde::Serialize)]
struct JsonResult<'a> {
    key: &'a str,
    score: f32,
}

fn load(model: &std::path::Path) -> eyre::Result<sense2vec::Sense2Vec> {
    sense2vec::Sense2Vec::from_disk(model)
        .wrap_err_with(|| format!("failed to load store from {}", model.display()))
}

fn import(
    input: &std::path::Path,
    output: &std::path::Path,
    senses: Option<Vec<String>>,
    delimiter: char,
) -> eyre::Result<()> {
    eprintln!("Importing {} -> {}", input.display(), output.display());

    let file = std::fs::File::open(input)
        .wrap_err_with(|| format!("failed to open {}", input.display()))?;
    let s2v = read_text_vectors(std::io::BufReader::new(file), senses, delimiter)
        .wrap_err_with(|| format!("failed to read vectors from {}", input.display()))?;

    s2v.to_disk(output, sense2vec::Exclude::NONE)
        .wrap_err_with(|| format!("failed to write store to {}", output.display()))?;

    println!(
        "Imported {} vectors of dimension {} ({} senses)",
        s2v.len(),
        s2v.dim(),
        s2v.senses().len()
    );
    Ok(())
}

/// Parse word2vec text format into a store.
///
/// An optional `rows dim` header line is accepted. Vectors are added in file
/// order, which word2vec writes most frequent first.
fn read_text_vectors<R: std::io::BufRead>(
    reader: R,
    senses: Option<Vec<String>>,
    delimiter: char,
) -> eyre::Result<sense2vec::Sense2Vec> {
    let codec = sense2vec::DelimitedKeys::new(delimiter);
    let mut lines = reader.lines().enumerate().peekable();

    let mut capacity = 0;
    if let Some((_, Ok(first))) = lines.peek() {
        if let Some((rows, _dim)) = parse_header(first) {
            capacity = rows;
            lines.next();
        }
    }

    let mut s2v: Option<sense2vec::Sense2Vec> = None;
    let mut found_senses: Vec<String> = Vec::new();

    for (line_no, line) in lines {
        let line = line.wrap_err_with(|| format!("failed to read line {}", line_no + 1))?;
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        let vector = fields
            .map(str::parse::<f32>)
            .collect::<Result<Vec<_>, _>>()
            .wrap_err_with(|| format!("invalid number on line {}", line_no + 1))?;

        if let (_, Some(sense)) = codec.split(key) {
            if !found_senses.iter().any(|s| s == sense) {
                found_senses.push(sense.to_owned());
            }
        }

        let store = s2v.get_or_insert_with(|| {
            let cfg = sense2vec::StoreConfig {
                senses: Vec::new(),
                delimiter,
            };
            sense2vec::Sense2Vec::with_capacity(vector.len(), capacity, cfg)
        });
        store
            .add(key, &vector)
            .wrap_err_with(|| format!("failed to add {key:?} from line {}", line_no + 1))?;

        if store.len() % 100_000 == 0 {
            eprintln!("Read {} vectors...", store.len());
        }
    }

    let Some(mut s2v) = s2v else {
        eyre::bail!("no vectors found");
    };

    s2v.set_senses(senses.unwrap_or(found_senses));
    tracing::info!(rows = s2v.len(), dim = s2v.dim(), senses = ?s2v.senses(), "read text vectors");
    Ok(s2v)
}

/// `rows dim` header of the word2vec text format.
fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut fields = line.split_whitespace();
    let rows = fields.next()?.parse().ok()?;
    let dim = fields.next()?.parse().ok()?;
    fields.next().is_none().then_some((rows, dim))
}

fn export(model: &std::path::Path, output: &std::path::Path) -> eyre::Result<()> {
    let s2v = load(model)?;

    let file = std::fs::File::create(output)
        .wrap_err_with(|| format!("failed to create {}", output.display()))?;
    write_text_vectors(&s2v, std::io::BufWriter::new(file))
        .wrap_err_with(|| format!("failed to write {}", output.display()))?;

    println!("Exported {} vectors to {}", s2v.len(), output.display());
    Ok(())
}

fn write_text_vectors<W: std::io::Write>(
    s2v: &sense2vec::Sense2Vec,
    mut out: W,
) -> eyre::Result<()> {
    writeln!(out, "{} {}", s2v.len(), s2v.dim())?;
    // Row order keeps the frequency ranking intact.
    for &id in s2v.vectors().row_ids() {
        let (Some(key), Some(vector)) = (s2v.strings().lookup_string(id), s2v.vectors().get(id))
        else {
            tracing::warn!(%id, "skipping vector without a key");
            continue;
        };
        write!(out, "{key}")?;
        for value in vector {
            write!(out, " {value}")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn similar(model: &std::path::Path, keys: &[String], limit: usize, json: bool) -> eyre::Result<()> {
    let s2v = load(model)?;

    for key in keys {
        if !s2v.contains(key) {
            eprintln!("Warning: {key} is not in the store, skipping");
        }
    }

    let results = s2v
        .most_similar(keys, limit)
        .wrap_err("similarity search failed")?;

    if json {
        let results: Vec<JsonResult<'_>> = results
            .iter()
            .map(|(key, score)| JsonResult { key, score: *score })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&results).wrap_err("failed to serialize JSON")?
        );
    } else {
        for (key, score) in &results {
            println!("{key}: {score:.4}");
        }
    }

    Ok(())
}

fn vocab(
    corpus: &std::path::Path,
    min_count: u64,
    phrases: bool,
    delimiter: char,
) -> eyre::Result<()> {
    let file = std::fs::File::open(corpus)
        .wrap_err_with(|| format!("failed to open {}", corpus.display()))?;
    let counts = count_keys(std::io::BufReader::new(file), delimiter, phrases)?;

    let mut counts: Vec<(String, u64)> = counts
        .into_iter()
        .filter(|&(_, count)| count >= min_count)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for (key, count) in counts {
        writeln!(out, "{key}\t{count}")?;
    }
    out.flush()?;
    Ok(())
}

/// Count `TEXT|SENSE` tokens in a tagged corpus. Lines that break the
/// format are skipped with a warning. With `phrases_only`, single-word
/// tokens are not counted.
fn count_keys<R: std::io::BufRead>(
    reader: R,
    delimiter: char,
    phrases_only: bool,
) -> eyre::Result<std::collections::HashMap<String, u64>> {
    let codec = sense2vec::DelimitedKeys::new(delimiter);
    let mut counts = std::collections::HashMap::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.wrap_err_with(|| format!("failed to read line {}", line_no + 1))?;
        match sense2vec_key::tagged::parse_sentence(&line, &codec) {
            Ok(tokens) => {
                for token in tokens.iter().filter(|t| !phrases_only || t.is_phrase()) {
                    *counts.entry(token.key.to_owned()).or_insert(0) += 1;
                }
            }
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "skipping malformed line");
            }
        }
    }

    Ok(counts)
}
