//! Count words read from stdin and print them by frequency
//!
//! Stream settings come from `CONVEYOR_*` environment variables, for example
//! `CONVEYOR_NAME=wc`. Set `RUST_LOG=debug` to see the stream's log bus.
//!
//! Run with: echo "a b a" | cargo run --package conveyor --example word_count

use conveyor::aggregation::sort_with_func;
use conveyor::pipeline::{filter, map, restream_slice};
use conveyor::sink::{FnSink, TracingSink};
use conveyor::source::LinesSource;
use conveyor::window::batch;
use conveyor::{Stream, StreamConfig};
use figment::providers::Env;
use figment::Figment;
use std::collections::HashMap;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = StreamConfig::extract(&Figment::new().merge(Env::prefixed("CONVEYOR_")))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    Stream::from_source(LinesSource::words(BufReader::new(tokio::io::stdin())))
        .with_config(config)
        .run(map(|word: String| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        }))
        .run(filter(|word: &String| !word.is_empty()))
        .run(batch::<String>())
        .run(map(|words: Vec<String>| {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for word in words {
                *counts.entry(word).or_default() += 1;
            }
            counts.into_iter().collect::<Vec<_>>()
        }))
        .run(sort_with_func(|a: &(String, usize), b: &(String, usize)| {
            b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
        }))
        .run(restream_slice::<(String, usize)>())
        .into_sink(FnSink::each(|(word, count): (String, usize)| {
            println!("{count:>7} {word}");
        }))
        .with_log_sink(TracingSink::new())
        .execute(&cancel)
        .await?;

    Ok(())
}
