//! End-to-end pipeline scenarios

use conveyor::aggregation::{
    group_by_field, group_by_index, group_by_map_key, sort_by_field, sort_by_map_key, sort_slice,
    sort_slice_by_index, sum_all_2d, sum_by_field, sum_by_index, sum_by_map_key, FieldKey,
};
use conveyor::pipeline::{execute, filter, map, restream_slice, Operator};
use conveyor::sink::{CollectSink, DiscardSink, FnSink};
use conveyor::source::{IterSource, LinesSource};
use conveyor::window::{batch, window_by_size};
use conveyor::{LogEvent, LogLevel, PipelineError, Stream, StreamResult};
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const DEADLINE: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_map_to_upper() {
    let sink = CollectSink::<String>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(vec!["hello", "world"]))
        .run(map(|s: &'static str| s.to_uppercase()))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec!["HELLO", "WORLD"]);
}

#[tokio::test]
async fn test_filter_without_o() {
    let sink = CollectSink::<&'static str>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(vec!["HELLO", "WORLD", "HOW", "ARE", "YOU"]))
        .run(filter(|s: &&'static str| !s.contains('O')))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec!["ARE"]);
}

#[tokio::test]
async fn test_batch_then_sum_all_2d() {
    let sink = CollectSink::<f64>::new();
    let collected = sink.collected();
    let rows = vec![vec![10, 70, 20], vec![40, 60, 90], vec![0, 80, 30]];

    Stream::from_source(IterSource::new(rows))
        .run(batch::<Vec<i32>>())
        .run(sum_all_2d::<i32>())
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec![400.0]);
}

#[tokio::test]
async fn test_window_by_size_over_alphabet() {
    let sink = CollectSink::<Vec<char>>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new('A'..='Z'))
        .run(window_by_size::<char>(4))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let windows = collected.take();
    let sizes: Vec<usize> = windows.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![4, 4, 4, 4, 4, 4, 2]);
    assert_eq!(windows[6], vec!['Y', 'Z']);
}

#[tokio::test]
async fn test_group_by_map_key_device() {
    type Row = HashMap<String, String>;
    type Groups = HashMap<String, Vec<Row>>;

    let row = |device: &str, reading: &str| -> Row {
        [
            ("Device".to_string(), device.to_string()),
            ("Reading".to_string(), reading.to_string()),
        ]
        .into_iter()
        .collect()
    };
    let rows = vec![
        row("thermo", "21.5"),
        row("hygro", "40"),
        row("thermo", "22.0"),
        row("baro", "1013"),
    ];

    let sink = CollectSink::<Groups>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(rows))
        .run(batch::<Row>())
        .run(group_by_map_key::<String, String>("Device".to_string()))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let mut emitted = collected.take();
    assert_eq!(emitted.len(), 1);
    let groups = emitted.remove(0);

    let mut devices: Vec<&str> = groups.keys().map(String::as_str).collect();
    devices.sort();
    assert_eq!(devices, vec!["baro", "hygro", "thermo"]);

    let readings: Vec<&str> = groups["thermo"].iter().map(|r| r["Reading"].as_str()).collect();
    assert_eq!(readings, vec!["21.5", "22.0"]);
    assert!(groups
        .iter()
        .all(|(device, rows)| rows.iter().all(|r| &r["Device"] == device)));
}

#[tokio::test]
async fn test_cancel_infinite_source() {
    let sink = CollectSink::<u64>::new();
    let collected = sink.collected();
    let cancel = CancellationToken::new();

    let mut stream = Stream::from_source(IterSource::new(0u64..).with_capacity(8))
        .run(map(|n: u64| n))
        .into_sink(sink);
    let completion = stream.open(&cancel);

    timeout(DEADLINE, async {
        while collected.len() < 100 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    cancel.cancel();

    let result = timeout(DEADLINE, completion).await.unwrap();
    assert!(matches!(result, Err(PipelineError::Cancelled)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let seen = collected.take();
    assert!(seen.len() >= 100);
    assert!(seen.iter().copied().eq(0..seen.len() as u64));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(collected.is_empty());
}

#[tokio::test]
async fn test_empty_source_completes() {
    let sink = CollectSink::<Vec<i32>>::new();
    let collected = sink.collected();
    let op = map(|v: i32| v);
    let stats = op.stats();

    Stream::from_source(IterSource::new(Vec::<i32>::new()))
        .run(op)
        .run(batch::<i32>())
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert!(collected.is_empty());
    assert_eq!(stats.snapshot().items_received, 0);
}

#[tokio::test]
async fn test_single_item_filtered_out() {
    let sink = CollectSink::<i32>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(vec![1]))
        .run(filter(|_: &i32| false))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert!(collected.is_empty());
}

#[tokio::test]
async fn test_many_workers_keep_the_multiset() {
    let sink = CollectSink::<u32>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(0u32..1000))
        .run(map(|n: u32| n * 2).with_concurrency(4))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let mut values = collected.take();
    values.sort_unstable();
    assert_eq!(values, (0u32..1000).map(|n| n * 2).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_chained_identity_maps() {
    let sink = CollectSink::<i32>::new();
    let collected = sink.collected();

    let mut stream = Stream::from_source(IterSource::new(vec![3, 1, 2]));
    for _ in 0..10 {
        stream = stream.run(map(|v: i32| v));
    }
    stream
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec![3, 1, 2]);
}

#[tokio::test]
async fn test_batch_sort_restream() {
    let sink = CollectSink::<i32>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(vec![5, 3, 9, 1]))
        .run(batch::<i32>())
        .run(sort_slice::<i32>())
        .run(restream_slice::<i32>())
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec![1, 3, 5, 9]);
}

#[tokio::test]
async fn test_execute_reroutes_and_reports_errors() {
    let sink = CollectSink::<i32>::new();
    let collected = sink.collected();
    let op = execute(|_ctx: &conveyor::OperatorContext, v: i32| match v {
        0 => StreamResult::skip().with_error("zero"),
        v if v < 0 => StreamResult::reroute(-v),
        v => StreamResult::forward(v),
    });
    let stats = op.stats();

    Stream::from_source(IterSource::new(vec![1, 0, -2, 3]))
        .run(op)
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec![1, 2, 3]);
    assert_eq!(stats.snapshot().item_errors, 1);
}

#[tokio::test]
async fn test_type_mismatches_are_logged_and_dropped() {
    let logs = CollectSink::<LogEvent>::new();
    let events = logs.collected();
    let sink = CollectSink::<String>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(vec![1, 2, 3]))
        .run(map(|s: String| s).with_name("strings-only"))
        .into_sink(sink)
        .with_log_sink(logs)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert!(collected.is_empty());

    let events = events.take();
    let mismatches: Vec<&LogEvent> = events
        .iter()
        .filter(|e| e.message == "type mismatch, item dropped")
        .collect();
    assert_eq!(mismatches.len(), 3);
    assert!(mismatches
        .iter()
        .all(|e| e.attr("stage").and_then(|s| s.as_str()) == Some("strings-only")));
    assert!(events
        .iter()
        .any(|e| e.level == LogLevel::Info && e.message == "stream completed"));
}

#[tokio::test]
async fn test_sink_error_fails_the_stream() {
    let sink = FnSink::new(|v: i32| if v == 3 { Err("bad value") } else { Ok(()) });

    let result = Stream::from_source(IterSource::new(1..=10))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, PipelineError::Execution { .. }));
    assert!(err.to_string().contains("bad value"));
}

#[tokio::test]
async fn test_lines_source_word_count() {
    let text = "the quick fox\nthe lazy dog\n";
    let sink = CollectSink::<HashMap<String, usize>>::new();
    let collected = sink.collected();

    Stream::from_source(LinesSource::words(std::io::Cursor::new(text.as_bytes().to_vec())))
        .run(batch::<String>())
        .run(map(|words: Vec<String>| {
            let mut counts = HashMap::new();
            for word in words {
                *counts.entry(word).or_insert(0usize) += 1;
            }
            counts
        }))
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let counts = collected.take().remove(0);
    assert_eq!(counts["the"], 2);
    assert_eq!(counts["dog"], 1);
    assert_eq!(counts.len(), 5);
}

#[tokio::test]
async fn test_stream_cannot_be_opened_twice() {
    let mut stream = Stream::from_source(IterSource::new(vec![1])).into_sink(DiscardSink::new());
    let token = CancellationToken::new();

    stream.execute(&token).await.unwrap();
    assert!(matches!(
        stream.execute(&token).await,
        Err(PipelineError::StreamEmpty)
    ));
}

/// Batch `rows` into one window, run `op` over it and collect what it emits
async fn over_one_window<R, O>(rows: Vec<R>, op: impl Operator + 'static) -> Vec<O>
where
    R: Any + Send,
    O: Any + Send,
{
    let sink = CollectSink::<O>::new();
    let collected = sink.collected();

    Stream::from_source(IterSource::new(rows))
        .run(batch::<R>())
        .run(op)
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    collected.take()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Reading {
    device: String,
    value: f64,
}

fn reading(device: &str, value: f64) -> Reading {
    Reading {
        device: device.to_string(),
        value,
    }
}

#[tokio::test]
async fn test_index_keyed_window_operators() {
    let rows = || vec![vec![1, 30], vec![2, 20], vec![1, 10], vec![5]];

    let mut grouped: Vec<HashMap<i32, Vec<Vec<i32>>>> =
        over_one_window(rows(), group_by_index::<i32>(1)).await;
    assert_eq!(grouped.len(), 1);
    let groups = grouped.remove(0);
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[&30], vec![vec![1]]);
    assert_eq!(groups[&10], vec![vec![1]]);

    let sums: Vec<f64> = over_one_window(rows(), sum_by_index::<i32>(1)).await;
    assert_eq!(sums, vec![60.0]);

    let sorted: Vec<Vec<Vec<i32>>> = over_one_window(rows(), sort_slice_by_index::<i32>(1)).await;
    assert_eq!(sorted, vec![vec![vec![1, 10], vec![2, 20], vec![1, 30], vec![5]]]);
}

#[tokio::test]
async fn test_field_keyed_window_operators() {
    let rows = || {
        vec![
            reading("thermo", 21.5),
            reading("hygro", 40.0),
            reading("thermo", 19.0),
        ]
    };

    let mut grouped: Vec<HashMap<FieldKey, Vec<Reading>>> =
        over_one_window(rows(), group_by_field::<Reading>("device")).await;
    let groups = grouped.remove(0);
    let thermo = &groups[&FieldKey::String("thermo".to_string())];
    assert_eq!(thermo, &vec![reading("thermo", 21.5), reading("thermo", 19.0)]);
    assert_eq!(groups.len(), 2);

    let sums: Vec<f64> = over_one_window(rows(), sum_by_field::<Reading>("value")).await;
    assert_eq!(sums, vec![80.5]);

    let sorted: Vec<Vec<Reading>> = over_one_window(rows(), sort_by_field::<Reading>("value")).await;
    let values: Vec<f64> = sorted[0].iter().map(|r| r.value).collect();
    assert_eq!(values, vec![19.0, 21.5, 40.0]);
}

#[tokio::test]
async fn test_map_keyed_window_operators() {
    let row = |name: &str, score: i64| -> HashMap<String, i64> {
        [("id".to_string(), name.len() as i64), ("score".to_string(), score)]
            .into_iter()
            .collect()
    };
    let rows = || vec![row("ab", 7), row("abc", 3), HashMap::new(), row("a", 5)];

    let sums: Vec<f64> = over_one_window(rows(), sum_by_map_key::<String, i64>("score".to_string())).await;
    assert_eq!(sums, vec![15.0]);

    let mut sorted: Vec<Vec<HashMap<String, i64>>> =
        over_one_window(rows(), sort_by_map_key::<String, i64>("score".to_string())).await;
    let scores: Vec<Option<i64>> = sorted
        .remove(0)
        .iter()
        .map(|r| r.get("score").copied())
        .collect();
    assert_eq!(scores, vec![Some(3), Some(5), Some(7), None]);
}

#[tokio::test]
async fn test_sort_by_field_skips_window_with_non_record() {
    let sink = CollectSink::<Vec<serde_json::Value>>::new();
    let collected = sink.collected();
    let sort = sort_by_field::<serde_json::Value>("n");
    let stats = sort.stats();
    let rows = vec![json!({"n": 2}), json!({"n": 1}), json!({"n": 3}), json!("plain")];

    Stream::from_source(IterSource::new(rows))
        .run(window_by_size::<serde_json::Value>(2))
        .run(sort)
        .into_sink(sink)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.take(), vec![vec![json!({"n": 1}), json!({"n": 2})]]);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.item_errors, 1);
    assert_eq!(snapshot.type_mismatches, 0);
}

#[tokio::test]
async fn test_zero_size_window_is_rejected() {
    let result = Stream::from_source(IterSource::new(vec![1u8, 2, 3]))
        .run(window_by_size::<u8>(0))
        .into_sink(DiscardSink::new())
        .execute(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(PipelineError::Configuration { .. })));
}
