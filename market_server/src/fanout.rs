//! Bounded parallel fetch over a list of symbols.
//!
//! Symbols are queued on a crossbeam channel and drained by a fixed number of scoped
//! worker threads. Results travel back on a second channel tagged with the symbol's
//! position, so the output keeps the input order no matter which worker finished first.

use crossbeam_channel::unbounded;
use std::collections::HashSet;
use std::thread;

/// Run `fetch` for every distinct symbol using at most `workers` threads.
///
/// Returns `(symbol, value)` for each symbol whose fetch produced a value, in the
/// order of first occurrence in `symbols`. A `workers` of zero is treated as one.
pub fn fetch_all<T, F>(symbols: &[String], workers: usize, fetch: F) -> Vec<(String, T)>
where
    T: Send,
    F: Fn(&str) -> Option<T> + Sync,
{
    let mut seen = HashSet::new();
    let unique: Vec<&str> = symbols
        .iter()
        .map(String::as_str)
        .filter(|symbol| seen.insert(*symbol))
        .collect();
    if unique.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, unique.len());
    let (job_tx, job_rx) = unbounded::<(usize, &str)>();
    let (result_tx, result_rx) = unbounded::<(usize, T)>();
    for job in unique.iter().copied().enumerate() {
        // The receiver is alive until the scope below ends.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let fetch = &fetch;
            scope.spawn(move || {
                for (index, symbol) in job_rx.iter() {
                    if let Some(value) = fetch(symbol) {
                        if result_tx.send((index, value)).is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut slots: Vec<Option<T>> = unique.iter().map(|_| None).collect();
    for (index, value) in result_rx.iter() {
        slots[index] = Some(value);
    }
    unique
        .into_iter()
        .zip(slots)
        .filter_map(|(symbol, value)| value.map(|value| (symbol.to_string(), value)))
        .collect()
}
