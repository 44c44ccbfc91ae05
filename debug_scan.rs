// Run with: cargo run --example debug_scan -- /path/to/titles
// Steps the title scanner synchronously and reports slow filesystem operations.

use lithium_core::{PageConfig, ScanEvent, ScanWorker, SortMode, StepOutcome, config::ScanSettings};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn main() {
    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    let paths = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    };

    println!("Scanning: {:?}", paths);

    let page = PageConfig {
        name: "debug".to_string(),
        paths,
        sort: SortMode::Name,
        recent: false,
    };
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut worker = ScanWorker::new(vec![page], ScanSettings::default(), tx);

    let start = Instant::now();
    let mut steps = 0u64;
    let mut slowest = Duration::ZERO;

    loop {
        let step_start = Instant::now();
        let outcome = worker.step();
        let took = step_start.elapsed();
        steps += 1;
        slowest = slowest.max(took);

        if took > Duration::from_millis(50) {
            println!(
                "[{:>6.1}s] slow step #{} took {:.1}ms",
                start.elapsed().as_secs_f64(),
                steps,
                took.as_secs_f64() * 1000.0
            );
        }

        for event in rx.try_iter() {
            match event {
                ScanEvent::TitleFound { record, .. } => println!(
                    "[{:>6.1}s] {:<40} {:<12} {}",
                    start.elapsed().as_secs_f64(),
                    record.title,
                    record.source.as_str(),
                    record.folder.display()
                ),
                ScanEvent::Progress(p) => println!(
                    "[{:>6.1}s] finished root dirs={} titles={} errors={} path={:?}",
                    start.elapsed().as_secs_f64(),
                    p.dirs_scanned,
                    p.titles_found,
                    p.errors,
                    p.current_path.unwrap_or_default()
                ),
                ScanEvent::SortPage { .. } => {
                    println!("[{:>6.1}s] SORT", start.elapsed().as_secs_f64());
                }
                ScanEvent::PassComplete(_) => {
                    println!("[{:>6.1}s] COMPLETED", start.elapsed().as_secs_f64());
                }
                ScanEvent::PageCleared { .. } => {}
            }
        }

        if outcome != StepOutcome::Worked {
            break;
        }
    }

    let p = worker.progress();
    println!(
        "\nFinal: {} titles, {} dirs, {} errors, {} steps, slowest step {:.1}ms",
        p.titles_found,
        p.dirs_scanned,
        p.errors,
        steps,
        slowest.as_secs_f64() * 1000.0
    );
}
