//! Project command - broadcast projections for an observer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use starfield::coord::ProjectedPoint;

use super::common::{parse_timestamp_ms, to_coordinate, GlobalOverrides};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the project command.
pub struct ProjectArgs {
    pub lat: f64,
    pub lon: f64,
    pub time: Option<String>,
    pub frames: u32,
}

/// Per-worker point counts for the frame in flight.
type FrameCounts = Rc<RefCell<Vec<(usize, usize)>>>;

/// Run the project command.
pub fn run(args: ProjectArgs, overrides: GlobalOverrides) -> Result<(), CliError> {
    let observer = to_coordinate(args.lat, args.lon)?;
    let start_ms = parse_timestamp_ms(args.time.as_deref())?;
    if args.frames == 0 {
        return Err(CliError::InvalidArgument("--frames must be at least 1".into()));
    }

    let runner = CliRunner::new(&overrides)?;
    runner.log_startup("project");

    let counts: FrameCounts = Rc::default();
    let sink_counts = Rc::clone(&counts);
    let sink = move |worker: usize, points: &[ProjectedPoint]| {
        sink_counts.borrow_mut().push((worker, points.len()));
    };

    runner.block_on(async {
        let pool = runner.start_pool(sink).await?;
        let frame_interval = runner.config().pool.frame_interval_ms;

        println!("Observer: {}", observer);
        println!();

        for frame in 0..args.frames {
            let timestamp_ms = start_ms + i64::from(frame) * frame_interval as i64;
            let summary = pool.project_all(observer, timestamp_ms).await;

            let mut per_worker = counts.borrow_mut();
            per_worker.sort_unstable();
            let breakdown: Vec<String> = per_worker
                .drain(..)
                .map(|(worker, n)| format!("w{}={}", worker, n))
                .collect();

            println!(
                "Frame {:>4}: {:>6} points in {} [{}]",
                frame + 1,
                summary.points,
                format_elapsed(summary.elapsed),
                breakdown.join(" ")
            );
            for (worker, reason) in &summary.failed {
                println!("  worker {} failed: {}", worker, reason);
            }
        }

        pool.shutdown();
        Ok::<(), CliError>(())
    })
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}ms", elapsed.as_secs_f64() * 1000.0)
}
