//! Waypoints command - great-circle path between two points.

use starfield::pool::NullSink;

use super::common::{parse_lat_lon, GlobalOverrides};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the waypoints command.
pub struct WaypointsArgs {
    pub from: String,
    pub to: String,
}

/// Run the waypoints command.
pub fn run(args: WaypointsArgs, overrides: GlobalOverrides) -> Result<(), CliError> {
    let start = parse_lat_lon(&args.from)?;
    let end = parse_lat_lon(&args.to)?;

    let runner = CliRunner::new(&overrides)?;
    runner.log_startup("waypoints");

    runner.block_on(async {
        let pool = runner.start_pool(NullSink).await?;
        let waypoints = pool.find_waypoints(start, end).await;
        pool.shutdown();
        let waypoints = waypoints?;

        println!();
        println!("{} waypoints from {} to {}:", waypoints.len(), start, end);
        for (i, waypoint) in waypoints.iter().enumerate() {
            let (lat, lon) = waypoint.to_degrees();
            println!("  {:>3}  {:>10.5} {:>11.5}", i, lat, lon);
        }
        Ok::<(), CliError>(())
    })
}
