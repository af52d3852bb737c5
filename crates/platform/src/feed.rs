//! Orientation feed threads. Samples go to a sink, normally the event loop proxy,
//! and reach the viewport through the controller on the event-loop thread.

use std::{
    io::{self, BufRead},
    str::FromStr,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use corelib::Orientation;

/// Where roll/pitch/yaw samples come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedMode {
    /// `roll,pitch,yaw` lines on standard input.
    #[default]
    Stdin,
    /// Synthetic slow wobble, for running without a sensor.
    Demo,
    Off,
}

impl FromStr for FeedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "demo" => Ok(Self::Demo),
            "off" | "none" => Ok(Self::Off),
            other => anyhow::bail!("unknown orientation feed '{other}'"),
        }
    }
}

/// Parse feed lines and hand each sample to `sink`. Malformed lines are skipped.
/// Stops when `sink` returns `false` or input ends; returns the number accepted.
pub fn pump_lines<R: BufRead>(reader: R, mut sink: impl FnMut(Orientation) -> bool) -> usize {
    let mut accepted = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Orientation feed read error: {e}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed.parse::<Orientation>() {
            Ok(sample) => {
                accepted += 1;
                if !sink(sample) {
                    break;
                }
            }
            Err(e) => log::debug!("Feed line {} skipped: {e}", line_no + 1),
        }
    }
    accepted
}

/// Attitude for the demo feed at `t` seconds.
pub fn demo_orientation(t: f32) -> Orientation {
    Orientation::new(
        25.0 * (0.7 * t).sin(),
        (30.0 * t) % 360.0,
        10.0 * (0.4 * t).cos(),
    )
}

/// Start the feed thread. `sink` receives every sample and returns `false`
/// once nobody is listening any more.
pub fn spawn_feed(
    mode: FeedMode,
    sink: impl Fn(Orientation) -> bool + Send + 'static,
) -> Result<Option<thread::JoinHandle<()>>> {
    let builder = thread::Builder::new().name("orientation-feed".into());
    let handle = match mode {
        FeedMode::Off => return Ok(None),
        FeedMode::Stdin => builder.spawn(move || {
            let n = pump_lines(io::stdin().lock(), &sink);
            log::info!("Orientation feed closed after {n} samples");
        }),
        FeedMode::Demo => builder.spawn(move || {
            let start = Instant::now();
            while sink(demo_orientation(start.elapsed().as_secs_f32())) {
                thread::sleep(Duration::from_millis(33));
            }
        }),
    }
    .context("Failed to spawn orientation feed thread")?;
    log::info!("Orientation feed started: {mode:?}");
    Ok(Some(handle))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn pumps_valid_lines_and_skips_garbage() {
        let input = "# roll,pitch,yaw\n1,2,3\nbogus\n\n4 5 6\n7,8\n";
        let mut seen = Vec::new();
        let n = pump_lines(Cursor::new(input), |o| {
            seen.push(o);
            true
        });
        assert_eq!(n, 2);
        assert_eq!(
            seen,
            vec![Orientation::new(1.0, 2.0, 3.0), Orientation::new(4.0, 5.0, 6.0)]
        );
    }

    #[test]
    fn stops_when_sink_declines() {
        let n = pump_lines(Cursor::new("1,1,1\n2,2,2\n3,3,3\n"), |_| false);
        assert_eq!(n, 1);
    }

    #[test]
    fn demo_feed_stops_when_sink_closes() {
        use std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let handle = spawn_feed(FeedMode::Demo, move |_| seen.fetch_add(1, Ordering::SeqCst) < 2)
            .unwrap()
            .unwrap();
        handle.join().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn off_feed_spawns_nothing() {
        assert!(spawn_feed(FeedMode::Off, |_| true).unwrap().is_none());
    }

    #[test]
    fn feed_mode_from_str() {
        assert_eq!("STDIN".parse::<FeedMode>().unwrap(), FeedMode::Stdin);
        assert_eq!("demo".parse::<FeedMode>().unwrap(), FeedMode::Demo);
        assert_eq!("none".parse::<FeedMode>().unwrap(), FeedMode::Off);
        assert!("serial".parse::<FeedMode>().is_err());
    }

    #[test]
    fn demo_orientation_is_bounded() {
        for i in 0..100 {
            let o = demo_orientation(i as f32 * 0.37);
            assert!(o.roll.abs() <= 25.0 && o.yaw.abs() <= 10.0);
            assert!((0.0..360.0).contains(&o.pitch));
        }
    }
}
