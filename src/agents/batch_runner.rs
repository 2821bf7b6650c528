use crate::model::{Target, TargetResult};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// Bar style shared by every multi-target loop.
pub fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  [{bar:40}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Workers print their own status lines, so the bar is only drawn when one
/// target runs at a time and it can be suspended around each of them.
fn progress_visible(show_progress: bool, workers: usize) -> bool {
    show_progress && workers == 1
}

fn run_isolated<F>(target: &Target, work: &F) -> TargetResult
where
    F: Fn(&Target) -> TargetResult,
{
    panic::catch_unwind(AssertUnwindSafe(|| work(target))).unwrap_or_else(|_| {
        let mut failed = TargetResult::new(target.clone());
        failed.record_step_error("worker", "panicked while processing target");
        failed
    })
}

/// Runs `work` over every target with at most `jobs` in flight.
///
/// Results come back in enumeration order, one per target. A panicking
/// worker only loses its own target, which is reported as a step error.
pub fn run_targets<F>(targets: &[Target], jobs: usize, show_progress: bool, work: F) -> Vec<TargetResult>
where
    F: Fn(&Target) -> TargetResult + Sync,
{
    if targets.is_empty() {
        return Vec::new();
    }

    let workers = jobs.clamp(1, targets.len());
    let pb = ProgressBar::new(targets.len() as u64);
    if !progress_visible(show_progress, workers) {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(progress_style());

    if workers == 1 {
        let results: Vec<TargetResult> = targets
            .iter()
            .map(|target| {
                pb.set_message(target.name.clone());
                let result = pb.suspend(|| run_isolated(target, &work));
                pb.inc(1);
                result
            })
            .collect();
        pb.finish_and_clear();
        return results;
    }

    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, TargetResult)>();
    let mut slots: Vec<Option<TargetResult>> = vec![None; targets.len()];

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            let work = &work;
            scope.spawn(move || {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(target) = targets.get(index) else {
                        break;
                    };
                    if tx.send((index, run_isolated(target, work))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for (index, result) in rx {
            pb.set_message(result.target_name().to_string());
            pb.inc(1);
            slots[index] = Some(result);
        }
    });
    pb.finish_and_clear();

    slots
        .into_iter()
        .zip(targets)
        .map(|(slot, target)| slot.unwrap_or_else(|| TargetResult::new(target.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn targets(n: usize) -> Vec<Target> {
        (0..n).map(|i| Target::container(format!("wp_site{i}"))).collect()
    }

    #[test]
    fn every_target_runs_exactly_once_in_order() {
        let targets = targets(7);
        let seen = Mutex::new(Vec::new());
        let results = run_targets(&targets, 3, false, |t| {
            seen.lock().unwrap().push(t.name.clone());
            // finish out of order
            if t.name.ends_with('0') {
                thread::sleep(Duration::from_millis(20));
            }
            TargetResult::new(t.clone())
        });

        assert_eq!(results.len(), 7);
        let names: Vec<_> = results.iter().map(|r| r.target_name().to_string()).collect();
        let expected: Vec<_> = targets.iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, expected);

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        let mut sorted = expected.clone();
        sorted.sort();
        assert_eq!(seen, sorted);
    }

    #[test]
    fn panic_is_isolated_to_its_target() {
        let targets = targets(3);
        let results = run_targets(&targets, 2, false, |t| {
            if t.name == "wp_site1" {
                panic!("boom");
            }
            TargetResult::new(t.clone())
        });
        assert_eq!(results.len(), 3);
        assert!(results[0].step_errors.is_empty());
        assert_eq!(results[1].step_errors.len(), 1);
        assert!(results[2].step_errors.is_empty());
    }

    #[test]
    fn sequential_run_isolates_panics_too() {
        let targets = targets(3);
        let results = run_targets(&targets, 1, false, |t| {
            if t.name == "wp_site0" {
                panic!("boom");
            }
            TargetResult::new(t.clone())
        });
        let errors: Vec<_> = results.iter().map(|r| r.step_errors.len()).collect();
        assert_eq!(errors, vec![1, 0, 0]);
    }

    #[test]
    fn bar_is_hidden_while_targets_run_in_parallel() {
        assert!(progress_visible(true, 1));
        assert!(!progress_visible(true, 4));
        assert!(!progress_visible(false, 1));
    }

    #[test]
    fn empty_input_runs_nothing() {
        let results = run_targets(&[], 4, false, |t| TargetResult::new(t.clone()));
        assert!(results.is_empty());
    }
}
