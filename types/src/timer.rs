use eyre::{ensure, Result};
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

use crate::domain::StartMode;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerMode {
    Stopwatch,
    Pomodoro {
        work_seconds: u32,
        break_seconds: u32,
        cycles: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTransition {
    Tick,
    WorkPeriodComplete,
    BreakPeriodComplete,
    AllCyclesComplete,
}

/// One timed run of focused work, driven by an external once-per-second
/// tick source. `clock` counts up from zero for a stopwatch and down to
/// zero within the current segment for a pomodoro.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusTimer {
    pub mode: TimerMode,
    pub category: String,
    pub status: TimerStatus,
    pub clock: u32,
    pub current_cycle: u32,
    pub on_break: bool,
    pub accumulated_work: u32,
}

impl FocusTimer {
    pub fn start(mode: StartMode, category: String) -> Result<Self> {
        let category = category.trim().to_string();
        ensure!(!category.is_empty(), Error::EmptyCategory);
        let mode = match mode {
            StartMode::Stopwatch => TimerMode::Stopwatch,
            StartMode::Pomodoro {
                work_minutes,
                break_minutes,
                cycles,
            } => {
                ensure!(
                    work_minutes >= 1 && break_minutes >= 1 && cycles >= 1,
                    Error::InvalidTimerSettings
                );
                TimerMode::Pomodoro {
                    work_seconds: work_minutes * 60,
                    break_seconds: break_minutes * 60,
                    cycles,
                }
            }
        };
        let clock = match mode {
            TimerMode::Stopwatch => 0,
            TimerMode::Pomodoro { work_seconds, .. } => work_seconds,
        };
        Ok(FocusTimer {
            mode,
            category,
            status: TimerStatus::Running,
            clock,
            current_cycle: 1,
            on_break: false,
            accumulated_work: 0,
        })
    }

    pub fn pause(&mut self) -> Result<()> {
        ensure!(self.status == TimerStatus::Running, Error::TimerNotRunning);
        self.status = TimerStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        ensure!(self.status == TimerStatus::Paused, Error::TimerNotPaused);
        self.status = TimerStatus::Running;
        Ok(())
    }

    pub fn total_cycles(&self) -> u32 {
        match self.mode {
            TimerMode::Stopwatch => 0,
            TimerMode::Pomodoro { cycles, .. } => cycles,
        }
    }

    // processes one second of simulated time; a machine that is not
    // running ignores the tick
    pub fn tick(&mut self) -> TimerTransition {
        if self.status != TimerStatus::Running {
            return TimerTransition::Tick;
        }
        match self.mode {
            TimerMode::Stopwatch => {
                self.clock += 1;
                TimerTransition::Tick
            }
            TimerMode::Pomodoro {
                work_seconds,
                break_seconds,
                cycles,
            } => {
                self.clock = self.clock.saturating_sub(1);
                if self.clock > 0 {
                    return TimerTransition::Tick;
                }
                if self.on_break {
                    if self.current_cycle < cycles {
                        self.current_cycle += 1;
                        self.on_break = false;
                        self.clock = work_seconds;
                        TimerTransition::BreakPeriodComplete
                    } else {
                        self.status = TimerStatus::Finished;
                        TimerTransition::AllCyclesComplete
                    }
                } else {
                    self.accumulated_work += work_seconds;
                    if self.current_cycle < cycles {
                        self.on_break = true;
                        self.clock = break_seconds;
                        TimerTransition::WorkPeriodComplete
                    } else {
                        self.status = TimerStatus::Finished;
                        TimerTransition::AllCyclesComplete
                    }
                }
            }
        }
    }

    // the duration that would be persisted if the run was saved now;
    // break time never counts towards it
    pub fn save_duration(&self) -> Result<u32> {
        ensure!(!self.category.is_empty(), Error::EmptyCategory);
        let duration = match self.mode {
            TimerMode::Stopwatch => self.clock,
            TimerMode::Pomodoro { work_seconds, .. } => {
                let in_progress = if self.status != TimerStatus::Finished && !self.on_break {
                    work_seconds - self.clock
                } else {
                    0
                };
                self.accumulated_work + in_progress
            }
        };
        ensure!(duration >= 1, Error::NothingToSave);
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pomodoro(work_minutes: u32, break_minutes: u32, cycles: u32) -> StartMode {
        StartMode::Pomodoro {
            work_minutes,
            break_minutes,
            cycles,
        }
    }

    #[test]
    fn stopwatch_counts_up_and_saves_elapsed_time() -> Result<()> {
        let mut timer = FocusTimer::start(StartMode::Stopwatch, "Work".to_string())?;
        for _ in 0..90 {
            assert_eq!(timer.tick(), TimerTransition::Tick);
        }
        assert_eq!(timer.clock, 90);
        assert_eq!(timer.save_duration()?, 90);
        Ok(())
    }

    #[test]
    fn start_rejects_blank_category() {
        let result = FocusTimer::start(StartMode::Stopwatch, "   ".to_string());
        assert_eq!(
            result.unwrap_err().to_string(),
            Error::EmptyCategory.to_string()
        );
    }

    #[rstest]
    #[case(0, 5, 4)]
    #[case(25, 0, 4)]
    #[case(25, 5, 0)]
    fn start_rejects_invalid_pomodoro_settings(
        #[case] work_minutes: u32,
        #[case] break_minutes: u32,
        #[case] cycles: u32,
    ) {
        let result = FocusTimer::start(
            pomodoro(work_minutes, break_minutes, cycles),
            "Work".to_string(),
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            Error::InvalidTimerSettings.to_string()
        );
    }

    #[test]
    fn category_is_trimmed_on_start() -> Result<()> {
        let timer = FocusTimer::start(StartMode::Stopwatch, "  Deep Work  ".to_string())?;
        assert_eq!(timer.category, "Deep Work");
        Ok(())
    }

    #[test]
    fn pomodoro_runs_through_all_cycles_and_accumulates_work_only() -> Result<()> {
        let mut timer = FocusTimer::start(pomodoro(25, 5, 2), "Study".to_string())?;
        assert_eq!(timer.clock, 1500);

        // first work segment
        for _ in 0..1499 {
            assert_eq!(timer.tick(), TimerTransition::Tick);
        }
        assert_eq!(timer.tick(), TimerTransition::WorkPeriodComplete);
        assert_eq!(timer.accumulated_work, 1500);
        assert!(timer.on_break);
        assert_eq!(timer.clock, 300);

        // break
        for _ in 0..299 {
            assert_eq!(timer.tick(), TimerTransition::Tick);
        }
        assert_eq!(timer.tick(), TimerTransition::BreakPeriodComplete);
        assert_eq!(timer.current_cycle, 2);
        assert!(!timer.on_break);
        assert_eq!(timer.clock, 1500);

        // second work segment ends the run
        for _ in 0..1499 {
            assert_eq!(timer.tick(), TimerTransition::Tick);
        }
        assert_eq!(timer.tick(), TimerTransition::AllCyclesComplete);
        assert_eq!(timer.status, TimerStatus::Finished);
        assert_eq!(timer.accumulated_work, 3000);
        assert_eq!(timer.save_duration()?, 3000);
        Ok(())
    }

    #[test]
    fn partial_work_segment_saves_elapsed_work_time() -> Result<()> {
        let mut timer = FocusTimer::start(pomodoro(25, 5, 4), "Study".to_string())?;
        for _ in 0..600 {
            timer.tick();
        }
        assert_eq!(timer.clock, 900);
        assert_eq!(timer.accumulated_work, 0);
        assert_eq!(timer.save_duration()?, 600);
        Ok(())
    }

    #[test]
    fn break_time_is_excluded_from_the_saved_duration() -> Result<()> {
        let mut timer = FocusTimer::start(pomodoro(1, 1, 2), "Reading".to_string())?;
        for _ in 0..60 {
            timer.tick();
        }
        assert!(timer.on_break);
        // part-way through the break, only the finished work counts
        for _ in 0..30 {
            timer.tick();
        }
        assert_eq!(timer.save_duration()?, 60);
        Ok(())
    }

    #[test]
    fn saving_before_any_work_fails() -> Result<()> {
        let timer = FocusTimer::start(pomodoro(25, 5, 4), "Study".to_string())?;
        assert_eq!(
            timer.save_duration().unwrap_err().to_string(),
            Error::NothingToSave.to_string()
        );

        let stopwatch = FocusTimer::start(StartMode::Stopwatch, "Work".to_string())?;
        assert_eq!(
            stopwatch.save_duration().unwrap_err().to_string(),
            Error::NothingToSave.to_string()
        );
        Ok(())
    }

    #[test]
    fn paused_machine_ignores_ticks() -> Result<()> {
        let mut timer = FocusTimer::start(pomodoro(25, 5, 4), "Study".to_string())?;
        timer.tick();
        timer.pause()?;
        let before = timer.clone();
        timer.tick();
        assert_eq!(timer, before);
        timer.resume()?;
        timer.tick();
        assert_eq!(timer.clock, 1498);
        Ok(())
    }

    #[test]
    fn pause_and_resume_require_the_matching_status() -> Result<()> {
        let mut timer = FocusTimer::start(StartMode::Stopwatch, "Work".to_string())?;
        assert_eq!(
            timer.resume().unwrap_err().to_string(),
            Error::TimerNotPaused.to_string()
        );
        timer.pause()?;
        assert_eq!(
            timer.pause().unwrap_err().to_string(),
            Error::TimerNotRunning.to_string()
        );
        Ok(())
    }

    #[test]
    fn single_cycle_pomodoro_finishes_without_a_break() -> Result<()> {
        let mut timer = FocusTimer::start(pomodoro(1, 1, 1), "Exercise".to_string())?;
        for _ in 0..59 {
            assert_eq!(timer.tick(), TimerTransition::Tick);
        }
        assert_eq!(timer.tick(), TimerTransition::AllCyclesComplete);
        assert_eq!(timer.status, TimerStatus::Finished);
        assert_eq!(timer.save_duration()?, 60);
        Ok(())
    }
}
