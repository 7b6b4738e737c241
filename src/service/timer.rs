use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eyre::{ensure, ContextCompat, Result};
use log::{debug, error};
use serde::Serialize;
use socketioxide::SocketIo;
use sqlx::types::Uuid;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use types::domain::{FocusSession, ServiceEvent, StartTimerRequest};
use types::error::Error;
use types::state::{SharedTimerState, TickUpdate, Timestamped};
use types::timer::{FocusTimer, TimerStatus, TimerTransition};

use crate::repository::categories::CategoryRepository;
use crate::repository::sessions::FocusSessionRepository;
use crate::repository::timers::ActiveTimerRepository;

pub const TIMER_NAMESPACE: &str = "/timer";

#[derive(Clone)]
pub struct TimerService {
    pub timer_repository: ActiveTimerRepository,
    pub session_repository: Arc<FocusSessionRepository>,
    pub category_repository: Arc<CategoryRepository>,
    pub io: SocketIo,
}

impl TimerService {
    pub fn state(&self, user_id: Uuid) -> SharedTimerState {
        self.timer_repository
            .get(user_id)
            .map(|timer| SharedTimerState::from_timer(&timer))
            .unwrap_or_else(SharedTimerState::idle)
    }

    pub async fn start(
        &self,
        user_id: Uuid,
        request: StartTimerRequest,
    ) -> Result<SharedTimerState> {
        ensure!(
            !self.timer_repository.contains(user_id),
            Error::TimerAlreadyRunning
        );
        let timer = FocusTimer::start(request.mode, request.category)?;
        let state = SharedTimerState::from_timer(&timer);
        self.timer_repository.insert(user_id, timer);
        self.timer_repository
            .set_ticker(user_id, self.spawn_ticker(user_id));
        self.emit(user_id, ServiceEvent::Timer, &state).await;
        Ok(state)
    }

    pub async fn pause(&self, user_id: Uuid) -> Result<SharedTimerState> {
        // stop the tick source before touching the machine so no tick
        // lands on a paused timer
        self.timer_repository.stop_ticker(user_id);
        let state = {
            let mut timer = self
                .timer_repository
                .get_mut_lock(user_id)
                .wrap_err(Error::NoActiveTimer)?;
            timer.pause()?;
            SharedTimerState::from_timer(&timer)
        };
        self.emit(user_id, ServiceEvent::Timer, &state).await;
        Ok(state)
    }

    pub async fn resume(&self, user_id: Uuid) -> Result<SharedTimerState> {
        let state = {
            let mut timer = self
                .timer_repository
                .get_mut_lock(user_id)
                .wrap_err(Error::NoActiveTimer)?;
            timer.resume()?;
            SharedTimerState::from_timer(&timer)
        };
        self.timer_repository
            .set_ticker(user_id, self.spawn_ticker(user_id));
        self.emit(user_id, ServiceEvent::Timer, &state).await;
        Ok(state)
    }

    pub async fn reset(&self, user_id: Uuid) -> Result<SharedTimerState> {
        self.timer_repository.stop_ticker(user_id);
        self.timer_repository
            .remove(user_id)
            .wrap_err(Error::NoActiveTimer)?;
        let state = SharedTimerState::idle();
        self.emit(user_id, ServiceEvent::Timer, &state).await;
        Ok(state)
    }

    // persists the run; on failure the machine is left exactly as it
    // was so the user can retry
    pub async fn save(&self, user_id: Uuid) -> Result<FocusSession> {
        let (category, duration) = {
            let timer = self
                .timer_repository
                .get(user_id)
                .wrap_err(Error::NoActiveTimer)?;
            (timer.category.clone(), timer.save_duration()?)
        };
        let session = self.persist(user_id, category, duration as i32).await?;
        self.timer_repository.stop_ticker(user_id);
        let _ = self.timer_repository.remove(user_id);
        self.emit(user_id, ServiceEvent::Saved, &session).await;
        self.emit(user_id, ServiceEvent::Timer, &SharedTimerState::idle())
            .await;
        Ok(session)
    }

    fn spawn_ticker(&self, user_id: Uuid) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                match service.advance(user_id).await {
                    Ok(true) => {}
                    Ok(false) => return,
                    Err(e) => {
                        error!("timer tick failed for {}: {:?}", user_id, e);
                        return;
                    }
                }
            }
        })
    }

    // one second of simulated time; returns whether the tick source
    // should keep firing
    pub(crate) async fn advance(&self, user_id: Uuid) -> Result<bool> {
        let (transition, state) = {
            let mut timer = match self.timer_repository.get_mut_lock(user_id) {
                Some(timer) => timer,
                None => return Ok(false),
            };
            if timer.status != TimerStatus::Running {
                return Ok(false);
            }
            let transition = timer.tick();
            (transition, SharedTimerState::from_timer(&timer))
        };

        match transition {
            TimerTransition::Tick => {
                self.emit(user_id, ServiceEvent::Tick, &TickUpdate::from(&state))
                    .await;
                Ok(true)
            }
            TimerTransition::WorkPeriodComplete => {
                self.emit(user_id, ServiceEvent::WorkComplete, &state).await;
                Ok(true)
            }
            TimerTransition::BreakPeriodComplete => {
                self.emit(user_id, ServiceEvent::BreakComplete, &state)
                    .await;
                Ok(true)
            }
            TimerTransition::AllCyclesComplete => {
                self.emit(user_id, ServiceEvent::AllComplete, &state).await;
                self.save_finished_run(user_id).await;
                Ok(false)
            }
        }
    }

    // the last work segment just ended; persist the run and clear the
    // machine, leaving it in place when the write fails so an explicit
    // save can retry
    async fn save_finished_run(&self, user_id: Uuid) {
        let (category, duration) = {
            let timer = match self.timer_repository.get(user_id) {
                Some(timer) => timer,
                None => return,
            };
            match timer.save_duration() {
                Ok(duration) => (timer.category.clone(), duration),
                Err(e) => {
                    self.emit(user_id, ServiceEvent::ServiceError, &e.to_string())
                        .await;
                    return;
                }
            }
        };
        match self.persist(user_id, category, duration as i32).await {
            Ok(session) => {
                debug!("user {} completed a run of {} seconds", user_id, duration);
                let _ = self.timer_repository.remove(user_id);
                self.emit(user_id, ServiceEvent::Saved, &session).await;
                self.emit(user_id, ServiceEvent::Timer, &SharedTimerState::idle())
                    .await;
            }
            Err(e) => {
                error!("failed to persist completed run for {}: {:?}", user_id, e);
                self.emit(user_id, ServiceEvent::ServiceError, &e.to_string())
                    .await;
            }
        }
    }

    async fn persist(
        &self,
        user_id: Uuid,
        category: String,
        duration_seconds: i32,
    ) -> Result<FocusSession> {
        self.category_repository
            .ensure(user_id, category.clone())
            .await?;
        self.session_repository
            .create(user_id, Utc::now(), duration_seconds, category)
            .await
    }

    async fn emit<T: ?Sized + Serialize>(&self, user_id: Uuid, event: ServiceEvent, data: &T) {
        if let Some(operator) = self.io.of(TIMER_NAMESPACE) {
            let result = operator
                .to(user_id.to_string())
                .emit(event, &Timestamped::new(data))
                .await;
            if let Err(e) = result {
                error!("error occurred when emitting to {}: {:?}", user_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socketioxide::extract::SocketRef;
    use std::sync::atomic::{AtomicI32, Ordering};
    use types::domain::StartMode;

    fn test_io() -> SocketIo {
        let (_, io) = SocketIo::new_layer();
        io.ns(TIMER_NAMESPACE, |_: SocketRef| async {});
        io
    }

    fn service_with(session_repository: FocusSessionRepository) -> TimerService {
        let mut category_repository = CategoryRepository::faux();
        faux::when!(category_repository.ensure).then(|(_, _)| Ok(()));
        TimerService {
            timer_repository: ActiveTimerRepository::new(),
            session_repository: Arc::new(session_repository),
            category_repository: Arc::new(category_repository),
            io: test_io(),
        }
    }

    fn recording_session_repository(saved: Arc<AtomicI32>) -> FocusSessionRepository {
        let mut session_repository = FocusSessionRepository::faux();
        faux::when!(session_repository.create).then(move |(_, time, duration_seconds, category)| {
            saved.store(duration_seconds, Ordering::SeqCst);
            Ok(FocusSession {
                time,
                duration_seconds,
                category,
            })
        });
        session_repository
    }

    fn stopwatch(category: &str) -> StartTimerRequest {
        StartTimerRequest {
            category: category.to_string(),
            mode: StartMode::Stopwatch,
        }
    }

    fn pomodoro(work_minutes: u32, break_minutes: u32, cycles: u32) -> StartTimerRequest {
        StartTimerRequest {
            category: "Study".to_string(),
            mode: StartMode::Pomodoro {
                work_minutes,
                break_minutes,
                cycles,
            },
        }
    }

    #[tokio::test]
    async fn saving_a_stopwatch_persists_the_elapsed_seconds() -> Result<()> {
        let saved = Arc::new(AtomicI32::new(0));
        let service = service_with(recording_session_repository(saved.clone()));
        let user_id = Uuid::from_u128(1);

        service.start(user_id, stopwatch("Work")).await?;
        service.timer_repository.stop_ticker(user_id);
        for _ in 0..90 {
            service.advance(user_id).await?;
        }
        let session = service.save(user_id).await?;

        assert_eq!(session.duration_seconds, 90);
        assert_eq!(saved.load(Ordering::SeqCst), 90);
        assert_eq!(service.state(user_id).status, "idle");
        Ok(())
    }

    #[tokio::test]
    async fn a_failed_save_keeps_the_timer_intact() -> Result<()> {
        let mut session_repository = FocusSessionRepository::faux();
        faux::when!(session_repository.create).then(|(_, _, _, _)| eyre::bail!("store unreachable"));
        let service = service_with(session_repository);
        let user_id = Uuid::from_u128(1);

        service.start(user_id, stopwatch("Work")).await?;
        service.timer_repository.stop_ticker(user_id);
        for _ in 0..30 {
            service.advance(user_id).await?;
        }
        assert!(service.save(user_id).await.is_err());

        let state = service.state(user_id);
        assert_eq!(state.status, "running");
        assert_eq!(state.clock_seconds, 30);
        Ok(())
    }

    #[tokio::test]
    async fn a_zero_second_save_never_reaches_the_store() -> Result<()> {
        // any call on the unstubbed session repository would panic
        let service = service_with(FocusSessionRepository::faux());
        let user_id = Uuid::from_u128(1);

        service.start(user_id, stopwatch("Work")).await?;
        service.timer_repository.stop_ticker(user_id);
        let result = service.save(user_id).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            Error::NothingToSave.to_string()
        );
        assert_eq!(service.state(user_id).status, "running");
        Ok(())
    }

    #[tokio::test]
    async fn a_completed_pomodoro_run_saves_itself() -> Result<()> {
        let saved = Arc::new(AtomicI32::new(0));
        let service = service_with(recording_session_repository(saved.clone()));
        let user_id = Uuid::from_u128(1);

        service.start(user_id, pomodoro(1, 1, 2)).await?;
        service.timer_repository.stop_ticker(user_id);
        // 60s work, 60s break, then the final 60s work segment
        for _ in 0..179 {
            assert!(service.advance(user_id).await?);
        }
        assert!(!service.advance(user_id).await?);

        assert_eq!(saved.load(Ordering::SeqCst), 120);
        assert_eq!(service.state(user_id).status, "idle");
        Ok(())
    }

    #[tokio::test]
    async fn starting_a_second_timer_conflicts() -> Result<()> {
        let service = service_with(FocusSessionRepository::faux());
        let user_id = Uuid::from_u128(1);

        service.start(user_id, stopwatch("Work")).await?;
        service.timer_repository.stop_ticker(user_id);
        let result = service.start(user_id, pomodoro(25, 5, 4)).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            Error::TimerAlreadyRunning.to_string()
        );
        Ok(())
    }

    #[tokio::test]
    async fn pausing_holds_the_clock_until_resume() -> Result<()> {
        let service = service_with(FocusSessionRepository::faux());
        let user_id = Uuid::from_u128(1);

        service.start(user_id, stopwatch("Work")).await?;
        service.timer_repository.stop_ticker(user_id);
        for _ in 0..5 {
            service.advance(user_id).await?;
        }
        service.pause(user_id).await?;

        // a paused machine ignores ticks entirely
        assert!(!service.advance(user_id).await?);
        let state = service.state(user_id);
        assert_eq!(state.status, "paused");
        assert_eq!(state.clock_seconds, 5);

        service.resume(user_id).await?;
        service.timer_repository.stop_ticker(user_id);
        service.advance(user_id).await?;
        assert_eq!(service.state(user_id).clock_seconds, 6);
        Ok(())
    }

    #[tokio::test]
    async fn reset_discards_the_run_without_persisting() -> Result<()> {
        let service = service_with(FocusSessionRepository::faux());
        let user_id = Uuid::from_u128(1);

        service.start(user_id, stopwatch("Work")).await?;
        service.timer_repository.stop_ticker(user_id);
        for _ in 0..10 {
            service.advance(user_id).await?;
        }
        service.reset(user_id).await?;

        assert_eq!(service.state(user_id).status, "idle");
        assert_eq!(
            service.reset(user_id).await.unwrap_err().to_string(),
            Error::NoActiveTimer.to_string()
        );
        Ok(())
    }
}
