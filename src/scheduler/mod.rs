/// 경매 카운트다운 타이머와 쿨다운 스케줄러
/// 타이머는 상태를 직접 바꾸지 않고, 코디네이터 큐에 명령만 넣는다.
// region:    --- Imports
use crate::auction::coordinator::Command;
use tokio::sync::mpsc::WeakSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant};
use tracing::debug;

// endregion: --- Imports

// region:    --- Countdown Timer
/// 진행 중인 경매당 하나만 존재하는 1초 주기 타이머
pub struct CountdownTimer {
    period: Duration,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl CountdownTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
            generation: 0,
        }
    }

    /// 타이머 시작. 기존 타이머는 먼저 취소한다.
    pub fn start(&mut self, commands: WeakSender<Command>) -> u64 {
        self.stop();
        self.generation += 1;
        let generation = self.generation;
        let period = self.period;

        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands.send(Command::Tick { generation }).await.is_err() {
                    break;
                }
            }
        }));
        debug!("{:<12} --> 타이머 시작: generation={}", "Timer", generation);
        generation
    }

    /// 타이머 정지. 실행 중이 아니면 아무것도 하지 않는다.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("{:<12} --> 타이머 정지: generation={}", "Timer", self.generation);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// 큐에 남아 있던 이전 타이머의 틱인지 확인
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation == generation
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

// endregion: --- Countdown Timer

// region:    --- Cooldown
/// 결과 표시 후 대기 상태 복귀 예약
pub fn schedule_cooldown(commands: WeakSender<Command>, delay: Duration, round: u64) {
    tokio::spawn(async move {
        sleep(delay).await;
        if let Some(commands) = commands.upgrade() {
            let _ = commands.send(Command::CooldownElapsed { round }).await;
        }
    });
}

// endregion: --- Cooldown

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_after_start() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = CountdownTimer::new(Duration::from_secs(1));
        let generation = timer.start(tx.downgrade());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let mut ticks = 0;
        while let Ok(command) = rx.try_recv() {
            assert!(matches!(command, Command::Tick { generation: g } if g == generation));
            ticks += 1;
        }
        assert_eq!(ticks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_invalidates_previous_generation() {
        let (tx, _rx) = mpsc::channel(8);
        let mut timer = CountdownTimer::new(Duration::from_secs(1));
        let first = timer.start(tx.downgrade());
        let second = timer.start(tx.downgrade());
        assert!(!timer.is_current(first));
        assert!(timer.is_current(second));

        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
        assert!(!timer.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timer = CountdownTimer::new(Duration::from_secs(1));
        timer.start(tx.downgrade());
        timer.stop();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(8);
        schedule_cooldown(tx.downgrade(), Duration::from_secs(3), 4);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(rx.try_recv(), Ok(Command::CooldownElapsed { round: 4 })));
    }
}
