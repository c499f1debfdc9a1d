#![allow(async_fn_in_trait)]

use std::{error::Error, time::Duration};

use tokio::time::Instant;

/// Snapshot of the controller status word.
pub trait MotorState {
    /// Limit at the low end of travel.
    fn start_switch(&self) -> bool;
    /// Limit at the high end of travel.
    fn end_switch(&self) -> bool;
    fn is_moving(&self) -> bool;
}

/// Linear stage addressed in real units (mm).
pub trait LinearStage {
    type Error: Error + Send + Sync + 'static;
    type State: MotorState;

    /// Freshly requested position.
    async fn position(&self) -> Result<f64, Self::Error>;
    async fn state(&self) -> Result<Self::State, Self::Error>;
    async fn to_device_units(&self, position: f64) -> Result<i32, Self::Error>;

    /// Starts an absolute move and returns without waiting for it to finish.
    async fn start_move(&self, device_units: i32) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleParams {
    pub poll_interval: Duration,
    pub position_window: f64,
    pub time_limit: Duration,
}

impl Default for SettleParams {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            position_window: 0.01,
            time_limit: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettleError<E: Error + 'static> {
    #[error(transparent)]
    Stage(E),

    #[error(
        "Stage did not settle at {target:.4} mm within {time_limit:?} (last position {last_position:.4} mm)"
    )]
    Timeout {
        target: f64,
        last_position: f64,
        time_limit: Duration,
    },

    #[error("Stage stopped on a limit switch at {position:.4} mm before reaching {target:.4} mm")]
    LimitSwitch { target: f64, position: f64 },
}

/// Polls the stage until it has stopped inside the position window around
/// `target`. A stage resting on the limit switch on the way to `target` fails
/// immediately.
pub async fn wait_until_settled<S: LinearStage>(
    stage: &S,
    target: f64,
    params: &SettleParams,
) -> Result<f64, SettleError<S::Error>> {
    let start_time = Instant::now();

    loop {
        let state = stage.state().await.map_err(SettleError::Stage)?;
        let position = stage.position().await.map_err(SettleError::Stage)?;
        let error = position - target;

        if !state.is_moving() {
            if error.abs() <= params.position_window {
                tracing::debug!(target_mm = target, position, "Stage settled");
                return Ok(position);
            }

            let blocked = if error < 0.0 {
                state.end_switch()
            } else {
                state.start_switch()
            };
            if blocked {
                return Err(SettleError::LimitSwitch { target, position });
            }
        }

        if start_time.elapsed() > params.time_limit {
            return Err(SettleError::Timeout {
                target,
                last_position: position,
                time_limit: params.time_limit,
            });
        }

        tokio::time::sleep(params.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        convert::Infallible,
    };

    use super::*;

    #[derive(Debug, Clone, Copy, Default)]
    struct Switches {
        moving: bool,
        start: bool,
        end: bool,
    }

    impl MotorState for Switches {
        fn start_switch(&self) -> bool {
            self.start
        }

        fn end_switch(&self) -> bool {
            self.end
        }

        fn is_moving(&self) -> bool {
            self.moving
        }
    }

    /// Replays a fixed trajectory, one sample per poll; the last sample repeats.
    struct Trajectory {
        samples: RefCell<VecDeque<(Switches, f64)>>,
        current: Cell<(Switches, f64)>,
    }

    impl Trajectory {
        fn new(samples: &[(bool, f64)]) -> Self {
            let samples: Vec<_> = samples
                .iter()
                .map(|&(moving, position)| {
                    (
                        Switches {
                            moving,
                            ..Default::default()
                        },
                        position,
                    )
                })
                .collect();
            Self::with_switches(&samples)
        }

        fn with_switches(samples: &[(Switches, f64)]) -> Self {
            Self {
                samples: RefCell::new(samples.iter().copied().collect()),
                current: Cell::new(samples[0]),
            }
        }
    }

    impl LinearStage for Trajectory {
        type Error = Infallible;
        type State = Switches;

        async fn position(&self) -> Result<f64, Infallible> {
            Ok(self.current.get().1)
        }

        async fn state(&self) -> Result<Switches, Infallible> {
            if let Some(sample) = self.samples.borrow_mut().pop_front() {
                self.current.set(sample);
            }
            Ok(self.current.get().0)
        }

        async fn to_device_units(&self, position: f64) -> Result<i32, Infallible> {
            Ok((position * 1000.0) as i32)
        }

        async fn start_move(&self, _device_units: i32) -> Result<(), Infallible> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_stopped_inside_window() {
        let stage = Trajectory::new(&[(true, 0.0), (true, 0.6), (true, 0.95), (false, 1.0005)]);
        let position = wait_until_settled(&stage, 1.0, &SettleParams::default())
            .await
            .unwrap();
        assert_eq!(position, 1.0005);
    }

    #[tokio::test(start_paused = true)]
    async fn stationary_outside_window_keeps_waiting_until_timeout() {
        let stage = Trajectory::new(&[(false, 0.5)]);
        let params = SettleParams {
            time_limit: Duration::from_secs(2),
            ..Default::default()
        };

        match wait_until_settled(&stage, 1.0, &params).await {
            Err(SettleError::Timeout {
                target,
                last_position,
                ..
            }) => {
                assert_eq!(target, 1.0);
                assert_eq!(last_position, 0.5);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn moving_through_target_is_not_settled() {
        let stage = Trajectory::new(&[(true, 1.0), (true, 1.0), (false, 1.0)]);
        let params = SettleParams::default();
        let started = Instant::now();

        wait_until_settled(&stage, 1.0, &params).await.unwrap();
        assert_eq!(started.elapsed(), params.poll_interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_on_end_switch_short_of_target_fails_fast() {
        let moving = Switches {
            moving: true,
            ..Default::default()
        };
        let parked = Switches {
            end: true,
            ..Default::default()
        };
        let stage = Trajectory::with_switches(&[(moving, 20.0), (moving, 24.0), (parked, 25.0)]);
        let params = SettleParams::default();
        let started = Instant::now();

        match wait_until_settled(&stage, 30.0, &params).await {
            Err(SettleError::LimitSwitch { target, position }) => {
                assert_eq!(target, 30.0);
                assert_eq!(position, 25.0);
            }
            other => panic!("expected limit switch, got {other:?}"),
        }
        assert_eq!(started.elapsed(), params.poll_interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_behind_the_target_does_not_block() {
        let leaving = Switches {
            start: true,
            ..Default::default()
        };
        let stage = Trajectory::with_switches(&[
            (leaving, 0.0),
            (Switches::default(), 0.0),
        ]);
        let params = SettleParams {
            time_limit: Duration::from_secs(1),
            ..Default::default()
        };

        // Below the target with only the start switch set: keep waiting.
        assert!(matches!(
            wait_until_settled(&stage, 1.0, &params).await,
            Err(SettleError::Timeout { .. })
        ));
    }
}
