use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Number of steps must be greater than zero")]
    NoSteps,

    #[error("Positions must be finite numbers")]
    NotFinite,
}

/// `steps` equally spaced absolute targets between `start` and `target`.
///
/// The magnitude of each step is `|target - start| / steps`. An explicit
/// direction overrides the sign; without one the stage moves toward `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    start: f64,
    target: f64,
    steps: u32,
    step_size: f64,
}

impl StepPlan {
    pub fn new(
        start: f64,
        target: f64,
        steps: u32,
        direction: Option<Direction>,
    ) -> Result<Self, PlanError> {
        if steps == 0 {
            return Err(PlanError::NoSteps);
        }
        if !start.is_finite() || !target.is_finite() {
            return Err(PlanError::NotFinite);
        }

        let magnitude = (target - start).abs() / steps as f64;
        let step_size = match direction {
            Some(direction) => direction.sign() * magnitude,
            None => (target - start) / steps as f64,
        };

        Ok(Self {
            start,
            target,
            steps,
            step_size,
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Direction was forced away from `target`; the plan then ends at the
    /// mirror image of `target` around `start`.
    pub fn moves_away_from_target(&self) -> bool {
        let towards = self.target - self.start;
        towards != 0.0 && towards.signum() != self.step_size.signum()
    }

    pub fn final_target(&self) -> f64 {
        if self.moves_away_from_target() {
            self.start + self.steps as f64 * self.step_size
        } else {
            self.target
        }
    }

    /// `(step, absolute target)` pairs, steps numbered from 1.
    pub fn targets(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        (1..=self.steps).map(move |step| {
            let position = if step == self.steps {
                self.final_target()
            } else {
                self.start + step as f64 * self.step_size
            };
            (step, position)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn step_size_magnitude_and_sign_follow_direction() {
        let cases = [
            (0.0, 2.0, 4, Direction::Forward, 0.5),
            (5.0, 1.0, 8, Direction::Backward, -0.5),
            (1.5, 1.0, 2, Direction::Forward, 0.25),
            (-3.0, 3.0, 3, Direction::Backward, -2.0),
        ];

        for (start, target, steps, direction, expected) in cases {
            let plan = StepPlan::new(start, target, steps, Some(direction)).unwrap();
            assert!((plan.step_size() - expected).abs() < EPS, "{plan:?}");
            assert!(
                (plan.step_size().abs() - (target - start).abs() / steps as f64).abs() < EPS
            );
        }
    }

    #[test]
    fn targets_are_arithmetic_and_end_at_target() {
        let plan = StepPlan::new(0.3, 2.0, 7, Some(Direction::Forward)).unwrap();
        let targets: Vec<_> = plan.targets().collect();

        assert_eq!(targets.len(), 7);
        assert_eq!(targets[0].0, 1);
        assert_eq!(targets.last().unwrap(), &(7, 2.0));

        let mut previous = plan.start();
        for (_, position) in &targets {
            assert!((position - previous - plan.step_size()).abs() < 1e-9);
            previous = *position;
        }
    }

    #[test]
    fn natural_direction_without_toggle() {
        let plan = StepPlan::new(4.0, 2.0, 2, None).unwrap();
        assert_eq!(plan.step_size(), -1.0);
        assert_eq!(
            plan.targets().collect::<Vec<_>>(),
            vec![(1, 3.0), (2, 2.0)]
        );
    }

    #[test]
    fn opposing_direction_mirrors_the_move() {
        let plan = StepPlan::new(2.0, 4.0, 2, Some(Direction::Backward)).unwrap();
        assert!(plan.moves_away_from_target());
        assert_eq!(plan.final_target(), 0.0);
        assert_eq!(
            plan.targets().collect::<Vec<_>>(),
            vec![(1, 1.0), (2, 0.0)]
        );
    }

    #[test]
    fn zero_distance_plan_stays_put() {
        let plan = StepPlan::new(1.0, 1.0, 3, Some(Direction::Backward)).unwrap();
        assert!(!plan.moves_away_from_target());
        assert!(plan.targets().all(|(_, p)| p == 1.0));
    }

    #[test]
    fn rejects_zero_steps_and_nan() {
        assert_eq!(StepPlan::new(0.0, 1.0, 0, None), Err(PlanError::NoSteps));
        assert_eq!(
            StepPlan::new(f64::NAN, 1.0, 1, None),
            Err(PlanError::NotFinite)
        );
    }
}
