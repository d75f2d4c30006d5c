//! Frame-to-frame motion estimation by damped Gauss-Newton.

pub mod solver;
pub mod trajectory;

pub use trajectory::Trajectory;

use simba::scalar::SupersetOf;

use crate::{
    error::Result,
    features::FeatureSet,
    matching::{Correspondences, Matcher},
    pose::Pose,
    utils::Real,
};

/// Where the optimisation of a new frame starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialGuess {
    Identity,
    /// Assume the sensor moves as it did over the last frame.
    #[default]
    ConstantVelocity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OdometryConfig<T> {
    pub max_iterations: usize,
    /// Added to the diagonal of the normal matrix.
    pub damping: T,
    /// Stop once the residual norm falls below this.
    pub residual_tolerance: T,
    /// Stop once the update norm falls below this.
    pub step_tolerance: T,
    pub initial_guess: InitialGuess,
}

impl<T: SupersetOf<f64>> Default for OdometryConfig<T> {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            damping: nalgebra::convert(1e-2),
            residual_tolerance: nalgebra::convert(10.0),
            step_tolerance: nalgebra::convert(1e-8),
            initial_guess: InitialGuess::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// First frame, stored as reference without optimising.
    Initialized,
    Converged,
    /// The iteration cap was hit first; the pose is a low confidence estimate.
    MaxIterations,
    /// The residual norm ended above where it started.
    Diverged,
}

/// Residual norm and update size of every iteration, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationTrace<T> {
    pub residual_norms: Vec<T>,
    pub step_norms: Vec<T>,
}

impl<T> Default for IterationTrace<T> {
    fn default() -> Self {
        Self {
            residual_norms: Vec::new(),
            step_norms: Vec::new(),
        }
    }
}

impl<T: Real> IterationTrace<T> {
    #[inline]
    pub fn iterations(&self) -> usize {
        self.residual_norms.len()
    }

    fn diverged(&self) -> bool {
        match (self.residual_norms.first(), self.residual_norms.last()) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }
}

/// The outcome of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEstimate<T> {
    /// Motion of the sensor from the previous frame to this one.
    pub pose: Pose<T>,
    pub status: ConvergenceStatus,
    pub trace: IterationTrace<T>,
    /// Rows of the last linearisation.
    pub correspondences: usize,
    /// Zeroed rows of the last linearisation.
    pub degenerate: usize,
}

/// Keeps the previous frame's features and estimates how far each new frame moved.
///
/// ```text
/// Uninitialized ──first frame──> Tracking ──every frame──> Tracking
/// ```
#[derive(Debug, Clone)]
pub struct Odometry<T: Real> {
    config: OdometryConfig<T>,
    matcher: Matcher<T>,
    previous: Option<FeatureSet<T>>,
    current_pose: Pose<T>,
    trajectory: Trajectory<T>,
}

impl<T: Real> Odometry<T> {
    pub fn new(config: OdometryConfig<T>, matcher: Matcher<T>) -> Self {
        Self {
            config,
            matcher,
            previous: None,
            current_pose: Pose::identity(),
            trajectory: Trajectory::new(),
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.previous.is_some()
    }

    /// The motion resolved for the latest frame.
    #[inline]
    pub fn current_pose(&self) -> &Pose<T> {
        &self.current_pose
    }

    #[inline]
    pub fn trajectory(&self) -> &Trajectory<T> {
        &self.trajectory
    }

    #[inline]
    pub fn previous_features(&self) -> Option<&FeatureSet<T>> {
        self.previous.as_ref()
    }

    fn initial_guess(&self) -> Pose<T> {
        match self.config.initial_guess {
            InitialGuess::Identity => Pose::identity(),
            InitialGuess::ConstantVelocity => self.trajectory.last().copied().unwrap_or_default(),
        }
    }

    /// Estimates the motion since the previous frame and makes `features` the new reference.
    ///
    /// On error nothing is updated, so the next frame is still matched against
    /// the last good one.
    pub fn process(&mut self, features: FeatureSet<T>) -> Result<FrameEstimate<T>> {
        let Some(previous) = &self.previous else {
            tracing::debug!(features = features.len(), "odometry initialized");
            self.previous = Some(features);
            return Ok(FrameEstimate {
                pose: self.current_pose,
                status: ConvergenceStatus::Initialized,
                trace: IterationTrace::default(),
                correspondences: 0,
                degenerate: 0,
            });
        };

        let OdometryConfig {
            max_iterations,
            damping,
            residual_tolerance,
            step_tolerance,
            ..
        } = self.config;

        let mut pose = self.initial_guess();
        let mut trace = IterationTrace::default();
        let mut cached: Option<Correspondences> = None;
        let mut status = ConvergenceStatus::MaxIterations;
        let (mut correspondences, mut degenerate) = (0, 0);

        for iteration in 0..max_iterations {
            let linearization = self.matcher.linearize(&features, previous, &pose, cached.take());
            let residual_norm = linearization.residuals.norm();
            let step = solver::damped_step(&linearization.jacobian, &linearization.residuals, damping)?;
            let step_norm = step.norm();

            pose = Pose::from_vector(&(pose.to_vector() - step));
            trace.residual_norms.push(residual_norm);
            trace.step_norms.push(step_norm);
            correspondences = linearization.rows();
            degenerate = linearization.degenerate;
            cached = Some(linearization.correspondences);

            tracing::trace!(iteration, %residual_norm, %step_norm, "gauss-newton iteration");

            if residual_norm < residual_tolerance || step_norm < step_tolerance {
                status = ConvergenceStatus::Converged;
                break;
            }
        }

        if status != ConvergenceStatus::Converged && trace.diverged() {
            status = ConvergenceStatus::Diverged;
        }
        if status != ConvergenceStatus::Converged {
            tracing::warn!(?status, iterations = trace.iterations(), "odometry did not converge");
        }

        self.current_pose = pose;
        self.trajectory.push(pose);
        self.previous = Some(features);

        Ok(FrameEstimate {
            pose,
            status,
            trace,
            correspondences,
            degenerate,
        })
    }
}
