//! Core geometric correction modules

pub mod attitude;
pub mod coordinates;
pub mod geometry;
pub mod intersection;
pub mod mode;
pub mod orbit;
pub mod position;
pub mod quaternion;
pub mod rational;
pub mod smoothing;
pub mod spline;
pub mod time;

// Re-export main types
pub use attitude::AttitudeFrame;
pub use geometry::{GeometryCalculator, GeometryParams};
pub use intersection::intersect;
pub use mode::{ModeCharacteristics, ScanAnchor};
pub use orbit::{reconstruct_orbit, EciTrajectory, OrbitSolution, TrajectoryAxis};
pub use position::{PixelPositions, PositionCalculator, ScanLine};
pub use quaternion::Quaternion;
pub use rational::RationalSurface;
pub use smoothing::LocalRegressionSmoother;
pub use spline::NaturalCubicSpline;
pub use time::{LeapSecondEntry, TimeTables, Ut1Entry};
