use super::constraint_checker::ConstraintChecker;

/// Selects how each joint resolves its scalar constraints.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JointSolverType {
    /// Constraints are solved one at a time, each seeing the corrections of the previous ones.
    #[default]
    GaussSeidel,
    /// All active constraints of a joint are solved together through a dense Cholesky solve.
    Cholesky,
}

/// Describes how the joint container iterates and which global tuning applies to every joint.
///
/// Overrides take precedence over the per-joint settings when they hold a positive value, which
/// allows adjusting the feel of a whole scene without touching individual joints.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSolverSettings {
    pub solver_type: JointSolverType,
    /// Number of constraint and drive passes per joint in each call to `apply`.
    pub apply_pair_iterations: u32,
    /// Number of projection passes per joint in each call to `apply_push_out`.
    pub apply_push_out_pair_iterations: u32,
    /// Number of iterations, before the frozen ones, over which the body nearer the anchor is
    /// gradually made immovable.
    pub freeze_iterations: u32,
    /// Number of final iterations in which the body nearer the anchor does not move at all.
    pub frozen_iterations: u32,

    /// Below this vector length the axis of a swing or twist rotation is considered undefined.
    pub swing_twist_angle_tolerance: f32,
    /// Hard position errors at or below this distance are left uncorrected.
    pub position_tolerance: f32,
    /// Hard rotation errors at or below this angle are left uncorrected.
    pub angle_tolerance: f32,
    /// Minimum parent/child mass ratio enforced on dynamic pairs. 0 disables.
    pub min_parent_mass_ratio: f32,
    /// Maximum ratio between the largest and smallest inertia component of a body. 0 disables.
    pub max_inertia_ratio: f32,
    /// Fraction of the positional drift caused by a rotation correction that is removed again.
    pub angular_constraint_position_correction: f32,

    pub enable_twist_limits: bool,
    pub enable_swing_limits: bool,
    pub enable_drives: bool,

    pub linear_stiffness_override: Option<f32>,
    pub twist_stiffness_override: Option<f32>,
    pub swing_stiffness_override: Option<f32>,
    pub linear_projection_override: Option<f32>,
    pub angular_projection_override: Option<f32>,
    pub soft_linear_stiffness_override: Option<f32>,
    pub soft_linear_damping_override: Option<f32>,
    pub soft_twist_stiffness_override: Option<f32>,
    pub soft_twist_damping_override: Option<f32>,
    pub soft_swing_stiffness_override: Option<f32>,
    pub soft_swing_damping_override: Option<f32>,
    pub linear_drive_stiffness_override: Option<f32>,
    pub linear_drive_damping_override: Option<f32>,
    pub angular_drive_stiffness_override: Option<f32>,
    pub angular_drive_damping_override: Option<f32>,
}

impl Default for JointSolverSettings {
    fn default() -> Self {
        Self {
            solver_type: JointSolverType::GaussSeidel,
            apply_pair_iterations: 1,
            apply_push_out_pair_iterations: 1,
            freeze_iterations: 0,
            frozen_iterations: 0,
            swing_twist_angle_tolerance: 1.0e-6,
            position_tolerance: 0.0,
            angle_tolerance: 0.0,
            min_parent_mass_ratio: 0.0,
            max_inertia_ratio: 0.0,
            angular_constraint_position_correction: 1.0,
            enable_twist_limits: true,
            enable_swing_limits: true,
            enable_drives: true,
            linear_stiffness_override: None,
            twist_stiffness_override: None,
            swing_stiffness_override: None,
            linear_projection_override: None,
            angular_projection_override: None,
            soft_linear_stiffness_override: None,
            soft_linear_damping_override: None,
            soft_twist_stiffness_override: None,
            soft_twist_damping_override: None,
            soft_swing_stiffness_override: None,
            soft_swing_damping_override: None,
            linear_drive_stiffness_override: None,
            linear_drive_damping_override: None,
            angular_drive_stiffness_override: None,
            angular_drive_damping_override: None,
        }
    }
}

impl JointSolverSettings {
    /// Creates settings for the given solver with `pair_iterations` constraint passes and a single
    /// projection pass.
    pub fn new(solver_type: JointSolverType, pair_iterations: u32) -> Self {
        let settings = Self {
            solver_type,
            apply_pair_iterations: pair_iterations,
            ..Self::default()
        };
        debug_assert!(Self::validate(&settings), "Solver settings must be valid.");
        settings
    }

    /// Inverse mass scale of the body nearer the anchor in iteration `iteration` of
    /// `num_iterations`.
    ///
    /// The scale ramps from 1 down to 0 over the `freeze_iterations` that precede the last
    /// `frozen_iterations`, which run with a scale of 0. Converged chains then stop jittering
    /// because the last iterations only move bodies away from the anchor.
    pub fn freeze_scale(&self, iteration: u32, num_iterations: u32) -> f32 {
        if self.freeze_iterations + self.frozen_iterations == 0 {
            return 1.0;
        }
        let iteration = i64::from(iteration);
        let begin_freezing = i64::from(num_iterations) - i64::from(self.freeze_iterations + self.frozen_iterations);
        let begin_frozen = i64::from(num_iterations) - i64::from(self.frozen_iterations);
        if iteration >= begin_frozen {
            0.0
        } else if iteration >= begin_freezing {
            1.0 - (iteration - begin_freezing + 1) as f32 / (begin_frozen - begin_freezing) as f32
        } else {
            1.0
        }
    }

    fn overrides(&self) -> [Option<f32>; 15] {
        [
            self.linear_stiffness_override,
            self.twist_stiffness_override,
            self.swing_stiffness_override,
            self.linear_projection_override,
            self.angular_projection_override,
            self.soft_linear_stiffness_override,
            self.soft_linear_damping_override,
            self.soft_twist_stiffness_override,
            self.soft_twist_damping_override,
            self.soft_swing_stiffness_override,
            self.soft_swing_damping_override,
            self.linear_drive_stiffness_override,
            self.linear_drive_damping_override,
            self.angular_drive_stiffness_override,
            self.angular_drive_damping_override,
        ]
    }

    /// Checks that tolerances and ratios are finite and non-negative and that overrides are usable.
    pub fn validate(settings: &JointSolverSettings) -> bool {
        ConstraintChecker::is_nonnegative_number(settings.swing_twist_angle_tolerance)
            && ConstraintChecker::is_nonnegative_number(settings.position_tolerance)
            && ConstraintChecker::is_nonnegative_number(settings.angle_tolerance)
            && ConstraintChecker::is_nonnegative_number(settings.min_parent_mass_ratio)
            && ConstraintChecker::is_nonnegative_number(settings.max_inertia_ratio)
            && ConstraintChecker::is_unit_interval_number(settings.angular_constraint_position_correction)
            && settings
                .overrides()
                .iter()
                .all(|value| ConstraintChecker::is_valid_override(*value))
    }
}
