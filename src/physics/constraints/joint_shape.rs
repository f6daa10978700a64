use super::joint_settings::{AngularAxis, JointMotionType, JointSettings};
use super::solver_settings::JointSolverSettings;

/// Geometry of the translational constraints of a joint, derived from its three linear motion types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearConstraintShape {
    /// No linear constraint.
    Free,
    /// All axes locked: the connectors coincide.
    Point,
    /// All axes limited: the child connector stays within a sphere of radius `linear_limit`.
    Spherical,
    /// Two axes share a radial constraint, the remaining `axis` has its own axial constraint.
    Cylindrical {
        axis: usize,
        axial_motion: JointMotionType,
        radial_motion: JointMotionType,
    },
    /// Each axis is constrained independently to a plane or slab.
    Planar([JointMotionType; 3]),
}

impl LinearConstraintShape {
    pub fn classify(motion_types: [JointMotionType; 3]) -> Self {
        let count = |motion: JointMotionType| motion_types.iter().filter(|m| **m == motion).count();
        let locked = count(JointMotionType::Locked);
        let limited = count(JointMotionType::Limited);
        let free = count(JointMotionType::Free);

        if free == 3 {
            return Self::Free;
        }
        if locked == 3 {
            return Self::Point;
        }
        if limited == 3 {
            return Self::Spherical;
        }
        let radial_motion = if limited == 2 {
            Some(JointMotionType::Limited)
        } else if locked == 2 {
            Some(JointMotionType::Locked)
        } else {
            None
        };
        if let Some(radial_motion) = radial_motion {
            if let Some(axis) = motion_types.iter().position(|motion| *motion != radial_motion) {
                return Self::Cylindrical {
                    axis,
                    axial_motion: motion_types[axis],
                    radial_motion,
                };
            }
        }
        Self::Planar(motion_types)
    }
}

/// How a single angular degree of freedom is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngularLimitKind {
    #[default]
    Free,
    /// Hard limit. Locked axes are hard limits of zero.
    Hard,
    /// Soft limit solved as a damped spring.
    Soft,
}

impl AngularLimitKind {
    fn classify(settings: &JointSettings, axis: AngularAxis) -> Self {
        match settings.angular_motion(axis) {
            JointMotionType::Free => Self::Free,
            JointMotionType::Limited if settings.is_soft_angular_axis(axis) => Self::Soft,
            JointMotionType::Limited | JointMotionType::Locked => Self::Hard,
        }
    }
}

/// Geometry of the swing constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingConstraintShape {
    None,
    /// Both swing axes limited: one combined circular or elliptical cone.
    Cone { soft: bool },
    /// Swing axes handled independently, indexed [swing1, swing2].
    Separate([AngularLimitKind; 2]),
}

/// Which linear drive strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearDriveShape {
    None,
    /// All three axes driven: pull along the full separation.
    Spherical,
    /// Two axes driven: pull within the plane perpendicular to `axis`.
    Circular { axis: usize },
    /// Each enabled axis driven independently.
    Axial([bool; 3]),
}

/// Which swing drive strategy applies when the twist/swing drive style is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingDriveShape {
    None,
    Cone,
    Single(AngularAxis),
}

/// Which angular drive strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularDriveShape {
    None,
    Slerp,
    TwistSwing { twist: bool, swing: SwingDriveShape },
}

/// Everything the solvers need to know about which routines a joint runs, computed once per
/// settings change instead of re-evaluating motion type combinations on every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointShape {
    pub linear: LinearConstraintShape,
    pub twist: AngularLimitKind,
    pub swing: SwingConstraintShape,
    pub linear_drive: LinearDriveShape,
    pub angular_drive: AngularDriveShape,
}

impl Default for JointShape {
    /// A joint that constrains nothing.
    fn default() -> Self {
        Self {
            linear: LinearConstraintShape::Free,
            twist: AngularLimitKind::Free,
            swing: SwingConstraintShape::None,
            linear_drive: LinearDriveShape::None,
            angular_drive: AngularDriveShape::None,
        }
    }
}

impl JointShape {
    pub fn classify(solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> Self {
        let twist = if solver_settings.enable_twist_limits {
            AngularLimitKind::classify(joint_settings, AngularAxis::Twist)
        } else {
            AngularLimitKind::Free
        };

        let swing = if solver_settings.enable_swing_limits {
            let swing1 = joint_settings.angular_motion(AngularAxis::Swing1);
            let swing2 = joint_settings.angular_motion(AngularAxis::Swing2);
            if swing1 == JointMotionType::Limited && swing2 == JointMotionType::Limited {
                SwingConstraintShape::Cone {
                    soft: joint_settings.soft_swing_limit.enabled,
                }
            } else {
                let kinds = [
                    AngularLimitKind::classify(joint_settings, AngularAxis::Swing1),
                    AngularLimitKind::classify(joint_settings, AngularAxis::Swing2),
                ];
                if kinds.iter().all(|kind| *kind == AngularLimitKind::Free) {
                    SwingConstraintShape::None
                } else {
                    SwingConstraintShape::Separate(kinds)
                }
            }
        } else {
            SwingConstraintShape::None
        };

        let (linear_drive, angular_drive) = if solver_settings.enable_drives {
            (
                Self::classify_linear_drive(joint_settings),
                Self::classify_angular_drive(joint_settings),
            )
        } else {
            (LinearDriveShape::None, AngularDriveShape::None)
        };

        Self {
            linear: LinearConstraintShape::classify(joint_settings.linear_motion_types),
            twist,
            swing,
            linear_drive,
            angular_drive,
        }
    }

    fn classify_linear_drive(settings: &JointSettings) -> LinearDriveShape {
        let mut enabled = [false; 3];
        for (axis, enabled) in enabled.iter_mut().enumerate() {
            *enabled = settings.linear_drive.is_axis_enabled(axis)
                && settings.linear_motion_types[axis] != JointMotionType::Locked;
        }
        match enabled.iter().filter(|e| **e).count() {
            0 => LinearDriveShape::None,
            3 => LinearDriveShape::Spherical,
            2 => match enabled.iter().position(|e| !*e) {
                Some(axis) => LinearDriveShape::Circular { axis },
                None => LinearDriveShape::None,
            },
            _ => LinearDriveShape::Axial(enabled),
        }
    }

    fn classify_angular_drive(settings: &JointSettings) -> AngularDriveShape {
        let drive = &settings.angular_drive;
        if drive.is_slerp_enabled() && !settings.any_angular_locked() {
            return AngularDriveShape::Slerp;
        }

        let unlocked = |axis: AngularAxis| settings.angular_motion(axis) != JointMotionType::Locked;
        let twist = drive.is_twist_enabled() && unlocked(AngularAxis::Twist);
        let swing = if !drive.is_swing_enabled() {
            SwingDriveShape::None
        } else {
            match (unlocked(AngularAxis::Swing1), unlocked(AngularAxis::Swing2)) {
                (true, true) => SwingDriveShape::Cone,
                (true, false) => SwingDriveShape::Single(AngularAxis::Swing1),
                (false, true) => SwingDriveShape::Single(AngularAxis::Swing2),
                (false, false) => SwingDriveShape::None,
            }
        };
        if !twist && swing == SwingDriveShape::None {
            AngularDriveShape::None
        } else {
            AngularDriveShape::TwistSwing { twist, swing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constraints::joint_settings::JointForceMode;
    use crate::physics::constraints::spring_settings::SoftSpringSettings;
    use JointMotionType::{Free, Limited, Locked};

    #[test]
    fn test_linear_classification() {
        use LinearConstraintShape as S;
        assert_eq!(S::classify([Free; 3]), S::Free);
        assert_eq!(S::classify([Locked; 3]), S::Point);
        assert_eq!(S::classify([Limited; 3]), S::Spherical);
        assert_eq!(
            S::classify([Free, Limited, Limited]),
            S::Cylindrical {
                axis: 0,
                axial_motion: Free,
                radial_motion: Limited
            }
        );
        assert_eq!(
            S::classify([Locked, Limited, Limited]),
            S::Cylindrical {
                axis: 0,
                axial_motion: Locked,
                radial_motion: Limited
            }
        );
        assert_eq!(
            S::classify([Locked, Limited, Locked]),
            S::Cylindrical {
                axis: 1,
                axial_motion: Limited,
                radial_motion: Locked
            }
        );
        assert_eq!(
            S::classify([Locked, Free, Limited]),
            S::Planar([Locked, Free, Limited])
        );
        assert_eq!(S::classify([Free, Free, Locked]), S::Planar([Free, Free, Locked]));
    }

    #[test]
    fn test_angular_classification() {
        let solver = JointSolverSettings::default();
        let mut settings = JointSettings {
            angular_motion_types: [Limited, Limited, Limited],
            angular_limits: [0.5, 0.5, 0.5],
            soft_twist_limit: SoftSpringSettings::new(10.0, 1.0, JointForceMode::Acceleration),
            ..JointSettings::default()
        };
        let shape = JointShape::classify(&solver, &settings);
        assert_eq!(shape.twist, AngularLimitKind::Soft);
        assert_eq!(shape.swing, SwingConstraintShape::Cone { soft: false });

        settings.angular_motion_types = [Free, Locked, Free];
        let shape = JointShape::classify(&solver, &settings);
        assert_eq!(shape.twist, AngularLimitKind::Free);
        assert_eq!(
            shape.swing,
            SwingConstraintShape::Separate([AngularLimitKind::Hard, AngularLimitKind::Free])
        );

        let disabled = JointSolverSettings {
            enable_swing_limits: false,
            ..solver
        };
        assert_eq!(
            JointShape::classify(&disabled, &settings).swing,
            SwingConstraintShape::None
        );
    }

    #[test]
    fn test_drive_classification() {
        let solver = JointSolverSettings::default();
        let mut settings = JointSettings {
            linear_motion_types: [Free, Free, Locked],
            ..JointSettings::default()
        };
        settings.linear_drive.position_enabled = [true, true, true];
        let shape = JointShape::classify(&solver, &settings);
        assert_eq!(shape.linear_drive, LinearDriveShape::Circular { axis: 2 });

        settings.angular_drive.slerp_position_enabled = true;
        assert_eq!(
            JointShape::classify(&solver, &settings).angular_drive,
            AngularDriveShape::Slerp
        );

        settings.angular_motion_types = [Free, Free, Locked];
        settings.angular_drive.swing_position_enabled = true;
        assert_eq!(
            JointShape::classify(&solver, &settings).angular_drive,
            AngularDriveShape::TwistSwing {
                twist: false,
                swing: SwingDriveShape::Single(AngularAxis::Swing1)
            }
        );

        let no_drives = JointSolverSettings {
            enable_drives: false,
            ..solver
        };
        let shape = JointShape::classify(&no_drives, &settings);
        assert_eq!(shape.linear_drive, LinearDriveShape::None);
        assert_eq!(shape.angular_drive, AngularDriveShape::None);
    }
}
