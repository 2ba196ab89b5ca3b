// src/steering.rs - Two-hand steering angle classification
//
// Steering is the angle of the line between the two middle-finger knuckles.
// Handedness labels decide which hand is which; when the detector reports the
// same label for both, the hands are sorted by horizontal image position.

use tracing::trace;

use crate::config::{SteeringConfig, SteeringMode};
use crate::input::{hand, HandFrame, Handedness};

/// Steering output plus the raw inputs for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringRead {
    /// -1.0 (full left) to 1.0 (full right) under the documented convention.
    pub steering: f64,
    /// Knuckle-to-knuckle angle, when two hands were tracked (radians).
    pub angle: Option<f64>,
    pub hand_count: usize,
}

/// Classify one frame of hand landmarks.
///
/// Anything other than exactly two tracked hands means the driver is off the
/// wheel: steering resets to zero on that same frame.
pub fn classify_steering(hands: &[HandFrame], config: &SteeringConfig) -> SteeringRead {
    if hands.len() != 2 {
        return SteeringRead {
            steering: 0.0,
            angle: None,
            hand_count: hands.len(),
        };
    }

    let (left, right) = resolve_sides(&hands[0], &hands[1]);
    let l = left.get(hand::MIDDLE_MCP);
    let r = right.get(hand::MIDDLE_MCP);

    let angle = (r.y - l.y).atan2(r.x - l.x);

    let steering = if angle.abs() > config.deadzone {
        match config.mode {
            SteeringMode::Digital => -angle.signum(),
            SteeringMode::Proportional => (-angle * config.sensitivity).clamp(-1.0, 1.0),
        }
    } else {
        0.0
    };
    trace!(angle, steering, "steering classified");

    SteeringRead {
        steering,
        angle: Some(angle),
        hand_count: 2,
    }
}

fn resolve_sides<'a>(a: &'a HandFrame, b: &'a HandFrame) -> (&'a HandFrame, &'a HandFrame) {
    match (a.handedness, b.handedness) {
        (Some(la), Some(lb)) if la != lb => {
            if la == Handedness::Left {
                (a, b)
            } else {
                (b, a)
            }
        }
        // Labels missing or both the same: fall back to x-sorting.
        _ => {
            if a.get(hand::MIDDLE_MCP).x < b.get(hand::MIDDLE_MCP).x {
                (a, b)
            } else {
                (b, a)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate;
    use approx::assert_relative_eq;

    fn config() -> SteeringConfig {
        SteeringConfig::default()
    }

    #[test]
    fn test_level_hands_are_centered() {
        let read = classify_steering(&simulate::steering_hands(0.0), &config());
        assert_eq!(read.steering, 0.0);
        assert_eq!(read.hand_count, 2);
        assert_relative_eq!(read.angle.unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deadzone_is_symmetric() {
        let cfg = config();
        for sign in [-1.0, 1.0] {
            let inside = classify_steering(
                &simulate::steering_hands(sign * (cfg.deadzone - 1e-3)),
                &cfg,
            );
            assert_eq!(inside.steering, 0.0, "inside deadzone, sign {}", sign);

            let outside = classify_steering(
                &simulate::steering_hands(sign * (cfg.deadzone + 1e-3)),
                &cfg,
            );
            // Digital mode snaps to the opposite sign of the angle.
            assert_eq!(outside.steering, -sign, "outside deadzone, sign {}", sign);
        }
    }

    #[test]
    fn test_exact_deadzone_boundary_is_zero() {
        let cfg = config();
        let read = classify_steering(&simulate::steering_hands(cfg.deadzone), &cfg);
        assert_eq!(read.steering, 0.0);
    }

    #[test]
    fn test_proportional_mode_scales_and_clamps() {
        let cfg = SteeringConfig {
            mode: SteeringMode::Proportional,
            ..SteeringConfig::default()
        };

        let gentle = classify_steering(&simulate::steering_hands(0.2), &cfg);
        assert_relative_eq!(gentle.steering, -0.4, epsilon = 1e-6);

        let hard = classify_steering(&simulate::steering_hands(0.9), &cfg);
        assert_eq!(hard.steering, -1.0);
    }

    #[test]
    fn test_modes_agree_in_sign() {
        let digital = classify_steering(&simulate::steering_hands(0.3), &config());
        let proportional = classify_steering(
            &simulate::steering_hands(0.3),
            &SteeringConfig {
                mode: SteeringMode::Proportional,
                ..SteeringConfig::default()
            },
        );
        assert_eq!(digital.steering.signum(), proportional.steering.signum());
    }

    #[test]
    fn test_missing_hands_reset_to_zero() {
        let cfg = config();

        let none = classify_steering(&[], &cfg);
        assert_eq!(none.steering, 0.0);
        assert_eq!(none.hand_count, 0);
        assert!(none.angle.is_none());

        let hands = simulate::steering_hands(0.5);
        let one = classify_steering(&hands[..1], &cfg);
        assert_eq!(one.steering, 0.0);
        assert_eq!(one.hand_count, 1);
    }

    #[test]
    fn test_swapped_labels_give_same_result() {
        let cfg = config();
        let hands = simulate::steering_hands(0.4);
        let forward = classify_steering(&hands, &cfg);

        let swapped = vec![hands[1].clone(), hands[0].clone()];
        let reversed = classify_steering(&swapped, &cfg);
        assert_eq!(forward.steering, reversed.steering);
        assert_relative_eq!(
            forward.angle.unwrap(),
            reversed.angle.unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_x_sort_fallback_without_labels() {
        let cfg = config();
        let mut hands = simulate::steering_hands(0.4);
        for hand in &mut hands {
            hand.handedness = None;
        }
        let read = classify_steering(&hands, &cfg);
        assert_eq!(read.steering, -1.0);
    }
}
