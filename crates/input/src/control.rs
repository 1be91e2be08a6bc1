use crate::ControlId;

/// On-screen control declared by a demo. The UI draws it and reports
/// interaction back as an [`Action`](crate::Action).
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Pick one of `options`; reported as `Action::Select`.
    Radio {
        id: ControlId,
        label: &'static str,
        options: &'static [&'static str],
        selected: &'static str,
    },
    /// Reported as `Action::Toggle`.
    Toggle {
        id: ControlId,
        label: &'static str,
        on: bool,
    },
    /// Reported as `Action::Press`. Hidden buttons are not drawn.
    Button {
        id: ControlId,
        label: &'static str,
        visible: bool,
    },
    /// Read-only percentage bar.
    Gauge {
        id: ControlId,
        value: f32,
        visible: bool,
    },
    /// Ring of `segments` pads numbered from 1; dragging across them is
    /// reported as `Action::Segment`.
    Wheel {
        id: ControlId,
        segments: u8,
        active: bool,
    },
}

impl Control {
    pub fn id(&self) -> ControlId {
        match self {
            Control::Radio { id, .. }
            | Control::Toggle { id, .. }
            | Control::Button { id, .. }
            | Control::Gauge { id, .. }
            | Control::Wheel { id, .. } => id,
        }
    }
}

/// Direction of travel between two click-wheel segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelTurn {
    Clockwise,
    CounterClockwise,
    /// Same segment, or a jump across the wheel.
    None,
}

/// Classify a move from segment `previous` (if any) to `current` on a wheel
/// of `segments` pads numbered `1..=segments`.
///
/// The three segments after `previous` count as clockwise and the three
/// before it (wrapping) as counter-clockwise. With no previous segment the
/// wheel is read as if it started before pad 1.
pub fn wheel_turn(previous: Option<u8>, current: u8, segments: u8) -> WheelTurn {
    let n = segments.max(1) as i32;
    let prev = previous.unwrap_or(0) as i32;
    let cur = current as i32;
    if previous == Some(current) {
        return WheelTurn::None;
    }
    let ahead = (cur - prev).rem_euclid(n);
    let behind = (prev - cur).rem_euclid(n);
    if (1..=3).contains(&ahead) {
        WheelTurn::Clockwise
    } else if behind <= 2 {
        // prev - 2, prev - 1 and prev itself; the last only happens with no
        // previous segment, where prev reads as pad `segments`.
        WheelTurn::CounterClockwise
    } else {
        WheelTurn::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_segments_turn_clockwise() {
        assert_eq!(wheel_turn(Some(1), 2, 8), WheelTurn::Clockwise);
        assert_eq!(wheel_turn(Some(1), 4, 8), WheelTurn::Clockwise);
        assert_eq!(wheel_turn(Some(7), 1, 8), WheelTurn::Clockwise);
        assert_eq!(wheel_turn(Some(8), 3, 8), WheelTurn::Clockwise);
    }

    #[test]
    fn previous_segments_turn_counter_clockwise() {
        assert_eq!(wheel_turn(Some(3), 2, 8), WheelTurn::CounterClockwise);
        assert_eq!(wheel_turn(Some(3), 1, 8), WheelTurn::CounterClockwise);
        assert_eq!(wheel_turn(Some(1), 7, 8), WheelTurn::CounterClockwise);
    }

    #[test]
    fn far_jumps_do_nothing() {
        assert_eq!(wheel_turn(Some(1), 5, 8), WheelTurn::None);
        assert_eq!(wheel_turn(Some(1), 6, 8), WheelTurn::None);
        assert_eq!(wheel_turn(Some(4), 4, 8), WheelTurn::None);
    }

    #[test]
    fn first_touch_reads_from_the_top() {
        assert_eq!(wheel_turn(None, 1, 8), WheelTurn::Clockwise);
        assert_eq!(wheel_turn(None, 3, 8), WheelTurn::Clockwise);
        assert_eq!(wheel_turn(None, 7, 8), WheelTurn::CounterClockwise);
        assert_eq!(wheel_turn(None, 5, 8), WheelTurn::None);
    }

    #[test]
    fn control_ids() {
        let c = Control::Toggle {
            id: "rotation",
            label: "Rotation",
            on: false,
        };
        assert_eq!(c.id(), "rotation");
    }
}
