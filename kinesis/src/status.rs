use bitflags::bitflags;

bitflags!(
    /// Status word reported by `CC_GetStatusBits`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusBits: u32 {
        const CW_HARDWARE_LIMIT = 0x0000_0001;
        const CCW_HARDWARE_LIMIT = 0x0000_0002;
        const CW_SOFTWARE_LIMIT = 0x0000_0004;
        const CCW_SOFTWARE_LIMIT = 0x0000_0008;
        const MOVING_CW = 0x0000_0010;
        const MOVING_CCW = 0x0000_0020;
        const JOGGING_CW = 0x0000_0040;
        const JOGGING_CCW = 0x0000_0080;
        const CONNECTED = 0x0000_0100;
        const HOMING = 0x0000_0200;
        const HOMED = 0x0000_0400;
        const INTERLOCK = 0x0000_1000;
        const ENABLED = 0x8000_0000;
    }
);

impl StatusBits {
    pub fn is_moving(&self) -> bool {
        self.intersects(
            StatusBits::MOVING_CW
                | StatusBits::MOVING_CCW
                | StatusBits::JOGGING_CW
                | StatusBits::JOGGING_CCW
                | StatusBits::HOMING,
        )
    }

    pub fn forward_limit(&self) -> bool {
        self.intersects(StatusBits::CW_HARDWARE_LIMIT | StatusBits::CW_SOFTWARE_LIMIT)
    }

    pub fn reverse_limit(&self) -> bool {
        self.intersects(StatusBits::CCW_HARDWARE_LIMIT | StatusBits::CCW_SOFTWARE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_connected_stage_is_not_moving() {
        let status = StatusBits::from_bits_truncate(0x8000_0500);
        assert!(status.contains(StatusBits::CONNECTED | StatusBits::HOMED | StatusBits::ENABLED));
        assert!(!status.is_moving());
    }

    #[test]
    fn moving_and_homing_bits_count_as_motion() {
        assert!(StatusBits::MOVING_CCW.is_moving());
        assert!(StatusBits::HOMING.is_moving());
        assert!(!StatusBits::HOMED.is_moving());
    }

    #[test]
    fn limits_are_split_by_direction() {
        let status = StatusBits::CW_SOFTWARE_LIMIT;
        assert!(status.forward_limit());
        assert!(!status.reverse_limit());
    }
}
