//! Digital joysticks on control ports 1 and 2.
//!
//! The API is active high (a set bit means the direction is held); the
//! CIA sees the inverted, active-low levels. Port 1 shares CIA #1 port B
//! with the keyboard columns, port 2 shares port A with the rows.

pub const JOY_UP: u8 = 0x01;
pub const JOY_DOWN: u8 = 0x02;
pub const JOY_LEFT: u8 = 0x04;
pub const JOY_RIGHT: u8 = 0x08;
pub const JOY_FIRE: u8 = 0x10;

const JOY_MASK: u8 = 0x1F;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Joysticks {
    ports: [u8; 2],
}

impl Joysticks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held directions of `port` (1 or 2). Other port numbers
    /// are ignored.
    pub fn set(&mut self, port: u8, state: u8) {
        if let Some(slot) = Self::slot(port) {
            self.ports[slot] = state & JOY_MASK;
        }
    }

    pub fn press(&mut self, port: u8, bits: u8) {
        if let Some(slot) = Self::slot(port) {
            self.ports[slot] |= bits & JOY_MASK;
        }
    }

    pub fn release(&mut self, port: u8, bits: u8) {
        if let Some(slot) = Self::slot(port) {
            self.ports[slot] &= !bits;
        }
    }

    pub fn get(&self, port: u8) -> u8 {
        Self::slot(port).map_or(0, |slot| self.ports[slot])
    }

    /// Pin levels for CIA #1 port B.
    #[inline]
    pub fn port1_pins(&self) -> u8 {
        !self.ports[0]
    }

    /// Pin levels for CIA #1 port A.
    #[inline]
    pub fn port2_pins(&self) -> u8 {
        !self.ports[1]
    }

    pub fn release_all(&mut self) {
        self.ports = [0; 2];
    }

    fn slot(port: u8) -> Option<usize> {
        match port {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_pins_are_high() {
        let joy = Joysticks::new();
        assert_eq!(joy.port1_pins(), 0xFF);
        assert_eq!(joy.port2_pins(), 0xFF);
    }

    #[test]
    fn test_active_low_pins() {
        let mut joy = Joysticks::new();
        joy.set(2, JOY_UP | JOY_FIRE);
        assert_eq!(joy.port2_pins(), 0xEE);
        assert_eq!(joy.port1_pins(), 0xFF);

        joy.release(2, JOY_FIRE);
        assert_eq!(joy.get(2), JOY_UP);
    }

    #[test]
    fn test_invalid_port_ignored() {
        let mut joy = Joysticks::new();
        joy.set(3, JOY_LEFT);
        joy.press(0, JOY_RIGHT);
        assert_eq!(joy, Joysticks::new());
        assert_eq!(joy.get(7), 0);
    }

    #[test]
    fn test_only_five_lines_exist() {
        let mut joy = Joysticks::new();
        joy.press(1, 0xFF);
        assert_eq!(joy.get(1), 0x1F);
        joy.release_all();
        assert_eq!(joy.get(1), 0);
    }
}
