//! Quadrature encoder decoding.

use embedded_hal::digital::InputPin;

use super::shared::AxisShared;

/// Count delta indexed by `[old_state][new_state]`, state = `(B << 1) | A`.
///
/// Forward rotation walks 0 → 1 → 3 → 2 → 0. Invalid double transitions
/// count as zero.
const STEP_TABLE: [[i8; 4]; 4] = [
    [0, 1, -1, 0],
    [-1, 0, 0, 1],
    [1, 0, 0, -1],
    [0, -1, 1, 0],
];

/// Edge interrupt handler for one encoder.
pub struct QuadratureDecoder<'a, A, B>
where
    A: InputPin,
    B: InputPin,
{
    shared: &'a AxisShared,
    channel_a: A,
    channel_b: B,
    reversed: bool,
    prev_state: u8,
}

impl<'a, A, B> QuadratureDecoder<'a, A, B>
where
    A: InputPin,
    B: InputPin,
{
    /// Create a decoder. `reversed` subtracts deltas for encoders wired
    /// opposite to the valve's opening direction.
    pub fn new(shared: &'a AxisShared, channel_a: A, channel_b: B, reversed: bool) -> Self {
        Self {
            shared,
            channel_a,
            channel_b,
            reversed,
            prev_state: 0,
        }
    }

    /// Latch the current line state. Call before enabling edge interrupts.
    pub fn init(&mut self) {
        self.prev_state = self.read_state();
    }

    /// Handle an edge on either channel.
    pub fn on_edge(&mut self) {
        let new_state = self.read_state();
        let delta = STEP_TABLE[self.prev_state as usize][new_state as usize] as i32;
        if delta != 0 {
            let delta = if self.reversed { -delta } else { delta };
            let count = self.shared.encoder_count().wrapping_add(delta);
            self.shared.set_encoder_count(count);
        }
        self.prev_state = new_state;
    }

    /// Whether deltas are subtracted.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Release the pins.
    pub fn release(self) -> (A, B) {
        (self.channel_a, self.channel_b)
    }

    // Read errors count as low.
    fn read_state(&mut self) -> u8 {
        let a = self.channel_a.is_high().unwrap_or(false) as u8;
        let b = self.channel_b.is_high().unwrap_or(false) as u8;
        (b << 1) | a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    fn reads(levels: &[State]) -> PinMock {
        let t: heapless::Vec<Transaction, 16> =
            levels.iter().map(|&s| Transaction::get(s)).collect();
        PinMock::new(&t)
    }

    #[test]
    fn test_forward_cycle_counts_four() {
        use State::{High, Low};
        let shared = AxisShared::new();
        // init, then 1, 3, 2, 0
        let a = reads(&[Low, High, High, Low, Low]);
        let b = reads(&[Low, Low, High, High, Low]);

        let mut dec = QuadratureDecoder::new(&shared, a, b, false);
        dec.init();
        for _ in 0..4 {
            dec.on_edge();
        }
        assert_eq!(shared.encoder_count(), 4);

        let (mut a, mut b) = dec.release();
        a.done();
        b.done();
    }

    #[test]
    fn test_reversed_wiring_subtracts() {
        use State::{High, Low};
        let shared = AxisShared::new();
        let a = reads(&[Low, High, High]);
        let b = reads(&[Low, Low, High]);

        let mut dec = QuadratureDecoder::new(&shared, a, b, true);
        dec.init();
        dec.on_edge();
        dec.on_edge();
        assert_eq!(shared.encoder_count(), -2);

        let (mut a, mut b) = dec.release();
        a.done();
        b.done();
    }

    #[test]
    fn test_edges_continue_from_rebased_count() {
        use State::{High, Low};
        let shared = AxisShared::new();
        let a = reads(&[Low, High, High]);
        let b = reads(&[Low, Low, High]);

        let mut dec = QuadratureDecoder::new(&shared, a, b, false);
        dec.init();
        dec.on_edge();
        assert_eq!(shared.encoder_count(), 1);

        // Rebase between edges, as `reset_pos` does on a stopped axis.
        shared.set_encoder_count(250);
        dec.on_edge();
        assert_eq!(shared.encoder_count(), 251);

        let (mut a, mut b) = dec.release();
        a.done();
        b.done();
    }

    #[test]
    fn test_table_is_antisymmetric() {
        for old in 0..4 {
            for new in 0..4 {
                assert_eq!(STEP_TABLE[old][new], -STEP_TABLE[new][old]);
            }
        }
    }
}
