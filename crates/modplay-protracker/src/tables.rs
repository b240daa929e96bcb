//! Tuning and waveform tables (Q11 fixed point).

/// Period multipliers for fine tune -8..7, indexed by `finetune + 8`.
pub(crate) const FINE_TUNING: [i32; 16] = [
    4340, 4308, 4277, 4247, 4216, 4186, 4156, 4126, 4096, 4067, 4037, 4008, 3979, 3951, 3922, 3894,
];

/// Period multipliers for 0..15 semitones up.
pub(crate) const ARP_TUNING: [i32; 16] = [
    4096, 3866, 3649, 3444, 3251, 3069, 2896, 2734, 2580, 2435, 2299, 2170, 2048, 1933, 1825, 1722,
];

/// Half a sine period, amplitude 255.
pub(crate) const SINE_TABLE: [i32; 32] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253, 255, 253, 250, 244,
    235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24,
];

/// Amiga period of ProTracker's C-1 at fine tune 0.
pub(crate) const C1_PERIOD: f64 = 856.0;

/// Note number assigned to ProTracker's C-1.
pub(crate) const C1_NOTE: i32 = 37;
