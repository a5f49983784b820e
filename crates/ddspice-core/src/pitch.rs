//! Pitch scale shared by the salience decoder and its tests.
//!
//! Salience bins follow the CREPE layout: 360 bins, 20 cents apart, bin 0
//! anchored at 1997.3794084 cents above 10 Hz (about 31.7 Hz).

/// Number of salience bins per frame.
pub const PITCH_BINS: usize = 360;

/// Cents between adjacent salience bins.
pub const CENTS_PER_BIN: f32 = 20.0;

/// Cents of bin 0 relative to [`REFERENCE_HZ`].
pub const CENTS_OFFSET: f32 = 1997.379_4;

/// Frequency at 0 cents.
pub const REFERENCE_HZ: f32 = 10.0;

pub const CENTS_PER_OCTAVE: f32 = 1200.0;

/// MIDI note range used to scale pitch conditioning into `[0, 1]`.
pub const MIDI_RANGE: f32 = 127.0;

/// Loudness range (dB) used to scale loudness conditioning.
pub const LOUDNESS_RANGE_DB: f32 = 120.0;

/// Map a (possibly fractional) bin index to cents.
#[inline]
pub fn bin_to_cents(bin: f32) -> f32 {
    CENTS_PER_BIN * bin + CENTS_OFFSET
}

#[inline]
pub fn cents_to_hz(cents: f32) -> f32 {
    REFERENCE_HZ * 2.0_f32.powf(cents / CENTS_PER_OCTAVE)
}

#[inline]
pub fn bin_to_hz(bin: f32) -> f32 {
    cents_to_hz(bin_to_cents(bin))
}

/// MIDI note number for a frequency, clamped at 0 for silence and sub-audio.
///
/// Host-side counterpart of `ddspice_burn::hz_to_midi`, for plain
/// [`FeatureRecord`](crate::FeatureRecord) values. Both must agree.
#[inline]
pub fn hz_to_midi(hz: f32) -> f32 {
    if hz <= 0.0 {
        return 0.0;
    }
    (12.0 * (hz.log2() - 440.0_f32.log2()) + 69.0).max(0.0)
}

/// Frequency ratio of a transposition by `steps` out of `bins_per_octave`.
#[inline]
pub fn transposition_ratio(steps: f32, bins_per_octave: u32) -> f32 {
    2.0_f32.powf(steps / bins_per_octave as f32)
}
