//! Effect device capability traits.
//!
//! Sound, vibration and flash are opaque platform devices with play/stop
//! contracts. Stopping an already-stopped device is always a no-op; start
//! failures are reported but callers log and continue, so one dead device
//! never silences the rest of an alert.
//!
//! The `Stub*` implementations record what was asked of them and serve as
//! the headless/no-op devices for tests and CLI dry runs.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::error::EffectError;

/// Looped or one-shot audio playback with adjustable volume.
pub trait SoundDevice: Send + Sync {
    /// Start playback at `volume` (0.0..=1.0). Restarting while playing
    /// replaces the current playback.
    fn play(&self, looped: bool, volume: f32) -> Result<(), EffectError>;

    fn set_volume(&self, volume: f32) -> Result<(), EffectError>;

    /// Idempotent.
    fn stop(&self);
}

/// Repeating vibration waveform.
pub trait VibrationDevice: Send + Sync {
    fn start_pattern(&self, on_ms: u64, off_ms: u64, repeat: bool) -> Result<(), EffectError>;

    /// Idempotent.
    fn cancel(&self);
}

/// Camera flash / LED strobe.
pub trait FlashDevice: Send + Sync {
    /// Whether the device has a flash at all. Callers skip the effect
    /// entirely when this is false.
    fn has_flash(&self) -> bool;

    fn start_pattern(&self, on_ms: u64, off_ms: u64) -> Result<(), EffectError>;

    /// Idempotent.
    fn stop(&self);
}

// ── Stubs ────────────────────────────────────────────────────────

/// Recording sound stub.
#[derive(Debug, Default)]
pub struct StubSound {
    playing: AtomicBool,
    looped: AtomicBool,
    volume_bits: AtomicU32,
    play_calls: AtomicU64,
}

impl StubSound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::SeqCst))
    }

    pub fn play_calls(&self) -> u64 {
        self.play_calls.load(Ordering::SeqCst)
    }
}

impl SoundDevice for StubSound {
    fn play(&self, looped: bool, volume: f32) -> Result<(), EffectError> {
        self.playing.store(true, Ordering::SeqCst);
        self.looped.store(looped, Ordering::SeqCst);
        self.volume_bits.store(volume.to_bits(), Ordering::SeqCst);
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), EffectError> {
        self.volume_bits.store(volume.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}

/// Recording vibration stub.
#[derive(Debug, Default)]
pub struct StubVibration {
    active: AtomicBool,
}

impl StubVibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl VibrationDevice for StubVibration {
    fn start_pattern(&self, _on_ms: u64, _off_ms: u64, _repeat: bool) -> Result<(), EffectError> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Recording flash stub; construct with or without flash hardware.
#[derive(Debug)]
pub struct StubFlash {
    has_flash: bool,
    active: AtomicBool,
}

impl StubFlash {
    pub fn new(has_flash: bool) -> Self {
        Self {
            has_flash,
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for StubFlash {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FlashDevice for StubFlash {
    fn has_flash(&self) -> bool {
        self.has_flash
    }

    fn start_pattern(&self, _on_ms: u64, _off_ms: u64) -> Result<(), EffectError> {
        if !self.has_flash {
            return Err(EffectError::new("flash", "no flash hardware"));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_stub_records_playback() {
        let sound = StubSound::new();
        assert!(!sound.is_playing());
        sound.play(true, 0.8).expect("play");
        assert!(sound.is_playing());
        assert_eq!(sound.volume(), 0.8);
        sound.set_volume(0.4).expect("set volume");
        assert_eq!(sound.volume(), 0.4);
        sound.stop();
        sound.stop(); // idempotent
        assert!(!sound.is_playing());
    }

    #[test]
    fn flashless_device_rejects_start() {
        let flash = StubFlash::new(false);
        assert!(!flash.has_flash());
        assert!(flash.start_pattern(1000, 500).is_err());
        assert!(!flash.is_active());
    }
}
