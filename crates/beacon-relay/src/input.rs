//! # Barcode Input Sources
//!
//! The three ways a barcode enters the system, normalized into one scan
//! stream:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Barcode Input Pipeline                           │
//! │                                                                         │
//! │  USB keyboard wedge ──► KeyWedgeDecoder                                │
//! │    (scanner types the    buffers printable keys; >100ms gap resets;    │
//! │     code + Enter)        Enter with ≥5 chars emits a scan              │
//! │                                                                         │
//! │  Camera frames ──────► CameraScanner                                   │
//! │    (FrameDetector        per-frame detect, 700ms cooldown after a      │
//! │     trait injected)      hit; single-frame capture bypasses cooldown   │
//! │                                                                         │
//! │  Manual entry ───────► normalize_manual_entry                          │
//! │    (typed + Enter)       trim, reject empty                            │
//! │                                                                         │
//! │            all three ──► ScanDebouncer ──► session                     │
//! │                          drops a scan < 500ms after the last accepted  │
//! │                          one, or while one is still being processed    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is synchronous state-machine code; timing uses
//! `tokio::time::Instant` so tests run on the paused clock.

use tokio::time::{Duration, Instant};

// =============================================================================
// Constants
// =============================================================================

/// Inter-key gap above which wedge input is human typing, not a scanner.
pub const WEDGE_MAX_KEY_GAP: Duration = Duration::from_millis(100);

/// Minimum buffered length for a wedge emission.
pub const WEDGE_MIN_LENGTH: usize = 5;

/// Cooldown after a camera detection before the next frame counts.
pub const CAMERA_COOLDOWN: Duration = Duration::from_millis(700);

/// Window during which repeat scans are dropped.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

// =============================================================================
// Keyboard Wedge
// =============================================================================

/// One keystroke as seen by the wedge decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
}

/// Decodes USB-scanner "keyboard wedge" input.
///
/// Scanners type an entire code in a burst well under the 100ms inter-key
/// gap; a human typist cannot. The gap check plus the minimum length keeps
/// ordinary typing out of the scan stream.
#[derive(Debug, Default)]
pub struct KeyWedgeDecoder {
    buffer: String,
    last_key: Option<Instant>,
}

impl KeyWedgeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one keystroke. Returns a completed scan on a qualifying Enter.
    pub fn key(&mut self, input: KeyInput) -> Option<String> {
        let now = Instant::now();

        // A slow gap means the buffer is stale typing, not a scan burst.
        if let Some(last) = self.last_key {
            if now.duration_since(last) > WEDGE_MAX_KEY_GAP {
                self.buffer.clear();
            }
        }
        self.last_key = Some(now);

        match input {
            KeyInput::Char(c) => {
                if !c.is_control() {
                    self.buffer.push(c);
                }
                None
            }
            KeyInput::Enter => {
                let code = std::mem::take(&mut self.buffer);
                let code = code.trim();
                if code.len() >= WEDGE_MIN_LENGTH {
                    Some(code.to_string())
                } else {
                    None
                }
            }
        }
    }
}

// =============================================================================
// Camera Scanner
// =============================================================================

/// Barcode detection over a raw image frame.
///
/// The detection itself (luminance decode, ML, whatever the platform
/// offers) is injected; this module only owns the timing policy around it.
pub trait FrameDetector: Send {
    /// Attempts to find a barcode in one frame.
    fn detect(&mut self, frame: &[u8]) -> Option<String>;
}

/// Wraps a [`FrameDetector`] with the continuous-scan cooldown.
pub struct CameraScanner<D: FrameDetector> {
    detector: D,
    cooldown_until: Option<Instant>,
}

impl<D: FrameDetector> CameraScanner<D> {
    pub fn new(detector: D) -> Self {
        CameraScanner {
            detector,
            cooldown_until: None,
        }
    }

    /// Processes one frame of the continuous stream.
    ///
    /// After a hit, further frames are ignored for [`CAMERA_COOLDOWN`] so a
    /// code held in front of the lens does not fire on every frame.
    pub fn process_frame(&mut self, frame: &[u8]) -> Option<String> {
        let now = Instant::now();
        if let Some(until) = self.cooldown_until {
            if now < until {
                return None;
            }
        }

        let code = self.detector.detect(frame)?;
        self.cooldown_until = Some(now + CAMERA_COOLDOWN);
        Some(code.trim().to_string())
    }

    /// One-shot capture fallback; ignores and does not arm the cooldown.
    pub fn capture_single(&mut self, frame: &[u8]) -> Option<String> {
        self.detector
            .detect(frame)
            .map(|code| code.trim().to_string())
    }
}

// =============================================================================
// Manual Entry
// =============================================================================

/// Normalizes a hand-typed barcode submission. Empty input is no scan.
pub fn normalize_manual_entry(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// =============================================================================
// Scan Debouncer
// =============================================================================

/// The global gate every scan passes through, whatever its source.
///
/// Two rules, in order:
/// 1. While a scan is being processed, every new scan is dropped.
/// 2. A scan arriving within [`DEBOUNCE_WINDOW`] of the last ACCEPTED scan
///    is dropped.
///
/// Callers mark processing complete with [`ScanDebouncer::complete`].
#[derive(Debug, Default)]
pub struct ScanDebouncer {
    last_accepted: Option<Instant>,
    processing: bool,
}

impl ScanDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gates one scan. Accepting it marks processing as in flight.
    pub fn try_accept(&mut self) -> bool {
        if self.processing {
            return false;
        }
        let now = Instant::now();
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < DEBOUNCE_WINDOW {
                return false;
            }
        }
        self.last_accepted = Some(now);
        self.processing = true;
        true
    }

    /// Marks the in-flight scan as handled.
    pub fn complete(&mut self) {
        self.processing = false;
    }

    /// Whether a scan is currently being processed.
    pub fn is_processing(&self) -> bool {
        self.processing
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn type_code(decoder: &mut KeyWedgeDecoder, code: &str) -> Option<String> {
        for c in code.chars() {
            assert_eq!(decoder.key(KeyInput::Char(c)), None);
        }
        decoder.key(KeyInput::Enter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_wedge_burst_emits_scan() {
        let mut decoder = KeyWedgeDecoder::new();
        assert_eq!(type_code(&mut decoder, "12345"), Some("12345".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wedge_short_code_is_ignored() {
        let mut decoder = KeyWedgeDecoder::new();
        assert_eq!(type_code(&mut decoder, "1234"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wedge_slow_typing_resets_buffer() {
        let mut decoder = KeyWedgeDecoder::new();
        decoder.key(KeyInput::Char('1'));
        decoder.key(KeyInput::Char('2'));

        // A human pause; the first two keys are discarded.
        advance(Duration::from_millis(150)).await;

        for c in "345".chars() {
            decoder.key(KeyInput::Char(c));
        }
        assert_eq!(decoder.key(KeyInput::Enter), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wedge_gap_at_boundary_keeps_buffer() {
        let mut decoder = KeyWedgeDecoder::new();
        decoder.key(KeyInput::Char('1'));
        advance(WEDGE_MAX_KEY_GAP).await;
        for c in "2345".chars() {
            decoder.key(KeyInput::Char(c));
        }
        assert_eq!(decoder.key(KeyInput::Enter), Some("12345".to_string()));
    }

    struct FixedDetector(Option<String>);

    impl FrameDetector for FixedDetector {
        fn detect(&mut self, _frame: &[u8]) -> Option<String> {
            self.0.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_cooldown_suppresses_repeat_hits() {
        let mut camera = CameraScanner::new(FixedDetector(Some("1001".into())));

        assert_eq!(camera.process_frame(&[]), Some("1001".to_string()));
        // Still inside the cooldown.
        advance(Duration::from_millis(300)).await;
        assert_eq!(camera.process_frame(&[]), None);
        // Cooldown elapsed.
        advance(Duration::from_millis(500)).await;
        assert_eq!(camera.process_frame(&[]), Some("1001".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_single_capture_bypasses_cooldown() {
        let mut camera = CameraScanner::new(FixedDetector(Some("1001".into())));

        assert_eq!(camera.process_frame(&[]), Some("1001".to_string()));
        assert_eq!(camera.capture_single(&[]), Some("1001".to_string()));
    }

    #[test]
    fn test_manual_entry_normalization() {
        assert_eq!(normalize_manual_entry("  1001 "), Some("1001".to_string()));
        assert_eq!(normalize_manual_entry("   "), None);
        assert_eq!(normalize_manual_entry(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_drops_rapid_repeats() {
        let mut debouncer = ScanDebouncer::new();

        assert!(debouncer.try_accept());
        debouncer.complete();

        // Within the window: dropped even though processing finished.
        advance(Duration::from_millis(200)).await;
        assert!(!debouncer.try_accept());

        advance(Duration::from_millis(400)).await;
        assert!(debouncer.try_accept());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_blocks_while_processing() {
        let mut debouncer = ScanDebouncer::new();

        assert!(debouncer.try_accept());
        assert!(debouncer.is_processing());

        // Long after the window, still blocked: the scan is in flight.
        advance(Duration::from_secs(5)).await;
        assert!(!debouncer.try_accept());

        debouncer.complete();
        assert!(debouncer.try_accept());
    }
}
