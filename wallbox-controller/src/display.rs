//! Text display rendering
//!
//! [`DisplayRenderer`] turns a handful of lines into a frame for a small
//! fixed-width display: each line centred and truncated, the frame padded to
//! the display's line count. It enforces a single writer, remembers when a
//! transient message should come down, and reports when the display has been
//! quiet long enough for the idle screen.
//!
//! Glyph rendering belongs to the [`TextDisplay`] implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Errors raised while writing to a display
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// Another write is still in progress; the caller should back off
    #[error("Display is busy")]
    Busy,

    /// The display hardware rejected the write
    #[error("Display write failed: {0}")]
    Device(String),
}

/// A character display
#[async_trait]
pub trait TextDisplay: Send + Sync {
    /// Columns per line
    fn width(&self) -> usize;

    /// Number of lines
    fn line_count(&self) -> usize;

    /// Replace the whole screen with `lines`
    async fn write_lines(&self, lines: &[String]) -> Result<(), DisplayError>;

    /// Blank the screen
    async fn clear(&self) -> Result<(), DisplayError>;
}

/// Supplier of the idle screen (weather, clock)
#[async_trait]
pub trait IdleScreen: Send + Sync {
    async fn lines(&self) -> Vec<String>;
}

/// Local time and date, the built-in idle screen
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockScreen;

impl ClockScreen {
    pub fn lines_at(now: NaiveDateTime) -> Vec<String> {
        vec![
            now.format("%H:%M").to_string(),
            now.format("%a %d %b %Y").to_string(),
        ]
    }
}

#[async_trait]
impl IdleScreen for ClockScreen {
    async fn lines(&self) -> Vec<String> {
        Self::lines_at(chrono::Local::now().naive_local())
    }
}

/// Centre `text` in `width` columns, truncating when too long
///
/// Odd padding puts the extra space on the right.
pub fn center_line(text: &str, width: usize) -> String {
    let text: String = text.trim().chars().take(width).collect();
    let padding = width - text.chars().count();
    let left = padding / 2;
    let right = padding - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

/// Build a full frame: at most `line_count` centred lines, blank-padded
pub fn compose<S: AsRef<str>>(lines: &[S], width: usize, line_count: usize) -> Vec<String> {
    let mut frame: Vec<String> = lines
        .iter()
        .take(line_count)
        .map(|line| center_line(line.as_ref(), width))
        .collect();
    frame.resize(line_count, " ".repeat(width));
    frame
}

#[derive(Debug)]
struct RenderState {
    current: Vec<String>,
    message_expires: Option<Instant>,
    last_activity: Instant,
    idle: bool,
}

/// Clears the busy flag however a write ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-writer renderer over a [`TextDisplay`]
pub struct DisplayRenderer {
    display: Arc<dyn TextDisplay>,
    display_timeout: Duration,
    busy: AtomicBool,
    state: Mutex<RenderState>,
}

impl DisplayRenderer {
    pub fn new(display: Arc<dyn TextDisplay>, display_timeout: Duration) -> Self {
        Self {
            display,
            display_timeout,
            busy: AtomicBool::new(false),
            state: Mutex::new(RenderState {
                current: Vec::new(),
                message_expires: None,
                last_activity: Instant::now(),
                idle: false,
            }),
        }
    }

    pub fn width(&self) -> usize {
        self.display.width()
    }

    pub fn line_count(&self) -> usize {
        self.display.line_count()
    }

    /// Whether a write is in progress
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, DisplayError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("Display busy, write refused");
            return Err(DisplayError::Busy);
        }
        Ok(BusyGuard(&self.busy))
    }

    /// Show `lines`; a non-zero `ttl` marks the frame as a transient message
    pub async fn show<S: AsRef<str>>(&self, lines: &[S], ttl: Duration) -> Result<(), DisplayError> {
        let _guard = self.acquire()?;
        let frame = compose(lines, self.width(), self.line_count());
        self.display.write_lines(&frame).await?;

        let now = Instant::now();
        let mut state = self.state.lock();
        debug!("Display: {:?}", frame.iter().map(|l| l.trim()).collect::<Vec<_>>());
        state.current = frame;
        state.last_activity = now;
        state.idle = false;
        state.message_expires = (!ttl.is_zero()).then(|| now + ttl);
        Ok(())
    }

    /// Show the idle screen without counting it as activity
    pub async fn show_idle<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), DisplayError> {
        let _guard = self.acquire()?;
        let frame = compose(lines, self.width(), self.line_count());
        self.display.write_lines(&frame).await?;

        let mut state = self.state.lock();
        state.current = frame;
        state.idle = true;
        state.message_expires = None;
        Ok(())
    }

    /// Blank the display
    pub async fn clear(&self) -> Result<(), DisplayError> {
        let _guard = self.acquire()?;
        self.display.clear().await?;

        let mut state = self.state.lock();
        state.current.clear();
        state.message_expires = None;
        Ok(())
    }

    /// The frame currently on the display
    pub fn current(&self) -> Vec<String> {
        self.state.lock().current.clone()
    }

    /// Whether a transient message has outlived its TTL
    pub fn message_expired(&self, now: Instant) -> bool {
        self.state
            .lock()
            .message_expires
            .is_some_and(|expires| now >= expires)
    }

    /// Forget the pending message expiry
    pub fn acknowledge_expiry(&self) {
        self.state.lock().message_expires = None;
    }

    /// Whether a transient message is still up
    pub fn has_message(&self, now: Instant) -> bool {
        self.state
            .lock()
            .message_expires
            .is_some_and(|expires| now < expires)
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().idle
    }

    /// Whether the display has been quiet for the display timeout
    pub fn idle_ready(&self, now: Instant) -> bool {
        let state = self.state.lock();
        !state.idle && now.saturating_duration_since(state.last_activity) >= self.display_timeout
    }
}

impl std::fmt::Debug for DisplayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayRenderer")
            .field("width", &self.width())
            .field("line_count", &self.line_count())
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Display held in memory, recording every frame written
#[derive(Debug)]
pub struct MemoryDisplay {
    width: usize,
    line_count: usize,
    frames: Mutex<Vec<Vec<String>>>,
    clears: Mutex<usize>,
    write_delay: Mutex<Option<Duration>>,
}

impl MemoryDisplay {
    pub fn new(width: usize, line_count: usize) -> Self {
        Self {
            width,
            line_count,
            frames: Mutex::new(Vec::new()),
            clears: Mutex::new(0),
            write_delay: Mutex::new(None),
        }
    }

    /// Slow every write down, to hold the renderer busy
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    pub fn frames(&self) -> Vec<Vec<String>> {
        self.frames.lock().clone()
    }

    /// Last frame written, lines trimmed
    pub fn last_text(&self) -> Vec<String> {
        self.frames
            .lock()
            .last()
            .map(|frame| {
                frame
                    .iter()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any frame written so far contains `text`
    pub fn has_shown(&self, text: &str) -> bool {
        self.frames
            .lock()
            .iter()
            .any(|frame| frame.iter().any(|line| line.contains(text)))
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock()
    }
}

#[async_trait]
impl TextDisplay for MemoryDisplay {
    fn width(&self) -> usize {
        self.width
    }

    fn line_count(&self) -> usize {
        self.line_count
    }

    async fn write_lines(&self, lines: &[String]) -> Result<(), DisplayError> {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.frames.lock().push(lines.to_vec());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DisplayError> {
        *self.clears.lock() += 1;
        Ok(())
    }
}

/// Display that prints each frame to stdout inside a box
#[derive(Debug, Clone, Copy)]
pub struct ConsoleDisplay {
    width: usize,
    line_count: usize,
}

impl ConsoleDisplay {
    pub fn new(width: usize, line_count: usize) -> Self {
        Self { width, line_count }
    }
}

#[async_trait]
impl TextDisplay for ConsoleDisplay {
    fn width(&self) -> usize {
        self.width
    }

    fn line_count(&self) -> usize {
        self.line_count
    }

    async fn write_lines(&self, lines: &[String]) -> Result<(), DisplayError> {
        let border = format!("+{}+", "-".repeat(self.width));
        println!("{}", border);
        for line in lines {
            println!("|{}|", line);
        }
        println!("{}", border);
        Ok(())
    }

    async fn clear(&self) -> Result<(), DisplayError> {
        println!("[display cleared]");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A1", 6, "  A1  ")]
    #[case("A1", 5, " A1  ")]
    #[case("Jailhouse Rock", 8, "Jailhous")]
    #[case("", 4, "    ")]
    #[case("  padded  ", 8, " padded ")]
    fn test_center_line(#[case] text: &str, #[case] width: usize, #[case] expected: &str) {
        assert_eq!(center_line(text, width), expected);
    }

    #[test]
    fn test_compose_pads_and_truncates_lines() {
        let frame = compose(&["one", "two", "three"], 6, 2);
        assert_eq!(frame, vec![" one  ", " two  "]);

        let frame = compose(&["solo"], 6, 3);
        assert_eq!(frame, vec![" solo ", "      ", "      "]);
    }

    #[test]
    fn test_clock_screen() {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(
            ClockScreen::lines_at(now),
            vec!["09:05".to_string(), "Fri 16 Oct 2026".to_string()]
        );
    }

    fn renderer() -> (DisplayRenderer, Arc<MemoryDisplay>) {
        let display = Arc::new(MemoryDisplay::new(16, 2));
        let renderer = DisplayRenderer::new(display.clone(), Duration::from_secs(30));
        (renderer, display)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_show_is_refused() {
        let (renderer, display) = renderer();
        display.set_write_delay(Some(Duration::from_millis(100)));

        let (first, second) = tokio::join!(
            renderer.show(&["first"], Duration::ZERO),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                assert!(renderer.is_busy());
                renderer.show(&["second"], Duration::ZERO).await
            }
        );

        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(DisplayError::Busy));
        assert!(!renderer.is_busy());
        assert_eq!(display.last_text(), vec!["first"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_ttl() {
        let (renderer, _) = renderer();
        renderer.show(&["Volume", "42"], Duration::from_secs(3)).await.unwrap();

        let now = Instant::now();
        assert!(renderer.has_message(now));
        assert!(!renderer.message_expired(now));
        assert!(renderer.message_expired(now + Duration::from_secs(3)));

        renderer.acknowledge_expiry();
        assert!(!renderer.message_expired(now + Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout() {
        let (renderer, _) = renderer();
        renderer.show(&["Hound Dog"], Duration::ZERO).await.unwrap();
        assert!(!renderer.idle_ready(Instant::now()));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(renderer.idle_ready(Instant::now()));

        renderer.show_idle(&["12:00"]).await.unwrap();
        assert!(renderer.is_idle());
        assert!(!renderer.idle_ready(Instant::now()));

        renderer.show(&["Volume"], Duration::from_secs(1)).await.unwrap();
        assert!(!renderer.is_idle());
    }

    #[tokio::test]
    async fn test_clear() {
        let (renderer, display) = renderer();
        renderer.show(&["x"], Duration::ZERO).await.unwrap();
        renderer.clear().await.unwrap();
        assert_eq!(display.clears(), 1);
        assert!(renderer.current().is_empty());
    }
}
