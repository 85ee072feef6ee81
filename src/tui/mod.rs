pub mod render;
pub mod state;

use crate::config::DashboardConfig;
use crate::engine::analyzer::EnrichedItem;
use crate::logs::LogReceiver;
use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::{Stream, StreamExt};
use ratatui::prelude::*;
use state::DashboardState;
use std::future::Future;
use std::io::stdout;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Run the dashboard in the foreground until the user interrupts it.
pub async fn run_dashboard(
    config: &DashboardConfig,
    items_rx: mpsc::Receiver<EnrichedItem>,
    logs_rx: LogReceiver,
) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let result = dashboard_loop(
        &mut terminal,
        config,
        items_rx,
        logs_rx,
        EventStream::new(),
        interrupt,
    )
    .await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.map(|_| ())
}

/// Drains on every tick and redraws on its own fixed cadence. Returns the number of frames drawn.
async fn dashboard_loop<B, E, I>(
    terminal: &mut Terminal<B>,
    config: &DashboardConfig,
    mut items_rx: mpsc::Receiver<EnrichedItem>,
    mut logs_rx: LogReceiver,
    mut events: E,
    interrupt: I,
) -> Result<u64>
where
    B: Backend,
    E: Stream<Item = std::io::Result<Event>> + Unpin,
    I: Future<Output = ()>,
{
    let mut state = DashboardState::new(config);
    let mut frames = 0u64;

    let mut tick = tokio::time::interval(config.tick());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut redraw = tokio::time::interval(config.redraw_interval());
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                state.drain(&mut items_rx, &mut logs_rx);
            }
            _ = redraw.tick() => {
                terminal.draw(|f| render::draw(f, &state))?;
                frames += 1;
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if is_exit_key(&key) => return Ok(frames),
                Some(Ok(Event::Resize(_, _))) => {
                    state.drain(&mut items_rx, &mut logs_rx);
                    terminal.draw(|f| render::draw(f, &state))?;
                    frames += 1;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("terminal event stream failed"),
                None => return Ok(frames),
            },
            _ = &mut interrupt => return Ok(frames),
        }
    }
}

/// Raw mode swallows SIGINT, so Ctrl+C arrives as a key event.
fn is_exit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogSink;
    use futures_util::stream;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    async fn run_for(
        config: &DashboardConfig,
        events: Vec<std::io::Result<Event>>,
        duration: Duration,
    ) -> Result<u64> {
        let (_items_tx, items_rx) = mpsc::channel(8);
        let (_log, logs_rx) = LogSink::channel("Test");
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let events = stream::iter(events).chain(stream::pending());
        dashboard_loop(
            &mut terminal,
            config,
            items_rx,
            logs_rx,
            events,
            tokio::time::sleep(duration),
        )
        .await
    }

    #[tokio::test]
    async fn test_redraws_at_configured_rate() {
        let config = DashboardConfig::default();
        let frames = run_for(&config, Vec::new(), Duration::from_millis(3_000))
            .await
            .unwrap();
        // One immediate frame, then one every 250ms.
        assert!((12..=13).contains(&frames), "drew {} frames in 3s", frames);
    }

    #[tokio::test]
    async fn test_resize_forces_a_frame() {
        let config = DashboardConfig {
            refresh_per_second: 1,
            ..DashboardConfig::default()
        };
        let events = vec![Ok(Event::Resize(100, 20)), Ok(Event::Resize(90, 20))];
        let frames = run_for(&config, events, Duration::from_millis(300)).await;
        // The immediate frame plus one per resize; the next scheduled one is 1s away.
        assert_eq!(frames.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exit_key_ends_loop() {
        let config = DashboardConfig::default();
        let quit = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        let frames = tokio::time::timeout(
            Duration::from_secs(1),
            run_for(&config, vec![Ok(Event::Key(quit))], Duration::from_secs(30)),
        )
        .await
        .unwrap();
        assert!(frames.is_ok());
    }

    #[test]
    fn test_exit_keys() {
        assert!(is_exit_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_exit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_exit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_exit_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(!is_exit_key(&key));
    }
}
