//! Terminal rendering of session events.
//!
//! A terminal gets an indicatif bar; anything else gets one line per notable
//! event. Ctrl-C while an operation runs cancels every active session.

use std::future::Future;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};

use arcade_core::{EventStatus, InstallEvent, InstallResult};
use arcade_download::EventSubscription;
use arcade_install::{Launcher, OperationHandle};

/// Wait for `operation`, rendering its events from `events`.
///
/// `events` must be subscribed before the operation was started so the
/// `started` event is not missed.
pub async fn follow<T>(
    launcher: &Launcher,
    operation: OperationHandle<T>,
    events: EventSubscription,
) -> InstallResult<T> {
    let package_id = operation.package_id().clone();
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let mut renderer = EventRenderer::new(package_id.as_str());
    let result = drive(operation.wait(), events, interrupt, &mut renderer, || {
        let cancelled = launcher.cancel_all();
        tracing::info!(sessions = cancelled, "Interrupted, cancelling");
    })
    .await;
    renderer.finish();
    result
}

async fn drive<T>(
    operation: impl Future<Output = InstallResult<T>>,
    mut events: EventSubscription,
    interrupt: impl Future<Output = ()>,
    renderer: &mut EventRenderer,
    on_interrupt: impl FnOnce(),
) -> InstallResult<T> {
    tokio::pin!(operation);
    tokio::pin!(interrupt);
    let mut on_interrupt = Some(on_interrupt);

    let result = loop {
        tokio::select! {
            biased;
            () = &mut interrupt, if on_interrupt.is_some() => {
                if let Some(cancel) = on_interrupt.take() {
                    cancel();
                }
            }
            result = &mut operation => break result,
            Some(event) = events.recv() => renderer.render(&event),
        }
    };

    // The terminal event is published before the task returns.
    for event in events.drain() {
        renderer.render(&event);
    }
    result
}

/// Renders events of one package.
pub struct EventRenderer {
    package_id: String,
    bar: Option<ProgressBar>,
    lines: Vec<String>,
    has_length: bool,
}

impl EventRenderer {
    /// Renderer for `package_id`, drawing a bar when stdout is a terminal.
    pub fn new(package_id: &str) -> Self {
        let bar = io::stdout().is_terminal().then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
            bar.set_style(spinner_style());
            bar.set_message(format!("{package_id}: waiting"));
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self {
            package_id: package_id.to_string(),
            bar,
            lines: Vec::new(),
            has_length: false,
        }
    }

    /// Renderer that collects lines instead of printing them.
    #[cfg(test)]
    const fn captured(package_id: String) -> Self {
        Self {
            package_id,
            bar: None,
            lines: Vec::new(),
            has_length: false,
        }
    }

    /// Render one event; events of other packages are ignored.
    pub fn render(&mut self, event: &InstallEvent) {
        if event.package_id.as_str() != self.package_id {
            return;
        }

        if event.status == EventStatus::Progress {
            if let Some(bar) = &self.bar {
                if let Some(total) = event.total_bytes.filter(|t| *t > 0) {
                    if !self.has_length {
                        bar.set_style(bar_style());
                        self.has_length = true;
                    }
                    bar.set_length(total);
                }
                bar.set_position(event.bytes_downloaded);
                if let Some(mirror) = &event.mirror_name {
                    bar.set_message(format!("{}: {mirror}", self.package_id));
                }
            }
            return;
        }

        if let Some(line) = describe(event) {
            self.emit(line);
        }
    }

    /// Clear the bar.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    fn emit(&mut self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None if cfg!(test) => self.lines.push(line),
            None => println!("{line}"),
        }
    }
}

/// One-line description of a non-progress event.
fn describe(event: &InstallEvent) -> Option<String> {
    let id = &event.package_id;
    let line = match event.status {
        EventStatus::Started => format!("{id}: {} started", event.kind),
        EventStatus::Progress => return None,
        EventStatus::MirrorFailed => format!(
            "{id}: mirror {} failed: {}",
            event.mirror_name.as_deref().unwrap_or("?"),
            event.message.as_deref().unwrap_or("unknown error")
        ),
        EventStatus::Extracting => format!(
            "{id}: downloaded {}, extracting",
            HumanBytes(event.bytes_downloaded)
        ),
        EventStatus::Completed => format!("{id}: {} completed", event.kind),
        EventStatus::Cancelled => format!("{id}: {} cancelled", event.kind),
        EventStatus::Error => format!(
            "{id}: {} failed: {}",
            event.kind,
            event.message.as_deref().unwrap_or("unknown error")
        ),
    };
    Some(line)
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg} {bar:28.cyan/blue} {bytes:>9} / {total_bytes:>9} ({percent:>3}%) @ {binary_bytes_per_sec} ETA {eta}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}
