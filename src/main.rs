mod demo;
mod logger;
mod widget;

use std::time::{Duration, Instant};

use data::config::{self, HeatmapConfig};
use data::interaction::{COPY_FEEDBACK, CopyFeedback};
use data::view::{self, FetchOutcome, Fetched, ViewEvent};
use data::{Clipboard, ClipboardError, MatrixError, MetricTag};
use iced::widget::{button, canvas, column, pick_list, row, slider, text};
use iced::{Alignment, Element, Length, Subscription, Task};

use widget::heatmap::{self, CanvasSurface, Chart, HeatmapCanvas};

const CONFIG_FILE: &str = "heatmap.json";
const REFRESH_EVERY: Duration = Duration::from_secs(60);

fn main() -> iced::Result {
    if let Err(err) = logger::setup() {
        eprintln!("Failed to set up logging: {err}");
    }

    iced::application(KeyViz::new, KeyViz::update, KeyViz::view)
        .title("keyviz")
        .subscription(KeyViz::subscription)
        .run()
}

#[derive(Debug, Clone)]
enum Message {
    Heatmap(heatmap::Message),
    Fetched(Fetched<MatrixError>),
    Refresh,
    Redraw,
    BrightnessChanged(f32),
    SaveConfig,
    MetricSelected(MetricTag),
    ResetZoom,
}

/// Holds what the view copied; iced performs the write as a task afterwards.
///
/// That task reports nothing back, so a write accepted here is only a
/// request and clipboard failures are not visible to the app.
#[derive(Default)]
struct PendingClipboard(Option<String>);

impl Clipboard for PendingClipboard {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.0 = Some(text.to_owned());
        Ok(())
    }
}

struct KeyViz {
    config: HeatmapConfig,
    chart: Chart,
    seed: u64,
}

impl KeyViz {
    fn new() -> (Self, Task<Message>) {
        let config = config::load(&data::data_path(CONFIG_FILE)).unwrap_or_else(|err| {
            log::warn!("Failed to load config, using defaults: {err}");
            HeatmapConfig::default()
        });
        let chart = Chart::new(&config, CanvasSurface::default(), Vec::new());

        let mut app = Self {
            config,
            chart,
            seed: 0,
        };
        let task = app.refresh();
        (app, task)
    }

    fn refresh(&mut self) -> Task<Message> {
        let Some(ticket) = self.chart.begin_fetch() else {
            return Task::none();
        };
        self.seed = self.seed.wrapping_add(1);
        log::debug!("Fetching {} (generation {})", self.chart.metric(), ticket.generation());

        Task::perform(
            view::fetch(ticket, demo::load(self.chart.metric(), self.seed)),
            Message::Fetched,
        )
    }

    fn save_config(&self) {
        if let Err(err) = config::save(&data::data_path(CONFIG_FILE), &self.config) {
            log::error!("Failed to save config: {err}");
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let mut tasks = vec![];

        let result = match message {
            Message::Heatmap(heatmap::Message::Resized(size)) => {
                self.chart.size(size.width, size.height)
            }
            Message::Heatmap(heatmap::Message::Pointer(event)) => {
                let mut clipboard = PendingClipboard::default();
                let result = self
                    .chart
                    .handle_pointer(event, &mut clipboard, Instant::now());
                if let Some(text) = clipboard.0 {
                    tasks.push(iced::clipboard::write(text));
                }
                result
            }
            Message::Fetched(fetched) => match self.chart.apply_fetched(fetched) {
                Ok(FetchOutcome::Applied | FetchOutcome::Failed) => Ok(()),
                Ok(outcome) => {
                    log::debug!("Fetch result dropped: {outcome:?}");
                    Ok(())
                }
                Err(err) => Err(err),
            },
            Message::Refresh => {
                tasks.push(self.refresh());
                Ok(())
            }
            Message::Redraw => Ok(()),
            Message::BrightnessChanged(brightness) => {
                let result = self.chart.set_brightness(f64::from(brightness));
                self.config.brightness = self.chart.brightness();
                result
            }
            Message::SaveConfig => {
                self.save_config();
                Ok(())
            }
            Message::MetricSelected(metric) => {
                let result = self.chart.set_metric(metric);
                if self.config.metric != metric {
                    self.config.metric = metric;
                    self.save_config();
                    tasks.push(self.refresh());
                }
                result
            }
            Message::ResetZoom => self.chart.reset_zoom(),
        };

        if let Err(err) = result {
            log::error!("Heatmap render failed: {err}");
        }

        tasks.extend(self.drain_events());
        Task::batch(tasks)
    }

    /// Dispatches queued chart callbacks; a brush zooms onto its range.
    fn drain_events(&mut self) -> Vec<Task<Message>> {
        let mut tasks = vec![];

        loop {
            let events = std::mem::take(self.chart.handler_mut());
            if events.is_empty() {
                break;
            }

            for event in events {
                match event {
                    ViewEvent::Init(handle) => log::info!("Chart {} ready", handle.id),
                    ViewEvent::Brush(selection) => {
                        log::debug!(
                            "Brushed cols {}..{} rows {}..{}",
                            selection.start_col,
                            selection.end_col,
                            selection.start_row,
                            selection.end_row
                        );
                        if let Err(err) = self.chart.zoom_to(&selection) {
                            log::error!("Zoom to selection failed: {err}");
                        }
                    }
                    ViewEvent::Zoom(viewport) | ViewEvent::Pan(viewport) => {
                        log::trace!("Viewport now {:?}", viewport.window());
                    }
                    ViewEvent::Copied(CopyFeedback { text, copied, .. }) => {
                        if copied {
                            log::info!("Clipboard write requested: {text}");
                        }
                        tasks.push(Task::perform(tokio::time::sleep(COPY_FEEDBACK), |_| {
                            Message::Redraw
                        }));
                    }
                }
            }
        }

        tasks
    }

    fn view(&self) -> Element<'_, Message> {
        let brightness = self.chart.brightness() as f32;

        let controls = row![
            pick_list(MetricTag::ALL, Some(self.chart.metric()), Message::MetricSelected),
            text(format!("Brightness {brightness:.2}")),
            slider(0.1..=10.0, brightness, Message::BrightnessChanged)
                .step(0.05)
                .width(Length::Fixed(200.0))
                .on_release(Message::SaveConfig),
            button(text("Reset zoom")).on_press_maybe(
                (!self.chart.viewport().is_full()).then_some(Message::ResetZoom)
            ),
            button(text("Refresh")).on_press(Message::Refresh),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let chart = Element::from(
            canvas(HeatmapCanvas::new(&self.chart))
                .width(Length::Fill)
                .height(Length::Fill),
        )
        .map(Message::Heatmap);

        column![controls, chart].spacing(8).padding(8).into()
    }

    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(REFRESH_EVERY).map(|_| Message::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_clipboard_keeps_last_request() {
        let mut clipboard = PendingClipboard::default();
        assert_eq!(clipboard.write("t_0000_r_00000000"), Ok(()));
        assert_eq!(clipboard.write("t_0001_r_00200000"), Ok(()));
        assert_eq!(clipboard.0.as_deref(), Some("t_0001_r_00200000"));
    }
}
