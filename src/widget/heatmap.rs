use std::time::Instant;

use data::interaction::{Button, PointerEvent, WheelDelta};
use data::raster::{PixelBuffer, Surface, SurfaceError};
use data::view::{HeatmapView, ViewEvent, ViewState};
use data::color;

use iced::widget::canvas::{self, Text};
use iced::{Color, Event, Point, Rectangle, Renderer, Size, Theme, mouse};

const TEXT_SIZE: iced::Pixels = iced::Pixels(11.0);
const TOOLTIP_LINE: f32 = 14.0;
const TOOLTIP_PAD: f32 = 6.0;
const TOOLTIP_WIDTH: f32 = 260.0;

pub type Chart = HeatmapView<CanvasSurface, Vec<ViewEvent>>;

#[derive(Debug, Clone, Copy)]
pub enum Message {
    Resized(Size),
    Pointer(PointerEvent),
}

/// Keeps the last composited frame for the canvas to paint.
#[derive(Default)]
pub struct CanvasSurface {
    pixels: Option<PixelBuffer>,
    cache: canvas::Cache,
    released: bool,
}

impl Surface for CanvasSurface {
    fn blit(&mut self, pixels: &PixelBuffer) -> Result<(), SurfaceError> {
        if self.released {
            return Err(SurfaceError::Released);
        }
        self.pixels = Some(pixels.clone());
        self.cache.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.pixels = None;
        self.cache.clear();
    }

    fn release(&mut self) {
        self.pixels = None;
        self.cache.clear();
        self.released = true;
    }
}

#[derive(Default)]
pub struct State {
    last_size: Option<Size>,
    dragging: bool,
}

pub struct HeatmapCanvas<'a> {
    chart: &'a Chart,
}

impl<'a> HeatmapCanvas<'a> {
    pub fn new(chart: &'a Chart) -> Self {
        Self { chart }
    }

    fn paint_cells(&self, frame: &mut canvas::Frame) {
        let Some(pixels) = self.chart.surface().pixels.as_ref() else {
            return;
        };
        let (rows, cols) = self.chart.rendered_region();
        let width = pixels.width();
        if width == 0 || width != cols.len() {
            return;
        }

        let viewport = self.chart.viewport();
        for (i, &packed) in pixels.pixels().iter().enumerate() {
            let row = rows.start + i / width;
            let col = cols.start + i % width;
            let cell = viewport.cell_bounds(col, row);
            let [r, g, b, _] = color::unpack(packed);
            frame.fill_rectangle(cell.position(), cell.size(), Color::from_rgb8(r, g, b));
        }
    }

    fn draw_tooltip(&self, frame: &mut canvas::Frame, bounds: Rectangle, cursor: Point) {
        let Some(info) = self.chart.hover(cursor) else {
            return;
        };
        let Some(scheme) = self.chart.scheme() else {
            return;
        };

        let mut lines = vec![format!("{}: {}", self.chart.metric(), info.label)];
        if let (Some(start), Some(end)) = (&info.start_key, &info.end_key) {
            lines.push(format!("{start} .. {end}"));
        }
        if let (Some(start), Some(end)) = (&info.start_time, &info.end_time) {
            lines.push(format!("{start} .. {end}"));
        }

        let height = lines.len() as f32 * TOOLTIP_LINE + TOOLTIP_PAD * 2.0;
        let mut origin = Point::new(cursor.x + 12.0, cursor.y + 12.0);
        if origin.x + TOOLTIP_WIDTH > bounds.width {
            origin.x = (cursor.x - TOOLTIP_WIDTH - 12.0).max(0.0);
        }
        if origin.y + height > bounds.height {
            origin.y = (cursor.y - height - 12.0).max(0.0);
        }

        let bg = scheme.background(info.value);
        let fg = scheme.label(info.value);
        frame.fill_rectangle(
            origin,
            Size::new(TOOLTIP_WIDTH, height),
            Color::from_rgba8(bg.red, bg.green, bg.blue, 0.9),
        );

        for (i, line) in lines.into_iter().enumerate() {
            frame.fill_text(Text {
                content: line,
                position: Point::new(
                    origin.x + TOOLTIP_PAD,
                    origin.y + TOOLTIP_PAD + i as f32 * TOOLTIP_LINE,
                ),
                color: Color::from_rgb8(fg.red, fg.green, fg.blue),
                size: TEXT_SIZE,
                ..Default::default()
            });
        }
    }
}

fn pointer_button(button: mouse::Button) -> Option<Button> {
    match button {
        mouse::Button::Left => Some(Button::Primary),
        mouse::Button::Right => Some(Button::Secondary),
        _ => None,
    }
}

impl canvas::Program<Message> for HeatmapCanvas<'_> {
    type State = State;

    fn update(
        &self,
        state: &mut Self::State,
        event: &iced::Event,
        bounds: iced::Rectangle,
        cursor: iced_core::mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        let size = bounds.size();
        if state.last_size != Some(size) {
            state.last_size = Some(size);
            return Some(canvas::Action::publish(Message::Resized(size)));
        }

        let Event::Mouse(mouse_event) = event else {
            return None;
        };
        let inside = cursor.is_over(bounds);

        match mouse_event {
            mouse::Event::ButtonPressed(button) if inside => {
                let button = pointer_button(*button)?;
                let position = cursor.position_in(bounds)?;
                state.dragging = true;
                Some(
                    canvas::Action::publish(Message::Pointer(PointerEvent::Pressed {
                        button,
                        position,
                    }))
                    .and_capture(),
                )
            }
            mouse::Event::ButtonReleased(button) if state.dragging => {
                state.dragging = false;
                let button = pointer_button(*button)?;
                let position = cursor.position_from(bounds.position())?;
                Some(canvas::Action::publish(Message::Pointer(
                    PointerEvent::Released { button, position },
                )))
            }
            mouse::Event::CursorMoved { .. } if inside || state.dragging => {
                let position = cursor.position_from(bounds.position())?;
                Some(canvas::Action::publish(Message::Pointer(
                    PointerEvent::Moved { position },
                )))
            }
            mouse::Event::WheelScrolled { delta } if inside => {
                let position = cursor.position_in(bounds)?;
                let delta = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => WheelDelta::Lines(*y),
                    mouse::ScrollDelta::Pixels { y, .. } => WheelDelta::Pixels(*y),
                };
                Some(
                    canvas::Action::publish(Message::Pointer(PointerEvent::Wheel {
                        delta,
                        position,
                    }))
                    .and_capture(),
                )
            }
            mouse::Event::CursorLeft if !state.dragging => {
                Some(canvas::Action::publish(Message::Pointer(PointerEvent::Left)))
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        cursor: iced_core::mouse::Cursor,
    ) -> Vec<canvas::Geometry<Renderer>> {
        let palette = theme.extended_palette();
        let text_color = palette.background.base.text;

        let cells = self
            .chart
            .surface()
            .cache
            .draw(renderer, bounds.size(), |frame| self.paint_cells(frame));

        let mut overlay = canvas::Frame::new(renderer, bounds.size());

        match self.chart.state() {
            ViewState::Rendering => {
                if let Some(rect) = self.chart.interaction().brush_rect() {
                    let accent = palette.primary.base.color;
                    overlay.fill_rectangle(
                        rect.position(),
                        rect.size(),
                        Color { a: 0.25, ..accent },
                    );
                } else if let Some(position) = cursor.position_in(bounds) {
                    self.draw_tooltip(&mut overlay, bounds, position);
                }
            }
            ViewState::Empty | ViewState::Uninitialized => {
                overlay.fill_text(Text {
                    content: "No data".to_string(),
                    position: Point::new(bounds.width / 2.0 - 20.0, bounds.height / 2.0),
                    color: text_color,
                    size: TEXT_SIZE,
                    ..Default::default()
                });
            }
            ViewState::Disposed => {}
        }

        if let Some(feedback) = self.chart.copy_feedback(Instant::now()) {
            let content = if feedback.copied {
                format!("Sent to clipboard: {}", feedback.text)
            } else {
                "Copy failed".to_string()
            };
            overlay.fill_text(Text {
                content,
                position: Point::new(8.0, 8.0),
                color: text_color,
                size: TEXT_SIZE,
                ..Default::default()
            });
        }

        vec![cells, overlay.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: iced::Rectangle,
        cursor: iced_core::mouse::Cursor,
    ) -> iced_core::mouse::Interaction {
        if state.dragging && self.chart.interaction().is_brushing() {
            mouse::Interaction::Crosshair
        } else if state.dragging {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }
}
