use crossbeam_channel::{unbounded, Receiver, Sender};
use eframe::egui;
use egui::text::LayoutJob;
use egui::{Color32, FontId, Margin, RichText, Stroke, TextFormat};
use tracing::{debug, error, info};

use crate::dispatcher::{Completion, Dispatcher, ERROR_PREFIX};
use crate::operation::Operation;
use crate::session::Session;

const TITLE: &str = "Grammify Desktop";
const COLOR_PRIMARY: Color32 = Color32::from_rgb(0x00, 0xE6, 0x76);
const COLOR_SECONDARY: Color32 = Color32::WHITE;
const COLOR_BG_TEXTBOX: Color32 = Color32::from_rgb(0x1E, 0x1E, 0x1E);
const COLOR_TEXTBOX_BORDER: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);
const BUTTON_SIZE: egui::Vec2 = egui::vec2(200.0, 55.0);
const BUTTON_GAP: f32 = 50.0;
const EDITOR_ROW_HEIGHT: f32 = 22.0;

pub struct GrammifyApp {
    session: Session,
    dispatcher: Dispatcher,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl GrammifyApp {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (tx, rx) = unbounded();
        Self { session: Session::default(), dispatcher, tx, rx }
    }

    /// Button handler. Runs on the UI thread; the request itself goes to a worker.
    fn activate(&mut self, op: Operation, ctx: &egui::Context) {
        let Some(input) = self.session.begin(self.dispatcher.is_available()) else {
            debug!("{op} activation ignored");
            return;
        };
        let ctx = ctx.clone();
        let started = self
            .dispatcher
            .dispatch(op, &input, self.tx.clone(), move || ctx.request_repaint());
        if !started {
            self.session
                .finish(Completion::Failure(format!("{ERROR_PREFIX}could not start request")));
        }
    }

    fn drain_completions(&mut self) {
        while let Ok(completion) = self.rx.try_recv() {
            self.session.finish(completion);
        }
    }

    fn show(&mut self, ctx: &egui::Context) {
        self.drain_completions();

        let style = ctx.style();
        egui::TopBottomPanel::top("title")
            .show_separator_line(false)
            .frame(egui::Frame::side_top_panel(&style).inner_margin(Margin {
                left: 0.0,
                right: 0.0,
                top: 50.0,
                bottom: 20.0,
            }))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| ui.label(wordmark()));
            });

        egui::TopBottomPanel::bottom("actions")
            .show_separator_line(false)
            .frame(egui::Frame::side_top_panel(&style).inner_margin(Margin {
                left: 0.0,
                right: 0.0,
                top: 20.0,
                bottom: 50.0,
            }))
            .show(ctx, |ui| self.action_row(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&style).inner_margin(Margin::symmetric(100.0, 10.0)))
            .show(ctx, |ui| self.editor(ui));
    }

    fn editor(&mut self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(COLOR_BG_TEXTBOX)
            .rounding(20.0)
            .stroke(Stroke::new(1.0, COLOR_TEXTBOX_BORDER))
            .inner_margin(16.0)
            .show(ui, |ui| {
                let rows = (ui.available_height() / EDITOR_ROW_HEIGHT).max(4.0) as usize;
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.session.buffer)
                                .font(FontId::proportional(16.0))
                                .frame(false)
                                .desired_rows(rows)
                                .desired_width(f32::INFINITY),
                        );
                    });
            });
    }

    fn action_row(&mut self, ui: &mut egui::Ui) {
        let enabled = self.session.triggers_enabled();
        let count = Operation::ALL.len() as f32;
        let row_width = count * BUTTON_SIZE.x + (count - 1.0) * BUTTON_GAP;
        let mut clicked = None;

        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = BUTTON_GAP;
            let widgets = &mut ui.visuals_mut().widgets;
            widgets.inactive.weak_bg_fill = COLOR_SECONDARY;
            widgets.hovered.weak_bg_fill = COLOR_PRIMARY;
            widgets.active.weak_bg_fill = COLOR_PRIMARY;

            ui.add_space(((ui.available_width() - row_width) / 2.0).max(0.0));
            for op in Operation::ALL {
                let label = RichText::new(format!("{} {}", op.icon(), op.label()))
                    .size(15.0)
                    .strong()
                    .color(Color32::BLACK);
                let button = egui::Button::new(label).rounding(28.0).min_size(BUTTON_SIZE);
                if ui.add_enabled(enabled, button).clicked() {
                    clicked = Some(op);
                }
            }
        });

        if let Some(op) = clicked {
            self.activate(op, ui.ctx());
        }
    }
}

impl eframe::App for GrammifyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
    }
}

fn wordmark() -> LayoutJob {
    let font = FontId::proportional(56.0);
    let mut job = LayoutJob::default();
    job.append("Grammi", 0.0, TextFormat { font_id: font.clone(), color: COLOR_SECONDARY, ..Default::default() });
    job.append("fy", 0.0, TextFormat { font_id: font, color: COLOR_PRIMARY, ..Default::default() });
    job
}

fn install_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
    ctx.set_fonts(fonts);
}

// Run the UI event loop on the main thread (blocking)
pub fn run_ui_main_thread(dispatcher: Dispatcher) {
    info!("Main UI: starting event loop");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size([1100.0, 800.0])
            .with_min_inner_size([900.0, 700.0]),
        ..Default::default()
    };
    match eframe::run_native(
        TITLE,
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            install_fonts(&cc.egui_ctx);
            Box::new(GrammifyApp::new(dispatcher))
        }),
    ) {
        Ok(_) => info!("Main UI: event loop exited"),
        Err(e) => error!("Main UI error: {e}"),
    }
}
