use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use eframe::egui;

use pipeline_canvas::gui::frontend::PipelineCanvasApp;
use pipeline_canvas::persistence::settings::AppSettings;

fn cli() -> Command {
    Command::new("Pipeline-Canvas")
        .about("Inspect and arrange a remote pipeline graph")
        .arg(Arg::new("server").long("server").value_name("URL").help("Pipeline API base, e.g. http://127.0.0.1:8080/api/v1"))
        .arg(Arg::new("pipeline").short('p').long("pipeline").value_name("ID").value_parser(value_parser!(u32)).help("Pipeline id to open"))
        .arg(Arg::new("poll_ms").long("poll-ms").value_name("MS").value_parser(value_parser!(u64)).help("Poll interval in milliseconds"))
        .arg(Arg::new("save").long("save-settings").action(ArgAction::SetTrue).help("Write the effective settings back to settings.json"))
}

fn apply_overrides(mut settings: AppSettings, matches: &ArgMatches) -> AppSettings {
    if let Some(url) = matches.get_one::<String>("server") {
        settings.server_url = url.clone();
    }
    if let Some(id) = matches.get_one::<u32>("pipeline") {
        settings.pipeline_id = *id;
    }
    if let Some(ms) = matches.get_one::<u64>("poll_ms") {
        settings.poll_interval_ms = *ms;
    }
    settings
}

fn main() -> eframe::Result {
    env_logger::init();
    let matches = cli().get_matches();

    let loaded = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("using default settings: {:#}", e);
        AppSettings::default()
    });
    let settings = apply_overrides(loaded, &matches);
    if let Err(e) = settings.validate() {
        log::error!("{:#}", e);
        std::process::exit(2);
    }
    if matches.get_flag("save") {
        match settings.save() {
            Ok(path) => log::info!("settings written to {}", path.display()),
            Err(e) => log::warn!("could not save settings: {:#}", e),
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            .with_min_inner_size([640.0, 400.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Pipeline-Canvas",
        options,
        Box::new(move |cc| Ok(Box::new(PipelineCanvasApp::new(cc, settings)) as Box<dyn eframe::App>)),
    )
}
