use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use attendance::app::AttendanceApp;
use attendance::cli::{Cli, Command, EnrollCommand};
use attendance::face_recognition::model_lbph::LbphFaceRecognizer;
use attendance::face_recognition::FaceRecognitionModel;
use attendance::roster::Roster;
use attendance::training::{build_training_set, prepare_face};
use attendance::utils::{lock, Notice, State};
use attendance::worker::{self, WorkerSettings};
use attendance::{init_logging, Config, Error};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config),
        Command::Enroll(cmd) => enroll(&config, &cmd),
        Command::Roster => list_roster(&config),
    }
}

fn connect(config: &Config) -> anyhow::Result<Roster> {
    let db = &config.database;
    Roster::connect_with_retry(&db.path, &db.table, db.connect_attempts, db.retry_delay())
        .context("cannot connect to the roster database, check the database path and configuration")
}

fn run(config: &Config) -> anyhow::Result<()> {
    let records = connect(config)?.select()?;

    let mut state = State {
        roster_size: records.len(),
        ..State::default()
    };
    let names: Vec<String> = records
        .iter()
        .map(|record| record.name.clone().unwrap_or_default())
        .collect();

    let recognition = &config.recognition;
    let mut recognizer = LbphFaceRecognizer::new(recognition.grid_x, recognition.grid_y);

    match build_training_set(
        &records,
        recognition.face_size,
        recognition.max_rotation_degrees,
        &mut rand::rng(),
    ) {
        Ok(set) => {
            recognizer.train(&set.images, &set.labels)?;
            state.training_samples = recognizer.sample_count();
            info!("Training finished, samples: {}", state.training_samples);
        }
        Err(Error::EmptyRoster) => {
            warn!("Roster is empty");
            state.push_notice(Notice::error("Error", "The roster has no records"));
        }
        Err(Error::NoValidTrainingImages) => {
            warn!("No roster image could be used for training");
            state.push_notice(Notice::error("Error", "All roster images are invalid"));
        }
        Err(err) => return Err(err.into()),
    }

    let shared_state = state.new_shared();

    let settings = WorkerSettings {
        camera: config.camera.clone(),
        detector: config.detector.clone(),
        recognition: config.recognition.clone(),
        names,
    };
    let worker = worker::spawn(Arc::clone(&shared_state), settings, recognizer)
        .context("failed to start the camera thread")?;

    let gui_data = Arc::clone(&shared_state);
    let frame_interval = config.camera.frame_interval();
    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(1100.0, 680.0)),
        ..eframe::NativeOptions::default()
    };

    let result = eframe::run_native(
        "Attendance check-in",
        native_options,
        Box::new(move |cc| Box::new(AttendanceApp::new(cc, gui_data, frame_interval))),
    );

    lock(&shared_state).shutdown = true;
    if worker.join().is_err() {
        warn!("Camera thread panicked");
    }

    result.map_err(|err| anyhow::anyhow!("window failed: {err}"))
}

fn enroll(config: &Config, cmd: &EnrollCommand) -> anyhow::Result<()> {
    let picture = std::fs::read(&cmd.picture).map_err(|source| Error::PictureRead {
        path: cmd.picture.clone(),
        source,
    })?;
    // refuse pictures the training step could not use
    prepare_face(&picture, config.recognition.face_size)
        .with_context(|| format!("{} is not a usable image", cmd.picture.display()))?;

    let roster = Roster::create(&config.database.path, &config.database.table)?;
    let id = roster.enroll(&cmd.name, &picture)?;

    println!(
        "Enrolled {} (row {}) in {}",
        cmd.name,
        id,
        roster.path().display()
    );
    Ok(())
}

fn list_roster(config: &Config) -> anyhow::Result<()> {
    let roster = connect(config)?;
    let records = roster.select()?;

    println!("{} records in {}", records.len(), roster.table());
    for (index, record) in records.iter().enumerate() {
        println!(
            "{:>4}  {:<24} {:>8} bytes{}",
            index,
            record.name.as_deref().unwrap_or("<none>"),
            record.picture_len(),
            if record.is_trainable() { "" } else { "  (skipped)" }
        );
    }
    Ok(())
}
