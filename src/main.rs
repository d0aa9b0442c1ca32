use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use log::info;

use polypitch::audio::loader::load_audio;
use polypitch::constants::DEFAULT_TEMPO_BPM;
use polypitch::{midi, transcribe_with_progress, DecodeConfig, OrtEngine};

#[derive(Parser)]
#[command(name = "polypitch", about = "Transcribe a WAV file to MIDI")]
struct Args {
    /// Input WAV file.
    input: PathBuf,

    /// Output MIDI file.
    #[arg(short, long, default_value = "output.mid")]
    output: PathBuf,

    /// ONNX model file.
    #[arg(short, long, default_value = "model/nmp.onnx")]
    model: PathBuf,

    /// JSON file with decoder options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tempo of the emitted MIDI file, in beats per minute.
    #[arg(long, default_value_t = DEFAULT_TEMPO_BPM)]
    tempo: u32,

    /// Disable the residual-energy continuation pass.
    #[arg(long)]
    no_melodia: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => DecodeConfig::default(),
    };
    if args.no_melodia {
        config.melodia_trick = false;
    }

    let audio = load_audio(&args.input)?;
    let mut engine = OrtEngine::from_file(&args.model)?;

    let mut progress = |fraction: f32| info!("inference: {:.0}%", fraction * 100.0);
    let notes = transcribe_with_progress(&audio, &config, &mut engine, Some(&mut progress))?;
    info!("decoded {} notes", notes.len());

    let midi_data = midi::write_midi(&notes, args.tempo);
    fs::write(&args.output, midi_data)?;

    Ok(())
}
